//! Record Table
//!
//! In-memory id → record map with write-through persistence.
//!
//! ## Invariants
//! - Identifiers are unique; a duplicate insert changes nothing
//! - A mutation is visible only after its commit reached disk
//! - A failed commit leaves memory exactly as it was
//! - One writer at a time; readers never wait on disk I/O
//!
//! Writers serialize on `writer`, build the next state from a clone of the
//! current one, persist it, then swap it in. Readers clone the current
//! `Arc` and so see either the state before a mutation or after it.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::NaiveDateTime;
use tracing::debug;

use super::errors::{TableError, TableResult};
use crate::clock::{Clock, SystemClock};
use crate::codec::{AuditEntry, Record};
use crate::store::{Change, FileStore};

/// Listing order for [`Table::list_all`].
pub enum Order {
    /// Identifier, lexical
    ById,
    /// Original load/insertion order
    Insertion,
    /// Caller comparison, stable over insertion order
    By(Box<dyn Fn(&Record, &Record) -> Ordering + Send + Sync>),
}

impl Order {
    pub fn by<F>(compare: F) -> Self
    where
        F: Fn(&Record, &Record) -> Ordering + Send + Sync + 'static,
    {
        Order::By(Box::new(compare))
    }

    /// Descending by a numeric field; records without it sort last.
    pub fn number_descending(field: &str) -> Self {
        let field = field.to_string();
        Order::by(move |a, b| match (a.number(&field), b.number(&field)) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
    }
}

impl fmt::Debug for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::ById => write!(f, "ById"),
            Order::Insertion => write!(f, "Insertion"),
            Order::By(_) => write!(f, "By(..)"),
        }
    }
}

/// Table behaviour switches.
#[derive(Clone)]
pub struct TableOptions {
    /// Append an audit entry on every update
    pub audit: bool,
    /// Source of audit timestamps
    pub clock: Arc<dyn Clock>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            audit: true,
            clock: Arc::new(SystemClock),
        }
    }
}

impl fmt::Debug for TableOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableOptions")
            .field("audit", &self.audit)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
struct Slot {
    /// Insertion sequence; fixes load order and breaks sort ties
    seq: u64,
    record: Record,
}

#[derive(Debug, Clone, Default)]
struct TableState {
    records: BTreeMap<String, Slot>,
    next_seq: u64,
}

impl TableState {
    fn in_insertion_order(&self) -> Vec<&Slot> {
        let mut slots: Vec<&Slot> = self.records.values().collect();
        slots.sort_by_key(|slot| slot.seq);
        slots
    }

    fn ordered_records(&self) -> Vec<Record> {
        self.in_insertion_order()
            .into_iter()
            .map(|slot| slot.record.clone())
            .collect()
    }
}

/// A table of records backed by one [`FileStore`].
pub struct Table {
    store: FileStore,
    options: TableOptions,
    writer: Mutex<()>,
    state: RwLock<Arc<TableState>>,
}

impl Table {
    /// Opens a table, hydrating it from the store.
    pub fn open(store: FileStore, options: TableOptions) -> TableResult<Self> {
        let mut state = TableState::default();
        for record in store.load()? {
            let seq = state.next_seq;
            state.next_seq += 1;
            state
                .records
                .insert(record.id().to_string(), Slot { seq, record });
        }

        Ok(Self {
            store,
            options,
            writer: Mutex::new(()),
            state: RwLock::new(Arc::new(state)),
        })
    }

    pub fn name(&self) -> &str {
        self.store.name()
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn audit_enabled(&self) -> bool {
        self.options.audit
    }

    /// Current time on the table's audit clock.
    pub fn now(&self) -> NaiveDateTime {
        self.options.clock.now()
    }

    pub fn len(&self) -> usize {
        self.current().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.current().records.contains_key(id)
    }

    /// Inserts a new record.
    ///
    /// # Errors
    ///
    /// `DuplicateId` if the id exists (table untouched), `Persist` if the
    /// commit failed (table rolled back).
    pub fn insert(&self, record: Record) -> TableResult<()> {
        let _writer = self.lock_writer();
        let current = self.current();

        if current.records.contains_key(record.id()) {
            return Err(TableError::DuplicateId(record.id().to_string()));
        }

        let mut next = (*current).clone();
        let seq = next.next_seq;
        next.next_seq += 1;
        next.records.insert(
            record.id().to_string(),
            Slot {
                seq,
                record: record.clone(),
            },
        );

        self.commit(next, Change::Upsert(&record))?;
        debug!(table = %self.name(), id = %record.id(), "inserted record");
        Ok(())
    }

    /// Returns a copy of the record.
    pub fn find_by_id(&self, id: &str) -> TableResult<Record> {
        self.current()
            .records
            .get(id)
            .map(|slot| slot.record.clone())
            .ok_or_else(|| TableError::NotFound(id.to_string()))
    }

    /// Applies `mutator` to a working copy of the record and commits it.
    ///
    /// The mutator returns the audit description for the change, appended
    /// with the clock's timestamp when auditing is on. If the mutator fails,
    /// nothing is changed and its error is returned. Returns the committed
    /// record.
    ///
    /// # Errors
    ///
    /// `Rejected` if the mutator changed the identifier or dropped audit
    /// entries; the table is left untouched.
    pub fn update<F, E>(&self, id: &str, mutator: F) -> Result<Record, E>
    where
        F: FnOnce(&mut Record) -> Result<String, E>,
        E: From<TableError>,
    {
        let _writer = self.lock_writer();
        let current = self.current();

        let slot = current
            .records
            .get(id)
            .ok_or_else(|| TableError::NotFound(id.to_string()))?;

        let mut working = slot.record.clone();
        let description = mutator(&mut working)?;
        if working.id() != id {
            return Err(TableError::Rejected(format!(
                "record '{}' cannot be renamed to '{}'",
                id,
                working.id()
            ))
            .into());
        }
        if !working.audit().starts_with(slot.record.audit()) {
            return Err(TableError::Rejected(format!(
                "audit trail of record '{}' is append-only",
                id
            ))
            .into());
        }
        if self.options.audit {
            working.append_audit(AuditEntry::new(self.options.clock.now(), description));
        }

        let mut next = (*current).clone();
        next.records.insert(
            id.to_string(),
            Slot {
                seq: slot.seq,
                record: working.clone(),
            },
        );

        self.commit(next, Change::Upsert(&working))?;
        debug!(table = %self.name(), id = %id, "updated record");
        Ok(working)
    }

    /// Deletes a record, returning it.
    pub fn delete(&self, id: &str) -> TableResult<Record> {
        let _writer = self.lock_writer();
        let current = self.current();

        let mut next = (*current).clone();
        let removed = next
            .records
            .remove(id)
            .ok_or_else(|| TableError::NotFound(id.to_string()))?;

        self.commit(next, Change::Remove(id))?;
        debug!(table = %self.name(), id = %id, "deleted record");
        Ok(removed.record)
    }

    /// Lists every record in the requested order.
    pub fn list_all(&self, order: Order) -> Vec<Record> {
        let current = self.current();
        match order {
            Order::ById => current
                .records
                .values()
                .map(|slot| slot.record.clone())
                .collect(),
            Order::Insertion => current.ordered_records(),
            Order::By(compare) => {
                let mut records = current.ordered_records();
                // sort_by is stable: ties keep insertion order.
                records.sort_by(|a, b| compare(a, b));
                records
            }
        }
    }

    fn commit(&self, next: TableState, change: Change<'_>) -> TableResult<()> {
        self.store.persist(&next.ordered_records(), change)?;

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        *state = Arc::new(next);
        Ok(())
    }

    fn current(&self) -> Arc<TableState> {
        Arc::clone(&self.state.read().unwrap_or_else(|e| e.into_inner()))
    }

    // A panicking mutator never reaches the swap, so the state behind a
    // poisoned writer lock is still the last committed one.
    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name())
            .field("records", &self.len())
            .field("audit", &self.options.audit)
            .finish()
    }
}
