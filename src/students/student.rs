//! Student model and field validation

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use super::errors::{StudentError, StudentResult};
use super::grades::average;
use crate::codec::Record;
use crate::validation::{validate_field_name, ValidationError, ValidationResult};

pub const NAME_FIELD: &str = "name";
pub const GRADE_FIELD: &str = "grade";
pub const EMAIL_FIELD: &str = "email";
pub const PHONE_FIELD: &str = "phone";
pub const SCORE_FIELD: &str = "score";
/// Subject names, in the order their marks were first entered
pub const SUBJECTS_FIELD: &str = "subjects";
/// Prefix of the per-subject mark fields (`mark.Maths`)
pub const MARK_PREFIX: &str = "mark.";

/// Field holding the mark for `subject`.
pub fn mark_field(subject: &str) -> String {
    format!("{}{}", MARK_PREFIX, subject)
}

static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
static PHONE: OnceLock<Option<Regex>> = OnceLock::new();

fn pattern_matches(pattern: &'static OnceLock<Option<Regex>>, source: &str, value: &str) -> bool {
    pattern
        .get_or_init(|| Regex::new(source).ok())
        .as_ref()
        .map_or(false, |re| re.is_match(value))
}

fn require_non_empty(label: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        Err(ValidationError::bad_format(format!("{} cannot be empty", label)))
    } else {
        Ok(())
    }
}

pub fn validate_email(email: &str) -> ValidationResult<()> {
    if pattern_matches(&EMAIL, r"^[^\s@]+@[^\s@]+$", email) && email.contains('.') {
        Ok(())
    } else {
        Err(ValidationError::bad_format(
            "invalid email format, include '@' and '.'",
        ))
    }
}

pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    if pattern_matches(&PHONE, r"^[0-9]{10,15}$", phone) {
        Ok(())
    } else {
        Err(ValidationError::bad_format(
            "invalid phone number, enter 10-15 digits",
        ))
    }
}

pub fn validate_score(score: f64) -> ValidationResult<()> {
    if score.is_finite() && (0.0..=100.0).contains(&score) {
        Ok(())
    } else {
        Err(ValidationError::bad_format("score must be between 0 and 100"))
    }
}

pub fn validate_subject(subject: &str) -> ValidationResult<()> {
    require_non_empty("subject", subject)?;
    validate_field_name(&mark_field(subject)).map_err(|_| {
        ValidationError::bad_format(format!(
            "subject '{}' may only use letters, digits, '_', '-' and '.'",
            subject
        ))
    })
}

/// One subject mark out of 100
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectMark {
    pub subject: String,
    pub mark: f64,
}

impl SubjectMark {
    pub fn new(subject: impl Into<String>, mark: f64) -> Self {
        Self {
            subject: subject.into(),
            mark,
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_subject(&self.subject)?;
        if self.mark.is_finite() && (0.0..=100.0).contains(&self.mark) {
            Ok(())
        } else {
            Err(ValidationError::bad_format(format!(
                "mark for {} must be between 0 and 100",
                self.subject
            )))
        }
    }
}

/// Parses `SUBJECT=MARK`.
impl FromStr for SubjectMark {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (subject, mark) = s
            .split_once('=')
            .ok_or_else(|| ValidationError::bad_format("expected SUBJECT=MARK"))?;
        let mark: f64 = mark
            .trim()
            .parse()
            .map_err(|_| ValidationError::bad_format(format!("mark '{}' is not a number", mark)))?;
        let entry = SubjectMark::new(subject.trim(), mark);
        entry.validate()?;
        Ok(entry)
    }
}

/// Adds or replaces one mark on a student record and re-derives its score
/// from every stored mark. Returns the new score.
pub(crate) fn set_mark(record: &mut Record, entry: &SubjectMark) -> ValidationResult<f64> {
    entry.validate()?;

    let mut subjects: Vec<String> = record
        .list(SUBJECTS_FIELD)
        .map(<[String]>::to_vec)
        .unwrap_or_default();
    if !subjects.contains(&entry.subject) {
        subjects.push(entry.subject.clone());
    }
    record.set(&mark_field(&entry.subject), entry.mark)?;

    let marks = subjects
        .iter()
        .map(|subject| {
            record.number(&mark_field(subject)).ok_or_else(|| {
                ValidationError::bad_format(format!("no mark stored for {}", subject))
            })
        })
        .collect::<ValidationResult<Vec<f64>>>()?;
    let score = average(&marks)
        .ok_or_else(|| ValidationError::bad_format("a student needs at least one mark"))?;

    record.set(SUBJECTS_FIELD, subjects)?;
    record.set(SCORE_FIELD, score)?;
    Ok(score)
}

fn has_marks(record: &Record) -> bool {
    record.list(SUBJECTS_FIELD).map_or(false, |s| !s.is_empty())
}

/// A student, keyed by roll number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Student {
    pub roll_number: String,
    pub name: String,
    pub grade: String,
    pub email: String,
    pub phone: String,
    /// Average mark out of 100, once known. Derived from `marks` when
    /// there are any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<SubjectMark>,
}

impl Student {
    pub fn new(
        roll_number: impl Into<String>,
        name: impl Into<String>,
        grade: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            roll_number: roll_number.into(),
            name: name.into(),
            grade: grade.into(),
            email: email.into(),
            phone: phone.into(),
            score: None,
            marks: Vec::new(),
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Sets the subject marks; the score becomes their average.
    pub fn with_marks(mut self, marks: Vec<SubjectMark>) -> Self {
        let values: Vec<f64> = marks.iter().map(|m| m.mark).collect();
        self.score = average(&values);
        self.marks = marks;
        self
    }

    /// Sum of the subject marks
    pub fn total(&self) -> Option<f64> {
        if self.marks.is_empty() {
            None
        } else {
            Some(self.marks.iter().map(|m| m.mark).sum())
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        require_non_empty("roll number", &self.roll_number)?;
        require_non_empty("name", &self.name)?;
        require_non_empty("grade", &self.grade)?;
        validate_email(&self.email)?;
        validate_phone(&self.phone)?;
        if let Some(score) = self.score {
            validate_score(score)?;
        }

        for (i, entry) in self.marks.iter().enumerate() {
            entry.validate()?;
            if self.marks[..i].iter().any(|m| m.subject == entry.subject) {
                return Err(ValidationError::bad_format(format!(
                    "subject {} is listed twice",
                    entry.subject
                )));
            }
        }
        if !self.marks.is_empty() {
            let values: Vec<f64> = self.marks.iter().map(|m| m.mark).collect();
            let derived = average(&values);
            let matches = match (self.score, derived) {
                (Some(score), Some(avg)) => (score - avg).abs() <= 1e-9,
                _ => false,
            };
            if !matches {
                return Err(ValidationError::bad_format(
                    "score must be the average of the subject marks",
                ));
            }
        }
        Ok(())
    }

    pub fn to_record(&self) -> ValidationResult<Record> {
        self.validate()?;
        let mut record = Record::new(self.roll_number.as_str())?
            .with(NAME_FIELD, self.name.as_str())?
            .with(GRADE_FIELD, self.grade.as_str())?
            .with(EMAIL_FIELD, self.email.as_str())?
            .with(PHONE_FIELD, self.phone.as_str())?;
        if let Some(score) = self.score {
            record.set(SCORE_FIELD, score)?;
        }
        if !self.marks.is_empty() {
            let subjects: Vec<String> = self.marks.iter().map(|m| m.subject.clone()).collect();
            record.set(SUBJECTS_FIELD, subjects)?;
            for entry in &self.marks {
                record.set(&mark_field(&entry.subject), entry.mark)?;
            }
        }
        Ok(record)
    }

    pub fn from_record(record: &Record) -> StudentResult<Self> {
        let text = |field: &'static str| {
            record
                .text(field)
                .map(str::to_string)
                .ok_or_else(|| StudentError::MissingField {
                    id: record.id().to_string(),
                    field,
                })
        };

        let marks = record
            .list(SUBJECTS_FIELD)
            .unwrap_or_default()
            .iter()
            .map(|subject| {
                record
                    .number(&mark_field(subject))
                    .map(|mark| SubjectMark::new(subject.as_str(), mark))
                    .ok_or_else(|| StudentError::MissingMark {
                        id: record.id().to_string(),
                        subject: subject.clone(),
                    })
            })
            .collect::<StudentResult<Vec<_>>>()?;

        Ok(Self {
            roll_number: record.id().to_string(),
            name: text(NAME_FIELD)?,
            grade: text(GRADE_FIELD)?,
            email: text(EMAIL_FIELD)?,
            phone: text(PHONE_FIELD)?,
            score: record.number(SCORE_FIELD),
            marks,
        })
    }
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "| {:<15} | {:<12} | {:<6} | {:<25} | {:<12} |",
            self.name, self.roll_number, self.grade, self.email, self.phone
        )
    }
}

/// Fields that can be changed after a student is added
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditableField {
    Name,
    Grade,
    Email,
    Phone,
    Score,
}

impl EditableField {
    pub fn key(&self) -> &'static str {
        match self {
            EditableField::Name => NAME_FIELD,
            EditableField::Grade => GRADE_FIELD,
            EditableField::Email => EMAIL_FIELD,
            EditableField::Phone => PHONE_FIELD,
            EditableField::Score => SCORE_FIELD,
        }
    }

    /// Checks `value` and applies it to `record`.
    pub(crate) fn apply(&self, record: &mut Record, value: &str) -> ValidationResult<()> {
        let value = value.trim();
        match self {
            EditableField::Name | EditableField::Grade => {
                require_non_empty(self.key(), value)?;
                record.set(self.key(), value)?;
            }
            EditableField::Email => {
                validate_email(value)?;
                record.set(self.key(), value)?;
            }
            EditableField::Phone => {
                validate_phone(value)?;
                record.set(self.key(), value)?;
            }
            EditableField::Score => {
                if has_marks(record) {
                    return Err(ValidationError::bad_format(
                        "score is the average of the subject marks; change a mark instead",
                    ));
                }
                let score: f64 = value
                    .parse()
                    .map_err(|_| ValidationError::bad_format("score must be a number"))?;
                validate_score(score)?;
                record.set(self.key(), score)?;
            }
        }
        Ok(())
    }
}

impl FromStr for EditableField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(EditableField::Name),
            "grade" => Ok(EditableField::Grade),
            "email" => Ok(EditableField::Email),
            "phone" => Ok(EditableField::Phone),
            "score" => Ok(EditableField::Score),
            other => Err(ValidationError::bad_format(format!(
                "'{}' is not an editable field (name, grade, email, phone, score)",
                other
            ))),
        }
    }
}

impl fmt::Display for EditableField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
