//! Student registry over a record table

use std::sync::Arc;

use tracing::info;

use super::errors::StudentResult;
use super::grades::{grade_for, GradeBand};
use super::student::{set_mark, EditableField, Student, SubjectMark, SCORE_FIELD};
use crate::table::{Order, Table, TableError};

/// One line of the ranking
#[derive(Debug, Clone, PartialEq)]
pub struct RankedStudent {
    pub student: Student,
    pub band: Option<GradeBand>,
    /// Score equals the best score in the table
    pub top: bool,
}

/// Students keyed by roll number
#[derive(Debug)]
pub struct Students {
    table: Arc<Table>,
}

impl Students {
    pub fn new(table: Arc<Table>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Adds a student. Fails on invalid fields or a taken roll number.
    pub fn add(&self, student: &Student) -> StudentResult<()> {
        self.table.insert(student.to_record()?)?;
        info!(roll = %student.roll_number, "student added");
        Ok(())
    }

    pub fn remove(&self, roll_number: &str) -> StudentResult<Student> {
        let record = self.table.delete(roll_number)?;
        info!(roll = %roll_number, "student removed");
        Student::from_record(&record)
    }

    pub fn find(&self, roll_number: &str) -> StudentResult<Student> {
        Student::from_record(&self.table.find_by_id(roll_number)?)
    }

    /// Changes one field, returning the updated student.
    pub fn edit(
        &self,
        roll_number: &str,
        field: EditableField,
        value: &str,
    ) -> StudentResult<Student> {
        let record = self.table.update(roll_number, |record| -> Result<String, TableError> {
            field.apply(record, value)?;
            Ok(format!("{} updated", field))
        })?;
        info!(roll = %roll_number, field = %field, "student edited");
        Student::from_record(&record)
    }

    /// Adds or replaces one subject mark; the score becomes the average of
    /// all the student's marks.
    pub fn record_mark(&self, roll_number: &str, entry: &SubjectMark) -> StudentResult<Student> {
        let record = self.table.update(roll_number, |record| -> Result<String, TableError> {
            set_mark(record, entry)?;
            Ok(format!("{} mark updated", entry.subject))
        })?;
        info!(roll = %roll_number, subject = %entry.subject, "mark recorded");
        Student::from_record(&record)
    }

    /// All students in the order they were added.
    pub fn list(&self) -> StudentResult<Vec<Student>> {
        self.table
            .list_all(Order::Insertion)
            .iter()
            .map(Student::from_record)
            .collect()
    }

    /// Students by score, best first. Equal scores keep the order they were
    /// added in; students without a score come last. Everyone sharing the
    /// best score is flagged `top`.
    pub fn rank(&self) -> StudentResult<Vec<RankedStudent>> {
        let students = self
            .table
            .list_all(Order::number_descending(SCORE_FIELD))
            .iter()
            .map(Student::from_record)
            .collect::<StudentResult<Vec<_>>>()?;

        let top_score = students.first().and_then(|s| s.score);
        Ok(students
            .into_iter()
            .map(|student| RankedStudent {
                band: student.score.map(grade_for),
                top: top_score.is_some() && student.score == top_score,
                student,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FileStore, Layout};
    use crate::students::StudentError;
    use crate::table::TableOptions;
    use tempfile::TempDir;

    fn students(tmp: &TempDir) -> Students {
        let store = FileStore::open(tmp.path(), "students", Layout::PerTable).unwrap();
        Students::new(Arc::new(Table::open(store, TableOptions::default()).unwrap()))
    }

    fn student(roll: &str, score: Option<f64>) -> Student {
        let s = Student::new(roll, format!("Student {}", roll), "12", "s@school.edu", "0123456789");
        match score {
            Some(score) => s.with_score(score),
            None => s,
        }
    }

    #[test]
    fn test_add_find_remove() {
        let tmp = TempDir::new().unwrap();
        let students = students(&tmp);
        students.add(&student("R1", None)).unwrap();

        assert_eq!(students.find("R1").unwrap().name, "Student R1");
        assert_eq!(students.remove("R1").unwrap().roll_number, "R1");
        assert!(matches!(
            students.find("R1"),
            Err(StudentError::Table(TableError::NotFound(_)))
        ));
    }

    #[test]
    fn test_add_rejects_duplicates_and_bad_fields() {
        let tmp = TempDir::new().unwrap();
        let students = students(&tmp);
        students.add(&student("R1", None)).unwrap();

        assert!(matches!(
            students.add(&student("R1", None)),
            Err(StudentError::Table(TableError::DuplicateId(_)))
        ));

        let mut bad = student("R2", None);
        bad.phone = "12345".to_string();
        assert!(matches!(students.add(&bad), Err(StudentError::Validation(_))));
        assert_eq!(students.len(), 1);
    }

    #[test]
    fn test_edit_records_audit() {
        let tmp = TempDir::new().unwrap();
        let students = students(&tmp);
        students.add(&student("R1", None)).unwrap();

        let edited = students.edit("R1", EditableField::Email, "new@school.edu").unwrap();
        assert_eq!(edited.email, "new@school.edu");

        let record = students.table().find_by_id("R1").unwrap();
        assert_eq!(record.audit()[0].description(), "email updated");
    }

    #[test]
    fn test_invalid_edit_changes_nothing() {
        let tmp = TempDir::new().unwrap();
        let students = students(&tmp);
        students.add(&student("R1", None)).unwrap();

        assert!(students.edit("R1", EditableField::Email, "broken").is_err());
        assert_eq!(students.find("R1").unwrap().email, "s@school.edu");
        assert!(students.table().find_by_id("R1").unwrap().audit().is_empty());
    }

    #[test]
    fn test_rank_is_stable() {
        let tmp = TempDir::new().unwrap();
        let students = students(&tmp);
        students.add(&student("s1", Some(70.0))).unwrap();
        students.add(&student("s2", None)).unwrap();
        students.add(&student("s3", Some(95.0))).unwrap();
        students.add(&student("s4", Some(95.0))).unwrap();

        let ranked: Vec<(String, Option<&str>, bool)> = students
            .rank()
            .unwrap()
            .into_iter()
            .map(|r| (r.student.roll_number, r.band.map(|b| b.letter), r.top))
            .collect();
        assert_eq!(
            ranked,
            vec![
                ("s3".to_string(), Some("A+ (Excellent)"), true),
                ("s4".to_string(), Some("A+ (Excellent)"), true),
                ("s1".to_string(), Some("B (Good)"), false),
                ("s2".to_string(), None, false),
            ]
        );
    }

    #[test]
    fn test_rank_without_scores_has_no_top() {
        let tmp = TempDir::new().unwrap();
        let students = students(&tmp);
        students.add(&student("s1", None)).unwrap();
        assert!(!students.rank().unwrap()[0].top);
    }

    #[test]
    fn test_marks_drive_score_and_rank() {
        let tmp = TempDir::new().unwrap();
        let students = students(&tmp);
        let asha = student("asha", None).with_marks(vec![
            SubjectMark::new("Maths", 95.0),
            SubjectMark::new("English", 85.0),
        ]);
        students.add(&asha).unwrap();
        students.add(&student("ravi", None)).unwrap();

        let ravi = students
            .record_mark("ravi", &SubjectMark::new("Maths", 100.0))
            .unwrap();
        assert_eq!(ravi.score, Some(100.0));
        let ravi = students
            .record_mark("ravi", &SubjectMark::new("English", 80.0))
            .unwrap();
        assert_eq!(ravi.score, Some(90.0));
        assert_eq!(ravi.total(), Some(180.0));

        let record = students.table().find_by_id("ravi").unwrap();
        assert_eq!(record.audit()[1].description(), "English mark updated");

        let ranked = students.rank().unwrap();
        assert_eq!(ranked[0].student.roll_number, "asha");
        assert!(ranked[0].top && ranked[1].top);
        assert_eq!(ranked[1].band.map(|b| b.letter), Some("A+ (Excellent)"));

        assert!(students.edit("ravi", EditableField::Score, "10").is_err());
        assert!(students
            .record_mark("ravi", &SubjectMark::new("English", 120.0))
            .is_err());
        assert_eq!(students.find("ravi").unwrap().score, Some(90.0));
    }

    #[test]
    fn test_list_in_insertion_order() {
        let tmp = TempDir::new().unwrap();
        let students = students(&tmp);
        for roll in ["b", "c", "a"] {
            students.add(&student(roll, None)).unwrap();
        }
        let rolls: Vec<String> = students
            .list()
            .unwrap()
            .into_iter()
            .map(|s| s.roll_number)
            .collect();
        assert_eq!(rolls, vec!["b", "c", "a"]);
    }
}
