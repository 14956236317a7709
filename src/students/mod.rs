//! Students
//!
//! Student records with validated contact fields, editable one field at a
//! time, plus subject marks and grading of average scores.

mod errors;
mod grades;
mod registry;
mod student;

pub use errors::{StudentError, StudentResult};
pub use grades::{average, grade_for, GradeBand};
pub use registry::{RankedStudent, Students};
pub use student::{
    mark_field, validate_email, validate_phone, validate_score, validate_subject, EditableField,
    Student, SubjectMark, EMAIL_FIELD, GRADE_FIELD, MARK_PREFIX, NAME_FIELD, PHONE_FIELD,
    SCORE_FIELD, SUBJECTS_FIELD,
};
