//! Error types for catalog lookups, session construction and sign-in.
//!
//! Rejected session transitions are not errors; see
//! [`crate::session::Rejection`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExamError {
    /// No exam with this id exists in the catalog.
    #[error("exam not found: {0}")]
    ExamNotFound(String),

    /// The catalog has no questions for the exam.
    #[error("no questions available for exam {0}")]
    NoQuestions(String),

    #[error("question not found: {0}")]
    QuestionNotFound(String),

    #[error("section not found: {0}")]
    SectionNotFound(String),

    /// The exam definition breaks one of its invariants.
    #[error("invalid exam {id}: {reason}")]
    InvalidExam { id: String, reason: String },

    #[error("invalid question {id}: {reason}")]
    InvalidQuestion { id: String, reason: String },

    #[error("exam {exam_id} declares {expected} questions but {actual} were supplied")]
    QuestionCountMismatch {
        exam_id: String,
        expected: usize,
        actual: usize,
    },

    #[error("{kind} already exists: {id}")]
    Duplicate { kind: &'static str, id: String },

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is inactive: {0}")]
    AccountInactive(String),

    #[error("administrator access required")]
    Forbidden,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExamError {
    /// Returns `true` when the referenced exam or its questions are missing,
    /// i.e. the caller should leave the session screen rather than retry.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ExamError::ExamNotFound(_)
                | ExamError::NoQuestions(_)
                | ExamError::QuestionNotFound(_)
                | ExamError::SectionNotFound(_)
        )
    }
}
