use crate::error::ExamError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A multiple-choice question, immutable for the lifetime of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
    pub correct_option: usize,
    pub explanation: String,
    pub section_id: String,
    pub marks: f64,
}

impl Question {
    pub fn validate(&self) -> Result<(), ExamError> {
        let reason = if self.options.len() < 2 {
            Some(format!("needs at least 2 options, has {}", self.options.len()))
        } else if self.correct_option >= self.options.len() {
            Some(format!(
                "correct option {} out of range for {} options",
                self.correct_option,
                self.options.len()
            ))
        } else if self.marks < 0.0 {
            Some(format!("negative marks {}", self.marks))
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ExamError::InvalidQuestion {
                id: self.id.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }

    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_option
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSection {
    pub id: String,
    pub name: String,
    pub question_count: usize,
}

/// Definition of a test paper (metadata plus sections), not a live attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: String,
    pub title: String,
    pub description: String,
    pub exam_type: String,
    /// minutes
    pub duration: u32,
    pub total_questions: usize,
    pub max_marks: f64,
    pub negative_marking: f64,
    pub is_premium: bool,
    pub sections: Vec<ExamSection>,
}

/// Longest exam accepted by [`Exam::validate`], in minutes.
pub const MAX_DURATION_MINUTES: u32 = 24 * 60;

impl Exam {
    pub fn duration_secs(&self) -> u32 {
        self.duration.saturating_mul(60)
    }

    /// Marks awarded per correct answer as advertised on the instructions screen.
    pub fn marks_per_question(&self) -> f64 {
        if self.total_questions == 0 {
            0.0
        } else {
            self.max_marks / self.total_questions as f64
        }
    }

    pub fn section(&self, section_id: &str) -> Option<&ExamSection> {
        self.sections.iter().find(|s| s.id == section_id)
    }

    pub fn validate(&self) -> Result<(), ExamError> {
        let invalid = |reason: String| ExamError::InvalidExam {
            id: self.id.clone(),
            reason,
        };

        if self.duration == 0 {
            return Err(invalid("duration must be positive".to_string()));
        }
        if self.duration > MAX_DURATION_MINUTES {
            return Err(invalid(format!(
                "duration {} exceeds {MAX_DURATION_MINUTES} minutes",
                self.duration
            )));
        }
        if self.sections.is_empty() {
            return Err(invalid("has no sections".to_string()));
        }
        if self.negative_marking < 0.0 {
            return Err(invalid(format!(
                "negative marking must not be below zero, got {}",
                self.negative_marking
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.sections.iter().find(|s| !seen.insert(s.id.as_str())) {
            return Err(invalid(format!("duplicate section id {}", dup.id)));
        }

        let sum: usize = self.sections.iter().map(|s| s.question_count).sum();
        if sum != self.total_questions {
            return Err(invalid(format!(
                "total questions {} does not match section sum {}",
                self.total_questions, sum
            )));
        }

        Ok(())
    }
}

/// Per-question response record within a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    pub selected_option: Option<usize>,
    pub is_marked_for_review: bool,
}

impl Answer {
    pub fn unanswered(question_id: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            selected_option: None,
            is_marked_for_review: false,
        }
    }

    pub fn is_answered(&self) -> bool {
        self.selected_option.is_some()
    }

    pub fn status(&self) -> QuestionStatus {
        QuestionStatus::of(self)
    }
}

/// Palette status of a question, always derived from its [`Answer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionStatus {
    #[strum(serialize = "Not Answered")]
    Unanswered,
    #[strum(serialize = "Answered")]
    Answered,
    #[strum(serialize = "Marked for Review")]
    MarkedForReview,
    #[strum(serialize = "Answered & Marked")]
    AnsweredAndMarked,
}

impl QuestionStatus {
    pub fn of(answer: &Answer) -> Self {
        match (answer.selected_option.is_some(), answer.is_marked_for_review) {
            (false, false) => QuestionStatus::Unanswered,
            (false, true) => QuestionStatus::MarkedForReview,
            (true, false) => QuestionStatus::Answered,
            (true, true) => QuestionStatus::AnsweredAndMarked,
        }
    }

    pub const ALL: [QuestionStatus; 4] = [
        QuestionStatus::Answered,
        QuestionStatus::Unanswered,
        QuestionStatus::MarkedForReview,
        QuestionStatus::AnsweredAndMarked,
    ];
}
