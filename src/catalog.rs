use include_dir::{include_dir, Dir};
use itertools::Itertools;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use tracing::info;

use crate::error::ExamError;
use crate::model::{Exam, Question};

static DATA_DIR: Dir = include_dir!("src/data");

/// Read-only view of exams and their questions, as consumed by a session
pub trait Catalog {
    fn exams(&self) -> Vec<&Exam>;

    fn exam(&self, id: &str) -> Result<&Exam, ExamError>;

    /// Questions of the exam in display order: section order, then insertion order.
    fn questions(&self, exam_id: &str) -> Result<Vec<Question>, ExamError>;
}

/// Catalog held in memory, with the admin operations on top
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    exams: Vec<Exam>,
    questions: Vec<Question>,
}

fn read_embedded<T: DeserializeOwned>(file_name: &str) -> Result<T, ExamError> {
    let contents = DATA_DIR
        .get_file(file_name)
        .and_then(|f| f.contents_utf8())
        .ok_or_else(|| {
            ExamError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("embedded data file missing: {file_name}"),
            ))
        })?;

    Ok(serde_json::from_str(contents)?)
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bundled sample exams.
    pub fn sample() -> Result<Self, ExamError> {
        let exams: Vec<Exam> = read_embedded("exams.json")?;
        let questions: Vec<Question> = read_embedded("questions.json")?;

        let mut catalog = Self::new();
        for exam in exams {
            catalog.add_exam(exam)?;
        }
        for question in questions {
            catalog.add_question(question)?;
        }
        info!(
            exams = catalog.exams.len(),
            questions = catalog.questions.len(),
            "sample catalog loaded"
        );
        Ok(catalog)
    }

    fn section_owner(&self, section_id: &str) -> Option<&Exam> {
        self.exams.iter().find(|e| e.section(section_id).is_some())
    }

    fn check_sections_unclaimed(&self, exam: &Exam) -> Result<(), ExamError> {
        for section in &exam.sections {
            if let Some(owner) = self.section_owner(&section.id) {
                if owner.id != exam.id {
                    return Err(ExamError::Duplicate {
                        kind: "section",
                        id: section.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn add_exam(&mut self, exam: Exam) -> Result<(), ExamError> {
        exam.validate()?;
        if self.exams.iter().any(|e| e.id == exam.id) {
            return Err(ExamError::Duplicate {
                kind: "exam",
                id: exam.id,
            });
        }
        self.check_sections_unclaimed(&exam)?;
        self.exams.push(exam);
        Ok(())
    }

    /// Replace an exam definition. Questions in sections the new definition
    /// drops are removed with them.
    pub fn update_exam(&mut self, exam: Exam) -> Result<(), ExamError> {
        exam.validate()?;
        self.check_sections_unclaimed(&exam)?;
        let pos = self
            .exams
            .iter()
            .position(|e| e.id == exam.id)
            .ok_or_else(|| ExamError::ExamNotFound(exam.id.clone()))?;

        let kept: HashSet<&str> = exam.sections.iter().map(|s| s.id.as_str()).collect();
        let dropped: HashSet<String> = self.exams[pos]
            .sections
            .iter()
            .filter(|s| !kept.contains(s.id.as_str()))
            .map(|s| s.id.clone())
            .collect();
        self.questions.retain(|q| !dropped.contains(&q.section_id));

        self.exams[pos] = exam;
        Ok(())
    }

    /// Remove an exam and every question in its sections.
    pub fn remove_exam(&mut self, id: &str) -> Result<Exam, ExamError> {
        let pos = self
            .exams
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| ExamError::ExamNotFound(id.to_string()))?;
        let exam = self.exams.remove(pos);
        self.questions
            .retain(|q| exam.section(&q.section_id).is_none());
        info!(exam = %exam.id, "exam removed");
        Ok(exam)
    }

    pub fn add_question(&mut self, question: Question) -> Result<(), ExamError> {
        question.validate()?;
        if self.questions.iter().any(|q| q.id == question.id) {
            return Err(ExamError::Duplicate {
                kind: "question",
                id: question.id,
            });
        }
        if self.section_owner(&question.section_id).is_none() {
            return Err(ExamError::SectionNotFound(question.section_id));
        }
        self.questions.push(question);
        Ok(())
    }

    pub fn update_question(&mut self, question: Question) -> Result<(), ExamError> {
        question.validate()?;
        if self.section_owner(&question.section_id).is_none() {
            return Err(ExamError::SectionNotFound(question.section_id));
        }
        let slot = self
            .questions
            .iter_mut()
            .find(|q| q.id == question.id)
            .ok_or_else(|| ExamError::QuestionNotFound(question.id.clone()))?;
        *slot = question;
        Ok(())
    }

    pub fn remove_question(&mut self, id: &str) -> Result<Question, ExamError> {
        let pos = self
            .questions
            .iter()
            .position(|q| q.id == id)
            .ok_or_else(|| ExamError::QuestionNotFound(id.to_string()))?;
        Ok(self.questions.remove(pos))
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Case-insensitive match on title or description
    pub fn search_exams(&self, term: &str) -> Vec<&Exam> {
        self.filter_exams(term, None)
    }

    /// Exams whose type equals `exam_type` (case-insensitive)
    pub fn exams_of_type(&self, exam_type: &str) -> Vec<&Exam> {
        self.filter_exams("", Some(exam_type))
    }

    /// Search term and optional type filter combined; an empty term matches everything.
    pub fn filter_exams(&self, term: &str, exam_type: Option<&str>) -> Vec<&Exam> {
        let term = term.trim().to_lowercase();
        self.exams
            .iter()
            .filter(|e| {
                term.is_empty()
                    || e.title.to_lowercase().contains(&term)
                    || e.description.to_lowercase().contains(&term)
            })
            .filter(|e| exam_type.map_or(true, |t| e.exam_type.eq_ignore_ascii_case(t)))
            .collect()
    }

    /// Distinct exam types in catalog order
    pub fn exam_types(&self) -> Vec<&str> {
        self.exams.iter().map(|e| e.exam_type.as_str()).unique().collect()
    }

    pub fn search_questions(&self, term: &str) -> Vec<&Question> {
        let term = term.to_lowercase();
        self.questions
            .iter()
            .filter(|q| q.text.to_lowercase().contains(&term))
            .collect()
    }
}

impl Catalog for InMemoryCatalog {
    fn exams(&self) -> Vec<&Exam> {
        self.exams.iter().collect()
    }

    fn exam(&self, id: &str) -> Result<&Exam, ExamError> {
        self.exams
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| ExamError::ExamNotFound(id.to_string()))
    }

    fn questions(&self, exam_id: &str) -> Result<Vec<Question>, ExamError> {
        let exam = self.exam(exam_id)?;
        let questions: Vec<Question> = exam
            .sections
            .iter()
            .flat_map(|section| {
                self.questions
                    .iter()
                    .filter(move |q| q.section_id == section.id)
                    .cloned()
            })
            .collect();

        if questions.is_empty() {
            return Err(ExamError::NoQuestions(exam_id.to_string()));
        }
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{exam, question};
    use crate::model::ExamSection;
    use crate::session::Session;
    use assert_matches::assert_matches;

    #[test]
    fn sample_catalog_is_consistent() {
        let catalog = InMemoryCatalog::sample().unwrap();
        assert!(!catalog.exams().is_empty());

        for exam in catalog.exams() {
            let questions = catalog.questions(&exam.id).unwrap();
            assert_eq!(questions.len(), exam.total_questions, "{}", exam.id);
            assert!(Session::start(exam.clone(), questions).is_ok());
        }
    }

    #[test]
    fn questions_follow_section_order() {
        let mut catalog = InMemoryCatalog::new();
        let mut e = exam("e", 5, 2, 0.0);
        e.sections = vec![
            ExamSection {
                id: "a".into(),
                name: "A".into(),
                question_count: 1,
            },
            ExamSection {
                id: "b".into(),
                name: "B".into(),
                question_count: 1,
            },
        ];
        catalog.add_exam(e).unwrap();
        catalog.add_question(question("qb", "b", 0, 1.0)).unwrap();
        catalog.add_question(question("qa", "a", 0, 1.0)).unwrap();

        let ids: Vec<String> = catalog
            .questions("e")
            .unwrap()
            .into_iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(ids, vec!["qa", "qb"]);
    }

    #[test]
    fn missing_exam_and_empty_exam() {
        let mut catalog = InMemoryCatalog::new();
        assert_matches!(catalog.exam("nope"), Err(ExamError::ExamNotFound(_)));

        catalog.add_exam(exam("e", 5, 1, 0.0)).unwrap();
        let err = catalog.questions("e").unwrap_err();
        assert_matches!(err, ExamError::NoQuestions(_));
        assert!(err.is_not_found());
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut catalog = InMemoryCatalog::new();
        catalog.add_exam(exam("e", 5, 1, 0.0)).unwrap();
        assert_matches!(
            catalog.add_exam(exam("e", 5, 1, 0.0)),
            Err(ExamError::Duplicate { kind: "exam", .. })
        );

        let mut other = exam("f", 5, 1, 0.0);
        other.sections[0].id = "e-s1".into();
        assert_matches!(
            catalog.add_exam(other),
            Err(ExamError::Duplicate { kind: "section", .. })
        );

        catalog.add_question(question("q1", "e-s1", 0, 1.0)).unwrap();
        assert_matches!(
            catalog.add_question(question("q1", "e-s1", 0, 1.0)),
            Err(ExamError::Duplicate { kind: "question", .. })
        );
    }

    #[test]
    fn question_needs_known_section() {
        let mut catalog = InMemoryCatalog::new();
        assert_matches!(
            catalog.add_question(question("q1", "ghost", 0, 1.0)),
            Err(ExamError::SectionNotFound(_))
        );
    }

    #[test]
    fn remove_exam_cascades() {
        let mut catalog = InMemoryCatalog::new();
        catalog.add_exam(exam("e", 5, 1, 0.0)).unwrap();
        catalog.add_exam(exam("f", 5, 1, 0.0)).unwrap();
        catalog.add_question(question("q1", "e-s1", 0, 1.0)).unwrap();
        catalog.add_question(question("q2", "f-s1", 0, 1.0)).unwrap();

        let removed = catalog.remove_exam("e").unwrap();
        assert_eq!(removed.id, "e");
        assert!(catalog.question("q1").is_none());
        assert!(catalog.question("q2").is_some());
        assert_matches!(catalog.remove_exam("e"), Err(ExamError::ExamNotFound(_)));
    }

    #[test]
    fn update_exam_and_question() {
        let mut catalog = InMemoryCatalog::new();
        catalog.add_exam(exam("e", 5, 1, 0.0)).unwrap();
        catalog.add_question(question("q1", "e-s1", 0, 1.0)).unwrap();

        let mut longer = exam("e", 30, 1, 0.25);
        longer.title = "Renamed".into();
        catalog.update_exam(longer).unwrap();
        assert_eq!(catalog.exam("e").unwrap().duration, 30);
        assert!(catalog.question("q1").is_some());

        let mut q = question("q1", "e-s1", 2, 3.0);
        q.text = "Edited".into();
        catalog.update_question(q).unwrap();
        assert_eq!(catalog.question("q1").unwrap().correct_option, 2);

        assert_matches!(
            catalog.update_question(question("q9", "e-s1", 0, 1.0)),
            Err(ExamError::QuestionNotFound(_))
        );
        assert_matches!(
            catalog.update_exam(exam("zzz", 5, 1, 0.0)),
            Err(ExamError::ExamNotFound(_))
        );
    }

    #[test]
    fn update_exam_drops_questions_of_removed_sections() {
        let mut catalog = InMemoryCatalog::new();
        catalog.add_exam(exam("e", 5, 1, 0.0)).unwrap();
        catalog.add_question(question("q1", "e-s1", 0, 1.0)).unwrap();

        let mut renamed = exam("e", 5, 1, 0.0);
        renamed.sections[0].id = "e-s2".into();
        catalog.update_exam(renamed).unwrap();

        assert!(catalog.question("q1").is_none());
    }

    #[test]
    fn search() {
        let catalog = InMemoryCatalog::sample().unwrap();
        assert_eq!(catalog.search_exams("JEE")[0].id, "jee-phy-1");
        // description only: "electrostatics" is not in any title
        let hits = catalog.search_exams("Electrostatics");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "jee-phy-1");
        // type alone no longer matches through the search box
        assert!(catalog.search_exams("banking").is_empty());

        assert_eq!(catalog.exam_types(), vec!["SSC", "Banking", "JEE"]);
        let banking = catalog.exams_of_type("banking");
        assert_eq!(banking.len(), 1);
        assert_eq!(banking[0].id, "ibps-po-1");
        assert!(catalog.filter_exams("mechanics", Some("SSC")).is_empty());
        assert_eq!(catalog.filter_exams("  ", None).len(), 3);
        assert!(!catalog.search_questions("kinetic").is_empty());
        assert!(catalog.search_questions("no such words here").is_empty());
    }
}
