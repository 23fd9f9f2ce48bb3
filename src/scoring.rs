use crate::model::{Answer, Exam, Question};
use chrono::{DateTime, Local};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionScore {
    pub section_id: String,
    pub name: String,
    pub score: f64,
    pub max_score: f64,
    pub correct: usize,
    pub incorrect: usize,
    pub unattempted: usize,
}

impl SectionScore {
    pub fn percentage(&self) -> f64 {
        percentage(self.score, self.max_score)
    }
}

/// Tally of one attempt. Pure data: the same inputs always give the same card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scorecard {
    pub score: f64,
    pub max_score: f64,
    pub correct: usize,
    pub incorrect: usize,
    pub unattempted: usize,
    /// seconds
    pub time_taken: u32,
    pub sections: Vec<SectionScore>,
}

impl Scorecard {
    pub fn percentage(&self) -> f64 {
        percentage(self.score, self.max_score)
    }

    pub fn attempted(&self) -> usize {
        self.correct + self.incorrect
    }

    /// Share of attempted questions answered correctly
    pub fn accuracy(&self) -> f64 {
        percentage(self.correct as f64, self.attempted() as f64)
    }
}

/// Final record of a submitted attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub exam_id: String,
    pub scorecard: Scorecard,
    pub answers: Vec<Answer>,
    pub forced: bool,
    pub completed_at: DateTime<Local>,
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        0.0
    } else {
        (part / whole) * 100.0
    }
}

enum Outcome {
    Correct,
    Incorrect,
    Unattempted,
}

fn outcome(question: &Question, answer: &Answer) -> Outcome {
    match answer.selected_option {
        None => Outcome::Unattempted,
        Some(option) if question.is_correct(option) => Outcome::Correct,
        Some(_) => Outcome::Incorrect,
    }
}

/// Score `answers` (parallel to `questions`) against the exam's marking scheme.
///
/// Correct answers earn the question's marks, wrong answers lose the exam's
/// negative marking, unanswered questions contribute nothing.
pub fn score(exam: &Exam, questions: &[Question], answers: &[Answer], time_taken: u32) -> Scorecard {
    let mut card = Scorecard {
        score: 0.0,
        max_score: 0.0,
        correct: 0,
        incorrect: 0,
        unattempted: 0,
        time_taken,
        sections: Vec::new(),
    };

    let mut by_section: HashMap<&str, SectionScore> = HashMap::new();

    for (question, answer) in questions.iter().zip(answers) {
        let section = by_section
            .entry(question.section_id.as_str())
            .or_insert_with(|| SectionScore {
                section_id: question.section_id.clone(),
                name: exam
                    .section(&question.section_id)
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| question.section_id.clone()),
                score: 0.0,
                max_score: 0.0,
                correct: 0,
                incorrect: 0,
                unattempted: 0,
            });

        card.max_score += question.marks;
        section.max_score += question.marks;

        match outcome(question, answer) {
            Outcome::Correct => {
                card.correct += 1;
                card.score += question.marks;
                section.correct += 1;
                section.score += question.marks;
            }
            Outcome::Incorrect => {
                card.incorrect += 1;
                card.score -= exam.negative_marking;
                section.incorrect += 1;
                section.score -= exam.negative_marking;
            }
            Outcome::Unattempted => {
                card.unattempted += 1;
                section.unattempted += 1;
            }
        }
    }

    // keep the exam's section order, unknown sections last
    let order = |id: &str| {
        exam.sections
            .iter()
            .position(|s| s.id == id)
            .unwrap_or(usize::MAX)
    };
    card.sections = by_section
        .into_values()
        .sorted_by(|a, b| {
            order(&a.section_id)
                .cmp(&order(&b.section_id))
                .then_with(|| a.section_id.cmp(&b.section_id))
        })
        .collect();

    card
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{exam, question};
    use crate::model::ExamSection;

    fn answered(id: &str, option: Option<usize>) -> Answer {
        Answer {
            question_id: id.to_string(),
            selected_option: option,
            is_marked_for_review: false,
        }
    }

    #[test]
    fn correct_incorrect_unanswered() {
        let e = exam("e", 1, 3, 0.5);
        let qs = vec![
            question("q1", "e-s1", 0, 2.0),
            question("q2", "e-s1", 1, 2.0),
            question("q3", "e-s1", 2, 2.0),
        ];
        let answers = vec![
            answered("q1", Some(0)),
            answered("q2", Some(3)),
            answered("q3", None),
        ];

        let card = score(&e, &qs, &answers, 42);
        assert_eq!(card.score, 1.5);
        assert_eq!(card.max_score, 6.0);
        assert_eq!(card.correct, 1);
        assert_eq!(card.incorrect, 1);
        assert_eq!(card.unattempted, 1);
        assert_eq!(card.time_taken, 42);
        assert_eq!(card.accuracy(), 50.0);
        assert_eq!(card.percentage(), 25.0);
    }

    #[test]
    fn scoring_is_idempotent() {
        let e = exam("e", 1, 2, 1.0);
        let qs = vec![question("q1", "e-s1", 0, 4.0), question("q2", "e-s1", 1, 4.0)];
        let answers = vec![answered("q1", Some(0)), answered("q2", Some(0))];

        assert_eq!(score(&e, &qs, &answers, 10), score(&e, &qs, &answers, 10));
    }

    #[test]
    fn marked_but_unanswered_counts_as_unattempted() {
        let e = exam("e", 1, 1, 1.0);
        let qs = vec![question("q1", "e-s1", 0, 1.0)];
        let answers = vec![Answer {
            question_id: "q1".into(),
            selected_option: None,
            is_marked_for_review: true,
        }];

        let card = score(&e, &qs, &answers, 0);
        assert_eq!(card.score, 0.0);
        assert_eq!(card.unattempted, 1);
    }

    #[test]
    fn sections_follow_exam_order() {
        let mut e = exam("e", 10, 3, 0.0);
        e.sections = vec![
            ExamSection {
                id: "quant".into(),
                name: "Quantitative Aptitude".into(),
                question_count: 1,
            },
            ExamSection {
                id: "verbal".into(),
                name: "Verbal Ability".into(),
                question_count: 2,
            },
        ];
        let qs = vec![
            question("v1", "verbal", 0, 1.0),
            question("q1", "quant", 0, 1.0),
            question("v2", "verbal", 0, 1.0),
        ];
        let answers = vec![
            answered("v1", Some(0)),
            answered("q1", Some(1)),
            answered("v2", None),
        ];

        let card = score(&e, &qs, &answers, 0);
        let names: Vec<&str> = card.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Quantitative Aptitude", "Verbal Ability"]);
        assert_eq!(card.sections[1].score, 1.0);
        assert_eq!(card.sections[1].max_score, 2.0);
        assert_eq!(card.sections[1].percentage(), 50.0);
        assert_eq!(card.sections[0].incorrect, 1);
    }

    #[test]
    fn empty_percentages_are_zero() {
        let e = exam("e", 1, 0, 0.0);
        let card = score(&e, &[], &[], 0);
        assert_eq!(card.percentage(), 0.0);
        assert_eq!(card.accuracy(), 0.0);
    }
}
