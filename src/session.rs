use crate::error::ExamError;
use crate::model::{Answer, Exam, Question, QuestionStatus};
use crate::scoring::{self, TestResult};
use chrono::Local;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    Running,
    Paused,
    Ended,
}

/// Why a transition was refused. The session is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotRunning(Phase),
    NotPaused(Phase),
    AlreadyEnded,
    QuestionOutOfRange { index: usize, len: usize },
    OptionOutOfRange { option: usize, len: usize },
    AtLastQuestion,
    AtFirstQuestion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Transition {
    Applied,
    Rejected(Rejection),
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Delivered to a session that was not running, or a stale tick.
    Ignored,
    Counted,
    /// The countdown hit zero and the session was submitted.
    ForcedSubmit,
}

/// Counts shown in the submit confirmation dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerSummary {
    pub total: usize,
    pub answered: usize,
    pub not_answered: usize,
    pub marked_for_review: usize,
}

/// One user's live attempt at an exam
#[derive(Debug, Clone)]
pub struct Session {
    exam: Exam,
    questions: Vec<Question>,
    answers: Vec<Answer>,
    current: usize,
    remaining_secs: u32,
    phase: Phase,
    result: Option<TestResult>,
}

impl Session {
    pub fn start(exam: Exam, questions: Vec<Question>) -> Result<Self, ExamError> {
        if questions.is_empty() {
            return Err(ExamError::NoQuestions(exam.id.clone()));
        }
        exam.validate()?;
        for question in &questions {
            question.validate()?;
        }
        if questions.len() != exam.total_questions {
            return Err(ExamError::QuestionCountMismatch {
                exam_id: exam.id.clone(),
                expected: exam.total_questions,
                actual: questions.len(),
            });
        }

        let answers = questions.iter().map(|q| Answer::unanswered(&q.id)).collect();
        let remaining_secs = exam.duration_secs();

        info!(
            exam = %exam.id,
            questions = questions.len(),
            remaining_secs,
            "session started"
        );

        Ok(Self {
            exam,
            questions,
            answers,
            current: 0,
            remaining_secs,
            phase: Phase::Running,
            result: None,
        })
    }

    fn reject(&self, op: &'static str, rejection: Rejection) -> Transition {
        debug!(op, ?rejection, phase = %self.phase, "transition rejected");
        Transition::Rejected(rejection)
    }

    fn require_running(&self, op: &'static str) -> Option<Transition> {
        match self.phase {
            Phase::Running => None,
            Phase::Ended => Some(self.reject(op, Rejection::AlreadyEnded)),
            phase => Some(self.reject(op, Rejection::NotRunning(phase))),
        }
    }

    pub fn select_option(&mut self, option: usize) -> Transition {
        if let Some(rejected) = self.require_running("select_option") {
            return rejected;
        }
        let len = self.questions[self.current].options.len();
        if option >= len {
            return self.reject("select_option", Rejection::OptionOutOfRange { option, len });
        }
        self.answers[self.current].selected_option = Some(option);
        Transition::Applied
    }

    pub fn clear_response(&mut self) -> Transition {
        if let Some(rejected) = self.require_running("clear_response") {
            return rejected;
        }
        self.answers[self.current].selected_option = None;
        Transition::Applied
    }

    pub fn toggle_mark_for_review(&mut self) -> Transition {
        if let Some(rejected) = self.require_running("toggle_mark_for_review") {
            return rejected;
        }
        let answer = &mut self.answers[self.current];
        answer.is_marked_for_review = !answer.is_marked_for_review;
        Transition::Applied
    }

    pub fn navigate_to(&mut self, index: usize) -> Transition {
        if let Some(rejected) = self.require_running("navigate_to") {
            return rejected;
        }
        let len = self.questions.len();
        if index >= len {
            return self.reject("navigate_to", Rejection::QuestionOutOfRange { index, len });
        }
        self.current = index;
        Transition::Applied
    }

    /// Advance to the next question. Saving is implicit: the selection is
    /// already recorded, and moving on without one is allowed.
    pub fn save_and_next(&mut self) -> Transition {
        if let Some(rejected) = self.require_running("save_and_next") {
            return rejected;
        }
        if self.current + 1 >= self.questions.len() {
            return self.reject("save_and_next", Rejection::AtLastQuestion);
        }
        self.navigate_to(self.current + 1)
    }

    pub fn previous(&mut self) -> Transition {
        if let Some(rejected) = self.require_running("previous") {
            return rejected;
        }
        if self.current == 0 {
            return self.reject("previous", Rejection::AtFirstQuestion);
        }
        self.navigate_to(self.current - 1)
    }

    /// Mark the current question for review and move on when there is a next one.
    pub fn mark_and_next(&mut self) -> Transition {
        if let Some(rejected) = self.require_running("mark_and_next") {
            return rejected;
        }
        self.answers[self.current].is_marked_for_review = true;
        if self.current + 1 < self.questions.len() {
            self.current += 1;
        }
        Transition::Applied
    }

    /// Idempotent while paused.
    pub fn pause(&mut self) -> Transition {
        match self.phase {
            Phase::Running => {
                self.phase = Phase::Paused;
                info!(exam = %self.exam.id, remaining_secs = self.remaining_secs, "session paused");
                Transition::Applied
            }
            Phase::Paused => Transition::Applied,
            Phase::Ended => self.reject("pause", Rejection::AlreadyEnded),
        }
    }

    pub fn resume(&mut self) -> Transition {
        match self.phase {
            Phase::Paused => {
                self.phase = Phase::Running;
                info!(exam = %self.exam.id, remaining_secs = self.remaining_secs, "session resumed");
                Transition::Applied
            }
            Phase::Ended => self.reject("resume", Rejection::AlreadyEnded),
            phase => self.reject("resume", Rejection::NotPaused(phase)),
        }
    }

    pub fn submit(&mut self) -> Transition {
        self.finish(false)
    }

    fn finish(&mut self, forced: bool) -> Transition {
        if self.phase == Phase::Ended {
            return self.reject("submit", Rejection::AlreadyEnded);
        }

        let scorecard = scoring::score(
            &self.exam,
            &self.questions,
            &self.answers,
            self.elapsed_secs(),
        );
        info!(
            exam = %self.exam.id,
            forced,
            score = scorecard.score,
            max_score = scorecard.max_score,
            correct = scorecard.correct,
            incorrect = scorecard.incorrect,
            unattempted = scorecard.unattempted,
            "session submitted"
        );

        self.result = Some(TestResult {
            exam_id: self.exam.id.clone(),
            scorecard,
            answers: self.answers.clone(),
            forced,
            completed_at: Local::now(),
        });
        self.phase = Phase::Ended;
        Transition::Applied
    }

    /// One second of exam time. Reaching zero submits within this call.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != Phase::Running {
            return TickOutcome::Ignored;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return TickOutcome::Counted;
        }

        warn!(exam = %self.exam.id, "time's up, submitting");
        let _ = self.finish(true);
        TickOutcome::ForcedSubmit
    }

    pub fn exam(&self) -> &Exam {
        &self.exam
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    pub fn current_answer(&self) -> &Answer {
        &self.answers[self.current]
    }

    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn answer(&self, index: usize) -> Option<&Answer> {
        self.answers.get(index)
    }

    pub fn status_of(&self, index: usize) -> Option<QuestionStatus> {
        self.answers.get(index).map(QuestionStatus::of)
    }

    pub fn palette(&self) -> Vec<QuestionStatus> {
        self.answers.iter().map(QuestionStatus::of).collect()
    }

    pub fn summary(&self) -> AnswerSummary {
        let answered = self.answers.iter().filter(|a| a.is_answered()).count();
        AnswerSummary {
            total: self.answers.len(),
            answered,
            not_answered: self.answers.len() - answered,
            marked_for_review: self
                .answers
                .iter()
                .filter(|a| a.is_marked_for_review)
                .count(),
        }
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Exam time consumed so far; paused time is not counted.
    pub fn elapsed_secs(&self) -> u32 {
        self.exam.duration_secs() - self.remaining_secs
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn is_paused(&self) -> bool {
        self.phase == Phase::Paused
    }

    pub fn is_ended(&self) -> bool {
        self.phase == Phase::Ended
    }

    pub fn result(&self) -> Option<&TestResult> {
        self.result.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{exam, question};
    use assert_matches::assert_matches;

    fn session(duration: u32, count: usize) -> Session {
        let e = exam("e", duration, count, 0.5);
        let qs = (0..count)
            .map(|i| question(&format!("q{i}"), "e-s1", i % 4, 2.0))
            .collect();
        Session::start(e, qs).unwrap()
    }

    #[test]
    fn starts_running_at_first_question() {
        let s = session(60, 3);
        assert_eq!(s.phase(), Phase::Running);
        assert_eq!(s.current_index(), 0);
        assert_eq!(s.remaining_secs(), 3600);
        assert!(s.palette().iter().all(|st| *st == QuestionStatus::Unanswered));
        assert!(s.result().is_none());
    }

    #[test]
    fn start_rejects_missing_questions() {
        let err = Session::start(exam("e", 60, 3, 0.0), vec![]).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn start_rejects_count_mismatch() {
        let qs = vec![question("q1", "e-s1", 0, 1.0)];
        let err = Session::start(exam("e", 60, 3, 0.0), qs).unwrap_err();
        assert_matches!(
            err,
            ExamError::QuestionCountMismatch {
                expected: 3,
                actual: 1,
                ..
            }
        );
    }

    #[test]
    fn start_rejects_invalid_exam() {
        let qs = vec![question("q1", "e-s1", 0, 1.0)];
        let err = Session::start(exam("e", 0, 1, 0.0), qs).unwrap_err();
        assert_matches!(err, ExamError::InvalidExam { .. });
    }

    #[test]
    fn every_status_combination() {
        let mut s = session(10, 4);

        let _ = s.navigate_to(1);
        let _ = s.toggle_mark_for_review();
        let _ = s.navigate_to(2);
        let _ = s.select_option(3);
        let _ = s.navigate_to(3);
        let _ = s.select_option(0);
        let _ = s.toggle_mark_for_review();

        assert_eq!(
            s.palette(),
            vec![
                QuestionStatus::Unanswered,
                QuestionStatus::MarkedForReview,
                QuestionStatus::Answered,
                QuestionStatus::AnsweredAndMarked,
            ]
        );
        assert_eq!(s.status_of(4), None);
    }

    #[test]
    fn select_then_clear_keeps_mark() {
        let mut s = session(10, 2);
        assert!(s.toggle_mark_for_review().is_applied());
        assert!(s.select_option(2).is_applied());
        assert!(s.clear_response().is_applied());

        assert_eq!(s.current_answer().selected_option, None);
        assert!(s.current_answer().is_marked_for_review);
    }

    #[test]
    fn select_does_not_advance() {
        let mut s = session(10, 2);
        let _ = s.select_option(1);
        assert_eq!(s.current_index(), 0);
    }

    #[test]
    fn out_of_range_option_is_rejected() {
        let mut s = session(10, 2);
        assert_eq!(
            s.select_option(4),
            Transition::Rejected(Rejection::OptionOutOfRange { option: 4, len: 4 })
        );
        assert_eq!(s.current_answer().selected_option, None);
    }

    #[test]
    fn navigation_leaves_answers_untouched() {
        let mut s = session(10, 3);
        let _ = s.select_option(1);
        let _ = s.toggle_mark_for_review();
        let before = s.answers().to_vec();

        assert!(s.navigate_to(2).is_applied());
        assert!(s.navigate_to(0).is_applied());

        assert_eq!(s.answers(), before.as_slice());
        assert_eq!(s.current_index(), 0);
    }

    #[test]
    fn navigate_out_of_range_is_rejected() {
        let mut s = session(10, 3);
        assert_eq!(
            s.navigate_to(3),
            Transition::Rejected(Rejection::QuestionOutOfRange { index: 3, len: 3 })
        );
        assert_eq!(s.current_index(), 0);
    }

    #[test]
    fn save_and_next_stops_at_last() {
        let mut s = session(10, 2);
        assert!(s.save_and_next().is_applied());
        assert_eq!(s.current_index(), 1);
        assert_eq!(
            s.save_and_next(),
            Transition::Rejected(Rejection::AtLastQuestion)
        );
        assert_eq!(s.current_index(), 1);
    }

    #[test]
    fn previous_stops_at_first() {
        let mut s = session(10, 2);
        assert_eq!(s.previous(), Transition::Rejected(Rejection::AtFirstQuestion));
        let _ = s.navigate_to(1);
        assert!(s.previous().is_applied());
        assert_eq!(s.current_index(), 0);
    }

    #[test]
    fn mark_and_next_sets_mark_and_advances() {
        let mut s = session(10, 2);
        assert!(s.mark_and_next().is_applied());
        assert_eq!(s.current_index(), 1);
        assert_eq!(s.status_of(0), Some(QuestionStatus::MarkedForReview));

        // on the last question it marks in place
        assert!(s.mark_and_next().is_applied());
        assert_eq!(s.current_index(), 1);
        assert!(s.current_answer().is_marked_for_review);
    }

    #[test]
    fn paused_session_rejects_mutations() {
        let mut s = session(10, 2);
        assert!(s.pause().is_applied());
        assert!(s.pause().is_applied());
        assert!(s.is_paused());

        assert_eq!(
            s.select_option(0),
            Transition::Rejected(Rejection::NotRunning(Phase::Paused))
        );
        assert!(!s.navigate_to(1).is_applied());
        assert!(!s.toggle_mark_for_review().is_applied());
        assert_eq!(s.current_answer(), &Answer::unanswered("q0"));

        assert!(s.resume().is_applied());
        assert_eq!(
            s.resume(),
            Transition::Rejected(Rejection::NotPaused(Phase::Running))
        );
    }

    #[test]
    fn ticks_while_paused_are_ignored() {
        let mut s = session(10, 2);
        let _ = s.pause();
        for _ in 0..10 {
            assert_eq!(s.tick(), TickOutcome::Ignored);
        }
        let _ = s.resume();
        assert_eq!(s.remaining_secs(), 600);
    }

    #[test]
    fn forced_submit_happens_once() {
        let mut s = session(1, 1);
        s.remaining_secs = 5;

        let outcomes: Vec<TickOutcome> = (0..7).map(|_| s.tick()).collect();
        let forced = outcomes
            .iter()
            .filter(|o| **o == TickOutcome::ForcedSubmit)
            .count();

        assert_eq!(forced, 1);
        assert_eq!(outcomes[4], TickOutcome::ForcedSubmit);
        assert_eq!(&outcomes[5..], &[TickOutcome::Ignored, TickOutcome::Ignored]);
        assert_eq!(s.remaining_secs(), 0);
        assert!(s.is_ended());
        assert!(s.result().unwrap().forced);

        assert_eq!(
            s.select_option(0),
            Transition::Rejected(Rejection::AlreadyEnded)
        );
        assert_eq!(s.current_answer().selected_option, None);
    }

    #[test]
    fn full_hour_countdown() {
        let mut s = session(60, 1);
        for _ in 0..3599 {
            assert_eq!(s.tick(), TickOutcome::Counted);
        }
        assert_eq!(s.remaining_secs(), 1);
        assert_eq!(s.tick(), TickOutcome::ForcedSubmit);
        assert_eq!(s.remaining_secs(), 0);
        assert_eq!(s.result().unwrap().scorecard.time_taken, 3600);
    }

    #[test]
    fn second_submit_is_a_no_op() {
        let mut s = session(10, 2);
        let _ = s.select_option(0);
        assert!(s.submit().is_applied());
        let first = s.result().cloned();

        assert_eq!(s.submit(), Transition::Rejected(Rejection::AlreadyEnded));
        assert_eq!(s.result().cloned(), first);
        assert!(!s.pause().is_applied());
        assert!(!s.resume().is_applied());
    }

    #[test]
    fn submit_from_paused() {
        let mut s = session(10, 2);
        for _ in 0..30 {
            let _ = s.tick();
        }
        let _ = s.pause();
        assert!(s.submit().is_applied());
        assert!(s.is_ended());
        let result = s.result().unwrap();
        assert!(!result.forced);
        assert_eq!(result.scorecard.time_taken, 30);
    }

    #[test]
    fn summary_counts() {
        let mut s = session(10, 3);
        let _ = s.select_option(1);
        let _ = s.mark_and_next();
        let _ = s.toggle_mark_for_review();

        assert_eq!(
            s.summary(),
            AnswerSummary {
                total: 3,
                answered: 1,
                not_answered: 2,
                marked_for_review: 2,
            }
        );
    }
}
