use std::fmt;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::ExamError;
use crate::model::{Exam, Question};
use crate::scheduler::{Countdown, TickSource};
use crate::scoring::TestResult;
use crate::session::{Session, TickOutcome, Transition};

type ForcedSubmitHook = Box<dyn FnMut(&TestResult)>;

/// A session together with the countdown that drives it.
///
/// The countdown is armed exactly while the session is running; every
/// phase-changing call re-syncs it before returning.
pub struct Attempt<T: TickSource> {
    session: Session,
    countdown: Countdown<T>,
    on_forced_submit: Option<ForcedSubmitHook>,
}

impl<T: TickSource> fmt::Debug for Attempt<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attempt")
            .field("session", &self.session)
            .field("armed", &self.countdown.is_armed())
            .field("epoch", &self.countdown.epoch())
            .finish()
    }
}

impl<T: TickSource> Attempt<T> {
    pub fn begin(
        exam: Exam,
        questions: Vec<Question>,
        source: T,
        period: Duration,
    ) -> Result<Self, ExamError> {
        let session = Session::start(exam, questions)?;
        let mut attempt = Self {
            session,
            countdown: Countdown::new(source, period),
            on_forced_submit: None,
        };
        attempt.sync_countdown();
        Ok(attempt)
    }

    /// Register the hook run once when the timer forces submission.
    pub fn on_forced_submit(&mut self, hook: impl FnMut(&TestResult) + 'static) {
        self.on_forced_submit = Some(Box::new(hook));
    }

    fn sync_countdown(&mut self) {
        if self.session.is_running() {
            self.countdown.arm();
        } else {
            self.countdown.disarm();
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn countdown(&self) -> &Countdown<T> {
        &self.countdown
    }

    pub fn select_option(&mut self, option: usize) -> Transition {
        self.session.select_option(option)
    }

    pub fn clear_response(&mut self) -> Transition {
        self.session.clear_response()
    }

    pub fn toggle_mark_for_review(&mut self) -> Transition {
        self.session.toggle_mark_for_review()
    }

    pub fn navigate_to(&mut self, index: usize) -> Transition {
        self.session.navigate_to(index)
    }

    pub fn save_and_next(&mut self) -> Transition {
        self.session.save_and_next()
    }

    pub fn previous(&mut self) -> Transition {
        self.session.previous()
    }

    pub fn mark_and_next(&mut self) -> Transition {
        self.session.mark_and_next()
    }

    pub fn pause(&mut self) -> Transition {
        let t = self.session.pause();
        self.sync_countdown();
        t
    }

    pub fn resume(&mut self) -> Transition {
        let t = self.session.resume();
        self.sync_countdown();
        t
    }

    pub fn toggle_pause(&mut self) -> Transition {
        if self.session.is_paused() {
            self.resume()
        } else {
            self.pause()
        }
    }

    pub fn submit(&mut self) -> Transition {
        let t = self.session.submit();
        self.sync_countdown();
        t
    }

    /// Deliver a tick stamped with `epoch`. Ticks from an earlier arming are dropped.
    pub fn on_tick(&mut self, epoch: u64) -> TickOutcome {
        if !self.countdown.accepts(epoch) {
            return TickOutcome::Ignored;
        }

        let outcome = self.session.tick();
        if outcome == TickOutcome::ForcedSubmit {
            self.sync_countdown();
            warn!(exam = %self.session.exam().id, "time's up, test submitted");
            if let (Some(hook), Some(result)) =
                (self.on_forced_submit.as_mut(), self.session.result())
            {
                hook(result);
            }
        }
        outcome
    }

    /// Tick for the current epoch, for drivers without a real tick source.
    pub fn tick(&mut self) -> TickOutcome {
        let epoch = self.countdown.epoch();
        self.on_tick(epoch)
    }

    pub fn result(&self) -> Option<&TestResult> {
        self.session.result()
    }

    /// Tear the attempt down without submitting.
    pub fn abandon(mut self) -> Session {
        info!(exam = %self.session.exam().id, "attempt abandoned");
        self.countdown.disarm();
        self.session
    }
}
