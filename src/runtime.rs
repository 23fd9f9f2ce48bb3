use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExamEvent {
    Key(KeyEvent),
    Resize,
    /// One countdown period elapsed; `epoch` identifies the arming that produced it.
    Tick { epoch: u64 },
    /// Nothing arrived within the poll interval.
    Idle,
}

/// Source of terminal and countdown events
pub trait ExamEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<ExamEvent, RecvTimeoutError>;

    /// Handle for producers (the countdown ticker) feeding the same queue.
    fn sender(&self) -> Sender<ExamEvent>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<ExamEvent>,
    rx: Receiver<ExamEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let reader = tx.clone();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) => {
                    if reader.send(ExamEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if reader.send(ExamEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        });

        Self { tx, rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ExamEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<ExamEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn sender(&self) -> Sender<ExamEvent> {
        self.tx.clone()
    }
}

/// Channel-backed event source for headless drivers and tests
pub struct TestEventSource {
    tx: Sender<ExamEvent>,
    rx: Receiver<ExamEvent>,
}

impl TestEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }
}

impl Default for TestEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ExamEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<ExamEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn sender(&self) -> Sender<ExamEvent> {
        self.tx.clone()
    }
}

/// Runner that hands the application one event at a time
pub struct Runner<E: ExamEventSource> {
    event_source: E,
    poll_interval: Duration,
}

impl<E: ExamEventSource> Runner<E> {
    pub fn new(event_source: E, poll_interval: Duration) -> Self {
        Self {
            event_source,
            poll_interval,
        }
    }

    pub fn sender(&self) -> Sender<ExamEvent> {
        self.event_source.sender()
    }

    /// Blocks up to the poll interval and returns the next event, or Idle on timeout
    pub fn step(&self) -> ExamEvent {
        match self.event_source.recv_timeout(self.poll_interval) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => ExamEvent::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    #[test]
    fn step_returns_idle_on_timeout() {
        let runner = Runner::new(TestEventSource::new(), Duration::from_millis(1));
        assert_eq!(runner.step(), ExamEvent::Idle);
    }

    #[test]
    fn step_passes_through_events() {
        let runner = Runner::new(TestEventSource::new(), Duration::from_millis(10));
        let tx = runner.sender();
        tx.send(ExamEvent::Resize).unwrap();
        tx.send(ExamEvent::Tick { epoch: 3 }).unwrap();
        tx.send(ExamEvent::Key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE)))
            .unwrap();

        assert_eq!(runner.step(), ExamEvent::Resize);
        assert_eq!(runner.step(), ExamEvent::Tick { epoch: 3 });
        match runner.step() {
            ExamEvent::Key(key) => assert_eq!(key.code, KeyCode::Char('a')),
            other => panic!("expected key event, got {other:?}"),
        }
    }
}
