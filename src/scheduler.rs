//! Countdown scheduling.
//!
//! A [`Countdown`] is armed only while its session is running. Each arm or
//! disarm starts a new epoch, and every tick is stamped with the epoch that
//! produced it, so a tick already sitting in the event queue when `disarm`
//! returns is refused by [`Countdown::accepts`]. Missed ticks (a suspended
//! host, a slow consumer) are never replayed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::runtime::ExamEvent;

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

/// Something that can emit periodic ticks for a given epoch
pub trait TickSource {
    fn start(&mut self, epoch: u64, period: Duration);
    fn stop(&mut self);
}

/// Background thread feeding `ExamEvent::Tick` into the runtime queue
pub struct IntervalTicker {
    tx: Sender<ExamEvent>,
    cancel: Option<Arc<AtomicBool>>,
}

impl IntervalTicker {
    pub fn new(tx: Sender<ExamEvent>) -> Self {
        Self { tx, cancel: None }
    }

    pub fn is_running(&self) -> bool {
        self.cancel.is_some()
    }
}

impl TickSource for IntervalTicker {
    fn start(&mut self, epoch: u64, period: Duration) {
        self.stop();

        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let tx = self.tx.clone();

        thread::spawn(move || loop {
            thread::sleep(period);
            if flag.load(Ordering::Acquire) {
                break;
            }
            if tx.send(ExamEvent::Tick { epoch }).is_err() {
                break;
            }
        });

        self.cancel = Some(cancel);
    }

    fn stop(&mut self) {
        // the thread notices within one period and exits without sending
        if let Some(cancel) = self.cancel.take() {
            cancel.store(true, Ordering::Release);
        }
    }
}

impl Drop for IntervalTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Tick source that never fires on its own; the driver delivers ticks.
#[derive(Debug, Default, Clone)]
pub struct ManualTicker {
    pub starts: usize,
    pub stops: usize,
    pub running: bool,
}

impl TickSource for ManualTicker {
    fn start(&mut self, _epoch: u64, _period: Duration) {
        self.starts += 1;
        self.running = true;
    }

    fn stop(&mut self) {
        self.stops += 1;
        self.running = false;
    }
}

pub struct Countdown<T: TickSource> {
    source: T,
    period: Duration,
    epoch: u64,
    armed: bool,
}

impl<T: TickSource> Countdown<T> {
    pub fn new(source: T, period: Duration) -> Self {
        Self {
            source,
            period,
            epoch: 0,
            armed: false,
        }
    }

    pub fn arm(&mut self) {
        if self.armed {
            return;
        }
        self.epoch += 1;
        self.armed = true;
        self.source.start(self.epoch, self.period);
        debug!(epoch = self.epoch, "countdown armed");
    }

    pub fn disarm(&mut self) {
        if !self.armed {
            return;
        }
        self.epoch += 1;
        self.armed = false;
        self.source.stop();
        debug!(epoch = self.epoch, "countdown disarmed");
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Whether a tick stamped with `epoch` may reach the session.
    pub fn accepts(&self, epoch: u64) -> bool {
        self.armed && epoch == self.epoch
    }

    pub fn source(&self) -> &T {
        &self.source
    }
}

impl<T: TickSource> Drop for Countdown<T> {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn arm_and_disarm_are_idempotent() {
        let mut countdown = Countdown::new(ManualTicker::default(), DEFAULT_PERIOD);
        countdown.arm();
        countdown.arm();
        assert_eq!(countdown.source().starts, 1);
        assert!(countdown.is_armed());

        countdown.disarm();
        countdown.disarm();
        assert_eq!(countdown.source().stops, 1);
        assert!(!countdown.is_armed());
    }

    #[test]
    fn stale_epochs_are_refused() {
        let mut countdown = Countdown::new(ManualTicker::default(), DEFAULT_PERIOD);
        countdown.arm();
        let first = countdown.epoch();
        assert!(countdown.accepts(first));

        countdown.disarm();
        assert!(!countdown.accepts(first));

        countdown.arm();
        assert!(!countdown.accepts(first));
        assert!(countdown.accepts(countdown.epoch()));
    }

    #[test]
    fn interval_ticker_emits_tagged_ticks() {
        let (tx, rx) = mpsc::channel();
        let mut countdown = Countdown::new(IntervalTicker::new(tx), Duration::from_millis(5));
        countdown.arm();
        let epoch = countdown.epoch();

        let ev = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(ev, ExamEvent::Tick { epoch });

        countdown.disarm();
        assert!(!countdown.source().is_running());
        // anything still in flight carries the old epoch
        while let Ok(ExamEvent::Tick { epoch: e }) = rx.recv_timeout(Duration::from_millis(30)) {
            assert!(!countdown.accepts(e));
        }
    }

    #[test]
    fn dropping_the_countdown_stops_the_thread() {
        let (tx, rx) = mpsc::channel();
        {
            let mut countdown =
                Countdown::new(IntervalTicker::new(tx), Duration::from_millis(5));
            countdown.arm();
        }
        // drain whatever was sent before the drop, then the channel closes
        let mut drained = 0;
        while rx.recv_timeout(Duration::from_millis(200)).is_ok() {
            drained += 1;
            assert!(drained < 100, "ticker kept running after drop");
        }
    }
}
