/// Cancellable recurring timers
use std::time::Duration;

/// Which recurring task a tick belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    DateCheck,
    Badge,
}

/// One firing of a recurring timer
///
/// `epoch` identifies the tracking session that started the timer; ticks
/// from an older epoch are stale and get ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub kind: TimerKind,
    pub epoch: u64,
}

/// Starts recurring timers that deliver `Tick`s back to the tracker's
/// event queue. Dropping the returned handle cancels the timer.
pub trait Scheduler {
    type Interval;

    fn every(&self, period: Duration, tick: Tick) -> Self::Interval;
}
