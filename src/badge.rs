/// Toolbar badge showing today's time on the tracked domain
use crate::config::BadgeConfig;
use crate::schedule::{Scheduler, Tick};
use std::time::Duration;

/// Where badge text ends up (chrome.action in the extension)
pub trait Badge {
    fn set_text(&self, text: &str);

    fn set_color(&self, color: &str);
}

/// Format seconds for the badge: "45s", "12m", "3h"
pub fn format_badge_time(total_seconds: u64) -> String {
    if total_seconds < 60 {
        format!("{}s", total_seconds)
    } else if total_seconds < 3600 {
        format!("{}m", total_seconds / 60)
    } else {
        format!("{}h", total_seconds / 3600)
    }
}

/// Returns true with the given probability
pub fn random_chance(probability: f64) -> bool {
    let mut buf = [0u8; 4];
    if getrandom::getrandom(&mut buf).is_err() {
        return false;
    }
    (u32::from_le_bytes(buf) as f64 / u32::MAX as f64) < probability
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Fast,
    Slow,
}

/// Periodically refreshes the badge while a domain is tracked
///
/// The refresh cadence is fast while the total is under a minute and slow
/// afterwards. Ticks only occasionally re-check the cadence so the interval
/// isn't torn down and recreated on every refresh.
pub struct BadgeAnnotator<B, I> {
    sink: B,
    config: BadgeConfig,
    interval: Option<I>,
    cadence: Cadence,
    paused: bool,
    last_text: Option<String>,
    sampler: fn(f64) -> bool,
}

impl<B: Badge, I> BadgeAnnotator<B, I> {
    pub fn new(sink: B, config: BadgeConfig) -> Self {
        BadgeAnnotator {
            sink,
            config,
            interval: None,
            cadence: Cadence::Fast,
            paused: false,
            last_text: None,
            sampler: random_chance,
        }
    }

    /// Replace the cadence re-check sampler
    pub fn with_sampler(mut self, sampler: fn(f64) -> bool) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn cadence_for(&self, total_seconds: u64) -> Cadence {
        if total_seconds < self.config.slow_after_secs {
            Cadence::Fast
        } else {
            Cadence::Slow
        }
    }

    fn period(&self, cadence: Cadence) -> Duration {
        match cadence {
            Cadence::Fast => self.config.fast_refresh(),
            Cadence::Slow => self.config.slow_refresh(),
        }
    }

    pub fn render(&mut self, total_seconds: u64) {
        let text = format_badge_time(total_seconds);
        self.sink.set_text(&text);
        self.sink.set_color(&self.config.color);
        self.last_text = Some(text);
    }

    /// Show `total_seconds` now and start refreshing on `tick`
    pub fn start<S>(&mut self, total_seconds: u64, scheduler: &S, tick: Tick)
    where
        S: Scheduler<Interval = I>,
    {
        self.stop();
        self.render(total_seconds);

        self.cadence = self.cadence_for(total_seconds);
        let period = self.period(self.cadence);
        log::debug!("Badge refresh every {:?} (total time: {}s)", period, total_seconds);
        self.interval = Some(scheduler.every(period, tick));
    }

    pub fn on_tick<S>(&mut self, total_seconds: u64, scheduler: &S, tick: Tick)
    where
        S: Scheduler<Interval = I>,
    {
        if !self.is_updating() {
            return;
        }

        self.render(total_seconds);

        if !(self.sampler)(self.config.cadence_check_probability) {
            return;
        }

        let cadence = self.cadence_for(total_seconds);
        if cadence != self.cadence {
            let period = self.period(cadence);
            log::debug!(
                "Badge refresh changed to {:?} (total time: {}s)",
                period,
                total_seconds
            );
            self.cadence = cadence;
            self.interval = None;
            self.interval = Some(scheduler.every(period, tick));
        }
    }

    /// Stop refreshing but keep the last value on screen
    pub fn pause(&mut self) {
        self.paused = true;
        self.interval = None;
        log::debug!("Badge updates paused");
    }

    pub fn resume<S>(&mut self, total_seconds: u64, scheduler: &S, tick: Tick)
    where
        S: Scheduler<Interval = I>,
    {
        if !self.paused {
            return;
        }
        self.start(total_seconds, scheduler, tick);
        log::debug!("Badge updates resumed");
    }

    pub fn stop(&mut self) {
        self.paused = false;
        self.interval = None;
    }

    /// Stop refreshing and blank the badge
    pub fn clear(&mut self) {
        self.stop();
        self.sink.set_text("");
        self.last_text = None;
    }

    pub fn is_updating(&self) -> bool {
        self.interval.is_some() && !self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn last_text(&self) -> Option<&str> {
        self.last_text.as_deref()
    }
}
