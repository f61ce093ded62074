/// Tab-time tracking state machine
///
/// Attributes wall-clock time to exactly one domain at a time. Time is
/// accumulated in memory and committed to the store at every transition:
/// with a visit count when a visit ends (domain switch, suspend) and
/// time-only when tracking merely pauses (popup, focus loss) or the local
/// date rolls over.
use crate::badge::{Badge, BadgeAnnotator};
use crate::clock::{start_of_day, whole_seconds_between, Clock, DayKey};
use crate::config::TrackerConfig;
use crate::error::{StoreResult, TrackerError};
use crate::schedule::{Scheduler, Tick, TimerKind};
use crate::site_info::SiteInfo;
use crate::store::{SiteInfoStore, Store};
use crate::tab_data::{TabId, TabInfo};
use chrono::{DateTime, Duration as ChronoDuration, Local};
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    Popup,
    FocusLost,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Tracking(String),
    Paused(String, PauseReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Tracking,
    Paused(PauseReason),
}

/// The single in-memory session
#[derive(Debug, Clone)]
pub struct TrackingSession {
    pub tab_id: Option<TabId>,
    pub domain: Option<String>,
    /// Last checkpoint; only meaningful while tracking
    pub start_time: DateTime<Local>,
    /// Seconds accrued but not yet committed
    pub accumulated_time: u64,
    pub current_date_key: DayKey,
    /// Seconds of the current visit already committed time-only
    committed_this_visit: u64,
}

impl TrackingSession {
    fn empty(now: DateTime<Local>) -> Self {
        TrackingSession {
            tab_id: None,
            domain: None,
            start_time: now,
            accumulated_time: 0,
            current_date_key: DayKey::of(&now),
            committed_this_visit: 0,
        }
    }
}

/// Visit totals whose write failed, waiting for a retry. At most one per
/// domain and day: later failures are merged into it.
#[derive(Debug, Clone, PartialEq)]
struct PendingCommit {
    domain: String,
    day: DayKey,
    seconds: u64,
    visits: u64,
}

impl PendingCommit {
    async fn apply<S: Store>(&self, store: &SiteInfoStore<S>) -> StoreResult<()> {
        store.add_visits(&self.domain, &self.day, self.seconds, self.visits).await
    }
}

pub struct SessionTracker<S, C, Sch, B>
where
    Sch: Scheduler,
{
    store: SiteInfoStore<S>,
    clock: C,
    scheduler: Sch,
    badge: BadgeAnnotator<B, Sch::Interval>,
    session: TrackingSession,
    phase: Phase,
    date_check: Option<Sch::Interval>,
    date_check_interval: Duration,
    epoch: u64,
    pending: VecDeque<PendingCommit>,
}

impl<S, C, Sch, B> SessionTracker<S, C, Sch, B>
where
    S: Store,
    C: Clock,
    Sch: Scheduler,
    B: Badge,
{
    pub fn new(store: S, clock: C, scheduler: Sch, badge: B, config: &TrackerConfig) -> Self {
        let now = clock.now();
        SessionTracker {
            store: SiteInfoStore::new(store, config.storage_key.clone()),
            clock,
            scheduler,
            badge: BadgeAnnotator::new(badge, config.badge.clone()),
            session: TrackingSession::empty(now),
            phase: Phase::Idle,
            date_check: None,
            date_check_interval: config.date_check_interval(),
            epoch: 0,
            pending: VecDeque::new(),
        }
    }

    pub fn with_badge_sampler(mut self, sampler: fn(f64) -> bool) -> Self {
        self.badge = self.badge.with_sampler(sampler);
        self
    }

    pub fn state(&self) -> TrackerState {
        match (&self.session.domain, self.phase) {
            (Some(domain), Phase::Tracking) => TrackerState::Tracking(domain.clone()),
            (Some(domain), Phase::Paused(reason)) => TrackerState::Paused(domain.clone(), reason),
            _ => TrackerState::Idle,
        }
    }

    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    pub fn domain(&self) -> Option<&str> {
        self.session.domain.as_deref()
    }

    pub fn tab_id(&self) -> Option<TabId> {
        self.session.tab_id
    }

    pub fn is_tracking(&self) -> bool {
        self.phase == Phase::Tracking
    }

    pub fn badge(&self) -> &BadgeAnnotator<B, Sch::Interval> {
        &self.badge
    }

    pub fn store(&self) -> &SiteInfoStore<S> {
        &self.store
    }

    /// Commits that failed at a visit boundary and are waiting for a retry
    pub fn pending_commits(&self) -> usize {
        self.pending.len()
    }

    /// Whole seconds since the last checkpoint; zero unless tracking
    pub fn elapsed_time(&self) -> u64 {
        match self.phase {
            Phase::Tracking => whole_seconds_between(&self.session.start_time, &self.clock.now()),
            _ => 0,
        }
    }

    pub fn current_session_time(&self) -> u64 {
        self.session.accumulated_time + self.elapsed_time()
    }

    /// Today's committed time for the tracked domain plus the live session
    pub async fn total_domain_time(&self) -> StoreResult<u64> {
        let Some(domain) = self.session.domain.as_deref() else {
            return Ok(0);
        };
        let stored = self.store.domain_time(domain, &self.session.current_date_key).await?;
        Ok(stored + self.current_session_time())
    }

    pub async fn site_info(&self) -> StoreResult<SiteInfo> {
        self.store.load().await
    }

    /// Begin tracking from whatever tab is active at startup
    pub async fn start(&mut self, active: Option<&TabInfo>) {
        self.session.current_date_key = self.clock.today();
        match active {
            Some(tab) => self.switch_to(tab).await,
            None => log::info!("No active tab at startup"),
        }
    }

    /// End the current visit and start a new one for `tab`. Another tab on
    /// the same domain continues the visit.
    pub async fn switch_to(&mut self, tab: &TabInfo) {
        let domain = tab.domain();
        if domain.is_some() && domain == self.session.domain {
            self.session.tab_id = Some(tab.id);
            if self.phase == Phase::Paused(PauseReason::FocusLost) {
                self.resume_visit().await;
            }
            log::debug!("Tab {} continues the visit", tab.id);
            return;
        }

        self.end_visit().await;
        self.stop_timers();

        let now = self.clock.now();
        self.session = TrackingSession {
            tab_id: Some(tab.id),
            domain,
            ..TrackingSession::empty(now)
        };

        match self.session.domain.clone() {
            Some(domain) => {
                self.phase = Phase::Tracking;
                self.start_timers().await;
                log::info!("Now tracking tab: {} ({})", tab.id, domain);
            }
            None => {
                self.phase = Phase::Idle;
                self.badge.clear();
                log::info!("Not tracking tab: {} (untrackable URL)", tab.id);
            }
        }
    }

    /// Freeze tracking after committing the time so far. Does not end the visit.
    pub async fn pause(&mut self, reason: PauseReason) {
        match (self.phase, reason) {
            (Phase::Tracking, _) => {}
            (Phase::Paused(PauseReason::FocusLost), PauseReason::Popup) => {
                self.phase = Phase::Paused(PauseReason::Popup);
                self.badge.pause();
                return;
            }
            _ => return,
        }

        if let Err(e) = self.commit_time().await {
            log::warn!("Could not save time before pausing, keeping it in memory: {}", e);
        }
        self.stop_timers();
        self.phase = Phase::Paused(reason);

        match reason {
            PauseReason::Popup => {
                let total = self.badge_total().await;
                self.badge.render(total);
                self.badge.pause();
            }
            PauseReason::FocusLost => self.badge.clear(),
        }
        log::info!("Tracking paused ({:?})", reason);
    }

    /// Continue after a pause with `active` as the focused tab. Returning to
    /// the paused domain keeps the visit; any other domain starts a new one.
    pub async fn resume(&mut self, active: &TabInfo) {
        let domain = active.domain();

        match self.phase {
            Phase::Idle => {
                self.switch_to(active).await;
                return;
            }
            Phase::Tracking => {
                if domain != self.session.domain {
                    self.switch_to(active).await;
                }
                return;
            }
            Phase::Paused(_) if domain != self.session.domain => {
                self.switch_to(active).await;
                return;
            }
            Phase::Paused(_) => {}
        }

        self.session.tab_id = Some(active.id);
        self.resume_visit().await;
    }

    /// Commit accumulated time without counting a visit
    pub async fn flush_time(&mut self) -> Result<(), TrackerError> {
        self.commit_time().await?;
        Ok(())
    }

    /// Final commit and teardown
    pub async fn shutdown(&mut self) {
        self.end_visit().await;
        self.stop_timers();
        self.badge.clear();
        self.phase = Phase::Idle;
        self.session = TrackingSession::empty(self.clock.now());
        if !self.pending.is_empty() {
            log::error!("Shutting down with {} unsaved commits", self.pending.len());
        }
        log::info!("Tracking stopped");
    }

    /// Stop refreshing the badge when the browser state can't be read
    pub fn stop_badge(&mut self) {
        self.badge.stop();
    }

    pub async fn on_tick(&mut self, tick: Tick) {
        if tick.epoch != self.epoch || self.phase != Phase::Tracking {
            log::debug!("Ignoring stale {:?} tick", tick.kind);
            return;
        }

        match tick.kind {
            TimerKind::DateCheck => {
                if self.roll_date_if_needed().await {
                    let total = self.badge_total().await;
                    self.badge.render(total);
                }
            }
            TimerKind::Badge => {
                let total = self.badge_total().await;
                self.badge.on_tick(total, &self.scheduler, tick);
            }
        }
    }

    async fn resume_visit(&mut self) {
        self.session.start_time = self.clock.now();
        self.phase = Phase::Tracking;
        self.roll_date_if_needed().await;
        self.start_timers().await;
        log::info!("Resumed tracking for: {}", self.domain().unwrap_or_default());
    }

    /// Move elapsed whole seconds into the accumulator
    fn checkpoint(&mut self) {
        if self.phase != Phase::Tracking {
            return;
        }
        let elapsed = whole_seconds_between(&self.session.start_time, &self.clock.now());
        self.session.accumulated_time += elapsed;
        self.session.start_time += ChronoDuration::seconds(elapsed as i64);
    }

    /// Time-only flush. The accumulator is cleared only once the write succeeded.
    async fn commit_time(&mut self) -> StoreResult<()> {
        if self.phase == Phase::Tracking {
            self.roll_date_if_needed().await;
        }
        self.checkpoint();
        self.commit_accumulated().await
    }

    async fn commit_accumulated(&mut self) -> StoreResult<()> {
        let Some(domain) = self.session.domain.clone() else {
            return Ok(());
        };

        self.retry_pending().await?;

        let seconds = self.session.accumulated_time;
        self.store
            .flush_time_only(&domain, seconds, &self.session.current_date_key)
            .await?;
        self.session.accumulated_time = 0;
        self.session.committed_this_visit += seconds;
        Ok(())
    }

    /// Commit the rest of the visit with a visit count. A failed write is
    /// queued so a later flush retries it.
    async fn end_visit(&mut self) {
        if self.phase == Phase::Tracking {
            self.roll_date_if_needed().await;
        }
        self.checkpoint();
        let Some(domain) = self.session.domain.clone() else {
            return;
        };

        let seconds = self.session.accumulated_time;
        if seconds == 0 && self.session.committed_this_visit == 0 {
            return;
        }
        let day = self.session.current_date_key.clone();
        self.session.accumulated_time = 0;

        let result = match self.retry_pending().await {
            Ok(()) if seconds > 0 => self.store.flush_with_session(&domain, seconds, &day).await,
            Ok(()) => self.store.record_visit(&domain, &day).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            log::warn!("Could not save visit, will retry: {}", e);
            self.queue(PendingCommit {
                domain,
                day,
                seconds,
                visits: 1,
            });
        }
    }

    fn queue(&mut self, commit: PendingCommit) {
        let queued = self
            .pending
            .iter_mut()
            .find(|queued| queued.domain == commit.domain && queued.day == commit.day);
        match queued {
            Some(queued) => {
                queued.seconds += commit.seconds;
                queued.visits += commit.visits;
            }
            None => self.pending.push_back(commit),
        }
    }

    async fn retry_pending(&mut self) -> StoreResult<()> {
        while let Some(commit) = self.pending.front() {
            commit.apply(&self.store).await?;
            self.pending.pop_front();
        }
        Ok(())
    }

    /// When the local date has moved on, commit the seconds accrued before
    /// midnight to the old day; the rest keeps accruing for the new one.
    /// Returns whether the day changed.
    async fn roll_date_if_needed(&mut self) -> bool {
        let now = self.clock.now();
        let today = DayKey::of(&now);
        if today == self.session.current_date_key {
            return false;
        }

        let midnight = start_of_day(&now);
        if self.phase == Phase::Tracking && self.session.start_time < midnight {
            let before = whole_seconds_between(&self.session.start_time, &midnight);
            self.session.accumulated_time += before;
            self.session.start_time = midnight;
        }

        let previous = self.session.current_date_key.clone();
        if let Err(e) = self.commit_accumulated().await {
            log::warn!("Could not save time for {} before date change: {}", previous, e);
            return false;
        }

        log::info!("Date changed from {} to {}", previous, today);
        self.session.current_date_key = today;
        true
    }

    async fn badge_total(&self) -> u64 {
        match self.total_domain_time().await {
            Ok(total) => total,
            Err(e) => {
                log::warn!("Could not read stored time for badge: {}", e);
                self.current_session_time()
            }
        }
    }

    async fn start_timers(&mut self) {
        self.epoch += 1;
        self.date_check = Some(self.scheduler.every(
            self.date_check_interval,
            Tick {
                kind: TimerKind::DateCheck,
                epoch: self.epoch,
            },
        ));

        let total = self.badge_total().await;
        let tick = Tick {
            kind: TimerKind::Badge,
            epoch: self.epoch,
        };
        if self.badge.is_paused() {
            self.badge.resume(total, &self.scheduler, tick);
        } else {
            self.badge.start(total, &self.scheduler, tick);
        }
    }

    /// Cancel both timers; ticks already queued become stale
    fn stop_timers(&mut self) {
        self.epoch += 1;
        self.date_check = None;
        if !self.badge.is_paused() {
            self.badge.stop();
        }
    }
}
