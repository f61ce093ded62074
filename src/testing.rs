/// In-memory collaborators for unit tests
use crate::badge::Badge;
use crate::clock::Clock;
use crate::error::{QueryError, StoreError, StoreResult};
use crate::presence::TabQuery;
use crate::schedule::{Scheduler, Tick};
use crate::site_info::SiteInfo;
use crate::store::Store;
use crate::tab_data::{TabId, TabInfo, WindowId};
use chrono::{DateTime, Duration as ChronoDuration, Local, TimeZone};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

pub fn at(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(year, month, day, hour, min, sec).unwrap()
}

#[derive(Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Local>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Local>) -> Self {
        ManualClock {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn advance(&self, seconds: i64) {
        self.now.set(self.now.get() + ChronoDuration::seconds(seconds));
    }

    pub fn advance_millis(&self, millis: i64) {
        self.now.set(self.now.get() + ChronoDuration::milliseconds(millis));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        self.now.get()
    }
}

#[derive(Default)]
struct MemoryInner {
    values: RefCell<HashMap<String, Value>>,
    fail_writes: Cell<bool>,
    fail_reads: Cell<bool>,
    writes: Cell<usize>,
}

/// Shared in-memory store; clones see the same data
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Rc<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn insert(&self, key: &str, value: Value) {
        self.inner.values.borrow_mut().insert(key.to_string(), value);
    }

    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.inner.values.borrow().get(key).cloned()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.set(fail);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.inner.fail_reads.set(fail);
    }

    pub fn write_count(&self) -> usize {
        self.inner.writes.get()
    }

    pub fn site_info(&self) -> SiteInfo {
        self.get_value("siteInfo")
            .map(|value| serde_json::from_value(value).unwrap())
            .unwrap_or_default()
    }
}

impl Store for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        if self.inner.fail_reads.get() {
            return Err(StoreError::Unavailable("read refused".to_string()));
        }
        Ok(self.get_value(key))
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        if self.inner.fail_writes.get() {
            return Err(StoreError::Unavailable("quota exceeded".to_string()));
        }
        self.insert(key, value);
        self.inner.writes.set(self.inner.writes.get() + 1);
        Ok(())
    }
}

struct Scheduled {
    period: Duration,
    tick: Tick,
    active: Rc<Cell<bool>>,
}

/// Records intervals instead of running them; tests fire ticks by hand
#[derive(Clone, Default)]
pub struct ManualScheduler {
    scheduled: Rc<RefCell<Vec<Scheduled>>>,
}

pub struct ManualInterval {
    active: Rc<Cell<bool>>,
}

impl Drop for ManualInterval {
    fn drop(&mut self) {
        self.active.set(false);
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        ManualScheduler::default()
    }

    pub fn active_ticks(&self) -> Vec<Tick> {
        self.scheduled
            .borrow()
            .iter()
            .filter(|s| s.active.get())
            .map(|s| s.tick)
            .collect()
    }

    pub fn active_periods(&self) -> Vec<Duration> {
        self.scheduled
            .borrow()
            .iter()
            .filter(|s| s.active.get())
            .map(|s| s.period)
            .collect()
    }
}

impl Scheduler for ManualScheduler {
    type Interval = ManualInterval;

    fn every(&self, period: Duration, tick: Tick) -> ManualInterval {
        let active = Rc::new(Cell::new(true));
        self.scheduled.borrow_mut().push(Scheduled {
            period,
            tick,
            active: active.clone(),
        });
        ManualInterval { active }
    }
}

#[derive(Clone, Default)]
pub struct RecordingBadge {
    texts: Rc<RefCell<Vec<String>>>,
    color: Rc<RefCell<Option<String>>>,
}

impl RecordingBadge {
    pub fn new() -> Self {
        RecordingBadge::default()
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.borrow().clone()
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts.borrow().last().cloned()
    }

    pub fn last_color(&self) -> Option<String> {
        self.color.borrow().clone()
    }
}

impl Badge for RecordingBadge {
    fn set_text(&self, text: &str) {
        self.texts.borrow_mut().push(text.to_string());
    }

    fn set_color(&self, color: &str) {
        *self.color.borrow_mut() = Some(color.to_string());
    }
}

/// Fake tabs API with a single focused window
#[derive(Clone, Default)]
pub struct FakeTabs {
    tabs: Rc<RefCell<HashMap<TabId, TabInfo>>>,
    active: Rc<RefCell<Option<TabId>>>,
    failing: Rc<Cell<bool>>,
}

impl FakeTabs {
    pub fn new() -> Self {
        FakeTabs::default()
    }

    /// Open `url` in tab `id` and make it the active tab
    pub fn show(&self, id: TabId, url: &str) -> TabInfo {
        let tab = TabInfo::new(id, url);
        self.tabs.borrow_mut().insert(id, tab.clone());
        *self.active.borrow_mut() = Some(id);
        tab
    }

    pub fn fail(&self, failing: bool) {
        self.failing.set(failing);
    }
}

impl TabQuery for FakeTabs {
    async fn tab(&self, id: TabId) -> Result<TabInfo, QueryError> {
        if self.failing.get() {
            return Err(QueryError::Failed("tabs API unavailable".to_string()));
        }
        self.tabs
            .borrow()
            .get(&id)
            .cloned()
            .ok_or_else(|| QueryError::Failed(format!("no tab with id {}", id)))
    }

    async fn active_tab(&self, _window: Option<WindowId>) -> Result<Option<TabInfo>, QueryError> {
        if self.failing.get() {
            return Err(QueryError::Failed("tabs API unavailable".to_string()));
        }
        let active = *self.active.borrow();
        Ok(active.and_then(|id| self.tabs.borrow().get(&id).cloned()))
    }
}
