/// Service-worker side: chrome.* bindings and the tracker event loop

use crate::badge::Badge;
use crate::clock::SystemClock;
use crate::config::TrackerConfig;
use crate::error::{QueryError, StoreError, StoreResult};
use crate::presence::{BrowserEvent, Event, PresenceMonitor, TabQuery};
use crate::schedule::{Scheduler, Tick};
use crate::store::Store;
use crate::tab_data::{TabId, TabInfo, WindowId};
use crate::tracker::SessionTracker;
use futures::channel::{mpsc, oneshot};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};

// Import JS bridge functions
#[wasm_bindgen(module = "/background.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn getTab(tab_id: i32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryActiveTab(window_id: Option<i32>) -> Result<JsValue, JsValue>;

    fn setBadgeText(text: &str);

    fn setBadgeBackgroundColor(color: &str);

    fn registerListeners(on_event: &js_sys::Function, on_flush: &js_sys::Function);
}

// Timers from the worker's global scope
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = setInterval)]
    fn set_interval(handler: &js_sys::Function, timeout: i32) -> JsValue;

    #[wasm_bindgen(js_name = clearInterval)]
    fn clear_interval(id: &JsValue);
}

/// chrome.storage.local
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeStore;

impl Store for ChromeStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let value_js = getStorage(key)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to get storage: {:?}", e)))?;

        if value_js.is_null() || value_js.is_undefined() {
            return Ok(None);
        }

        serde_wasm_bindgen::from_value(value_js)
            .map(Some)
            .map_err(|e| StoreError::Unavailable(format!("Failed to parse storage: {}", e)))
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        let value_js = value
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| StoreError::Unavailable(format!("Failed to serialize: {}", e)))?;

        setStorage(key, value_js)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to save storage: {:?}", e)))
    }
}

/// chrome.tabs
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeTabs;

fn parse_tab(tab_js: JsValue) -> Result<TabInfo, QueryError> {
    serde_wasm_bindgen::from_value(tab_js).map_err(|e| QueryError::Malformed(e.to_string()))
}

impl TabQuery for ChromeTabs {
    async fn tab(&self, id: TabId) -> Result<TabInfo, QueryError> {
        let tab_js = getTab(id)
            .await
            .map_err(|e| QueryError::Failed(format!("{:?}", e)))?;
        parse_tab(tab_js)
    }

    async fn active_tab(&self, window: Option<WindowId>) -> Result<Option<TabInfo>, QueryError> {
        let tab_js = queryActiveTab(window)
            .await
            .map_err(|e| QueryError::Failed(format!("{:?}", e)))?;

        if tab_js.is_null() || tab_js.is_undefined() {
            return Ok(None);
        }
        parse_tab(tab_js).map(Some)
    }
}

/// chrome.action badge
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeBadge;

impl Badge for ChromeBadge {
    fn set_text(&self, text: &str) {
        setBadgeText(text);
    }

    fn set_color(&self, color: &str) {
        setBadgeBackgroundColor(color);
    }
}

/// `setInterval` timers that post ticks onto the event queue
pub struct IntervalScheduler {
    events: mpsc::UnboundedSender<Event>,
}

/// A running `setInterval`; cleared on drop
pub struct BrowserInterval {
    id: JsValue,
    _handler: Closure<dyn FnMut()>,
}

impl Drop for BrowserInterval {
    fn drop(&mut self) {
        clear_interval(&self.id);
    }
}

impl IntervalScheduler {
    pub fn new(events: mpsc::UnboundedSender<Event>) -> Self {
        IntervalScheduler { events }
    }
}

impl Scheduler for IntervalScheduler {
    type Interval = BrowserInterval;

    fn every(&self, period: Duration, tick: Tick) -> BrowserInterval {
        let events = self.events.clone();
        let handler = Closure::wrap(Box::new(move || {
            if events.unbounded_send(Event::Tick(tick)).is_err() {
                log::debug!("Event queue closed, dropping {:?} tick", tick.kind);
            }
        }) as Box<dyn FnMut()>);

        let millis = i32::try_from(period.as_millis()).unwrap_or(i32::MAX);
        let id = set_interval(handler.as_ref().unchecked_ref(), millis);

        BrowserInterval {
            id,
            _handler: handler,
        }
    }
}

/// Hook the chrome.* listeners up to the event queue. Must run during the
/// worker's first turn so no startup events are missed.
fn register_listeners(events: mpsc::UnboundedSender<Event>) {
    let on_event = {
        let events = events.clone();
        Closure::wrap(Box::new(move |event_js: JsValue| {
            match serde_wasm_bindgen::from_value::<BrowserEvent>(event_js) {
                Ok(event) => {
                    if events.unbounded_send(Event::Browser(event)).is_err() {
                        log::warn!("Event queue closed, dropping browser event");
                    }
                }
                Err(e) => log::warn!("Ignoring unrecognized browser event: {}", e),
            }
        }) as Box<dyn FnMut(JsValue)>)
    };

    let on_flush = Closure::wrap(Box::new(move || -> js_sys::Promise {
        let events = events.clone();
        future_to_promise(async move {
            let (ack, response) = oneshot::channel();
            if events.unbounded_send(Event::FlushRequested(ack)).is_err() {
                return Ok(JsValue::FALSE);
            }
            let saved = response.await.unwrap_or(false);
            Ok(JsValue::from_bool(saved))
        })
    }) as Box<dyn FnMut() -> js_sys::Promise>);

    registerListeners(on_event.as_ref().unchecked_ref(), on_flush.as_ref().unchecked_ref());

    // The listeners live as long as the worker
    on_event.forget();
    on_flush.forget();
}

/// Start tracking in the background service worker
pub fn start() {
    let (events, queue) = mpsc::unbounded::<Event>();
    register_listeners(events.clone());

    if events.unbounded_send(Event::Browser(BrowserEvent::Startup)).is_err() {
        log::error!("Event queue closed before startup");
        return;
    }

    spawn_local(async move {
        let config = TrackerConfig::load(&ChromeStore).await;
        log::set_max_level(config.log_level().to_level_filter());

        let tracker = SessionTracker::new(
            ChromeStore,
            SystemClock,
            IntervalScheduler::new(events),
            ChromeBadge,
            &config,
        );
        PresenceMonitor::new(tracker, ChromeTabs).run(queue).await;
    });
}
