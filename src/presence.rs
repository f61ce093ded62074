/// Browser presence events and the serialized loop that feeds them to the tracker
use crate::badge::Badge;
use crate::clock::Clock;
use crate::domain::extract_domain;
use crate::error::QueryError;
use crate::schedule::{Scheduler, Tick};
use crate::store::Store;
use crate::tab_data::{TabId, TabInfo, WindowId};
use crate::tracker::{PauseReason, SessionTracker};
use futures::channel::oneshot;
use futures::{Stream, StreamExt};
use serde::Deserialize;

/// Events raised by the browser, as forwarded by the JS listeners
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BrowserEvent {
    TabActivated { tab_id: TabId },
    TabUpdated { tab_id: TabId, url: String },
    /// `window_id` is absent when every browser window lost focus
    FocusChanged {
        #[serde(default)]
        window_id: Option<WindowId>,
    },
    PopupConnected,
    PopupDisconnected,
    Suspend,
    Startup,
}

/// Everything the tracker reacts to, delivered one at a time
#[derive(Debug)]
pub enum Event {
    Browser(BrowserEvent),
    Tick(Tick),
    /// The popup asks for a time-only flush before it reads the data
    FlushRequested(oneshot::Sender<bool>),
}

/// Asynchronous access to the browser's tabs
#[allow(async_fn_in_trait)]
pub trait TabQuery {
    async fn tab(&self, id: TabId) -> Result<TabInfo, QueryError>;

    /// The active tab of `window`, or of the current window when `None`
    async fn active_tab(&self, window: Option<WindowId>) -> Result<Option<TabInfo>, QueryError>;
}

/// Translates browser events into tracker transitions
pub struct PresenceMonitor<S, C, Sch, B, T>
where
    Sch: Scheduler,
{
    tracker: SessionTracker<S, C, Sch, B>,
    tabs: T,
    popup_connected: bool,
}

impl<S, C, Sch, B, T> PresenceMonitor<S, C, Sch, B, T>
where
    S: Store,
    C: Clock,
    Sch: Scheduler,
    B: Badge,
    T: TabQuery,
{
    pub fn new(tracker: SessionTracker<S, C, Sch, B>, tabs: T) -> Self {
        PresenceMonitor {
            tracker,
            tabs,
            popup_connected: false,
        }
    }

    pub fn tracker(&self) -> &SessionTracker<S, C, Sch, B> {
        &self.tracker
    }

    pub fn popup_connected(&self) -> bool {
        self.popup_connected
    }

    /// Handle events in arrival order, each one to completion
    pub async fn run<E>(mut self, mut events: E)
    where
        E: Stream<Item = Event> + Unpin,
    {
        while let Some(event) = events.next().await {
            self.handle(event).await;
        }
        log::info!("Event queue closed");
    }

    pub async fn handle(&mut self, event: Event) {
        match event {
            Event::Browser(event) => self.handle_browser(event).await,
            Event::Tick(tick) => self.tracker.on_tick(tick).await,
            Event::FlushRequested(ack) => {
                let saved = self.on_flush_requested().await;
                if ack.send(saved).is_err() {
                    log::debug!("Flush requester went away");
                }
            }
        }
    }

    async fn handle_browser(&mut self, event: BrowserEvent) {
        log::debug!("Browser event: {:?}", event);
        match event {
            BrowserEvent::TabActivated { tab_id } => self.on_tab_activated(tab_id).await,
            BrowserEvent::TabUpdated { tab_id, url } => self.on_tab_updated(tab_id, url).await,
            BrowserEvent::FocusChanged { window_id: None } => self.on_focus_lost().await,
            BrowserEvent::FocusChanged {
                window_id: Some(window_id),
            } => self.on_focus_gained(window_id).await,
            BrowserEvent::PopupConnected => self.on_popup_connected().await,
            BrowserEvent::PopupDisconnected => self.on_popup_disconnected().await,
            BrowserEvent::Suspend => {
                log::info!("Browser is closing, saving data...");
                self.tracker.shutdown().await;
            }
            BrowserEvent::Startup => self.on_startup().await,
        }
    }

    /// Switch domains; while the popup is open the new session starts paused
    async fn switch(&mut self, tab: &TabInfo) {
        self.tracker.switch_to(tab).await;
        if self.popup_connected {
            self.tracker.pause(PauseReason::Popup).await;
        }
    }

    async fn on_tab_activated(&mut self, tab_id: TabId) {
        match self.tabs.tab(tab_id).await {
            Ok(tab) => self.switch(&tab).await,
            Err(e) => {
                log::error!("Error getting tab info for {}: {}", tab_id, e);
                self.tracker.stop_badge();
            }
        }
    }

    async fn on_tab_updated(&mut self, tab_id: TabId, url: String) {
        if self.tracker.tab_id() != Some(tab_id) {
            return;
        }
        if extract_domain(&url).as_deref() == self.tracker.domain() {
            return;
        }
        log::debug!("Tab {} navigated to a new domain", tab_id);
        self.switch(&TabInfo::new(tab_id, url)).await;
    }

    async fn on_focus_lost(&mut self) {
        if self.tracker.is_tracking() {
            self.tracker.pause(PauseReason::FocusLost).await;
        }
    }

    async fn on_focus_gained(&mut self, window_id: WindowId) {
        if self.popup_connected {
            return;
        }
        match self.tabs.active_tab(Some(window_id)).await {
            Ok(Some(tab)) => self.tracker.resume(&tab).await,
            Ok(None) => log::debug!("Window {} has no active tab", window_id),
            Err(e) => {
                log::error!("Error handling window focus: {}", e);
                self.tracker.stop_badge();
            }
        }
    }

    async fn on_popup_connected(&mut self) {
        log::info!("Popup connected");
        self.popup_connected = true;
        self.tracker.pause(PauseReason::Popup).await;
    }

    async fn on_popup_disconnected(&mut self) {
        log::info!("Popup disconnected - resuming tracking");
        self.popup_connected = false;
        match self.tabs.active_tab(None).await {
            Ok(Some(tab)) => self.tracker.resume(&tab).await,
            Ok(None) => log::debug!("No active tab after popup closed"),
            Err(e) => {
                log::error!("Error resuming tracking after popup closed: {}", e);
                self.tracker.stop_badge();
            }
        }
    }

    async fn on_flush_requested(&mut self) -> bool {
        let saved = match self.tracker.flush_time().await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Error saving time: {}", e);
                false
            }
        };
        if self.popup_connected {
            self.tracker.pause(PauseReason::Popup).await;
        }
        saved
    }

    async fn on_startup(&mut self) {
        log::info!("Initializing tracker");
        match self.tabs.active_tab(None).await {
            Ok(tab) => self.tracker.start(tab.as_ref()).await,
            Err(e) => {
                log::error!("Error during initialization: {}", e);
                self.tracker.start(None).await;
            }
        }
    }
}
