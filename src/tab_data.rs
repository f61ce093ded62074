/// Browser tab data as delivered by the tabs API
use serde::{Deserialize, Serialize};

pub type TabId = i32;
pub type WindowId = i32;

/// The parts of a browser tab the tracker cares about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: TabId,
    /// Missing when the extension can't see the tab's URL
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub window_id: Option<WindowId>,
}

impl TabInfo {
    pub fn new(id: TabId, url: impl Into<String>) -> TabInfo {
        TabInfo {
            id,
            url: url.into(),
            window_id: None,
        }
    }

    pub fn domain(&self) -> Option<String> {
        crate::domain::extract_domain(&self.url)
    }
}
