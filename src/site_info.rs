/// Per-day aggregates persisted under the `siteInfo` key
use crate::clock::DayKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Time and visit counts for every domain seen on one day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    #[serde(default)]
    pub time: BTreeMap<String, u64>,
    #[serde(default)]
    pub sessions: BTreeMap<String, u64>,
}

impl DayRecord {
    pub fn add_time(&mut self, domain: &str, seconds: u64) -> u64 {
        let total = self.time.entry(domain.to_string()).or_insert(0);
        *total += seconds;
        *total
    }

    /// Count one more visit. The domain also gets a `time` entry (at 0 if new).
    pub fn add_session(&mut self, domain: &str) -> u64 {
        self.add_sessions(domain, 1)
    }

    pub fn add_sessions(&mut self, domain: &str, visits: u64) -> u64 {
        self.time.entry(domain.to_string()).or_insert(0);
        let count = self.sessions.entry(domain.to_string()).or_insert(0);
        *count += visits;
        *count
    }

    pub fn time_for(&self, domain: &str) -> u64 {
        self.time.get(domain).copied().unwrap_or(0)
    }

    pub fn sessions_for(&self, domain: &str) -> u64 {
        self.sessions.get(domain).copied().unwrap_or(0)
    }
}

/// Every recorded day, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteInfo {
    pub days: BTreeMap<DayKey, DayRecord>,
}

impl SiteInfo {
    pub fn new() -> Self {
        SiteInfo::default()
    }

    pub fn day(&self, day: &DayKey) -> Option<&DayRecord> {
        self.days.get(day)
    }

    pub fn day_mut(&mut self, day: &DayKey) -> &mut DayRecord {
        self.days.entry(day.clone()).or_default()
    }

    pub fn time_for(&self, day: &DayKey, domain: &str) -> u64 {
        self.day(day).map_or(0, |record| record.time_for(domain))
    }

    pub fn sessions_for(&self, day: &DayKey, domain: &str) -> u64 {
        self.day(day).map_or(0, |record| record.sessions_for(domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_time_creates_and_accumulates() {
        let mut record = DayRecord::default();

        assert_eq!(record.add_time("a.com", 30), 30);
        assert_eq!(record.add_time("a.com", 10), 40);
        assert_eq!(record.time_for("a.com"), 40);
        assert_eq!(record.sessions_for("a.com"), 0);
    }

    #[test]
    fn test_first_session_of_the_day_is_one() {
        let mut record = DayRecord::default();

        assert_eq!(record.add_session("a.com"), 1);
        assert_eq!(record.add_session("a.com"), 2);
        assert_eq!(record.time_for("a.com"), 0);
        assert!(record.time.contains_key("a.com"));
    }

    #[test]
    fn test_missing_lookups_are_zero() {
        let info = SiteInfo::new();
        let day = DayKey::from("2024-03-07");

        assert_eq!(info.time_for(&day, "a.com"), 0);
        assert_eq!(info.sessions_for(&day, "a.com"), 0);
        assert!(info.day(&day).is_none());
    }

    #[test]
    fn test_dates_are_sorted() {
        let mut info = SiteInfo::new();
        info.day_mut(&DayKey::from("2024-03-08")).add_time("a.com", 1);
        info.day_mut(&DayKey::from("2024-03-07")).add_time("a.com", 1);

        let dates: Vec<&str> = info.days.keys().map(|d| d.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-07", "2024-03-08"]);
    }

    #[test]
    fn test_serialization_layout() {
        let mut info = SiteInfo::new();
        let record = info.day_mut(&DayKey::from("2024-03-07"));
        record.add_time("a.com", 40);
        record.add_session("a.com");

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["2024-03-07"]["time"]["a.com"], 40);
        assert_eq!(json["2024-03-07"]["sessions"]["a.com"], 1);
    }

    #[test]
    fn test_deserialize_tolerates_missing_maps() {
        let info: SiteInfo = serde_json::from_str(r#"{"2024-03-07": {"time": {"a.com": 5}}}"#).unwrap();
        let day = DayKey::from("2024-03-07");

        assert_eq!(info.time_for(&day, "a.com"), 5);
        assert_eq!(info.sessions_for(&day, "a.com"), 0);
    }
}
