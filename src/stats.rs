/// Read-side aggregation for the popup: per-domain usage, sorting,
/// chart slices, pagination and duration text
use crate::clock::DayKey;
use crate::site_info::{DayRecord, SiteInfo};
use std::collections::BTreeMap;

/// Time and visits for one domain over the selected range
#[derive(Debug, Clone, PartialEq)]
pub struct SiteUsage {
    pub domain: String,
    pub time: u64,
    pub sessions: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Today,
    Total,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Time,
    Sessions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortKey {
    pub fn toggled(self) -> Self {
        match self {
            SortKey::Time => SortKey::Sessions,
            SortKey::Sessions => SortKey::Time,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::Time => "time",
            SortKey::Sessions => "session",
        }
    }
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ascending",
            SortOrder::Descending => "descending",
        }
    }
}

fn merge_records<'a>(records: impl Iterator<Item = &'a DayRecord>) -> Vec<SiteUsage> {
    let mut combined: BTreeMap<&str, (u64, u64)> = BTreeMap::new();

    for record in records {
        for (domain, seconds) in &record.time {
            combined.entry(domain).or_default().0 += seconds;
        }
        for (domain, sessions) in &record.sessions {
            combined.entry(domain).or_default().1 += sessions;
        }
    }

    combined
        .into_iter()
        .map(|(domain, (time, sessions))| SiteUsage {
            domain: domain.to_string(),
            time,
            sessions,
        })
        .collect()
}

/// Usage for one day. Domains with visits but no time show up with time 0.
pub fn day_usage(info: &SiteInfo, day: &DayKey) -> Vec<SiteUsage> {
    merge_records(info.day(day).into_iter())
}

/// Usage summed over every recorded day
pub fn total_usage(info: &SiteInfo) -> Vec<SiteUsage> {
    merge_records(info.days.values())
}

pub fn usage_for(info: &SiteInfo, category: Category, today: &DayKey) -> Vec<SiteUsage> {
    match category {
        Category::Today => day_usage(info, today),
        Category::Total => total_usage(info),
    }
}

/// Sort by the chosen key; ties fall back to domain name ascending
pub fn sort_usage(usage: &mut [SiteUsage], key: SortKey, order: SortOrder) {
    usage.sort_by(|a, b| {
        let (x, y) = match key {
            SortKey::Time => (a.time, b.time),
            SortKey::Sessions => (a.sessions, b.sessions),
        };
        let ordering = match order {
            SortOrder::Ascending => x.cmp(&y),
            SortOrder::Descending => y.cmp(&x),
        };
        ordering.then_with(|| a.domain.cmp(&b.domain))
    });
}

/// The `n` domains with the most time, for the pie chart
pub fn chart_slices(usage: &[SiteUsage], n: usize) -> Vec<(String, u64)> {
    let mut slices: Vec<(String, u64)> = usage
        .iter()
        .filter(|site| site.time > 0)
        .map(|site| (site.domain.clone(), site.time))
        .collect();

    slices.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    slices.into_iter().take(n).collect()
}

/// Share of each slice in percent, rounded down
pub fn slice_percentages(slices: &[(String, u64)]) -> Vec<u8> {
    let total: u64 = slices.iter().map(|(_, seconds)| seconds).sum();
    slices
        .iter()
        .map(|(_, seconds)| if total == 0 { 0 } else { (seconds * 100 / total) as u8 })
        .collect()
}

/// Human-readable duration: "1 hour 2 minutes 3 seconds"
///
/// Leading zero hours are dropped, and minutes are dropped too when both
/// hours and minutes are zero. Seconds are always shown.
pub fn format_duration(total_seconds: u64) -> String {
    fn unit(value: u64, singular: &str, plural: &str) -> String {
        format!("{} {}", value, if value == 1 { singular } else { plural })
    }

    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(unit(hours, "hour", "hours"));
    }
    if minutes > 0 || hours > 0 {
        parts.push(unit(minutes, "minute", "minutes"));
    }
    parts.push(unit(seconds, "second", "seconds"));

    parts.join(" ")
}

/// Page cursor over a list of items; pages are 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    items_per_page: usize,
    current_page: usize,
    total_pages: usize,
}

impl Paginator {
    pub fn new(items_per_page: usize) -> Self {
        Paginator {
            items_per_page: items_per_page.max(1),
            current_page: 1,
            total_pages: 1,
        }
    }

    /// Recompute the page count, clamping the current page when the list shrank
    pub fn set_len(&mut self, len: usize) {
        self.total_pages = len.div_ceil(self.items_per_page).max(1);
        self.current_page = self.current_page.min(self.total_pages);
    }

    pub fn page<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = ((self.current_page - 1) * self.items_per_page).min(items.len());
        let end = (start + self.items_per_page).min(items.len());
        &items[start..end]
    }

    pub fn previous(&mut self) -> bool {
        if self.current_page > 1 {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }

    pub fn next(&mut self) -> bool {
        if self.current_page < self.total_pages {
            self.current_page += 1;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.current_page = 1;
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn label(&self) -> String {
        format!("{} of {}", self.current_page, self.total_pages)
    }
}
