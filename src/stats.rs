use serde::Serialize;

use crate::models::{BookStatus, UserBook};

/// Aggregate counts shown on the stats view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStats {
    pub planning: usize,
    pub reading: usize,
    pub finished: usize,
    pub total: usize,
    /// Sum of current pages across all entries.
    pub pages_read: u64,
}

impl LibraryStats {
    pub fn from_entries(entries: &[UserBook]) -> Self {
        let mut stats = Self {
            total: entries.len(),
            ..Self::default()
        };
        for entry in entries {
            match entry.status {
                BookStatus::Planning => stats.planning += 1,
                BookStatus::Reading => stats.reading += 1,
                BookStatus::Finished => stats.finished += 1,
            }
            stats.pages_read += u64::from(entry.current_page);
        }
        stats
    }

    pub fn count(&self, status: BookStatus) -> usize {
        match status {
            BookStatus::Planning => self.planning,
            BookStatus::Reading => self.reading,
            BookStatus::Finished => self.finished,
        }
    }
}
