//! Announcement and snapshot data structures.

use serde::{Deserialize, Serialize};

/// A single announcement scraped from the notice board.
///
/// Identity is structural: two announcements are the same record iff the
/// title and the (optional) url match exactly. There is no synthetic key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Announcement {
    /// Announcement title text
    pub title: String,

    /// Full URL to the announcement, when the row carried a link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Announcement {
    /// Create an announcement with a title only.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: None,
        }
    }

    /// Create an announcement with a title and link.
    pub fn linked(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: Some(url.into()),
        }
    }
}

/// The full ordered list of announcements known as of the last successful
/// notification.
///
/// Serialized as `{ "news": [...] }`, matching the on-disk state file.
/// A snapshot is only ever replaced wholesale, never merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    /// Announcements in scrape order
    pub news: Vec<Announcement>,
}

impl Snapshot {
    /// Create a snapshot from a list of announcements.
    pub fn new(news: Vec<Announcement>) -> Self {
        Self { news }
    }

    pub fn is_empty(&self) -> bool {
        self.news.is_empty()
    }

    pub fn len(&self) -> usize {
        self.news.len()
    }

    /// Membership test by structural equality.
    pub fn contains(&self, item: &Announcement) -> bool {
        self.news.contains(item)
    }
}
