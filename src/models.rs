// Core data structures served by the hnapi gateway

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classification of a story or page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    #[default]
    Link,
    Ask,
    Job,
    /// A comment permalink fetched as if it were a post
    Comment,
}

/// One story row of a listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub id: Option<u64>,
    pub title: String,
    pub url: String,
    pub domain: Option<String>,
    pub points: Option<u32>,
    pub user: Option<String>,
    pub time_ago: String,
    pub comments_count: u32,
    #[serde(rename = "type")]
    pub kind: ItemType,
}

/// A single poll option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollItem {
    pub item: String,
    pub points: Option<u32>,
}

/// A node of the comment forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Comment {
    pub id: Option<u64>,
    /// Zero-based nesting depth
    pub level: u32,
    pub user: String,
    pub time_ago: String,
    /// Partial HTML, paragraph-delimited
    pub content: String,
    pub comments: Vec<Comment>,
}

impl Comment {
    /// Sentinel content for rows without author metadata
    pub const DELETED: &'static str = "[deleted]";

    /// Check whether this comment was deleted upstream
    pub fn is_deleted(&self) -> bool {
        self.content == Self::DELETED
    }

    /// Count this comment and every reply beneath it
    pub fn total_count(&self) -> usize {
        1 + self.comments.iter().map(Comment::total_count).sum::<usize>()
    }
}

/// A story page with its comment forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Post {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub domain: Option<String>,
    pub points: Option<u32>,
    pub user: Option<String>,
    pub time_ago: Option<String>,
    pub comments_count: u32,
    pub content: Option<String>,
    pub poll: Option<Vec<PollItem>>,
    #[serde(rename = "type")]
    pub kind: ItemType,
    pub comments: Vec<Comment>,
    pub more_comments_id: Option<String>,
}

/// A flat page of comments, inline or from a continuation fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CommentBatch {
    pub comments: Vec<Comment>,
    pub more_comments_id: Option<String>,
}

/// A user profile page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UserProfile {
    pub id: String,
    pub created: String,
    pub karma: Option<i64>,
    pub avg: Option<f64>,
    pub about: Option<String>,
}

/// Story listings exposed by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    News,
    Newest,
    Ask,
    Show,
    Jobs,
    Best,
    Active,
    Noobstories,
}

impl ListingKind {
    pub const ALL: [ListingKind; 8] = [
        Self::News,
        Self::Newest,
        Self::Ask,
        Self::Show,
        Self::Jobs,
        Self::Best,
        Self::Active,
        Self::Noobstories,
    ];

    /// Name used both in routes and as the cache key stem
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Newest => "newest",
            Self::Ask => "ask",
            Self::Show => "show",
            Self::Jobs => "jobs",
            Self::Best => "best",
            Self::Active => "active",
            Self::Noobstories => "noobstories",
        }
    }

    /// Upstream path for a 1-based page
    pub fn upstream_path(&self, page: u32) -> String {
        if page <= 1 {
            format!("/{}", self.as_str())
        } else {
            format!("/{}?p={page}", self.as_str())
        }
    }

    /// Cache key of a served page window
    pub fn cache_key(&self, page: u32) -> String {
        if page <= 1 {
            self.as_str().to_string()
        } else {
            format!("{}:{page}", self.as_str())
        }
    }
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown listing: {s}"))
    }
}

/// Cut the 1-based `page` window of `page_size` entries out of a prefix batch.
pub fn paginate<T: Clone>(entries: &[T], page: u32, page_size: usize) -> Vec<T> {
    let page = page.max(1) as usize;
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(entries.len());
    if start >= entries.len() {
        return Vec::new();
    }
    entries[start..end].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_type_serializes_lowercase() {
        let json = serde_json::to_string(&ItemType::Job).unwrap();
        assert_eq!(json, "\"job\"");
    }

    #[test]
    fn test_listing_entry_uses_type_field() {
        let entry = ListingEntry {
            id: Some(1),
            title: "Hello".into(),
            url: "https://example.com".into(),
            domain: Some("example.com".into()),
            points: None,
            user: None,
            time_ago: "1 hour ago".into(),
            comments_count: 0,
            kind: ItemType::Job,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "job");
        assert!(value["user"].is_null());
        assert!(value["points"].is_null());
    }

    #[test]
    fn test_listing_kind_paths_and_keys() {
        assert_eq!(ListingKind::News.upstream_path(1), "/news");
        assert_eq!(ListingKind::News.upstream_path(3), "/news?p=3");
        assert_eq!(ListingKind::Ask.cache_key(1), "ask");
        assert_eq!(ListingKind::Ask.cache_key(2), "ask:2");
        assert_eq!("NOOBSTORIES".parse::<ListingKind>(), Ok(ListingKind::Noobstories));
        assert!("frontpage".parse::<ListingKind>().is_err());
    }

    #[test]
    fn test_paginate_windows() {
        let entries: Vec<u32> = (0..70).collect();
        assert_eq!(paginate(&entries, 1, 30), (0..30).collect::<Vec<_>>());
        assert_eq!(paginate(&entries, 3, 30), (60..70).collect::<Vec<_>>());
        assert!(paginate(&entries, 4, 30).is_empty());
        assert_eq!(paginate(&entries, 0, 30).len(), 30);
    }

    #[test]
    fn test_comment_total_count() {
        let tree = Comment {
            comments: vec![
                Comment::default(),
                Comment {
                    comments: vec![Comment::default()],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert_eq!(tree.total_count(), 4);
    }
}
