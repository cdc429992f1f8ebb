//! Request-serving path
//!
//! Every resource follows the same read-through shape: look the cache key
//! up, and on a miss fetch the origin path, extract a typed record, store it
//! with the base TTL and return it. A failed refresh never touches an entry
//! that is already cached.

use futures::future::try_join_all;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

use crate::cache::{CacheHooks, TieredCache};
use crate::config::{Config, ParserConfig};
use crate::error::{Error, Result};
use crate::models::{paginate, Comment, CommentBatch, ListingEntry, ListingKind, Post, UserProfile};
use crate::parser::Extractor;
use crate::upstream::{FetchContext, FetchCoordinator, Origin};

/// Origin body for an unknown user
const NO_SUCH_USER: &str = "No such user.";

/// Origin body for an unknown item
const NO_SUCH_ITEM: &str = "No such item.";

/// Read-through orchestrator over origin, extractor and cache
#[derive(Clone)]
pub struct Gateway {
    origin: Arc<dyn Origin>,
    cache: TieredCache,
    extractor: Extractor,
    page_size: usize,
    upstream_page_size: usize,
    max_page: u32,
}

impl Gateway {
    pub fn new(origin: Arc<dyn Origin>, cache: TieredCache, parser: &ParserConfig) -> Self {
        Self {
            origin,
            cache,
            extractor: Extractor::with_indent_unit(parser.indent_unit),
            page_size: parser.page_size.max(1),
            upstream_page_size: parser.upstream_page_size.max(1),
            max_page: parser.max_page.max(1),
        }
    }

    /// Build the full stack from configuration: fetch coordinator, tiered
    /// cache (probing the remote store once) and extractor
    ///
    /// # Errors
    /// Returns an error if the fetch coordinator cannot be created or the
    /// cache backend settings are unusable.
    pub async fn from_config(config: &Config, hooks: CacheHooks) -> Result<Self> {
        let origin = FetchCoordinator::new(&config.upstream)?;
        let cache = TieredCache::from_config(&config.cache, hooks).await?;
        Ok(Self::new(Arc::new(origin), cache, &config.parser))
    }

    pub fn cache(&self) -> &TieredCache {
        &self.cache
    }

    pub fn max_page(&self) -> u32 {
        self.max_page
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Page `page` (1-based) of a story listing
    ///
    /// Enough upstream pages to cover the window are fetched from the first
    /// one on and concatenated, then the requested window is cut out locally.
    ///
    /// # Errors
    /// `Error::NotFound` for a page beyond the configured maximum, otherwise
    /// whatever the fetch or the extraction reports.
    pub async fn listing(
        &self,
        kind: ListingKind,
        page: u32,
        context: &FetchContext,
    ) -> Result<Vec<ListingEntry>> {
        let page = page.max(1);
        if page > self.max_page {
            return Err(Error::not_found(format!(
                "Page {page} is out of range (max {})",
                self.max_page
            )));
        }

        let key = kind.cache_key(page);
        if let Some(entries) = self.cache.get_as::<Vec<ListingEntry>>(&key).await {
            tracing::debug!(key = %key, "Serving listing from cache");
            return Ok(entries);
        }

        // The coordinator paces these; results come back in page order
        let upstream_pages = self.upstream_pages_for(page);
        let bodies = try_join_all((1..=upstream_pages).map(|p| async move {
            self.origin.fetch(&kind.upstream_path(p), context).await
        }))
        .await?;

        let mut prefix = Vec::with_capacity(self.page_size * page as usize);
        for body in &bodies {
            prefix.extend(self.extractor.extract_listing(body)?);
        }
        let entries = paginate(&prefix, page, self.page_size);

        self.store(&key, &entries).await;

        // Later pages were cut from the old first page; drop them too
        if page == 1 {
            for stale in 2..=self.max_page {
                self.cache.delete(&kind.cache_key(stale)).await;
            }
        }

        Ok(entries)
    }

    /// A post with its comment forest
    ///
    /// # Errors
    /// `Error::NotFound` when the origin has no such item.
    pub async fn post(&self, id: u64, context: &FetchContext) -> Result<Post> {
        let key = format!("post{id}");
        let path = format!("/item?id={id}");
        self.read_through(&key, &path, context, |body| {
            if is_bare_message(body, NO_SUCH_ITEM) {
                return Err(Error::not_found(NO_SUCH_ITEM));
            }
            Ok(self.extractor.extract_post(body)?)
        })
        .await
    }

    /// A continuation page of comments
    ///
    /// # Errors
    /// `ExtractError::ExpiredContent` when the token is no longer valid.
    pub async fn comments(&self, token: &str, context: &FetchContext) -> Result<CommentBatch> {
        if token.is_empty() || !token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::not_found(format!("Invalid comments token: {token}")));
        }

        let key = format!("comments{token}");
        let path = format!("/x?fnid={token}");
        self.read_through(&key, &path, context, |body| {
            Ok(self.extractor.extract_comment_batch(body)?)
        })
        .await
    }

    /// The newest-comments feed
    pub async fn new_comments(&self, context: &FetchContext) -> Result<Vec<Comment>> {
        self.read_through("newcomments", "/newcomments", context, |body| {
            Ok(self.extractor.extract_new_comments(body)?)
        })
        .await
    }

    /// A user profile
    ///
    /// # Errors
    /// `Error::NotFound` for an unknown user.
    pub async fn user(&self, id: &str, context: &FetchContext) -> Result<UserProfile> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(Error::not_found(format!("Invalid user id: {id}")));
        }

        let key = format!("user{id}");
        let path = format!("/user?id={id}");
        self.read_through(&key, &path, context, |body| {
            if is_bare_message(body, NO_SUCH_USER) {
                return Err(Error::not_found(NO_SUCH_USER));
            }
            let profile = self.extractor.extract_user(body)?;
            if profile.id.is_empty() {
                return Err(Error::not_found(NO_SUCH_USER));
            }
            Ok(profile)
        })
        .await
    }

    // ========================================================================
    // Read-through
    // ========================================================================

    async fn read_through<T, F>(
        &self,
        key: &str,
        path: &str,
        context: &FetchContext,
        extract: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&str) -> Result<T>,
    {
        if let Some(value) = self.cache.get_as::<T>(key).await {
            tracing::debug!(key = %key, "Serving from cache");
            return Ok(value);
        }

        let body = self.origin.fetch(path, context).await?;
        let value = extract(&body)?;
        self.store(key, &value).await;
        Ok(value)
    }

    /// Upstream pages holding the first `page * page_size` entries
    fn upstream_pages_for(&self, page: u32) -> u32 {
        let entries = page as usize * self.page_size;
        u32::try_from(entries.div_ceil(self.upstream_page_size).max(1)).unwrap_or(u32::MAX)
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T) {
        self.cache.set_as(key, value, self.cache.base_ttl()).await;
    }
}

/// Plain-text origin answer such as "No such user."
fn is_bare_message(body: &str, message: &str) -> bool {
    body.trim().eq_ignore_ascii_case(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::{ExtractError, FetchError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Origin answering from a fixed table and counting requests per path
    #[derive(Default)]
    struct StubOrigin {
        pages: HashMap<String, std::result::Result<String, FetchError>>,
        calls: Mutex<Vec<String>>,
        down: AtomicBool,
    }

    impl StubOrigin {
        fn with(mut self, path: &str, body: &str) -> Self {
            self.pages.insert(path.to_string(), Ok(body.to_string()));
            self
        }

        fn failing(mut self, path: &str, err: FetchError) -> Self {
            self.pages.insert(path.to_string(), Err(err));
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Origin for StubOrigin {
        async fn fetch(&self, path: &str, _context: &FetchContext) -> std::result::Result<String, FetchError> {
            self.calls.lock().unwrap().push(path.to_string());
            if self.down.load(Ordering::SeqCst) {
                return Err(FetchError::UpstreamTimeout);
            }
            self.pages
                .get(path)
                .cloned()
                .unwrap_or(Err(FetchError::UpstreamStatus(404)))
        }
    }

    fn gateway(origin: Arc<StubOrigin>) -> Gateway {
        let parser = ParserConfig {
            page_size: 2,
            upstream_page_size: 2,
            max_page: 3,
            ..Default::default()
        };
        Gateway::new(origin, TieredCache::memory_only(Duration::from_secs(600)), &parser)
    }

    fn listing_page(ids: &[u64]) -> String {
        let rows: String = ids
            .iter()
            .map(|id| {
                format!(
                    r#"<tr><td class="title"><span class="rank">{id}.</span></td>
                    <td><a id="up_{id}" href="vote?id={id}"></a></td><td class="title"><a href="https://example.com/{id}">Story {id}</a></td></tr>
                    <tr><td class="subtext"><span id="score_{id}">{id} points</span> by
                    <a href="user?id=pg">pg</a> 1 hour ago | <a href="item?id={id}">3 comments</a></td></tr>"#
                )
            })
            .collect();
        format!("<html><body><table><tr><td><table>{rows}</table></td></tr></table></body></html>")
    }

    #[tokio::test]
    async fn test_cache_hit_avoids_refetch() {
        let origin = Arc::new(StubOrigin::default().with(
            "/user?id=pg",
            r#"<form><table><tr><td>user:</td><td>pg</td></tr><tr><td>karma:</td><td>155</td></tr></table></form>"#,
        ));
        let gateway = gateway(Arc::clone(&origin));
        let ctx = FetchContext::default();

        let first = gateway.user("pg", &ctx).await.unwrap();
        let second = gateway.user("pg", &ctx).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.karma, Some(155));
        assert_eq!(origin.calls(), vec!["/user?id=pg".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let origin = Arc::new(StubOrigin::default().with("/user?id=ghost", "No such user."));
        let gateway = gateway(origin);

        let err = gateway.user("ghost", &FetchContext::default()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(gateway.cache().get("userghost").await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_user_id_skips_origin() {
        let origin = Arc::new(StubOrigin::default());
        let gateway = gateway(Arc::clone(&origin));

        let err = gateway.user("a b", &FetchContext::default()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(origin.calls().is_empty());
    }

    #[tokio::test]
    async fn test_expired_continuation() {
        let origin = Arc::new(StubOrigin::default().with("/x?fnid=abc", "Unknown or expired link."));
        let gateway = gateway(origin);

        let err = gateway.comments("abc", &FetchContext::default()).await.unwrap_err();
        assert!(matches!(err, Error::Extract(ExtractError::ExpiredContent(_))));
    }

    #[tokio::test]
    async fn test_listing_fetches_prefix_and_windows() {
        let origin = Arc::new(
            StubOrigin::default()
                .with("/news", &listing_page(&[1, 2]))
                .with("/news?p=2", &listing_page(&[3, 4])),
        );
        let gateway = gateway(Arc::clone(&origin));

        let page = gateway
            .listing(ListingKind::News, 2, &FetchContext::default())
            .await
            .unwrap();

        let ids: Vec<_> = page.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![Some(3), Some(4)]);
        assert_eq!(origin.calls(), vec!["/news".to_string(), "/news?p=2".to_string()]);
        assert!(gateway.cache().get("news:2").await.is_some());
    }

    #[tokio::test]
    async fn test_page_one_refresh_drops_later_pages() {
        let origin = Arc::new(StubOrigin::default().with("/news", &listing_page(&[1, 2])));
        let gateway = gateway(origin);
        let ttl = gateway.cache().base_ttl();
        gateway
            .cache()
            .set("news:2", serde_json::json!([]), ttl)
            .await;

        gateway
            .listing(ListingKind::News, 1, &FetchContext::default())
            .await
            .unwrap();

        assert!(gateway.cache().get("news").await.is_some());
        assert!(gateway.cache().get("news:2").await.is_none());
    }

    #[tokio::test]
    async fn test_page_out_of_range() {
        let gateway = gateway(Arc::new(StubOrigin::default()));
        let err = gateway
            .listing(ListingKind::Ask, 4, &FetchContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_window_spans_several_upstream_pages() {
        let origin = Arc::new(
            StubOrigin::default()
                .with("/news", &listing_page(&[1, 2]))
                .with("/news?p=2", &listing_page(&[3, 4]))
                .with("/news?p=3", &listing_page(&[5, 6])),
        );
        let parser = ParserConfig {
            page_size: 3,
            upstream_page_size: 2,
            max_page: 3,
            ..Default::default()
        };
        let gateway = Gateway::new(
            Arc::clone(&origin) as Arc<dyn Origin>,
            TieredCache::memory_only(Duration::from_secs(600)),
            &parser,
        );
        let ctx = FetchContext::default();

        let first = gateway.listing(ListingKind::News, 1, &ctx).await.unwrap();
        let ids: Vec<_> = first.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(origin.calls(), vec!["/news".to_string(), "/news?p=2".to_string()]);

        let second = gateway.listing(ListingKind::News, 2, &ctx).await.unwrap();
        let ids: Vec<_> = second.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![Some(4), Some(5), Some(6)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_after_expiry_stores_nothing() {
        let story = r#"<html><body><table><tr><td><table class="fatitem">
            <tr class="athing" id="7"><td class="title"><span class="rank"></span></td>
            <td><a id="up_7" href="vote?id=7"></a></td>
            <td class="title"><a href="https://example.com/7">Seven</a></td></tr>
            <tr><td colspan="2"></td><td class="subtext"><span id="score_7">7 points</span> by
            <a href="user?id=pg">pg</a> 1 hour ago | <a href="item?id=7">discuss</a></td></tr>
            </table></td></tr></table></body></html>"#;
        let origin = Arc::new(StubOrigin::default().with("/item?id=7", story));
        let gateway = gateway(Arc::clone(&origin));
        let ctx = FetchContext::default();

        let fresh = gateway.post(7, &ctx).await.unwrap();
        assert!(gateway.cache().get("post7").await.is_some());

        tokio::time::advance(gateway.cache().base_ttl()).await;
        origin.down.store(true, Ordering::SeqCst);

        let err = gateway.post(7, &ctx).await.unwrap_err();
        assert!(matches!(err, Error::Fetch(FetchError::UpstreamTimeout)));
        assert!(gateway.cache().get("post7").await.is_none());

        origin.down.store(false, Ordering::SeqCst);
        assert_eq!(gateway.post(7, &ctx).await.unwrap(), fresh);
        assert_eq!(origin.calls().len(), 3);
    }
}
