//! Page-set store: configuration, cache and the active page set
//!
//! Materialized page sets are cached per tag. The active one is a shared
//! `Arc<PageSet>` behind a read-mostly lock, so a resolver holding the old
//! `Arc` finishes against a consistent set while a swap happens.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::PageSetDocument;
use crate::error::{PageSetError, Result};
use crate::library::MusicLibrary;
use crate::page_set::PageSet;

/// One configured page set, as listed by [`PageSetStore::summary`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSetSummary {
    pub tag: String,
    pub name: String,
    pub cached: bool,
    pub active: bool,
}

/// Owner of the page-set configuration and the active page set
pub struct PageSetStore {
    document: RwLock<Arc<PageSetDocument>>,
    library: Arc<dyn MusicLibrary>,
    cache: DashMap<String, Arc<PageSet>>,
    active: RwLock<Arc<PageSet>>,
}

impl PageSetStore {
    /// Load the store and activate `default_tag`, or the first configured tag
    ///
    /// Fails if the initial page set cannot be materialized; there is no
    /// active page set to fall back on yet.
    pub async fn open(
        document: PageSetDocument,
        library: Arc<dyn MusicLibrary>,
        default_tag: Option<&str>,
    ) -> Result<Self> {
        document.validate()?;

        let tag = match default_tag {
            Some(tag) => tag.to_string(),
            None => document
                .first_tag()
                .map(str::to_string)
                .ok_or(PageSetError::Empty)?,
        };
        let definition = document
            .get(&tag)
            .ok_or_else(|| PageSetError::UnknownTag(tag.clone()))?;

        let initial = Arc::new(PageSet::materialize(&tag, definition, library.as_ref()).await?);
        info!(
            "Opened page-set store with {} page sets, active '{}' ({})",
            document.len(),
            initial.name(),
            tag
        );

        let cache = DashMap::new();
        cache.insert(tag, initial.clone());

        Ok(Self {
            document: RwLock::new(Arc::new(document)),
            library,
            cache,
            active: RwLock::new(initial),
        })
    }

    /// The active page set
    pub fn active(&self) -> Arc<PageSet> {
        self.active.read().clone()
    }

    /// Tag of the active page set
    pub fn active_tag(&self) -> String {
        self.active.read().id().to_string()
    }

    /// Make the page set for `tag` active, materializing it if needed
    ///
    /// On any error the previously active page set stays active.
    pub async fn activate(&self, tag: &str) -> Result<Arc<PageSet>> {
        let page_set = self.load(tag).await?;
        *self.active.write() = page_set.clone();
        info!("Activated page set '{}' ({})", page_set.name(), tag);
        Ok(page_set)
    }

    /// Materialized page set for `tag`, from cache when possible
    pub async fn load(&self, tag: &str) -> Result<Arc<PageSet>> {
        if let Some(cached) = self.cache.get(tag) {
            debug!("Page set '{}' served from cache", tag);
            return Ok(cached.clone());
        }

        let document = self.document.read().clone();
        let definition = document
            .get(tag)
            .ok_or_else(|| PageSetError::UnknownTag(tag.to_string()))?;

        let page_set = Arc::new(PageSet::materialize(tag, definition, self.library.as_ref()).await?);
        self.cache.insert(tag.to_string(), page_set.clone());
        Ok(page_set)
    }

    /// Materialize every configured page set into the cache
    ///
    /// Returns the number of page sets loaded; stops at the first failure.
    pub async fn preload(&self) -> Result<usize> {
        let tags = self.tags();
        for tag in &tags {
            self.load(tag).await?;
        }
        Ok(tags.len())
    }

    /// Replace the configuration and rebuild the active page set from it
    ///
    /// The cache is dropped only once the active page set rebuilt cleanly;
    /// otherwise the store keeps the previous configuration.
    pub async fn reload(&self, document: PageSetDocument) -> Result<()> {
        document.validate()?;

        let tag = self.active_tag();
        let definition = document
            .get(&tag)
            .ok_or_else(|| PageSetError::UnknownTag(tag.clone()))?;

        let rebuilt = match PageSet::materialize(&tag, definition, self.library.as_ref()).await {
            Ok(page_set) => Arc::new(page_set),
            Err(e) => {
                warn!("Page-set reload failed, keeping previous configuration: {}", e);
                return Err(e);
            }
        };

        *self.document.write() = Arc::new(document);
        self.cache.clear();
        self.cache.insert(tag.clone(), rebuilt.clone());
        *self.active.write() = rebuilt;
        info!("Reloaded page-set configuration, active '{}'", tag);
        Ok(())
    }

    /// Configured tags, sorted
    pub fn tags(&self) -> Vec<String> {
        self.document.read().tags()
    }

    pub fn is_cached(&self, tag: &str) -> bool {
        self.cache.contains_key(tag)
    }

    /// Every configured page set with its cache and active status
    pub fn summary(&self) -> Vec<PageSetSummary> {
        let document = self.document.read().clone();
        let active = self.active_tag();

        document
            .iter()
            .map(|(tag, definition)| PageSetSummary {
                tag: tag.clone(),
                name: definition.page_set_name.clone(),
                cached: self.is_cached(tag),
                active: *tag == active,
            })
            .collect()
    }
}

impl std::fmt::Debug for PageSetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageSetStore")
            .field("tags", &self.tags())
            .field("cached", &self.cache.len())
            .field("active", &self.active_tag())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{LibraryItem, StaticLibrary};

    const DOCUMENT: &str = r#"{
        "1111": { "page_set_name": "Radio", "sections": [
            { "type": "sonos_favorites", "start_label": 0, "start_list": 0, "end_list": 1 }
        ] },
        "2222": { "page_set_name": "Lists", "sections": [
            { "type": "sonos_playlists", "start_label": 0, "start_list": 0, "end_list": 0 }
        ] }
    }"#;

    fn library() -> Arc<dyn MusicLibrary> {
        Arc::new(
            StaticLibrary::new()
                .with_favorite(LibraryItem::new("KEXP", "uri:kexp"))
                .with_favorite(LibraryItem::new("WFMU", "uri:wfmu"))
                .with_playlist(LibraryItem::new("Jukebox", "uri:jukebox"), vec![]),
        )
    }

    async fn store() -> PageSetStore {
        let document = PageSetDocument::from_json(DOCUMENT).unwrap();
        PageSetStore::open(document, library(), None).await.unwrap()
    }

    #[tokio::test]
    async fn test_open_activates_first_tag() {
        let store = store().await;
        assert_eq!(store.active_tag(), "1111");
        assert_eq!(store.active().name(), "Radio");
        assert!(store.is_cached("1111"));
        assert!(!store.is_cached("2222"));
    }

    #[tokio::test]
    async fn test_open_with_unknown_default_fails() {
        let document = PageSetDocument::from_json(DOCUMENT).unwrap();
        let result = PageSetStore::open(document, library(), Some("9999")).await;
        assert!(matches!(result, Err(PageSetError::UnknownTag(t)) if t == "9999"));
    }

    #[tokio::test]
    async fn test_unknown_tag_keeps_previous_active() {
        let store = store().await;
        let result = store.activate("9999").await;
        assert!(matches!(result, Err(PageSetError::UnknownTag(_))));
        assert_eq!(store.active_tag(), "1111");
    }

    #[tokio::test]
    async fn test_activate_caches() {
        let store = store().await;
        let lists = store.activate("2222").await.unwrap();
        assert_eq!(lists.name(), "Lists");
        assert!(store.is_cached("2222"));

        let again = store.activate("2222").await.unwrap();
        assert!(Arc::ptr_eq(&lists, &again));
    }

    #[tokio::test]
    async fn test_summary() {
        let store = store().await;
        store.activate("2222").await.unwrap();

        let summary = store.summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(
            summary[1],
            PageSetSummary {
                tag: "2222".to_string(),
                name: "Lists".to_string(),
                cached: true,
                active: true,
            }
        );
        assert!(!summary[0].active);
    }

    #[tokio::test]
    async fn test_reload_drops_cache_and_rebuilds_active() {
        let store = store().await;
        store.preload().await.unwrap();
        assert!(store.is_cached("2222"));

        let renamed = DOCUMENT.replace("\"Radio\"", "\"Stations\"");
        store
            .reload(PageSetDocument::from_json(&renamed).unwrap())
            .await
            .unwrap();

        assert_eq!(store.active().name(), "Stations");
        assert!(!store.is_cached("2222"));
    }

    #[tokio::test]
    async fn test_reload_without_active_tag_is_rejected() {
        let store = store().await;
        let document = PageSetDocument::from_json(
            r#"{ "3333": { "page_set_name": "Other", "sections": [] } }"#,
        )
        .unwrap();

        assert!(store.reload(document).await.is_err());
        assert_eq!(store.active().name(), "Radio");
        assert_eq!(store.tags(), vec!["1111".to_string(), "2222".to_string()]);
    }
}
