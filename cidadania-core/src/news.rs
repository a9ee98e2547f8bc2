//! Public news feed: published articles, optionally narrowed by category.

use crate::error::Result;
use crate::model::{Category, NewsArticle};
use crate::notify::{Notification, Notifier};
use crate::store::{decode_rows, Collection, ContentStore, Direction, StoreQuery};
use crate::sync::{ContentEvent, Generation, GenerationCounter, SyncPhase, SyncState};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

/// Message shown when the feed cannot be loaded
pub const NEWS_LOAD_ERROR: &str = "Erro ao carregar notícias";

/// Query published articles, newest first.
///
/// `None` means no category filter. An empty result is not an error.
///
/// # Errors
///
/// Returns an error if the store request fails.
pub async fn fetch_published(
    store: &dyn ContentStore,
    category: Option<Category>,
) -> Result<Vec<NewsArticle>> {
    let mut query = StoreQuery::from(Collection::News)
        .eq("published", true)
        .order_by("created_at", Direction::Descending);

    if let Some(category) = category {
        query = query.eq("category", category.as_str());
    }

    let rows = store.select(&query).await?;
    let mut articles: Vec<NewsArticle> = decode_rows(Collection::News, rows);

    // The store already filtered and ordered; re-check on typed values so the
    // feed invariants hold regardless of backend.
    articles.retain(|a| a.published && category.map_or(true, |c| a.category == c));
    articles.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(articles)
}

struct NewsFeedInner {
    category: Option<Category>,
    state: SyncState<NewsArticle>,
    generations: GenerationCounter,
    closed: bool,
}

/// Stateful news feed backing the home page
pub struct NewsFeed {
    store: Arc<dyn ContentStore>,
    notifier: Arc<dyn Notifier>,
    inner: RwLock<NewsFeedInner>,
    event_tx: broadcast::Sender<ContentEvent>,
}

impl NewsFeed {
    /// Create a new feed in the `Idle` state
    pub fn new(store: Arc<dyn ContentStore>, notifier: Arc<dyn Notifier>) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(64);

        Arc::new(Self {
            store,
            notifier,
            inner: RwLock::new(NewsFeedInner {
                category: None,
                state: SyncState::Idle,
                generations: GenerationCounter::default(),
                closed: false,
            }),
            event_tx,
        })
    }

    /// Subscribe to feed events
    pub fn subscribe(&self) -> broadcast::Receiver<ContentEvent> {
        self.event_tx.subscribe()
    }

    /// Change the category filter and reload.
    ///
    /// Returns the phase after this request settled. If a newer request was
    /// issued meanwhile, this one's result is dropped and the current phase
    /// is returned unchanged.
    pub async fn select_category(&self, category: Option<Category>) -> SyncPhase {
        let Some(generation) = self.begin(category).await else {
            return self.phase().await;
        };

        info!(
            "Fetching news (category: {})",
            category.map_or("all", Category::as_str)
        );
        let outcome = fetch_published(self.store.as_ref(), category).await;
        self.apply(generation, outcome).await
    }

    /// Reload with the current category
    pub async fn refresh(&self) -> SyncPhase {
        let category = self.inner.read().await.category;
        self.select_category(category).await
    }

    /// Stop applying results; late responses are discarded
    pub async fn close(&self) {
        self.inner.write().await.closed = true;
        debug!("News feed closed");
    }

    /// Get a snapshot of the current state
    pub async fn state(&self) -> SyncState<NewsArticle> {
        self.inner.read().await.state.clone()
    }

    /// Get the current phase
    pub async fn phase(&self) -> SyncPhase {
        self.inner.read().await.state.phase()
    }

    /// Get the active category filter
    pub async fn selected_category(&self) -> Option<Category> {
        self.inner.read().await.category
    }

    /// Get the article at `index` in the rendered list
    pub async fn article(&self, index: usize) -> Option<NewsArticle> {
        self.inner.read().await.state.items().get(index).cloned()
    }

    async fn begin(&self, category: Option<Category>) -> Option<Generation> {
        let mut inner = self.inner.write().await;
        if inner.closed {
            debug!("Ignoring category change on closed feed");
            return None;
        }

        inner.category = category;
        inner.state = std::mem::take(&mut inner.state).begin();
        let generation = inner.generations.next();
        let _ = self.event_tx.send(ContentEvent::Loading {
            collection: Collection::News,
        });
        Some(generation)
    }

    async fn apply(&self, generation: Generation, outcome: Result<Vec<NewsArticle>>) -> SyncPhase {
        let mut inner = self.inner.write().await;

        if inner.closed || !inner.generations.is_current(generation) {
            debug!(
                "Discarding stale news response (generation {})",
                generation.value()
            );
            let _ = self.event_tx.send(ContentEvent::StaleDiscarded {
                collection: Collection::News,
                generation: generation.value(),
            });
            return inner.state.phase();
        }

        match outcome {
            Ok(articles) => {
                let count = articles.len();
                info!("Loaded {} news articles", count);
                inner.state = std::mem::take(&mut inner.state).resolve(Ok(articles));
                let _ = self.event_tx.send(ContentEvent::Loaded {
                    collection: Collection::News,
                    count,
                });
            }
            Err(e) => {
                warn!("Error fetching news: {}", e);
                let message = e.to_string();
                inner.state = std::mem::take(&mut inner.state).resolve(Err(message.clone()));
                self.notifier.notify(Notification::error(NEWS_LOAD_ERROR));
                let _ = self.event_tx.send(ContentEvent::Failed {
                    collection: Collection::News,
                    message,
                });
            }
        }

        inner.state.phase()
    }
}
