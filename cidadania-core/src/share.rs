//! Shareable links for news articles.

use crate::error::Result;
use crate::model::NewsArticle;
use crate::notify::{Notification, Notifier};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Message shown after the link lands on the clipboard
pub const LINK_COPIED: &str = "Link copiado!";

/// Canonical locator and summary for one article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub url: String,
    pub title: String,
    pub text: String,
}

impl ShareLink {
    /// Build the link `{origin}/noticia/{id}` with text `{title} - {tagline}`
    #[must_use]
    pub fn for_article(origin: &Url, tagline: &str, article: &NewsArticle) -> Self {
        let origin = origin.origin().ascii_serialization();
        Self {
            url: format!("{origin}/noticia/{}", article.id),
            title: article.title.clone(),
            text: format!("{} - {}", article.title, tagline),
        }
    }
}

/// Platform-native share sheet
pub trait ShareSheet: Send + Sync {
    /// Whether the platform offers a share sheet right now
    fn is_available(&self) -> bool;

    /// Hand the link to the share sheet
    ///
    /// # Errors
    ///
    /// Returns an error if the platform rejects the request.
    fn share(&self, link: &ShareLink) -> Result<()>;
}

/// Clipboard used when no share sheet is available
pub trait Clipboard: Send + Sync {
    /// Copy text to the clipboard
    ///
    /// # Errors
    ///
    /// Returns an error if the clipboard cannot be written.
    fn copy_text(&self, text: &str) -> Result<()>;
}

/// What happened to a share request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    /// Handed to the native share sheet
    Shared(ShareLink),
    /// Copied to the clipboard
    Copied(ShareLink),
    /// Neither capability worked; the link is returned for display
    Unavailable(ShareLink),
}

/// Shares articles through the best capability the environment has
pub struct Sharer {
    origin: Url,
    tagline: String,
    sheet: Option<Box<dyn ShareSheet>>,
    clipboard: Box<dyn Clipboard>,
    notifier: Arc<dyn Notifier>,
}

impl Sharer {
    pub fn new(
        origin: Url,
        tagline: impl Into<String>,
        sheet: Option<Box<dyn ShareSheet>>,
        clipboard: Box<dyn Clipboard>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            origin,
            tagline: tagline.into(),
            sheet,
            clipboard,
            notifier,
        }
    }

    /// Share an article. Best effort: never fails.
    pub fn share_article(&self, article: &NewsArticle) -> ShareOutcome {
        let link = ShareLink::for_article(&self.origin, &self.tagline, article);

        if let Some(sheet) = self.sheet.as_ref().filter(|s| s.is_available()) {
            match sheet.share(&link) {
                Ok(()) => {
                    info!("Shared article {} via share sheet", article.id);
                    return ShareOutcome::Shared(link);
                }
                Err(e) => warn!("Share sheet failed, falling back to clipboard: {}", e),
            }
        }

        match self.clipboard.copy_text(&link.url) {
            Ok(()) => {
                info!("Copied link for article {} to clipboard", article.id);
                self.notifier.notify(Notification::success(LINK_COPIED));
                ShareOutcome::Copied(link)
            }
            Err(e) => {
                warn!("Failed to copy link to clipboard: {}", e);
                ShareOutcome::Unavailable(link)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::model::Category;
    use crate::notify::NotificationLevel;
    use crate::testing::RecordingNotifier;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    struct FakeSheet {
        available: bool,
        fails: bool,
        shared: Arc<Mutex<Vec<ShareLink>>>,
    }

    impl ShareSheet for FakeSheet {
        fn is_available(&self) -> bool {
            self.available
        }

        fn share(&self, link: &ShareLink) -> Result<()> {
            if self.fails {
                return Err(CoreError::IoError(std::io::Error::other("dismissed")));
            }
            self.shared.lock().unwrap().push(link.clone());
            Ok(())
        }
    }

    struct FakeClipboard {
        fails: bool,
        copied: Arc<Mutex<Vec<String>>>,
    }

    impl Clipboard for FakeClipboard {
        fn copy_text(&self, text: &str) -> Result<()> {
            if self.fails {
                return Err(CoreError::IoError(std::io::Error::other("no clipboard")));
            }
            self.copied.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn article() -> NewsArticle {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        NewsArticle {
            id: 42,
            title: "Festa junina na praça".to_string(),
            content: "...".to_string(),
            category: Category::Eventos,
            image_url: None,
            author: None,
            published: true,
            created_at: at,
            updated_at: at,
            user_id: "editor".to_string(),
        }
    }

    fn origin() -> Url {
        Url::parse("https://cidadaniafm.com.br/programacao?x=1").unwrap()
    }

    #[test]
    fn test_link_uses_origin_only() {
        let link = ShareLink::for_article(&origin(), "Blog Cidadania FM", &article());
        assert_eq!(link.url, "https://cidadaniafm.com.br/noticia/42");
        assert_eq!(link.text, "Festa junina na praça - Blog Cidadania FM");
        assert_eq!(link.title, "Festa junina na praça");
    }

    #[test]
    fn test_share_sheet_preferred() {
        let shared = Arc::new(Mutex::new(Vec::new()));
        let copied = Arc::new(Mutex::new(Vec::new()));
        let notifier = RecordingNotifier::new();
        let sharer = Sharer::new(
            origin(),
            "Blog Cidadania FM",
            Some(Box::new(FakeSheet {
                available: true,
                fails: false,
                shared: shared.clone(),
            })),
            Box::new(FakeClipboard {
                fails: false,
                copied: copied.clone(),
            }),
            notifier.clone(),
        );

        let outcome = sharer.share_article(&article());
        assert!(matches!(outcome, ShareOutcome::Shared(_)));
        assert_eq!(shared.lock().unwrap().len(), 1);
        assert!(copied.lock().unwrap().is_empty());
        assert!(notifier.notifications().is_empty());
    }

    #[test]
    fn test_clipboard_fallback_notifies() {
        let copied = Arc::new(Mutex::new(Vec::new()));
        let notifier = RecordingNotifier::new();
        let sharer = Sharer::new(
            origin(),
            "Blog Cidadania FM",
            Some(Box::new(FakeSheet {
                available: false,
                fails: false,
                shared: Arc::new(Mutex::new(Vec::new())),
            })),
            Box::new(FakeClipboard {
                fails: false,
                copied: copied.clone(),
            }),
            notifier.clone(),
        );

        let outcome = sharer.share_article(&article());
        assert!(matches!(outcome, ShareOutcome::Copied(_)));
        assert_eq!(
            copied.lock().unwrap().as_slice(),
            ["https://cidadaniafm.com.br/noticia/42".to_string()]
        );

        let notifications = notifier.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].level, NotificationLevel::Success);
        assert_eq!(notifications[0].message, LINK_COPIED);
    }

    #[test]
    fn test_failing_sheet_falls_back_to_clipboard() {
        let copied = Arc::new(Mutex::new(Vec::new()));
        let sharer = Sharer::new(
            origin(),
            "Blog Cidadania FM",
            Some(Box::new(FakeSheet {
                available: true,
                fails: true,
                shared: Arc::new(Mutex::new(Vec::new())),
            })),
            Box::new(FakeClipboard {
                fails: false,
                copied: copied.clone(),
            }),
            RecordingNotifier::new(),
        );

        assert!(matches!(
            sharer.share_article(&article()),
            ShareOutcome::Copied(_)
        ));
        assert_eq!(copied.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_nothing_available_never_fails() {
        let notifier = RecordingNotifier::new();
        let sharer = Sharer::new(
            origin(),
            "Blog Cidadania FM",
            None,
            Box::new(FakeClipboard {
                fails: true,
                copied: Arc::new(Mutex::new(Vec::new())),
            }),
            notifier.clone(),
        );

        match sharer.share_article(&article()) {
            ShareOutcome::Unavailable(link) => {
                assert_eq!(link.url, "https://cidadaniafm.com.br/noticia/42");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(notifier.notifications().is_empty());
    }
}
