pub mod config;
pub mod contact;
pub mod error;
pub mod model;
pub mod news;
pub mod notify;
pub mod paths;
pub mod playback;
pub mod schedule;
pub mod share;
pub mod store;
pub mod sync;

#[cfg(test)]
mod testing;

pub use config::{
    build_config_template, CidadaniaConfig, LoggingConfig, PlayerConfig, ProvidersConfig,
    StationConfig,
};
pub use contact::{ContactDesk, ContactForm, CONTACT_FAILED, CONTACT_SENT};

pub use error::{CoreError, Result};
pub use model::{Category, ContactSubject, DayOfWeek, NewContact, NewsArticle, Program};
pub use news::{fetch_published, NewsFeed, NEWS_LOAD_ERROR};
pub use notify::{Notification, NotificationLevel, Notifier, TracingNotifier};
pub use paths::{config_dir, log_file_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME, LOG_FILE_NAME};
pub use playback::{
    AudioBackend, AudioOutput, PlaybackController, PlaybackEvent, PlaybackSession,
    DEFAULT_VOLUME,
};
pub use schedule::{fetch_active, DayView, ProgramSchedule, PROGRAMS_LOAD_ERROR};
pub use share::{Clipboard, ShareLink, ShareOutcome, ShareSheet, Sharer, LINK_COPIED};
pub use store::{Collection, ContentStore, Direction, MemoryStore, StoreQuery};
pub use sync::{ContentEvent, SyncPhase, SyncState};
