//! Query lifecycle state machine shared by the content synchronizers.

use crate::store::Collection;

/// State of a query-backed list.
///
/// `idle -> loading -> {ready, empty, errored}`, re-entrant on every new
/// trigger. Prior results are dropped as soon as a new query begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState<T> {
    Idle,
    Loading,
    Ready(Vec<T>),
    Empty,
    Errored {
        message: String,
    },
}

impl<T> Default for SyncState<T> {
    fn default() -> Self {
        Self::Idle
    }
}

/// Data-free projection of [`SyncState`] for views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Loading,
    Ready,
    Empty,
    Errored,
}

impl<T> SyncState<T> {
    /// Enter `Loading`, discarding whatever was held before
    #[must_use]
    pub fn begin(self) -> Self {
        Self::Loading
    }

    /// Apply a query outcome. Only a `Loading` state can resolve.
    #[must_use]
    pub fn resolve(self, outcome: Result<Vec<T>, String>) -> Self {
        match self {
            Self::Loading => match outcome {
                Ok(items) if items.is_empty() => Self::Empty,
                Ok(items) => Self::Ready(items),
                Err(message) => Self::Errored { message },
            },
            other => other,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> SyncPhase {
        match self {
            Self::Idle => SyncPhase::Idle,
            Self::Loading => SyncPhase::Loading,
            Self::Ready(_) => SyncPhase::Ready,
            Self::Empty => SyncPhase::Empty,
            Self::Errored { .. } => SyncPhase::Errored,
        }
    }

    /// Items to render; empty unless `Ready`
    #[must_use]
    pub fn items(&self) -> &[T] {
        match self {
            Self::Ready(items) => items,
            _ => &[],
        }
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Whether a view should show its "nothing here" placeholder.
    ///
    /// A failed query looks the same as an empty one; the failure itself is
    /// reported once through the notifier.
    #[must_use]
    pub const fn shows_placeholder(&self) -> bool {
        matches!(self, Self::Empty | Self::Errored { .. })
    }
}

/// Tag attached to an in-flight query
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Monotonic request counter; only the latest generation may apply results
#[derive(Debug, Default)]
pub struct GenerationCounter {
    current: u64,
}

impl GenerationCounter {
    /// Start a new request, invalidating every earlier one
    pub fn next(&mut self) -> Generation {
        self.current += 1;
        Generation(self.current)
    }

    #[must_use]
    pub const fn is_current(&self, generation: Generation) -> bool {
        generation.0 == self.current
    }
}

/// Events emitted by the content synchronizers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentEvent {
    /// A query was issued
    Loading { collection: Collection },
    /// A query finished and its rows were applied
    Loaded { collection: Collection, count: usize },
    /// A query failed
    Failed {
        collection: Collection,
        message: String,
    },
    /// A response arrived after a newer query or teardown and was dropped
    StaleDiscarded {
        collection: Collection,
        generation: u64,
    },
}
