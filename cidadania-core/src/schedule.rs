//! Weekly program schedule.
//!
//! The active programs are fetched once; picking a day only partitions the
//! cached list and never goes back to the store.

use crate::error::Result;
use crate::model::{DayOfWeek, Program};
use crate::notify::{Notification, Notifier};
use crate::store::{decode_rows, Collection, ContentStore, Direction, StoreQuery};
use crate::sync::{ContentEvent, Generation, GenerationCounter, SyncPhase, SyncState};
use chrono::NaiveTime;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

/// Message shown when the schedule cannot be loaded
pub const PROGRAMS_LOAD_ERROR: &str = "Erro ao carregar programação";

/// Query active programs ordered by start time.
///
/// # Errors
///
/// Returns an error if the store request fails.
pub async fn fetch_active(store: &dyn ContentStore) -> Result<Vec<Program>> {
    let query = StoreQuery::from(Collection::Programs)
        .eq("active", true)
        .order_by("start_time", Direction::Ascending);

    let rows = store.select(&query).await?;
    let mut programs: Vec<Program> = decode_rows(Collection::Programs, rows);

    programs.retain(|p| p.active);
    // Stable, so programs sharing a start time keep the store's order
    programs.sort_by_key(|p| p.start_time);

    Ok(programs)
}

/// Programs airing on `day`, in start time order
#[must_use]
pub fn programs_for_day(programs: &[Program], day: DayOfWeek) -> Vec<Program> {
    programs
        .iter()
        .filter(|p| p.day_of_week == day)
        .cloned()
        .collect()
}

/// What the schedule page shows for one day
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayView {
    Loading,
    NothingScheduled,
    Programs(Vec<Program>),
}

struct ScheduleInner {
    selected_day: DayOfWeek,
    state: SyncState<Program>,
    generations: GenerationCounter,
    closed: bool,
}

/// Cached schedule backing the programming page and the player banner
pub struct ProgramSchedule {
    store: Arc<dyn ContentStore>,
    notifier: Arc<dyn Notifier>,
    inner: RwLock<ScheduleInner>,
    event_tx: broadcast::Sender<ContentEvent>,
}

impl ProgramSchedule {
    pub fn new(store: Arc<dyn ContentStore>, notifier: Arc<dyn Notifier>) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(64);

        Arc::new(Self {
            store,
            notifier,
            inner: RwLock::new(ScheduleInner {
                selected_day: DayOfWeek::default(),
                state: SyncState::Idle,
                generations: GenerationCounter::default(),
                closed: false,
            }),
            event_tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ContentEvent> {
        self.event_tx.subscribe()
    }

    /// Fetch the active programs into the cache.
    ///
    /// Called once on mount; calling it again is an explicit retry.
    pub async fn load(&self) -> SyncPhase {
        let generation = {
            let mut inner = self.inner.write().await;
            if inner.closed {
                debug!("Ignoring load on closed schedule");
                return inner.state.phase();
            }
            inner.state = std::mem::take(&mut inner.state).begin();
            inner.generations.next()
        };
        let _ = self.event_tx.send(ContentEvent::Loading {
            collection: Collection::Programs,
        });

        info!("Fetching program schedule");
        let outcome = fetch_active(self.store.as_ref()).await;
        self.apply(generation, outcome).await
    }

    /// Programs for `day` from the cache; empty until loaded
    pub async fn by_day(&self, day: DayOfWeek) -> Vec<Program> {
        programs_for_day(self.inner.read().await.state.items(), day)
    }

    /// Switch the selected day and return its view
    pub async fn select_day(&self, day: DayOfWeek) -> DayView {
        self.inner.write().await.selected_day = day;
        self.day_view(day).await
    }

    pub async fn selected_day(&self) -> DayOfWeek {
        self.inner.read().await.selected_day
    }

    pub async fn day_view(&self, day: DayOfWeek) -> DayView {
        let inner = self.inner.read().await;
        match &inner.state {
            SyncState::Idle | SyncState::Loading => DayView::Loading,
            SyncState::Empty | SyncState::Errored { .. } => DayView::NothingScheduled,
            SyncState::Ready(programs) => {
                let programs = programs_for_day(programs, day);
                if programs.is_empty() {
                    DayView::NothingScheduled
                } else {
                    DayView::Programs(programs)
                }
            }
        }
    }

    /// Every day that has programs, in week order
    pub async fn grouped(&self) -> BTreeMap<DayOfWeek, Vec<Program>> {
        let inner = self.inner.read().await;
        let mut groups: BTreeMap<DayOfWeek, Vec<Program>> = BTreeMap::new();
        for program in inner.state.items() {
            groups
                .entry(program.day_of_week)
                .or_default()
                .push(program.clone());
        }
        groups
    }

    /// The program on air at `time` on `day`, if any.
    ///
    /// Overnight programs from the previous day are still on air until their
    /// end time. When slots overlap, the one that started last wins.
    pub async fn on_air(&self, day: DayOfWeek, time: NaiveTime) -> Option<Program> {
        let inner = self.inner.read().await;
        let programs = inner.state.items();
        programs
            .iter()
            .rev()
            .find(|p| p.day_of_week == day && p.airs_at(time))
            .or_else(|| {
                programs
                    .iter()
                    .rev()
                    .find(|p| p.day_of_week == day.previous() && p.airs_after_midnight_at(time))
            })
            .cloned()
    }

    /// Stop applying results; late responses are discarded
    pub async fn close(&self) {
        self.inner.write().await.closed = true;
        debug!("Program schedule closed");
    }

    pub async fn state(&self) -> SyncState<Program> {
        self.inner.read().await.state.clone()
    }

    pub async fn phase(&self) -> SyncPhase {
        self.inner.read().await.state.phase()
    }

    async fn apply(&self, generation: Generation, outcome: Result<Vec<Program>>) -> SyncPhase {
        let mut inner = self.inner.write().await;

        if inner.closed || !inner.generations.is_current(generation) {
            debug!(
                "Discarding stale schedule response (generation {})",
                generation.value()
            );
            let _ = self.event_tx.send(ContentEvent::StaleDiscarded {
                collection: Collection::Programs,
                generation: generation.value(),
            });
            return inner.state.phase();
        }

        match outcome {
            Ok(programs) => {
                let count = programs.len();
                info!("Loaded {} active programs", count);
                inner.state = std::mem::take(&mut inner.state).resolve(Ok(programs));
                let _ = self.event_tx.send(ContentEvent::Loaded {
                    collection: Collection::Programs,
                    count,
                });
            }
            Err(e) => {
                warn!("Error fetching programs: {}", e);
                let message = e.to_string();
                inner.state = std::mem::take(&mut inner.state).resolve(Err(message.clone()));
                self.notifier.notify(Notification::error(PROGRAMS_LOAD_ERROR));
                let _ = self.event_tx.send(ContentEvent::Failed {
                    collection: Collection::Programs,
                    message,
                });
            }
        }

        inner.state.phase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{program_row, FailingStore, GatedStore, RecordingNotifier};

    fn scenario_store() -> MemoryStore {
        MemoryStore::with_rows(
            Collection::Programs,
            vec![
                program_row(1, "segunda", "08:00:00", "10:00:00", true),
                program_row(2, "segunda", "06:00:00", "08:00:00", true),
                program_row(3, "terca", "09:00:00", "11:00:00", false),
            ],
        )
    }

    fn ids(programs: &[Program]) -> Vec<i64> {
        programs.iter().map(|p| p.id).collect()
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_active_scenario() {
        let store = scenario_store();
        let programs = fetch_active(&store).await.unwrap();
        assert_eq!(ids(&programs), vec![2, 1]);

        assert_eq!(
            ids(&programs_for_day(&programs, DayOfWeek::Segunda)),
            vec![2, 1]
        );
        assert!(programs_for_day(&programs, DayOfWeek::Terca).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_active_is_idempotent() {
        let store = scenario_store();
        let first = fetch_active(&store).await.unwrap();
        let second = fetch_active(&store).await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_programs_for_day_empty_input() {
        assert!(programs_for_day(&[], DayOfWeek::Quarta).is_empty());
    }

    #[tokio::test]
    async fn test_by_day_only_matching_days_in_start_order() {
        let store = MemoryStore::with_rows(
            Collection::Programs,
            vec![
                program_row(1, "quarta", "18:00", "19:00", true),
                program_row(2, "segunda", "07:00", "08:00", true),
                program_row(3, "quarta", "06:00", "07:00", true),
                program_row(4, "quarta", "12:00", "13:00", true),
            ],
        );
        let schedule = ProgramSchedule::new(Arc::new(store), RecordingNotifier::new());
        assert_eq!(schedule.load().await, SyncPhase::Ready);

        let wednesday = schedule.by_day(DayOfWeek::Quarta).await;
        assert!(wednesday.iter().all(|p| p.day_of_week == DayOfWeek::Quarta));
        assert_eq!(ids(&wednesday), vec![3, 4, 1]);
    }

    #[tokio::test]
    async fn test_day_selection_does_not_requery() {
        let store = GatedStore::new(scenario_store());
        let schedule = ProgramSchedule::new(store.clone(), RecordingNotifier::new());
        assert_eq!(schedule.day_view(DayOfWeek::Segunda).await, DayView::Loading);

        store.release_one();
        assert_eq!(schedule.load().await, SyncPhase::Ready);
        assert_eq!(store.started(), 1);

        assert_eq!(schedule.selected_day().await, DayOfWeek::Segunda);
        match schedule.select_day(DayOfWeek::Segunda).await {
            DayView::Programs(programs) => assert_eq!(ids(&programs), vec![2, 1]),
            other => panic!("unexpected view: {other:?}"),
        }
        assert_eq!(
            schedule.select_day(DayOfWeek::Terca).await,
            DayView::NothingScheduled
        );
        assert_eq!(schedule.selected_day().await, DayOfWeek::Terca);
        assert_eq!(store.started(), 1);
    }

    #[tokio::test]
    async fn test_grouped_in_week_order() {
        let store = MemoryStore::with_rows(
            Collection::Programs,
            vec![
                program_row(1, "domingo", "10:00", "12:00", true),
                program_row(2, "segunda", "08:00", "10:00", true),
                program_row(3, "segunda", "06:00", "08:00", true),
            ],
        );
        let schedule = ProgramSchedule::new(Arc::new(store), RecordingNotifier::new());
        schedule.load().await;

        let grouped = schedule.grouped().await;
        let days: Vec<DayOfWeek> = grouped.keys().copied().collect();
        assert_eq!(days, vec![DayOfWeek::Segunda, DayOfWeek::Domingo]);
        assert_eq!(ids(&grouped[&DayOfWeek::Segunda]), vec![3, 2]);
    }

    #[tokio::test]
    async fn test_on_air() {
        let store = MemoryStore::with_rows(
            Collection::Programs,
            vec![
                program_row(1, "segunda", "06:00", "09:00", true),
                program_row(2, "segunda", "09:00", "12:00", true),
                program_row(3, "sexta", "22:00", "00:00", true),
            ],
        );
        let schedule = ProgramSchedule::new(Arc::new(store), RecordingNotifier::new());
        schedule.load().await;

        let on_air = |day, h, m| {
            let schedule = schedule.clone();
            async move { schedule.on_air(day, at(h, m)).await.map(|p| p.id) }
        };

        assert_eq!(on_air(DayOfWeek::Segunda, 8, 59).await, Some(1));
        assert_eq!(on_air(DayOfWeek::Segunda, 9, 0).await, Some(2));
        assert_eq!(on_air(DayOfWeek::Segunda, 13, 0).await, None);
        assert_eq!(on_air(DayOfWeek::Sexta, 23, 45).await, Some(3));
        assert_eq!(on_air(DayOfWeek::Terca, 8, 0).await, None);
        // Ends at midnight: nothing on saturday morning
        assert_eq!(on_air(DayOfWeek::Sabado, 0, 30).await, None);
    }

    #[tokio::test]
    async fn test_on_air_overnight_continues_next_day() {
        let store = MemoryStore::with_rows(
            Collection::Programs,
            vec![
                program_row(9, "sexta", "22:00", "02:00", true),
                program_row(10, "sabado", "01:30", "04:00", true),
                program_row(11, "domingo", "23:00", "01:00", true),
            ],
        );
        let schedule = ProgramSchedule::new(Arc::new(store), RecordingNotifier::new());
        schedule.load().await;

        let on_air = |day, h, m| {
            let schedule = schedule.clone();
            async move { schedule.on_air(day, at(h, m)).await.map(|p| p.id) }
        };

        assert_eq!(on_air(DayOfWeek::Sexta, 23, 0).await, Some(9));
        assert_eq!(on_air(DayOfWeek::Sabado, 1, 0).await, Some(9));
        // The saturday program started later and takes over
        assert_eq!(on_air(DayOfWeek::Sabado, 1, 45).await, Some(10));
        assert_eq!(on_air(DayOfWeek::Sabado, 4, 0).await, None);
        assert_eq!(on_air(DayOfWeek::Sexta, 1, 0).await, None);
        // Sunday night wraps into monday
        assert_eq!(on_air(DayOfWeek::Segunda, 0, 30).await, Some(11));
    }

    #[tokio::test]
    async fn test_failure_notifies_and_shows_nothing_scheduled() {
        let notifier = RecordingNotifier::new();
        let schedule = ProgramSchedule::new(Arc::new(FailingStore), notifier.clone());

        assert_eq!(schedule.load().await, SyncPhase::Errored);
        assert_eq!(
            schedule.day_view(DayOfWeek::Segunda).await,
            DayView::NothingScheduled
        );

        let notifications = notifier.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].message, PROGRAMS_LOAD_ERROR);
    }

    #[tokio::test]
    async fn test_results_after_close_are_discarded() {
        let store = GatedStore::new(scenario_store());
        let schedule = ProgramSchedule::new(store.clone(), RecordingNotifier::new());

        let pending = tokio::spawn({
            let schedule = schedule.clone();
            async move { schedule.load().await }
        });
        while store.started() < 1 {
            tokio::task::yield_now().await;
        }

        schedule.close().await;
        store.release_one();
        pending.await.unwrap();

        assert!(schedule.by_day(DayOfWeek::Segunda).await.is_empty());
        assert!(schedule.grouped().await.is_empty());
    }
}
