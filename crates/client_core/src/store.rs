use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shared::domain::{County, DataCenter, DatasetKind, ProposalLocation, UtilityServiceArea};
use shared::protocol::SimulationResponse;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

/// How long a transient notice stays on screen before auto-dismissal.
pub const NOTICE_DISMISS_DELAY: Duration = Duration::from_secs(4);

/// Transient banner message. The sequence number ties a scheduled dismissal
/// to the notice it was created for, so a newer notice is never torn down
/// by an older notice's timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub seq: u64,
    pub text: String,
}

/// One loaded geodata collection, tagged with its dataset identity.
#[derive(Debug, Clone)]
pub enum GeodataCollection {
    Counties(Arc<Vec<County>>),
    DataCenters(Arc<Vec<DataCenter>>),
    Utilities(Arc<Vec<UtilityServiceArea>>),
}

impl GeodataCollection {
    pub fn kind(&self) -> DatasetKind {
        match self {
            Self::Counties(_) => DatasetKind::Counties,
            Self::DataCenters(_) => DatasetKind::DataCenters,
            Self::Utilities(_) => DatasetKind::Utilities,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Counties(features) => features.len(),
            Self::DataCenters(features) => features.len(),
            Self::Utilities(features) => features.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The single application state. Snapshots are cheap to clone: the geodata
/// collections are shared behind `Arc`s.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub counties: Option<Arc<Vec<County>>>,
    pub data_centers: Option<Arc<Vec<DataCenter>>>,
    pub utilities: Option<Arc<Vec<UtilityServiceArea>>>,
    pub proposal_location: Option<ProposalLocation>,
    pub simulation_result: Option<SimulationResponse>,
    pub loading: bool,
    pub error: Option<String>,
    pub notice: Option<Notice>,
}

/// Typed change notification naming the transition that just completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    GeodataLoaded(DatasetKind),
    ProposalChanged,
    ResultChanged,
    LoadingChanged(bool),
    ErrorChanged,
    NoticeChanged,
    Reset,
}

/// Exclusively-owned state container. The mutators below are the only
/// legal write path; each applies its complete transition under the lock
/// and emits one [`StateChange`] afterwards, so no subscriber ever
/// observes a half-applied transition.
pub struct StateStore {
    inner: Mutex<AppState>,
    notice_seq: AtomicU64,
    changes: broadcast::Sender<StateChange>,
}

impl StateStore {
    pub fn new() -> Arc<Self> {
        let (changes, _) = broadcast::channel(256);
        Arc::new(Self {
            inner: Mutex::new(AppState::default()),
            notice_seq: AtomicU64::new(0),
            changes,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }

    pub async fn snapshot(&self) -> AppState {
        self.inner.lock().await.clone()
    }

    /// One-time population of a geodata collection. Touches no other field.
    pub async fn set_geodata(&self, collection: GeodataCollection) {
        let kind = collection.kind();
        {
            let mut state = self.inner.lock().await;
            match collection {
                GeodataCollection::Counties(features) => {
                    if state.counties.is_some() {
                        debug!(dataset = ?kind, "replacing already-loaded geodata");
                    }
                    state.counties = Some(features);
                }
                GeodataCollection::DataCenters(features) => state.data_centers = Some(features),
                GeodataCollection::Utilities(features) => state.utilities = Some(features),
            }
        }
        let _ = self.changes.send(StateChange::GeodataLoaded(kind));
    }

    /// Replaces the proposal location wholesale. Any existing simulation
    /// result and error belong to the previous location and are cleared
    /// in the same transition.
    pub async fn set_proposal_location(&self, location: ProposalLocation) {
        {
            let mut state = self.inner.lock().await;
            state.proposal_location = Some(location);
            state.simulation_result = None;
            state.error = None;
        }
        let _ = self.changes.send(StateChange::ProposalChanged);
    }

    pub async fn set_simulation_result(&self, result: SimulationResponse) {
        {
            let mut state = self.inner.lock().await;
            state.simulation_result = Some(result);
            state.loading = false;
        }
        let _ = self.changes.send(StateChange::ResultChanged);
    }

    pub async fn set_loading(&self, loading: bool) {
        {
            let mut state = self.inner.lock().await;
            state.loading = loading;
        }
        let _ = self.changes.send(StateChange::LoadingChanged(loading));
    }

    /// Surfacing an error also ends the loading phase. Clearing the error
    /// (`None`) leaves the loading flag alone.
    pub async fn set_error(&self, error: Option<String>) {
        {
            let mut state = self.inner.lock().await;
            if error.is_some() {
                state.loading = false;
            }
            state.error = error;
        }
        let _ = self.changes.send(StateChange::ErrorChanged);
    }

    /// Sets or clears the transient notice. Returns the new notice's
    /// sequence number when one was set.
    pub async fn set_notice(&self, text: Option<String>) -> Option<u64> {
        let seq = {
            let mut state = self.inner.lock().await;
            match text {
                Some(text) => {
                    let seq = self.notice_seq.fetch_add(1, Ordering::Relaxed) + 1;
                    state.notice = Some(Notice { seq, text });
                    Some(seq)
                }
                None => {
                    state.notice = None;
                    None
                }
            }
        };
        let _ = self.changes.send(StateChange::NoticeChanged);
        seq
    }

    /// Dismisses the notice only if the one with this sequence number is
    /// still showing.
    pub async fn clear_notice_if_current(&self, seq: u64) {
        let cleared = {
            let mut state = self.inner.lock().await;
            if state.notice.as_ref().map(|notice| notice.seq) == Some(seq) {
                state.notice = None;
                true
            } else {
                false
            }
        };
        if cleared {
            let _ = self.changes.send(StateChange::NoticeChanged);
        }
    }

    /// Back to idle: clears location, result, and error.
    pub async fn reset(&self) {
        {
            let mut state = self.inner.lock().await;
            state.proposal_location = None;
            state.simulation_result = None;
            state.error = None;
        }
        let _ = self.changes.send(StateChange::Reset);
    }
}

/// Posts a transient notice and schedules its dismissal after
/// [`NOTICE_DISMISS_DELAY`]. The dismissal is keyed to the notice's
/// sequence number, so a notice posted later survives this timer.
pub async fn post_transient_notice(store: &Arc<StateStore>, text: impl Into<String>) {
    if let Some(seq) = store.set_notice(Some(text.into())).await {
        let store = Arc::clone(store);
        tokio::spawn(async move {
            tokio::time::sleep(NOTICE_DISMISS_DELAY).await;
            store.clear_notice_if_current(seq).await;
        });
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
