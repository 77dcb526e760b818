//! Search / select orchestration.
//!
//! [`SearchController`] turns user intent into weather fetches and commits
//! confirmed results to the [`SelectionStore`]. Everything a presentation
//! layer needs is published as a [`Snapshot`] on a watch channel.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::{
    sync::{Mutex as AsyncMutex, watch},
    task::JoinHandle,
};

use crate::{
    client::{FetchError, WeatherClient},
    model::WeatherRecord,
    store::{SelectionStore, StoreError},
};

/// Queries shorter than this (after trimming) never hit the network.
pub const MIN_QUERY_LEN: usize = 3;

pub const EXISTENCE_HINT: &str = "(Are you sure this city exists?)";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchState {
    #[default]
    Idle,
    Searching {
        query: String,
    },
    /// A fetched record waiting for the user to confirm it.
    ResultsShown {
        records: Vec<WeatherRecord>,
    },
    ErrorShown {
        message: String,
    },
    /// The persisted selection is on display. `notice` carries a
    /// non-blocking error, e.g. a failed refresh.
    Selected {
        record: WeatherRecord,
        notice: Option<String>,
    },
}

impl SearchState {
    pub fn search_results(&self) -> &[WeatherRecord] {
        match self {
            SearchState::ResultsShown { records } => records,
            _ => &[],
        }
    }
}

/// What the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub state: SearchState,
    /// Mirror of the persisted selection, whatever `state` is showing.
    pub selection: Option<WeatherRecord>,
}

#[derive(Debug)]
struct Shared {
    client: Arc<dyn WeatherClient>,
    store: Arc<dyn SelectionStore>,
    /// Bumped on every new user intent; searches tagged with an older
    /// value are dropped when they complete.
    intent: Mutex<u64>,
    /// Selection epoch. Held across store writes so confirm and refresh
    /// never interleave.
    commit: AsyncMutex<u64>,
    /// Refresh/save error waiting for `Selected` to be on screen again.
    pending_notice: Mutex<Option<String>>,
    state_tx: watch::Sender<Snapshot>,
}

#[derive(Debug, Clone)]
pub struct SearchController {
    shared: Arc<Shared>,
}

impl SearchController {
    pub fn new(client: Arc<dyn WeatherClient>, store: Arc<dyn SelectionStore>) -> Self {
        let (state_tx, _) = watch::channel(Snapshot::default());

        Self {
            shared: Arc::new(Shared {
                client,
                store,
                intent: Mutex::new(0),
                commit: AsyncMutex::new(0),
                pending_notice: Mutex::new(None),
                state_tx,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.shared.state_tx.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.state_tx.borrow().clone()
    }

    fn publish(&self, update: impl FnOnce(&mut Snapshot)) {
        self.shared.state_tx.send_modify(update);
    }

    /// Restore the persisted selection and refresh it in the background.
    ///
    /// Returns the refresh task when there was something to refresh.
    pub async fn start(&self) -> Option<JoinHandle<()>> {
        self.restore().await?;

        let controller = self.clone();
        Some(tokio::spawn(async move { controller.refresh_selected().await }))
    }

    /// Load the persisted selection into the snapshot.
    pub async fn restore(&self) -> Option<WeatherRecord> {
        match self.shared.store.get_selected().await {
            Ok(Some(record)) => {
                tracing::debug!(city = record.name(), "restored selection");
                let restored = record.clone();
                self.publish(|s| {
                    if s.state == SearchState::Idle {
                        s.state = SearchState::Selected { record: record.clone(), notice: None };
                    }
                    s.selection = Some(record);
                });
                Some(restored)
            }
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load saved city");
                let message = format!("Failed to load saved city: {err}");
                self.publish(|s| s.state = SearchState::ErrorShown { message });
                None
            }
        }
    }

    /// Re-fetch the persisted selection and store the fresh values.
    ///
    /// On failure the stale record stays selected and the error is attached
    /// as a notice.
    pub async fn refresh_selected(&self) {
        // Read epoch and selection together so a confirm that is still
        // writing cannot slip in between them.
        let (epoch_at_start, current) = {
            let epoch = self.shared.commit.lock().await;
            (*epoch, self.snapshot().selection)
        };
        let Some(current) = current else {
            return;
        };

        let result = self.shared.client.fetch(current.name()).await;

        let epoch = self.shared.commit.lock().await;
        if *epoch != epoch_at_start {
            tracing::debug!(city = current.name(), "selection changed during refresh, dropping result");
            return;
        }

        let refreshed = match result {
            Ok(refreshed) => refreshed,
            Err(err) => {
                tracing::warn!(city = current.name(), error = %err, "refresh failed, keeping stale selection");
                self.attach_notice(fetch_failure_message(&err));
                return;
            }
        };

        if let Err(err) = self.shared.store.save(&refreshed).await {
            tracing::warn!(city = refreshed.name(), error = %err, "failed to save refreshed city");
            self.attach_notice(save_failure_message(&err));
            return;
        }

        tracing::info!(city = refreshed.name(), "selection refreshed");
        self.shared.pending_notice.lock().take();
        self.publish(|s| {
            if let SearchState::Selected { record, notice } = &mut s.state {
                *record = refreshed.clone();
                *notice = None;
            }
            s.selection = Some(refreshed);
        });
    }

    /// Show `message` on the selected city, or hold it until the selection
    /// is back on screen.
    fn attach_notice(&self, message: String) {
        let mut pending = Some(message);
        self.publish(|s| {
            if let SearchState::Selected { notice, .. } = &mut s.state {
                *notice = pending.take();
            }
        });
        if pending.is_some() {
            *self.shared.pending_notice.lock() = pending;
        }
    }

    /// Search for `text`. Returns whether a fetch was issued.
    pub async fn submit_query(&self, text: &str) -> bool {
        let query = text.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            tracing::debug!(query, "query too short, not searching");
            return false;
        }

        let tag = {
            let mut intent = self.shared.intent.lock();
            *intent += 1;
            self.publish(|s| s.state = SearchState::Searching { query: query.to_string() });
            *intent
        };

        let result = self.shared.client.fetch(query).await;

        let intent = self.shared.intent.lock();
        if *intent != tag {
            tracing::debug!(query, "search superseded, dropping result");
            return true;
        }

        match result {
            Ok(record) => {
                self.publish(|s| s.state = SearchState::ResultsShown { records: vec![record] });
            }
            Err(err) => {
                tracing::warn!(query, error = %err, "search failed");
                let message = format!("{}\n\n{EXISTENCE_HINT}", fetch_failure_message(&err));
                self.publish(|s| s.state = SearchState::ErrorShown { message });
            }
        }

        true
    }

    /// Persist `record` as the selected city, replacing the previous one.
    ///
    /// On failure the previous selection stays in place and the error is
    /// shown.
    pub async fn confirm_selection(&self, record: WeatherRecord) -> Result<(), StoreError> {
        let mut epoch = self.shared.commit.lock().await;
        let tag = *self.shared.intent.lock();

        if let Err(err) = self.shared.store.save(&record).await {
            tracing::warn!(city = record.name(), error = %err, "failed to save city");
            let message = save_failure_message(&err);

            let intent = self.shared.intent.lock();
            if *intent != tag {
                // A newer search owns the screen.
                drop(intent);
                *self.shared.pending_notice.lock() = Some(message);
                return Err(err);
            }
            self.publish(|s| {
                s.state = match &s.selection {
                    Some(previous) => {
                        SearchState::Selected { record: previous.clone(), notice: Some(message) }
                    }
                    None => SearchState::ErrorShown { message },
                };
            });
            return Err(err);
        }

        *epoch += 1;
        tracing::info!(city = record.name(), "selection saved");
        self.shared.pending_notice.lock().take();

        let mut intent = self.shared.intent.lock();
        if *intent != tag {
            tracing::debug!(city = record.name(), "newer search on screen, keeping it");
            self.publish(|s| s.selection = Some(record));
            return Ok(());
        }

        *intent += 1;
        self.publish(|s| {
            s.selection = Some(record.clone());
            s.state = SearchState::Selected { record, notice: None };
        });

        Ok(())
    }

    /// The search box was emptied: drop results, errors and any in-flight search.
    pub fn clear_query(&self) {
        let mut intent = self.shared.intent.lock();
        *intent += 1;
        self.publish(|s| {
            s.state = match &s.selection {
                Some(record) => SearchState::Selected {
                    record: record.clone(),
                    notice: self.shared.pending_notice.lock().take(),
                },
                None => SearchState::Idle,
            };
        });
    }
}

fn fetch_failure_message(err: &FetchError) -> String {
    format!("Failed to fetch weather:\n\n {err}")
}

fn save_failure_message(err: &StoreError) -> String {
    format!("Failed to save city: {err}")
}
