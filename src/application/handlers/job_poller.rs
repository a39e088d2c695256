use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::{
    sync::{Mutex, oneshot},
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    application::usecases::lists::ListsUseCase,
    domain::{
        errors::{DomainError, DomainResult},
        models::{EmailList, ListStatus},
    },
};

#[derive(Debug, Clone, Copy)]
pub struct JobPollerConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for JobPollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 720,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Finished(ListStatus),
    Cancelled,
    TimedOut,
    /// The list disappeared while being watched.
    Gone,
}

type Watches = Arc<Mutex<HashMap<Uuid, oneshot::Sender<()>>>>;

/// Drives PROCESSING lists to a terminal state in the background, one task
/// per list.
pub struct JobPoller {
    lists: Arc<ListsUseCase>,
    config: JobPollerConfig,
    watches: Watches,
}

impl JobPoller {
    pub fn new(lists: Arc<ListsUseCase>, config: JobPollerConfig) -> Self {
        Self {
            lists,
            config,
            watches: Arc::default(),
        }
    }

    /// Returns `None` when the list is already being watched.
    pub async fn watch(&self, list: &EmailList) -> Option<JoinHandle<PollOutcome>> {
        let mut watches = self.watches.lock().await;
        if watches.contains_key(&list.id) {
            return None;
        }
        let (cancel_tx, cancel_rx) = oneshot::channel();
        watches.insert(list.id, cancel_tx);

        let lists = self.lists.clone();
        let config = self.config;
        let registry = self.watches.clone();
        let list = list.clone();
        Some(tokio::spawn(async move {
            let list_id = list.id;
            let outcome = poll_until_done(lists, config, list, cancel_rx).await;
            registry.lock().await.remove(&list_id);
            info!(%list_id, ?outcome, "stopped watching list");
            outcome
        }))
    }

    pub async fn cancel(&self, list_id: &Uuid) -> bool {
        match self.watches.lock().await.remove(list_id) {
            Some(cancel) => {
                let _ = cancel.send(());
                true
            }
            None => false,
        }
    }

    pub async fn is_watching(&self, list_id: &Uuid) -> bool {
        self.watches.lock().await.contains_key(list_id)
    }

    /// Picks up lists left PROCESSING by a previous run.
    pub async fn resume(&self) -> DomainResult<usize> {
        let pending = self.lists.processing().await?;
        let mut resumed = 0;
        for list in &pending {
            if self.watch(list).await.is_some() {
                resumed += 1;
            }
        }
        if resumed > 0 {
            info!(resumed, "resumed polling of processing lists");
        }
        Ok(resumed)
    }
}

async fn poll_until_done(
    lists: Arc<ListsUseCase>,
    config: JobPollerConfig,
    mut list: EmailList,
    mut cancel: oneshot::Receiver<()>,
) -> PollOutcome {
    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // first tick fires immediately
    ticker.tick().await;

    for attempt in 1..=config.max_attempts {
        tokio::select! {
            _ = &mut cancel => return PollOutcome::Cancelled,
            _ = ticker.tick() => {}
        }

        match lists.refresh(list.clone()).await {
            Ok(updated) if updated.status.is_terminal() => {
                return PollOutcome::Finished(updated.status);
            }
            Ok(updated) => {
                debug!(list_id = %updated.id, attempt, verified = updated.counts.verified, "list still processing");
                list = updated;
            }
            Err(DomainError::NotFound(_)) => return PollOutcome::Gone,
            Err(err) => {
                warn!(list_id = %list.id, attempt, error = %err, "status poll failed");
            }
        }
    }

    warn!(list_id = %list.id, attempts = config.max_attempts, "gave up polling list");
    PollOutcome::TimedOut
}
