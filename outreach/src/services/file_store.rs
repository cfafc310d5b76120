//! JSON-file persistence store
//!
//! Wraps [`InMemoryStore`] and writes the whole state to
//! `<data_dir>/outreach_state.json` after every mutation. Writes go to a
//! temporary file first and are renamed into place, so a crash mid-write
//! leaves the previous snapshot intact. A mutation whose write fails is
//! rolled back in memory as well, so a retry sees the state on disk.

use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use shared::{
    component_debug, component_info, component_warn, AttemptId, AttemptStatus, Campaign, CampaignId, CheckIn,
    CheckInId, Component, DiscoveryRun, EngagementEvent, EngagementRecord, NewAttempt,
    OutreachAttempt,
};

use crate::core::{AppliedEngagement, EngagementWeights};
use crate::error::{OutreachError, OutreachResult};
use crate::services::memory_store::{InMemoryStore, StoreState};
use crate::traits::{InsertOutcome, PersistenceStore};

const STATE_FILE: &str = "outreach_state.json";

pub struct JsonFileStore {
    inner: InMemoryStore,
    path: PathBuf,
    /// Serializes mutations with their snapshot writes
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store in `data_dir`, loading any existing snapshot
    pub async fn open(data_dir: impl AsRef<Path>) -> OutreachResult<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir).await.map_err(|e| OutreachError::Persistence {
            message: format!("cannot create data dir {}: {e}", data_dir.display()),
        })?;

        let path = data_dir.join(STATE_FILE);
        let state = if fs::try_exists(&path).await? {
            let raw = fs::read_to_string(&path).await?;
            let state: StoreState = serde_json::from_str(&raw).map_err(|e| OutreachError::Persistence {
                message: format!("corrupt state file {}: {e}", path.display()),
            })?;
            component_info!(
                Component::Store,
                path = %path.display(),
                campaigns = state.campaigns.len(),
                attempts = state.attempts.len(),
                "📂 Loaded persisted state"
            );
            state
        } else {
            StoreState::default()
        };

        Ok(Self {
            inner: InMemoryStore::from_state(state),
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `mutation` against the in-memory state and persist the result
    ///
    /// Nothing is written when `changed` says the mutation was a no-op. If the
    /// write fails the in-memory state is restored to what it was before.
    async fn commit<T, Fut>(&self, mutation: Fut, changed: fn(&T) -> bool) -> OutreachResult<T>
    where
        Fut: Future<Output = OutreachResult<T>>,
    {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.snapshot().await;
        let value = mutation.await?;
        if !changed(&value) {
            return Ok(value);
        }

        if let Err(e) = self.write_snapshot().await {
            self.inner.restore(before).await;
            component_warn!(
                Component::Store,
                path = %self.path.display(),
                "↩️ Write failed, mutation rolled back: {}",
                e
            );
            return Err(e);
        }
        Ok(value)
    }

    async fn write_snapshot(&self) -> OutreachResult<()> {
        let snapshot = self.inner.snapshot().await;
        let json = serde_json::to_vec_pretty(&snapshot)?;

        let tmp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp_path, &self.path).await?;

        component_debug!(
            Component::Store,
            bytes = json.len(),
            "💾 State persisted"
        );
        Ok(())
    }
}

#[async_trait]
impl PersistenceStore for JsonFileStore {
    async fn insert_campaign(&self, campaign: Campaign) -> OutreachResult<()> {
        self.commit(self.inner.insert_campaign(campaign), |_| true).await
    }

    async fn update_campaign(&self, campaign: Campaign) -> OutreachResult<()> {
        self.commit(self.inner.update_campaign(campaign), |_| true).await
    }

    async fn get_campaign(&self, campaign_id: CampaignId) -> OutreachResult<Option<Campaign>> {
        self.inner.get_campaign(campaign_id).await
    }

    async fn list_campaigns(&self) -> OutreachResult<Vec<Campaign>> {
        self.inner.list_campaigns().await
    }

    async fn append_discovery_run(&self, run: DiscoveryRun) -> OutreachResult<()> {
        self.commit(self.inner.append_discovery_run(run), |_| true).await
    }

    async fn list_discovery_runs(&self, campaign_id: CampaignId) -> OutreachResult<Vec<DiscoveryRun>> {
        self.inner.list_discovery_runs(campaign_id).await
    }

    async fn insert_attempt(&self, attempt: NewAttempt) -> OutreachResult<InsertOutcome> {
        self.commit(self.inner.insert_attempt(attempt), |outcome: &InsertOutcome| {
            matches!(outcome, InsertOutcome::Created(_))
        })
        .await
    }

    async fn update_attempt_status(
        &self,
        attempt_id: AttemptId,
        status: AttemptStatus,
        error: Option<String>,
    ) -> OutreachResult<OutreachAttempt> {
        self.commit(self.inner.update_attempt_status(attempt_id, status, error), |_| true)
            .await
    }

    async fn get_attempt(&self, attempt_id: AttemptId) -> OutreachResult<Option<OutreachAttempt>> {
        self.inner.get_attempt(attempt_id).await
    }

    async fn list_attempts(&self, campaign_id: Option<CampaignId>) -> OutreachResult<Vec<OutreachAttempt>> {
        self.inner.list_attempts(campaign_id).await
    }

    async fn insert_checkins(&self, checkins: Vec<CheckIn>) -> OutreachResult<()> {
        self.commit(self.inner.insert_checkins(checkins), |_| true).await
    }

    async fn list_checkins(&self, campaign_id: CampaignId) -> OutreachResult<Vec<CheckIn>> {
        self.inner.list_checkins(campaign_id).await
    }

    async fn claim_checkin(&self, checkin_id: CheckInId) -> OutreachResult<Option<CheckIn>> {
        let mutation = self.inner.claim_checkin(checkin_id);
        self.commit(mutation, |claimed: &Option<CheckIn>| claimed.is_some()).await
    }

    async fn record_checkin_result(
        &self,
        checkin_id: CheckInId,
        actual_response_count: u32,
        escalated: bool,
    ) -> OutreachResult<()> {
        self.commit(
            self.inner
                .record_checkin_result(checkin_id, actual_response_count, escalated),
            |_| true,
        )
        .await
    }

    async fn apply_engagement(
        &self,
        attempt_id: AttemptId,
        event: EngagementEvent,
        weights: EngagementWeights,
    ) -> OutreachResult<Option<AppliedEngagement>> {
        let mutation = self.inner.apply_engagement(attempt_id, event, weights);
        self.commit(mutation, |applied: &Option<AppliedEngagement>| applied.is_some())
            .await
    }

    async fn list_engagement(&self, campaign_id: Option<CampaignId>) -> OutreachResult<Vec<EngagementRecord>> {
        self.inner.list_engagement(campaign_id).await
    }
}
