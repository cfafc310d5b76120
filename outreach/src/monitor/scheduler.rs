//! Cancellable per-campaign timers
//!
//! Each campaign with live timers owns one `watch` channel. Timer tasks race
//! their sleep against that channel; cancelling the campaign flips the flag
//! and every pending task for it returns without running.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use shared::{component_debug, CampaignId, Component};

#[derive(Default)]
pub struct TimerScheduler {
    campaigns: Mutex<HashMap<CampaignId, watch::Sender<bool>>>,
}

impl TimerScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay` unless the campaign is cancelled first
    pub async fn schedule<F>(&self, campaign_id: CampaignId, delay: Duration, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut cancelled = {
            let mut campaigns = self.campaigns.lock().await;
            campaigns
                .entry(campaign_id)
                .or_insert_with(|| watch::channel(false).0)
                .subscribe()
        };

        tokio::spawn(async move {
            tokio::select! {
                biased;

                // Fires on cancel, or when the sender is dropped
                _ = cancelled.changed() => {
                    component_debug!(
                        Component::Monitor,
                        campaign_id = %campaign_id,
                        "⏹️ Timer cancelled"
                    );
                }
                _ = tokio::time::sleep(delay) => task.await,
            }
        })
    }

    /// Cancel every pending timer of a campaign
    pub async fn cancel(&self, campaign_id: CampaignId) -> bool {
        match self.campaigns.lock().await.remove(&campaign_id) {
            Some(sender) => {
                let _ = sender.send(true);
                true
            }
            None => false,
        }
    }

    pub async fn cancel_all(&self) -> usize {
        let mut campaigns = self.campaigns.lock().await;
        let count = campaigns.len();
        for (_, sender) in campaigns.drain() {
            let _ = sender.send(true);
        }
        count
    }

    /// Campaigns with live timers
    pub async fn active_campaigns(&self) -> usize {
        self.campaigns.lock().await.len()
    }
}
