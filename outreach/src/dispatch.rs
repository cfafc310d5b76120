//! Multi-channel outreach dispatch
//!
//! One attempt per selected contractor per enabled channel. Channels a
//! contractor cannot be reached on are skipped. A failed send marks only its
//! own attempt failed; sends run concurrently up to the configured limit.
//! The store refuses a second open attempt for the same contractor and
//! channel, which makes re-dispatch a no-op unless the earlier attempt failed
//! or bounced.

use futures_util::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use shared::{
    component_debug, component_info, component_warn, AttemptId, AttemptStatus, Campaign, Candidate,
    Channel, Component, ContractorKey, Job, NewAttempt, OutreachAttempt, OutreachMessage,
    ScoredCandidate, Tier,
};

use crate::error::OutreachResult;
use crate::resilience::call_with_retry;
use crate::traits::{ChannelSender, InsertOutcome, PersistenceStore};

/// Per-channel results of one dispatch wave
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelTally {
    pub sent: u32,
    pub failed: u32,
    /// Contractor has no address for this channel
    pub unreachable: u32,
    /// An open attempt already existed
    pub duplicate: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub attempts_created: u32,
    pub sent: u32,
    pub failed: u32,
    pub unreachable: u32,
    pub duplicates: u32,
    /// Channels with no sender configured
    pub no_sender: u32,
    pub by_channel: BTreeMap<Channel, ChannelTally>,
    /// Contractors with at least one successful send in this wave
    pub contacted: BTreeSet<ContractorKey>,
    pub contacted_by_tier: BTreeMap<Tier, u32>,
}

/// Render the fixed outreach template for a channel
pub fn compose_message(job: &Job, candidate: &Candidate, channel: Channel, attempt_id: AttemptId) -> OutreachMessage {
    let category = job.category.replace('_', " ");
    let subject = format!("New {} job near {}", category, job.location.label);
    let body = match channel {
        Channel::Sms => format!(
            "Hi {}, we have a {} job near {}. Reply YES if you'd like to bid. Ref {}",
            candidate.company_name, category, job.location.label, attempt_id
        ),
        Channel::Phone => format!(
            "Call script: introduce a {} job near {} to {} and ask whether they can provide a bid.",
            category, job.location.label, candidate.company_name
        ),
        Channel::Email | Channel::Form => {
            let mut body = format!(
                "Hello {},\n\nA homeowner near {} is looking for bids on a {} job",
                candidate.company_name, job.location.label, category
            );
            if let Some(description) = &job.description {
                body.push_str(&format!(": {description}"));
            }
            body.push_str(&format!(
                ".\n\nIf you're interested, reply to this message with your availability and an estimate.\n\nReference: {attempt_id}"
            ));
            body
        }
    };
    OutreachMessage {
        attempt_id,
        channel,
        subject,
        body,
    }
}

pub struct Dispatcher {
    senders: HashMap<Channel, Arc<dyn ChannelSender>>,
    store: Arc<dyn PersistenceStore>,
    timeout: Duration,
    concurrency: usize,
}

impl Dispatcher {
    pub fn new(
        senders: Vec<Arc<dyn ChannelSender>>,
        store: Arc<dyn PersistenceStore>,
        timeout: Duration,
        concurrency: usize,
    ) -> Self {
        let senders = senders
            .into_iter()
            .map(|sender| (sender.channel(), sender))
            .collect();
        Self {
            senders,
            store,
            timeout,
            concurrency: concurrency.max(1),
        }
    }

    pub fn has_sender(&self, channel: Channel) -> bool {
        self.senders.contains_key(&channel)
    }

    /// Send one attempt and record the result on it
    async fn send_one(
        &self,
        job: &Job,
        attempt: OutreachAttempt,
        candidate: &Candidate,
        sender: Arc<dyn ChannelSender>,
    ) -> OutreachResult<OutreachAttempt> {
        let message = compose_message(job, candidate, attempt.channel, attempt.id);
        let report = call_with_retry(self.timeout, || sender.send(candidate, &message)).await;
        let (status, error) = match report.result {
            Ok(receipt) if receipt.delivered => (AttemptStatus::Delivered, None),
            Ok(_) => (AttemptStatus::Sent, None),
            Err(e) => {
                component_warn!(
                    Component::Dispatch,
                    attempt_id = %attempt.id,
                    channel = %attempt.channel,
                    contractor = %attempt.contractor_key,
                    "📪 Send failed: {}",
                    e
                );
                (AttemptStatus::Failed, Some(e.to_string()))
            }
        };
        self.store.update_attempt_status(attempt.id, status, error).await
    }

    /// Dispatch one wave to `selected` over `channels`
    pub async fn dispatch(
        &self,
        campaign: &Campaign,
        selected: &[ScoredCandidate],
        channels: &[Channel],
    ) -> OutreachResult<DispatchSummary> {
        let mut summary = DispatchSummary::default();
        let mut pending: Vec<(OutreachAttempt, &Candidate, Arc<dyn ChannelSender>)> = Vec::new();

        for scored in selected {
            for channel in channels {
                let tally = summary.by_channel.entry(*channel).or_default();
                if !scored.candidate.contact.supports(*channel) {
                    tally.unreachable += 1;
                    summary.unreachable += 1;
                    continue;
                }
                let Some(sender) = self.senders.get(channel) else {
                    summary.no_sender += 1;
                    continue;
                };

                let outcome = self
                    .store
                    .insert_attempt(NewAttempt {
                        campaign_id: campaign.id,
                        contractor_key: scored.key.clone(),
                        company_name: scored.candidate.company_name.clone(),
                        tier: scored.tier(),
                        channel: *channel,
                    })
                    .await?;
                match outcome {
                    InsertOutcome::Created(attempt) => {
                        summary.attempts_created += 1;
                        pending.push((attempt, &scored.candidate, Arc::clone(sender)));
                    }
                    InsertOutcome::Duplicate(existing) => {
                        component_debug!(
                            Component::Dispatch,
                            campaign_id = %campaign.id,
                            attempt_id = %existing.id,
                            channel = %channel,
                            "↩️ Open attempt exists, skipping"
                        );
                        tally.duplicate += 1;
                        summary.duplicates += 1;
                    }
                }
            }
        }

        let sends: BoxStream<'_, OutreachResult<OutreachAttempt>> = stream::iter(pending)
            .map(|(attempt, candidate, sender)| self.send_one(&campaign.job, attempt, candidate, sender))
            .buffer_unordered(self.concurrency)
            .boxed();
        let results: Vec<OutreachResult<OutreachAttempt>> = sends.collect().await;

        for result in results {
            let attempt = result?;
            let tally = summary.by_channel.entry(attempt.channel).or_default();
            if attempt.status.is_success() {
                tally.sent += 1;
                summary.sent += 1;
                if summary.contacted.insert(attempt.contractor_key.clone()) {
                    *summary.contacted_by_tier.entry(attempt.tier).or_insert(0) += 1;
                }
            } else {
                tally.failed += 1;
                summary.failed += 1;
            }
        }

        component_info!(
            Component::Dispatch,
            campaign_id = %campaign.id,
            created = summary.attempts_created,
            sent = summary.sent,
            failed = summary.failed,
            unreachable = summary.unreachable,
            duplicates = summary.duplicates,
            "📨 Dispatch wave complete to {} contractors",
            summary.contacted.len()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::services::InMemoryStore;
    use crate::traits::MockChannelSender;
    use shared::{Assessment, JobRequest, Location, OracleAssessment, SendReceipt, Urgency};

    fn campaign() -> Campaign {
        let job = Job::from_request(
            JobRequest::new("lawn_care", Location::named("Austin, TX")).with_description("weekly mowing"),
            3,
            Urgency::Standard,
        );
        Campaign::forming(job, vec![Channel::Email, Channel::Sms], 15.0, 30.0, chrono::Duration::hours(72))
    }

    fn scored(name: &str, candidate: Candidate) -> ScoredCandidate {
        ScoredCandidate {
            key: ContractorKey::new(name.to_lowercase()),
            candidate,
            arrival: 0,
            assessment: Assessment::from_oracle(OracleAssessment {
                score: 80.0,
                reasoning: "test".to_string(),
                strengths: vec![],
                concerns: vec![],
            }),
            rank: 1,
        }
    }

    fn sender(channel: Channel, fail_for: Option<&'static str>, calls: usize) -> Arc<dyn ChannelSender> {
        let mut mock = MockChannelSender::new();
        mock.expect_channel().return_const(channel);
        mock.expect_send().times(calls).returning(move |candidate, _| {
            if Some(candidate.company_name.as_str()) == fail_for {
                Err(SourceError::Permanent("mailbox rejected".to_string()))
            } else {
                Ok(SendReceipt {
                    provider_id: Some("msg-1".to_string()),
                    delivered: true,
                })
            }
        });
        Arc::new(mock)
    }

    #[tokio::test]
    async fn test_unreachable_skipped_and_failures_isolated() {
        let store = Arc::new(InMemoryStore::new());
        let dispatcher = Dispatcher::new(
            vec![
                sender(Channel::Email, Some("Beta Lawn"), 2),
                sender(Channel::Sms, None, 1),
            ],
            store.clone(),
            Duration::from_secs(1),
            4,
        );
        let c = campaign();
        let selected = vec![
            scored(
                "Acme Lawn",
                Candidate::new("1", Tier::Tier1, "Acme Lawn")
                    .with_email("hi@acme.example")
                    .with_phone("555-0100"),
            ),
            scored(
                "Beta Lawn",
                Candidate::new("2", Tier::Tier2, "Beta Lawn").with_email("hi@beta.example"),
            ),
        ];

        let summary = dispatcher.dispatch(&c, &selected, &c.enabled_channels).await.unwrap();

        assert_eq!(summary.attempts_created, 3);
        assert_eq!(summary.sent, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.unreachable, 1);
        assert_eq!(summary.by_channel[&Channel::Sms].unreachable, 1);
        assert_eq!(summary.contacted.len(), 1);
        assert!(summary.contacted.contains(&ContractorKey::new("acme lawn")));
        assert_eq!(summary.contacted_by_tier.get(&Tier::Tier1), Some(&1));

        let attempts = store.list_attempts(Some(c.id)).await.unwrap();
        let failed: Vec<_> = attempts.iter().filter(|a| a.status == AttemptStatus::Failed).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].company_name, "Beta Lawn");
        assert!(failed[0].error.as_deref().unwrap_or_default().contains("mailbox rejected"));
    }

    #[tokio::test]
    async fn test_redispatch_is_noop_for_open_attempts() {
        let store = Arc::new(InMemoryStore::new());
        // One send only across both waves
        let dispatcher = Dispatcher::new(
            vec![sender(Channel::Email, None, 1)],
            store.clone(),
            Duration::from_secs(1),
            2,
        );
        let c = campaign();
        let selected = vec![scored(
            "Acme Lawn",
            Candidate::new("1", Tier::Tier1, "Acme Lawn").with_email("hi@acme.example"),
        )];

        let first = dispatcher.dispatch(&c, &selected, &[Channel::Email]).await.unwrap();
        let second = dispatcher.dispatch(&c, &selected, &[Channel::Email]).await.unwrap();

        assert_eq!(first.sent, 1);
        assert_eq!(second.attempts_created, 0);
        assert_eq!(second.duplicates, 1);
        assert_eq!(store.list_attempts(Some(c.id)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_channel_without_sender_counted() {
        let store = Arc::new(InMemoryStore::new());
        let dispatcher = Dispatcher::new(vec![], store.clone(), Duration::from_secs(1), 1);
        let c = campaign();
        let selected = vec![scored(
            "Gamma Roofing",
            Candidate::new("3", Tier::Tier3, "Gamma Roofing").with_form_url("https://gamma.example/quote"),
        )];

        let summary = dispatcher.dispatch(&c, &selected, &[Channel::Form]).await.unwrap();

        assert_eq!(summary.no_sender, 1);
        assert_eq!(summary.attempts_created, 0);
        assert!(!dispatcher.has_sender(Channel::Form));
    }

    #[test]
    fn test_compose_message_per_channel() {
        let c = campaign();
        let candidate = Candidate::new("1", Tier::Tier1, "Acme Lawn");
        let id = AttemptId::new();

        let email = compose_message(&c.job, &candidate, Channel::Email, id);
        assert_eq!(email.subject, "New lawn care job near Austin, TX");
        assert!(email.body.contains("weekly mowing"));
        assert!(email.body.contains(&id.to_string()));

        let sms = compose_message(&c.job, &candidate, Channel::Sms, id);
        assert!(sms.body.starts_with("Hi Acme Lawn"));
        assert!(sms.body.contains("Reply YES"));
    }
}
