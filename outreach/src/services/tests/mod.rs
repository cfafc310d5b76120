//! Tests for the store, notifier and simulated adapters

pub mod file_store;
pub mod webhook;

use shared::{Campaign, Channel, ContractorKey, Job, JobRequest, Location, NewAttempt, Tier, Urgency};

pub fn sample_campaign() -> Campaign {
    let job = Job::from_request(
        JobRequest::new("fence_repair", Location::named("Boise, ID")),
        2,
        Urgency::Standard,
    );
    Campaign::forming(job, vec![Channel::Email, Channel::Form], 15.0, 30.0, chrono::Duration::hours(72))
}

pub fn new_attempt(campaign: &Campaign, contractor: &str, channel: Channel) -> NewAttempt {
    NewAttempt {
        campaign_id: campaign.id,
        contractor_key: ContractorKey::new(contractor),
        company_name: contractor.to_string(),
        tier: Tier::Tier1,
        channel,
    }
}
