//! Main entry point for the outreach binary
//!
//! Runs one campaign end to end against the simulated collaborators:
//! kickoff, replayed engagement between check-ins, then the deadline. Prints
//! the final status and analytics as JSON.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

use outreach::services::{
    simulate_engagement, InMemoryStore, JsonFileStore, LoggingNotificationSink, SimulatedOracle,
    SimulatedSender, SimulatedSource, WebhookNotificationSink,
};
use outreach::{
    CampaignEngine, CandidateSource, ChannelSender, Collaborators, NotificationSink, OutreachConfig,
    PersistenceStore,
};
use shared::{logging, AnalyticsFilter, CampaignId, Component, JobRequest, Location, Tier, Urgency};

/// Contractor outreach campaign runner
#[derive(Parser)]
#[command(name = "outreach")]
#[command(about = "Runs a contractor outreach campaign against simulated sources")]
pub struct Args {
    /// Job category, e.g. lawn_care or roofing
    #[arg(long)]
    pub category: String,

    /// Job location label
    #[arg(long)]
    pub location: String,

    /// Optional job description included in outreach messages
    #[arg(long)]
    pub description: Option<String>,

    /// Bids wanted
    #[arg(long, default_value = "3")]
    pub bids: u32,

    /// standard, urgent or emergency
    #[arg(long, default_value = "standard")]
    pub urgency: Urgency,

    /// Initial search radius in miles
    #[arg(long)]
    pub radius: Option<f64>,

    /// JSON config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Persist state as JSON in this directory (in-memory otherwise)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// POST notifications to this URL (logged otherwise)
    #[arg(long)]
    pub webhook_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Campaign timeline in seconds for every urgency
    #[arg(long)]
    pub timeline_secs: Option<u64>,

    /// Seed for the simulated sources, oracle, senders and engagement
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Share of simulated sends that fail
    #[arg(long, default_value = "0.05")]
    pub send_failure_rate: f64,
}

async fn build_engine(args: &Args) -> anyhow::Result<CampaignEngine> {
    let mut config = OutreachConfig::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(radius) = args.radius {
        config.discovery.default_radius_miles = radius;
    }
    if let Some(secs) = args.timeline_secs {
        config.monitor.timeline.standard_secs = secs;
        config.monitor.timeline.urgent_secs = secs;
        config.monitor.timeline.emergency_secs = secs;
    }
    // Check-ins are driven explicitly below
    config.monitor.schedule_timers = false;
    config.validate()?;

    let store: Arc<dyn PersistenceStore> = match &args.data_dir {
        Some(dir) => Arc::new(JsonFileStore::open(dir).await.context("opening data dir")?),
        None => Arc::new(InMemoryStore::new()),
    };
    let notifier: Arc<dyn NotificationSink> = match &args.webhook_url {
        Some(url) => Arc::new(WebhookNotificationSink::new(url.clone(), config.timeouts.notifier())?),
        None => Arc::new(LoggingNotificationSink),
    };
    let sources: Vec<Arc<dyn CandidateSource>> = Tier::ALL
        .into_iter()
        .map(|tier| Arc::new(SimulatedSource::new(tier, args.seed)) as Arc<dyn CandidateSource>)
        .collect();
    let senders: Vec<Arc<dyn ChannelSender>> = SimulatedSender::all(args.seed, args.send_failure_rate)
        .into_iter()
        .map(|sender| Arc::new(sender) as Arc<dyn ChannelSender>)
        .collect();

    Ok(CampaignEngine::new(
        config,
        Collaborators {
            sources,
            oracle: Some(Arc::new(SimulatedOracle::new(args.seed, 0.1))),
            senders,
            notifier,
            store,
            policy: None,
        },
    )?)
}

/// Replay engagement in slices between check-ins, then apply the deadline
async fn run_campaign(engine: &CampaignEngine, campaign_id: CampaignId, seed: u64) -> anyhow::Result<()> {
    let checkins = engine.checkins(campaign_id).await?;
    let slices = checkins.len() + 1;

    for round in 0..slices {
        // Escalations add attempts, so re-read before each slice
        let attempts = engine.attempts(campaign_id).await?;
        let events = simulate_engagement(&attempts, seed);
        let per_slice = events.len().div_ceil(slices);
        for (attempt, event) in events.into_iter().skip(round * per_slice).take(per_slice) {
            engine.record_response_event(attempt.id, event).await?;
        }

        let as_of = match checkins.get(round) {
            Some(checkin) => checkin.scheduled_at,
            None => engine.get_campaign_status(campaign_id).await?.deadline_at,
        };
        for report in engine.fire_due_checkins(campaign_id, as_of).await? {
            logging::log_success(
                Component::Monitor,
                &format!("check-in {} → {}", report.sequence, serde_json::to_string(&report.outcome)?),
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    logging::init_tracing(Some(&args.log_level));
    logging::log_startup(Component::Engine, "outreach CLI");

    let engine = build_engine(&args).await?;

    let mut request = JobRequest::new(args.category.clone(), Location::named(args.location.clone()));
    if let Some(description) = &args.description {
        request = request.with_description(description.clone());
    }

    let run = async {
        let campaign_id = engine.start_campaign(request, args.bids, args.urgency).await?;
        run_campaign(&engine, campaign_id, args.seed).await?;
        anyhow::Ok(campaign_id)
    };

    let campaign_id = tokio::select! {
        result = run => result.map_err(|e| {
            logging::log_error(Component::Engine, "Outreach run", &e);
            e
        })?,
        _ = signal::ctrl_c() => {
            logging::log_shutdown(Component::Engine, "Received Ctrl+C signal");
            engine.shutdown().await;
            return Ok(());
        }
    };

    let status = engine.get_campaign_status(campaign_id).await?;
    let analytics = engine.get_analytics(AnalyticsFilter::for_campaign(campaign_id)).await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    println!("{}", serde_json::to_string_pretty(&analytics)?);

    engine.shutdown().await;
    logging::log_success(Component::Engine, "Outreach run finished");
    Ok(())
}
