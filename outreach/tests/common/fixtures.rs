//! Test fixtures and data for outreach tests
//!
//! Contractor pools and job requests shared by the integration suites.

use shared::{Candidate, JobRequest, Location, Tier};

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    pub const CATEGORY: &'static str = "lawn_care";
    pub const LOCATION: &'static str = "Austin, TX";

    /// Inside the default 15 mile radius
    pub const NEAR_MILES: f64 = 5.0;
    /// Outside 15 miles, inside 30
    pub const MID_MILES: f64 = 25.0;

    pub fn job_request() -> JobRequest {
        JobRequest::new(Self::CATEGORY, Location::named(Self::LOCATION))
            .with_description("front and back yard, weekly mowing")
    }

    fn tier_prefix(tier: Tier) -> &'static str {
        match tier {
            Tier::Tier1 => "Preferred",
            Tier::Tier2 => "Network",
            Tier::Tier3 => "Market",
        }
    }

    /// `count` email-reachable contractors with distinct names, all at `distance_miles`
    pub fn contractors(tier: Tier, start: usize, count: usize, distance_miles: f64) -> Vec<Candidate> {
        (start..start + count)
            .map(|n| Self::contractor(tier, &format!("{} Lawn {}", Self::tier_prefix(tier), n), distance_miles))
            .collect()
    }

    pub fn contractor(tier: Tier, name: &str, distance_miles: f64) -> Candidate {
        let slug: String = name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        Candidate::new(format!("{tier}-{slug}"), tier, name)
            .with_email(format!("bids@{slug}.example"))
            .with_distance(distance_miles)
    }

    /// Tier1 3, Tier2 4, Tier3 2, all within the starting radius
    pub fn sparse_market() -> Vec<(Tier, Vec<Candidate>)> {
        vec![
            (Tier::Tier1, Self::contractors(Tier::Tier1, 1, 3, Self::NEAR_MILES)),
            (Tier::Tier2, Self::contractors(Tier::Tier2, 1, 4, Self::NEAR_MILES)),
            (Tier::Tier3, Self::contractors(Tier::Tier3, 1, 2, Self::NEAR_MILES)),
        ]
    }

    /// Tier3 only: 3 within 15 miles, 6 more within 30
    pub fn expanding_market() -> Vec<Candidate> {
        let mut pool = Self::contractors(Tier::Tier3, 1, 3, 10.0);
        pool.extend(Self::contractors(Tier::Tier3, 4, 6, Self::MID_MILES));
        pool
    }

    /// Tier1 only: 10 rated contractors reachable by email and phone (heuristic 60),
    /// then 5 unrated email-only ones (heuristic 50)
    pub fn mixed_quality_market() -> Vec<Candidate> {
        let mut pool: Vec<Candidate> = (1..=10)
            .map(|n| {
                Self::contractor(Tier::Tier1, &format!("Rated Lawn {n}"), Self::NEAR_MILES)
                    .with_rating(4.0, 0)
                    .with_phone(format!("555-01{n:02}"))
            })
            .collect();
        pool.extend((1..=5).map(|n| Self::contractor(Tier::Tier1, &format!("Backup Lawn {n}"), Self::NEAR_MILES)));
        pool
    }
}
