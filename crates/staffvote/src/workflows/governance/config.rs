use std::env;

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Duration/threshold policy for one campaign kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CampaignPolicy {
    pub duration_days: i64,
    /// Agree percentage a campaign must reach to pass. Always positive, so
    /// a campaign with no votes (percentage 0) can never pass.
    pub pass_threshold: f64,
}

impl CampaignPolicy {
    pub fn duration(&self) -> Duration {
        Duration::days(self.duration_days)
    }
}

/// Tunables for the voting engine. Every constant the trigger, ballot, and
/// resolution paths consult lives here so deployments can adjust them
/// without a rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Days employed before an intern becomes promotion-eligible.
    pub required_tenure_days: i64,
    /// Punishment fires once lateCount exceeds this in a period.
    pub late_count_threshold: u32,
    /// Punishment fires once total late minutes exceed this in a period.
    pub late_minutes_threshold: u32,
    pub promotion: CampaignPolicy,
    pub demotion: CampaignPolicy,
    /// Cool-down after a failed auto campaign before the same employee/kind
    /// can be re-triggered.
    pub buffer_period_days: i64,
    /// Ballot edits allowed per voter per campaign.
    pub max_modifications: u32,
    /// Minimum tenure required of voters in auto campaigns.
    pub voter_min_tenure_days: i64,
    /// Active-but-expired campaigns tolerated before health checks flag a
    /// resolution backlog.
    pub expiry_backlog_threshold: usize,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        // Canonical defaults: promotion runs longer and is harder to pass
        // than demotion.
        Self {
            required_tenure_days: 20,
            late_count_threshold: 3,
            late_minutes_threshold: 10,
            promotion: CampaignPolicy {
                duration_days: 5,
                pass_threshold: 60.0,
            },
            demotion: CampaignPolicy {
                duration_days: 3,
                pass_threshold: 50.0,
            },
            buffer_period_days: 30,
            max_modifications: 3,
            voter_min_tenure_days: 0,
            expiry_backlog_threshold: 5,
        }
    }
}

impl GovernanceConfig {
    /// Defaults overridden by `STAFFVOTE_*` environment variables where set.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(days) = env_parse("STAFFVOTE_REQUIRED_TENURE_DAYS") {
            config.required_tenure_days = days;
        }
        if let Some(count) = env_parse("STAFFVOTE_LATE_COUNT_THRESHOLD") {
            config.late_count_threshold = count;
        }
        if let Some(minutes) = env_parse("STAFFVOTE_LATE_MINUTES_THRESHOLD") {
            config.late_minutes_threshold = minutes;
        }
        if let Some(days) = env_parse("STAFFVOTE_PROMOTION_DURATION_DAYS") {
            config.promotion.duration_days = days;
        }
        if let Some(threshold) = env_parse("STAFFVOTE_PROMOTION_PASS_THRESHOLD") {
            if threshold > 0.0 {
                config.promotion.pass_threshold = threshold;
            }
        }
        if let Some(days) = env_parse("STAFFVOTE_DEMOTION_DURATION_DAYS") {
            config.demotion.duration_days = days;
        }
        if let Some(threshold) = env_parse("STAFFVOTE_DEMOTION_PASS_THRESHOLD") {
            if threshold > 0.0 {
                config.demotion.pass_threshold = threshold;
            }
        }
        if let Some(days) = env_parse("STAFFVOTE_BUFFER_PERIOD_DAYS") {
            config.buffer_period_days = days;
        }
        if let Some(limit) = env_parse("STAFFVOTE_MAX_MODIFICATIONS") {
            config.max_modifications = limit;
        }

        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|raw| raw.trim().parse().ok())
}
