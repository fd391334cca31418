//! Configuration types

use crate::constants::*;
use crate::ConfigError;
use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long a claim may sit untouched before it can be reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ClaimLeasePolicy {
    /// Claims are held until completed or the holder is purged.
    #[default]
    NoExpiry,
    /// Claims older than the lease are reopened by `recover_expired_claims`.
    #[cfg_attr(feature = "openapi", schema(value_type = u64))]
    Lease(Duration),
}

impl ClaimLeasePolicy {
    /// Claims made before this instant are expired, if the policy has a lease.
    pub fn cutoff(&self, now: chrono::DateTime<chrono::Utc>) -> Option<chrono::DateTime<chrono::Utc>> {
        match self {
            ClaimLeasePolicy::NoExpiry => None,
            ClaimLeasePolicy::Lease(lease) => ChronoDuration::from_std(*lease)
                .ok()
                .and_then(|lease| now.checked_sub_signed(lease)),
        }
    }
}

/// Coordination settings shared by every service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SwarmConfig {
    // Submissions
    pub min_title_len: usize,
    pub max_title_len: usize,
    pub min_content_len: usize,
    /// Refuse a new proposal while the author has one awaiting review.
    pub enforce_single_pending_proposal: bool,

    // Boards
    pub quest_reward_min: u64,
    pub quest_reward_max: u64,
    pub bounty_reward_min: u64,
    pub bounty_reward_max: u64,
    pub bounty_claim_limit: usize,
    pub claim_lease: ClaimLeasePolicy,
    pub board_list_limit: usize,

    // Matcher
    #[cfg_attr(feature = "openapi", schema(value_type = u64))]
    pub matcher_interval: Duration,
    pub matcher_agent_batch: usize,
    pub matcher_quest_batch: usize,

    // Messaging
    pub message_max_len: usize,
    pub message_list_default: usize,
    pub message_list_max: usize,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            min_title_len: DEFAULT_MIN_TITLE_LEN,
            max_title_len: DEFAULT_MAX_TITLE_LEN,
            min_content_len: DEFAULT_MIN_CONTENT_LEN,
            enforce_single_pending_proposal: true,
            quest_reward_min: QUEST_REWARD_MIN,
            quest_reward_max: QUEST_REWARD_MAX,
            bounty_reward_min: BOUNTY_REWARD_MIN,
            bounty_reward_max: BOUNTY_REWARD_MAX,
            bounty_claim_limit: DEFAULT_BOUNTY_CLAIM_LIMIT,
            claim_lease: ClaimLeasePolicy::NoExpiry,
            board_list_limit: DEFAULT_BOARD_LIST_LIMIT,
            matcher_interval: Duration::from_secs(DEFAULT_MATCHER_INTERVAL_SECS),
            matcher_agent_batch: DEFAULT_MATCHER_AGENT_BATCH,
            matcher_quest_batch: DEFAULT_MATCHER_QUEST_BATCH,
            message_max_len: DEFAULT_MESSAGE_MAX_LEN,
            message_list_default: DEFAULT_MESSAGE_LIST_LIMIT,
            message_list_max: MAX_MESSAGE_LIST_LIMIT,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl SwarmConfig {
    /// Build from `SWARM_*` environment variables, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let claim_lease = env_parse::<u64>("SWARM_CLAIM_LEASE_SECS")
            .filter(|secs| *secs > 0)
            .map(|secs| ClaimLeasePolicy::Lease(Duration::from_secs(secs)))
            .unwrap_or(defaults.claim_lease);

        let enforce_single_pending_proposal = std::env::var("SWARM_SINGLE_PENDING_PROPOSAL")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(defaults.enforce_single_pending_proposal);

        Self {
            min_title_len: env_parse("SWARM_MIN_TITLE_LEN").unwrap_or(defaults.min_title_len),
            max_title_len: env_parse("SWARM_MAX_TITLE_LEN").unwrap_or(defaults.max_title_len),
            min_content_len: env_parse("SWARM_MIN_CONTENT_LEN")
                .unwrap_or(defaults.min_content_len),
            enforce_single_pending_proposal,
            quest_reward_min: defaults.quest_reward_min,
            quest_reward_max: defaults.quest_reward_max,
            bounty_reward_min: defaults.bounty_reward_min,
            bounty_reward_max: defaults.bounty_reward_max,
            bounty_claim_limit: env_parse("SWARM_BOUNTY_CLAIM_LIMIT")
                .unwrap_or(defaults.bounty_claim_limit),
            claim_lease,
            board_list_limit: env_parse("SWARM_BOARD_LIST_LIMIT")
                .unwrap_or(defaults.board_list_limit),
            matcher_interval: env_parse("SWARM_MATCHER_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.matcher_interval),
            matcher_agent_batch: env_parse("SWARM_MATCHER_AGENT_BATCH")
                .unwrap_or(defaults.matcher_agent_batch),
            matcher_quest_batch: env_parse("SWARM_MATCHER_QUEST_BATCH")
                .unwrap_or(defaults.matcher_quest_batch),
            message_max_len: env_parse("SWARM_MESSAGE_MAX_LEN")
                .unwrap_or(defaults.message_max_len),
            message_list_default: defaults.message_list_default,
            message_list_max: defaults.message_list_max,
        }
    }

    /// Short matcher interval and a one-hour claim lease for local runs.
    pub fn development() -> Self {
        Self {
            matcher_interval: Duration::from_secs(5),
            claim_lease: ClaimLeasePolicy::Lease(Duration::from_secs(3600)),
            ..Self::default()
        }
    }

    pub fn with_claim_lease(mut self, lease: Duration) -> Self {
        self.claim_lease = ClaimLeasePolicy::Lease(lease);
        self
    }

    pub fn with_bounty_claim_limit(mut self, limit: usize) -> Self {
        self.bounty_claim_limit = limit;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigError {
            ConfigError::InvalidValue {
                field: field.to_string(),
                value: value.to_string(),
                reason: reason.to_string(),
            }
        }

        if self.min_title_len == 0 {
            return Err(invalid("min_title_len", self.min_title_len, "must be greater than 0"));
        }
        if self.max_title_len < self.min_title_len {
            return Err(invalid(
                "max_title_len",
                self.max_title_len,
                "must be at least min_title_len",
            ));
        }
        if self.quest_reward_min == 0 || self.quest_reward_min > self.quest_reward_max {
            return Err(invalid(
                "quest_reward_min",
                self.quest_reward_min,
                "must be positive and not exceed quest_reward_max",
            ));
        }
        if self.bounty_reward_min == 0 || self.bounty_reward_min > self.bounty_reward_max {
            return Err(invalid(
                "bounty_reward_min",
                self.bounty_reward_min,
                "must be positive and not exceed bounty_reward_max",
            ));
        }
        if self.bounty_claim_limit == 0 {
            return Err(invalid(
                "bounty_claim_limit",
                self.bounty_claim_limit,
                "must be greater than 0",
            ));
        }
        if let ClaimLeasePolicy::Lease(lease) = self.claim_lease {
            if lease.is_zero() {
                return Err(invalid("claim_lease", "0s", "lease must be positive"));
            }
        }
        if self.matcher_interval.is_zero() {
            return Err(invalid("matcher_interval", "0s", "must be positive"));
        }
        if self.matcher_agent_batch == 0 || self.matcher_quest_batch == 0 {
            return Err(invalid(
                "matcher_batch",
                format!("{}/{}", self.matcher_agent_batch, self.matcher_quest_batch),
                "batch sizes must be greater than 0",
            ));
        }
        if self.message_max_len == 0 {
            return Err(invalid("message_max_len", self.message_max_len, "must be greater than 0"));
        }
        if self.message_list_default == 0 || self.message_list_default > self.message_list_max {
            return Err(invalid(
                "message_list_default",
                self.message_list_default,
                "must be within 1..=message_list_max",
            ));
        }
        Ok(())
    }

    /// Clamp a requested inbox page size into `[1, message_list_max]`.
    pub fn clamp_message_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.message_list_default)
            .clamp(1, self.message_list_max.max(1))
    }
}
