//! Agent entity and the status state machine.
//!
//! [`AgentStatus::apply`] is the single source of truth for how an agent's
//! status responds to workflow and claim events. Storage applies it under a
//! write guard, so the decision and the write happen together.

use crate::{
    constants, AgentId, AgentStatus, StateError, Timestamp, ValidationError, ValidationResult,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static SLUG_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]{1,47}$").ok());

static ROLE_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]{0,31}$").ok());

// ============================================================================
// EVENTS
// ============================================================================

/// Something that happened to an agent and may move its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum AgentEvent {
    TaskAssigned,
    ProposalSubmitted,
    WorkUpdateSubmitted,
    CompletionSubmitted,
    AssistanceRequested,
    ProposalPassed,
    ProposalRejected,
    EscalationResolved,
}

impl AgentEvent {
    pub const ALL: [AgentEvent; 8] = [
        AgentEvent::TaskAssigned,
        AgentEvent::ProposalSubmitted,
        AgentEvent::WorkUpdateSubmitted,
        AgentEvent::CompletionSubmitted,
        AgentEvent::AssistanceRequested,
        AgentEvent::ProposalPassed,
        AgentEvent::ProposalRejected,
        AgentEvent::EscalationResolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentEvent::TaskAssigned => "task_assigned",
            AgentEvent::ProposalSubmitted => "proposal_submitted",
            AgentEvent::WorkUpdateSubmitted => "work_update_submitted",
            AgentEvent::CompletionSubmitted => "completion_submitted",
            AgentEvent::AssistanceRequested => "assistance_requested",
            AgentEvent::ProposalPassed => "proposal_passed",
            AgentEvent::ProposalRejected => "proposal_rejected",
            AgentEvent::EscalationResolved => "escalation_resolved",
        }
    }
}

impl fmt::Display for AgentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AgentStatus {
    /// Compute the status after `event`, or refuse it.
    ///
    /// A blocked agent can only report progress, re-escalate, hear about a
    /// review, or be unblocked. Everything else is an illegal transition and
    /// leaves the agent untouched.
    pub fn apply(self, event: AgentEvent) -> Result<AgentStatus, StateError> {
        use AgentEvent as E;
        use AgentStatus as S;

        let next = match (self, event) {
            (S::Blocked, E::TaskAssigned)
            | (S::Blocked, E::ProposalSubmitted)
            | (S::Blocked, E::CompletionSubmitted) => {
                return Err(StateError::IllegalTransition {
                    from: self,
                    event: event.as_str().to_string(),
                });
            }

            (_, E::TaskAssigned) => S::Working,
            (_, E::ProposalSubmitted) => S::Waiting,
            (_, E::CompletionSubmitted) => S::Idle,
            (_, E::AssistanceRequested) => S::Blocked,
            (current, E::WorkUpdateSubmitted) => current,

            (S::Waiting, E::ProposalPassed) => S::Working,
            (S::Waiting, E::ProposalRejected) => S::Idle,
            (current, E::ProposalPassed) | (current, E::ProposalRejected) => current,

            (S::Blocked, E::EscalationResolved) => S::Working,
            (current, E::EscalationResolved) => current,
        };
        Ok(next)
    }

    /// Whether `event` would be accepted from this status.
    pub fn permits(self, event: AgentEvent) -> bool {
        self.apply(event).is_ok()
    }
}

// ============================================================================
// COUNTERS
// ============================================================================

/// Monotonic per-agent counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AgentCounters {
    pub proposals_submitted: u64,
    pub proposals_approved: u64,
    pub proposals_rejected: u64,
    pub credits_earned: u64,
    pub tokens_used: u64,
}

/// Increment applied atomically to [`AgentCounters`]. Unsigned, so counters
/// can only grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CounterDelta {
    pub proposals_submitted: u64,
    pub proposals_approved: u64,
    pub proposals_rejected: u64,
    pub credits_earned: u64,
    pub tokens_used: u64,
}

impl CounterDelta {
    pub fn submitted() -> Self {
        Self {
            proposals_submitted: 1,
            ..Self::default()
        }
    }

    pub fn approved() -> Self {
        Self {
            proposals_approved: 1,
            ..Self::default()
        }
    }

    pub fn rejected() -> Self {
        Self {
            proposals_rejected: 1,
            ..Self::default()
        }
    }

    pub fn credits(amount: u64) -> Self {
        Self {
            credits_earned: amount,
            ..Self::default()
        }
    }

    pub fn with_tokens(mut self, tokens: Option<u64>) -> Self {
        self.tokens_used = self.tokens_used.saturating_add(tokens.unwrap_or(0));
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl AgentCounters {
    /// Apply an increment, saturating at `u64::MAX`.
    pub fn add(&mut self, delta: CounterDelta) {
        self.proposals_submitted = self
            .proposals_submitted
            .saturating_add(delta.proposals_submitted);
        self.proposals_approved = self
            .proposals_approved
            .saturating_add(delta.proposals_approved);
        self.proposals_rejected = self
            .proposals_rejected
            .saturating_add(delta.proposals_rejected);
        self.credits_earned = self.credits_earned.saturating_add(delta.credits_earned);
        self.tokens_used = self.tokens_used.saturating_add(delta.tokens_used);
    }
}

// ============================================================================
// AGENT
// ============================================================================

/// A registered autonomous worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Agent {
    pub agent_id: AgentId,
    pub slug: String,
    pub display_name: String,
    pub role: String,
    pub objective: Option<String>,
    pub status: AgentStatus,
    /// Hex SHA-256 digest of the bearer credential.
    #[serde(skip_serializing, default)]
    pub credential_hash: String,
    pub owner_wallet: Option<String>,
    pub counters: AgentCounters,
    pub created_at: Timestamp,
    pub last_active_at: Timestamp,
}

impl Agent {
    pub fn is_blocked(&self) -> bool {
        self.status == AgentStatus::Blocked
    }

    /// Whether a quest with the given role requirement suits this agent.
    pub fn matches_role(&self, role_match: Option<&str>) -> bool {
        role_match.map_or(true, |role| role == self.role)
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

pub fn validate_slug(slug: &str) -> ValidationResult<()> {
    let valid = SLUG_PATTERN
        .as_ref()
        .map_or(false, |pattern| pattern.is_match(slug));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field: "slug".to_string(),
            reason: "must be 2-48 chars of lowercase letters, digits, '-' or '_'".to_string(),
        })
    }
}

pub fn validate_role(role: &str) -> ValidationResult<()> {
    let valid = ROLE_PATTERN
        .as_ref()
        .map_or(false, |pattern| pattern.is_match(role));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field: "role".to_string(),
            reason: "must start with a lowercase letter, up to 32 chars".to_string(),
        })
    }
}

/// Trim and bound a display name.
pub fn normalize_display_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();
    let len = name.chars().count();
    if len == 0 {
        return Err(ValidationError::RequiredFieldMissing {
            field: "display_name".to_string(),
        });
    }
    if len > constants::MAX_DISPLAY_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "display_name".to_string(),
            max: constants::MAX_DISPLAY_NAME_LEN,
            actual: len,
        });
    }
    Ok(name.to_string())
}

/// Trim an objective; blank objectives become `None`.
pub fn normalize_objective(objective: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(objective) = objective.map(str::trim).filter(|o| !o.is_empty()) else {
        return Ok(None);
    };
    let len = objective.chars().count();
    if len > constants::MAX_OBJECTIVE_LEN {
        return Err(ValidationError::TooLong {
            field: "objective".to_string(),
            max: constants::MAX_OBJECTIVE_LEN,
            actual: len,
        });
    }
    Ok(Some(objective.to_string()))
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_status() -> impl Strategy<Value = AgentStatus> {
        prop::sample::select(AgentStatus::ALL.to_vec())
    }

    fn arb_event() -> impl Strategy<Value = AgentEvent> {
        prop::sample::select(AgentEvent::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Only a resolved escalation gets an agent out of `blocked`.
        #[test]
        fn prop_blocked_exits_only_on_resolution(
            events in prop::collection::vec(arb_event(), 0..20),
        ) {
            let mut status = AgentStatus::Blocked;
            for event in events {
                match status.apply(event) {
                    Ok(next) => {
                        if status == AgentStatus::Blocked && next != AgentStatus::Blocked {
                            prop_assert_eq!(event, AgentEvent::EscalationResolved);
                        }
                        status = next;
                    }
                    Err(_) => prop_assert_eq!(status, AgentStatus::Blocked),
                }
            }
        }

        /// Work updates never change status.
        #[test]
        fn prop_work_update_is_identity(status in arb_status()) {
            prop_assert_eq!(status.apply(AgentEvent::WorkUpdateSubmitted), Ok(status));
        }

        /// Counters never decrease under any sequence of increments.
        #[test]
        fn prop_counters_monotonic(
            deltas in prop::collection::vec((0u64..1000, 0u64..1000, 0u64..5000), 0..30),
        ) {
            let mut counters = AgentCounters::default();
            for (submitted, credits, tokens) in deltas {
                let before = counters;
                counters.add(CounterDelta {
                    proposals_submitted: submitted,
                    credits_earned: credits,
                    tokens_used: tokens,
                    ..CounterDelta::default()
                });
                prop_assert!(counters.proposals_submitted >= before.proposals_submitted);
                prop_assert!(counters.credits_earned >= before.credits_earned);
                prop_assert!(counters.tokens_used >= before.tokens_used);
            }
        }
    }
}
