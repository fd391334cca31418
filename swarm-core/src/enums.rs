//! Enum types with database string round-trips.
//!
//! Every enum stores as a lowercase snake_case string, which is also its serde
//! representation. Parsing is case-insensitive and accepts the common
//! spelling variants seen in agent payloads (`in-progress`, `InProgress`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Generates `Display`, `FromStr` and a parse error type for an enum that
/// already provides `as_db_str` / `from_db_str`.
macro_rules! db_string_enum {
    ($ty:ident, $err:ident, $label:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_db_str())
            }
        }

        impl FromStr for $ty {
            type Err = $err;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_db_str(s)
            }
        }

        #[doc = concat!("Error when parsing an invalid ", $label, " string.")]
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $err(pub String);

        impl fmt::Display for $err {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!("Invalid ", $label, ": {}"), self.0)
            }
        }

        impl std::error::Error for $err {}
    };
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase().replace(['-', ' '], "_")
}

// ============================================================================
// ENTITY TYPE
// ============================================================================

/// Entity type discriminator used in errors and storage diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum EntityType {
    Agent,
    Proposal,
    Quest,
    Bounty,
    Message,
    WakeLog,
}

impl EntityType {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            EntityType::Agent => "agent",
            EntityType::Proposal => "proposal",
            EntityType::Quest => "quest",
            EntityType::Bounty => "bounty",
            EntityType::Message => "message",
            EntityType::WakeLog => "wake_log",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, EntityTypeParseError> {
        match normalize(s).as_str() {
            "agent" => Ok(EntityType::Agent),
            "proposal" => Ok(EntityType::Proposal),
            "quest" => Ok(EntityType::Quest),
            "bounty" => Ok(EntityType::Bounty),
            "message" => Ok(EntityType::Message),
            "wake_log" | "wakelog" => Ok(EntityType::WakeLog),
            _ => Err(EntityTypeParseError(s.to_string())),
        }
    }
}

db_string_enum!(EntityType, EntityTypeParseError, "entity type");

// ============================================================================
// AGENT STATUS
// ============================================================================

/// Status of an agent in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum AgentStatus {
    /// Agent is registered and available for work
    #[default]
    Idle,
    /// Agent is actively executing a task
    Working,
    /// Agent submitted a proposal and awaits review
    Waiting,
    /// Agent raised an escalation and cannot proceed until it is resolved
    Blocked,
}

impl AgentStatus {
    /// All statuses, in declaration order.
    pub const ALL: [AgentStatus; 4] = [
        AgentStatus::Idle,
        AgentStatus::Working,
        AgentStatus::Waiting,
        AgentStatus::Blocked,
    ];

    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Working => "working",
            AgentStatus::Waiting => "waiting",
            AgentStatus::Blocked => "blocked",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, AgentStatusParseError> {
        match normalize(s).as_str() {
            "idle" => Ok(AgentStatus::Idle),
            "working" => Ok(AgentStatus::Working),
            "waiting" => Ok(AgentStatus::Waiting),
            "blocked" => Ok(AgentStatus::Blocked),
            _ => Err(AgentStatusParseError(s.to_string())),
        }
    }

    /// Check if the agent can be handed new work by the matcher.
    pub fn can_accept_work(&self) -> bool {
        matches!(self, AgentStatus::Idle)
    }
}

db_string_enum!(AgentStatus, AgentStatusParseError, "agent status");

// ============================================================================
// PROPOSAL ENUMS
// ============================================================================

/// Review status of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ProposalStatus {
    #[default]
    Submitted,
    Passed,
    Rejected,
    Completed,
}

impl ProposalStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ProposalStatus::Submitted => "submitted",
            ProposalStatus::Passed => "passed",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Completed => "completed",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, ProposalStatusParseError> {
        match normalize(s).as_str() {
            "submitted" => Ok(ProposalStatus::Submitted),
            "passed" | "approved" => Ok(ProposalStatus::Passed),
            "rejected" => Ok(ProposalStatus::Rejected),
            "completed" | "complete" => Ok(ProposalStatus::Completed),
            _ => Err(ProposalStatusParseError(s.to_string())),
        }
    }

    /// Whether a review action has already been applied.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, ProposalStatus::Submitted)
    }
}

db_string_enum!(ProposalStatus, ProposalStatusParseError, "proposal status");

/// Outcome a reviewer may record on a submitted proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ReviewDecision {
    Passed,
    Rejected,
}

impl ReviewDecision {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ReviewDecision::Passed => "passed",
            ReviewDecision::Rejected => "rejected",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, ReviewDecisionParseError> {
        match normalize(s).as_str() {
            "passed" | "approved" | "pass" => Ok(ReviewDecision::Passed),
            "rejected" | "reject" => Ok(ReviewDecision::Rejected),
            _ => Err(ReviewDecisionParseError(s.to_string())),
        }
    }

    /// Proposal status this decision resolves to.
    pub fn as_status(&self) -> ProposalStatus {
        match self {
            ReviewDecision::Passed => ProposalStatus::Passed,
            ReviewDecision::Rejected => ProposalStatus::Rejected,
        }
    }
}

db_string_enum!(ReviewDecision, ReviewDecisionParseError, "review decision");

/// Discriminator of an agent submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum SubmissionType {
    #[default]
    Proposal,
    SmallTelosProposal,
    WorkUpdate,
    AssistanceRequest,
    Completion,
}

impl SubmissionType {
    pub const ALL: [SubmissionType; 5] = [
        SubmissionType::Proposal,
        SubmissionType::SmallTelosProposal,
        SubmissionType::WorkUpdate,
        SubmissionType::AssistanceRequest,
        SubmissionType::Completion,
    ];

    pub fn as_db_str(&self) -> &'static str {
        match self {
            SubmissionType::Proposal => "proposal",
            SubmissionType::SmallTelosProposal => "small_telos_proposal",
            SubmissionType::WorkUpdate => "work_update",
            SubmissionType::AssistanceRequest => "assistance_request",
            SubmissionType::Completion => "completion",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, SubmissionTypeParseError> {
        match normalize(s).as_str() {
            "proposal" => Ok(SubmissionType::Proposal),
            "small_telos_proposal" | "smalltelosproposal" => Ok(SubmissionType::SmallTelosProposal),
            "work_update" | "workupdate" => Ok(SubmissionType::WorkUpdate),
            "assistance_request" | "assistancerequest" => Ok(SubmissionType::AssistanceRequest),
            "completion" => Ok(SubmissionType::Completion),
            _ => Err(SubmissionTypeParseError(s.to_string())),
        }
    }

    /// Classify a raw submission type, falling back to `Proposal` when the
    /// value is missing or unrecognized.
    pub fn classify(raw: Option<&str>) -> Self {
        raw.and_then(|s| Self::from_db_str(s).ok())
            .unwrap_or_default()
    }

    /// Proposal kinds wait on a reviewer; the other kinds are informational.
    pub fn awaits_review(&self) -> bool {
        matches!(
            self,
            SubmissionType::Proposal | SubmissionType::SmallTelosProposal
        )
    }
}

db_string_enum!(SubmissionType, SubmissionTypeParseError, "submission type");

/// Category of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ProposalCategory {
    #[default]
    Feature,
    Bug,
    AppIdea,
    Improvement,
    Docs,
    Integration,
    Tokenomics,
}

impl ProposalCategory {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ProposalCategory::Feature => "feature",
            ProposalCategory::Bug => "bug",
            ProposalCategory::AppIdea => "app_idea",
            ProposalCategory::Improvement => "improvement",
            ProposalCategory::Docs => "docs",
            ProposalCategory::Integration => "integration",
            ProposalCategory::Tokenomics => "tokenomics",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, ProposalCategoryParseError> {
        match normalize(s).as_str() {
            "feature" => Ok(ProposalCategory::Feature),
            "bug" => Ok(ProposalCategory::Bug),
            "app_idea" | "appidea" => Ok(ProposalCategory::AppIdea),
            "improvement" => Ok(ProposalCategory::Improvement),
            "docs" => Ok(ProposalCategory::Docs),
            "integration" => Ok(ProposalCategory::Integration),
            "tokenomics" => Ok(ProposalCategory::Tokenomics),
            _ => Err(ProposalCategoryParseError(s.to_string())),
        }
    }

    /// Unrecognized or missing categories file as `Feature`.
    pub fn classify(raw: Option<&str>) -> Self {
        raw.and_then(|s| Self::from_db_str(s).ok())
            .unwrap_or_default()
    }
}

db_string_enum!(ProposalCategory, ProposalCategoryParseError, "proposal category");

/// What kind of help a blocked agent is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum EscalationType {
    #[default]
    Stuck,
    NeedApproval,
    NeedResources,
    NeedCredentials,
    NeedClarification,
    BugReport,
}

impl EscalationType {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            EscalationType::Stuck => "stuck",
            EscalationType::NeedApproval => "need_approval",
            EscalationType::NeedResources => "need_resources",
            EscalationType::NeedCredentials => "need_credentials",
            EscalationType::NeedClarification => "need_clarification",
            EscalationType::BugReport => "bug_report",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, EscalationTypeParseError> {
        match normalize(s).as_str() {
            "stuck" => Ok(EscalationType::Stuck),
            "need_approval" => Ok(EscalationType::NeedApproval),
            "need_resources" => Ok(EscalationType::NeedResources),
            "need_credentials" => Ok(EscalationType::NeedCredentials),
            "need_clarification" => Ok(EscalationType::NeedClarification),
            "bug_report" => Ok(EscalationType::BugReport),
            _ => Err(EscalationTypeParseError(s.to_string())),
        }
    }
}

db_string_enum!(EscalationType, EscalationTypeParseError, "escalation type");

/// Urgency attached to an escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum EscalationUrgency {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl EscalationUrgency {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            EscalationUrgency::Low => "low",
            EscalationUrgency::Normal => "normal",
            EscalationUrgency::High => "high",
            EscalationUrgency::Critical => "critical",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, EscalationUrgencyParseError> {
        match normalize(s).as_str() {
            "low" => Ok(EscalationUrgency::Low),
            "normal" | "medium" => Ok(EscalationUrgency::Normal),
            "high" => Ok(EscalationUrgency::High),
            "critical" | "urgent" => Ok(EscalationUrgency::Critical),
            _ => Err(EscalationUrgencyParseError(s.to_string())),
        }
    }
}

db_string_enum!(EscalationUrgency, EscalationUrgencyParseError, "escalation urgency");

// ============================================================================
// WORK ITEM ENUMS
// ============================================================================

/// Status of a quest board item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum QuestStatus {
    #[default]
    Open,
    Claimed,
    Completed,
}

impl QuestStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            QuestStatus::Open => "open",
            QuestStatus::Claimed => "claimed",
            QuestStatus::Completed => "completed",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, QuestStatusParseError> {
        match normalize(s).as_str() {
            "open" => Ok(QuestStatus::Open),
            "claimed" => Ok(QuestStatus::Claimed),
            "completed" | "complete" => Ok(QuestStatus::Completed),
            _ => Err(QuestStatusParseError(s.to_string())),
        }
    }
}

db_string_enum!(QuestStatus, QuestStatusParseError, "quest status");

/// Status of a bounty board item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum BountyStatus {
    #[default]
    Open,
    Claimed,
    InProgress,
    Review,
    Completed,
}

impl BountyStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            BountyStatus::Open => "open",
            BountyStatus::Claimed => "claimed",
            BountyStatus::InProgress => "in_progress",
            BountyStatus::Review => "review",
            BountyStatus::Completed => "completed",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, BountyStatusParseError> {
        match normalize(s).as_str() {
            "open" => Ok(BountyStatus::Open),
            "claimed" => Ok(BountyStatus::Claimed),
            "in_progress" | "inprogress" => Ok(BountyStatus::InProgress),
            "review" | "in_review" => Ok(BountyStatus::Review),
            "completed" | "complete" => Ok(BountyStatus::Completed),
            _ => Err(BountyStatusParseError(s.to_string())),
        }
    }

    /// Statuses that count against an agent's concurrent claim limit.
    pub fn is_held(&self) -> bool {
        matches!(
            self,
            BountyStatus::Claimed | BountyStatus::InProgress | BountyStatus::Review
        )
    }
}

db_string_enum!(BountyStatus, BountyStatusParseError, "bounty status");

/// Difficulty rating shared by both boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, DifficultyParseError> {
        match normalize(s).as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            "expert" => Ok(Difficulty::Expert),
            _ => Err(DifficultyParseError(s.to_string())),
        }
    }
}

db_string_enum!(Difficulty, DifficultyParseError, "difficulty");

// ============================================================================
// MESSAGE ENUMS
// ============================================================================

/// Delivery channel of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum MessageChannel {
    Direct,
    Broadcast,
}

impl MessageChannel {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            MessageChannel::Direct => "direct",
            MessageChannel::Broadcast => "broadcast",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, MessageChannelParseError> {
        match normalize(s).as_str() {
            "direct" => Ok(MessageChannel::Direct),
            "broadcast" => Ok(MessageChannel::Broadcast),
            _ => Err(MessageChannelParseError(s.to_string())),
        }
    }
}

db_string_enum!(MessageChannel, MessageChannelParseError, "message channel");

/// Type of agent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum MessageType {
    #[default]
    Message,
    CollaborationRequest,
    Handoff,
    StatusUpdate,
}

impl MessageType {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            MessageType::Message => "message",
            MessageType::CollaborationRequest => "collaboration_request",
            MessageType::Handoff => "handoff",
            MessageType::StatusUpdate => "status_update",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, MessageTypeParseError> {
        match normalize(s).as_str() {
            "message" => Ok(MessageType::Message),
            "collaboration_request" | "collaborationrequest" => {
                Ok(MessageType::CollaborationRequest)
            }
            "handoff" => Ok(MessageType::Handoff),
            "status_update" | "statusupdate" => Ok(MessageType::StatusUpdate),
            _ => Err(MessageTypeParseError(s.to_string())),
        }
    }
}

db_string_enum!(MessageType, MessageTypeParseError, "message type");

// ============================================================================
// WAKE REASON
// ============================================================================

/// Why an agent was woken or handed work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum WakeReason {
    ProposalSubmitted,
    ProposalGenerated,
    QuestAssigned,
    BountyClaimed,
    EscalationResolved,
    BuildStarted,
}

impl WakeReason {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            WakeReason::ProposalSubmitted => "proposal_submitted",
            WakeReason::ProposalGenerated => "proposal_generated",
            WakeReason::QuestAssigned => "quest_assigned",
            WakeReason::BountyClaimed => "bounty_claimed",
            WakeReason::EscalationResolved => "escalation_resolved",
            WakeReason::BuildStarted => "build_started",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, WakeReasonParseError> {
        match normalize(s).as_str() {
            "proposal_submitted" => Ok(WakeReason::ProposalSubmitted),
            "proposal_generated" => Ok(WakeReason::ProposalGenerated),
            "quest_assigned" => Ok(WakeReason::QuestAssigned),
            "bounty_claimed" => Ok(WakeReason::BountyClaimed),
            "escalation_resolved" => Ok(WakeReason::EscalationResolved),
            "build_started" => Ok(WakeReason::BuildStarted),
            _ => Err(WakeReasonParseError(s.to_string())),
        }
    }
}

db_string_enum!(WakeReason, WakeReasonParseError, "wake reason");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_status_roundtrip() {
        for status in AgentStatus::ALL {
            let parsed = AgentStatus::from_db_str(status.as_db_str()).unwrap();
            assert_eq!(status, parsed);
        }
        assert_eq!(AgentStatus::default(), AgentStatus::Idle);
    }

    #[test]
    fn test_bounty_status_accepts_variants() {
        assert_eq!(
            BountyStatus::from_db_str("In-Progress").unwrap(),
            BountyStatus::InProgress
        );
        assert_eq!(
            BountyStatus::from_db_str("in_progress").unwrap(),
            BountyStatus::InProgress
        );
        assert!(BountyStatus::from_db_str("abandoned").is_err());
    }

    #[test]
    fn test_bounty_held_statuses() {
        assert!(!BountyStatus::Open.is_held());
        assert!(BountyStatus::Claimed.is_held());
        assert!(BountyStatus::InProgress.is_held());
        assert!(BountyStatus::Review.is_held());
        assert!(!BountyStatus::Completed.is_held());
    }

    #[test]
    fn test_submission_type_classify_defaults_to_proposal() {
        assert_eq!(SubmissionType::classify(None), SubmissionType::Proposal);
        assert_eq!(
            SubmissionType::classify(Some("something_else")),
            SubmissionType::Proposal
        );
        assert_eq!(
            SubmissionType::classify(Some("assistance_request")),
            SubmissionType::AssistanceRequest
        );
        assert_eq!(
            SubmissionType::classify(Some("Work-Update")),
            SubmissionType::WorkUpdate
        );
    }

    #[test]
    fn test_category_classify_falls_back_to_feature() {
        assert_eq!(ProposalCategory::classify(Some("bug")), ProposalCategory::Bug);
        assert_eq!(
            ProposalCategory::classify(Some("marketing")),
            ProposalCategory::Feature
        );
        assert_eq!(ProposalCategory::classify(None), ProposalCategory::Feature);
    }

    #[test]
    fn test_escalation_type_rejects_unknown() {
        let err = EscalationType::from_db_str("please_help").unwrap_err();
        assert_eq!(err.to_string(), "Invalid escalation type: please_help");
    }

    #[test]
    fn test_serde_matches_db_str() {
        let json = serde_json::to_string(&BountyStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let json = serde_json::to_string(&SubmissionType::SmallTelosProposal).unwrap();
        assert_eq!(json, "\"small_telos_proposal\"");
    }

    #[test]
    fn test_review_decision_maps_to_status() {
        assert_eq!(ReviewDecision::Passed.as_status(), ProposalStatus::Passed);
        assert_eq!(ReviewDecision::Rejected.as_status(), ProposalStatus::Rejected);
    }
}
