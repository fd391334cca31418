//! Proposals, escalations, work updates and completions.
//!
//! Every agent submission is stored as one [`Proposal`] row. The common
//! header is shared; [`SubmissionPayload`] carries the per-kind data, and
//! only assistance requests have any.

use crate::{
    AgentEvent, AgentId, EscalationType, EscalationUrgency, ProposalCategory, ProposalId,
    ProposalStatus, SubmissionType, SwarmConfig, Timestamp, ValidationError, ValidationResult,
};
use serde::{Deserialize, Serialize};

/// Escalation details attached to an assistance request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Escalation {
    pub escalation_type: EscalationType,
    pub urgency: EscalationUrgency,
    pub what_agent_needs: Option<String>,
}

/// Kind-specific payload of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "submission_type", rename_all = "snake_case")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum SubmissionPayload {
    Proposal,
    SmallTelosProposal,
    WorkUpdate,
    AssistanceRequest(Escalation),
    Completion,
}

impl SubmissionPayload {
    pub fn submission_type(&self) -> SubmissionType {
        match self {
            SubmissionPayload::Proposal => SubmissionType::Proposal,
            SubmissionPayload::SmallTelosProposal => SubmissionType::SmallTelosProposal,
            SubmissionPayload::WorkUpdate => SubmissionType::WorkUpdate,
            SubmissionPayload::AssistanceRequest(_) => SubmissionType::AssistanceRequest,
            SubmissionPayload::Completion => SubmissionType::Completion,
        }
    }

    /// Agent event raised when a submission of this kind is accepted.
    pub fn event(&self) -> AgentEvent {
        match self {
            SubmissionPayload::Proposal | SubmissionPayload::SmallTelosProposal => {
                AgentEvent::ProposalSubmitted
            }
            SubmissionPayload::WorkUpdate => AgentEvent::WorkUpdateSubmitted,
            SubmissionPayload::AssistanceRequest(_) => AgentEvent::AssistanceRequested,
            SubmissionPayload::Completion => AgentEvent::CompletionSubmitted,
        }
    }

    pub fn escalation(&self) -> Option<&Escalation> {
        match self {
            SubmissionPayload::AssistanceRequest(escalation) => Some(escalation),
            _ => None,
        }
    }
}

/// A stored submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Proposal {
    pub proposal_id: ProposalId,
    pub author_id: AgentId,
    pub title: String,
    pub content: String,
    pub category: ProposalCategory,
    pub status: ProposalStatus,
    pub payload: SubmissionPayload,
    /// Reviewer feedback or escalation resolution notes.
    pub feedback: Option<String>,
    pub tokens_used: Option<u64>,
    pub created_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

impl Proposal {
    pub fn new(proposal_id: ProposalId, author_id: AgentId, draft: NewProposal, now: Timestamp) -> Self {
        Self {
            proposal_id,
            author_id,
            title: draft.title,
            content: draft.content,
            category: draft.category,
            status: ProposalStatus::Submitted,
            payload: draft.payload,
            feedback: None,
            tokens_used: draft.tokens_used,
            created_at: now,
            resolved_at: None,
        }
    }

    pub fn submission_type(&self) -> SubmissionType {
        self.payload.submission_type()
    }

    pub fn is_escalation(&self) -> bool {
        self.payload.escalation().is_some()
    }

    /// A proposal-kind submission still waiting on a reviewer.
    pub fn is_pending_review(&self) -> bool {
        self.submission_type().awaits_review() && self.status == ProposalStatus::Submitted
    }
}

/// Raw submission as an agent sends it. Enum-valued fields arrive as strings
/// and are classified during [`Submission::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Submission {
    pub submission_type: Option<String>,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub escalation_type: Option<String>,
    pub escalation_urgency: Option<String>,
    pub what_agent_needs: Option<String>,
    pub tokens_used: Option<u64>,
}

impl Submission {
    pub fn proposal(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, submission_type: SubmissionType) -> Self {
        self.submission_type = Some(submission_type.as_db_str().to_string());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_escalation_type(mut self, escalation_type: impl Into<String>) -> Self {
        self.escalation_type = Some(escalation_type.into());
        self
    }

    pub fn with_tokens_used(mut self, tokens: u64) -> Self {
        self.tokens_used = Some(tokens);
        self
    }

    /// Validate lengths and classify enum fields.
    ///
    /// Title and content are measured after trimming; the stored title is
    /// truncated to `max_title_len` characters.
    pub fn normalize(&self, config: &SwarmConfig) -> ValidationResult<NewProposal> {
        let title = self.title.trim();
        let content = self.content.trim();

        let title_len = title.chars().count();
        if title_len < config.min_title_len {
            return Err(ValidationError::TooShort {
                field: "title".to_string(),
                min: config.min_title_len,
                actual: title_len,
            });
        }
        let content_len = content.chars().count();
        if content_len < config.min_content_len {
            return Err(ValidationError::TooShort {
                field: "content".to_string(),
                min: config.min_content_len,
                actual: content_len,
            });
        }

        let payload = match SubmissionType::classify(self.submission_type.as_deref()) {
            SubmissionType::Proposal => SubmissionPayload::Proposal,
            SubmissionType::SmallTelosProposal => SubmissionPayload::SmallTelosProposal,
            SubmissionType::WorkUpdate => SubmissionPayload::WorkUpdate,
            SubmissionType::Completion => SubmissionPayload::Completion,
            SubmissionType::AssistanceRequest => {
                let escalation_type = match self.escalation_type.as_deref() {
                    None => EscalationType::default(),
                    Some(raw) => EscalationType::from_db_str(raw)
                        .map_err(|_| ValidationError::InvalidEscalationType(raw.to_string()))?,
                };
                let urgency = self
                    .escalation_urgency
                    .as_deref()
                    .and_then(|raw| EscalationUrgency::from_db_str(raw).ok())
                    .unwrap_or_default();
                let what_agent_needs = self
                    .what_agent_needs
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                SubmissionPayload::AssistanceRequest(Escalation {
                    escalation_type,
                    urgency,
                    what_agent_needs,
                })
            }
        };

        Ok(NewProposal {
            title: title.chars().take(config.max_title_len).collect(),
            content: content.to_string(),
            category: ProposalCategory::classify(self.category.as_deref()),
            payload,
            tokens_used: self.tokens_used,
        })
    }
}

/// A validated submission ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProposal {
    pub title: String,
    pub content: String,
    pub category: ProposalCategory,
    pub payload: SubmissionPayload,
    pub tokens_used: Option<u64>,
}
