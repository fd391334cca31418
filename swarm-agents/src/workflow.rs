//! Proposal / Escalation Workflow
//!
//! Agents submit proposals, work updates, completions and assistance
//! requests. Reviewers resolve proposals; operators resolve escalations.
//! Only proposal kinds take a review.
//! Each resolution is a single conditional update, so the first reviewer
//! wins and later ones get `AlreadyResolved`.

use crate::registry::{log_status_change, AgentRegistry};
use crate::sinks::ProposalDrafter;
use chrono::Utc;
use std::sync::Arc;
use swarm_core::{
    new_entity_id, AgentEvent, AgentId, AgentStatus, ConflictError, CounterDelta, EntityType,
    Proposal, ProposalId, ProposalStatus, ReviewDecision, StateError, Submission,
    SubmissionType, SwarmConfig, SwarmError, SwarmResult, WakeLogEntry, WakeReason,
};
use swarm_storage::{CasOutcome, ProposalUpdate, StatusChange, SwarmStore};

#[derive(Clone)]
pub struct ProposalWorkflow {
    store: Arc<dyn SwarmStore>,
    config: Arc<SwarmConfig>,
    registry: AgentRegistry,
}

impl ProposalWorkflow {
    pub fn new(store: Arc<dyn SwarmStore>, config: Arc<SwarmConfig>) -> Self {
        let registry = AgentRegistry::new(Arc::clone(&store));
        Self {
            store,
            config,
            registry,
        }
    }

    fn log_wake(
        &self,
        agent_id: AgentId,
        reason: WakeReason,
        proposal_id: ProposalId,
    ) -> SwarmResult<()> {
        self.store.wake_log_insert(
            &WakeLogEntry::new(new_entity_id(), agent_id, reason, Utc::now())
                .with_proposal(proposal_id),
        )
    }

    // ========================================================================
    // SUBMISSION
    // ========================================================================

    pub fn submit(&self, agent_id: AgentId, submission: &Submission) -> SwarmResult<Proposal> {
        self.submit_as(agent_id, submission, WakeReason::ProposalSubmitted)
    }

    fn submit_as(
        &self,
        agent_id: AgentId,
        submission: &Submission,
        reason: WakeReason,
    ) -> SwarmResult<Proposal> {
        let draft = submission.normalize(&self.config)?;
        let event = draft.payload.event();
        let now = Utc::now();

        // Row, counters and status change land together or not at all.
        let proposal = Proposal::new(new_entity_id(), agent_id, draft, now);
        let submission_type = proposal.submission_type();
        let change = self.store.proposal_submit(
            &proposal,
            self.config.enforce_single_pending_proposal,
            CounterDelta::submitted().with_tokens(proposal.tokens_used),
            now,
        )?;
        log_status_change(agent_id, event, change);

        if submission_type.awaits_review() {
            self.log_wake(agent_id, reason, proposal.proposal_id)?;
        }

        tracing::info!(
            proposal_id = %proposal.proposal_id,
            agent_id = %agent_id,
            submission_type = %submission_type,
            category = %proposal.category,
            "Submission accepted"
        );
        Ok(proposal)
    }

    // ========================================================================
    // RESOLUTION
    // ========================================================================

    /// Record a reviewer's decision on a submitted proposal.
    pub fn review(
        &self,
        proposal_id: ProposalId,
        decision: ReviewDecision,
        feedback: Option<String>,
    ) -> SwarmResult<Proposal> {
        // Submission kind never changes after insert, so checking it ahead
        // of the conditional update is race-free.
        let current = self.get(proposal_id)?;
        let submission_type = current.submission_type();
        if !submission_type.awaits_review() {
            return Err(StateError::NotReviewable {
                id: proposal_id,
                submission_type: submission_type.to_string(),
            }
            .into());
        }

        let update = ProposalUpdate {
            status: decision.as_status(),
            feedback: feedback.map(|f| f.trim().to_string()).filter(|f| !f.is_empty()),
            tokens_used: None,
            resolved_at: Utc::now(),
        };
        let proposal = match self.store.proposal_transition(
            proposal_id,
            &[ProposalStatus::Submitted],
            update,
        )? {
            CasOutcome::Applied(proposal) => proposal,
            CasOutcome::Mismatch(_) => {
                tracing::debug!(proposal_id = %proposal_id, "Proposal already resolved");
                return Err(ConflictError::AlreadyResolved { id: proposal_id }.into());
            }
            CasOutcome::Missing => {
                return Err(SwarmError::not_found(EntityType::Proposal, proposal_id));
            }
        };

        let (event, delta) = match decision {
            ReviewDecision::Passed => (AgentEvent::ProposalPassed, CounterDelta::approved()),
            ReviewDecision::Rejected => (AgentEvent::ProposalRejected, CounterDelta::rejected()),
        };
        self.store.agent_add_counters(proposal.author_id, delta)?;
        self.registry.apply_event(proposal.author_id, event)?;

        tracing::info!(
            proposal_id = %proposal_id,
            agent_id = %proposal.author_id,
            decision = %decision,
            "Proposal reviewed"
        );
        Ok(proposal)
    }

    /// Resolve an assistance request and unblock its author.
    pub fn resolve_escalation(
        &self,
        proposal_id: ProposalId,
        notes: Option<String>,
    ) -> SwarmResult<Proposal> {
        let current = self.get(proposal_id)?;
        if !current.is_escalation() {
            return Err(StateError::NotAnEscalation { id: proposal_id }.into());
        }

        let update = ProposalUpdate {
            status: ProposalStatus::Passed,
            feedback: notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            tokens_used: None,
            resolved_at: Utc::now(),
        };
        let proposal = match self.store.proposal_transition(
            proposal_id,
            &[ProposalStatus::Submitted],
            update,
        )? {
            CasOutcome::Applied(proposal) => proposal,
            CasOutcome::Mismatch(_) => {
                return Err(ConflictError::AlreadyResolved { id: proposal_id }.into());
            }
            CasOutcome::Missing => {
                return Err(SwarmError::not_found(EntityType::Proposal, proposal_id));
            }
        };

        self.registry
            .apply_event(proposal.author_id, AgentEvent::EscalationResolved)?;
        self.log_wake(
            proposal.author_id,
            WakeReason::EscalationResolved,
            proposal_id,
        )?;

        tracing::info!(
            proposal_id = %proposal_id,
            agent_id = %proposal.author_id,
            "Escalation resolved"
        );
        Ok(proposal)
    }

    /// `passed → completed`. Reported tokens are added to the author.
    pub fn mark_completed(
        &self,
        proposal_id: ProposalId,
        tokens_used: Option<u64>,
    ) -> SwarmResult<Proposal> {
        let update = ProposalUpdate {
            status: ProposalStatus::Completed,
            feedback: None,
            tokens_used,
            resolved_at: Utc::now(),
        };
        let proposal = match self.store.proposal_transition(
            proposal_id,
            &[ProposalStatus::Passed],
            update,
        )? {
            CasOutcome::Applied(proposal) => proposal,
            CasOutcome::Mismatch(current) => {
                return Err(StateError::InvalidState {
                    entity_type: EntityType::Proposal,
                    id: proposal_id,
                    expected: ProposalStatus::Passed.to_string(),
                    actual: current.status.to_string(),
                }
                .into());
            }
            CasOutcome::Missing => {
                return Err(SwarmError::not_found(EntityType::Proposal, proposal_id));
            }
        };

        let delta = CounterDelta::default().with_tokens(tokens_used);
        if !delta.is_empty() {
            self.store.agent_add_counters(proposal.author_id, delta)?;
        }
        tracing::info!(
            proposal_id = %proposal_id,
            agent_id = %proposal.author_id,
            tokens_used = tokens_used.unwrap_or(0),
            "Proposal completed"
        );
        Ok(proposal)
    }

    /// Put the author of a passed proposal to work on building it.
    pub fn start_fulfilment(&self, proposal_id: ProposalId) -> SwarmResult<StatusChange> {
        let proposal = self.get(proposal_id)?;
        if proposal.status != ProposalStatus::Passed {
            return Err(StateError::InvalidState {
                entity_type: EntityType::Proposal,
                id: proposal_id,
                expected: ProposalStatus::Passed.to_string(),
                actual: proposal.status.to_string(),
            }
            .into());
        }

        let change = self
            .registry
            .apply_event(proposal.author_id, AgentEvent::TaskAssigned)?;
        self.log_wake(proposal.author_id, WakeReason::BuildStarted, proposal_id)?;
        tracing::info!(
            proposal_id = %proposal_id,
            agent_id = %proposal.author_id,
            "Fulfilment started"
        );
        Ok(change)
    }

    /// Have `drafter` write a proposal for an agent and submit it.
    pub fn wake(&self, agent_id: AgentId, drafter: &dyn ProposalDrafter) -> SwarmResult<Proposal> {
        let agent = self.registry.get(agent_id)?;
        if agent.status == AgentStatus::Blocked {
            return Err(StateError::IllegalTransition {
                from: agent.status,
                event: AgentEvent::ProposalSubmitted.to_string(),
            }
            .into());
        }

        let mut submission = drafter.draft(&agent).map_err(|e| {
            tracing::warn!(agent_id = %agent_id, error = %e, "Proposal drafting failed");
            SwarmError::from(e)
        })?;
        submission.submission_type = Some(SubmissionType::Proposal.as_db_str().to_string());
        self.submit_as(agent_id, &submission, WakeReason::ProposalGenerated)
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub fn get(&self, proposal_id: ProposalId) -> SwarmResult<Proposal> {
        self.store
            .proposal_get(proposal_id)?
            .ok_or_else(|| SwarmError::not_found(EntityType::Proposal, proposal_id))
    }

    /// An agent's submissions, newest first.
    pub fn list_by_author(&self, agent_id: AgentId, limit: usize) -> SwarmResult<Vec<Proposal>> {
        self.store.proposal_list_by_author(agent_id, limit.max(1))
    }
}
