//! Autonomy Matcher
//!
//! One pass pairs idle agents (least recently active first) with open
//! quests (highest priority first). Pairing is greedy: each agent takes the
//! first quest not already taken this pass whose role requirement it meets.
//! A failed pair is recorded and the pass moves on.

use crate::quest_board::QuestBoard;
use crate::sinks::WakeNotifier;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use swarm_core::{
    AgentId, ErrorKind, QuestFilter, QuestId, QuestStatus, SwarmConfig, SwarmResult, WakeReason,
};
use swarm_storage::SwarmStore;

/// A pair the matcher tried and failed to claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchError {
    pub agent_id: AgentId,
    pub quest_id: QuestId,
    pub kind: ErrorKind,
    pub reason: String,
}

/// Outcome of one matcher pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    pub idle_agents_found: usize,
    pub open_quests_found: usize,
    pub matches_made: usize,
    /// Quests reopened by lease expiry before matching.
    pub claims_recovered: usize,
    pub assignments: Vec<(AgentId, QuestId)>,
    pub errors: Vec<MatchError>,
}

#[derive(Clone)]
pub struct AutonomyMatcher {
    store: Arc<dyn SwarmStore>,
    config: Arc<SwarmConfig>,
    quests: QuestBoard,
    notifier: Arc<dyn WakeNotifier>,
}

impl AutonomyMatcher {
    pub fn new(
        store: Arc<dyn SwarmStore>,
        config: Arc<SwarmConfig>,
        quests: QuestBoard,
        notifier: Arc<dyn WakeNotifier>,
    ) -> Self {
        Self {
            store,
            config,
            quests,
            notifier,
        }
    }

    pub fn run_once(&self) -> SwarmResult<MatchReport> {
        let mut report = MatchReport {
            claims_recovered: self.quests.recover_expired_claims(Utc::now())?.len(),
            ..MatchReport::default()
        };

        let agents = self.store.agent_list_idle(self.config.matcher_agent_batch)?;
        let quests = self.store.quest_list(
            &QuestFilter::with_status(QuestStatus::Open).limit(self.config.matcher_quest_batch),
        )?;
        report.idle_agents_found = agents.len();
        report.open_quests_found = quests.len();

        let mut taken: HashSet<QuestId> = HashSet::new();
        for agent in &agents {
            let Some(quest) = quests
                .iter()
                .find(|q| !taken.contains(&q.quest_id) && agent.matches_role(q.role_match.as_deref()))
            else {
                continue;
            };
            taken.insert(quest.quest_id);

            match self.quests.claim_with(quest.quest_id, agent.agent_id, true) {
                Ok(_) => {
                    report.matches_made += 1;
                    report.assignments.push((agent.agent_id, quest.quest_id));
                    if let Err(e) = self.notifier.enqueue_wake(
                        agent.agent_id,
                        WakeReason::QuestAssigned,
                        Some(quest.quest_id),
                    ) {
                        tracing::debug!(
                            agent_id = %agent.agent_id,
                            quest_id = %quest.quest_id,
                            error = %e,
                            "Wake notification failed"
                        );
                    }
                }
                Err(e) => {
                    if e.is_conflict() {
                        tracing::debug!(
                            agent_id = %agent.agent_id,
                            quest_id = %quest.quest_id,
                            error = %e,
                            "Match lost to a concurrent claim"
                        );
                    } else {
                        tracing::warn!(
                            agent_id = %agent.agent_id,
                            quest_id = %quest.quest_id,
                            error = %e,
                            "Match failed"
                        );
                    }
                    report.errors.push(MatchError {
                        agent_id: agent.agent_id,
                        quest_id: quest.quest_id,
                        kind: e.kind(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if report.matches_made > 0 || !report.errors.is_empty() {
            tracing::info!(
                idle_agents = report.idle_agents_found,
                open_quests = report.open_quests_found,
                matches = report.matches_made,
                errors = report.errors.len(),
                "Matcher pass completed"
            );
        } else {
            tracing::trace!("Matcher pass completed with no matches");
        }
        Ok(report)
    }
}
