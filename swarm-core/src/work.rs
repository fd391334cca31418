//! Quest and bounty board items.

use crate::{
    AgentId, BountyId, BountyStatus, Difficulty, QuestId, QuestStatus, Timestamp,
    ValidationError, ValidationResult,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// QUEST
// ============================================================================

/// A quest board item. Quests can be claimed by agents directly or handed
/// out by the matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Quest {
    pub quest_id: QuestId,
    pub title: String,
    pub description: String,
    pub reward: u64,
    pub priority: i32,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    /// Only agents with this role are matched automatically.
    pub role_match: Option<String>,
    pub status: QuestStatus,
    /// Authoring agent; `None` for human-posted quests.
    pub created_by: Option<AgentId>,
    pub claimed_by: Option<AgentId>,
    pub claimed_at: Option<Timestamp>,
    pub auto_assigned: bool,
    pub completed_at: Option<Timestamp>,
    pub proof: Option<String>,
    pub created_at: Timestamp,
}

impl Quest {
    pub fn new(quest_id: QuestId, spec: QuestSpec, now: Timestamp) -> Self {
        Self {
            quest_id,
            title: spec.title,
            description: spec.description,
            reward: spec.reward,
            priority: spec.priority,
            category: spec.category,
            difficulty: spec.difficulty,
            role_match: spec.role_match,
            status: QuestStatus::Open,
            created_by: spec.created_by,
            claimed_by: None,
            claimed_at: None,
            auto_assigned: false,
            completed_at: None,
            proof: None,
            created_at: now,
        }
    }

    pub fn is_held_by(&self, agent_id: AgentId) -> bool {
        self.claimed_by == Some(agent_id)
    }
}

/// Input for posting a quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct QuestSpec {
    pub title: String,
    pub description: String,
    pub reward: u64,
    #[serde(default)]
    pub priority: i32,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub role_match: Option<String>,
    pub created_by: Option<AgentId>,
}

impl QuestSpec {
    pub fn new(title: impl Into<String>, description: impl Into<String>, reward: u64) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            reward,
            priority: 0,
            category: None,
            difficulty: None,
            role_match: None,
            created_by: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_role_match(mut self, role: impl Into<String>) -> Self {
        self.role_match = Some(role.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn created_by(mut self, agent_id: AgentId) -> Self {
        self.created_by = Some(agent_id);
        self
    }
}

// ============================================================================
// BOUNTY
// ============================================================================

/// A bounty board item. Bounties are claimed explicitly and move through
/// `in_progress` and `review` before completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Bounty {
    pub bounty_id: BountyId,
    pub title: String,
    pub description: String,
    pub reward: u64,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub required_role: Option<String>,
    pub status: BountyStatus,
    pub claimed_by: Option<AgentId>,
    pub claimed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub proof: Option<String>,
    pub created_at: Timestamp,
}

impl Bounty {
    pub fn new(bounty_id: BountyId, spec: BountySpec, now: Timestamp) -> Self {
        Self {
            bounty_id,
            title: spec.title,
            description: spec.description,
            reward: spec.reward,
            category: spec.category,
            difficulty: spec.difficulty,
            required_role: spec.required_role,
            status: BountyStatus::Open,
            claimed_by: None,
            claimed_at: None,
            completed_at: None,
            proof: None,
            created_at: now,
        }
    }

    pub fn is_held_by(&self, agent_id: AgentId) -> bool {
        self.claimed_by == Some(agent_id)
    }
}

/// Input for posting a bounty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BountySpec {
    pub title: String,
    pub description: String,
    pub reward: u64,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub required_role: Option<String>,
}

impl BountySpec {
    pub fn new(title: impl Into<String>, description: impl Into<String>, reward: u64) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            reward,
            category: None,
            difficulty: None,
            required_role: None,
        }
    }

    pub fn with_required_role(mut self, role: impl Into<String>) -> Self {
        self.required_role = Some(role.into());
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }
}

// ============================================================================
// LISTING
// ============================================================================

/// Filter for board listings. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkFilter<S> {
    pub status: Option<S>,
    pub category: Option<String>,
    pub role: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub limit: Option<usize>,
}

pub type QuestFilter = WorkFilter<QuestStatus>;
pub type BountyFilter = WorkFilter<BountyStatus>;

impl<S: PartialEq + Copy> WorkFilter<S> {
    pub fn with_status(status: S) -> Self {
        Self {
            status: Some(status),
            category: None,
            role: None,
            difficulty: None,
            limit: None,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(
        &self,
        status: S,
        category: Option<&str>,
        role: Option<&str>,
        difficulty: Option<Difficulty>,
    ) -> bool {
        self.status.map_or(true, |s| s == status)
            && self
                .category
                .as_deref()
                .map_or(true, |c| category == Some(c))
            && self.role.as_deref().map_or(true, |r| role == Some(r))
            && self.difficulty.map_or(true, |d| difficulty == Some(d))
    }
}

impl QuestFilter {
    pub fn admits(&self, quest: &Quest) -> bool {
        self.matches(
            quest.status,
            quest.category.as_deref(),
            quest.role_match.as_deref(),
            quest.difficulty,
        )
    }
}

impl BountyFilter {
    pub fn admits(&self, bounty: &Bounty) -> bool {
        self.matches(
            bounty.status,
            bounty.category.as_deref(),
            bounty.required_role.as_deref(),
            bounty.difficulty,
        )
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Length and reward bounds for posting to a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkItemRules {
    pub min_title_len: usize,
    pub min_description_len: usize,
    pub reward_min: u64,
    pub reward_max: u64,
}

impl WorkItemRules {
    /// Trim and check title and description, then check the reward range.
    /// Returns the trimmed pair.
    pub fn check(
        &self,
        title: &str,
        description: &str,
        reward: u64,
    ) -> ValidationResult<(String, String)> {
        let title = title.trim();
        let description = description.trim();

        let title_len = title.chars().count();
        if title_len < self.min_title_len {
            return Err(ValidationError::TooShort {
                field: "title".to_string(),
                min: self.min_title_len,
                actual: title_len,
            });
        }
        let description_len = description.chars().count();
        if description_len < self.min_description_len {
            return Err(ValidationError::TooShort {
                field: "description".to_string(),
                min: self.min_description_len,
                actual: description_len,
            });
        }
        if reward < self.reward_min || reward > self.reward_max {
            return Err(ValidationError::OutOfRange {
                field: "reward".to_string(),
                min: i64::try_from(self.reward_min).unwrap_or(i64::MAX),
                max: i64::try_from(self.reward_max).unwrap_or(i64::MAX),
                actual: i64::try_from(reward).unwrap_or(i64::MAX),
            });
        }
        Ok((title.to_string(), description.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn quest_rules() -> WorkItemRules {
        WorkItemRules {
            min_title_len: 5,
            min_description_len: 20,
            reward_min: 1,
            reward_max: 1000,
        }
    }

    #[test]
    fn test_rules_accept_and_trim() {
        let (title, description) = quest_rules()
            .check("  Write tests ", "Cover the claim path end to end.", 50)
            .unwrap();
        assert_eq!(title, "Write tests");
        assert_eq!(description, "Cover the claim path end to end.");
    }

    #[test]
    fn test_rules_reject_reward_out_of_range() {
        let rules = quest_rules();
        let description = "Cover the claim path end to end.";
        assert!(rules.check("Write tests", description, 0).is_err());
        assert!(rules.check("Write tests", description, 1001).is_err());
        assert!(rules.check("Write tests", description, 1).is_ok());
        assert!(rules.check("Write tests", description, 1000).is_ok());
    }

    #[test]
    fn test_rules_reject_short_description() {
        let err = quest_rules().check("Write tests", "short", 10).unwrap_err();
        assert!(matches!(err, ValidationError::TooShort { ref field, .. } if field == "description"));
    }

    #[test]
    fn test_new_quest_is_open() {
        let quest = Quest::new(
            Uuid::now_v7(),
            QuestSpec::new("Write tests", "Cover the claim path end to end.", 10)
                .with_priority(5)
                .with_role_match("builder"),
            Utc::now(),
        );
        assert_eq!(quest.status, QuestStatus::Open);
        assert_eq!(quest.priority, 5);
        assert!(quest.claimed_by.is_none());
        assert!(!quest.auto_assigned);
    }

    #[test]
    fn test_filter_admits() {
        let bounty = Bounty::new(
            Uuid::now_v7(),
            BountySpec::new("Audit ledger", "Review the ledger sink for gaps.", 500)
                .with_required_role("auditor")
                .with_difficulty(Difficulty::Hard),
            Utc::now(),
        );
        assert!(BountyFilter::default().admits(&bounty));
        assert!(BountyFilter::with_status(BountyStatus::Open).admits(&bounty));
        assert!(!BountyFilter::with_status(BountyStatus::Claimed).admits(&bounty));

        let by_role = BountyFilter {
            role: Some("builder".to_string()),
            ..BountyFilter::default()
        };
        assert!(!by_role.admits(&bounty));

        let by_difficulty = BountyFilter {
            difficulty: Some(Difficulty::Hard),
            ..BountyFilter::default()
        };
        assert!(by_difficulty.admits(&bounty));
    }
}
