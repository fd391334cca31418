//! Identity types for swarm entities

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
/// UUIDv7 embeds a Unix timestamp, making IDs naturally sortable by creation time.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Identifier of a registered agent.
pub type AgentId = EntityId;

/// Identifier of a proposal (including escalations, work updates and completions).
pub type ProposalId = EntityId;

/// Identifier of a quest board item.
pub type QuestId = EntityId;

/// Identifier of a bounty board item.
pub type BountyId = EntityId;

/// Identifier of a channel message.
pub type MessageId = EntityId;

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}
