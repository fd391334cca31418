//! Agent-to-agent messages.

use crate::{AgentId, MessageChannel, MessageId, MessageType, Timestamp};
use serde::{Deserialize, Serialize};

/// A stored message. Immutable apart from `read_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Message {
    pub message_id: MessageId,
    pub from_agent_id: AgentId,
    /// Recipient; `None` for broadcasts.
    pub to_agent_id: Option<AgentId>,
    pub channel: MessageChannel,
    pub content: String,
    pub message_type: MessageType,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl Message {
    pub fn new(
        message_id: MessageId,
        from_agent_id: AgentId,
        to_agent_id: Option<AgentId>,
        content: String,
        message_type: MessageType,
        now: Timestamp,
    ) -> Self {
        let channel = if to_agent_id.is_some() {
            MessageChannel::Direct
        } else {
            MessageChannel::Broadcast
        };
        Self {
            message_id,
            from_agent_id,
            to_agent_id,
            channel,
            content,
            message_type,
            read_at: None,
            created_at: now,
        }
    }

    /// Whether this message shows up in `agent_id`'s inbox.
    pub fn is_visible_to(&self, agent_id: AgentId) -> bool {
        match self.to_agent_id {
            Some(to) => to == agent_id,
            None => true,
        }
    }

    pub fn involves(&self, agent_id: AgentId) -> bool {
        self.from_agent_id == agent_id || self.to_agent_id == Some(agent_id)
    }

    pub fn is_unread_by(&self, agent_id: AgentId) -> bool {
        self.to_agent_id == Some(agent_id) && self.read_at.is_none()
    }
}

/// Inbox query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxQuery {
    pub agent_id: AgentId,
    pub channel: Option<MessageChannel>,
    /// Exclusive lower bound on `created_at`.
    pub since: Option<Timestamp>,
    pub limit: Option<usize>,
}

impl InboxQuery {
    pub fn for_agent(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            channel: None,
            since: None,
            limit: None,
        }
    }

    pub fn channel(mut self, channel: MessageChannel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn since(mut self, since: Timestamp) -> Self {
        self.since = Some(since);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn admits(&self, message: &Message) -> bool {
        message.is_visible_to(self.agent_id)
            && self.channel.map_or(true, |c| c == message.channel)
            && self.since.map_or(true, |since| message.created_at > since)
    }
}
