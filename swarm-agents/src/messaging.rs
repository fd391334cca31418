//! Messaging Channel
//!
//! Direct and broadcast messages between agents. Only direct messages carry
//! read state.

use chrono::Utc;
use std::sync::Arc;
use swarm_core::{
    new_entity_id, AgentId, EntityType, InboxQuery, Message, MessageId, MessageType,
    SwarmConfig, SwarmError, SwarmResult, ValidationError,
};
use swarm_storage::SwarmStore;

#[derive(Clone)]
pub struct MessagingChannel {
    store: Arc<dyn SwarmStore>,
    config: Arc<SwarmConfig>,
}

impl MessagingChannel {
    pub fn new(store: Arc<dyn SwarmStore>, config: Arc<SwarmConfig>) -> Self {
        Self { store, config }
    }

    fn require_agent(&self, agent_id: AgentId) -> SwarmResult<()> {
        match self.store.agent_get(agent_id)? {
            Some(_) => Ok(()),
            None => Err(SwarmError::not_found(EntityType::Agent, agent_id)),
        }
    }

    /// Send a message. `to = None` broadcasts to every agent.
    pub fn send(
        &self,
        from: AgentId,
        to: Option<AgentId>,
        content: &str,
        message_type: MessageType,
    ) -> SwarmResult<Message> {
        let content = content.trim();
        let len = content.chars().count();
        if len == 0 {
            return Err(ValidationError::RequiredFieldMissing {
                field: "content".to_string(),
            }
            .into());
        }
        if len > self.config.message_max_len {
            return Err(ValidationError::TooLong {
                field: "content".to_string(),
                max: self.config.message_max_len,
                actual: len,
            }
            .into());
        }
        self.require_agent(from)?;
        if let Some(to) = to {
            self.require_agent(to)?;
        }

        let message = Message::new(
            new_entity_id(),
            from,
            to,
            content.to_string(),
            message_type,
            Utc::now(),
        );
        self.store.message_insert(&message)?;
        tracing::info!(
            message_id = %message.message_id,
            from = %from,
            to = ?to,
            message_type = %message_type,
            "Message sent"
        );
        Ok(message)
    }

    /// Inbox page, oldest first. The page size is clamped to the configured
    /// bounds.
    pub fn list(&self, query: &InboxQuery) -> SwarmResult<Vec<Message>> {
        let limit = self.config.clamp_message_limit(query.limit);
        self.store.message_list(query, limit)
    }

    pub fn unread_count(&self, agent_id: AgentId) -> SwarmResult<usize> {
        self.store.message_unread_count(agent_id)
    }

    /// Returns how many messages changed from unread to read.
    pub fn mark_read(&self, agent_id: AgentId, message_ids: &[MessageId]) -> SwarmResult<usize> {
        if message_ids.is_empty() {
            return Ok(0);
        }
        self.store
            .message_mark_read(agent_id, message_ids, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{AgentRegistry, NewAgent};
    use swarm_core::MessageChannel;
    use swarm_storage::InMemoryStore;

    fn setup() -> (MessagingChannel, AgentId, AgentId) {
        let store: Arc<dyn SwarmStore> = Arc::new(InMemoryStore::new());
        let registry = AgentRegistry::new(Arc::clone(&store));
        let bob = registry.register(NewAgent::new("bob", "Bob")).unwrap().agent.agent_id;
        let alice = registry
            .register(NewAgent::new("alice", "Alice"))
            .unwrap()
            .agent
            .agent_id;
        (
            MessagingChannel::new(store, Arc::new(SwarmConfig::default())),
            bob,
            alice,
        )
    }

    #[test]
    fn test_direct_and_broadcast() {
        let (channel, bob, alice) = setup();
        let direct = channel
            .send(bob, Some(alice), " can you review? ", MessageType::CollaborationRequest)
            .unwrap();
        assert_eq!(direct.channel, MessageChannel::Direct);
        assert_eq!(direct.content, "can you review?");

        let broadcast = channel
            .send(alice, None, "deploy at noon", MessageType::StatusUpdate)
            .unwrap();
        assert_eq!(broadcast.channel, MessageChannel::Broadcast);

        let inbox = channel.list(&InboxQuery::for_agent(alice)).unwrap();
        let ids: Vec<_> = inbox.iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![direct.message_id, broadcast.message_id]);

        let bob_broadcasts = channel
            .list(&InboxQuery::for_agent(bob).channel(MessageChannel::Broadcast))
            .unwrap();
        assert_eq!(bob_broadcasts.len(), 1);
    }

    #[test]
    fn test_unread_and_mark_read() {
        let (channel, bob, alice) = setup();
        let m1 = channel.send(bob, Some(alice), "one", MessageType::Message).unwrap();
        channel.send(bob, Some(alice), "two", MessageType::Message).unwrap();
        channel.send(bob, None, "all hands", MessageType::Message).unwrap();

        assert_eq!(channel.unread_count(alice).unwrap(), 2);
        assert_eq!(channel.mark_read(alice, &[m1.message_id]).unwrap(), 1);
        assert_eq!(channel.mark_read(alice, &[m1.message_id]).unwrap(), 0);
        assert_eq!(channel.unread_count(alice).unwrap(), 1);

        // Senders cannot mark their own messages read for the recipient.
        assert_eq!(channel.mark_read(bob, &[m1.message_id]).unwrap(), 0);
        assert_eq!(channel.mark_read(alice, &[]).unwrap(), 0);
    }

    #[test]
    fn test_send_validation() {
        let (channel, bob, _) = setup();
        assert!(matches!(
            channel.send(bob, None, "   ", MessageType::Message),
            Err(SwarmError::Validation(ValidationError::RequiredFieldMissing { .. }))
        ));
        let long = "x".repeat(2001);
        assert!(matches!(
            channel.send(bob, None, &long, MessageType::Message),
            Err(SwarmError::Validation(ValidationError::TooLong { .. }))
        ));
        let err = channel
            .send(bob, Some(new_entity_id()), "hello", MessageType::Message)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_limit_clamped() {
        let (channel, bob, alice) = setup();
        for i in 0..5 {
            channel
                .send(bob, Some(alice), &format!("note {i}"), MessageType::Message)
                .unwrap();
        }
        let page = channel
            .list(&InboxQuery::for_agent(alice).limit(0))
            .unwrap();
        assert_eq!(page.len(), 1);
        let page = channel
            .list(&InboxQuery::for_agent(alice).limit(3))
            .unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].content, "note 0");
    }
}
