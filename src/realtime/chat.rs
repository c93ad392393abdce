use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CampaignError;
use crate::ledger::UserId;

/// A campaign chat line. `id` is assigned once the message is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub campaign_id: Uuid,
    pub sender: UserId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn compose(
        campaign_id: Uuid,
        sender: UserId,
        text: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, CampaignError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CampaignError::InvalidInput("text".into()));
        }
        Ok(Self {
            id: None,
            campaign_id,
            sender,
            text: text.to_string(),
            timestamp,
        })
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Every identity this message can be recognised by.
    pub fn keys(&self) -> Vec<MessageKey> {
        let composite = MessageKey::Composite(self.sender.clone(), self.timestamp);
        match self.id {
            Some(id) => vec![MessageKey::Id(id), composite],
            None => vec![composite],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageKey {
    Id(Uuid),
    Composite(UserId, DateTime<Utc>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Duplicate,
    /// The message belongs to another campaign's room.
    Ignored,
}

/// Timestamp-ordered message list for one campaign, free of duplicates.
#[derive(Debug, Clone)]
pub struct ChatFeed {
    campaign_id: Uuid,
    messages: Vec<ChatMessage>,
    seen: HashSet<MessageKey>,
}

impl ChatFeed {
    pub fn new(campaign_id: Uuid) -> Self {
        Self {
            campaign_id,
            messages: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn campaign_id(&self) -> Uuid {
        self.campaign_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn merge(&mut self, message: ChatMessage) -> MergeOutcome {
        if message.campaign_id != self.campaign_id {
            tracing::debug!(
                feed = %self.campaign_id,
                campaign = %message.campaign_id,
                "message for another room ignored"
            );
            return MergeOutcome::Ignored;
        }

        let keys = message.keys();
        if keys.iter().any(|key| self.seen.contains(key)) {
            self.absorb_id(&message);
            self.seen.extend(keys);
            tracing::debug!(sender = %message.sender, "duplicate chat message dropped");
            return MergeOutcome::Duplicate;
        }

        self.seen.extend(keys);
        let at = self
            .messages
            .partition_point(|existing| existing.timestamp <= message.timestamp);
        self.messages.insert(at, message);
        MergeOutcome::Inserted
    }

    /// Merges a fetched history page and returns how many messages were new.
    pub fn merge_history(&mut self, history: impl IntoIterator<Item = ChatMessage>) -> usize {
        history
            .into_iter()
            .map(|message| self.merge(message))
            .filter(|outcome| *outcome == MergeOutcome::Inserted)
            .count()
    }

    // An optimistic local copy learns its server id from the echo.
    fn absorb_id(&mut self, incoming: &ChatMessage) {
        let Some(id) = incoming.id else { return };
        if let Some(local) = self.messages.iter_mut().find(|existing| {
            existing.id.is_none()
                && existing.sender == incoming.sender
                && existing.timestamp == incoming.timestamp
        }) {
            local.id = Some(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, minute, 0).unwrap()
    }

    #[test]
    fn blank_text_is_rejected() {
        let err = ChatMessage::compose(Uuid::new_v4(), "a".into(), "   ", at(0)).unwrap_err();
        assert_eq!(err, CampaignError::InvalidInput("text".into()));
    }

    #[test]
    fn history_plus_broadcast_renders_once() {
        let room = Uuid::new_v4();
        let mut feed = ChatFeed::new(room);
        let message = ChatMessage::compose(room, "a".into(), "hi", at(1))
            .unwrap()
            .with_id(Uuid::new_v4());
        assert_eq!(feed.merge_history(vec![message.clone()]), 1);
        assert_eq!(feed.merge(message), MergeOutcome::Duplicate);
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn local_copy_picks_up_server_id() {
        let room = Uuid::new_v4();
        let mut feed = ChatFeed::new(room);
        let local = ChatMessage::compose(room, "a".into(), "paid", at(2)).unwrap();
        let id = Uuid::new_v4();
        feed.merge(local.clone());
        assert_eq!(feed.merge(local.with_id(id)), MergeOutcome::Duplicate);
        assert_eq!(feed.messages()[0].id, Some(id));
    }

    #[test]
    fn keeps_timestamp_order_and_ignores_other_rooms() {
        let room = Uuid::new_v4();
        let mut feed = ChatFeed::new(room);
        let late = ChatMessage::compose(room, "a".into(), "second", at(5)).unwrap();
        let early = ChatMessage::compose(room, "b".into(), "first", at(5) - Duration::minutes(3))
            .unwrap();
        feed.merge(late);
        feed.merge(early);
        let texts: Vec<&str> = feed.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);

        let stray = ChatMessage::compose(Uuid::new_v4(), "c".into(), "elsewhere", at(6)).unwrap();
        assert_eq!(feed.merge(stray), MergeOutcome::Ignored);
        assert_eq!(feed.len(), 2);
    }
}
