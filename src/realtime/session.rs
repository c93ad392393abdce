use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::{CampaignError, TransportError};
use crate::ledger::UserRef;

use super::chat::{ChatFeed, ChatMessage, MergeOutcome};
use super::connection::{RealtimeConnection, RealtimeEvent};

/// The signed-in user as reported by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: UserRef,
    pub token: String,
}

impl Identity {
    pub fn new(user: UserRef, token: impl Into<String>) -> Self {
        Self {
            user,
            token: token.into(),
        }
    }
}

/// Owns the realtime connection for one signed-in user and the chat feeds
/// of the campaign rooms it has joined.
pub struct Session {
    identity: Identity,
    connection: Box<dyn RealtimeConnection>,
    feeds: HashMap<Uuid, ChatFeed>,
}

impl Session {
    pub fn new(identity: Identity, connection: Box<dyn RealtimeConnection>) -> Self {
        Self {
            identity,
            connection,
            feeds: HashMap::new(),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn connect(&mut self) -> Result<(), TransportError> {
        self.connection.connect(&self.identity.token)?;
        tracing::info!(user = %self.identity.user.id, "realtime session connected");
        Ok(())
    }

    /// Closes the connection and forgets every joined room.
    pub fn disconnect(&mut self) {
        self.connection.disconnect();
        self.feeds.clear();
        tracing::info!(user = %self.identity.user.id, "realtime session disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Subscribes to a campaign room and seeds its feed with fetched history.
    pub fn join(
        &mut self,
        campaign_id: Uuid,
        history: Vec<ChatMessage>,
    ) -> Result<&ChatFeed, TransportError> {
        self.connection
            .emit(RealtimeEvent::JoinCampaign(campaign_id))?;
        let feed = self
            .feeds
            .entry(campaign_id)
            .or_insert_with(|| ChatFeed::new(campaign_id));
        let loaded = feed.merge_history(history);
        tracing::debug!(campaign = %campaign_id, loaded, "joined campaign room");
        Ok(feed)
    }

    /// Drops the room's feed; the leave event is only sent while connected.
    pub fn leave(&mut self, campaign_id: Uuid) -> Result<(), TransportError> {
        self.feeds.remove(&campaign_id);
        if self.connection.is_connected() {
            self.connection
                .emit(RealtimeEvent::LeaveCampaign(campaign_id))?;
        }
        Ok(())
    }

    pub fn compose(
        &self,
        campaign_id: Uuid,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<ChatMessage, CampaignError> {
        ChatMessage::compose(campaign_id, self.identity.user.id.clone(), text, now)
    }

    /// Shows the message locally, then broadcasts it to the room.
    pub fn send(&mut self, message: ChatMessage) -> Result<(), TransportError> {
        if !self.connection.is_connected() {
            return Err(TransportError::NotConnected);
        }
        if let Some(feed) = self.feeds.get_mut(&message.campaign_id) {
            feed.merge(message.clone());
        }
        self.connection
            .emit(RealtimeEvent::CampaignMessage(message))
    }

    /// Merges delivered broadcasts into joined feeds and returns how many
    /// messages were new. Broadcasts for rooms no longer joined are dropped.
    pub fn poll(&mut self) -> usize {
        let mut inserted = 0;
        for event in self.connection.drain() {
            let RealtimeEvent::CampaignMessage(message) = event else {
                continue;
            };
            match self.feeds.get_mut(&message.campaign_id) {
                Some(feed) => {
                    if feed.merge(message) == MergeOutcome::Inserted {
                        inserted += 1;
                    }
                }
                None => {
                    tracing::debug!(campaign = %message.campaign_id, "broadcast for left room ignored");
                }
            }
        }
        inserted
    }

    pub fn feed(&self, campaign_id: Uuid) -> Option<&ChatFeed> {
        self.feeds.get(&campaign_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::connection::LoopbackHub;

    fn session(hub: &LoopbackHub, id: &str) -> Session {
        let identity = Identity::new(UserRef::new(id, id), format!("token-{}", id));
        Session::new(identity, Box::new(hub.connection()))
    }

    #[test]
    fn own_echo_is_not_rendered_twice() {
        let hub = LoopbackHub::new();
        let room = Uuid::new_v4();
        let mut ada = session(&hub, "ada");
        ada.connect().unwrap();
        ada.join(room, Vec::new()).unwrap();

        let message = ada.compose(room, "hello", Utc::now()).unwrap();
        ada.send(message).unwrap();
        assert_eq!(ada.poll(), 0);
        assert_eq!(ada.feed(room).map(ChatFeed::len), Some(1));
    }

    #[test]
    fn sending_while_disconnected_fails() {
        let hub = LoopbackHub::new();
        let mut ada = session(&hub, "ada");
        let message = ada.compose(Uuid::new_v4(), "hi", Utc::now()).unwrap();
        assert_eq!(ada.send(message), Err(TransportError::NotConnected));
    }
}
