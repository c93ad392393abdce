use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::TransportError;

use super::chat::ChatMessage;

/// Room-scoped events exchanged with the realtime collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum RealtimeEvent {
    JoinCampaign(Uuid),
    LeaveCampaign(Uuid),
    CampaignMessage(ChatMessage),
}

impl RealtimeEvent {
    pub fn campaign_id(&self) -> Uuid {
        match self {
            RealtimeEvent::JoinCampaign(id) | RealtimeEvent::LeaveCampaign(id) => *id,
            RealtimeEvent::CampaignMessage(message) => message.campaign_id,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// A publish/subscribe link to the realtime collaborator.
///
/// Delivery is at-least-once; consumers deduplicate.
pub trait RealtimeConnection: Send {
    fn connect(&mut self, token: &str) -> Result<(), TransportError>;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    fn emit(&mut self, event: RealtimeEvent) -> Result<(), TransportError>;
    /// Takes every event delivered since the last call.
    fn drain(&mut self) -> Vec<RealtimeEvent>;
}

#[derive(Debug, Default)]
struct HubState {
    next_client: u64,
    rooms: HashMap<Uuid, HashSet<u64>>,
    inboxes: HashMap<u64, Vec<RealtimeEvent>>,
}

/// In-process broker that fans room messages out to every subscriber,
/// the sender included.
#[derive(Debug, Clone, Default)]
pub struct LoopbackHub {
    state: Arc<Mutex<HubState>>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection(&self) -> LoopbackConnection {
        LoopbackConnection {
            hub: self.clone(),
            client: None,
        }
    }

    pub fn subscribers(&self, campaign_id: Uuid) -> usize {
        self.state().rooms.get(&campaign_id).map_or(0, HashSet::len)
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
pub struct LoopbackConnection {
    hub: LoopbackHub,
    client: Option<u64>,
}

impl RealtimeConnection for LoopbackConnection {
    fn connect(&mut self, token: &str) -> Result<(), TransportError> {
        if token.trim().is_empty() {
            return Err(TransportError::Unauthorized);
        }
        if self.client.is_some() {
            return Ok(());
        }
        let mut state = self.hub.state();
        state.next_client += 1;
        let client = state.next_client;
        state.inboxes.insert(client, Vec::new());
        self.client = Some(client);
        Ok(())
    }

    fn disconnect(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };
        let mut state = self.hub.state();
        state.inboxes.remove(&client);
        for members in state.rooms.values_mut() {
            members.remove(&client);
        }
        state.rooms.retain(|_, members| !members.is_empty());
    }

    fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    fn emit(&mut self, event: RealtimeEvent) -> Result<(), TransportError> {
        let client = self.client.ok_or(TransportError::NotConnected)?;
        let mut state = self.hub.state();
        match &event {
            RealtimeEvent::JoinCampaign(room) => {
                state.rooms.entry(*room).or_default().insert(client);
            }
            RealtimeEvent::LeaveCampaign(room) => {
                if let Some(members) = state.rooms.get_mut(room) {
                    members.remove(&client);
                }
            }
            RealtimeEvent::CampaignMessage(message) => {
                let HubState { rooms, inboxes, .. } = &mut *state;
                for member in rooms.get(&message.campaign_id).into_iter().flatten() {
                    if let Some(inbox) = inboxes.get_mut(member) {
                        inbox.push(event.clone());
                    }
                }
            }
        }
        Ok(())
    }

    fn drain(&mut self) -> Vec<RealtimeEvent> {
        match self.client {
            Some(client) => self
                .hub
                .state()
                .inboxes
                .get_mut(&client)
                .map(std::mem::take)
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }
}
