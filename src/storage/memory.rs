use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::errors::TransportError;
use crate::ledger::Campaign;

use super::CampaignStore;

/// Process-local campaign store, used in tests and offline runs.
#[derive(Debug, Default)]
pub struct InMemoryCampaignStore {
    campaigns: Mutex<HashMap<Uuid, Campaign>>,
    failures: Mutex<VecDeque<TransportError>>,
}

impl InMemoryCampaignStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_campaigns(campaigns: impl IntoIterator<Item = Campaign>) -> Self {
        let store = Self::new();
        store
            .records()
            .extend(campaigns.into_iter().map(|campaign| (campaign.id, campaign)));
        store
    }

    /// Queues `error` to be returned by the next call instead of touching the records.
    pub fn fail_next(&self, error: TransportError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    fn records(&self) -> MutexGuard<'_, HashMap<Uuid, Campaign>> {
        self.campaigns.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_failure(&self) -> Result<(), TransportError> {
        match self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl CampaignStore for InMemoryCampaignStore {
    fn fetch(&self, id: Uuid) -> Result<Option<Campaign>, TransportError> {
        self.take_failure()?;
        Ok(self.records().get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<Campaign>, TransportError> {
        self.take_failure()?;
        let mut campaigns: Vec<Campaign> = self.records().values().cloned().collect();
        campaigns.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(campaigns)
    }

    fn save(&self, campaign: &Campaign) -> Result<(), TransportError> {
        self.take_failure()?;
        self.records().insert(campaign.id, campaign.clone());
        Ok(())
    }

    fn delete(&self, id: Uuid) -> Result<(), TransportError> {
        self.take_failure()?;
        self.records().remove(&id);
        Ok(())
    }
}
