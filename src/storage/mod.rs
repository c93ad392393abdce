pub mod memory;

use std::sync::Arc;

use uuid::Uuid;

use crate::errors::TransportError;
use crate::ledger::Campaign;

pub use memory::InMemoryCampaignStore;

/// Abstraction over the remote service that owns the canonical campaign records.
///
/// A missing campaign is `Ok(None)`, never an error.
pub trait CampaignStore: Send + Sync {
    fn fetch(&self, id: Uuid) -> Result<Option<Campaign>, TransportError>;
    fn list(&self) -> Result<Vec<Campaign>, TransportError>;
    fn save(&self, campaign: &Campaign) -> Result<(), TransportError>;
    fn delete(&self, id: Uuid) -> Result<(), TransportError>;
}

impl<S: CampaignStore + ?Sized> CampaignStore for Arc<S> {
    fn fetch(&self, id: Uuid) -> Result<Option<Campaign>, TransportError> {
        (**self).fetch(id)
    }

    fn list(&self) -> Result<Vec<Campaign>, TransportError> {
        (**self).list()
    }

    fn save(&self, campaign: &Campaign) -> Result<(), TransportError> {
        (**self).save(campaign)
    }

    fn delete(&self, id: Uuid) -> Result<(), TransportError> {
        (**self).delete(id)
    }
}
