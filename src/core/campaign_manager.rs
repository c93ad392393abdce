use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::aggregate::{CampaignAggregate, EngineSettings};
use crate::core::services::{CampaignDraft, MembershipRegistry, ServiceResult};
use crate::errors::CampaignError;
use crate::ledger::{Campaign, Invitation, UserId, UserRef};
use crate::storage::CampaignStore;

type Handle = Arc<Mutex<CampaignAggregate>>;

/// Facade that serializes writers per campaign and keeps the store in step.
///
/// Each loaded campaign sits behind its own mutex, so writers to one
/// campaign queue up while other campaigns stay available.
pub struct CampaignManager {
    campaigns: RwLock<HashMap<Uuid, Handle>>,
    store: Box<dyn CampaignStore>,
    settings: EngineSettings,
}

impl CampaignManager {
    pub fn new(store: Box<dyn CampaignStore>, settings: EngineSettings) -> Self {
        Self {
            campaigns: RwLock::new(HashMap::new()),
            store,
            settings,
        }
    }

    pub fn store(&self) -> &dyn CampaignStore {
        self.store.as_ref()
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    pub fn create(
        &self,
        draft: CampaignDraft,
        creator: UserRef,
        now: DateTime<Utc>,
    ) -> Result<Campaign, CampaignError> {
        let aggregate = CampaignAggregate::create(draft, creator, self.settings, now)?;
        if let Err(err) = self.store.save(aggregate.campaign()) {
            tracing::warn!(error = %err, "campaign creation not persisted");
            return Err(err.into());
        }
        let snapshot = aggregate.campaign().clone();
        self.campaigns
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(snapshot.id, Arc::new(Mutex::new(aggregate)));
        Ok(snapshot)
    }

    /// Consistent copy of the campaign, loading it from the store on first use.
    pub fn snapshot(&self, id: Uuid) -> Result<Campaign, CampaignError> {
        self.read(id, |aggregate| aggregate.campaign().clone())
    }

    pub fn read<T>(
        &self,
        id: Uuid,
        view: impl FnOnce(&CampaignAggregate) -> T,
    ) -> Result<T, CampaignError> {
        let handle = self.handle(id)?;
        let guard = lock(&handle);
        if !self.is_loaded(id, &handle) {
            return Err(CampaignError::CampaignNotFound(id));
        }
        Ok(view(&*guard))
    }

    /// Runs `op` against a copy of the campaign and commits it only after the
    /// store accepted the new state.
    pub fn mutate<T>(
        &self,
        id: Uuid,
        op: impl FnOnce(&mut CampaignAggregate) -> ServiceResult<T>,
    ) -> Result<T, CampaignError> {
        let handle = self.handle(id)?;
        let mut guard = lock(&handle);
        if !self.is_loaded(id, &handle) {
            return Err(CampaignError::CampaignNotFound(id));
        }

        let mut working = guard.clone();
        let value = op(&mut working)?;
        if working.campaign() != guard.campaign() {
            if let Err(err) = self.store.save(working.campaign()) {
                tracing::warn!(campaign = %id, error = %err, "mutation rolled back");
                return Err(err.into());
            }
            *guard = working;
        }
        Ok(value)
    }

    /// Replaces the cached copy with the store's current record.
    ///
    /// The fetch happens under the campaign lock so a concurrent writer
    /// cannot commit between the read and the swap.
    pub fn refresh(&self, id: Uuid) -> Result<Campaign, CampaignError> {
        let handle = self.handle(id)?;
        let mut guard = lock(&handle);
        if !self.is_loaded(id, &handle) {
            return Err(CampaignError::CampaignNotFound(id));
        }
        let Some(fetched) = self.store.fetch(id)? else {
            self.evict(id);
            return Err(CampaignError::CampaignNotFound(id));
        };
        let aggregate = CampaignAggregate::from_snapshot(fetched, self.settings)?;
        let snapshot = aggregate.campaign().clone();
        *guard = aggregate;
        Ok(snapshot)
    }

    pub fn delete(&self, id: Uuid, by: &UserId) -> Result<(), CampaignError> {
        let handle = self.handle(id)?;
        let guard = lock(&handle);
        guard.authorize_delete(by)?;
        if let Err(err) = self.store.delete(id) {
            tracing::warn!(campaign = %id, error = %err, "campaign deletion failed");
            return Err(err.into());
        }
        self.evict(id);
        tracing::info!(campaign = %id, by = %by, "campaign deleted");
        Ok(())
    }

    /// Campaigns `user` belongs to, oldest first.
    pub fn campaigns_for(&self, user: &UserId) -> Result<Vec<Campaign>, CampaignError> {
        let campaigns = self.store.list()?;
        Ok(campaigns
            .into_iter()
            .filter(|campaign| campaign.is_member(user))
            .collect())
    }

    /// Pending invitations addressed to `user` across every campaign.
    pub fn invitations_for(&self, user: &UserRef) -> Result<Vec<Invitation>, CampaignError> {
        let campaigns = self.store.list()?;
        Ok(campaigns
            .iter()
            .flat_map(|campaign| MembershipRegistry::pending_invitations(campaign))
            .filter(|invitation| invitation.invitee.matches(user))
            .cloned()
            .collect())
    }

    fn handle(&self, id: Uuid) -> Result<Handle, CampaignError> {
        if let Some(handle) = self
            .campaigns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            return Ok(Arc::clone(handle));
        }

        let fetched = self
            .store
            .fetch(id)?
            .ok_or(CampaignError::CampaignNotFound(id))?;
        let aggregate = CampaignAggregate::from_snapshot(fetched, self.settings)?;
        tracing::debug!(campaign = %id, "campaign loaded from store");
        let mut campaigns = self.campaigns.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(
            campaigns
                .entry(id)
                .or_insert_with(|| Arc::new(Mutex::new(aggregate))),
        ))
    }

    fn is_loaded(&self, id: Uuid, handle: &Handle) -> bool {
        self.campaigns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .map_or(false, |current| Arc::ptr_eq(current, handle))
    }

    fn evict(&self, id: Uuid) {
        self.campaigns
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}

fn lock(handle: &Handle) -> MutexGuard<'_, CampaignAggregate> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}
