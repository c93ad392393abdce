use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::services::{
    CampaignDraft, CampaignService, ContributionLedger, MembershipRegistry, MonthAllocator,
    ServiceResult,
};
use crate::currency::Money;
use crate::errors::CampaignError;
use crate::ledger::{
    Campaign, CampaignStatus, Contribution, Invitation, InvitationAction, Invitee, Member,
    PayoutMonth, PeriodPolicy, UserId, UserRef,
};

/// Engine-wide switches resolved from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub period_policy: PeriodPolicy,
    pub guard_last_admin: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            period_policy: PeriodPolicy::Frequency,
            guard_last_admin: true,
        }
    }
}

/// One campaign snapshot plus the rules that guard it.
///
/// Every mutation works on a copy of the snapshot and only replaces the
/// held state once the copy passes [`Campaign::verify_invariants`], so a
/// rejected call leaves the aggregate exactly as it was.
#[derive(Debug, Clone)]
pub struct CampaignAggregate {
    campaign: Campaign,
    settings: EngineSettings,
}

impl CampaignAggregate {
    pub fn create(
        draft: CampaignDraft,
        creator: UserRef,
        settings: EngineSettings,
        now: DateTime<Utc>,
    ) -> ServiceResult<Self> {
        let campaign = CampaignService::create(draft, creator, now)?;
        Self::from_snapshot(campaign, settings)
    }

    /// Wraps a snapshot fetched from the store, refusing one that breaks the invariants.
    pub fn from_snapshot(campaign: Campaign, settings: EngineSettings) -> ServiceResult<Self> {
        campaign.verify_invariants()?;
        Ok(Self { campaign, settings })
    }

    pub fn id(&self) -> Uuid {
        self.campaign.id
    }

    pub fn campaign(&self) -> &Campaign {
        &self.campaign
    }

    pub fn into_campaign(self) -> Campaign {
        self.campaign
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    pub fn invite(
        &mut self,
        actor: &UserId,
        invitee: Invitee,
        now: DateTime<Utc>,
    ) -> ServiceResult<Invitation> {
        self.apply(|campaign| {
            campaign.ensure_active()?;
            MembershipRegistry::invite(campaign, actor, invitee, now)
        })
    }

    pub fn respond_to_invitation(
        &mut self,
        invitation_id: Uuid,
        action: InvitationAction,
        responder: &UserRef,
        now: DateTime<Utc>,
    ) -> ServiceResult<Invitation> {
        self.apply(|campaign| {
            if action == InvitationAction::Accept {
                campaign.ensure_active()?;
            }
            MembershipRegistry::respond_to_invitation(campaign, invitation_id, action, responder, now)
        })
    }

    pub fn cancel_invitation(
        &mut self,
        actor: &UserId,
        invitation_id: Uuid,
        now: DateTime<Utc>,
    ) -> ServiceResult<Invitation> {
        self.require_admin(actor, "cancel invitations")?;
        self.apply(|campaign| MembershipRegistry::cancel_invitation(campaign, invitation_id, now))
    }

    pub fn allocate_month(
        &mut self,
        actor: &UserId,
        member_id: &UserId,
        month: PayoutMonth,
    ) -> ServiceResult<()> {
        self.require_admin(actor, "allocate payout months")?;
        self.apply(|campaign| {
            campaign.ensure_active()?;
            MonthAllocator::allocate(campaign, member_id, month)
        })
    }

    pub fn release_month(
        &mut self,
        actor: &UserId,
        member_id: &UserId,
    ) -> ServiceResult<Option<PayoutMonth>> {
        self.require_admin(actor, "release payout months")?;
        self.apply(|campaign| {
            campaign.ensure_active()?;
            MonthAllocator::release(campaign, member_id)
        })
    }

    pub fn fill_default_allocations(
        &mut self,
        actor: &UserId,
    ) -> ServiceResult<Vec<(UserId, PayoutMonth)>> {
        self.require_admin(actor, "allocate payout months")?;
        self.apply(|campaign| {
            campaign.ensure_active()?;
            MonthAllocator::fill_defaults(campaign)
        })
    }

    /// Records a payment made by `actor` towards `recipient`.
    pub fn record_contribution(
        &mut self,
        actor: &UserId,
        recipient: &UserId,
        amount: Money,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> ServiceResult<Contribution> {
        self.apply(|campaign| {
            campaign.ensure_active()?;
            ContributionLedger::record_contribution(campaign, actor, recipient, amount, notes, now)
        })
    }

    /// Pays the pool out to `recipient` and flags the payout in one step.
    pub fn disburse(
        &mut self,
        actor: &UserId,
        recipient: &UserId,
        amount: Money,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> ServiceResult<Contribution> {
        self.require_admin(actor, "disburse payouts")?;
        self.apply(|campaign| {
            campaign.ensure_active()?;
            let entry =
                ContributionLedger::record_disbursement(campaign, actor, recipient, amount, notes, now)?;
            ContributionLedger::mark_payout_received(campaign, recipient)?;
            Ok(entry)
        })
    }

    pub fn mark_payout_received(&mut self, actor: &UserId, member_id: &UserId) -> ServiceResult<()> {
        self.require_admin(actor, "mark payouts")?;
        self.apply(|campaign| ContributionLedger::mark_payout_received(campaign, member_id))
    }

    /// Admins may remove anyone; members may only remove themselves.
    pub fn remove_member(&mut self, actor: &UserId, member_id: &UserId) -> ServiceResult<Member> {
        if actor != member_id {
            self.require_admin(actor, "remove members")?;
        }
        let guard = self.settings.guard_last_admin;
        self.apply(|campaign| MembershipRegistry::remove_member(campaign, member_id, guard))
    }

    pub fn set_status(&mut self, actor: &UserId, status: CampaignStatus) -> ServiceResult<()> {
        self.require_admin(actor, "change campaign status")?;
        self.apply(|campaign| CampaignService::set_status(campaign, status))
    }

    pub fn authorize_delete(&self, actor: &UserId) -> ServiceResult<()> {
        self.require_admin(actor, "delete campaign")
    }

    pub fn is_admin(&self, user_id: &UserId) -> bool {
        MembershipRegistry::is_admin(&self.campaign, user_id)
    }

    pub fn total_raised(&self) -> Money {
        ContributionLedger::total_raised(&self.campaign)
    }

    pub fn progress_percent(&self) -> f64 {
        ContributionLedger::progress_percent(&self.campaign)
    }

    pub fn current_recipient(&self, as_of: NaiveDate) -> Option<&Member> {
        MonthAllocator::current_recipient(&self.campaign, as_of)
    }

    pub fn has_contributed_this_period(&self, member_id: &UserId, now: DateTime<Utc>) -> bool {
        ContributionLedger::has_contributed_in_period(
            &self.campaign,
            member_id,
            self.settings.period_policy,
            now,
        )
    }

    pub fn outstanding_contributors(&self, now: DateTime<Utc>) -> Vec<&Member> {
        ContributionLedger::outstanding_contributors(&self.campaign, self.settings.period_policy, now)
    }

    pub fn contributions_by(&self, member_id: &UserId) -> Vec<&Contribution> {
        ContributionLedger::contributions_by(&self.campaign, member_id)
    }

    pub fn schedule(&self) -> Vec<&Member> {
        MonthAllocator::schedule(&self.campaign)
    }

    pub fn month_options(&self) -> Vec<PayoutMonth> {
        MonthAllocator::month_options(&self.campaign)
    }

    pub fn suggested_month(&self, member_id: &UserId) -> Option<PayoutMonth> {
        MonthAllocator::suggested_month(&self.campaign, member_id)
    }

    pub fn pending_invitations(&self) -> Vec<&Invitation> {
        MembershipRegistry::pending_invitations(&self.campaign)
    }

    pub fn can_invite(&self) -> bool {
        self.campaign.status == CampaignStatus::Active && MembershipRegistry::can_invite(&self.campaign)
    }

    fn require_admin(&self, actor: &UserId, action: &'static str) -> ServiceResult<()> {
        if self.is_admin(actor) {
            Ok(())
        } else {
            Err(CampaignError::NotAuthorized {
                user: actor.clone(),
                action,
            })
        }
    }

    fn apply<T>(
        &mut self,
        op: impl FnOnce(&mut Campaign) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        let mut working = self.campaign.clone();
        let value = op(&mut working)?;
        working.verify_invariants()?;
        self.campaign = working;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn aggregate() -> CampaignAggregate {
        let draft = CampaignDraft::new("Circle", "Savings", Money::from_cents(30_000), 3);
        let mut aggregate =
            CampaignAggregate::create(draft, UserRef::new("admin", "Ada"), EngineSettings::default(), now())
                .unwrap();
        let invitation = aggregate
            .invite(&"admin".into(), Invitee::User("bo".into()), now())
            .unwrap();
        aggregate
            .respond_to_invitation(invitation.id, InvitationAction::Accept, &UserRef::new("bo", "Bo"), now())
            .unwrap();
        aggregate
    }

    #[test]
    fn rejected_mutation_leaves_state_untouched() {
        let mut aggregate = aggregate();
        let before = aggregate.campaign().clone();
        let march = PayoutMonth::new(2025, 3).unwrap();
        aggregate.allocate_month(&"admin".into(), &"admin".into(), march).unwrap();
        let after_first = aggregate.campaign().clone();
        assert_ne!(before, after_first);
        assert!(aggregate.allocate_month(&"admin".into(), &"bo".into(), march).is_err());
        assert_eq!(aggregate.campaign(), &after_first);
    }

    #[test]
    fn members_cannot_perform_admin_actions() {
        let mut aggregate = aggregate();
        let bo = UserId::from("bo");
        let march = PayoutMonth::new(2025, 3).unwrap();
        assert!(matches!(
            aggregate.allocate_month(&bo, &bo, march),
            Err(CampaignError::NotAuthorized { .. })
        ));
        assert!(matches!(aggregate.authorize_delete(&bo), Err(CampaignError::NotAuthorized { .. })));
        aggregate.remove_member(&bo, &bo).unwrap();
        assert!(!aggregate.campaign().is_member(&bo));
    }

    #[test]
    fn disbursement_marks_recipient_paid() {
        let mut aggregate = aggregate();
        let (admin, bo) = (UserId::from("admin"), UserId::from("bo"));
        aggregate
            .record_contribution(&admin, &bo, Money::from_cents(10_000), None, now())
            .unwrap();
        aggregate
            .disburse(&admin, &bo, Money::from_cents(10_000), None, now())
            .unwrap();
        assert!(aggregate.campaign().member(&bo).unwrap().has_received_payout);
        assert_eq!(aggregate.total_raised(), Money::from_cents(10_000));
    }

    #[test]
    fn closed_campaign_refuses_mutations() {
        let mut aggregate = aggregate();
        let admin = UserId::from("admin");
        aggregate.set_status(&admin, CampaignStatus::Cancelled).unwrap();
        assert!(!aggregate.can_invite());
        assert!(matches!(
            aggregate.record_contribution(&admin, &"bo".into(), Money::from_cents(100), None, now()),
            Err(CampaignError::InvalidState(_))
        ));
    }
}
