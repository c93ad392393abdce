use chrono::{DateTime, Utc};

use crate::currency::Money;
use crate::errors::CampaignError;
use crate::ledger::{Campaign, Contribution, ContributionKind, Member, PeriodPolicy, UserId};

use super::ServiceResult;

/// Append-only ledger of payments inside a campaign.
pub struct ContributionLedger;

impl ContributionLedger {
    pub fn record_contribution(
        campaign: &mut Campaign,
        contributor: &UserId,
        recipient: &UserId,
        amount: Money,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> ServiceResult<Contribution> {
        Self::record(
            campaign,
            contributor,
            recipient,
            amount,
            notes,
            ContributionKind::Contribution,
            now,
        )
    }

    /// Records the pool paying out to `recipient`.
    pub fn record_disbursement(
        campaign: &mut Campaign,
        payer: &UserId,
        recipient: &UserId,
        amount: Money,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> ServiceResult<Contribution> {
        Self::record(
            campaign,
            payer,
            recipient,
            amount,
            notes,
            ContributionKind::Disbursement,
            now,
        )
    }

    fn record(
        campaign: &mut Campaign,
        from: &UserId,
        to: &UserId,
        amount: Money,
        notes: Option<String>,
        kind: ContributionKind,
        now: DateTime<Utc>,
    ) -> ServiceResult<Contribution> {
        let amount = amount.ensure_positive()?;
        for id in [from, to] {
            if !campaign.is_member(id) {
                return Err(CampaignError::UnknownMember(id.clone()));
            }
        }

        let entry = Contribution::new(from.clone(), to.clone(), amount, notes, kind, now);
        campaign.contributions.push(entry.clone());
        campaign.touch();
        tracing::info!(
            campaign = %campaign.id,
            from = %from,
            to = %to,
            %amount,
            ?kind,
            "ledger entry recorded"
        );
        Ok(entry)
    }

    /// Flags a member as paid out; marking twice leaves the campaign untouched.
    pub fn mark_payout_received(campaign: &mut Campaign, member_id: &UserId) -> ServiceResult<()> {
        let member = campaign
            .member_mut(member_id)
            .ok_or_else(|| CampaignError::UnknownMember(member_id.clone()))?;
        if member.has_received_payout {
            tracing::debug!(member = %member_id, "payout already marked");
            return Ok(());
        }
        member.has_received_payout = true;
        campaign.touch();
        tracing::info!(campaign = %campaign.id, member = %member_id, "payout marked received");
        Ok(())
    }

    pub fn total_raised(campaign: &Campaign) -> Money {
        Self::total_of(campaign, ContributionKind::Contribution)
    }

    pub fn total_disbursed(campaign: &Campaign) -> Money {
        Self::total_of(campaign, ContributionKind::Disbursement)
    }

    fn total_of(campaign: &Campaign, kind: ContributionKind) -> Money {
        campaign
            .contributions
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| entry.amount)
            .sum()
    }

    /// Raised amount as a share of the target, clamped to `[0, 100]`.
    pub fn progress_percent(campaign: &Campaign) -> f64 {
        let target = campaign.target_amount.cents();
        if target <= 0 {
            return 0.0;
        }
        let raised = Self::total_raised(campaign).cents() as f64;
        (raised / target as f64 * 100.0).clamp(0.0, 100.0)
    }

    /// Whether `member_id` paid in during the period containing `now`,
    /// with the period sized by the campaign frequency.
    pub fn has_contributed_this_period(
        campaign: &Campaign,
        member_id: &UserId,
        now: DateTime<Utc>,
    ) -> bool {
        Self::has_contributed_in_period(campaign, member_id, PeriodPolicy::Frequency, now)
    }

    pub fn has_contributed_in_period(
        campaign: &Campaign,
        member_id: &UserId,
        policy: PeriodPolicy,
        now: DateTime<Utc>,
    ) -> bool {
        let start = policy.period_start(campaign.frequency, now);
        campaign.contributions.iter().any(|entry| {
            entry.is_contribution()
                && &entry.contributor == member_id
                && entry.created_at >= start
                && entry.created_at <= now
        })
    }

    pub fn contributions_by<'a>(campaign: &'a Campaign, member_id: &UserId) -> Vec<&'a Contribution> {
        campaign
            .contributions
            .iter()
            .filter(|entry| &entry.contributor == member_id)
            .collect()
    }

    /// Members with no contribution in the current period.
    pub fn outstanding_contributors(
        campaign: &Campaign,
        policy: PeriodPolicy,
        now: DateTime<Utc>,
    ) -> Vec<&Member> {
        campaign
            .members
            .iter()
            .filter(|member| {
                !Self::has_contributed_in_period(campaign, member.user_id(), policy, now)
            })
            .collect()
    }
}
