use std::collections::HashSet;

use chrono::NaiveDate;

use crate::errors::CampaignError;
use crate::ledger::{Campaign, Member, PayoutMonth, UserId};

use super::ServiceResult;

/// Assigns payout months to members, one member per calendar month.
pub struct MonthAllocator;

impl MonthAllocator {
    /// Gives `member_id` the payout month `month`, replacing any earlier choice.
    pub fn allocate(
        campaign: &mut Campaign,
        member_id: &UserId,
        month: PayoutMonth,
    ) -> ServiceResult<()> {
        if !campaign.is_member(member_id) {
            return Err(CampaignError::UnknownMember(member_id.clone()));
        }
        if let Some(holder) = Self::holder_of(campaign, month) {
            if holder.user_id() != member_id {
                return Err(CampaignError::MonthAlreadyAllocated(holder.user_id().clone()));
            }
        }
        if !Self::in_window(campaign, month) {
            return Err(CampaignError::OutOfRange {
                month,
                start: campaign.start_date,
                end: campaign.end_date,
            });
        }

        let campaign_id = campaign.id;
        let member = campaign
            .member_mut(member_id)
            .ok_or_else(|| CampaignError::UnknownMember(member_id.clone()))?;
        let previous = member.allocated_month.replace(month);
        campaign.touch();
        tracing::info!(
            campaign = %campaign_id,
            member = %member_id,
            %month,
            previous = ?previous.map(|m| m.to_string()),
            "payout month allocated"
        );
        Ok(())
    }

    /// Clears a member's allocation and returns the month it freed.
    pub fn release(campaign: &mut Campaign, member_id: &UserId) -> ServiceResult<Option<PayoutMonth>> {
        let member = campaign
            .member_mut(member_id)
            .ok_or_else(|| CampaignError::UnknownMember(member_id.clone()))?;
        let freed = member.allocated_month.take();
        if freed.is_some() {
            campaign.touch();
        }
        Ok(freed)
    }

    /// The start month shifted by the member's roster position.
    pub fn default_allocation_for(campaign: &Campaign, member_index: usize) -> Option<PayoutMonth> {
        let offset = u32::try_from(member_index).ok()?;
        campaign.first_month().plus_months(offset)
    }

    /// The member's current month if it has one. Otherwise its default month
    /// when free, or the first free month after it, wrapping to the start.
    pub fn suggested_month(campaign: &Campaign, member_id: &UserId) -> Option<PayoutMonth> {
        let index = campaign.member_index(member_id)?;
        if let Some(current) = campaign.members[index].allocated_month {
            return Some(current);
        }
        let taken = Self::taken_months(campaign, Some(member_id));
        let options = Self::month_options(campaign);
        let preferred = Self::default_allocation_for(campaign, index);
        let from_preferred = options
            .iter()
            .copied()
            .filter(|month| preferred.map_or(true, |p| *month >= p))
            .find(|month| !taken.contains(month));
        from_preferred.or_else(|| options.into_iter().find(|month| !taken.contains(month)))
    }

    /// Gives every unallocated member its suggested month, in roster order.
    ///
    /// Members left over once the window is exhausted stay unallocated.
    pub fn fill_defaults(campaign: &mut Campaign) -> ServiceResult<Vec<(UserId, PayoutMonth)>> {
        let pending: Vec<UserId> = campaign
            .members
            .iter()
            .filter(|member| member.allocated_month.is_none())
            .map(|member| member.user_id().clone())
            .collect();

        let mut assigned = Vec::new();
        for member_id in pending {
            match Self::suggested_month(campaign, &member_id) {
                Some(month) => {
                    Self::allocate(campaign, &member_id, month)?;
                    assigned.push((member_id, month));
                }
                None => {
                    tracing::debug!(campaign = %campaign.id, member = %member_id, "no free month left");
                }
            }
        }
        Ok(assigned)
    }

    pub fn holder_of(campaign: &Campaign, month: PayoutMonth) -> Option<&Member> {
        campaign
            .members
            .iter()
            .find(|member| member.allocated_month == Some(month))
    }

    /// The member whose allocated month contains `as_of`.
    pub fn current_recipient(campaign: &Campaign, as_of: NaiveDate) -> Option<&Member> {
        Self::holder_of(campaign, PayoutMonth::from_date(as_of))
    }

    pub fn is_past_due(month: PayoutMonth, as_of: NaiveDate) -> bool {
        month < PayoutMonth::from_date(as_of)
    }

    /// Every month between the start and end dates, inclusive.
    pub fn month_options(campaign: &Campaign) -> Vec<PayoutMonth> {
        let last = campaign.last_month();
        let mut months = Vec::new();
        let mut cursor = Some(campaign.first_month());
        while let Some(month) = cursor.filter(|month| *month <= last) {
            months.push(month);
            cursor = month.next();
        }
        months
    }

    pub fn free_months(campaign: &Campaign) -> Vec<PayoutMonth> {
        let taken = Self::taken_months(campaign, None);
        Self::month_options(campaign)
            .into_iter()
            .filter(|month| !taken.contains(month))
            .collect()
    }

    /// Payout order: allocated members by month, then unallocated members with admins first.
    pub fn schedule(campaign: &Campaign) -> Vec<&Member> {
        let mut ordered: Vec<&Member> = campaign.members.iter().collect();
        ordered.sort_by_key(|member| {
            (
                member.allocated_month.is_none(),
                member.allocated_month,
                !member.is_admin,
            )
        });
        ordered
    }

    pub fn unallocated(campaign: &Campaign) -> Vec<&Member> {
        campaign
            .members
            .iter()
            .filter(|member| member.allocated_month.is_none())
            .collect()
    }

    fn in_window(campaign: &Campaign, month: PayoutMonth) -> bool {
        month >= campaign.first_month() && month <= campaign.last_month()
    }

    fn taken_months(campaign: &Campaign, except: Option<&UserId>) -> HashSet<PayoutMonth> {
        campaign
            .members
            .iter()
            .filter(|member| except.map_or(true, |id| member.user_id() != id))
            .filter_map(|member| member.allocated_month)
            .collect()
    }
}
