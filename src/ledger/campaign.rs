use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    contribution::Contribution,
    frequency::Frequency,
    invitation::Invitation,
    member::{Member, UserId},
    month::PayoutMonth,
};
use crate::currency::Money;
use crate::errors::CampaignError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
}

impl CampaignStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, CampaignStatus::Active)
    }
}

/// A group savings pool: roster, payout schedule, ledger and invitations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub status: CampaignStatus,
    pub target_amount: Money,
    pub contribution_amount: Money,
    #[serde(default)]
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub max_members: Option<u32>,
    pub created_by: UserId,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub contributions: Vec<Contribution>,
    #[serde(default)]
    pub invitations: Vec<Invitation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    pub fn member(&self, id: &UserId) -> Option<&Member> {
        self.members.iter().find(|member| member.user_id() == id)
    }

    pub fn member_mut(&mut self, id: &UserId) -> Option<&mut Member> {
        self.members.iter_mut().find(|member| member.user_id() == id)
    }

    /// Position in the ordered roster, which drives default month allocation.
    pub fn member_index(&self, id: &UserId) -> Option<usize> {
        self.members
            .iter()
            .position(|member| member.user_id() == id)
    }

    pub fn is_member(&self, id: &UserId) -> bool {
        self.member(id).is_some()
    }

    pub fn admin_count(&self) -> usize {
        self.members.iter().filter(|member| member.is_admin).count()
    }

    pub fn invitation(&self, id: Uuid) -> Option<&Invitation> {
        self.invitations
            .iter()
            .find(|invitation| invitation.id == id)
    }

    pub fn invitation_mut(&mut self, id: Uuid) -> Option<&mut Invitation> {
        self.invitations
            .iter_mut()
            .find(|invitation| invitation.id == id)
    }

    pub fn pending_invitation_count(&self) -> usize {
        self.invitations
            .iter()
            .filter(|invitation| invitation.is_pending())
            .count()
    }

    pub fn first_month(&self) -> PayoutMonth {
        PayoutMonth::from_date(self.start_date)
    }

    pub fn last_month(&self) -> PayoutMonth {
        PayoutMonth::from_date(self.end_date)
    }

    pub fn ensure_active(&self) -> Result<(), CampaignError> {
        if self.status.is_terminal() {
            Err(CampaignError::InvalidState(format!(
                "campaign {} is {:?}",
                self.id, self.status
            )))
        } else {
            Ok(())
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Checks the structural invariants every committed snapshot must satisfy.
    pub fn verify_invariants(&self) -> Result<(), CampaignError> {
        let mut seen_users = HashSet::new();
        let mut months: HashMap<PayoutMonth, &UserId> = HashMap::new();
        let (first, last) = (self.first_month(), self.last_month());
        for member in &self.members {
            if !seen_users.insert(member.user_id()) {
                return Err(CampaignError::DuplicateMember(member.user_id().clone()));
            }
            if let Some(month) = member.allocated_month {
                if month < first || month > last {
                    return Err(CampaignError::OutOfRange {
                        month,
                        start: self.start_date,
                        end: self.end_date,
                    });
                }
                if let Some(holder) = months.insert(month, member.user_id()) {
                    return Err(CampaignError::MonthAlreadyAllocated(holder.clone()));
                }
            }
        }
        if let Some(max) = self.max_members {
            if self.members.len() > max as usize {
                return Err(CampaignError::CampaignFull { max });
            }
        }
        if let Some(entry) = self.contributions.iter().find(|entry| !entry.amount.is_positive()) {
            return Err(CampaignError::InvalidAmount(entry.amount.to_string()));
        }
        Ok(())
    }
}
