use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::Money;
use crate::errors::CampaignError;
use crate::ledger::{Campaign, CampaignStatus, Frequency, Member, UserRef};

use super::ServiceResult;

/// Raw creation form; every field the client may leave blank is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub target_amount: Option<Money>,
    pub max_members: Option<u32>,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

impl CampaignDraft {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        target_amount: Money,
        max_members: u32,
    ) -> Self {
        Self {
            name: Some(name.into()),
            description: Some(description.into()),
            target_amount: Some(target_amount),
            max_members: Some(max_members),
            frequency: Frequency::default(),
            start_date: None,
        }
    }

    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn starting(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }
}

pub struct CampaignService;

impl CampaignService {
    /// Validates the draft and builds a campaign with the creator as its first admin.
    pub fn create(
        draft: CampaignDraft,
        creator: UserRef,
        now: DateTime<Utc>,
    ) -> ServiceResult<Campaign> {
        let name = Self::required(draft.name, "name")?;
        let description = Self::required(draft.description, "description")?;
        let target_amount = draft
            .target_amount
            .ok_or_else(|| CampaignError::InvalidInput("target_amount".into()))?;
        let max_members = draft
            .max_members
            .ok_or_else(|| CampaignError::InvalidInput("max_members".into()))?;
        target_amount.ensure_positive()?;
        if max_members < 2 {
            return Err(CampaignError::InvalidMemberCount(max_members));
        }

        let contribution_amount = Money::divide(target_amount, max_members)?;
        let start_date = draft.start_date.unwrap_or_else(|| now.date_naive());
        let end_date = draft
            .frequency
            .advance(start_date, max_members)
            .ok_or_else(|| CampaignError::InvalidInput("start_date".into()))?;

        let campaign = Campaign {
            id: Uuid::new_v4(),
            name,
            description,
            status: CampaignStatus::Active,
            target_amount,
            contribution_amount,
            frequency: draft.frequency,
            start_date,
            end_date,
            max_members: Some(max_members),
            created_by: creator.id.clone(),
            members: vec![Member::new(creator, true, now)],
            contributions: Vec::new(),
            invitations: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tracing::info!(
            campaign = %campaign.id,
            target = %campaign.target_amount,
            share = %campaign.contribution_amount,
            "campaign created"
        );
        Ok(campaign)
    }

    /// Moves an active campaign to a new status; completed and cancelled are terminal.
    pub fn set_status(campaign: &mut Campaign, status: CampaignStatus) -> ServiceResult<()> {
        if campaign.status == status {
            return Ok(());
        }
        campaign.ensure_active()?;
        campaign.status = status;
        campaign.touch();
        tracing::info!(campaign = %campaign.id, ?status, "campaign status changed");
        Ok(())
    }

    fn required(value: Option<String>, field: &str) -> ServiceResult<String> {
        value
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| CampaignError::InvalidInput(field.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap()
    }

    fn creator() -> UserRef {
        UserRef::new("admin", "Amara")
    }

    #[test]
    fn derives_share_and_end_date() {
        let draft = CampaignDraft::new("Holiday", "Pool", Money::from_cents(120_000), 12);
        let campaign = CampaignService::create(draft, creator(), now()).unwrap();
        assert_eq!(campaign.contribution_amount, Money::from_cents(10_000));
        assert_eq!(campaign.start_date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(campaign.end_date, NaiveDate::from_ymd_opt(2026, 1, 15).unwrap());
        assert_eq!(campaign.members.len(), 1);
        assert!(campaign.members[0].is_admin);
    }

    #[test]
    fn weekly_campaign_ends_after_one_week_per_member() {
        let draft = CampaignDraft::new("Weekly", "Pool", Money::from_cents(50_000), 4)
            .with_frequency(Frequency::Weekly);
        let campaign = CampaignService::create(draft, creator(), now()).unwrap();
        assert_eq!(campaign.end_date, NaiveDate::from_ymd_opt(2025, 2, 12).unwrap());
    }

    #[test]
    fn rejects_missing_and_invalid_fields() {
        let mut draft = CampaignDraft::new("  ", "Pool", Money::from_cents(1_000), 3);
        assert_eq!(
            CampaignService::create(draft.clone(), creator(), now()),
            Err(CampaignError::InvalidInput("name".into()))
        );
        draft.name = Some("Named".into());
        draft.max_members = None;
        assert_eq!(
            CampaignService::create(draft.clone(), creator(), now()),
            Err(CampaignError::InvalidInput("max_members".into()))
        );
        draft.max_members = Some(1);
        assert_eq!(
            CampaignService::create(draft.clone(), creator(), now()),
            Err(CampaignError::InvalidMemberCount(1))
        );
        draft.target_amount = Some(Money::ZERO);
        assert!(matches!(
            CampaignService::create(draft, creator(), now()),
            Err(CampaignError::InvalidAmount(_))
        ));
    }

    #[test]
    fn terminal_status_cannot_change() {
        let draft = CampaignDraft::new("Done", "Pool", Money::from_cents(1_000), 2);
        let mut campaign = CampaignService::create(draft, creator(), now()).unwrap();
        CampaignService::set_status(&mut campaign, CampaignStatus::Completed).unwrap();
        assert!(matches!(
            CampaignService::set_status(&mut campaign, CampaignStatus::Active),
            Err(CampaignError::InvalidState(_))
        ));
    }
}
