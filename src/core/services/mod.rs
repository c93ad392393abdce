pub mod allocation_service;
pub mod campaign_service;
pub mod contribution_service;
pub mod membership_service;

pub use allocation_service::MonthAllocator;
pub use campaign_service::{CampaignDraft, CampaignService};
pub use contribution_service::ContributionLedger;
pub use membership_service::MembershipRegistry;

use crate::errors::CampaignError;

pub type ServiceResult<T> = Result<T, CampaignError>;
