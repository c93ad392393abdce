//! Campaign domain models, persistence-friendly types, and helpers.

pub mod campaign;
pub mod contribution;
pub mod frequency;
pub mod invitation;
pub mod member;
pub mod month;

pub use campaign::{Campaign, CampaignStatus};
pub use contribution::{Contribution, ContributionKind};
pub use frequency::{Frequency, PeriodPolicy};
pub use invitation::{Invitation, InvitationAction, InvitationStatus, Invitee};
pub use member::{Member, UserId, UserRef};
pub use month::PayoutMonth;
