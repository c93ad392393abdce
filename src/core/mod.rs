pub mod aggregate;
pub mod campaign_manager;
pub mod services;

pub use aggregate::{CampaignAggregate, EngineSettings};
pub use campaign_manager::CampaignManager;
