#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use campaign_ledger::{
    config::ConfigManager,
    core::{services::CampaignDraft, CampaignManager, EngineSettings},
    currency::Money,
    ledger::{Campaign, InvitationAction, Invitee, UserId, UserRef},
    storage::InMemoryCampaignStore,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn setup_config_manager() -> ConfigManager {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    ConfigManager::with_base_dir(base).expect("create config manager for temp dir")
}

pub fn setup_manager() -> (Arc<InMemoryCampaignStore>, CampaignManager) {
    setup_manager_with(EngineSettings::default())
}

pub fn setup_manager_with(settings: EngineSettings) -> (Arc<InMemoryCampaignStore>, CampaignManager) {
    let store = Arc::new(InMemoryCampaignStore::new());
    let manager = CampaignManager::new(Box::new(Arc::clone(&store)), settings);
    (store, manager)
}

/// Noon UTC on the given day.
pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

pub fn user(id: &str) -> UserRef {
    UserRef::new(id, id.to_uppercase()).with_email(format!("{}@example.com", id))
}

pub fn uid(id: &str) -> UserId {
    UserId::from(id)
}

/// A monthly campaign starting 2025-01-01.
pub fn draft(target_cents: i64, max_members: u32) -> CampaignDraft {
    CampaignDraft::new("Savings circle", "Monthly rotation", Money::from_cents(target_cents), max_members)
        .starting(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
}

/// Creates a campaign owned by `admin` and brings `members` in through accepted invitations.
pub fn campaign_with_members(
    manager: &CampaignManager,
    admin: &str,
    members: &[&str],
    max_members: u32,
) -> Campaign {
    let now = at(2025, 1, 1);
    let campaign = manager
        .create(draft(12_000 * max_members as i64, max_members), user(admin), now)
        .expect("create campaign");
    for member in members {
        let invitation = manager
            .mutate(campaign.id, |agg| agg.invite(&uid(admin), Invitee::User(uid(member)), now))
            .expect("invite");
        manager
            .mutate(campaign.id, |agg| {
                agg.respond_to_invitation(invitation.id, InvitationAction::Accept, &user(member), now)
            })
            .expect("accept");
    }
    manager.snapshot(campaign.id).expect("snapshot")
}
