#![doc(test(attr(deny(warnings))))]

//! Campaign Ledger is the domain core of a group savings app: campaigns with
//! a fixed target, a member roster, one payout month per member, an
//! append-only contribution ledger, invitations and campaign chat.

pub mod config;
pub mod core;
pub mod currency;
pub mod errors;
pub mod ledger;
pub mod realtime;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    init_with(None);
}

/// Like [`init`], honouring the `log_filter` of a loaded config.
pub fn init_with_config(config: &config::Config) {
    init_with(config.log_filter.as_deref());
}

fn init_with(directive: Option<&str>) {
    INIT_TRACING.call_once(|| {
        utils::init_tracing(directive);
        tracing::info!("Campaign Ledger tracing initialized.");
    });
}
