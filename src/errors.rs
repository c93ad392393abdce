use std::time::Duration;

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::ledger::{PayoutMonth, UserId};

/// Failure raised by an external collaborator (REST or realtime transport).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("network failure: {0}")]
    Network(String),
    #[error("authentication required")]
    Unauthorized,
    #[error("realtime connection is not open")]
    NotConnected,
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Timeout(_) | TransportError::Network(_))
    }
}

/// Coarse classification used by callers to decide how to surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Authorization,
    NotFound,
    Transport,
}

/// Error type returned by every campaign engine operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CampaignError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid or missing field `{0}`")]
    InvalidInput(String),
    #[error("A campaign needs at least 2 members, got {0}")]
    InvalidMemberCount(u32),
    #[error("Month {month} is outside the campaign window {start} to {end}")]
    OutOfRange {
        month: PayoutMonth,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error("Month is already allocated to member {0}")]
    MonthAlreadyAllocated(UserId),
    #[error("User {0} is already a member of this campaign")]
    DuplicateMember(UserId),
    #[error("{0} is already a member of this campaign")]
    AlreadyMember(String),
    #[error("{0} already has a pending invitation")]
    AlreadyInvited(String),
    #[error("Campaign is full ({max} members)")]
    CampaignFull { max: u32 },
    #[error("Cannot remove the last admin while other members remain")]
    LastAdminRemoval,
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("User {user} is not allowed to {action}")]
    NotAuthorized { user: UserId, action: &'static str },
    #[error("Member not found: {0}")]
    UnknownMember(UserId),
    #[error("Invitation not found: {0}")]
    UnknownInvitation(Uuid),
    #[error("Campaign not found: {0}")]
    CampaignNotFound(Uuid),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl CampaignError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CampaignError::InvalidAmount(_)
            | CampaignError::InvalidInput(_)
            | CampaignError::InvalidMemberCount(_)
            | CampaignError::OutOfRange { .. } => ErrorKind::Validation,
            CampaignError::MonthAlreadyAllocated(_)
            | CampaignError::DuplicateMember(_)
            | CampaignError::AlreadyMember(_)
            | CampaignError::AlreadyInvited(_)
            | CampaignError::CampaignFull { .. }
            | CampaignError::LastAdminRemoval
            | CampaignError::InvalidState(_) => ErrorKind::Conflict,
            CampaignError::NotAuthorized { .. } => ErrorKind::Authorization,
            CampaignError::UnknownMember(_)
            | CampaignError::UnknownInvitation(_)
            | CampaignError::CampaignNotFound(_) => ErrorKind::NotFound,
            CampaignError::Transport(_) => ErrorKind::Transport,
        }
    }

    /// True for transport timeouts and network failures only.
    pub fn is_retryable(&self) -> bool {
        match self {
            CampaignError::Transport(err) => err.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_taxonomy_buckets() {
        assert_eq!(
            CampaignError::InvalidAmount("0.00".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            CampaignError::MonthAlreadyAllocated(UserId::new("ada")).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            CampaignError::NotAuthorized {
                user: UserId::new("bob"),
                action: "delete the campaign",
            }
            .kind(),
            ErrorKind::Authorization
        );
        assert_eq!(
            CampaignError::CampaignNotFound(Uuid::nil()).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn only_transient_transport_failures_are_retryable() {
        let timeout: CampaignError = TransportError::Timeout(Duration::from_secs(10)).into();
        assert!(timeout.is_retryable());
        assert_eq!(timeout.kind(), ErrorKind::Transport);

        let unauthorized: CampaignError = TransportError::Unauthorized.into();
        assert!(!unauthorized.is_retryable());
        assert!(!CampaignError::LastAdminRemoval.is_retryable());
    }
}
