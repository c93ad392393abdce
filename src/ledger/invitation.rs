use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::member::{UserId, UserRef};
use crate::errors::CampaignError;

const MIN_PHONE_DIGITS: usize = 7;

/// Who an invitation is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Invitee {
    Email(String),
    Phone(String),
    User(UserId),
}

impl Invitee {
    /// Validates and lowercases an email address.
    pub fn email(raw: &str) -> Result<Self, CampaignError> {
        let normalized = normalize_email(raw);
        match normalized.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {
                Ok(Invitee::Email(normalized))
            }
            _ => Err(CampaignError::InvalidInput("email".into())),
        }
    }

    /// Validates a phone number, keeping a leading `+` and the digits.
    pub fn phone(raw: &str) -> Result<Self, CampaignError> {
        let normalized = normalize_phone(raw);
        let digits = normalized.chars().filter(|c| c.is_ascii_digit()).count();
        let only_dialable = raw
            .trim()
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')' | '.'));
        if digits < MIN_PHONE_DIGITS || !only_dialable {
            return Err(CampaignError::InvalidInput("phone".into()));
        }
        Ok(Invitee::Phone(normalized))
    }

    /// Case-insensitive email and punctuation-insensitive phone comparison.
    pub fn matches(&self, user: &UserRef) -> bool {
        match self {
            Invitee::Email(email) => user
                .email
                .as_deref()
                .map_or(false, |candidate| normalize_email(candidate) == normalize_email(email)),
            Invitee::Phone(phone) => user
                .phone
                .as_deref()
                .map_or(false, |candidate| normalize_phone(candidate) == normalize_phone(phone)),
            Invitee::User(id) => &user.id == id,
        }
    }

    pub fn same_target(&self, other: &Invitee) -> bool {
        match (self, other) {
            (Invitee::Email(a), Invitee::Email(b)) => normalize_email(a) == normalize_email(b),
            (Invitee::Phone(a), Invitee::Phone(b)) => normalize_phone(a) == normalize_phone(b),
            (Invitee::User(a), Invitee::User(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Invitee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invitee::Email(email) => f.write_str(email),
            Invitee::Phone(phone) => f.write_str(phone),
            Invitee::User(id) => write!(f, "user {}", id),
        }
    }
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut normalized: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if trimmed.starts_with('+') {
        normalized.insert(0, '+');
    }
    normalized
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InvitationAction {
    Accept,
    Decline,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Invitation {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub invitee: Invitee,
    pub invited_by: UserId,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
}

impl Invitation {
    pub fn new(
        campaign_id: Uuid,
        invitee: Invitee,
        invited_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            invitee,
            invited_by,
            status: InvitationStatus::Pending,
            created_at,
            responded_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }

    /// Moves a pending invitation into a terminal status.
    pub(crate) fn close(
        &mut self,
        status: InvitationStatus,
        at: DateTime<Utc>,
    ) -> Result<(), CampaignError> {
        if !self.is_pending() {
            return Err(CampaignError::InvalidState(format!(
                "invitation {} is {:?}, not pending",
                self.id, self.status
            )));
        }
        self.status = status;
        self.responded_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_invitee_normalizes_case() {
        let invitee = Invitee::email("  Ada@Example.COM ").unwrap();
        assert_eq!(invitee, Invitee::Email("ada@example.com".into()));
        let user = UserRef::new("u-1", "Ada").with_email("ADA@example.com");
        assert!(invitee.matches(&user));
        assert!(Invitee::email("not-an-email").is_err());
    }

    #[test]
    fn phone_invitee_ignores_punctuation() {
        let invitee = Invitee::phone("+1 (555) 010-2030").unwrap();
        assert_eq!(invitee, Invitee::Phone("+15550102030".into()));
        assert!(invitee.same_target(&Invitee::Phone("+1 555 010 2030".into())));
        assert!(Invitee::phone("12-34").is_err());
        assert!(Invitee::phone("call me maybe 5550102030").is_err());
    }

    #[test]
    fn closing_twice_is_rejected() {
        let mut invitation = Invitation::new(
            Uuid::new_v4(),
            Invitee::User(UserId::new("u-2")),
            UserId::new("u-1"),
            Utc::now(),
        );
        invitation
            .close(InvitationStatus::Declined, Utc::now())
            .unwrap();
        assert!(matches!(
            invitation.close(InvitationStatus::Accepted, Utc::now()),
            Err(CampaignError::InvalidState(_))
        ));
    }
}
