use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::member::UserId;
use crate::currency::Money;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContributionKind {
    /// Money paid into the pool by a member for the allocated recipient.
    #[default]
    Contribution,
    /// Payout handed to the allocated recipient.
    Disbursement,
}

/// Immutable ledger entry; the engine never edits or deletes one after recording it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contribution {
    pub id: Uuid,
    pub contributor: UserId,
    pub recipient: UserId,
    pub amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub kind: ContributionKind,
    pub created_at: DateTime<Utc>,
}

impl Contribution {
    pub fn new(
        contributor: UserId,
        recipient: UserId,
        amount: Money,
        notes: Option<String>,
        kind: ContributionKind,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            contributor,
            recipient,
            amount,
            notes: notes
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
            kind,
            created_at,
        }
    }

    pub fn is_contribution(&self) -> bool {
        self.kind == ContributionKind::Contribution
    }
}
