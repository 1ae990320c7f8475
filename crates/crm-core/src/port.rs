use async_trait::async_trait;

use crate::{domain::AccountId, Result};

/// Outbound messaging capability of the platform connection.
///
/// Telegram is the first implementation; the adapter maps its own errors
/// into [`crate::Error::External`].
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Deliver `text` to the account and return the platform's message id.
    async fn send_text(&self, account: AccountId, text: &str) -> Result<i64>;
}

/// Result of asking the platform to resolve a phone number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The number belongs to a registered account.
    Matched {
        account_id: i64,
        username: Option<String>,
    },
    /// The number is not resolvable. Not an error, just "not linked yet".
    NoMatch,
}

/// The platform's contact-import facility (address-book registration).
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    async fn import_contact(&self, name: &str, phone: &str) -> Result<ImportOutcome>;
}
