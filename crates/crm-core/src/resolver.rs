use crm_db::{Contact, CrmDb};

use crate::{domain::AccountId, Result};

/// Display name used when the platform exposes none.
const FALLBACK_NAME: &str = "Unnamed contact";

/// Maps an inbound sender to a local contact, creating one on first contact.
#[derive(Clone)]
pub struct ContactResolver {
    db: CrmDb,
}

impl ContactResolver {
    pub fn new(db: CrmDb) -> Self {
        Self { db }
    }

    /// Look up by account id; create with the hints on first contact.
    ///
    /// An existing contact is returned unchanged, whatever the hints say.
    /// Storage failures propagate; resolution is never retried here.
    pub async fn resolve_or_create(
        &self,
        account: AccountId,
        name_hint: &str,
        phone_hint: Option<&str>,
    ) -> Result<Contact> {
        let name = match name_hint.trim() {
            "" => FALLBACK_NAME,
            trimmed => trimmed,
        };
        let phone = match phone_hint.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => p.to_string(),
            None => placeholder_phone(account),
        };

        Ok(self
            .db
            .find_or_create_by_telegram_id(account.0, name, &phone)
            .await?)
    }
}

/// `phone` is required at creation, but unknown senders expose none. The
/// placeholder embeds the account id and contains letters, so it can never
/// collide with a real number of another contact.
fn placeholder_phone(account: AccountId) -> String {
    format!("+id{}", account.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn resolver() -> ContactResolver {
        ContactResolver::new(CrmDb::open_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn first_contact_creates_with_hints() {
        let r = resolver().await;
        let c = r
            .resolve_or_create(AccountId(777), "Ana", None)
            .await
            .unwrap();

        assert_eq!(c.name, "Ana");
        assert_eq!(c.phone, "+id777");
        assert_eq!(c.telegram_user_id, Some(777));
    }

    #[tokio::test]
    async fn repeated_resolution_is_stable() {
        let r = resolver().await;
        let a = r
            .resolve_or_create(AccountId(777), "Ana", None)
            .await
            .unwrap();
        let b = r
            .resolve_or_create(AccountId(777), "Completely Different", Some("+79000000000"))
            .await
            .unwrap();

        assert_eq!(a.id, b.id);
        assert_eq!(b.name, "Ana");
    }

    #[tokio::test]
    async fn blank_name_falls_back_to_placeholder() {
        let r = resolver().await;
        let c = r
            .resolve_or_create(AccountId(5), "   ", Some("+79001234567"))
            .await
            .unwrap();

        assert_eq!(c.name, FALLBACK_NAME);
        assert_eq!(c.phone, "+79001234567");
    }
}
