use crm_db::{Admin, CrmDb};

use crate::{domain::AccountId, errors::Error, Result};

/// Authorization context passed into operator-facing operations: the
/// configured owner id plus a registry handle. Replaces ambient globals so
/// every check is explicit about whose authority it runs under.
#[derive(Clone)]
pub struct AuthContext {
    owner_id: AccountId,
    db: CrmDb,
}

impl AuthContext {
    pub fn new(owner_id: AccountId, db: CrmDb) -> Self {
        Self { owner_id, db }
    }

    pub fn owner_id(&self) -> AccountId {
        self.owner_id
    }

    /// The owner is always authorized, registry membership or not.
    pub async fn is_authorized(&self, caller: AccountId) -> Result<bool> {
        if caller == self.owner_id {
            return Ok(true);
        }
        Ok(self.db.is_admin(caller.0).await?)
    }

    /// Unconditional insert; duplicates are reconciled by [`Self::deduplicate`].
    pub async fn add_admin(&self, username: &str, account: AccountId) -> Result<Admin> {
        Ok(self.db.add_admin(username, account.0).await?)
    }

    /// Refuses to touch the owner; other ids lose every matching row.
    pub async fn remove_admin(&self, target: AccountId) -> Result<u64> {
        if target == self.owner_id {
            return Err(Error::Validation(
                "the owner cannot be removed from the admin registry".to_string(),
            ));
        }
        Ok(self.db.remove_admin(target.0).await?)
    }

    pub async fn list_admins(&self) -> Result<Vec<Admin>> {
        Ok(self.db.list_admins().await?)
    }

    pub async fn deduplicate(&self) -> Result<u64> {
        Ok(self.db.remove_duplicate_admins().await?)
    }
}
