use std::{sync::Arc, time::Duration};

use crm_db::CrmDb;
use tokio::time::{sleep, timeout};

use crate::{
    errors::Error,
    port::{ContactDirectory, ImportOutcome},
    Result,
};

/// Outcome of one link attempt. `success == false` covers both "number not
/// registered" and transport faults; the `message` tells them apart for the
/// operator. Never an error: callers decide whether to retry later.
#[derive(Clone, Debug)]
pub struct LinkResult {
    pub success: bool,
    pub account_id: Option<i64>,
    pub username: Option<String>,
    pub message: String,
}

impl LinkResult {
    fn unresolved(message: impl Into<String>) -> Self {
        Self {
            success: false,
            account_id: None,
            username: None,
            message: message.into(),
        }
    }
}

/// Counts for one batch run. `total - imported - failed` items were left for
/// a future run because the hourly ceiling cut the batch short.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub imported: usize,
    pub failed: usize,
    pub total: usize,
}

/// Best-effort bridge to the platform's address book.
///
/// Every attempt waits `delay` first (per-call, in the calling task) to
/// respect platform-side limits on contact-import operations, and is bounded
/// by `call_timeout`.
#[derive(Clone)]
pub struct ContactImporter {
    directory: Arc<dyn ContactDirectory>,
    db: CrmDb,
    delay: Duration,
    call_timeout: Duration,
    max_per_hour: usize,
}

impl ContactImporter {
    pub fn new(
        directory: Arc<dyn ContactDirectory>,
        db: CrmDb,
        delay: Duration,
        call_timeout: Duration,
        max_per_hour: usize,
    ) -> Self {
        Self {
            directory,
            db,
            delay,
            call_timeout,
            max_per_hour,
        }
    }

    /// One import attempt. Transport faults and timeouts are folded into a
    /// non-success result; this never returns an error to the caller.
    pub async fn try_link(&self, name: &str, phone: &str) -> LinkResult {
        sleep(self.delay).await;

        match timeout(self.call_timeout, self.directory.import_contact(name, phone)).await {
            Ok(Ok(ImportOutcome::Matched {
                account_id,
                username,
            })) => {
                tracing::info!(phone, account_id, "contact resolved on the platform");
                LinkResult {
                    success: true,
                    account_id: Some(account_id),
                    username,
                    message: "contact linked".to_string(),
                }
            }
            Ok(Ok(ImportOutcome::NoMatch)) => {
                tracing::debug!(phone, "phone number not registered on the platform");
                LinkResult::unresolved("phone number is not registered on Telegram")
            }
            Ok(Err(e)) => {
                tracing::warn!(phone, "contact import failed: {e}");
                LinkResult::unresolved(format!("import failed: {e}"))
            }
            Err(_) => {
                tracing::warn!(phone, "contact import timed out");
                LinkResult::unresolved("import timed out")
            }
        }
    }

    /// Manual (re-)attempt for a stored contact. On success the resolved
    /// account id is written back to the same row.
    pub async fn link_contact(&self, contact_id: i64) -> Result<LinkResult> {
        let contact = self
            .db
            .get_contact(contact_id)
            .await
            .map_err(Error::Storage)?
            .ok_or_else(|| Error::Validation(format!("no contact with id {contact_id}")))?;

        let result = self.try_link(&contact.name, &contact.phone).await;
        if let Some(account_id) = result.account_id {
            self.db
                .set_telegram_id(contact.id, account_id)
                .await
                .map_err(Error::Storage)?;
        }
        Ok(result)
    }

    /// Per-item import over raw `(name, phone)` pairs. Items beyond the
    /// hourly ceiling are not attempted and stay counted only in `total`.
    pub async fn batch_import(&self, items: &[(String, String)]) -> BatchReport {
        let total = items.len();
        let cap = self.max_per_hour.min(total);
        if cap < total {
            tracing::warn!(cap, total, "hourly import ceiling reached, truncating batch");
        }

        let mut report = BatchReport {
            total,
            ..BatchReport::default()
        };
        for (name, phone) in &items[..cap] {
            if self.try_link(name, phone).await.success {
                report.imported += 1;
            } else {
                report.failed += 1;
            }
        }

        tracing::info!(
            imported = report.imported,
            failed = report.failed,
            total = report.total,
            "batch import finished"
        );
        report
    }

    /// Batch path over stored contacts that have no account id yet,
    /// persisting every successful resolution. Same ceiling as
    /// [`Self::batch_import`].
    pub async fn link_all_unlinked(&self) -> Result<BatchReport> {
        let pending = self.db.unlinked_contacts().await.map_err(Error::Storage)?;
        let total = pending.len();
        let cap = self.max_per_hour.min(total);
        if cap < total {
            tracing::warn!(cap, total, "hourly import ceiling reached, truncating batch");
        }

        let mut report = BatchReport {
            total,
            ..BatchReport::default()
        };
        for contact in &pending[..cap] {
            let result = self.try_link(&contact.name, &contact.phone).await;
            match result.account_id {
                Some(account_id) => {
                    self.db
                        .set_telegram_id(contact.id, account_id)
                        .await
                        .map_err(Error::Storage)?;
                    report.imported += 1;
                }
                None => report.failed += 1,
            }
        }
        Ok(report)
    }
}
