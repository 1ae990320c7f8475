//! Telegram adapter (teloxide).
//!
//! Implements the `crm-core` ports over the Bot API and hosts the operator
//! command handlers plus the long-polling router.

use async_trait::async_trait;
use teloxide::prelude::*;
use tokio::time::sleep;

pub mod handlers;
pub mod router;

use crm_core::{
    domain::AccountId,
    errors::Error,
    port::{ContactDirectory, ImportOutcome, Messenger},
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_text(&self, account: AccountId, text: &str) -> Result<i64> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(teloxide::types::ChatId(account.0), text.to_string())
            })
            .await?;
        Ok(i64::from(msg.id.0))
    }
}

/// Contact directory for bot-token mode.
///
/// The Bot API has no contacts-import endpoint, so every lookup reports
/// `NoMatch` and contacts stay unlinked until an inbound message resolves
/// them. A user-account (MTProto) session is required for real imports.
pub struct BotApiDirectory;

#[async_trait]
impl ContactDirectory for BotApiDirectory {
    async fn import_contact(&self, _name: &str, _phone: &str) -> Result<ImportOutcome> {
        Ok(ImportOutcome::NoMatch)
    }
}
