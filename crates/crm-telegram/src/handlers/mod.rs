//! Telegram update handlers.
//!
//! One endpoint for all messages: operator commands and two-step replies for
//! authorized admins, inbound CRM ingestion for everyone else.

use std::sync::Arc;

use teloxide::prelude::*;

use crm_core::domain::AccountId;
use crm_core::pending::Intent;

use crate::router::AppState;

mod commands;
mod inbound;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let account = AccountId(user.id.0 as i64);

    let authorized = match state.auth.is_authorized(account).await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("authorization check failed: {e}");
            return Ok(());
        }
    };

    if !authorized {
        // Not an operator: this is a CRM contact writing in.
        return inbound::handle_inbound(msg, state).await;
    }

    if let Some(text) = msg.text().map(str::to_string) {
        if text.starts_with('/') {
            // A new command abandons any armed two-step prompt.
            state.pending.clear(account.0).await;
            return commands::handle_command(bot, msg, state).await;
        }

        // A bare text from an operator completes a pending two-step flow.
        if let Some(Intent::MessageBody { contact_id }) = state.pending.take(account.0).await {
            return commands::complete_send(bot, msg, state, contact_id, &text).await;
        }
    }

    let _ = bot
        .send_message(msg.chat.id, "Unknown input. Send /start for the command list.")
        .await;
    Ok(())
}
