use std::sync::Arc;

use teloxide::prelude::*;

use crm_core::domain::{AccountId, InboundMessage, MediaType};

use crate::router::AppState;

/// Feed one platform event from a non-operator sender into the pipeline:
/// resolve-or-create the contact, log the message, fan out to admins.
pub async fn handle_inbound(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };

    let (text, media_type, media_file_id) = extract_payload(&msg);

    let event = InboundMessage {
        sender_id: AccountId(user.id.0 as i64),
        sender_name: user.full_name(),
        // The Bot API never exposes a sender's phone number.
        sender_phone: None,
        message_id: i64::from(msg.id.0),
        text,
        media_type,
        media_file_id,
        outgoing: false,
    };

    if let Err(e) = state.pipeline.process(&event).await {
        tracing::error!(sender = event.sender_id.0, "inbound ingestion failed: {e}");
    }

    Ok(())
}

/// Map the Telegram payload onto the stored text + media columns. Non-text
/// payloads get a placeholder body and keep the platform file id.
fn extract_payload(msg: &Message) -> (String, MediaType, Option<String>) {
    if let Some(text) = msg.text() {
        return (text.to_string(), MediaType::Text, None);
    }

    let caption = msg.caption().map(str::to_string);
    if let Some(photos) = msg.photo() {
        let file_id = photos.last().map(|p| p.file.id.clone());
        return (caption.unwrap_or_else(|| "[photo]".to_string()), MediaType::Photo, file_id);
    }
    if let Some(video) = msg.video() {
        return (
            caption.unwrap_or_else(|| "[video]".to_string()),
            MediaType::Video,
            Some(video.file.id.clone()),
        );
    }
    if let Some(doc) = msg.document() {
        return (
            caption.unwrap_or_else(|| "[document]".to_string()),
            MediaType::Document,
            Some(doc.file.id.clone()),
        );
    }

    ("[unsupported message]".to_string(), MediaType::None, None)
}
