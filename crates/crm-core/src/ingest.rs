use std::sync::Arc;

use crm_db::{Contact, CrmDb, Direction, MediaType, Message};

use crate::{
    domain::{AccountId, InboundMessage},
    errors::Error,
    fanout::NotificationFanout,
    port::Messenger,
    resolver::ContactResolver,
    Result,
};

/// The inbound pipeline: resolve the sender to a contact, append the message
/// idempotently, fan out to admins. Also relays operator replies outward and
/// logs them with the platform-returned message id.
#[derive(Clone)]
pub struct MessagePipeline {
    db: CrmDb,
    resolver: ContactResolver,
    fanout: NotificationFanout,
    messenger: Arc<dyn Messenger>,
}

impl MessagePipeline {
    pub fn new(
        db: CrmDb,
        resolver: ContactResolver,
        fanout: NotificationFanout,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            db,
            resolver,
            fanout,
            messenger,
        }
    }

    /// Handle one inbound platform event.
    ///
    /// Replayed history is a no-op append and is never re-announced; only a
    /// newly written incoming row triggers the admin fan-out.
    pub async fn process(&self, event: &InboundMessage) -> Result<Message> {
        let contact = self
            .resolver
            .resolve_or_create(
                event.sender_id,
                &event.sender_name,
                event.sender_phone.as_deref(),
            )
            .await?;

        let direction = if event.outgoing {
            Direction::Outgoing
        } else {
            Direction::Incoming
        };

        let (message, inserted) = self
            .db
            .append_message(
                contact.id,
                event.message_id,
                direction,
                &event.text,
                event.media_type,
                event.media_file_id.as_deref(),
            )
            .await?;

        if inserted && direction == Direction::Incoming {
            self.fanout.notify_new_message(&contact, &message).await;
        }

        Ok(message)
    }

    /// Relay an operator reply to a linked contact and log it as outgoing.
    pub async fn send_to_contact(&self, contact: &Contact, text: &str) -> Result<Message> {
        let target = contact.telegram_user_id.ok_or_else(|| {
            Error::Validation(format!(
                "contact {} has no linked Telegram account",
                contact.id
            ))
        })?;

        let message_id = self.messenger.send_text(AccountId(target), text).await?;
        let (message, _) = self
            .db
            .append_message(
                contact.id,
                message_id,
                Direction::Outgoing,
                text,
                MediaType::Text,
                None,
            )
            .await?;
        Ok(message)
    }
}
