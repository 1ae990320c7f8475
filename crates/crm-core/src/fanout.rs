use std::{sync::Arc, time::Duration};

use crm_db::{Contact, CrmDb, Message};
use tokio::time::timeout;

use crate::{domain::AccountId, port::Messenger};

/// Pushes a formatted alert for a new inbound message to every registered
/// admin. Best-effort: a blocked bot or deactivated account costs that admin
/// this one alert and nothing else.
#[derive(Clone)]
pub struct NotificationFanout {
    messenger: Arc<dyn Messenger>,
    db: CrmDb,
    call_timeout: Duration,
}

impl NotificationFanout {
    pub fn new(messenger: Arc<dyn Messenger>, db: CrmDb, call_timeout: Duration) -> Self {
        Self {
            messenger,
            db,
            call_timeout,
        }
    }

    /// Reads the admin list fresh, attempts one delivery per admin, and
    /// returns how many went through. Failures are logged, never retried,
    /// and never abort the loop.
    pub async fn notify_new_message(&self, contact: &Contact, message: &Message) -> usize {
        let admins = match self.db.list_admins().await {
            Ok(admins) => admins,
            Err(e) => {
                tracing::error!("cannot read admin list for fan-out: {e}");
                return 0;
            }
        };

        let text = format_alert(contact, message);
        let mut delivered = 0;
        for admin in &admins {
            let target = AccountId(admin.telegram_user_id);
            match timeout(self.call_timeout, self.messenger.send_text(target, &text)).await {
                Ok(Ok(_)) => delivered += 1,
                Ok(Err(e)) => {
                    tracing::warn!(admin = %admin.username, "admin notification failed: {e}");
                }
                Err(_) => {
                    tracing::warn!(admin = %admin.username, "admin notification timed out");
                }
            }
        }
        delivered
    }
}

fn format_alert(contact: &Contact, message: &Message) -> String {
    format!(
        "New message from {} ({}):\n{}",
        contact.name, contact.phone, message.text
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;
    use crm_db::{Direction, MediaType};
    use tokio::sync::Mutex;

    use super::*;
    use crate::{errors::Error, Result};

    /// Records deliveries; accounts in `fail_for` raise a transport fault.
    #[derive(Default)]
    struct RecordingMessenger {
        fail_for: HashSet<i64>,
        sent: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send_text(&self, account: AccountId, _text: &str) -> Result<i64> {
            if self.fail_for.contains(&account.0) {
                return Err(Error::External("blocked by user".to_string()));
            }
            self.sent.lock().await.push(account.0);
            Ok(1)
        }
    }

    #[tokio::test]
    async fn partial_failure_does_not_abort_fanout() {
        let db = CrmDb::open_in_memory().await.unwrap();
        db.add_admin("first", 1).await.unwrap();
        db.add_admin("second", 2).await.unwrap();
        db.add_admin("third", 3).await.unwrap();

        let contact = db
            .add_contact("Ana", "+70000000001", None, Some(777))
            .await
            .unwrap();
        let (message, _) = db
            .append_message(contact.id, 1, Direction::Incoming, "hi", MediaType::Text, None)
            .await
            .unwrap();

        let messenger = Arc::new(RecordingMessenger {
            fail_for: HashSet::from([2]),
            ..Default::default()
        });
        let fanout =
            NotificationFanout::new(messenger.clone(), db, Duration::from_secs(1));

        let delivered = fanout.notify_new_message(&contact, &message).await;
        assert_eq!(delivered, 2);
        assert_eq!(*messenger.sent.lock().await, vec![1, 3]);
    }

    #[tokio::test]
    async fn no_admins_means_no_deliveries() {
        let db = CrmDb::open_in_memory().await.unwrap();
        let contact = db
            .add_contact("Ana", "+70000000001", None, Some(777))
            .await
            .unwrap();
        let (message, _) = db
            .append_message(contact.id, 1, Direction::Incoming, "hi", MediaType::Text, None)
            .await
            .unwrap();

        let messenger = Arc::new(RecordingMessenger::default());
        let fanout =
            NotificationFanout::new(messenger.clone(), db, Duration::from_secs(1));
        assert_eq!(fanout.notify_new_message(&contact, &message).await, 0);
        assert!(messenger.sent.lock().await.is_empty());
    }

    #[test]
    fn alert_carries_contact_and_text() {
        let contact = Contact {
            id: 1,
            name: "Ana".to_string(),
            phone: "+70000000001".to_string(),
            note: None,
            telegram_user_id: Some(777),
            date_added: 0,
        };
        let message = Message {
            id: 1,
            contact_id: 1,
            message_id: 10,
            direction: Direction::Incoming,
            text: "hello there".to_string(),
            media_type: MediaType::Text,
            media_file_id: None,
            timestamp: 0,
        };

        let alert = format_alert(&contact, &message);
        assert!(alert.contains("Ana"));
        assert!(alert.contains("+70000000001"));
        assert!(alert.contains("hello there"));
    }
}
