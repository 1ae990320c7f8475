use crm_db::CrmDb;

use crate::Result;

/// Point-in-time usage counters for the statistics screen.
#[derive(Clone, Copy, Debug)]
pub struct UsageStats {
    pub contacts: i64,
    pub messages: i64,
    pub messages_today: i64,
    pub messages_week: i64,
}

#[derive(Clone)]
pub struct StatsService {
    db: CrmDb,
}

impl StatsService {
    pub fn new(db: CrmDb) -> Self {
        Self { db }
    }

    pub async fn snapshot(&self) -> Result<UsageStats> {
        Ok(UsageStats {
            contacts: self.db.contacts_count().await?,
            messages: self.db.messages_count().await?,
            messages_today: self.db.messages_count_since(1).await?,
            messages_week: self.db.messages_count_since(7).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crm_db::{Direction, MediaType};

    use super::*;

    #[tokio::test]
    async fn snapshot_counts_rows() {
        let db = CrmDb::open_in_memory().await.unwrap();
        let contact = db
            .add_contact("Ana", "+70000000001", None, Some(777))
            .await
            .unwrap();
        for id in 1..=3 {
            db.append_message(contact.id, id, Direction::Incoming, "hi", MediaType::Text, None)
                .await
                .unwrap();
        }

        let stats = StatsService::new(db).snapshot().await.unwrap();
        assert_eq!(stats.contacts, 1);
        assert_eq!(stats.messages, 3);
        assert_eq!(stats.messages_today, 3);
        assert_eq!(stats.messages_week, 3);
    }
}
