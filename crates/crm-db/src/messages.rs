use crate::models::{Direction, MediaType, Message};
use crate::{now_ts, CrmDb, DbError, Result};

impl CrmDb {
    /// Idempotent append keyed on `(contact_id, message_id)`.
    ///
    /// Re-syncing history replays messages the log already holds; the unique
    /// constraint turns the duplicate insert into a no-op and the stored row
    /// is returned instead. The flag reports whether a new row was written.
    pub async fn append_message(
        &self,
        contact_id: i64,
        message_id: i64,
        direction: Direction,
        text: &str,
        media_type: MediaType,
        media_file_id: Option<&str>,
    ) -> Result<(Message, bool)> {
        let res = sqlx::query(
            "INSERT OR IGNORE INTO messages
                (contact_id, message_id, direction, text, media_type, media_file_id, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(contact_id)
        .bind(message_id)
        .bind(direction)
        .bind(text)
        .bind(media_type)
        .bind(media_file_id)
        .bind(now_ts())
        .execute(self.pool())
        .await?;

        let inserted = res.rows_affected() > 0;
        let message = self
            .get_message(contact_id, message_id)
            .await?
            .ok_or(DbError::ContactNotFound(contact_id))?;
        Ok((message, inserted))
    }

    pub async fn get_message(&self, contact_id: i64, message_id: i64) -> Result<Option<Message>> {
        Ok(sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE contact_id = ? AND message_id = ?",
        )
        .bind(contact_id)
        .bind(message_id)
        .fetch_optional(self.pool())
        .await?)
    }

    /// Conversation page, most recent first. A chronological view is the
    /// caller's reversal, not a different query.
    pub async fn history(&self, contact_id: i64, limit: i64) -> Result<Vec<Message>> {
        Ok(sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE contact_id = ?
             ORDER BY timestamp DESC, id DESC LIMIT ?",
        )
        .bind(contact_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?)
    }

    pub async fn messages_count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    /// Messages whose timestamp falls within the last `days` days.
    pub async fn messages_count_since(&self, days: u32) -> Result<i64> {
        let cutoff = now_ts() - i64::from(days) * 86_400;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE timestamp >= ?")
            .bind(cutoff)
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::{CrmDb, Direction, MediaType};

    async fn db_with_contact() -> (CrmDb, i64) {
        let db = CrmDb::open_in_memory().await.unwrap();
        let c = db
            .add_contact("Ana", "+70000000001", None, Some(777))
            .await
            .unwrap();
        (db, c.id)
    }

    #[tokio::test]
    async fn append_is_idempotent() {
        let (db, contact_id) = db_with_contact().await;

        let (first, inserted) = db
            .append_message(contact_id, 10, Direction::Incoming, "hi", MediaType::Text, None)
            .await
            .unwrap();
        assert!(inserted);

        let (second, inserted) = db
            .append_message(contact_id, 10, Direction::Incoming, "hi", MediaType::Text, None)
            .await
            .unwrap();
        assert!(!inserted);
        assert_eq!(first.id, second.id);

        assert_eq!(db.history(contact_id, 50).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn history_is_most_recent_first() {
        let (db, contact_id) = db_with_contact().await;
        for ext_id in 1..=3 {
            db.append_message(
                contact_id,
                ext_id,
                Direction::Incoming,
                &format!("msg {ext_id}"),
                MediaType::Text,
                None,
            )
            .await
            .unwrap();
        }

        let page = db.history(contact_id, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].message_id, 3);
        assert_eq!(page[1].message_id, 2);
    }

    #[tokio::test]
    async fn period_count_covers_recent_rows() {
        let (db, contact_id) = db_with_contact().await;
        db.append_message(contact_id, 1, Direction::Outgoing, "hello", MediaType::Text, None)
            .await
            .unwrap();

        assert_eq!(db.messages_count().await.unwrap(), 1);
        assert_eq!(db.messages_count_since(1).await.unwrap(), 1);
        assert_eq!(db.messages_count_since(7).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn media_metadata_round_trips() {
        let (db, contact_id) = db_with_contact().await;
        let (msg, _) = db
            .append_message(
                contact_id,
                5,
                Direction::Incoming,
                "[photo]",
                MediaType::Photo,
                Some("file-abc"),
            )
            .await
            .unwrap();

        assert_eq!(msg.media_type, MediaType::Photo);
        assert_eq!(msg.media_file_id.as_deref(), Some("file-abc"));
    }
}
