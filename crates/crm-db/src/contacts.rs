use crate::models::Contact;
use crate::{now_ts, CrmDb, DbError, Result};

impl CrmDb {
    pub async fn add_contact(
        &self,
        name: &str,
        phone: &str,
        note: Option<&str>,
        telegram_user_id: Option<i64>,
    ) -> Result<Contact> {
        let res = sqlx::query(
            "INSERT INTO contacts (name, phone, note, telegram_user_id, date_added)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(name)
        .bind(phone)
        .bind(note)
        .bind(telegram_user_id)
        .bind(now_ts())
        .execute(self.pool())
        .await?;

        let id = res.last_insert_rowid();
        tracing::info!(contact_id = id, name, phone, "contact added");
        self.get_contact(id)
            .await?
            .ok_or(DbError::ContactNotFound(id))
    }

    pub async fn get_contact(&self, id: i64) -> Result<Option<Contact>> {
        Ok(
            sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool())
                .await?,
        )
    }

    /// Multiple contacts may share a phone; the most recently created one
    /// wins (latest `date_added`, then highest id).
    pub async fn get_contact_by_phone(&self, phone: &str) -> Result<Option<Contact>> {
        Ok(sqlx::query_as::<_, Contact>(
            "SELECT * FROM contacts WHERE phone = ? ORDER BY date_added DESC, id DESC LIMIT 1",
        )
        .bind(phone)
        .fetch_optional(self.pool())
        .await?)
    }

    pub async fn get_contact_by_telegram_id(
        &self,
        telegram_user_id: i64,
    ) -> Result<Option<Contact>> {
        Ok(
            sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE telegram_user_id = ?")
                .bind(telegram_user_id)
                .fetch_optional(self.pool())
                .await?,
        )
    }

    /// Find the contact linked to `telegram_user_id`, creating it if absent.
    ///
    /// Concurrent first-contact events race on the UNIQUE telegram id; the
    /// loser's insert is a no-op and the re-query returns the winner's row.
    pub async fn find_or_create_by_telegram_id(
        &self,
        telegram_user_id: i64,
        name: &str,
        phone: &str,
    ) -> Result<Contact> {
        if let Some(existing) = self.get_contact_by_telegram_id(telegram_user_id).await? {
            return Ok(existing);
        }

        let res = sqlx::query(
            "INSERT INTO contacts (name, phone, note, telegram_user_id, date_added)
             VALUES (?, ?, NULL, ?, ?)
             ON CONFLICT(telegram_user_id) DO NOTHING",
        )
        .bind(name)
        .bind(phone)
        .bind(telegram_user_id)
        .bind(now_ts())
        .execute(self.pool())
        .await?;

        if res.rows_affected() > 0 {
            tracing::info!(telegram_user_id, name, "contact created from inbound message");
        }

        self.get_contact_by_telegram_id(telegram_user_id)
            .await?
            .ok_or(DbError::ContactNotFound(telegram_user_id))
    }

    pub async fn recent_contacts(&self, limit: i64) -> Result<Vec<Contact>> {
        Ok(sqlx::query_as::<_, Contact>(
            "SELECT * FROM contacts ORDER BY date_added DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?)
    }

    pub async fn list_contacts(&self, limit: i64, offset: i64) -> Result<Vec<Contact>> {
        Ok(
            sqlx::query_as::<_, Contact>("SELECT * FROM contacts ORDER BY name LIMIT ? OFFSET ?")
                .bind(limit)
                .bind(offset)
                .fetch_all(self.pool())
                .await?,
        )
    }

    /// Contacts not yet linked to a Telegram account, oldest first, for the
    /// batch import path.
    pub async fn unlinked_contacts(&self) -> Result<Vec<Contact>> {
        Ok(sqlx::query_as::<_, Contact>(
            "SELECT * FROM contacts WHERE telegram_user_id IS NULL ORDER BY date_added, id",
        )
        .fetch_all(self.pool())
        .await?)
    }

    pub async fn search_contacts(&self, query: &str) -> Result<Vec<Contact>> {
        let pattern = format!("%{query}%");
        Ok(sqlx::query_as::<_, Contact>(
            "SELECT * FROM contacts WHERE name LIKE ? OR phone LIKE ? OR note LIKE ?
             ORDER BY name",
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(self.pool())
        .await?)
    }

    /// Patch-style update: `None` fields keep their stored value.
    pub async fn update_contact(
        &self,
        id: i64,
        name: Option<&str>,
        phone: Option<&str>,
        note: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE contacts SET
                name = COALESCE(?, name),
                phone = COALESCE(?, phone),
                note = COALESCE(?, note)
             WHERE id = ?",
        )
        .bind(name)
        .bind(phone)
        .bind(note)
        .bind(id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn set_telegram_id(&self, contact_id: i64, telegram_user_id: i64) -> Result<()> {
        sqlx::query("UPDATE contacts SET telegram_user_id = ? WHERE id = ?")
            .bind(telegram_user_id)
            .bind(contact_id)
            .execute(self.pool())
            .await?;
        tracing::info!(contact_id, telegram_user_id, "contact linked to telegram account");
        Ok(())
    }

    /// Removes the contact and its whole message history.
    pub async fn delete_contact(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM messages WHERE contact_id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        sqlx::query("DELETE FROM contacts WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        tracing::info!(contact_id = id, "contact deleted");
        Ok(())
    }

    pub async fn contacts_count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM contacts")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::CrmDb;

    #[tokio::test]
    async fn find_or_create_returns_same_row() {
        let db = CrmDb::open_in_memory().await.unwrap();

        let a = db
            .find_or_create_by_telegram_id(777, "Ana", "+id777")
            .await
            .unwrap();
        let b = db
            .find_or_create_by_telegram_id(777, "Ana Maria", "+70000000009")
            .await
            .unwrap();

        assert_eq!(a.id, b.id);
        assert_eq!(b.name, "Ana");
        assert_eq!(db.contacts_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn phone_lookup_prefers_most_recent() {
        let db = CrmDb::open_in_memory().await.unwrap();

        let first = db
            .add_contact("Ivan", "+70000000001", None, None)
            .await
            .unwrap();
        let second = db
            .add_contact("Ivan (new)", "+70000000001", None, None)
            .await
            .unwrap();
        assert!(second.id > first.id);

        let hit = db
            .get_contact_by_phone("+70000000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.id, second.id);
    }

    #[tokio::test]
    async fn update_is_a_patch() {
        let db = CrmDb::open_in_memory().await.unwrap();
        let c = db
            .add_contact("Ivan", "+70000000001", Some("lead"), None)
            .await
            .unwrap();

        db.update_contact(c.id, Some("Ivan Petrov"), None, None)
            .await
            .unwrap();
        let got = db.get_contact(c.id).await.unwrap().unwrap();
        assert_eq!(got.name, "Ivan Petrov");
        assert_eq!(got.phone, "+70000000001");
        assert_eq!(got.note.as_deref(), Some("lead"));
    }

    #[tokio::test]
    async fn search_matches_name_phone_and_note() {
        let db = CrmDb::open_in_memory().await.unwrap();
        db.add_contact("Ivan", "+70000000001", Some("warm lead"), None)
            .await
            .unwrap();
        db.add_contact("Maria", "+70000000002", None, None)
            .await
            .unwrap();

        assert_eq!(db.search_contacts("iva").await.unwrap().len(), 1);
        assert_eq!(db.search_contacts("0000000").await.unwrap().len(), 2);
        assert_eq!(db.search_contacts("warm").await.unwrap().len(), 1);
        assert!(db.search_contacts("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_takes_the_history_along() {
        use crate::{Direction, MediaType};

        let db = CrmDb::open_in_memory().await.unwrap();
        let c = db
            .add_contact("Ivan", "+70000000001", None, Some(777))
            .await
            .unwrap();
        db.append_message(c.id, 1, Direction::Incoming, "hi", MediaType::Text, None)
            .await
            .unwrap();

        db.delete_contact(c.id).await.unwrap();
        assert!(db.get_contact(c.id).await.unwrap().is_none());
        assert_eq!(db.messages_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn listing_pages_do_not_overlap() {
        let db = CrmDb::open_in_memory().await.unwrap();
        for i in 1..=5 {
            db.add_contact(&format!("c{i}"), &format!("+7000000000{i}"), None, None)
                .await
                .unwrap();
        }

        let first = db.list_contacts(2, 0).await.unwrap();
        let second = db.list_contacts(2, 2).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert!(first.iter().all(|a| second.iter().all(|b| a.id != b.id)));
    }
}
