use crate::models::Admin;
use crate::{now_ts, CrmDb, Result};

impl CrmDb {
    /// Unconditional insert. Duplicate telegram ids are tolerated here;
    /// callers check [`CrmDb::is_admin`] first and
    /// [`CrmDb::remove_duplicate_admins`] reconciles after the fact.
    pub async fn add_admin(&self, username: &str, telegram_user_id: i64) -> Result<Admin> {
        let res = sqlx::query(
            "INSERT INTO admins (username, telegram_user_id, date_added) VALUES (?, ?, ?)",
        )
        .bind(username)
        .bind(telegram_user_id)
        .bind(now_ts())
        .execute(self.pool())
        .await?;

        let id = res.last_insert_rowid();
        tracing::info!(admin_id = id, username, telegram_user_id, "admin added");
        Ok(sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE id = ?")
            .bind(id)
            .fetch_one(self.pool())
            .await?)
    }

    /// Deletes every registry row for the id; returns how many were removed.
    /// Owner protection lives in the authorization layer, not here.
    pub async fn remove_admin(&self, telegram_user_id: i64) -> Result<u64> {
        let res = sqlx::query("DELETE FROM admins WHERE telegram_user_id = ?")
            .bind(telegram_user_id)
            .execute(self.pool())
            .await?;
        Ok(res.rows_affected())
    }

    pub async fn is_admin(&self, telegram_user_id: i64) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM admins WHERE telegram_user_id = ? LIMIT 1")
                .bind(telegram_user_id)
                .fetch_optional(self.pool())
                .await?;
        Ok(row.is_some())
    }

    /// Insertion order (creation time, then id).
    pub async fn list_admins(&self) -> Result<Vec<Admin>> {
        Ok(
            sqlx::query_as::<_, Admin>("SELECT * FROM admins ORDER BY date_added, id")
                .fetch_all(self.pool())
                .await?,
        )
    }

    pub async fn get_admin_by_username(&self, username: &str) -> Result<Option<Admin>> {
        Ok(
            sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE username = ? LIMIT 1")
                .bind(username)
                .fetch_optional(self.pool())
                .await?,
        )
    }

    /// For every telegram id appearing more than once, keep the oldest row
    /// (smallest id) and delete the rest. Safe to run repeatedly.
    pub async fn remove_duplicate_admins(&self) -> Result<u64> {
        let res = sqlx::query(
            "DELETE FROM admins
             WHERE id NOT IN (SELECT MIN(id) FROM admins GROUP BY telegram_user_id)",
        )
        .execute(self.pool())
        .await?;

        let removed = res.rows_affected();
        if removed > 0 {
            tracing::info!(removed, "duplicate admin rows removed");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use crate::CrmDb;

    #[tokio::test]
    async fn add_tolerates_duplicates_until_dedup() {
        let db = CrmDb::open_in_memory().await.unwrap();
        db.add_admin("ana", 100).await.unwrap();
        db.add_admin("ana", 100).await.unwrap();
        db.add_admin("ana", 100).await.unwrap();
        db.add_admin("boris", 200).await.unwrap();

        // 4 rows, 2 distinct ids -> first pass removes 2.
        assert_eq!(db.remove_duplicate_admins().await.unwrap(), 2);
        // Second pass is a no-op.
        assert_eq!(db.remove_duplicate_admins().await.unwrap(), 0);

        let admins = db.list_admins().await.unwrap();
        assert_eq!(admins.len(), 2);
        let mut ids: Vec<i64> = admins.iter().map(|a| a.telegram_user_id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 2);
    }

    #[tokio::test]
    async fn dedup_keeps_the_oldest_row() {
        let db = CrmDb::open_in_memory().await.unwrap();
        let first = db.add_admin("ana", 100).await.unwrap();
        db.add_admin("ana-again", 100).await.unwrap();

        db.remove_duplicate_admins().await.unwrap();
        let admins = db.list_admins().await.unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].id, first.id);
        assert_eq!(admins[0].username, "ana");
    }

    #[tokio::test]
    async fn remove_deletes_all_matching_rows() {
        let db = CrmDb::open_in_memory().await.unwrap();
        db.add_admin("ana", 100).await.unwrap();
        db.add_admin("ana", 100).await.unwrap();

        assert!(db.is_admin(100).await.unwrap());
        assert_eq!(db.remove_admin(100).await.unwrap(), 2);
        assert!(!db.is_admin(100).await.unwrap());
    }

    #[tokio::test]
    async fn list_is_insertion_ordered() {
        let db = CrmDb::open_in_memory().await.unwrap();
        db.add_admin("ana", 100).await.unwrap();
        db.add_admin("boris", 200).await.unwrap();
        db.add_admin("vera", 300).await.unwrap();

        let names: Vec<String> = db
            .list_admins()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.username)
            .collect();
        assert_eq!(names, ["ana", "boris", "vera"]);
    }

    #[tokio::test]
    async fn lookup_by_username() {
        let db = CrmDb::open_in_memory().await.unwrap();
        db.add_admin("ana", 100).await.unwrap();

        let hit = db.get_admin_by_username("ana").await.unwrap().unwrap();
        assert_eq!(hit.telegram_user_id, 100);
        assert!(db.get_admin_by_username("boris").await.unwrap().is_none());
    }
}
