/// The three CRM tables.
///
/// Uniqueness is enforced here rather than in application code:
/// `contacts.telegram_user_id` is UNIQUE (NULLs stay distinct, so unlinked
/// contacts coexist) and `(contact_id, message_id)` is the message dedup key,
/// so a concurrent check-then-insert cannot produce duplicate rows.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS contacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    phone TEXT NOT NULL,
    note TEXT,
    telegram_user_id BIGINT UNIQUE,
    date_added INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_contacts_phone ON contacts(phone);

CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    contact_id INTEGER NOT NULL,
    message_id BIGINT NOT NULL,
    direction TEXT NOT NULL CHECK(direction IN ('incoming', 'outgoing')),
    text TEXT NOT NULL,
    media_type TEXT NOT NULL DEFAULT 'text',
    media_file_id TEXT,
    timestamp INTEGER NOT NULL,
    UNIQUE(contact_id, message_id),
    FOREIGN KEY (contact_id) REFERENCES contacts (id)
);

CREATE INDEX IF NOT EXISTS idx_messages_contact ON messages(contact_id, timestamp);

CREATE TABLE IF NOT EXISTS admins (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    telegram_user_id BIGINT NOT NULL,
    date_added INTEGER NOT NULL
);
"#;
