//! Chatid Storage
//!
//! SQLite persistence for users, groups and usage stats

use anyhow::Result;
use rusqlite::OptionalExtension;
use std::path::Path;

/// Event category recorded with each answered request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatEvent {
    ForwardMessage,
    Me,
    Contact,
    ButtonShareChat,
    Story,
    SearchUsername,
    SearchInline,
    ViaBot,
    IdInGroup,
    ReplyToAnotherChat,
    BusinessId,
    BusinessSettings,
    Link,
}

impl StatEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatEvent::ForwardMessage => "forward_message",
            StatEvent::Me => "me",
            StatEvent::Contact => "contact",
            StatEvent::ButtonShareChat => "button_share_chat",
            StatEvent::Story => "story",
            StatEvent::SearchUsername => "search_username",
            StatEvent::SearchInline => "search_inline",
            StatEvent::ViaBot => "via_bot",
            StatEvent::IdInGroup => "id_in_group",
            StatEvent::ReplyToAnotherChat => "reply_to_another_chat",
            StatEvent::BusinessId => "business_id",
            StatEvent::BusinessSettings => "business_settings",
            StatEvent::Link => "link",
        }
    }
}

pub struct Storage {
    conn: rusqlite::Connection,
}

impl Storage {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = rusqlite::Connection::open(db_path.as_ref())?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &rusqlite::Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                tg_id INTEGER PRIMARY KEY,
                name TEXT,
                username TEXT,
                lang TEXT,
                active INTEGER NOT NULL DEFAULT 1,
                business_connection_id TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS groups (
                group_id INTEGER PRIMARY KEY,
                name TEXT,
                username TEXT,
                added_by_id INTEGER,
                active INTEGER NOT NULL DEFAULT 1,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event TEXT NOT NULL,
                lang TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_stats_event ON stats(event);
            ",
        )?;
        Ok(())
    }

    // --- users ---

    pub fn user_exists(&self, tg_id: i64) -> Result<bool> {
        let row: Option<i64> = self
            .conn
            .prepare("SELECT 1 FROM users WHERE tg_id = ?1")?
            .query_row([tg_id], |row| row.get(0))
            .optional()?;
        Ok(row.is_some())
    }

    pub fn is_user_active(&self, tg_id: i64) -> Result<bool> {
        let active: Option<i64> = self
            .conn
            .prepare("SELECT active FROM users WHERE tg_id = ?1")?
            .query_row([tg_id], |row| row.get(0))
            .optional()?;
        Ok(active == Some(1))
    }

    pub fn create_user(
        &self,
        tg_id: i64,
        name: &str,
        username: Option<&str>,
        lang: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO users (tg_id, name, username, lang)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(tg_id)
             DO UPDATE SET name = excluded.name, username = excluded.username, active = 1",
            (tg_id, name, username, lang),
        )?;
        Ok(())
    }

    pub fn get_user_language(&self, tg_id: i64) -> Result<Option<String>> {
        let lang: Option<Option<String>> = self
            .conn
            .prepare("SELECT lang FROM users WHERE tg_id = ?1")?
            .query_row([tg_id], |row| row.get(0))
            .optional()?;
        Ok(lang.flatten())
    }

    pub fn update_user_language(&self, tg_id: i64, lang: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO users (tg_id, lang) VALUES (?1, ?2)
             ON CONFLICT(tg_id) DO UPDATE SET lang = excluded.lang",
            (tg_id, lang),
        )?;
        Ok(())
    }

    pub fn set_user_active(&self, tg_id: i64, active: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET active = ?1 WHERE tg_id = ?2",
            (active as i64, tg_id),
        )?;
        Ok(())
    }

    pub fn set_user_business_connection(
        &self,
        tg_id: i64,
        connection_id: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET business_connection_id = ?1 WHERE tg_id = ?2",
            (connection_id, tg_id),
        )?;
        Ok(())
    }

    // --- groups ---

    pub fn group_exists(&self, group_id: i64) -> Result<bool> {
        let row: Option<i64> = self
            .conn
            .prepare("SELECT 1 FROM groups WHERE group_id = ?1")?
            .query_row([group_id], |row| row.get(0))
            .optional()?;
        Ok(row.is_some())
    }

    pub fn create_group(
        &self,
        group_id: i64,
        name: &str,
        username: Option<&str>,
        added_by_id: i64,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO groups (group_id, name, username, added_by_id)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(group_id)
             DO UPDATE SET name = excluded.name, username = excluded.username,
                           added_by_id = excluded.added_by_id, active = 1",
            (group_id, name, username, added_by_id),
        )?;
        Ok(())
    }

    pub fn reactivate_group(&self, group_id: i64, added_by_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE groups SET added_by_id = ?1, active = 1 WHERE group_id = ?2",
            (added_by_id, group_id),
        )?;
        Ok(())
    }

    pub fn set_group_active(&self, group_id: i64, active: bool) -> Result<()> {
        self.conn.execute(
            "UPDATE groups SET active = ?1 WHERE group_id = ?2",
            (active as i64, group_id),
        )?;
        Ok(())
    }

    pub fn is_group_active(&self, group_id: i64) -> Result<bool> {
        let active: Option<i64> = self
            .conn
            .prepare("SELECT active FROM groups WHERE group_id = ?1")?
            .query_row([group_id], |row| row.get(0))
            .optional()?;
        Ok(active == Some(1))
    }

    // --- stats ---

    pub fn record_stat(&self, event: StatEvent, lang: Option<&str>) -> Result<()> {
        self.conn.execute(
            "INSERT INTO stats (event, lang) VALUES (?1, ?2)",
            (event.as_str(), lang),
        )?;
        Ok(())
    }

    pub fn count_stats(&self, event: StatEvent) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM stats WHERE event = ?1",
            [event.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
