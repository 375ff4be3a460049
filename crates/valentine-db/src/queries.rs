use crate::models::{PageRow, UserRow};
use crate::{Database, OptionalExt};
use anyhow::Result;
use rusqlite::{Connection, Row};

use valentine_types::models::PageSettings;

const PAGE_COLUMNS: &str = "p.id, p.owner_id, u.username, p.settings, p.is_published, p.created_at, p.updated_at";

impl Database {
    // -- Accounts --

    /// Creates the user and its page together; neither exists without the other.
    pub fn create_account(
        &self,
        user_id: &str,
        username: &str,
        password_hash: &str,
        page_id: &str,
        settings: &PageSettings,
    ) -> Result<()> {
        let settings_json = serde_json::to_string(settings)?;
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO users (id, username, password) VALUES (?1, ?2, ?3)",
                (user_id, username, password_hash),
            )?;
            tx.execute(
                "INSERT INTO pages (id, owner_id, settings) VALUES (?1, ?2, ?3)",
                (page_id, user_id, &settings_json),
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    // -- Pages --

    pub fn get_page_by_owner(&self, owner_id: &str) -> Result<Option<PageRow>> {
        self.with_conn(|conn| query_page(conn, "p.owner_id", owner_id))
    }

    pub fn get_page_by_username(&self, username: &str) -> Result<Option<PageRow>> {
        self.with_conn(|conn| query_page(conn, "u.username", username))
    }

    pub fn get_page(&self, page_id: &str) -> Result<Option<PageRow>> {
        self.with_conn(|conn| query_page(conn, "p.id", page_id))
    }

    /// Returns false when the page does not exist.
    pub fn update_page_settings(&self, page_id: &str, settings: &PageSettings) -> Result<bool> {
        let settings_json = serde_json::to_string(settings)?;
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE pages SET settings = ?1, updated_at = datetime('now') WHERE id = ?2",
                (&settings_json, page_id),
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_published(&self, page_id: &str, published: bool) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE pages SET is_published = ?1, updated_at = datetime('now') WHERE id = ?2",
                rusqlite::params![published, page_id],
            )?;
            Ok(changed > 0)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT id, username, password, created_at FROM users WHERE {} = ?1", column);
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_page(conn: &Connection, column: &str, value: &str) -> Result<Option<PageRow>> {
    let sql = format!(
        "SELECT {} FROM pages p JOIN users u ON p.owner_id = u.id WHERE {} = ?1",
        PAGE_COLUMNS, column
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], page_from_row).optional()?;
    Ok(row)
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRow> {
    Ok(PageRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        username: row.get(2)?,
        settings: row.get(3)?,
        is_published: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
