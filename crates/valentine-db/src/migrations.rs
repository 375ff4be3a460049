use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (accounts, pages, sections, assets)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE pages (
                id              TEXT PRIMARY KEY,
                owner_id        TEXT NOT NULL UNIQUE REFERENCES users(id),
                settings        TEXT NOT NULL,
                is_published    INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE section_items (
                id          TEXT PRIMARY KEY,
                page_id     TEXT NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
                kind        TEXT NOT NULL,
                content     TEXT NOT NULL,
                media_url   TEXT,
                order_index INTEGER NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_section_items_page
                ON section_items(page_id, kind, order_index);

            CREATE TABLE assets (
                id              TEXT PRIMARY KEY,
                page_id         TEXT NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
                file_name       TEXT NOT NULL UNIQUE,
                url             TEXT NOT NULL,
                content_type    TEXT NOT NULL,
                size            INTEGER NOT NULL,
                sha256          TEXT NOT NULL,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_assets_url ON assets(url);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }
}
