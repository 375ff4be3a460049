use anyhow::Result;
use rusqlite::Row;

use crate::models::AssetRow;
use crate::{Database, OptionalExt};

const ASSET_COLUMNS: &str = "id, page_id, file_name, url, content_type, size, sha256, created_at";

pub struct NewAsset<'a> {
    pub id: &'a str,
    pub page_id: &'a str,
    pub file_name: &'a str,
    pub url: &'a str,
    pub content_type: &'a str,
    pub size: i64,
    pub sha256: &'a str,
}

impl Database {
    pub fn insert_asset(&self, asset: &NewAsset<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO assets (id, page_id, file_name, url, content_type, size, sha256)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    asset.id,
                    asset.page_id,
                    asset.file_name,
                    asset.url,
                    asset.content_type,
                    asset.size,
                    asset.sha256,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_asset_by_url(&self, page_id: &str, url: &str) -> Result<Option<AssetRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM assets WHERE page_id = ?1 AND url = ?2", ASSET_COLUMNS);
            conn.query_row(&sql, (page_id, url), asset_from_row).optional()
        })
    }

    pub fn delete_asset(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM assets WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    /// True when any section item or the page settings still point at `url`.
    pub fn is_asset_referenced(&self, page_id: &str, url: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let referenced: bool = conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM section_items WHERE page_id = ?1 AND media_url = ?2)
                     OR EXISTS (SELECT 1 FROM pages WHERE id = ?1 AND instr(settings, ?2) > 0)",
                (page_id, url),
                |r| r.get(0),
            )?;
            Ok(referenced)
        })
    }

    /// Assets older than `grace_hours` that nothing references anymore.
    pub fn find_orphaned_assets(&self, grace_hours: u64) -> Result<Vec<AssetRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM assets a
                 WHERE a.created_at < datetime('now', '-' || ?1 || ' hours')
                   AND NOT EXISTS (SELECT 1 FROM section_items s
                                   WHERE s.page_id = a.page_id AND s.media_url = a.url)
                   AND NOT EXISTS (SELECT 1 FROM pages p
                                   WHERE p.id = a.page_id AND instr(p.settings, a.url) > 0)",
                ASSET_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([grace_hours as i64], asset_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn asset_from_row(row: &Row<'_>) -> rusqlite::Result<AssetRow> {
    Ok(AssetRow {
        id: row.get(0)?,
        page_id: row.get(1)?,
        file_name: row.get(2)?,
        url: row.get(3)?,
        content_type: row.get(4)?,
        size: row.get(5)?,
        sha256: row.get(6)?,
        created_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::tests::seed_account;
    use uuid::Uuid;
    use valentine_types::models::{MediaType, PageSettings, SectionContent};

    fn store(db: &Database, page_id: &str, file_name: &str) -> (String, String) {
        let id = Uuid::new_v4().to_string();
        let url = format!("/media/{}", file_name);
        db.insert_asset(&NewAsset {
            id: &id,
            page_id,
            file_name,
            url: &url,
            content_type: "image/jpeg",
            size: 3,
            sha256: "abc",
        })
        .unwrap();
        (id, url)
    }

    fn backdate_assets(db: &Database) {
        db.with_conn_mut(|conn| {
            conn.execute("UPDATE assets SET created_at = datetime('now', '-48 hours')", [])?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn references_from_items_and_settings_count() {
        let db = Database::open_in_memory().unwrap();
        let (_, page_id) = seed_account(&db, "kim");

        let (_, photo_url) = store(&db, &page_id, "photo.jpg");
        let (_, song_url) = store(&db, &page_id, "song.mp3");
        let (_, stray_url) = store(&db, &page_id, "stray.png");

        db.insert_section(
            &Uuid::new_v4().to_string(),
            &page_id,
            &SectionContent::Gallery {
                media_url: photo_url.clone(),
                caption: None,
                media_type: MediaType::Image,
            },
        )
        .unwrap();
        let settings = PageSettings {
            music_url: Some(song_url.clone()),
            ..Default::default()
        };
        db.update_page_settings(&page_id, &settings).unwrap();

        assert!(db.is_asset_referenced(&page_id, &photo_url).unwrap());
        assert!(db.is_asset_referenced(&page_id, &song_url).unwrap());
        assert!(!db.is_asset_referenced(&page_id, &stray_url).unwrap());

        // Nothing is old enough yet.
        assert!(db.find_orphaned_assets(24).unwrap().is_empty());

        backdate_assets(&db);
        let orphans = db.find_orphaned_assets(24).unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].url, stray_url);
    }

    #[test]
    fn lookup_and_delete_by_url() {
        let db = Database::open_in_memory().unwrap();
        let (_, page_id) = seed_account(&db, "kim");
        let (_, other_page) = seed_account(&db, "lee");
        let (id, url) = store(&db, &page_id, "photo.jpg");

        assert!(db.get_asset_by_url(&other_page, &url).unwrap().is_none());
        let asset = db.get_asset_by_url(&page_id, &url).unwrap().unwrap();
        assert_eq!(asset.id, id);
        assert_eq!(asset.file_name, "photo.jpg");

        assert!(db.delete_asset(&id).unwrap());
        assert!(!db.delete_asset(&id).unwrap());
    }
}
