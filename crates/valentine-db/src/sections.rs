use std::collections::HashSet;

use anyhow::Result;
use rusqlite::Row;

use valentine_types::models::{SectionContent, SectionKind};

use crate::models::SectionItemRow;
use crate::{Database, OptionalExt};

const ITEM_COLUMNS: &str = "id, page_id, kind, content, media_url, order_index, created_at";

impl Database {
    /// Items of one page in display order. `kind = None` lists every collection.
    pub fn list_sections(&self, page_id: &str, kind: Option<SectionKind>) -> Result<Vec<SectionItemRow>> {
        self.with_conn(|conn| {
            let rows = match kind {
                Some(kind) => {
                    let sql = format!(
                        "SELECT {} FROM section_items WHERE page_id = ?1 AND kind = ?2
                         ORDER BY order_index, created_at",
                        ITEM_COLUMNS
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt
                        .query_map((page_id, kind.as_str()), item_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
                None => {
                    let sql = format!(
                        "SELECT {} FROM section_items WHERE page_id = ?1
                         ORDER BY kind, order_index, created_at",
                        ITEM_COLUMNS
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt
                        .query_map([page_id], item_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
            };
            Ok(rows)
        })
    }

    pub fn get_section(&self, page_id: &str, id: &str) -> Result<Option<SectionItemRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM section_items WHERE page_id = ?1 AND id = ?2", ITEM_COLUMNS);
            conn.query_row(&sql, (page_id, id), item_from_row).optional()
        })
    }

    /// Appends an item after the current last one of its collection and
    /// returns the stored row.
    ///
    /// The new index is `MAX(order_index) + 1`, which equals the item count
    /// as long as nothing was deleted. Deletions leave gaps; they are never
    /// compacted here.
    pub fn insert_section(&self, id: &str, page_id: &str, content: &SectionContent) -> Result<SectionItemRow> {
        let content_json = serde_json::to_string(content)?;
        let kind = content.kind();
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let next_index: i64 = tx.query_row(
                "SELECT COALESCE(MAX(order_index) + 1, 0) FROM section_items
                 WHERE page_id = ?1 AND kind = ?2",
                (page_id, kind.as_str()),
                |r| r.get(0),
            )?;
            tx.execute(
                "INSERT INTO section_items (id, page_id, kind, content, media_url, order_index)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, page_id, kind.as_str(), content_json, content.media_url(), next_index],
            )?;
            let sql = format!("SELECT {} FROM section_items WHERE id = ?1", ITEM_COLUMNS);
            let row = tx.query_row(&sql, [id], item_from_row)?;
            tx.commit()?;
            Ok(row)
        })
    }

    /// Replaces the content of an item, keeping its position. Returns the
    /// previous row, or `None` when the item does not belong to the page.
    pub fn update_section(
        &self,
        page_id: &str,
        id: &str,
        content: &SectionContent,
    ) -> Result<Option<SectionItemRow>> {
        let content_json = serde_json::to_string(content)?;
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let sql = format!("SELECT {} FROM section_items WHERE page_id = ?1 AND id = ?2", ITEM_COLUMNS);
            let Some(previous) = tx.query_row(&sql, (page_id, id), item_from_row).optional()? else {
                return Ok(None);
            };
            tx.execute(
                "UPDATE section_items SET content = ?1, media_url = ?2 WHERE id = ?3",
                rusqlite::params![content_json, content.media_url(), id],
            )?;
            tx.commit()?;
            Ok(Some(previous))
        })
    }

    /// Deletes an item and returns it so the caller can release its asset.
    /// Remaining items keep their indices.
    pub fn delete_section(&self, page_id: &str, id: &str) -> Result<Option<SectionItemRow>> {
        self.with_conn_mut(|conn| {
            let sql = format!("SELECT {} FROM section_items WHERE page_id = ?1 AND id = ?2", ITEM_COLUMNS);
            let Some(row) = conn.query_row(&sql, (page_id, id), item_from_row).optional()? else {
                return Ok(None);
            };
            conn.execute("DELETE FROM section_items WHERE id = ?1", [id])?;
            Ok(Some(row))
        })
    }

    /// Rewrites a collection's indices to `0..n` following `ids`.
    ///
    /// `ids` must name every item of the collection exactly once; otherwise
    /// nothing is changed and `false` is returned.
    pub fn reorder_sections(&self, page_id: &str, kind: SectionKind, ids: &[String]) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let existing: HashSet<String> = {
                let mut stmt = tx.prepare("SELECT id FROM section_items WHERE page_id = ?1 AND kind = ?2")?;
                let ids = stmt
                    .query_map((page_id, kind.as_str()), |r| r.get::<_, String>(0))?
                    .collect::<std::result::Result<_, _>>()?;
                ids
            };
            let requested: HashSet<&String> = ids.iter().collect();
            if requested.len() != ids.len()
                || existing.len() != ids.len()
                || !ids.iter().all(|id| existing.contains(id))
            {
                return Ok(false);
            }

            for (index, id) in ids.iter().enumerate() {
                tx.execute(
                    "UPDATE section_items SET order_index = ?1 WHERE id = ?2",
                    rusqlite::params![index as i64, id],
                )?;
            }
            tx.commit()?;
            Ok(true)
        })
    }
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<SectionItemRow> {
    Ok(SectionItemRow {
        id: row.get(0)?,
        page_id: row.get(1)?,
        kind: row.get(2)?,
        content: row.get(3)?,
        media_url: row.get(4)?,
        order_index: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::tests::seed_account;
    use uuid::Uuid;

    fn reason(text: &str) -> SectionContent {
        SectionContent::Reason { text: text.into() }
    }

    fn add(db: &Database, page_id: &str, content: SectionContent) -> SectionItemRow {
        db.insert_section(&Uuid::new_v4().to_string(), page_id, &content).unwrap()
    }

    fn indices(db: &Database, page_id: &str, kind: SectionKind) -> Vec<i64> {
        db.list_sections(page_id, Some(kind))
            .unwrap()
            .iter()
            .map(|r| r.order_index)
            .collect()
    }

    #[test]
    fn appends_with_current_count_as_index() {
        let db = Database::open_in_memory().unwrap();
        let (_, page_id) = seed_account(&db, "sam");

        for (count, text) in ["smile", "kindness", "laugh"].into_iter().enumerate() {
            let row = add(&db, &page_id, reason(text));
            assert_eq!(row.order_index, count as i64);
        }
        // Collections are numbered independently.
        let poem = add(
            &db,
            &page_id,
            SectionContent::Poem {
                title: "Ode".into(),
                content: "...".into(),
            },
        );
        assert_eq!(poem.order_index, 0);
        assert_eq!(indices(&db, &page_id, SectionKind::Reason), vec![0, 1, 2]);
    }

    #[test]
    fn delete_leaves_gap_and_next_append_does_not_collide() {
        let db = Database::open_in_memory().unwrap();
        let (_, page_id) = seed_account(&db, "sam");

        let first = add(&db, &page_id, reason("a"));
        add(&db, &page_id, reason("b"));
        add(&db, &page_id, reason("c"));

        let deleted = db.delete_section(&page_id, &first.id).unwrap().unwrap();
        assert_eq!(deleted.id, first.id);
        assert_eq!(indices(&db, &page_id, SectionKind::Reason), vec![1, 2]);

        let appended = add(&db, &page_id, reason("d"));
        assert_eq!(appended.order_index, 3);
        assert!(db.delete_section(&page_id, &first.id).unwrap().is_none());
    }

    #[test]
    fn update_keeps_position_and_tracks_media_url() {
        let db = Database::open_in_memory().unwrap();
        let (_, page_id) = seed_account(&db, "sam");

        add(&db, &page_id, SectionContent::Timeline {
            title: "First date".into(),
            description: None,
            event_date: None,
            media_url: None,
        });
        let second = add(&db, &page_id, SectionContent::Timeline {
            title: "Trip".into(),
            description: None,
            event_date: None,
            media_url: Some("/media/a.jpg".into()),
        });

        let previous = db
            .update_section(&page_id, &second.id, &SectionContent::Timeline {
                title: "Road trip".into(),
                description: Some("Coast".into()),
                event_date: None,
                media_url: Some("/media/b.jpg".into()),
            })
            .unwrap()
            .unwrap();
        assert_eq!(previous.media_url.as_deref(), Some("/media/a.jpg"));

        let stored = db.get_section(&page_id, &second.id).unwrap().unwrap();
        assert_eq!(stored.order_index, 1);
        assert_eq!(stored.media_url.as_deref(), Some("/media/b.jpg"));
        let item = stored.into_item().unwrap();
        assert!(matches!(item.content, SectionContent::Timeline { ref title, .. } if title == "Road trip"));
    }

    #[test]
    fn items_are_scoped_to_their_page() {
        let db = Database::open_in_memory().unwrap();
        let (_, page_a) = seed_account(&db, "ann");
        let (_, page_b) = seed_account(&db, "bob");

        let item = add(&db, &page_a, reason("mine"));
        assert!(db.get_section(&page_b, &item.id).unwrap().is_none());
        assert!(db.delete_section(&page_b, &item.id).unwrap().is_none());
        assert!(db.update_section(&page_b, &item.id, &reason("stolen")).unwrap().is_none());
        assert!(db.list_sections(&page_b, None).unwrap().is_empty());
    }

    #[test]
    fn reorder_rewrites_indices_densely() {
        let db = Database::open_in_memory().unwrap();
        let (_, page_id) = seed_account(&db, "sam");

        let a = add(&db, &page_id, reason("a"));
        let b = add(&db, &page_id, reason("b"));
        let c = add(&db, &page_id, reason("c"));
        db.delete_section(&page_id, &b.id).unwrap();

        let order = vec![c.id.clone(), a.id.clone()];
        assert!(db.reorder_sections(&page_id, SectionKind::Reason, &order).unwrap());

        let listed: Vec<(String, i64)> = db
            .list_sections(&page_id, Some(SectionKind::Reason))
            .unwrap()
            .into_iter()
            .map(|r| (r.id, r.order_index))
            .collect();
        assert_eq!(listed, vec![(c.id.clone(), 0), (a.id.clone(), 1)]);
    }

    #[test]
    fn reorder_rejects_incomplete_or_duplicate_lists() {
        let db = Database::open_in_memory().unwrap();
        let (_, page_id) = seed_account(&db, "sam");

        let a = add(&db, &page_id, reason("a"));
        add(&db, &page_id, reason("b"));

        assert!(!db.reorder_sections(&page_id, SectionKind::Reason, &[a.id.clone()]).unwrap());
        assert!(
            !db.reorder_sections(&page_id, SectionKind::Reason, &[a.id.clone(), a.id.clone()])
                .unwrap()
        );
        assert!(
            !db.reorder_sections(&page_id, SectionKind::Reason, &[a.id.clone(), "x".into()])
                .unwrap()
        );
        assert_eq!(indices(&db, &page_id, SectionKind::Reason), vec![0, 1]);
    }
}
