// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Category rows: sync from configuration, listing, and id lookup.

use leadpool_core::{Category, LeadpoolError};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

/// Row id and base quota of a category, looked up inside an open transaction.
pub(crate) fn category_ref(
    conn: &rusqlite::Connection,
    slug: &str,
) -> rusqlite::Result<Option<(i64, u32)>> {
    conn.query_row(
        "SELECT id, base_quota FROM categories WHERE slug = ?1",
        params![slug],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
}

fn category_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        slug: row.get(0)?,
        name: row.get(1)?,
        base_quota: row.get(2)?,
        display_order: row.get(3)?,
    })
}

/// Insert new categories and update name, quota, and order of existing ones.
pub async fn sync_categories(db: &Database, categories: &[Category]) -> Result<(), LeadpoolError> {
    let categories = categories.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO categories (slug, name, base_quota, display_order)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(slug) DO UPDATE SET
                        name = excluded.name,
                        base_quota = excluded.base_quota,
                        display_order = excluded.display_order,
                        updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                )?;
                for category in &categories {
                    stmt.execute(params![
                        category.slug,
                        category.name,
                        category.base_quota,
                        category.display_order
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// All categories ordered by display order, then slug.
pub async fn list_categories(db: &Database) -> Result<Vec<Category>, LeadpoolError> {
    db.reader()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT slug, name, base_quota, display_order
                 FROM categories
                 ORDER BY display_order ASC, slug ASC",
            )?;
            let rows = stmt.query_map([], category_from_row)?;
            let categories = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(categories)
        })
        .await
        .map_err(map_tr_err)
}

/// Look up one category by slug.
pub async fn get_category(db: &Database, slug: &str) -> Result<Option<Category>, LeadpoolError> {
    let slug = slug.to_string();
    db.reader()
        .call(move |conn| {
            conn.query_row(
                "SELECT slug, name, base_quota, display_order FROM categories WHERE slug = ?1",
                params![slug],
                category_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(slug: &str, quota: u32, order: u32) -> Category {
        Category {
            slug: slug.to_string(),
            name: slug.to_uppercase(),
            base_quota: quota,
            display_order: order,
        }
    }

    #[tokio::test]
    async fn sync_inserts_then_updates_without_deleting() {
        let db = Database::open_in_memory().await.unwrap();
        sync_categories(&db, &[category("vk", 250, 1), category("telegram", 50, 0)])
            .await
            .unwrap();
        sync_categories(&db, &[category("vk", 10, 1)]).await.unwrap();

        let all = list_categories(&db).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].slug, "telegram");
        assert_eq!(all[1].base_quota, 10);
    }

    #[tokio::test]
    async fn get_unknown_category_is_none() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(get_category(&db, "nope").await.unwrap().is_none());
    }
}
