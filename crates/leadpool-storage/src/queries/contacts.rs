// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact pool operations: import, atomic allocation, statistics, lookup.
//!
//! Functions that can name a category the store does not know about return
//! `Ok(None)` from the connection closure and turn that into
//! [`LeadpoolError::UnknownCategory`] outside it.

use leadpool_core::{
    Allocation, AllocationOutcome, Contact, ImportReport, LeadpoolError, NewContact, PoolStats,
    WorkerId,
};
use rusqlite::{OptionalExtension, TransactionBehavior, params};
use tracing::debug;

use crate::database::{Database, map_tr_err, now_timestamp};
use crate::queries::categories::category_ref;

fn unknown(category: &str) -> LeadpoolError {
    LeadpoolError::UnknownCategory(category.to_string())
}

fn stats_for(conn: &rusqlite::Connection, category_id: i64) -> rusqlite::Result<PoolStats> {
    conn.query_row(
        "SELECT
            COALESCE(SUM(CASE WHEN assigned_at IS NULL AND is_active = 1 THEN 1 ELSE 0 END), 0),
            COUNT(*)
         FROM contacts WHERE category_id = ?1",
        params![category_id],
        |row| {
            let free: i64 = row.get(0)?;
            let total: i64 = row.get(1)?;
            Ok(PoolStats {
                free: free.max(0) as u64,
                total: total.max(0) as u64,
            })
        },
    )
}

fn count_held(conn: &rusqlite::Connection, category_id: i64, worker: &str) -> rusqlite::Result<u32> {
    let held: i64 = conn.query_row(
        "SELECT COUNT(*) FROM contacts WHERE category_id = ?1 AND assigned_to = ?2",
        params![category_id, worker],
        |row| row.get(0),
    )?;
    Ok(u32::try_from(held).unwrap_or(u32::MAX))
}

fn extra_for(conn: &rusqlite::Connection, category_id: i64, worker: &str) -> rusqlite::Result<u32> {
    let extra: Option<u32> = conn
        .query_row(
            "SELECT extra FROM worker_quotas WHERE worker_id = ?1 AND category_id = ?2",
            params![worker, category_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(extra.unwrap_or(0))
}

/// Insert contacts into a category, skipping values it already holds.
///
/// Values compare case-insensitively within the category; re-importing the
/// same list is a no-op.
pub async fn import_contacts(
    db: &Database,
    category: &str,
    contacts: Vec<NewContact>,
) -> Result<ImportReport, LeadpoolError> {
    let slug = category.to_string();
    let report = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some((category_id, _)) = category_ref(&tx, &slug)? else {
                return Ok(None);
            };
            let mut inserted = 0usize;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO contacts (category_id, value, normalized_key)
                     VALUES (?1, ?2, ?3)",
                )?;
                for contact in &contacts {
                    inserted += stmt.execute(params![
                        category_id,
                        contact.value,
                        contact.normalized_key
                    ])?;
                }
            }
            tx.commit()?;
            Ok(Some(ImportReport {
                submitted: contacts.len(),
                inserted,
                skipped: contacts.len() - inserted,
            }))
        })
        .await
        .map_err(map_tr_err)?;
    report.ok_or_else(|| unknown(category))
}

/// Give the worker every contact they are still entitled to, atomically.
///
/// Runs in one `BEGIN IMMEDIATE` transaction: quota, held count, free count
/// and the assignment update all see the same snapshot, and no other writer
/// can interleave between the check and the write.
pub async fn allocate(
    db: &Database,
    category: &str,
    worker: &WorkerId,
) -> Result<Allocation, LeadpoolError> {
    let slug = category.to_string();
    let worker = worker.clone();
    let allocation = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some((category_id, base_quota)) = category_ref(&tx, &slug)? else {
                return Ok(None);
            };
            let total_allowed = base_quota.saturating_add(extra_for(&tx, category_id, worker.as_str())?);
            let already_issued = count_held(&tx, category_id, worker.as_str())?;

            let mut values = Vec::new();
            let outcome = if already_issued >= total_allowed {
                AllocationOutcome::AlreadyAtLimit
            } else {
                let can_give = total_allowed - already_issued;
                let free = stats_for(&tx, category_id)?.free;
                if free < u64::from(can_give) {
                    AllocationOutcome::InsufficientSupply
                } else {
                    let picked: Vec<(i64, String)> = {
                        let mut stmt = tx.prepare(
                            "SELECT id, value FROM contacts
                             WHERE category_id = ?1 AND assigned_at IS NULL AND is_active = 1
                             ORDER BY id ASC
                             LIMIT ?2",
                        )?;
                        let rows = stmt.query_map(params![category_id, can_give], |row| {
                            Ok((row.get(0)?, row.get(1)?))
                        })?;
                        rows.collect::<Result<Vec<_>, _>>()?
                    };
                    let now = now_timestamp();
                    let mut stmt = tx.prepare(
                        "UPDATE contacts SET assigned_to = ?1, assigned_at = ?2
                         WHERE id = ?3 AND assigned_at IS NULL",
                    )?;
                    for (id, value) in picked {
                        stmt.execute(params![worker.as_str(), now, id])?;
                        values.push(value);
                    }
                    AllocationOutcome::Ok
                }
            };

            let stats = stats_for(&tx, category_id)?;
            tx.commit()?;
            Ok(Some(Allocation {
                category: slug,
                worker_id: worker,
                outcome,
                values,
                total_allowed,
                already_issued,
                stats,
            }))
        })
        .await
        .map_err(map_tr_err)?;

    let allocation = allocation.ok_or_else(|| unknown(category))?;
    debug!(
        category,
        worker = %allocation.worker_id,
        outcome = %allocation.outcome,
        issued = allocation.values.len(),
        "allocation finished"
    );
    Ok(allocation)
}

/// Free and total contact counts of a category.
pub async fn pool_stats(db: &Database, category: &str) -> Result<PoolStats, LeadpoolError> {
    let slug = category.to_string();
    let stats = db
        .reader()
        .call(move |conn| {
            let Some((category_id, _)) = category_ref(conn, &slug)? else {
                return Ok(None);
            };
            Ok(Some(stats_for(conn, category_id)?))
        })
        .await
        .map_err(map_tr_err)?;
    stats.ok_or_else(|| unknown(category))
}

/// Category of a contact whose normalized key equals `normalized_key`.
///
/// With `assigned_to`, only contacts issued to that worker are considered.
/// Ties resolve by category display order, then import order.
pub async fn find_category_by_key(
    db: &Database,
    normalized_key: &str,
    assigned_to: Option<&WorkerId>,
) -> Result<Option<String>, LeadpoolError> {
    let key = normalized_key.to_string();
    let worker = assigned_to.map(|w| w.as_str().to_string());
    db.reader()
        .call(move |conn| {
            conn.query_row(
                "SELECT cat.slug
                 FROM contacts c
                 JOIN categories cat ON cat.id = c.category_id
                 WHERE c.normalized_key = ?1
                   AND (?2 IS NULL OR c.assigned_to = ?2)
                 ORDER BY cat.display_order ASC, c.id ASC
                 LIMIT 1",
                params![key, worker],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Every contact issued to the worker, by category display order then issue order.
pub async fn worker_contacts(db: &Database, worker: &WorkerId) -> Result<Vec<Contact>, LeadpoolError> {
    let worker = worker.as_str().to_string();
    db.reader()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT cat.slug, c.value, c.normalized_key, c.assigned_to, c.assigned_at, c.is_active
                 FROM contacts c
                 JOIN categories cat ON cat.id = c.category_id
                 WHERE c.assigned_to = ?1
                 ORDER BY cat.display_order ASC, c.assigned_at ASC, c.id ASC",
            )?;
            let rows = stmt.query_map(params![worker], |row| {
                Ok(Contact {
                    category: row.get(0)?,
                    value: row.get(1)?,
                    normalized_key: row.get(2)?,
                    assigned_to: row.get::<_, Option<String>>(3)?.map(WorkerId),
                    assigned_at: row.get(4)?,
                    is_active: row.get(5)?,
                })
            })?;
            let contacts = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(contacts)
        })
        .await
        .map_err(map_tr_err)
}

/// Return every contact of a category to the free pool. Rows are kept.
pub async fn reset_category(db: &Database, category: &str) -> Result<u64, LeadpoolError> {
    let slug = category.to_string();
    let reset = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some((category_id, _)) = category_ref(&tx, &slug)? else {
                return Ok(None);
            };
            let rows = tx.execute(
                "UPDATE contacts SET assigned_to = NULL, assigned_at = NULL
                 WHERE category_id = ?1 AND (assigned_at IS NOT NULL OR assigned_to IS NOT NULL)",
                params![category_id],
            )?;
            tx.commit()?;
            Ok(Some(rows as u64))
        })
        .await
        .map_err(map_tr_err)?;
    reset.ok_or_else(|| unknown(category))
}

/// Soft-enable or soft-disable one contact. Returns false if it does not exist.
pub async fn set_contact_active(
    db: &Database,
    category: &str,
    value: &str,
    active: bool,
) -> Result<bool, LeadpoolError> {
    let slug = category.to_string();
    let value = value.trim().to_string();
    let changed = db
        .connection()
        .call(move |conn| {
            let Some((category_id, _)) = category_ref(conn, &slug)? else {
                return Ok(None);
            };
            let rows = conn.execute(
                "UPDATE contacts SET is_active = ?1 WHERE category_id = ?2 AND value = ?3",
                params![active, category_id, value],
            )?;
            Ok(Some(rows > 0))
        })
        .await
        .map_err(map_tr_err)?;
    changed.ok_or_else(|| unknown(category))
}

/// Remove a worker's back-references and quota grants.
///
/// `assigned_at` is kept so the detached contacts stay out of the free pool.
pub async fn detach_worker(db: &Database, worker: &WorkerId) -> Result<u64, LeadpoolError> {
    let worker = worker.as_str().to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let rows = tx.execute(
                "UPDATE contacts SET assigned_to = NULL WHERE assigned_to = ?1",
                params![worker],
            )?;
            tx.execute("DELETE FROM worker_quotas WHERE worker_id = ?1", params![worker])?;
            tx.commit()?;
            Ok(rows as u64)
        })
        .await
        .map_err(map_tr_err)
}
