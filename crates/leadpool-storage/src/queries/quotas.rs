// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-worker extra quota on top of a category's base quota.

use leadpool_core::{LeadpoolError, WorkerId};
use rusqlite::{OptionalExtension, TransactionBehavior, params};

use crate::database::{Database, map_tr_err, now_timestamp};
use crate::queries::categories::category_ref;

/// Add `delta` to the worker's extra quota and return the new amount.
///
/// The sum saturates at `u32::MAX`.
pub async fn grant_extra_quota(
    db: &Database,
    worker: &WorkerId,
    category: &str,
    delta: u32,
) -> Result<u32, LeadpoolError> {
    let slug = category.to_string();
    let worker = worker.as_str().to_string();
    let extra = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some((category_id, _)) = category_ref(&tx, &slug)? else {
                return Ok(None);
            };
            tx.execute(
                "INSERT INTO worker_quotas (worker_id, category_id, extra, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(worker_id, category_id) DO UPDATE SET
                    extra = MIN(extra + excluded.extra, 4294967295),
                    updated_at = excluded.updated_at",
                params![worker, category_id, delta, now_timestamp()],
            )?;
            let extra: u32 = tx.query_row(
                "SELECT extra FROM worker_quotas WHERE worker_id = ?1 AND category_id = ?2",
                params![worker, category_id],
                |row| row.get(0),
            )?;
            tx.commit()?;
            Ok(Some(extra))
        })
        .await
        .map_err(map_tr_err)?;
    extra.ok_or_else(|| LeadpoolError::UnknownCategory(category.to_string()))
}

/// Current extra quota, 0 when none was granted.
pub async fn extra_quota(
    db: &Database,
    worker: &WorkerId,
    category: &str,
) -> Result<u32, LeadpoolError> {
    let slug = category.to_string();
    let worker = worker.as_str().to_string();
    let extra = db
        .reader()
        .call(move |conn| {
            let Some((category_id, _)) = category_ref(conn, &slug)? else {
                return Ok(None);
            };
            let extra: Option<u32> = conn
                .query_row(
                    "SELECT extra FROM worker_quotas WHERE worker_id = ?1 AND category_id = ?2",
                    params![worker, category_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(Some(extra.unwrap_or(0)))
        })
        .await
        .map_err(map_tr_err)?;
    extra.ok_or_else(|| LeadpoolError::UnknownCategory(category.to_string()))
}
