// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead rows and the global normalized-key duplicate index.

use leadpool_core::{
    ClaimResult, Lead, LeadConflict, LeadPayload, LeadStatus, LeadpoolError, WorkerId,
};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, TransactionBehavior, params};
use tracing::debug;

use crate::database::{Database, is_constraint_violation, map_tr_err, now_timestamp};

const LEAD_COLUMNS: &str = "id, worker_id, category, raw_contact, normalized_key, source, comment, status, created_at, updated_at";

fn parse_status(idx: usize, raw: String) -> rusqlite::Result<LeadStatus> {
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn lead_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Lead> {
    Ok(Lead {
        id: row.get(0)?,
        worker_id: WorkerId(row.get(1)?),
        category: row.get(2)?,
        raw_contact: row.get(3)?,
        normalized_key: row.get(4)?,
        source: row.get(5)?,
        comment: row.get(6)?,
        status: parse_status(7, row.get(7)?)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn select_lead(conn: &rusqlite::Connection, id: i64) -> rusqlite::Result<Option<Lead>> {
    conn.query_row(
        &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"),
        params![id],
        lead_from_row,
    )
    .optional()
}

fn select_conflict(
    conn: &rusqlite::Connection,
    key: &str,
    exclude: Option<i64>,
) -> rusqlite::Result<Option<LeadConflict>> {
    conn.query_row(
        "SELECT id, worker_id, category, status FROM leads
         WHERE normalized_key = ?1 AND (?2 IS NULL OR id <> ?2)",
        params![key, exclude],
        |row| {
            Ok(LeadConflict {
                lead_id: row.get(0)?,
                worker_id: WorkerId(row.get(1)?),
                category: row.get(2)?,
                status: parse_status(3, row.get(3)?)?,
            })
        },
    )
    .optional()
}

/// Outcome of the claim closure before it is mapped to the public result.
enum ClaimStep {
    Done(ClaimResult),
    Missing,
    NotInRework(LeadStatus),
}

/// Atomically claim `normalized_key` for `payload`.
///
/// The conflict check and the write share one `BEGIN IMMEDIATE` transaction.
/// A UNIQUE violation on the write (a racing writer on another connection)
/// is reported as a duplicate of whoever holds the key.
///
/// With `exclude_lead_id`, the excluded lead must belong to the payload's
/// worker and be in `rework`; it is rewritten in place and returns to
/// `pending`.
pub async fn try_claim_lead(
    db: &Database,
    normalized_key: &str,
    payload: &LeadPayload,
    exclude_lead_id: Option<i64>,
) -> Result<ClaimResult, LeadpoolError> {
    if normalized_key.is_empty() {
        return Err(LeadpoolError::InvalidContact(payload.raw_contact.clone()));
    }
    let key = normalized_key.to_string();
    let payload = payload.clone();
    let worker = payload.worker_id.clone();

    let step = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if let Some(conflict) = select_conflict(&tx, &key, exclude_lead_id)? {
                return Ok(ClaimStep::Done(ClaimResult::Duplicate(conflict)));
            }

            let now = now_timestamp();
            let written = match exclude_lead_id {
                Some(id) => {
                    match select_lead(&tx, id)? {
                        Some(lead) if lead.worker_id == payload.worker_id => {
                            if lead.status != LeadStatus::Rework {
                                return Ok(ClaimStep::NotInRework(lead.status));
                            }
                        }
                        _ => return Ok(ClaimStep::Missing),
                    }
                    tx.execute(
                        "UPDATE leads SET category = ?1, raw_contact = ?2, normalized_key = ?3,
                            source = ?4, comment = ?5, status = 'pending', updated_at = ?6
                         WHERE id = ?7",
                        params![
                            payload.category,
                            payload.raw_contact,
                            key,
                            payload.source,
                            payload.comment,
                            now,
                            id
                        ],
                    )
                    .map(|_| id)
                }
                None => tx
                    .execute(
                        "INSERT INTO leads (worker_id, category, raw_contact, normalized_key,
                            source, comment, status, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, ?7)",
                        params![
                            payload.worker_id.as_str(),
                            payload.category,
                            payload.raw_contact,
                            key,
                            payload.source,
                            payload.comment,
                            now
                        ],
                    )
                    .map(|_| tx.last_insert_rowid()),
            };

            match written {
                Ok(lead_id) => {
                    tx.commit()?;
                    Ok(ClaimStep::Done(ClaimResult::Accepted { lead_id }))
                }
                Err(e) if is_constraint_violation(&e) => {
                    match select_conflict(&tx, &key, exclude_lead_id)? {
                        Some(conflict) => Ok(ClaimStep::Done(ClaimResult::Duplicate(conflict))),
                        None => Err(e),
                    }
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;

    match step {
        ClaimStep::Done(result) => {
            debug!(
                worker = %worker,
                accepted = result.is_accepted(),
                "lead claim finished"
            );
            Ok(result)
        }
        ClaimStep::Missing => Err(LeadpoolError::LeadNotFound(exclude_lead_id.unwrap_or_default())),
        ClaimStep::NotInRework(status) => Err(LeadpoolError::InvalidTransition {
            from: status.to_string(),
            to: LeadStatus::Pending.to_string(),
        }),
    }
}

/// Moderator decision on a pending lead.
pub async fn set_lead_status(
    db: &Database,
    lead_id: i64,
    status: LeadStatus,
) -> Result<Lead, LeadpoolError> {
    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(lead) = select_lead(&tx, lead_id)? else {
                return Ok(Err(None));
            };
            if !lead.status.can_moderate_to(status) {
                return Ok(Err(Some(lead.status)));
            }
            tx.execute(
                "UPDATE leads SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.to_string(), now_timestamp(), lead_id],
            )?;
            let updated = select_lead(&tx, lead_id)?;
            tx.commit()?;
            Ok(updated.ok_or(None))
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        Ok(lead) => Ok(lead),
        Err(None) => Err(LeadpoolError::LeadNotFound(lead_id)),
        Err(Some(from)) => Err(LeadpoolError::InvalidTransition {
            from: from.to_string(),
            to: status.to_string(),
        }),
    }
}

pub async fn get_lead(db: &Database, lead_id: i64) -> Result<Option<Lead>, LeadpoolError> {
    db.reader()
        .call(move |conn| select_lead(conn, lead_id))
        .await
        .map_err(map_tr_err)
}

/// Delete the lead holding `normalized_key` and return it.
pub async fn release_lead(
    db: &Database,
    normalized_key: &str,
) -> Result<Option<Lead>, LeadpoolError> {
    let key = normalized_key.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let lead = tx
                .query_row(
                    &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE normalized_key = ?1"),
                    params![key],
                    lead_from_row,
                )
                .optional()?;
            if let Some(lead) = &lead {
                tx.execute("DELETE FROM leads WHERE id = ?1", params![lead.id])?;
            }
            tx.commit()?;
            Ok(lead)
        })
        .await
        .map_err(map_tr_err)
}
