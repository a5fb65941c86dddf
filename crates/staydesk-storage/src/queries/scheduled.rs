// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduled message queries and the per-record claim.
//!
//! A claim is a `(claim_token, claim_expires_at)` pair written by a
//! conditional UPDATE. Every state transition re-checks the token, so a
//! holder whose lease expired and was taken over cannot overwrite the new
//! holder's outcome.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, Transaction, params};
use staydesk_core::StaydeskError;
use staydesk_core::types::{Claim, ClaimOutcome, MessageState, ScheduledMessage, UpsertOutcome};

use crate::codec::{col_enum, col_ts, col_ts_required, opt_ts, ts};
use crate::database::{Database, map_tr_err};

const COLUMNS: &str = "id, template_id, guest_id, reservation_id, contract_id, fire_at, state, \
     created_at, resolved_at, last_error, retryable";

fn from_row(row: &Row<'_>) -> rusqlite::Result<ScheduledMessage> {
    Ok(ScheduledMessage {
        id: row.get(0)?,
        template_id: row.get(1)?,
        guest_id: row.get(2)?,
        reservation_id: row.get(3)?,
        contract_id: row.get(4)?,
        fire_at: col_ts(row, 5)?,
        state: col_enum(row, 6)?,
        created_at: col_ts_required(row, 7)?,
        resolved_at: col_ts(row, 8)?,
        last_error: row.get(9)?,
        retryable: row.get(10)?,
    })
}

fn select_by_id(tx: &Transaction<'_>, id: &str) -> rusqlite::Result<ScheduledMessage> {
    tx.query_row(
        &format!("SELECT {COLUMNS} FROM scheduled_messages WHERE id = ?1"),
        params![id],
        from_row,
    )
}

fn insert_row(
    conn: &rusqlite::Connection,
    m: &ScheduledMessage,
    dedupe_key: Option<&str>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO scheduled_messages
         (id, template_id, guest_id, reservation_id, contract_id, fire_at, state, dedupe_key,
          created_at, resolved_at, last_error, retryable)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            m.id,
            m.template_id,
            m.guest_id,
            m.reservation_id,
            m.contract_id,
            opt_ts(m.fire_at),
            m.state.to_string(),
            dedupe_key,
            ts(m.created_at),
            opt_ts(m.resolved_at),
            m.last_error,
            m.retryable,
        ],
    )?;
    Ok(())
}

/// Insert, or move the fire time of the `scheduled` record with the same
/// dedupe key. `message.created_at` is the reference time for lease expiry.
pub async fn upsert_scheduled(
    db: &Database,
    message: &ScheduledMessage,
) -> Result<UpsertOutcome, StaydeskError> {
    let message = message.clone();
    let key = message.dedupe_key();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let now = ts(message.created_at);

            let existing: Option<(String, Option<String>, Option<String>)> = tx
                .query_row(
                    "SELECT id, claim_token, claim_expires_at FROM scheduled_messages
                     WHERE dedupe_key = ?1 AND state = 'scheduled'",
                    params![key],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;

            let outcome = match existing {
                Some((id, Some(_), Some(expires))) if expires > now => UpsertOutcome::InFlight { id },
                Some((id, _, _)) => {
                    tx.execute(
                        "UPDATE scheduled_messages SET fire_at = ?2 WHERE id = ?1",
                        params![id, opt_ts(message.fire_at)],
                    )?;
                    UpsertOutcome::Superseded(select_by_id(&tx, &id)?)
                }
                None => {
                    insert_row(&tx, &message, Some(&key))?;
                    UpsertOutcome::Inserted(message)
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn insert_message(db: &Database, message: &ScheduledMessage) -> Result<(), StaydeskError> {
    let message = message.clone();
    db.connection()
        .call(move |conn| insert_row(conn, &message, None))
        .await
        .map_err(map_tr_err)
}

pub async fn get_message(db: &Database, id: &str) -> Result<Option<ScheduledMessage>, StaydeskError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM scheduled_messages WHERE id = ?1"),
                params![id],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn pending_for_key(
    db: &Database,
    dedupe_key: &str,
) -> Result<Option<ScheduledMessage>, StaydeskError> {
    let key = dedupe_key.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {COLUMNS} FROM scheduled_messages
                     WHERE dedupe_key = ?1 AND state = 'scheduled'"
                ),
                params![key],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_scheduled(db: &Database) -> Result<Vec<ScheduledMessage>, StaydeskError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM scheduled_messages
                 WHERE state = 'scheduled'
                 ORDER BY fire_at IS NULL, fire_at, created_at, id"
            ))?;
            let rows = stmt
                .query_map([], from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn due_messages(
    db: &Database,
    now: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<ScheduledMessage>, StaydeskError> {
    let now = ts(now);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM scheduled_messages
                 WHERE state = 'scheduled'
                   AND fire_at IS NOT NULL AND fire_at <= ?1
                   AND (claim_token IS NULL OR claim_expires_at <= ?1)
                 ORDER BY fire_at, created_at
                 LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(params![now, limit], from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn claim(
    db: &Database,
    id: &str,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<ClaimOutcome, StaydeskError> {
    let id = id.to_string();
    let token = uuid::Uuid::new_v4().to_string();
    let now_s = ts(now);
    let expires_s = ts(expires_at);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let taken = tx.execute(
                "UPDATE scheduled_messages SET claim_token = ?2, claim_expires_at = ?3
                 WHERE id = ?1 AND state = 'scheduled'
                   AND (claim_token IS NULL OR claim_expires_at <= ?4)",
                params![id, token, expires_s, now_s],
            )?;

            let outcome = if taken == 1 {
                ClaimOutcome::Claimed(Claim {
                    message: select_by_id(&tx, &id)?,
                    token,
                    expires_at,
                })
            } else {
                let state: Option<MessageState> = tx
                    .query_row(
                        "SELECT state FROM scheduled_messages WHERE id = ?1",
                        params![id],
                        |row| col_enum(row, 0),
                    )
                    .optional()?;
                match state {
                    None => ClaimOutcome::Missing,
                    Some(MessageState::Scheduled) => ClaimOutcome::Busy,
                    Some(resolved) => ClaimOutcome::Resolved(resolved),
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn complete(
    db: &Database,
    claim: &Claim,
    state: MessageState,
    at: DateTime<Utc>,
    last_error: Option<&str>,
    retryable: bool,
) -> Result<bool, StaydeskError> {
    let id = claim.message.id.clone();
    let token = claim.token.clone();
    let state = state.to_string();
    let at = ts(at);
    let last_error = last_error.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE scheduled_messages
                 SET state = ?3, resolved_at = ?4, last_error = ?5, retryable = ?6,
                     claim_token = NULL, claim_expires_at = NULL
                 WHERE id = ?1 AND claim_token = ?2 AND state = 'scheduled'",
                params![id, token, state, at, last_error, retryable],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn release(db: &Database, claim: &Claim) -> Result<(), StaydeskError> {
    let id = claim.message.id.clone();
    let token = claim.token.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE scheduled_messages SET claim_token = NULL, claim_expires_at = NULL
                 WHERE id = ?1 AND claim_token = ?2",
                params![id, token],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn messages_for_contract(
    db: &Database,
    contract_id: &str,
) -> Result<Vec<ScheduledMessage>, StaydeskError> {
    let contract_id = contract_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM scheduled_messages WHERE contract_id = ?1
                 ORDER BY created_at, id"
            ))?;
            let rows = stmt
                .query_map(params![contract_id], from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}
