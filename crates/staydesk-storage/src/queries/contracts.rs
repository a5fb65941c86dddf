// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contract queries. Status changes are compare-and-set on the stored status.

use rusqlite::{OptionalExtension, Row, params};
use staydesk_core::StaydeskError;
use staydesk_core::types::{Contract, ContractStatus, DocumentHandle};

use crate::codec::{col_enum, col_ts, col_ts_required, opt_ts, ts};
use crate::database::{Database, map_tr_err};

fn from_row(row: &Row<'_>) -> rusqlite::Result<Contract> {
    Ok(Contract {
        id: row.get(0)?,
        guest_id: row.get(1)?,
        reservation_id: row.get(2)?,
        status: col_enum(row, 3)?,
        created_at: col_ts_required(row, 4)?,
        draft_document: row.get::<_, Option<String>>(5)?.map(DocumentHandle),
        signed_at: col_ts(row, 6)?,
        signature: row.get::<_, Option<String>>(7)?.map(DocumentHandle),
        signed_document: row.get::<_, Option<String>>(8)?.map(DocumentHandle),
    })
}

pub async fn insert_contract(db: &Database, contract: &Contract) -> Result<(), StaydeskError> {
    let c = contract.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO contracts
                 (id, guest_id, reservation_id, status, created_at, draft_document, signed_at,
                  signature, signed_document)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    c.id,
                    c.guest_id,
                    c.reservation_id,
                    c.status.to_string(),
                    ts(c.created_at),
                    c.draft_document.as_ref().map(|h| h.0.as_str()),
                    opt_ts(c.signed_at),
                    c.signature.as_ref().map(|h| h.0.as_str()),
                    c.signed_document.as_ref().map(|h| h.0.as_str()),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_contract(db: &Database, id: &str) -> Result<Option<Contract>, StaydeskError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, guest_id, reservation_id, status, created_at, draft_document,
                        signed_at, signature, signed_document
                 FROM contracts WHERE id = ?1",
                params![id],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite the mutable columns iff the stored status equals `expected`.
pub async fn compare_and_set(
    db: &Database,
    contract: &Contract,
    expected: ContractStatus,
) -> Result<bool, StaydeskError> {
    let c = contract.clone();
    let expected = expected.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE contracts
                 SET status = ?2, draft_document = ?3, signed_at = ?4, signature = ?5,
                     signed_document = ?6
                 WHERE id = ?1 AND status = ?7",
                params![
                    c.id,
                    c.status.to_string(),
                    c.draft_document.as_ref().map(|h| h.0.as_str()),
                    opt_ts(c.signed_at),
                    c.signature.as_ref().map(|h| h.0.as_str()),
                    c.signed_document.as_ref().map(|h| h.0.as_str()),
                    expected,
                ],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}
