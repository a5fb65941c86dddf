// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Invitation queries.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use staydesk_core::StaydeskError;
use staydesk_core::types::{Contact, Invitation, InvitationStatus};

use crate::codec::{col_enum, col_ts_required, ts};
use crate::database::{Database, map_tr_err};

fn from_row(row: &Row<'_>) -> rusqlite::Result<Invitation> {
    Ok(Invitation {
        id: row.get(0)?,
        property_id: row.get(1)?,
        contact: Contact {
            name: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
        },
        address_key: row.get(5)?,
        role: row.get(6)?,
        status: col_enum(row, 7)?,
        created_at: col_ts_required(row, 8)?,
        updated_at: col_ts_required(row, 9)?,
    })
}

pub async fn find_active(
    db: &Database,
    property_id: &str,
    address_key: &str,
) -> Result<Option<Invitation>, StaydeskError> {
    let property_id = property_id.to_string();
    let address_key = address_key.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, property_id, contact_name, contact_email, contact_phone,
                        address_key, role, status, created_at, updated_at
                 FROM invitations
                 WHERE property_id = ?1 AND address_key = ?2 AND status != 'failed'",
                params![property_id, address_key],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn insert_invitation(db: &Database, invitation: &Invitation) -> Result<(), StaydeskError> {
    let i = invitation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO invitations
                 (id, property_id, contact_name, contact_email, contact_phone, address_key,
                  role, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    i.id,
                    i.property_id,
                    i.contact.name,
                    i.contact.email,
                    i.contact.phone,
                    i.address_key,
                    i.role,
                    i.status.to_string(),
                    ts(i.created_at),
                    ts(i.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_status(
    db: &Database,
    id: &str,
    status: InvitationStatus,
    at: DateTime<Utc>,
) -> Result<(), StaydeskError> {
    let id = id.to_string();
    let status = status.to_string();
    let at = ts(at);
    let changed = db
        .connection()
        .call({
            let id = id.clone();
            move |conn| {
                conn.execute(
                    "UPDATE invitations SET status = ?2, updated_at = ?3 WHERE id = ?1",
                    params![id, status, at],
                )
            }
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(StaydeskError::not_found("invitation", id));
    }
    Ok(())
}
