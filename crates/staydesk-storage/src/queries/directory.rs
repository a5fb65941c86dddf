// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Guest, reservation, and property read models.
//!
//! These rows are fed by domain events and overwritten wholesale on every
//! update, so each write is an upsert.

use rusqlite::{OptionalExtension, Row, params};
use staydesk_core::StaydeskError;
use staydesk_core::types::{Guest, Property, Reservation};

use crate::codec::{col_ts, opt_ts};
use crate::database::{Database, map_tr_err};

fn guest_from_row(row: &Row<'_>) -> rusqlite::Result<Guest> {
    Ok(Guest {
        id: row.get(0)?,
        full_name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        verification_token: row.get(4)?,
        token_issued_at: col_ts(row, 5)?,
        verified_at: col_ts(row, 6)?,
    })
}

fn reservation_from_row(row: &Row<'_>) -> rusqlite::Result<Reservation> {
    Ok(Reservation {
        id: row.get(0)?,
        guest_id: row.get(1)?,
        property_id: row.get(2)?,
        check_in: col_ts(row, 3)?,
        check_out: col_ts(row, 4)?,
    })
}

fn property_from_row(row: &Row<'_>) -> rusqlite::Result<Property> {
    Ok(Property {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        owner_name: row.get(3)?,
        owner_phone: row.get(4)?,
    })
}

pub async fn upsert_guest(db: &Database, guest: &Guest) -> Result<(), StaydeskError> {
    let g = guest.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO guests
                 (id, full_name, email, phone, verification_token, token_issued_at, verified_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    full_name = excluded.full_name,
                    email = excluded.email,
                    phone = excluded.phone,
                    verification_token = excluded.verification_token,
                    token_issued_at = excluded.token_issued_at,
                    verified_at = excluded.verified_at",
                params![
                    g.id,
                    g.full_name,
                    g.email,
                    g.phone,
                    g.verification_token,
                    opt_ts(g.token_issued_at),
                    opt_ts(g.verified_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn upsert_reservation(
    db: &Database,
    reservation: &Reservation,
) -> Result<(), StaydeskError> {
    let r = reservation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO reservations (id, guest_id, property_id, check_in, check_out)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    guest_id = excluded.guest_id,
                    property_id = excluded.property_id,
                    check_in = excluded.check_in,
                    check_out = excluded.check_out",
                params![
                    r.id,
                    r.guest_id,
                    r.property_id,
                    opt_ts(r.check_in),
                    opt_ts(r.check_out),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn upsert_property(db: &Database, property: &Property) -> Result<(), StaydeskError> {
    let p = property.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO properties (id, name, address, owner_name, owner_phone)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    address = excluded.address,
                    owner_name = excluded.owner_name,
                    owner_phone = excluded.owner_phone",
                params![p.id, p.name, p.address, p.owner_name, p.owner_phone],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_guest(db: &Database, id: &str) -> Result<Option<Guest>, StaydeskError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, full_name, email, phone, verification_token, token_issued_at,
                        verified_at
                 FROM guests WHERE id = ?1",
                params![id],
                guest_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_reservation(db: &Database, id: &str) -> Result<Option<Reservation>, StaydeskError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, guest_id, property_id, check_in, check_out
                 FROM reservations WHERE id = ?1",
                params![id],
                reservation_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_property(db: &Database, id: &str) -> Result<Option<Property>, StaydeskError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, name, address, owner_name, owner_phone FROM properties WHERE id = ?1",
                params![id],
                property_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Latest check-in first; reservations without a check-in come last.
pub async fn reservations_for_guest(
    db: &Database,
    guest_id: &str,
) -> Result<Vec<Reservation>, StaydeskError> {
    let guest_id = guest_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, guest_id, property_id, check_in, check_out
                 FROM reservations WHERE guest_id = ?1
                 ORDER BY check_in IS NULL, check_in DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map(params![guest_id], reservation_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}
