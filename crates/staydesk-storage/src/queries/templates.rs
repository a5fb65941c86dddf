// SPDX-FileCopyrightText: 2026 Staydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message template queries.

use rusqlite::{OptionalExtension, Row, params};
use staydesk_core::StaydeskError;
use staydesk_core::types::{MessageTemplate, TemplateKind, TriggerEvent, TriggerRule};

use crate::codec::{col_enum, col_enum_opt, col_json, col_ts_required, ts};
use crate::database::{Database, map_tr_err};

const COLUMNS: &str = "id, name, kind, property_id, subject, body, channels, language, active, \
     trigger_event, trigger_offset, trigger_unit, trigger_direction, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<MessageTemplate> {
    let trigger = match col_enum_opt::<TriggerEvent>(row, 9)? {
        Some(event) => Some(TriggerRule {
            event,
            offset: row.get::<_, Option<u32>>(10)?.unwrap_or(0),
            unit: col_enum(row, 11)?,
            direction: col_enum(row, 12)?,
        }),
        None => None,
    };
    Ok(MessageTemplate {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: col_enum(row, 2)?,
        property_id: row.get(3)?,
        subject: row.get(4)?,
        body: row.get(5)?,
        channels: col_json(row, 6)?,
        language: row.get(7)?,
        active: row.get(8)?,
        trigger,
        created_at: col_ts_required(row, 13)?,
        updated_at: col_ts_required(row, 14)?,
    })
}

/// Owned parameter set for INSERT / UPDATE.
struct TemplateRow {
    id: String,
    name: String,
    kind: String,
    property_id: Option<String>,
    subject: Option<String>,
    body: String,
    channels: String,
    language: String,
    active: bool,
    trigger_event: Option<String>,
    trigger_offset: Option<u32>,
    trigger_unit: Option<String>,
    trigger_direction: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TemplateRow {
    fn new(template: &MessageTemplate) -> Result<Self, StaydeskError> {
        let channels = serde_json::to_string(&template.channels).map_err(|e| {
            StaydeskError::Storage {
                source: Box::new(e),
            }
        })?;
        let rule = template.trigger.as_ref();
        Ok(Self {
            id: template.id.clone(),
            name: template.name.clone(),
            kind: template.kind.to_string(),
            property_id: template.property_id.clone(),
            subject: template.subject.clone(),
            body: template.body.clone(),
            channels,
            language: template.language.clone(),
            active: template.active,
            trigger_event: rule.map(|r| r.event.to_string()),
            trigger_offset: rule.map(|r| r.offset),
            trigger_unit: rule.map(|r| r.unit.to_string()),
            trigger_direction: rule.map(|r| r.direction.to_string()),
            created_at: ts(template.created_at),
            updated_at: ts(template.updated_at),
        })
    }
}

pub async fn insert_template(db: &Database, template: &MessageTemplate) -> Result<(), StaydeskError> {
    let r = TemplateRow::new(template)?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO templates ({COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
                ),
                params![
                    r.id,
                    r.name,
                    r.kind,
                    r.property_id,
                    r.subject,
                    r.body,
                    r.channels,
                    r.language,
                    r.active,
                    r.trigger_event,
                    r.trigger_offset,
                    r.trigger_unit,
                    r.trigger_direction,
                    r.created_at,
                    r.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_template(db: &Database, template: &MessageTemplate) -> Result<(), StaydeskError> {
    let r = TemplateRow::new(template)?;
    let id = r.id.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE templates SET name = ?2, kind = ?3, property_id = ?4, subject = ?5,
                 body = ?6, channels = ?7, language = ?8, active = ?9, trigger_event = ?10,
                 trigger_offset = ?11, trigger_unit = ?12, trigger_direction = ?13,
                 updated_at = ?14
                 WHERE id = ?1",
                params![
                    r.id,
                    r.name,
                    r.kind,
                    r.property_id,
                    r.subject,
                    r.body,
                    r.channels,
                    r.language,
                    r.active,
                    r.trigger_event,
                    r.trigger_offset,
                    r.trigger_unit,
                    r.trigger_direction,
                    r.updated_at,
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(StaydeskError::not_found("template", id));
    }
    Ok(())
}

pub async fn get_template(db: &Database, id: &str) -> Result<Option<MessageTemplate>, StaydeskError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM templates WHERE id = ?1"),
                params![id],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_templates(
    db: &Database,
    property_id: Option<&str>,
) -> Result<Vec<MessageTemplate>, StaydeskError> {
    let property_id = property_id.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM templates
                 WHERE ?1 IS NULL OR property_id IS NULL OR property_id = ?1
                 ORDER BY name, created_at"
            ))?;
            let rows = stmt
                .query_map(params![property_id], from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Property-specific templates win over account-wide ones; the most recently
/// edited wins within each group.
pub async fn find_active_by_kind(
    db: &Database,
    kind: &TemplateKind,
    property_id: &str,
) -> Result<Option<MessageTemplate>, StaydeskError> {
    let kind = kind.to_string();
    let property_id = property_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {COLUMNS} FROM templates
                     WHERE kind = ?1 AND active = 1
                       AND (property_id IS NULL OR property_id = ?2)
                     ORDER BY property_id IS NULL, updated_at DESC
                     LIMIT 1"
                ),
                params![kind, property_id],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn templates_for_event(
    db: &Database,
    event: TriggerEvent,
    property_id: &str,
) -> Result<Vec<MessageTemplate>, StaydeskError> {
    let event = event.to_string();
    let property_id = property_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM templates
                 WHERE trigger_event = ?1 AND active = 1
                   AND (property_id IS NULL OR property_id = ?2)
                 ORDER BY property_id IS NULL, created_at"
            ))?;
            let rows = stmt
                .query_map(params![event, property_id], from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}
