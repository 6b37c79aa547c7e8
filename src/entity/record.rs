//! Entity <-> store record mapping.
//!
//! Structured payloads (`parsed_requirements`, `win_strategy`,
//! `submission_snapshot`, `generated_using`) are stored as JSON text. A
//! payload that fails to decode is treated as absent.

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::bindings::{BindingsUpdate, RfpBindings};
use super::rfp::{Rfp, RfpUpdate};
use super::section::{RfpSection, SectionUpdate};
use crate::error::Result;
use crate::staleness::DEPENDENCIES_UPDATED;
use crate::storage::{Fields, Record};

/// Current time at the precision timestamps are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width UTC timestamps so stored values order lexically.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn timestamp(record: &Record, key: &str) -> Option<DateTime<Utc>> {
    match record.get(key)? {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

fn date(record: &Record, key: &str) -> Option<NaiveDate> {
    match record.get(key)? {
        Value::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
        _ => None,
    }
}

fn string(record: &Record, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn boolean(record: &Record, key: &str) -> bool {
    matches!(record.get(key), Some(Value::Bool(true)))
}

fn string_list(record: &Record, key: &str) -> Vec<String> {
    match record.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn parsed<T: std::str::FromStr>(record: &Record, key: &str) -> Option<T> {
    string(record, key).and_then(|s| s.parse().ok())
}

fn payload<T: DeserializeOwned>(record: &Record, key: &str) -> Option<T> {
    let text = match record.get(key)? {
        Value::String(s) if !s.is_empty() => s,
        _ => return None,
    };
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(
                record = %record.id,
                field = key,
                error = %e,
                "malformed payload, treating as absent"
            );
            None
        }
    }
}

fn payload_value<T: Serialize>(value: Option<&T>) -> Result<Value> {
    match value {
        Some(v) => Ok(Value::String(serde_json::to_string(v)?)),
        None => Ok(Value::Null),
    }
}

fn opt_string(value: Option<&String>) -> Value {
    value.map(|s| Value::String(s.clone())).unwrap_or(Value::Null)
}

fn opt_display<T: std::fmt::Display>(value: Option<T>) -> Value {
    value
        .map(|v| Value::String(v.to_string()))
        .unwrap_or(Value::Null)
}

fn list(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

fn opt_timestamp(value: Option<&DateTime<Utc>>) -> Value {
    value
        .map(|dt| Value::String(format_timestamp(dt)))
        .unwrap_or(Value::Null)
}

fn opt_date(value: Option<&NaiveDate>) -> Value {
    value
        .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
        .unwrap_or(Value::Null)
}

// --- RFP ---

pub fn rfp_to_fields(rfp: &Rfp) -> Result<Fields> {
    let mut fields = Fields::new();
    fields.insert("company_id".into(), Value::String(rfp.company_id.clone()));
    fields.insert("opportunity_id".into(), opt_string(rfp.opportunity_id.as_ref()));
    fields.insert("title".into(), Value::String(rfp.title.clone()));
    fields.insert("due_date".into(), opt_date(rfp.due_date.as_ref()));
    fields.insert("status".into(), Value::String(rfp.status.to_string()));
    fields.insert("scope_summary".into(), opt_string(rfp.scope_summary.as_ref()));
    fields.insert("selected_path".into(), Value::String(rfp.selected_path.to_string()));
    fields.insert(
        "parsed_requirements".into(),
        payload_value(rfp.parsed_requirements.as_ref())?,
    );
    fields.insert("competitors".into(), list(&rfp.competitors));
    fields.insert("win_strategy".into(), payload_value(rfp.win_strategy.as_ref())?);
    fields.insert(
        "submission_snapshot".into(),
        payload_value(rfp.submission_snapshot.as_ref())?,
    );
    fields.insert("created_at".into(), Value::String(format_timestamp(&rfp.created_at)));
    fields.insert("updated_at".into(), Value::String(format_timestamp(&rfp.updated_at)));
    Ok(fields)
}

pub fn rfp_from_record(record: &Record) -> Option<Rfp> {
    Some(Rfp {
        id: record.id.clone(),
        company_id: string(record, "company_id")?,
        opportunity_id: string(record, "opportunity_id"),
        title: string(record, "title")?,
        due_date: date(record, "due_date"),
        status: parsed(record, "status").unwrap_or_default(),
        scope_summary: string(record, "scope_summary"),
        selected_path: parsed(record, "selected_path").unwrap_or_default(),
        parsed_requirements: payload(record, "parsed_requirements"),
        competitors: string_list(record, "competitors"),
        win_strategy: payload(record, "win_strategy"),
        submission_snapshot: payload(record, "submission_snapshot"),
        created_at: timestamp(record, "created_at")?,
        updated_at: timestamp(record, "updated_at")?,
    })
}

pub fn rfp_update_fields(update: &RfpUpdate, now: &DateTime<Utc>) -> Result<Fields> {
    let mut fields = Fields::new();
    fields.insert("updated_at".into(), Value::String(format_timestamp(now)));

    if let Some(ref title) = update.title {
        fields.insert("title".into(), Value::String(title.clone()));
    }
    if let Some(ref opportunity_id) = update.opportunity_id {
        fields.insert("opportunity_id".into(), opt_string(opportunity_id.as_ref()));
    }
    if let Some(ref due_date) = update.due_date {
        fields.insert("due_date".into(), opt_date(due_date.as_ref()));
    }
    if let Some(status) = update.status {
        fields.insert("status".into(), Value::String(status.to_string()));
    }
    if let Some(ref scope_summary) = update.scope_summary {
        fields.insert("scope_summary".into(), opt_string(scope_summary.as_ref()));
    }
    if let Some(selected_path) = update.selected_path {
        fields.insert("selected_path".into(), Value::String(selected_path.to_string()));
    }
    if let Some(ref parsed_requirements) = update.parsed_requirements {
        fields.insert(
            "parsed_requirements".into(),
            payload_value(parsed_requirements.as_ref())?,
        );
    }
    if let Some(ref competitors) = update.competitors {
        fields.insert("competitors".into(), list(competitors));
    }
    if let Some(ref win_strategy) = update.win_strategy {
        fields.insert("win_strategy".into(), payload_value(win_strategy.as_ref())?);
    }
    Ok(fields)
}

pub fn snapshot_fields(rfp: &Rfp, now: &DateTime<Utc>) -> Result<Fields> {
    let mut fields = Fields::new();
    fields.insert(
        "submission_snapshot".into(),
        payload_value(rfp.submission_snapshot.as_ref())?,
    );
    fields.insert("updated_at".into(), Value::String(format_timestamp(now)));
    Ok(fields)
}

// --- Sections ---

pub fn section_to_fields(section: &RfpSection) -> Result<Fields> {
    let mut fields = Fields::new();
    fields.insert("rfp_id".into(), Value::String(section.rfp_id.clone()));
    fields.insert(
        "section_key".into(),
        Value::String(section.section_key.to_string()),
    );
    fields.insert("title".into(), Value::String(section.title.clone()));
    fields.insert("status".into(), Value::String(section.status.to_string()));
    fields.insert("content_working".into(), opt_string(section.content_working.as_ref()));
    fields.insert("content_approved".into(), opt_string(section.content_approved.as_ref()));
    fields.insert("source_type".into(), opt_display(section.source_type));
    fields.insert(
        "generated_using".into(),
        payload_value(section.generated_using.as_ref())?,
    );
    fields.insert("needs_review".into(), Value::Bool(section.needs_review));
    fields.insert(
        "last_generated_at".into(),
        opt_timestamp(section.last_generated_at.as_ref()),
    );
    fields.insert("is_stale".into(), Value::Bool(section.is_stale));
    fields.insert("stale_reason".into(), opt_string(section.stale_reason.as_ref()));
    fields.insert("review_notes".into(), opt_string(section.review_notes.as_ref()));
    fields.insert(
        "created_at".into(),
        Value::String(format_timestamp(&section.created_at)),
    );
    fields.insert(
        "updated_at".into(),
        Value::String(format_timestamp(&section.updated_at)),
    );
    Ok(fields)
}

/// Sections never generated read as fresh; a stale section always has a
/// reason.
pub fn section_from_record(record: &Record) -> Option<RfpSection> {
    let section_key = parsed(record, "section_key")?;
    let last_generated_at = timestamp(record, "last_generated_at");
    let is_stale = last_generated_at.is_some() && boolean(record, "is_stale");
    Some(RfpSection {
        id: record.id.clone(),
        rfp_id: string(record, "rfp_id")?,
        section_key,
        title: string(record, "title").unwrap_or_default(),
        status: parsed(record, "status").unwrap_or_default(),
        content_working: string(record, "content_working"),
        content_approved: string(record, "content_approved"),
        source_type: parsed(record, "source_type"),
        generated_using: payload(record, "generated_using"),
        needs_review: boolean(record, "needs_review"),
        last_generated_at,
        is_stale,
        stale_reason: if is_stale {
            string(record, "stale_reason")
                .filter(|r| !r.is_empty())
                .or_else(|| Some(DEPENDENCIES_UPDATED.to_string()))
        } else {
            None
        },
        review_notes: string(record, "review_notes"),
        created_at: timestamp(record, "created_at")?,
        updated_at: timestamp(record, "updated_at")?,
    })
}

pub fn section_update_fields(update: &SectionUpdate, now: &DateTime<Utc>) -> Result<Fields> {
    let mut fields = Fields::new();
    fields.insert("updated_at".into(), Value::String(format_timestamp(now)));

    if let Some(ref title) = update.title {
        fields.insert("title".into(), Value::String(title.clone()));
    }
    if let Some(status) = update.status {
        fields.insert("status".into(), Value::String(status.to_string()));
    }
    if let Some(ref content) = update.content_working {
        fields.insert("content_working".into(), opt_string(content.as_ref()));
    }
    if let Some(ref content) = update.content_approved {
        fields.insert("content_approved".into(), opt_string(content.as_ref()));
    }
    if let Some(source_type) = update.source_type {
        fields.insert("source_type".into(), opt_display(source_type));
    }
    if let Some(ref generated_using) = update.generated_using {
        fields.insert("generated_using".into(), payload_value(generated_using.as_ref())?);
    }
    if let Some(needs_review) = update.needs_review {
        fields.insert("needs_review".into(), Value::Bool(needs_review));
    }
    if let Some(ref last_generated_at) = update.last_generated_at {
        fields.insert(
            "last_generated_at".into(),
            opt_timestamp(last_generated_at.as_ref()),
        );
    }
    if let Some(ref notes) = update.review_notes {
        fields.insert("review_notes".into(), opt_string(notes.as_ref()));
    }
    Ok(fields)
}

pub fn staleness_fields(is_stale: bool, reason: Option<&String>, now: &DateTime<Utc>) -> Fields {
    let mut fields = Fields::new();
    fields.insert("is_stale".into(), Value::Bool(is_stale));
    fields.insert("stale_reason".into(), opt_string(reason));
    fields.insert("updated_at".into(), Value::String(format_timestamp(now)));
    fields
}

// --- Bindings ---

pub fn bindings_to_fields(bindings: &RfpBindings) -> Fields {
    let mut fields = Fields::new();
    fields.insert("rfp_id".into(), Value::String(bindings.rfp_id.clone()));
    fields.insert("team_member_ids".into(), list(&bindings.team_member_ids));
    fields.insert("case_study_ids".into(), list(&bindings.case_study_ids));
    fields.insert("reference_ids".into(), list(&bindings.reference_ids));
    fields.insert(
        "pricing_template_id".into(),
        opt_string(bindings.pricing_template_id.as_ref()),
    );
    fields.insert(
        "plan_template_id".into(),
        opt_string(bindings.plan_template_id.as_ref()),
    );
    fields.insert(
        "created_at".into(),
        Value::String(format_timestamp(&bindings.created_at)),
    );
    fields.insert(
        "updated_at".into(),
        Value::String(format_timestamp(&bindings.updated_at)),
    );
    fields
}

pub fn bindings_from_record(record: &Record) -> Option<RfpBindings> {
    Some(RfpBindings {
        id: record.id.clone(),
        rfp_id: string(record, "rfp_id")?,
        team_member_ids: string_list(record, "team_member_ids"),
        case_study_ids: string_list(record, "case_study_ids"),
        reference_ids: string_list(record, "reference_ids"),
        pricing_template_id: string(record, "pricing_template_id"),
        plan_template_id: string(record, "plan_template_id"),
        created_at: timestamp(record, "created_at")?,
        updated_at: timestamp(record, "updated_at")?,
    })
}

pub fn bindings_update_fields(update: &BindingsUpdate, now: &DateTime<Utc>) -> Fields {
    let mut fields = Fields::new();
    fields.insert("updated_at".into(), Value::String(format_timestamp(now)));

    if let Some(ref ids) = update.team_member_ids {
        fields.insert("team_member_ids".into(), list(ids));
    }
    if let Some(ref ids) = update.case_study_ids {
        fields.insert("case_study_ids".into(), list(ids));
    }
    if let Some(ref ids) = update.reference_ids {
        fields.insert("reference_ids".into(), list(ids));
    }
    if let Some(ref id) = update.pricing_template_id {
        fields.insert("pricing_template_id".into(), opt_string(id.as_ref()));
    }
    if let Some(ref id) = update.plan_template_id {
        fields.insert("plan_template_id".into(), opt_string(id.as_ref()));
    }
    fields
}
