//! Append-only editorial decision log. One row per transition attempt that
//! was accepted; rows are never updated or deleted.

use diesel::pg::PgConnection;
use diesel::prelude::*;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{EditorialDecision, NewEditorialDecision};
use crate::schema::editorial_decisions;

// Decision strings recorded beyond the editor decision verbs.
pub const DECISION_WITHDRAWN: &str = "withdrawn";
pub const DECISION_PUBLISH: &str = "publish";
pub const DECISION_SCHEDULE: &str = "schedule";
pub const DECISION_REVIEW_ACCEPTED: &str = "review_accepted";
pub const DECISION_REVIEW_DECLINED: &str = "review_declined";

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

pub type AuditResult<T> = Result<T, AuditError>;

pub fn record_decision(
    conn: &mut PgConnection,
    submission_id: Uuid,
    editor_id: Uuid,
    review_round_id: Option<Uuid>,
    round: i32,
    decision: &str,
) -> AuditResult<EditorialDecision> {
    let new_entry = NewEditorialDecision {
        id: Uuid::new_v4(),
        submission_id,
        editor_id,
        review_round_id,
        round,
        decision: decision.to_string(),
    };

    diesel::insert_into(editorial_decisions::table)
        .values(&new_entry)
        .execute(conn)?;

    let entry = editorial_decisions::table.find(new_entry.id).first(conn)?;
    Ok(entry)
}

pub fn decisions_for_submission(
    conn: &mut PgConnection,
    submission_id: Uuid,
) -> AuditResult<Vec<EditorialDecision>> {
    let rows = editorial_decisions::table
        .filter(editorial_decisions::submission_id.eq(submission_id))
        .order(editorial_decisions::date_decided.asc())
        .load(conn)?;
    Ok(rows)
}
