//! Side-channel notification rows. These writes are best-effort: callers go
//! through [`notify_best_effort`], which logs failures and never lets them
//! fail the surrounding request.

use diesel::pg::PgConnection;
use diesel::prelude::*;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::auth::{ROLE_ADMIN, ROLE_EDITOR};
use crate::models::{NewNotification, Notification};
use crate::schema::{notifications, users};

pub const KIND_REVIEW_ROUND_OPENED: &str = "review_round_opened";
pub const KIND_REVIEW_INVITATION: &str = "review_invitation";
pub const KIND_REVIEWER_RESPONDED: &str = "reviewer_responded";
pub const KIND_REVIEW_COMPLETED: &str = "review_completed";
pub const KIND_EDITORIAL_DECISION: &str = "editorial_decision";
pub const KIND_SUBMISSION_WITHDRAWN: &str = "submission_withdrawn";
pub const KIND_SUBMISSION_PUBLISHED: &str = "submission_published";

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

pub type NotificationResult<T> = Result<T, NotificationError>;

pub fn notify_user(
    conn: &mut PgConnection,
    user_id: Uuid,
    submission_id: Option<Uuid>,
    kind: &str,
    message: &str,
) -> NotificationResult<Notification> {
    let new_notification = NewNotification {
        id: Uuid::new_v4(),
        user_id,
        submission_id,
        kind: kind.to_string(),
        message: message.to_string(),
    };

    diesel::insert_into(notifications::table)
        .values(&new_notification)
        .execute(conn)?;

    let notification = notifications::table.find(new_notification.id).first(conn)?;
    Ok(notification)
}

/// Fan a notification out to every editor-role user (editors and admins).
pub fn notify_editors(
    conn: &mut PgConnection,
    submission_id: Option<Uuid>,
    kind: &str,
    message: &str,
) -> NotificationResult<usize> {
    let editor_ids: Vec<Uuid> = users::table
        .filter(users::role.eq_any([ROLE_EDITOR, ROLE_ADMIN]))
        .select(users::id)
        .load(conn)?;

    let rows: Vec<NewNotification> = editor_ids
        .into_iter()
        .map(|user_id| NewNotification {
            id: Uuid::new_v4(),
            user_id,
            submission_id,
            kind: kind.to_string(),
            message: message.to_string(),
        })
        .collect();

    if rows.is_empty() {
        return Ok(0);
    }

    let inserted = diesel::insert_into(notifications::table)
        .values(&rows)
        .execute(conn)?;
    Ok(inserted)
}

/// Run a notification write, logging and swallowing any failure.
pub fn notify_best_effort<T>(
    context: &'static str,
    result: NotificationResult<T>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(error = %err, context, "failed to write notification");
            None
        }
    }
}
