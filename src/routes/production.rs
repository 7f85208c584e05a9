use axum::extract::{Json, Path, State};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::audit::{self, DECISION_PUBLISH, DECISION_SCHEDULE};
use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::models::{NewPublication, Publication, Submission};
use crate::notifications::{self, KIND_SUBMISSION_PUBLISHED};
use crate::schema::{publications, submissions};
use crate::state::AppState;
use crate::workflow::{Stage, Status};

use super::submissions::{decode_workflow, fmt_ts};

#[derive(Deserialize, Default)]
pub struct PublishRequest {
    /// When true, mark the submission scheduled instead of published.
    #[serde(default)]
    pub schedule: bool,
}

#[derive(Serialize)]
pub struct PublicationResponse {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub version: i32,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub status: i32,
    pub date_published: Option<String>,
}

impl From<Publication> for PublicationResponse {
    fn from(publication: Publication) -> Self {
        Self {
            id: publication.id,
            submission_id: publication.submission_id,
            version: publication.version,
            title: publication.title,
            abstract_text: publication.abstract_text,
            status: publication.status,
            date_published: publication.date_published.map(fmt_ts),
        }
    }
}

/// Publish (or schedule) a submission that has reached production. The
/// publication snapshot, submission status, and audit row are written in
/// one transaction.
pub async fn publish_submission(
    State(state): State<AppState>,
    Path(submission_id): Path<Uuid>,
    user: AuthenticatedUser,
    payload: Option<Json<PublishRequest>>,
) -> AppResult<Json<PublicationResponse>> {
    if !user.is_editor() {
        return Err(AppError::forbidden("only editors can publish submissions"));
    }

    let payload = payload.map(|Json(body)| body).unwrap_or_default();

    let mut conn = state.db()?;
    let submission: Submission = submissions::table.find(submission_id).first(&mut conn)?;

    let (stage, status) = decode_workflow(&submission)?;
    if stage != Stage::Production {
        return Err(AppError::bad_request(format!(
            "submission is in the {stage} stage, publishing requires production"
        )));
    }
    match status {
        Status::Declined => {
            return Err(AppError::bad_request(
                "a declined submission cannot be published",
            ));
        }
        Status::Published => {
            return Err(AppError::bad_request("submission is already published"));
        }
        Status::Queued | Status::Scheduled => {}
    }

    let new_status = if payload.schedule {
        Status::Scheduled
    } else {
        Status::Published
    };
    let now = chrono::Utc::now().naive_utc();

    let publication = conn.transaction::<Publication, AppError, _>(|conn| {
        let latest: Option<Publication> = publications::table
            .filter(publications::submission_id.eq(submission.id))
            .order(publications::version.desc())
            .first(conn)
            .optional()?;

        let publication_id = match latest {
            Some(existing) => {
                diesel::update(publications::table.find(existing.id))
                    .set((
                        publications::status.eq(new_status.id()),
                        publications::date_published
                            .eq((new_status == Status::Published).then_some(now)),
                        publications::updated_at.eq(now),
                    ))
                    .execute(conn)?;
                existing.id
            }
            // Submissions created by this service always carry a version-1
            // snapshot; this covers rows imported from elsewhere.
            None => {
                let new_publication = NewPublication {
                    id: Uuid::new_v4(),
                    submission_id: submission.id,
                    version: 1,
                    title: submission.title.clone(),
                    abstract_text: submission.abstract_text.clone(),
                    status: new_status.id(),
                    date_published: (new_status == Status::Published).then_some(now),
                };
                diesel::insert_into(publications::table)
                    .values(&new_publication)
                    .execute(conn)?;
                new_publication.id
            }
        };

        diesel::update(submissions::table.find(submission.id))
            .set((
                submissions::status.eq(new_status.id()),
                submissions::last_modified.eq(now),
                submissions::date_status_modified.eq(now),
            ))
            .execute(conn)?;

        let decision = if payload.schedule {
            DECISION_SCHEDULE
        } else {
            DECISION_PUBLISH
        };
        audit::record_decision(
            conn,
            submission.id,
            user.user_id,
            None,
            submission.current_round,
            decision,
        )
        .map_err(AppError::internal)?;

        let publication: Publication = publications::table.find(publication_id).first(conn)?;
        Ok(publication)
    })?;

    info!(
        submission_id = %submission.id,
        scheduled = payload.schedule,
        editor = %user.username,
        "submission published"
    );

    notifications::notify_best_effort(
        "publication",
        notifications::notify_user(
            &mut conn,
            submission.author_id,
            Some(submission.id),
            KIND_SUBMISSION_PUBLISHED,
            &format!(
                "\"{}\" has been {}",
                submission.title,
                if payload.schedule { "scheduled for publication" } else { "published" }
            ),
        ),
    );

    Ok(Json(publication.into()))
}
