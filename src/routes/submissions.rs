use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::dsl::exists;
use diesel::{prelude::*, select, PgConnection};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::audit::{self, DECISION_WITHDRAWN};
use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::models::{
    EditorialDecision, NewPublication, NewSubmission, ReviewRound, Submission,
};
use crate::notifications::{
    self, KIND_EDITORIAL_DECISION, KIND_SUBMISSION_WITHDRAWN,
};
use crate::schema::{journals, publications, review_assignments, review_rounds, submissions};
use crate::state::AppState;
use crate::workflow::{
    self, stage_label, Decision, DecisionError, Stage, Status, ROUND_PENDING_REVIEWERS,
    ROUND_REVIEWS_COMPLETED,
};

use super::reviews::{open_review_round, RoundResponse};

pub(crate) fn fmt_ts(ts: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(ts, Utc).to_rfc3339()
}

#[derive(Deserialize)]
pub struct CreateSubmissionRequest {
    pub journal_id: Uuid,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
}

#[derive(Deserialize)]
pub struct SubmissionListQuery {
    pub journal_id: Option<Uuid>,
    /// Accepts the integer code or a legacy string alias.
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct DecisionRequest {
    pub decision: String,
}

#[derive(Serialize)]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub journal_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub stage_id: i32,
    pub stage: &'static str,
    pub status: i32,
    pub current_round: i32,
    pub date_submitted: String,
    pub last_modified: String,
    pub date_status_modified: String,
}

impl From<Submission> for SubmissionResponse {
    fn from(submission: Submission) -> Self {
        Self {
            id: submission.id,
            journal_id: submission.journal_id,
            author_id: submission.author_id,
            title: submission.title,
            abstract_text: submission.abstract_text,
            stage_id: submission.stage_id,
            stage: stage_label(submission.stage_id),
            status: submission.status,
            current_round: submission.current_round,
            date_submitted: fmt_ts(submission.date_submitted),
            last_modified: fmt_ts(submission.last_modified),
            date_status_modified: fmt_ts(submission.date_status_modified),
        }
    }
}

#[derive(Serialize)]
pub struct DecisionEntryResponse {
    pub id: Uuid,
    pub editor_id: Uuid,
    pub round: i32,
    pub decision: String,
    pub date_decided: String,
}

impl From<EditorialDecision> for DecisionEntryResponse {
    fn from(entry: EditorialDecision) -> Self {
        Self {
            id: entry.id,
            editor_id: entry.editor_id,
            round: entry.round,
            decision: entry.decision,
            date_decided: fmt_ts(entry.date_decided),
        }
    }
}

#[derive(Serialize)]
pub struct SubmissionDetailResponse {
    pub submission: SubmissionResponse,
    pub rounds: Vec<RoundResponse>,
    pub decisions: Vec<DecisionEntryResponse>,
}

#[derive(Serialize)]
pub struct DecisionOutcomeResponse {
    pub submission: SubmissionResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<RoundResponse>,
}

/// Decode a stored submission's workflow coordinates. Rows can only hold
/// unknown codes if written outside this service, so that is a 500.
pub(crate) fn decode_workflow(submission: &Submission) -> AppResult<(Stage, Status)> {
    let stage = Stage::from_id(submission.stage_id).ok_or_else(|| {
        AppError::internal(format!(
            "submission {} has unknown stage id {}",
            submission.id, submission.stage_id
        ))
    })?;
    let status = Status::from_id(submission.status).ok_or_else(|| {
        AppError::internal(format!(
            "submission {} has unknown status {}",
            submission.id, submission.status
        ))
    })?;
    Ok((stage, status))
}

/// Submitter, editors/admins, and assigned reviewers may see a submission.
pub(crate) fn can_view_submission(
    conn: &mut PgConnection,
    user: &AuthenticatedUser,
    submission: &Submission,
) -> AppResult<bool> {
    if user.is_editor() || submission.author_id == user.user_id {
        return Ok(true);
    }

    let assigned: bool = select(exists(
        review_assignments::table
            .filter(review_assignments::submission_id.eq(submission.id))
            .filter(review_assignments::reviewer_id.eq(user.user_id)),
    ))
    .get_result(conn)?;
    Ok(assigned)
}

pub async fn create_submission(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateSubmissionRequest>,
) -> AppResult<(StatusCode, Json<SubmissionResponse>)> {
    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::bad_request("title must not be empty"));
    }

    let mut conn = state.db()?;

    let journal_exists: bool = select(exists(
        journals::table.filter(journals::id.eq(payload.journal_id)),
    ))
    .get_result(&mut conn)?;
    if !journal_exists {
        return Err(AppError::bad_request("journal does not exist"));
    }

    let submission = conn.transaction::<Submission, AppError, _>(|conn| {
        let new_submission = NewSubmission {
            id: Uuid::new_v4(),
            journal_id: payload.journal_id,
            author_id: user.user_id,
            title: title.clone(),
            abstract_text: payload.abstract_text.clone(),
            stage_id: Stage::Submission.id(),
            status: Status::Queued.id(),
            current_round: 0,
        };
        diesel::insert_into(submissions::table)
            .values(&new_submission)
            .execute(conn)?;

        // The version-1 publication snapshot travels with the submission
        // from the start; publishing later only fills in the date.
        let new_publication = NewPublication {
            id: Uuid::new_v4(),
            submission_id: new_submission.id,
            version: 1,
            title: title.clone(),
            abstract_text: payload.abstract_text.clone(),
            status: Status::Queued.id(),
            date_published: None,
        };
        diesel::insert_into(publications::table)
            .values(&new_publication)
            .execute(conn)?;

        let submission: Submission = submissions::table.find(new_submission.id).first(conn)?;
        Ok(submission)
    })?;

    info!(
        submission_id = %submission.id,
        journal_id = %submission.journal_id,
        author = %user.username,
        "submission created"
    );

    Ok((StatusCode::CREATED, Json(submission.into())))
}

pub async fn list_submissions(
    State(state): State<AppState>,
    Query(params): Query<SubmissionListQuery>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<SubmissionResponse>>> {
    let mut conn = state.db()?;

    let mut query = submissions::table.into_boxed();

    if !user.is_editor() {
        query = query.filter(submissions::author_id.eq(user.user_id));
    }

    if let Some(journal_id) = params.journal_id {
        query = query.filter(submissions::journal_id.eq(journal_id));
    }

    if let Some(raw_status) = params.status.as_deref() {
        let status = match raw_status.parse::<i32>() {
            Ok(code) => Status::from_id(code)
                .ok_or_else(|| AppError::bad_request(format!("unknown status code {code}")))?,
            Err(_) => Status::from_legacy(raw_status),
        };
        query = query.filter(submissions::status.eq(status.id()));
    }

    let rows: Vec<Submission> = query
        .order(submissions::date_submitted.desc())
        .load(&mut conn)?;

    Ok(Json(rows.into_iter().map(SubmissionResponse::from).collect()))
}

pub async fn get_submission(
    State(state): State<AppState>,
    Path(submission_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<SubmissionDetailResponse>> {
    let mut conn = state.db()?;

    let submission: Submission = submissions::table.find(submission_id).first(&mut conn)?;
    if !can_view_submission(&mut conn, &user, &submission)? {
        return Err(AppError::forbidden("not a participant in this submission"));
    }

    let rounds: Vec<ReviewRound> = review_rounds::table
        .filter(review_rounds::submission_id.eq(submission_id))
        .order(review_rounds::round.asc())
        .load(&mut conn)?;

    let decisions = audit::decisions_for_submission(&mut conn, submission_id)
        .map_err(AppError::internal)?;

    Ok(Json(SubmissionDetailResponse {
        submission: submission.into(),
        rounds: rounds
            .into_iter()
            .map(|round| RoundResponse::from_row(round, false))
            .collect(),
        decisions: decisions.into_iter().map(DecisionEntryResponse::from).collect(),
    }))
}

/// Apply an editorial decision to a submission. `send_to_review` is also
/// reachable through `POST /api/reviews/rounds`; both paths share the same
/// round-opening transaction.
pub async fn record_editor_decision(
    State(state): State<AppState>,
    Path(submission_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<DecisionRequest>,
) -> AppResult<Json<DecisionOutcomeResponse>> {
    if !user.is_editor() {
        return Err(AppError::forbidden("only editors can record decisions"));
    }

    let decision: Decision = payload.decision.parse()?;

    let mut conn = state.db()?;
    let submission: Submission = submissions::table.find(submission_id).first(&mut conn)?;
    let (stage, status) = decode_workflow(&submission)?;
    workflow::validate_decision(stage, status, decision)?;

    let now = Utc::now().naive_utc();
    let editor_id = user.user_id;

    let (submission, round) = match decision {
        Decision::SendToReview => {
            let (round, existing) =
                open_review_round(&mut conn, &submission, editor_id, None)?;
            let refreshed: Submission = submissions::table.find(submission_id).first(&mut conn)?;
            (refreshed, Some(RoundResponse::from_row(round, existing)))
        }
        Decision::Accept => {
            apply_status_change(
                &mut conn,
                &submission,
                editor_id,
                decision,
                Some(Stage::Editing),
                Status::Queued,
                now,
            )?
        }
        Decision::Decline => {
            apply_status_change(
                &mut conn,
                &submission,
                editor_id,
                decision,
                None,
                Status::Declined,
                now,
            )?
        }
        Decision::RequestRevisions => {
            request_revisions(&mut conn, &submission, editor_id, now)?
        }
        Decision::SendToProduction => {
            apply_status_change(
                &mut conn,
                &submission,
                editor_id,
                decision,
                Some(Stage::Production),
                Status::Queued,
                now,
            )?
        }
    };

    info!(
        submission_id = %submission.id,
        decision = %decision,
        editor = %user.username,
        "editorial decision recorded"
    );

    notifications::notify_best_effort(
        "editorial decision",
        notifications::notify_user(
            &mut conn,
            submission.author_id,
            Some(submission.id),
            KIND_EDITORIAL_DECISION,
            &format!("decision '{decision}' was recorded on \"{}\"", submission.title),
        ),
    );

    Ok(Json(DecisionOutcomeResponse {
        submission: submission.into(),
        round,
    }))
}

fn apply_status_change(
    conn: &mut PgConnection,
    submission: &Submission,
    editor_id: Uuid,
    decision: Decision,
    new_stage: Option<Stage>,
    new_status: Status,
    now: NaiveDateTime,
) -> AppResult<(Submission, Option<RoundResponse>)> {
    let updated = conn.transaction::<Submission, AppError, _>(|conn| {
        diesel::update(submissions::table.find(submission.id))
            .set((
                submissions::stage_id
                    .eq(new_stage.map(Stage::id).unwrap_or(submission.stage_id)),
                submissions::status.eq(new_status.id()),
                submissions::last_modified.eq(now),
                submissions::date_status_modified.eq(now),
            ))
            .execute(conn)?;

        audit::record_decision(
            conn,
            submission.id,
            editor_id,
            None,
            submission.current_round,
            decision.as_str(),
        )
        .map_err(AppError::internal)?;

        let refreshed: Submission = submissions::table.find(submission.id).first(conn)?;
        Ok(refreshed)
    })?;

    Ok((updated, None))
}

fn request_revisions(
    conn: &mut PgConnection,
    submission: &Submission,
    editor_id: Uuid,
    now: NaiveDateTime,
) -> AppResult<(Submission, Option<RoundResponse>)> {
    let (updated, round) = conn.transaction::<(Submission, ReviewRound), AppError, _>(|conn| {
        let open_round: Option<ReviewRound> = review_rounds::table
            .filter(review_rounds::submission_id.eq(submission.id))
            .filter(review_rounds::status.ne(ROUND_REVIEWS_COMPLETED))
            .order(review_rounds::round.desc())
            .first(conn)
            .optional()?;

        let round = open_round.ok_or(AppError::from(DecisionError::MissingReviewRound))?;

        // The round reopens for another pass; the submission stays in the
        // external review stage.
        diesel::update(review_rounds::table.find(round.id))
            .set((
                review_rounds::status.eq(ROUND_PENDING_REVIEWERS),
                review_rounds::updated_at.eq(now),
            ))
            .execute(conn)?;

        diesel::update(submissions::table.find(submission.id))
            .set((
                submissions::last_modified.eq(now),
                submissions::date_status_modified.eq(now),
            ))
            .execute(conn)?;

        audit::record_decision(
            conn,
            submission.id,
            editor_id,
            Some(round.id),
            round.round,
            Decision::RequestRevisions.as_str(),
        )
        .map_err(AppError::internal)?;

        let refreshed: Submission = submissions::table.find(submission.id).first(conn)?;
        let refreshed_round: ReviewRound = review_rounds::table.find(round.id).first(conn)?;
        Ok((refreshed, refreshed_round))
    })?;

    Ok((updated, Some(RoundResponse::from_row(round, true))))
}

/// Withdrawal never deletes the row: the submission is declined and the
/// decision is recorded so the audit trail survives.
pub async fn withdraw_submission(
    State(state): State<AppState>,
    Path(submission_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<SubmissionResponse>> {
    let mut conn = state.db()?;
    let submission: Submission = submissions::table.find(submission_id).first(&mut conn)?;

    if submission.author_id != user.user_id && !user.is_editor() {
        return Err(AppError::forbidden(
            "only the submitter or an editor can withdraw a submission",
        ));
    }

    let (_, status) = decode_workflow(&submission)?;
    match status {
        Status::Declined => {
            return Err(AppError::with_code(
                StatusCode::BAD_REQUEST,
                "submission is already declined",
                "ALREADY_DECLINED",
            ));
        }
        Status::Published => {
            return Err(AppError::bad_request(
                "a published submission cannot be withdrawn",
            ));
        }
        Status::Queued | Status::Scheduled => {}
    }

    let now = Utc::now().naive_utc();
    let updated = conn.transaction::<Submission, AppError, _>(|conn| {
        diesel::update(submissions::table.find(submission_id))
            .set((
                submissions::status.eq(Status::Declined.id()),
                submissions::last_modified.eq(now),
                submissions::date_status_modified.eq(now),
            ))
            .execute(conn)?;

        audit::record_decision(
            conn,
            submission_id,
            user.user_id,
            None,
            submission.current_round,
            DECISION_WITHDRAWN,
        )
        .map_err(AppError::internal)?;

        let refreshed: Submission = submissions::table.find(submission_id).first(conn)?;
        Ok(refreshed)
    })?;

    info!(submission_id = %submission_id, user = %user.username, "submission withdrawn");

    notifications::notify_best_effort(
        "withdrawal",
        notifications::notify_editors(
            &mut conn,
            Some(submission_id),
            KIND_SUBMISSION_WITHDRAWN,
            &format!("\"{}\" was withdrawn by its author", updated.title),
        ),
    );

    Ok(Json(updated.into()))
}
