use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use chrono::{NaiveDateTime, Utc};
use diesel::{prelude::*, PgConnection};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::audit::{self, DECISION_REVIEW_ACCEPTED, DECISION_REVIEW_DECLINED};
use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::models::{NewReviewAssignment, NewReviewRound, ReviewAssignment, ReviewRound, Submission};
use crate::notifications::{
    self, KIND_REVIEWER_RESPONDED, KIND_REVIEW_COMPLETED, KIND_REVIEW_INVITATION,
    KIND_REVIEW_ROUND_OPENED,
};
use crate::schema::{review_assignments, review_rounds, submissions, users};
use crate::state::AppState;
use crate::workflow::{
    self, Decision, Stage, Status, ASSIGNMENT_ACCEPTED, ASSIGNMENT_AWAITING_RESPONSE,
    ASSIGNMENT_COMPLETE, ASSIGNMENT_DECLINED, ROUND_PENDING_REVIEWERS, ROUND_PENDING_REVIEWS,
    ROUND_REVIEWS_COMPLETED,
};

use super::submissions::{can_view_submission, decode_workflow, fmt_ts};

#[derive(Deserialize)]
pub struct CreateRoundRequest {
    pub submission_id: Uuid,
    /// Optional expected round number; rejected if it is out of sequence.
    pub round: Option<i32>,
}

#[derive(Deserialize)]
pub struct RoundListQuery {
    pub submission_id: Uuid,
}

#[derive(Deserialize)]
pub struct CreateAssignmentRequest {
    pub submission_id: Uuid,
    pub reviewer_id: Uuid,
    /// Defaults to the latest open round for the submission.
    pub review_round_id: Option<Uuid>,
    pub date_due: Option<NaiveDateTime>,
}

#[derive(Deserialize)]
pub struct RespondRequest {
    pub declined: bool,
    pub comments: Option<String>,
}

#[derive(Deserialize)]
pub struct CompleteRequest {
    pub recommendation: String,
    pub comments: Option<String>,
}

#[derive(Serialize)]
pub struct RoundResponse {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub round: i32,
    pub status: String,
    pub created_at: String,
    pub existing: bool,
}

impl RoundResponse {
    pub fn from_row(round: ReviewRound, existing: bool) -> Self {
        Self {
            id: round.id,
            submission_id: round.submission_id,
            round: round.round,
            status: round.status,
            created_at: fmt_ts(round.created_at),
            existing,
        }
    }
}

#[derive(Serialize)]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub review_round_id: Uuid,
    pub reviewer_id: Uuid,
    pub status: String,
    pub declined: bool,
    pub date_assigned: String,
    pub date_due: Option<String>,
    pub date_confirmed: Option<String>,
    pub recommendation: Option<String>,
    pub comments: Option<String>,
}

impl From<ReviewAssignment> for AssignmentResponse {
    fn from(assignment: ReviewAssignment) -> Self {
        Self {
            id: assignment.id,
            submission_id: assignment.submission_id,
            review_round_id: assignment.review_round_id,
            reviewer_id: assignment.reviewer_id,
            status: assignment.status,
            declined: assignment.declined,
            date_assigned: fmt_ts(assignment.date_assigned),
            date_due: assignment.date_due.map(fmt_ts),
            date_confirmed: assignment.date_confirmed.map(fmt_ts),
            recommendation: assignment.recommendation,
            comments: assignment.comments,
        }
    }
}

/// Open a review round for a submission, or hand back the round that is
/// already open. Round insert, submission stage update, and the audit row
/// share one transaction so a failure cannot leave a round without the
/// matching stage change.
pub(crate) fn open_review_round(
    conn: &mut PgConnection,
    submission: &Submission,
    editor_id: Uuid,
    expected_round: Option<i32>,
) -> AppResult<(ReviewRound, bool)> {
    let now = Utc::now().naive_utc();

    conn.transaction::<(ReviewRound, bool), AppError, _>(|conn| {
        let latest: Option<ReviewRound> = review_rounds::table
            .filter(review_rounds::submission_id.eq(submission.id))
            .order(review_rounds::round.desc())
            .first(conn)
            .optional()?;

        // Duplicate "send to review" clicks land here: the open round is
        // returned unchanged instead of creating a sibling.
        if let Some(round) = latest.as_ref() {
            if round.status != ROUND_REVIEWS_COMPLETED {
                return Ok((round.clone(), true));
            }
        }

        let next_round = latest.as_ref().map(|round| round.round + 1).unwrap_or(1);
        if let Some(expected) = expected_round {
            if expected != next_round {
                return Err(AppError::bad_request(format!(
                    "round {expected} is out of sequence, next round is {next_round}"
                )));
            }
        }

        let new_round = NewReviewRound {
            id: Uuid::new_v4(),
            submission_id: submission.id,
            round: next_round,
            status: ROUND_PENDING_REVIEWERS.to_string(),
        };
        diesel::insert_into(review_rounds::table)
            .values(&new_round)
            .execute(conn)?;

        diesel::update(submissions::table.find(submission.id))
            .set((
                submissions::stage_id.eq(Stage::ExternalReview.id()),
                submissions::status.eq(Status::Queued.id()),
                submissions::current_round.eq(next_round),
                submissions::last_modified.eq(now),
                submissions::date_status_modified.eq(now),
            ))
            .execute(conn)?;

        audit::record_decision(
            conn,
            submission.id,
            editor_id,
            Some(new_round.id),
            next_round,
            Decision::SendToReview.as_str(),
        )
        .map_err(AppError::internal)?;

        let round: ReviewRound = review_rounds::table.find(new_round.id).first(conn)?;
        Ok((round, false))
    })
}

/// Mark a round completed once no assignment in it is still awaiting a
/// response or an accepted review. Declines count as resolved, so a round
/// whose every invitation was declined completes too.
fn settle_round_if_resolved(
    conn: &mut PgConnection,
    round_id: Uuid,
    now: NaiveDateTime,
) -> Result<(), diesel::result::Error> {
    let unresolved: i64 = review_assignments::table
        .filter(review_assignments::review_round_id.eq(round_id))
        .filter(review_assignments::status.ne(ASSIGNMENT_COMPLETE))
        .filter(review_assignments::status.ne(ASSIGNMENT_DECLINED))
        .count()
        .get_result(conn)?;

    if unresolved == 0 {
        diesel::update(review_rounds::table.find(round_id))
            .set((
                review_rounds::status.eq(ROUND_REVIEWS_COMPLETED),
                review_rounds::updated_at.eq(now),
            ))
            .execute(conn)?;
    }

    Ok(())
}

pub async fn create_round(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateRoundRequest>,
) -> AppResult<(StatusCode, Json<RoundResponse>)> {
    if !user.is_editor() {
        return Err(AppError::forbidden("only editors can open review rounds"));
    }

    let mut conn = state.db()?;
    let submission: Submission = submissions::table
        .find(payload.submission_id)
        .first(&mut conn)?;

    let (stage, status) = decode_workflow(&submission)?;
    workflow::validate_decision(stage, status, Decision::SendToReview)?;

    let (round, existing) =
        open_review_round(&mut conn, &submission, user.user_id, payload.round)?;

    if existing {
        info!(
            submission_id = %submission.id,
            round = round.round,
            "returning already-open review round"
        );
        return Ok((StatusCode::OK, Json(RoundResponse::from_row(round, true))));
    }

    info!(
        submission_id = %submission.id,
        round = round.round,
        editor = %user.username,
        "review round opened"
    );

    notifications::notify_best_effort(
        "round opened",
        notifications::notify_user(
            &mut conn,
            submission.author_id,
            Some(submission.id),
            KIND_REVIEW_ROUND_OPENED,
            &format!("\"{}\" entered review round {}", submission.title, round.round),
        ),
    );

    Ok((StatusCode::CREATED, Json(RoundResponse::from_row(round, false))))
}

pub async fn list_rounds(
    State(state): State<AppState>,
    Query(params): Query<RoundListQuery>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<RoundResponse>>> {
    let mut conn = state.db()?;

    let submission: Submission = submissions::table
        .find(params.submission_id)
        .first(&mut conn)?;

    if !can_view_submission(&mut conn, &user, &submission)? {
        return Err(AppError::forbidden("not a participant in this submission"));
    }

    let rounds: Vec<ReviewRound> = review_rounds::table
        .filter(review_rounds::submission_id.eq(params.submission_id))
        .order(review_rounds::round.asc())
        .load(&mut conn)?;

    Ok(Json(
        rounds
            .into_iter()
            .map(|round| RoundResponse::from_row(round, false))
            .collect(),
    ))
}

pub async fn create_assignment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateAssignmentRequest>,
) -> AppResult<(StatusCode, Json<AssignmentResponse>)> {
    if !user.is_editor() {
        return Err(AppError::forbidden("only editors can assign reviewers"));
    }

    let mut conn = state.db()?;
    let submission: Submission = submissions::table
        .find(payload.submission_id)
        .first(&mut conn)?;

    if payload.reviewer_id == submission.author_id {
        return Err(AppError::bad_request(
            "the submitting author cannot review their own submission",
        ));
    }

    let reviewer_exists: bool = diesel::select(diesel::dsl::exists(
        users::table.filter(users::id.eq(payload.reviewer_id)),
    ))
    .get_result(&mut conn)?;
    if !reviewer_exists {
        return Err(AppError::bad_request("reviewer does not exist"));
    }

    let round: ReviewRound = match payload.review_round_id {
        Some(round_id) => review_rounds::table.find(round_id).first(&mut conn)?,
        None => review_rounds::table
            .filter(review_rounds::submission_id.eq(submission.id))
            .order(review_rounds::round.desc())
            .first(&mut conn)?,
    };

    if round.submission_id != submission.id {
        return Err(AppError::bad_request(
            "review round does not belong to this submission",
        ));
    }
    if round.status == ROUND_REVIEWS_COMPLETED {
        return Err(AppError::bad_request(
            "cannot assign reviewers to a completed round",
        ));
    }

    // One invitation per reviewer per round. There is no database constraint
    // behind this, so the existence check runs before the insert.
    let already_assigned: bool = diesel::select(diesel::dsl::exists(
        review_assignments::table
            .filter(review_assignments::review_round_id.eq(round.id))
            .filter(review_assignments::reviewer_id.eq(payload.reviewer_id)),
    ))
    .get_result(&mut conn)?;
    if already_assigned {
        return Err(AppError::conflict(
            "reviewer is already assigned to this round",
        ));
    }

    let new_assignment = NewReviewAssignment {
        id: Uuid::new_v4(),
        submission_id: submission.id,
        review_round_id: round.id,
        reviewer_id: payload.reviewer_id,
        status: ASSIGNMENT_AWAITING_RESPONSE.to_string(),
        date_due: payload.date_due,
        declined: false,
    };
    diesel::insert_into(review_assignments::table)
        .values(&new_assignment)
        .execute(&mut conn)?;

    let assignment: ReviewAssignment = review_assignments::table
        .find(new_assignment.id)
        .first(&mut conn)?;

    info!(
        submission_id = %submission.id,
        reviewer_id = %payload.reviewer_id,
        round = round.round,
        "reviewer invited"
    );

    notifications::notify_best_effort(
        "review invitation",
        notifications::notify_user(
            &mut conn,
            payload.reviewer_id,
            Some(submission.id),
            KIND_REVIEW_INVITATION,
            &format!("you have been invited to review \"{}\"", submission.title),
        ),
    );

    Ok((StatusCode::CREATED, Json(assignment.into())))
}

/// A reviewer answers their invitation exactly once; editors may answer on
/// their behalf.
pub async fn respond_to_assignment(
    State(state): State<AppState>,
    Path(assignment_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<RespondRequest>,
) -> AppResult<Json<AssignmentResponse>> {
    let mut conn = state.db()?;

    let assignment: ReviewAssignment = review_assignments::table
        .find(assignment_id)
        .first(&mut conn)?;

    if assignment.reviewer_id != user.user_id && !user.is_editor() {
        return Err(AppError::forbidden(
            "only the assigned reviewer can respond to this invitation",
        ));
    }

    if assignment.date_confirmed.is_some() || assignment.declined {
        return Err(AppError::conflict("reviewer has already responded"));
    }

    let now = Utc::now().naive_utc();
    let new_status = if payload.declined {
        ASSIGNMENT_DECLINED
    } else {
        ASSIGNMENT_ACCEPTED
    };

    let updated = conn.transaction::<ReviewAssignment, AppError, _>(|conn| {
        diesel::update(review_assignments::table.find(assignment_id))
            .set((
                review_assignments::status.eq(new_status),
                review_assignments::declined.eq(payload.declined),
                review_assignments::date_confirmed.eq(now),
                review_assignments::comments.eq(payload
                    .comments
                    .as_deref()
                    .or(assignment.comments.as_deref())),
            ))
            .execute(conn)?;

        // First acceptance moves the round out of "pending reviewers". A
        // decline may instead have been the last unresolved assignment,
        // which settles the round.
        if !payload.declined {
            diesel::update(
                review_rounds::table
                    .find(assignment.review_round_id)
                    .filter(review_rounds::status.eq(ROUND_PENDING_REVIEWERS)),
            )
            .set((
                review_rounds::status.eq(ROUND_PENDING_REVIEWS),
                review_rounds::updated_at.eq(now),
            ))
            .execute(conn)?;
        } else {
            settle_round_if_resolved(conn, assignment.review_round_id, now)?;
        }

        let round: ReviewRound = review_rounds::table
            .find(assignment.review_round_id)
            .first(conn)?;
        let decision = if payload.declined {
            DECISION_REVIEW_DECLINED
        } else {
            DECISION_REVIEW_ACCEPTED
        };
        audit::record_decision(
            conn,
            assignment.submission_id,
            user.user_id,
            Some(round.id),
            round.round,
            decision,
        )
        .map_err(AppError::internal)?;

        let refreshed: ReviewAssignment =
            review_assignments::table.find(assignment_id).first(conn)?;
        Ok(refreshed)
    })?;

    info!(
        assignment_id = %assignment_id,
        declined = payload.declined,
        "reviewer responded"
    );

    notifications::notify_best_effort(
        "reviewer response",
        notifications::notify_editors(
            &mut conn,
            Some(assignment.submission_id),
            KIND_REVIEWER_RESPONDED,
            &format!(
                "reviewer {} the invitation for submission {}",
                if payload.declined { "declined" } else { "accepted" },
                assignment.submission_id
            ),
        ),
    );

    Ok(Json(updated.into()))
}

/// A reviewer files their review. When every assignment in the round has
/// resolved, the round advances to "reviews completed", which is what
/// allows the next round to be opened.
pub async fn complete_assignment(
    State(state): State<AppState>,
    Path(assignment_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<CompleteRequest>,
) -> AppResult<Json<AssignmentResponse>> {
    let recommendation = payload.recommendation.trim().to_string();
    if recommendation.is_empty() {
        return Err(AppError::bad_request("recommendation must not be empty"));
    }

    let mut conn = state.db()?;

    let assignment: ReviewAssignment = review_assignments::table
        .find(assignment_id)
        .first(&mut conn)?;

    if assignment.reviewer_id != user.user_id && !user.is_editor() {
        return Err(AppError::forbidden(
            "only the assigned reviewer can complete this review",
        ));
    }

    if assignment.status != ASSIGNMENT_ACCEPTED {
        return Err(AppError::conflict(
            "review can only be completed after the invitation was accepted",
        ));
    }

    let now = Utc::now().naive_utc();
    let updated = conn.transaction::<ReviewAssignment, AppError, _>(|conn| {
        diesel::update(review_assignments::table.find(assignment_id))
            .set((
                review_assignments::status.eq(ASSIGNMENT_COMPLETE),
                review_assignments::recommendation.eq(Some(recommendation.as_str())),
                review_assignments::comments.eq(payload
                    .comments
                    .as_deref()
                    .or(assignment.comments.as_deref())),
            ))
            .execute(conn)?;

        settle_round_if_resolved(conn, assignment.review_round_id, now)?;

        let refreshed: ReviewAssignment =
            review_assignments::table.find(assignment_id).first(conn)?;
        Ok(refreshed)
    })?;

    info!(
        assignment_id = %assignment_id,
        recommendation = %recommendation,
        "review completed"
    );

    notifications::notify_best_effort(
        "review completed",
        notifications::notify_editors(
            &mut conn,
            Some(assignment.submission_id),
            KIND_REVIEW_COMPLETED,
            &format!(
                "a review was completed for submission {}",
                assignment.submission_id
            ),
        ),
    );

    Ok(Json(updated.into()))
}
