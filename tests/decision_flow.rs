mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_vec, TestApp};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Deserialize)]
struct SubmissionBody {
    id: Uuid,
    stage_id: i32,
    status: i32,
}

#[derive(Deserialize)]
struct RoundBody {
    id: Uuid,
    round: i32,
    status: String,
}

#[derive(Deserialize)]
struct DecisionOutcome {
    submission: SubmissionBody,
    round: Option<RoundBody>,
}

#[derive(Deserialize)]
struct AssignmentBody {
    id: Uuid,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[allow(dead_code)]
    error: String,
    code: Option<String>,
}

struct Fixture {
    app: TestApp,
    editor_token: String,
    author_token: String,
    reviewer_id: Uuid,
    reviewer_token: String,
    submission_id: Uuid,
}

async fn fixture() -> Result<Fixture> {
    let app = TestApp::new().await?;

    app.insert_user("editor", "editorpass", "editor").await?;
    app.insert_user("author", "authorpass", "author").await?;
    let reviewer_id = app.insert_user("reviewer", "reviewerpass", "reviewer").await?;
    let journal_id = app.insert_journal("acta", "Acta Informatica").await?;

    let editor_token = app.login_token("editor", "editorpass").await?;
    let author_token = app.login_token("author", "authorpass").await?;
    let reviewer_token = app.login_token("reviewer", "reviewerpass").await?;

    let response = app
        .post_json(
            "/api/submissions",
            &json!({ "journal_id": journal_id, "title": "A Fixture Paper" }),
            Some(&author_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_vec(response.into_body()).await?;
    let submission: SubmissionBody = serde_json::from_slice(&body)?;

    Ok(Fixture {
        app,
        editor_token,
        author_token,
        reviewer_id,
        reviewer_token,
        submission_id: submission.id,
    })
}

async fn decide(
    fx: &Fixture,
    decision: &str,
) -> Result<(StatusCode, Option<DecisionOutcome>, Option<ErrorBody>)> {
    let response = fx
        .app
        .post_json(
            &format!("/api/submissions/{}/decision", fx.submission_id),
            &json!({ "decision": decision }),
            Some(&fx.editor_token),
        )
        .await?;
    let status = response.status();
    let body = body_to_vec(response.into_body()).await?;
    if status == StatusCode::OK {
        Ok((status, Some(serde_json::from_slice(&body)?), None))
    } else {
        Ok((status, None, Some(serde_json::from_slice(&body)?)))
    }
}

#[tokio::test]
async fn decisions_outside_their_stage_are_rejected() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let fx = fixture().await?;

    // Fresh submission: production and revisions are out of reach.
    for decision in ["send_to_production", "request_revisions"] {
        let (status, _, error) = decide(&fx, decision).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{decision}");
        assert_eq!(error.unwrap().code.as_deref(), Some("INVALID_STAGE"));
    }

    fx.app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn unknown_decisions_are_rejected() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let fx = fixture().await?;

    let (status, _, error) = decide(&fx, "fast_track").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error.unwrap().code.as_deref(), Some("UNKNOWN_DECISION"));

    fx.app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn accept_moves_submission_through_editing_to_production() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let fx = fixture().await?;

    let (status, outcome, _) = decide(&fx, "accept").await?;
    assert_eq!(status, StatusCode::OK);
    let outcome = outcome.unwrap();
    assert_eq!(outcome.submission.stage_id, 4);
    assert!(outcome.round.is_none());

    let (status, outcome, _) = decide(&fx, "send_to_production").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome.unwrap().submission.stage_id, 5);

    // No way back into review from production.
    let (status, _, error) = decide(&fx, "send_to_review").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error.unwrap().code.as_deref(), Some("INVALID_STAGE"));

    fx.app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn request_revisions_reopens_the_current_round() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let fx = fixture().await?;

    let (status, outcome, _) = decide(&fx, "send_to_review").await?;
    assert_eq!(status, StatusCode::OK);
    let opened = outcome.unwrap().round.unwrap();

    // Reviewer accepts, moving the round to pending_reviews.
    let response = fx
        .app
        .post_json(
            "/api/reviews/assignments",
            &json!({ "submission_id": fx.submission_id, "reviewer_id": fx.reviewer_id }),
            Some(&fx.editor_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_vec(response.into_body()).await?;
    let assignment: AssignmentBody = serde_json::from_slice(&body)?;

    let response = fx
        .app
        .patch_json(
            &format!("/api/reviews/{}/respond", assignment.id),
            &json!({ "declined": false }),
            Some(&fx.reviewer_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let (status, outcome, _) = decide(&fx, "request_revisions").await?;
    assert_eq!(status, StatusCode::OK);
    let outcome = outcome.unwrap();
    assert_eq!(outcome.submission.stage_id, 3);
    let reopened = outcome.round.unwrap();
    assert_eq!(reopened.id, opened.id);
    assert_eq!(reopened.round, 1);
    assert_eq!(reopened.status, "pending_reviewers");

    fx.app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn request_revisions_requires_an_open_round() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let fx = fixture().await?;

    decide(&fx, "send_to_review").await?;

    let response = fx
        .app
        .post_json(
            "/api/reviews/assignments",
            &json!({ "submission_id": fx.submission_id, "reviewer_id": fx.reviewer_id }),
            Some(&fx.editor_token),
        )
        .await?;
    let body = body_to_vec(response.into_body()).await?;
    let assignment: AssignmentBody = serde_json::from_slice(&body)?;

    fx.app
        .patch_json(
            &format!("/api/reviews/{}/respond", assignment.id),
            &json!({ "declined": false }),
            Some(&fx.reviewer_token),
        )
        .await?;
    let response = fx
        .app
        .post_json(
            &format!("/api/reviews/{}/complete", assignment.id),
            &json!({ "recommendation": "major_revisions" }),
            Some(&fx.reviewer_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // The round completed, so there is nothing left to reopen.
    let (status, _, error) = decide(&fx, "request_revisions").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error.unwrap().code.as_deref(), Some("MISSING_REVIEW_ROUND"));

    fx.app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn unknown_submission_is_a_404() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let fx = fixture().await?;

    let response = fx
        .app
        .post_json(
            &format!("/api/submissions/{}/decision", Uuid::new_v4()),
            &json!({ "decision": "accept" }),
            Some(&fx.editor_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    fx.app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn decision_log_is_visible_on_the_submission() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let fx = fixture().await?;

    decide(&fx, "send_to_review").await?;
    decide(&fx, "accept").await?;

    #[derive(Deserialize)]
    struct DecisionEntry {
        decision: String,
        round: i32,
    }
    #[derive(Deserialize)]
    struct Detail {
        decisions: Vec<DecisionEntry>,
    }

    let response = fx
        .app
        .get(
            &format!("/api/submissions/{}", fx.submission_id),
            Some(&fx.author_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let detail: Detail = serde_json::from_slice(&body)?;

    assert_eq!(detail.decisions.len(), 2);
    assert_eq!(detail.decisions[0].decision, "send_to_review");
    assert_eq!(detail.decisions[0].round, 1);
    assert_eq!(detail.decisions[1].decision, "accept");

    // A reviewer with no assignment cannot see the submission.
    let response = fx
        .app
        .get(
            &format!("/api/submissions/{}", fx.submission_id),
            Some(&fx.reviewer_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    fx.app.cleanup().await?;
    Ok(())
}
