//! Workflow stage/status model and the editorial decision validator.
//!
//! Stage and status integers mirror the OJS workflow codes so existing
//! clients and exported data stay compatible. Everything in this module is
//! pure; the database writes that realize an accepted decision live in the
//! route handlers.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Coarse workflow phase a submission occupies. `2` is the OJS internal
/// review stage, which this platform does not run; decoding treats it like
/// any other unknown integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum Stage {
    Submission = 1,
    ExternalReview = 3,
    Editing = 4,
    Production = 5,
}

impl Stage {
    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn from_id(id: i32) -> Option<Stage> {
        match id {
            1 => Some(Stage::Submission),
            3 => Some(Stage::ExternalReview),
            4 => Some(Stage::Editing),
            5 => Some(Stage::Production),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Submission => "submission",
            Stage::ExternalReview => "external_review",
            Stage::Editing => "editing",
            Stage::Production => "production",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Display name for a stored stage integer. Out-of-range input is reported
/// as "unknown" rather than an error.
pub fn stage_label(id: i32) -> &'static str {
    Stage::from_id(id).map(Stage::label).unwrap_or("unknown")
}

/// Fine-grained submission state, orthogonal to the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum Status {
    Queued = 1,
    Published = 3,
    Declined = 4,
    Scheduled = 5,
}

impl Status {
    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn from_id(id: i32) -> Option<Status> {
        match id {
            1 => Some(Status::Queued),
            3 => Some(Status::Published),
            4 => Some(Status::Declined),
            5 => Some(Status::Scheduled),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Queued => "queued",
            Status::Published => "published",
            Status::Declined => "declined",
            Status::Scheduled => "scheduled",
        }
    }

    /// Normalize a legacy string status to its integer code. Performed once
    /// at the ingestion boundary; integers are the wire format everywhere
    /// else. Unrecognized values fall back to Queued, with a warning so
    /// data-entry mistakes stay visible.
    pub fn from_legacy(value: &str) -> Status {
        match value.trim().to_lowercase().as_str() {
            "queued" | "under_review" | "in_review" | "revision_required" | "accepted"
            | "copyediting" | "production" => Status::Queued,
            "published" => Status::Published,
            "declined" | "rejected" | "withdrawn" => Status::Declined,
            "scheduled" => Status::Scheduled,
            other => {
                warn!(status = %other, "unrecognized legacy status, defaulting to queued");
                Status::Queued
            }
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Review round lifecycle.
pub const ROUND_PENDING_REVIEWERS: &str = "pending_reviewers";
pub const ROUND_PENDING_REVIEWS: &str = "pending_reviews";
pub const ROUND_REVIEWS_COMPLETED: &str = "reviews_completed";

// Review assignment lifecycle.
pub const ASSIGNMENT_AWAITING_RESPONSE: &str = "awaiting_response";
pub const ASSIGNMENT_ACCEPTED: &str = "accepted";
pub const ASSIGNMENT_COMPLETE: &str = "complete";
pub const ASSIGNMENT_DECLINED: &str = "declined";

/// An editorial decision an editor can request against a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    SendToReview,
    Accept,
    Decline,
    RequestRevisions,
    SendToProduction,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::SendToReview => "send_to_review",
            Decision::Accept => "accept",
            Decision::Decline => "decline",
            Decision::RequestRevisions => "request_revisions",
            Decision::SendToProduction => "send_to_production",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = DecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "send_to_review" => Ok(Decision::SendToReview),
            "accept" => Ok(Decision::Accept),
            "decline" => Ok(Decision::Decline),
            "request_revisions" => Ok(Decision::RequestRevisions),
            "send_to_production" => Ok(Decision::SendToProduction),
            other => Err(DecisionError::UnknownDecision(other.to_string())),
        }
    }
}

/// Why a requested decision was rejected. `code()` is a stable identifier
/// intended for programmatic handling by clients, not just display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecisionError {
    #[error("decision {decision} is not allowed from the {stage} stage")]
    InvalidStage { decision: Decision, stage: Stage },
    #[error("submission has been declined")]
    SubmissionDeclined,
    #[error("submission is already declined")]
    AlreadyDeclined,
    #[error("no open review round exists for this submission")]
    MissingReviewRound,
    #[error("unknown editorial decision '{0}'")]
    UnknownDecision(String),
}

impl DecisionError {
    pub fn code(&self) -> &'static str {
        match self {
            DecisionError::InvalidStage { .. } => "INVALID_STAGE",
            DecisionError::SubmissionDeclined => "SUBMISSION_DECLINED",
            DecisionError::AlreadyDeclined => "ALREADY_DECLINED",
            DecisionError::MissingReviewRound => "MISSING_REVIEW_ROUND",
            DecisionError::UnknownDecision(_) => "UNKNOWN_DECISION",
        }
    }
}

/// Decide whether `decision` is legal for a submission currently at
/// (`stage`, `status`). Declined is terminal: nothing is permitted from it,
/// and a repeated decline reports `ALREADY_DECLINED`. A published submission
/// sits in the Production stage, which no decision accepts, so it is
/// rejected through the stage gate.
pub fn validate_decision(
    stage: Stage,
    status: Status,
    decision: Decision,
) -> Result<(), DecisionError> {
    if status == Status::Declined {
        return Err(match decision {
            Decision::Decline => DecisionError::AlreadyDeclined,
            _ => DecisionError::SubmissionDeclined,
        });
    }

    let stage_ok = match decision {
        // Permitted while already in review so a repeated request resolves
        // to the currently open round instead of an error.
        Decision::SendToReview => {
            matches!(stage, Stage::Submission | Stage::ExternalReview)
        }
        Decision::Accept | Decision::Decline => {
            matches!(stage, Stage::Submission | Stage::ExternalReview)
        }
        Decision::RequestRevisions => stage == Stage::ExternalReview,
        Decision::SendToProduction => stage == Stage::Editing,
    };

    if !stage_ok {
        return Err(DecisionError::InvalidStage { decision, stage });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_DECISIONS: [Decision; 5] = [
        Decision::SendToReview,
        Decision::Accept,
        Decision::Decline,
        Decision::RequestRevisions,
        Decision::SendToProduction,
    ];

    #[test]
    fn send_to_review_allowed_before_and_during_review() {
        for stage in [Stage::Submission, Stage::ExternalReview] {
            assert!(validate_decision(stage, Status::Queued, Decision::SendToReview).is_ok());
        }
        for stage in [Stage::Editing, Stage::Production] {
            let err = validate_decision(stage, Status::Queued, Decision::SendToReview).unwrap_err();
            assert_eq!(err.code(), "INVALID_STAGE");
        }
    }

    #[test]
    fn accept_and_decline_allowed_from_submission_and_review() {
        for stage in [Stage::Submission, Stage::ExternalReview] {
            assert!(validate_decision(stage, Status::Queued, Decision::Accept).is_ok());
            assert!(validate_decision(stage, Status::Queued, Decision::Decline).is_ok());
        }
        for stage in [Stage::Editing, Stage::Production] {
            assert!(validate_decision(stage, Status::Queued, Decision::Accept).is_err());
            assert!(validate_decision(stage, Status::Queued, Decision::Decline).is_err());
        }
    }

    #[test]
    fn request_revisions_only_during_review() {
        assert!(
            validate_decision(Stage::ExternalReview, Status::Queued, Decision::RequestRevisions)
                .is_ok()
        );
        let err = validate_decision(Stage::Submission, Status::Queued, Decision::RequestRevisions)
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_STAGE");
    }

    #[test]
    fn send_to_production_only_from_editing() {
        assert!(
            validate_decision(Stage::Editing, Status::Queued, Decision::SendToProduction).is_ok()
        );
        for stage in [Stage::Submission, Stage::ExternalReview, Stage::Production] {
            assert!(validate_decision(stage, Status::Queued, Decision::SendToProduction).is_err());
        }
    }

    #[test]
    fn declined_is_terminal_for_every_decision() {
        for stage in [
            Stage::Submission,
            Stage::ExternalReview,
            Stage::Editing,
            Stage::Production,
        ] {
            for decision in ALL_DECISIONS {
                let err = validate_decision(stage, Status::Declined, decision).unwrap_err();
                let expected = if decision == Decision::Decline {
                    "ALREADY_DECLINED"
                } else {
                    "SUBMISSION_DECLINED"
                };
                assert_eq!(err.code(), expected, "{decision} from {stage}");
            }
        }
    }

    #[test]
    fn published_submission_rejects_all_decisions() {
        // A published submission lives in the Production stage.
        for decision in ALL_DECISIONS {
            assert!(validate_decision(Stage::Production, Status::Published, decision).is_err());
        }
    }

    #[test]
    fn unknown_decision_string_is_rejected() {
        let err = "fast_track".parse::<Decision>().unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_DECISION");
        assert!(err.to_string().contains("fast_track"));
    }

    #[test]
    fn decision_round_trips_through_strings() {
        for decision in ALL_DECISIONS {
            assert_eq!(decision.as_str().parse::<Decision>().unwrap(), decision);
        }
    }

    #[test]
    fn stage_label_handles_unknown_ids() {
        assert_eq!(stage_label(1), "submission");
        assert_eq!(stage_label(3), "external_review");
        assert_eq!(stage_label(2), "unknown");
        assert_eq!(stage_label(0), "unknown");
        assert_eq!(stage_label(99), "unknown");
    }

    #[test]
    fn legacy_statuses_map_to_integer_codes() {
        assert_eq!(Status::from_legacy("under_review"), Status::Queued);
        assert_eq!(Status::from_legacy("revision_required"), Status::Queued);
        assert_eq!(Status::from_legacy("Published"), Status::Published);
        assert_eq!(Status::from_legacy("rejected"), Status::Declined);
        assert_eq!(Status::from_legacy("withdrawn"), Status::Declined);
        assert_eq!(Status::from_legacy("scheduled"), Status::Scheduled);
    }

    #[test]
    fn unrecognized_legacy_status_defaults_to_queued() {
        assert_eq!(Status::from_legacy("totally-bogus"), Status::Queued);
        assert_eq!(Status::from_legacy(""), Status::Queued);
    }

    #[test]
    fn stage_and_status_ids_survive_decoding() {
        for stage in [
            Stage::Submission,
            Stage::ExternalReview,
            Stage::Editing,
            Stage::Production,
        ] {
            assert_eq!(Stage::from_id(stage.id()), Some(stage));
        }
        for status in [
            Status::Queued,
            Status::Published,
            Status::Declined,
            Status::Scheduled,
        ] {
            assert_eq!(Status::from_id(status.id()), Some(status));
        }
        assert_eq!(Status::from_id(2), None);
    }
}
