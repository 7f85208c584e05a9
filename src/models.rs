use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = journals)]
pub struct Journal {
    pub id: Uuid,
    pub path: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = journals)]
pub struct NewJournal {
    pub id: Uuid,
    pub path: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = submissions)]
#[diesel(belongs_to(Journal))]
pub struct Submission {
    pub id: Uuid,
    pub journal_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub abstract_text: Option<String>,
    pub stage_id: i32,
    pub status: i32,
    pub current_round: i32,
    pub date_submitted: NaiveDateTime,
    pub last_modified: NaiveDateTime,
    pub date_status_modified: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = submissions)]
pub struct NewSubmission {
    pub id: Uuid,
    pub journal_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub abstract_text: Option<String>,
    pub stage_id: i32,
    pub status: i32,
    pub current_round: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = review_rounds)]
#[diesel(belongs_to(Submission))]
pub struct ReviewRound {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub round: i32,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = review_rounds)]
pub struct NewReviewRound {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub round: i32,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = review_assignments)]
#[diesel(belongs_to(ReviewRound))]
#[diesel(belongs_to(Submission))]
pub struct ReviewAssignment {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub review_round_id: Uuid,
    pub reviewer_id: Uuid,
    pub status: String,
    pub date_assigned: NaiveDateTime,
    pub date_due: Option<NaiveDateTime>,
    pub date_confirmed: Option<NaiveDateTime>,
    pub declined: bool,
    pub recommendation: Option<String>,
    pub comments: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = review_assignments)]
pub struct NewReviewAssignment {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub review_round_id: Uuid,
    pub reviewer_id: Uuid,
    pub status: String,
    pub date_due: Option<NaiveDateTime>,
    pub declined: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = editorial_decisions)]
#[diesel(belongs_to(Submission))]
pub struct EditorialDecision {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub editor_id: Uuid,
    pub review_round_id: Option<Uuid>,
    pub round: i32,
    pub decision: String,
    pub date_decided: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = editorial_decisions)]
pub struct NewEditorialDecision {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub editor_id: Uuid,
    pub review_round_id: Option<Uuid>,
    pub round: i32,
    pub decision: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = publications)]
#[diesel(belongs_to(Submission))]
pub struct Publication {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub version: i32,
    pub title: String,
    pub abstract_text: Option<String>,
    pub status: i32,
    pub date_published: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = publications)]
pub struct NewPublication {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub version: i32,
    pub title: String,
    pub abstract_text: Option<String>,
    pub status: i32,
    pub date_published: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = notifications)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub submission_id: Option<Uuid>,
    pub kind: String,
    pub message: String,
    pub read_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub submission_id: Option<Uuid>,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = refresh_tokens)]
#[diesel(belongs_to(User))]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    pub revoked_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = refresh_tokens)]
pub struct NewRefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}
