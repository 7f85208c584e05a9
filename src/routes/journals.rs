use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::models::{Journal, NewJournal};
use crate::schema::journals;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateJournalRequest {
    pub path: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateJournalRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct JournalResponse {
    pub id: Uuid,
    pub path: String,
    pub name: String,
    pub description: Option<String>,
}

impl From<Journal> for JournalResponse {
    fn from(journal: Journal) -> Self {
        Self {
            id: journal.id,
            path: journal.path,
            name: journal.name,
            description: journal.description,
        }
    }
}

pub async fn list_journals(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<JournalResponse>>> {
    let mut conn = state.db()?;
    let rows: Vec<Journal> = journals::table.order(journals::name.asc()).load(&mut conn)?;
    Ok(Json(rows.into_iter().map(JournalResponse::from).collect()))
}

pub async fn create_journal(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateJournalRequest>,
) -> AppResult<(StatusCode, Json<JournalResponse>)> {
    if !user.is_editor() {
        return Err(AppError::forbidden("only editors can create journals"));
    }

    let path = payload.path.trim().to_lowercase();
    if path.is_empty() {
        return Err(AppError::bad_request("path must not be empty"));
    }
    if payload.name.trim().is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }

    let new_journal = NewJournal {
        id: Uuid::new_v4(),
        path,
        name: payload.name.trim().to_string(),
        description: payload.description,
    };

    let mut conn = state.db()?;
    match diesel::insert_into(journals::table)
        .values(&new_journal)
        .execute(&mut conn)
    {
        Ok(_) => {}
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => {
            return Err(AppError::bad_request("journal path already exists"));
        }
        Err(err) => return Err(AppError::from(err)),
    }

    let journal: Journal = journals::table.find(new_journal.id).first(&mut conn)?;
    Ok((StatusCode::CREATED, Json(journal.into())))
}

pub async fn update_journal(
    State(state): State<AppState>,
    Path(journal_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateJournalRequest>,
) -> AppResult<Json<JournalResponse>> {
    if !user.is_editor() {
        return Err(AppError::forbidden("only editors can update journals"));
    }

    let mut conn = state.db()?;
    let existing: Journal = journals::table.find(journal_id).first(&mut conn)?;

    let new_name = match payload.name {
        Some(ref name) => {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(AppError::bad_request("name must not be empty"));
            }
            Some(trimmed.to_string())
        }
        None => None,
    };

    if new_name.is_none() && payload.description.is_none() {
        return Ok(Json(existing.into()));
    }

    let now = chrono::Utc::now().naive_utc();
    diesel::update(journals::table.find(journal_id))
        .set((
            journals::name.eq(new_name.unwrap_or(existing.name)),
            journals::description.eq(payload.description.or(existing.description)),
            journals::updated_at.eq(now),
        ))
        .execute(&mut conn)?;

    let updated: Journal = journals::table.find(journal_id).first(&mut conn)?;
    Ok(Json(updated.into()))
}
