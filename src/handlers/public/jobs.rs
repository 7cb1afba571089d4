use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::database::{Collection, Document, InsertOneResult};
use crate::error::ApiError;
use crate::filter::Filter;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct JobsQuery {
    pub email: Option<String>,
}

/// GET /jobs - All jobs, or only those posted by `?email=` (matched against `hr_email`)
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<JobsQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let filter = match query.email.filter(|e| !e.is_empty()) {
        Some(email) => Filter::new(json!({ "hr_email": email }))?,
        None => Filter::all(),
    };

    let jobs = state.store.find(Collection::Jobs, &filter).await?;
    Ok(Json(jobs))
}

/// GET /jobs/:id - One job, or `null` when absent
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Option<Document>>, ApiError> {
    let filter = Filter::by_id(&id)?;
    let job = state.store.find_one(Collection::Jobs, &filter).await?;
    Ok(Json(job))
}

/// POST /jobs - Store the body verbatim as a new job
pub async fn create(
    State(state): State<AppState>,
    Json(job): Json<Document>,
) -> Result<Json<InsertOneResult>, ApiError> {
    let result = state.store.insert_one(Collection::Jobs, job).await?;
    tracing::info!(job_id = %result.inserted_id, "job created");
    Ok(Json(result))
}
