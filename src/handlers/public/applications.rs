// handlers/public/applications.rs - Job application routes that do not check identity
//
// Creating an application also bumps `applicationCount` on the referenced job.
// The bump is best-effort: a missing or malformed `job_id` is logged and the
// insert result is returned unchanged.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::{
    Collection, DatabaseError, DeleteResult, Document, DocumentStore, InsertOneResult, UpdateResult,
};
use crate::error::ApiError;
use crate::filter::{Filter, Update};
use crate::state::AppState;

/// Counter on a job document tracking how many applications were submitted
pub const APPLICATION_COUNT_FIELD: &str = "applicationCount";

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub status: Value,
}

/// GET /job-application/:id - One application, or `null` when absent
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Option<Document>>, ApiError> {
    let filter = Filter::by_id(&id)?;
    let application = state.store.find_one(Collection::JobApplications, &filter).await?;
    Ok(Json(application))
}

/// GET /job-applications/jobs/:job_id - Applications whose `job_id` equals the path value
pub async fn list_by_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let filter = Filter::new(json!({ "job_id": job_id }))?;
    let applications = state.store.find(Collection::JobApplications, &filter).await?;
    Ok(Json(applications))
}

/// POST /job-applications - Store the application, then increment the job's counter
pub async fn create(
    State(state): State<AppState>,
    Json(application): Json<Document>,
) -> Result<Json<InsertOneResult>, ApiError> {
    let job_id = application.get("job_id").and_then(Value::as_str).map(str::to_owned);

    let result = state.store.insert_one(Collection::JobApplications, application).await?;
    tracing::info!(application_id = %result.inserted_id, "application created");

    match job_id {
        Some(job_id) => match increment_application_count(state.store.as_ref(), &job_id).await {
            Ok(update) if update.matched_count == 0 => {
                tracing::warn!(%job_id, "application references a job that does not exist");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(%job_id, error = %err, "failed to increment application count");
            }
        },
        None => tracing::debug!("application has no job_id; counter not updated"),
    }

    Ok(Json(result))
}

/// PATCH /job-applications/:id - Replace only the `status` field
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<UpdateResult>, ApiError> {
    let filter = Filter::by_id(&id)?;
    let update = Update::default().set("status", body.status)?;
    let result = state
        .store
        .update_one(Collection::JobApplications, &filter, &update)
        .await?;
    Ok(Json(result))
}

/// DELETE /job-application/:id
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResult>, ApiError> {
    let filter = Filter::by_id(&id)?;
    let result = state.store.delete_one(Collection::JobApplications, &filter).await?;
    Ok(Json(result))
}

/// Atomic `$inc` of the job's counter; a job without the field starts from 0.
pub async fn increment_application_count(
    store: &dyn DocumentStore,
    job_id: &str,
) -> Result<UpdateResult, DatabaseError> {
    let filter = Filter::by_id(job_id)?;
    let update = Update::default().inc(APPLICATION_COUNT_FIELD, 1)?;
    store.update_one(Collection::Jobs, &filter, &update).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDocumentStore;

    #[tokio::test]
    async fn counter_starts_from_zero_and_accumulates() {
        let store = MemoryDocumentStore::new();
        let job = json!({ "title": "Backend" }).as_object().cloned().unwrap();
        let id = store.insert_one(Collection::Jobs, job).await.unwrap().inserted_id;

        increment_application_count(&store, &id).await.unwrap();
        increment_application_count(&store, &id).await.unwrap();

        let job = store
            .find_one(Collection::Jobs, &Filter::by_id(&id).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job[APPLICATION_COUNT_FIELD], json!(2));
    }

    #[tokio::test]
    async fn malformed_job_id_is_an_error() {
        let store = MemoryDocumentStore::new();
        assert!(increment_application_count(&store, "not-an-id").await.is_err());
    }

    #[test]
    fn missing_status_deserializes_as_null() {
        let body: StatusUpdate = serde_json::from_value(json!({ "other": 1 })).unwrap();
        assert_eq!(body.status, Value::Null);
    }
}
