use axum::{
    extract::{Query, State},
    Extension, Json,
};
use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::{Collection, Document, DocumentStore};
use crate::error::ApiError;
use crate::filter::Filter;
use crate::middleware::AuthUser;
use crate::state::AppState;

/// Job fields copied onto each application in the applicant listing
pub const JOB_SUMMARY_FIELDS: [&str; 7] = [
    "title",
    "location",
    "jobType",
    "salaryRange",
    "applicationDeadline",
    "company",
    "company_logo",
];

#[derive(Debug, Default, Deserialize)]
pub struct ApplicantQuery {
    pub email: Option<String>,
}

/// GET /job-application?email= - The caller's own applications, each enriched
/// with a summary of the job it references
pub async fn list_by_applicant(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ApplicantQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    user.require_owner(query.email.as_deref())?;

    let filter = Filter::new(json!({ "applicant_email": user.email }))?;
    let applications = state.store.find(Collection::JobApplications, &filter).await?;

    let store = state.store.as_ref();
    let enriched = try_join_all(applications.into_iter().map(|app| enrich(store, app))).await?;
    Ok(Json(enriched))
}

async fn enrich(store: &dyn DocumentStore, mut application: Document) -> Result<Document, ApiError> {
    // A job_id that is absent, not a string, or not a valid id leaves the application as is
    let filter = match application.get("job_id").and_then(Value::as_str).map(Filter::by_id) {
        Some(Ok(filter)) => filter,
        _ => return Ok(application),
    };

    if let Some(job) = store.find_one(Collection::Jobs, &filter).await? {
        merge_job_summary(&mut application, &job);
    }
    Ok(application)
}

/// Replaces the summary fields of `application` with the job's. A field the job
/// lacks is dropped from the application as well.
pub fn merge_job_summary(application: &mut Document, job: &Document) {
    for field in JOB_SUMMARY_FIELDS {
        match job.get(field) {
            Some(value) => application.insert(field.to_string(), value.clone()),
            None => application.remove(field),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn merge_copies_only_summary_fields() {
        let mut application = doc(json!({ "_id": "a1", "job_id": "j1", "title": "stale" }));
        let job = doc(json!({
            "_id": "j1",
            "title": "Rust Engineer",
            "company": "Acme",
            "hr_email": "hr@acme.test",
            "applicationCount": 3
        }));

        merge_job_summary(&mut application, &job);

        assert_eq!(application["title"], json!("Rust Engineer"));
        assert_eq!(application["company"], json!("Acme"));
        assert_eq!(application["_id"], json!("a1"));
        assert!(!application.contains_key("hr_email"));
        assert!(!application.contains_key("applicationCount"));
        assert!(!application.contains_key("location"));
    }

    #[test]
    fn summary_field_missing_on_job_is_dropped() {
        let mut application = doc(json!({ "job_id": "j1", "location": "stale", "status": "pending" }));
        let job = doc(json!({ "title": "Rust Engineer" }));

        merge_job_summary(&mut application, &job);

        assert!(!application.contains_key("location"));
        assert_eq!(application["title"], json!("Rust Engineer"));
        assert_eq!(application["status"], json!("pending"));
    }

    #[tokio::test]
    async fn invalid_job_reference_is_left_unenriched() {
        let store = crate::database::MemoryDocumentStore::new();
        let application = doc(json!({ "job_id": "nonsense", "applicant_email": "a@b.c" }));
        let result = enrich(&store, application.clone()).await.unwrap();
        assert_eq!(result, application);
    }
}
