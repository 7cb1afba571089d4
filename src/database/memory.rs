use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::store::{
    Collection, DeleteResult, Document, DocumentStore, InsertOneResult, UpdateResult,
};
use crate::filter::{Filter, FilterError, Update, ID_FIELD};

/// In-process document store. Documents keep insertion order.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    async fn insert_one(&self, collection: Collection, mut doc: Document) -> Result<InsertOneResult, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));

        let mut collections = self.collections.write().await;
        collections.entry(collection).or_default().push(doc);

        Ok(InsertOneResult {
            acknowledged: true,
            inserted_id: id,
        })
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> Result<UpdateResult, DatabaseError> {
        if update.is_empty() {
            return Err(FilterError::InvalidUpdate("update document is empty".to_string()).into());
        }

        let mut collections = self.collections.write().await;
        let target = collections
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|d| filter.matches(d)));

        match target {
            Some(doc) => {
                let modified = update.apply(doc)?;
                Ok(UpdateResult::new(1, u64::from(modified)))
            }
            None => Ok(UpdateResult::new(0, 0)),
        }
    }

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> Result<DeleteResult, DatabaseError> {
        let mut collections = self.collections.write().await;
        let deleted = match collections.get_mut(&collection) {
            Some(docs) => match docs.iter().position(|d| filter.matches(d)) {
                Some(index) => {
                    docs.remove(index);
                    1
                }
                None => 0,
            },
            None => 0,
        };

        Ok(DeleteResult {
            acknowledged: true,
            deleted_count: deleted,
        })
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_fresh_id() {
        let store = MemoryDocumentStore::new();
        let result = store
            .insert_one(Collection::Jobs, doc(json!({ "_id": "client-chosen", "title": "Rust dev" })))
            .await
            .unwrap();
        assert!(result.acknowledged);
        assert!(Uuid::parse_str(&result.inserted_id).is_ok());

        let found = store
            .find_one(Collection::Jobs, &Filter::by_id(&result.inserted_id).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found["title"], json!("Rust dev"));
        assert_eq!(found["_id"], json!(result.inserted_id));
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let store = MemoryDocumentStore::new();
        store.insert_one(Collection::Jobs, doc(json!({ "a": 1 }))).await.unwrap();
        let apps = store.find(Collection::JobApplications, &Filter::all()).await.unwrap();
        assert!(apps.is_empty());
    }

    #[tokio::test]
    async fn find_preserves_insertion_order() {
        let store = MemoryDocumentStore::new();
        for n in 0..5 {
            store
                .insert_one(Collection::Jobs, doc(json!({ "n": n, "hr_email": "hr@example.com" })))
                .await
                .unwrap();
        }
        let filter = Filter::new(json!({ "hr_email": "hr@example.com" })).unwrap();
        let found = store.find(Collection::Jobs, &filter).await.unwrap();
        let ns: Vec<i64> = found.iter().map(|d| d["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn update_reports_matched_and_modified() {
        let store = MemoryDocumentStore::new();
        let id = store
            .insert_one(Collection::JobApplications, doc(json!({ "status": "pending" })))
            .await
            .unwrap()
            .inserted_id;
        let filter = Filter::by_id(&id).unwrap();
        let update = Update::default().set("status", json!("accepted")).unwrap();

        let first = store.update_one(Collection::JobApplications, &filter, &update).await.unwrap();
        assert_eq!((first.matched_count, first.modified_count), (1, 1));

        let again = store.update_one(Collection::JobApplications, &filter, &update).await.unwrap();
        assert_eq!((again.matched_count, again.modified_count), (1, 0));

        let missing = Filter::by_id(&Uuid::new_v4().to_string()).unwrap();
        let none = store.update_one(Collection::JobApplications, &missing, &update).await.unwrap();
        assert_eq!((none.matched_count, none.modified_count), (0, 0));
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let store = MemoryDocumentStore::new();
        let err = store
            .update_one(Collection::Jobs, &Filter::all(), &Update::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Filter(FilterError::InvalidUpdate(_))));
    }

    #[tokio::test]
    async fn delete_removes_only_first_match() {
        let store = MemoryDocumentStore::new();
        store.insert_one(Collection::Jobs, doc(json!({ "k": "x" }))).await.unwrap();
        store.insert_one(Collection::Jobs, doc(json!({ "k": "x" }))).await.unwrap();
        let filter = Filter::new(json!({ "k": "x" })).unwrap();

        let result = store.delete_one(Collection::Jobs, &filter).await.unwrap();
        assert_eq!(result.deleted_count, 1);
        assert_eq!(store.find(Collection::Jobs, &filter).await.unwrap().len(), 1);

        let missing = Filter::by_id(&Uuid::new_v4().to_string()).unwrap();
        assert_eq!(store.delete_one(Collection::Jobs, &missing).await.unwrap().deleted_count, 0);
    }
}
