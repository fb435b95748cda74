// 🗄️ Store - where validated entities live between requests
//
// The engine never touches a store. Calling code (service layer, HTTP
// handlers, CLI) inserts pipeline results and replaces them by identity.

use crate::error::{EngineError, Result, ValidationReport, Violation};
use crate::schema::Entity;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// An entity with a stable identity
pub trait Identified: Entity {
    type Id: Clone + PartialEq + fmt::Display + Send + Sync;

    fn identity(&self) -> Self::Id;
}

/// Storage collaborator
pub trait Store<E: Identified> {
    /// Add a new entity; an identity already present is a constraint
    /// violation at `id`
    fn insert(&self, entity: E) -> Result<E::Id>;

    fn find<P>(&self, predicate: P) -> Option<E>
    where
        P: Fn(&E) -> bool;

    /// Replace by identity; `NotFound` when nothing has that id
    fn replace(&self, id: &E::Id, entity: E) -> Result<()>;

    fn all(&self) -> Vec<E>;

    fn get(&self, id: &E::Id) -> Option<E> {
        self.find(|e| e.identity() == *id)
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// In-memory store. Clones share the same underlying collection.
#[derive(Debug)]
pub struct MemoryStore<E> {
    entities: Arc<RwLock<Vec<E>>>,
}

impl<E> MemoryStore<E> {
    pub fn new() -> Self {
        MemoryStore {
            entities: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn count(&self) -> usize {
        self.entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn clear(&self) {
        self.entities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<E> Clone for MemoryStore<E> {
    fn clone(&self) -> Self {
        MemoryStore {
            entities: Arc::clone(&self.entities),
        }
    }
}

impl<E> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Identified> Store<E> for MemoryStore<E> {
    fn insert(&self, entity: E) -> Result<E::Id> {
        let id = entity.identity();
        let mut entities = self.entities.write().unwrap_or_else(PoisonError::into_inner);
        if entities.iter().any(|e| e.identity() == id) {
            return Err(ValidationReport::fields(
                E::NAME,
                vec![Violation::constraint(
                    "id",
                    format!("{} with id {} already exists", E::NAME, id),
                )],
            )
            .into());
        }
        entities.push(entity);
        Ok(id)
    }

    fn find<P>(&self, predicate: P) -> Option<E>
    where
        P: Fn(&E) -> bool,
    {
        self.entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|e| predicate(e))
            .cloned()
    }

    fn replace(&self, id: &E::Id, entity: E) -> Result<()> {
        let mut entities = self.entities.write().unwrap_or_else(PoisonError::into_inner);
        match entities.iter_mut().find(|e| e.identity() == *id) {
            Some(slot) => {
                *slot = entity;
                Ok(())
            }
            None => Err(EngineError::not_found(E::NAME, id)),
        }
    }

    fn all(&self) -> Vec<E> {
        self.entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Account;
    use crate::error::ErrorKind;
    use crate::schema::{process, with_field_replaced};
    use serde_json::json;
    use uuid::Uuid;

    fn create_test_account(name: &str) -> Account {
        process(&json!({
            "name": name,
            "email": format!("{}@example.com", name.to_lowercase()),
            "password_sha256": "pw",
        }))
        .unwrap()
    }

    #[test]
    fn test_insert_and_find() {
        let store = MemoryStore::new();
        let id = store.insert(create_test_account("Ana")).unwrap();
        store.insert(create_test_account("Bob")).unwrap();

        assert_eq!(store.count(), 2);
        assert_eq!(store.get(&id).map(|a| a.name().to_string()), Some("Ana".into()));
        assert!(store.find(|a: &Account| a.email() == "bob@example.com").is_some());
        assert!(store.get(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_replace_by_identity() {
        let store = MemoryStore::new();
        let original = create_test_account("Ana");
        let id = store.insert(original.clone()).unwrap();

        let renamed = with_field_replaced(&original, "name", json!("Ana Maria")).unwrap();
        store.replace(&id, renamed).unwrap();

        assert_eq!(store.count(), 1);
        assert_eq!(store.get(&id).unwrap().name(), "Ana Maria");
        assert_eq!(original.name(), "Ana");
    }

    #[test]
    fn test_insert_rejects_duplicate_identity() {
        let store = MemoryStore::new();
        let account = create_test_account("Ana");
        let id = store.insert(account.clone()).unwrap();

        let err = store.insert(account).unwrap_err();
        let report = err.report().unwrap();
        assert_eq!(report.at("id")[0].kind, ErrorKind::ConstraintViolation);
        assert_eq!(
            report.at("id")[0].message,
            format!("Account with id {} already exists", id)
        );
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_replace_missing_is_not_found() {
        let store: MemoryStore<Account> = MemoryStore::new();
        let err = store
            .replace(&Uuid::new_v4(), create_test_account("Ana"))
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "Account", .. }));
    }

    #[test]
    fn test_clones_share_storage() {
        let store = MemoryStore::new();
        let handle = store.clone();
        handle.insert(create_test_account("Ana")).unwrap();
        assert_eq!(store.all().len(), 1);

        store.clear();
        assert!(handle.is_empty());
    }
}
