//! In-memory authorization service
//!
//! Implements the same write/check contract as a real OpenFGA store for the
//! benchmark model, so workloads can be exercised without a server:
//!
//! - writes are transactional: a call that writes an existing tuple or deletes
//!   a missing one is rejected whole with `write_failed_due_to_invalid_input`
//! - tuples are validated against the model's types and relations
//! - `check` is true for a stored tuple, or for `(u, reader, report:r)` when a
//!   group holding `reader` on `report:r` reaches `u` by following `subgroup`
//!   tuples from user to object
//!
//! Every write call's batch sizes are recorded for assertions.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{
    AuthorizationService, CheckResponse, OpenFgaError, WriteResponse, INVALID_WRITE_INPUT,
    MAX_BATCH_SIZE,
};
use crate::fixtures::{ObjectType, Relation, Tuple};

/// Sizes of one recorded write call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteCall {
    pub writes: usize,
    pub deletes: usize,
}

#[derive(Default)]
struct State {
    tuples: HashSet<Tuple>,
    /// `subgroup` edges, tuple user to tuple objects
    children: HashMap<String, HashSet<String>>,
    /// report object to users holding `reader` on it
    readers: HashMap<String, HashSet<String>>,
    write_calls: Vec<WriteCall>,
}

impl State {
    fn insert(&mut self, tuple: Tuple) {
        if tuple.has_relation(Relation::Subgroup) {
            self.children
                .entry(tuple.user.clone())
                .or_default()
                .insert(tuple.object.clone());
        } else if tuple.has_relation(Relation::Reader) {
            self.readers
                .entry(tuple.object.clone())
                .or_default()
                .insert(tuple.user.clone());
        }
        self.tuples.insert(tuple);
    }

    fn remove(&mut self, tuple: &Tuple) {
        if tuple.has_relation(Relation::Subgroup) {
            if let Some(children) = self.children.get_mut(&tuple.user) {
                children.remove(&tuple.object);
                if children.is_empty() {
                    self.children.remove(&tuple.user);
                }
            }
        } else if tuple.has_relation(Relation::Reader) {
            if let Some(users) = self.readers.get_mut(&tuple.object) {
                users.remove(&tuple.user);
                if users.is_empty() {
                    self.readers.remove(&tuple.object);
                }
            }
        }
        self.tuples.remove(tuple);
    }

    /// Whether `user` is reachable from any reader of `object` through subgroups
    fn reaches_reader(&self, user: &str, object: &str) -> bool {
        let Some(readers) = self.readers.get(object) else {
            return false;
        };

        let mut seen: HashSet<&str> = HashSet::new();
        let mut frontier: VecDeque<&str> = readers.iter().map(String::as_str).collect();

        while let Some(group) = frontier.pop_front() {
            if group == user {
                return true;
            }
            if !seen.insert(group) {
                continue;
            }
            if let Some(children) = self.children.get(group) {
                frontier.extend(children.iter().map(String::as_str));
            }
        }

        false
    }
}

fn invalid_write(message: String) -> OpenFgaError {
    OpenFgaError::Validation {
        code: INVALID_WRITE_INPUT.to_string(),
        message,
    }
}

fn describe(tuple: &Tuple) -> String {
    format!(
        "user: '{}', relation: '{}', object: '{}'",
        tuple.user, tuple.relation, tuple.object
    )
}

/// Type restrictions of the benchmark model
fn validate_against_model(tuple: &Tuple) -> Result<(), OpenFgaError> {
    let invalid = |reason: String| OpenFgaError::Validation {
        code: "validation_error".to_string(),
        message: format!("{reason}: {}", describe(tuple)),
    };

    let (user_type, _) = Tuple::parse_object(&tuple.user).map_err(|e| invalid(e.to_string()))?;
    let (object_type, _) = Tuple::parse_object(&tuple.object).map_err(|e| invalid(e.to_string()))?;

    let allowed = match tuple.relation.as_str() {
        "member" => object_type == ObjectType::Group && user_type == ObjectType::User,
        "subgroup" => object_type == ObjectType::Group && user_type == ObjectType::Group,
        "reader" => {
            object_type == ObjectType::Report
                && matches!(user_type, ObjectType::User | ObjectType::Group)
        }
        other => return Err(invalid(format!("relation '{other}' is not defined"))),
    };

    if !allowed {
        return Err(invalid("type not allowed by the authorization model".to_string()));
    }

    Ok(())
}

/// Reference [`AuthorizationService`] backed by process memory
#[derive(Default)]
pub struct InMemoryAuthorizationService {
    state: Mutex<State>,
    checks: AtomicU64,
}

impl InMemoryAuthorizationService {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a test panicked mid-write.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn tuple_count(&self) -> usize {
        self.state().tuples.len()
    }

    pub fn contains(&self, tuple: &Tuple) -> bool {
        self.state().tuples.contains(tuple)
    }

    pub fn write_calls(&self) -> Vec<WriteCall> {
        self.state().write_calls.clone()
    }

    pub fn check_count(&self) -> u64 {
        self.checks.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AuthorizationService for InMemoryAuthorizationService {
    async fn write(
        &self,
        writes: &[Tuple],
        deletes: &[Tuple],
    ) -> Result<WriteResponse, OpenFgaError> {
        let mut state = self.state();
        state.write_calls.push(WriteCall {
            writes: writes.len(),
            deletes: deletes.len(),
        });

        if writes.is_empty() && deletes.is_empty() {
            return Err(OpenFgaError::InvalidRequest(
                "A write must contain at least one write or delete".to_string(),
            ));
        }

        if writes.len() + deletes.len() > MAX_BATCH_SIZE {
            return Err(OpenFgaError::Validation {
                code: "exceeded_entity_limit".to_string(),
                message: format!(
                    "number of operations exceeded the allowed limit of {MAX_BATCH_SIZE}"
                ),
            });
        }

        let mut pending = HashSet::with_capacity(writes.len());
        for tuple in writes {
            validate_against_model(tuple)?;
            if state.tuples.contains(tuple) || !pending.insert(tuple) {
                return Err(invalid_write(format!(
                    "cannot write a tuple which already exists: {}: invalid write input",
                    describe(tuple)
                )));
            }
        }

        let mut removing = HashSet::with_capacity(deletes.len());
        for tuple in deletes {
            if !state.tuples.contains(tuple) || !removing.insert(tuple) {
                return Err(invalid_write(format!(
                    "cannot delete a tuple which does not exist: {}: invalid write input",
                    describe(tuple)
                )));
            }
        }

        for tuple in deletes {
            state.remove(tuple);
        }
        for tuple in writes {
            state.insert(tuple.clone());
        }

        Ok(WriteResponse {
            status: 200,
            raw: "{}".to_string(),
        })
    }

    async fn check(&self, tuple: &Tuple) -> Result<CheckResponse, OpenFgaError> {
        self.checks.fetch_add(1, Ordering::Relaxed);
        validate_against_model(tuple)?;

        let state = self.state();
        let allowed = state.tuples.contains(tuple)
            || (tuple.has_relation(Relation::Reader)
                && state.reaches_reader(&tuple.user, &tuple.object));

        Ok(CheckResponse {
            status: 200,
            allowed,
            raw: format!(r#"{{"allowed":{allowed},"resolution":""}}"#),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{new_group_reader_tuple, new_subgroup_tuple, new_user_reader_tuple};

    #[tokio::test]
    async fn test_direct_check() {
        let service = InMemoryAuthorizationService::new();
        let stored = new_user_reader_tuple();
        service.write(&[stored.clone()], &[]).await.unwrap();

        assert!(service.check(&stored).await.unwrap().allowed);
        assert!(!service.check(&new_user_reader_tuple()).await.unwrap().allowed);
        assert_eq!(service.check_count(), 2);
    }

    #[tokio::test]
    async fn test_reader_inherited_down_subgroup_chain() {
        let service = InMemoryAuthorizationService::new();
        service
            .write(
                &[
                    new_subgroup_tuple("a", "b"),
                    new_subgroup_tuple("b", "c"),
                    new_group_reader_tuple("a", "r"),
                ],
                &[],
            )
            .await
            .unwrap();

        for group in ["group:a", "group:b", "group:c"] {
            let check = Tuple::new(group, "reader", "report:r");
            assert!(service.check(&check).await.unwrap().allowed, "{group}");
        }

        // Inheritance does not flow back up the chain.
        service
            .write(&[new_group_reader_tuple("c", "other")], &[])
            .await
            .unwrap();
        let upward = Tuple::new("group:a", "reader", "report:other");
        assert!(!service.check(&upward).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_deleted_edge_breaks_inheritance() {
        let service = InMemoryAuthorizationService::new();
        let edge = new_subgroup_tuple("a", "b");
        service
            .write(&[edge.clone(), new_group_reader_tuple("a", "r")], &[])
            .await
            .unwrap();

        let check = Tuple::new("group:b", "reader", "report:r");
        assert!(service.check(&check).await.unwrap().allowed);

        service.write(&[], &[edge]).await.unwrap();
        assert!(!service.check(&check).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_writes_are_transactional() {
        let service = InMemoryAuthorizationService::new();
        let existing = new_user_reader_tuple();
        service.write(&[existing.clone()], &[]).await.unwrap();

        let fresh = new_user_reader_tuple();
        let err = service
            .write(&[fresh.clone(), existing.clone()], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, OpenFgaError::Validation { ref code, .. } if code == INVALID_WRITE_INPUT));
        assert!(!service.contains(&fresh));

        let err = service
            .write(&[], &[existing.clone(), new_user_reader_tuple()])
            .await
            .unwrap_err();
        assert!(err.is_missing_tuple_delete());
        assert!(service.contains(&existing));
    }

    #[tokio::test]
    async fn test_model_validation() {
        let service = InMemoryAuthorizationService::new();

        let bad_relation = Tuple::new("user:u", "owner", "report:r");
        assert!(service.write(&[bad_relation], &[]).await.is_err());

        let bad_type = Tuple::new("report:r", "subgroup", "group:g");
        assert!(service.write(&[bad_type], &[]).await.is_err());

        let malformed = Tuple::new("user", "reader", "report:r");
        assert!(service.check(&malformed).await.is_err());

        let member = Tuple::new("user:u", "member", "group:g");
        assert!(service.write(&[member], &[]).await.is_ok());
    }

    #[tokio::test]
    async fn test_oversized_and_empty_writes_rejected() {
        let service = InMemoryAuthorizationService::new();
        let tuples: Vec<Tuple> = (0..MAX_BATCH_SIZE + 1).map(|_| new_user_reader_tuple()).collect();

        let err = service.write(&tuples, &[]).await.unwrap_err();
        assert!(matches!(err, OpenFgaError::Validation { ref code, .. } if code == "exceeded_entity_limit"));
        assert!(matches!(
            service.write(&[], &[]).await,
            Err(OpenFgaError::InvalidRequest(_))
        ));
        assert_eq!(service.tuple_count(), 0);
        assert_eq!(service.write_calls().len(), 2);
    }
}
