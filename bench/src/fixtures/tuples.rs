//! Relationship tuples and the factory functions that mint them
//!
//! Every fixture the benchmarks write, delete or check is a [`Tuple`]. The
//! factory functions below are the only places identifiers are generated, so
//! the namespacing (`user:`, `group:`, `report:`) lives in one spot.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::BenchError;

/// Object types known to the benchmark authorization model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    User,
    Group,
    Report,
}

impl ObjectType {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::User => "user",
            ObjectType::Group => "group",
            ObjectType::Report => "report",
        }
    }

    /// Namespace an identifier, e.g. `group:<id>`
    pub fn id(self, id: &str) -> String {
        format!("{}:{}", self.as_str(), id)
    }
}

impl std::str::FromStr for ObjectType {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(ObjectType::User),
            "group" => Ok(ObjectType::Group),
            "report" => Ok(ObjectType::Report),
            other => Err(BenchError::InvalidArgument(format!("Unknown object type: {other}"))),
        }
    }
}

/// Relations known to the benchmark authorization model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Member,
    Subgroup,
    Reader,
}

impl Relation {
    pub fn as_str(self) -> &'static str {
        match self {
            Relation::Member => "member",
            Relation::Subgroup => "subgroup",
            Relation::Reader => "reader",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(user, relation, object)` relationship fact.
///
/// Serializes as an OpenFGA `TupleKey`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tuple {
    pub user: String,
    pub relation: String,
    pub object: String,
}

impl Tuple {
    pub fn new(
        user: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }

    pub fn has_relation(&self, relation: Relation) -> bool {
        self.relation == relation.as_str()
    }

    /// Split a `"type:id"` identifier into its type and id
    pub fn parse_object(value: &str) -> Result<(ObjectType, &str), BenchError> {
        let (kind, id) = value.split_once(':').ok_or_else(|| {
            BenchError::InvalidArgument(format!(
                "Invalid identifier: {value}. Expected 'type:id'"
            ))
        })?;

        if id.is_empty() {
            return Err(BenchError::InvalidArgument(format!(
                "Identifier id cannot be empty: {value}"
            )));
        }

        Ok((kind.parse()?, id))
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.user, self.relation, self.object)
    }
}

fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

/// `(user:<uid>, reader, report:<rid>)` with two fresh ids
pub fn new_user_reader_tuple() -> Tuple {
    Tuple::new(
        ObjectType::User.id(&fresh_id()),
        Relation::Reader.as_str(),
        ObjectType::Report.id(&fresh_id()),
    )
}

pub fn new_user_reader_tuples(count: usize) -> Vec<Tuple> {
    (0..count).map(|_| new_user_reader_tuple()).collect()
}

/// `(group:<from>, subgroup, group:<to>)`
pub fn new_subgroup_tuple(from_group_id: &str, to_group_id: &str) -> Tuple {
    Tuple::new(
        ObjectType::Group.id(from_group_id),
        Relation::Subgroup.as_str(),
        ObjectType::Group.id(to_group_id),
    )
}

/// `(group:<group>, reader, report:<report>)`
pub fn new_group_reader_tuple(group_id: &str, report_id: &str) -> Tuple {
    Tuple::new(
        ObjectType::Group.id(group_id),
        Relation::Reader.as_str(),
        ObjectType::Report.id(report_id),
    )
}

pub(crate) fn new_group_id() -> String {
    fresh_id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_user_reader_tuple_shape() {
        let tuple = new_user_reader_tuple();
        assert!(tuple.user.starts_with("user:"));
        assert_eq!(tuple.relation, "reader");
        assert!(tuple.object.starts_with("report:"));

        let (kind, id) = Tuple::parse_object(&tuple.user).unwrap();
        assert_eq!(kind, ObjectType::User);
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[test]
    fn test_user_reader_tuples_never_collide() {
        let tuples = new_user_reader_tuples(5_000);
        let users: HashSet<_> = tuples.iter().map(|t| t.user.as_str()).collect();
        let reports: HashSet<_> = tuples.iter().map(|t| t.object.as_str()).collect();
        assert_eq!(users.len(), 5_000);
        assert_eq!(reports.len(), 5_000);
    }

    #[test]
    fn test_subgroup_and_group_reader_tuples() {
        let tuple = new_subgroup_tuple("a", "b");
        assert_eq!(tuple, Tuple::new("group:a", "subgroup", "group:b"));
        assert!(tuple.has_relation(Relation::Subgroup));

        let tuple = new_group_reader_tuple("a", "r");
        assert_eq!(tuple, Tuple::new("group:a", "reader", "report:r"));
        assert!(tuple.has_relation(Relation::Reader));
    }

    #[test]
    fn test_tuple_key_wire_shape() {
        let tuple = new_subgroup_tuple("a", "b");
        let json = serde_json::to_value(&tuple).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"user": "group:a", "relation": "subgroup", "object": "group:b"})
        );

        let back: Tuple = serde_json::from_value(json).unwrap();
        assert_eq!(back, tuple);
    }

    #[test]
    fn test_parse_object_rejects_malformed_ids() {
        assert!(Tuple::parse_object("group").is_err());
        assert!(Tuple::parse_object("group:").is_err());
        assert!(Tuple::parse_object("folder:x").is_err());
        assert_eq!(
            Tuple::parse_object("report:r1").unwrap(),
            (ObjectType::Report, "r1")
        );
    }
}
