//! Authorization model written to every benchmark store
//!
//! Types: `user`, `group` (`member` from users, `subgroup` from groups) and
//! `report` (`reader` from users or groups).

use serde_json::{json, Value};

/// OpenFGA schema 1.1 model in the JSON form the
/// `POST /stores/{id}/authorization-models` endpoint accepts.
pub fn authorization_model() -> Value {
    json!({
        "schema_version": "1.1",
        "type_definitions": [
            {
                "type": "group",
                "relations": {
                    "member": { "this": {} },
                    "subgroup": { "this": {} }
                },
                "metadata": {
                    "relations": {
                        "member": {
                            "directly_related_user_types": [{ "type": "user" }]
                        },
                        "subgroup": {
                            "directly_related_user_types": [{ "type": "group" }]
                        }
                    }
                }
            },
            {
                "type": "report",
                "relations": {
                    "reader": { "this": {} }
                },
                "metadata": {
                    "relations": {
                        "reader": {
                            "directly_related_user_types": [
                                { "type": "group" },
                                { "type": "user" }
                            ]
                        }
                    }
                }
            },
            { "type": "user" }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ObjectType, Relation};

    #[test]
    fn test_model_declares_fixture_types_and_relations() {
        let model = authorization_model();
        assert_eq!(model["schema_version"], "1.1");

        let types: Vec<&str> = model["type_definitions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["type"].as_str().unwrap())
            .collect();
        for kind in [ObjectType::User, ObjectType::Group, ObjectType::Report] {
            assert!(types.contains(&kind.as_str()));
        }

        let group = &model["type_definitions"][0];
        assert!(group["relations"][Relation::Member.as_str()].is_object());
        assert!(group["relations"][Relation::Subgroup.as_str()].is_object());

        let report = &model["type_definitions"][1];
        assert!(report["relations"][Relation::Reader.as_str()].is_object());
    }
}
