//! Fixture construction for the benchmark workloads
//!
//! Nothing in here performs I/O. Tuples are minted by [`tuples`] and composed
//! into group chains by [`hierarchy`]; the workloads decide what to persist.

pub mod hierarchy;
pub mod tuples;

pub use hierarchy::{
    build_hierarchies, derive_transitive_lookups, HierarchyLayout, RootPairing,
    TransitiveFixtures,
};
pub use tuples::{
    new_group_reader_tuple, new_subgroup_tuple, new_user_reader_tuple, new_user_reader_tuples,
    ObjectType, Relation, Tuple,
};
