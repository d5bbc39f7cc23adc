//! Group hierarchy fixtures for transitive lookups
//!
//! A hierarchy is a chain of `depth` `subgroup` tuples where each tuple's
//! object is the next tuple's user. [`build_hierarchies`] returns many of them
//! flattened into one vector, and [`HierarchyLayout`] owns the index arithmetic
//! for finding a given hierarchy's root and leaf inside that vector.
//!
//! # Layout
//!
//! For hierarchy `i` (0-based) of a layout with depth `d`:
//!
//! - its tuples occupy `[i * d, (i + 1) * d)`
//! - its root is the `user` of the tuple at `i * d`
//! - its leaf is the `object` of the tuple at `(i + 1) * d - 1`

use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::tuples::{
    new_group_id, new_group_reader_tuple, new_subgroup_tuple, ObjectType, Tuple,
};
use crate::error::BenchError;

/// Shape of a flattened hierarchy sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchyLayout {
    count: usize,
    depth: usize,
}

impl HierarchyLayout {
    pub fn new(count: usize, depth: usize) -> Result<Self, BenchError> {
        if count < 1 {
            return Err(BenchError::InvalidArgument(
                "hierarchy count must be greater than or equal to 1".to_string(),
            ));
        }

        if depth < 1 {
            return Err(BenchError::InvalidArgument(
                "hierarchy depth must be greater than or equal to 1".to_string(),
            ));
        }

        if count.checked_mul(depth).is_none() {
            return Err(BenchError::InvalidArgument(format!(
                "{count} hierarchies of depth {depth} overflow the tuple count"
            )));
        }

        Ok(Self { count, depth })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Total number of tuples in the flattened sequence
    pub fn len(&self) -> usize {
        self.count * self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self, index: usize) -> Result<Range<usize>, BenchError> {
        self.check_index(index)?;
        Ok(index * self.depth..(index + 1) * self.depth)
    }

    pub fn root_position(&self, index: usize) -> Result<usize, BenchError> {
        self.check_index(index)?;
        Ok(index * self.depth)
    }

    pub fn leaf_position(&self, index: usize) -> Result<usize, BenchError> {
        self.check_index(index)?;
        Ok((index + 1) * self.depth - 1)
    }

    /// Root group of hierarchy `index`
    pub fn root<'a>(&self, tuples: &'a [Tuple], index: usize) -> Result<&'a str, BenchError> {
        self.check_len(tuples)?;
        Ok(&tuples[self.root_position(index)?].user)
    }

    /// Leaf group of hierarchy `index`
    pub fn leaf<'a>(&self, tuples: &'a [Tuple], index: usize) -> Result<&'a str, BenchError> {
        self.check_len(tuples)?;
        Ok(&tuples[self.leaf_position(index)?].object)
    }

    fn check_index(&self, index: usize) -> Result<(), BenchError> {
        if index >= self.count {
            return Err(BenchError::InvalidArgument(format!(
                "hierarchy index {index} out of range for {} hierarchies",
                self.count
            )));
        }
        Ok(())
    }

    fn check_len(&self, tuples: &[Tuple]) -> Result<(), BenchError> {
        if tuples.len() != self.len() {
            return Err(BenchError::InvalidArgument(format!(
                "expected {} hierarchy tuples ({} x {}), got {}",
                self.len(),
                self.count,
                self.depth,
                tuples.len()
            )));
        }
        Ok(())
    }
}

/// Build `count` independent hierarchies of `depth` subgroup tuples each.
///
/// Ids are random per call; the positional layout is not.
pub fn build_hierarchies(count: usize, depth: usize) -> Result<Vec<Tuple>, BenchError> {
    let layout = HierarchyLayout::new(count, depth)?;
    let mut tuples = Vec::with_capacity(layout.len());

    for _ in 0..count {
        let mut current = new_group_id();

        for _ in 0..depth {
            let next = new_group_id();
            tuples.push(new_subgroup_tuple(&current, &next));
            current = next;
        }
    }

    Ok(tuples)
}

/// How a hierarchy's leaf is paired with a root when wiring capstones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootPairing {
    /// Every hierarchy's leaf is paired with its own root.
    #[default]
    Own,
    /// Hierarchy `i` is paired with hierarchy `i - 1`'s root and hierarchy 0
    /// gets no lookup. Leaves then have no path to the report, so checks
    /// against a graph-evaluating service come back denied.
    Previous,
}

/// Lookups to queue and capstone tuples to write, index-aligned
#[derive(Debug, Clone, Default)]
pub struct TransitiveFixtures {
    /// `(leaf, reader, report)` checks expected to be allowed
    pub lookups: Vec<Tuple>,
    /// `(root, reader, report)` tuples granting the report to each root
    pub capstones: Vec<Tuple>,
}

impl TransitiveFixtures {
    pub fn len(&self) -> usize {
        self.lookups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookups.is_empty()
    }
}

/// Derive the transitive lookup workload from a flattened hierarchy sequence.
pub fn derive_transitive_lookups(
    tuples: &[Tuple],
    layout: HierarchyLayout,
    report_id: &str,
    pairing: RootPairing,
) -> Result<TransitiveFixtures, BenchError> {
    layout.check_len(tuples)?;

    let pairs: Vec<(usize, usize)> = match pairing {
        RootPairing::Own => (0..layout.count()).map(|i| (i, i)).collect(),
        RootPairing::Previous => (1..layout.count()).map(|i| (i, i - 1)).collect(),
    };

    let mut fixtures = TransitiveFixtures {
        lookups: Vec::with_capacity(pairs.len()),
        capstones: Vec::with_capacity(pairs.len()),
    };

    for (leaf_index, root_index) in pairs {
        let leaf = group_id(layout.leaf(tuples, leaf_index)?)?;
        let root = group_id(layout.root(tuples, root_index)?)?;

        fixtures.lookups.push(new_group_reader_tuple(leaf, report_id));
        fixtures.capstones.push(new_group_reader_tuple(root, report_id));
    }

    Ok(fixtures)
}

/// Bare id of a `group:<id>` identifier
fn group_id(value: &str) -> Result<&str, BenchError> {
    match Tuple::parse_object(value)? {
        (ObjectType::Group, id) => Ok(id),
        (other, _) => Err(BenchError::InvalidArgument(format!(
            "hierarchy endpoint '{value}' is a {}, not a group",
            other.as_str()
        ))),
    }
}
