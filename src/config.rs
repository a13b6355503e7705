//! Tunable limits for traversals, path searches and editing operations.

use serde::{Deserialize, Serialize};

use crate::graphs::NodeVisitor;

/// Bounds on a breadth-first or depth-first exploration.
///
/// A limit of `0` means unbounded. `max_iterations` caps the number of work list pops, the
/// search reports an abort when it is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchLimits {
    pub size_limit: u32,
    pub edge_limit: u32,
    pub max_iterations: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            size_limit: 0,
            edge_limit: 0,
            max_iterations: 10_000_000,
        }
    }
}

impl SearchLimits {
    pub fn new(size_limit: u32, edge_limit: u32) -> Self {
        SearchLimits {
            size_limit,
            edge_limit,
            ..Self::default()
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Whether an entry of the work list is still inside the exploration bounds.
    #[inline]
    pub fn admits(&self, visitor: &NodeVisitor) -> bool {
        (self.edge_limit == 0 || visitor.path_length < self.edge_limit)
            && (self.size_limit == 0 || visitor.dist < self.size_limit)
    }
}

/// Caps on the work done by the exhaustive path enumeration between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSearchCaps {
    pub max_entries: usize,
    pub max_paths: usize,
}

impl Default for PathSearchCaps {
    fn default() -> Self {
        PathSearchCaps {
            max_entries: 1_000_000,
            max_paths: 1_000,
        }
    }
}

/// Rounds of frontier expansion performed when measuring distances between nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceSearch {
    pub max_rounds: usize,
}

impl Default for DistanceSearch {
    fn default() -> Self {
        DistanceSearch { max_rounds: 20 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Minimum node size (bp) used as an anchor when patching between nodes
    pub anchor_size: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig { anchor_size: 200 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_limits_admit_everything() {
        let limits = SearchLimits::default();
        let visitor = NodeVisitor::new(4, u32::MAX - 1, 100_000);
        assert!(limits.admits(&visitor));
    }

    #[test]
    fn test_limits_are_exclusive() {
        let limits = SearchLimits::new(1000, 3);
        assert!(limits.admits(&NodeVisitor::new(1, 999, 2)));
        assert!(!limits.admits(&NodeVisitor::new(1, 1000, 2)));
        assert!(!limits.admits(&NodeVisitor::new(1, 10, 3)));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(PathSearchCaps::default().max_entries, 1_000_000);
        assert_eq!(PathSearchCaps::default().max_paths, 1_000);
        assert_eq!(DistanceSearch::default().max_rounds, 20);
        assert_eq!(EditorConfig::default().anchor_size, 200);
        assert_eq!(SearchLimits::new(5, 0).with_max_iterations(7).max_iterations, 7);
    }
}
