//! Search tree arena and open set entries used by the A* search.
//!
//! Nodes live in a flat `Vec` and refer to their parent by index, so the tree can't form cycles
//! and is serialisable as-is.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::cmp::Ordering;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use super::MoveAction;
use crate::voxel::Voxel;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An A* node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub position: Voxel,

    /// Cost from the start
    pub g: f64,

    /// Heuristic estimate to the goal
    pub h: f64,

    /// Total score, always `g + h`
    pub f: f64,

    /// Index of the parent in the arena, `None` for the start node
    pub parent: Option<usize>,

    /// The move used to get here from the parent
    pub action: Option<MoveAction>,
}

/// Arena holding every node created during one search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchTree {
    nodes: Vec<Node>,
}

/// Entry in the open set heap.
///
/// Entries are never removed from the heap when a node's score improves, a new entry is pushed
/// instead and the outdated one is skipped when popped.
#[derive(Debug, Clone, Copy)]
pub(super) struct OpenEntry {
    pub f: OrderedFloat<f64>,

    /// Order of insertion, earlier entries win ties
    pub seq: u64,

    pub node: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Node {
    pub fn new(
        position: Voxel,
        g: f64,
        h: f64,
        parent: Option<usize>,
        action: Option<MoveAction>,
    ) -> Self {
        Self {
            position,
            g,
            h,
            f: g + h,
            parent,
            action,
        }
    }

    /// Replace the route into this node with a cheaper one.
    pub fn reparent(&mut self, g: f64, parent: usize, action: MoveAction) {
        self.g = g;
        self.f = g + self.h;
        self.parent = Some(parent);
        self.action = Some(action);
    }
}

impl SearchTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its index.
    pub fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn get(&self, idx: usize) -> Option<&Node> {
        self.nodes.get(idx)
    }

    pub(super) fn node(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    pub(super) fn node_mut(&mut self, idx: usize) -> &mut Node {
        &mut self.nodes[idx]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walk the parent links from the given node back to the root, returning the positions from
    /// the root to the node and the actions used between them.
    pub fn reconstruct(&self, idx: usize) -> (Vec<Voxel>, Vec<MoveAction>) {
        let mut positions = Vec::new();
        let mut actions = Vec::new();

        let mut current = Some(idx);
        while let Some(i) = current {
            let node = &self.nodes[i];
            positions.push(node.position);
            if node.parent.is_some() {
                if let Some(action) = node.action {
                    actions.push(action);
                }
            }
            current = node.parent;
        }

        positions.reverse();
        actions.reverse();

        (positions, actions)
    }
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Flipped so the heap pops the lowest score, then the earliest inserted
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
