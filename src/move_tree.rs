//! History of positions as a tree with one main line and any number of
//! analysis variations.
//!
//! Positions live in an arena and refer to each other through `PositionId`
//! handles. Handles are never reused, so a handle into a removed subtree
//! simply stops resolving. The main line is kept as one authoritative index
//! from the root down, which gives constant-time lookup by move number.

use std::ops::{Index, IndexMut};

use tracing::debug;

use crate::error::{EngineError, Result};
use crate::position::BoardPosition;

/// Stable handle to a position registered in a `MoveTree`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PositionId(usize);

impl PositionId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
struct Node {
    position: BoardPosition,
    parent: Option<PositionId>,
    main_child: Option<PositionId>,
    variations: Vec<PositionId>,
}

#[derive(Clone, Debug)]
pub struct MoveTree {
    nodes: Vec<Option<Node>>,
    root: PositionId,
    root_move_number: usize,
    /// Main line from the root, indexed by move number minus the root's
    main_line: Vec<PositionId>,
}

impl MoveTree {
    pub fn new(mut initial_position: BoardPosition) -> Self {
        initial_position.set_previous(None);
        let root = PositionId(0);
        let root_move_number = initial_position.last_move_number();
        Self {
            nodes: vec![Some(Node {
                position: initial_position,
                parent: None,
                main_child: None,
                variations: Vec::new(),
            })],
            root,
            root_move_number,
            main_line: vec![root],
        }
    }

    pub fn root(&self) -> PositionId {
        self.root
    }

    pub fn initial_position(&self) -> &BoardPosition {
        &self[self.root]
    }

    fn node(&self, id: PositionId) -> Result<&Node> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(EngineError::UnknownPosition(id))
    }

    fn node_mut(&mut self, id: PositionId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(EngineError::UnknownPosition(id))
    }

    pub fn contains(&self, id: PositionId) -> bool {
        self.node(id).is_ok()
    }

    pub fn get(&self, id: PositionId) -> Option<&BoardPosition> {
        self.node(id).ok().map(|n| &n.position)
    }

    pub fn position(&self, id: PositionId) -> Result<&BoardPosition> {
        self.node(id).map(|n| &n.position)
    }

    /// Mutable access for annotations (removed stones, scores, estimates).
    pub fn position_mut(&mut self, id: PositionId) -> Result<&mut BoardPosition> {
        self.node_mut(id).map(|n| &mut n.position)
    }

    pub fn parent(&self, id: PositionId) -> Option<PositionId> {
        self.node(id).ok().and_then(|n| n.parent)
    }

    pub fn main_child(&self, id: PositionId) -> Option<PositionId> {
        self.node(id).ok().and_then(|n| n.main_child)
    }

    pub fn variations(&self, id: PositionId) -> &[PositionId] {
        self.node(id).map(|n| n.variations.as_slice()).unwrap_or(&[])
    }

    /// Main child first, then variations in registration order.
    pub fn children(&self, id: PositionId) -> Vec<PositionId> {
        self.main_child(id)
            .into_iter()
            .chain(self.variations(id).iter().copied())
            .collect()
    }

    /// Number of live positions in the tree.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn main_line(&self) -> &[PositionId] {
        &self.main_line
    }

    /// Main-line position with the given move number.
    pub fn main_line_position(&self, move_number: usize) -> Option<PositionId> {
        let offset = move_number.checked_sub(self.root_move_number)?;
        self.main_line.get(offset).copied()
    }

    pub fn is_main_line(&self, id: PositionId) -> bool {
        self.get(id)
            .and_then(|p| self.main_line_position(p.last_move_number()))
            == Some(id)
    }

    /// `id` followed by its ancestors up to the root.
    pub fn ancestors(&self, id: PositionId) -> impl Iterator<Item = PositionId> + '_ {
        std::iter::successors(self.contains(id).then_some(id), move |&id| self.parent(id))
    }

    /// Attach `new_position` as a child of `from`.
    ///
    /// An identical child (same move, same grid) is reused instead of being
    /// duplicated. With `main_branch` the child becomes the main successor of
    /// `from`; a previous main successor is kept as a variation, and when
    /// `from` is on the main line the main line index is rebuilt from there.
    ///
    /// Returns the handle to use from now on.
    pub fn register(&mut self, mut new_position: BoardPosition, from: PositionId, main_branch: bool) -> Result<PositionId> {
        let parent = self.node(from)?;
        let expected = parent.position.last_move_number() + 1;
        if new_position.last_move_number() != expected {
            return Err(EngineError::OutOfSequence {
                expected,
                found: new_position.last_move_number(),
            });
        }

        let existing = parent
            .main_child
            .into_iter()
            .chain(parent.variations.iter().copied())
            .find(|&child| {
                self.get(child).is_some_and(|p| {
                    p.last_move() == new_position.last_move()
                        && p.next_to_move() == new_position.next_to_move()
                        && p.has_the_same_position(&new_position)
                })
            });

        let id = match existing {
            Some(id) => id,
            None => {
                let id = PositionId(self.nodes.len());
                new_position.set_previous(Some(from));
                self.nodes.push(Some(Node {
                    position: new_position,
                    parent: Some(from),
                    main_child: None,
                    variations: Vec::new(),
                }));
                if !main_branch {
                    self.node_mut(from)?.variations.push(id);
                }
                id
            }
        };

        if main_branch {
            self.set_main_child(from, id)?;
        }
        debug!(?id, ?from, main_branch, reused = existing.is_some(), "registered position");
        Ok(id)
    }

    fn set_main_child(&mut self, from: PositionId, id: PositionId) -> Result<()> {
        let node = self.node_mut(from)?;
        if node.main_child != Some(id) {
            node.variations.retain(|&v| v != id);
            if let Some(old) = node.main_child.replace(id) {
                node.variations.push(old);
            }
        }

        if self.is_main_line(from) {
            let offset = self.position(from)?.last_move_number() - self.root_move_number;
            self.main_line.truncate(offset + 1);
            let mut next = Some(id);
            while let Some(child) = next {
                self.main_line.push(child);
                next = self.main_child(child);
            }
        }
        Ok(())
    }

    /// Detach `id` and drop its whole subtree; sibling branches are untouched.
    ///
    /// The root itself always stays; removing it only drops its children.
    pub fn remove_data(&mut self, id: PositionId) -> Result<()> {
        let parent = self.node(id)?.parent;
        let mut stack = match parent {
            Some(parent) => {
                if self.is_main_line(id) {
                    let offset = self.position(id)?.last_move_number() - self.root_move_number;
                    self.main_line.truncate(offset);
                }
                let parent_node = self.node_mut(parent)?;
                if parent_node.main_child == Some(id) {
                    parent_node.main_child = None;
                } else {
                    parent_node.variations.retain(|&v| v != id);
                }
                vec![id]
            }
            None => {
                self.main_line.truncate(1);
                let root = self.node_mut(id)?;
                let mut children: Vec<PositionId> = root.main_child.take().into_iter().collect();
                children.append(&mut root.variations);
                children
            }
        };

        let mut removed = 0;
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(next.0).and_then(Option::take) {
                stack.extend(node.main_child);
                stack.extend(node.variations);
                removed += 1;
            }
        }
        debug!(?id, removed, "removed positions");
        Ok(())
    }
}

impl Index<PositionId> for MoveTree {
    type Output = BoardPosition;

    /// Panics when `id` was removed; use `get` for a total lookup.
    fn index(&self, id: PositionId) -> &BoardPosition {
        match self.nodes.get(id.0) {
            Some(Some(node)) => &node.position,
            _ => panic!("position {id:?} is not in the move tree"),
        }
    }
}

impl IndexMut<PositionId> for MoveTree {
    fn index_mut(&mut self, id: PositionId) -> &mut BoardPosition {
        match self.nodes.get_mut(id.0) {
            Some(Some(node)) => &mut node.position,
            _ => panic!("position {id:?} is not in the move tree"),
        }
    }
}
