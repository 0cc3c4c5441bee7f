use std::sync::Arc;

use arrayvec::ArrayVec;

use super::balance::concat_roots;
use super::node::{Handle, Node};

/// Bottom-up tree builder.
///
/// Completed subtrees sit on a stack in sequence order, heights
/// non-increasing towards the top. Every time the leaf count reaches a
/// multiple of `LIMIT^i` the top `LIMIT` subtrees of height `i` are
/// wrapped under a fresh parent, so the stack never holds more than
/// O(log n) entries while consuming a stream of unknown length.
pub(crate) struct Forest<T, const LIMIT: usize> {
    num_leaves: usize,
    stack: Vec<Handle<T, LIMIT>>,
}

impl<T: Clone, const LIMIT: usize> Forest<T, LIMIT> {
    pub(crate) fn new() -> Self {
        Forest {
            num_leaves: 0,
            stack: Vec::new(),
        }
    }

    /// Push the next leaf, combining completed tiers as their counts fill
    /// up. Only the rightmost child of a fresh wrapper can be short, and
    /// its underflow is repaired on the spot.
    pub(crate) fn append_leaf(&mut self, leaf: Node<T, LIMIT>) {
        if leaf.width() == 0 {
            return;
        }
        self.stack.push(Arc::new(leaf));
        self.num_leaves += 1;
        let mut power = LIMIT;
        while power <= self.num_leaves && self.num_leaves % power == 0 {
            let at = self.stack.len() - LIMIT;
            let kids: ArrayVec<Handle<T, LIMIT>, LIMIT> = self.stack.drain(at..).collect();
            let mut parent = Node::from_kids(kids);
            let collapsed = parent.underflow(LIMIT - 1);
            debug_assert_eq!(collapsed, 0);
            self.stack.push(Arc::new(parent));
            match power.checked_mul(LIMIT) {
                Some(next) => power = next,
                None => break,
            }
        }
    }

    /// Combine the remaining partial tiers into a single tree. Walks the
    /// stack from shortest to tallest, wrapping each tier's stragglers
    /// and concatenating them onto the accumulated root.
    pub(crate) fn finish(mut self) -> Node<T, LIMIT> {
        let mut out: Option<(Node<T, LIMIT>, usize)> = None;
        let mut group_height = 1;
        let mut num = self.num_leaves;
        while !self.stack.is_empty() {
            let count = num % LIMIT;
            num /= LIMIT;
            group_height += 1;
            if count == 0 {
                continue;
            }
            let at = self.stack.len() - count;
            let kids: ArrayVec<Handle<T, LIMIT>, LIMIT> = self.stack.drain(at..).collect();
            let mut group = Node::from_kids(kids);
            let adj = group.underflow(count - 1);
            let height = group_height - adj;
            out = Some(match out {
                None => (group, height),
                Some((tree, tree_height)) => concat_roots(group, height, tree, tree_height),
            });
        }
        match out {
            Some((tree, _)) => tree,
            None => Node::new_leaf(),
        }
    }
}
