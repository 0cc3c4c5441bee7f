use std::sync::Arc;

use arrayvec::ArrayVec;

use super::node::{Branch, Handle, Node};

/// Which spine of a subtree an operation descends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

/// Insert `item` at entry index `k`, splitting off the upper half into a
/// fresh sequence when the node is already full. The split happens before
/// the insert so the bound is never exceeded; the post-state is the same
/// either way.
fn insert_or_split<E, const LIMIT: usize>(
    entries: &mut ArrayVec<E, LIMIT>,
    k: usize,
    item: E,
) -> Option<ArrayVec<E, LIMIT>> {
    if entries.len() < LIMIT {
        entries.insert(k, item);
        return None;
    }
    let mut upper: ArrayVec<E, LIMIT> = entries.drain(LIMIT / 2..).collect();
    if k < LIMIT / 2 {
        entries.insert(k, item);
    } else {
        upper.insert(k - LIMIT / 2, item);
    }
    Some(upper)
}

/// Move `head` in front of the existing entries of `dst`.
fn prepend<E, const LIMIT: usize>(
    dst: &mut ArrayVec<E, LIMIT>,
    head: impl IntoIterator<Item = E>,
) {
    let mut merged: ArrayVec<E, LIMIT> = head.into_iter().collect();
    merged.extend(dst.drain(..));
    *dst = merged;
}

impl<T: Clone, const LIMIT: usize> Branch<T, LIMIT> {
    /// Child `k` is short. Move entries from the front of sibling `k + 1`
    /// until both sit at the midpoint of their combined width.
    fn borrow_right(&mut self, k: usize) {
        let mut right = self.kids.remove(k + 1);
        {
            let right_node = Arc::make_mut(&mut right);
            let left_node = self.kid_mut(k);
            let total = left_node.width() + right_node.width();
            let migrate = total / 2 - left_node.width();
            match (&mut *left_node, &mut *right_node) {
                (Node::Leaf(lv), Node::Leaf(rv)) => lv.extend(rv.drain(..migrate)),
                (Node::Branch(lb), Node::Branch(rb)) => {
                    lb.kids.extend(rb.kids.drain(..migrate))
                }
                _ => unreachable!("siblings of mixed kind"),
            }
            left_node.adjust_n();
            right_node.adjust_n();
        }
        self.kids.insert(k + 1, right);
    }

    /// Child `k` is short. Move entries from the back of sibling `k - 1`.
    fn borrow_left(&mut self, k: usize) {
        let mut left = self.kids.remove(k - 1);
        {
            let left_node = Arc::make_mut(&mut left);
            let right_node = self.kid_mut(k - 1);
            let total = left_node.width() + right_node.width();
            let migrate = total / 2 - right_node.width();
            match (&mut *left_node, &mut *right_node) {
                (Node::Leaf(lv), Node::Leaf(rv)) => {
                    let at = lv.len() - migrate;
                    prepend(rv, lv.drain(at..));
                }
                (Node::Branch(lb), Node::Branch(rb)) => {
                    let at = lb.kids.len() - migrate;
                    prepend(&mut rb.kids, lb.kids.drain(at..));
                }
                _ => unreachable!("siblings of mixed kind"),
            }
            left_node.adjust_n();
            right_node.adjust_n();
        }
        self.kids.insert(k - 1, left);
    }

    /// Absorb all of sibling `k + 1` into child `k`. The combined width
    /// must not exceed the node bound.
    fn merge_right(&mut self, k: usize) {
        let right = self.kids.remove(k + 1);
        let left = self.kid_mut(k);
        match (&mut *left, Node::take(right)) {
            (Node::Leaf(lv), Node::Leaf(rv)) => lv.extend(rv),
            (Node::Branch(lb), Node::Branch(rb)) => lb.kids.extend(rb.kids),
            _ => unreachable!("siblings of mixed kind"),
        }
        left.adjust_n();
    }

    /// Absorb all of sibling `k - 1` into child `k`.
    fn merge_left(&mut self, k: usize) {
        let left = self.kids.remove(k - 1);
        let dst = self.kid_mut(k - 1);
        match (&mut *dst, Node::take(left)) {
            (Node::Leaf(dv), Node::Leaf(lv)) => prepend(dv, lv),
            (Node::Branch(db), Node::Branch(lb)) => prepend(&mut db.kids, lb.kids),
            _ => unreachable!("siblings of mixed kind"),
        }
        dst.adjust_n();
    }
}

impl<T: Clone, const LIMIT: usize> Node<T, LIMIT> {
    /// A branch left with a single child takes on that child's contents,
    /// repeatedly, shortening the subtree. Returns the levels dropped.
    pub(crate) fn collapse(&mut self) -> usize {
        let mut dropped = 0;
        loop {
            let kid = match self {
                Node::Branch(b) if b.kids.len() == 1 => b.kids.pop(),
                _ => break,
            };
            if let Some(kid) = kid {
                *self = Node::take(kid);
                dropped += 1;
            }
        }
        if dropped == 0 {
            self.adjust_n();
        }
        dropped
    }

    /// Repair a short child at `k`: borrow from a generous sibling,
    /// otherwise merge, collapsing when no sibling is left. The pass
    /// then re-checks `k - 1` and `k + 1`. Returns the levels this
    /// subtree lost.
    pub(crate) fn underflow(&mut self, k: usize) -> usize {
        let mut k = k;
        let no_siblings = {
            let b = match self {
                Node::Leaf(_) => return 0,
                Node::Branch(b) => b,
            };
            let mut no_siblings = false;
            if k < b.kids.len() {
                loop {
                    let width = b.kids[k].width();
                    if width >= Self::HALF {
                        break;
                    }
                    let short = Self::HALF - width;
                    if k + 1 < b.kids.len() && b.kids[k + 1].width() >= Self::HALF + short {
                        b.borrow_right(k);
                    } else if k > 0 && b.kids[k - 1].width() >= Self::HALF + short {
                        b.borrow_left(k);
                    } else if k + 1 < b.kids.len() {
                        b.merge_right(k);
                    } else if k > 0 {
                        b.merge_left(k);
                        k -= 1;
                    } else {
                        no_siblings = true;
                        break;
                    }
                }
            }
            no_siblings
        };
        if no_siblings {
            return self.collapse();
        }
        let fix_left = {
            let Node::Branch(b) = &*self else { unreachable!() };
            k > 0 && b.kids[k - 1].width() < Self::HALF
        };
        if fix_left {
            let collapsed = self.underflow(k - 1);
            if collapsed > 0 {
                return collapsed;
            }
        }
        let fix_right = {
            let Node::Branch(b) = &*self else { unreachable!() };
            k + 1 < b.kids.len() && b.kids[k + 1].width() < Self::HALF
        };
        if fix_right {
            let collapsed = self.underflow(k + 1);
            if collapsed > 0 {
                return collapsed;
            }
        }
        self.collapse()
    }

    pub(crate) fn insert_here_value(&mut self, k: usize, value: T) -> Option<Handle<T, LIMIT>> {
        let Node::Leaf(vals) = self else {
            unreachable!("value insert on a branch")
        };
        insert_or_split(vals, k, value).map(|upper| Arc::new(Node::Leaf(upper)))
    }

    /// Insert a subtree handle at child index `k`. The subtree may be
    /// short, so the slot is repaired afterwards. On overflow the upper
    /// half moves into a new right sibling which the caller must attach.
    pub(crate) fn insert_here_subtree(
        &mut self,
        k: usize,
        subtree: Handle<T, LIMIT>,
    ) -> Option<Handle<T, LIMIT>> {
        let Node::Branch(b) = self else {
            unreachable!("subtree insert on a leaf")
        };
        match insert_or_split(&mut b.kids, k, subtree) {
            None => {
                let collapsed = self.underflow(k);
                debug_assert_eq!(collapsed, 0);
                None
            }
            Some(upper) => {
                let mut sibling = Node::from_kids(upper);
                if k < Self::HALF {
                    let collapsed = self.underflow(k);
                    debug_assert_eq!(collapsed, 0);
                } else {
                    let collapsed = sibling.underflow(k - Self::HALF);
                    debug_assert_eq!(collapsed, 0);
                }
                self.adjust_n();
                Some(Arc::new(sibling))
            }
        }
    }

    /// Descend `depth` levels down the left or right spine, then insert
    /// `subtree` at the edge. A split at any level propagates its new
    /// sibling upward, attached just right of the child that split.
    pub(crate) fn insert_subtree(
        &mut self,
        side: Side,
        mut subtree: Handle<T, LIMIT>,
        depth: usize,
    ) -> Option<Handle<T, LIMIT>> {
        let sub_n = subtree.len();
        let Node::Branch(b) = self else {
            unreachable!("subtree insert on a leaf")
        };
        b.n += sub_n;
        let at = if depth > 0 {
            let k = match side {
                Side::Left => 0,
                Side::Right => b.kids.len() - 1,
            };
            let overflow = b.kid_mut(k).insert_subtree(side, subtree, depth - 1)?;
            subtree = overflow;
            k + 1
        } else {
            match side {
                Side::Left => 0,
                Side::Right => b.kids.len(),
            }
        };
        self.insert_here_subtree(at, subtree)
    }

    /// Child `k` is a subtree short by `depth` levels. Pop it, splice it
    /// into a neighbor at the matching depth, then repair the
    /// neighborhood. Returns the levels this subtree lost.
    pub(crate) fn reinsert_subtree(&mut self, k: usize, depth: usize) -> usize {
        {
            let Node::Branch(b) = &mut *self else { unreachable!() };
            let subtree = b.kids.remove(k);
            if k < b.kids.len() {
                let overflow = b.kid_mut(k).insert_subtree(Side::Left, subtree, depth - 1);
                if let Some(sibling) = overflow {
                    b.kids.insert(k + 1, sibling);
                }
            } else {
                let overflow = b
                    .kid_mut(k - 1)
                    .insert_subtree(Side::Right, subtree, depth - 1);
                if let Some(sibling) = overflow {
                    b.kids.insert(k, sibling);
                }
            }
        }
        self.underflow(k)
    }

    /// Grow the tree by one level: the root's contents move into a child
    /// that pairs up with the overflow sibling. This is the only way a
    /// tree gains height.
    pub(crate) fn overflow_root(&mut self, sibling: Handle<T, LIMIT>) {
        let old = std::mem::replace(self, Node::new_leaf());
        let mut kids = ArrayVec::new();
        kids.push(Arc::new(old));
        kids.push(sibling);
        *self = Node::from_kids(kids);
    }

    /// Recursive positional insert. Returns the overflow sibling for the
    /// caller to attach, if a split reached this level.
    pub(crate) fn insert_at(&mut self, i: usize, value: T) -> Option<Handle<T, LIMIT>> {
        match self {
            Node::Leaf(_) => self.insert_here_value(i, value),
            Node::Branch(_) => {
                let (k, so_far) = self.locate(i);
                let Node::Branch(b) = self else { unreachable!() };
                b.n += 1;
                let overflow = b.kid_mut(k).insert_at(i - so_far, value)?;
                self.insert_here_subtree(k + 1, overflow)
            }
        }
    }

    /// Delete values `[i, j)` from this subtree. Returns how many levels
    /// the subtree lost.
    pub(crate) fn delete_range(&mut self, i: usize, j: usize) -> usize {
        if i == 0 && j >= self.len() {
            *self = Node::new_leaf();
            return 0;
        }
        if let Node::Leaf(vals) = self {
            let hi = j.min(vals.len());
            vals.drain(i..hi);
            return 0;
        }
        let (k1, so_far1) = self.locate(i);
        let (k2, so_far2) = self.locate(j - 1);
        if k1 == k2 {
            // The whole range lives under one child.
            let depth = {
                let Node::Branch(b) = &mut *self else { unreachable!() };
                b.kid_mut(k1).delete_range(i - so_far1, j - so_far1)
            };
            return if depth == 0 {
                self.underflow(k1)
            } else {
                self.reinsert_subtree(k1, depth)
            };
        }
        // The range spans children: trim the two boundary subtrees, drop
        // everything between them, then reconcile whatever is left short.
        let plan = {
            let Node::Branch(b) = &mut *self else { unreachable!() };
            let lost_left = b.kid_mut(k1).delete_range(i - so_far1, j - so_far1);
            let lost_right = b
                .kid_mut(k2)
                .delete_range(i.saturating_sub(so_far2), j - so_far2);
            b.kids.drain(k1 + 1..k2);
            let k2 = k1 + 1;
            let deleted_right = b.kids[k2].len() == 0;
            if deleted_right {
                b.kids.remove(k2);
            }
            let deleted_left = b.kids[k1].len() == 0;
            if deleted_left {
                b.kids.remove(k1);
            }
            if deleted_left && deleted_right {
                None
            } else if !deleted_left && !deleted_right && lost_left > 0 && lost_right > 0 {
                let left = Node::take(b.kids.remove(k1));
                let right = Node::take(b.kids.remove(k1));
                let (sub, depth) = concat_subtrees(left, lost_left, right, lost_right);
                b.kids.insert(k1, Arc::new(sub));
                Some((k1, depth))
            } else if deleted_left {
                Some((k1, lost_right))
            } else if !deleted_right && lost_left == 0 {
                Some((k1 + 1, lost_right))
            } else {
                Some((k1, lost_left))
            }
        };
        let Some((k, depth)) = plan else {
            return self.collapse();
        };
        let single = {
            let Node::Branch(b) = &*self else { unreachable!() };
            b.kids.len() == 1
        };
        if depth == 0 || single {
            return depth + self.underflow(k);
        }
        self.reinsert_subtree(k, depth)
    }
}

/// Concatenate two uniquely owned trees of possibly different heights.
/// `height_diff` is the left height minus the right height. Returns the
/// combined tree and 1 if it ended up taller than the taller input,
/// otherwise 0.
pub(crate) fn concat<T: Clone, const LIMIT: usize>(
    left: Node<T, LIMIT>,
    right: Node<T, LIMIT>,
    height_diff: isize,
) -> (Node<T, LIMIT>, isize) {
    let mut adj = 0;
    let (mut root, overflow) = if height_diff == 0 {
        let mut kids = ArrayVec::new();
        kids.push(Arc::new(left));
        kids.push(Arc::new(right));
        let mut root = Node::from_kids(kids);
        let mut collapsed = root.underflow(0);
        if collapsed == 0 {
            collapsed = root.underflow(1);
        }
        if collapsed == 0 {
            adj = 1;
        }
        (root, None)
    } else if height_diff > 0 {
        let mut root = left;
        let overflow =
            root.insert_subtree(Side::Right, Arc::new(right), (height_diff - 1) as usize);
        (root, overflow)
    } else {
        let mut root = right;
        let overflow =
            root.insert_subtree(Side::Left, Arc::new(left), (-height_diff - 1) as usize);
        (root, overflow)
    };
    if let Some(sibling) = overflow {
        root.overflow_root(sibling);
        adj += 1;
    }
    (root, adj)
}

/// Concatenate two roots, tracking heights measured from the leaves.
pub(crate) fn concat_roots<T: Clone, const LIMIT: usize>(
    left: Node<T, LIMIT>,
    left_height: usize,
    right: Node<T, LIMIT>,
    right_height: usize,
) -> (Node<T, LIMIT>, usize) {
    let (root, adj) = concat(left, right, left_height as isize - right_height as isize);
    (root, (left_height.max(right_height) as isize + adj) as usize)
}

/// Concatenate two subtrees, tracking depths measured from a shared
/// parent: a larger depth means a shorter tree. The result is at least
/// as tall as the taller input, so its depth is the smaller input depth
/// minus any growth.
pub(crate) fn concat_subtrees<T: Clone, const LIMIT: usize>(
    left: Node<T, LIMIT>,
    left_depth: usize,
    right: Node<T, LIMIT>,
    right_depth: usize,
) -> (Node<T, LIMIT>, usize) {
    let (root, adj) = concat(left, right, right_depth as isize - left_depth as isize);
    (root, (left_depth.min(right_depth) as isize - adj) as usize)
}
