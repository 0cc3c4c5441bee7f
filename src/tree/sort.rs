use std::sync::Arc;

use arrayvec::ArrayVec;

use super::balance::concat_roots;
use super::forest::Forest;
use super::node::{Handle, Node};

/// Stable sort of a whole subtree.
///
/// Leaves sort in place. A branch sorts each child subtree, then merges
/// the sorted runs pairwise until one tree is left; an odd run carries
/// into the next round unchanged. The comparator can fail, in which case
/// the subtree is left dismantled and the caller restores its saved root.
pub(crate) fn sort_node<T, E, F, const LIMIT: usize>(
    node: &mut Node<T, LIMIT>,
    is_le: &mut F,
) -> Result<(), E>
where
    T: Clone,
    F: FnMut(&T, &T) -> Result<bool, E>,
{
    match node {
        Node::Leaf(vals) => sort_values(vals, is_le),
        Node::Branch(b) => {
            let mut runs: Vec<Node<T, LIMIT>> = b.kids.drain(..).map(Node::take).collect();
            for run in &mut runs {
                sort_node(run, is_le)?;
            }
            while runs.len() > 1 {
                let mut next = Vec::with_capacity(runs.len() / 2 + 1);
                let mut pairs = runs.into_iter();
                while let Some(left) = pairs.next() {
                    match pairs.next() {
                        Some(right) => next.push(merge_trees(left, right, is_le)?),
                        None => next.push(left),
                    }
                }
                runs = next;
            }
            if let Some(done) = runs.pop() {
                *node = done;
            }
            Ok(())
        }
    }
}

/// Stable binary insertion sort of one leaf's values. An element lands
/// after every earlier element that compares less-or-equal to it.
fn sort_values<T, E, F, const LIMIT: usize>(
    vals: &mut ArrayVec<T, LIMIT>,
    is_le: &mut F,
) -> Result<(), E>
where
    F: FnMut(&T, &T) -> Result<bool, E>,
{
    for i in 1..vals.len() {
        let mut lo = 0;
        let mut hi = i;
        while lo < hi {
            let mid = (lo + hi) / 2;
            if is_le(&vals[mid], &vals[i])? {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        vals[lo..=i].rotate_right(1);
    }
    Ok(())
}

/// Pop the next leaf off an input forest, dismantling branch nodes on the
/// way down. Shared nodes are shallow-copied, so trees co-owned by a
/// saved rollback root are consumed without disturbing it.
fn next_leaf<T: Clone, const LIMIT: usize>(
    forest: &mut Vec<Handle<T, LIMIT>>,
) -> Option<ArrayVec<T, LIMIT>> {
    loop {
        let handle = forest.pop()?;
        match Node::take(handle) {
            Node::Leaf(vals) => return Some(vals),
            Node::Branch(b) => forest.extend(b.kids.into_iter().rev()),
        }
    }
}

/// Merge two sorted trees into one, consuming both.
///
/// Ties prefer the left input, which is what makes the sort stable. The
/// inputs are held as forests and consumed leaf-by-leaf; merged values
/// fill an output leaf that is pushed through a `Forest` whenever it
/// fills up. Once one input runs dry the other is drained without
/// further comparisons.
fn merge_trees<T, E, F, const LIMIT: usize>(
    left: Node<T, LIMIT>,
    right: Node<T, LIMIT>,
    is_le: &mut F,
) -> Result<Node<T, LIMIT>, E>
where
    T: Clone,
    F: FnMut(&T, &T) -> Result<bool, E>,
{
    if left.len() == 0 {
        return Ok(right);
    }
    if right.len() == 0 {
        return Ok(left);
    }
    if is_le(left.get(left.len() - 1), right.get(0))? {
        // Already in order: concatenation is the whole merge.
        let left_height = left.height();
        let right_height = right.height();
        let (root, _) = concat_roots(left, left_height, right, right_height);
        return Ok(root);
    }

    let mut forest1: Vec<Handle<T, LIMIT>> = vec![Arc::new(left)];
    let mut forest2: Vec<Handle<T, LIMIT>> = vec![Arc::new(right)];
    let mut out: Forest<T, LIMIT> = Forest::new();
    let mut buf: ArrayVec<T, LIMIT> = ArrayVec::new();

    let mut feed1 = next_leaf(&mut forest1).map_or_else(ArrayVec::new, |v| v).into_iter();
    let mut feed2 = next_leaf(&mut forest2).map_or_else(ArrayVec::new, |v| v).into_iter();
    let mut a = feed1.next();
    let mut b = feed2.next();

    loop {
        match (a.take(), b.take()) {
            (Some(x), Some(y)) => {
                if buf.len() == LIMIT {
                    out.append_leaf(Node::Leaf(std::mem::take(&mut buf)));
                }
                if is_le(&x, &y)? {
                    buf.push(x);
                    b = Some(y);
                    a = feed1.next();
                    if a.is_none() {
                        if let Some(vals) = next_leaf(&mut forest1) {
                            feed1 = vals.into_iter();
                            a = feed1.next();
                        }
                    }
                } else {
                    buf.push(y);
                    a = Some(x);
                    b = feed2.next();
                    if b.is_none() {
                        if let Some(vals) = next_leaf(&mut forest2) {
                            feed2 = vals.into_iter();
                            b = feed2.next();
                        }
                    }
                }
            }
            (Some(x), None) => {
                drain_side(&mut out, &mut buf, x, feed1, &mut forest1);
                break;
            }
            (None, Some(y)) => {
                drain_side(&mut out, &mut buf, y, feed2, &mut forest2);
                break;
            }
            (None, None) => {
                if !buf.is_empty() {
                    out.append_leaf(Node::Leaf(buf));
                }
                break;
            }
        }
    }
    Ok(out.finish())
}

/// One input is exhausted: push everything left on the other side through
/// the output forest. Values flow through the buffer so only the final
/// leaf can end up short; leaves that are still wide enough are handed
/// over wholesale.
fn drain_side<T: Clone, const LIMIT: usize>(
    out: &mut Forest<T, LIMIT>,
    buf: &mut ArrayVec<T, LIMIT>,
    first: T,
    feed: arrayvec::IntoIter<T, LIMIT>,
    forest: &mut Vec<Handle<T, LIMIT>>,
) {
    if buf.len() == LIMIT {
        out.append_leaf(Node::Leaf(std::mem::take(buf)));
    }
    buf.push(first);
    for value in feed {
        if buf.len() == LIMIT {
            out.append_leaf(Node::Leaf(std::mem::take(buf)));
        }
        buf.push(value);
    }
    while let Some(vals) = next_leaf(forest) {
        if buf.is_empty() && vals.len() >= Node::<T, LIMIT>::HALF {
            out.append_leaf(Node::Leaf(vals));
        } else {
            for value in vals {
                if buf.len() == LIMIT {
                    out.append_leaf(Node::Leaf(std::mem::take(buf)));
                }
                buf.push(value);
            }
        }
    }
    if !buf.is_empty() {
        out.append_leaf(Node::Leaf(std::mem::take(buf)));
    }
}
