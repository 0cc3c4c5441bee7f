use itertools::Itertools;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use treelist::TreeList;

#[test]
fn append_cascade() {
    let mut list: TreeList<u32> = TreeList::new();
    for i in 0..512 {
        list.push(i);
    }
    assert_eq!(list.len(), 512);
    for i in 0..512 {
        assert_eq!(list.get(i as usize), Some(&i));
    }
    list.check_invariants();
}

#[test]
fn slice_and_mutate_isolation() {
    let list: TreeList<i64> = (0..1000).collect();
    let mut sliced = list.slice(4..258);
    sliced.push(-1);
    let expected: Vec<i64> = (0..1000).collect();
    assert_eq!(list, expected);
    let expected_slice: Vec<i64> = (4..258).chain([-1]).collect();
    assert_eq!(sliced, expected_slice);
    list.check_invariants();
    sliced.check_invariants();
}

#[test]
fn interior_set_then_delete() {
    let mut list: TreeList<i64> = (0..1000).collect();
    list.set(200, 6);
    let expected: Vec<i64> = (0..200).chain([6]).chain(201..1000).collect();
    assert_eq!(list, expected);
    list.remove(200);
    let expected: Vec<i64> = (0..200).chain(201..1000).collect();
    assert_eq!(list, expected);
}

#[test]
fn small_leaf_deletes() {
    // One more element than fits in a leaf, then shrink back into one.
    let mut list: TreeList<usize> = (0..129).collect();
    list.remove(1);
    let last = list.len() - 1;
    list.remove(last);
    let expected: Vec<usize> = std::iter::once(0).chain(2..128).collect();
    assert_eq!(list, expected);
    assert_eq!(list.height(), 1);
    assert_eq!(list.len(), 127);
    list.check_invariants();
}

#[test]
fn sparse_huge_list_via_repeat() {
    let unit: TreeList<u8> = [0].into_iter().collect();
    let mut list = unit.repeat(1 << 29);
    assert_eq!(list.len(), 1 << 29);
    list.push(5);
    let len = list.len();
    let sliced = list.slice(4..len - 234234);
    list.delete_range(3..1024);
    assert_eq!(list.len(), (1 << 29) + 1 - 1021);
    assert_eq!(sliced.get(0), Some(&0));
    assert_eq!(sliced.len(), len - 234234 - 4);
}

#[test]
fn clone_isolation_under_random_edits() {
    let mut rng = StdRng::seed_from_u64(7);
    let original: TreeList<u64> = (0..4096).collect();
    let frozen: Vec<u64> = original.iter().copied().collect();
    let mut working = original.clone();
    for _ in 0..500 {
        let n = working.len();
        match rng.gen_range(0..4) {
            0 => working.insert(rng.gen_range(0..=n), rng.gen()),
            1 if n > 0 => {
                working.remove(rng.gen_range(0..n));
            }
            2 if n > 0 => {
                working.set(rng.gen_range(0..n), rng.gen());
            }
            _ => {
                let i = rng.gen_range(0..=n);
                let j = rng.gen_range(i..=n.min(i + 64));
                working.delete_range(i..j);
            }
        }
        working.check_invariants();
    }
    assert_eq!(original, frozen);
}

#[test]
fn bulk_build_boundaries() {
    // Sizes straddling the leaf, two-level and three-level capacities.
    for n in [0usize, 1, 127, 128, 129, 16383, 16384, 16385, 20000] {
        let list: TreeList<usize> = (0..n).collect();
        assert_eq!(list.len(), n);
        assert!(list.iter().copied().eq(0..n), "size {n}");
        list.check_invariants();
    }
}

#[test]
fn extend_and_append() {
    let mut list: TreeList<u32> = (0..100).collect();
    list.extend(100..300);
    let mut tail: TreeList<u32> = (300..400).collect();
    list.append(&mut tail);
    assert!(tail.is_empty());
    let expected: Vec<u32> = (0..400).collect();
    assert_eq!(list, expected);
}

#[test]
fn splice_across_subtrees() {
    let mut list: TreeList<i64> = (0..10_000).collect();
    let patch: Vec<i64> = (0..10).map(|v| -v).collect();
    list.splice(17..9_500, patch.iter().copied());
    let expected: Vec<i64> = (0..17).chain(patch).chain(9_500..10_000).collect();
    assert_eq!(list, expected);
    list.check_invariants();
}

#[test]
fn pop_and_remove_item() {
    let mut list: TreeList<u32> = (0..200).map(|i| i % 50).collect();
    assert_eq!(list.pop(), Some(49));
    assert_eq!(list.remove_item(&10), Some(10));
    assert_eq!(list.remove_item(&1000), None);
    assert_eq!(list.len(), 198);
    assert_eq!(list.count(&10), 3);
}

#[test]
fn iterator_flavors_agree() {
    let mut rng = StdRng::seed_from_u64(99);
    let values: Vec<u64> = (0..3000).map(|_| rng.gen()).collect();
    let list: TreeList<u64> = values.iter().copied().collect();

    let borrowed = list.iter().copied().collect_vec();
    let owned = list.clone().into_iter().collect_vec();
    assert_eq!(borrowed, values);
    assert_eq!(owned, values);

    let short: TreeList<u64> = values.iter().copied().take(5).collect();
    assert_eq!(short.iter().copied().collect_vec(), &values[..5]);
    assert_eq!(short.into_iter().collect_vec(), &values[..5]);
}

#[test]
fn ordering_is_lexicographic() {
    let a: TreeList<u8> = b"spam".iter().copied().collect();
    let b: TreeList<u8> = b"spams".iter().copied().collect();
    let c: TreeList<u8> = b"spbm".iter().copied().collect();
    assert!(a < b, "an equal prefix loses to the longer list");
    assert!(a < c);
    assert!(b < c);
    assert_eq!(a.partial_cmp(&a), Some(std::cmp::Ordering::Equal));
}

#[test]
fn repeat_matches_elementwise() {
    let base: TreeList<u16> = [1, 2, 3].into_iter().collect();
    for k in 0..20 {
        let repeated = base.repeat(k);
        let expected: Vec<u16> = [1, 2, 3].iter().copied().cycle().take(3 * k).collect();
        assert_eq!(repeated, expected, "k = {k}");
        repeated.check_invariants();
    }
}

#[test]
fn reverse_involution_with_cow_sharing() {
    let list: TreeList<u32> = (0..5000).collect();
    let mut reversed = list.clone();
    reversed.reverse();
    assert_eq!(reversed.first(), Some(&4999));
    let expected: Vec<u32> = (0..5000).collect();
    assert_eq!(list, expected);
    reversed.reverse();
    assert_eq!(reversed, expected);
}
