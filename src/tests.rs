extern crate std;

use std::{ops::Range, prelude::v1::*};

use proptest::prelude::*;

use crate::model::{self, TestNode};

use super::*;

/// Builds a tree by inserting `keys` in order.
pub(crate) fn build(keys: &[u32]) -> AvlTree<TestNode> {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for &key in keys {
        assert!(tree.insert(TestNode::new(key)).is_none());
        tree.assert_invariants();
    }

    tree
}

/// Builds a plain, unbalanced binary search tree by inserting `keys` in order, with correct
/// heights.
pub(crate) fn raw_tree(keys: &[u32]) -> AvlTree<TestNode> {
    unsafe fn fix_heights(tree: &mut AvlTree<TestNode>, node: NonNull<TestNode>) {
        unsafe {
            for dir in [Dir::Left, Dir::Right] {
                if let Some(child) = TestNode::links(node).as_ref().child(dir) {
                    fix_heights(tree, child);
                }
            }
            tree.update_height(node);
        }
    }

    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for &key in keys {
        unsafe { tree.bst.insert_leaf(TestNode::into_ptr(TestNode::new(key))) };
    }

    if let Some(root) = tree.bst.root {
        unsafe { fix_heights(&mut tree, root) };
    }

    tree
}

/// Returns the height, left child, right child and parent of the node with key `key`.
pub(crate) fn summary(
    tree: &AvlTree<TestNode>,
    key: u32,
) -> (u8, Option<u32>, Option<u32>, Option<u32>) {
    let node = tree.bst.find(&key).expect("key not found");
    let key_of = |link: Link<TestNode>| link.map(|n| unsafe { n.as_ref().key });

    unsafe {
        let links = TestNode::links(node).as_ref();
        (
            links.height(),
            key_of(links.left()),
            key_of(links.right()),
            key_of(links.parent()),
        )
    }
}

fn root_key(tree: &AvlTree<TestNode>) -> Option<u32> {
    tree.bst.root.map(|root| unsafe { root.as_ref().key })
}

fn insert_find_all(keys: &[u32]) {
    let tree = build(keys);

    for key in keys {
        let node = tree.get(key).expect("item not found");
        assert_eq!(node.key(), key);
    }
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn two_elems_find() {
    insert_find_all(&[0, 1]);
    insert_find_all(&[1, 0]);
}

#[test]
fn three_elems_find() {
    insert_find_all(&[0, 1, 2]);
    insert_find_all(&[0, 2, 1]);
    insert_find_all(&[1, 0, 2]);
    insert_find_all(&[1, 2, 0]);
    insert_find_all(&[2, 0, 1]);
    insert_find_all(&[2, 1, 0]);
}

// Calls `f` with every permutation of `keys`.
fn for_each_permutation(keys: &mut Vec<u32>, k: usize, f: &mut impl FnMut(&[u32])) {
    if k == keys.len() {
        f(keys.as_slice());
        return;
    }

    for i in k..keys.len() {
        keys.swap(k, i);
        for_each_permutation(keys, k + 1, f);
        keys.swap(k, i);
    }
}

#[test]
fn four_elems_find() {
    for_each_permutation(&mut vec![0, 1, 2, 3], 0, &mut insert_find_all);
}

fn insert_remove_all(keys: &[u32]) {
    let mut tree = build(keys);

    for key in keys {
        let node = tree.bst.find(key).expect("item not found");
        let removed = unsafe { tree.remove_at(node) };
        assert_eq!(removed.key, *key);
        assert!(!removed.links.is_linked());
        tree.assert_invariants();
    }

    assert!(tree.is_empty());

    for &key in keys {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
    }

    for key in keys.iter().rev() {
        let node = tree.bst.find(key).expect("item not found");
        unsafe { tree.remove_at(node) };
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
}

#[test]
fn remove_one() {
    insert_remove_all(&[0]);
}

#[test]
fn remove_two() {
    insert_remove_all(&[0, 1]);
    insert_remove_all(&[1, 0]);
}

#[test]
fn remove_three() {
    for_each_permutation(&mut vec![0, 1, 2], 0, &mut insert_remove_all);
}

#[test]
fn remove_four() {
    for_each_permutation(&mut vec![0, 1, 2, 3], 0, &mut insert_remove_all);
}

#[test]
fn remove_six() {
    for_each_permutation(&mut vec![0, 1, 2, 3, 4, 5], 0, &mut insert_remove_all);
}

#[test]
fn ascending_inserts_single_left() {
    let tree = build(&[1, 2, 3]);

    assert_eq!(root_key(&tree), Some(2));
    assert_eq!(summary(&tree, 2), (2, Some(1), Some(3), None));
    assert_eq!(summary(&tree, 1), (1, None, None, Some(2)));
    assert_eq!(summary(&tree, 3), (1, None, None, Some(2)));
}

#[test]
fn zig_zag_inserts_double_rotation() {
    let tree = build(&[10, 20, 15]);

    assert_eq!(root_key(&tree), Some(15));
    assert_eq!(summary(&tree, 15), (2, Some(10), Some(20), None));
    assert_eq!(summary(&tree, 10), (1, None, None, Some(15)));
    assert_eq!(summary(&tree, 20), (1, None, None, Some(15)));
}

#[test]
fn remove_root_with_leaf_successor() {
    let mut tree = build(&[4, 2, 6, 1, 3, 5, 7]);

    let removed = tree.remove(&4).expect("4 was present");
    assert_eq!(removed.key, 4);
    tree.assert_invariants();

    assert_eq!(root_key(&tree), Some(5));
    assert_eq!(summary(&tree, 5), (3, Some(2), Some(6), None));
    assert_eq!(summary(&tree, 6), (2, None, Some(7), Some(5)));
    assert_eq!(
        tree.iter().map(|node| node.key).collect::<Vec<_>>(),
        vec![1, 2, 3, 5, 6, 7]
    );
}

#[test]
fn remove_root_with_successor_right_child() {
    let mut tree = build(&[4, 2, 7, 1, 3, 5, 8, 6]);
    assert_eq!(summary(&tree, 5), (2, None, Some(6), Some(7)));

    let removed = tree.remove(&4).expect("4 was present");
    assert_eq!(removed.key, 4);
    tree.assert_invariants();

    assert_eq!(root_key(&tree), Some(5));
    assert_eq!(summary(&tree, 5), (3, Some(2), Some(7), None));
    assert_eq!(summary(&tree, 7), (2, Some(6), Some(8), Some(5)));
    assert_eq!(summary(&tree, 6), (1, None, None, Some(7)));
}

#[test]
fn remove_inner_node_with_one_child() {
    let mut tree = build(&[2, 1, 3, 4]);
    assert_eq!(summary(&tree, 3), (2, None, Some(4), Some(2)));

    tree.remove(&3).expect("3 was present");
    tree.assert_invariants();

    assert_eq!(summary(&tree, 2), (2, Some(1), Some(4), None));
    assert_eq!(summary(&tree, 4), (1, None, None, Some(2)));
}

#[test]
fn remove_root_with_one_child() {
    let mut tree = build(&[1, 2]);

    tree.remove(&1).expect("1 was present");
    tree.assert_invariants();

    assert_eq!(root_key(&tree), Some(2));
    assert_eq!(summary(&tree, 2), (1, None, None, None));
}

#[test]
fn remove_absent_twice() {
    let mut tree = build(&[2, 1, 3]);
    let before = summary(&tree, 2);

    assert!(tree.remove(&9).is_none());
    assert!(tree.remove(&9).is_none());

    tree.assert_invariants();
    assert_eq!(tree.len(), 3);
    assert_eq!(summary(&tree, 2), before);
}

#[test]
fn duplicate_insert_replaces_node() {
    let mut tree = build(&[5, 3, 8, 1]);
    let shape: Vec<_> = [1, 3, 5, 8].iter().map(|&k| summary(&tree, k)).collect();

    let old = tree
        .insert(TestNode::with_value(3, 33))
        .expect("3 was present");
    assert_eq!((old.key, old.value), (3, 0));

    tree.assert_invariants();
    assert_eq!(tree.len(), 4);
    assert_eq!(tree.get(&3).map(|node| node.value), Some(33));

    let after: Vec<_> = [1, 3, 5, 8].iter().map(|&k| summary(&tree, k)).collect();
    assert_eq!(shape, after);
}

#[test]
fn get_mut_updates_in_place() {
    let mut tree = build(&[1, 2, 3]);

    // SAFETY: `value` is not structurally pinned.
    unsafe { tree.get_mut(&2).unwrap().get_unchecked_mut().value = 7 };
    assert_eq!(tree.get(&2).map(|node| node.value), Some(7));
    assert!(tree.contains_key(&2));
    assert!(!tree.contains_key(&4));
}

#[test]
fn first_last_and_pops() {
    let mut tree = build(&[5, 2, 8, 1, 9]);

    assert_eq!(tree.first().map(|node| node.key), Some(1));
    assert_eq!(tree.last().map(|node| node.key), Some(9));

    assert_eq!(tree.pop_first().map(|node| node.key), Some(1));
    tree.assert_invariants();
    assert_eq!(tree.pop_last().map(|node| node.key), Some(9));
    tree.assert_invariants();

    assert_eq!(
        tree.iter().map(|node| node.key).collect::<Vec<_>>(),
        vec![2, 5, 8]
    );
}

#[test]
fn clear_empties_tree() {
    let mut tree = build(&(0..100).collect::<Vec<_>>());
    assert_eq!(tree.len(), 100);

    tree.clear();
    assert!(tree.is_empty());
    assert_eq!(tree.height(), 0);
    assert!(tree.iter().next().is_none());
    tree.assert_invariants();

    tree.insert(TestNode::new(1));
    tree.assert_invariants();
}

#[test]
fn height_bound_sequential() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for key in 0..1024 {
        tree.insert(TestNode::new(key));
        model::assert_height_bound(tree.len(), tree.height());
    }

    // Ascending inserts build a perfect tree at each power of two minus one.
    assert_eq!(tree.height(), 11);
    tree.assert_invariants();

    for key in (0..1024).rev().step_by(2) {
        tree.remove(&key);
        model::assert_height_bound(tree.len(), tree.height());
    }

    tree.assert_invariants();
    assert_eq!(tree.len(), 512);
}

#[test]
fn iter_len_tracks_progress() {
    let tree = build(&[3, 1, 2]);
    let mut iter = tree.iter();

    assert_eq!(iter.len(), 3);
    assert_eq!(iter.next().map(|node| node.key), Some(1));
    assert_eq!(iter.len(), 2);
    assert_eq!((&tree).into_iter().count(), 3);
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_btree_equivalence(ops);
    }

    #[test]
    fn duplicate_insert_is_idempotent(keys in proptest::collection::vec(0u32..64, 0..64), key in 0u32..64) {
        let mut once = build(&[]);
        let mut twice = build(&[]);

        for &k in &keys {
            once.insert(TestNode::new(k));
            twice.insert(TestNode::new(k));
        }

        once.insert(TestNode::with_value(key, 2));
        twice.insert(TestNode::with_value(key, 1));
        twice.insert(TestNode::with_value(key, 2));

        let mut a = String::new();
        let mut b = String::new();
        once.dotgraph("g", &mut a).unwrap();
        twice.dotgraph("g", &mut b).unwrap();

        prop_assert_eq!(a, b);
        prop_assert_eq!(twice.get(&key).map(|node| node.value), Some(2));
    }
}
