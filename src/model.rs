extern crate std;

use std::{collections::BTreeMap, prelude::v1::*, ptr::NonNull};

use arbitrary::Arbitrary;
use cordyceps::Linked;
use proptest::strategy::{Just, Strategy};

use crate::{AvlMap, AvlTree, Links, TreeNode};

#[derive(Debug)]
#[repr(C)]
pub struct TestNode {
    pub links: Links<TestNode>,
    pub key: u32,
    pub value: u32,
}

impl TestNode {
    pub fn new(key: u32) -> Box<TestNode> {
        Self::with_value(key, 0)
    }

    pub fn with_value(key: u32, value: u32) -> Box<TestNode> {
        Box::new(TestNode {
            links: Links::new(),
            key,
            value,
        })
    }
}

unsafe impl Linked<Links<TestNode>> for TestNode {
    type Handle = Box<TestNode>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        NonNull::new(Box::into_raw(r)).unwrap()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<TestNode>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

impl TreeNode<Links<TestNode>> for TestNode {
    type Key = u32;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

/// Panics if a tree of `len` elements is taller than any AVL tree of that size can be.
pub fn assert_height_bound(len: usize, height: u8) {
    // A tree of height `h` holds at least `F(h + 2) - 1` nodes, which gives
    // `h < 1.4405 * log2(n + 2) - 0.3277`.
    let bound = 1.4405 * ((len + 2) as f64).log2() - 0.3277;
    assert!(
        f64::from(height) <= bound,
        "height {height} exceeds AVL bound {bound:.3} for {len} elements"
    );
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum ItemValue {
    Index(usize),
    Random(u32),
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> ItemValue {
        ItemValue::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        random in 0u32..1000,
    ) -> ItemValue {
        ItemValue::Random(random)
    }
}

fn value_strategy() -> impl Strategy<Value = ItemValue> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Insert(ItemValue, u32),
    Get(ItemValue),
    Remove(ItemValue),
    First,
    PopFirst,
    Last,
    PopLast,
}

impl Op {
    fn finalize(self, sorted: &[u32]) -> FinalOp {
        fn get_key(v: &[u32], i: ItemValue) -> u32 {
            match i {
                ItemValue::Index(idx) => {
                    if v.is_empty() {
                        idx as u32
                    } else {
                        v[idx % v.len()]
                    }
                }
                ItemValue::Random(v) => v,
            }
        }

        match self {
            Op::Insert(item, value) => FinalOp::Insert(get_key(sorted, item), value),
            Op::Get(item) => FinalOp::Get(get_key(sorted, item)),
            Op::Remove(item) => FinalOp::Remove(get_key(sorted, item)),
            Op::First => FinalOp::First,
            Op::PopFirst => FinalOp::PopFirst,
            Op::Last => FinalOp::Last,
            Op::PopLast => FinalOp::PopLast,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum FinalOp {
    Insert(u32, u32),
    Get(u32),
    Remove(u32),
    First,
    PopFirst,
    Last,
    PopLast,
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    proptest::prop_oneof![
        (value_strategy(), 0u32..100).prop_map(|(key, value)| Op::Insert(key, value)),
        value_strategy().prop_map(Op::Get),
        value_strategy().prop_map(Op::Remove),
        Just(Op::First),
        Just(Op::PopFirst),
        Just(Op::Last),
        Just(Op::PopLast),
    ]
}

/// Applies `ops` to a `BTreeMap`, an `AvlTree` and an `AvlMap` side by side, checking that all
/// three agree and that the AVL invariants hold after every operation.
pub fn run_btree_equivalence(ops: Vec<Op>) {
    let mut sorted_keys = Vec::with_capacity(ops.len());
    let mut btree = BTreeMap::new();
    let mut avl: AvlTree<TestNode> = AvlTree::new();
    let mut map: AvlMap<u32, u32> = AvlMap::new();

    fn insert_sorted(v: &mut Vec<u32>, key: u32) {
        if let Err(idx) = v.binary_search(&key) {
            v.insert(idx, key);
        }
    }

    fn remove_sorted(v: &mut Vec<u32>, key: u32) {
        if let Ok(idx) = v.binary_search(&key) {
            v.remove(idx);
        }
    }

    #[inline]
    #[allow(clippy::boxed_local)]
    fn node_pair(node: Box<TestNode>) -> (u32, u32) {
        (node.key, node.value)
    }

    #[inline]
    fn ref_pair(node: &TestNode) -> (u32, u32) {
        (node.key, node.value)
    }

    for (op_id, op) in ops.into_iter().enumerate() {
        let final_op = op.finalize(&sorted_keys);

        match final_op {
            FinalOp::Insert(key, value) => {
                insert_sorted(&mut sorted_keys, key);

                let from_btree = btree.insert(key, value);
                let from_avl = avl.insert(TestNode::with_value(key, value));
                let from_map = map.insert(key, value);

                // The replaced node comes back unlinked.
                if let Some(old) = &from_avl {
                    assert!(!old.links.is_linked(), "FinalOp #{op_id}: {final_op:?}");
                }

                assert_eq!(from_btree, from_avl.map(|node| node.value), "FinalOp #{op_id}: {final_op:?}");
                assert_eq!(from_btree, from_map, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Get(key) => {
                let from_btree = btree.get(&key).copied();
                let from_avl = avl.get(&key).map(|node| node.value);
                let from_map = map.get(&key).copied();

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
                assert_eq!(from_btree, from_map, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Remove(key) => {
                remove_sorted(&mut sorted_keys, key);

                let from_btree = btree.remove(&key).map(|value| (key, value));
                let from_avl = avl.remove(&key).map(node_pair);
                let from_map = map.remove(&key).map(|value| (key, value));

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
                assert_eq!(from_btree, from_map, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::First => {
                let from_btree = btree.first_key_value().map(|(&k, &v)| (k, v));
                let from_avl = avl.first().map(|node| ref_pair(node.get_ref()));
                let from_map = map.first_key_value().map(|(&k, &v)| (k, v));

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
                assert_eq!(from_btree, from_map, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopFirst => {
                let from_btree = btree.pop_first();
                let from_avl = avl.pop_first().map(node_pair);
                let from_map = map.pop_first();

                if let Some((key, _)) = from_btree {
                    remove_sorted(&mut sorted_keys, key);
                }

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
                assert_eq!(from_btree, from_map, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Last => {
                let from_btree = btree.last_key_value().map(|(&k, &v)| (k, v));
                let from_avl = avl.last().map(|node| ref_pair(node.get_ref()));
                let from_map = map.last_key_value().map(|(&k, &v)| (k, v));

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
                assert_eq!(from_btree, from_map, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopLast => {
                let from_btree = btree.pop_last();
                let from_avl = avl.pop_last().map(node_pair);
                let from_map = map.pop_last();

                if let Some((key, _)) = from_btree {
                    remove_sorted(&mut sorted_keys, key);
                }

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
                assert_eq!(from_btree, from_map, "FinalOp #{op_id}: {final_op:?}");
            }
        }

        avl.assert_invariants();
        map.assert_invariants();
        assert_height_bound(avl.len(), avl.height());

        assert_eq!(btree.len(), avl.len());
        assert_eq!(btree.len(), map.len());
        assert!(btree.iter().map(|(&k, &v)| (k, v)).eq(avl.iter().map(ref_pair)));
        assert!(btree.iter().eq(map.iter()));
    }
}
