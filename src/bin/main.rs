use std::ptr::NonNull;

use cordyceps::Linked;
use cordyceps_avl::{AvlMap, AvlTree, Links, TreeNode};

#[derive(Debug)]
#[repr(C)]
struct DemoNode {
    links: Links<DemoNode>,
    key: u32,
}

impl DemoNode {
    fn new(key: u32) -> Box<DemoNode> {
        Box::new(DemoNode {
            links: Links::new(),
            key,
        })
    }
}

unsafe impl Linked<Links<DemoNode>> for DemoNode {
    type Handle = Box<DemoNode>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        NonNull::new(Box::into_raw(r)).unwrap()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<DemoNode>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

impl TreeNode<Links<DemoNode>> for DemoNode {
    type Key = u32;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

fn show(tree: &AvlTree<DemoNode>) {
    let mut out = String::new();
    tree.print(&mut out).expect("writing to a String cannot fail");
    println!("height {}: {out}", tree.height());
}

fn main() {
    env_logger::init();

    let mut tree: AvlTree<DemoNode> = AvlTree::new();

    for key in [4, 2, 6, 1, 3, 5, 7] {
        tree.insert(DemoNode::new(key));
        tree.assert_invariants();
        show(&tree);
    }

    let removed = tree.remove(&4).map(|node| node.key);
    assert_eq!(removed, Some(4));
    tree.assert_invariants();
    show(&tree);

    let mut graph = String::new();
    tree.dotgraph("demo", &mut graph)
        .expect("writing to a String cannot fail");
    println!("{graph}");

    let first = tree.pop_first().unwrap().key;
    assert_eq!(first, 1);
    tree.assert_invariants();

    let mut map: AvlMap<&str, u32> = AvlMap::new();
    for (i, word) in "the quick brown fox jumps over the lazy dog".split(' ').enumerate() {
        map.insert(word, i as u32);
    }
    map.assert_invariants();
    println!("{map:?} (height {})", map.height());

    drop(tree);
}
