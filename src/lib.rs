//! An intrusive AVL tree.
#![cfg_attr(not(any(test, feature = "std")), no_std)]

// Conventions used in comments:
// - The height of a node `n` is denoted `h(n)`; a missing child has height 0.
// - A node is balanced if `|h(left) - h(right)| <= 1`.
// - `z` is the unbalanced pivot, `y` its taller child and `x` the taller child of `y`.
//
// The tree is split in two layers:
// - `bst::RawBst` does raw linkage only (find, leaf insert, unlink, successor, swap) and
//   never reads or writes heights.
// - `AvlTree` owns heights and balance, and restructures through `RawBst` and the rotation
//   engine in `rotate`.
//
// The fundamental invariants of an AVL tree are:
// 1. `h(n) = 1 + max(h(left(n)), h(right(n)))` for every node.
// 2. Every node is balanced.
//
// Corollary: a tree of height `h` holds at least `F(h + 2) - 1` nodes, so
// `h < 1.4405 * log2(n + 2) - 0.3277`.

use core::{
    borrow::Borrow, cell::UnsafeCell, fmt, marker::PhantomPinned, mem, ops::Not, pin::Pin,
    ptr::NonNull,
};

use cordyceps::Linked;

mod balance;
mod bst;
mod iter;
mod rebalance;
mod rotate;

#[cfg(any(test, feature = "alloc"))]
mod debug;
#[cfg(any(test, feature = "alloc"))]
pub mod map;
#[cfg(any(test, feature = "model"))]
pub mod model;
#[cfg(test)]
mod tests;

use bst::RawBst;

pub use iter::Iter;
#[cfg(any(test, feature = "alloc"))]
pub use map::AvlMap;
pub use rotate::Rotation;

pub trait TreeNode<L>: Linked<L> {
    type Key: Ord;

    fn key(&self) -> &Self::Key;
}

/// An intrusive AVL tree.
///
/// Every node stores its own height, and after each insertion or removal the tree walks back
/// up toward the root, recomputing heights and rotating wherever the two subtrees of a node
/// differ in height by more than one. Lookups, insertions and removals all complete in
/// _O(log(n))_ time.
pub struct AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    bst: RawBst<T>,
}

pub struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    height: u8,
    _unpin: PhantomPinned,
}

type Link<T> = Option<NonNull<T>>;

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a new empty tree.
    pub const fn new() -> AvlTree<T> {
        AvlTree {
            bst: RawBst::new(),
        }
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.bst.root.is_none());
        }

        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.bst.len
    }

    /// Returns the height of the tree.
    ///
    /// An empty tree has height 0 and a tree with a single element has height 1.
    pub fn height(&self) -> u8 {
        unsafe { self.height_of(self.bst.root) }
    }

    /// Checks every structural invariant of the tree, panicking if any is violated.
    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let Some(root) = self.bst.root else {
            assert_eq!(self.len(), 0, "empty tree has nonzero length");
            return;
        };

        unsafe {
            assert_eq!(
                T::links(root).as_ref().parent(),
                None,
                "root has a parent pointer"
            );

            let (count, _) = self.assert_invariants_at(root, None, None);
            assert_eq!(count, self.len(), "length does not match node count");
        }
    }

    // Returns the number of nodes in the subtree rooted at `node` and its height.
    unsafe fn assert_invariants_at(
        &self,
        node: NonNull<T>,
        lower: Option<&T::Key>,
        upper: Option<&T::Key>,
    ) -> (usize, u8) {
        unsafe {
            let key = node.as_ref().key();

            if let Some(lower) = lower {
                assert!(lower < key, "left subtree key not less than ancestor key");
            }
            if let Some(upper) = upper {
                assert!(key < upper, "right subtree key not greater than ancestor key");
            }

            let mut count = 1;
            let mut child_heights = [0; 2];

            for dir in [Dir::Left, Dir::Right] {
                if let Some(child) = T::links(node).as_ref().child(dir) {
                    // Ensure child's parent link points to this node.
                    let parent = T::links(child)
                        .as_ref()
                        .parent()
                        .expect("child parent pointer not set");
                    assert_eq!(node, parent, "child parent pointer is stale");

                    let (lower, upper) = match dir {
                        Dir::Left => (lower, Some(key)),
                        Dir::Right => (Some(key), upper),
                    };

                    let (child_count, child_height) =
                        self.assert_invariants_at(child, lower, upper);
                    count += child_count;
                    child_heights[dir as usize] = child_height;
                }
            }

            let [left, right] = child_heights;
            let height = T::links(node).as_ref().height();

            assert_eq!(
                height,
                balance::height_from_children(left, right),
                "stored height does not match children"
            );
            assert!(
                balance::is_balanced(left, right),
                "node is unbalanced: left height {left}, right height {right}"
            );

            (count, height)
        }
    }

    /// Returns a reference to the node corresponding to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.bst.find(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    /// Returns a mutable reference to the node corresponding to `key`.
    ///
    /// The node is pinned, as its links must not move while it is an element of the tree.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<Pin<&mut T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut ptr = self.bst.find(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_mut())) }
    }

    /// Returns `true` if the tree contains a node corresponding to `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.bst.find(key).is_some()
    }

    /// Returns the minimum element of the tree.
    pub fn first(&self) -> Option<Pin<&T>> {
        let root = self.bst.root?;

        unsafe {
            let first = self.bst.min_in_subtree(root);
            Some(Pin::new_unchecked(first.as_ref()))
        }
    }

    /// Returns the maximum element of the tree.
    pub fn last(&self) -> Option<Pin<&T>> {
        let root = self.bst.root?;

        unsafe {
            let last = self.bst.max_in_subtree(root);
            Some(Pin::new_unchecked(last.as_ref()))
        }
    }

    /// Returns an iterator over the elements of the tree in ascending key order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self)
    }

    /// Inserts an item into the tree.
    ///
    /// If the tree already contains an item with an equal key, `item` takes its place without
    /// changing the shape of the tree, and the previous item is returned.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, item: T::Handle) -> Option<T::Handle> {
        let ptr = T::into_ptr(item);

        unsafe {
            if let Some(existing) = self.bst.find(ptr.as_ref().key()) {
                self.bst.replace_node(existing, ptr);
                self.swap_heights(existing, ptr);
                T::links(existing).as_mut().reset();
                return Some(T::from_ptr(existing));
            }

            self.bst.insert_leaf(ptr);
            T::links(ptr).as_mut().set_height(1);
            log::debug!("inserted element, len = {}", self.len());

            // A new root has nothing above it to fix.
            let Some(parent) = T::links(ptr).as_ref().parent() else {
                return None;
            };

            // If the parent's height did not change, no ancestor's height changed either.
            let (old, new) = self.update_height(parent);
            if old != new {
                self.insert_fix(ptr, parent);
            }
        }

        None
    }

    /// Removes the element corresponding to `key` from the tree, returning it.
    ///
    /// Returns `None` if the tree contains no such element.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<T::Handle>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.bst.find(key)?;
        Some(unsafe { self.remove_at(node) })
    }

    /// Removes and returns the minimum element of the tree.
    pub fn pop_first(&mut self) -> Option<T::Handle> {
        let root = self.bst.root?;

        unsafe {
            let first = self.bst.min_in_subtree(root);
            Some(self.remove_at(first))
        }
    }

    /// Removes and returns the maximum element of the tree.
    pub fn pop_last(&mut self) -> Option<T::Handle> {
        let root = self.bst.root?;

        unsafe {
            let last = self.bst.max_in_subtree(root);
            Some(self.remove_at(last))
        }
    }

    /// Removes an arbitrary node from the tree.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element of `self`, and not any
    /// other tree.
    pub unsafe fn remove_at(&mut self, node: NonNull<T>) -> T::Handle {
        // There are three possible cases:
        //
        // 1. `node` is a leaf. It is unlinked, and its parent's slot is left empty.
        //
        // 2. `node` has one child. It is unlinked and its child is promoted into its slot.
        //
        // 3. `node` has two children. Its successor `s` (the least node of its right subtree) has no
        //    left child. `node` trades places with `s` and is then removed from `s`'s old position,
        //    where it has at most a right child, so this reduces to case 1 or 2.
        //
        // In every case, rebalancing starts at the parent of the slot that was physically freed.

        unsafe {
            let left = T::links(node).as_ref().left();
            let right = T::links(node).as_ref().right();

            let fix_from = match (left, right) {
                (Some(_), Some(_)) => {
                    let successor = self
                        .bst
                        .successor(node)
                        .expect("node with a right child must have a successor");

                    if T::links(successor).as_ref().is_leaf() {
                        // `node` lands in the successor's leaf slot.
                        self.swap_positions(node, successor);
                        self.bst.remove_node(node)
                    } else {
                        // `node` lands in the successor's slot, above the successor's right child,
                        // which is promoted once `node` is gone.
                        self.swap_positions(successor, node);
                        self.splice_out(node)
                    }
                }

                _ => self.splice_out(node),
            };

            self.remove_fix(fix_from);
            log::debug!("removed element, len = {}", self.len());

            T::links(node).as_mut().reset();
            T::from_ptr(node)
        }
    }

    // Unlinks `node`, which has at most one child, and promotes that child into the freed slot.
    //
    // Returns the parent of the freed slot.
    unsafe fn splice_out(&mut self, node: NonNull<T>) -> Link<T> {
        unsafe {
            let links = T::links(node).as_ref();
            debug_assert!(links.left().is_none() || links.right().is_none());

            let child = links.left().or(links.right());
            let dir = links.parent().map(|p| self.bst.which_child(p, node));

            let parent = self.bst.remove_node(node);

            if let Some(child) = child {
                match (parent, dir) {
                    (Some(parent), Some(dir)) => {
                        T::links(parent).as_mut().set_child(dir, Some(child));
                        T::links(child).as_mut().set_parent(Some(parent));
                    }

                    _ => {
                        self.bst.root = Some(child);
                        T::links(child).as_mut().set_parent(None);
                    }
                }
            }

            parent
        }
    }

    // Exchanges the tree positions of `a` and `b`, together with the heights of those positions.
    unsafe fn swap_positions(&mut self, a: NonNull<T>, b: NonNull<T>) {
        unsafe {
            self.bst.swap_positions(a, b);
            self.swap_heights(a, b);
        }
    }

    unsafe fn swap_heights(&mut self, a: NonNull<T>, b: NonNull<T>) {
        unsafe {
            let a_height = T::links(a).as_ref().height();
            let b_height = T::links(b).as_mut().set_height(a_height);
            T::links(a).as_mut().set_height(b_height);
        }
    }

    /// Clears the tree, removing all elements.
    pub fn clear(&mut self) {
        self.bst.clear();
    }
}

impl<T> Default for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: ?Sized> Links<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                height: 0,
                _unpin: PhantomPinned,
            }),
        }
    }

    /// Returns `true` if the node owning these links is currently an element of a tree.
    pub fn is_linked(&self) -> bool {
        self.height() != 0
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.left().is_none() && self.right().is_none()
    }

    #[inline]
    fn height(&self) -> u8 {
        unsafe { (*self.inner.get()).height }
    }

    #[inline]
    fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    #[inline]
    fn set_parent(&mut self, parent: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    fn set_child(&mut self, dir: Dir, child: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    fn set_height(&mut self, height: u8) -> u8 {
        mem::replace(&mut self.inner.get_mut().height, height)
    }

    #[inline]
    fn reset(&mut self) {
        let inner = self.inner.get_mut();
        inner.parent = None;
        inner.children = [None; 2];
        inner.height = 0;
    }
}

impl<T: ?Sized> Default for Links<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("parent", &self.parent())
            .field("left", &self.left())
            .field("right", &self.right())
            .field("height", &self.height())
            .finish()
    }
}
