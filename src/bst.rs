//! Raw binary search tree linkage.
//!
//! Nothing in this module reads or writes node heights; keeping heights correct across these
//! operations is the job of the AVL layer in the crate root.

use core::{borrow::Borrow, cmp::Ordering, ptr::NonNull};

use crate::{Dir, Link, Links, TreeNode};

pub(crate) struct RawBst<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) root: Link<T>,
    pub(crate) len: usize,
}

impl<T> RawBst<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) const fn new() -> RawBst<T> {
        RawBst { root: None, len: 0 }
    }

    /// Returns the node corresponding to `key`.
    pub(crate) fn find<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;

            unsafe {
                match key.cmp(cur.as_ref().key().borrow()) {
                    Ordering::Less => opt_cur = T::links(cur).as_ref().left(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = T::links(cur).as_ref().right(),
                }
            }
        }
    }

    /// Links `ptr` into the tree as a new leaf.
    ///
    /// # Safety
    ///
    /// `ptr` must not be an element of any tree, and no element of `self` may have a key equal to
    /// `ptr`'s.
    pub(crate) unsafe fn insert_leaf(&mut self, ptr: NonNull<T>) {
        unsafe {
            let links = T::links(ptr).as_mut();
            links.set_parent(None);
            links.set_child(Dir::Left, None);
            links.set_child(Dir::Right, None);
        }

        self.len += 1;

        let Some(mut parent) = self.root else {
            self.root = Some(ptr);
            return;
        };

        // Descend the tree, looking for an empty slot.
        loop {
            let dir = match unsafe { ptr.as_ref().key().cmp(parent.as_ref().key()) } {
                Ordering::Less => Dir::Left,
                Ordering::Equal => unreachable!("duplicate key passed to `insert_leaf`"),
                Ordering::Greater => Dir::Right,
            };

            unsafe {
                let parent_links = T::links(parent).as_mut();
                match parent_links.child(dir) {
                    Some(child) => parent = child,
                    None => {
                        parent_links.set_child(dir, Some(ptr));
                        T::links(ptr).as_mut().set_parent(Some(parent));
                        return;
                    }
                }
            }
        }
    }

    /// Detaches `node`, which must have at most one child, from its parent.
    ///
    /// Returns the parent of the freed slot. The node's own links, including the link to its
    /// child, are left untouched; relinking that child is up to the caller.
    pub(crate) unsafe fn remove_node(&mut self, node: NonNull<T>) -> Link<T> {
        unsafe {
            debug_assert!(
                T::links(node).as_ref().left().is_none() || T::links(node).as_ref().right().is_none(),
                "`remove_node` called on a node with two children"
            );

            let parent = T::links(node).as_ref().parent();
            match parent {
                Some(parent) => {
                    let dir = self.which_child(parent, node);
                    T::links(parent).as_mut().set_child(dir, None);
                }
                None => self.root = None,
            }

            self.len -= 1;

            parent
        }
    }

    /// Returns the in-order successor of `node`.
    pub(crate) unsafe fn successor(&self, node: NonNull<T>) -> Link<T> {
        unsafe {
            if let Some(right) = T::links(node).as_ref().right() {
                return Some(self.min_in_subtree(right));
            }

            // Ascend until `cur` is a left child; its parent is the successor.
            let mut cur = node;
            while let Some(parent) = T::links(cur).as_ref().parent() {
                match self.which_child(parent, cur) {
                    Dir::Left => return Some(parent),
                    Dir::Right => cur = parent,
                }
            }

            None
        }
    }

    /// Returns the minimum node in the subtree rooted at `root`.
    #[inline]
    pub(crate) unsafe fn min_in_subtree(&self, root: NonNull<T>) -> NonNull<T> {
        let mut cur = root;

        while let Some(left) = unsafe { T::links(cur).as_ref().left() } {
            cur = left;
        }

        cur
    }

    /// Returns the maximum node in the subtree rooted at `root`.
    #[inline]
    pub(crate) unsafe fn max_in_subtree(&self, root: NonNull<T>) -> NonNull<T> {
        let mut cur = root;

        while let Some(right) = unsafe { T::links(cur).as_ref().right() } {
            cur = right;
        }

        cur
    }

    /// Exchanges the positions of `a` and `b` in the tree.
    ///
    /// Each node keeps its own key and payload; only parent and child links change hands. The two
    /// nodes may be adjacent.
    pub(crate) unsafe fn swap_positions(&mut self, a: NonNull<T>, b: NonNull<T>) {
        if a == b {
            return;
        }

        // Maps a link that pointed at one of the swapped nodes to the other.
        let swap = |link: Link<T>| match link {
            Some(n) if n == a => Some(b),
            Some(n) if n == b => Some(a),
            other => other,
        };

        unsafe {
            let a_parent = T::links(a).as_ref().parent();
            let b_parent = T::links(b).as_ref().parent();

            // Record parent slots before any link changes.
            let a_dir = a_parent.map(|p| self.which_child(p, a));
            let b_dir = b_parent.map(|p| self.which_child(p, b));

            let a_children = [Dir::Left, Dir::Right].map(|d| T::links(a).as_ref().child(d));
            let b_children = [Dir::Left, Dir::Right].map(|d| T::links(b).as_ref().child(d));

            T::links(a).as_mut().set_parent(swap(b_parent));
            T::links(b).as_mut().set_parent(swap(a_parent));

            for dir in [Dir::Left, Dir::Right] {
                T::links(a).as_mut().set_child(dir, swap(b_children[dir as usize]));
                T::links(b).as_mut().set_child(dir, swap(a_children[dir as usize]));
            }

            // Repoint the slots of outside parents. A parent that is one of the swapped nodes was
            // already fixed above.
            match (a_parent, a_dir) {
                (Some(p), Some(dir)) if p != b => {
                    T::links(p).as_mut().set_child(dir, Some(b));
                }
                _ => {}
            }
            match (b_parent, b_dir) {
                (Some(p), Some(dir)) if p != a => {
                    T::links(p).as_mut().set_child(dir, Some(a));
                }
                _ => {}
            }

            // Repoint the parent links of outside children.
            for node in [a, b] {
                for dir in [Dir::Left, Dir::Right] {
                    if let Some(child) = T::links(node).as_ref().child(dir) {
                        if child != a && child != b {
                            T::links(child).as_mut().set_parent(Some(node));
                        }
                    }
                }
            }

            if self.root == Some(a) {
                self.root = Some(b);
            } else if self.root == Some(b) {
                self.root = Some(a);
            }
        }
    }

    /// Puts `new` in the exact position of `old`, taking over its parent and child links.
    ///
    /// `old` is left detached with its parent and child links cleared.
    pub(crate) unsafe fn replace_node(&mut self, old: NonNull<T>, new: NonNull<T>) {
        unsafe {
            let parent = T::links(old).as_ref().parent();
            let children = [Dir::Left, Dir::Right].map(|d| T::links(old).as_ref().child(d));

            let new_links = T::links(new).as_mut();
            new_links.set_parent(parent);

            for dir in [Dir::Left, Dir::Right] {
                let child = children[dir as usize];
                new_links.set_child(dir, child);
                self.maybe_set_parent(child, Some(new));
            }

            match parent {
                Some(parent) => {
                    let dir = self.which_child(parent, old);
                    T::links(parent).as_mut().set_child(dir, Some(new));
                }
                None => self.root = Some(new),
            }

            let old_links = T::links(old).as_mut();
            old_links.set_parent(None);
            old_links.set_child(Dir::Left, None);
            old_links.set_child(Dir::Right, None);
        }
    }

    /// Unlinks and drops every node, leaving the tree empty.
    pub(crate) fn clear(&mut self) {
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node.
                let cur = self.min_in_subtree(cur);
                let parent = T::links(cur).as_ref().parent();
                let right = T::links(cur).as_ref().right();

                // Elevate the node's right child (which may be None).
                match parent {
                    Some(parent) => {
                        T::links(parent).as_mut().set_child(Dir::Left, right);
                    }
                    None => self.root = right,
                }
                self.maybe_set_parent(right, parent);

                T::links(cur).as_mut().reset();
                drop(T::from_ptr(cur));
                self.len -= 1;

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len, 0);
    }

    #[inline]
    pub(crate) unsafe fn maybe_set_parent(&mut self, opt_node: Link<T>, parent: Link<T>) {
        let Some(node) = opt_node else {
            return;
        };

        unsafe { T::links(node).as_mut().set_parent(parent) };
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with `new_child`, or makes
    // `new_child` the root if `parent` is `None`.
    //
    // `new_child`'s parent pointer is not updated.
    #[inline]
    pub(crate) unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        match parent {
            Some(parent) => unsafe {
                let dir = self.which_child(parent, old_child);
                T::links(parent).as_mut().set_child(dir, new_child);
            },
            None => self.root = new_child,
        }
    }

    /// Returns which child of `parent` `child` is.
    ///
    /// In debug builds, panics if `child` is not a child of `parent`.
    #[inline]
    pub(crate) unsafe fn which_child(&self, parent: NonNull<T>, child: NonNull<T>) -> Dir {
        unsafe {
            let links = T::links(parent).as_ref();

            if links.left() == Some(child) {
                Dir::Left
            } else {
                debug_assert_eq!(
                    links.right(),
                    Some(child),
                    "`child` must be a child of `parent`"
                );
                Dir::Right
            }
        }
    }
}
