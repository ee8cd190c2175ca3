use core::ptr::NonNull;

use crate::{AvlTree, Dir, Link, Links, TreeNode};

/// Returns the height of a node whose children have heights `left` and `right`.
#[inline]
pub(crate) const fn height_from_children(left: u8, right: u8) -> u8 {
    if left > right {
        left + 1
    } else {
        right + 1
    }
}

/// Returns `true` if a node whose children have heights `left` and `right` is balanced.
#[inline]
pub(crate) const fn is_balanced(left: u8, right: u8) -> bool {
    left.abs_diff(right) <= 1
}

/// Returns the side holding the strictly taller child, or `None` on a tie.
#[inline]
pub(crate) fn taller_side(left: u8, right: u8) -> Option<Dir> {
    match left.cmp(&right) {
        core::cmp::Ordering::Less => Some(Dir::Right),
        core::cmp::Ordering::Equal => None,
        core::cmp::Ordering::Greater => Some(Dir::Left),
    }
}

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns the height of the pointed-to node, or 0 if there is none.
    #[inline]
    pub(crate) unsafe fn height_of(&self, node: Link<T>) -> u8 {
        node.map(|n| unsafe { T::links(n).as_ref().height() })
            .unwrap_or(0)
    }

    /// Returns the heights of `node`'s left and right children.
    #[inline]
    pub(crate) unsafe fn child_heights(&self, node: NonNull<T>) -> (u8, u8) {
        unsafe {
            let links = T::links(node).as_ref();
            (self.height_of(links.left()), self.height_of(links.right()))
        }
    }

    /// Recomputes the height of `node` from its children's heights.
    ///
    /// Returns the old and new heights.
    #[inline]
    pub(crate) unsafe fn update_height(&mut self, node: NonNull<T>) -> (u8, u8) {
        unsafe {
            let (left, right) = self.child_heights(node);
            let new = height_from_children(left, right);
            let old = T::links(node).as_mut().set_height(new);
            (old, new)
        }
    }

    #[inline]
    pub(crate) unsafe fn maybe_update_height(&mut self, node: Link<T>) {
        if let Some(node) = node {
            unsafe { self.update_height(node) };
        }
    }
}
