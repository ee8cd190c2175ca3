use core::iter::FusedIterator;

use crate::{AvlTree, Link, Links, TreeNode};

/// An iterator over the elements of an [`AvlTree`], in ascending key order.
///
/// Each step follows the in-order successor of the previously yielded node.
pub struct Iter<'tree, T: TreeNode<Links<T>> + ?Sized> {
    tree: &'tree AvlTree<T>,
    next: Link<T>,
    len: usize,
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iter<'tree, T> {
    pub(crate) fn new(tree: &'tree AvlTree<T>) -> Self {
        let next = tree
            .bst
            .root
            .map(|root| unsafe { tree.bst.min_in_subtree(root) });

        Iter {
            tree,
            next,
            len: tree.len(),
        }
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iterator for Iter<'tree, T> {
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.next?;

        unsafe {
            self.next = self.tree.bst.successor(cur);
            self.len -= 1;

            Some(cur.as_ref())
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<T: TreeNode<Links<T>> + ?Sized> ExactSizeIterator for Iter<'_, T> {}

impl<T: TreeNode<Links<T>> + ?Sized> FusedIterator for Iter<'_, T> {}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> IntoIterator for &'tree AvlTree<T> {
    type Item = &'tree T;
    type IntoIter = Iter<'tree, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
