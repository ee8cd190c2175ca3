use core::ptr::NonNull;

use crate::{
    balance::{is_balanced, taller_side},
    AvlTree, Dir, Link, Links, TreeNode,
};

/// The restructuring applied at an unbalanced node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rotation {
    /// The right child's right subtree was too tall.
    SingleLeft,
    /// The left child's left subtree was too tall.
    SingleRight,
    /// The right child's left subtree was too tall.
    DoubleLeft,
    /// The left child's right subtree was too tall.
    DoubleRight,
}

impl Rotation {
    #[inline]
    pub fn is_double(self) -> bool {
        matches!(self, Rotation::DoubleLeft | Rotation::DoubleRight)
    }
}

/// The outcome of rebalancing at a pivot.
pub(crate) struct Rotated<T: ?Sized> {
    pub(crate) kind: Rotation,
    /// The node now occupying the pivot's former position.
    pub(crate) top: NonNull<T>,
}

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    // Rebalances the subtree rooted at the unbalanced node `z`.
    //
    // `y` is the taller child of `z`, and `x` the taller child of `y`. When both children of `y`
    // are equally tall, `x` is taken on the same side as `y`, which resolves with a single
    // rotation.
    pub(crate) unsafe fn rotate(&mut self, z: NonNull<T>) -> Rotated<T> {
        unsafe {
            let (z_left, z_right) = self.child_heights(z);
            debug_assert!(!is_balanced(z_left, z_right), "rotating at a balanced node");

            // An unbalanced node never has equally tall children.
            let y_dir = taller_side(z_left, z_right).unwrap_or(Dir::Right);
            let y = T::links(z)
                .as_ref()
                .child(y_dir)
                .expect("taller child of an unbalanced node must exist");

            let (y_left, y_right) = self.child_heights(y);
            let x_dir = taller_side(y_left, y_right).unwrap_or(y_dir);
            let x = T::links(y)
                .as_ref()
                .child(x_dir)
                .expect("taller child of a node of height 2 or more must exist");

            let kind = match (y_dir, x_dir == y_dir) {
                (Dir::Left, true) => Rotation::SingleRight,
                (Dir::Right, true) => Rotation::SingleLeft,
                (Dir::Left, false) => Rotation::DoubleRight,
                (Dir::Right, false) => Rotation::DoubleLeft,
            };

            log::trace!(
                "{kind:?} rotation at pivot with child heights {z_left}/{z_right}, len = {}",
                self.len()
            );

            let top = match kind {
                Rotation::SingleLeft => {
                    self.single_left(z, y, Some(x));
                    y
                }
                Rotation::SingleRight => {
                    self.single_right(z, y, Some(x));
                    y
                }
                Rotation::DoubleLeft => {
                    self.double_left(z, y, x);
                    x
                }
                Rotation::DoubleRight => {
                    self.double_right(z, y, x);
                    x
                }
            };

            Rotated { kind, top }
        }
    }

    // Rotates `y`, the right child of `z`, into `z`'s place.
    unsafe fn single_left(&mut self, z: NonNull<T>, y: NonNull<T>, x: Link<T>) {
        unsafe {
            debug_assert_eq!(T::links(z).as_ref().right(), Some(y));
            self.single_rotation(z, y, x);
        }
    }

    // Rotates `y`, the left child of `z`, into `z`'s place.
    unsafe fn single_right(&mut self, z: NonNull<T>, y: NonNull<T>, x: Link<T>) {
        unsafe {
            debug_assert_eq!(T::links(z).as_ref().left(), Some(y));
            self.single_rotation(z, y, x);
        }
    }

    // `x` is the right child of `y`, which is the left child of `z`.
    unsafe fn double_right(&mut self, z: NonNull<T>, y: NonNull<T>, x: NonNull<T>) {
        unsafe {
            let x_right = T::links(x).as_ref().right();
            self.single_left(y, x, x_right);
            self.single_right(z, x, Some(y));
        }
    }

    // `x` is the left child of `y`, which is the right child of `z`.
    unsafe fn double_left(&mut self, z: NonNull<T>, y: NonNull<T>, x: NonNull<T>) {
        unsafe {
            let x_left = T::links(x).as_ref().left();
            self.single_right(y, x, x_left);
            self.single_left(z, x, Some(y));
        }
    }

    // Moves `y` up into the position of its parent `z`, and `z` down to become the child of `y`.
    //
    // - `y` takes over `z`'s parent, or becomes the root.
    // - `z` becomes the `!dir` child of `y`.
    // - `across` goes from the `!dir` child of `y` to the `dir` child of `z`.
    //
    // The heights of `x`, `z` and `y` are then recomputed, in that order.
    unsafe fn single_rotation(&mut self, z: NonNull<T>, y: NonNull<T>, x: Link<T>) {
        unsafe {
            let dir = self.bst.which_child(z, y);
            let z_parent = T::links(z).as_ref().parent();

            let across = T::links(y).as_ref().child(!dir);
            T::links(z).as_mut().set_child(dir, across);
            self.bst.maybe_set_parent(across, Some(z));

            T::links(y).as_mut().set_child(!dir, Some(z));
            T::links(z).as_mut().set_parent(Some(y));

            T::links(y).as_mut().set_parent(z_parent);
            self.bst.replace_child_or_set_root(z_parent, z, Some(y));

            // `y` depends on `z`, so it goes last.
            self.maybe_update_height(x);
            self.update_height(z);
            self.update_height(y);
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::prelude::v1::*;

    use super::*;
    use crate::{
        model::TestNode,
        tests::{raw_tree, summary},
    };

    fn rotate_at(tree: &mut AvlTree<TestNode>, key: u32) -> (Rotation, u32) {
        let z = tree.bst.find(&key).expect("pivot not found");
        let Rotated { kind, top } = unsafe { tree.rotate(z) };
        (kind, unsafe { top.as_ref().key })
    }

    #[test]
    fn single_left_at_root() {
        let mut tree = raw_tree(&[1, 2, 3]);
        assert_eq!(rotate_at(&mut tree, 1), (Rotation::SingleLeft, 2));

        assert_eq!(summary(&tree, 2), (2, Some(1), Some(3), None));
        assert_eq!(summary(&tree, 1), (1, None, None, Some(2)));
        assert_eq!(summary(&tree, 3), (1, None, None, Some(2)));
        tree.assert_invariants();
    }

    #[test]
    fn single_right_at_root() {
        let mut tree = raw_tree(&[3, 2, 1]);
        assert_eq!(rotate_at(&mut tree, 3), (Rotation::SingleRight, 2));

        assert_eq!(summary(&tree, 2), (2, Some(1), Some(3), None));
        tree.assert_invariants();
    }

    #[test]
    fn double_left_at_root() {
        let mut tree = raw_tree(&[10, 20, 15]);
        assert_eq!(rotate_at(&mut tree, 10), (Rotation::DoubleLeft, 15));

        assert_eq!(summary(&tree, 15), (2, Some(10), Some(20), None));
        tree.assert_invariants();
    }

    #[test]
    fn double_right_at_root() {
        let mut tree = raw_tree(&[30, 10, 20]);
        assert_eq!(rotate_at(&mut tree, 30), (Rotation::DoubleRight, 20));

        assert_eq!(summary(&tree, 20), (2, Some(10), Some(30), None));
        tree.assert_invariants();
    }

    #[test]
    fn tie_prefers_single_rotation() {
        // 1 is the pivot; 3 has two children of equal height.
        let mut tree = raw_tree(&[1, 3, 2, 4]);
        assert_eq!(rotate_at(&mut tree, 1), (Rotation::SingleLeft, 3));

        assert_eq!(summary(&tree, 3), (3, Some(1), Some(4), None));
        assert_eq!(summary(&tree, 1), (2, None, Some(2), Some(3)));
        assert_eq!(summary(&tree, 2), (1, None, None, Some(1)));
        tree.assert_invariants();
    }

    #[test]
    fn rotation_below_root_relinks_parent() {
        let mut tree = raw_tree(&[10, 5, 20, 25, 30]);
        assert_eq!(rotate_at(&mut tree, 20), (Rotation::SingleLeft, 25));

        // Heights above the rotated subtree are left for the caller to fix.
        let root = tree.bst.root.unwrap();
        assert_eq!(unsafe { tree.update_height(root) }, (4, 3));

        assert_eq!(summary(&tree, 10), (3, Some(5), Some(25), None));
        assert_eq!(summary(&tree, 25), (2, Some(20), Some(30), Some(10)));
        tree.assert_invariants();
    }

    #[test]
    fn double_rotation_carries_grandchildren() {
        // Pivot 50 is left-heavy through 20's right child 30, which has children on both sides.
        let mut tree = raw_tree(&[50, 20, 60, 10, 30, 25, 35]);
        assert_eq!(rotate_at(&mut tree, 50), (Rotation::DoubleRight, 30));

        assert_eq!(summary(&tree, 30), (3, Some(20), Some(50), None));
        assert_eq!(summary(&tree, 20), (2, Some(10), Some(25), Some(30)));
        assert_eq!(summary(&tree, 50), (2, Some(35), Some(60), Some(30)));
        tree.assert_invariants();
    }

    #[test]
    fn double_predicate() {
        assert!(Rotation::DoubleLeft.is_double());
        assert!(Rotation::DoubleRight.is_double());
        assert!(!Rotation::SingleLeft.is_double());
        assert!(!Rotation::SingleRight.is_double());
    }
}
