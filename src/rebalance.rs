use core::ptr::NonNull;

use crate::{balance::is_balanced, AvlTree, Link, Links, TreeNode};

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    // Performs a bottom-up rebalance of the tree after the insertion of `child`.
    //
    // Invariants:
    // - `parent` is the parent of `child`.
    // - `parent`'s height has already been recomputed, and it changed.
    //
    // At most one rotation is performed. A rotation after an insertion restores the pivot's
    // subtree to its height before the insertion, so nothing above it can have changed.
    pub(crate) unsafe fn insert_fix(&mut self, child: NonNull<T>, parent: NonNull<T>) {
        unsafe {
            debug_assert_eq!(T::links(child).as_ref().parent(), Some(parent));

            let mut parent = parent;

            loop {
                // Reaching the root region ends the walk.
                let Some(grandparent) = T::links(parent).as_ref().parent() else {
                    return;
                };

                let (left, right) = self.child_heights(grandparent);
                let (old, new) = self.update_height(grandparent);
                if old == new {
                    log::trace!("insert fix: height {new} unchanged, stopping");
                    return;
                }

                if !is_balanced(left, right) {
                    self.rotate(grandparent);
                    return;
                }

                parent = grandparent;
            }
        }
    }

    // Performs a bottom-up rebalance of the tree starting at `node`, the parent of a slot freed by
    // a removal.
    //
    // Unlike `insert_fix`, the walk continues after a rotation: a rotation after a removal can
    // shrink the rotated subtree, unbalancing an ancestor in turn.
    pub(crate) unsafe fn remove_fix(&mut self, node: Link<T>) {
        let mut opt_node = node;

        unsafe {
            while let Some(node) = opt_node {
                let (left, right) = self.child_heights(node);
                let (old, new) = self.update_height(node);

                if is_balanced(left, right) {
                    if old == new {
                        log::trace!("remove fix: height {new} unchanged, stopping");
                        return;
                    }

                    opt_node = T::links(node).as_ref().parent();
                } else {
                    // The new top is `y` after a single rotation and `x` after a double one.
                    let rotated = self.rotate(node);
                    log::trace!("remove fix: continuing above {:?} rotation", rotated.kind);
                    opt_node = T::links(rotated.top).as_ref().parent();
                }
            }
        }
    }
}
