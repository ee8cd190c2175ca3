extern crate alloc;

use alloc::boxed::Box;
use core::{borrow::Borrow, fmt, iter::FusedIterator, marker::PhantomPinned, mem, ptr::NonNull};

use cordyceps::Linked;

use crate::{AvlTree, Links, TreeNode};

/// An ordered map based on an [AVL tree].
///
/// [AVL tree]: https://en.wikipedia.org/wiki/AVL_tree
pub struct AvlMap<K: Ord, V> {
    tree: AvlTree<MapNode<K, V>>,
}

struct MapNode<K, V> {
    links: Links<MapNode<K, V>>,
    key: K,
    value: V,
    _unpin: PhantomPinned,
}

unsafe impl<K, V> Linked<Links<MapNode<K, V>>> for MapNode<K, V> {
    type Handle = Box<Self>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        Box::leak(r).into()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<MapNode<K, V>>> {
        let ptr = ptr.as_ptr();
        unsafe { NonNull::new_unchecked(core::ptr::addr_of_mut!((*ptr).links)) }
    }
}

impl<K: Ord, V> TreeNode<Links<MapNode<K, V>>> for MapNode<K, V> {
    type Key = K;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

// SAFETY: the map uniquely owns every node reachable from it, exactly like a `Box<(K, V)>`.
unsafe impl<K: Ord + Send, V: Send> Send for AvlMap<K, V> {}
// SAFETY: shared access to the map only hands out shared references to keys and values.
unsafe impl<K: Ord + Sync, V: Sync> Sync for AvlMap<K, V> {}

impl<K: Ord, V> AvlMap<K, V> {
    /// Creates a new, empty `AvlMap`.
    pub const fn new() -> Self {
        Self {
            tree: AvlTree::new(),
        }
    }

    /// Returns `true` if the map contains no elements.
    pub const fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of elements in the map.
    pub const fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns the height of the underlying tree.
    pub fn height(&self) -> u8 {
        self.tree.height()
    }

    /// Returns `true` if the map contains a value associated with `key`.
    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.contains_key(key)
    }

    /// Returns a reference to the value associated with `key`.
    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.get(key).map(|node| &node.get_ref().value)
    }

    /// Returns a mutable reference to the value associated with `key`.
    #[inline]
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree
            .get_mut(key)
            // SAFETY: Pinning is not structural for `node.value`.
            .map(|node| unsafe { &mut node.get_unchecked_mut().value })
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map already contained `key`, its value is overwritten in place and the old value is
    /// returned. The shape of the tree is unchanged in that case.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(slot) = self.get_mut(&key) {
            return Some(mem::replace(slot, value));
        }

        let replaced = self.tree.insert(Box::new(MapNode {
            links: Links::new(),
            key,
            value,
            _unpin: PhantomPinned,
        }));
        debug_assert!(replaced.is_none());

        None
    }

    /// Returns the first key-value pair in the map.
    ///
    /// The returned key is the minimum key in the map.
    #[inline]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.tree.first().map(|node| {
            let node = node.get_ref();
            (&node.key, &node.value)
        })
    }

    /// Removes and returns the first key-value pair in the map.
    ///
    /// The returned key is the minimum key in the map.
    #[inline]
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.tree.pop_first().map(MapNode::into_pair)
    }

    /// Returns the last key-value pair in the map.
    ///
    /// The returned key is the maximum key in the map.
    #[inline]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.tree.last().map(|node| {
            let node = node.get_ref();
            (&node.key, &node.value)
        })
    }

    /// Removes and returns the last key-value pair in the map.
    ///
    /// The returned key is the maximum key in the map.
    #[inline]
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.tree.pop_last().map(MapNode::into_pair)
    }

    /// Removes the value associated with `key` from the map.
    ///
    /// Removing a key that is not present does nothing and returns `None`.
    #[inline]
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.remove(key).map(|node| node.value)
    }

    /// Clears the map, removing all elements.
    #[inline]
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Returns an iterator over the entries of the map, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.tree.iter(),
        }
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        self.tree.assert_invariants();
    }
}

impl<K, V> MapNode<K, V> {
    #[allow(clippy::boxed_local)]
    fn into_pair(node: Box<Self>) -> (K, V) {
        let MapNode { key, value, .. } = *node;
        (key, value)
    }
}

impl<K: Ord, V> Default for AvlMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + fmt::Debug, V: fmt::Debug> fmt::Debug for AvlMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord, V> Extend<(K, V)> for AvlMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for AvlMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = AvlMap::new();
        map.extend(iter);
        map
    }
}

/// An iterator over the entries of an [`AvlMap`], sorted by key.
pub struct Iter<'map, K: Ord, V> {
    inner: crate::Iter<'map, MapNode<K, V>>,
}

impl<'map, K: Ord, V> Iterator for Iter<'map, K, V> {
    type Item = (&'map K, &'map V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|node| (&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Ord, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K: Ord, V> FusedIterator for Iter<'_, K, V> {}

impl<'map, K: Ord, V> IntoIterator for &'map AvlMap<K, V> {
    type Item = (&'map K, &'map V);
    type IntoIter = Iter<'map, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
