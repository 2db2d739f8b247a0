//! Typed entity references and entity-indexed maps.
//!
//! Nodes in the mcc compiler need to reference other nodes: expressions
//! reference their operands, variable uses reference identifier records, and
//! so on. These references are not implemented as Rust references, both
//! because Rust's ownership and mutability rules make it difficult for the
//! passes that annotate nodes in place, and because 64-bit pointers take up a
//! lot of space in a compact in-memory representation. Instead, an entity
//! reference is a struct wrapping a `u32` index into a [`PrimaryMap`] owned
//! by an enclosing container. There is a separate index type for each entity
//! type, so we don't lose type safety.
//!
//! Use the [`entity_impl!`] macro to define a new entity reference type.

#![deny(missing_docs)]

use core::marker::PhantomData;
use core::ops::{Index, IndexMut};

/// A type wrapping a small integer index that identifies an entity in a
/// [`PrimaryMap`].
pub trait EntityRef: Copy + Eq {
    /// Create a new entity reference from a small integer.
    /// This should crash if the requested index is not representable.
    fn new(index: usize) -> Self;

    /// Get the index that was used to create this entity reference.
    fn index(self) -> usize;
}

/// Macro which provides the common implementation of a 32-bit entity
/// reference: the [`EntityRef`] trait, a `from_u32`/`as_u32` pair, and
/// `Display`/`Debug` in the `prefixNN` notation used by the textual dumps.
#[macro_export]
macro_rules! entity_impl {
    ($entity:ident) => {
        impl $crate::EntityRef for $entity {
            fn new(index: usize) -> Self {
                debug_assert!(index < (u32::MAX as usize));
                $entity(index as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl $entity {
            /// Create a new entity reference from its number.
            #[allow(dead_code)]
            pub fn from_u32(x: u32) -> Self {
                debug_assert!(x < u32::MAX);
                $entity(x)
            }

            /// Return the underlying index value as a `u32`.
            #[allow(dead_code)]
            pub fn as_u32(self) -> u32 {
                self.0
            }
        }
    };

    ($entity:ident, $display_prefix:expr) => {
        $crate::entity_impl!($entity);

        impl core::fmt::Display for $entity {
            fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
                write!(f, concat!($display_prefix, "{}"), self.0)
            }
        }

        impl core::fmt::Debug for $entity {
            fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
                (self as &dyn core::fmt::Display).fmt(f)
            }
        }
    };
}

/// A primary mapping `K -> V` allocating dense entity references.
///
/// The `PrimaryMap` is the main definition of an entity type: pushing a value
/// allocates the next entity reference, and entities are never removed, so a
/// reference stays valid for the life of the map.
#[derive(Debug, Clone)]
pub struct PrimaryMap<K, V>
where
    K: EntityRef,
{
    elems: Vec<V>,
    unused: PhantomData<K>,
}

impl<K, V> PrimaryMap<K, V>
where
    K: EntityRef,
{
    /// Create a new empty map.
    pub fn new() -> Self {
        Self {
            elems: Vec::new(),
            unused: PhantomData,
        }
    }

    /// Check if `k` is a valid key in the map.
    pub fn is_valid(&self, k: K) -> bool {
        k.index() < self.elems.len()
    }

    /// Get the element at `k` if it exists.
    pub fn get(&self, k: K) -> Option<&V> {
        self.elems.get(k.index())
    }

    /// Get the element at `k` if it exists, mutable version.
    pub fn get_mut(&mut self, k: K) -> Option<&mut V> {
        self.elems.get_mut(k.index())
    }

    /// Is this map completely empty?
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// Get the total number of entity references created.
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    /// Append `v` to the mapping, assigning a new entity reference.
    pub fn push(&mut self, v: V) -> K {
        let k = K::new(self.elems.len());
        self.elems.push(v);
        k
    }

    /// Iterate over all the keys in this map.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = K> + '_ {
        (0..self.elems.len()).map(K::new)
    }

    /// Iterate over all the values in this map.
    pub fn values(&self) -> core::slice::Iter<V> {
        self.elems.iter()
    }

    /// Iterate over all the keys and values in this map.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (K, &V)> + '_ {
        self.elems.iter().enumerate().map(|(i, v)| (K::new(i), v))
    }
}

impl<K, V> Default for PrimaryMap<K, V>
where
    K: EntityRef,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable indexing into a `PrimaryMap`. The indexed value must be in the map.
impl<K, V> Index<K> for PrimaryMap<K, V>
where
    K: EntityRef,
{
    type Output = V;

    fn index(&self, k: K) -> &V {
        &self.elems[k.index()]
    }
}

/// Mutable indexing into a `PrimaryMap`.
impl<K, V> IndexMut<K> for PrimaryMap<K, V>
where
    K: EntityRef,
{
    fn index_mut(&mut self, k: K) -> &mut V {
        &mut self.elems[k.index()]
    }
}

/// A mapping `K -> V` for densely indexed entity references with a default
/// value.
///
/// The `SecondaryMap` data structure associates secondary information with
/// entities defined elsewhere in a `PrimaryMap`. Unlike the primary map it
/// does not allocate entity references: all keys are valid, and unmapped keys
/// read as the default value.
#[derive(Debug, Clone)]
pub struct SecondaryMap<K, V>
where
    K: EntityRef,
    V: Clone,
{
    elems: Vec<V>,
    default: V,
    unused: PhantomData<K>,
}

impl<K, V> SecondaryMap<K, V>
where
    K: EntityRef,
    V: Clone + Default,
{
    /// Create a new empty map.
    pub fn new() -> Self {
        Self {
            elems: Vec::new(),
            default: Default::default(),
            unused: PhantomData,
        }
    }
}

impl<K, V> SecondaryMap<K, V>
where
    K: EntityRef,
    V: Clone,
{
    /// Create a new empty map with a specified default value.
    pub fn with_default(default: V) -> Self {
        Self {
            elems: Vec::new(),
            default,
            unused: PhantomData,
        }
    }

    /// Returns the number of elements the map can hold without growing.
    pub fn capacity(&self) -> usize {
        self.elems.capacity()
    }
}

impl<K, V> Default for SecondaryMap<K, V>
where
    K: EntityRef,
    V: Clone + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable indexing into a `SecondaryMap`. All keys are permitted; unmapped
/// keys return the default value.
impl<K, V> Index<K> for SecondaryMap<K, V>
where
    K: EntityRef,
    V: Clone,
{
    type Output = V;

    fn index(&self, k: K) -> &V {
        self.elems.get(k.index()).unwrap_or(&self.default)
    }
}

/// Mutable indexing into a `SecondaryMap`. The map grows as needed.
impl<K, V> IndexMut<K> for SecondaryMap<K, V>
where
    K: EntityRef,
    V: Clone,
{
    fn index_mut(&mut self, k: K) -> &mut V {
        let i = k.index();
        if i >= self.elems.len() {
            self.elems.resize(i + 1, self.default.clone());
        }
        &mut self.elems[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // `entity_impl!` is exercised through a local entity type.
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    struct E(u32);
    entity_impl!(E, "e");

    #[test]
    fn basic_entity() {
        let r = E::new(12);
        assert_eq!(r.index(), 12);
        assert_eq!(E::from_u32(3).as_u32(), 3);
        assert_eq!(r.to_string(), "e12");
    }

    #[test]
    fn primary_push_and_index() {
        let mut m: PrimaryMap<E, isize> = PrimaryMap::new();
        assert!(m.is_empty());
        let k0 = m.push(12);
        let k1 = m.push(33);
        assert_eq!(m[k0], 12);
        assert_eq!(m[k1], 33);
        assert_eq!(m.len(), 2);
        assert!(m.is_valid(k1));
        assert!(!m.is_valid(E::new(2)));

        m[k0] = -1;
        assert_eq!(m.get(k0), Some(&-1));
        assert_eq!(m.get(E::new(7)), None);
    }

    #[test]
    fn primary_iterators() {
        let mut m: PrimaryMap<E, char> = PrimaryMap::new();
        m.push('a');
        m.push('b');
        let pairs: Vec<(E, char)> = m.iter().map(|(k, &v)| (k, v)).collect();
        assert_eq!(pairs, vec![(E::new(0), 'a'), (E::new(1), 'b')]);
        assert_eq!(m.keys().count(), 2);
        assert_eq!(m.values().copied().collect::<String>(), "ab");
    }

    #[test]
    fn secondary_defaults_and_growth() {
        let mut m: SecondaryMap<E, u32> = SecondaryMap::new();
        let k = E::new(5);
        assert_eq!(m[k], 0);
        m[k] = 42;
        assert_eq!(m[k], 42);
        // Keys below the written one read as default.
        assert_eq!(m[E::new(1)], 0);
        // Keys beyond the end still read as default.
        assert_eq!(m[E::new(100)], 0);
    }
}
