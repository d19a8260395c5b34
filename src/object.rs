//! Open-addressing hash table mapping [`Element`] keys to [`Element`] values.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::iter::FusedIterator;
use core::mem;
use core::ops::{Index, IndexMut};
use core::slice;

use crate::element::{Element, ElementRef, NULL};
use crate::error::Error;
use crate::hash::{hash_key, Probe};

// =============================================================================
// Configuration
// =============================================================================

/// Slot count of the first allocation.
const MIN_CAPACITY: usize = 8;
/// Occupied plus tombstoned slots never exceed 3/4 of the capacity.
const MAX_LOAD_NUMERATOR: usize = 3;
const MAX_LOAD_DENOMINATOR: usize = 4;

// =============================================================================
// Slots
// =============================================================================

#[derive(Clone)]
struct Bucket {
    /// Cached `hash_key(key)`; rehashing never recomputes it.
    hash: u64,
    key: Element,
    value: Element,
}

#[derive(Clone)]
enum Slot {
    Empty,
    /// Left behind by a removal so probe chains running through it stay intact.
    Tombstone,
    Occupied(Bucket),
}

impl Slot {
    #[inline]
    fn is_vacant(&self) -> bool {
        !matches!(self, Slot::Occupied(_))
    }
}

/// Smallest power-of-two slot count holding `entries` under the load limit.
fn capacity_for(entries: usize) -> Option<usize> {
    let slots = entries
        .checked_mul(MAX_LOAD_DENOMINATOR)?
        .div_ceil(MAX_LOAD_NUMERATOR);
    slots.max(MIN_CAPACITY).checked_next_power_of_two()
}

const CAPACITY_OVERFLOW: Error = Error::AllocationFailure { bytes: usize::MAX };

#[cold]
#[inline(never)]
fn allocation_failed(err: Error) -> ! {
    panic!("wjson: {err}")
}

// =============================================================================
// Object
// =============================================================================

/// An unordered collection of unique [`Element`] keys mapped to [`Element`]
/// values.
///
/// Storage is a single slot buffer probed with triangular (quadratic) steps.
/// The buffer is allocated on the first insertion and doubles when more than
/// half of it would be live; removals leave tombstones, which are purged the
/// next time the table is rebuilt. Capacity never shrinks; [`Object::take`]
/// is the only way to hand the buffer off.
///
/// Any key convertible to [`ElementRef`] can be used for lookups, so probing
/// with `"name"`, `7`, `2.5`, `true`, `()` or `&element` is allocation-free.
///
/// ```
/// use wjson::{object, Object};
///
/// let mut obj: Object = object! { "first", 1, "second", 2 };
/// assert_eq!(obj.len(), 2);
/// assert_eq!(obj["first"], 1);
///
/// obj["third"] = 3.into();
/// assert!(obj.contains("third"));
/// assert!(obj.erase("first"));
/// assert_eq!(obj.get("first"), None);
/// ```
#[derive(Clone, Default)]
pub struct Object {
    slots: Box<[Slot]>,
    len: usize,
    tombstones: usize,
}

impl Object {
    /// An empty object. Does not allocate.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// An object able to hold `capacity` entries without rebuilding.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut object = Self::new();
        object.reserve(capacity);
        object
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots in the buffer (zero before the first insertion).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Bytes held by the slot buffer and the string payloads it owns.
    pub fn memory_usage(&self) -> usize {
        self.slots.len() * mem::size_of::<Slot>()
            + self
                .iter()
                .map(|(k, v)| k.heap_size() + v.heap_size())
                .sum::<usize>()
    }

    /// Makes room for `additional` more entries.
    ///
    /// # Panics
    ///
    /// If the allocator refuses the new buffer.
    pub fn reserve(&mut self, additional: usize) {
        if let Err(err) = self.try_reserve(additional) {
            allocation_failed(err);
        }
    }

    /// Makes room for `additional` more entries. On failure the object is
    /// left untouched.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), Error> {
        let needed = self.len.checked_add(additional).ok_or(CAPACITY_OVERFLOW)?;
        let used = needed
            .checked_add(self.tombstones)
            .ok_or(CAPACITY_OVERFLOW)?;
        if self.fits(used) {
            return Ok(());
        }
        let capacity = capacity_for(needed)
            .ok_or(CAPACITY_OVERFLOW)?
            .max(self.capacity());
        self.resize(capacity)
    }

    /// Moves the whole table out, leaving an empty, unallocated object.
    #[inline]
    pub fn take(&mut self) -> Object {
        mem::take(self)
    }

    /// Removes every entry. Capacity is kept.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = Slot::Empty;
        }
        self.len = 0;
        self.tombstones = 0;
    }

    // === Insertion ===

    /// Inserts `key -> value` unless an equal key is already present.
    ///
    /// Returns the value stored under the key and whether the entry is new.
    /// An existing entry is left as it was and `value` is dropped.
    ///
    /// # Panics
    ///
    /// If growing the table fails to allocate; see [`Object::try_insert`].
    pub fn insert<K, V>(&mut self, key: K, value: V) -> (&mut Element, bool)
    where
        K: Into<Element>,
        V: Into<Element>,
    {
        match self.try_insert(key, value) {
            Ok(inserted) => inserted,
            Err(err) => allocation_failed(err),
        }
    }

    pub fn try_insert<K, V>(&mut self, key: K, value: V) -> Result<(&mut Element, bool), Error>
    where
        K: Into<Element>,
        V: Into<Element>,
    {
        let key = key.into();
        let hash = hash_key(key.view());
        if let Some(idx) = self.find_index(hash, key.view()) {
            return Ok((&mut self.bucket_at_mut(idx).value, false));
        }
        let idx = self.insert_vacant(hash, key, value.into())?;
        Ok((&mut self.bucket_at_mut(idx).value, true))
    }

    /// Inserts `key -> value`, overwriting the value of an existing equal key.
    /// The stored key is never replaced.
    ///
    /// Returns the stored value and whether the entry is new.
    pub fn insert_or_assign<K, V>(&mut self, key: K, value: V) -> (&mut Element, bool)
    where
        K: Into<Element>,
        V: Into<Element>,
    {
        match self.try_insert_or_assign(key, value) {
            Ok(inserted) => inserted,
            Err(err) => allocation_failed(err),
        }
    }

    pub fn try_insert_or_assign<K, V>(
        &mut self,
        key: K,
        value: V,
    ) -> Result<(&mut Element, bool), Error>
    where
        K: Into<Element>,
        V: Into<Element>,
    {
        let key = key.into();
        let hash = hash_key(key.view());
        if let Some(idx) = self.find_index(hash, key.view()) {
            let bucket = self.bucket_at_mut(idx);
            bucket.value = value.into();
            return Ok((&mut bucket.value, false));
        }
        let idx = self.insert_vacant(hash, key, value.into())?;
        Ok((&mut self.bucket_at_mut(idx).value, true))
    }

    /// Mutable access to the value under `key`, inserting null first when the
    /// key is absent. This is what `object[key] = ...` goes through.
    pub fn get_or_insert_null<'k, K: Into<ElementRef<'k>>>(&mut self, key: K) -> &mut Element {
        match self.try_get_or_insert_null(key) {
            Ok(value) => value,
            Err(err) => allocation_failed(err),
        }
    }

    pub fn try_get_or_insert_null<'k, K: Into<ElementRef<'k>>>(
        &mut self,
        key: K,
    ) -> Result<&mut Element, Error> {
        let key = key.into();
        let hash = hash_key(key);
        let idx = match self.find_index(hash, key) {
            Some(idx) => idx,
            None => self.insert_vacant(hash, key.try_to_element()?, Element::Null)?,
        };
        Ok(&mut self.bucket_at_mut(idx).value)
    }

    // === Lookup ===

    /// The stored key and value equal to `key`, or `None`.
    pub fn find<'k, K: Into<ElementRef<'k>>>(&self, key: K) -> Option<(&Element, &Element)> {
        let bucket = self.bucket_at(self.lookup(key.into())?);
        Some((&bucket.key, &bucket.value))
    }

    #[inline]
    pub fn get<'k, K: Into<ElementRef<'k>>>(&self, key: K) -> Option<&Element> {
        let idx = self.lookup(key.into())?;
        Some(&self.bucket_at(idx).value)
    }

    #[inline]
    pub fn get_mut<'k, K: Into<ElementRef<'k>>>(&mut self, key: K) -> Option<&mut Element> {
        let idx = self.lookup(key.into())?;
        Some(&mut self.bucket_at_mut(idx).value)
    }

    #[inline]
    pub fn contains<'k, K: Into<ElementRef<'k>>>(&self, key: K) -> bool {
        self.lookup(key.into()).is_some()
    }

    /// The value under `key`; never inserts.
    pub fn at<'k, K: Into<ElementRef<'k>>>(&self, key: K) -> Result<&Element, Error> {
        self.get(key).ok_or(Error::NotFound)
    }

    pub fn at_mut<'k, K: Into<ElementRef<'k>>>(&mut self, key: K) -> Result<&mut Element, Error> {
        self.get_mut(key).ok_or(Error::NotFound)
    }

    // === Removal ===

    /// Removes the entry for `key`. Returns whether one existed.
    #[inline]
    pub fn erase<'k, K: Into<ElementRef<'k>>>(&mut self, key: K) -> bool {
        self.remove_entry(key).is_some()
    }

    #[inline]
    pub fn remove<'k, K: Into<ElementRef<'k>>>(&mut self, key: K) -> Option<Element> {
        self.remove_entry(key).map(|(_, value)| value)
    }

    pub fn remove_entry<'k, K: Into<ElementRef<'k>>>(
        &mut self,
        key: K,
    ) -> Option<(Element, Element)> {
        let idx = self.lookup(key.into())?;
        Some(self.bury(idx))
    }

    /// Keeps only the entries for which `keep` returns true.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Element, &mut Element) -> bool,
    {
        for slot in self.slots.iter_mut() {
            if let Slot::Occupied(bucket) = slot {
                if !keep(&bucket.key, &mut bucket.value) {
                    *slot = Slot::Tombstone;
                    self.len -= 1;
                    self.tombstones += 1;
                }
            }
        }
    }

    // === Iteration ===

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            slots: self.slots.iter(),
            remaining: self.len,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_> {
        IterMut {
            slots: self.slots.iter_mut(),
            remaining: self.len,
        }
    }

    pub fn keys(&self) -> Keys<'_> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }
}

// === Table internals ===

impl Object {
    /// Whether `used` occupied-or-tombstoned slots respect the load limit.
    #[inline]
    fn fits(&self, used: usize) -> bool {
        used.saturating_mul(MAX_LOAD_DENOMINATOR)
            <= self.capacity().saturating_mul(MAX_LOAD_NUMERATOR)
    }

    #[inline]
    fn lookup(&self, key: ElementRef<'_>) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        self.find_index(hash_key(key), key)
    }

    /// Slot holding `key`. Tombstones are stepped over; the first empty slot
    /// ends the search.
    fn find_index(&self, hash: u64, key: ElementRef<'_>) -> Option<usize> {
        for idx in Probe::new(hash, self.slots.len()) {
            match &self.slots[idx] {
                Slot::Empty => return None,
                Slot::Tombstone => {}
                Slot::Occupied(bucket) => {
                    if bucket.hash == hash && bucket.key.view() == key {
                        return Some(idx);
                    }
                }
            }
        }
        None
    }

    /// First empty or tombstoned slot on the probe path of `hash`.
    fn vacant_index(&self, hash: u64) -> usize {
        Probe::new(hash, self.slots.len())
            .find(|&idx| self.slots[idx].is_vacant())
            .expect("load limit keeps a vacant slot on every probe path")
    }

    /// Places a key known to be absent, rebuilding the table first when the
    /// new entry would break the load limit.
    fn insert_vacant(&mut self, hash: u64, key: Element, value: Element) -> Result<usize, Error> {
        if !self.fits(self.len + self.tombstones + 1) {
            let capacity = self.grown_capacity()?;
            self.resize(capacity)?;
        }
        let idx = self.vacant_index(hash);
        if matches!(self.slots[idx], Slot::Tombstone) {
            self.tombstones -= 1;
        }
        self.slots[idx] = Slot::Occupied(Bucket { hash, key, value });
        self.len += 1;
        Ok(idx)
    }

    /// Capacity for a rebuild that must fit one more entry. Doubles while more
    /// than half the slots would be live; otherwise rebuilds in place, which
    /// only purges tombstones.
    fn grown_capacity(&self) -> Result<usize, Error> {
        let capacity = self.capacity();
        let live = self.len + 1;
        if live.saturating_mul(2) <= capacity {
            return Ok(capacity);
        }
        let needed = capacity_for(live).ok_or(CAPACITY_OVERFLOW)?;
        Ok(needed.max(capacity.saturating_mul(2)))
    }

    /// Rebuilds the table into `capacity` fresh slots. The new buffer is
    /// reserved before anything moves, so a refused allocation leaves the
    /// table as it was.
    fn resize(&mut self, capacity: usize) -> Result<(), Error> {
        debug_assert!(capacity.is_power_of_two() && capacity >= self.capacity());
        let mut slots = Vec::new();
        if slots.try_reserve_exact(capacity).is_err() {
            let bytes = capacity.saturating_mul(mem::size_of::<Slot>());
            log::debug!("object slot buffer allocation of {bytes} bytes refused");
            return Err(Error::AllocationFailure { bytes });
        }
        slots.resize_with(capacity, || Slot::Empty);

        let old = mem::replace(&mut self.slots, slots.into_boxed_slice());
        log::trace!(
            "object rebuilt: {} -> {} slots, {} live, {} tombstones purged",
            old.len(),
            capacity,
            self.len,
            self.tombstones
        );
        self.tombstones = 0;
        for slot in old.into_vec() {
            if let Slot::Occupied(bucket) = slot {
                let idx = self.vacant_index(bucket.hash);
                self.slots[idx] = Slot::Occupied(bucket);
            }
        }
        Ok(())
    }

    /// Turns an occupied slot into a tombstone, handing back its entry.
    fn bury(&mut self, idx: usize) -> (Element, Element) {
        match mem::replace(&mut self.slots[idx], Slot::Tombstone) {
            Slot::Occupied(bucket) => {
                self.len -= 1;
                self.tombstones += 1;
                (bucket.key, bucket.value)
            }
            _ => unreachable!("slot {idx} is not occupied"),
        }
    }

    #[inline]
    fn bucket_at(&self, idx: usize) -> &Bucket {
        match &self.slots[idx] {
            Slot::Occupied(bucket) => bucket,
            _ => unreachable!("slot {idx} is not occupied"),
        }
    }

    #[inline]
    fn bucket_at_mut(&mut self, idx: usize) -> &mut Bucket {
        match &mut self.slots[idx] {
            Slot::Occupied(bucket) => bucket,
            _ => unreachable!("slot {idx} is not occupied"),
        }
    }

    /// Panics unless every structural invariant of the table holds.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let capacity = self.capacity();
        if capacity != 0 {
            assert!(capacity.is_power_of_two(), "capacity {capacity} not a power of two");
            assert!(capacity >= MIN_CAPACITY);
        }

        let mut occupied = 0usize;
        let mut tombstones = 0usize;
        for (idx, slot) in self.slots.iter().enumerate() {
            match slot {
                Slot::Empty => {}
                Slot::Tombstone => tombstones += 1,
                Slot::Occupied(bucket) => {
                    occupied += 1;
                    assert_eq!(bucket.hash, hash_key(bucket.key.view()), "stale cached hash");
                    assert_eq!(
                        self.find_index(bucket.hash, bucket.key.view()),
                        Some(idx),
                        "key {:?} not reachable from its home slot",
                        bucket.key
                    );
                }
            }
        }
        assert_eq!(occupied, self.len, "len must match occupied slots");
        assert_eq!(tombstones, self.tombstones, "tombstone count drifted");
        assert!(self.fits(occupied + tombstones), "load limit exceeded");
        assert_eq!(self.iter().count(), self.len);
    }
}

// =============================================================================
// Trait impls
// =============================================================================

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Equal when both hold the same keys with equal values, in any order.
impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl Eq for Object {}

/// Reads the value under `key`, or the canonical null when absent.
/// Reading never inserts.
impl<'k, K: Into<ElementRef<'k>>> Index<K> for Object {
    type Output = Element;

    fn index(&self, key: K) -> &Element {
        self.get(key).unwrap_or(&NULL)
    }
}

/// Mutable access that inserts a null value for an absent key.
impl<'k, K: Into<ElementRef<'k>>> IndexMut<K> for Object {
    fn index_mut(&mut self, key: K) -> &mut Element {
        self.get_or_insert_null(key)
    }
}

/// Builds an object with [`Object::insert`] semantics: the first occurrence
/// of a key wins.
impl<K: Into<Element>, V: Into<Element>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut object = Object::with_capacity(iter.size_hint().0);
        object.extend(iter);
        object
    }
}

/// Adds entries with [`Object::insert`] semantics; keys already present keep
/// their value.
impl<K: Into<Element>, V: Into<Element>> Extend<(K, V)> for Object {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a> IntoIterator for &'a Object {
    type Item = (&'a Element, &'a Element);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl<'a> IntoIterator for &'a mut Object {
    type Item = (&'a Element, &'a mut Element);
    type IntoIter = IterMut<'a>;

    fn into_iter(self) -> IterMut<'a> {
        self.iter_mut()
    }
}

impl IntoIterator for Object {
    type Item = (Element, Element);
    type IntoIter = IntoIter;

    fn into_iter(self) -> IntoIter {
        IntoIter {
            remaining: self.len,
            slots: self.slots.into_vec().into_iter(),
        }
    }
}

/// Builds an [`Object`] from alternating keys and values.
///
/// ```
/// use wjson::object;
///
/// let obj = object! {
///     "first", 1,
///     "second", 2,
///     "first", 3,
/// };
/// assert_eq!(obj.len(), 2);
/// assert_eq!(obj["first"], 1);
/// ```
///
/// Keys repeat with [`Object::insert`] semantics, so the first occurrence wins.
/// An odd number of items does not compile.
#[macro_export]
macro_rules! object {
    () => {
        $crate::Object::new()
    };
    ($($key:expr, $value:expr),+ $(,)?) => {
        <$crate::Object as ::core::iter::FromIterator<($crate::Element, $crate::Element)>>::from_iter([
            $(($crate::Element::from($key), $crate::Element::from($value))),+
        ])
    };
}

// =============================================================================
// Iterators
// =============================================================================

/// Entries of an [`Object`] in slot order.
#[derive(Clone)]
pub struct Iter<'a> {
    slots: slice::Iter<'a, Slot>,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a Element, &'a Element);

    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if let Slot::Occupied(bucket) = slot {
                self.remaining -= 1;
                return Some((&bucket.key, &bucket.value));
            }
        }
        None
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}
impl FusedIterator for Iter<'_> {}

pub struct IterMut<'a> {
    slots: slice::IterMut<'a, Slot>,
    remaining: usize,
}

impl<'a> Iterator for IterMut<'a> {
    type Item = (&'a Element, &'a mut Element);

    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if let Slot::Occupied(bucket) = slot {
                self.remaining -= 1;
                return Some((&bucket.key, &mut bucket.value));
            }
        }
        None
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for IterMut<'_> {}
impl FusedIterator for IterMut<'_> {}

pub struct IntoIter {
    slots: alloc::vec::IntoIter<Slot>,
    remaining: usize,
}

impl Iterator for IntoIter {
    type Item = (Element, Element);

    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if let Slot::Occupied(bucket) = slot {
                self.remaining -= 1;
                return Some((bucket.key, bucket.value));
            }
        }
        None
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for IntoIter {}
impl FusedIterator for IntoIter {}

#[derive(Clone)]
pub struct Keys<'a> {
    inner: Iter<'a>,
}

impl<'a> Iterator for Keys<'a> {
    type Item = &'a Element;

    #[inline]
    fn next(&mut self) -> Option<&'a Element> {
        self.inner.next().map(|(k, _)| k)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Keys<'_> {}
impl FusedIterator for Keys<'_> {}

#[derive(Clone)]
pub struct Values<'a> {
    inner: Iter<'a>,
}

impl<'a> Iterator for Values<'a> {
    type Item = &'a Element;

    #[inline]
    fn next(&mut self) -> Option<&'a Element> {
        self.inner.next().map(|(_, v)| v)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Values<'_> {}
impl FusedIterator for Values<'_> {}

pub struct ValuesMut<'a> {
    inner: IterMut<'a>,
}

impl<'a> Iterator for ValuesMut<'a> {
    type Item = &'a mut Element;

    #[inline]
    fn next(&mut self) -> Option<&'a mut Element> {
        self.inner.next().map(|(_, v)| v)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for ValuesMut<'_> {}
impl FusedIterator for ValuesMut<'_> {}
