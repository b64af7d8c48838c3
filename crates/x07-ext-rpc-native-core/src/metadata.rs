//! Growable metadata arrays.
//!
//! An array tracks a logical `capacity` next to its entry count so growth and
//! shrinking follow a fixed policy (double, minimum 4; shrink exactly to the
//! count) instead of whatever the allocator hands back.
//!
//! Views returned by [`MetadataArray::key`], [`MetadataArray::value`] and
//! friends borrow the array, so any later `add`/`push` invalidates them. The
//! borrow checker rejects code that keeps such a view across a mutation.

use bytes::Bytes;

const MIN_GROW_CAPACITY: usize = 4;

/// A single key/value pair. Keys need not be unique.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    key: Bytes,
    value: Bytes,
}

impl Metadata {
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Metadata { key, value }
    }

    /// Copies both sides into freshly owned storage.
    pub fn copied(key: &[u8], value: &[u8]) -> Self {
        Metadata {
            key: Bytes::copy_from_slice(key),
            value: Bytes::copy_from_slice(value),
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn key_bytes(&self) -> &Bytes {
        &self.key
    }

    pub fn value_bytes(&self) -> &Bytes {
        &self.value
    }
}

#[derive(Debug, Default)]
pub struct MetadataArray {
    entries: Vec<Metadata>,
    capacity: usize,
}

impl MetadataArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero capacity allocates nothing.
    pub fn with_capacity(capacity: usize) -> Self {
        if capacity == 0 {
            return Self::default();
        }
        MetadataArray {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends a copy of `key` and `value`.
    pub fn add(&mut self, key: &[u8], value: &[u8]) {
        self.push(Metadata::copied(key, value));
    }

    /// Appends an entry whose storage may be shared with its producer.
    pub fn push(&mut self, entry: Metadata) {
        self.check_invariant();
        let count = self.entries.len();
        if count == self.capacity {
            self.capacity = if self.capacity == 0 {
                MIN_GROW_CAPACITY
            } else {
                self.capacity * 2
            };
            self.entries.reserve_exact(self.capacity - count);
        }
        self.entries.push(entry);
    }

    pub fn get(&self, index: usize) -> &Metadata {
        assert!(
            index < self.entries.len(),
            "metadata index {index} out of range for {} entries",
            self.entries.len()
        );
        &self.entries[index]
    }

    pub fn key(&self, index: usize) -> &[u8] {
        self.get(index).key()
    }

    pub fn value(&self, index: usize) -> &[u8] {
        self.get(index).value()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Metadata> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Metadata] {
        &self.entries
    }

    /// Drops spare capacity. An empty array goes back to the unallocated state.
    pub fn shrink_to_fit(&mut self) {
        self.check_invariant();
        let count = self.entries.len();
        if count == self.capacity {
            return;
        }
        if count == 0 {
            std::mem::take(self).release_deep();
            return;
        }
        self.entries.shrink_to_fit();
        self.capacity = count;
    }

    /// Moves the whole array out, leaving `self` empty with no storage.
    pub fn take(&mut self) -> MetadataArray {
        std::mem::take(self)
    }

    /// Replaces `self` with the contents of `src` and empties `src`. A missing
    /// source leaves `self` empty.
    pub fn move_from(&mut self, src: Option<&mut MetadataArray>) {
        let incoming = src.map(MetadataArray::take).unwrap_or_default();
        let previous = std::mem::replace(self, incoming);
        previous.release_deep();
    }

    /// Frees the backing storage only. Entry bytes owned by the engine stay
    /// alive for as long as the engine keeps its own references.
    pub fn release_shallow(self) {
        self.check_invariant();
        drop(self.entries);
    }

    /// Releases every key and value, then the backing storage.
    pub fn release_deep(self) {
        self.check_invariant();
        let MetadataArray { mut entries, .. } = self;
        for entry in entries.drain(..) {
            let Metadata { key, value } = entry;
            drop(key);
            drop(value);
        }
        drop(entries);
    }

    fn check_invariant(&self) {
        assert!(
            self.entries.len() <= self.capacity,
            "metadata array count {} exceeds capacity {}",
            self.entries.len(),
            self.capacity
        );
    }
}

impl<'a> IntoIterator for &'a MetadataArray {
    type Item = &'a Metadata;
    type IntoIter = std::slice::Iter<'a, Metadata>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn add_then_get_in_order() {
        let mut array = MetadataArray::with_capacity(0);
        array.add(b"a", b"1");
        array.add(b"b", b"2");
        assert_eq!(array.len(), 2);
        assert_eq!(array.key(0), b"a");
        assert_eq!(array.value(0), b"1");
        assert_eq!(array.key(1), b"b");
        assert_eq!(array.value(1), b"2");
    }

    #[test]
    fn zero_capacity_has_no_storage() {
        let array = MetadataArray::with_capacity(0);
        assert_eq!(array.capacity(), 0);
        assert!(array.is_empty());
    }

    #[test]
    fn growth_doubles_from_four() {
        let mut array = MetadataArray::new();
        array.add(b"k", b"v");
        assert_eq!(array.capacity(), 4);
        for _ in 0..4 {
            array.add(b"k", b"v");
        }
        assert_eq!(array.capacity(), 8);

        let mut sized = MetadataArray::with_capacity(3);
        for _ in 0..4 {
            sized.add(b"k", b"v");
        }
        assert_eq!(sized.capacity(), 6);
    }

    #[test]
    fn duplicate_keys_are_kept() {
        let mut array = MetadataArray::new();
        array.add(b"k", b"1");
        array.add(b"k", b"2");
        let values: Vec<&[u8]> = array.iter().map(Metadata::value).collect();
        assert_eq!(values, vec![&b"1"[..], &b"2"[..]]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn get_past_count_is_fatal() {
        let mut array = MetadataArray::with_capacity(8);
        array.add(b"a", b"1");
        let _ = array.key(1);
    }

    #[test]
    fn shrink_empty_array_releases_storage() {
        let mut array = MetadataArray::with_capacity(16);
        array.shrink_to_fit();
        assert_eq!(array.capacity(), 0);
        assert_eq!(array.len(), 0);
    }

    #[test]
    fn move_from_missing_source_empties_dest() {
        let mut dest = MetadataArray::new();
        dest.add(b"stale", b"x");
        dest.move_from(None);
        assert!(dest.is_empty());
        assert_eq!(dest.capacity(), 0);
    }

    #[test]
    fn release_disciplines_consume_the_array() {
        let shared = Bytes::from_static(b"engine-owned");
        let mut received = MetadataArray::new();
        received.push(Metadata::new(shared.clone(), shared.clone()));
        received.release_shallow();
        assert_eq!(&shared[..], b"engine-owned");

        let mut built = MetadataArray::new();
        built.add(b"x", b"y");
        built.release_deep();
    }

    proptest! {
        #[test]
        fn adds_stay_retrievable(pairs in proptest::collection::vec(
            (proptest::collection::vec(any::<u8>(), 0..16),
             proptest::collection::vec(any::<u8>(), 0..32)),
            0..64,
        )) {
            let mut array = MetadataArray::with_capacity(0);
            for (k, v) in &pairs {
                array.add(k, v);
            }
            prop_assert_eq!(array.len(), pairs.len());
            prop_assert!(array.len() <= array.capacity());
            for (i, (k, v)) in pairs.iter().enumerate() {
                prop_assert_eq!(array.key(i), &k[..]);
                prop_assert_eq!(array.value(i), &v[..]);
            }
        }

        #[test]
        fn shrink_after_growth_is_exact(n in 0usize..100) {
            let mut array = MetadataArray::new();
            for i in 0..n {
                array.add(&i.to_le_bytes(), b"v");
            }
            array.shrink_to_fit();
            prop_assert_eq!(array.len(), n);
            prop_assert_eq!(array.capacity(), n);
        }

        #[test]
        fn move_transfer_empties_source(n in 0usize..40) {
            let mut src = MetadataArray::new();
            for i in 0..n {
                src.add(format!("k{i}").as_bytes(), format!("v{i}").as_bytes());
            }
            let mut dest = MetadataArray::new();
            dest.move_from(Some(&mut src));
            prop_assert_eq!(src.len(), 0);
            prop_assert_eq!(src.capacity(), 0);
            prop_assert_eq!(dest.len(), n);
            for i in 0..n {
                let key = format!("k{i}");
                let value = format!("v{i}");
                prop_assert_eq!(dest.key(i), key.as_bytes());
                prop_assert_eq!(dest.value(i), value.as_bytes());
            }
        }
    }
}
