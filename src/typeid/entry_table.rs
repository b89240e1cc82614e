use super::Error;
use crate::util::{SegmentChain, NO_ENTRY};
use std::collections::HashSet;

/// Hash of a modified UTF-8 string
pub(crate) fn string_hash(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |hash, &b| hash.wrapping_mul(37).wrapping_add(b as u32))
}

/// Hash of a sequence of words
pub(crate) fn words_hash(words: impl Iterator<Item = u32>) -> u32 {
    words.fold(0u32, |hash, w| hash.wrapping_mul(31).wrapping_add(w))
}

/// Copy bytes into a fresh allocation, reporting allocation failure instead of aborting
pub(crate) fn copy_bytes(bytes: &[u8]) -> Result<Box<[u8]>, Error> {
    copy_slice(bytes)
}

/// Copy tokens into a fresh allocation, reporting allocation failure instead of aborting
pub(crate) fn copy_slice<T: Copy>(items: &[T]) -> Result<Box<[T]>, Error> {
    let mut copy: Vec<T> = Vec::new();
    copy.try_reserve_exact(items.len())
        .map_err(|_| Error::OutOfMemory)?;
    copy.extend_from_slice(items);
    Ok(copy.into_boxed_slice())
}

/// Fixed size hash table whose entries live in a segment chain
///
/// Buckets never resize: collisions are resolved by chaining through the entries themselves.
pub(crate) struct EntryTable<T> {
    buckets: Box<[u32]>,
    entries: SegmentChain<T>,
}

impl<T> EntryTable<T> {
    pub fn new(
        bucket_count: usize,
        first_index: u32,
        segment_capacity: u32,
        max_index: u32,
    ) -> EntryTable<T> {
        EntryTable {
            buckets: vec![NO_ENTRY; bucket_count].into_boxed_slice(),
            entries: SegmentChain::new(first_index, segment_capacity, max_index),
        }
    }

    fn bucket(&self, hash: u32) -> usize {
        hash as usize % self.buckets.len()
    }

    pub fn entries(&self) -> &SegmentChain<T> {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut SegmentChain<T> {
        &mut self.entries
    }

    pub fn payload(&self, index: u32) -> Option<&T> {
        self.entries.payload(index)
    }

    /// Find a live entry, without touching any reference count
    pub fn lookup(&self, hash: u32, matches: impl FnMut(&T) -> bool) -> Option<u32> {
        let head = self.buckets[self.bucket(hash)];
        self.entries.find_in_chain(head, matches)
    }

    /// Find a live entry and take a reference to it, or else insert a new one
    ///
    /// The returned flag is `true` if the entry was freshly inserted.
    pub fn intern(
        &mut self,
        hash: u32,
        matches: impl FnMut(&T) -> bool,
        make: impl FnOnce() -> Result<T, Error>,
    ) -> Result<(u32, bool), Error> {
        if let Some(index) = self.lookup(hash, matches) {
            self.entries.conditional_inc_ref(index);
            return Ok((index, false));
        }
        let index = self.insert(hash, make()?)?;
        Ok((index, true))
    }

    /// Insert an entry known to be absent, at the head of its chain
    pub fn insert(&mut self, hash: u32, payload: T) -> Result<u32, Error> {
        let index = self.entries.allocate(payload)?;
        let bucket = self.bucket(hash);
        self.entries.link_at_head(&mut self.buckets[bucket], index);
        Ok(index)
    }

    pub fn clone_entry(&mut self, index: u32) {
        self.entries.conditional_inc_ref(index);
    }

    /// Drop a reference, freeing the entry (and returning its payload) if it was the last
    pub fn dispose(&mut self, index: u32, hash_of: impl FnOnce(&T) -> u32) -> Option<T> {
        if !self.entries.dec_ref(index) {
            return None;
        }
        let hash = self.entries.payload(index).map(hash_of)?;
        let bucket = self.bucket(hash);
        self.entries.unlink(&mut self.buckets[bucket], index);
        self.entries.release(index)
    }

    /// Check that every live entry is on the right chain, exactly once
    pub fn check(&self, what: &str, hash_of: impl Fn(&T) -> u32) -> Result<(), String> {
        let mut seen = HashSet::new();
        for (bucket, &head) in self.buckets.iter().enumerate() {
            check_chain(what, &self.entries, head, &mut seen, |payload| {
                self.bucket(hash_of(payload)) == bucket
            })?;
        }
        check_all_seen(what, &self.entries, &seen)
    }
}

/// Walk one hash chain, checking that it terminates and only holds live entries that belong on it
pub(crate) fn check_chain<T>(
    what: &str,
    entries: &SegmentChain<T>,
    head: u32,
    seen: &mut HashSet<u32>,
    mut belongs: impl FnMut(&T) -> bool,
) -> Result<(), String> {
    let mut index = head;
    while index != NO_ENTRY {
        if !entries.contains(index) {
            return Err(format!("{} chain links to missing entry {}", what, index));
        }
        if !seen.insert(index) {
            return Err(format!("{} entry {} is reachable twice", what, index));
        }
        let slot = entries.entry_at(index);
        match slot.payload() {
            Some(payload) if slot.is_live() => {
                if !belongs(payload) {
                    return Err(format!("{} entry {} is on the wrong chain", what, index));
                }
            }
            _ => return Err(format!("{} chain links to free entry {}", what, index)),
        }
        index = slot.next();
    }
    Ok(())
}

/// Check that every live entry was reached by some chain
pub(crate) fn check_all_seen<T>(
    what: &str,
    entries: &SegmentChain<T>,
    seen: &HashSet<u32>,
) -> Result<(), String> {
    match entries.live().find(|(index, _)| !seen.contains(index)) {
        Some((index, _)) => Err(format!("{} entry {} is on no chain", what, index)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn table() -> EntryTable<&'static str> {
        EntryTable::new(3, 1, 4, 1000)
    }

    #[test]
    fn intern_is_idempotent() {
        let mut table = table();
        let (a, inserted) = table.intern(7, |s| *s == "a", || Ok("a")).unwrap();
        assert!(inserted);
        let (again, inserted) = table.intern(7, |s| *s == "a", || Ok("a")).unwrap();
        assert!(!inserted);
        assert_eq!(a, again);
        assert_eq!(table.entries().live_count(), 1);
        assert_eq!(table.entries().entry_at(a).ref_count(), 2);
        assert_eq!(table.lookup(7, |s| *s == "a"), Some(a));
        assert_eq!(table.lookup(7, |s| *s == "b"), None);
    }

    #[test]
    fn dispose_unlinks_on_last_reference() {
        let mut table = table();
        // Same bucket for all three
        let (a, _) = table.intern(0, |s| *s == "a", || Ok("a")).unwrap();
        let (b, _) = table.intern(3, |s| *s == "b", || Ok("b")).unwrap();
        let (c, _) = table.intern(6, |s| *s == "c", || Ok("c")).unwrap();
        table.clone_entry(b);

        assert_eq!(table.dispose(b, |_| 3), None);
        assert_eq!(table.dispose(b, |_| 3), Some("b"));
        assert_eq!(table.lookup(3, |s| *s == "b"), None);
        assert_eq!(table.lookup(0, |s| *s == "a"), Some(a));
        assert_eq!(table.lookup(6, |s| *s == "c"), Some(c));

        let hash = |s: &&str| match *s {
            "a" => 0,
            "c" => 6,
            _ => 1,
        };
        assert_eq!(table.check("test", hash), Ok(()));

        // The freed slot is recycled, with nothing left over from the old entry
        let (d, _) = table.intern(1, |s| *s == "d", || Ok("d")).unwrap();
        assert_eq!(d, b);
        assert_eq!(table.lookup(3, |s| *s == "b"), None);
        assert_eq!(table.payload(d), Some(&"d"));
    }

    #[test]
    fn check_detects_misplaced_entries() {
        let mut table = table();
        table.intern(0, |s| *s == "a", || Ok("a")).unwrap();
        assert!(table.check("test", |_| 1).is_err());
    }

    #[test]
    fn hashes() {
        assert_eq!(string_hash(b""), 0);
        assert_ne!(string_hash(b"ab"), string_hash(b"ba"));
        assert_ne!(words_hash([1, 2].iter().copied()), words_hash([2, 1].iter().copied()));
    }
}
