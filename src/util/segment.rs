use bitflags::bitflags;
use std::fmt::{Debug, Error as FmtError, Formatter};

/// Index which terminates a hash chain, and which never names an entry
pub const NO_ENTRY: u32 = u32::MAX;

/// Saturated reference count
///
/// Entries which reach this count are never decremented again, so they stay resident for the
/// lifetime of the table. This is how ROM entries and forcibly pinned entries are protected.
pub const MAX_COUNT: u8 = u8::MAX;

bitflags! {
    /// Lifecycle flags of an entry
    ///
    /// These are only for diagnostics (see `SegmentChain::reset_states`) and have no bearing on
    /// lookups or reference counts.
    pub struct EntryState: u8 {
        const IN_ROM = 0x1;
        const ADDED = 0x2;
        const DELETED = 0x4;
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SegmentError {
    /// The host allocator refused to provide storage for a new segment
    OutOfMemory,

    /// Every index up to the maximum of the chain is already handed out
    IndexSpaceExhausted,
}

/// One entry in a segment
///
/// Free slots have a zero reference count and no payload. Live slots are linked into exactly one
/// hash chain through `next`.
pub struct Slot<T> {
    next: u32,
    ref_count: u8,
    state: EntryState,
    payload: Option<T>,
}

impl<T> Slot<T> {
    fn free() -> Slot<T> {
        Slot {
            next: NO_ENTRY,
            ref_count: 0,
            state: EntryState::empty(),
            payload: None,
        }
    }

    /// Next index in the hash chain (or `NO_ENTRY`)
    pub fn next(&self) -> u32 {
        self.next
    }

    pub fn ref_count(&self) -> u8 {
        self.ref_count
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.ref_count > 0
    }

    pub fn is_pinned(&self) -> bool {
        self.ref_count == MAX_COUNT
    }
}

impl<T: Debug> Debug for Slot<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        f.debug_struct("Slot")
            .field("next", &self.next)
            .field("ref_count", &self.ref_count)
            .field("state", &self.state)
            .field("payload", &self.payload)
            .finish()
    }
}

/// Fixed capacity block of slots, covering indices `first_index..first_index + entries.len()`
struct Segment<T> {
    first_index: u32,

    /// Number of slots with a zero reference count
    free_entries: u32,

    /// Local index from which to start searching for a free slot
    next_free: u32,

    /// Frozen segments are never allocated into nor freed from
    read_only: bool,

    entries: Vec<Slot<T>>,
}

impl<T> Segment<T> {
    fn contains(&self, index: u32) -> bool {
        index >= self.first_index && ((index - self.first_index) as usize) < self.entries.len()
    }
}

/// Growable chain of fixed capacity segments, addressed by index instead of by pointer
///
/// Indices are global: the first segment starts at `first_index` and each appended segment
/// starts where the previous one ends. Segments are only ever appended, so an index stays valid
/// (and keeps naming the same slot) for the lifetime of the chain. Earlier segments can be frozen
/// (see `freeze`), after which only later segments receive new entries.
///
/// Hash chains are threaded through the `next` field of slots. The bucket heads live outside the
/// chain (see `link_at_head` and `unlink`), so one chain can back several hash tables.
pub struct SegmentChain<T> {
    segments: Vec<Segment<T>>,

    /// Index of the first slot of the first segment
    first_index: u32,

    /// Number of slots in newly appended segments
    segment_capacity: u32,

    /// Largest index that may be handed out
    max_index: u32,
}

impl<T> SegmentChain<T> {
    /// New empty chain (no segments are allocated until the first entry is)
    pub fn new(first_index: u32, segment_capacity: u32, max_index: u32) -> SegmentChain<T> {
        assert!(segment_capacity > 0, "segments must have room for entries");
        assert!(first_index <= max_index, "index space is empty");
        assert!(max_index < NO_ENTRY, "the largest index collides with `NO_ENTRY`");
        SegmentChain {
            segments: vec![],
            first_index,
            segment_capacity,
            max_index,
        }
    }

    /// Index one past the last slot of the last segment
    pub fn end_index(&self) -> u32 {
        match self.segments.last() {
            None => self.first_index,
            Some(seg) => seg.first_index + seg.entries.len() as u32,
        }
    }

    /// Number of segments in the chain
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Append a new all-free segment to the tail of the chain
    fn allocate_segment(&mut self) -> Result<usize, SegmentError> {
        let first_index = self.end_index();
        if first_index > self.max_index {
            return Err(SegmentError::IndexSpaceExhausted);
        }
        let capacity = self
            .segment_capacity
            .min(self.max_index - first_index + 1);

        let mut entries: Vec<Slot<T>> = Vec::new();
        entries
            .try_reserve_exact(capacity as usize)
            .map_err(|_| SegmentError::OutOfMemory)?;
        entries.extend((0..capacity).map(|_| Slot::free()));
        self.segments
            .try_reserve(1)
            .map_err(|_| SegmentError::OutOfMemory)?;

        log::debug!(
            "Appending segment of {} entries starting at index {}",
            capacity,
            first_index
        );
        self.segments.push(Segment {
            first_index,
            free_entries: capacity,
            next_free: 0,
            read_only: false,
            entries,
        });
        Ok(self.segments.len() - 1)
    }

    /// Find a recyclable slot in a segment, returning its local index
    ///
    /// Returns `None` if the segment is full or frozen.
    pub fn next_free_in_segment(&self, segment: usize) -> Option<u32> {
        let seg = &self.segments[segment];
        if seg.read_only || seg.free_entries == 0 {
            return None;
        }
        let start = (seg.next_free as usize).min(seg.entries.len());
        (start..seg.entries.len())
            .chain(0..start)
            .find(|&local| seg.entries[local].ref_count == 0)
            .map(|local| local as u32)
    }

    /// Store a payload in a fresh slot, with a reference count of one
    ///
    /// Free slots in existing segments are recycled before a new segment is appended. The
    /// returned index is not yet linked into any hash chain.
    pub fn allocate(&mut self, payload: T) -> Result<u32, SegmentError> {
        let found = (0..self.segments.len())
            .find_map(|segment| self.next_free_in_segment(segment).map(|local| (segment, local)));
        let (segment, local) = match found {
            Some(found) => found,
            None => (self.allocate_segment()?, 0),
        };

        let seg = &mut self.segments[segment];
        seg.free_entries -= 1;
        seg.next_free = local + 1;
        seg.entries[local as usize] = Slot {
            next: NO_ENTRY,
            ref_count: 1,
            state: EntryState::ADDED,
            payload: Some(payload),
        };
        Ok(seg.first_index + local)
    }

    /// Return a slot to the free pool, handing back its payload
    ///
    /// The slot must already be unlinked from its hash chain.
    pub fn release(&mut self, index: u32) -> Option<T> {
        let (segment, local) = self.locate(index);
        let seg = &mut self.segments[segment];
        assert!(
            !seg.read_only,
            "entry {} lives in a frozen segment and cannot be freed",
            index
        );
        let slot = &mut seg.entries[local];
        let payload = slot.payload.take();
        if payload.is_some() {
            slot.next = NO_ENTRY;
            slot.ref_count = 0;
            slot.state = EntryState::DELETED;
            seg.free_entries += 1;
            seg.next_free = seg.next_free.min(local as u32);
        }
        payload
    }

    /// Resolve a global index to a segment and a local offset
    ///
    /// An index outside of every segment is a bug in the caller.
    fn locate(&self, index: u32) -> (usize, usize) {
        match self.segments.iter().position(|seg| seg.contains(index)) {
            Some(segment) => (
                segment,
                (index - self.segments[segment].first_index) as usize,
            ),
            None => panic!(
                "index {} is outside of the segment chain {}..{}",
                index,
                self.first_index,
                self.end_index()
            ),
        }
    }

    /// Whether the index names a slot in some segment
    pub fn contains(&self, index: u32) -> bool {
        self.segments.iter().any(|seg| seg.contains(index))
    }

    /// Get the slot at a global index
    pub fn entry_at(&self, index: u32) -> &Slot<T> {
        let (segment, local) = self.locate(index);
        &self.segments[segment].entries[local]
    }

    fn entry_at_mut(&mut self, index: u32) -> &mut Slot<T> {
        let (segment, local) = self.locate(index);
        &mut self.segments[segment].entries[local]
    }

    /// Payload of a live entry
    pub fn payload(&self, index: u32) -> Option<&T> {
        self.entry_at(index).payload.as_ref()
    }

    /// Mutable payload of a live entry
    ///
    /// Payloads of frozen entries may be mutated too (eg. the bucket heads inside a package).
    pub fn payload_mut(&mut self, index: u32) -> Option<&mut T> {
        self.entry_at_mut(index).payload.as_mut()
    }

    pub fn is_frozen(&self, index: u32) -> bool {
        let (segment, _) = self.locate(index);
        self.segments[segment].read_only
    }

    /// Increment the reference count unless it is saturated
    pub fn conditional_inc_ref(&mut self, index: u32) {
        let slot = self.entry_at_mut(index);
        assert!(slot.ref_count > 0, "entry {} is free", index);
        if slot.ref_count < MAX_COUNT {
            slot.ref_count += 1;
        }
    }

    /// Decrement the reference count unless it is saturated
    ///
    /// Returns `true` if the count dropped to zero, in which case the caller should unlink the
    /// entry and then `release` it.
    pub fn dec_ref(&mut self, index: u32) -> bool {
        let slot = self.entry_at_mut(index);
        match slot.ref_count {
            MAX_COUNT => false,
            0 => panic!("entry {} disposed more times than it was referenced", index),
            _ => {
                slot.ref_count -= 1;
                slot.ref_count == 0
            }
        }
    }

    /// Saturate the reference count, making the entry permanent
    pub fn pin(&mut self, index: u32) {
        let slot = self.entry_at_mut(index);
        assert!(slot.ref_count > 0, "entry {} is free", index);
        slot.ref_count = MAX_COUNT;
    }

    /// Iterate over the indices of a hash chain
    pub fn chain(&self, head: u32) -> ChainIter<'_, T> {
        ChainIter {
            chain: self,
            current: head,
        }
    }

    /// Find the first entry on a hash chain whose payload matches
    pub fn find_in_chain(&self, head: u32, mut matches: impl FnMut(&T) -> bool) -> Option<u32> {
        self.chain(head)
            .find(|&index| self.payload(index).map_or(false, &mut matches))
    }

    /// Push an entry onto the front of a hash chain
    ///
    /// Inserting at the front means that frozen entries further down the chain never need
    /// their links rewritten.
    pub fn link_at_head(&mut self, head: &mut u32, index: u32) {
        self.entry_at_mut(index).next = *head;
        *head = index;
    }

    /// Remove an entry from a hash chain
    ///
    /// Links are forward only, so this walks the chain from the head to find the predecessor.
    pub fn unlink(&mut self, head: &mut u32, index: u32) {
        let after = self.entry_at(index).next;
        if *head == index {
            *head = after;
        } else {
            let mut prev = *head;
            loop {
                assert!(prev != NO_ENTRY, "entry {} is not on its hash chain", index);
                let next = self.entry_at(prev).next;
                if next == index {
                    break;
                }
                prev = next;
            }
            debug_assert!(
                !self.is_frozen(prev),
                "frozen entry {} precedes entry {}",
                prev,
                index
            );
            self.entry_at_mut(prev).next = after;
        }
        self.entry_at_mut(index).next = NO_ENTRY;
    }

    /// Iterate over every live entry along with its index
    pub fn live(&self) -> impl Iterator<Item = (u32, &Slot<T>)> {
        self.segments.iter().flat_map(|seg| {
            seg.entries
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.is_live())
                .map(move |(local, slot)| (seg.first_index + local as u32, slot))
        })
    }

    /// Number of live entries
    pub fn live_count(&self) -> usize {
        self.segments
            .iter()
            .map(|seg| seg.entries.len() - seg.free_entries as usize)
            .sum()
    }

    /// Mark every existing entry as ROM resident and make every existing segment read-only
    ///
    /// Subsequent allocations go into freshly appended segments. Live entries should be pinned
    /// before the chain is frozen.
    pub fn freeze(&mut self) {
        for seg in &mut self.segments {
            seg.read_only = true;
            for slot in seg.entries.iter_mut().filter(|slot| slot.is_live()) {
                slot.state = EntryState::IN_ROM;
            }
        }
    }

    /// Clear the `ADDED`/`DELETED` flags on all writable slots (ROM flags are kept)
    pub fn reset_states(&mut self) {
        for seg in self.segments.iter_mut().filter(|seg| !seg.read_only) {
            for slot in &mut seg.entries {
                slot.state = EntryState::empty();
            }
        }
    }

    /// Indices of entries whose state has the given flag
    pub fn with_state(&self, state: EntryState) -> impl Iterator<Item = u32> + '_ {
        self.segments.iter().flat_map(move |seg| {
            seg.entries
                .iter()
                .enumerate()
                .filter(move |(_, slot)| slot.state.contains(state))
                .map(move |(local, _)| seg.first_index + local as u32)
        })
    }
}

/// Iterator over the indices of one hash chain
pub struct ChainIter<'a, T> {
    chain: &'a SegmentChain<T>,
    current: u32,
}

impl<'a, T> Iterator for ChainIter<'a, T> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.current == NO_ENTRY {
            None
        } else {
            let index = self.current;
            self.current = self.chain.entry_at(index).next;
            Some(index)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn allocate_and_recycle() {
        let mut chain: SegmentChain<&str> = SegmentChain::new(5, 4, 1000);
        let a = chain.allocate("a").unwrap();
        let b = chain.allocate("b").unwrap();
        assert_eq!((a, b), (5, 6));
        assert_eq!(chain.live_count(), 2);

        assert!(chain.dec_ref(a));
        assert_eq!(chain.release(a), Some("a"));
        assert_eq!(chain.live_count(), 1);

        // The freed slot is reused and carries nothing over
        let c = chain.allocate("c").unwrap();
        assert_eq!(c, a);
        assert_eq!(chain.payload(c), Some(&"c"));
        assert_eq!(chain.entry_at(c).next(), NO_ENTRY);
        assert_eq!(chain.entry_at(c).ref_count(), 1);
    }

    #[test]
    fn grows_by_appending_segments() {
        let mut chain: SegmentChain<u32> = SegmentChain::new(1, 2, 1000);
        for i in 0..5 {
            assert_eq!(chain.allocate(i).unwrap(), i + 1);
        }
        assert_eq!(chain.segment_count(), 3);
        assert_eq!(chain.end_index(), 7);
        assert_eq!(chain.payload(5), Some(&4));
    }

    #[test]
    fn index_space_exhaustion() {
        let mut chain: SegmentChain<()> = SegmentChain::new(1, 2, 3);
        assert!(chain.allocate(()).is_ok());
        assert!(chain.allocate(()).is_ok());
        assert!(chain.allocate(()).is_ok());
        assert_eq!(chain.allocate(()), Err(SegmentError::IndexSpaceExhausted));
    }

    #[test]
    fn saturated_entries_are_never_freed() {
        let mut chain: SegmentChain<()> = SegmentChain::new(1, 4, 100);
        let a = chain.allocate(()).unwrap();
        for _ in 0..300 {
            chain.conditional_inc_ref(a);
        }
        assert!(chain.entry_at(a).is_pinned());
        for _ in 0..300 {
            assert!(!chain.dec_ref(a));
        }
        assert_eq!(chain.entry_at(a).ref_count(), MAX_COUNT);
    }

    #[test]
    fn hash_chain_link_and_unlink() {
        let mut chain: SegmentChain<char> = SegmentChain::new(1, 8, 100);
        let mut head = NO_ENTRY;
        let indices: Vec<u32> = "abcd".chars().map(|c| chain.allocate(c).unwrap()).collect();
        for &index in &indices {
            chain.link_at_head(&mut head, index);
        }
        let order: Vec<u32> = chain.chain(head).collect();
        assert_eq!(order, vec![4, 3, 2, 1]);
        assert_eq!(chain.find_in_chain(head, |c| *c == 'b'), Some(2));

        chain.unlink(&mut head, 3);
        chain.unlink(&mut head, 4);
        assert_eq!(chain.chain(head).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(chain.find_in_chain(head, |c| *c == 'c'), None);
    }

    #[test]
    fn frozen_segments_are_skipped() {
        let mut chain: SegmentChain<u8> = SegmentChain::new(1, 4, 100);
        let rom = chain.allocate(0).unwrap();
        chain.pin(rom);
        chain.freeze();
        assert!(chain.is_frozen(rom));
        assert!(chain.entry_at(rom).state().contains(EntryState::IN_ROM));

        // Three free slots remain in the frozen segment, but a new one is appended instead
        let ram = chain.allocate(1).unwrap();
        assert_eq!(ram, 5);
        assert_eq!(chain.segment_count(), 2);
        assert!(!chain.is_frozen(ram));
    }

    #[test]
    fn lifecycle_states() {
        let mut chain: SegmentChain<u8> = SegmentChain::new(1, 4, 100);
        let a = chain.allocate(0).unwrap();
        let b = chain.allocate(1).unwrap();
        chain.reset_states();
        let c = chain.allocate(2).unwrap();
        chain.dec_ref(b);
        chain.release(b);

        assert_eq!(chain.with_state(EntryState::ADDED).collect::<Vec<_>>(), vec![c]);
        assert_eq!(chain.with_state(EntryState::DELETED).collect::<Vec<_>>(), vec![b]);
        assert!(chain.entry_at(a).state().is_empty());
    }

    #[test]
    #[should_panic]
    fn out_of_range_index() {
        let mut chain: SegmentChain<u8> = SegmentChain::new(1, 4, 100);
        chain.allocate(0).unwrap();
        chain.entry_at(17);
    }
}
