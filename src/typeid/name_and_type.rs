use super::entry_table::{words_hash, EntryTable};
use super::{Error, TypeIdConfig};
use crate::util::EntryState;

pub(crate) const NAME_AND_TYPE_HASH_SIZE: usize = 41 * 13;

/// Largest index of a name-and-type entry (the member token shifts it left by one)
const MAX_NAME_AND_TYPE_INDEX: u32 = (1 << 31) - 1;

/// Member whose halves are too big to be packed into a single token
///
/// The entry only holds the tokens, not references to the halves. A table-backed member token
/// does not keep the member alive, only its entry here (see `TypeIds::new_member_token`).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct NameAndType {
    pub name: u32,
    pub ty: u32,
    pub is_method: bool,
}

impl NameAndType {
    fn hash(&self) -> u32 {
        words_hash([self.name, self.ty, self.is_method as u32].iter().copied())
    }
}

pub(crate) struct NameAndTypeTable {
    table: EntryTable<NameAndType>,
}

impl NameAndTypeTable {
    pub fn new(config: &TypeIdConfig) -> NameAndTypeTable {
        NameAndTypeTable {
            table: EntryTable::new(
                NAME_AND_TYPE_HASH_SIZE,
                1,
                config.segment_capacity,
                config.max_index.min(MAX_NAME_AND_TYPE_INDEX),
            ),
        }
    }

    pub fn lookup(&self, key: NameAndType) -> Option<u32> {
        self.table.lookup(key.hash(), |entry| *entry == key)
    }

    pub fn intern(&mut self, key: NameAndType) -> Result<u32, Error> {
        let (index, inserted) = self.table.intern(key.hash(), |entry| *entry == key, || Ok(key))?;
        if inserted {
            log::trace!("Interned member ({}, {}) as {}", key.name, key.ty, index);
        }
        Ok(index)
    }

    /// Drop a reference, returning the entry if it was freed
    pub fn dispose(&mut self, index: u32) -> Option<NameAndType> {
        self.table.dispose(index, NameAndType::hash)
    }

    pub fn pin(&mut self, index: u32) {
        self.table.entries_mut().pin(index);
    }

    pub fn get(&self, index: u32) -> Option<NameAndType> {
        self.table.payload(index).copied()
    }

    pub fn live_count(&self) -> usize {
        self.table.entries().live_count()
    }

    pub fn freeze(&mut self) {
        self.table.entries_mut().freeze();
    }

    pub fn reset_states(&mut self) {
        self.table.entries_mut().reset_states();
    }

    /// Entries added since the last `reset_states`, and the number deleted
    pub fn diffs(&self) -> (Vec<NameAndType>, usize) {
        let entries = self.table.entries();
        let added = entries
            .with_state(EntryState::ADDED)
            .filter_map(|index| entries.payload(index).copied())
            .collect();
        (added, entries.with_state(EntryState::DELETED).count())
    }

    pub fn check(&self) -> Result<(), String> {
        self.table.check("name and type", NameAndType::hash)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fields_and_methods_are_distinct() {
        let mut table = NameAndTypeTable::new(&TypeIdConfig::default());
        let field = NameAndType {
            name: 0x12345,
            ty: 40,
            is_method: false,
        };
        let method = NameAndType {
            is_method: true,
            ..field
        };
        let a = table.intern(field).unwrap();
        let b = table.intern(method).unwrap();
        assert_ne!(a, b);
        assert_eq!(table.intern(field).unwrap(), a);
        assert_eq!(table.get(b), Some(method));

        assert_eq!(table.dispose(a), None);
        assert_eq!(table.dispose(a), Some(field));
        assert_eq!(table.lookup(field), None);
        assert_eq!(table.check(), Ok(()));
    }
}
