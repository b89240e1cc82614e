use super::entry_table::{copy_bytes, string_hash, EntryTable};
use super::{Error, NameTypeId, TypeIdConfig};
use crate::util::{decode_modified_utf8, EntryState};

pub(crate) const NAME_HASH_SIZE: usize = 41 * 13;

/// Interned field and method names
pub(crate) struct NameTable {
    table: EntryTable<Box<[u8]>>,
}

impl NameTable {
    pub fn new(config: &TypeIdConfig) -> NameTable {
        NameTable {
            table: EntryTable::new(NAME_HASH_SIZE, 1, config.segment_capacity, config.max_index),
        }
    }

    pub fn lookup(&self, name: &[u8]) -> Option<NameTypeId> {
        self.table
            .lookup(string_hash(name), |entry| &**entry == name)
            .map(NameTypeId::from_token)
    }

    pub fn intern(&mut self, name: &[u8]) -> Result<NameTypeId, Error> {
        let (index, inserted) = self.table.intern(
            string_hash(name),
            |entry| &**entry == name,
            || copy_bytes(name),
        )?;
        if inserted {
            log::trace!("Interned member name {} as {}", decode_modified_utf8(name), index);
        }
        Ok(NameTypeId::from_token(index))
    }

    pub fn clone_name(&mut self, id: NameTypeId) {
        self.table.clone_entry(id.token());
    }

    pub fn dispose(&mut self, id: NameTypeId) {
        if let Some(name) = self.table.dispose(id.token(), |entry| string_hash(entry)) {
            log::trace!("Freed member name {}", decode_modified_utf8(&name));
        }
    }

    pub fn pin(&mut self, id: NameTypeId) {
        self.table.entries_mut().pin(id.token());
    }

    pub fn name(&self, id: NameTypeId) -> Option<&[u8]> {
        self.table.payload(id.token()).map(|name| &**name)
    }

    pub fn ref_count(&self, id: NameTypeId) -> u8 {
        self.table.entries().entry_at(id.token()).ref_count()
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

    /// Names of entries added since the states were last reset, and the number deleted
    pub fn diffs(&self) -> (Vec<String>, usize) {
        let entries = self.table.entries();
        let added = entries
            .with_state(EntryState::ADDED)
            .filter_map(|index| entries.payload(index))
            .map(|name| decode_modified_utf8(name))
            .collect();
        (added, entries.with_state(EntryState::DELETED).count())
    }

    pub fn check(&self) -> Result<(), String> {
        self.table.check("name", |entry| string_hash(entry))
    }
}
