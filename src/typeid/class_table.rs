use super::entry_table::{check_all_seen, check_chain, copy_bytes};
use super::package::{class_bucket, PackageTable};
use super::{Error, TypeIdConfig, FIRST_CLASS_INDEX, MAX_CLASS_INDEX};
use crate::util::{decode_modified_utf8, EntryState, SegmentChain};
use std::collections::HashSet;

/// Class entry: the package it lives in, and its name within that package
pub(crate) struct ClassEntry {
    package: u32,
    name: Box<[u8]>,
}

/// Split a binary class name into its package and its simple name
///
/// `java/lang/Object` splits into `java/lang` and `Object`, while `Foo` is in the null package.
fn split_class_name(name: &[u8]) -> (&[u8], &[u8]) {
    match name.iter().rposition(|&b| b == b'/') {
        Some(slash) => (&name[..slash], &name[slash + 1..]),
        None => (&name[..0], name),
    }
}

/// Interned (non-array) class names
///
/// Array types never get entries: their depth lives in the token, next to the index of the
/// element class (or the predefined primitive token).
pub(crate) struct ClassTable {
    packages: PackageTable,
    classes: SegmentChain<ClassEntry>,
}

impl ClassTable {
    pub fn new(config: &TypeIdConfig) -> Result<ClassTable, Error> {
        Ok(ClassTable {
            packages: PackageTable::new(config)?,
            classes: SegmentChain::new(
                FIRST_CLASS_INDEX,
                config.segment_capacity,
                config.max_class_index.min(MAX_CLASS_INDEX),
            ),
        })
    }

    pub fn lookup(&self, name: &[u8]) -> Option<u32> {
        let (package_name, simple_name) = split_class_name(name);
        let package = self.packages.find(package_name)?;
        let head = self.packages.get(package)?.head(class_bucket(simple_name));
        self.classes
            .find_in_chain(head, |entry| &*entry.name == simple_name)
    }

    /// Find a class and take a reference to it, or else insert it
    pub fn intern(&mut self, name: &[u8]) -> Result<(u32, bool), Error> {
        if let Some(index) = self.lookup(name) {
            self.classes.conditional_inc_ref(index);
            return Ok((index, false));
        }

        let (package_name, simple_name) = split_class_name(name);
        let package = self.packages.find_or_create(package_name)?;
        let allocated = copy_bytes(simple_name).and_then(|simple| {
            let entry = ClassEntry {
                package,
                name: simple,
            };
            Ok(self.classes.allocate(entry)?)
        });
        let index = match allocated {
            Ok(index) => index,
            Err(err) => {
                self.packages.release(package);
                return Err(err);
            }
        };

        let head = self.packages.head_mut(package, class_bucket(simple_name));
        self.classes.link_at_head(head, index);
        log::trace!("Interned class {} as {}", decode_modified_utf8(name), index);
        Ok((index, true))
    }

    pub fn clone_class(&mut self, index: u32) {
        self.classes.conditional_inc_ref(index);
    }

    /// Drop a reference, freeing the class (and releasing its package) if it was the last
    pub fn dispose(&mut self, index: u32) {
        if !self.classes.dec_ref(index) {
            return;
        }
        let (package, bucket) = match self.classes.payload(index) {
            Some(entry) => (entry.package, class_bucket(&entry.name)),
            None => return,
        };
        let head = self.packages.head_mut(package, bucket);
        self.classes.unlink(head, index);
        if let Some(entry) = self.classes.release(index) {
            log::trace!("Freed class {}", decode_modified_utf8(&entry.name));
        }
        self.packages.release(package);
    }

    /// Make a class (and its package) permanent
    pub fn pin(&mut self, index: u32) {
        self.classes.pin(index);
        if let Some(package) = self.package_of(index) {
            self.packages.pin(package);
        }
    }

    pub fn ref_count(&self, index: u32) -> u8 {
        self.classes.entry_at(index).ref_count()
    }

    pub fn package_of(&self, index: u32) -> Option<u32> {
        self.classes.payload(index).map(|entry| entry.package)
    }

    /// Full binary name of a class, appended to the buffer
    pub fn write_name(&self, index: u32, out: &mut Vec<u8>) -> bool {
        let entry = match self.classes.payload(index) {
            Some(entry) => entry,
            None => return false,
        };
        if let Some(package) = self.packages.get(entry.package) {
            if !package.name().is_empty() {
                out.extend_from_slice(package.name());
                out.push(b'/');
            }
        }
        out.extend_from_slice(&entry.name);
        true
    }

    pub fn live_count(&self) -> usize {
        self.classes.live_count()
    }

    pub fn package_count(&self) -> usize {
        self.packages.live_count()
    }

    pub fn freeze(&mut self) {
        self.classes.freeze();
        self.packages.freeze();
    }

    pub fn reset_states(&mut self) {
        self.classes.reset_states();
        self.packages.reset_states();
    }

    /// Names of classes added since the states were last reset, and the number deleted
    pub fn diffs(&self) -> (Vec<String>, usize) {
        let added = self
            .classes
            .with_state(EntryState::ADDED)
            .filter_map(|index| {
                let mut name = vec![];
                self.write_name(index, &mut name)
                    .then(|| decode_modified_utf8(&name))
            })
            .collect();
        let deleted = self.classes.with_state(EntryState::DELETED).count();
        (added, deleted)
    }

    /// Check both levels of chains
    pub fn check(&self) -> Result<(), String> {
        self.packages.check()?;
        let mut seen = HashSet::new();
        for package in self.packages.indices() {
            let heads = match self.packages.get(package) {
                Some(pkg) => pkg.heads(),
                None => continue,
            };
            for (bucket, &head) in heads.iter().enumerate() {
                check_chain("class", &self.classes, head, &mut seen, |entry| {
                    entry.package == package && class_bucket(&entry.name) == bucket
                })?;
            }
        }
        check_all_seen("class", &self.classes, &seen)
    }
}
