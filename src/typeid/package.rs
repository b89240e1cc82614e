use super::entry_table::{copy_bytes, string_hash, EntryTable};
use super::{Error, TypeIdConfig};
use crate::util::NO_ENTRY;

/// Number of class buckets in each package
pub(crate) const NCLASSHASH: usize = 11;

/// Number of package buckets
pub(crate) const NPACKAGEHASH: usize = 17;

/// Package of every class whose name has no `/`
pub(crate) const NULL_PACKAGE: u32 = 0;

/// A package, holding the bucket heads for the classes declared in it
///
/// Class lookup is two-level: find the package by name, then find the class by its name within
/// the package. Packages are reference counted by the class entries inside them.
pub(crate) struct Package {
    name: Box<[u8]>,
    classes: [u32; NCLASSHASH],
}

/// Bucket of a class-in-package name
pub(crate) fn class_bucket(simple_name: &[u8]) -> usize {
    string_hash(simple_name) as usize % NCLASSHASH
}

impl Package {
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn head(&self, bucket: usize) -> u32 {
        self.classes[bucket]
    }

    pub fn heads(&self) -> &[u32; NCLASSHASH] {
        &self.classes
    }
}

pub(crate) struct PackageTable {
    table: EntryTable<Package>,
}

impl PackageTable {
    /// New package table, containing only the (pinned) null package
    pub fn new(config: &TypeIdConfig) -> Result<PackageTable, Error> {
        let mut table = EntryTable::new(
            NPACKAGEHASH,
            NULL_PACKAGE,
            config.segment_capacity,
            config.max_index,
        );
        let (null_package, _) = table.intern(
            string_hash(b""),
            |_| false,
            || {
                Ok(Package {
                    name: Box::new([]),
                    classes: [NO_ENTRY; NCLASSHASH],
                })
            },
        )?;
        debug_assert_eq!(null_package, NULL_PACKAGE);
        table.entries_mut().pin(null_package);
        Ok(PackageTable { table })
    }

    pub fn find(&self, name: &[u8]) -> Option<u32> {
        self.table
            .lookup(string_hash(name), |pkg| &*pkg.name == name)
    }

    /// Find a package and take a reference to it, creating it if necessary
    pub fn find_or_create(&mut self, name: &[u8]) -> Result<u32, Error> {
        let (index, inserted) = self.table.intern(
            string_hash(name),
            |pkg| &*pkg.name == name,
            || {
                Ok(Package {
                    name: copy_bytes(name)?,
                    classes: [NO_ENTRY; NCLASSHASH],
                })
            },
        )?;
        if inserted {
            log::trace!("Created package {}", String::from_utf8_lossy(name));
        }
        Ok(index)
    }

    /// Drop a reference to a package, freeing it if no classes remain in it
    pub fn release(&mut self, index: u32) {
        if let Some(pkg) = self.table.dispose(index, |pkg| string_hash(&pkg.name)) {
            debug_assert!(pkg.classes.iter().all(|&head| head == NO_ENTRY));
            log::trace!("Freed package {}", String::from_utf8_lossy(&pkg.name));
        }
    }

    pub fn pin(&mut self, index: u32) {
        self.table.entries_mut().pin(index);
    }

    pub fn get(&self, index: u32) -> Option<&Package> {
        self.table.payload(index)
    }

    /// Mutable bucket head of a live package
    pub fn head_mut(&mut self, index: u32, bucket: usize) -> &mut u32 {
        match self.table.entries_mut().payload_mut(index) {
            Some(pkg) => &mut pkg.classes[bucket],
            None => panic!("package {} is free", index),
        }
    }

    /// Indices of all live packages
    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.table.entries().live().map(|(index, _)| index)
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

    pub fn check(&self) -> Result<(), String> {
        self.table.check("package", |pkg| string_hash(&pkg.name))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn null_package_is_pinned() {
        let mut packages = PackageTable::new(&TypeIdConfig::default()).unwrap();
        assert_eq!(packages.find(b""), Some(NULL_PACKAGE));
        packages.release(NULL_PACKAGE);
        assert_eq!(packages.find(b""), Some(NULL_PACKAGE));
        assert_eq!(packages.live_count(), 1);
    }

    #[test]
    fn packages_are_reference_counted() {
        let mut packages = PackageTable::new(&TypeIdConfig::default()).unwrap();
        let lang = packages.find_or_create(b"java/lang").unwrap();
        assert_eq!(packages.find_or_create(b"java/lang").unwrap(), lang);
        assert_eq!(packages.get(lang).map(Package::name), Some(&b"java/lang"[..]));

        packages.release(lang);
        assert_eq!(packages.find(b"java/lang"), Some(lang));
        packages.release(lang);
        assert_eq!(packages.find(b"java/lang"), None);
        assert_eq!(packages.check(), Ok(()));
    }
}
