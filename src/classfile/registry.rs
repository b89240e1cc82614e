use super::{ClassBlock, Error};
use crate::util::decode_modified_utf8;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::sync::Arc;

/// Handle of the class loader which defined a class
///
/// Classes defined by the bootstrap loader have no handle. Handles only need to be distinct and
/// ordered, so that classes with the same name sort deterministically.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct LoaderId(pub u32);

fn compare(class: &ClassBlock, name: &[u8], loader: Option<LoaderId>) -> Ordering {
    class
        .name()
        .cmp(name)
        .then_with(|| class.loader().cmp(&loader))
}

/// Every registered class, sorted by name and then by loader
///
/// Registration is the only point at which a loaded class becomes visible. Checking for a
/// duplicate and inserting happen under the same lock.
#[derive(Default)]
pub struct ClassTable {
    classes: Mutex<Vec<Arc<ClassBlock>>>,
}

impl ClassTable {
    pub fn new() -> ClassTable {
        ClassTable::default()
    }

    /// Register a class, unless one with the same name and loader already is
    pub fn add(&self, class: Arc<ClassBlock>) -> Result<(), Error> {
        let mut classes = self.classes.lock();
        let position =
            classes.binary_search_by(|other| compare(other, class.name(), class.loader()));
        match position {
            Ok(_) => Err(Error::DuplicateDefinition(decode_modified_utf8(class.name()))),
            Err(position) => {
                classes.try_reserve(1).map_err(|_| Error::OutOfMemory)?;
                log::debug!(
                    "Registered class {} (loader {:?})",
                    decode_modified_utf8(class.name()),
                    class.loader()
                );
                classes.insert(position, class);
                Ok(())
            }
        }
    }

    /// Unregister a class, returning whether it was registered
    pub fn remove(&self, class: &Arc<ClassBlock>) -> bool {
        let mut classes = self.classes.lock();
        match classes.iter().position(|other| Arc::ptr_eq(other, class)) {
            Some(position) => {
                classes.remove(position);
                true
            }
            None => false,
        }
    }

    pub fn find(&self, name: &[u8], loader: Option<LoaderId>) -> Option<Arc<ClassBlock>> {
        let classes = self.classes.lock();
        let position = classes
            .binary_search_by(|other| compare(other, name, loader))
            .ok()?;
        Some(classes[position].clone())
    }

    pub fn contains(&self, name: &[u8], loader: Option<LoaderId>) -> bool {
        let classes = self.classes.lock();
        classes
            .binary_search_by(|other| compare(other, name, loader))
            .is_ok()
    }

    pub fn len(&self) -> usize {
        self.classes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.lock().is_empty()
    }

    /// Registered classes, in sorted order
    pub fn snapshot(&self) -> Vec<Arc<ClassBlock>> {
        self.classes.lock().clone()
    }
}
