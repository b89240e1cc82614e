use super::entry_table::{copy_slice, words_hash, EntryTable};
use super::form::FormTable;
use super::{Error, MethodSigId, TypeIdConfig};
use crate::util::EntryState;

pub(crate) const NMETHODTYPEHASH: usize = 13 * 37;

/// Where the terse signature of a method signature lives
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum FormRef {
    /// Short signature packed into the entry itself
    Inline(u32),

    /// Index in the form table
    Shared(u32),
}

/// Method signature entry
///
/// The terse signature gives the shape of the return type and parameters, and `details` lists
/// the class tokens of the object syllables, in syllable order. Each detail is an owned
/// reference into the class table.
pub(crate) struct MethodSig {
    parameter_count: u32,
    form: FormRef,
    details: Box<[u32]>,
}

fn sig_hash(words: &[u32], details: &[u32]) -> u32 {
    words_hash(words.iter().chain(details.iter()).copied())
}

fn form_words<'a>(forms: &'a FormTable, form: &'a FormRef) -> &'a [u32] {
    match form {
        FormRef::Inline(word) => std::slice::from_ref(word),
        FormRef::Shared(index) => forms.words(*index).unwrap_or(&[]),
    }
}

/// Interned method signatures, with the forms they share
pub(crate) struct MethodSigTable {
    table: EntryTable<MethodSig>,
    forms: FormTable,
}

impl MethodSigTable {
    pub fn new(config: &TypeIdConfig) -> MethodSigTable {
        MethodSigTable {
            table: EntryTable::new(NMETHODTYPEHASH, 1, config.segment_capacity, config.max_index),
            forms: FormTable::new(config),
        }
    }

    pub fn lookup(&self, words: &[u32], details: &[u32]) -> Option<MethodSigId> {
        let forms = &self.forms;
        self.table
            .lookup(sig_hash(words, details), |sig| {
                form_words(forms, &sig.form) == words && &*sig.details == details
            })
            .map(MethodSigId::from_token)
    }

    /// Find a signature and take a reference to it, or else insert it
    ///
    /// The returned flag is `true` if the entry was freshly inserted, in which case it took
    /// over the references to the detail classes. Otherwise the caller still owns them.
    pub fn intern(
        &mut self,
        words: &[u32],
        parameter_count: u32,
        details: &[u32],
    ) -> Result<(MethodSigId, bool), Error> {
        if let Some(id) = self.lookup(words, details) {
            self.table.clone_entry(id.token());
            return Ok((id, false));
        }

        let form = match words {
            [word] => FormRef::Inline(*word),
            _ => FormRef::Shared(self.forms.intern(words)?),
        };
        let inserted = copy_slice(details).and_then(|details| {
            let sig = MethodSig {
                parameter_count,
                form,
                details,
            };
            self.table.insert(sig_hash(words, &sig.details), sig)
        });
        match inserted {
            Ok(index) => {
                log::trace!("Interned method signature as {}", index);
                Ok((MethodSigId::from_token(index), true))
            }
            Err(err) => {
                if let FormRef::Shared(index) = form {
                    self.forms.dispose(index);
                }
                Err(err)
            }
        }
    }

    pub fn clone_sig(&mut self, id: MethodSigId) {
        self.table.clone_entry(id.token());
    }

    /// Drop a reference, handing back the detail classes if the entry was freed
    ///
    /// The caller must then dispose of each detail class.
    pub fn dispose(&mut self, id: MethodSigId) -> Option<Box<[u32]>> {
        let forms = &self.forms;
        let sig = self.table.dispose(id.token(), |sig| {
            sig_hash(form_words(forms, &sig.form), &sig.details)
        })?;
        if let FormRef::Shared(index) = sig.form {
            self.forms.dispose(index);
        }
        log::trace!("Freed method signature {}", id.token());
        Some(sig.details)
    }

    /// Make a signature (and its form) permanent
    pub fn pin(&mut self, id: MethodSigId) {
        self.table.entries_mut().pin(id.token());
        if let Some(FormRef::Shared(index)) = self.table.payload(id.token()).map(|sig| sig.form) {
            self.forms.pin(index);
        }
    }

    /// Packed terse signature
    pub fn words(&self, id: MethodSigId) -> Option<&[u32]> {
        let sig = self.table.payload(id.token())?;
        Some(form_words(&self.forms, &sig.form))
    }

    /// Class tokens of the object syllables
    pub fn details(&self, id: MethodSigId) -> Option<&[u32]> {
        self.table.payload(id.token()).map(|sig| &*sig.details)
    }

    pub fn parameter_count(&self, id: MethodSigId) -> Option<u32> {
        self.table.payload(id.token()).map(|sig| sig.parameter_count)
    }

    pub fn form(&self, id: MethodSigId) -> Option<FormRef> {
        self.table.payload(id.token()).map(|sig| sig.form)
    }

    pub fn ref_count(&self, id: MethodSigId) -> u8 {
        self.table.entries().entry_at(id.token()).ref_count()
    }

    pub fn live_count(&self) -> usize {
        self.table.entries().live_count()
    }

    pub fn form_count(&self) -> usize {
        self.forms.live_count()
    }

    pub fn freeze(&mut self) {
        self.table.entries_mut().freeze();
        self.forms.freeze();
    }

    pub fn reset_states(&mut self) {
        self.table.entries_mut().reset_states();
        self.forms.reset_states();
    }

    /// Signatures added since the states were last reset
    pub fn added(&self) -> Vec<MethodSigId> {
        self.table
            .entries()
            .with_state(EntryState::ADDED)
            .map(MethodSigId::from_token)
            .collect()
    }

    pub fn deleted_count(&self) -> usize {
        self.table.entries().with_state(EntryState::DELETED).count()
    }

    pub fn check(&self) -> Result<(), String> {
        self.forms.check()?;
        let forms = &self.forms;
        self.table.check("method signature", |sig| {
            sig_hash(form_words(forms, &sig.form), &sig.details)
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn inline_and_shared_forms() {
        let mut sigs = MethodSigTable::new(&TypeIdConfig::default());
        let (short, inserted) = sigs.intern(&[0x132], 1, &[]).unwrap();
        assert!(inserted);
        assert_eq!(sigs.form(short), Some(FormRef::Inline(0x132)));

        let long_words = [0x3333_3332, 0x0000_0133];
        let (long, _) = sigs.intern(&long_words, 8, &[]).unwrap();
        assert!(matches!(sigs.form(long), Some(FormRef::Shared(_))));
        assert_eq!(sigs.words(long), Some(&long_words[..]));
        assert_eq!(sigs.form_count(), 1);

        assert!(sigs.dispose(long).is_some());
        assert_eq!(sigs.form_count(), 0);
        assert_eq!(sigs.check(), Ok(()));
    }

    #[test]
    fn details_distinguish_signatures() {
        let mut sigs = MethodSigTable::new(&TypeIdConfig::default());
        let (a, _) = sigs.intern(&[0x1b2], 1, &[20]).unwrap();
        let (b, _) = sigs.intern(&[0x1b2], 1, &[21]).unwrap();
        let (again, inserted) = sigs.intern(&[0x1b2], 1, &[20]).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, again);
        assert!(!inserted);
        assert_eq!(sigs.ref_count(a), 2);
        assert_eq!(sigs.lookup(&[0x1b2], &[21]), Some(b));

        assert_eq!(sigs.dispose(a), None);
        assert_eq!(sigs.dispose(a).as_deref(), Some(&[20][..]));
        assert_eq!(sigs.lookup(&[0x1b2], &[20]), None);
    }
}
