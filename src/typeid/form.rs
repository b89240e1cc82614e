use super::entry_table::{check_all_seen, check_chain, copy_slice};
use super::{Error, Syllable, TypeIdConfig};
use crate::util::{SegmentChain, NO_ENTRY};
use std::collections::HashSet;

const SYLLABLE_BITS: u32 = 4;
const SYLLABLE_MASK: u32 = (1 << SYLLABLE_BITS) - 1;

/// Number of syllables packed into one word
pub(crate) const SYLLABLES_PER_WORD: usize = 8;

/// Pack syllables (return type first) into words, four bits each
///
/// Syllable `i` lives in bits `4 * (i % 8)` of word `i / 8`. An end marker follows the last
/// syllable unless it fills its word, so a signature with up to seven parameters fits in a
/// single word.
pub(crate) fn pack_syllables(syllables: &[Syllable]) -> Result<Vec<u32>, Error> {
    let word_count = ((syllables.len() + SYLLABLES_PER_WORD - 1) / SYLLABLES_PER_WORD).max(1);
    let mut words: Vec<u32> = Vec::new();
    words
        .try_reserve_exact(word_count)
        .map_err(|_| Error::OutOfMemory)?;
    words.resize(word_count, 0);

    let codes = syllables
        .iter()
        .map(|syllable| syllable.code())
        .chain(std::iter::once(Syllable::END))
        .take(word_count * SYLLABLES_PER_WORD);
    for (i, code) in codes.enumerate() {
        let shift = SYLLABLE_BITS * (i % SYLLABLES_PER_WORD) as u32;
        words[i / SYLLABLES_PER_WORD] |= (code as u32) << shift;
    }
    Ok(words)
}

/// Syllables packed into words, up to the end marker or the last word
pub(crate) fn unpack_syllables(words: &[u32]) -> impl Iterator<Item = Syllable> + '_ {
    words
        .iter()
        .flat_map(|&word| {
            (0..SYLLABLES_PER_WORD as u32)
                .map(move |i| ((word >> (SYLLABLE_BITS * i)) & SYLLABLE_MASK) as u8)
        })
        .map_while(Syllable::from_code)
}

/// Shared terse signature, too long to be stored inline in a signature entry
pub(crate) struct Form {
    words: Box<[u32]>,
}

/// Unordered list of forms
///
/// There are very few distinct long forms in a program, so this is a single chain searched
/// linearly. New forms go on the front, so the rest of the chain is never rewritten.
pub(crate) struct FormTable {
    head: u32,
    forms: SegmentChain<Form>,
}

impl FormTable {
    pub fn new(config: &TypeIdConfig) -> FormTable {
        FormTable {
            head: NO_ENTRY,
            forms: SegmentChain::new(0, config.segment_capacity, config.max_index),
        }
    }

    pub fn lookup(&self, words: &[u32]) -> Option<u32> {
        self.forms
            .find_in_chain(self.head, |form| &*form.words == words)
    }

    /// Find a form and take a reference to it, or else insert it
    pub fn intern(&mut self, words: &[u32]) -> Result<u32, Error> {
        if let Some(index) = self.lookup(words) {
            self.forms.conditional_inc_ref(index);
            return Ok(index);
        }
        let form = Form {
            words: copy_slice(words)?,
        };
        let index = self.forms.allocate(form)?;
        self.forms.link_at_head(&mut self.head, index);
        log::trace!("Interned form of {} words as {}", words.len(), index);
        Ok(index)
    }

    pub fn clone_form(&mut self, index: u32) {
        self.forms.conditional_inc_ref(index);
    }

    pub fn dispose(&mut self, index: u32) {
        if self.forms.dec_ref(index) {
            self.forms.unlink(&mut self.head, index);
            self.forms.release(index);
            log::trace!("Freed form {}", index);
        }
    }

    pub fn pin(&mut self, index: u32) {
        self.forms.pin(index);
    }

    pub fn words(&self, index: u32) -> Option<&[u32]> {
        self.forms.payload(index).map(|form| &*form.words)
    }

    pub fn live_count(&self) -> usize {
        self.forms.live_count()
    }

    pub fn freeze(&mut self) {
        self.forms.freeze();
    }

    pub fn reset_states(&mut self) {
        self.forms.reset_states();
    }

    pub fn check(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        check_chain("form", &self.forms, self.head, &mut seen, |_| true)?;
        check_all_seen("form", &self.forms, &seen)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn packing() {
        let syllables = [Syllable::Void, Syllable::Int, Syllable::Object];
        let words = pack_syllables(&syllables).unwrap();
        assert_eq!(words, vec![0x1b32]);
        assert_eq!(unpack_syllables(&words).collect::<Vec<_>>(), syllables);

        // Return plus seven parameters fills a word, with no room left for the end marker
        let full = [Syllable::Long; 8];
        let words = pack_syllables(&full).unwrap();
        assert_eq!(words, vec![0x6666_6666]);
        assert_eq!(unpack_syllables(&words).count(), 8);

        let long = [Syllable::Long; 9];
        let words = pack_syllables(&long).unwrap();
        assert_eq!(words, vec![0x6666_6666, 0x16]);
        assert_eq!(unpack_syllables(&words).count(), 9);
    }

    #[test]
    fn forms_are_shared() {
        let mut forms = FormTable::new(&TypeIdConfig::default());
        let a = forms.intern(&[0x1333_3333, 0x33]).unwrap();
        let b = forms.intern(&[0x1333_3333, 0x33]).unwrap();
        let c = forms.intern(&[0x3333_3333, 0x13]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(forms.live_count(), 2);

        forms.dispose(a);
        assert_eq!(forms.lookup(&[0x1333_3333, 0x33]), Some(a));
        forms.dispose(a);
        assert_eq!(forms.lookup(&[0x1333_3333, 0x33]), None);
        assert_eq!(forms.words(c), Some(&[0x3333_3333, 0x13][..]));
        assert_eq!(forms.check(), Ok(()));
    }
}
