/// Version of the class file
///
/// Loading does not reject any version, but very old classfiles lay out the `Code` attribute
/// differently.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Version {
    pub major_version: u16,
    pub minor_version: u16,
}

impl Version {
    /// Version given to classes which are synthesized rather than loaded
    pub const JAVA1: Version = Version {
        major_version: 45,
        minor_version: 3,
    };

    /// Whether `Code` attributes use one byte for `max_stack` and `max_locals` and two bytes for
    /// the code length
    pub fn has_short_code_header(&self) -> bool {
        self.major_version == 45 && self.minor_version <= 2
    }
}
