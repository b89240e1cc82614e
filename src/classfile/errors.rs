use crate::typeid;
use std::fmt::{Display, Error as FmtError, Formatter};

/// Reasons a class could not be loaded
///
/// Every variant is recoverable: the load is abandoned, whatever it interned is released, and
/// the tables are left as they were.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// The host allocator could not provide the class storage
    OutOfMemory,

    /// The classfile breaks a format rule (the payload says which)
    MalformedInput(&'static str),

    /// A class with the same name and loader is already registered
    DuplicateDefinition(String),

    /// A configured or encoding limit was exceeded
    CapacityExceeded(&'static str),
}

impl Error {
    /// Short diagnostic naming the rule that was violated (eg. "Bad magic number")
    pub fn detail(&self) -> &'static str {
        match self {
            Error::OutOfMemory => "out of memory",
            Error::MalformedInput(detail) => *detail,
            Error::DuplicateDefinition(_) => "Duplicate name",
            Error::CapacityExceeded(detail) => *detail,
        }
    }
}

impl From<typeid::Error> for Error {
    fn from(err: typeid::Error) -> Error {
        match err {
            typeid::Error::OutOfMemory => Error::OutOfMemory,
            typeid::Error::CapacityExceeded(what) => Error::CapacityExceeded(what),
            typeid::Error::MalformedSignature(_) => Error::MalformedInput("Bad signature"),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            Error::DuplicateDefinition(name) => write!(f, "Duplicate name: {}", name),
            other => f.write_str(other.detail()),
        }
    }
}

impl std::error::Error for Error {}
