//! Interned type identifiers for a small JVM, along with the classfile loader that produces
//! internal class blocks on top of them.
//!
//! The [`typeid`] module hash-conses class names, member names, and method signatures into
//! compact reference counted tokens. The [`classfile`] module parses `.class` bytes in two
//! passes (sizing, then materializing) and registers the finished class in a [`ClassTable`].
//!
//! [`ClassTable`]: classfile::ClassTable

pub mod classfile;
pub mod typeid;
pub mod util;
