//! Loading classfiles into class blocks
//!
//! [`ClassLoader::load`] checks a classfile, lays its tables out in exactly sized storage,
//! interns the type ids of the class and its members, and registers the result in a
//! [`ClassTable`]. Array classes and the classes of primitive types are synthesized instead of
//! loaded (see [`create_fake_array_class`] and [`create_primitive_class`]).
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html

mod access_flags;
mod class;
mod constants;
mod errors;
mod loader;
mod names;
mod reader;
mod registry;
mod storage;
mod version;

pub use access_flags::*;
pub use class::*;
pub use constants::*;
pub use errors::*;
pub use loader::*;
pub use names::*;
pub use reader::*;
pub use registry::*;
pub use storage::*;
pub use version::*;
