//! Interned, reference counted type identifiers
//!
//! Class names, member names, and method signatures are hash-consed into small tokens, so that
//! comparing two of them is a single integer comparison. Each kind of token gets its own type
//! ([`ClassTypeId`], [`NameTypeId`], [`MethodSigId`]), and fields and methods are pairs of a name
//! and a type ([`FieldTypeId`], [`MethodTypeId`]).
//!
//! Every table is a fixed set of hash buckets whose chains run through entries stored in a
//! [`SegmentChain`](crate::util::SegmentChain). Entries can be pinned (their reference count
//! saturates) and whole segments frozen, which is how a preloaded [`RomImage`] is consumed.

mod class_table;
mod descriptors;
mod entry_table;
mod errors;
mod form;
mod method_sig;
mod name_and_type;
mod name_table;
mod package;
mod rom;
mod token;
mod type_ids;

pub use descriptors::*;
pub use errors::*;
pub use rom::*;
pub use token::*;
pub use type_ids::*;
