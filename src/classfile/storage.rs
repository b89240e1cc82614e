//! Storage of a loaded class
//!
//! Loading makes two passes over the classfile. The first pass grows throwaway vectors as it
//! goes, only to learn how much room every table of the class needs. The second pass reserves
//! exactly that much up front, in one block for the class and one for its `<clinit>` code (which
//! can be released once static initialization is done), and never grows anything.

use super::{
    Constant, ConstantIndex, Error, FieldAccessFlags, InnerClassAccessFlags, MethodAccessFlags,
};
use crate::typeid::{ClassTypeId, FieldTypeId, MethodTypeId};
use std::mem::size_of;
use std::ops::Range;

/// Append an item, reporting allocation failure instead of aborting
pub(crate) fn push<T>(items: &mut Vec<T>, item: T) -> Result<u32, Error> {
    items.try_reserve(1).map_err(|_| Error::OutOfMemory)?;
    let index = items.len() as u32;
    items.push(item);
    Ok(index)
}

/// Append a slice, returning the range it now occupies
pub(crate) fn extend<T: Copy>(items: &mut Vec<T>, extra: &[T]) -> Result<Range<u32>, Error> {
    items.try_reserve(extra.len()).map_err(|_| Error::OutOfMemory)?;
    let start = items.len() as u32;
    items.extend_from_slice(extra);
    Ok(start..items.len() as u32)
}

fn with_exact_capacity<T>(capacity: usize) -> Result<Vec<T>, Error> {
    let mut items = Vec::new();
    items.try_reserve_exact(capacity).map_err(|_| Error::OutOfMemory)?;
    Ok(items)
}

/// Bytes taken up by `count` items, rounded up to a multiple of 8
fn block_size<T>(count: usize) -> usize {
    (count * size_of::<T>() + 7) & !7
}

pub(crate) fn slice<'a, T>(items: &'a [T], range: &Range<u32>) -> &'a [T] {
    &items[range.start as usize..range.end as usize]
}

/// Entry of a method's exception table
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ExceptionHandler {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,

    /// Class constant of the caught exception (zero catches everything)
    pub catch_type: ConstantIndex,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct LineNumber {
    pub start_pc: u16,
    pub line_number: u16,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct LocalVariable {
    pub start_pc: u16,
    pub length: u16,

    /// UTF-8 constants
    pub name: ConstantIndex,
    pub descriptor: ConstantIndex,

    pub index: u16,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct InnerClass {
    pub inner_class: Option<ConstantIndex>,
    pub outer_class: Option<ConstantIndex>,
    pub inner_name: Option<ConstantIndex>,
    pub access: InnerClassAccessFlags,
}

#[derive(Clone, Debug)]
pub struct FieldBlock {
    pub id: FieldTypeId,
    pub access: FieldAccessFlags,

    /// Initial value of a static field, from its `ConstantValue` attribute
    pub constant_value: Option<ConstantIndex>,

    pub deprecated: bool,
    pub synthetic: bool,
}

/// Which block holds the code of a method
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Arena {
    Main,

    /// Storage released after static initialization
    Clinit,
}

/// Location of a `Code` attribute in its arena
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CodeRange {
    pub max_stack: u16,
    pub max_locals: u16,
    pub(crate) bytecode: Range<u32>,
    pub(crate) handlers: Range<u32>,
    pub(crate) line_numbers: Range<u32>,
    pub(crate) local_variables: Range<u32>,
}

#[derive(Clone, Debug)]
pub struct MethodBlock {
    pub id: MethodTypeId,
    pub access: MethodAccessFlags,

    /// Local variable slots taken by the arguments, including `this`
    pub args_size: u16,

    pub arena: Arena,
    pub code: Option<CodeRange>,
    pub(crate) exceptions: Range<u32>,

    pub deprecated: bool,
    pub synthetic: bool,
}

impl MethodBlock {
    pub fn is_static(&self) -> bool {
        self.access.contains(MethodAccessFlags::STATIC)
    }

    pub fn exception_count(&self) -> usize {
        self.exceptions.len()
    }
}

/// Number of items in each table of an arena
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct CodeSizes {
    pub bytecode: usize,
    pub handlers: usize,
    pub line_numbers: usize,
    pub local_variables: usize,
    pub checked_exceptions: usize,
}

impl CodeSizes {
    pub fn bytes(&self) -> usize {
        block_size::<u8>(self.bytecode)
            + block_size::<ExceptionHandler>(self.handlers)
            + block_size::<LineNumber>(self.line_numbers)
            + block_size::<LocalVariable>(self.local_variables)
            + block_size::<ConstantIndex>(self.checked_exceptions)
    }
}

/// Method attributes of a class (or of its `<clinit>` alone)
#[derive(Default, Debug)]
pub struct CodeStorage {
    pub(crate) bytecode: Vec<u8>,
    pub(crate) handlers: Vec<ExceptionHandler>,
    pub(crate) line_numbers: Vec<LineNumber>,
    pub(crate) local_variables: Vec<LocalVariable>,
    pub(crate) checked_exceptions: Vec<ConstantIndex>,
}

impl CodeStorage {
    pub fn with_sizes(sizes: &CodeSizes) -> Result<CodeStorage, Error> {
        Ok(CodeStorage {
            bytecode: with_exact_capacity(sizes.bytecode)?,
            handlers: with_exact_capacity(sizes.handlers)?,
            line_numbers: with_exact_capacity(sizes.line_numbers)?,
            local_variables: with_exact_capacity(sizes.local_variables)?,
            checked_exceptions: with_exact_capacity(sizes.checked_exceptions)?,
        })
    }

    pub fn sizes(&self) -> CodeSizes {
        CodeSizes {
            bytecode: self.bytecode.len(),
            handlers: self.handlers.len(),
            line_numbers: self.line_numbers.len(),
            local_variables: self.local_variables.len(),
            checked_exceptions: self.checked_exceptions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sizes() == CodeSizes::default()
    }
}

/// Number of items in every table of a class, as measured by the first pass
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct StorageSizes {
    pub constants: usize,
    pub strings: usize,
    pub interfaces: usize,
    pub fields: usize,
    pub methods: usize,
    pub inner_classes: usize,
    pub code: CodeSizes,
    pub clinit: CodeSizes,
}

impl StorageSizes {
    /// Size of the main block of the class
    pub fn main_bytes(&self) -> usize {
        block_size::<Constant>(self.constants)
            + block_size::<u8>(self.strings)
            + block_size::<ClassTypeId>(self.interfaces)
            + block_size::<FieldBlock>(self.fields)
            + block_size::<MethodBlock>(self.methods)
            + block_size::<InnerClass>(self.inner_classes)
            + self.code.bytes()
    }

    /// Size of the block released after static initialization
    pub fn clinit_bytes(&self) -> usize {
        self.clinit.bytes()
    }
}

/// Tables of a class other than its constant pool and its code
#[derive(Default, Debug)]
pub struct ClassStorage {
    pub(crate) interfaces: Vec<ClassTypeId>,
    pub(crate) fields: Vec<FieldBlock>,
    pub(crate) methods: Vec<MethodBlock>,
    pub(crate) inner_classes: Vec<InnerClass>,
}

impl ClassStorage {
    pub fn with_sizes(sizes: &StorageSizes) -> Result<ClassStorage, Error> {
        Ok(ClassStorage {
            interfaces: with_exact_capacity(sizes.interfaces)?,
            fields: with_exact_capacity(sizes.fields)?,
            methods: with_exact_capacity(sizes.methods)?,
            inner_classes: with_exact_capacity(sizes.inner_classes)?,
        })
    }
}

/// Attribute-derived facts about the class itself
#[derive(Clone, Debug, Default)]
pub struct ClassAttributes {
    pub source_file: Option<ConstantIndex>,
    pub absolute_source_path: Option<ConstantIndex>,
    pub timestamp: Option<u64>,
    pub deprecated: bool,
    pub synthetic: bool,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn block_sizes_are_rounded() {
        assert_eq!(block_size::<u8>(0), 0);
        assert_eq!(block_size::<u8>(1), 8);
        assert_eq!(block_size::<u8>(9), 16);
        assert_eq!(block_size::<u16>(4), 8);

        let sizes = CodeSizes {
            bytecode: 5,
            checked_exceptions: 1,
            ..CodeSizes::default()
        };
        assert_eq!(sizes.bytes(), 16);
    }

    #[test]
    fn exact_storage_does_not_grow() {
        let sizes = CodeSizes {
            bytecode: 3,
            ..CodeSizes::default()
        };
        let mut code = CodeStorage::with_sizes(&sizes).unwrap();
        let capacity = code.bytecode.capacity();
        assert_eq!(extend(&mut code.bytecode, &[1, 2, 3]), Ok(0..3));
        assert_eq!(code.bytecode.capacity(), capacity);
        assert_eq!(code.sizes(), sizes);
        assert_eq!(slice(&code.bytecode, &(1..3)), &[2, 3]);
    }
}
