use super::storage::{extend, push};
use super::{ClassReader, Error, LoaderConfig};
use crate::util::is_valid_modified_utf8;
use std::fmt::{Display, Error as FmtError, Formatter};
use std::ops::Range;

/// Index into the constant pool
///
/// Index zero is never a valid constant, which is why it doubles as "absent" in some attributes.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct ConstantIndex(pub u16);

impl Display for ConstantIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
        write!(f, "#{}", self.0)
    }
}

/// Constant pool tags
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.4-140
pub mod tags {
    pub const UTF8: u8 = 1;
    pub const INTEGER: u8 = 3;
    pub const FLOAT: u8 = 4;
    pub const LONG: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const CLASS: u8 = 7;
    pub const STRING: u8 = 8;
    pub const FIELD_REF: u8 = 9;
    pub const METHOD_REF: u8 = 10;
    pub const INTERFACE_METHOD_REF: u8 = 11;
    pub const NAME_AND_TYPE: u8 = 12;
}

/// Constants as in the constant pool
///
/// References between constants are kept as indices and are only checked when they are
/// followed. The text of UTF-8 constants lives in one buffer shared by the whole pool.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Constant {
    /// Index zero
    Unused,

    /// Modified UTF-8 text (validated when the pool is read)
    Utf8(Range32),

    Integer(i32),

    /// Bits of a `float`
    Float(u32),

    Long(i64),

    /// Bits of a `double`
    Double(u64),

    /// Second slot of a `Long` or `Double`, which cannot be referred to on its own
    Reserved,

    Class(ConstantIndex),
    String(ConstantIndex),

    FieldRef {
        class: ConstantIndex,
        name_and_type: ConstantIndex,
    },
    MethodRef {
        class: ConstantIndex,
        name_and_type: ConstantIndex,
    },
    InterfaceMethodRef {
        class: ConstantIndex,
        name_and_type: ConstantIndex,
    },

    NameAndType {
        name: ConstantIndex,
        descriptor: ConstantIndex,
    },
}

/// Copyable range of bytes in the pool's text buffer
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Range32 {
    pub start: u32,
    pub end: u32,
}

impl From<Range<u32>> for Range32 {
    fn from(range: Range<u32>) -> Range32 {
        Range32 {
            start: range.start,
            end: range.end,
        }
    }
}

const ILLEGAL_INDEX: Error = Error::MalformedInput("Illegal constant pool index");

#[derive(Default, Debug)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    strings: Vec<u8>,
}

impl ConstantPool {
    /// Pool with exactly enough room for `constants` entries and `strings` bytes of text
    pub fn with_sizes(constants: usize, strings: usize) -> Result<ConstantPool, Error> {
        let mut pool = ConstantPool::default();
        pool.constants
            .try_reserve_exact(constants)
            .map_err(|_| Error::OutOfMemory)?;
        pool.strings
            .try_reserve_exact(strings)
            .map_err(|_| Error::OutOfMemory)?;
        Ok(pool)
    }

    /// Read the `constant_pool_count` and the constants that follow it
    pub fn read(
        &mut self,
        reader: &mut ClassReader<'_>,
        config: &LoaderConfig,
    ) -> Result<(), Error> {
        let count = reader.u2()? as usize;
        if count > config.max_constant_pool_size {
            return Err(Error::CapacityExceeded(
                "Constant pool size exceeds the configured limit",
            ));
        }
        if count < 1 {
            return Err(Error::MalformedInput("Illegal constant pool size"));
        }

        push(&mut self.constants, Constant::Unused)?;
        while self.constants.len() < count {
            let constant = match reader.u1()? {
                tags::UTF8 => {
                    let length = reader.u2()? as usize;
                    let bytes = reader.bytes(length)?;
                    if !is_valid_modified_utf8(bytes) {
                        return Err(Error::MalformedInput("Bad utf string"));
                    }
                    Constant::Utf8(extend(&mut self.strings, bytes)?.into())
                }
                tags::CLASS => Constant::Class(ConstantIndex(reader.u2()?)),
                tags::STRING => Constant::String(ConstantIndex(reader.u2()?)),
                tags::FIELD_REF => Constant::FieldRef {
                    class: ConstantIndex(reader.u2()?),
                    name_and_type: ConstantIndex(reader.u2()?),
                },
                tags::METHOD_REF => Constant::MethodRef {
                    class: ConstantIndex(reader.u2()?),
                    name_and_type: ConstantIndex(reader.u2()?),
                },
                tags::INTERFACE_METHOD_REF => Constant::InterfaceMethodRef {
                    class: ConstantIndex(reader.u2()?),
                    name_and_type: ConstantIndex(reader.u2()?),
                },
                tags::NAME_AND_TYPE => Constant::NameAndType {
                    name: ConstantIndex(reader.u2()?),
                    descriptor: ConstantIndex(reader.u2()?),
                },
                tags::INTEGER => Constant::Integer(reader.u4()? as i32),
                tags::FLOAT if !config.allow_floating_point => {
                    return Err(Error::MalformedInput(
                        "floating-point constants should not appear",
                    ))
                }
                tags::FLOAT => Constant::Float(reader.u4()?),
                tags::DOUBLE if !config.allow_floating_point => {
                    return Err(Error::MalformedInput(
                        "floating-point constants should not appear",
                    ))
                }
                tag @ (tags::LONG | tags::DOUBLE) => {
                    let high = u64::from(reader.u4()?);
                    if self.constants.len() + 1 >= count {
                        return Err(Error::MalformedInput("illegal constant pool entry"));
                    }
                    let bits = high << 32 | u64::from(reader.u4()?);
                    let constant = if tag == tags::LONG {
                        Constant::Long(bits as i64)
                    } else {
                        Constant::Double(bits)
                    };
                    push(&mut self.constants, constant)?;
                    Constant::Reserved
                }
                _ => return Err(Error::MalformedInput("Illegal constant pool type")),
            };
            push(&mut self.constants, constant)?;
        }
        Ok(())
    }

    /// Number of slots in the pool, including the unused slot zero
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Bytes of text across all UTF-8 constants
    pub fn text_len(&self) -> usize {
        self.strings.len()
    }

    pub fn get(&self, index: ConstantIndex) -> Option<&Constant> {
        self.constants.get(index.0 as usize)
    }

    /// Text of a UTF-8 constant
    pub fn utf8(&self, index: ConstantIndex) -> Result<&[u8], Error> {
        match self.get(index) {
            Some(Constant::Utf8(range)) => {
                Ok(&self.strings[range.start as usize..range.end as usize])
            }
            _ => Err(ILLEGAL_INDEX),
        }
    }

    /// Text of a UTF-8 constant, where index zero means there is none
    pub fn optional_utf8(&self, index: ConstantIndex) -> Result<Option<&[u8]>, Error> {
        if index.0 == 0 {
            Ok(None)
        } else {
            self.utf8(index).map(Some)
        }
    }

    /// Name of the class named by a class constant
    pub fn class_name(&self, index: ConstantIndex) -> Result<&[u8], Error> {
        match self.get(index) {
            Some(Constant::Class(name)) if index.0 != 0 => self.utf8(*name),
            _ => Err(ILLEGAL_INDEX),
        }
    }

    /// Name of a class constant, if the index is one, without any further checking
    pub fn class_constant_name(&self, index: ConstantIndex) -> Option<&[u8]> {
        match self.get(index)? {
            Constant::Class(name) => self.utf8(*name).ok(),
            _ => None,
        }
    }

    /// Name and descriptor of a field or method reference
    pub fn member_ref(&self, index: ConstantIndex) -> Result<(&[u8], &[u8], &[u8]), Error> {
        let (class, name_and_type) = match self.get(index) {
            Some(Constant::FieldRef {
                class,
                name_and_type,
            })
            | Some(Constant::MethodRef {
                class,
                name_and_type,
            })
            | Some(Constant::InterfaceMethodRef {
                class,
                name_and_type,
            }) => (*class, *name_and_type),
            _ => return Err(ILLEGAL_INDEX),
        };
        match self.get(name_and_type) {
            Some(Constant::NameAndType { name, descriptor }) => Ok((
                self.class_name(class)?,
                self.utf8(*name)?,
                self.utf8(*descriptor)?,
            )),
            _ => Err(ILLEGAL_INDEX),
        }
    }
}
