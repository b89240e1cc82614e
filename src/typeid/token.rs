use crate::util::NO_ENTRY;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Bits of a class token above which the array depth is stored
pub const ARRAY_SHIFT: u32 = 24;

/// Array depth part of a class token
pub const ARRAY_MASK: u32 = 0xff00_0000;

/// Element (base) type part of a class token
pub const BASE_TYPE_MASK: u32 = 0x00ff_ffff;

/// Deepest array type that can be named (a limit of the JVM itself)
pub const MAX_ARRAY_DEPTH: u32 = 255;

/// First index of the class table (everything below is a predefined primitive token)
pub(crate) const FIRST_CLASS_INDEX: u32 = Syllable::Boolean as u32 + 1;

/// Largest class table index (one less than the mask, so no class token is `NO_ENTRY`)
pub(crate) const MAX_CLASS_INDEX: u32 = BASE_TYPE_MASK - 1;

/// Largest index in the name, signature, and member tables
pub(crate) const MAX_INDEX: u32 = NO_ENTRY - 1;

/// One syllable of a terse signature (the shape of a type, without class names)
///
/// Heap types (objects and arrays) all collapse into `Object`. The discriminants are the
/// predefined tokens of the corresponding primitive classes.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum Syllable {
    Void = 2,
    Int = 3,
    Short = 4,
    Char = 5,
    Long = 6,
    Byte = 7,
    Float = 8,
    Double = 9,
    Boolean = 10,
    Object = 11,
}

impl Syllable {
    /// Marks the end of a terse signature
    pub(crate) const END: u8 = 1;

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_code(code: u8) -> Option<Syllable> {
        let syllable = match code {
            2 => Syllable::Void,
            3 => Syllable::Int,
            4 => Syllable::Short,
            5 => Syllable::Char,
            6 => Syllable::Long,
            7 => Syllable::Byte,
            8 => Syllable::Float,
            9 => Syllable::Double,
            10 => Syllable::Boolean,
            11 => Syllable::Object,
            _ => return None,
        };
        Some(syllable)
    }

    /// Number of local variable slots a value of this shape occupies
    pub fn width(self) -> u32 {
        match self {
            Syllable::Void => 0,
            Syllable::Long | Syllable::Double => 2,
            _ => 1,
        }
    }

    pub fn is_reference(self) -> bool {
        self == Syllable::Object
    }
}

/// Interned class or array type
///
/// The low 24 bits name the element type (either one of the predefined primitive tokens, or an
/// entry in the class table) and the high 8 bits hold the array depth. Tokens are only
/// meaningful within the `TypeIds` that produced them.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ClassTypeId(u32);

impl ClassTypeId {
    /// Sentinel returned when there is no such class
    pub const ERROR: ClassTypeId = ClassTypeId(NO_ENTRY);

    pub const VOID: ClassTypeId = ClassTypeId(Syllable::Void as u32);
    pub const INT: ClassTypeId = ClassTypeId(Syllable::Int as u32);
    pub const SHORT: ClassTypeId = ClassTypeId(Syllable::Short as u32);
    pub const CHAR: ClassTypeId = ClassTypeId(Syllable::Char as u32);
    pub const LONG: ClassTypeId = ClassTypeId(Syllable::Long as u32);
    pub const BYTE: ClassTypeId = ClassTypeId(Syllable::Byte as u32);
    pub const FLOAT: ClassTypeId = ClassTypeId(Syllable::Float as u32);
    pub const DOUBLE: ClassTypeId = ClassTypeId(Syllable::Double as u32);
    pub const BOOLEAN: ClassTypeId = ClassTypeId(Syllable::Boolean as u32);

    pub(crate) const fn from_token(token: u32) -> ClassTypeId {
        ClassTypeId(token)
    }

    pub(crate) const fn from_parts(depth: u32, base: u32) -> ClassTypeId {
        ClassTypeId(depth << ARRAY_SHIFT | base)
    }

    /// Raw token, for hashing or switching only
    ///
    /// Never compare this against tokens of another kind.
    pub const fn token(self) -> u32 {
        self.0
    }

    pub const fn is_error(self) -> bool {
        self.0 == NO_ENTRY
    }

    /// Number of array dimensions (zero for non-array types)
    pub const fn array_depth(self) -> u32 {
        self.0 >> ARRAY_SHIFT
    }

    pub const fn is_array(self) -> bool {
        !self.is_error() && self.array_depth() != 0
    }

    /// Element type of an array, or the type itself if it is not an array
    pub const fn base_type(self) -> ClassTypeId {
        ClassTypeId(self.0 & BASE_TYPE_MASK)
    }

    /// Whether this is one of the predefined primitive types (including `void`)
    pub fn is_primitive(self) -> bool {
        (Self::VOID.0..=Self::BOOLEAN.0).contains(&self.0)
    }

    /// Whether values of this type are heap references
    pub fn is_reference(self) -> bool {
        !self.is_error() && (self.is_array() || self.0 >= FIRST_CLASS_INDEX)
    }

    /// `long` and `double` occupy two slots
    pub fn is_double_word(self) -> bool {
        self == Self::LONG || self == Self::DOUBLE
    }

    /// Shape of this type in a terse signature
    pub fn syllable(self) -> Syllable {
        if self.is_primitive() {
            Syllable::from_code(self.0 as u8).unwrap_or(Syllable::Object)
        } else {
            Syllable::Object
        }
    }

    /// Index of the class table entry backing this type (if any)
    pub(crate) fn class_index(self) -> Option<u32> {
        let base = self.0 & BASE_TYPE_MASK;
        if self.is_error() || base < FIRST_CLASS_INDEX {
            None
        } else {
            Some(base)
        }
    }
}

/// Interned member (field or method) name
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct NameTypeId(u32);

impl NameTypeId {
    pub const ERROR: NameTypeId = NameTypeId(NO_ENTRY);

    pub(crate) const fn from_token(token: u32) -> NameTypeId {
        NameTypeId(token)
    }

    /// Raw token, for hashing or switching only
    pub const fn token(self) -> u32 {
        self.0
    }

    pub const fn is_error(self) -> bool {
        self.0 == NO_ENTRY
    }
}

/// Interned method signature
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct MethodSigId(u32);

impl MethodSigId {
    pub const ERROR: MethodSigId = MethodSigId(NO_ENTRY);

    pub(crate) const fn from_token(token: u32) -> MethodSigId {
        MethodSigId(token)
    }

    /// Raw token, for hashing or switching only
    pub const fn token(self) -> u32 {
        self.0
    }

    pub const fn is_error(self) -> bool {
        self.0 == NO_ENTRY
    }
}

mod sealed {
    pub trait Sealed {
        fn from_raw(token: u32) -> Self;
    }
}

pub(crate) use sealed::Sealed;

/// Kinds of tokens that can be the type half of a member
pub trait MemberType: Sealed + Copy + Eq + Hash {
    /// Raw token
    fn token(self) -> u32;

    /// Whether the members are methods (as opposed to fields)
    const IS_METHOD: bool;
}

impl Sealed for ClassTypeId {
    fn from_raw(token: u32) -> ClassTypeId {
        ClassTypeId(token)
    }
}

impl MemberType for ClassTypeId {
    fn token(self) -> u32 {
        self.0
    }
    const IS_METHOD: bool = false;
}

impl Sealed for MethodSigId {
    fn from_raw(token: u32) -> MethodSigId {
        MethodSigId(token)
    }
}

impl MemberType for MethodSigId {
    fn token(self) -> u32 {
        self.0
    }
    const IS_METHOD: bool = true;
}

/// Field or method, as a (name, type) pair
///
/// Both halves are owned references: building a member interns (or clones) both, and disposing
/// of it disposes of both.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct MemberTypeId<T> {
    name: NameTypeId,
    ty: T,
}

/// Field name and type
pub type FieldTypeId = MemberTypeId<ClassTypeId>;

/// Method name and signature
pub type MethodTypeId = MemberTypeId<MethodSigId>;

impl<T: MemberType> MemberTypeId<T> {
    pub(crate) fn new(name: NameTypeId, ty: T) -> MemberTypeId<T> {
        MemberTypeId { name, ty }
    }

    pub fn name(&self) -> NameTypeId {
        self.name
    }

    pub fn ty(&self) -> T {
        self.ty
    }

    /// Same field or method (both halves equal)
    pub fn is_same_member(&self, other: &Self) -> bool {
        self == other
    }

    /// Same name, regardless of type (eg. every constructor is named `<init>`)
    pub fn is_same_member_name(&self, other: &Self) -> bool {
        self.name == other.name
    }

    /// Same type, regardless of name
    pub fn is_same_member_type(&self, other: &Self) -> bool {
        self.ty == other.ty
    }
}

/// Single word standing for a whole member, for hashing or switching
///
/// Members whose halves are both small are packed into the word directly (tagged with the low
/// bit). Others are interned in the name-and-type table and named by their (even) entry token.
/// Either way, two member tokens of the same kind are equal exactly when the members are.
#[derive(Debug)]
pub struct MemberToken<T> {
    bits: u32,
    kind: PhantomData<fn() -> T>,
}

const PACKED_TAG: u32 = 1;

impl<T> MemberToken<T> {
    pub(crate) fn from_bits(bits: u32) -> MemberToken<T> {
        MemberToken {
            bits,
            kind: PhantomData,
        }
    }

    pub(crate) fn from_table_index(index: u32) -> MemberToken<T> {
        debug_assert!(index < 1 << 31);
        Self::from_bits(index << 1)
    }

    /// Raw token
    pub fn token(self) -> u32 {
        self.bits
    }

    /// Whether the member is packed into the token (rather than stored in a table)
    pub fn is_packed(self) -> bool {
        self.bits & PACKED_TAG != 0
    }

    pub(crate) fn table_index(self) -> Option<u32> {
        if self.is_packed() {
            None
        } else {
            Some(self.bits >> 1)
        }
    }
}

impl<T> Clone for MemberToken<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for MemberToken<T> {}

impl<T> PartialEq for MemberToken<T> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<T> Eq for MemberToken<T> {}

impl<T> Hash for MemberToken<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits.hash(state)
    }
}

/// Pack a (name, type) pair into one tagged word, if both halves are small enough
///
/// Layout: name in bits 16..32, array depth (at most 3) in bits 14..16, base type (at most
/// `0x1fff`) in bits 1..14, tag in bit 0.
pub(crate) fn pack_member(name: u32, ty: u32) -> Option<u32> {
    let depth = ty >> ARRAY_SHIFT;
    let base = ty & BASE_TYPE_MASK;
    if name <= 0xffff && depth <= 3 && base <= 0x1fff {
        Some(name << 16 | depth << 14 | base << 1 | PACKED_TAG)
    } else {
        None
    }
}

/// Inverse of `pack_member`
pub(crate) fn unpack_member(bits: u32) -> (u32, u32) {
    let name = bits >> 16;
    let ty = ((bits >> 1) & 0x1fff) | ((bits << 10) & 0x0300_0000);
    (name, ty)
}
