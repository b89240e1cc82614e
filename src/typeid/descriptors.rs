use super::{ClassTypeId, Error, Syllable, MAX_ARRAY_DEPTH};

/// Cursor over the bytes of a descriptor
///
/// Descriptors are modified UTF-8, but every delimiter is ASCII, so class names can be sliced
/// out without decoding anything.
pub struct DescriptorSource<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> DescriptorSource<'a> {
    pub fn new(bytes: &'a [u8]) -> DescriptorSource<'a> {
        DescriptorSource { bytes, position: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.position).copied()
    }

    fn next(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.position += 1;
        Some(b)
    }

    fn next_if_eq(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    /// Take bytes up to (and consuming, but not including) the terminator
    fn take_until(&mut self, terminator: u8) -> Option<&'a [u8]> {
        let rest = &self.bytes[self.position..];
        let len = rest.iter().position(|&b| b == terminator)?;
        self.position += len + 1;
        Some(&rest[..len])
    }
}

fn malformed(msg: impl Into<String>) -> Error {
    Error::MalformedSignature(msg.into())
}

pub trait ParseDescriptor<'a>: Sized {
    /// Parse a descriptor which must span all of the input
    fn parse(source: &'a [u8]) -> Result<Self, Error> {
        let mut source = DescriptorSource::new(source);
        let ret = Self::parse_from(&mut source)?;
        match source.next() {
            None => Ok(ret),
            Some(c) => Err(malformed(format!(
                "Unexpected leftover input '{}'",
                char::from(c)
            ))),
        }
    }

    /// Read the descriptor from the front of the source
    fn parse_from(source: &mut DescriptorSource<'a>) -> Result<Self, Error>;
}

/// Primitive value types
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl BaseType {
    fn from_descriptor_char(c: u8) -> Option<BaseType> {
        let typ = match c {
            b'B' => BaseType::Byte,
            b'C' => BaseType::Char,
            b'D' => BaseType::Double,
            b'F' => BaseType::Float,
            b'I' => BaseType::Int,
            b'J' => BaseType::Long,
            b'S' => BaseType::Short,
            b'Z' => BaseType::Boolean,
            _ => return None,
        };
        Some(typ)
    }

    pub fn descriptor_char(self) -> u8 {
        match self {
            BaseType::Byte => b'B',
            BaseType::Char => b'C',
            BaseType::Double => b'D',
            BaseType::Float => b'F',
            BaseType::Int => b'I',
            BaseType::Long => b'J',
            BaseType::Short => b'S',
            BaseType::Boolean => b'Z',
        }
    }

    /// Predefined class token of the primitive type
    pub fn class_id(self) -> ClassTypeId {
        match self {
            BaseType::Byte => ClassTypeId::BYTE,
            BaseType::Char => ClassTypeId::CHAR,
            BaseType::Double => ClassTypeId::DOUBLE,
            BaseType::Float => ClassTypeId::FLOAT,
            BaseType::Int => ClassTypeId::INT,
            BaseType::Long => ClassTypeId::LONG,
            BaseType::Short => ClassTypeId::SHORT,
            BaseType::Boolean => ClassTypeId::BOOLEAN,
        }
    }

    pub fn is_floating_point(self) -> bool {
        matches!(self, BaseType::Float | BaseType::Double)
    }
}

/// Innermost type of a field type
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ElementType<'a> {
    Base(BaseType),

    /// Binary name of a class (eg. `java/lang/Object`)
    Object(&'a [u8]),
}

/// Type of a field, local, parameter, or return value
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct FieldDescriptor<'a> {
    /// Array dimensions (zero if the type is not an array)
    pub dimensions: u32,
    pub element: ElementType<'a>,
}

impl<'a> FieldDescriptor<'a> {
    pub fn object(name: &'a [u8]) -> FieldDescriptor<'a> {
        FieldDescriptor {
            dimensions: 0,
            element: ElementType::Object(name),
        }
    }

    /// Shape of the type in a terse signature
    pub fn syllable(&self) -> Syllable {
        match self.element {
            ElementType::Base(base) if self.dimensions == 0 => base.class_id().syllable(),
            _ => Syllable::Object,
        }
    }

    /// Number of local variable slots the type occupies
    pub fn width(&self) -> u32 {
        self.syllable().width()
    }

    /// Whether the type is `float` or `double` (arrays thereof do not count)
    pub fn is_floating_point(&self) -> bool {
        match self.element {
            ElementType::Base(base) => self.dimensions == 0 && base.is_floating_point(),
            ElementType::Object(_) => false,
        }
    }

    /// Class name of the element type, if it is not primitive
    pub fn element_class(&self) -> Option<&'a [u8]> {
        match self.element {
            ElementType::Object(name) => Some(name),
            ElementType::Base(_) => None,
        }
    }
}

impl<'a> ParseDescriptor<'a> for FieldDescriptor<'a> {
    fn parse_from(source: &mut DescriptorSource<'a>) -> Result<Self, Error> {
        let mut dimensions: u32 = 0;
        while source.next_if_eq(b'[') {
            dimensions += 1;
            if dimensions > MAX_ARRAY_DEPTH {
                return Err(Error::CapacityExceeded("array type has more than 255 dimensions"));
            }
        }
        let element = match source.next() {
            Some(b'L') => match source.take_until(b';') {
                Some(name) if !name.is_empty() => ElementType::Object(name),
                Some(_) => return Err(malformed("Empty class name in descriptor")),
                None => return Err(malformed("Missing terminator for class name")),
            },
            Some(c) => match BaseType::from_descriptor_char(c) {
                Some(base) => ElementType::Base(base),
                None => {
                    let msg = format!("Invalid field type character '{}'", char::from(c));
                    return Err(malformed(msg));
                }
            },
            None => return Err(malformed("Missing field type")),
        };
        Ok(FieldDescriptor {
            dimensions,
            element,
        })
    }
}

/// Parameter and return types of a method
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct MethodDescriptor<'a> {
    pub parameters: Vec<FieldDescriptor<'a>>,

    /// Return type (`None` for `void`)
    pub return_type: Option<FieldDescriptor<'a>>,
}

impl<'a> MethodDescriptor<'a> {
    /// Number of local variable slots taken up by the parameters (excluding any receiver)
    pub fn parameter_length(&self) -> u32 {
        self.parameters.iter().map(FieldDescriptor::width).sum()
    }

    /// Terse signature: return shape followed by each parameter's shape
    pub fn syllables(&self) -> impl Iterator<Item = Syllable> + '_ {
        let ret = match &self.return_type {
            None => Syllable::Void,
            Some(ret) => ret.syllable(),
        };
        std::iter::once(ret).chain(self.parameters.iter().map(FieldDescriptor::syllable))
    }

    /// Class names referred to by object syllables, in syllable order
    pub fn details(&self) -> impl Iterator<Item = &FieldDescriptor<'a>> + '_ {
        self.return_type
            .iter()
            .chain(self.parameters.iter())
            .filter(|desc| desc.syllable() == Syllable::Object)
    }

    pub fn mentions_floating_point(&self) -> bool {
        self.return_type
            .iter()
            .chain(self.parameters.iter())
            .any(FieldDescriptor::is_floating_point)
    }
}

impl<'a> ParseDescriptor<'a> for MethodDescriptor<'a> {
    fn parse_from(source: &mut DescriptorSource<'a>) -> Result<Self, Error> {
        if !source.next_if_eq(b'(') {
            return Err(malformed("Expected method descriptor to start with `(`"));
        }
        let mut parameters = vec![];
        while !source.next_if_eq(b')') {
            if source.peek().is_none() {
                return Err(malformed("Missing `)` in method descriptor"));
            }
            parameters.push(FieldDescriptor::parse_from(source)?);
        }
        let return_type = if source.next_if_eq(b'V') {
            None
        } else {
            Some(FieldDescriptor::parse_from(source)?)
        };
        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }
}

/// Interpret a class name
///
/// Array classes are named by their descriptor (eg. `[[I`, `[Ljava/lang/String;`), every other
/// class by its binary name (eg. `java/lang/String`).
pub fn parse_class_name(name: &[u8]) -> Result<FieldDescriptor<'_>, Error> {
    match name.first() {
        None => Err(malformed("Empty class name")),
        Some(b'[') => FieldDescriptor::parse(name),
        Some(_) => Ok(FieldDescriptor::object(name)),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn field_descriptors() {
        let desc = FieldDescriptor::parse(b"[[Ljava/lang/String;").unwrap();
        assert_eq!(desc.dimensions, 2);
        assert_eq!(desc.element, ElementType::Object(b"java/lang/String"));
        assert_eq!(desc.syllable(), Syllable::Object);

        let desc = FieldDescriptor::parse(b"J").unwrap();
        assert_eq!(desc.element, ElementType::Base(BaseType::Long));
        assert_eq!(desc.width(), 2);

        assert!(FieldDescriptor::parse(b"V").is_err());
        assert!(FieldDescriptor::parse(b"Ljava/lang/String").is_err());
        assert!(FieldDescriptor::parse(b"L;").is_err());
        assert!(FieldDescriptor::parse(b"II").is_err());
    }

    #[test]
    fn too_many_dimensions() {
        let mut deep = vec![b'['; 256];
        deep.push(b'I');
        assert!(matches!(
            FieldDescriptor::parse(&deep),
            Err(Error::CapacityExceeded(_))
        ));
        assert!(FieldDescriptor::parse(&deep[1..]).is_ok());
    }

    #[test]
    fn method_descriptors() {
        let desc = MethodDescriptor::parse(b"(IJ[DLjava/lang/Object;)Ljava/lang/String;").unwrap();
        assert_eq!(desc.parameters.len(), 4);
        assert_eq!(desc.parameter_length(), 5);
        assert_eq!(
            desc.syllables().collect::<Vec<_>>(),
            vec![
                Syllable::Object,
                Syllable::Int,
                Syllable::Long,
                Syllable::Object,
                Syllable::Object
            ]
        );
        let details: Vec<_> = desc.details().map(|d| d.element).collect();
        assert_eq!(
            details,
            vec![
                ElementType::Object(b"java/lang/String"),
                ElementType::Base(BaseType::Double),
                ElementType::Object(b"java/lang/Object"),
            ]
        );
        assert!(!desc.mentions_floating_point());

        let desc = MethodDescriptor::parse(b"()V").unwrap();
        assert_eq!(desc.return_type, None);
        assert_eq!(desc.parameter_length(), 0);

        assert!(MethodDescriptor::parse(b"(I").is_err());
        assert!(MethodDescriptor::parse(b"I)V").is_err());
        assert!(MethodDescriptor::parse(b"(V)V").is_err());
        assert!(MethodDescriptor::parse(b"(F)V").unwrap().mentions_floating_point());
    }

    #[test]
    fn class_names() {
        assert_eq!(
            parse_class_name(b"java/lang/Object").unwrap(),
            FieldDescriptor::object(b"java/lang/Object")
        );
        let array = parse_class_name(b"[I").unwrap();
        assert_eq!(array.dimensions, 1);
        assert_eq!(array.element, ElementType::Base(BaseType::Int));
        assert!(parse_class_name(b"").is_err());
    }
}
