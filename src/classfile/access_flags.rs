use bitflags::bitflags;

/// Bits of an `access_flags` item that are kept from the classfile
///
/// Anything above this is reserved for the VM's own bookkeeping and is dropped on load.
pub const WRITTEN_FLAGS: u16 = 0x0fff;

bitflags! {
    /// Access flags on classes
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.1-200-E.1
    pub struct ClassAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
    }
}

bitflags! {
    /// Access flags on methods
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.6-200-A.1
    pub struct MethodAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
    }
}

bitflags! {
    /// Access flags on fields
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.5-200-A.1
    pub struct FieldAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const VOLATILE = 0x0040;
        const TRANSIENT = 0x0080;
    }
}

bitflags! {
    /// Access flags on inner classes
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.6-300-D.1-D.1
    pub struct InnerClassAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
    }
}

impl ClassAccessFlags {
    /// Flags as read from a classfile (unwritten bits are dropped)
    pub fn from_classfile(bits: u16) -> ClassAccessFlags {
        ClassAccessFlags::from_bits_truncate(bits & WRITTEN_FLAGS)
    }
}

impl MethodAccessFlags {
    pub fn from_classfile(bits: u16) -> MethodAccessFlags {
        MethodAccessFlags::from_bits_truncate(bits & WRITTEN_FLAGS)
    }
}

impl FieldAccessFlags {
    pub fn from_classfile(bits: u16) -> FieldAccessFlags {
        FieldAccessFlags::from_bits_truncate(bits & WRITTEN_FLAGS)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unwritten_bits_are_dropped() {
        let flags = MethodAccessFlags::from_classfile(0x9009);
        assert!(flags.contains(MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC));
        assert_eq!(flags.bits(), 0x0009);

        let flags = ClassAccessFlags::from_classfile(0x0421);
        assert!(flags.contains(ClassAccessFlags::ABSTRACT | ClassAccessFlags::SUPER));
    }
}
