use super::Error;
use byteorder::{BigEndian, ReadBytesExt};

const TRUNCATED: Error = Error::MalformedInput("Truncated class file");

/// Bounds-checked cursor over the bytes of a classfile
///
/// Multi-byte items are big-endian. Reading past the end is a `Truncated class file` error, never
/// a panic.
pub struct ClassReader<'a> {
    bytes: &'a [u8],
    rest: &'a [u8],
}

impl<'a> ClassReader<'a> {
    pub fn new(bytes: &'a [u8]) -> ClassReader<'a> {
        ClassReader { bytes, rest: bytes }
    }

    pub fn u1(&mut self) -> Result<u8, Error> {
        self.rest.read_u8().map_err(|_| TRUNCATED)
    }

    pub fn u2(&mut self) -> Result<u16, Error> {
        self.rest.read_u16::<BigEndian>().map_err(|_| TRUNCATED)
    }

    pub fn u4(&mut self) -> Result<u32, Error> {
        self.rest.read_u32::<BigEndian>().map_err(|_| TRUNCATED)
    }

    /// Borrow the next `count` bytes
    pub fn bytes(&mut self, count: usize) -> Result<&'a [u8], Error> {
        if count > self.rest.len() {
            return Err(TRUNCATED);
        }
        let (taken, rest) = self.rest.split_at(count);
        self.rest = rest;
        Ok(taken)
    }

    pub fn skip(&mut self, count: usize) -> Result<(), Error> {
        self.bytes(count).map(|_| ())
    }

    /// Offset of the next byte from the start of the classfile
    pub fn position(&self) -> usize {
        self.bytes.len() - self.rest.len()
    }

    /// Fail with `detail` unless exactly `length` bytes were read since `start`
    pub fn expect_consumed(
        &self,
        start: usize,
        length: u32,
        detail: &'static str,
    ) -> Result<(), Error> {
        if (self.position() - start) as u64 == u64::from(length) {
            Ok(())
        } else {
            Err(Error::MalformedInput(detail))
        }
    }

    /// Go back to the start of the classfile
    pub fn rewind(&mut self) {
        self.rest = self.bytes;
    }

    pub fn is_at_end(&self) -> bool {
        self.rest.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn big_endian_items() {
        let mut reader = ClassReader::new(&[0xca, 0xfe, 0xba, 0xbe, 0x00, 0x2d, 0x07]);
        assert_eq!(reader.u4(), Ok(0xcafe_babe));
        assert_eq!(reader.u2(), Ok(45));
        assert_eq!(reader.position(), 6);
        assert_eq!(reader.u1(), Ok(7));
        assert!(reader.is_at_end());
        assert_eq!(reader.u1(), Err(TRUNCATED));

        reader.rewind();
        assert_eq!(reader.bytes(2), Ok(&[0xca, 0xfe][..]));
        assert_eq!(reader.bytes(6), Err(TRUNCATED));
        assert!(reader.expect_consumed(0, 2, "wrong").is_ok());
        assert_eq!(
            reader.expect_consumed(0, 3, "wrong"),
            Err(Error::MalformedInput("wrong"))
        );
    }
}
