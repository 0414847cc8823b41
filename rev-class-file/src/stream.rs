use crate::{error::{self, ClassFileError}, item::{ClassFileItem, ConstantPool}};

/// A cursor over a class file buffer.
///
/// Integer reads are big-endian and named after the class file format's
/// `u1`, `u2`, `u4` and `u8` widths. Every read either advances the cursor
/// by exactly the decoded width or fails with
/// [OutOfBounds](ClassFileError::OutOfBounds) without moving it.
#[derive(Debug, Clone)]
pub struct ClassFileStream<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ClassFileStream<'a> {

    /// Create a new stream positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Read a sequence of `length` `T`s from this stream.
    pub fn read_sequence<T: ClassFileItem>(&mut self, constant_pool: Option<&ConstantPool>, length: usize) -> error::Result<Vec<T>> {
        let mut v = Vec::with_capacity(length.min(self.remaining()));
        for _ in 0..length {
            v.push(T::read_from_stream(self, constant_pool)?);
        }
        Ok(v)
    }

    /// Read an unsigned 8-byte integer from the stream.
    pub fn read_u8(&mut self) -> error::Result<u64> {
        Ok(u64::from_be_bytes(self.read::<8>()?))
    }

    /// Read an unsigned 4-byte integer from the stream.
    pub fn read_u4(&mut self) -> error::Result<u32> {
        Ok(u32::from_be_bytes(self.read::<4>()?))
    }

    /// Read an unsigned 2-byte integer from the stream.
    pub fn read_u2(&mut self) -> error::Result<u16> {
        Ok(u16::from_be_bytes(self.read::<2>()?))
    }

    /// Read an unsigned byte from the stream.
    pub fn read_u1(&mut self) -> error::Result<u8> {
        Ok(self.read::<1>()?[0])
    }

    /// Read an IEEE-754 single precision float.
    ///
    /// The raw bits are reinterpreted, so signed zeroes, subnormals,
    /// infinities and NaN payloads come through unchanged.
    pub fn read_f32(&mut self) -> error::Result<f32> {
        Ok(f32::from_bits(self.read_u4()?))
    }

    /// Read an IEEE-754 double precision float.
    pub fn read_f64(&mut self) -> error::Result<f64> {
        Ok(f64::from_bits(self.read_u8()?))
    }

    /// Utility method to read `S` bytes from the stream.
    pub fn read<const S: usize>(&mut self) -> error::Result<[u8; S]> {
        let mut w = [0; S];
        w.copy_from_slice(self.read_bytes(S)?);
        Ok(w)
    }

    /// Read `l` bytes from the stream as a borrowed slice.
    pub fn read_bytes(&mut self, l: usize) -> error::Result<&'a [u8]> {
        let end = self.position.checked_add(l).filter(|end| *end <= self.data.len());
        let end = end.ok_or(ClassFileError::OutOfBounds {
            offset: self.position,
            wanted: l,
            available: self.remaining(),
        })?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Utility method to read `l` bytes from the stream into an owned buffer.
    pub fn read_dynamic(&mut self, l: usize) -> error::Result<Vec<u8>> {
        Ok(self.read_bytes(l)?.to_vec())
    }

    /// Move the cursor to an absolute position.
    pub fn seek(&mut self, position: usize) -> error::Result<()> {
        if position > self.data.len() {
            return Err(ClassFileError::OutOfBounds {
                offset: position,
                wanted: 0,
                available: 0,
            });
        }
        self.position = position;
        Ok(())
    }

    /// The current cursor position.
    pub fn tell(&self) -> usize {
        self.position
    }

    /// Number of bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn at_end(&self) -> bool {
        self.position >= self.data.len()
    }

}
impl ClassFileItem for u8 {
    fn read_from_stream(s: &mut ClassFileStream, _cp: Option<&ConstantPool>) -> error::Result<Self> {
        s.read_u1()
    }
}

impl ClassFileItem for u16 {
    fn read_from_stream(s: &mut ClassFileStream, _cp: Option<&ConstantPool>) -> error::Result<Self> {
        s.read_u2()
    }
}

impl ClassFileItem for i16 {
    fn read_from_stream(s: &mut ClassFileStream, _cp: Option<&ConstantPool>) -> error::Result<Self> {
        Ok(s.read_u2()? as i16)
    }
}

impl ClassFileItem for u32 {
    fn read_from_stream(s: &mut ClassFileStream, _cp: Option<&ConstantPool>) -> error::Result<Self> {
        s.read_u4()
    }
}

#[cfg(test)]
mod tests {
    use super::ClassFileStream;
    use crate::error::ClassFileError;

    #[test]
    fn reads_big_endian_widths() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f];
        let mut s = ClassFileStream::new(&data);
        assert_eq!(s.read_u1().unwrap(), 0x01);
        assert_eq!(s.read_u2().unwrap(), 0x0203);
        assert_eq!(s.read_u4().unwrap(), 0x04050607);
        assert_eq!(s.read_u8().unwrap(), 0x08090a0b0c0d0e0f);
        assert_eq!(s.tell(), 15);
        assert!(s.at_end());
    }

    #[test]
    fn out_of_bounds_does_not_move() {
        let data = [0xca, 0xfe, 0xba];
        let mut s = ClassFileStream::new(&data);
        s.read_u1().unwrap();
        assert_eq!(
            s.read_u4(),
            Err(ClassFileError::OutOfBounds { offset: 1, wanted: 4, available: 2 })
        );
        assert_eq!(s.tell(), 1);
        assert_eq!(s.read_u2().unwrap(), 0xfeba);
    }

    #[test]
    fn float_special_values() {
        let data = [
            0x80, 0x00, 0x00, 0x00, // -0.0
            0x00, 0x00, 0x00, 0x01, // smallest subnormal
            0x7f, 0x80, 0x00, 0x00, // +inf
            0xff, 0x80, 0x00, 0x00, // -inf
            0x7f, 0xc0, 0x00, 0x00, // NaN
            0x3f, 0xc0, 0x00, 0x00, // 1.5
        ];
        let mut s = ClassFileStream::new(&data);
        let neg_zero = s.read_f32().unwrap();
        assert_eq!(neg_zero, 0.0);
        assert!(neg_zero.is_sign_negative());
        let sub = s.read_f32().unwrap();
        assert!(sub.is_subnormal());
        assert_eq!(sub, f32::from_bits(1));
        assert_eq!(s.read_f32().unwrap(), f32::INFINITY);
        assert_eq!(s.read_f32().unwrap(), f32::NEG_INFINITY);
        assert!(s.read_f32().unwrap().is_nan());
        assert_eq!(s.read_f32().unwrap(), 1.5);
    }

    #[test]
    fn double_values() {
        let data = [
            0x40, 0x09, 0x21, 0xfb, 0x54, 0x44, 0x2d, 0x18, // pi
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, // subnormal
        ];
        let mut s = ClassFileStream::new(&data);
        assert_eq!(s.read_f64().unwrap(), std::f64::consts::PI);
        assert!(s.read_f64().unwrap().is_subnormal());
    }

    #[test]
    fn seek_and_slices() {
        let data = *b"hello world";
        let mut s = ClassFileStream::new(&data);
        s.seek(6).unwrap();
        assert_eq!(s.read_bytes(5).unwrap(), b"world");
        assert!(s.seek(12).is_err());
        s.seek(0).unwrap();
        assert_eq!(s.read::<5>().unwrap(), *b"hello");
    }
}
