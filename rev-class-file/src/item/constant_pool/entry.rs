use crate::{
    error::{self, ClassFileError},
    item::ClassFileItem,
    stream::ClassFileStream,
};

use super::ConstantPool;

/// The tag values for each type of constant pool entry.
#[allow(non_upper_case_globals)]
pub mod tags {
    pub const CONSTANT_Utf8: u8 = 1;
    pub const CONSTANT_Integer: u8 = 3;
    pub const CONSTANT_Float: u8 = 4;
    pub const CONSTANT_Long: u8 = 5;
    pub const CONSTANT_Double: u8 = 6;
    pub const CONSTANT_Class: u8 = 7;
    pub const CONSTANT_String: u8 = 8;
    pub const CONSTANT_Fieldref: u8 = 9;
    pub const CONSTANT_Methodref: u8 = 10;
    pub const CONSTANT_InterfaceMethodref: u8 = 11;
    pub const CONSTANT_NameAndType: u8 = 12;
    pub const CONSTANT_MethodHandle: u8 = 15;
    pub const CONSTANT_MethodType: u8 = 16;
    pub const CONSTANT_Dynamic: u8 = 17;
    pub const CONSTANT_InvokeDynamic: u8 = 18;
    pub const CONSTANT_Module: u8 = 19;
    pub const CONSTANT_Package: u8 = 20;
}

/// A constant pool entry.
///
/// The `name`, `descriptor` and `string` fields are empty after decoding and
/// filled in by [ConstantPool]'s resolution pass.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantPoolEntry {
    /// The CONSTANT_Utf8_info structure is used to represent constant string values.
    Utf8 { data: String },
    /// A 4-byte numeric int constant.
    Integer { value: i32 },
    /// A 4-byte IEEE 754 single format constant.
    Float { value: f32 },
    /// An 8-byte numeric long constant. Takes two pool slots.
    Long { value: i64 },
    /// An 8-byte IEEE 754 double format constant. Takes two pool slots.
    Double { value: f64 },
    /// A class or an interface.
    Class { name_index: u16, name: String },
    /// A constant object of the type String.
    String { string_index: u16, string: String },
    Fieldref {
        class_index: u16,
        name_and_type_index: u16,
    },
    Methodref {
        class_index: u16,
        name_and_type_index: u16,
    },
    InterfaceMethodref {
        class_index: u16,
        name_and_type_index: u16,
    },
    /// A field or method, without indicating which class or interface type it belongs to.
    NameAndType {
        name_index: u16,
        descriptor_index: u16,
        name: String,
        descriptor: String,
    },
    MethodHandle {
        reference_kind: u8,
        reference_index: u16,
    },
    MethodType { descriptor_index: u16, descriptor: String },
    /// A dynamically computed constant (`Dynamic`) or call site (`InvokeDynamic`).
    Dynamic {
        invoke: bool,
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    Module { name_index: u16, name: String },
    Package { name_index: u16, name: String },
    /// The unusable slot following a Long or Double.
    Reserved,
}

impl ConstantPoolEntry {
    /// Long and Double take up two slots in the pool.
    pub fn is_wide(&self) -> bool {
        matches!(self, Self::Long { .. } | Self::Double { .. })
    }

    /// Read one entry. `index` is the pool index the entry will occupy and
    /// is only used for error reporting.
    pub(super) fn read_indexed(s: &mut ClassFileStream, index: u16) -> error::Result<Self> {
        match s.read_u1()? {
            tags::CONSTANT_Utf8 => {
                let length = s.read_u2()?;
                Ok(Self::Utf8 {
                    data: decode_modified_utf8(s.read_bytes(length as usize)?),
                })
            }
            tags::CONSTANT_Integer => Ok(Self::Integer {
                value: s.read_u4()? as i32,
            }),
            tags::CONSTANT_Float => Ok(Self::Float { value: s.read_f32()? }),
            tags::CONSTANT_Long => Ok(Self::Long {
                value: s.read_u8()? as i64,
            }),
            tags::CONSTANT_Double => Ok(Self::Double { value: s.read_f64()? }),
            tags::CONSTANT_Class => Ok(Self::Class {
                name_index: s.read_u2()?,
                name: String::new(),
            }),
            tags::CONSTANT_String => Ok(Self::String {
                string_index: s.read_u2()?,
                string: String::new(),
            }),
            tags::CONSTANT_Fieldref => Ok(Self::Fieldref {
                class_index: s.read_u2()?,
                name_and_type_index: s.read_u2()?,
            }),
            tags::CONSTANT_Methodref => Ok(Self::Methodref {
                class_index: s.read_u2()?,
                name_and_type_index: s.read_u2()?,
            }),
            tags::CONSTANT_InterfaceMethodref => Ok(Self::InterfaceMethodref {
                class_index: s.read_u2()?,
                name_and_type_index: s.read_u2()?,
            }),
            tags::CONSTANT_NameAndType => Ok(Self::NameAndType {
                name_index: s.read_u2()?,
                descriptor_index: s.read_u2()?,
                name: String::new(),
                descriptor: String::new(),
            }),
            tags::CONSTANT_MethodHandle => Ok(Self::MethodHandle {
                reference_kind: s.read_u1()?,
                reference_index: s.read_u2()?,
            }),
            tags::CONSTANT_MethodType => Ok(Self::MethodType {
                descriptor_index: s.read_u2()?,
                descriptor: String::new(),
            }),
            tag @ (tags::CONSTANT_Dynamic | tags::CONSTANT_InvokeDynamic) => Ok(Self::Dynamic {
                invoke: tag == tags::CONSTANT_InvokeDynamic,
                bootstrap_method_attr_index: s.read_u2()?,
                name_and_type_index: s.read_u2()?,
            }),
            tags::CONSTANT_Module => Ok(Self::Module {
                name_index: s.read_u2()?,
                name: String::new(),
            }),
            tags::CONSTANT_Package => Ok(Self::Package {
                name_index: s.read_u2()?,
                name: String::new(),
            }),
            tag => Err(ClassFileError::UnknownConstantPoolTag { index, tag }),
        }
    }
}

impl ClassFileItem for ConstantPoolEntry {
    fn read_from_stream(s: &mut ClassFileStream, _cp: Option<&ConstantPool>) -> error::Result<Self> {
        Self::read_indexed(s, 0)
    }
}

/// Creates a string from the class file format's
/// modified UTF-8 encoding.
///
/// NUL is encoded as `C0 80` and supplementary characters as two encoded
/// surrogates. Invalid sequences become U+FFFD.
pub fn decode_modified_utf8(b: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(b) {
        if !s.contains('\u{0}') {
            return s.to_string();
        }
    }

    let mut units: Vec<u16> = Vec::with_capacity(b.len());
    let mut i = 0;
    while i < b.len() {
        let byte = b[i];
        let cont = |n: usize| b.get(i + n).copied().filter(|c| c & 0xc0 == 0x80);
        if byte & 0x80 == 0 {
            units.push(byte as u16);
            i += 1;
        } else if byte & 0xe0 == 0xc0 {
            match cont(1) {
                Some(c1) => {
                    units.push((((byte & 0x1f) as u16) << 6) | (c1 & 0x3f) as u16);
                    i += 2;
                }
                None => {
                    units.push(0xfffd);
                    i += 1;
                }
            }
        } else if byte & 0xf0 == 0xe0 {
            match (cont(1), cont(2)) {
                (Some(c1), Some(c2)) => {
                    units.push(
                        (((byte & 0x0f) as u16) << 12) | (((c1 & 0x3f) as u16) << 6) | (c2 & 0x3f) as u16,
                    );
                    i += 3;
                }
                _ => {
                    units.push(0xfffd);
                    i += 1;
                }
            }
        } else {
            units.push(0xfffd);
            i += 1;
        }
    }
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::decode_modified_utf8;

    #[test]
    fn plain_ascii() {
        assert_eq!(decode_modified_utf8(b"Hello, World!"), "Hello, World!");
    }

    #[test]
    fn encoded_nul() {
        assert_eq!(decode_modified_utf8(&[b'a', 0xc0, 0x80, b'b']), "a\u{0}b");
    }

    #[test]
    fn two_and_three_byte_forms() {
        assert_eq!(decode_modified_utf8("é€".as_bytes()), "é€");
    }

    #[test]
    fn surrogate_pair() {
        // U+1F600 as two three-byte encoded surrogates (D83D DE00).
        let bytes = [0xed, 0xa0, 0xbd, 0xed, 0xb8, 0x80];
        assert_eq!(decode_modified_utf8(&bytes), "\u{1F600}");
    }

    #[test]
    fn lossy_fallback() {
        assert_eq!(decode_modified_utf8(&[b'x', 0xff, b'y']), "x\u{fffd}y");
        assert_eq!(decode_modified_utf8(&[0xe2, 0x82]), "\u{fffd}\u{fffd}");
    }
}
