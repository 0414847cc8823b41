use crate::{error, stream::ClassFileStream};

use super::{attribute_info::AttributesCollection, ClassFileItem, ConstantPool};

/// Field info.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    /// The value of the access_flags item is a mask of
    /// flags used to denote access permission
    /// to and properties of this field.
    pub access_flags: FieldAccessFlags,
    /// Index of a Utf8 entry holding the field's unqualified name.
    pub name_index: u16,
    /// Index of a Utf8 entry holding a field descriptor.
    pub descriptor_index: u16,
    /// Each value of the attributes table must be an attribute_info structure (§4.7).
    /// A field can have any number of optional attributes associated with it.
    pub attributes: AttributesCollection,
}

impl FieldInfo {
    pub fn name<'a>(&self, cp: &'a ConstantPool) -> error::Result<&'a str> {
        cp.utf8(self.name_index)
    }

    pub fn descriptor<'a>(&self, cp: &'a ConstantPool) -> error::Result<&'a str> {
        cp.utf8(self.descriptor_index)
    }
}

impl ClassFileItem for FieldInfo {
    fn read_from_stream(s: &mut ClassFileStream, cp: Option<&ConstantPool>) -> error::Result<Self> {
        // Unknown bits are reserved for future use and ignored.
        let access_flags = FieldAccessFlags::from_bits_truncate(s.read_u2()?);

        let name_index = s.read_u2()?;

        let descriptor_index = s.read_u2()?;

        Ok(Self {
            access_flags,
            name_index,
            descriptor_index,
            attributes: AttributesCollection::read_from_stream(s, cp)?,
        })
    }
}

bitflags::bitflags! {
    pub struct FieldAccessFlags: u16 {
        /// Declared public; may be accessed from outside its package.
        const ACC_PUBLIC = 0x0001;
        /// Declared private; usable only within the defining class.
        const ACC_PRIVATE = 0x0002;
        /// Declared protected; may be accessed within subclasses.
        const ACC_PROTECTED = 0x0004;
        /// Declared static.
        const ACC_STATIC = 0x0008;
        /// Declared final; never directly assigned to after object construction (JLS §17.5).
        const ACC_FINAL = 0x0010;
        /// Declared volatile; cannot be cached.
        const ACC_VOLATILE = 0x0040;
        /// Declared transient; not written or read by a persistent object manager.
        const ACC_TRANSIENT = 0x0080;
        /// Declared synthetic; not present in the source code.
        const ACC_SYNTHETIC = 0x1000;
        /// Declared as an element of an enum.
        const ACC_ENUM = 0x4000;
    }
}

impl FieldAccessFlags {
    /// Source keywords in declaration order.
    pub fn keywords(self) -> Vec<&'static str> {
        [
            (Self::ACC_PUBLIC, "public"),
            (Self::ACC_PRIVATE, "private"),
            (Self::ACC_PROTECTED, "protected"),
            (Self::ACC_FINAL, "final"),
            (Self::ACC_STATIC, "static"),
            (Self::ACC_VOLATILE, "volatile"),
            (Self::ACC_TRANSIENT, "transient"),
            (Self::ACC_SYNTHETIC, "synthetic"),
            (Self::ACC_ENUM, "enum"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, keyword)| keyword)
        .collect()
    }
}
