use crate::{error, stream::ClassFileStream};

use super::{
    attribute_info::{AttributesCollection, CodeAttribute},
    ClassFileItem, ConstantPool,
};

/// Method info.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub access_flags: MethodAccessFlags,
    /// Index of a Utf8 entry holding the method name, `<init>` or `<clinit>`
    /// for initialization methods.
    pub name_index: u16,
    /// Index of a Utf8 entry holding a method descriptor.
    pub descriptor_index: u16,
    pub attributes: AttributesCollection,
}

impl MethodInfo {
    pub fn name<'a>(&self, cp: &'a ConstantPool) -> error::Result<&'a str> {
        cp.utf8(self.name_index)
    }

    pub fn descriptor<'a>(&self, cp: &'a ConstantPool) -> error::Result<&'a str> {
        cp.utf8(self.descriptor_index)
    }

    /// The method body. Abstract and native methods have none.
    pub fn code(&self) -> Option<&CodeAttribute> {
        self.attributes.code()
    }
}

impl ClassFileItem for MethodInfo {
    fn read_from_stream(s: &mut ClassFileStream, cp: Option<&ConstantPool>) -> error::Result<Self> {
        Ok(Self {
            access_flags: MethodAccessFlags::from_bits_truncate(s.read_u2()?),
            name_index: s.read_u2()?,
            descriptor_index: s.read_u2()?,
            attributes: AttributesCollection::read_from_stream(s, cp)?,
        })
    }
}

bitflags::bitflags! {
    pub struct MethodAccessFlags: u16 {
        /// Declared public; may be accessed from outside its package.
        const ACC_PUBLIC = 0x0001;
        /// Declared private; accessible only within the defining class.
        const ACC_PRIVATE = 0x0002;
        /// Declared protected; may be accessed within subclasses.
        const ACC_PROTECTED = 0x0004;
        /// Declared static.
        const ACC_STATIC = 0x0008;
        /// Declared final; must not be overridden.
        const ACC_FINAL = 0x0010;
        /// Declared synchronized; invocation is wrapped by a monitor use.
        const ACC_SYNCHRONIZED = 0x0020;
        /// A bridge method, generated by the compiler.
        const ACC_BRIDGE = 0x0040;
        /// Declared with variable number of arguments.
        const ACC_VARARGS = 0x0080;
        /// Declared native; implemented in a language other than Java.
        const ACC_NATIVE = 0x0100;
        /// Declared abstract; no implementation is provided.
        const ACC_ABSTRACT = 0x0400;
        /// Declared strictfp; floating-point mode is FP-strict.
        const ACC_STRICT = 0x0800;
        /// Declared synthetic; not present in the source code.
        const ACC_SYNTHETIC = 0x1000;
    }
}

impl MethodAccessFlags {
    /// Source keywords in declaration order. Varargs, native and synthetic
    /// have no keyword in this position and are left out.
    pub fn keywords(self) -> Vec<&'static str> {
        [
            (Self::ACC_PUBLIC, "public"),
            (Self::ACC_PRIVATE, "private"),
            (Self::ACC_PROTECTED, "protected"),
            (Self::ACC_STATIC, "static"),
            (Self::ACC_FINAL, "final"),
            (Self::ACC_SYNCHRONIZED, "synchronized"),
            (Self::ACC_BRIDGE, "bridge"),
            (Self::ACC_ABSTRACT, "abstract"),
            (Self::ACC_STRICT, "strict"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, keyword)| keyword)
        .collect()
    }
}
