use std::fmt;

use log::debug;

use crate::{
    error::{self, ClassFileError},
    stream::ClassFileStream,
};

use super::{
    attribute_info::AttributesCollection, fields::FieldInfo, interfaces::Interfaces, methods::MethodInfo,
};
pub use super::{constant_pool::ConstantPool, ClassFileItem};

/// The magic number of a class file.
pub const CLASS_MAGIC: u32 = 0xCAFEBABE;

bitflags::bitflags! {
    pub struct ClassAccessFlags: u16 {
        /// Declared public; may be accessed from outside its package.
        const ACC_PUBLIC = 0x0001;
        /// Declared final; no subclasses allowed.
        const ACC_FINAL = 0x0010;
        /// Treat superclass methods specially when invoked by the invokespecial instruction.
        const ACC_SUPER = 0x0020;
        /// Is an interface, not a class.
        const ACC_INTERFACE = 0x0200;
        /// Declared abstract; must not be instantiated.
        const ACC_ABSTRACT = 0x0400;
        /// Declared synthetic; not present in the source code.
        const ACC_SYNTHETIC = 0x1000;
        /// Declared as an annotation type.
        const ACC_ANNOTATION = 0x2000;
        /// Declared as an enum type.
        const ACC_ENUM = 0x4000;
    }
}

impl ClassAccessFlags {
    /// Source keywords in declaration order. `super` has no keyword.
    pub fn keywords(self) -> Vec<&'static str> {
        [
            (Self::ACC_PUBLIC, "public"),
            (Self::ACC_FINAL, "final"),
            (Self::ACC_INTERFACE, "interface"),
            (Self::ACC_ABSTRACT, "abstract"),
            (Self::ACC_SYNTHETIC, "synthetic"),
            (Self::ACC_ANNOTATION, "annotation"),
            (Self::ACC_ENUM, "enum"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, keyword)| keyword)
        .collect()
    }
}

/// The section of the class file being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Magic number and version.
    Header,
    ConstantPool,
    /// Access flags, this class, super class and interfaces.
    Interfaces,
    Fields,
    Methods,
    Attributes,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Header => "header",
            Self::ConstantPool => "constant pool",
            Self::Interfaces => "interfaces",
            Self::Fields => "fields",
            Self::Methods => "methods",
            Self::Attributes => "attributes",
        })
    }
}

/// A class file error tagged with where it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedError {
    pub stage: Stage,
    /// Stream position when the failing read was attempted.
    pub offset: usize,
    pub error: ClassFileError,
}

/// A class file.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    /// The constant pool.
    pub constant_pool: ConstantPool,
    /// This class's access flags.
    pub access_flags: ClassAccessFlags,
    /// Index of the `Class` entry for the class defined by this file.
    pub this_class: u16,
    /// Index of the `Class` entry for the direct superclass, or zero for
    /// `java.lang.Object` itself.
    pub super_class: u16,
    /// Direct superinterfaces, in the order given in source.
    pub interfaces: Interfaces,
    /// Fields declared by this class, not including inherited ones.
    pub fields: Vec<FieldInfo>,
    /// Every method declared by this class, including instance and class
    /// initialization methods.
    pub methods: Vec<MethodInfo>,
    pub attributes: AttributesCollection,
}

impl ClassFile {
    /// Parse a complete class file, reporting which section failed.
    pub fn parse(data: &[u8]) -> Result<Self, StagedError> {
        let mut s = ClassFileStream::new(data);
        Self::read_staged(&mut s)
    }

    fn read_staged(s: &mut ClassFileStream) -> Result<Self, StagedError> {
        macro_rules! stage {
            ($stage:expr, $e:expr) => {
                $e.map_err(|error| StagedError { stage: $stage, offset: s.tell(), error })?
            };
        }

        // check magic number
        let magic = stage!(Stage::Header, s.read_u4());
        if magic != CLASS_MAGIC {
            return Err(StagedError {
                stage: Stage::Header,
                offset: 0,
                error: ClassFileError::BadMagicNumber(magic),
            });
        }

        // read file version
        let minor_version = stage!(Stage::Header, s.read_u2());
        let major_version = stage!(Stage::Header, s.read_u2());
        debug!("class file version {}.{}", major_version, minor_version);

        let constant_pool = stage!(Stage::ConstantPool, ConstantPool::read_from_stream(s, None));
        let cp = Some(&constant_pool);

        // Unknown bits are reserved for future use and ignored.
        let access_flags = ClassAccessFlags::from_bits_truncate(stage!(Stage::Interfaces, s.read_u2()));
        let this_class = stage!(Stage::Interfaces, s.read_u2());
        let super_class = stage!(Stage::Interfaces, s.read_u2());
        let interfaces = stage!(Stage::Interfaces, Interfaces::read_from_stream(s, cp));

        let fields_count = stage!(Stage::Fields, s.read_u2());
        let fields = stage!(Stage::Fields, s.read_sequence(cp, fields_count as usize));

        let methods_count = stage!(Stage::Methods, s.read_u2());
        let methods = stage!(Stage::Methods, s.read_sequence(cp, methods_count as usize));

        let attributes = stage!(Stage::Attributes, AttributesCollection::read_from_stream(s, cp));
        debug!(
            "read {} interfaces, {} fields, {} methods",
            interfaces.0.len(),
            fields_count,
            methods_count
        );

        Ok(Self {
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    /// Internal name of this class.
    pub fn name(&self) -> error::Result<&str> {
        self.constant_pool.class_name(self.this_class)
    }

    /// Internal name of the direct superclass, if there is one.
    pub fn super_name(&self) -> error::Result<Option<&str>> {
        match self.super_class {
            0 => Ok(None),
            index => self.constant_pool.class_name(index).map(Some),
        }
    }
}

impl ClassFileItem for ClassFile {
    fn read_from_stream(s: &mut ClassFileStream, _cp: Option<&ConstantPool>) -> error::Result<Self> {
        Self::read_staged(s).map_err(|e| e.error)
    }
}
