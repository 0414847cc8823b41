use log::{debug, warn};
use rev_class_file::{
    item::{
        attribute_info::AttributesCollection,
        fields::{FieldAccessFlags, FieldInfo},
        file::{ClassAccessFlags, ClassFile},
        ids::{field::FieldType, method::MethodDescriptor},
        methods::{MethodAccessFlags, MethodInfo},
        opcodes::{disassemble, Opcode},
        ConstantPool,
    },
};

use crate::{
    decompile::decompile_method,
    error::{DecompileError, Result},
    guess::guess_field_values,
    naming::{Names, SlotLayout},
    operation::Operation,
};

/// A field of a decompiled class.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
    pub flags: FieldAccessFlags,
    pub attributes: AttributesCollection,
    /// Initial value inferred from the constructor, as a Java literal.
    pub guessed_value: Option<String>,
}

impl Field {
    fn from_info(info: &FieldInfo, pool: &ConstantPool) -> Result<Self> {
        Ok(Self {
            name: info.name(pool)?.to_string(),
            ty: FieldType::parse(info.descriptor(pool)?)?,
            flags: info.access_flags,
            attributes: info.attributes.clone(),
            guessed_value: None,
        })
    }
}

/// A method of a decompiled class.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub descriptor: MethodDescriptor,
    pub flags: MethodAccessFlags,
    pub attributes: AttributesCollection,
    /// Disassembled body. Empty for abstract and native methods, and when
    /// the body could not be disassembled.
    pub opcodes: Vec<Opcode>,
    /// Variable names handed out while decompiling.
    pub names: Names,
    /// Statements of the body, or why they could not be rebuilt.
    pub decompiled: std::result::Result<Vec<Operation>, DecompileError>,
}

impl Method {
    fn from_info(info: &MethodInfo, pool: &ConstantPool) -> Result<Self> {
        let name = info.name(pool)?.to_string();
        let descriptor = MethodDescriptor::parse(info.descriptor(pool)?)?;
        let (opcodes, decompiled) = match info.code() {
            Some(code) => match disassemble(&code.code, pool) {
                Ok(opcodes) => (opcodes, Ok(vec![])),
                Err(e) => {
                    warn!("cannot disassemble {}: {}", name, e);
                    (vec![], Err(e.into()))
                }
            },
            None => (vec![], Ok(vec![])),
        };
        Ok(Self {
            names: Names::for_method(&descriptor),
            name,
            descriptor,
            flags: info.access_flags,
            attributes: info.attributes.clone(),
            opcodes,
            decompiled,
        })
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodAccessFlags::ACC_STATIC)
    }

    /// Instance or class initialization method.
    pub fn is_initializer(&self) -> bool {
        self.name.starts_with('<')
    }

    /// Whether the body had to fall back to its disassembly.
    pub fn is_degraded(&self) -> bool {
        self.decompiled.is_err()
    }

    /// Rebuild the body's statements. Failures stay local to this method.
    fn decompile(&mut self, pool: &ConstantPool, class_name: &str) {
        if self.decompiled.is_err() || self.opcodes.is_empty() {
            return;
        }
        debug!("decompiling {}{}", self.name, self.descriptor_text());
        let layout = SlotLayout::new(&self.descriptor, self.is_static());
        let mut names = Names::for_method(&self.descriptor);
        self.decompiled = decompile_method(pool, class_name, &self.opcodes, &layout, &mut names);
        if let Err(e) = &self.decompiled {
            warn!("decompilation of {} degraded to bytecode: {}", self.name, e);
        }
        self.names = names;
    }

    fn descriptor_text(&self) -> String {
        let params: Vec<String> = self.descriptor.parameters.iter().map(FieldType::to_string).collect();
        format!("({}) {}", params.join(", "), self.descriptor.return_desc)
    }
}

/// A parsed and decompiled class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassModel {
    pub minor_version: u16,
    pub major_version: u16,
    pub flags: ClassAccessFlags,
    /// Internal name of the class.
    pub name: String,
    /// Internal name of the superclass, `None` for `java/lang/Object`.
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub constant_pool: ConstantPool,
}

impl ClassModel {
    /// Build the model of a parsed class file.
    ///
    /// Fields and methods are read first, then every method is decompiled
    /// and finally field values are inferred from the constructor.
    pub fn from_class_file(class: ClassFile) -> Result<Self> {
        let pool = &class.constant_pool;
        let name = class.name()?.to_string();
        let super_name = class
            .super_name()?
            .filter(|s| *s != "java/lang/Object")
            .map(str::to_string);
        let interfaces = class.interfaces.names(pool)?.into_iter().map(str::to_string).collect();

        let mut fields = class
            .fields
            .iter()
            .map(|f| Field::from_info(f, pool))
            .collect::<Result<Vec<_>>>()?;
        let mut methods = class
            .methods
            .iter()
            .map(|m| Method::from_info(m, pool))
            .collect::<Result<Vec<_>>>()?;

        for method in &mut methods {
            method.decompile(pool, &name);
        }
        guess_field_values(&mut fields, &methods, pool);
        debug!(
            "{}: {} fields, {} methods, {} degraded",
            name,
            fields.len(),
            methods.len(),
            methods.iter().filter(|m| m.is_degraded()).count()
        );

        Ok(Self {
            minor_version: class.minor_version,
            major_version: class.major_version,
            flags: class.access_flags,
            name,
            super_name,
            interfaces,
            fields,
            methods,
            constant_pool: class.constant_pool,
        })
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The first method called `name`.
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }
}
