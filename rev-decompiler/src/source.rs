//! The source level view of a class handed to renderers.

use rev_class_file::item::{
    constant_pool::{quote, ConstantPool, ConstantPoolEntry},
    file::ClassAccessFlags,
    ids::{as_class_name, field::{BaseType, FieldType}, simple_name},
    methods::MethodAccessFlags,
    opcodes::Opcode,
};

use crate::{
    decompile::{double_literal, float_literal, long_literal},
    model::{ClassModel, Field, Method},
    operation::Operation,
};

/// What a type declaration declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
    Annotation,
}

impl ClassKind {
    fn of(flags: ClassAccessFlags) -> Self {
        if flags.contains(ClassAccessFlags::ACC_ANNOTATION) {
            Self::Annotation
        } else if flags.contains(ClassAccessFlags::ACC_INTERFACE) {
            Self::Interface
        } else if flags.contains(ClassAccessFlags::ACC_ENUM) {
            Self::Enum
        } else {
            Self::Class
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::Annotation => "@interface",
        }
    }
}

/// A class as it is shown to a reader.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceView {
    /// Dotted package name, `None` for the default package.
    pub package: Option<String>,
    /// Modifier keywords. The kind is kept apart in `kind`.
    pub flags: Vec<&'static str>,
    pub kind: ClassKind,
    /// Simple class name.
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldView>,
    pub methods: Vec<MethodView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView {
    pub flags: Vec<&'static str>,
    pub ty: String,
    pub name: String,
    /// Initial value as a Java literal.
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodView {
    pub flags: Vec<&'static str>,
    /// `None` for constructors.
    pub return_type: Option<String>,
    pub name: String,
    pub params: Vec<ParamView>,
    pub body: MethodBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamView {
    pub ty: String,
    /// Left out in the bytecode view.
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MethodBody {
    /// Abstract and native methods.
    Absent,
    Bytecode(Vec<Opcode>),
    Source(Vec<Operation>),
    /// The body could not be decompiled and is shown as bytecode.
    Degraded { reason: String, bytecode: Vec<Opcode> },
}

impl ClassModel {
    /// Build the view of this class.
    ///
    /// With `prefer_bytecode` method bodies are their disassembly and
    /// parameters stay unnamed. Otherwise bodies are decompiled, and
    /// non-public initializers are left out since their effect is already
    /// shown as field values.
    pub fn render(&self, prefer_bytecode: bool) -> SourceView {
        let kind = ClassKind::of(self.flags);
        let flags = self
            .flags
            .keywords()
            .into_iter()
            .filter(|k| match kind {
                ClassKind::Class => true,
                ClassKind::Enum => *k != "enum",
                ClassKind::Interface | ClassKind::Annotation => !matches!(*k, "interface" | "abstract" | "annotation"),
            })
            .collect();
        let dotted = self.name.replace('/', ".");
        let package = dotted.rsplit_once('.').map(|(package, _)| package.to_string());
        let name = simple_name(&self.name).to_string();

        let methods = self
            .methods
            .iter()
            .filter(|m| {
                prefer_bytecode || !m.is_initializer() || m.flags.contains(MethodAccessFlags::ACC_PUBLIC)
            })
            .map(|m| method_view(m, &name, prefer_bytecode))
            .collect();

        SourceView {
            package,
            flags,
            kind,
            super_name: self.super_name.as_deref().map(as_class_name),
            interfaces: self.interfaces.iter().map(|i| as_class_name(i)).collect(),
            fields: self.fields.iter().map(|f| field_view(f, &self.constant_pool)).collect(),
            methods,
            name,
        }
    }
}

fn field_view(field: &Field, pool: &ConstantPool) -> FieldView {
    let value = match field.attributes.constant_value() {
        Some(index) => constant_value(&field.ty, pool, index),
        None => field.guessed_value.as_ref().map(|v| typed_value(&field.ty, v)),
    };
    FieldView {
        flags: field.flags.keywords(),
        ty: as_class_name(&field.ty.to_string()),
        name: field.name.clone(),
        value,
    }
}

/// The literal of a `ConstantValue` attribute, written for the field's type.
fn constant_value(ty: &FieldType, pool: &ConstantPool, index: u16) -> Option<String> {
    Some(match pool.get(index).ok()? {
        ConstantPoolEntry::Integer { value } => typed_value(ty, &value.to_string()),
        ConstantPoolEntry::Float { value } => float_literal(*value),
        ConstantPoolEntry::Long { value } => long_literal(*value),
        ConstantPoolEntry::Double { value } => double_literal(*value),
        ConstantPoolEntry::String { string, .. } => quote(string),
        _ => return None,
    })
}

/// Rewrite an int literal for the `boolean` and `char` fields it initializes.
fn typed_value(ty: &FieldType, value: &str) -> String {
    let number = value.parse::<i32>();
    match (ty, number) {
        (FieldType::Base(BaseType::Boolean), Ok(0)) => "false".to_string(),
        (FieldType::Base(BaseType::Boolean), Ok(_)) => "true".to_string(),
        (FieldType::Base(BaseType::Char), Ok(n)) => match u32::try_from(n).ok().and_then(char::from_u32) {
            Some(c) => char_literal(c),
            None => value.to_string(),
        },
        _ => value.to_string(),
    }
}

fn char_literal(c: char) -> String {
    match c {
        '\'' => "'\\''".to_string(),
        '\\' => "'\\\\'".to_string(),
        '\n' => "'\\n'".to_string(),
        '\r' => "'\\r'".to_string(),
        '\t' => "'\\t'".to_string(),
        '\0' => "'\\0'".to_string(),
        c if c.is_ascii_graphic() || c == ' ' => format!("'{}'", c),
        c => format!("'\\u{:04x}'", c as u32),
    }
}

fn method_view(method: &Method, class_name: &str, prefer_bytecode: bool) -> MethodView {
    let (name, return_type) = match method.name.as_str() {
        "<init>" => (class_name.to_string(), None),
        _ => (method.name.clone(), Some(as_class_name(&method.descriptor.return_desc.to_string()))),
    };

    let names = method.names.param_names();
    let params = method
        .descriptor
        .parameters
        .iter()
        .enumerate()
        .map(|(k, ty)| ParamView {
            ty: as_class_name(&ty.to_string()),
            name: if prefer_bytecode { None } else { names.get(k).cloned() },
        })
        .collect();

    let body = if method.attributes.code().is_none() {
        MethodBody::Absent
    } else if prefer_bytecode {
        MethodBody::Bytecode(method.opcodes.clone())
    } else {
        match &method.decompiled {
            Ok(ops) => MethodBody::Source(ops.clone()),
            Err(e) => MethodBody::Degraded { reason: e.to_string(), bytecode: method.opcodes.clone() },
        }
    };

    MethodView {
        flags: method.flags.keywords(),
        return_type,
        name,
        params,
        body,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rev_class_file::item::ids::field::{BaseType, FieldType};

    use super::{typed_value, ClassKind, MethodBody, ParamView};
    use crate::{
        decompile,
        test_class::{u2, ClassBuilder},
    };

    #[test]
    fn int_literals_follow_the_field_type() {
        let boolean = FieldType::Base(BaseType::Boolean);
        let character = FieldType::Base(BaseType::Char);
        assert_eq!(typed_value(&boolean, "0"), "false");
        assert_eq!(typed_value(&boolean, "1"), "true");
        assert_eq!(typed_value(&character, "65"), "'A'");
        assert_eq!(typed_value(&character, "39"), "'\\''");
        assert_eq!(typed_value(&character, "10"), "'\\n'");
        assert_eq!(typed_value(&character, "233"), "'\\u00e9'");
        assert_eq!(typed_value(&FieldType::Base(BaseType::Int), "65"), "65");
    }

    #[test]
    fn constant_values() {
        let mut b = ClassBuilder::new("demo/Constants");
        let long = b.long(1 << 40);
        let string = b.string("a\"b");
        let yes = b.integer(1);
        b.field(0x19, "BIG", "J", Some(long))
            .field(0x19, "NAME", "Ljava/lang/String;", Some(string))
            .field(0x19, "ON", "Z", Some(yes));
        let view = decompile(&b.build()).unwrap().render(false);

        assert_eq!(view.package.as_deref(), Some("demo"));
        assert_eq!(view.name, "Constants");
        let values: Vec<_> = view.fields.iter().map(|f| (f.ty.as_str(), f.value.as_deref())).collect();
        assert_eq!(
            values,
            vec![("long", Some("1099511627776L")), ("String", Some("\"a\\\"b\"")), ("boolean", Some("true"))]
        );
        assert_eq!(view.fields[0].flags, vec!["public", "final", "static"]);
    }

    #[test]
    fn bytecode_view_keeps_initializers_and_drops_parameter_names() {
        let mut b = ClassBuilder::new("Point");
        let object_init = u2(b.method_ref("java/lang/Object", "<init>", "()V"));
        b.method(0, "<init>", "(I)V", &[0x2a, 0xb7, object_init[0], object_init[1], 0xb1]);
        b.method(0x0401, "area", "()D", &[]);
        let model = decompile(&b.build()).unwrap();

        let source = model.render(false);
        assert_eq!(source.methods.len(), 1);

        let bytecode = model.render(true);
        let init = &bytecode.methods[0];
        assert_eq!(init.name, "Point");
        assert_eq!(init.return_type, None);
        assert_eq!(init.params, vec![ParamView { ty: "int".into(), name: None }]);
        match &init.body {
            MethodBody::Bytecode(opcodes) => assert_eq!(opcodes.len(), 3),
            body => panic!("unexpected body {:?}", body),
        }
        assert_eq!(bytecode.methods[1].return_type.as_deref(), Some("double"));
    }

    #[test]
    fn interfaces_get_their_own_keyword() {
        let mut b = ClassBuilder::new("demo/Shape");
        b.access(0x0601);
        let view = decompile(&b.build()).unwrap().render(false);
        assert_eq!(view.kind, ClassKind::Interface);
        assert_eq!(view.flags, vec!["public"]);
        assert_eq!(view.super_name, None);
    }
}
