use log::debug;

use crate::{
    error::{self, ClassFileError},
    stream::ClassFileStream,
};

pub use self::entry::{decode_modified_utf8, tags, ConstantPoolEntry};

use super::{
    ids::{as_class_name, descriptor_to_type, descriptor_to_type_and_params},
    ClassFileItem,
};

mod entry;

/// The kind of member a reference entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Field,
    Method,
    InterfaceMethod,
}

/// A resolved `Fieldref`, `Methodref` or `InterfaceMethodref`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRef<'a> {
    pub kind: RefKind,
    /// Internal name of the declaring class.
    pub class_name: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
}

/// The constant pool. Contains all constant pool entries.
///
/// Pool indices are 1-based: index `i` lives at `entries[i - 1]`. The slot
/// following a Long or Double holds [ConstantPoolEntry::Reserved].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstantPool {
    /// The entries of the constant pool.
    pub entries: Vec<ConstantPoolEntry>,
}

impl ClassFileItem for ConstantPool {
    fn read_from_stream(s: &mut ClassFileStream, _cp: Option<&ConstantPool>) -> error::Result<Self> {
        let count = s.read_u2()?;
        let mut entries = Vec::with_capacity(count.saturating_sub(1) as usize);
        let mut index = 1;
        while index < count {
            let entry = ConstantPoolEntry::read_indexed(s, index)?;
            let wide = entry.is_wide();
            entries.push(entry);
            if wide {
                // The reserved slot must fit in the pool too.
                if count - index < 2 {
                    return Err(ClassFileError::BadConstantPoolIndex(index));
                }
                entries.push(ConstantPoolEntry::Reserved);
                index += 1;
            }
            index += 1;
        }

        let mut pool = Self { entries };
        pool.resolve()?;
        debug!("read constant pool with {} slots", pool.len());
        Ok(pool)
    }
}

impl ConstantPool {
    /// Number of slots, including reserved ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy referenced Utf8 text into the entries pointing at it.
    fn resolve(&mut self) -> error::Result<()> {
        for i in 0..self.entries.len() {
            let resolved = match &self.entries[i] {
                ConstantPoolEntry::Class { name_index, .. }
                | ConstantPoolEntry::Module { name_index, .. }
                | ConstantPoolEntry::Package { name_index, .. } => {
                    vec![self.utf8(*name_index)?.to_string()]
                }
                ConstantPoolEntry::String { string_index, .. } => vec![self.utf8(*string_index)?.to_string()],
                ConstantPoolEntry::NameAndType { name_index, descriptor_index, .. } => vec![
                    self.utf8(*name_index)?.to_string(),
                    self.utf8(*descriptor_index)?.to_string(),
                ],
                ConstantPoolEntry::MethodType { descriptor_index, .. } => {
                    vec![self.utf8(*descriptor_index)?.to_string()]
                }
                _ => continue,
            };
            let mut resolved = resolved.into_iter();
            match &mut self.entries[i] {
                ConstantPoolEntry::Class { name, .. }
                | ConstantPoolEntry::Module { name, .. }
                | ConstantPoolEntry::Package { name, .. } => *name = resolved.next().unwrap_or_default(),
                ConstantPoolEntry::String { string, .. } => *string = resolved.next().unwrap_or_default(),
                ConstantPoolEntry::NameAndType { name, descriptor, .. } => {
                    *name = resolved.next().unwrap_or_default();
                    *descriptor = resolved.next().unwrap_or_default();
                }
                ConstantPoolEntry::MethodType { descriptor, .. } => *descriptor = resolved.next().unwrap_or_default(),
                _ => {}
            }
        }
        Ok(())
    }

    /// Get the entry at a 1-based pool index.
    pub fn get(&self, index: u16) -> error::Result<&ConstantPoolEntry> {
        match index.checked_sub(1).and_then(|i| self.entries.get(i as usize)) {
            None | Some(ConstantPoolEntry::Reserved) => Err(ClassFileError::BadConstantPoolIndex(index)),
            Some(entry) => Ok(entry),
        }
    }

    pub fn utf8(&self, index: u16) -> error::Result<&str> {
        match self.get(index)? {
            ConstantPoolEntry::Utf8 { data } => Ok(data),
            _ => Err(ClassFileError::UnexpectedConstant { index, expected: "Utf8" }),
        }
    }

    /// Internal name of the `Class` entry at `index`.
    pub fn class_name(&self, index: u16) -> error::Result<&str> {
        match self.get(index)? {
            ConstantPoolEntry::Class { name, .. } => Ok(name),
            _ => Err(ClassFileError::UnexpectedConstant { index, expected: "Class" }),
        }
    }

    /// Name and descriptor of the `NameAndType` entry at `index`.
    pub fn name_and_type(&self, index: u16) -> error::Result<(&str, &str)> {
        match self.get(index)? {
            ConstantPoolEntry::NameAndType { name, descriptor, .. } => Ok((name, descriptor)),
            _ => Err(ClassFileError::UnexpectedConstant { index, expected: "NameAndType" }),
        }
    }

    /// Resolve a field or method reference.
    pub fn member_ref(&self, index: u16) -> error::Result<MemberRef<'_>> {
        let (kind, class_index, name_and_type_index) = match self.get(index)? {
            ConstantPoolEntry::Fieldref { class_index, name_and_type_index } => {
                (RefKind::Field, *class_index, *name_and_type_index)
            }
            ConstantPoolEntry::Methodref { class_index, name_and_type_index } => {
                (RefKind::Method, *class_index, *name_and_type_index)
            }
            ConstantPoolEntry::InterfaceMethodref { class_index, name_and_type_index } => {
                (RefKind::InterfaceMethod, *class_index, *name_and_type_index)
            }
            _ => return Err(ClassFileError::UnexpectedConstant { index, expected: "member reference" }),
        };
        let (name, descriptor) = self.name_and_type(name_and_type_index)?;
        Ok(MemberRef {
            kind,
            class_name: self.class_name(class_index)?,
            name,
            descriptor,
        })
    }

    /// Resolve a method reference, rejecting field references.
    pub fn method_ref(&self, index: u16) -> error::Result<MemberRef<'_>> {
        match self.member_ref(index)? {
            m @ MemberRef { kind: RefKind::Method | RefKind::InterfaceMethod, .. } => Ok(m),
            _ => Err(ClassFileError::UnexpectedConstant { index, expected: "method reference" }),
        }
    }

    /// Resolve a field reference, rejecting method references.
    pub fn field_ref(&self, index: u16) -> error::Result<MemberRef<'_>> {
        match self.member_ref(index)? {
            m @ MemberRef { kind: RefKind::Field, .. } => Ok(m),
            _ => Err(ClassFileError::UnexpectedConstant { index, expected: "field reference" }),
        }
    }

    /// Render a loadable constant (`ldc` family operand) as a Java literal.
    pub fn literal(&self, index: u16) -> error::Result<String> {
        Ok(match self.get(index)? {
            ConstantPoolEntry::Integer { value } => value.to_string(),
            ConstantPoolEntry::Float { value } => value.to_string(),
            ConstantPoolEntry::Long { value } => value.to_string(),
            ConstantPoolEntry::Double { value } => value.to_string(),
            ConstantPoolEntry::String { string, .. } => quote(string),
            ConstantPoolEntry::Class { name, .. } => format!("{}.class", as_class_name(name)),
            _ => return Err(ClassFileError::UnexpectedConstant { index, expected: "loadable constant" }),
        })
    }

    /// A human readable description of the entry at `index`, used as a
    /// disassembly comment. `None` when the entry has no useful description.
    pub fn describe(&self, index: u16) -> Option<String> {
        match self.get(index).ok()? {
            ConstantPoolEntry::Methodref { .. } | ConstantPoolEntry::InterfaceMethodref { .. } => {
                let m = self.member_ref(index).ok()?;
                let (ret, params) = descriptor_to_type_and_params(m.descriptor).ok()?;
                let params: Vec<String> = params.iter().map(|p| as_class_name(p)).collect();
                Some(format!(
                    "{} {}.{}({})",
                    as_class_name(&ret),
                    as_class_name(m.class_name),
                    m.name,
                    params.join(", ")
                ))
            }
            ConstantPoolEntry::Fieldref { .. } => {
                let m = self.member_ref(index).ok()?;
                let ty = descriptor_to_type(m.descriptor).ok()?;
                Some(format!("{} {}.{}", as_class_name(&ty), as_class_name(m.class_name), m.name))
            }
            ConstantPoolEntry::Utf8 { data } => Some(quote(data)),
            ConstantPoolEntry::Class { name, .. } => Some(as_class_name(name)),
            _ => self.literal(index).ok(),
        }
    }
}

/// Quote a string as a Java string literal.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0}' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
