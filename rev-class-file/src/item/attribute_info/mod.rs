use fnv::FnvHashMap;
use log::trace;

use crate::{
    error::{self, ClassFileError},
    item::{constant_pool::ConstantPool, ClassFileItem},
    stream::ClassFileStream,
};

/// Attribute names with a typed representation.
#[allow(non_upper_case_globals)]
pub mod attrtype {
    pub const ConstantValue: &str = "ConstantValue";
    pub const Code: &str = "Code";
    pub const Exceptions: &str = "Exceptions";
    pub const SourceFile: &str = "SourceFile";
    pub const Signature: &str = "Signature";
    pub const Synthetic: &str = "Synthetic";
    pub const Deprecated: &str = "Deprecated";
    pub const LineNumberTable: &str = "LineNumberTable";
}

/// A decoded attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    /// The value of a constant field. Points at an Integer, Float, Long,
    /// Double or String entry.
    ConstantValue { constantvalue_index: u16 },
    Code(CodeAttribute),
    /// Checked exceptions a method may throw, as `Class` indices.
    Exceptions { exception_index_table: Vec<u16> },
    SourceFile { sourcefile_index: u16 },
    Signature { signature_index: u16 },
    Synthetic,
    Deprecated,
    LineNumberTable { line_number_table: Vec<LineNumberTableEntry> },
    /// Any attribute without a typed representation.
    Raw(Vec<u8>),
}

/// The `Code` attribute of a method.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    /// Raw instruction bytes.
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: AttributesCollection,
}

/// An exception handler range. Parsed but not used for decompilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// Class of the handled exception, or 0 for any (`finally`).
    pub catch_type: u16,
}

impl ClassFileItem for ExceptionTableEntry {
    fn read_from_stream(s: &mut ClassFileStream, _cp: Option<&ConstantPool>) -> error::Result<Self> {
        Ok(Self {
            start_pc: s.read_u2()?,
            end_pc: s.read_u2()?,
            handler_pc: s.read_u2()?,
            catch_type: s.read_u2()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumberTableEntry {
    pub start_pc: u16,
    pub line_number: u16,
}

impl ClassFileItem for LineNumberTableEntry {
    fn read_from_stream(s: &mut ClassFileStream, _cp: Option<&ConstantPool>) -> error::Result<Self> {
        Ok(Self {
            start_pc: s.read_u2()?,
            line_number: s.read_u2()?,
        })
    }
}

/// Attributes of a class, field, method or code body, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributesCollection {
    pub collection: FnvHashMap<String, Vec<Attribute>>,
}

impl AttributesCollection {
    /// Insert an attribute in to the collection.
    fn insert(&mut self, k: String, v: Attribute) {
        self.collection.entry(k).or_default().push(v);
    }

    pub fn get(&self, k: &str) -> &[Attribute] {
        self.collection.get(k).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn take(&mut self, k: &str) -> Vec<Attribute> {
        self.collection.remove(k).unwrap_or_default()
    }

    pub fn code(&self) -> Option<&CodeAttribute> {
        self.get(attrtype::Code).iter().find_map(|a| match a {
            Attribute::Code(code) => Some(code),
            _ => None,
        })
    }

    pub fn constant_value(&self) -> Option<u16> {
        self.get(attrtype::ConstantValue).iter().find_map(|a| match a {
            Attribute::ConstantValue { constantvalue_index } => Some(*constantvalue_index),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.collection.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ClassFileItem for AttributesCollection {
    fn read_from_stream(s: &mut ClassFileStream, cp: Option<&ConstantPool>) -> error::Result<Self> {
        let attributes_count = s.read_u2()?;
        let mut attributes = Self::default();
        for _ in 0..attributes_count {
            let attribute_name_index = s.read_u2()?;
            let attribute_length = s.read_u4()?;
            let info = s.read_bytes(attribute_length as usize)?;

            let cp = cp.ok_or(ClassFileError::BadConstantPoolIndex(attribute_name_index))?;
            let attribute_name = cp.utf8(attribute_name_index)?;
            trace!("attribute {} ({} bytes)", attribute_name, attribute_length);

            let a = read_attribute_body(&mut ClassFileStream::new(info), attribute_name, cp)?;
            attributes.insert(attribute_name.to_string(), a);
        }
        Ok(attributes)
    }
}

/// Decode the body of one attribute. `s` covers exactly the attribute's bytes.
fn read_attribute_body(s: &mut ClassFileStream, name: &str, cp: &ConstantPool) -> error::Result<Attribute> {
    Ok(match name {
        attrtype::ConstantValue => Attribute::ConstantValue {
            constantvalue_index: s.read_u2()?,
        },
        attrtype::Code => {
            let max_stack = s.read_u2()?;
            let max_locals = s.read_u2()?;
            let code_length = s.read_u4()?;
            let code = s.read_dynamic(code_length as usize)?;
            let exception_table_length = s.read_u2()?;
            let exception_table = s.read_sequence(Some(cp), exception_table_length as usize)?;
            let attributes = AttributesCollection::read_from_stream(s, Some(cp))?;
            Attribute::Code(CodeAttribute {
                max_stack,
                max_locals,
                code,
                exception_table,
                attributes,
            })
        }
        attrtype::Exceptions => {
            let number_of_exceptions = s.read_u2()?;
            Attribute::Exceptions {
                exception_index_table: s.read_sequence(Some(cp), number_of_exceptions as usize)?,
            }
        }
        attrtype::SourceFile => Attribute::SourceFile {
            sourcefile_index: s.read_u2()?,
        },
        attrtype::Signature => Attribute::Signature {
            signature_index: s.read_u2()?,
        },
        attrtype::Synthetic => Attribute::Synthetic,
        attrtype::Deprecated => Attribute::Deprecated,
        attrtype::LineNumberTable => {
            let line_number_table_length = s.read_u2()?;
            Attribute::LineNumberTable {
                line_number_table: s.read_sequence(Some(cp), line_number_table_length as usize)?,
            }
        }
        _ => Attribute::Raw(s.read_dynamic(s.remaining())?),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{Attribute, AttributesCollection, ExceptionTableEntry};
    use crate::{
        error::ClassFileError,
        item::{constant_pool::{ConstantPool, ConstantPoolEntry}, ClassFileItem},
        stream::ClassFileStream,
    };

    fn pool(names: &[&str]) -> ConstantPool {
        ConstantPool {
            entries: names.iter().map(|n| ConstantPoolEntry::Utf8 { data: n.to_string() }).collect(),
        }
    }

    #[test]
    fn code_attribute_framing() {
        let cp = pool(&["Code", "LineNumberTable", "Custom"]);
        let mut body = vec![];
        body.extend(2u16.to_be_bytes()); // max_stack
        body.extend(1u16.to_be_bytes()); // max_locals
        body.extend(1u32.to_be_bytes());
        body.push(0xb1); // return
        body.extend(1u16.to_be_bytes());
        body.extend([0, 0, 0, 1, 0, 1, 0, 0]);
        body.extend(1u16.to_be_bytes());
        body.extend(2u16.to_be_bytes());
        body.extend(6u32.to_be_bytes());
        body.extend([0, 1, 0, 0, 0, 7]);

        let mut bytes = vec![0, 2];
        bytes.extend(1u16.to_be_bytes());
        bytes.extend((body.len() as u32).to_be_bytes());
        bytes.extend(&body);
        bytes.extend(3u16.to_be_bytes());
        bytes.extend(3u32.to_be_bytes());
        bytes.extend([9, 8, 7]);

        let mut s = ClassFileStream::new(&bytes);
        let attrs = AttributesCollection::read_from_stream(&mut s, Some(&cp)).unwrap();
        assert!(s.at_end());
        assert_eq!(attrs.len(), 2);

        let code = attrs.code().unwrap();
        assert_eq!(code.max_stack, 2);
        assert_eq!(code.max_locals, 1);
        assert_eq!(code.code, vec![0xb1]);
        assert_eq!(
            code.exception_table,
            vec![ExceptionTableEntry { start_pc: 0, end_pc: 1, handler_pc: 1, catch_type: 0 }]
        );
        assert_eq!(code.attributes.get("LineNumberTable").len(), 1);
        assert_eq!(attrs.get("Custom"), &[Attribute::Raw(vec![9, 8, 7])]);
    }

    #[test]
    fn attribute_length_is_checked() {
        let cp = pool(&["Custom"]);
        let bytes = [0, 1, 0, 1, 0, 0, 0, 9, 1, 2];
        let err = AttributesCollection::read_from_stream(&mut ClassFileStream::new(&bytes), Some(&cp)).unwrap_err();
        assert_eq!(err, ClassFileError::OutOfBounds { offset: 8, wanted: 9, available: 2 });
    }

    #[test]
    fn constant_value() {
        let cp = pool(&["ConstantValue"]);
        let bytes = [0, 1, 0, 1, 0, 0, 0, 2, 0, 5];
        let attrs = AttributesCollection::read_from_stream(&mut ClassFileStream::new(&bytes), Some(&cp)).unwrap();
        assert_eq!(attrs.constant_value(), Some(5));
    }
}
