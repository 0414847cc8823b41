use std::fmt;

use crate::error::{self, ClassFileError};

/// Base types.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl BaseType {
    pub fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'B' => Self::Byte,
            'C' => Self::Char,
            'D' => Self::Double,
            'F' => Self::Float,
            'I' => Self::Int,
            'J' => Self::Long,
            'S' => Self::Short,
            'Z' => Self::Boolean,
            _ => return None,
        })
    }

    /// The Java keyword for this type.
    pub fn name(self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Double => "double",
            Self::Float => "float",
            Self::Int => "int",
            Self::Long => "long",
            Self::Short => "short",
            Self::Boolean => "boolean",
        }
    }

    /// `long` and `double` take two local variable slots.
    pub fn is_wide(self) -> bool {
        matches!(self, Self::Long | Self::Double)
    }
}

/// Field type.
///
/// Object types keep the internal, slash separated class name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldType {
    Base(BaseType),
    Object(String),
    Array(Box<FieldType>),
}

/// A field descriptor represents the type of a class, instance, or local variable.
pub type FieldDescriptor = FieldType;

impl FieldType {
    /// Parse a complete field descriptor.
    pub fn parse(desc: &str) -> error::Result<Self> {
        match Self::parse_prefix(desc) {
            Some((ty, "")) => Ok(ty),
            _ => Err(ClassFileError::MalformedDescriptor(desc.to_string())),
        }
    }

    /// Parse one field type from the start of `s`, returning it with the
    /// unconsumed remainder.
    pub(crate) fn parse_prefix(s: &str) -> Option<(Self, &str)> {
        let mut chars = s.chars();
        let first = chars.next()?;
        let rest = chars.as_str();
        match first {
            'L' => {
                let end = rest.find(';')?;
                if end == 0 {
                    return None;
                }
                Some((Self::Object(rest[..end].to_string()), &rest[end + 1..]))
            }
            '[' => {
                let (component, rest) = Self::parse_prefix(rest)?;
                Some((Self::Array(Box::new(component)), rest))
            }
            c => Some((Self::Base(BaseType::from_char(c)?), rest)),
        }
    }

    /// Number of local variable slots a value of this type occupies.
    pub fn slots(&self) -> u16 {
        match self {
            Self::Base(b) if b.is_wide() => 2,
            _ => 1,
        }
    }
}

/// Writes the type name in internal form, with `[]` per array dimension.
impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base(b) => f.write_str(b.name()),
            Self::Object(name) => f.write_str(name),
            Self::Array(component) => write!(f, "{}[]", component),
        }
    }
}
