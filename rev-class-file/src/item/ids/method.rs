use std::fmt;

use crate::error::{self, ClassFileError};

use super::field::FieldType;

pub type ParameterDescriptor = FieldType;

/// Return descriptor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReturnDescriptor {
    Field(FieldType),
    Void,
}

impl ReturnDescriptor {
    pub fn parse(desc: &str) -> error::Result<Self> {
        if desc == "V" {
            return Ok(Self::Void);
        }
        Ok(Self::Field(FieldType::parse(desc)?))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }
}

impl fmt::Display for ReturnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(ty) => ty.fmt(f),
            Self::Void => f.write_str("void"),
        }
    }
}

/// A method descriptor contains zero or more
/// parameter descriptors, representing the types
/// of parameters that the method takes, and a
/// return descriptor, representing the type of
/// the value (if any) that the method returns.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodDescriptor {
    pub parameters: Vec<ParameterDescriptor>,
    pub return_desc: ReturnDescriptor,
}

impl MethodDescriptor {
    pub fn parse(desc: &str) -> error::Result<Self> {
        let malformed = || ClassFileError::MalformedDescriptor(desc.to_string());
        let inner = desc.strip_prefix('(').ok_or_else(malformed)?;
        let close = inner.find(')').ok_or_else(malformed)?;
        let (mut params, ret) = (&inner[..close], &inner[close + 1..]);

        let mut parameters = vec![];
        while !params.is_empty() {
            let (param, rest) = FieldType::parse_prefix(params).ok_or_else(malformed)?;
            parameters.push(param);
            params = rest;
        }
        Ok(Self {
            parameters,
            return_desc: ReturnDescriptor::parse(ret).map_err(|_| malformed())?,
        })
    }
}
