use crate::{error, stream::ClassFileStream};

use super::{ClassFileItem, ConstantPool};

/// The direct superinterfaces of a class, as `Class` entry indices in
/// source declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interfaces(pub Vec<u16>);

impl Interfaces {
    /// Internal names of the interfaces.
    pub fn names<'a>(&self, cp: &'a ConstantPool) -> error::Result<Vec<&'a str>> {
        self.0.iter().map(|i| cp.class_name(*i)).collect()
    }
}

impl ClassFileItem for Interfaces {
    fn read_from_stream(s: &mut ClassFileStream, cp: Option<&ConstantPool>) -> error::Result<Self> {
        let interfaces_count = s.read_u2()?;
        Ok(Self(s.read_sequence(cp, interfaces_count as usize)?))
    }
}
