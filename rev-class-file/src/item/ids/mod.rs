//! Descriptor and class name handling.

use crate::error;

use self::{field::FieldType, method::{MethodDescriptor, ReturnDescriptor}};

pub mod field;
pub mod method;

/// Package prefix omitted when displaying class names.
pub const ROOT_PACKAGE: &str = "java.lang.";

/// Convert a descriptor to the name of the type it describes.
///
/// `Ljava/lang/String;` becomes `java/lang/String`, arrays get one `[]`
/// per dimension and `V` is accepted as `void`.
pub fn descriptor_to_type(desc: &str) -> error::Result<String> {
    Ok(ReturnDescriptor::parse(desc)?.to_string())
}

/// Split a method descriptor into its return type name and parameter type names.
pub fn descriptor_to_type_and_params(desc: &str) -> error::Result<(String, Vec<String>)> {
    let method = MethodDescriptor::parse(desc)?;
    Ok((
        method.return_desc.to_string(),
        method.parameters.iter().map(FieldType::to_string).collect(),
    ))
}

/// Convert an internal class name to the way it is written in source.
pub fn as_class_name(name: &str) -> String {
    let dotted = name.replace('/', ".");
    match dotted.strip_prefix(ROOT_PACKAGE) {
        Some(short) => short.to_string(),
        None => dotted,
    }
}

/// The class name without its package.
pub fn simple_name(name: &str) -> &str {
    name.rsplit(|c| c == '/' || c == '.').next().unwrap_or(name)
}
