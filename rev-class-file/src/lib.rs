//! Class file parser.
//! 
//! Loads class files into an easily usable data structure and
//! disassembles method bytecode into a structured opcode stream.


pub mod item;
pub mod stream;
pub mod error;

pub use error::{ClassFileError, ErrorKind};
pub use item::file::ClassFile;
