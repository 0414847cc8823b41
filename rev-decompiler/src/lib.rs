//! Java class file decompiler.
//!
//! [`decompile`] parses a class file into a [`ClassModel`] whose methods are
//! rebuilt as statements by simulating the operand stack. The model is shown
//! to readers through [`ClassModel::render`] and [`pretty::source`].

pub mod decompile;
pub mod error;
pub mod guess;
pub mod model;
pub mod naming;
pub mod operation;
pub mod pretty;
pub mod source;

#[cfg(test)]
mod test_class;

use log::debug;
use rev_class_file::item::file::{ClassFile, CLASS_MAGIC};

pub use error::{DecompileError, Result};
pub use model::{ClassModel, Field, Method};
pub use operation::{Expr, Operation};
pub use pretty::PrettyConfig;
pub use source::{MethodBody, SourceView};

/// Parse and decompile one class file.
///
/// Structural errors fail the whole class. A method whose body cannot be
/// decompiled is kept as bytecode, see [`Method::is_degraded`].
pub fn decompile(bytes: &[u8]) -> Result<ClassModel> {
    if bytes.len() < 4 || bytes[..4] != CLASS_MAGIC.to_be_bytes() {
        return Err(DecompileError::UnsupportedFormat);
    }
    debug!("decompiling {} bytes", bytes.len());
    ClassModel::from_class_file(ClassFile::parse(bytes)?)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rev_class_file::{item::file::Stage, ErrorKind};

    use crate::{
        decompile,
        error::DecompileError,
        pretty::{source, PrettyConfig},
        source::MethodBody,
        test_class::{u2, ClassBuilder},
    };

    fn text(bytes: &[u8]) -> String {
        source(&decompile(bytes).unwrap().render(false), &PrettyConfig::default())
    }

    /// Default constructor calling `Object.<init>`.
    fn default_init(b: &mut ClassBuilder) {
        let init = u2(b.method_ref("java/lang/Object", "<init>", "()V"));
        b.method(0x0001, "<init>", "()V", &[0x2a, 0xb7, init[0], init[1], 0xb1]);
    }

    fn hello_world() -> Vec<u8> {
        let mut b = ClassBuilder::new("HelloWorld");
        default_init(&mut b);
        let out = u2(b.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;"));
        let hello = b.string("Hello, World!") as u8;
        let println = u2(b.method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V"));
        b.method(
            0x0009,
            "main",
            "([Ljava/lang/String;)V",
            &[0xb2, out[0], out[1], 0x12, hello, 0xb6, println[0], println[1], 0xb1],
        );
        b.build()
    }

    #[test]
    fn hello_world_source() {
        assert_eq!(
            text(&hello_world()),
            "public class HelloWorld {\n\n\n    public HelloWorld() {\n    }\n\n    public static void main(String[] stringsp_1) {\n        System.out.println(\"Hello, World!\");\n    }\n\n}"
        );
    }

    #[test]
    fn hello_world_bytecode() {
        let view = decompile(&hello_world()).unwrap().render(true);
        let expected = "public class HelloWorld {

    public HelloWorld() {
        0: aload_0
        1: invokespecial #9 // void Object.<init>()
        4: return
    }

    public static void main(String[]) {
        0: getstatic #16 // java.io.PrintStream System.out
        3: ldc #18 // \"Hello, World!\"
        5: invokevirtual #24 // void java.io.PrintStream.println(String)
        8: return
    }

}";
        assert_eq!(source(&view, &PrettyConfig::default()), expected);
    }

    #[test]
    fn names_are_stable_across_runs() {
        let bytes = hello_world();
        let first = decompile(&bytes).unwrap();
        let second = decompile(&bytes).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.render(false), second.render(false));
    }

    #[test]
    fn not_a_class_file() {
        assert_eq!(decompile(b"PK\x03\x04rest"), Err(DecompileError::UnsupportedFormat));
        assert_eq!(decompile(&[0xca, 0xfe]), Err(DecompileError::UnsupportedFormat));
        assert_eq!(decompile(&[]).unwrap_err().kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn truncated_class_reports_the_stage() {
        let bytes = hello_world();
        match decompile(&bytes[..20]) {
            Err(DecompileError::Parse { stage, .. }) => assert_eq!(stage, Stage::ConstantPool),
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(decompile(&bytes[..20]).unwrap_err().kind(), ErrorKind::OutOfBounds);
    }

    #[test]
    fn broken_methods_are_isolated() {
        let mut b = ClassBuilder::new("Broken");
        default_init(&mut b);
        // pop on an empty stack
        b.method(0x0009, "underflow", "()V", &[0x57, 0xb1]);
        // 0xca is reserved
        b.method(0x0009, "reserved", "()V", &[0x00, 0xca, 0xb1]);
        b.method(0x0009, "fine", "()I", &[0x04, 0xac]);
        let model = decompile(&b.build()).unwrap();

        let degraded: Vec<_> = model.methods.iter().filter(|m| m.is_degraded()).map(|m| m.name.as_str()).collect();
        assert_eq!(degraded, vec!["underflow", "reserved"]);
        assert_eq!(
            model.method("underflow").unwrap().decompiled.as_ref().unwrap_err().kind(),
            ErrorKind::StackUnderflow
        );
        assert_eq!(
            model.method("reserved").unwrap().decompiled.as_ref().unwrap_err().kind(),
            ErrorKind::MalformedBytecode
        );

        let view = model.render(false);
        match &view.methods[1].body {
            MethodBody::Degraded { bytecode, .. } => assert_eq!(bytecode.len(), 2),
            body => panic!("unexpected body {:?}", body),
        }
        let text = source(&view, &PrettyConfig::default());
        assert!(text.contains("        // decompilation failed: stack underflow at position 0 (pop)\n        0: pop\n"));
        assert!(text.contains("    public static int fine() {\n        return 1;\n    }\n"));
    }

    #[test]
    fn while_loops() {
        let mut b = ClassBuilder::new("WhileLoop");
        default_init(&mut b);
        // int i = 0; while (i != 10) { ++i; }
        b.method(
            0x0009,
            "count",
            "()V",
            &[
                0x03, 0x3b, // iconst_0, istore_0
                0x1a, 0x10, 10, // iload_0, bipush 10
                0x9f, 0x00, 0x09, // if_icmpeq 14
                0x84, 0x00, 0x01, // iinc 0 1
                0xa7, 0xff, 0xf7, // goto 2
                0xb1,
            ],
        );
        // while (intp_1 < intp_2) { while (intp_1 > 0) { --intp_1; } ++intp_2; }
        b.method(
            0x0009,
            "nested",
            "(II)V",
            &[
                0x1a, 0x1b, 0xa2, 0x00, 0x13, // 0: iload_0, iload_1, if_icmpge 21
                0x1a, 0x9e, 0x00, 0x09, // 5: iload_0, ifle 15
                0x84, 0x00, 0xff, // 9: iinc 0 -1
                0xa7, 0xff, 0xf9, // 12: goto 5
                0x84, 0x01, 0x01, // 15: iinc 1 1
                0xa7, 0xff, 0xee, // 18: goto 0
                0xb1, // 21: return
            ],
        );
        let text = text(&b.build());
        assert!(text.contains(
            "    public static void count() {
        int int_1 = 0;
        while (int_1 != 10){
            ++int_1;
        }
    }
"
        ));
        assert!(text.contains(
            "    public static void nested(int intp_1, int intp_2) {
        while (intp_1 < intp_2){
            while (intp_1 > 0){
                --intp_1;
            }
            ++intp_2;
        }
    }
"
        ));
    }

    #[test]
    fn if_flow() {
        let mut b = ClassBuilder::new("IfFlow");
        default_init(&mut b);
        // if (intp_1 > intp_2) return intp_1 + intp_2; return 0;
        b.method(
            0x0009,
            "sum",
            "(II)I",
            &[
                0x1a, 0x1b, 0xa4, 0x00, 0x07, // if_icmple 7
                0x1a, 0x1b, 0x60, 0xac, // iload_0, iload_1, iadd, ireturn
                0x03, 0xac, // iconst_0, ireturn
            ],
        );
        assert!(text(&b.build()).contains(
            "    public static int sum(int intp_1, int intp_2) {
        if (intp_1 > intp_2){
            return intp_1 + intp_2;
        }
        return 0;
    }
"
        ));
    }

    #[test]
    fn overloaded_constructors() {
        let mut b = ClassBuilder::new("OverloadedConstructor");
        let object_init = u2(b.method_ref("java/lang/Object", "<init>", "()V"));
        let str_field = u2(b.field_ref("OverloadedConstructor", "str", "Ljava/lang/String;"));
        let by_string = u2(b.method_ref("OverloadedConstructor", "<init>", "(Ljava/lang/String;)V"));
        let by_int = u2(b.method_ref("OverloadedConstructor", "<init>", "(I)V"));
        let class = u2(b.class("OverloadedConstructor"));
        let test = b.string("test") as u8;
        b.field(0, "str", "Ljava/lang/String;", None);
        b.method(
            0x0001,
            "<init>",
            "(Ljava/lang/String;)V",
            &[
                0x2a, 0xb7, object_init[0], object_init[1], // super()
                0x2a, 0x2b, 0xb5, str_field[0], str_field[1], // this.str = stringp_1
                0xb1,
            ],
        );
        b.method(0x0001, "<init>", "(I)V", &[0x2a, 0xb7, object_init[0], object_init[1], 0xb1]);
        b.method(
            0x0009,
            "main",
            "([Ljava/lang/String;)V",
            &[
                0xbb, class[0], class[1], 0x59, 0x12, test, 0xb7, by_string[0], by_string[1], 0x4c, // 0..9
                0xbb, class[0], class[1], 0x59, 0x10, 42, 0xb7, by_int[0], by_int[1], 0x4d, // 10..19
                0xb1,
            ],
        );
        let expected = "public class OverloadedConstructor {

    String str;

    public OverloadedConstructor(String stringp_1) {
        str = stringp_1;
    }

    public OverloadedConstructor(int intp_1) {
    }

    public static void main(String[] stringsp_1) {
        OverloadedConstructor overloadedconstructor_1 = new OverloadedConstructor(\"test\");
        OverloadedConstructor overloadedconstructor_2 = new OverloadedConstructor(42);
    }

}";
        assert_eq!(text(&b.build()), expected);
    }
}
