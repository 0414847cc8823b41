//! JVM opcode metadata.
//!
//! Every defined opcode byte maps to an [OpcodeInfo] holding its mnemonic,
//! the ordered layout of its operand bytes and the (informational) shape of
//! the operand stack before and after it runs.

use std::fmt;

pub mod disassemble;

pub use self::disassemble::{disassemble, Operand, Opcode, Switch};

/// One component of an instruction's operand bytes.
///
/// Multi-byte values are split into numbered parts, the same way the
/// instruction set reference lists them. The disassembler reassembles them
/// by shifting and accumulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandPart {
    /// Unsigned local variable index.
    Local,
    /// Single byte constant pool index (`ldc`).
    Index,
    /// Signed literal byte (`bipush`).
    Byte,
    /// Signed increment (`iinc`).
    Const,
    IndexByte1,
    IndexByte2,
    /// High byte of a signed 16-bit literal (`sipush`).
    Byte1,
    Byte2,
    BranchByte1,
    BranchByte2,
    BranchByte3,
    BranchByte4,
    /// Argument slot count of `invokeinterface`.
    Count,
    /// Always-zero padding byte.
    Zero,
    /// Primitive array type code of `newarray`.
    AType,
    /// Dimension count of `multianewarray`.
    Dimensions,
    /// Variable length switch body (`tableswitch`, `lookupswitch`).
    Switch,
    /// Opcode modified by `wide`.
    Wide,
}

impl OperandPart {
    /// Whether this part continues a value started by the previous part.
    pub fn continues(self) -> bool {
        matches!(
            self,
            Self::IndexByte2 | Self::Byte2 | Self::BranchByte2 | Self::BranchByte3 | Self::BranchByte4
        )
    }
}

/// Static metadata of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub code: u8,
    pub mnemonic: Mnemonic,
    /// Operand bytes following the opcode, in stream order.
    pub operands: &'static [OperandPart],
    /// Stack values consumed, bottom first.
    pub stack_in: &'static [&'static str],
    /// Stack values produced, bottom first.
    pub stack_out: &'static [&'static str],
    /// Pushes a literal encoded in the instruction itself rather than
    /// reading the constant pool or a local.
    pub literal_push: bool,
}

impl OpcodeInfo {
    /// Look up the metadata for an opcode byte.
    pub fn lookup(code: u8) -> Option<&'static OpcodeInfo> {
        OPCODES[code as usize].as_ref()
    }
}

/// Macro for defining the opcode table.
/// Generates the [Mnemonic] enum and the byte-indexed [OPCODES] table.
macro_rules! def_opcodes {
    (@push push) => { true };
    (@push) => { false };
    (
        $(
            ($code:expr) = $name:ident [$($part:ident),*] [$($sin:expr),*] => [$($sout:expr),*] $($push:ident)?
        );* $(;)?
    ) => {
        /// An opcode mnemonic.
        #[allow(non_camel_case_types)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Mnemonic {
            $(
                $name
            ),*
        }

        impl Mnemonic {
            /// The mnemonic as written in the instruction set reference.
            pub fn name(self) -> &'static str {
                let raw = match self {
                    $(
                        Self::$name => stringify!($name),
                    )*
                };
                raw.trim_start_matches("r#")
            }

            /// The opcode byte for this mnemonic.
            pub fn code(self) -> u8 {
                match self {
                    $(
                        Self::$name => $code,
                    )*
                }
            }
        }

        const fn build_table() -> [Option<OpcodeInfo>; 256] {
            let mut table = [None; 256];
            $(
                table[$code] = Some(OpcodeInfo {
                    code: $code,
                    mnemonic: Mnemonic::$name,
                    operands: &[$(OperandPart::$part),*],
                    stack_in: &[$($sin),*],
                    stack_out: &[$($sout),*],
                    literal_push: def_opcodes!(@push $($push)?),
                });
            )*
            table
        }

        /// Opcode metadata indexed by opcode byte. Reserved and undefined
        /// bytes are `None`.
        pub static OPCODES: [Option<OpcodeInfo>; 256] = build_table();
    };
}

def_opcodes! {
    // Constants
    (0x00) = nop [] [] => [];
    (0x01) = aconst_null [] [] => ["null"];
    (0x02) = iconst_m1 [] [] => ["int"] push;
    (0x03) = iconst_0 [] [] => ["int"] push;
    (0x04) = iconst_1 [] [] => ["int"] push;
    (0x05) = iconst_2 [] [] => ["int"] push;
    (0x06) = iconst_3 [] [] => ["int"] push;
    (0x07) = iconst_4 [] [] => ["int"] push;
    (0x08) = iconst_5 [] [] => ["int"] push;
    (0x09) = lconst_0 [] [] => ["long"] push;
    (0x0a) = lconst_1 [] [] => ["long"] push;
    (0x0b) = fconst_0 [] [] => ["float"] push;
    (0x0c) = fconst_1 [] [] => ["float"] push;
    (0x0d) = fconst_2 [] [] => ["float"] push;
    (0x0e) = dconst_0 [] [] => ["double"] push;
    (0x0f) = dconst_1 [] [] => ["double"] push;
    (0x10) = bipush [Byte] [] => ["value"] push;
    (0x11) = sipush [Byte1, Byte2] [] => ["value"] push;
    (0x12) = ldc [Index] [] => ["value"];
    (0x13) = ldc_w [IndexByte1, IndexByte2] [] => ["value"];
    (0x14) = ldc2_w [IndexByte1, IndexByte2] [] => ["value"];

    // Loads
    (0x15) = iload [Local] [] => ["value"];
    (0x16) = lload [Local] [] => ["value"];
    (0x17) = fload [Local] [] => ["value"];
    (0x18) = dload [Local] [] => ["value"];
    (0x19) = aload [Local] [] => ["objectref"];
    (0x1a) = iload_0 [] [] => ["value"];
    (0x1b) = iload_1 [] [] => ["value"];
    (0x1c) = iload_2 [] [] => ["value"];
    (0x1d) = iload_3 [] [] => ["value"];
    (0x1e) = lload_0 [] [] => ["value"];
    (0x1f) = lload_1 [] [] => ["value"];
    (0x20) = lload_2 [] [] => ["value"];
    (0x21) = lload_3 [] [] => ["value"];
    (0x22) = fload_0 [] [] => ["value"];
    (0x23) = fload_1 [] [] => ["value"];
    (0x24) = fload_2 [] [] => ["value"];
    (0x25) = fload_3 [] [] => ["value"];
    (0x26) = dload_0 [] [] => ["value"];
    (0x27) = dload_1 [] [] => ["value"];
    (0x28) = dload_2 [] [] => ["value"];
    (0x29) = dload_3 [] [] => ["value"];
    (0x2a) = aload_0 [] [] => ["objectref"];
    (0x2b) = aload_1 [] [] => ["objectref"];
    (0x2c) = aload_2 [] [] => ["objectref"];
    (0x2d) = aload_3 [] [] => ["objectref"];
    (0x2e) = iaload [] ["arrayref", "index"] => ["value"];
    (0x2f) = laload [] ["arrayref", "index"] => ["value"];
    (0x30) = faload [] ["arrayref", "index"] => ["value"];
    (0x31) = daload [] ["arrayref", "index"] => ["value"];
    (0x32) = aaload [] ["arrayref", "index"] => ["value"];
    (0x33) = baload [] ["arrayref", "index"] => ["value"];
    (0x34) = caload [] ["arrayref", "index"] => ["value"];
    (0x35) = saload [] ["arrayref", "index"] => ["value"];

    // Stores
    (0x36) = istore [Local] ["value"] => [];
    (0x37) = lstore [Local] ["value"] => [];
    (0x38) = fstore [Local] ["value"] => [];
    (0x39) = dstore [Local] ["value"] => [];
    (0x3a) = astore [Local] ["objectref"] => [];
    (0x3b) = istore_0 [] ["value"] => [];
    (0x3c) = istore_1 [] ["value"] => [];
    (0x3d) = istore_2 [] ["value"] => [];
    (0x3e) = istore_3 [] ["value"] => [];
    (0x3f) = lstore_0 [] ["value"] => [];
    (0x40) = lstore_1 [] ["value"] => [];
    (0x41) = lstore_2 [] ["value"] => [];
    (0x42) = lstore_3 [] ["value"] => [];
    (0x43) = fstore_0 [] ["value"] => [];
    (0x44) = fstore_1 [] ["value"] => [];
    (0x45) = fstore_2 [] ["value"] => [];
    (0x46) = fstore_3 [] ["value"] => [];
    (0x47) = dstore_0 [] ["value"] => [];
    (0x48) = dstore_1 [] ["value"] => [];
    (0x49) = dstore_2 [] ["value"] => [];
    (0x4a) = dstore_3 [] ["value"] => [];
    (0x4b) = astore_0 [] ["objectref"] => [];
    (0x4c) = astore_1 [] ["objectref"] => [];
    (0x4d) = astore_2 [] ["objectref"] => [];
    (0x4e) = astore_3 [] ["objectref"] => [];
    (0x4f) = iastore [] ["arrayref", "index", "value"] => [];
    (0x50) = lastore [] ["arrayref", "index", "value"] => [];
    (0x51) = fastore [] ["arrayref", "index", "value"] => [];
    (0x52) = dastore [] ["arrayref", "index", "value"] => [];
    (0x53) = aastore [] ["arrayref", "index", "value"] => [];
    (0x54) = bastore [] ["arrayref", "index", "value"] => [];
    (0x55) = castore [] ["arrayref", "index", "value"] => [];
    (0x56) = sastore [] ["arrayref", "index", "value"] => [];

    // Stack
    (0x57) = pop [] ["value"] => [];
    (0x58) = pop2 [] ["value2", "value1"] => [];
    (0x59) = dup [] ["value"] => ["value", "value"];
    (0x5a) = dup_x1 [] ["value2", "value1"] => ["value1", "value2", "value1"];
    (0x5b) = dup_x2 [] ["value3", "value2", "value1"] => ["value1", "value3", "value2", "value1"];
    (0x5c) = dup2 [] ["value2", "value1"] => ["value2", "value1", "value2", "value1"];
    (0x5d) = dup2_x1 [] ["value3", "value2", "value1"] => ["value2", "value1", "value3", "value2", "value1"];
    (0x5e) = dup2_x2 [] ["value4", "value3", "value2", "value1"] => ["value2", "value1", "value4", "value3", "value2", "value1"];
    (0x5f) = swap [] ["value2", "value1"] => ["value1", "value2"];

    // Math
    (0x60) = iadd [] ["value1", "value2"] => ["result"];
    (0x61) = ladd [] ["value1", "value2"] => ["result"];
    (0x62) = fadd [] ["value1", "value2"] => ["result"];
    (0x63) = dadd [] ["value1", "value2"] => ["result"];
    (0x64) = isub [] ["value1", "value2"] => ["result"];
    (0x65) = lsub [] ["value1", "value2"] => ["result"];
    (0x66) = fsub [] ["value1", "value2"] => ["result"];
    (0x67) = dsub [] ["value1", "value2"] => ["result"];
    (0x68) = imul [] ["value1", "value2"] => ["result"];
    (0x69) = lmul [] ["value1", "value2"] => ["result"];
    (0x6a) = fmul [] ["value1", "value2"] => ["result"];
    (0x6b) = dmul [] ["value1", "value2"] => ["result"];
    (0x6c) = idiv [] ["value1", "value2"] => ["result"];
    (0x6d) = ldiv [] ["value1", "value2"] => ["result"];
    (0x6e) = fdiv [] ["value1", "value2"] => ["result"];
    (0x6f) = ddiv [] ["value1", "value2"] => ["result"];
    (0x70) = irem [] ["value1", "value2"] => ["result"];
    (0x71) = lrem [] ["value1", "value2"] => ["result"];
    (0x72) = frem [] ["value1", "value2"] => ["result"];
    (0x73) = drem [] ["value1", "value2"] => ["result"];
    (0x74) = ineg [] ["value"] => ["result"];
    (0x75) = lneg [] ["value"] => ["result"];
    (0x76) = fneg [] ["value"] => ["result"];
    (0x77) = dneg [] ["value"] => ["result"];
    (0x78) = ishl [] ["value1", "value2"] => ["result"];
    (0x79) = lshl [] ["value1", "value2"] => ["result"];
    (0x7a) = ishr [] ["value1", "value2"] => ["result"];
    (0x7b) = lshr [] ["value1", "value2"] => ["result"];
    (0x7c) = iushr [] ["value1", "value2"] => ["result"];
    (0x7d) = lushr [] ["value1", "value2"] => ["result"];
    (0x7e) = iand [] ["value1", "value2"] => ["result"];
    (0x7f) = land [] ["value1", "value2"] => ["result"];
    (0x80) = ior [] ["value1", "value2"] => ["result"];
    (0x81) = lor [] ["value1", "value2"] => ["result"];
    (0x82) = ixor [] ["value1", "value2"] => ["result"];
    (0x83) = lxor [] ["value1", "value2"] => ["result"];
    (0x84) = iinc [Local, Const] [] => [];

    // Conversions
    (0x85) = i2l [] ["value"] => ["result"];
    (0x86) = i2f [] ["value"] => ["result"];
    (0x87) = i2d [] ["value"] => ["result"];
    (0x88) = l2i [] ["value"] => ["result"];
    (0x89) = l2f [] ["value"] => ["result"];
    (0x8a) = l2d [] ["value"] => ["result"];
    (0x8b) = f2i [] ["value"] => ["result"];
    (0x8c) = f2l [] ["value"] => ["result"];
    (0x8d) = f2d [] ["value"] => ["result"];
    (0x8e) = d2i [] ["value"] => ["result"];
    (0x8f) = d2l [] ["value"] => ["result"];
    (0x90) = d2f [] ["value"] => ["result"];
    (0x91) = i2b [] ["value"] => ["result"];
    (0x92) = i2c [] ["value"] => ["result"];
    (0x93) = i2s [] ["value"] => ["result"];

    // Comparisons
    (0x94) = lcmp [] ["value1", "value2"] => ["result"];
    (0x95) = fcmpl [] ["value1", "value2"] => ["result"];
    (0x96) = fcmpg [] ["value1", "value2"] => ["result"];
    (0x97) = dcmpl [] ["value1", "value2"] => ["result"];
    (0x98) = dcmpg [] ["value1", "value2"] => ["result"];
    (0x99) = ifeq [BranchByte1, BranchByte2] ["value"] => [];
    (0x9a) = ifne [BranchByte1, BranchByte2] ["value"] => [];
    (0x9b) = iflt [BranchByte1, BranchByte2] ["value"] => [];
    (0x9c) = ifge [BranchByte1, BranchByte2] ["value"] => [];
    (0x9d) = ifgt [BranchByte1, BranchByte2] ["value"] => [];
    (0x9e) = ifle [BranchByte1, BranchByte2] ["value"] => [];
    (0x9f) = if_icmpeq [BranchByte1, BranchByte2] ["value1", "value2"] => [];
    (0xa0) = if_icmpne [BranchByte1, BranchByte2] ["value1", "value2"] => [];
    (0xa1) = if_icmplt [BranchByte1, BranchByte2] ["value1", "value2"] => [];
    (0xa2) = if_icmpge [BranchByte1, BranchByte2] ["value1", "value2"] => [];
    (0xa3) = if_icmpgt [BranchByte1, BranchByte2] ["value1", "value2"] => [];
    (0xa4) = if_icmple [BranchByte1, BranchByte2] ["value1", "value2"] => [];
    (0xa5) = if_acmpeq [BranchByte1, BranchByte2] ["value1", "value2"] => [];
    (0xa6) = if_acmpne [BranchByte1, BranchByte2] ["value1", "value2"] => [];

    // Control
    (0xa7) = goto [BranchByte1, BranchByte2] [] => [];
    (0xa8) = jsr [BranchByte1, BranchByte2] [] => ["address"];
    (0xa9) = ret [Local] [] => [];
    (0xaa) = tableswitch [Switch] ["index"] => [];
    (0xab) = lookupswitch [Switch] ["key"] => [];
    (0xac) = ireturn [] ["value"] => [];
    (0xad) = lreturn [] ["value"] => [];
    (0xae) = freturn [] ["value"] => [];
    (0xaf) = dreturn [] ["value"] => [];
    (0xb0) = areturn [] ["objectref"] => [];
    (0xb1) = r#return [] [] => [];

    // References
    (0xb2) = getstatic [IndexByte1, IndexByte2] [] => ["value"];
    (0xb3) = putstatic [IndexByte1, IndexByte2] ["value"] => [];
    (0xb4) = getfield [IndexByte1, IndexByte2] ["objectref"] => ["value"];
    (0xb5) = putfield [IndexByte1, IndexByte2] ["objectref", "value"] => [];
    (0xb6) = invokevirtual [IndexByte1, IndexByte2] ["objectref", "args..."] => ["result?"];
    (0xb7) = invokespecial [IndexByte1, IndexByte2] ["objectref", "args..."] => ["result?"];
    (0xb8) = invokestatic [IndexByte1, IndexByte2] ["args..."] => ["result?"];
    (0xb9) = invokeinterface [IndexByte1, IndexByte2, Count, Zero] ["objectref", "args..."] => ["result?"];
    (0xba) = invokedynamic [IndexByte1, IndexByte2, Zero, Zero] ["args..."] => ["result?"];
    (0xbb) = new [IndexByte1, IndexByte2] [] => ["objectref"];
    (0xbc) = newarray [AType] ["count"] => ["arrayref"];
    (0xbd) = anewarray [IndexByte1, IndexByte2] ["count"] => ["arrayref"];
    (0xbe) = arraylength [] ["arrayref"] => ["length"];
    (0xbf) = athrow [] ["objectref"] => ["objectref"];
    (0xc0) = checkcast [IndexByte1, IndexByte2] ["objectref"] => ["objectref"];
    (0xc1) = instanceof [IndexByte1, IndexByte2] ["objectref"] => ["result"];
    (0xc2) = monitorenter [] ["objectref"] => [];
    (0xc3) = monitorexit [] ["objectref"] => [];

    // Extended
    (0xc4) = wide [Wide] [] => [];
    (0xc5) = multianewarray [IndexByte1, IndexByte2, Dimensions] ["count..."] => ["arrayref"];
    (0xc6) = ifnull [BranchByte1, BranchByte2] ["value"] => [];
    (0xc7) = ifnonnull [BranchByte1, BranchByte2] ["value"] => [];
    (0xc8) = goto_w [BranchByte1, BranchByte2, BranchByte3, BranchByte4] [] => [];
    (0xc9) = jsr_w [BranchByte1, BranchByte2, BranchByte3, BranchByte4] [] => ["address"];
}

impl Mnemonic {
    pub fn info(self) -> &'static OpcodeInfo {
        match OPCODES[self.code() as usize].as_ref() {
            Some(info) => info,
            // every variant is generated together with its table row
            None => unreachable!("opcode table is missing {}", self.name()),
        }
    }

    /// Conditional branches, excluding `goto` and the subroutine jumps.
    pub fn is_conditional_branch(self) -> bool {
        matches!(self.code(), 0x99..=0xa6 | 0xc6 | 0xc7)
    }

    /// Instructions that `wide` may modify.
    pub fn is_widenable(self) -> bool {
        matches!(
            self,
            Self::iload
                | Self::lload
                | Self::fload
                | Self::dload
                | Self::aload
                | Self::istore
                | Self::lstore
                | Self::fstore
                | Self::dstore
                | Self::astore
                | Self::ret
                | Self::iinc
        )
    }

    pub fn is_return(self) -> bool {
        matches!(self.code(), 0xac..=0xb1)
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
