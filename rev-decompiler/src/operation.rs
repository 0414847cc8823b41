//! Decompiled statements and expressions.

use std::fmt;

use rev_class_file::item::opcodes::Mnemonic;

/// Precedence of casts and unary minus.
const UNARY: u8 = 14;
/// Precedence of array creation, which cannot be indexed or dereferenced bare.
const CREATION: u8 = 15;
/// Precedence of names, literals, member accesses and calls.
const PRIMARY: u8 = 16;

/// A Java expression rebuilt from the operand stack.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal, already written as Java source (`5`, `"text"`, `null`).
    Literal(String),
    /// A local variable, parameter or class name.
    Name(String),
    /// The receiver of an instance method.
    This,
    /// A field read. `object` is `None` for fields of `this`.
    Field { object: Option<Box<Expr>>, name: String },
    Call(Call),
    Binary { left: Box<Expr>, op: &'static str, right: Box<Expr> },
    Negate(Box<Expr>),
    Cast { ty: String, value: Box<Expr> },
    ArrayElement { array: Box<Expr>, index: Box<Expr> },
    /// Array creation, one length per dimension.
    NewArray { ty: String, lengths: Vec<Expr> },
    /// The three-way result of `lcmp`, `fcmp*` and `dcmp*`, waiting for the
    /// branch that tests it.
    Compare { left: Box<Expr>, right: Box<Expr> },
}

impl Expr {
    pub fn binary(left: Expr, op: &'static str, right: Expr) -> Self {
        Self::Binary { left: Box::new(left), op, right: Box::new(right) }
    }

    /// The object a member is accessed through, `None` for `this`.
    pub fn qualifier(self) -> Option<Box<Expr>> {
        match self {
            Self::This => None,
            e => Some(Box::new(e)),
        }
    }

    /// How tightly the outermost operator binds, higher is tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Binary { op, .. } => binary_precedence(op),
            Self::Negate(_) | Self::Cast { .. } => UNARY,
            Self::Literal(s) if s.starts_with('-') => UNARY,
            Self::NewArray { .. } => CREATION,
            _ => PRIMARY,
        }
    }

    /// This expression as the object of `.` or `[]`.
    pub fn receiver(&self) -> Operand<'_> {
        self.operand(PRIMARY)
    }

    fn operand(&self, min: u8) -> Operand<'_> {
        Operand { expr: self, min }
    }
}

fn binary_precedence(op: &str) -> u8 {
    match op {
        "*" | "/" | "%" => 12,
        "+" | "-" => 11,
        "<<" | ">>" | ">>>" => 10,
        "&" => 7,
        "^" => 6,
        "|" => 5,
        _ => 0,
    }
}

/// An expression written inside another, parenthesized when it binds
/// looser than `min`.
pub struct Operand<'a> {
    expr: &'a Expr,
    min: u8,
}

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.expr.precedence() < self.min {
            write!(f, "({})", self.expr)
        } else {
            write!(f, "{}", self.expr)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) | Self::Name(s) => f.write_str(s),
            Self::This => f.write_str("this"),
            Self::Field { object: Some(object), name } => write!(f, "{}.{}", object.receiver(), name),
            Self::Field { object: None, name } => f.write_str(name),
            Self::Call(call) => write!(f, "{}", call),
            Self::Binary { left, op, right } => {
                // Operators are left associative, so an equal right operand needs parentheses.
                let precedence = binary_precedence(op);
                write!(f, "{} {} {}", left.operand(precedence), op, right.operand(precedence + 1))
            }
            Self::Negate(value) => write!(f, "-{}", value.operand(UNARY + 1)),
            Self::Cast { ty, value } => write!(f, "({}) {}", ty, value.operand(UNARY)),
            Self::ArrayElement { array, index } => write!(f, "{}[{}]", array.receiver(), index),
            Self::NewArray { ty, lengths } => {
                write!(f, "new {}", ty)?;
                for length in lengths {
                    write!(f, "[{}]", length)?;
                }
                Ok(())
            }
            Self::Compare { left, right } => write!(f, "compare({}, {})", left, right),
        }
    }
}

/// A method invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Receiver or declaring class, `None` when calling on `this`.
    pub object: Option<Box<Expr>>,
    pub name: String,
    pub arguments: Vec<Expr>,
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(object) = &self.object {
            write!(f, "{}.", object.receiver())?;
        }
        write!(f, "{}(", self.name)?;
        for (i, argument) in self.arguments.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", argument)?;
        }
        f.write_str(")")
    }
}

/// The comparison a source level condition makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Ge,
    Gt,
    Le,
}

impl Comparator {
    /// The condition guarding the block a conditional branch skips.
    ///
    /// The branch is taken when the block does not run, so the block's
    /// condition is the negation of the branch's.
    pub fn for_branch(mnemonic: Mnemonic) -> Option<Self> {
        use Mnemonic::*;
        Some(match mnemonic {
            ifeq | if_icmpeq | if_acmpeq | ifnull => Self::Ne,
            ifne | if_icmpne | if_acmpne | ifnonnull => Self::Eq,
            iflt | if_icmplt => Self::Ge,
            ifge | if_icmpge => Self::Lt,
            ifgt | if_icmpgt => Self::Le,
            ifle | if_icmple => Self::Gt,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Gt => ">",
            Self::Le => "<=",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// `lvalue = rvalue`, optionally declaring the variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignation {
    /// Declared type, set when the statement introduces a variable.
    pub lvalue_type: Option<String>,
    /// Object owning the assigned field.
    pub lvalue_object: Option<Box<Expr>>,
    pub lvalue: String,
    pub rvalue: Expr,
    /// The right hand side is a constructor call, written with `new`.
    pub is_new: bool,
}

/// An `if` or `while` with its body.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub left: Expr,
    pub comparator: Comparator,
    pub right: Expr,
    pub block: Vec<Operation>,
    /// Bytecode position where the block ends.
    pub border: usize,
}

/// A decompiled statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Assignation(Assignation),
    Return { value: Option<Expr> },
    Throw { value: Expr },
    If(Conditional),
    While(Conditional),
    Call(Call),
    /// `iinc`.
    Increment { variable: String, amount: i32 },
    /// An instruction with no source form, kept as its disassembly.
    Comment { text: String },
}
