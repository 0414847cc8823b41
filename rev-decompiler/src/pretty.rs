//! Java-like text for a [`SourceView`].

use rev_class_file::item::{ids::as_class_name, opcodes::Opcode};

use crate::{
    operation::{Assignation, Conditional, Expr, Operation},
    source::{ClassKind, MethodBody, MethodView, SourceView},
};

/// Layout settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrettyConfig {
    /// Spaces per nesting level.
    pub indentation: usize,
}

impl Default for PrettyConfig {
    fn default() -> Self {
        Self { indentation: 4 }
    }
}

struct Printer<'a> {
    config: &'a PrettyConfig,
    out: String,
}

impl Printer<'_> {
    fn line(&mut self, depth: usize, text: &str) {
        self.out.push_str(&" ".repeat(depth * self.config.indentation));
        self.out.push_str(text);
        self.out.push('\n');
    }
}

/// Render a class view as source text.
pub fn source(view: &SourceView, config: &PrettyConfig) -> String {
    let mut p = Printer { config, out: String::new() };

    if let Some(package) = &view.package {
        p.out.push_str(&format!("package {};\n\n", package));
    }
    let mut header = with_flags(&view.flags, &format!("{} {}", view.kind.keyword(), view.name));
    if let Some(super_name) = &view.super_name {
        header.push_str(&format!(" extends {}", super_name));
    }
    if !view.interfaces.is_empty() {
        // Interfaces extend their superinterfaces.
        let keyword = match view.kind {
            ClassKind::Interface | ClassKind::Annotation => "extends",
            ClassKind::Class | ClassKind::Enum => "implements",
        };
        header.push_str(&format!(" {} {}", keyword, view.interfaces.join(", ")));
    }
    p.line(0, &format!("{} {{", header));
    p.out.push('\n');

    for field in &view.fields {
        let mut text = with_flags(&field.flags, &format!("{} {}", field.ty, field.name));
        if let Some(value) = &field.value {
            text.push_str(&format!(" = {}", value));
        }
        p.line(1, &format!("{};", text));
    }
    p.out.push('\n');

    for method in &view.methods {
        method_text(&mut p, method);
        p.out.push('\n');
    }
    p.out.push('}');
    p.out
}

fn with_flags(flags: &[&str], rest: &str) -> String {
    if flags.is_empty() {
        rest.to_string()
    } else {
        format!("{} {}", flags.join(" "), rest)
    }
}

fn method_text(p: &mut Printer, method: &MethodView) {
    let params: Vec<String> = method
        .params
        .iter()
        .map(|param| match &param.name {
            Some(name) => format!("{} {}", param.ty, name),
            None => param.ty.clone(),
        })
        .collect();
    let signature = match &method.return_type {
        Some(ty) => format!("{} {}({})", ty, method.name, params.join(", ")),
        None => format!("{}({})", method.name, params.join(", ")),
    };
    let signature = with_flags(&method.flags, &signature);

    match &method.body {
        MethodBody::Absent => p.line(1, &format!("{};", signature)),
        MethodBody::Bytecode(opcodes) => {
            p.line(1, &format!("{} {{", signature));
            bytecode(p, opcodes);
            p.line(1, "}");
        }
        MethodBody::Source(ops) => {
            p.line(1, &format!("{} {{", signature));
            operations(p, 2, ops);
            p.line(1, "}");
        }
        MethodBody::Degraded { reason, bytecode: opcodes } => {
            p.line(1, &format!("{} {{", signature));
            p.line(2, &format!("// decompilation failed: {}", reason));
            bytecode(p, opcodes);
            p.line(1, "}");
        }
    }
}

fn bytecode(p: &mut Printer, opcodes: &[Opcode]) {
    for opcode in opcodes {
        p.line(2, &format!("{}: {}", opcode.position, opcode));
    }
}

fn operations(p: &mut Printer, depth: usize, ops: &[Operation]) {
    for op in ops {
        match op {
            Operation::Assignation(a) => p.line(depth, &assignation(a)),
            Operation::Return { value: Some(value) } => p.line(depth, &format!("return {};", value)),
            Operation::Return { value: None } => p.line(depth, "return;"),
            Operation::Throw { value } => p.line(depth, &format!("throw {};", value)),
            Operation::If(c) => conditional(p, depth, "if", c),
            Operation::While(c) => conditional(p, depth, "while", c),
            Operation::Call(call) => p.line(depth, &format!("{};", call)),
            Operation::Increment { variable, amount: 1 } => p.line(depth, &format!("++{};", variable)),
            Operation::Increment { variable, amount: -1 } => p.line(depth, &format!("--{};", variable)),
            Operation::Increment { variable, amount } if *amount < 0 => {
                p.line(depth, &format!("{} -= {};", variable, -(*amount as i64)))
            }
            Operation::Increment { variable, amount } => p.line(depth, &format!("{} += {};", variable, amount)),
            Operation::Comment { text } => p.line(depth, &format!("// Unimplemented {}", text)),
        }
    }
}

fn assignation(a: &Assignation) -> String {
    let mut text = String::new();
    if let Some(ty) = &a.lvalue_type {
        text.push_str(&as_class_name(ty));
        text.push(' ');
    }
    if let Some(object) = &a.lvalue_object {
        text.push_str(&format!("{}.", object.receiver()));
    }
    text.push_str(&a.lvalue);
    text.push_str(" = ");
    if a.is_new {
        text.push_str("new ");
    }
    text.push_str(&format!("{};", a.rvalue));
    text
}

fn conditional(p: &mut Printer, depth: usize, keyword: &str, c: &Conditional) {
    p.line(depth, &format!("{} ({} {} {}){{", keyword, operand(&c.left), c.comparator, operand(&c.right)));
    operations(p, depth + 1, &c.block);
    p.line(depth, "}");
}

/// Parenthesize operands that read as more than one token.
fn operand(e: &Expr) -> String {
    let text = e.to_string();
    if text.contains(' ') {
        format!("({})", text)
    } else {
        text
    }
}
