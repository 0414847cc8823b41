//! Stack simulation over a method's disassembly.
//!
//! The opcodes are walked once, front to back. Loads and arithmetic build
//! expressions on a symbolic operand stack, stores and calls turn them into
//! statements. A conditional branch opens a block that collects statements
//! until the branch target is reached.

use log::{trace, warn};
use rev_class_file::{
    item::{
        constant_pool::{quote, ConstantPoolEntry},
        ids::{as_class_name, descriptor_to_type, method::MethodDescriptor},
        opcodes::{disassemble::array_type_name, Mnemonic, Opcode, Operand},
        ConstantPool,
    },
    ClassFileError,
};

use crate::{
    error::{DecompileError, Result},
    naming::{Names, Slot, SlotLayout},
    operation::{Assignation, Call, Comparator, Conditional, Expr, Operation},
};

/// Type of the value a load or store moves, by opcode family.
const LOCAL_TYPES: [&str; 5] = ["int", "long", "float", "double", "java/lang/Object"];

/// A value on the symbolic stack, with its type in internal form.
type Value = (Expr, String);

/// An open `if` or `while` block.
#[derive(Debug)]
struct Frame {
    left: Expr,
    comparator: Comparator,
    right: Expr,
    /// Position of the branch that opened the block.
    start: usize,
    border: usize,
    is_loop: bool,
    ops: Vec<Operation>,
}

impl Frame {
    fn close(self) -> Operation {
        let conditional = Conditional {
            left: self.left,
            comparator: self.comparator,
            right: self.right,
            block: self.ops,
            border: self.border,
        };
        if self.is_loop {
            Operation::While(conditional)
        } else {
            Operation::If(conditional)
        }
    }
}

/// Decompiler state for one method.
pub struct Decompiler<'a> {
    pool: &'a ConstantPool,
    /// Internal name of the class declaring the method.
    class_name: &'a str,
    opcodes: &'a [Opcode],
    layout: &'a SlotLayout,
    names: &'a mut Names,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    ops: Vec<Operation>,
}

/// Decompile one method body into statements.
pub fn decompile_method(
    pool: &ConstantPool,
    class_name: &str,
    opcodes: &[Opcode],
    layout: &SlotLayout,
    names: &mut Names,
) -> Result<Vec<Operation>> {
    Decompiler::new(pool, class_name, opcodes, layout, names).run()
}

impl<'a> Decompiler<'a> {
    pub fn new(
        pool: &'a ConstantPool,
        class_name: &'a str,
        opcodes: &'a [Opcode],
        layout: &'a SlotLayout,
        names: &'a mut Names,
    ) -> Self {
        Self {
            pool,
            class_name,
            opcodes,
            layout,
            names,
            stack: vec![],
            frames: vec![],
            ops: vec![],
        }
    }

    pub fn run(mut self) -> Result<Vec<Operation>> {
        let opcodes = self.opcodes;
        for (i, opcode) in opcodes.iter().enumerate() {
            self.close_frames(opcode.position);
            self.step(i, opcode)?;
        }
        self.close_frames(usize::MAX);
        Ok(self.ops)
    }

    fn close_frames(&mut self, position: usize) {
        while self.frames.last().map_or(false, |frame| frame.border <= position) {
            if let Some(frame) = self.frames.pop() {
                let op = frame.close();
                self.current().push(op);
            }
        }
    }

    /// The statement list of the innermost open block.
    fn current(&mut self) -> &mut Vec<Operation> {
        match self.frames.last_mut() {
            Some(frame) => &mut frame.ops,
            None => &mut self.ops,
        }
    }

    fn emit(&mut self, op: Operation) {
        self.current().push(op);
    }

    fn push(&mut self, expr: Expr, ty: impl Into<String>) {
        self.stack.push((expr, ty.into()));
    }

    fn pop(&mut self, opcode: &Opcode) -> Result<Value> {
        self.stack.pop().ok_or(DecompileError::StackUnderflow {
            position: opcode.position,
            mnemonic: opcode.mnemonic,
        })
    }

    /// Pop `n` values, returned in the order they were pushed.
    fn pop_n(&mut self, opcode: &Opcode, n: usize) -> Result<Vec<Expr>> {
        if self.stack.len() < n {
            return Err(DecompileError::StackUnderflow {
                position: opcode.position,
                mnemonic: opcode.mnemonic,
            });
        }
        let at = self.stack.len() - n;
        Ok(self.stack.drain(at..).map(|(expr, _)| expr).collect())
    }

    fn peek(&self, opcode: &Opcode) -> Result<Value> {
        self.stack.last().cloned().ok_or(DecompileError::StackUnderflow {
            position: opcode.position,
            mnemonic: opcode.mnemonic,
        })
    }

    fn constant_index(&self, opcode: &Opcode) -> Result<u16> {
        let position = opcode.position;
        opcode
            .constant_index()
            .ok_or_else(|| ClassFileError::TruncatedInstruction { position }.into())
    }

    /// Owner of a static member, `None` for members of this class.
    fn static_owner(&self, class: &str) -> Option<Box<Expr>> {
        if class == self.class_name {
            None
        } else {
            Some(Box::new(Expr::Name(as_class_name(class))))
        }
    }

    fn step(&mut self, i: usize, opcode: &Opcode) -> Result<()> {
        use Mnemonic::*;

        let pool = self.pool;
        trace!("{:>5}: {} (stack {})", opcode.position, opcode, self.stack.len());
        if let Some((is_store, kind, slot)) = local_access(opcode) {
            return if is_store {
                self.store(opcode, kind, slot)
            } else {
                self.load(kind, slot);
                Ok(())
            };
        }

        if let Some((expr, ty)) = loaded_constant(pool, opcode)? {
            self.push(expr, ty);
            return Ok(());
        }
        if opcode.mnemonic.is_conditional_branch() {
            return self.branch(opcode);
        }

        match opcode.mnemonic {
            nop => {}

            // Constants
            aconst_null => self.push(Expr::Literal("null".into()), "java/lang/Object"),

            // Arrays
            iaload | laload | faload | daload | aaload | baload | caload | saload => {
                let (index, _) = self.pop(opcode)?;
                let (array, array_ty) = self.pop(opcode)?;
                let ty = match array_ty.strip_suffix("[]") {
                    Some(element) => element.to_string(),
                    None => array_element_type(opcode.mnemonic).to_string(),
                };
                let expr = Expr::ArrayElement { array: Box::new(array), index: Box::new(index) };
                self.push(expr, ty);
            }
            iastore | lastore | fastore | dastore | aastore | bastore | castore | sastore => {
                let (rvalue, _) = self.pop(opcode)?;
                let (index, _) = self.pop(opcode)?;
                let (array, _) = self.pop(opcode)?;
                self.emit(Operation::Assignation(Assignation {
                    lvalue_type: None,
                    lvalue_object: None,
                    lvalue: format!("{}[{}]", array, index),
                    rvalue,
                    is_new: false,
                }));
            }
            newarray => {
                let (length, _) = self.pop(opcode)?;
                let ty = opcode
                    .operands
                    .iter()
                    .find_map(|o| match o {
                        Operand::ArrayType(t) => array_type_name(*t),
                        _ => None,
                    })
                    .unwrap_or("int");
                self.push(Expr::NewArray { ty: ty.to_string(), lengths: vec![length] }, format!("{}[]", ty));
            }
            anewarray => {
                let (length, _) = self.pop(opcode)?;
                let class = pool.class_name(self.constant_index(opcode)?)?;
                let ty = format!("{}[]", class);
                self.push(Expr::NewArray { ty: as_class_name(class), lengths: vec![length] }, ty);
            }
            multianewarray => {
                let class = pool.class_name(self.constant_index(opcode)?)?;
                let dimensions = opcode.literal().unwrap_or(1).max(1) as usize;
                let lengths = self.pop_n(opcode, dimensions)?;
                let ty = descriptor_to_type(class).unwrap_or_else(|_| class.to_string());
                let mut element = ty.as_str();
                for _ in 0..dimensions {
                    element = element.strip_suffix("[]").unwrap_or(element);
                }
                self.push(Expr::NewArray { ty: as_class_name(element), lengths }, ty.clone());
            }
            arraylength => {
                let (array, _) = self.pop(opcode)?;
                self.push(Expr::Field { object: Some(Box::new(array)), name: "length".into() }, "int");
            }

            // Stack
            pop => {
                self.pop(opcode)?;
            }
            pop2 => {
                let (_, ty) = self.pop(opcode)?;
                if !is_wide(&ty) {
                    self.pop(opcode)?;
                }
            }
            dup => {
                let top = self.peek(opcode)?;
                self.stack.push(top);
            }
            dup_x1 => {
                let v1 = self.pop(opcode)?;
                let v2 = self.pop(opcode)?;
                self.stack.extend([v1.clone(), v2, v1]);
            }
            dup_x2 => {
                let v1 = self.pop(opcode)?;
                let v2 = self.pop(opcode)?;
                if is_wide(&v2.1) {
                    self.stack.extend([v1.clone(), v2, v1]);
                } else {
                    let v3 = self.pop(opcode)?;
                    self.stack.extend([v1.clone(), v3, v2, v1]);
                }
            }
            dup2 => {
                let v1 = self.pop(opcode)?;
                if is_wide(&v1.1) {
                    self.stack.extend([v1.clone(), v1]);
                } else {
                    let v2 = self.pop(opcode)?;
                    self.stack.extend([v2.clone(), v1.clone(), v2, v1]);
                }
            }
            dup2_x1 => {
                let v1 = self.pop(opcode)?;
                if is_wide(&v1.1) {
                    let v2 = self.pop(opcode)?;
                    self.stack.extend([v1.clone(), v2, v1]);
                } else {
                    let v2 = self.pop(opcode)?;
                    let v3 = self.pop(opcode)?;
                    self.stack.extend([v2.clone(), v1.clone(), v3, v2, v1]);
                }
            }
            swap => {
                let v1 = self.pop(opcode)?;
                let v2 = self.pop(opcode)?;
                self.stack.extend([v1, v2]);
            }

            // Arithmetic
            iadd | ladd | fadd | dadd => self.binary(opcode, "+")?,
            isub | lsub | fsub | dsub => self.binary(opcode, "-")?,
            imul | lmul | fmul | dmul => self.binary(opcode, "*")?,
            idiv | ldiv | fdiv | ddiv => self.binary(opcode, "/")?,
            irem | lrem | frem | drem => self.binary(opcode, "%")?,
            ishl | lshl => self.binary(opcode, "<<")?,
            ishr | lshr => self.binary(opcode, ">>")?,
            iushr | lushr => self.binary(opcode, ">>>")?,
            iand | land => self.binary(opcode, "&")?,
            ior | lor => self.binary(opcode, "|")?,
            ixor | lxor => self.binary(opcode, "^")?,
            ineg | lneg | fneg | dneg => {
                let (value, ty) = self.pop(opcode)?;
                self.push(Expr::Negate(Box::new(value)), ty);
            }
            iinc => {
                let slot = opcode.local().unwrap_or_default();
                let variable = self.slot_name(slot, "int");
                let amount = opcode.literal().unwrap_or_default();
                self.emit(Operation::Increment { variable, amount });
            }

            // Conversions
            i2l | f2l | d2l => self.cast(opcode, "long")?,
            i2f | l2f | d2f => self.cast(opcode, "float")?,
            i2d | l2d | f2d => self.cast(opcode, "double")?,
            l2i | f2i | d2i => self.cast(opcode, "int")?,
            i2b => self.cast(opcode, "byte")?,
            i2c => self.cast(opcode, "char")?,
            i2s => self.cast(opcode, "short")?,
            checkcast => {
                let (value, _) = self.pop(opcode)?;
                let class = pool.class_name(self.constant_index(opcode)?)?;
                let expr = Expr::Cast { ty: as_class_name(class), value: Box::new(value) };
                self.push(expr, class.to_string());
            }
            instanceof => {
                let (value, _) = self.pop(opcode)?;
                let class = pool.class_name(self.constant_index(opcode)?)?;
                self.push(Expr::binary(value, "instanceof", Expr::Name(as_class_name(class))), "boolean");
            }

            // Comparisons
            lcmp | fcmpl | fcmpg | dcmpl | dcmpg => {
                let (right, _) = self.pop(opcode)?;
                let (left, _) = self.pop(opcode)?;
                self.push(Expr::Compare { left: Box::new(left), right: Box::new(right) }, "int");
            }
            goto | goto_w => {
                // A jump from the end of a block back above its condition makes it a loop.
                let next = self.opcodes.get(i + 1).map(|o| o.position);
                let target = opcode.branch_target();
                let closes_loop = self.frames.last().map_or(false, |frame| {
                    next == Some(frame.border) && target.map_or(false, |t| t <= frame.start)
                });
                match self.frames.last_mut() {
                    Some(frame) if closes_loop => frame.is_loop = true,
                    _ => self.emit(Operation::Comment { text: opcode.to_string() }),
                }
            }
            tableswitch | lookupswitch | monitorenter | monitorexit => {
                self.pop(opcode)?;
                self.emit(Operation::Comment { text: opcode.to_string() });
            }

            // Returns
            ireturn | lreturn | freturn | dreturn | areturn => {
                let (value, _) = self.pop(opcode)?;
                self.emit(Operation::Return { value: Some(value) });
            }
            r#return => {
                if i + 1 != self.opcodes.len() {
                    self.emit(Operation::Return { value: None });
                }
            }
            athrow => {
                let (value, _) = self.pop(opcode)?;
                self.emit(Operation::Throw { value });
            }

            // Fields
            getfield => {
                let index = self.constant_index(opcode)?;
                let field = pool.field_ref(index)?;
                let ty = descriptor_to_type(field.descriptor)?;
                let (object, _) = self.pop(opcode)?;
                self.push(Expr::Field { object: object.qualifier(), name: field.name.to_string() }, ty);
            }
            getstatic => {
                let index = self.constant_index(opcode)?;
                let field = pool.field_ref(index)?;
                let ty = descriptor_to_type(field.descriptor)?;
                let object = self.static_owner(field.class_name);
                self.push(Expr::Field { object, name: field.name.to_string() }, ty);
            }
            putfield => {
                let index = self.constant_index(opcode)?;
                let field = pool.field_ref(index)?;
                let (rvalue, _) = self.pop(opcode)?;
                let (object, _) = self.pop(opcode)?;
                self.emit(Operation::Assignation(Assignation {
                    lvalue_type: None,
                    lvalue_object: object.qualifier(),
                    lvalue: field.name.to_string(),
                    rvalue,
                    is_new: false,
                }));
            }
            putstatic => {
                let index = self.constant_index(opcode)?;
                let field = pool.field_ref(index)?;
                let (rvalue, _) = self.pop(opcode)?;
                self.emit(Operation::Assignation(Assignation {
                    lvalue_type: None,
                    lvalue_object: self.static_owner(field.class_name),
                    lvalue: field.name.to_string(),
                    rvalue,
                    is_new: false,
                }));
            }

            // Objects and calls
            new => {
                let class = pool.class_name(self.constant_index(opcode)?)?;
                let temporary = self.names.temporary(opcode.position, class);
                self.emit(Operation::Assignation(Assignation {
                    lvalue_type: Some(class.to_string()),
                    lvalue_object: None,
                    lvalue: temporary.clone(),
                    rvalue: Expr::Call(Call { object: None, name: as_class_name(class), arguments: vec![] }),
                    is_new: true,
                }));
                self.push(Expr::Name(temporary), class);
            }
            invokespecial => self.invoke_special(i, opcode)?,
            invokevirtual | invokeinterface => self.invoke(i, opcode, false)?,
            invokestatic => self.invoke(i, opcode, true)?,
            invokedynamic => self.invoke_dynamic(i, opcode)?,

            _ => self.emit(Operation::Comment { text: opcode.to_string() }),
        }
        Ok(())
    }

    fn load(&mut self, kind: usize, slot: u16) {
        let fallback = LOCAL_TYPES[kind];
        match self.layout.resolve(slot) {
            Slot::This => self.push(Expr::This, self.class_name),
            Slot::Param(k) => {
                let (name, ty) = self.names.param(k, fallback);
                self.push(Expr::Name(name), ty);
            }
            Slot::Local(n) => {
                let local = self.names.local(n, fallback);
                self.push(Expr::Name(local.name), local.ty);
            }
        }
    }

    fn store(&mut self, opcode: &Opcode, kind: usize, slot: u16) -> Result<()> {
        let (rvalue, value_ty) = self.pop(opcode)?;
        let ty = if kind == 4 { value_ty } else { LOCAL_TYPES[kind].to_string() };
        let (lvalue, lvalue_type) = match self.layout.resolve(slot) {
            Slot::This => ("this".to_string(), None),
            Slot::Param(k) => (self.names.param(k, &ty).0, None),
            Slot::Local(n) => {
                let local = self.names.local(n, &ty);
                let declared = local.fresh.then(|| local.ty.clone());
                (local.name, declared)
            }
        };

        // `T t = new T(...)`: name the object after the variable it is stored in.
        if let Expr::Name(temporary) = &rvalue {
            if let Some(Operation::Assignation(a)) = self.current().last_mut() {
                if a.is_new && a.lvalue == *temporary {
                    a.lvalue = lvalue;
                    a.lvalue_type = lvalue_type;
                    return Ok(());
                }
            }
        }

        self.emit(Operation::Assignation(Assignation {
            lvalue_type,
            lvalue_object: None,
            lvalue,
            rvalue,
            is_new: false,
        }));
        Ok(())
    }

    fn slot_name(&mut self, slot: u16, ty: &str) -> String {
        match self.layout.resolve(slot) {
            Slot::This => "this".to_string(),
            Slot::Param(k) => self.names.param(k, ty).0,
            Slot::Local(n) => self.names.local(n, ty).name,
        }
    }

    fn binary(&mut self, opcode: &Opcode, op: &'static str) -> Result<()> {
        let (right, _) = self.pop(opcode)?;
        let (left, ty) = self.pop(opcode)?;
        self.push(Expr::binary(left, op, right), ty);
        Ok(())
    }

    fn cast(&mut self, opcode: &Opcode, ty: &str) -> Result<()> {
        let (value, _) = self.pop(opcode)?;
        self.push(Expr::Cast { ty: ty.to_string(), value: Box::new(value) }, ty);
        Ok(())
    }

    /// Pop the operands of a conditional branch and open its frame.
    fn branch(&mut self, opcode: &Opcode) -> Result<()> {
        use Mnemonic::*;

        let (left, right) = match opcode.mnemonic {
            ifnull | ifnonnull => (self.pop(opcode)?.0, Expr::Literal("null".into())),
            ifeq | ifne | iflt | ifge | ifgt | ifle => match self.pop(opcode)?.0 {
                Expr::Compare { left, right } => (*left, *right),
                value => (value, Expr::Literal("0".into())),
            },
            _ => {
                let (right, _) = self.pop(opcode)?;
                let (left, _) = self.pop(opcode)?;
                (left, right)
            }
        };
        self.open_frame(opcode, left, right);
        Ok(())
    }

    fn open_frame(&mut self, opcode: &Opcode, left: Expr, right: Expr) {
        let comparator = Comparator::for_branch(opcode.mnemonic);
        match (comparator, opcode.branch_target()) {
            (Some(comparator), Some(border)) if border > opcode.position => {
                self.frames.push(Frame {
                    left,
                    comparator,
                    right,
                    start: opcode.position,
                    border,
                    is_loop: false,
                    ops: vec![],
                });
            }
            // backward conditional jumps close loops we do not reconstruct
            _ => self.emit(Operation::Comment { text: opcode.to_string() }),
        }
    }

    fn invoke_special(&mut self, i: usize, opcode: &Opcode) -> Result<()> {
        let pool = self.pool;
        let index = self.constant_index(opcode)?;
        let method = pool.method_ref(index)?;
        if method.name != "<init>" {
            return self.invoke(i, opcode, false);
        }

        let descriptor = MethodDescriptor::parse(method.descriptor)?;
        let arguments = self.pop_n(opcode, descriptor.parameters.len())?;
        match self.pop(opcode)?.0 {
            // super(...) and this(...) are not reconstructed
            Expr::This => {}
            Expr::Name(temporary) => match self.find_new(&temporary) {
                Some(Assignation { rvalue: Expr::Call(call), .. }) => call.arguments = arguments,
                _ => warn!("constructor call at {} has no matching new", opcode.position),
            },
            _ => warn!("constructor call at {} on an unexpected receiver", opcode.position),
        }
        Ok(())
    }

    /// The `new` assignation that created `temporary`.
    fn find_new(&mut self, temporary: &str) -> Option<&mut Assignation> {
        self.frames
            .iter_mut()
            .rev()
            .map(|frame| &mut frame.ops)
            .chain(std::iter::once(&mut self.ops))
            .flat_map(|ops| ops.iter_mut().rev())
            .find_map(|op| match op {
                Operation::Assignation(a) if a.is_new && a.lvalue == temporary => Some(a),
                _ => None,
            })
    }

    fn invoke(&mut self, i: usize, opcode: &Opcode, is_static: bool) -> Result<()> {
        let pool = self.pool;
        let index = self.constant_index(opcode)?;
        let method = pool.method_ref(index)?;
        let descriptor = MethodDescriptor::parse(method.descriptor)?;
        let arguments = self.pop_n(opcode, descriptor.parameters.len())?;
        let object = if is_static {
            self.static_owner(method.class_name)
        } else {
            self.pop(opcode)?.0.qualifier()
        };
        let call = Call { object, name: method.name.to_string(), arguments };
        self.finish_call(i, opcode, call, &descriptor);
        Ok(())
    }

    fn invoke_dynamic(&mut self, i: usize, opcode: &Opcode) -> Result<()> {
        let pool = self.pool;
        let index = self.constant_index(opcode)?;
        let name_and_type_index = match pool.get(index)? {
            ConstantPoolEntry::Dynamic { name_and_type_index, .. } => *name_and_type_index,
            _ => {
                return Err(ClassFileError::UnexpectedConstant { index, expected: "InvokeDynamic" }.into())
            }
        };
        let (name, descriptor) = pool.name_and_type(name_and_type_index)?;
        let descriptor = MethodDescriptor::parse(descriptor)?;
        let arguments = self.pop_n(opcode, descriptor.parameters.len())?;
        let call = Call { object: None, name: name.to_string(), arguments };
        self.finish_call(i, opcode, call, &descriptor);
        Ok(())
    }

    /// Emit a call as a statement, or keep its result for the next instruction.
    fn finish_call(&mut self, i: usize, opcode: &Opcode, call: Call, descriptor: &MethodDescriptor) {
        if descriptor.return_desc.is_void() {
            self.emit(Operation::Call(call));
            return;
        }

        let ty = descriptor.return_desc.to_string();
        let stored_in_field = self
            .opcodes
            .get(i + 1)
            .map_or(false, |next| matches!(next.mnemonic, Mnemonic::putfield | Mnemonic::putstatic));
        if stored_in_field {
            self.push(Expr::Call(call), ty);
            return;
        }

        let temporary = self.names.temporary(opcode.position, &ty);
        self.emit(Operation::Assignation(Assignation {
            lvalue_type: Some(ty.clone()),
            lvalue_object: None,
            lvalue: temporary.clone(),
            rvalue: Expr::Call(call),
            is_new: false,
        }));
        self.push(Expr::Name(temporary), ty);
    }
}

/// `(is_store, type family, slot)` of a local variable load or store.
fn local_access(opcode: &Opcode) -> Option<(bool, usize, u16)> {
    let code = opcode.mnemonic.code();
    let (is_store, kind, slot) = match code {
        0x15..=0x19 => (false, code - 0x15, opcode.local()?),
        0x1a..=0x2d => (false, (code - 0x1a) / 4, ((code - 0x1a) % 4) as u16),
        0x36..=0x3a => (true, code - 0x36, opcode.local()?),
        0x3b..=0x4e => (true, (code - 0x3b) / 4, ((code - 0x3b) % 4) as u16),
        _ => return None,
    };
    Some((is_store, kind as usize, slot))
}

fn array_element_type(mnemonic: Mnemonic) -> &'static str {
    match mnemonic {
        Mnemonic::laload => "long",
        Mnemonic::faload => "float",
        Mnemonic::daload => "double",
        Mnemonic::aaload => "java/lang/Object",
        Mnemonic::baload => "byte",
        Mnemonic::caload => "char",
        Mnemonic::saload => "short",
        _ => "int",
    }
}

fn is_wide(ty: &str) -> bool {
    ty == "long" || ty == "double"
}

/// The value a constant load pushes, `None` for any other instruction.
pub(crate) fn loaded_constant(pool: &ConstantPool, opcode: &Opcode) -> Result<Option<Value>> {
    use Mnemonic::*;

    let mnemonic = opcode.mnemonic;
    let (text, ty) = match mnemonic {
        iconst_m1 | iconst_0 | iconst_1 | iconst_2 | iconst_3 | iconst_4 | iconst_5 => {
            ((mnemonic.code() as i32 - iconst_0.code() as i32).to_string(), "int")
        }
        lconst_0 | lconst_1 => (long_literal((mnemonic.code() - lconst_0.code()) as i64), "long"),
        fconst_0 | fconst_1 | fconst_2 => (float_literal((mnemonic.code() - fconst_0.code()) as f32), "float"),
        dconst_0 | dconst_1 => (double_literal((mnemonic.code() - dconst_0.code()) as f64), "double"),
        bipush | sipush => (opcode.literal().unwrap_or_default().to_string(), "int"),
        ldc | ldc_w | ldc2_w => {
            let index = opcode
                .constant_index()
                .ok_or(ClassFileError::TruncatedInstruction { position: opcode.position })?;
            return constant(pool, index).map(Some);
        }
        _ => return Ok(None),
    };
    Ok(Some((Expr::Literal(text), ty.to_string())))
}

/// A loadable constant as an expression, with its type.
fn constant(pool: &ConstantPool, index: u16) -> Result<Value> {
    let (text, ty) = match pool.get(index)? {
        ConstantPoolEntry::Integer { value } => (value.to_string(), "int"),
        ConstantPoolEntry::Float { value } => (float_literal(*value), "float"),
        ConstantPoolEntry::Long { value } => (long_literal(*value), "long"),
        ConstantPoolEntry::Double { value } => (double_literal(*value), "double"),
        ConstantPoolEntry::String { string, .. } => (quote(string), "java/lang/String"),
        ConstantPoolEntry::Class { name, .. } => (format!("{}.class", as_class_name(name)), "java/lang/Class"),
        _ => (pool.literal(index)?, "java/lang/Object"),
    };
    Ok((Expr::Literal(text), ty.to_string()))
}

pub fn long_literal(value: i64) -> String {
    format!("{}L", value)
}

pub fn float_literal(value: f32) -> String {
    match decimal(value as f64, "Float") {
        Some(special) => special,
        None => format!("{}f", value_text(value.to_string())),
    }
}

pub fn double_literal(value: f64) -> String {
    decimal(value, "Double").unwrap_or_else(|| value_text(value.to_string()))
}

/// Names for values without a literal form.
fn decimal(value: f64, class: &str) -> Option<String> {
    if value.is_nan() {
        Some(format!("{}.NaN", class))
    } else if value == f64::INFINITY {
        Some(format!("{}.POSITIVE_INFINITY", class))
    } else if value == f64::NEG_INFINITY {
        Some(format!("{}.NEGATIVE_INFINITY", class))
    } else {
        None
    }
}

/// Make sure a floating point number reads as one.
fn value_text(text: String) -> String {
    if text.contains(['.', 'e', 'E']) {
        text
    } else {
        text + ".0"
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rev_class_file::item::{
        constant_pool::{ConstantPool, ConstantPoolEntry},
        ids::method::MethodDescriptor,
        opcodes::{disassemble, Mnemonic},
    };

    use super::{decompile_method, double_literal, float_literal, Decompiler};
    use crate::{
        error::DecompileError,
        naming::{Names, SlotLayout},
        operation::{Assignation, Call, Comparator, Conditional, Expr, Operation},
    };

    fn pool() -> ConstantPool {
        use ConstantPoolEntry::*;
        let utf8 = |s: &str| Utf8 { data: s.to_string() };
        ConstantPool {
            entries: vec![
                /* 1 */ Class { name_index: 2, name: "Point".into() },
                /* 2 */ utf8("Point"),
                /* 3 */ Methodref { class_index: 1, name_and_type_index: 4 },
                /* 4 */ NameAndType { name_index: 5, descriptor_index: 6, name: "<init>".into(), descriptor: "(I)V".into() },
                /* 5 */ utf8("<init>"),
                /* 6 */ utf8("(I)V"),
                /* 7 */ Fieldref { class_index: 1, name_and_type_index: 8 },
                /* 8 */ NameAndType { name_index: 9, descriptor_index: 10, name: "x".into(), descriptor: "I".into() },
                /* 9 */ utf8("x"),
                /* 10 */ utf8("I"),
                /* 11 */ Methodref { class_index: 1, name_and_type_index: 12 },
                /* 12 */ NameAndType { name_index: 13, descriptor_index: 14, name: "size".into(), descriptor: "()I".into() },
                /* 13 */ utf8("size"),
                /* 14 */ utf8("()I"),
                /* 15 */ Long { value: 7 },
                /* 16 */ Reserved,
            ],
        }
    }

    fn run(descriptor: &str, is_static: bool, code: &[u8]) -> Result<Vec<Operation>, DecompileError> {
        let pool = pool();
        let opcodes = disassemble(code, &pool).unwrap();
        let descriptor = MethodDescriptor::parse(descriptor).unwrap();
        let layout = SlotLayout::new(&descriptor, is_static);
        let mut names = Names::for_method(&descriptor);
        decompile_method(&pool, "Point", &opcodes, &layout, &mut names)
    }

    fn name(s: &str) -> Expr {
        Expr::Name(s.to_string())
    }

    fn lit(s: &str) -> Expr {
        Expr::Literal(s.to_string())
    }

    #[test]
    fn if_then_return() {
        // if (a == b) return 1; return 0;
        let code = [0x1b, 0x1c, 0xa0, 0x00, 0x05, 0x04, 0xac, 0x03, 0xac];
        let ops = run("(II)I", false, &code).unwrap();
        assert_eq!(
            ops,
            vec![
                Operation::If(Conditional {
                    left: name("intp_1"),
                    comparator: Comparator::Eq,
                    right: name("intp_2"),
                    block: vec![Operation::Return { value: Some(lit("1")) }],
                    border: 7,
                }),
                Operation::Return { value: Some(lit("0")) },
            ]
        );
    }

    #[test]
    fn while_loop_consumes_back_jump() {
        // while (a == b) { ++a; }
        let code = [0x1b, 0x1c, 0xa0, 0x00, 0x09, 0x84, 0x01, 0x01, 0xa7, 0xff, 0xf8, 0xb1];
        let ops = run("(II)V", false, &code).unwrap();
        assert_eq!(
            ops,
            vec![Operation::While(Conditional {
                left: name("intp_1"),
                comparator: Comparator::Eq,
                right: name("intp_2"),
                block: vec![Operation::Increment { variable: "intp_1".into(), amount: 1 }],
                border: 11,
            })]
        );
    }

    #[test]
    fn forward_goto_is_a_comment() {
        // if (a == 0) { a = 1; } else { a = 2; }
        let code = [0x1b, 0x9a, 0x00, 0x08, 0x04, 0x3c, 0xa7, 0x00, 0x05, 0x05, 0x3c, 0xb1];
        let ops = run("(I)V", false, &code).unwrap();
        let assign = |v: &str| {
            Operation::Assignation(Assignation {
                lvalue_type: None,
                lvalue_object: None,
                lvalue: "intp_1".into(),
                rvalue: lit(v),
                is_new: false,
            })
        };
        assert_eq!(
            ops,
            vec![
                Operation::If(Conditional {
                    left: name("intp_1"),
                    comparator: Comparator::Eq,
                    right: lit("0"),
                    block: vec![assign("1"), Operation::Comment { text: "goto 11".into() }],
                    border: 9,
                }),
                assign("2"),
            ]
        );
    }

    #[test]
    fn long_comparison_folds_into_condition() {
        // static: if (l > 7L) return;  (lload_0, ldc2_w, lcmp, ifle)
        let code = [0x1e, 0x14, 0x00, 0x0f, 0x94, 0x9e, 0x00, 0x04, 0xb1, 0xb1];
        let ops = run("(J)V", true, &code).unwrap();
        assert_eq!(
            ops,
            vec![Operation::If(Conditional {
                left: name("longp_1"),
                comparator: Comparator::Gt,
                right: lit("7L"),
                block: vec![Operation::Return { value: None }],
                border: 9,
            })]
        );
    }

    #[test]
    fn new_dup_init_store() {
        // Point point_1 = new Point(3);
        let code = [0xbb, 0x00, 0x01, 0x59, 0x06, 0xb7, 0x00, 0x03, 0x4c, 0xb1];
        let ops = run("()V", false, &code).unwrap();
        assert_eq!(
            ops,
            vec![Operation::Assignation(Assignation {
                lvalue_type: Some("Point".into()),
                lvalue_object: None,
                lvalue: "point_1".into(),
                rvalue: Expr::Call(Call { object: None, name: "Point".into(), arguments: vec![lit("3")] }),
                is_new: true,
            })]
        );
    }

    #[test]
    fn call_result_feeds_field_store() {
        // this.x = this.size(); return this.x;
        let code = [0x2a, 0x2a, 0xb6, 0x00, 0x0b, 0xb5, 0x00, 0x07, 0x2a, 0xb4, 0x00, 0x07, 0xac];
        let ops = run("()I", false, &code).unwrap();
        assert_eq!(
            ops,
            vec![
                Operation::Assignation(Assignation {
                    lvalue_type: None,
                    lvalue_object: None,
                    lvalue: "x".into(),
                    rvalue: Expr::Call(Call { object: None, name: "size".into(), arguments: vec![] }),
                    is_new: false,
                }),
                Operation::Return { value: Some(Expr::Field { object: None, name: "x".into() }) },
            ]
        );
    }

    #[test]
    fn call_result_gets_a_temporary() {
        // return size() + 1;
        let code = [0x2a, 0xb6, 0x00, 0x0b, 0x04, 0x60, 0xac];
        let ops = run("()I", false, &code).unwrap();
        assert_eq!(
            ops,
            vec![
                Operation::Assignation(Assignation {
                    lvalue_type: Some("int".into()),
                    lvalue_object: None,
                    lvalue: "int_1".into(),
                    rvalue: Expr::Call(Call { object: None, name: "size".into(), arguments: vec![] }),
                    is_new: false,
                }),
                Operation::Return { value: Some(Expr::binary(name("int_1"), "+", lit("1"))) },
            ]
        );
    }

    #[test]
    fn locals_are_declared_once() {
        // int a = 1; a = 2; return a;
        let code = [0x04, 0x3b, 0x05, 0x3b, 0x1a, 0xac];
        let ops = run("()I", true, &code).unwrap();
        let types: Vec<_> = ops
            .iter()
            .filter_map(|op| match op {
                Operation::Assignation(a) => Some(a.lvalue_type.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(types, vec![Some("int".to_string()), None]);
        assert_eq!(ops[2], Operation::Return { value: Some(name("int_1")) });
    }

    #[test]
    fn stack_is_balanced_at_returns() {
        // x = a + b * 2; return x; with x a field
        let code = [0x2a, 0x1b, 0x1c, 0x05, 0x68, 0x60, 0xb5, 0x00, 0x07, 0x2a, 0xb4, 0x00, 0x07, 0xac];
        let pool = pool();
        let opcodes = disassemble(&code, &pool).unwrap();
        let descriptor = MethodDescriptor::parse("(II)I").unwrap();
        let layout = SlotLayout::new(&descriptor, false);
        let mut names = Names::for_method(&descriptor);
        let mut decompiler = Decompiler::new(&pool, "Point", &opcodes, &layout, &mut names);
        for (i, opcode) in opcodes.iter().enumerate() {
            if opcode.mnemonic.is_return() {
                assert_eq!(decompiler.stack.len(), 1, "at {}", opcode.position);
            }
            decompiler.step(i, opcode).unwrap();
        }
        assert!(decompiler.stack.is_empty());
        match &decompiler.ops[0] {
            Operation::Assignation(a) => assert_eq!(a.rvalue.to_string(), "intp_1 + intp_2 * 2"),
            op => panic!("unexpected {:?}", op),
        }
    }

    #[test]
    fn grouped_arithmetic_keeps_parentheses() {
        // return (a + b) * 2;
        let ops = run("(II)I", false, &[0x1b, 0x1c, 0x60, 0x05, 0x68, 0xac]).unwrap();
        match &ops[..] {
            [Operation::Return { value: Some(value) }] => assert_eq!(value.to_string(), "(intp_1 + intp_2) * 2"),
            ops => panic!("unexpected {:?}", ops),
        }

        // return (int) (l + 7L);
        let ops = run("(J)I", false, &[0x1f, 0x14, 0x00, 0x0f, 0x61, 0x88, 0xac]).unwrap();
        match &ops[..] {
            [Operation::Return { value: Some(value) }] => assert_eq!(value.to_string(), "(int) (longp_1 + 7L)"),
            ops => panic!("unexpected {:?}", ops),
        }

        // return a - (b - 1);
        let ops = run("(II)I", false, &[0x1b, 0x1c, 0x04, 0x64, 0x64, 0xac]).unwrap();
        match &ops[..] {
            [Operation::Return { value: Some(value) }] => assert_eq!(value.to_string(), "intp_1 - (intp_2 - 1)"),
            ops => panic!("unexpected {:?}", ops),
        }
    }

    #[test]
    fn reference_branches() {
        // if (o == null) return; (ifnonnull skips the block)
        let ops = run("(Ljava/lang/Object;)V", false, &[0x2b, 0xc7, 0x00, 0x04, 0xb1, 0xb1]).unwrap();
        assert_eq!(
            ops,
            vec![Operation::If(Conditional {
                left: name("objectp_1"),
                comparator: Comparator::Eq,
                right: lit("null"),
                block: vec![Operation::Return { value: None }],
                border: 5,
            })]
        );

        // if (o == this) return;
        let ops = run("(Ljava/lang/Object;)V", false, &[0x2b, 0x2a, 0xa6, 0x00, 0x04, 0xb1, 0xb1]).unwrap();
        assert_eq!(
            ops,
            vec![Operation::If(Conditional {
                left: name("objectp_1"),
                comparator: Comparator::Eq,
                right: Expr::This,
                block: vec![Operation::Return { value: None }],
                border: 6,
            })]
        );

        let err = run("()V", true, &[0xc6, 0x00, 0x03, 0xb1]).unwrap_err();
        assert_eq!(err, DecompileError::StackUnderflow { position: 0, mnemonic: Mnemonic::ifnull });
    }

    #[test]
    fn underflow_is_an_error() {
        let err = run("()V", true, &[0x57, 0xb1]).unwrap_err();
        assert_eq!(err, DecompileError::StackUnderflow { position: 0, mnemonic: Mnemonic::pop });
    }

    #[test]
    fn unknown_instructions_become_comments() {
        let ops = run("()V", true, &[0xa8, 0x00, 0x04, 0xb1]).unwrap();
        assert_eq!(ops, vec![Operation::Comment { text: "jsr 4".into() }]);
    }

    #[test]
    fn floating_literals() {
        assert_eq!(float_literal(1.0), "1.0f");
        assert_eq!(float_literal(0.5), "0.5f");
        assert_eq!(double_literal(2.0), "2.0");
        assert_eq!(double_literal(f64::NAN), "Double.NaN");
        assert_eq!(float_literal(f32::NEG_INFINITY), "Float.NEGATIVE_INFINITY");
    }
}
