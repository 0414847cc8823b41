//! Synthesized variable names.
//!
//! Names are derived from a value's type and an index: parameters become
//! `{type}p_{k}`, locals `{type}_{n}` and temporaries `{type}_{position}`.
//! Each index is named once and the name is reused afterwards.

use fnv::FnvHashMap;
use rev_class_file::item::ids::{field::FieldType, method::MethodDescriptor};

/// Lowercased, package stripped type name with `[]` written as `s`.
pub fn type_stem(ty: &str) -> String {
    let simple = ty.rsplit(['/', '.']).next().unwrap_or(ty);
    simple.to_lowercase().replace("[]", "s")
}

/// What a local variable slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    This,
    /// Parameter, 1-based.
    Param(u16),
    /// Local declared in the body, 1-based.
    Local(u16),
}

/// How a method's parameters map onto local variable slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotLayout {
    is_static: bool,
    /// First slot of each parameter.
    params: Vec<u16>,
    first_local: u16,
}

impl SlotLayout {
    pub fn new(descriptor: &MethodDescriptor, is_static: bool) -> Self {
        let mut slot = if is_static { 0 } else { 1 };
        let mut params = Vec::with_capacity(descriptor.parameters.len());
        for param in &descriptor.parameters {
            params.push(slot);
            slot += param.slots();
        }
        Self { is_static, params, first_local: slot }
    }

    pub fn resolve(&self, slot: u16) -> Slot {
        if slot == 0 && !self.is_static {
            return Slot::This;
        }
        if slot >= self.first_local {
            return Slot::Local(slot - self.first_local + 1);
        }
        // the second half of a long or double parameter maps to that parameter
        let k = self.params.iter().rposition(|first| *first <= slot).unwrap_or(0);
        Slot::Param(k as u16 + 1)
    }
}

/// A name handed out for a local slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Local {
    pub name: String,
    pub ty: String,
    /// First time this slot was named.
    pub fresh: bool,
}

/// Memoized names for one method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Names {
    params: FnvHashMap<u16, (String, String)>,
    locals: FnvHashMap<u16, (String, String)>,
    temporaries: FnvHashMap<usize, String>,
}

impl Names {
    /// Names with every parameter of `descriptor` already assigned.
    pub fn for_method(descriptor: &MethodDescriptor) -> Self {
        let mut names = Self::default();
        for (k, param) in descriptor.parameters.iter().enumerate() {
            names.param(k as u16 + 1, &FieldType::to_string(param));
        }
        names
    }

    /// Name of parameter `k`.
    pub fn param(&mut self, k: u16, ty: &str) -> (String, String) {
        self.params
            .entry(k)
            .or_insert_with(|| (format!("{}p_{}", type_stem(ty), k), ty.to_string()))
            .clone()
    }

    /// Name of body local `n`.
    pub fn local(&mut self, n: u16, ty: &str) -> Local {
        let mut fresh = false;
        let (name, ty) = self
            .locals
            .entry(n)
            .or_insert_with(|| {
                fresh = true;
                (format!("{}_{}", type_stem(ty), n), ty.to_string())
            })
            .clone();
        Local { name, ty, fresh }
    }

    /// Name of the temporary holding the result of the instruction at `position`.
    pub fn temporary(&mut self, position: usize, ty: &str) -> String {
        self.temporaries
            .entry(position)
            .or_insert_with(|| format!("{}_{}", type_stem(ty), position))
            .clone()
    }

    /// Parameter names in declaration order.
    pub fn param_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.params.iter().map(|(k, (name, _))| (*k, name.clone())).collect();
        names.sort();
        names.into_iter().map(|(_, name)| name).collect()
    }
}
