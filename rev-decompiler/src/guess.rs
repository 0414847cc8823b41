//! Initial field values recovered from constructor bytecode.

use log::{debug, warn};
use rev_class_file::item::{
    constant_pool::ConstantPool,
    methods::MethodAccessFlags,
    opcodes::{Mnemonic, Opcode},
};

use crate::{
    decompile::loaded_constant,
    model::{Field, Method},
};

/// Fill in [`Field::guessed_value`] for fields without a `ConstantValue`.
///
/// The last non-public `<init>` is searched for a constant load directly
/// followed by a `putfield` of the field. When a field is stored several
/// times the last store wins.
pub fn guess_field_values(fields: &mut [Field], methods: &[Method], pool: &ConstantPool) {
    let Some(init) = methods
        .iter()
        .rev()
        .find(|m| m.name == "<init>" && !m.flags.contains(MethodAccessFlags::ACC_PUBLIC))
    else {
        return;
    };

    for pair in init.opcodes.windows(2) {
        let [load, store] = pair else { continue };
        if store.mnemonic != Mnemonic::putfield {
            continue;
        }
        let Some(value) = constant_text(load, pool) else { continue };
        let Some(name) = stored_field(store, pool) else { continue };
        let Some(field) = fields.iter_mut().find(|f| f.name == name) else { continue };
        if field.attributes.constant_value().is_some() {
            continue;
        }
        debug!("{} = {} (guessed from position {})", field.name, value, load.position);
        field.guessed_value = Some(value);
    }
}

fn constant_text(opcode: &Opcode, pool: &ConstantPool) -> Option<String> {
    if !opcode.info().literal_push && !matches!(opcode.mnemonic, Mnemonic::ldc | Mnemonic::ldc_w | Mnemonic::ldc2_w) {
        return None;
    }
    match loaded_constant(pool, opcode) {
        Ok(value) => value.map(|(expr, _)| expr.to_string()),
        Err(e) => {
            warn!("ignoring constant at position {}: {}", opcode.position, e);
            None
        }
    }
}

fn stored_field<'a>(opcode: &Opcode, pool: &'a ConstantPool) -> Option<&'a str> {
    let index = opcode.constant_index()?;
    pool.field_ref(index).ok().map(|field| field.name)
}
