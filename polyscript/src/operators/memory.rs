//! Reading and writing object memory
//!
//! `Get` and `Set` take the variable name from a memory reference operand.
//! The symbol forms `Get[name]` and `Set[name]` carry it in the block itself.

use crate::block::{Block, BlockKind, TypeTag};
use crate::localization::localize;
use crate::operators::{OperatorContext, take_operands};
use crate::vm::VirtualMachine;

fn not_storable() -> Block {
    Block::error(localize(
        "Errors.setOperatorNotSupported",
        "{{setOperatorName}} cannot set a state variable to a {{dataBlockName}} or a {{codeBlockName}}.",
        &[
            ("setOperatorName", &localize("SetOperator.name", "Set Memory Operator", &[])),
            ("dataBlockName", &localize("DataBlock.name", "Data Block", &[])),
            ("codeBlockName", &localize("CodeBlock.name", "Function", &[])),
        ],
    ))
}

fn store(vm: &mut VirtualMachine, object_id: &str, name: &str, value: Block) -> Option<Block> {
    if matches!(value.kind(), BlockKind::Data | BlockKind::Code) {
        return Some(not_storable());
    }
    let run_view = vm.current_frame().run_view.clone();
    match vm.set_state_variable(object_id, name, Some(value), run_view.as_deref()) {
        Ok(()) => None,
        Err(e) => {
            log::warn!("could not set {} of {}: {}", name, object_id, e);
            Some(Block::error(e.to_string()))
        }
    }
}

/// ( object name -- value )
pub fn get(ctx: &mut OperatorContext) -> Option<Block> {
    match (ctx.operand(0)?, ctx.operand(1)?) {
        (Block::Memory(id), Block::MemoryReference(name)) => Some(ctx.vm.get_state_variable(id, name)),
        _ => None,
    }
}

/// ( object value name -- )
pub fn set(ctx: &mut OperatorContext) -> Option<Block> {
    match (ctx.operand(0)?, ctx.operand(1)?, ctx.operand(2)?) {
        (Block::Memory(id), value, Block::MemoryReference(name)) => {
            let (id, value, name) = (id.clone(), value.clone(), name.clone());
            store(ctx.vm, &id, &name, value)
        }
        _ => None,
    }
}

/// `Get[name]` ( object -- value )
pub fn get_symbol(vm: &mut VirtualMachine, name: &str, this: &Block) {
    let Some(operands) = take_operands(vm, this, "GetSymbolOperator", &[TypeTag::Memory]) else {
        return;
    };
    if let Some(Block::Memory(id)) = operands.first() {
        let value = vm.get_state_variable(id, name);
        vm.push(value);
    }
}

/// `Set[name]` ( value object -- )
pub fn set_symbol(vm: &mut VirtualMachine, name: &str, this: &Block) {
    let Some(operands) = take_operands(vm, this, "SetSymbolOperator", &[TypeTag::Block, TypeTag::Memory]) else {
        return;
    };
    if let [value, Block::Memory(id)] = operands.as_slice() {
        let id = id.clone();
        if let Some(result) = store(vm, &id, name, value.clone()) {
            vm.push(result);
        }
    }
}
