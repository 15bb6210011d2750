//! Observer hooks for a running machine
//!
//! A front end implements [`RunView`] to animate evaluation. Every method has
//! an empty default so implementors only override what they draw.

use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::block::Block;
use crate::program::ProgramState;

pub trait RunView {
    fn evaluated_block(&self, _block: &Block) {}

    fn pushed_block(&self, _block: &Block) {}

    fn popped_block(&self, _block: &Block) {}

    /// A child frame was created.
    fn pushed_state(&self, _state: &ProgramState) {}

    /// A stack was spliced into a frame whose program was empty.
    fn tail_recursed_state(&self, _state: &ProgramState) {}

    fn popped_state(&self, _state: &ProgramState) {}

    fn variable_changed(&self, _name: &str, _block: &Block, _is_parameter: bool) {}

    fn memory_changed(&self, _object_id: &str, _name: &str, _block: &Block) {}

    /// An operator consumed `block` as an operand.
    fn consumed_by(&self, _block: &Block, _consumer: &Block) {}
}

/// Observer installed on the isolated machine of an obfuscated function.
///
/// The isolated machine starts from a copy of the caller's value stack. This
/// view tracks how deep into that copy the function reached, so the caller can
/// later drop exactly those blocks from its own stack, and forwards variable
/// and memory events to the caller's observer.
pub struct PassthroughRunView {
    parent: Option<Rc<dyn RunView>>,
    parent_parameters: HashSet<String>,
    depth: Cell<usize>,
    low_water: Cell<usize>,
}

impl PassthroughRunView {
    pub fn new(parent: Option<Rc<dyn RunView>>, parent_parameters: HashSet<String>, stack_len: usize) -> Self {
        Self {
            parent,
            parent_parameters,
            depth: Cell::new(stack_len),
            low_water: Cell::new(stack_len),
        }
    }

    /// Number of the caller's blocks that were never popped.
    #[must_use]
    pub fn untouched(&self) -> usize {
        self.low_water.get()
    }
}

impl RunView for PassthroughRunView {
    fn pushed_block(&self, _block: &Block) {
        self.depth.set(self.depth.get() + 1);
    }

    fn popped_block(&self, _block: &Block) {
        let depth = self.depth.get().saturating_sub(1);
        self.depth.set(depth);
        if depth < self.low_water.get() {
            self.low_water.set(depth);
        }
    }

    fn variable_changed(&self, name: &str, block: &Block, is_parameter: bool) {
        if is_parameter {
            return;
        }
        if let Some(parent) = &self.parent {
            parent.variable_changed(name, block, self.parent_parameters.contains(name));
        }
    }

    fn memory_changed(&self, object_id: &str, name: &str, block: &Block) {
        if let Some(parent) = &self.parent {
            parent.memory_changed(object_id, name, block);
        }
    }
}
