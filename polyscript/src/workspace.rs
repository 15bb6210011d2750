//! Named stacks and their text form
//!
//! A workspace serializes as one record per stack:
//!
//! ```text
//! @name ( in1 in2 ) { block block }
//! ```
//!
//! The parameter list is optional. Parsing validates the whole text first and
//! only then builds stacks, so a malformed workspace never yields a partial
//! result. Data and code blocks are resolved in a second pass, which lets a
//! stack reference stacks declared after it.

use crate::block::Block;
use crate::error::{Error, Result};
use crate::escape::{escape, unescape};
use crate::registry::{brace_body, registry};
use crate::stack::{Stack, StackRef};

/// A collection of uniquely named stacks.
#[derive(Debug, Default, Clone)]
pub struct Workspace {
    stacks: Vec<StackRef>,
    stack_index: usize,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stacks(&self) -> &[StackRef] {
        &self.stacks
    }

    /// Adds an empty stack. Without a name the stack is named with the next
    /// lowercase roman numeral.
    pub fn create_stack(&mut self, name: Option<&str>) -> StackRef {
        let name = match name {
            Some(name) => name.to_owned(),
            None => {
                self.stack_index += 1;
                to_roman(self.stack_index)
            }
        };
        let stack = Stack::new(&name).into_ref();
        self.add_stack(stack.clone());
        stack
    }

    /// Appends a stack. A name that is already taken is kept but shadowed:
    /// lookups keep finding the earlier stack.
    pub fn add_stack(&mut self, stack: StackRef) {
        let name = stack.borrow().name.clone();
        if self.get_stack(&name).is_some() {
            log::warn!("workspace already has a stack named {}", name);
        }
        self.stacks.push(stack);
    }

    /// Looks up a stack by exact name, the first one wins.
    pub fn get_stack(&self, name: &str) -> Option<StackRef> {
        self.stacks
            .iter()
            .find(|stack| stack.borrow().name == name)
            .cloned()
    }

    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for stack in &self.stacks {
            let stack = stack.borrow();
            out.push('@');
            out.push_str(&escape(&stack.name));

            if stack.inputs.is_empty() {
                out.push(' ');
            } else {
                out.push_str(" ( ");
                for input in &stack.inputs {
                    out.push_str(input);
                    out.push(' ');
                }
                out.push_str(") ");
            }

            out.push_str("{ ");
            for block in &stack.blocks {
                out.push_str(&block.serialize());
                out.push(' ');
            }
            out.push_str("}\n");
        }
        out
    }

    /// Parses workspace text.
    pub fn parse(text: &str) -> Result<Self> {
        let registry = registry()?;
        if !registry.workspace_regex().is_match(text) {
            return Err(Error::WorkspaceParse);
        }

        let mut workspace = Workspace::new();
        for caps in registry.stack_regex().captures_iter(text) {
            let name = caps.get(1).map_or("", |m| m.as_str());
            let mut stack = Stack::new(&unescape(name));
            if let Some(inputs) = caps.get(2) {
                stack.inputs = registry.input_names(inputs.as_str());
            }
            if let Some(body) = caps.get(3) {
                stack.blocks = registry.parse_blocks(brace_body(body.as_str()));
            }
            workspace.add_stack(stack.into_ref());
        }

        workspace.resolve_references();
        log::debug!("parsed workspace with {} stacks", workspace.stacks.len());
        Ok(workspace)
    }

    /// Parses workspace text, `None` when it is malformed.
    pub fn deserialize(text: &str) -> Option<Self> {
        match Self::parse(text) {
            Ok(workspace) => Some(workspace),
            Err(err) => {
                log::debug!("rejected workspace text: {}", err);
                None
            }
        }
    }

    pub(crate) fn resolve_references(&self) {
        for stack in &self.stacks {
            let mut blocks = std::mem::take(&mut stack.borrow_mut().blocks);
            for block in &mut blocks {
                block.resolve(self);
            }
            stack.borrow_mut().blocks = blocks;
        }
    }

    /// Parses a single block list against this workspace, resolving names.
    /// Text with anything other than blocks and whitespace is rejected.
    pub fn parse_block_list(&self, text: &str) -> Result<Vec<Block>> {
        let registry = registry()?;
        if !registry.is_block_list(text) {
            return Err(Error::WorkspaceParse);
        }
        let mut blocks = registry.parse_blocks(text);
        for block in &mut blocks {
            block.resolve(self);
        }
        Ok(blocks)
    }
}

/// Lowercase roman numeral, empty for zero.
pub fn to_roman(mut num: usize) -> String {
    const NUMERALS: &[(usize, &str)] = &[
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];

    let mut out = String::new();
    for &(value, numeral) in NUMERALS {
        while num >= value {
            out.push_str(numeral);
            num -= value;
        }
    }
    out
}
