use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::block::Block;
use crate::workspace::Workspace;

/// Shared handle to a stack. Data and code blocks hold these, so stacks can
/// reference each other and themselves.
pub type StackRef = Rc<RefCell<Stack>>;

/// A named, ordered list of blocks with optional input parameters.
#[derive(Debug, Clone, Default)]
pub struct Stack {
    pub name: String,
    pub blocks: Vec<Block>,
    /// Parameter names bound from the value stack on insertion, in
    /// declaration order.
    pub inputs: Vec<String>,
    /// Run in an isolated machine, only exposing new results.
    pub obfuscated: bool,
    pub display_name: Option<String>,
}

impl Stack {
    pub fn new(name: &str) -> Self {
        let name = if name.is_empty() { "i" } else { name };
        Self {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn with_blocks(name: &str, blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            ..Self::new(name)
        }
    }

    #[must_use]
    pub fn into_ref(self) -> StackRef {
        Rc::new(RefCell::new(self))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Copies the whole graph reachable from `stack`, resolving data and code
    /// blocks against `workspace` on the way. Shared and cyclic references
    /// stay shared and cyclic in the copy.
    pub fn deep_clone(stack: &StackRef, workspace: &Workspace) -> StackRef {
        let mut visited = HashMap::new();
        Self::deep_clone_visited(stack, workspace, &mut visited)
    }

    fn deep_clone_visited(
        stack: &StackRef,
        workspace: &Workspace,
        visited: &mut HashMap<*const RefCell<Stack>, StackRef>,
    ) -> StackRef {
        if let Some(mapped) = visited.get(&Rc::as_ptr(stack)) {
            return mapped.clone();
        }

        let (name, display_name, blocks) = {
            let source = stack.borrow();
            (source.name.clone(), source.display_name.clone(), source.blocks.clone())
        };
        let cloned = Stack {
            display_name,
            ..Stack::new(&name)
        }
        .into_ref();
        visited.insert(Rc::as_ptr(stack), cloned.clone());

        let mut copied = Vec::with_capacity(blocks.len());
        for mut block in blocks {
            block.resolve(workspace);
            match &mut block {
                Block::Data(data) => {
                    data.stack = Self::deep_clone_visited(&data.stack, workspace, visited);
                }
                Block::Code(code) => {
                    if let Some(inner) = &code.stack {
                        code.stack = Some(Self::deep_clone_visited(inner, workspace, visited));
                    }
                }
                _ => {}
            }
            copied.push(block);
        }
        cloned.borrow_mut().blocks = copied;

        cloned
    }

    /// Structural equality over possibly cyclic graphs.
    ///
    /// Two graphs are equal when their stacks hold equal blocks and cycles
    /// close at the same relative positions. Names are not compared.
    pub fn cyclic_eq(a: &StackRef, b: &StackRef) -> bool {
        let mut visited_a = Vec::new();
        let mut visited_b = Vec::new();
        Self::cyclic_eq_visited(a, b, &mut visited_a, &mut visited_b)
    }

    fn cyclic_eq_visited(
        a: &StackRef,
        b: &StackRef,
        visited_a: &mut Vec<*const RefCell<Stack>>,
        visited_b: &mut Vec<*const RefCell<Stack>>,
    ) -> bool {
        let pa = Rc::as_ptr(a);
        let pb = Rc::as_ptr(b);

        let index_a = visited_a.iter().position(|&p| p == pa);
        let index_b = visited_b.iter().position(|&p| p == pb);
        if index_a != index_b {
            return false;
        }
        if index_a.is_some() {
            return true;
        }

        let blocks_a = a.borrow().blocks.clone();
        let blocks_b = b.borrow().blocks.clone();
        if blocks_a.len() != blocks_b.len() {
            return false;
        }

        visited_a.push(pa);
        visited_b.push(pb);

        for (x, y) in blocks_a.iter().zip(&blocks_b) {
            let equal = match (x.as_data(), y.as_data(), x.as_code(), y.as_code()) {
                (Some(dx), Some(dy), _, _) => {
                    Self::cyclic_eq_visited(&dx.stack, &dy.stack, visited_a, visited_b)
                }
                (_, _, Some(cx), Some(cy)) => match (&cx.stack, &cy.stack) {
                    (Some(sx), Some(sy)) => Self::cyclic_eq_visited(sx, sy, visited_a, visited_b),
                    (None, None) => cx.name == cy.name,
                    _ => false,
                },
                _ => y.equals(x),
            };
            if !equal {
                return false;
            }
        }

        true
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.inputs.is_empty() {
            write!(f, " ( ")?;
            for input in &self.inputs {
                write!(f, "{} ", input)?;
            }
            write!(f, ")")?;
        }
        write!(f, " {{ ")?;
        for block in &self.blocks {
            write!(f, "{} ", block)?;
        }
        write!(f, "}}")
    }
}
