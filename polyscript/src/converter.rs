//! Moving host values in and out of data blocks
//!
//! JSON objects become data blocks holding one single-element member stack
//! per key, so `elem` by name finds them. Arrays become plain data blocks.
//! Reading back needs a [`TypeSignature`] because a data block alone does not
//! say whether it is a list or a record.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Number, Value};

use crate::block::Block;
use crate::error::{Error, Result};
use crate::stack::{Stack, StackRef};
use crate::workspace::Workspace;

/// Expected shape of a value read out of a block.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSignature {
    Number,
    String,
    Boolean,
    ArrayOf(Box<TypeSignature>),
    /// Named members, looked up by stack name.
    Object(Vec<(String, TypeSignature)>),
    /// First option that fits wins.
    Multi(Vec<TypeSignature>),
}

impl TypeSignature {
    pub fn array_of(element: TypeSignature) -> Self {
        TypeSignature::ArrayOf(Box::new(element))
    }

    pub fn object(fields: &[(&str, TypeSignature)]) -> Self {
        TypeSignature::Object(
            fields
                .iter()
                .map(|(name, signature)| ((*name).to_owned(), signature.clone()))
                .collect(),
        )
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSignature::Number => write!(f, "number"),
            TypeSignature::String => write!(f, "string"),
            TypeSignature::Boolean => write!(f, "boolean"),
            TypeSignature::ArrayOf(element) => write!(f, "[{}]", element),
            TypeSignature::Object(fields) => {
                write!(f, "{{")?;
                for (i, (name, signature)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, signature)?;
                }
                write!(f, "}}")
            }
            TypeSignature::Multi(options) => {
                let options: Vec<String> = options.iter().map(|o| o.to_string()).collect();
                write!(f, "{}", options.join(" | "))
            }
        }
    }
}

fn encapsulate(name: &str, block: Block) -> Block {
    Block::data(Stack::with_blocks(name, vec![block]).into_ref())
}

/// A leaf value, or a nested container named `nested`.
fn value_to_block(nested: &str, value: &Value) -> Block {
    match value {
        Value::Null => Block::null(),
        Value::Bool(b) => Block::Boolean(*b),
        Value::Number(n) => Block::number(n.as_f64().unwrap_or(f64::NAN)),
        Value::String(s) => Block::string(s.clone()),
        Value::Array(items) => array_to_data_block(nested, items),
        Value::Object(members) => object_to_data_block(nested, members),
    }
}

/// Nested containers are named after the array plus their 1-based position.
pub fn array_to_data_block(name: &str, items: &[Value]) -> Block {
    let blocks = items
        .iter()
        .enumerate()
        .map(|(i, item)| value_to_block(&format!("{}{}", name, i + 1), item))
        .collect();
    Block::data(Stack::with_blocks(name, blocks).into_ref())
}

/// One member stack per key, holding the value. Nested containers are named
/// `keyValue`.
pub fn object_to_data_block(name: &str, members: &Map<String, Value>) -> Block {
    let blocks = members
        .iter()
        .map(|(key, value)| encapsulate(key, value_to_block(&format!("{}Value", key), value)))
        .collect();
    Block::data(Stack::with_blocks(name, blocks).into_ref())
}

/// Converts any JSON value. Scalars come back as plain blocks.
pub fn json_to_block(name: &str, value: &Value) -> Block {
    value_to_block(name, value)
}

struct Reader<'a> {
    workspace: &'a Workspace,
    /// Stacks on the current path, for cycle detection.
    path: Vec<StackRef>,
}

impl Reader<'_> {
    fn resolve(&self, block: &Block) -> Option<StackRef> {
        let mut data = block.as_data()?.clone();
        data.find_stack_in_workspace(self.workspace);
        Some(data.stack)
    }

    fn enter(&mut self, stack: &StackRef) -> Result<()> {
        if self.path.iter().any(|seen| Rc::ptr_eq(seen, stack)) {
            return Err(Error::Conversion(format!(
                "data block @{} refers to itself and has no JSON form",
                stack.borrow().name
            )));
        }
        self.path.push(stack.clone());
        Ok(())
    }

    fn mismatch(block: &Block, signature: &TypeSignature) -> Error {
        Error::Conversion(format!(
            "value {} is not assignable to type {}",
            block.serialize(),
            signature
        ))
    }

    fn read(&mut self, block: &Block, signature: &TypeSignature) -> Result<Value> {
        match (signature, block) {
            (TypeSignature::Number, Block::Number(n)) => Number::from_f64(n.decimal())
                .map(Value::Number)
                .ok_or_else(|| Self::mismatch(block, signature)),
            (TypeSignature::Boolean, Block::Boolean(b)) => Ok(Value::Bool(*b)),
            (TypeSignature::String, Block::String(s)) => Ok(Value::String(s.clone())),
            (TypeSignature::Multi(options), _) => {
                for option in options {
                    match self.read(block, option) {
                        Ok(value) => return Ok(value),
                        Err(err) => log::trace!("{} does not fit {}: {}", block.serialize(), option, err),
                    }
                }
                Err(Self::mismatch(block, signature))
            }
            (TypeSignature::Object(_), Block::Null(_)) => Ok(Value::Null),
            (TypeSignature::ArrayOf(element), Block::Data(_)) => {
                let stack = self.resolve(block).ok_or_else(|| Self::mismatch(block, signature))?;
                self.enter(&stack)?;
                let blocks = stack.borrow().blocks.clone();
                let items: Result<Vec<Value>> = blocks.iter().map(|b| self.read(b, element)).collect();
                self.path.pop();
                Ok(Value::Array(items?))
            }
            (TypeSignature::Object(fields), Block::Data(_)) => {
                let stack = self.resolve(block).ok_or_else(|| Self::mismatch(block, signature))?;
                self.enter(&stack)?;
                let object = self.read_object(&stack, fields);
                self.path.pop();
                object.map(Value::Object)
            }
            _ => Err(Self::mismatch(block, signature)),
        }
    }

    fn read_object(&mut self, stack: &RefCell<Stack>, fields: &[(String, TypeSignature)]) -> Result<Map<String, Value>> {
        let blocks = stack.borrow().blocks.clone();
        let mut object = Map::new();
        for (name, signature) in fields {
            let property = blocks
                .iter()
                .filter(|b| matches!(b, Block::Data(_)))
                .filter_map(|b| self.resolve(b))
                .find(|member| member.borrow().name == *name)
                .ok_or_else(|| {
                    Error::Conversion(format!(
                        "data block @{} is missing property {}",
                        stack.borrow().name,
                        name
                    ))
                })?;

            let values = property.borrow().blocks.clone();
            let [value] = values.as_slice() else {
                return Err(Error::Conversion(format!(
                    "property {} must contain exactly one value",
                    name
                )));
            };
            object.insert(name.clone(), self.read(value, signature)?);
        }
        Ok(object)
    }
}

/// Reads `block` as a value of shape `signature`. Unresolved data blocks are
/// looked up in `workspace`.
pub fn block_to_json(block: &Block, signature: &TypeSignature, workspace: &Workspace) -> Result<Value> {
    Reader {
        workspace,
        path: Vec::new(),
    }
    .read(block, signature)
}
