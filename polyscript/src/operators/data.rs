//! Data block operators
//!
//! Indices are 1-based. Mutating operators never touch their input: they
//! build a new stack named after the input with a bumped version suffix, so
//! `@a 5 append` yields `@a:1` and leaves `@a` as it was.

use crate::block::{Block, DataBlock, TypeTag};
use crate::localization::localize;
use crate::operators::OperatorContext;
use crate::rational::shortest_number_string;
use crate::stack::Stack;
use crate::vm::VirtualMachine;

/// Name for the next copy-on-write version of `data`: `a` becomes `a:1`,
/// `a:1` becomes `a:2`. A null block gets a fresh anonymous name first.
pub fn next_data_block_version(data: &DataBlock, vm: &mut VirtualMachine) -> String {
    let mut name = {
        let stack = data.stack.borrow();
        match &stack.display_name {
            Some(display) if !display.is_empty() => display.clone(),
            _ => stack.name.clone(),
        }
    };
    if name == "null" {
        name = format!("a{}", vm.next_anon_stack_index());
    }

    let mut version = 1;
    if let Some((base, digits)) = split_version(&name) {
        version = digits.parse::<u64>().map_or(1, |v| v.saturating_add(1));
        name = base.to_owned();
    }
    format!("{}:{}", name, version)
}

/// Splits at the last `:` that is followed by a digit, returning the part
/// before it and the digit run after it.
fn split_version(name: &str) -> Option<(&str, &str)> {
    let (index, _) = name
        .rmatch_indices(':')
        .find(|(i, _)| name[i + 1..].starts_with(|c: char| c.is_ascii_digit()))?;
    let rest = &name[index + 1..];
    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    Some((&name[..index], &rest[..end]))
}

fn versioned(data: &DataBlock, vm: &mut VirtualMachine, edit: impl FnOnce(&mut Vec<Block>)) -> Block {
    let name = next_data_block_version(data, vm);
    let mut blocks = data.stack.borrow().blocks.clone();
    edit(&mut blocks);
    Block::data(Stack::with_blocks(&name, blocks).into_ref())
}

fn index_out_of_range(index: f64) -> Block {
    Block::error(localize(
        "Errors.indexOutOfRange",
        "Index {{index}} out of range.",
        &[("index", &shortest_number_string(index))],
    ))
}

fn property_undefined(property: &str, stack_name: &str) -> Block {
    Block::error(localize(
        "Errors.propertyUndefined",
        "Property {{propertyName}} of {{stackName}} is undefined.",
        &[("propertyName", property), ("stackName", stack_name)],
    ))
}

/// Position of the first member data block named `key`.
fn member_position(blocks: &[Block], key: &str) -> Option<usize> {
    blocks
        .iter()
        .position(|block| block.as_data().is_some_and(|member| member.name() == key))
}

/// A one-element member named `key` holding `value`.
fn member(key: &str, value: Block) -> Block {
    Block::data(Stack::with_blocks(key, vec![value]).into_ref())
}

/// ( array -- n )
pub fn count(ctx: &mut OperatorContext) -> Option<Block> {
    Some(Block::number(ctx.data(0)?.count() as f64))
}

/// ( array -- elements... )
pub fn read(ctx: &mut OperatorContext) -> Option<Block> {
    let array = ctx.data(0)?;
    for block in array.get_stack().blocks {
        ctx.vm.push(block);
    }
    None
}

/// ( array index -- element ) or ( object key -- value )
pub fn elem(ctx: &mut OperatorContext) -> Option<Block> {
    let a = ctx.data(0)?;
    let blocks = a.stack.borrow().blocks.clone();

    if ctx.combination == 0 {
        let index = ctx.number(1)?.floor();
        if index >= 1.0 && index <= blocks.len() as f64 {
            return blocks.get(index as usize - 1).cloned();
        }
        return Some(index_out_of_range(index));
    }

    let key = ctx.operand(1)?.as_str()?.to_owned();
    for block in &blocks {
        let Some(member) = block.as_data() else {
            continue;
        };
        let mut member = member.clone();
        member.find_stack_in_workspace(&ctx.vm.workspace);
        if member.name() == key {
            return match member.stack.borrow().blocks.first() {
                Some(value) => Some(value.clone()),
                None => Some(property_undefined(&key, &a.name())),
            };
        }
    }
    Some(property_undefined(&key, &a.name()))
}

/// ( array value index -- array' ) or ( object value key -- object' )
pub fn insert(ctx: &mut OperatorContext) -> Option<Block> {
    let a = ctx.data(0)?;
    let value = ctx.operand(1)?.clone();

    if ctx.combination == 0 {
        let index = ctx.number(2)?.floor();
        if index >= 1.0 && index <= a.count() as f64 + 1.0 {
            return Some(versioned(&a, ctx.vm, |blocks| blocks.insert(index as usize - 1, value)));
        }
        return Some(index_out_of_range(index));
    }

    let key = ctx.operand(2)?.as_str()?.to_owned();
    Some(set_member(&a, ctx.vm, &key, value))
}

fn set_member(a: &DataBlock, vm: &mut VirtualMachine, key: &str, value: Block) -> Block {
    let member = member(key, value);
    versioned(a, vm, |blocks| match member_position(blocks, key) {
        Some(position) => blocks[position] = member,
        None => blocks.push(member),
    })
}

/// ( array value -- array' )
pub fn append(ctx: &mut OperatorContext) -> Option<Block> {
    let a = ctx.data(0)?;
    let value = ctx.operand(1)?.clone();
    Some(versioned(&a, ctx.vm, |blocks| blocks.push(value)))
}

/// ( array value index -- array' ) or ( object value key -- object' )
pub fn replace(ctx: &mut OperatorContext) -> Option<Block> {
    let a = ctx.data(0)?;
    let value = ctx.operand(1)?.clone();

    if ctx.combination == 0 {
        let index = ctx.number(2)?.floor();
        if index >= 1.0 && index <= a.count() as f64 + 1.0 {
            let position = index as usize - 1;
            return Some(versioned(&a, ctx.vm, |blocks| {
                if position < blocks.len() {
                    blocks[position] = value;
                } else {
                    blocks.push(value);
                }
            }));
        }
        return Some(index_out_of_range(index));
    }

    let key = ctx.operand(2)?.as_str()?.to_owned();
    Some(set_member(&a, ctx.vm, &key, value))
}

/// ( array index -- array' ) or ( object key -- object' )
pub fn delete(ctx: &mut OperatorContext) -> Option<Block> {
    let a = ctx.data(0)?;

    if ctx.combination == 0 {
        let index = ctx.number(1)?.floor();
        if index >= 1.0 && index <= a.count() as f64 + 1.0 {
            let position = index as usize - 1;
            return Some(versioned(&a, ctx.vm, |blocks| {
                if position < blocks.len() {
                    blocks.remove(position);
                }
            }));
        }
        return Some(Block::error(localize(
            "Errors.indexOutOfRange",
            "Index {{index}} out of range",
            &[("index", &shortest_number_string(index))],
        )));
    }

    let key = ctx.operand(1)?.as_str()?.to_owned();
    let position = member_position(&a.stack.borrow().blocks, &key);
    match position {
        Some(position) => Some(versioned(&a, ctx.vm, |blocks| {
            blocks.remove(position);
        })),
        None => Some(property_undefined(&key, &ctx.operand(0)?.to_string())),
    }
}

/// ( blocks... n -- array ) collects the top `n` blocks into a new stack
pub fn write(ctx: &mut OperatorContext) -> Option<Block> {
    let write_name = localize("WriteBlock.name", "WriteBlock", &[]);
    let count = ctx.vm.peek_type(TypeTag::Number);
    ctx.vm.pop(Some(ctx.this));

    let Some(count) = count.and_then(|b| b.as_number().map(|n| n.decimal().floor())) else {
        return Some(Block::error(localize(
            "Errors.writeBlockNoCount",
            "{{writeBlock}} expected a {{numberBlock}} to determine the number of blocks to write to the stack.",
            &[
                ("writeBlock", &write_name),
                ("numberBlock", &localize("NumberBlock.name", "Number Block", &[])),
            ],
        )));
    };

    let name = format!("a{}", ctx.vm.next_anon_stack_index());
    let mut blocks = Vec::new();
    let mut found = 0.0;
    while found < count {
        let Some(block) = ctx.vm.pop(Some(ctx.this)) else {
            let expected = shortest_number_string(count);
            return Some(Block::error(localize(
                "Errors.writeBlockNotEnoughInputs",
                "{{writeBlock}} expected {{blocksAsInput}} but only found {{count}}.",
                &[
                    ("writeBlock", &write_name),
                    (
                        "blocksAsInput",
                        &localize("Errors.blocksAsInput", "{{count}} blocks as input", &[("count", &expected)]),
                    ),
                    ("count", &shortest_number_string(found)),
                ],
            )));
        };
        blocks.insert(0, block);
        found += 1.0;
    }
    Some(Block::data(Stack::with_blocks(&name, blocks).into_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::Workspace;

    fn run(text: &str) -> Vec<Block> {
        let mut vm = VirtualMachine::new();
        vm.workspace = Workspace::parse(text).unwrap();
        vm.evaluate_stack("Poly").unwrap()
    }

    fn numbers(block: &Block) -> Vec<f64> {
        match block.as_data() {
            Some(d) => d
                .stack
                .borrow()
                .blocks
                .iter()
                .map(|b| match b.as_number() {
                    Some(n) => n.decimal(),
                    None => panic!("Expected NumberBlock, got {:?}", b),
                })
                .collect(),
            None => panic!("Expected DataBlock, got {:?}", block),
        }
    }

    fn error_message(block: &Block) -> &str {
        match block {
            Block::Error(message) => message,
            other => panic!("Expected ErrorBlock, got {:?}", other),
        }
    }

    #[test]
    fn test_version_names() {
        let mut vm = VirtualMachine::new();
        let named = |name: &str| DataBlock::new(Stack::new(name).into_ref());
        assert_eq!(next_data_block_version(&named("a"), &mut vm), "a:1");
        assert_eq!(next_data_block_version(&named("a:1"), &mut vm), "a:2");
        assert_eq!(next_data_block_version(&named("x:y:9"), &mut vm), "x:y:10");
        assert_eq!(next_data_block_version(&named("time:12:30"), &mut vm), "time:12:31");
        assert_eq!(next_data_block_version(&named("null"), &mut vm), "a1:1");
        assert_eq!(next_data_block_version(&named("null"), &mut vm), "a2:1");
    }

    #[test]
    fn test_count_and_read() {
        let result = run("@Poly { @a count @a read }\n@a { 1 2 3 }");
        assert_eq!(result.len(), 4);
        assert!(matches!(result[0].as_number(), Some(n) if n.decimal() == 3.0));
        assert!(matches!(result[3].as_number(), Some(n) if n.decimal() == 3.0));
    }

    #[test]
    fn test_elem_by_index() {
        let result = run("@Poly { @a 2 elem @a 0 elem @a 4 elem }\n@a { 10 20 30 }");
        assert!(matches!(result[0].as_number(), Some(n) if n.decimal() == 20.0));
        assert_eq!(error_message(&result[1]), "Index 0 out of range.");
        assert_eq!(error_message(&result[2]), "Index 4 out of range.");
    }

    #[test]
    fn test_elem_by_key() {
        let result = run("@Poly { @obj \"x\" elem @obj \"y\" elem @obj \"z\" elem }\n@obj { @x @y }\n@x { 7 }\n@y { }");
        assert!(matches!(result[0].as_number(), Some(n) if n.decimal() == 7.0));
        assert_eq!(error_message(&result[1]), "Property y of obj is undefined.");
        assert_eq!(error_message(&result[2]), "Property z of obj is undefined.");
    }

    #[test]
    fn test_append_is_copy_on_write() {
        let mut vm = VirtualMachine::new();
        vm.workspace = Workspace::parse("@Poly { @a 5 append }\n@a { 1 }").unwrap();
        let result = vm.evaluate_stack("Poly").unwrap();
        match result[0].as_data() {
            Some(d) => assert_eq!(d.name(), "a:1"),
            None => panic!("Expected DataBlock"),
        }
        assert_eq!(numbers(&result[0]), vec![1.0, 5.0]);
        assert_eq!(vm.workspace.get_stack("a").unwrap().borrow().blocks.len(), 1);
    }

    #[test]
    fn test_insert_replace_delete_by_index() {
        let result = run("@Poly { @a 9 1 insert @a 9 4 insert @a 9 2 replace @a 9 4 replace @a 1 delete @a 9 5 insert }\n@a { 1 2 3 }");
        assert_eq!(numbers(&result[0]), vec![9.0, 1.0, 2.0, 3.0]);
        assert_eq!(numbers(&result[1]), vec![1.0, 2.0, 3.0, 9.0]);
        assert_eq!(numbers(&result[2]), vec![1.0, 9.0, 3.0]);
        assert_eq!(numbers(&result[3]), vec![1.0, 2.0, 3.0, 9.0]);
        assert_eq!(numbers(&result[4]), vec![2.0, 3.0]);
        assert_eq!(error_message(&result[5]), "Index 5 out of range.");
    }

    #[test]
    fn test_delete_error_has_no_period() {
        let result = run("@Poly { @a 7 delete }\n@a { 1 }");
        assert_eq!(error_message(&result[0]), "Index 7 out of range");
    }

    #[test]
    fn test_keyed_members() {
        let result = run("@Poly { @obj 5 \"x\" insert \"x\" elem @obj 6 \"z\" replace count @obj \"x\" delete count @obj \"q\" delete }\n@obj { @x }\n@x { 1 }");
        assert!(matches!(result[0].as_number(), Some(n) if n.decimal() == 5.0));
        assert!(matches!(result[1].as_number(), Some(n) if n.decimal() == 2.0));
        assert!(matches!(result[2].as_number(), Some(n) if n.decimal() == 0.0));
        assert_eq!(error_message(&result[3]), "Property q of @obj is undefined.");
    }

    #[test]
    fn test_overloaded_mismatch() {
        let result = run("@Poly { @a T elem }\n@a { 1 }");
        assert_eq!(
            error_message(&result[0]),
            "ElemOperator requires a DataBlock and a NumberBlock, or a DataBlock and a StringBlock as input."
        );
    }

    #[test]
    fn test_write() {
        let result = run("@Poly { 7 8 9 2 write }");
        assert_eq!(result.len(), 2);
        match result[1].as_data() {
            Some(d) => assert_eq!(d.name(), "a1"),
            None => panic!("Expected DataBlock"),
        }
        assert_eq!(numbers(&result[1]), vec![8.0, 9.0]);

        let result = run("@Poly { 1 3 write }");
        assert_eq!(
            error_message(&result[0]),
            "WriteBlock expected 3 blocks as input but only found 1."
        );
        let result = run("@Poly { write }");
        assert_eq!(
            error_message(&result[0]),
            "WriteBlock expected a Number Block to determine the number of blocks to write to the stack."
        );
    }
}
