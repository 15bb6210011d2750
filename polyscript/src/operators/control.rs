//! Control flow operators
//!
//! Loops are never run natively. Each operator builds a small helper stack
//! that does one step of work and ends with the operator (or its helper)
//! again, so the next round is spliced in as a tail call and the frame depth
//! stays flat however long the loop runs.

use crate::block::Block;
use crate::operators::data::next_data_block_version;
use crate::operators::{Operator, OperatorContext};
use crate::stack::Stack;

fn code_of(ctx: &OperatorContext, index: usize) -> Option<Block> {
    Some(Block::code(ctx.data(index)?.stack))
}

/// ( f -- ... ) runs the stack of `f`
pub fn exec(ctx: &mut OperatorContext) -> Option<Block> {
    let f = ctx.data(0)?;
    ctx.vm.insert_in_program(f.get_stack());
    None
}

/// ( condition then else -- ... )
pub fn branch(ctx: &mut OperatorContext) -> Option<Block> {
    let target = if ctx.boolean(0)? { ctx.data(1)? } else { ctx.data(2)? };
    ctx.vm.insert_in_program(target.get_stack());
    None
}

/// ( array f -- mapped )
///
/// Folds `array` into `@null` with `f` followed by `append`.
pub fn map(ctx: &mut OperatorContext) -> Option<Block> {
    let array = ctx.resolved(0)?;
    let f = ctx.resolved(1)?;
    let append = Stack::with_blocks("append", vec![Block::Operator(Operator::Append)]).into_ref();
    let map = Stack::with_blocks(
        "map",
        vec![
            Block::null(),
            array,
            f,
            Block::data(append),
            Block::Operator(Operator::Read),
            Block::Operator(Operator::Append),
            Block::Operator(Operator::Fold),
        ],
    );
    ctx.vm.insert_in_program(map);
    None
}

/// ( array f -- result ) applies `f` to the first element and then to the
/// running result and each following element
pub fn fold(ctx: &mut OperatorContext) -> Option<Block> {
    let array = ctx.data(0)?;
    let first = array.stack.borrow().blocks.first().cloned()?;
    let fold = Stack::with_blocks(
        "fold",
        vec![
            first,
            code_of(ctx, 1)?,
            ctx.resolved(0)?,
            ctx.resolved(1)?,
            Block::number(2.0),
            Block::Operator(Operator::FoldHelper),
        ],
    );
    ctx.vm.insert_in_program(fold);
    None
}

/// ( array f i -- ) one round of `fold` starting at the 1-based index `i`
pub fn fold_helper(ctx: &mut OperatorContext) -> Option<Block> {
    let array = ctx.data(0)?;
    let i = ctx.number(2)?;
    if i > array.count() as f64 || i < 1.0 {
        return None;
    }
    let element = array.stack.borrow().blocks.get(i.floor() as usize - 1).cloned()?;
    let fold = Stack::with_blocks(
        "fold`",
        vec![
            element,
            code_of(ctx, 1)?,
            ctx.resolved(0)?,
            ctx.resolved(1)?,
            Block::number(i + 1.0),
            Block::Operator(Operator::FoldHelper),
        ],
    );
    ctx.vm.insert_in_program(fold);
    None
}

/// ( value condition operation -- ... ) applies `operation` to `value` when
/// `condition` holds for it, otherwise drops `value`
pub fn maybe(ctx: &mut OperatorContext) -> Option<Block> {
    let value = ctx.operand(0)?.clone();
    let do_op = Stack::with_blocks("do-op", vec![value.clone(), code_of(ctx, 2)?]).into_ref();
    let maybe = Stack::with_blocks(
        "maybe",
        vec![
            value,
            code_of(ctx, 1)?,
            Block::data(do_op),
            Block::null(),
            Block::Operator(Operator::Branch),
        ],
    );
    ctx.vm.insert_in_program(maybe);
    None
}

/// ( array predicate -- filtered )
pub fn filter(ctx: &mut OperatorContext) -> Option<Block> {
    let array = ctx.data(0)?;
    let first = array.stack.borrow().blocks.first().cloned();
    let Some(first) = first else {
        return ctx.resolved(0);
    };
    let filter = Stack::with_blocks(
        "filter",
        vec![
            first,
            code_of(ctx, 1)?,
            ctx.resolved(0)?,
            ctx.resolved(1)?,
            Block::number(2.0),
            Block::Operator(Operator::FilterHelper),
        ],
    );
    ctx.vm.insert_in_program(filter);
    None
}

/// ( keep array predicate i -- ... ) drops the element before `i` unless
/// `keep`, then tests element `i`
pub fn filter_helper(ctx: &mut OperatorContext) -> Option<Block> {
    let keep = ctx.boolean(0)?;
    let mut array = ctx.resolved(1)?;
    let mut i = ctx.number(3)?;

    if !keep {
        let source = array.as_data()?.clone();
        let name = next_data_block_version(&source, ctx.vm);
        let mut blocks = source.stack.borrow().blocks.clone();
        let index = i - 2.0;
        if index >= 0.0 && (index as usize) < blocks.len() {
            blocks.remove(index as usize);
        }
        i -= 1.0;
        array = Block::data(Stack::with_blocks(&name, blocks).into_ref());
    }

    let next = {
        let data = array.as_data()?;
        if i > data.count() as f64 || i < 1.0 {
            None
        } else {
            data.stack.borrow().blocks.get(i.floor() as usize - 1).cloned()
        }
    };
    let Some(element) = next else {
        return Some(array);
    };

    let filter = Stack::with_blocks(
        "filter`",
        vec![
            element,
            code_of(ctx, 2)?,
            array,
            ctx.resolved(2)?,
            Block::number(i + 1.0),
            Block::Operator(Operator::FilterHelper),
        ],
    );
    ctx.vm.insert_in_program(filter);
    None
}

/// ( f n -- ... ) runs `f` n times
pub fn compose(ctx: &mut OperatorContext) -> Option<Block> {
    let n = ctx.number(1)?;
    if n <= 0.0 {
        return None;
    }
    let repeat = Stack::with_blocks(
        "repeat",
        vec![
            code_of(ctx, 0)?,
            ctx.resolved(0)?,
            Block::number(n - 1.0),
            Block::Operator(Operator::Compose),
        ],
    );
    ctx.vm.insert_in_program(repeat);
    None
}

/// ( f i n -- ... ) pushes each of i..=n and runs `f` after it
pub fn iterate(ctx: &mut OperatorContext) -> Option<Block> {
    let i = ctx.number(1)?;
    let n = ctx.number(2)?;
    if i > n {
        return None;
    }
    let iter = Stack::with_blocks(
        "iter",
        vec![
            ctx.operand(1)?.clone(),
            code_of(ctx, 0)?,
            ctx.resolved(0)?,
            Block::number(i + 1.0),
            ctx.operand(2)?.clone(),
            Block::Operator(Operator::Iterate),
        ],
    );
    ctx.vm.insert_in_program(iter);
    None
}

#[cfg(test)]
mod tests {
    use crate::block::Block;
    use crate::vm::VirtualMachine;
    use crate::workspace::Workspace;

    fn run(text: &str) -> Vec<Block> {
        let mut vm = VirtualMachine::new();
        vm.workspace = Workspace::parse(text).unwrap();
        vm.evaluate_stack("Poly").unwrap()
    }

    fn numbers(blocks: &[Block]) -> Vec<f64> {
        blocks
            .iter()
            .map(|b| match b.as_number() {
                Some(n) => n.decimal(),
                None => panic!("Expected NumberBlock, got {:?}", b),
            })
            .collect()
    }

    fn elements(block: &Block) -> Vec<f64> {
        match block.as_data() {
            Some(d) => numbers(&d.stack.borrow().blocks),
            None => panic!("Expected DataBlock, got {:?}", block),
        }
    }

    #[test]
    fn test_exec_and_branch() {
        let result = run("@Poly { @two exec T @one @two if F @one @two if }\n@one { 1 }\n@two { 2 }");
        assert_eq!(numbers(&result), vec![2.0, 1.0, 2.0]);
    }

    #[test]
    fn test_map() {
        let result = run("@Poly { @a @double map }\n@a { 1 2 3 }\n@double { 2 * }");
        assert_eq!(result.len(), 1);
        assert_eq!(elements(&result[0]), vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_fold() {
        let result = run("@Poly { 0 @a @add fold @empty @add fold }\n@a { 1 2 3 4 }\n@add { + }\n@empty { }");
        assert_eq!(numbers(&result), vec![10.0]);
    }

    #[test]
    fn test_filter() {
        let result = run("@Poly { @a @big filter }\n@a { 1 5 2 7 3 }\n@big { 2 > }");
        assert_eq!(result.len(), 1);
        assert_eq!(elements(&result[0]), vec![5.0, 7.0, 3.0]);
        match result[0].as_data() {
            Some(d) => assert_eq!(d.name(), "a:2"),
            None => panic!("Expected DataBlock"),
        }
    }

    #[test]
    fn test_filter_of_empty_array() {
        let result = run("@Poly { @empty @big filter }\n@empty { }\n@big { 2 > }");
        assert_eq!(result.len(), 1);
        assert!(elements(&result[0]).is_empty());
    }

    #[test]
    fn test_maybe() {
        let result = run("@Poly { 5 @big @double maybe 1 @big @double maybe }\n@big { 2 > }\n@double { 2 * }");
        assert_eq!(numbers(&result), vec![10.0]);
    }

    #[test]
    fn test_compose_and_iterate() {
        assert_eq!(numbers(&run("@Poly { 1 @double 5 comp }\n@double { 2 * }")), vec![32.0]);
        assert_eq!(numbers(&run("@Poly { 1 @double 0 repeat }\n@double { 2 * }")), vec![1.0]);
        assert_eq!(numbers(&run("@Poly { @nop 1 4 iter }\n@nop { }")), vec![1.0, 2.0, 3.0, 4.0]);
        assert!(run("@Poly { @nop 5 4 iter }\n@nop { }").is_empty());
    }

    #[test]
    fn test_branch_requires_boolean() {
        match &run("@Poly { 1 @a @a if }\n@a { }")[0] {
            Block::Error(message) => {
                assert_eq!(message, "BranchBlock requires a BooleanBlock and two DataBlocks as input.")
            }
            other => panic!("Expected ErrorBlock, got {:?}", other),
        }
    }
}
