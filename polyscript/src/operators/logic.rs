use crate::block::Block;
use crate::operators::OperatorContext;
use crate::rational::RationalNumber;

type CompareOp = fn(&RationalNumber, &RationalNumber) -> bool;

fn compare(ctx: &mut OperatorContext, op: CompareOp) -> Option<Block> {
    let [a, b] = ctx.numbers()?;
    Some(Block::Boolean(op(&a, &b)))
}

/// Strict, so values within the fuzzy tolerance are not less.
pub fn less_than(ctx: &mut OperatorContext) -> Option<Block> {
    compare(ctx, |a, b| a.value() < b.value() && !a.fuzzy_eq(b))
}

pub fn greater_than(ctx: &mut OperatorContext) -> Option<Block> {
    compare(ctx, |a, b| a.value() > b.value() && !a.fuzzy_eq(b))
}

pub fn less_or_equal(ctx: &mut OperatorContext) -> Option<Block> {
    compare(ctx, |a, b| a.value() <= b.value() || a.fuzzy_eq(b))
}

pub fn greater_or_equal(ctx: &mut OperatorContext) -> Option<Block> {
    compare(ctx, |a, b| a.value() >= b.value() || a.fuzzy_eq(b))
}

/// ( a b -- a=b ) structural block equality
pub fn equal(ctx: &mut OperatorContext) -> Option<Block> {
    let (a, b) = (ctx.operand(0)?, ctx.operand(1)?);
    Some(Block::Boolean(a.equals(b)))
}

pub fn not(ctx: &mut OperatorContext) -> Option<Block> {
    Some(Block::Boolean(!ctx.boolean(0)?))
}

pub fn and(ctx: &mut OperatorContext) -> Option<Block> {
    Some(Block::Boolean(ctx.boolean(0)? && ctx.boolean(1)?))
}

pub fn or(ctx: &mut OperatorContext) -> Option<Block> {
    Some(Block::Boolean(ctx.boolean(0)? || ctx.boolean(1)?))
}
