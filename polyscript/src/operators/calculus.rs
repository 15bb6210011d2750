//! Numeric calculus on user functions
//!
//! A function is any data block whose stack maps one number on the value
//! stack to one number. Each sample runs the stack on a fresh nested machine
//! that shares the caller's memory and workspace, sees the caller's variables
//! and gets half of the caller's remaining step budget.

use std::collections::HashMap;

use crate::block::{Block, DataBlock, NumberBlock};
use crate::localization::localize;
use crate::operators::{Operator, OperatorContext};
use crate::program::VariableAssignment;
use crate::rational::RationalNumber;
use crate::stack::Stack;
use crate::vm::VirtualMachine;

type Message = (&'static str, &'static str);

const INTEGRATE: Message = (
    "Errors.integrateOneToOne",
    "The function you want to integrate must take one number as input and produce one number as output.",
);
const DIFFERENTIATE: Message = (
    "Errors.derivativeOneToOne",
    "The function you want to differentiate must take one number as input and produce one number as output.",
);
const SUM: Message = (
    "Errors.summationOneToOne",
    "The function you want to sum must take one number as input and produce one number as output.",
);
const SUM_BOUNDS: Message = (
    "Errors.summationBounds",
    "The upper and lower bounds of the summation must be integers.",
);
const PRODUCT: Message = (
    "Errors.productOneToOne",
    "The function you want to multiply must take one number as input and produce one number as output.",
);
const PRODUCT_BOUNDS: Message = (
    "Errors.productBounds",
    "The upper and lower bounds of the product must be integers.",
);
const LIMIT: Message = (
    "Errors.limitOneToOne",
    "The function for which you want to find the limit must take one number as input and produce one number as output.",
);

const FACTORIALS: [f64; 9] = [1.0, 1.0, 2.0, 6.0, 24.0, 120.0, 720.0, 5040.0, 40320.0];

fn error(message: Message) -> Block {
    Block::error(localize(message.0, message.1, &[]))
}

/// Both arms are pushed as they are.
fn settle(result: Result<Block, Block>) -> Option<Block> {
    Some(result.unwrap_or_else(|block| block))
}

/// Samples a function on a nested machine.
struct Probe {
    machine: VirtualMachine,
    function: Stack,
    variables: Option<HashMap<String, VariableAssignment>>,
    budget: usize,
    message: Message,
}

impl Probe {
    fn new(ctx: &OperatorContext, f: &DataBlock, message: Message) -> Self {
        Self {
            machine: ctx.vm.sub_machine(),
            function: f.get_stack(),
            variables: Some(ctx.vm.current_frame().variables.clone()),
            budget: ctx.vm.nested_budget(),
            message,
        }
    }

    /// A probe of the same function that does not see the caller's variables.
    fn detached(&self, message: Message) -> Self {
        Self {
            machine: self.machine.sub_machine(),
            function: self.function.clone(),
            variables: None,
            budget: self.budget,
            message,
        }
    }

    fn at(&mut self, t: RationalNumber) -> Result<NumberBlock, Block> {
        self.machine.reset();
        self.machine.push(Block::rational(t));
        if let Some(variables) = &self.variables {
            self.machine.copy_variable_assignments(variables, true);
        }
        self.machine.insert_in_program(self.function.clone());
        self.machine.max_steps = self.budget;
        match self.machine.evaluate_fully().as_slice() {
            [block] => block.as_number().copied().ok_or_else(|| error(self.message)),
            _ => Err(error(self.message)),
        }
    }

    fn at_decimal(&mut self, t: f64) -> Result<f64, Block> {
        self.at(RationalNumber::integer(t)).map(|n| n.decimal())
    }
}

/// ( f a b -- ∫f ) fourth order Runge-Kutta from `a` to `b`
pub fn integral(ctx: &mut OperatorContext) -> Option<Block> {
    let f = ctx.data(0)?;
    let a = ctx.rational(1)?;
    let b = ctx.rational(2)?;
    if a.fuzzy_eq(&b) {
        return Some(Block::number(0.0));
    }
    let mut probe = Probe::new(ctx, &f, INTEGRATE);
    settle(runge_kutta(&mut probe, a, b))
}

fn runge_kutta(probe: &mut Probe, a: RationalNumber, b: RationalNumber) -> Result<Block, Block> {
    let interval = b.minus(&a).value();
    let mut step_count = 64.0;
    while step_count < interval * 4.0 && step_count < 4096.0 {
        step_count *= 2.0;
    }
    let h = interval / step_count;
    let start = a.value();

    let mut k4 = h * probe.at_decimal(start)?;
    let mut total = 0.0;
    for i in 0..step_count as usize {
        let t = start + i as f64 * h;
        let k1 = k4;
        let k2 = h * probe.at_decimal(t + h / 2.0)?;
        // a plain function of t, so the two midpoint slopes agree
        let k3 = k2;
        k4 = h * probe.at_decimal(t + h)?;
        total += (k1 + 2.0 * k2 + 2.0 * k3 + k4) / 6.0;
    }
    Ok(Block::number(total))
}

/// ( f x -- f'(x) ) central difference
pub fn derivative(ctx: &mut OperatorContext) -> Option<Block> {
    let f = ctx.data(0)?;
    let t = ctx.number(1)?;
    let mut probe = Probe::new(ctx, &f, DIFFERENTIATE);
    settle(central_difference(&mut probe, t))
}

fn central_difference(probe: &mut Probe, t: f64) -> Result<Block, Block> {
    let h = 2f64.powi(-12);
    let f1 = probe.at_decimal(t - h)?;
    let f2 = probe.at_decimal(t + h)?;
    Ok(Block::number((f2 - f1) / (2.0 * h)))
}

type RationalBinop = fn(&RationalNumber, &RationalNumber) -> RationalNumber;

/// Folds `f(i)` for every integer `i` from `a` to `b` inclusive, in either
/// direction.
fn series(ctx: &mut OperatorContext, bounds: Message, message: Message, op: RationalBinop, start: f64) -> Option<Block> {
    let f = ctx.data(0)?;
    let a = ctx.number(1)?;
    let b = ctx.number(2)?;
    if a.fract() != 0.0 || b.fract() != 0.0 {
        return Some(error(bounds));
    }
    let mut probe = Probe::new(ctx, &f, message);
    settle(accumulate(&mut probe, a, b, op, RationalNumber::integer(start)))
}

fn accumulate(
    probe: &mut Probe,
    a: f64,
    b: f64,
    op: RationalBinop,
    mut total: RationalNumber,
) -> Result<Block, Block> {
    let increment = if a > b { -1.0 } else { 1.0 };
    let interval = (a - b).abs();
    let mut i = 0.0;
    while i <= interval {
        let y = probe.at(RationalNumber::integer(i * increment + a))?;
        total = op(&total, &y.value);
        i += 1.0;
    }
    Ok(Block::rational(total))
}

/// ( f a b -- ∑f )
pub fn sum(ctx: &mut OperatorContext) -> Option<Block> {
    series(ctx, SUM_BOUNDS, SUM, RationalNumber::plus, 0.0)
}

/// ( f a b -- ∏f )
pub fn product(ctx: &mut OperatorContext) -> Option<Block> {
    series(ctx, PRODUCT_BOUNDS, PRODUCT, RationalNumber::times, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// The `n`th one-sided finite difference of the probed function at `a`.
fn nth_derivative(probe: &mut Probe, a: f64, n: i32, side: Side) -> Result<f64, Block> {
    if n == 0 {
        return probe.at_decimal(a);
    }
    let h = 2f64.powi(n - 16);
    let (x0, x1) = match side {
        Side::Right => (a, a + h),
        Side::Left => (a - h, a),
    };
    let (f0, f1) = if n > 1 {
        (nth_derivative(probe, x0, n - 1, side)?, nth_derivative(probe, x1, n - 1, side)?)
    } else {
        (probe.at_decimal(x0)?, probe.at_decimal(x1)?)
    };
    Ok((f1 - f0) / h)
}

/// The value at `x` when it is finite, else a Taylor expansion from a point
/// just beside `x`. Terms growing in magnitude throughout mean the limit
/// diverges.
fn one_sided_limit(probe: &mut Probe, x: RationalNumber, side: Side) -> Result<Block, Block> {
    let value = probe.at(x)?.decimal();
    if value.is_finite() && value.abs() < 1e12 {
        return Ok(Block::number(value));
    }

    let x = x.value();
    let offset = 2f64.powi(-6);
    let a = match side {
        Side::Right => x + offset,
        Side::Left => x - offset,
    };
    let mut taylor = probe.detached(DIFFERENTIATE);

    let mut terms = [0.0; 9];
    let mut expansion = 0.0;
    for (i, term) in terms.iter_mut().enumerate() {
        let power = i as i32;
        let d = nth_derivative(&mut taylor, a, power, side)?;
        if !d.is_finite() {
            return Err(Block::number(d));
        }
        *term = match side {
            Side::Right => d / FACTORIALS[i] * (-1f64).powi(power),
            Side::Left => d / FACTORIALS[i],
        };
        let distance = match side {
            Side::Right => (x - a).abs(),
            Side::Left => x - a,
        };
        expansion += *term * distance.powi(power);
    }

    let diverging = (2..8).all(|i| terms[i].abs() > terms[i - 1].abs());
    if !diverging {
        return Ok(Block::number(expansion));
    }
    let limit = if (2..8).all(|i| terms[i] > 0.0) {
        f64::INFINITY
    } else if (2..8).all(|i| terms[i] < 0.0) {
        f64::NEG_INFINITY
    } else {
        f64::NAN
    };
    Ok(Block::number(limit))
}

fn side_limit(ctx: &mut OperatorContext, side: Side) -> Option<Block> {
    let f = ctx.data(0)?;
    let x = ctx.rational(1)?;
    let mut probe = Probe::new(ctx, &f, LIMIT);
    settle(one_sided_limit(&mut probe, x, side))
}

/// ( f x -- lim f(t) for t → x from above )
pub fn positive_limit(ctx: &mut OperatorContext) -> Option<Block> {
    side_limit(ctx, Side::Right)
}

/// ( f x -- lim f(t) for t → x from below )
pub fn negative_limit(ctx: &mut OperatorContext) -> Option<Block> {
    side_limit(ctx, Side::Left)
}

/// ( f x -- lim f(t) for t → x ) both one-sided limits, when they agree
pub fn limit(ctx: &mut OperatorContext) -> Option<Block> {
    let f = ctx.resolved(0)?;
    let x = ctx.operand(1)?.clone();
    let variables = ctx.vm.current_frame().variables.clone();
    let budget = ctx.vm.nested_budget();
    let mut machine = ctx.vm.sub_machine();

    let mut approach = |name: &str, op: Operator| {
        machine.reset();
        machine.copy_variable_assignments(&variables, true);
        machine.insert_in_program(Stack::with_blocks(name, vec![f.clone(), x.clone(), Block::Operator(op)]));
        machine.max_steps = budget;
        machine.evaluate_fully().into_iter().next()
    };
    let negative = approach("negative", Operator::NegativeLimit);
    let positive = approach("positive", Operator::PositiveLimit);

    let result = match (negative, positive) {
        (Some(negative), _) if negative.is_error() => negative,
        (_, Some(positive)) if positive.is_error() => positive,
        (Some(negative), Some(positive)) => match (negative.as_number(), positive.as_number()) {
            (Some(n), Some(p)) => {
                let (n, p) = (n.decimal(), p.decimal());
                if (p - n).abs() < 1e-6 {
                    Block::number((p + n) / 2.0)
                } else {
                    Block::number(f64::NAN)
                }
            }
            _ => error(LIMIT),
        },
        _ => error(LIMIT),
    };
    Some(result)
}

#[cfg(test)]
mod tests {
    use crate::block::Block;
    use crate::vm::VirtualMachine;
    use crate::workspace::Workspace;

    const FUNCTIONS: &str = "@square ( x ) { $x $x * }\n@id { }\n@bad { 1 }\n@hole ( x ) { $x $x * $x - $x / }";

    fn run(body: &str) -> Vec<Block> {
        let mut vm = VirtualMachine::new();
        vm.workspace = Workspace::parse(&format!("@Poly {{ {} }}\n{}", body, FUNCTIONS)).unwrap();
        vm.evaluate_stack("Poly").unwrap()
    }

    fn decimals(body: &str) -> Vec<f64> {
        run(body)
            .iter()
            .map(|b| match b.as_number() {
                Some(n) => n.decimal(),
                None => panic!("Expected NumberBlock, got {:?}", b),
            })
            .collect()
    }

    fn error_message(block: &Block) -> &str {
        match block {
            Block::Error(message) => message,
            other => panic!("Expected ErrorBlock, got {:?}", other),
        }
    }

    #[test]
    fn test_integral() {
        let values = decimals("@square 0 1 integral @square 2 2 integral @square 1 0 integral");
        assert!((values[0] - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(values[1], 0.0);
        assert!((values[2] + 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_derivative() {
        let values = decimals("@square 3 derivative");
        assert!((values[0] - 6.0).abs() < 1e-6);

        let result = run("@bad 0 derivative");
        assert_eq!(
            error_message(&result[0]),
            "The function you want to differentiate must take one number as input and produce one number as output."
        );
    }

    #[test]
    fn test_sum_and_product() {
        assert_eq!(decimals("@id 1 4 sum @id 4 1 sum @id 1 5 product"), vec![10.0, 10.0, 120.0]);
        assert_eq!(
            error_message(&run("@id 1 1.5 sum")[0]),
            "The upper and lower bounds of the summation must be integers."
        );
        assert_eq!(
            error_message(&run("@id 0.5 2 product")[0]),
            "The upper and lower bounds of the product must be integers."
        );
        assert_eq!(
            error_message(&run("@bad 1 2 sum")[0]),
            "The function you want to sum must take one number as input and produce one number as output."
        );
    }

    #[test]
    fn test_limits_of_continuous_function() {
        assert_eq!(decimals("@square 2 lim+ @square 2 lim- @square 2 lim"), vec![4.0, 4.0, 4.0]);
    }

    #[test]
    fn test_limits_across_removable_hole() {
        let values = decimals("@hole 0 lim+ @hole 0 lim- @hole 0 lim");
        for value in values {
            assert!((value + 1.0).abs() < 1e-12, "{}", value);
        }
    }

    #[test]
    fn test_limit_needs_one_to_one_function() {
        assert_eq!(
            error_message(&run("@bad 0 lim")[0]),
            "The function for which you want to find the limit must take one number as input and produce one number as output."
        );
    }

    #[test]
    fn test_functions_see_caller_variables() {
        let mut vm = VirtualMachine::new();
        vm.workspace = Workspace::parse("@Poly { 3 ->$k @scaled 2 derivative }\n@scaled ( x ) { $x $k * }").unwrap();
        let result = vm.evaluate_stack("Poly").unwrap();
        match result[0].as_number() {
            Some(n) => assert!((n.decimal() - 3.0).abs() < 1e-6),
            None => panic!("Expected NumberBlock, got {:?}", result[0]),
        }
    }
}
