use crate::block::{Block, NumberBlock};
use crate::localization::localize;
use crate::operators::OperatorContext;
use crate::random::{self, RandMode};
use crate::rational::RationalNumber;

type RationalBinop = fn(&RationalNumber, &RationalNumber) -> RationalNumber;

fn rational_binop(ctx: &mut OperatorContext, op: RationalBinop) -> Option<Block> {
    let [a, b] = ctx.numbers()?;
    Some(Block::rational(op(&a, &b)))
}

type DecimalOp = fn(f64) -> f64;

fn decimal_unop(ctx: &mut OperatorContext, op: DecimalOp) -> Option<Block> {
    let [a] = ctx.numbers()?;
    Some(Block::number(op(a.value())))
}

/// ( -- x ) next value of the machine's rand mode queue
pub fn rand(ctx: &mut OperatorContext) -> Option<Block> {
    let value = match ctx.vm.get_next_rand_mode() {
        RandMode::Max => {
            return Some(Block::Number(NumberBlock {
                value: RationalNumber::integer(1.0 - f64::EPSILON),
                should_round: false,
            }));
        }
        RandMode::Min => 0.0,
        RandMode::Random => random::unit(),
    };
    Some(Block::number(value))
}

/// ( a b -- a+b )
pub fn plus(ctx: &mut OperatorContext) -> Option<Block> {
    rational_binop(ctx, RationalNumber::plus)
}

/// ( a b -- a-b )
pub fn minus(ctx: &mut OperatorContext) -> Option<Block> {
    rational_binop(ctx, RationalNumber::minus)
}

/// ( a b -- a*b )
pub fn multiply(ctx: &mut OperatorContext) -> Option<Block> {
    rational_binop(ctx, RationalNumber::times)
}

/// ( a b -- a/b )
pub fn divide(ctx: &mut OperatorContext) -> Option<Block> {
    rational_binop(ctx, RationalNumber::divided_by)
}

/// ( a b -- a^b )
pub fn power(ctx: &mut OperatorContext) -> Option<Block> {
    rational_binop(ctx, RationalNumber::pow)
}

/// ( a b -- a mod b )
pub fn modulo(ctx: &mut OperatorContext) -> Option<Block> {
    rational_binop(ctx, RationalNumber::modulo)
}

pub fn min(ctx: &mut OperatorContext) -> Option<Block> {
    let [a, b] = ctx.numbers()?;
    let pick = if a.value() < b.value() { 0 } else { 1 };
    ctx.operand(pick).cloned()
}

pub fn max(ctx: &mut OperatorContext) -> Option<Block> {
    let [a, b] = ctx.numbers()?;
    let pick = if a.value() > b.value() { 0 } else { 1 };
    ctx.operand(pick).cloned()
}

pub fn ceil(ctx: &mut OperatorContext) -> Option<Block> {
    decimal_unop(ctx, f64::ceil)
}

pub fn floor(ctx: &mut OperatorContext) -> Option<Block> {
    decimal_unop(ctx, f64::floor)
}

/// Halves round up, also for negative numbers.
pub fn round(ctx: &mut OperatorContext) -> Option<Block> {
    decimal_unop(ctx, |x| (x + 0.5).floor())
}

pub fn abs(ctx: &mut OperatorContext) -> Option<Block> {
    let [a] = ctx.numbers()?;
    Some(Block::rational(RationalNumber::new(
        a.numerator().abs(),
        a.denominator().abs(),
    )))
}

/// ( n -- n! ) for natural numbers
pub fn factorial(ctx: &mut OperatorContext) -> Option<Block> {
    let [a] = ctx.numbers()?;
    let n = a.value();
    if n < 0.0 || n.fract() != 0.0 {
        return Some(Block::error(localize(
            "Errors.naturalNumber",
            "Input must be a natural number.",
            &[],
        )));
    }

    let mut result = 1.0;
    let mut i = 2.0;
    while i <= n {
        result *= i;
        if !result.is_finite() {
            break;
        }
        i += 1.0;
    }
    Some(Block::number(result))
}

pub fn square_root(ctx: &mut OperatorContext) -> Option<Block> {
    let [a] = ctx.numbers()?;
    Some(Block::rational(a.powf(0.5)))
}

pub fn logarithm(ctx: &mut OperatorContext) -> Option<Block> {
    decimal_unop(ctx, f64::log10)
}

pub fn natural_logarithm(ctx: &mut OperatorContext) -> Option<Block> {
    decimal_unop(ctx, f64::ln)
}

pub fn sine(ctx: &mut OperatorContext) -> Option<Block> {
    decimal_unop(ctx, f64::sin)
}

pub fn cosine(ctx: &mut OperatorContext) -> Option<Block> {
    decimal_unop(ctx, f64::cos)
}

pub fn tangent(ctx: &mut OperatorContext) -> Option<Block> {
    decimal_unop(ctx, f64::tan)
}

pub fn arc_sine(ctx: &mut OperatorContext) -> Option<Block> {
    decimal_unop(ctx, f64::asin)
}

pub fn arc_cosine(ctx: &mut OperatorContext) -> Option<Block> {
    decimal_unop(ctx, f64::acos)
}

pub fn arc_tangent(ctx: &mut OperatorContext) -> Option<Block> {
    decimal_unop(ctx, f64::atan)
}

/// ( y x -- atan2(y, x) )
pub fn arc_tangent2(ctx: &mut OperatorContext) -> Option<Block> {
    let [a, b] = ctx.numbers()?;
    Some(Block::number(a.value().atan2(b.value())))
}

#[cfg(test)]
mod tests {
    use crate::block::Block;
    use crate::vm::VirtualMachine;
    use crate::workspace::Workspace;

    fn run(body: &str) -> Vec<Block> {
        let workspace = Workspace::parse(&format!("@Poly {{ {} }}", body)).unwrap();
        let mut vm = VirtualMachine::new();
        vm.workspace = workspace;
        vm.evaluate_stack("Poly").unwrap()
    }

    fn single_number(body: &str) -> f64 {
        let result = run(body);
        assert_eq!(result.len(), 1, "{:?}", result);
        match &result[0] {
            Block::Number(n) => n.decimal(),
            other => panic!("Expected NumberBlock, got {:?}", other),
        }
    }

    #[test]
    fn test_rational_arithmetic() {
        assert_eq!(single_number("2 3 +"), 5.0);
        assert_eq!(single_number("2 3 -"), -1.0);
        assert_eq!(single_number("1 3 / 3 *"), 1.0);
        assert_eq!(single_number("2 10 pow"), 1024.0);
        assert_eq!(single_number("7 3 mod"), 1.0);

        match &run("1 3 /")[0] {
            Block::Number(n) => {
                assert_eq!(n.value.numerator(), 1.0);
                assert_eq!(n.value.denominator(), 3.0);
            }
            other => panic!("Expected NumberBlock, got {:?}", other),
        }
    }

    #[test]
    fn test_rounding() {
        assert_eq!(single_number("2.5 round"), 3.0);
        assert_eq!(single_number("-2.5 round"), -2.0);
        assert_eq!(single_number("2.1 ceil"), 3.0);
        assert_eq!(single_number("-2.1 floor"), -3.0);
        assert_eq!(single_number("-3/4 abs"), 0.75);
    }

    #[test]
    fn test_min_max_keep_operand() {
        assert_eq!(single_number("4 9 min"), 4.0);
        assert_eq!(single_number("4 9 max"), 9.0);
        assert_eq!(single_number("9 9 max"), 9.0);
    }

    #[test]
    fn test_factorial() {
        assert_eq!(single_number("5 !"), 120.0);
        assert_eq!(single_number("0 !"), 1.0);
        assert_eq!(single_number("200 !"), f64::INFINITY);
        match &run("2.5 !")[0] {
            Block::Error(message) => assert_eq!(message, "Input must be a natural number."),
            other => panic!("Expected ErrorBlock, got {:?}", other),
        }
        assert!(run("-1 !")[0].is_error());
    }

    #[test]
    fn test_transcendental() {
        assert!((single_number("2 sqrt") - std::f64::consts::SQRT_2).abs() < 1e-12);
        assert!((single_number("1000 log") - 3.0).abs() < 1e-12);
        assert!((single_number("e ln") - 1.0).abs() < 1e-12);
        assert!(single_number("π sin").abs() < 1e-12);
        assert!((single_number("1 1 arctan2") - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
    }

    #[test]
    fn test_missing_operand_message() {
        match &run("1 +")[0] {
            Block::Error(message) => assert_eq!(message, "PlusOperator requires two NumberBlocks as input."),
            other => panic!("Expected ErrorBlock, got {:?}", other),
        }
    }

    #[test]
    fn test_rand_modes() {
        let workspace = Workspace::parse("@Poly { rand rand rand }").unwrap();
        let mut vm = VirtualMachine::new();
        vm.workspace = workspace;
        vm.rand_modes = vec![crate::random::RandMode::Max, crate::random::RandMode::Min];
        let result = vm.evaluate_stack("Poly").unwrap();
        match (&result[0], &result[1], &result[2]) {
            (Block::Number(max), Block::Number(min), Block::Number(next)) => {
                assert!(max.decimal() < 1.0 && max.decimal() > 0.999);
                assert!(!max.should_round);
                assert_eq!(min.decimal(), 0.0);
                assert!(next.decimal() < 1.0);
            }
            other => panic!("Expected three NumberBlocks, got {:?}", other),
        }
    }
}
