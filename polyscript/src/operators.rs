//! Built-in operators
//!
//! Every operator is one row of [`OPERATORS`]: its serialization pattern, the
//! token it writes back, its display text, the operands it takes and the
//! function that runs it. Rows sit in registry order, so an [`Operator`]
//! doubles as an index into the table.
//!
//! Operands are checked from the top of the stack down, last declared operand
//! first. Each one is popped whether or not it fits, and a single error block
//! describing the expected operands replaces the whole group on a mismatch.

use crate::block::{Block, DataBlock, TypeTag};
use crate::localization::localize;
use crate::rational::RationalNumber;
use crate::vm::VirtualMachine;

pub mod arithmetic;
pub mod calculus;
pub mod control;
pub mod data;
pub mod logic;
pub mod memory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Rand,
    Plus,
    Minus,
    Multiply,
    Divide,
    Power,
    Modulo,
    Min,
    Max,
    Ceil,
    Floor,
    Round,
    Abs,
    Factorial,
    SquareRoot,
    Logarithm,
    NaturalLogarithm,
    Sine,
    Cosine,
    Tangent,
    ArcSine,
    ArcCosine,
    ArcTangent,
    ArcTangent2,
    LessThan,
    GreaterThan,
    LessOrEqual,
    GreaterOrEqual,
    Equal,
    Not,
    And,
    Or,
    Exec,
    Branch,
    Map,
    Fold,
    FoldHelper,
    Maybe,
    Filter,
    FilterHelper,
    Compose,
    Iterate,
    Count,
    Read,
    Elem,
    Insert,
    Append,
    Replace,
    Delete,
    Write,
    Integral,
    Derivative,
    Sum,
    Product,
    PositiveLimit,
    NegativeLimit,
    Limit,
    Get,
    Set,
}

/// Operands an operator expects.
#[derive(Debug, Clone, Copy)]
pub enum Signature {
    /// One operand per entry, bottom to top.
    Fixed(&'static [TypeTag]),
    /// Alternative operand lists of equal length; the first that fits wins.
    Overloaded(&'static [&'static [TypeTag]]),
    /// The operator takes its own operands from the stack.
    Custom,
}

/// Runs an operator on checked operands. A returned block is pushed.
pub type OperatorFunction = fn(&mut OperatorContext) -> Option<Block>;

#[derive(Debug, Clone, Copy)]
pub struct OperatorInfo {
    pub operator: Operator,
    /// Kind name, also the localization key prefix.
    pub name: &'static str,
    pub pattern: &'static str,
    pub token: &'static str,
    pub display: &'static str,
    pub signature: Signature,
    pub function: OperatorFunction,
}

impl OperatorInfo {
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        operator: Operator,
        name: &'static str,
        pattern: &'static str,
        token: &'static str,
        display: &'static str,
        signature: Signature,
        function: OperatorFunction,
    ) -> Self {
        Self {
            operator,
            name,
            pattern,
            token,
            display,
            signature,
            function,
        }
    }
}

const B: TypeTag = TypeTag::Block;
const N: TypeTag = TypeTag::Number;
const T: TypeTag = TypeTag::Boolean;
const S: TypeTag = TypeTag::String;
const D: TypeTag = TypeTag::Data;
const M: TypeTag = TypeTag::Memory;
const R: TypeTag = TypeTag::MemoryReference;

use Operator as Op;
use Signature::{Custom, Fixed, Overloaded};

pub const OPERATORS: &[OperatorInfo] = &[
    OperatorInfo::new(Op::Rand, "RandBlock", "rand", "rand", "rand", Fixed(&[]), arithmetic::rand),
    OperatorInfo::new(Op::Plus, "PlusOperator", r"\+", "+", "+", Fixed(&[N, N]), arithmetic::plus),
    OperatorInfo::new(Op::Minus, "MinusOperator", "-", "-", "-", Fixed(&[N, N]), arithmetic::minus),
    OperatorInfo::new(Op::Multiply, "MultiplyOperator", r"\*", "*", "*", Fixed(&[N, N]), arithmetic::multiply),
    OperatorInfo::new(Op::Divide, "DivideOperator", "/", "/", "÷", Fixed(&[N, N]), arithmetic::divide),
    OperatorInfo::new(Op::Power, "PowerOperator", "pow", "pow", "pow", Fixed(&[N, N]), arithmetic::power),
    OperatorInfo::new(Op::Modulo, "ModuloOperator", "%|mod|modulo", "mod", "mod", Fixed(&[N, N]), arithmetic::modulo),
    OperatorInfo::new(Op::Min, "MinOperator", "min", "min", "min", Fixed(&[N, N]), arithmetic::min),
    OperatorInfo::new(Op::Max, "MaxOperator", "max", "max", "max", Fixed(&[N, N]), arithmetic::max),
    OperatorInfo::new(Op::Ceil, "CeilOperator", "ceil", "ceil", "ceil", Fixed(&[N]), arithmetic::ceil),
    OperatorInfo::new(Op::Floor, "FloorOperator", "floor", "floor", "floor", Fixed(&[N]), arithmetic::floor),
    OperatorInfo::new(Op::Round, "RoundOperator", "round", "round", "round", Fixed(&[N]), arithmetic::round),
    OperatorInfo::new(Op::Abs, "AbsOperator", "abs", "abs", "abs", Fixed(&[N]), arithmetic::abs),
    OperatorInfo::new(Op::Factorial, "FactorialOperator", "!", "!", "!", Fixed(&[N]), arithmetic::factorial),
    OperatorInfo::new(Op::SquareRoot, "SquareRootOperator", "√|sqrt", "√", "√", Fixed(&[N]), arithmetic::square_root),
    OperatorInfo::new(Op::Logarithm, "LogarithmOperator", "log", "log", "log", Fixed(&[N]), arithmetic::logarithm),
    OperatorInfo::new(Op::NaturalLogarithm, "NaturalLogarithmOperator", "ln", "ln", "ln", Fixed(&[N]), arithmetic::natural_logarithm),
    OperatorInfo::new(Op::Sine, "SineOperator", "sin", "sin", "sin", Fixed(&[N]), arithmetic::sine),
    OperatorInfo::new(Op::Cosine, "CosineOperator", "cos", "cos", "cos", Fixed(&[N]), arithmetic::cosine),
    OperatorInfo::new(Op::Tangent, "TangentOperator", "tan", "tan", "tan", Fixed(&[N]), arithmetic::tangent),
    OperatorInfo::new(Op::ArcSine, "ArcSineOperator", "arcsin", "arcsin", "sin⁻¹", Fixed(&[N]), arithmetic::arc_sine),
    OperatorInfo::new(Op::ArcCosine, "ArcCosineOperator", "arccos", "arccos", "cos⁻¹", Fixed(&[N]), arithmetic::arc_cosine),
    OperatorInfo::new(Op::ArcTangent, "ArcTangentOperator", "arctan", "arctan", "tan⁻¹", Fixed(&[N]), arithmetic::arc_tangent),
    OperatorInfo::new(Op::ArcTangent2, "ArcTangent2Operator", "arctan2", "arctan2", "tan⁻¹\u{a0}2", Fixed(&[N, N]), arithmetic::arc_tangent2),
    OperatorInfo::new(Op::LessThan, "LTOperator", "<", "<", "<", Fixed(&[N, N]), logic::less_than),
    OperatorInfo::new(Op::GreaterThan, "GTOperator", ">", ">", ">", Fixed(&[N, N]), logic::greater_than),
    OperatorInfo::new(Op::LessOrEqual, "LEQOperator", "<=", "<=", "≤", Fixed(&[N, N]), logic::less_or_equal),
    OperatorInfo::new(Op::GreaterOrEqual, "GEQOperator", ">=", ">=", "≥", Fixed(&[N, N]), logic::greater_or_equal),
    OperatorInfo::new(Op::Equal, "EQOperator", "=", "=", "=", Fixed(&[B, B]), logic::equal),
    OperatorInfo::new(Op::Not, "NotOperator", "~", "~", "~", Fixed(&[T]), logic::not),
    OperatorInfo::new(Op::And, "AndOperator", "&", "&", "&", Fixed(&[T, T]), logic::and),
    OperatorInfo::new(Op::Or, "OrOperator", r"\|", "|", "|", Fixed(&[T, T]), logic::or),
    OperatorInfo::new(Op::Exec, "ExecBlock", "exec", "exec", "exec", Fixed(&[D]), control::exec),
    OperatorInfo::new(Op::Branch, "BranchBlock", "if", "if", "if", Fixed(&[T, D, D]), control::branch),
    OperatorInfo::new(Op::Map, "MapBlock", "map", "map", "map", Fixed(&[D, D]), control::map),
    OperatorInfo::new(Op::Fold, "FoldBlock", "fold", "fold", "fold", Fixed(&[D, D]), control::fold),
    OperatorInfo::new(Op::FoldHelper, "FoldHelperBlock", "fold`", "fold`", "fold`", Fixed(&[D, D, N]), control::fold_helper),
    OperatorInfo::new(Op::Maybe, "MaybeBlock", "maybe", "maybe", "maybe", Fixed(&[B, D, D]), control::maybe),
    OperatorInfo::new(Op::Filter, "FilterBlock", "filter", "filter", "filter", Fixed(&[D, D]), control::filter),
    OperatorInfo::new(Op::FilterHelper, "FilterHelperBlock", "filter`", "filter`", "filter`", Fixed(&[T, D, D, N]), control::filter_helper),
    OperatorInfo::new(Op::Compose, "ComposeBlock", "compose|comp|repeat", "comp", "repeat", Fixed(&[D, N]), control::compose),
    OperatorInfo::new(Op::Iterate, "IterateBlock", "iterate|iter", "iter", "iter", Fixed(&[D, N, N]), control::iterate),
    OperatorInfo::new(Op::Count, "CountOperator", "count", "count", "count", Fixed(&[D]), data::count),
    OperatorInfo::new(Op::Read, "ReadBlock", "read", "read", "read", Fixed(&[D]), data::read),
    OperatorInfo::new(Op::Elem, "ElemOperator", "elem", "elem", "elem", Overloaded(&[&[D, N], &[D, S]]), data::elem),
    OperatorInfo::new(Op::Insert, "InsertOperator", "insert", "insert", "insert", Overloaded(&[&[D, B, N], &[D, B, S]]), data::insert),
    OperatorInfo::new(Op::Append, "AppendOperator", "append", "append", "append", Fixed(&[D, B]), data::append),
    OperatorInfo::new(Op::Replace, "ReplaceOperator", "replace", "replace", "replace", Overloaded(&[&[D, B, N], &[D, B, S]]), data::replace),
    OperatorInfo::new(Op::Delete, "DeleteOperator", "delete", "delete", "delete", Overloaded(&[&[D, N], &[D, S]]), data::delete),
    OperatorInfo::new(Op::Write, "WriteBlock", "write", "write", "write", Custom, data::write),
    OperatorInfo::new(Op::Integral, "IntegralOperator", "∫|integral", "integral", "∫", Fixed(&[D, N, N]), calculus::integral),
    OperatorInfo::new(Op::Derivative, "DerivativeOperator", "𝑑|derivative", "derivative", "𝑑", Fixed(&[D, N]), calculus::derivative),
    OperatorInfo::new(Op::Sum, "SumOperator", "∑|sum", "sum", "∑", Fixed(&[D, N, N]), calculus::sum),
    OperatorInfo::new(Op::Product, "ProductOperator", "∏|product", "product", "∏", Fixed(&[D, N, N]), calculus::product),
    OperatorInfo::new(Op::PositiveLimit, "PositiveLimitOperator", r"lim\+", "lim+", "lim+", Fixed(&[D, N]), calculus::positive_limit),
    OperatorInfo::new(Op::NegativeLimit, "NegativeLimitOperator", "lim-", "lim-", "lim-", Fixed(&[D, N]), calculus::negative_limit),
    OperatorInfo::new(Op::Limit, "LimitOperator", "lim", "lim", "lim", Fixed(&[D, N]), calculus::limit),
    OperatorInfo::new(Op::Get, "GetOperator", "Get", "Get", "Get Memory", Fixed(&[M, R]), memory::get),
    OperatorInfo::new(Op::Set, "SetOperator", "Set", "Set", "Set Memory", Fixed(&[M, B, R]), memory::set),
];

impl Operator {
    pub fn info(self) -> &'static OperatorInfo {
        &OPERATORS[self as usize]
    }

    /// Localized display text.
    pub fn display(self) -> String {
        let info = self.info();
        localize(&format!("{}.string", info.name), info.display, &[])
    }
}

/// Operands of one operator invocation.
pub struct OperatorContext<'a> {
    pub vm: &'a mut VirtualMachine,
    /// The operator block being evaluated.
    pub this: &'a Block,
    /// Checked operands, bottom to top.
    pub operands: Vec<Block>,
    /// Which overload matched.
    pub combination: usize,
}

impl OperatorContext<'_> {
    pub fn operand(&self, index: usize) -> Option<&Block> {
        self.operands.get(index)
    }

    pub fn rational(&self, index: usize) -> Option<RationalNumber> {
        self.operand(index)?.as_number().map(|n| n.value)
    }

    pub fn number(&self, index: usize) -> Option<f64> {
        self.rational(index).map(|r| r.value())
    }

    /// All operands as numbers, `None` unless there are exactly `C` numbers.
    pub fn numbers<const C: usize>(&self) -> Option<[RationalNumber; C]> {
        let values = self
            .operands
            .iter()
            .map(|b| b.as_number().map(|n| n.value))
            .collect::<Option<Vec<_>>>()?;
        values.try_into().ok()
    }

    pub fn boolean(&self, index: usize) -> Option<bool> {
        self.operand(index)?.as_bool()
    }

    /// The operand bound to its workspace stack.
    pub fn resolved(&self, index: usize) -> Option<Block> {
        let mut block = self.operand(index)?.clone();
        block.resolve(&self.vm.workspace);
        Some(block)
    }

    pub fn data(&self, index: usize) -> Option<DataBlock> {
        self.resolved(index)?.as_data().cloned()
    }
}

/// Evaluates `op`, pushing either its result or an operand error.
pub fn evaluate(op: Operator, this: &Block, vm: &mut VirtualMachine) {
    let info = op.info();
    let (operands, combination) = match info.signature {
        Fixed(types) => match take_operands(vm, this, info.name, types) {
            Some(operands) => (operands, 0),
            None => return,
        },
        Overloaded(combinations) => match pop_overloaded(vm, this, combinations) {
            Some(popped) => popped,
            None => {
                vm.push(overloaded_error(info.name, combinations));
                return;
            }
        },
        Custom => (Vec::new(), 0),
    };

    let mut ctx = OperatorContext {
        vm,
        this,
        operands,
        combination,
    };
    if let Some(result) = (info.function)(&mut ctx) {
        ctx.vm.push(result);
    }
}

/// Pops one operand per entry of `types`. On a mismatch the operand error of
/// `name` is pushed and `None` returned.
pub fn take_operands(vm: &mut VirtualMachine, this: &Block, name: &str, types: &[TypeTag]) -> Option<Vec<Block>> {
    let mut operands = Vec::with_capacity(types.len());
    let mut complete = true;
    for &tag in types.iter().rev() {
        match vm.pop(Some(this)) {
            Some(block) if block.is_type(tag) => operands.push(block),
            _ => complete = false,
        }
    }
    if !complete {
        vm.push(operand_error(name, types));
        return None;
    }
    operands.reverse();
    Some(operands)
}

fn pop_overloaded(
    vm: &mut VirtualMachine,
    this: &Block,
    combinations: &[&[TypeTag]],
) -> Option<(Vec<Block>, usize)> {
    let arity = combinations.first().map_or(0, |types| types.len());
    let mut operands = Vec::with_capacity(arity);
    for _ in 0..arity {
        if let Some(block) = vm.pop(Some(this)) {
            operands.push(block);
        }
    }
    if operands.len() < arity {
        return None;
    }
    operands.reverse();
    let combination = combinations
        .iter()
        .position(|types| types.iter().zip(&operands).all(|(tag, block)| block.is_type(*tag)))?;
    Some((operands, combination))
}

fn operator_name(name: &str) -> String {
    localize(&format!("{}.name", name), name, &[])
}

/// The error pushed when the operands of `name` do not match `types`.
pub fn operand_error(name: &str, types: &[TypeTag]) -> Block {
    let op = operator_name(name);
    let n: Vec<String> = types.iter().map(|t| t.display_name()).collect();
    let one = |key: &str, fallback: &str, a: &str| {
        localize(key, fallback, &[("operatorName", &op), ("operandType", a)])
    };
    let two = |key: &str, fallback: &str, a: &str, b: &str| {
        localize(
            key,
            fallback,
            &[("operatorName", &op), ("operandType1", a), ("operandType2", b)],
        )
    };

    let message = match *types {
        [_] => one(
            "Errors.UnaryOperator",
            "{{operatorName}} requires a {{operandType}} as input.",
            &n[0],
        ),
        [t, u] if t == u => one(
            "Errors.BinaryOperator_A",
            "{{operatorName}} requires two {{operandType}}s as input.",
            &n[0],
        ),
        [_, _] => two(
            "Errors.BinaryOperator_B",
            "{{operatorName}} requires a {{operandType1}} and a {{operandType2}} as input.",
            &n[0],
            &n[1],
        ),
        [t, u, v] if t == u && u == v => one(
            "Errors.TrinaryOperator_A",
            "{{operatorName}} requires three {{operandType}}s as input.",
            &n[0],
        ),
        [t, u, _] if t == u => two(
            "Errors.TrinaryOperator_B",
            "{{operatorName}} requires two {{operandType1}}s and a {{operandType2}} as input.",
            &n[0],
            &n[2],
        ),
        [_, u, v] if u == v => two(
            "Errors.TrinaryOperator_C",
            "{{operatorName}} requires a {{operandType1}} and two {{operandType2}}s as input.",
            &n[0],
            &n[1],
        ),
        [_, _, _] => localize(
            "Errors.TrinaryOperator_D",
            "{{operatorName}} requires a {{operandType1}}, a {{operandType2}}, and a {{operandType3}} as input.",
            &[
                ("operatorName", &op),
                ("operandType1", &n[0]),
                ("operandType2", &n[1]),
                ("operandType3", &n[2]),
            ],
        ),
        [t, u, v, w] if t == u && u == v && v == w => one(
            "Errors.QuaternaryOperator_TTTT",
            "{{operatorName}} requires four {{operandType}}s as input.",
            &n[0],
        ),
        [t, u, v, _] if t == u && u == v => two(
            "Errors.QuaternaryOperator_TTTW",
            "{{operatorName}} requires three {{operandType1}}s and a {{operandType2}} as input.",
            &n[0],
            &n[3],
        ),
        [t, u, v, w] if t == u && v == w => two(
            "Errors.QuaternaryOperator_TTVV",
            "{{operatorName}} requires two {{operandType1}}s and two {{operandType2}}s as input.",
            &n[0],
            &n[2],
        ),
        [t, u, _, _] if t == u => localize(
            "Errors.QuaternaryOperator_TTVW",
            "{{operatorName}} requires two {{operandType1}}s, a {{operandType2}}, and a {{operandType3}} as input.",
            &[
                ("operatorName", &op),
                ("operandType1", &n[0]),
                ("operandType2", &n[2]),
                ("operandType3", &n[3]),
            ],
        ),
        [_, u, v, w] if u == v && v == w => two(
            "Errors.QuaternaryOperator_TUUU",
            "{{operatorName}} requires a {{operandType1}} and three {{operandType2}}s as input.",
            &n[0],
            &n[1],
        ),
        [_, u, v, _] if u == v => localize(
            "Errors.QuaternaryOperator_TUUW",
            "{{operatorName}} requires a {{operandType1}}, two {{operandType2}}s, and a {{operandType3}} as input.",
            &[
                ("operatorName", &op),
                ("operandType1", &n[0]),
                ("operandType2", &n[1]),
                ("operandType3", &n[3]),
            ],
        ),
        [_, _, _, _] => localize(
            "Errors.QuaternaryOperator_TUVW",
            "{{operatorName}} requires a {{operandType1}}, a {{operandType2}}, a {{operandType3}}, and a {{operandType4}} as input.",
            &[
                ("operatorName", &op),
                ("operandType1", &n[0]),
                ("operandType2", &n[1]),
                ("operandType3", &n[2]),
                ("operandType4", &n[3]),
            ],
        ),
        _ => localize(
            "Errors.OverloadedOperator",
            "{{operatorName}} requires {{operandPhrases}} as input.",
            &[("operatorName", &op), ("operandPhrases", &n.join(", "))],
        ),
    };
    Block::error(message)
}

fn operand_phrase(types: &[TypeTag]) -> String {
    let n: Vec<String> = types.iter().map(|t| t.display_name()).collect();
    let one = |key: &str, fallback: &str| localize(key, fallback, &[("operandType", &n[0])]);
    let two = |key: &str, fallback: &str, b: &str| {
        localize(key, fallback, &[("operandType1", &n[0]), ("operandType2", b)])
    };

    match *types {
        [t, u] if t == u => one("Errors.BinaryOperandPhrase_A", "two {{operandType}}s"),
        [_, _] => two("Errors.BinaryOperandPhrase_B", "a {{operandType1}} and a {{operandType2}}", &n[1]),
        [t, u, v] if t == u && u == v => one("Errors.TrinaryOperandPhrase_A", "three {{operandType}}s"),
        [t, u, _] if t == u => two(
            "Errors.TrinaryOperandPhrase_B",
            "two {{operandType1}}s and a {{operandType2}}",
            &n[2],
        ),
        [_, u, v] if u == v => two(
            "Errors.TrinaryOperandPhrase_C",
            "a {{operandType1}} and two {{operandType2}}s",
            &n[1],
        ),
        [_, _, _] => localize(
            "Errors.TrinaryOperandPhrase_D",
            "a {{operandType1}}, a {{operandType2}}, and a {{operandType3}}",
            &[("operandType1", &n[0]), ("operandType2", &n[1]), ("operandType3", &n[2])],
        ),
        _ => n.join(" "),
    }
}

/// The error pushed when no overload of `name` fits.
pub fn overloaded_error(name: &str, combinations: &[&[TypeTag]]) -> Block {
    let separator = match combinations.first().map(|types| types.len()) {
        Some(3) => localize("Errors.TrinaryOperandPhrase_Separator", ",", &[]),
        _ => localize("Errors.BinaryOperandPhrase_Separator", ",", &[]),
    };

    let mut phrases = String::new();
    let last = combinations.len().saturating_sub(1);
    for (i, types) in combinations.iter().enumerate() {
        let phrase = operand_phrase(types);
        let joined = if i == 0 {
            localize("Errors.OperandPhraseStart", "{{operandPhrase}}", &[("operandPhrase", &phrase)])
        } else if i == last {
            localize(
                "Errors.OperandPhraseEnd",
                "{{operandPhraseSeparator}} or {{operandPhrase}}",
                &[("operandPhraseSeparator", &separator), ("operandPhrase", &phrase)],
            )
        } else {
            localize(
                "Errors.OperandPhraseMid",
                "{{operandPhraseSeparator}} {{operandPhrase}}",
                &[("operandPhraseSeparator", &separator), ("operandPhrase", &phrase)],
            )
        };
        phrases.push_str(&joined);
    }

    Block::error(localize(
        "Errors.OverloadedOperator",
        "{{operatorName}} requires {{operandPhrases}} as input.",
        &[("operatorName", &operator_name(name)), ("operandPhrases", &phrases)],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_indexed_by_operator() {
        for (i, info) in OPERATORS.iter().enumerate() {
            assert_eq!(info.operator as usize, i, "{} is out of place", info.name);
        }
        assert_eq!(OPERATORS.last().map(|info| info.operator), Some(Operator::Set));
    }

    #[test]
    fn test_display_and_token_differ() {
        assert_eq!(Operator::Divide.display(), "÷");
        assert_eq!(Operator::Divide.info().token, "/");
        assert_eq!(Operator::Compose.display(), "repeat");
        assert_eq!(Operator::Compose.info().token, "comp");
        assert_eq!(Operator::Get.display(), "Get Memory");
    }

    #[test]
    fn test_operand_error_messages() {
        match operand_error("PlusOperator", &[N, N]) {
            Block::Error(message) => assert_eq!(message, "PlusOperator requires two NumberBlocks as input."),
            other => panic!("Expected ErrorBlock, got {:?}", other),
        }
        match operand_error("BranchBlock", &[T, D, D]) {
            Block::Error(message) => {
                assert_eq!(message, "BranchBlock requires a BooleanBlock and two DataBlocks as input.")
            }
            other => panic!("Expected ErrorBlock, got {:?}", other),
        }
        match operand_error("FoldHelperBlock", &[D, D, N]) {
            Block::Error(message) => {
                assert_eq!(message, "FoldHelperBlock requires two DataBlocks and a NumberBlock as input.")
            }
            other => panic!("Expected ErrorBlock, got {:?}", other),
        }
        match operand_error("FilterHelperBlock", &[T, D, D, N]) {
            Block::Error(message) => assert_eq!(
                message,
                "FilterHelperBlock requires a BooleanBlock, two DataBlocks, and a NumberBlock as input."
            ),
            other => panic!("Expected ErrorBlock, got {:?}", other),
        }
        match operand_error("SetOperator", &[M, B, R]) {
            Block::Error(message) => assert_eq!(
                message,
                "SetOperator requires a MemoryBlock, a Block, and a MemoryReferenceBlock as input."
            ),
            other => panic!("Expected ErrorBlock, got {:?}", other),
        }
    }

    #[test]
    fn test_overloaded_error_message() {
        match overloaded_error("ElemOperator", &[&[D, N], &[D, S]]) {
            Block::Error(message) => assert_eq!(
                message,
                "ElemOperator requires a DataBlock and a NumberBlock, or a DataBlock and a StringBlock as input."
            ),
            other => panic!("Expected ErrorBlock, got {:?}", other),
        }
        match overloaded_error("InsertOperator", &[&[D, B, N], &[D, B, S]]) {
            Block::Error(message) => assert_eq!(
                message,
                "InsertOperator requires a DataBlock, a Block, and a NumberBlock, or a DataBlock, a Block, and a StringBlock as input."
            ),
            other => panic!("Expected ErrorBlock, got {:?}", other),
        }
    }

    #[test]
    fn test_mistyped_operands_are_all_consumed() {
        let mut vm = VirtualMachine::new();
        vm.push(Block::number(1.0));
        vm.push(Block::string("x"));
        vm.push(Block::number(2.0));
        evaluate(Operator::Plus, &Block::Operator(Operator::Plus), &mut vm);
        assert_eq!(vm.stack.len(), 2);
        assert!(matches!(vm.stack[0], Block::Number(_)));
        assert!(vm.stack[1].is_error());
    }
}
