use std::fmt;
use std::rc::Rc;

use crate::escape::{escape, unescape};
use crate::localization::localize;
use crate::operators::Operator;
use crate::random;
use crate::rational::{NumberMode, RationalNumber};
use crate::stack::{Stack, StackRef};
use crate::vm::VirtualMachine;
use crate::workspace::Workspace;

/// Numeric id of a block kind supplied by a module.
pub type ExtensionId = i32;

/// Concrete kind of a block, used for exact type comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Error,
    Number,
    Boolean,
    String,
    MemoryReference,
    Memory,
    RandomInt,
    RandomReal,
    RandomBool,
    Operator(Operator),
    Let,
    Recall,
    Null,
    Data,
    Package,
    GetSymbol,
    SetSymbol,
    Color,
    Code,
    Extension(ExtensionId),
}

/// Abstract block categories operators ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Block,
    Number,
    Boolean,
    String,
    Data,
    Memory,
    MemoryReference,
}

impl TypeTag {
    pub const fn name(self) -> &'static str {
        match self {
            TypeTag::Block => "Block",
            TypeTag::Number => "NumberBlock",
            TypeTag::Boolean => "BooleanBlock",
            TypeTag::String => "StringBlock",
            TypeTag::Data => "DataBlock",
            TypeTag::Memory => "MemoryBlock",
            TypeTag::MemoryReference => "MemoryReferenceBlock",
        }
    }

    /// Localized name used inside error messages.
    pub fn display_name(self) -> String {
        localize(&format!("{}.name", self.name()), self.name(), &[])
    }
}

impl BlockKind {
    /// The is-a relation between concrete kinds and operand categories.
    pub fn is_a(self, tag: TypeTag) -> bool {
        use BlockKind as K;
        match tag {
            TypeTag::Block => true,
            TypeTag::Number => matches!(self, K::Number | K::RandomInt | K::RandomReal),
            TypeTag::Boolean => matches!(self, K::Boolean | K::RandomBool),
            TypeTag::String => self == K::String,
            TypeTag::Data => matches!(self, K::Data | K::Null | K::Package),
            TypeTag::Memory => self == K::Memory,
            TypeTag::MemoryReference => self == K::MemoryReference,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NumberBlock {
    pub value: RationalNumber,
    pub should_round: bool,
}

impl NumberBlock {
    pub fn new(value: RationalNumber) -> Self {
        Self {
            value,
            should_round: true,
        }
    }

    #[must_use]
    pub fn decimal(&self) -> f64 {
        self.value.value()
    }

    fn serialize(&self) -> String {
        let value = self.value.value();
        if value == std::f64::consts::PI {
            "π".to_owned()
        } else if value == std::f64::consts::E {
            "e".to_owned()
        } else if value == f64::INFINITY {
            "Infinity".to_owned()
        } else if value == f64::NEG_INFINITY {
            "-Infinity".to_owned()
        } else {
            self.value.to_text(NumberMode::ReducedFraction, false, true)
        }
    }

    pub fn deserialize(serial: &str) -> Self {
        let cleaned = serial.replace(',', "");
        let value = match cleaned.as_str() {
            "π" => RationalNumber::integer(std::f64::consts::PI),
            "e" => RationalNumber::integer(std::f64::consts::E),
            _ => match cleaned.split_once('/') {
                Some((n, d)) => RationalNumber::new(parse_float(n), parse_float(d).trunc()),
                None => RationalNumber::integer(parse_float(&cleaned)),
            },
        };
        Self::new(value)
    }
}

fn parse_float(s: &str) -> f64 {
    match s.trim() {
        "Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        other => other.parse().unwrap_or(f64::NAN),
    }
}

/// A number rolled from an optional range when the block is created.
#[derive(Debug, Clone, Copy)]
pub struct RandomNumber {
    pub number: NumberBlock,
    pub range: Option<(f64, f64)>,
}

impl RandomNumber {
    const INT_RANGE: (f64, f64) = (-128.0, 128.0);
    const REAL_RANGE: (f64, f64) = (-100.0, 100.0);

    fn valid_range(range: Option<(f64, f64)>) -> Option<(f64, f64)> {
        range.filter(|(min, max)| min <= max)
    }

    pub fn int(range: Option<(f64, f64)>) -> Self {
        let (min, max) = Self::valid_range(range).unwrap_or(Self::INT_RANGE);
        Self {
            number: NumberBlock::new(RationalNumber::integer(random::int(min, max))),
            range,
        }
    }

    pub fn real(range: Option<(f64, f64)>) -> Self {
        let (min, max) = Self::valid_range(range).unwrap_or(Self::REAL_RANGE);
        Self {
            number: NumberBlock::new(RationalNumber::integer(random::real(min, max))),
            range,
        }
    }

    fn serialize(&self, token: &str) -> String {
        match Self::valid_range(self.range) {
            Some((min, max)) => format!("{}({}-{})", token, min, max),
            None => token.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        let clamp = |x: f64| {
            if x.is_nan() {
                0
            } else {
                x.round().clamp(0.0, 255.0) as u8
            }
        };
        Self {
            r: clamp(r),
            g: clamp(g),
            b: clamp(b),
        }
    }

    pub fn to_hex_string(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    fn deserialize(serial: &str) -> Self {
        let inner = serial
            .find('[')
            .map(|i| &serial[i + 1..serial.len() - 1])
            .unwrap_or("");
        let mut parts = inner.split(',').map(parse_float);
        let r = parts.next().unwrap_or(0.0);
        let g = parts.next().unwrap_or(0.0);
        let b = parts.next().unwrap_or(0.0);
        Self::new(r, g, b)
    }
}

/// A block wrapping a stack used as data.
///
/// Until resolved the wrapped stack is an empty placeholder carrying only the
/// name; resolution swaps in the workspace stack of that name once.
#[derive(Debug, Clone)]
pub struct DataBlock {
    pub stack: StackRef,
    pub resolved: bool,
}

impl DataBlock {
    pub fn new(stack: StackRef) -> Self {
        Self {
            stack,
            resolved: true,
        }
    }

    pub fn placeholder(name: &str) -> Self {
        let name = if name.is_empty() { "a1" } else { name };
        Self {
            stack: Stack::new(name).into_ref(),
            resolved: false,
        }
    }

    pub fn name(&self) -> String {
        self.stack.borrow().name.clone()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.stack.borrow().blocks.len()
    }

    /// A shallow copy of the wrapped stack.
    pub fn get_stack(&self) -> Stack {
        self.stack.borrow().clone()
    }

    pub fn find_stack_in_workspace(&mut self, workspace: &Workspace) {
        if self.resolved {
            return;
        }
        let name = self.name();
        if let Some(stack) = workspace.get_stack(&name) {
            self.stack = stack;
            self.resolved = true;
        }
    }

    fn display_name(&self) -> String {
        let stack = self.stack.borrow();
        match &stack.display_name {
            Some(display) => display.clone(),
            None => stack.name.replace('_', " "),
        }
    }
}

/// A callable reference to a stack, resolved lazily by name.
#[derive(Debug, Clone)]
pub struct CodeBlock {
    pub stack: Option<StackRef>,
    pub name: String,
}

impl CodeBlock {
    pub fn new(stack: StackRef) -> Self {
        let name = stack.borrow().name.clone();
        Self {
            stack: Some(stack),
            name,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            stack: None,
            name: name.into(),
        }
    }

    pub fn find_stack_in_workspace(&mut self, workspace: &Workspace) {
        if self.stack.is_none() {
            self.stack = workspace.get_stack(&self.name);
        }
    }
}

/// Behaviour of a block kind supplied by a module.
pub trait CustomBlock: fmt::Debug {
    fn type_name(&self) -> &str;

    fn serialize(&self) -> String;

    fn display(&self) -> String {
        self.serialize()
    }

    /// Runs the block. The default pushes the block itself.
    fn evaluate(&self, this: &Block, vm: &mut VirtualMachine) {
        vm.push(this.clone());
    }

    fn equals(&self, other: &dyn CustomBlock) -> bool {
        self.type_name() == other.type_name() && self.serialize() == other.serialize()
    }
}

#[derive(Debug, Clone)]
pub struct ExtensionBlock {
    pub type_id: ExtensionId,
    pub custom: Rc<dyn CustomBlock>,
}

impl ExtensionBlock {
    pub fn new(type_id: ExtensionId, custom: Rc<dyn CustomBlock>) -> Self {
        Self { type_id, custom }
    }
}

/// The unit of computation and data.
///
/// Cloning is cheap: stack-valued blocks share their stack, which is what
/// lets data form cyclic graphs.
#[derive(Debug, Clone)]
pub enum Block {
    Error(String),
    Number(NumberBlock),
    Boolean(bool),
    String(String),
    MemoryReference(String),
    Memory(String),
    RandomInt(RandomNumber),
    RandomReal(RandomNumber),
    RandomBool(bool),
    Operator(Operator),
    Let(String),
    Recall(String),
    Null(DataBlock),
    Data(DataBlock),
    Package(DataBlock),
    GetSymbol(String),
    SetSymbol(String),
    Color(Color),
    Code(CodeBlock),
    Extension(ExtensionBlock),
}

impl Block {
    pub fn error(message: impl Into<String>) -> Self {
        Block::Error(message.into())
    }

    pub fn number(value: f64) -> Self {
        Block::Number(NumberBlock::new(RationalNumber::integer(value)))
    }

    pub fn rational(value: RationalNumber) -> Self {
        Block::Number(NumberBlock::new(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Block::String(value.into())
    }

    pub fn data(stack: StackRef) -> Self {
        Block::Data(DataBlock::new(stack))
    }

    pub fn data_named(name: &str) -> Self {
        Block::Data(DataBlock::placeholder(name))
    }

    pub fn null() -> Self {
        Block::Null(DataBlock::new(Stack::new("null").into_ref()))
    }

    /// Wraps a single block into a literal one-element data block.
    pub fn package(block: Block) -> Self {
        let mut stack = Stack::new(&block.to_string());
        stack.blocks.push(block);
        Block::Package(DataBlock::new(stack.into_ref()))
    }

    pub fn code(stack: StackRef) -> Self {
        Block::Code(CodeBlock::new(stack))
    }

    pub fn random_bool() -> Self {
        Block::RandomBool(random::real(0.0, 1.0) >= 0.5)
    }

    #[must_use]
    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Error(_) => BlockKind::Error,
            Block::Number(_) => BlockKind::Number,
            Block::Boolean(_) => BlockKind::Boolean,
            Block::String(_) => BlockKind::String,
            Block::MemoryReference(_) => BlockKind::MemoryReference,
            Block::Memory(_) => BlockKind::Memory,
            Block::RandomInt(_) => BlockKind::RandomInt,
            Block::RandomReal(_) => BlockKind::RandomReal,
            Block::RandomBool(_) => BlockKind::RandomBool,
            Block::Operator(op) => BlockKind::Operator(*op),
            Block::Let(_) => BlockKind::Let,
            Block::Recall(_) => BlockKind::Recall,
            Block::Null(_) => BlockKind::Null,
            Block::Data(_) => BlockKind::Data,
            Block::Package(_) => BlockKind::Package,
            Block::GetSymbol(_) => BlockKind::GetSymbol,
            Block::SetSymbol(_) => BlockKind::SetSymbol,
            Block::Color(_) => BlockKind::Color,
            Block::Code(_) => BlockKind::Code,
            Block::Extension(ext) => BlockKind::Extension(ext.type_id),
        }
    }

    #[must_use]
    pub fn is_type(&self, tag: TypeTag) -> bool {
        self.kind().is_a(tag)
    }

    #[must_use]
    pub fn same_type(&self, other: &Block) -> bool {
        self.kind() == other.kind()
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Block::Error(_))
    }

    /// Name of the concrete kind, e.g. `NumberBlock`.
    pub fn type_name(&self) -> String {
        match self {
            Block::Extension(ext) => ext.custom.type_name().to_owned(),
            _ => crate::registry::kind_name(self.kind()).to_owned(),
        }
    }

    pub fn as_number(&self) -> Option<&NumberBlock> {
        match self {
            Block::Number(n) => Some(n),
            Block::RandomInt(r) | Block::RandomReal(r) => Some(&r.number),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Block::Boolean(b) | Block::RandomBool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Block::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&DataBlock> {
        match self {
            Block::Data(d) | Block::Null(d) | Block::Package(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_data_mut(&mut self) -> Option<&mut DataBlock> {
        match self {
            Block::Data(d) | Block::Null(d) | Block::Package(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_code(&self) -> Option<&CodeBlock> {
        match self {
            Block::Code(c) => Some(c),
            _ => None,
        }
    }

    /// Binds an unresolved data or code block to the stack of the same name.
    /// Null and package blocks never resolve.
    pub fn resolve(&mut self, workspace: &Workspace) {
        match self {
            Block::Data(d) => d.find_stack_in_workspace(workspace),
            Block::Code(c) => c.find_stack_in_workspace(workspace),
            _ => {}
        }
    }

    /// Structural equality. Data and code blocks compare their stacks and
    /// tolerate cycles; numbers compare fuzzily.
    pub fn equals(&self, other: &Block) -> bool {
        match (self, other) {
            (Block::Data(a) | Block::Null(a) | Block::Package(a), _) => match other.as_data() {
                Some(b) => Stack::cyclic_eq(&a.stack, &b.stack),
                None => false,
            },
            (Block::Code(a), Block::Code(b)) => match (&a.stack, &b.stack) {
                (Some(x), Some(y)) => Stack::cyclic_eq(x, y),
                (None, None) => a.name == b.name,
                _ => false,
            },
            (Block::Color(a), Block::Color(b)) => a == b,
            (Block::Extension(a), Block::Extension(b)) => {
                a.type_id == b.type_id && a.custom.equals(b.custom.as_ref())
            }
            _ if !self.same_type(other) => false,
            (Block::Number(_) | Block::RandomInt(_) | Block::RandomReal(_), _) => {
                match (self.as_number(), other.as_number()) {
                    (Some(a), Some(b)) => a.value.fuzzy_eq(&b.value),
                    _ => false,
                }
            }
            (Block::Boolean(a) | Block::RandomBool(a), Block::Boolean(b) | Block::RandomBool(b)) => a == b,
            (Block::String(a), Block::String(b))
            | (Block::MemoryReference(a), Block::MemoryReference(b))
            | (Block::Memory(a), Block::Memory(b))
            | (Block::Let(a), Block::Let(b))
            | (Block::Recall(a), Block::Recall(b))
            | (Block::GetSymbol(a), Block::GetSymbol(b))
            | (Block::SetSymbol(a), Block::SetSymbol(b)) => a == b,
            _ => true,
        }
    }

    /// Canonical text form, parseable by the block grammar.
    pub fn serialize(&self) -> String {
        match self {
            Block::Error(message) if message.is_empty() => "Err".to_owned(),
            // the error grammar admits neither quotes nor line breaks
            Block::Error(message) => format!("Err(\"{}\")", message.replace('"', "'").replace('\n', " ")),
            Block::Number(n) => n.serialize(),
            Block::Boolean(b) => if *b { "T" } else { "F" }.to_owned(),
            Block::String(s) => serialize_string(s),
            Block::MemoryReference(r) => format!("MemRef[{}]", r),
            Block::Memory(id) => format!("Object[{}]", id),
            Block::RandomInt(r) => r.serialize("int"),
            Block::RandomReal(r) => r.serialize("real"),
            Block::RandomBool(_) => "bool".to_owned(),
            Block::Operator(op) => op.info().token.to_owned(),
            Block::Let(name) => format!("->${}", name),
            Block::Recall(name) => format!("${}", name),
            Block::Null(_) => "@null".to_owned(),
            Block::Data(d) => format!("@{}", escape(&d.name())),
            Block::Package(d) => match d.stack.borrow().blocks.first() {
                Some(inner) => format!("[{}]", inner.serialize()),
                None => "[]".to_owned(),
            },
            Block::GetSymbol(key) => format!("Get[{}]", key),
            Block::SetSymbol(key) => format!("Set[{}]", key),
            Block::Color(c) => format!("Color[{},{},{}]", c.r, c.g, c.b),
            Block::Code(c) => escape(&c.name),
            Block::Extension(ext) => ext.custom.serialize(),
        }
    }

    /// Builds a block of `kind` from text already matched by its pattern.
    pub fn deserialize(kind: BlockKind, serial: &str) -> Block {
        match kind {
            BlockKind::Error => {
                if serial.len() > 5 {
                    Block::error(&serial[5..serial.len() - 2])
                } else {
                    Block::error("")
                }
            }
            BlockKind::Number => Block::Number(NumberBlock::deserialize(serial)),
            BlockKind::Boolean => Block::Boolean(serial == "T"),
            BlockKind::String => Block::String(deserialize_string(serial)),
            BlockKind::MemoryReference => Block::MemoryReference(between(serial, 7, 1).to_owned()),
            BlockKind::Memory => {
                let id = match serial.find(',') {
                    Some(comma) => &serial[7..comma],
                    None => between(serial, 7, 1),
                };
                Block::Memory(id.to_owned())
            }
            BlockKind::RandomInt => Block::RandomInt(RandomNumber::int(parse_range(serial))),
            BlockKind::RandomReal => Block::RandomReal(RandomNumber::real(parse_range(serial))),
            BlockKind::RandomBool => Block::random_bool(),
            BlockKind::Operator(op) => Block::Operator(op),
            BlockKind::Let => Block::Let(serial.get(3..).unwrap_or("").to_owned()),
            BlockKind::Recall => Block::Recall(serial.get(1..).unwrap_or("").to_owned()),
            BlockKind::Null => Block::null(),
            BlockKind::Data => Block::data_named(&unescape(serial.get(1..).unwrap_or(""))),
            BlockKind::Package => {
                let inner = between(serial, 1, 1);
                Block::package(crate::registry::create_block(inner))
            }
            BlockKind::GetSymbol => Block::GetSymbol(between(serial, 4, 1).to_owned()),
            BlockKind::SetSymbol => Block::SetSymbol(between(serial, 4, 1).to_owned()),
            BlockKind::Color => Block::Color(Color::deserialize(serial)),
            BlockKind::Code => Block::Code(CodeBlock::named(unescape(serial))),
            BlockKind::Extension(_) => crate::registry::create_block(serial),
        }
    }
}

fn between(s: &str, start: usize, end: usize) -> &str {
    if s.len() < start + end {
        return "";
    }
    s.get(start..s.len() - end).unwrap_or("")
}

fn serialize_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn deserialize_string(serial: &str) -> String {
    between(serial, 1, 1).replace("\\\"", "\"").replace("\\\\", "\\")
}

fn parse_range(serial: &str) -> Option<(f64, f64)> {
    let inner = serial.strip_suffix(')')?.split_once('(')?.1;
    // the separator is the first '-' that is not a sign
    let split = inner
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c == '-')
        .map(|(i, _)| i)?;
    let min = parse_float(&inner[..split]);
    let max = parse_float(&inner[split + 1..]);
    Some((min, max))
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Block::Error(_) => write!(f, "Err"),
            Block::Number(n) => write!(f, "{}", n.value.to_text(NumberMode::IntAndFraction, n.should_round, false)),
            Block::RandomInt(r) | Block::RandomReal(r) => write!(
                f,
                "{}",
                r.number.value.to_text(NumberMode::IntAndFraction, r.number.should_round, false)
            ),
            Block::Boolean(b) | Block::RandomBool(b) => {
                let fallback = if *b { "T" } else { "F" };
                write!(f, "{}", localize(&format!("BooleanBlock.{}", b), fallback, &[]))
            }
            Block::String(s) => write!(f, "{}", serialize_string(s)),
            Block::MemoryReference(r) | Block::Memory(r) => write!(f, "{}", r),
            Block::Operator(op) => write!(f, "{}", op.display()),
            Block::Let(name) => {
                let var = localize(&format!("VariableNames.{}", name), name, &[]);
                write!(f, "{}", localize("LetBlock.string", "→\u{a0}{{varName}}", &[("varName", &var)]))
            }
            Block::Recall(name) => write!(f, "{}", localize(&format!("VariableNames.{}", name), name, &[])),
            Block::Null(_) => write!(f, "{}", localize("NullBlock.string", "@null", &[])),
            Block::Data(d) => write!(f, "@{}", d.display_name()),
            Block::Package(d) => match d.stack.borrow().blocks.first() {
                Some(inner) => write!(f, "[{}]", inner),
                None => write!(f, "[]"),
            },
            Block::GetSymbol(_) => write!(f, "{}", localize("GetSymbolOperator.string", "Get", &[])),
            Block::SetSymbol(_) => write!(f, "{}", localize("SetSymbolOperator.string", "Set", &[])),
            Block::Color(c) => write!(f, "{}, {}, {}", c.r, c.g, c.b),
            Block::Code(c) => match &c.stack {
                Some(stack) => {
                    let stack = stack.borrow();
                    match &stack.display_name {
                        Some(display) => write!(f, "{}", display),
                        None => write!(f, "{}", stack.name.replace('_', " ")),
                    }
                }
                None => write!(f, "{}", c.name.replace('_', " ")),
            },
            Block::Extension(ext) => write!(f, "{}", ext.custom.display()),
        }
    }
}
