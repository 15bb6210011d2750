//! Block type registry
//!
//! Every block kind owns one serialization pattern. The registry lines the
//! patterns up in a fixed order, joins them into one alternation with a
//! capture group per kind, and derives every grammar the crate parses from
//! that alternation: single blocks, stack bodies, workspaces and input
//! definitions. Which group matched tells which kind to construct.
//!
//! Modules may contribute extra kinds. Their patterns go first and the whole
//! table is rebuilt when a module is loaded.

use std::sync::Arc;

use parking_lot::{RwLock, const_rwlock};
use regex::{Regex, RegexBuilder};

use crate::block::{Block, BlockKind};
use crate::error::{Error, Result};
use crate::localization::localize;
use crate::operators::{OPERATORS, Operator};
use crate::program::ProgramState;

const REGEX_SIZE_LIMIT: usize = 64 << 20;

/// Characters a name token may not contain.
const NAME: &str = r#"[^\s{}()\[\]"]+"#;

/// A block kind contributed by a module.
#[derive(Debug, Clone)]
pub struct ModuleBlockType {
    pub name: String,
    pub pattern: String,
}

/// An extension package adding block kinds to the language.
pub trait PolyscriptModule: Send + Sync {
    fn name(&self) -> &str;

    /// First numeric id of the module's kinds; the rest follow in order.
    fn start_id(&self) -> i32;

    fn block_types(&self) -> Vec<ModuleBlockType>;

    /// Builds a block of the `index`th kind from text its pattern matched.
    /// Patterns may only use non-capturing groups `(?:...)`.
    fn deserialize(&self, index: usize, serial: &str) -> Block;

    /// Runs whenever a program frame finishes its list.
    fn post_evaluate(&self, _result: &mut Vec<Block>, _state: &ProgramState) {}
}

#[derive(Clone)]
enum Deserializer {
    Core(BlockKind),
    Module(Arc<dyn PolyscriptModule>, usize),
}

/// One entry of the registry.
#[derive(Clone)]
pub struct BlockType {
    pub name: String,
    pub pattern: String,
    deserializer: Deserializer,
}

impl BlockType {
    fn core(kind: BlockKind) -> Self {
        Self {
            name: kind_name(kind).to_owned(),
            pattern: kind_pattern(kind).to_owned(),
            deserializer: Deserializer::Core(kind),
        }
    }

    /// The core kind behind this entry, `None` for module kinds.
    pub fn kind(&self) -> Option<BlockKind> {
        match self.deserializer {
            Deserializer::Core(kind) => Some(kind),
            Deserializer::Module(..) => None,
        }
    }

    pub fn deserialize(&self, serial: &str) -> Block {
        match &self.deserializer {
            Deserializer::Core(kind) => Block::deserialize(*kind, serial),
            Deserializer::Module(module, index) => module.deserialize(*index, serial),
        }
    }
}

impl std::fmt::Debug for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockType")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .finish()
    }
}

/// Name of a concrete kind, e.g. `NumberBlock` or `PlusOperator`.
pub fn kind_name(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Error => "ErrorBlock",
        BlockKind::Number => "NumberBlock",
        BlockKind::Boolean => "BooleanBlock",
        BlockKind::String => "StringBlock",
        BlockKind::MemoryReference => "MemoryReferenceBlock",
        BlockKind::Memory => "MemoryBlock",
        BlockKind::RandomInt => "RandomIntBlock",
        BlockKind::RandomReal => "RandomRealBlock",
        BlockKind::RandomBool => "RandomBoolBlock",
        BlockKind::Operator(op) => op.info().name,
        BlockKind::Let => "LetBlock",
        BlockKind::Recall => "RecallBlock",
        BlockKind::Null => "NullBlock",
        BlockKind::Data => "DataBlock",
        BlockKind::Package => "PackageBlock",
        BlockKind::GetSymbol => "GetSymbolOperator",
        BlockKind::SetSymbol => "SetSymbolOperator",
        BlockKind::Color => "ColorBlock",
        BlockKind::Code => "CodeBlock",
        BlockKind::Extension(_) => "ExtensionBlock",
    }
}

fn kind_pattern(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Error => r#"Err(?:\("[^\n"]*"\))?"#,
        BlockKind::Number => {
            r"(?:-?[0-9,]+\.?[0-9]*(?:[eE][+-]?[0-9]+)?(?:/-?[0-9]+)?|-?Infinity|NaN|π|e)"
        }
        BlockKind::Boolean => "[TF]",
        BlockKind::String => r#""(?:[^\\"]|\\.)*""#,
        BlockKind::MemoryReference => r"MemRef\[[^\[\]]*\]",
        BlockKind::Memory => r"Object\[[0-9A-Za-z_]*(?:, \{.*\})?\]",
        BlockKind::RandomInt => r"int(?:\(-?[0-9]+--?[0-9]+\))?",
        BlockKind::RandomReal => {
            r"real(?:\(-?[0-9,]+\.?[0-9]*(?:[eE][+-]?[0-9]+)?--?[0-9,]+\.?[0-9]*(?:[eE][+-]?[0-9]+)?\))?"
        }
        BlockKind::RandomBool => "bool",
        BlockKind::Operator(op) => op.info().pattern,
        BlockKind::Let => r#"->\$[^\s{}()\[\]"]+"#,
        BlockKind::Recall => r#"\$[^\s{}()\[\]"]+"#,
        BlockKind::Null => "@null",
        BlockKind::Data => r#"@[^\s{}()\[\]"]+"#,
        BlockKind::Package => r#"\[[^"\[\]]*?\]|\["(?:[^\\"]|\\.)*"\]"#,
        BlockKind::GetSymbol => r"Get\[[^\[\]]*\]",
        BlockKind::SetSymbol => r"Set\[[^\[\]]*\]",
        BlockKind::Color => r"Color\[[0-9]+,[0-9]+,[0-9]+\]",
        BlockKind::Code => NAME,
        BlockKind::Extension(_) => "",
    }
}

/// Core kinds in registry order. Null precedes Data so `@null` is never
/// read as a data reference, and Code comes last as the catch-all.
fn core_kinds() -> Vec<BlockKind> {
    let mut kinds = vec![
        BlockKind::Error,
        BlockKind::Number,
        BlockKind::Boolean,
        BlockKind::String,
        BlockKind::MemoryReference,
        BlockKind::Memory,
        BlockKind::RandomInt,
        BlockKind::RandomReal,
        BlockKind::RandomBool,
    ];

    for info in OPERATORS {
        kinds.push(BlockKind::Operator(info.operator));
        match info.operator {
            Operator::Or => kinds.extend([BlockKind::Let, BlockKind::Recall]),
            Operator::Iterate => kinds.extend([BlockKind::Null, BlockKind::Data, BlockKind::Package]),
            _ => {}
        }
    }

    kinds.extend([
        BlockKind::GetSymbol,
        BlockKind::SetSymbol,
        BlockKind::Color,
        BlockKind::Code,
    ]);
    kinds
}

fn build_regex(pattern: &str) -> Result<Regex> {
    let regex = RegexBuilder::new(pattern)
        .size_limit(REGEX_SIZE_LIMIT)
        .dfa_size_limit(REGEX_SIZE_LIMIT)
        .build()?;
    Ok(regex)
}

/// The compiled grammar for one set of block kinds.
pub struct TypeRegistry {
    types: Vec<BlockType>,
    type_pattern: String,
    single: Regex,
    block: Regex,
    block_list: Regex,
    stack: Regex,
    workspace: Regex,
    input: Regex,
    input_definition: Regex,
    input_name: Regex,
}

impl TypeRegistry {
    fn build(modules: &[Arc<dyn PolyscriptModule>]) -> Result<Self> {
        let mut types = Vec::new();
        for module in modules {
            for (index, block_type) in module.block_types().into_iter().enumerate() {
                // each pattern has to compile on its own before it is spliced in,
                // and the kind is told apart by group index, so no groups of its own
                if build_regex(&block_type.pattern)?.captures_len() > 1 {
                    return Err(Error::CapturingPattern(block_type.name));
                }
                types.push(BlockType {
                    name: block_type.name,
                    pattern: block_type.pattern,
                    deserializer: Deserializer::Module(module.clone(), index),
                });
            }
        }
        types.extend(core_kinds().into_iter().map(BlockType::core));

        let type_pattern = types
            .iter()
            .map(|t| format!("({})", t.pattern))
            .collect::<Vec<_>>()
            .join("|");
        let any_type = types
            .iter()
            .map(|t| format!("(?:{})", t.pattern))
            .collect::<Vec<_>>()
            .join("|");

        let stack_pattern = format!(
            r"@([^\s{{}}]+)[\s]*(?:\([\s]*((?:[^\s{{}}]+[\s]+)*)\)[\s]*)?(\{{[\s]+(?:(?:{})[\s]+)*\}})",
            any_type
        );
        let input_pattern = format!(
            r"#([^\s{{}}]+)[\s]*(\{{[\s]+(?:(?:{})[\s]+)*\}})[\s]*",
            any_type
        );

        let registry = Self {
            single: build_regex(&format!("^(?:{})$", type_pattern))?,
            block: build_regex(&format!(r"(?:{})[\s]+", type_pattern))?,
            block_list: build_regex(&format!(r"^[\s]*(?:(?:{})[\s]+)*$", any_type))?,
            stack: build_regex(&stack_pattern)?,
            workspace: build_regex(&format!(r"^(?:{}[\s]*)*[\s]*$", stack_pattern))?,
            input: build_regex(&input_pattern)?,
            input_definition: build_regex(&format!(r"^(?:{})*[\s]*$", input_pattern))?,
            input_name: build_regex(r"[^\s{}]+")?,
            types,
            type_pattern,
        };
        log::debug!(
            "built block type registry with {} kinds ({} from modules)",
            registry.types.len(),
            modules.len()
        );
        Ok(registry)
    }

    pub fn types(&self) -> &[BlockType] {
        &self.types
    }

    /// The combined alternation, one capture group per kind.
    pub fn type_pattern(&self) -> &str {
        &self.type_pattern
    }

    /// Builds one block from a whole token.
    pub fn create_block(&self, text: &str) -> Block {
        match self.single.captures(text) {
            Some(caps) => self.block_from_captures(&caps),
            None => Block::error(localize(
                "Errors.CreateBlock.nomatch",
                "Input \"{{blockString}}\" to CreateBlock does not match any block's serialization pattern.",
                &[("blockString", text)],
            )),
        }
    }

    fn block_from_captures(&self, caps: &regex::Captures<'_>) -> Block {
        for (index, block_type) in self.types.iter().enumerate() {
            if let Some(m) = caps.get(index + 1) {
                return block_type.deserialize(m.as_str());
            }
        }
        Block::error("")
    }

    /// Reads a whitespace separated block list. The text must already have
    /// been validated by one of the enclosing grammars.
    pub fn parse_blocks(&self, body: &str) -> Vec<Block> {
        let body = format!("{} ", body.trim());
        self.block
            .captures_iter(&body)
            .map(|caps| self.block_from_captures(&caps))
            .collect()
    }

    /// Whether `text` is nothing but whitespace separated blocks.
    pub fn is_block_list(&self, text: &str) -> bool {
        self.block_list.is_match(&format!("{} ", text.trim()))
    }

    pub(crate) fn stack_regex(&self) -> &Regex {
        &self.stack
    }

    pub(crate) fn workspace_regex(&self) -> &Regex {
        &self.workspace
    }

    pub(crate) fn input_regex(&self) -> &Regex {
        &self.input
    }

    pub(crate) fn input_definition_regex(&self) -> &Regex {
        &self.input_definition
    }

    /// Splits a parameter list into names.
    pub(crate) fn input_names(&self, text: &str) -> Vec<String> {
        self.input_name
            .find_iter(text)
            .map(|m| m.as_str().to_owned())
            .collect()
    }
}

/// Strips the braces of a `{ ... }` group.
pub(crate) fn brace_body(group: &str) -> &str {
    group
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(group)
}

static MODULES: RwLock<Vec<Arc<dyn PolyscriptModule>>> = const_rwlock(Vec::new());
static REGISTRY: RwLock<Option<Arc<TypeRegistry>>> = const_rwlock(None);

/// The live registry, built on first use.
pub fn registry() -> Result<Arc<TypeRegistry>> {
    if let Some(registry) = REGISTRY.read().as_ref() {
        return Ok(registry.clone());
    }

    let mut slot = REGISTRY.write();
    if let Some(registry) = slot.as_ref() {
        return Ok(registry.clone());
    }
    let registry = Arc::new(TypeRegistry::build(&MODULES.read())?);
    *slot = Some(registry.clone());
    Ok(registry)
}

/// Registers a module and rebuilds the grammar. Loading a module twice is a
/// no-op. On a bad pattern nothing changes.
pub fn load_module(module: Arc<dyn PolyscriptModule>) -> Result<()> {
    let mut modules = MODULES.write();
    if modules.iter().any(|m| m.name() == module.name()) {
        return Ok(());
    }

    let mut candidate = modules.clone();
    candidate.push(module.clone());
    let registry = TypeRegistry::build(&candidate)?;

    log::debug!("loaded polyscript module {}", module.name());
    *modules = candidate;
    *REGISTRY.write() = Some(Arc::new(registry));
    Ok(())
}

/// Modules in load order.
pub fn modules() -> Vec<Arc<dyn PolyscriptModule>> {
    MODULES.read().clone()
}

/// Names of every registered kind, in grammar order.
pub fn type_list() -> Result<Vec<String>> {
    Ok(registry()?.types().iter().map(|t| t.name.clone()).collect())
}

/// Source of the combined alternation.
pub fn type_regex() -> Result<String> {
    Ok(registry()?.type_pattern().to_owned())
}

/// Builds a single block from its serialized form.
pub fn create_block(text: &str) -> Block {
    match registry() {
        Ok(registry) => registry.create_block(text),
        Err(err) => Block::error(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{CustomBlock, ExtensionBlock};
    use crate::workspace::Workspace;
    use std::rc::Rc;

    #[derive(Debug)]
    struct Vector(Vec<i64>);

    impl CustomBlock for Vector {
        fn type_name(&self) -> &str {
            "VectorBlock"
        }

        fn serialize(&self) -> String {
            let parts: Vec<String> = self.0.iter().map(|x| x.to_string()).collect();
            format!("Vec[{}]", parts.join(","))
        }
    }

    struct VectorModule;

    impl PolyscriptModule for VectorModule {
        fn name(&self) -> &str {
            "vectors"
        }

        fn start_id(&self) -> i32 {
            9000
        }

        fn block_types(&self) -> Vec<ModuleBlockType> {
            vec![ModuleBlockType {
                name: "VectorBlock".into(),
                pattern: r"Vec\[-?[0-9]+(?:,-?[0-9]+)*\]".into(),
            }]
        }

        fn deserialize(&self, _index: usize, serial: &str) -> Block {
            let inner = &serial[4..serial.len() - 1];
            let values = inner.split(',').filter_map(|x| x.parse().ok()).collect();
            Block::Extension(ExtensionBlock::new(self.start_id(), Rc::new(Vector(values))))
        }
    }

    struct BrokenModule;

    impl PolyscriptModule for BrokenModule {
        fn name(&self) -> &str {
            "broken"
        }

        fn start_id(&self) -> i32 {
            9100
        }

        fn block_types(&self) -> Vec<ModuleBlockType> {
            vec![ModuleBlockType {
                name: "BrokenBlock".into(),
                pattern: "(unclosed".into(),
            }]
        }

        fn deserialize(&self, _index: usize, _serial: &str) -> Block {
            Block::null()
        }
    }

    struct GroupedModule;

    impl PolyscriptModule for GroupedModule {
        fn name(&self) -> &str {
            "grouped"
        }

        fn start_id(&self) -> i32 {
            9200
        }

        fn block_types(&self) -> Vec<ModuleBlockType> {
            vec![ModuleBlockType {
                name: "PairBlock".into(),
                pattern: r"Pair<([0-9]+),([0-9]+)>".into(),
            }]
        }

        fn deserialize(&self, _index: usize, _serial: &str) -> Block {
            Block::null()
        }
    }

    #[test]
    fn test_null_precedes_data() {
        let names = type_list().unwrap();
        let null = names.iter().position(|n| n == "NullBlock").unwrap();
        let data = names.iter().position(|n| n == "DataBlock").unwrap();
        assert!(null < data);
        assert_eq!(names.last().map(String::as_str), Some("CodeBlock"));
    }

    #[test]
    fn test_create_block_kinds() {
        assert!(matches!(create_block("@null"), Block::Null(_)));
        assert!(matches!(create_block("@stuff"), Block::Data(_)));
        assert!(matches!(create_block("arctan2"), Block::Operator(Operator::ArcTangent2)));
        assert!(matches!(create_block("arctan"), Block::Operator(Operator::ArcTangent)));
        assert!(matches!(create_block("lim+"), Block::Operator(Operator::PositiveLimit)));
        assert!(matches!(create_block("integral"), Block::Operator(Operator::Integral)));
        assert!(matches!(create_block("Get[speed]"), Block::GetSymbol(_)));
        assert!(matches!(create_block("Get"), Block::Operator(Operator::Get)));
        assert!(matches!(create_block("exec"), Block::Operator(Operator::Exec)));
        assert!(matches!(create_block("execute"), Block::Code(_)));
        assert!(matches!(create_block("-3.5"), Block::Number(_)));
        assert!(matches!(create_block("-"), Block::Operator(Operator::Minus)));
    }

    #[test]
    fn test_create_block_no_match() {
        match create_block("two words") {
            Block::Error(message) => assert_eq!(
                message,
                "Input \"two words\" to CreateBlock does not match any block's serialization pattern."
            ),
            other => panic!("Expected ErrorBlock, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_blocks_prefers_longer_tokens() {
        let registry = registry().unwrap();
        let blocks = registry.parse_blocks("  fold` fold filter` <= < lim- lim  ");
        let kinds: Vec<BlockKind> = blocks.iter().map(Block::kind).collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::Operator(Operator::FoldHelper),
                BlockKind::Operator(Operator::Fold),
                BlockKind::Operator(Operator::FilterHelper),
                BlockKind::Operator(Operator::LessOrEqual),
                BlockKind::Operator(Operator::LessThan),
                BlockKind::Operator(Operator::NegativeLimit),
                BlockKind::Operator(Operator::Limit),
            ]
        );
    }

    #[test]
    fn test_module_extends_grammar() {
        load_module(Arc::new(VectorModule)).unwrap();
        load_module(Arc::new(VectorModule)).unwrap();

        let names = type_list().unwrap();
        assert_eq!(names.iter().filter(|n| *n == "VectorBlock").count(), 1);
        assert_eq!(names.first().map(String::as_str), Some("VectorBlock"));

        match create_block("Vec[1,-2,3]") {
            Block::Extension(ext) => {
                assert_eq!(ext.type_id, 9000);
                assert_eq!(ext.custom.serialize(), "Vec[1,-2,3]");
            }
            other => panic!("Expected ExtensionBlock, got {:?}", other),
        }

        let workspace = Workspace::deserialize("@Poly { Vec[4,5] 1 }").unwrap();
        let poly = workspace.get_stack("Poly").unwrap();
        assert!(matches!(poly.borrow().blocks[0], Block::Extension(_)));
    }

    #[test]
    fn test_bad_module_pattern_is_rejected() {
        assert!(load_module(Arc::new(BrokenModule)).is_err());
        assert!(!modules().iter().any(|m| m.name() == "broken"));
        assert!(matches!(create_block("1"), Block::Number(_)));
    }

    #[test]
    fn test_capturing_module_pattern_is_rejected() {
        match load_module(Arc::new(GroupedModule)) {
            Err(Error::CapturingPattern(name)) => assert_eq!(name, "PairBlock"),
            other => panic!("Expected CapturingPattern, got {:?}", other),
        }
        assert!(!modules().iter().any(|m| m.name() == "grouped"));
        assert!(matches!(create_block("T"), Block::Boolean(true)));
    }
}
