//! JSON projection of workspaces
//!
//! Hosts that store puzzles keep stacks as plain records: every block is its
//! numeric kind id next to its serialized text. The ids are grouped by
//! family and stay stable across releases, so stored records keep their
//! meaning when kinds are added.

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::error::{Error, Result};
use crate::registry::{brace_body, create_block, registry};
use crate::stack::Stack;
use crate::workspace::Workspace;

/// Id of a kind missing from the table.
pub const UNKNOWN_TYPE: i32 = -9999;

pub const TYPE_IDS: &[(&str, i32)] = &[
    ("ErrorBlock", 1000),
    ("NumberBlock", 1001),
    ("BooleanBlock", 1002),
    ("StringBlock", 1003),
    ("RandomIntBlock", 1004),
    ("RandomRealBlock", 1005),
    ("RandomBoolBlock", 1006),
    ("MemoryReferenceBlock", 1007),
    ("ColorBlock", 1008),
    ("PlusOperator", 2000),
    ("MinusOperator", 2001),
    ("MultiplyOperator", 2002),
    ("DivideOperator", 2003),
    ("PowerOperator", 2004),
    ("ModuloOperator", 2005),
    ("CeilOperator", 2006),
    ("FloorOperator", 2007),
    ("RoundOperator", 2008),
    ("AbsOperator", 2009),
    ("FactorialOperator", 2010),
    ("SquareRootOperator", 2011),
    ("LogarithmOperator", 2012),
    ("NaturalLogarithmOperator", 2013),
    ("SineOperator", 2014),
    ("CosineOperator", 2015),
    ("TangentOperator", 2016),
    ("ArcSineOperator", 2017),
    ("ArcCosineOperator", 2018),
    ("ArcTangentOperator", 2019),
    ("ArcTangent2Operator", 2020),
    ("MinOperator", 2021),
    ("MaxOperator", 2022),
    ("LTOperator", 3000),
    ("GTOperator", 3001),
    ("LEQOperator", 3002),
    ("GEQOperator", 3003),
    ("EQOperator", 3004),
    ("NotOperator", 3005),
    ("AndOperator", 3006),
    ("OrOperator", 3007),
    ("LetBlock", 4000),
    ("RecallBlock", 4001),
    ("DataBlock", 5000),
    ("NullBlock", 5001),
    ("CountOperator", 5002),
    ("ReadBlock", 5003),
    ("ElemOperator", 5004),
    ("InsertOperator", 5005),
    ("AppendOperator", 5006),
    ("ReplaceOperator", 5007),
    ("DeleteOperator", 5008),
    ("WriteBlock", 5009),
    ("PackageBlock", 5010),
    ("CodeBlock", 6000),
    ("ExecBlock", 6001),
    ("BranchBlock", 6002),
    ("MapBlock", 6003),
    ("FoldBlock", 6004),
    ("FoldHelperBlock", 6005),
    ("MaybeBlock", 6006),
    ("FilterBlock", 6007),
    ("ComposeBlock", 6008),
    ("IterateBlock", 6009),
    ("FilterHelperBlock", 6011),
    ("IntegralOperator", 7000),
    ("DerivativeOperator", 7001),
    ("SumOperator", 7002),
    ("ProductOperator", 7003),
    ("LimitOperator", 7004),
    ("PositiveLimitOperator", 7005),
    ("NegativeLimitOperator", 7006),
    ("RandBlock", 8000),
    ("MemoryBlock", 8001),
    ("GetOperator", 8002),
    ("SetOperator", 8003),
];

/// Numeric kind id of `block`. Module kinds carry their own id.
pub fn type_id(block: &Block) -> i32 {
    if let Block::Extension(ext) = block {
        return ext.type_id;
    }
    let name = block.type_name();
    TYPE_IDS
        .iter()
        .find(|(kind, _)| *kind == name)
        .map_or(UNKNOWN_TYPE, |(_, id)| *id)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDefinition {
    #[serde(rename = "type")]
    pub type_id: i32,
    pub data: String,
}

impl BlockDefinition {
    pub fn from_block(block: &Block) -> Self {
        Self {
            type_id: type_id(block),
            data: block.serialize(),
        }
    }

    /// Normalizes a single token through the block grammar. Text that is no
    /// block becomes an error record.
    pub fn from_serialized(serial: &str) -> Self {
        Self::from_block(&create_block(serial))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StackDefinition {
    pub name: String,
    #[serde(default)]
    pub blocks: Vec<BlockDefinition>,
    #[serde(default)]
    pub inputs: Vec<String>,
}

impl StackDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn from_stack(stack: &Stack) -> Self {
        Self {
            name: stack.name.clone(),
            blocks: stack.blocks.iter().map(BlockDefinition::from_block).collect(),
            inputs: stack.inputs.clone(),
        }
    }
}

/// One named input column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputDefinition {
    pub name: String,
    #[serde(default)]
    pub blocks: Vec<BlockDefinition>,
}

pub fn workspace_to_json(workspace: &Workspace) -> Vec<StackDefinition> {
    workspace
        .stacks()
        .iter()
        .map(|stack| StackDefinition::from_stack(&stack.borrow()))
        .collect()
}

/// Projects workspace text. Malformed text projects to nothing.
pub fn convert_workspace_text(text: &str) -> Vec<StackDefinition> {
    Workspace::deserialize(text)
        .map(|workspace| workspace_to_json(&workspace))
        .unwrap_or_default()
}

/// Rebuilds a workspace from stored records. Each block is recreated from its
/// text; the numeric id is informational only.
pub fn load_workspace_json(stacks: &[StackDefinition]) -> Workspace {
    let mut workspace = Workspace::new();
    for definition in stacks {
        let stack = workspace.create_stack(Some(&definition.name));
        let mut stack = stack.borrow_mut();
        stack.blocks = definition.blocks.iter().map(|b| create_block(&b.data)).collect();
        stack.inputs = definition.inputs.clone();
    }
    workspace.resolve_references();
    workspace
}

pub fn workspace_from_json(json: &str) -> Result<Workspace> {
    let stacks: Vec<StackDefinition> = serde_json::from_str(json)?;
    Ok(load_workspace_json(&stacks))
}

pub fn workspace_json_string(workspace: &Workspace) -> Result<String> {
    Ok(serde_json::to_string_pretty(&workspace_to_json(workspace))?)
}

/// Projects `#name { blocks }` input records.
pub fn convert_input_text(text: &str) -> Result<Vec<InputDefinition>> {
    let registry = registry()?;
    if !registry.input_definition_regex().is_match(text) {
        return Err(Error::InputDefinitionParse);
    }

    Ok(registry
        .input_regex()
        .captures_iter(text)
        .map(|caps| InputDefinition {
            name: caps.get(1).map_or("", |m| m.as_str()).to_owned(),
            blocks: caps
                .get(2)
                .map(|body| registry.parse_blocks(brace_body(body.as_str())))
                .unwrap_or_default()
                .iter()
                .map(BlockDefinition::from_block)
                .collect(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(definition: &StackDefinition) -> Vec<i32> {
        definition.blocks.iter().map(|b| b.type_id).collect()
    }

    #[test]
    fn test_project_workspace() {
        let stacks = convert_workspace_text("@Poly ( x ) { 1 $x + @list f }\n@list { T \"a\" }\n@f { }");
        assert_eq!(stacks.len(), 3);

        let poly = &stacks[0];
        assert_eq!(poly.name, "Poly");
        assert_eq!(poly.inputs, vec!["x"]);
        assert_eq!(ids(poly), vec![1001, 4001, 2000, 5000, 6000]);
        assert_eq!(poly.blocks[1].data, "$x");
        assert_eq!(poly.blocks[2].data, "+");

        assert_eq!(ids(&stacks[1]), vec![1002, 1003]);
        assert!(stacks[2].blocks.is_empty());
    }

    #[test]
    fn test_malformed_workspace_projects_to_nothing() {
        assert!(convert_workspace_text("@Poly { 1 2").is_empty());
    }

    #[test]
    fn test_type_ids() {
        assert_eq!(BlockDefinition::from_serialized("@null").type_id, 5001);
        assert_eq!(BlockDefinition::from_serialized("lim").type_id, 7004);
        assert_eq!(BlockDefinition::from_serialized("Object[lamp]").type_id, 8001);
        assert_eq!(BlockDefinition::from_serialized("filter`").type_id, 6011);
        assert_eq!(BlockDefinition::from_serialized("Get[on]").type_id, UNKNOWN_TYPE);

        let bad = BlockDefinition::from_serialized("{");
        assert_eq!(bad.type_id, 1000);
    }

    #[test]
    fn test_json_field_names() {
        let definition = StackDefinition {
            name: "Poly".to_owned(),
            blocks: vec![BlockDefinition::from_serialized("3")],
            inputs: vec![],
        };
        let json = serde_json::to_string(&definition).unwrap();
        assert_eq!(json, r#"{"name":"Poly","blocks":[{"type":1001,"data":"3"}],"inputs":[]}"#);
    }

    #[test]
    fn test_load_workspace_json_resolves_references() {
        let json = r#"[
            {"name": "Poly", "blocks": [{"type": 5000, "data": "@list"}, {"type": 5002, "data": "count"}]},
            {"name": "list", "blocks": [{"type": 1001, "data": "1"}, {"type": 1001, "data": "2"}], "inputs": []}
        ]"#;
        let workspace = workspace_from_json(json).unwrap();
        assert_eq!(workspace.stacks().len(), 2);

        let poly = workspace.get_stack("Poly").unwrap();
        match &poly.borrow().blocks[0] {
            Block::Data(data) => {
                assert!(data.resolved);
                assert_eq!(data.count(), 2);
            }
            other => panic!("Expected DataBlock, got {:?}", other),
        }
    }

    #[test]
    fn test_projection_survives_reload() {
        let text = "@Poly ( a b ) { $a $b pow Color[1,2,3] }\n";
        let workspace = Workspace::parse(text).unwrap();
        let reloaded = load_workspace_json(&workspace_to_json(&workspace));
        assert_eq!(reloaded.serialize(), workspace.serialize());
    }

    #[test]
    fn test_bad_json() {
        match workspace_from_json("{ nope") {
            Err(Error::Json(_)) => {}
            other => panic!("Expected Json error, got {:?}", other.map(|w| w.serialize())),
        }
    }

    #[test]
    fn test_input_definitions() {
        let inputs = convert_input_text("#x { 1 2 3 }\n#y { T F T }\n").unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].name, "x");
        assert_eq!(inputs[0].blocks.len(), 3);
        assert_eq!(inputs[1].blocks[1], BlockDefinition { type_id: 1002, data: "F".to_owned() });

        match convert_input_text("#x { 1 2") {
            Err(Error::InputDefinitionParse) => {}
            other => panic!("Expected InputDefinitionParse, got {:?}", other),
        }
    }
}
