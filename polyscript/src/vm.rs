//! The evaluator
//!
//! A machine owns one value stack shared by every frame and a chain of
//! frames. The first frame is the main program and the last one is active:
//! only it is stepped. Running a stack from a frame that still has work left
//! opens a child frame, which the parent marks with a [`ProgramObject::State`]
//! at the front of its program until the child finishes. Running a stack from
//! a frame with nothing left splices it into that frame instead, so tail calls
//! run in constant frame depth.

use std::cell::{Ref, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::rc::Rc;

use crate::block::{Block, TypeTag};
use crate::code;
use crate::error::{Error, Result};
use crate::localization::localize;
use crate::machine_state::{MachineState, ObjectState};
use crate::operators::{self, memory, operand_error};
use crate::program::{ActiveProgram, ProgramObject, ProgramState, StepResult, VariableAssignment};
use crate::random::{self, RandMode};
use crate::registry::{brace_body, modules, registry};
use crate::run_view::RunView;
use crate::stack::Stack;
use crate::workspace::Workspace;

pub const DEFAULT_MAX_STEPS: usize = 10000;

#[derive(Debug, Clone)]
pub struct VmCreateInfo {
    pub max_steps: usize,
    /// Trace every step through `log`.
    pub verbose: bool,
    /// Reseeds the thread's generator for reproducible random blocks.
    pub seed: Option<u64>,
}

impl Default for VmCreateInfo {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            verbose: false,
            seed: None,
        }
    }
}

pub struct VirtualMachine {
    pub stack: Vec<Block>,
    pub max_steps: usize,
    pub anon_stack_index: usize,
    pub rand_modes: Vec<RandMode>,
    rand_mode_index: usize,
    pub workspace: Workspace,
    pub verbose: bool,
    state: Rc<RefCell<MachineState>>,
    frames: Vec<ProgramState>,
    active: ActiveProgram,
}

impl Default for VirtualMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualMachine {
    pub fn new() -> Self {
        Self::with_info(VmCreateInfo::default())
    }

    pub fn with_info(info: VmCreateInfo) -> Self {
        if let Some(seed) = info.seed {
            random::seed(seed);
        }
        Self {
            stack: Vec::new(),
            max_steps: info.max_steps,
            anon_stack_index: 0,
            rand_modes: Vec::new(),
            rand_mode_index: 0,
            workspace: Workspace::new(),
            verbose: info.verbose,
            state: Rc::new(RefCell::new(MachineState::new())),
            frames: vec![ProgramState::new()],
            active: ActiveProgram::default(),
        }
    }

    /// A fresh machine over the same workspace and the same memory.
    pub fn sub_machine(&self) -> Self {
        Self {
            max_steps: self.max_steps,
            workspace: self.workspace.clone(),
            state: self.state.clone(),
            ..Self::new()
        }
    }

    /// Clears the value stack, the program and its variables. Memory and the
    /// main frame's observer survive.
    pub fn reset(&mut self) {
        self.anon_stack_index = 0;
        self.rand_mode_index = 0;
        let run_view = self.frames.first().and_then(|frame| frame.run_view.clone());
        self.frames = vec![ProgramState {
            run_view,
            ..ProgramState::new()
        }];
        self.active = ActiveProgram::default();
        self.stack.clear();
    }

    pub fn set_run_view(&mut self, run_view: Option<Rc<dyn RunView>>) {
        for frame in &mut self.frames {
            frame.run_view = run_view.clone();
        }
    }

    pub fn main_program(&self) -> &ProgramState {
        &self.frames[0]
    }

    /// The frame being stepped.
    pub fn current_frame(&self) -> &ProgramState {
        &self.frames[self.frames.len() - 1]
    }

    pub fn frames(&self) -> &[ProgramState] {
        &self.frames
    }

    pub fn active_program(&self) -> ActiveProgram {
        self.active
    }

    /// Steps left to a machine nested inside the running evaluation.
    pub fn nested_budget(&self) -> usize {
        (self.active.max_steps.unwrap_or(self.max_steps) / 2).saturating_sub(self.active.steps)
    }

    /// Steps left to the running evaluation.
    pub fn remaining_budget(&self) -> usize {
        self.active
            .max_steps
            .unwrap_or(self.max_steps)
            .saturating_sub(self.active.steps)
    }

    pub fn next_anon_stack_index(&mut self) -> usize {
        self.anon_stack_index += 1;
        self.anon_stack_index
    }

    pub fn get_next_rand_mode(&mut self) -> RandMode {
        match self.rand_modes.get(self.rand_mode_index) {
            Some(&mode) => {
                self.rand_mode_index += 1;
                mode
            }
            None => RandMode::Random,
        }
    }

    fn run_view(&self) -> Option<Rc<dyn RunView>> {
        self.current_frame().run_view.clone()
    }

    pub fn push(&mut self, block: Block) {
        if let Some(view) = self.run_view() {
            view.pushed_block(&block);
        }
        self.stack.push(block);
    }

    /// Pops the top block. `consumer` is the block taking it as an operand.
    pub fn pop(&mut self, consumer: Option<&Block>) -> Option<Block> {
        let block = self.stack.pop()?;
        if let Some(view) = self.run_view() {
            view.popped_block(&block);
            if let Some(consumer) = consumer {
                view.consumed_by(&block, consumer);
            }
        }
        Some(block)
    }

    /// The top block if it is of type `tag`.
    pub fn peek_type(&self, tag: TypeTag) -> Option<Block> {
        self.stack.last().filter(|block| block.is_type(tag)).cloned()
    }

    /// Runs `stack` from the active frame, as a tail call when the frame has
    /// nothing left, else in a new child frame.
    pub fn insert_in_program(&mut self, stack: Stack) {
        let index = self.frames.len() - 1;
        if self.frames[index].is_finished() {
            self.load_into_frame(index, stack);
            return;
        }

        let child = ProgramState::child_of(&self.frames[index]);
        self.frames[index].program.push_front(ProgramObject::State);
        self.frames.push(child);
        log::debug!("running {} in frame {}", stack.name, index + 1);
        self.load_into_frame(index + 1, stack);
        if let Some(view) = &self.frames[index].run_view {
            view.pushed_state(&self.frames[index + 1]);
        }
    }

    /// Binds the stack's parameters from the value stack and loads its blocks
    /// into an empty frame.
    fn load_into_frame(&mut self, index: usize, stack: Stack) {
        // the value stack stays untouched when it cannot cover every parameter
        if self.stack.len() < stack.inputs.len() {
            self.push(function_requires_inputs(stack.inputs.len()));
            return;
        }
        let mut parameters = Vec::with_capacity(stack.inputs.len());
        for name in stack.inputs.iter().rev() {
            if let Some(block) = self.pop(None) {
                parameters.push((name.clone(), block));
            }
        }

        let frame = &mut self.frames[index];
        if !stack.blocks.is_empty() {
            frame.program.extend(stack.blocks.into_iter().map(ProgramObject::Block));
            frame.stack_name = stack.name;
            for (name, block) in parameters {
                frame.variables.insert(name, VariableAssignment { parameter: true, block });
            }
        }
        if let Some(view) = &frame.run_view {
            view.tail_recursed_state(frame);
        }
    }

    /// Resets the machine and loads the named workspace stack as the main
    /// program.
    pub fn load_program(&mut self, name: &str) -> Result<()> {
        let stack = self
            .workspace
            .get_stack(name)
            .ok_or_else(|| Error::UnknownStack(name.to_owned()))?;
        self.reset();
        let stack = stack.borrow().clone();
        self.insert_in_program(stack);
        Ok(())
    }

    /// Runs the named stack from a clean machine.
    pub fn evaluate_stack(&mut self, name: &str) -> Result<Vec<Block>> {
        self.load_program(name)?;
        Ok(self.evaluate_fully())
    }

    /// Steps until the main program finishes or `max_steps` steps have run.
    pub fn evaluate_fully(&mut self) -> Vec<Block> {
        let max_steps = self.max_steps;
        self.active.max_steps = Some(max_steps);
        if self.verbose {
            log::trace!("{}", self.describe());
        }

        self.active.steps = 1;
        while self.active.steps <= max_steps {
            let result = self.evaluate_step();
            if self.verbose {
                log::trace!("{}", self.describe());
            }
            if result == StepResult::Finished {
                return self.stack.clone();
            }
            self.active.steps += 1;
        }

        log::debug!("evaluation stopped after {} steps", max_steps);
        vec![Block::error(localize(
            "Errors.stepLimitExceeded",
            "Evaluation step limit exceeded.",
            &[],
        ))]
    }

    /// Evaluates one block of the active frame, or retires the active frame
    /// once it is done. `Finished` only when the main program is done.
    pub fn evaluate_step(&mut self) -> StepResult {
        if self.frames[0].is_finished() {
            return StepResult::Finished;
        }

        let index = self.frames.len() - 1;
        if index == 0 {
            return self.step_frame(0);
        }

        if self.step_frame(index) == StepResult::Finished {
            if let Some(child) = self.frames.pop() {
                log::debug!("finished {} in frame {}", child.stack_name, index);
                self.frames[index - 1].program.pop_front();
                if let Some(view) = &self.frames[0].run_view {
                    view.popped_state(&child);
                }
            }
        }
        StepResult::Pending
    }

    fn step_frame(&mut self, index: usize) -> StepResult {
        let Some(next) = self.frames[index].program.pop_front() else {
            return StepResult::Finished;
        };

        match next {
            ProgramObject::Block(block) => {
                self.evaluate_block(&block);
                if let Some(view) = self.frames.get(index).and_then(|frame| frame.run_view.clone()) {
                    view.evaluated_block(&block);
                }
            }
            ProgramObject::State => {
                log::error!("active frame {} still holds a child frame", index);
                self.push(Block::error(localize("Errors.nullInProgram", "Null block in program.", &[])));
            }
        }

        if self.frames.len() == index + 1 && self.frames[index].is_finished() {
            // runs for every finished frame, not just the main program
            for module in modules() {
                module.post_evaluate(&mut self.stack, &self.frames[index]);
            }
            return StepResult::Finished;
        }
        StepResult::Pending
    }

    fn evaluate_block(&mut self, block: &Block) {
        match block {
            Block::Operator(op) => operators::evaluate(*op, block, self),
            Block::Let(name) => match self.pop(Some(block)) {
                Some(value) => self.assign(name, value, false),
                None => self.push(operand_error("LetBlock", &[TypeTag::Block])),
            },
            Block::Recall(name) => {
                let value = self.recall_by_name(name).unwrap_or_else(|| {
                    Block::error(localize(
                        "Errors.unassignedVariable",
                        "Variable {{varName}} must be assigned before it is used.",
                        &[("varName", &block.to_string())],
                    ))
                });
                self.push(value);
            }
            Block::Data(_) | Block::Null(_) | Block::Package(_) => {
                let mut data = block.clone();
                data.resolve(&self.workspace);
                self.push(data);
            }
            Block::Code(code) => code::evaluate(code, self),
            Block::GetSymbol(name) => memory::get_symbol(self, name, block),
            Block::SetSymbol(name) => memory::set_symbol(self, name, block),
            Block::Extension(ext) => ext.custom.evaluate(block, self),
            _ => self.push(block.clone()),
        }
    }

    /// Binds `name` in the active frame. Names already bound as parameters
    /// stay parameters. Anything else is also bound in every enclosing frame
    /// up to the first one where it is a parameter.
    pub fn assign(&mut self, name: &str, value: Block, parameter: bool) {
        let mut index = self.frames.len() - 1;
        let mut parameter = parameter;
        loop {
            let old = self.recall_from(index, name);
            let frame = &mut self.frames[index];
            parameter |= frame.is_parameter(name);
            frame.variables.insert(
                name.to_owned(),
                VariableAssignment {
                    parameter,
                    block: value.clone(),
                },
            );
            if old.is_none_or(|old| !value.equals(&old)) {
                if let Some(view) = &frame.run_view {
                    view.variable_changed(name, &value, parameter);
                }
            }

            if parameter || index == 0 {
                break;
            }
            index -= 1;
        }
    }

    fn recall_from(&self, index: usize, name: &str) -> Option<Block> {
        self.frames[..=index]
            .iter()
            .rev()
            .find_map(|frame| frame.variables.get(name))
            .map(|assignment| assignment.block.clone())
    }

    /// The innermost binding of `name` visible from the active frame.
    pub fn recall_by_name(&self, name: &str) -> Option<Block> {
        self.recall_from(self.frames.len() - 1, name)
    }

    /// Assigns every variable of `variables` in the active frame, parameters
    /// only when `copy_parameters`.
    pub fn copy_variable_assignments(&mut self, variables: &HashMap<String, VariableAssignment>, copy_parameters: bool) {
        for (name, assignment) in variables {
            if copy_parameters || !assignment.parameter {
                self.assign(name, assignment.block.clone(), false);
            }
        }
    }

    /// Loads one alternative of an input definition onto the value stack.
    ///
    /// The text lists inputs as `#name { a b c }`, one line per value stack
    /// slot. A single alternative index is drawn from the first line and
    /// applied to every line. Lines too short for it contribute nothing.
    pub fn load_input_definition(&mut self, text: &str) -> Result<()> {
        let registry = registry()?;
        if !registry.input_definition_regex().is_match(text) {
            return Err(Error::InputDefinitionParse);
        }

        let columns: Vec<Vec<Block>> = registry
            .input_regex()
            .captures_iter(text)
            .map(|caps| {
                caps.get(2)
                    .map(|body| registry.parse_blocks(brace_body(body.as_str())))
                    .unwrap_or_default()
            })
            .collect();
        let alternatives = columns.first().map_or(0, Vec::len);
        let selection = random::int(0.0, alternatives as f64) as usize;

        let inputs: Vec<Block> = columns
            .iter()
            .filter_map(|column| column.get(selection).cloned())
            .collect();
        log::debug!(
            "loaded alternative {} of {} for {} inputs",
            selection,
            alternatives,
            columns.len()
        );
        self.load_input_list(&inputs);
        Ok(())
    }

    /// Replaces the value stack with `inputs`, resolved against the workspace.
    pub fn load_input_list(&mut self, inputs: &[Block]) {
        self.stack = inputs
            .iter()
            .map(|block| {
                let mut block = block.clone();
                block.resolve(&self.workspace);
                block
            })
            .collect();
    }

    pub fn state(&self) -> Ref<'_, MachineState> {
        self.state.borrow()
    }

    pub fn reload_state(&self) {
        self.state.borrow_mut().reload();
    }

    pub fn clear_state(&self) {
        *self.state.borrow_mut() = MachineState::new();
    }

    /// Replaces memory with serialized state. Malformed text clears it.
    pub fn load_state(&self, serial: &str) {
        *self.state.borrow_mut() = MachineState::deserialize(serial);
    }

    pub fn serialize_state(&self) -> Result<String> {
        self.state.borrow().serialize()
    }

    pub fn set_state_variable(
        &self,
        object_id: &str,
        name: &str,
        value: Option<Block>,
        run_view: Option<&dyn RunView>,
    ) -> Result<()> {
        self.state
            .borrow_mut()
            .set_state_variable(object_id, name, value, run_view)
    }

    pub fn get_state_variable(&self, object_id: &str, name: &str) -> Block {
        self.state.borrow().get_state_variable(object_id, name)
    }

    pub fn set_state_default(&self, object_id: &str, name: &str, value: Option<&Block>) -> Result<()> {
        self.state.borrow_mut().set_state_default(object_id, name, value)
    }

    pub fn set_state_defaults(
        &self,
        object_id: &str,
        inherited: &BTreeMap<String, Block>,
        variables: &BTreeMap<String, Block>,
    ) -> Result<()> {
        self.state
            .borrow_mut()
            .set_state_defaults(object_id, inherited, variables)
    }

    pub fn get_state_default(&self, object_id: &str, name: &str) -> Block {
        self.state.borrow().get_state_default(object_id, name)
    }

    pub fn rename_object_state(&self, old_id: &str, new_id: &str) {
        self.state.borrow_mut().rename_object_state(old_id, new_id);
    }

    pub fn create_object_state(&self, object_id: &str) {
        self.state.borrow_mut().create_object_state(object_id);
    }

    pub fn get_object_state(&self, object_id: &str) -> Option<ObjectState> {
        self.state.borrow().get_object_state(object_id).cloned()
    }

    /// `{ stack } [ program ]` of the main frame.
    pub fn describe(&self) -> String {
        let mut out = String::from("{ ");
        for block in &self.stack {
            let _ = write!(out, "{} ", block);
        }
        let _ = write!(out, "}} {}", self.frames[0]);
        out
    }
}

fn function_requires_inputs(count: usize) -> Block {
    let blocks = localize(
        "Errors.blocksAsInput",
        "{{count}} block as input",
        &[("count", &count.to_string())],
    );
    Block::error(localize(
        "Errors.functionRequiresInputs",
        "That Function requires {{blocksAsInput}}.",
        &[("blocksAsInput", &blocks)],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn machine(text: &str) -> VirtualMachine {
        let mut vm = VirtualMachine::new();
        vm.workspace = Workspace::parse(text).unwrap();
        vm
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

    fn error_message(block: &Block) -> &str {
        match block {
            Block::Error(message) => message,
            other => panic!("Expected ErrorBlock, got {:?}", other),
        }
    }

    #[derive(Default)]
    struct FrameCounter {
        pushed: Cell<usize>,
        popped: Cell<usize>,
        tail_recursed: Cell<usize>,
        variables: RefCell<Vec<String>>,
    }

    impl RunView for FrameCounter {
        fn pushed_state(&self, _state: &ProgramState) {
            self.pushed.set(self.pushed.get() + 1);
        }

        fn popped_state(&self, _state: &ProgramState) {
            self.popped.set(self.popped.get() + 1);
        }

        fn tail_recursed_state(&self, _state: &ProgramState) {
            self.tail_recursed.set(self.tail_recursed.get() + 1);
        }

        fn variable_changed(&self, name: &str, block: &Block, is_parameter: bool) {
            self.variables
                .borrow_mut()
                .push(format!("{}={}{}", name, block, if is_parameter { "!" } else { "" }));
        }
    }

    #[test]
    fn test_evaluate_simple_stack() {
        let mut vm = machine("@Poly { 2 3 + }");
        assert_eq!(numbers(&vm.evaluate_stack("Poly").unwrap()), vec![5.0]);
        assert_eq!(vm.active_program().steps, 3);
    }

    #[test]
    fn test_unknown_stack() {
        let mut vm = machine("@Poly { 1 }");
        match vm.evaluate_stack("Missing") {
            Err(Error::UnknownStack(name)) => assert_eq!(name, "Missing"),
            other => panic!("Expected UnknownStack, got {:?}", other),
        }
    }

    #[test]
    fn test_child_frames_come_and_go() {
        let mut vm = machine("@Poly { 1 @f exec 2 }\n@f { 3 }");
        let counter = Rc::new(FrameCounter::default());
        vm.set_run_view(Some(counter.clone() as Rc<dyn RunView>));
        assert_eq!(numbers(&vm.evaluate_stack("Poly").unwrap()), vec![1.0, 3.0, 2.0]);
        assert_eq!(counter.pushed.get(), 1);
        assert_eq!(counter.popped.get(), 1);
        assert_eq!(vm.frames().len(), 1);
    }

    #[test]
    fn test_tail_calls_do_not_nest() {
        let mut vm = VirtualMachine::with_info(VmCreateInfo {
            max_steps: 200_000,
            ..Default::default()
        });
        vm.workspace = Workspace::parse(
            "@Poly { 10000 countdown }\n@countdown ( n ) { $n 0 > @more @done if }\n@more { $n 1 - countdown }\n@done { }",
        )
        .unwrap();
        let counter = Rc::new(FrameCounter::default());
        vm.set_run_view(Some(counter.clone() as Rc<dyn RunView>));

        let result = vm.evaluate_stack("Poly").unwrap();
        assert!(result.is_empty(), "{:?}", result);
        assert_eq!(counter.pushed.get(), 0);
        assert!(counter.tail_recursed.get() >= 10000);
    }

    #[test]
    fn test_step_limit() {
        let mut vm = machine("@Poly { 1 Poly }");
        let result = vm.evaluate_stack("Poly").unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(error_message(&result[0]), "Evaluation step limit exceeded.");
    }

    #[test]
    fn test_missing_function_inputs() {
        let mut vm = machine("@Poly { f }\n@f ( a b ) { $a }");
        let result = vm.evaluate_stack("Poly").unwrap();
        assert_eq!(error_message(&result[0]), "That Function requires 2 block as input.");
    }

    #[test]
    fn test_missing_function_inputs_keep_stack() {
        let mut vm = machine("@Poly { 1 f }\n@f ( a b ) { $a }");
        let result = vm.evaluate_stack("Poly").unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].as_number().map(|n| n.decimal()), Some(1.0));
        assert_eq!(error_message(&result[1]), "That Function requires 2 block as input.");
    }

    #[test]
    fn test_assignments_reach_enclosing_frames() {
        let mut vm = machine("@Poly { 5 ->$x g $x }\n@g { 7 ->$x 1 }");
        assert_eq!(numbers(&vm.evaluate_stack("Poly").unwrap()), vec![1.0, 7.0]);
    }

    #[test]
    fn test_parameters_stay_local() {
        let mut vm = machine("@Poly { 5 ->$x 9 h $x }\n@h ( x ) { $x 1 + ->$x }");
        let counter = Rc::new(FrameCounter::default());
        vm.set_run_view(Some(counter.clone() as Rc<dyn RunView>));
        assert_eq!(numbers(&vm.evaluate_stack("Poly").unwrap()), vec![5.0]);
        assert_eq!(*counter.variables.borrow(), vec!["x=5", "x=10!"]);
    }

    #[test]
    fn test_let_and_recall_errors() {
        let mut vm = machine("@Poly { $y ->$x ->$x }");
        let result = vm.evaluate_stack("Poly").unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(error_message(&result[0]), "LetBlock requires a Block as input.");

        let mut vm = machine("@Poly { $y }");
        let result = vm.evaluate_stack("Poly").unwrap();
        assert_eq!(error_message(&result[0]), "Variable y must be assigned before it is used.");
    }

    #[test]
    fn test_rand_modes_are_consumed_in_order() {
        let mut vm = VirtualMachine::new();
        vm.rand_modes = vec![RandMode::Min, RandMode::Max];
        assert_eq!(vm.get_next_rand_mode(), RandMode::Min);
        assert_eq!(vm.get_next_rand_mode(), RandMode::Max);
        assert_eq!(vm.get_next_rand_mode(), RandMode::Random);
        vm.reset();
        assert_eq!(vm.get_next_rand_mode(), RandMode::Min);
    }

    #[test]
    fn test_sub_machine_shares_memory() {
        let vm = VirtualMachine::new();
        let sub = vm.sub_machine();
        sub.set_state_variable("a", "x", Some(Block::number(2.0)), None).unwrap();
        assert!(matches!(vm.get_state_variable("a", "x"), Block::Number(_)));
        vm.clear_state();
        assert!(sub.get_state_variable("a", "x").is_error());
    }

    #[test]
    fn test_input_definition() {
        let mut vm = machine("@Poly { + }");
        vm.load_program("Poly").unwrap();
        vm.load_input_definition("#a { 4 }\n#b { 5 }").unwrap();
        assert_eq!(numbers(&vm.evaluate_fully()), vec![9.0]);

        match vm.load_input_definition("#a { 4") {
            Err(Error::InputDefinitionParse) => {}
            other => panic!("Expected InputDefinitionParse, got {:?}", other),
        }
    }

    #[test]
    fn test_taylor_series_with_input_function() {
        let mut vm = machine(
            "@Poly { read 3 ->$x 0 @TaylorTerm 0 10 iter }\n\
             @TaylorTerm { ->$n 1 @mulX $n comp 1 @* 1 $n iter / + }\n\
             @mulX { $x * }\n@x { $x } @* { * } @append { append }",
        );
        vm.load_program("Poly").unwrap();
        vm.load_input_definition("#in1 { @mulX }").unwrap();
        let result = vm.evaluate_fully();

        assert_eq!(result.len(), 3, "{:?}", result);
        assert!(matches!(&result[0], Block::Recall(name) if name == "x"));
        assert!(matches!(result[1], Block::Operator(operators::Operator::Multiply)));
        match result[2].as_number() {
            Some(n) => assert!((n.decimal() - 20.0797).abs() < 1e-3),
            None => panic!("Expected NumberBlock, got {:?}", result[2]),
        }
    }
}
