//! Calling functions
//!
//! A code block runs the stack it names in the calling machine. A stack
//! marked obfuscated instead runs to completion on a separate machine in a
//! single step of the caller, so observers of the caller never see its
//! inside. Only its net effect on the value stack, its variable assignments
//! and its memory writes come back.

use std::collections::HashSet;
use std::rc::Rc;

use crate::block::{Block, CodeBlock};
use crate::localization::localize;
use crate::run_view::{PassthroughRunView, RunView};
use crate::stack::StackRef;
use crate::vm::VirtualMachine;

pub fn evaluate(code: &CodeBlock, vm: &mut VirtualMachine) {
    let mut code = code.clone();
    code.find_stack_in_workspace(&vm.workspace);
    let Some(stack) = code.stack else {
        vm.push(Block::error(localize(
            "Errors.undefinedFunction",
            "Function {{name}} is not defined.",
            &[("name", &code.name)],
        )));
        return;
    };

    if stack.borrow().obfuscated {
        run_isolated(&stack, vm);
    } else {
        let stack = stack.borrow().clone();
        vm.insert_in_program(stack);
    }
}

fn run_isolated(stack: &StackRef, vm: &mut VirtualMachine) {
    // calls from inside the function run inline
    stack.borrow_mut().obfuscated = false;

    let frame = vm.current_frame();
    let variables = frame.variables.clone();
    let parameters: HashSet<String> = variables
        .iter()
        .filter(|(_, assignment)| assignment.parameter)
        .map(|(name, _)| name.clone())
        .collect();
    let passthrough = Rc::new(PassthroughRunView::new(
        frame.run_view.clone(),
        parameters,
        vm.stack.len(),
    ));

    let mut isolated = vm.sub_machine();
    isolated.stack = vm.stack.clone();
    isolated.copy_variable_assignments(&variables, true);
    isolated.set_run_view(Some(passthrough.clone() as Rc<dyn RunView>));
    isolated.insert_in_program(stack.borrow().clone());
    isolated.max_steps = vm.remaining_budget();
    let result = isolated.evaluate_fully();

    let assigned = isolated.main_program().variables.clone();
    vm.copy_variable_assignments(&assigned, false);

    if isolated.main_program().is_finished() {
        let untouched = passthrough.untouched().min(vm.stack.len());
        while vm.stack.len() > untouched {
            vm.pop(None);
        }
        for block in result.into_iter().skip(untouched) {
            vm.push(block);
        }
    } else {
        log::debug!("isolated call of {} did not finish", stack.borrow().name);
        for block in result {
            vm.push(block);
        }
    }

    stack.borrow_mut().obfuscated = true;
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::program::ProgramState;
    use crate::workspace::Workspace;

    fn machine(text: &str, obfuscated: &[&str]) -> VirtualMachine {
        let mut vm = VirtualMachine::new();
        vm.workspace = Workspace::parse(text).unwrap();
        for name in obfuscated {
            vm.workspace.get_stack(name).unwrap().borrow_mut().obfuscated = true;
        }
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

    #[derive(Default)]
    struct Counter {
        pushed_states: Cell<usize>,
        evaluated: Cell<usize>,
    }

    impl RunView for Counter {
        fn pushed_state(&self, _state: &ProgramState) {
            self.pushed_states.set(self.pushed_states.get() + 1);
        }

        fn evaluated_block(&self, _block: &Block) {
            self.evaluated.set(self.evaluated.get() + 1);
        }
    }

    #[test]
    fn test_plain_call() {
        let mut vm = machine("@Poly { 2 triple 1 }\n@triple ( n ) { $n 3 * }", &[]);
        assert_eq!(numbers(&vm.evaluate_stack("Poly").unwrap()), vec![6.0, 1.0]);
    }

    #[test]
    fn test_undefined_function() {
        let mut vm = machine("@Poly { nothing }", &[]);
        match &vm.evaluate_stack("Poly").unwrap()[0] {
            Block::Error(message) => assert_eq!(message, "Function nothing is not defined."),
            other => panic!("Expected ErrorBlock, got {:?}", other),
        }
    }

    #[test]
    fn test_obfuscated_call_runs_in_one_step() {
        let mut vm = machine("@Poly { 1 2 f $y }\n@f ( b ) { $b 3 * ->$y 7 }", &["f"]);
        let counter = Rc::new(Counter::default());
        vm.set_run_view(Some(counter.clone() as Rc<dyn RunView>));

        let result = vm.evaluate_stack("Poly").unwrap();
        assert_eq!(numbers(&result), vec![1.0, 7.0, 6.0]);
        assert_eq!(counter.pushed_states.get(), 0);
        assert_eq!(counter.evaluated.get(), 4);
        assert!(vm.workspace.get_stack("f").unwrap().borrow().obfuscated);
    }

    #[test]
    fn test_obfuscated_call_keeps_untouched_blocks() {
        let mut vm = machine("@Poly { 1 2 3 swapish }\n@swapish ( a b ) { $b $a 10 }", &["swapish"]);
        assert_eq!(numbers(&vm.evaluate_stack("Poly").unwrap()), vec![1.0, 3.0, 2.0, 10.0]);
    }

    #[test]
    fn test_obfuscated_runaway_reports_step_limit() {
        let mut vm = machine("@Poly { 1 spin }\n@spin { 1 spin }", &["spin"]);
        let result = vm.evaluate_stack("Poly").unwrap();
        assert_eq!(result.len(), 2);
        match &result[1] {
            Block::Error(message) => assert_eq!(message, "Evaluation step limit exceeded."),
            other => panic!("Expected ErrorBlock, got {:?}", other),
        }
    }
}
