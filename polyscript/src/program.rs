//! Evaluation frames

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use crate::block::Block;
use crate::run_view::RunView;

/// A value bound in a frame.
#[derive(Debug, Clone)]
pub struct VariableAssignment {
    /// Parameters stay local; plain assignments also reach enclosing frames.
    pub parameter: bool,
    pub block: Block,
}

/// An entry of a frame's pending program.
#[derive(Debug, Clone)]
pub enum ProgramObject {
    Block(Block),
    /// Marks where a child frame sits in its parent's program. Removed when
    /// the child finishes.
    State,
}

/// One nested evaluation context: pending program, local variables and the
/// observer that receives its events.
#[derive(Clone, Default)]
pub struct ProgramState {
    pub program: VecDeque<ProgramObject>,
    pub variables: HashMap<String, VariableAssignment>,
    /// Name of the stack most recently spliced into this frame.
    pub stack_name: String,
    pub run_view: Option<Rc<dyn RunView>>,
}

impl ProgramState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A child frame inheriting the observer of `parent`.
    pub fn child_of(parent: &ProgramState) -> Self {
        Self {
            run_view: parent.run_view.clone(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.program.is_empty()
    }

    /// Whether `name` is bound as a parameter in this frame.
    #[must_use]
    pub fn is_parameter(&self, name: &str) -> bool {
        self.variables.get(name).is_some_and(|v| v.parameter)
    }
}

impl fmt::Debug for ProgramState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramState")
            .field("program", &self.program)
            .field("variables", &self.variables)
            .field("stack_name", &self.stack_name)
            .field("run_view", &self.run_view.is_some())
            .finish()
    }
}

impl fmt::Display for ProgramState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ ")?;
        for object in &self.program {
            match object {
                ProgramObject::Block(block) => write!(f, "{} ", block)?,
                ProgramObject::State => write!(f, "... ")?,
            }
        }
        write!(f, "]")
    }
}

/// Step bookkeeping shared by every frame of one machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveProgram {
    pub steps: usize,
    /// Budget of the running `evaluate_fully`, if any.
    pub max_steps: Option<usize>,
}

/// Outcome of a single evaluation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// More work remains.
    Pending,
    /// The stepped frame ran out of program. For the main frame this means
    /// the value stack holds the final result.
    Finished,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lists_pending_program() {
        let mut state = ProgramState::new();
        state.program.push_back(ProgramObject::Block(Block::number(2.0)));
        state.program.push_back(ProgramObject::State);
        state.program.push_back(ProgramObject::Block(Block::Recall("x".into())));
        assert_eq!(state.to_string(), "[ 2 ... x ]");
        assert!(!state.is_finished());
    }

    #[test]
    fn test_parameter_lookup() {
        let mut state = ProgramState::new();
        state.variables.insert(
            "n".into(),
            VariableAssignment {
                parameter: true,
                block: Block::number(1.0),
            },
        );
        assert!(state.is_parameter("n"));
        assert!(!state.is_parameter("m"));
        assert!(ProgramState::child_of(&state).variables.is_empty());
    }
}
