mod block;
mod code;
mod error;
mod escape;
mod machine_state;
mod program;
mod rational;
mod run_view;
mod stack;
mod vm;
mod workspace;

pub mod converter;
pub mod definition;
pub mod localization;
pub mod operators;
pub mod random;
pub mod registry;

pub use block::*;
pub use converter::{TypeSignature, block_to_json, json_to_block};
pub use definition::{BlockDefinition, InputDefinition, StackDefinition};
pub use error::{Error, Result};
pub use escape::{escape, unescape};
pub use localization::{DefaultLocalizer, Localizer, localize};
pub use machine_state::{MachineState, ObjectState};
pub use operators::{OPERATORS, Operator, OperatorInfo};
pub use program::*;
pub use random::RandMode;
pub use rational::{NumberMode, RationalNumber};
pub use registry::{ModuleBlockType, PolyscriptModule, create_block, load_module, type_list, type_regex};
pub use run_view::{PassthroughRunView, RunView};
pub use stack::{Stack, StackRef};
pub use vm::{DEFAULT_MAX_STEPS, VirtualMachine, VmCreateInfo};
pub use workspace::{Workspace, to_roman};
