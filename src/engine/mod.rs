//! Engine module: command-line tasks and the path helpers shared by the pipeline.

pub mod arg_parser;
pub mod cli;
pub mod handlers;
pub mod tasks;
pub mod tools;

pub use arg_parser::{Invocation, build_command};
pub use cli::handle_run;
pub use tasks::{OptionDescriptor, ParameterType, TASKS, Task, TaskDescriptor};
pub use tools::{path_relative_to, path_to_id_string};
