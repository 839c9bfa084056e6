pub use command::{Command, CommandOutput, CommandRequest, CommandRunner, SystemRunner};
pub use error::{Error, Result};

pub mod command;
pub mod dir;
pub mod env;
mod error;
pub mod os;
