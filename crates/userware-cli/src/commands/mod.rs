//! Built-in management commands.

pub mod check;
pub mod createuser;
pub mod runserver;

pub use check::CheckCommand;
pub use createuser::CreateuserCommand;
pub use runserver::RunserverCommand;

use crate::command::CommandSet;

/// The commands the `userware` binary ships with.
pub fn builtin_commands() -> CommandSet {
    let mut set = CommandSet::new();
    set.register(Box::new(RunserverCommand));
    set.register(Box::new(CheckCommand));
    set.register(Box::new(CreateuserCommand));
    set
}
