//! Command-line tokenizing for addressed messages.
//!
//! A command is an addressed message whose first shell-like token names it:
//!
//! ```text
//! @bot echo 'a b'   →   ["echo", "a b"]
//! ```
//!
//! Register commands with [`Dispatcher::on_command`](crate::Dispatcher::on_command).

mod split;

pub use split::{SplitError, split};
