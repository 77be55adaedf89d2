//! Command Interpreter: turns one inbound chat event into a subscription
//! change and the text to reply with.

pub mod error;
pub mod interpreter;
pub mod parse;

pub use {
    error::{Error, Result},
    interpreter::{CommandInterpreter, HELP_REPLY, START_REPLY, STOP_REPLY},
    parse::Command,
};
