//! Operator notification adapters

mod command;

pub use command::CommandNotifier;
