//! Command handlers for the webrag CLI.

pub mod ask;

pub use ask::AskCommand;
