//! Console output: theme, tree printer and the terminal reporter.

pub mod console;
pub mod theme;
pub mod tree;

pub use console::ConsoleReporter;
