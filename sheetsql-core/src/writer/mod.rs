//! SQL script generation

pub mod sql_writer;

pub use sql_writer::{ScriptOptions, render_script, sql_quote};
