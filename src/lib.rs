#![deny(clippy::print_stdout)]

pub mod command_line;
pub mod indexing;
pub mod input;
pub mod molecule;
pub mod portal;
pub mod submission;
