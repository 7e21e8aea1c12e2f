/*!
## Rust Machine Module

This Rust module is the BASIC interpreter proper. Program lines
and heap objects share one byte arena; statements are executed
straight from their tokens.

*/

mod arena;
mod config;
mod control;
mod cursor;
mod eval;
mod exec;
mod heap;
mod io;
mod listing;
mod memory;
mod program;
mod runtime;
mod stack;
mod var;

#[cfg(test)]
mod tests;

pub use config::{Boolean, Config, MAX_MEMSIZE};
pub use io::{Channel, Console, LineReader, CONSOLE};
pub use memory::{Memory, Ram};
pub use runtime::{Event, Mode, Runtime};
pub use stack::Stack;
