//! # Arena BASIC
//!
//! A small BASIC interpreter in the style of the 8-bit home computers.
//! Program lines are kept tokenized at the bottom of one byte arena and
//! variables grow down from the top of it, so `PEEK`, `POKE` and `DUMP`
//! see exactly what the interpreter sees.
//!
//! ```
//! use basic::mach::{Event, Runtime};
//!
//! let mut runtime = Runtime::default();
//! runtime.enter("10 FOR I=1 TO 3: PRINT I,: NEXT I");
//! runtime.enter("RUN");
//! assert_eq!(runtime.execute(1000), Event::Print("1 2 3 ".to_string()));
//! ```
//!
//! The `basic` executable wraps the runtime in a line editor. `LOAD` and
//! `SAVE` read and write text listings, or binary images for file
//! names ending in `.bin`.

pub mod lang;
pub mod mach;
pub mod term;
