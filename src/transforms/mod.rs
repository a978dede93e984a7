// src/transforms/mod.rs

//! Built-in task actions.
//!
//! These cover the file-shuffling side of a site build: wiping the output
//! tree, copying assets through, and joining sources into one bundle file.
//! Anything beyond that (real compilers, minifiers) is supplied by library
//! users as their own [`crate::registry::TaskAction`] implementations.

mod clean;
mod concat;
mod copy;

pub use clean::CleanAction;
pub use concat::ConcatAction;
pub use copy::CopyAction;
