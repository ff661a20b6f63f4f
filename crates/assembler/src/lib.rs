//! TeC7 two-pass assembler library.

/// Byte-indexed source line cursor.
pub mod cursor;
/// Diagnostic codes, accumulation, and rendering.
pub mod diag;
/// Expression validation (Pass 1) and evaluation (Pass 2).
mod expr;
/// Label table and name-table formatting.
pub mod symbols;
/// Pass 1: label address assignment.
mod pass1;
/// Pass 2: code emission.
mod pass2;
/// The two-pass pipeline.
pub mod assembler;

pub use assembler::{assemble, AssembleOutput, Assembly, ProgramImage};
pub use diag::{Diagnostics, ErrorCode, WarningCode};
pub use symbols::{format_name_table, Label, LabelTable};
