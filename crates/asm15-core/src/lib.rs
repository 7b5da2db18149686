//! asm15 — two-pass assembler for a 15-bit educational machine.
//!
//! The machine has a 15-bit word, 8 registers, and 4096 words of memory
//! addressed from 100. This crate provides:
//!
//! - **Lexer** — logical-line splitting, comma discipline, token
//!   classification (labels, mnemonics, directives, registers, immediates)
//! - **Pre-processor** — `macr`/`endmacr` macro expansion into an
//!   intermediate stream
//! - **First pass** — symbol table construction, data image encoding,
//!   instruction encoding with placeholder reservation for direct operands
//! - **Second pass** — `.entry` resolution, placeholder fix-up, external
//!   reference collection
//! - **Emitter** — `.ob` / `.ent` / `.ext` text rendering
//!
//! The outer loop (file iteration, filesystem binding, message printing)
//! is left to the caller; [`Assembler::assemble`] maps one source text to
//! its rendered artifacts plus diagnostics.

pub mod assembler;
pub mod diagnostic;
pub mod firstpass;
pub mod image;
pub mod instruction;
pub mod lexer;
pub mod macros;
pub mod object;
pub mod secondpass;
pub mod symbol;

pub use assembler::{Artifacts, Assembler};
pub use diagnostic::{has_errors, Diagnostic, Severity};
pub use image::{DataImage, InstructionImage, Word, LOAD_ORIGIN, MEMORY_SIZE};
pub use instruction::{AddrMode, EncodeError, InsnCatalog, InsnDef, Operand};
pub use lexer::{parse_line, Directive, LexError, SourceLine, Statement};
pub use macros::MacroEngine;
pub use object::{render_entries, render_externals, render_object};
pub use secondpass::ExternalRef;
pub use symbol::{Symbol, SymbolError, SymbolKind, SymbolTable};
