//! Output rendering for the object, entries, and externals files.
//!
//! File formats:
//! - `.ob` — a header line with the instruction-word and data-word counts,
//!   then one line per word: a zero-padded 4-digit decimal address (from
//!   0100) and the word as zero-padded 5-digit octal.
//! - `.ent` — `<name> <decimal value>` per entry symbol, in definition
//!   order. Only produced when at least one entry symbol exists.
//! - `.ext` — `<name> <4-digit decimal address>` per external reference,
//!   in reference order. Only produced when at least one reference exists.
//!
//! Rendering works on strings; binding them to files is the caller's job.

use std::fmt::Write;

use crate::image::{DataImage, InstructionImage, LOAD_ORIGIN};
use crate::secondpass::ExternalRef;
use crate::symbol::{SymbolKind, SymbolTable};

/// Render the `.ob` file: the code image then the data image, loaded at
/// address 100.
pub fn render_object(code: &InstructionImage, data: &DataImage) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", code.len(), data.len());
    let mut address = LOAD_ORIGIN;
    for word in code.words().chain(data.words().iter().copied()) {
        let _ = writeln!(out, "{address:04} {word}");
        address += 1;
    }
    out
}

/// Render the `.ent` file, or `None` when no symbol is an entry.
pub fn render_entries(symbols: &SymbolTable) -> Option<String> {
    let mut out = String::new();
    for symbol in symbols.iter().filter(|s| s.kind == SymbolKind::Entry) {
        let _ = writeln!(out, "{} {}", symbol.name, symbol.value);
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Render the `.ext` file, or `None` when no external was referenced.
pub fn render_externals(references: &[ExternalRef]) -> Option<String> {
    if references.is_empty() {
        return None;
    }
    let mut out = String::new();
    for reference in references {
        let _ = writeln!(out, "{} {:04}", reference.name, reference.address);
    }
    Some(out)
}

// ---------------------------------------------------------------------------
//  Tests
// ---------------------------------------------------------------------------
