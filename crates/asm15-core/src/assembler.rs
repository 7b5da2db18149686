//! Per-file assembly driver.
//!
//! One [`Assembler`] serves any number of source files; all per-file state
//! (macro table, symbol table, memory images, diagnostics) is created on
//! entry to [`Assembler::assemble`] and dropped on exit, so nothing leaks
//! between files.

use crate::diagnostic::{has_errors, Diagnostic};
use crate::firstpass;
use crate::instruction::InsnCatalog;
use crate::macros::MacroEngine;
use crate::object;
use crate::secondpass;

/// The rendered output artifacts for one successfully assembled file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    /// The `.ob` file text.
    pub object: String,
    /// The `.ent` file text; `None` when no symbol is an entry.
    pub entries: Option<String>,
    /// The `.ext` file text; `None` when no external was referenced.
    pub externals: Option<String>,
    /// The macro-expanded intermediate stream (`.am` text).
    pub expanded: String,
}

/// The assembler: a pre-processor and two passes over the expanded stream.
#[derive(Debug, Default)]
pub struct Assembler {
    catalog: InsnCatalog,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble one source file.
    ///
    /// Returns the rendered artifacts and the collected diagnostics. The
    /// artifacts are `None` whenever any error diagnostic was produced;
    /// partial output is never returned.
    pub fn assemble(&self, source: &str) -> (Option<Artifacts>, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();

        // Pre-process: expand macros into the intermediate stream.
        let mut macros = MacroEngine::new();
        let lines = macros.expand(source, &mut diagnostics);
        if has_errors(&diagnostics) {
            return (None, diagnostics);
        }

        // Pass one: symbols, data image, instruction image with
        // placeholders.
        let firstpass::PassOneResult {
            mut symbols,
            mut code,
            data,
        } = firstpass::run(&lines, &macros, &self.catalog, &mut diagnostics);
        if has_errors(&diagnostics) {
            return (None, diagnostics);
        }

        // Data symbols sit after the code image in memory.
        symbols.relocate_data(code.len() as u16);

        // Pass two: `.entry` resolution and placeholder fix-up.
        let externals =
            secondpass::run(&lines, &mut symbols, &mut code, &self.catalog, &mut diagnostics);
        if has_errors(&diagnostics) {
            return (None, diagnostics);
        }
        debug_assert_eq!(code.unresolved(), 0, "unresolved placeholder after pass two");

        tracing::debug!(
            "assembled: {} code word(s), {} data word(s), {} symbol(s)",
            code.len(),
            data.len(),
            symbols.len()
        );

        let expanded = if lines.is_empty() {
            String::new()
        } else {
            lines.join("\n") + "\n"
        };
        let artifacts = Artifacts {
            object: object::render_object(&code, &data),
            entries: object::render_entries(&symbols),
            externals: object::render_externals(&externals),
            expanded,
        };
        (Some(artifacts), diagnostics)
    }
}

// ---------------------------------------------------------------------------
//  Tests
// ---------------------------------------------------------------------------
