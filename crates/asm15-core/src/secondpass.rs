//! Second pass: `.entry` resolution and placeholder fix-up.
//!
//! The pass re-scans the expanded stream with a parallel instruction
//! counter. Every direct-addressing operand word was reserved as a
//! placeholder in pass one; with the symbol table complete (and data
//! symbols relocated), each placeholder is rewritten in place. References
//! to external symbols are collected for the externals file as they are
//! rewritten.

use crate::diagnostic::Diagnostic;
use crate::image::{InstructionImage, LOAD_ORIGIN};
use crate::instruction::{self, InsnCatalog, Operand};
use crate::lexer::{self, Directive, SourceLine};
use crate::symbol::{SymbolKind, SymbolTable};

/// One mode-1 reference to an external symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalRef {
    /// The external symbol's name.
    pub name: String,
    /// Absolute address of the operand word that references it.
    pub address: u16,
}

/// Run the second pass over the expanded stream.
///
/// Returns the external references in source order. Lines that failed in
/// pass one never reach this pass: it only runs on an error-free pass-one
/// result.
pub fn run(
    lines: &[String],
    symbols: &mut SymbolTable,
    code: &mut InstructionImage,
    catalog: &InsnCatalog,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<ExternalRef> {
    let mut externals = Vec::new();
    let mut ic = 0usize;

    for (index, raw) in lines.iter().enumerate() {
        let line = index + 1;

        let statement = match lexer::parse_line(raw) {
            Ok(SourceLine::Statement(statement)) => statement,
            _ => continue,
        };

        match Directive::from_name(&statement.op) {
            Some(Directive::Data | Directive::String | Directive::Extern) => continue,
            Some(Directive::Entry) => {
                resolve_entry(&statement.operands, line, symbols, diagnostics);
            }
            None => {
                ic = advance_instruction(
                    &statement.op,
                    &statement.operands,
                    line,
                    ic,
                    symbols,
                    code,
                    catalog,
                    diagnostics,
                    &mut externals,
                );
            }
        }
    }

    tracing::debug!(
        "second pass complete: {} external reference(s), {} placeholder(s) left",
        externals.len(),
        code.unresolved()
    );
    externals
}

/// Handle an `.entry` line: the named symbol must already be defined and
/// must not be external.
fn resolve_entry(
    operands: &str,
    line: usize,
    symbols: &mut SymbolTable,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut tokens = operands.split_whitespace();
    let name = match tokens.next() {
        Some(name) => name,
        None => {
            diagnostics.push(Diagnostic::error(line, "missing identifier after '.entry'"));
            return;
        }
    };
    if tokens.next().is_some() {
        diagnostics.push(Diagnostic::error(line, "unexpected text after '.entry'"));
        return;
    }
    if let Err(err) = symbols.mark_entry(name) {
        diagnostics.push(Diagnostic::error(line, err.to_string()));
    }
}

/// Walk one instruction line, fixing placeholder operand words, and return
/// the advanced instruction counter.
#[allow(clippy::too_many_arguments)]
fn advance_instruction(
    op: &str,
    operand_field: &str,
    line: usize,
    mut ic: usize,
    symbols: &SymbolTable,
    code: &mut InstructionImage,
    catalog: &InsnCatalog,
    diagnostics: &mut Vec<Diagnostic>,
    externals: &mut Vec<ExternalRef>,
) -> usize {
    // Pass one accepted this line, so the lookups below cannot fail; the
    // guards keep the pass total anyway.
    if catalog.lookup(op).is_none() {
        return ic;
    }
    let Ok(tokens) = lexer::split_operands(operand_field) else {
        return ic;
    };
    let mut operands = Vec::with_capacity(tokens.len());
    for token in &tokens {
        match Operand::parse(token) {
            Ok(operand) => operands.push(operand),
            Err(_) => return ic,
        }
    }

    // Skip the info word.
    ic += 1;

    if operands.len() == 2
        && operands[0].mode().is_register()
        && operands[1].mode().is_register()
    {
        // The shared register word was fully encoded in pass one.
        return ic + 1;
    }

    for operand in &operands {
        if let Operand::Direct(name) = operand {
            resolve_direct(name, ic, line, symbols, code, diagnostics, externals);
        }
        ic += 1;
    }
    ic
}

/// Rewrite the placeholder at `address` from the now-complete symbol table.
fn resolve_direct(
    name: &str,
    address: usize,
    line: usize,
    symbols: &SymbolTable,
    code: &mut InstructionImage,
    diagnostics: &mut Vec<Diagnostic>,
    externals: &mut Vec<ExternalRef>,
) {
    match symbols.lookup(name) {
        None => {
            diagnostics.push(Diagnostic::error(
                line,
                format!("unknown symbol '{name}'"),
            ));
        }
        Some(symbol) if symbol.kind == SymbolKind::External => {
            code.resolve(address, instruction::external_word());
            externals.push(ExternalRef {
                name: name.to_string(),
                address: (address + LOAD_ORIGIN) as u16,
            });
        }
        Some(symbol) => {
            code.resolve(address, instruction::direct_word(symbol.value));
        }
    }
}

// ---------------------------------------------------------------------------
//  Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::has_errors;
    use crate::firstpass;
    use crate::macros::MacroEngine;

    fn assemble_passes(
        source: &[&str],
    ) -> (
        firstpass::PassOneResult,
        Vec<ExternalRef>,
        Vec<Diagnostic>,
    ) {
        let lines: Vec<String> = source.iter().map(|s| s.to_string()).collect();
        let macros = MacroEngine::new();
        let catalog = InsnCatalog::new();
        let mut diagnostics = Vec::new();
        let mut result = firstpass::run(&lines, &macros, &catalog, &mut diagnostics);
        assert!(!has_errors(&diagnostics), "pass one failed: {diagnostics:?}");
        result.symbols.relocate_data(result.code.len() as u16);
        let externals = run(
            &lines,
            &mut result.symbols,
            &mut result.code,
            &catalog,
            &mut diagnostics,
        );
        (result, externals, diagnostics)
    }

    #[test]
    fn test_forward_reference_resolved() {
        let (result, _, diagnostics) = assemble_passes(&["MAIN: mov r3, LEN", "LEN: .data 6"]);
        assert!(!has_errors(&diagnostics));
        assert_eq!(result.code.unresolved(), 0);
        let words: Vec<u16> = result.code.words().map(|w| w.raw()).collect();
        // LEN relocates to 100 + 3 + 0 = 103; R=1.
        assert_eq!(words[2], (103 << 3) | 0b010);
    }

    #[test]
    fn test_backward_data_reference_uses_relocated_value() {
        let (result, _, diagnostics) = assemble_passes(&["LEN: .data 6", "mov r3, LEN", "stop"]);
        assert!(!has_errors(&diagnostics));
        // IC_final = 4, so LEN = 104.
        let words: Vec<u16> = result.code.words().map(|w| w.raw()).collect();
        assert_eq!(words[2], (104 << 3) | 0b010);
    }

    #[test]
    fn test_external_reference_recorded() {
        let (result, externals, diagnostics) = assemble_passes(&[".extern X", "jmp X"]);
        assert!(!has_errors(&diagnostics));
        let words: Vec<u16> = result.code.words().map(|w| w.raw()).collect();
        assert_eq!(words[1], 1); // E=1, payload zero
        assert_eq!(
            externals,
            vec![ExternalRef {
                name: "X".to_string(),
                address: 101,
            }]
        );
    }

    #[test]
    fn test_external_referenced_from_multiple_sites() {
        let (_, externals, diagnostics) =
            assemble_passes(&[".extern X", "jsr X", "jmp X", "stop"]);
        assert!(!has_errors(&diagnostics));
        let addresses: Vec<u16> = externals.iter().map(|e| e.address).collect();
        assert_eq!(addresses, vec![101, 103]);
        assert!(externals.iter().all(|e| e.name == "X"));
    }

    #[test]
    fn test_parallel_ic_with_register_compression() {
        // cmp r1,r2 takes 2 words, so LOOP's reference sits at word 3.
        let (result, _, diagnostics) =
            assemble_passes(&["LOOP: cmp r1, r2", "bne LOOP", "stop"]);
        assert!(!has_errors(&diagnostics));
        assert_eq!(result.code.len(), 5);
        let words: Vec<u16> = result.code.words().map(|w| w.raw()).collect();
        assert_eq!(words[3], (100 << 3) | 0b010);
    }

    #[test]
    fn test_entry_marks_symbol() {
        let (result, _, diagnostics) =
            assemble_passes(&["MAIN: stop", ".entry MAIN"]);
        assert!(!has_errors(&diagnostics));
        assert_eq!(result.symbols.lookup("MAIN").unwrap().kind, SymbolKind::Entry);
    }

    #[test]
    fn test_entry_unknown_symbol() {
        let (_, _, diagnostics) = assemble_passes(&["stop", ".entry NOSUCH"]);
        assert!(has_errors(&diagnostics));
    }

    #[test]
    fn test_entry_external_rejected() {
        let (_, _, diagnostics) = assemble_passes(&[".extern X", ".entry X", "stop"]);
        assert!(has_errors(&diagnostics));
    }

    #[test]
    fn test_entry_extra_tokens() {
        let (_, _, diagnostics) = assemble_passes(&["A: stop", ".entry A B"]);
        assert!(has_errors(&diagnostics));
    }

    #[test]
    fn test_unknown_symbol_reference() {
        let (result, _, diagnostics) = assemble_passes(&["jmp NOWHERE"]);
        assert!(has_errors(&diagnostics));
        assert_eq!(result.code.unresolved(), 1);
    }
}
