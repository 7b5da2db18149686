//! First pass: label definition, directive encoding, and instruction
//! encoding with placeholder reservation.
//!
//! The pass walks the macro-expanded stream once. It fills the data image
//! completely, fills the instruction image except for direct-addressing
//! operand words (reserved as placeholders for pass two), and builds the
//! symbol table. Defective lines are reported and skipped; the scan
//! continues so one bad line does not hide the rest.

use crate::diagnostic::Diagnostic;
use crate::image::{DataImage, InstructionImage, DATA_MAX, DATA_MIN, LOAD_ORIGIN, MEMORY_SIZE};
use crate::instruction::{self, InsnCatalog, Operand};
use crate::lexer::{self, Directive, SourceLine, Statement, MAX_LABEL_LEN};
use crate::macros::MacroEngine;
use crate::symbol::{SymbolKind, SymbolTable};

/// Everything pass one hands to pass two.
#[derive(Debug)]
pub struct PassOneResult {
    pub symbols: SymbolTable,
    pub code: InstructionImage,
    pub data: DataImage,
}

/// Which slot of a two-operand instruction an operand occupies.
#[derive(Clone, Copy, PartialEq, Eq)]
enum OperandSlot {
    Source,
    Target,
}

/// Run the first pass over the expanded stream.
pub fn run(
    lines: &[String],
    macros: &MacroEngine,
    catalog: &InsnCatalog,
    diagnostics: &mut Vec<Diagnostic>,
) -> PassOneResult {
    let mut symbols = SymbolTable::new();
    let mut code = InstructionImage::new();
    let mut data = DataImage::new();

    for (index, raw) in lines.iter().enumerate() {
        let line = index + 1;

        let statement = match lexer::parse_line(raw) {
            Ok(SourceLine::Statement(statement)) => statement,
            Ok(_) => continue,
            Err(err) => {
                diagnostics.push(Diagnostic::error(line, err.to_string()));
                continue;
            }
        };

        if statement.op.is_empty() {
            diagnostics.push(Diagnostic::error(line, "label with no operation after it"));
            continue;
        }

        match Directive::from_name(&statement.op) {
            Some(Directive::Data) => {
                encode_data(&statement, line, macros, &mut symbols, &mut data, diagnostics);
            }
            Some(Directive::String) => {
                encode_string(&statement, line, macros, &mut symbols, &mut data, diagnostics);
            }
            Some(Directive::Extern) => {
                declare_extern(&statement, line, macros, &mut symbols, diagnostics);
            }
            Some(Directive::Entry) => {
                // Resolution happens in pass two; only the line shape is
                // checked here.
                if statement.label.is_some() {
                    diagnostics.push(ignored_label_notice(line, Directive::Entry));
                }
                if statement.operands.split_whitespace().any(|t| t == ".extern") {
                    diagnostics.push(same_line_error(line));
                }
            }
            None => {
                encode_instruction(
                    &statement,
                    line,
                    macros,
                    catalog,
                    &mut symbols,
                    &mut code,
                    diagnostics,
                );
            }
        }

        if code.len() + data.len() > MEMORY_SIZE - LOAD_ORIGIN {
            diagnostics.push(Diagnostic::error(
                line,
                format!("the program exceeds the memory limit of {MEMORY_SIZE} words"),
            ));
            break;
        }
    }

    tracing::debug!(
        "first pass complete: IC={}, DC={}, {} symbol(s)",
        code.len(),
        data.len(),
        symbols.len()
    );
    PassOneResult {
        symbols,
        code,
        data,
    }
}

// ---------------------------------------------------------------------------
//  Directive lines
// ---------------------------------------------------------------------------

fn encode_data(
    statement: &Statement,
    line: usize,
    macros: &MacroEngine,
    symbols: &mut SymbolTable,
    data: &mut DataImage,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let dc = data.len() as u16;
    if !define_label(statement, line, macros, symbols, SymbolKind::Data, dc, diagnostics) {
        return;
    }
    let values = match lexer::parse_data_list(&statement.operands) {
        Ok(values) => values,
        Err(err) => {
            diagnostics.push(Diagnostic::error(line, err.to_string()));
            return;
        }
    };
    for value in &values {
        if !(DATA_MIN..=DATA_MAX).contains(value) {
            diagnostics.push(Diagnostic::error(
                line,
                format!("the value {value} is out of range for a 15-bit word"),
            ));
            return;
        }
    }
    for value in values {
        data.push_number(value);
    }
}

fn encode_string(
    statement: &Statement,
    line: usize,
    macros: &MacroEngine,
    symbols: &mut SymbolTable,
    data: &mut DataImage,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let dc = data.len() as u16;
    if !define_label(statement, line, macros, symbols, SymbolKind::Data, dc, diagnostics) {
        return;
    }
    match lexer::parse_string_literal(&statement.operands) {
        Ok(payload) => data.push_string(&payload),
        Err(err) => diagnostics.push(Diagnostic::error(line, err.to_string())),
    }
}

fn declare_extern(
    statement: &Statement,
    line: usize,
    macros: &MacroEngine,
    symbols: &mut SymbolTable,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if statement.label.is_some() {
        diagnostics.push(ignored_label_notice(line, Directive::Extern));
    }
    if statement.operands.split_whitespace().any(|t| t == ".entry") {
        diagnostics.push(same_line_error(line));
        return;
    }

    let mut tokens = statement.operands.split_whitespace();
    let name = match tokens.next() {
        Some(name) => name,
        None => {
            diagnostics.push(Diagnostic::error(line, "missing identifier after '.extern'"));
            return;
        }
    };
    if tokens.next().is_some() {
        diagnostics.push(Diagnostic::error(line, "unexpected text after '.extern'"));
        return;
    }
    if let Err(message) = check_label_name(name, macros) {
        diagnostics.push(Diagnostic::error(line, message));
        return;
    }
    if let Err(err) = symbols.define(name, 0, SymbolKind::External) {
        diagnostics.push(Diagnostic::error(line, err.to_string()));
    }
}

// ---------------------------------------------------------------------------
//  Instruction lines
// ---------------------------------------------------------------------------

fn encode_instruction(
    statement: &Statement,
    line: usize,
    macros: &MacroEngine,
    catalog: &InsnCatalog,
    symbols: &mut SymbolTable,
    code: &mut InstructionImage,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let address = (code.len() + LOAD_ORIGIN) as u16;
    if !define_label(statement, line, macros, symbols, SymbolKind::Code, address, diagnostics) {
        return;
    }

    let def = match catalog.lookup(&statement.op) {
        Some(def) => def,
        None => {
            let what = if statement.op.starts_with('.') {
                "directive"
            } else {
                "operation"
            };
            diagnostics.push(Diagnostic::error(
                line,
                format!("unknown {what} '{}'", statement.op),
            ));
            return;
        }
    };

    let tokens = match lexer::split_operands(&statement.operands) {
        Ok(tokens) => tokens,
        Err(err) => {
            diagnostics.push(Diagnostic::error(line, err.to_string()));
            return;
        }
    };
    if tokens.len() != def.operands {
        diagnostics.push(Diagnostic::error(
            line,
            instruction::EncodeError::ArityMismatch {
                mnemonic: def.mnemonic.clone(),
                expected: def.operands,
                found: tokens.len(),
            }
            .to_string(),
        ));
        return;
    }

    let mut operands = Vec::with_capacity(tokens.len());
    for token in &tokens {
        match Operand::parse(token) {
            Ok(operand) => operands.push(operand),
            Err(err) => {
                diagnostics.push(Diagnostic::error(line, err.to_string()));
                return;
            }
        }
    }

    // Addressing-mode validation against the per-instruction tables.
    let offending = match operands.as_slice() {
        [source, target] => {
            if !def.source_modes.contains(&source.mode()) {
                Some(0)
            } else if !def.target_modes.contains(&target.mode()) {
                Some(1)
            } else {
                None
            }
        }
        [target] => (!def.target_modes.contains(&target.mode())).then_some(0),
        _ => None,
    };
    if let Some(index) = offending {
        diagnostics.push(Diagnostic::error(
            line,
            instruction::EncodeError::IllegalMode {
                mnemonic: def.mnemonic.clone(),
                operand: tokens[index].clone(),
            }
            .to_string(),
        ));
        return;
    }

    match operands.as_slice() {
        [] => {
            code.push(instruction::info_word(def, None, None));
        }
        [target] => {
            code.push(instruction::info_word(def, None, Some(target.mode())));
            emit_operand(code, target, OperandSlot::Target);
        }
        [source, target] => {
            code.push(instruction::info_word(
                def,
                Some(source.mode()),
                Some(target.mode()),
            ));
            if source.mode().is_register() && target.mode().is_register() {
                // Two register operands share one word.
                code.push(instruction::register_word(
                    register_number(source),
                    register_number(target),
                ));
            } else {
                emit_operand(code, source, OperandSlot::Source);
                emit_operand(code, target, OperandSlot::Target);
            }
        }
        _ => unreachable!("arity is checked against the catalog"),
    }
}

fn emit_operand(code: &mut InstructionImage, operand: &Operand, slot: OperandSlot) {
    match operand {
        Operand::Immediate(value) => code.push(instruction::immediate_word(*value)),
        Operand::Direct(_) => code.push_placeholder(),
        Operand::RegisterIndirect(n) | Operand::Register(n) => {
            let word = match slot {
                OperandSlot::Source => instruction::register_word(Some(*n), None),
                OperandSlot::Target => instruction::register_word(None, Some(*n)),
            };
            code.push(word);
        }
    }
}

fn register_number(operand: &Operand) -> Option<u8> {
    match operand {
        Operand::RegisterIndirect(n) | Operand::Register(n) => Some(*n),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
//  Label handling
// ---------------------------------------------------------------------------

/// Validate and define the statement's label, if any. Returns `false` when
/// the line must be skipped.
fn define_label(
    statement: &Statement,
    line: usize,
    macros: &MacroEngine,
    symbols: &mut SymbolTable,
    kind: SymbolKind,
    value: u16,
    diagnostics: &mut Vec<Diagnostic>,
) -> bool {
    let name = match &statement.label {
        Some(name) => name,
        None => return true,
    };
    if let Err(message) = check_label_name(name, macros) {
        diagnostics.push(Diagnostic::error(line, message));
        return false;
    }
    if let Err(err) = symbols.define(name, value, kind) {
        diagnostics.push(Diagnostic::error(line, err.to_string()));
        return false;
    }
    true
}

/// Check an identifier against the label naming rules.
fn check_label_name(name: &str, macros: &MacroEngine) -> Result<(), String> {
    if name.len() > MAX_LABEL_LEN {
        return Err(format!(
            "the label '{name}' exceeds the limit of {MAX_LABEL_LEN} characters"
        ));
    }
    if !lexer::is_identifier(name) {
        return Err(format!("'{name}' is not a valid label name"));
    }
    if lexer::is_reserved(name) {
        return Err(format!("'{name}' is a reserved word and may not be a label"));
    }
    if macros.is_macro(name) {
        return Err(format!("the label '{name}' matches a macro name"));
    }
    Ok(())
}

fn ignored_label_notice(line: usize, directive: Directive) -> Diagnostic {
    Diagnostic::warning(
        line,
        format!("the label before '{directive}' is ignored"),
    )
}

fn same_line_error(line: usize) -> Diagnostic {
    Diagnostic::error(line, "'.entry' and '.extern' may not share a line")
}

// ---------------------------------------------------------------------------
//  Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::has_errors;

    fn pass_one(source: &[&str]) -> (PassOneResult, Vec<Diagnostic>) {
        let lines: Vec<String> = source.iter().map(|s| s.to_string()).collect();
        let macros = MacroEngine::new();
        let catalog = InsnCatalog::new();
        let mut diagnostics = Vec::new();
        let result = run(&lines, &macros, &catalog, &mut diagnostics);
        (result, diagnostics)
    }

    #[test]
    fn test_counters_and_labels() {
        let (result, diagnostics) = pass_one(&["MAIN: mov r3, LEN", "LEN: .data 6"]);
        assert!(!has_errors(&diagnostics));
        assert_eq!(result.code.len(), 3);
        assert_eq!(result.data.len(), 1);
        let main = result.symbols.lookup("MAIN").unwrap();
        assert_eq!((main.value, main.kind), (100, SymbolKind::Code));
        // Data labels hold the raw DC until relocation.
        let len = result.symbols.lookup("LEN").unwrap();
        assert_eq!((len.value, len.kind), (0, SymbolKind::Data));
    }

    #[test]
    fn test_two_register_compression() {
        let (result, diagnostics) = pass_one(&["cmp r1, r2", "cmp r1, *r2", "cmp r1, #0"]);
        assert!(!has_errors(&diagnostics));
        // 2 + 2 + 3 words.
        assert_eq!(result.code.len(), 7);
    }

    #[test]
    fn test_direct_operands_become_placeholders() {
        let (result, diagnostics) = pass_one(&["jmp NEXT", "NEXT: stop"]);
        assert!(!has_errors(&diagnostics));
        assert_eq!(result.code.len(), 3);
        assert!(result.code.is_placeholder(1));
        assert_eq!(result.code.unresolved(), 1);
    }

    #[test]
    fn test_string_encoding() {
        let (result, diagnostics) = pass_one(&["STR: .string \"abcdef\""]);
        assert!(!has_errors(&diagnostics));
        assert_eq!(result.data.len(), 7);
        assert_eq!(result.data.words()[6].raw(), 0);
    }

    #[test]
    fn test_data_range_enforced() {
        let (_, diagnostics) = pass_one(&[".data 16384"]);
        assert!(has_errors(&diagnostics));
        let (result, diagnostics) = pass_one(&[".data -16384, 16383"]);
        assert!(!has_errors(&diagnostics));
        assert_eq!(result.data.len(), 2);
    }

    #[test]
    fn test_duplicate_label() {
        let (_, diagnostics) = pass_one(&["X: .data 1", "X: .data 2"]);
        assert!(has_errors(&diagnostics));
        assert!(diagnostics[0].message.contains("more than once"));
        assert_eq!(diagnostics[0].line, 2);
    }

    #[test]
    fn test_reserved_label_rejected() {
        for label in ["mov", "r3", ".data"] {
            let (_, diagnostics) = pass_one(&[&format!("{label}: stop")[..]]);
            assert!(has_errors(&diagnostics), "label {label} should be rejected");
        }
    }

    #[test]
    fn test_label_length_limit() {
        let long = "L".repeat(MAX_LABEL_LEN + 1);
        let line = format!("{long}: stop");
        let (_, diagnostics) = pass_one(&[&line[..]]);
        assert!(has_errors(&diagnostics));
        assert!(diagnostics[0].message.contains("limit"));
    }

    #[test]
    fn test_arity_mismatch() {
        let (_, diagnostics) = pass_one(&["mov r1"]);
        assert!(has_errors(&diagnostics));
        let (_, diagnostics) = pass_one(&["stop r1"]);
        assert!(has_errors(&diagnostics));
    }

    #[test]
    fn test_illegal_addressing_modes() {
        // mov may not target an immediate.
        let (_, diagnostics) = pass_one(&["mov r1, #5"]);
        assert!(has_errors(&diagnostics));
        // lea requires a direct source.
        let (_, diagnostics) = pass_one(&["lea r1, r2"]);
        assert!(has_errors(&diagnostics));
        // jmp may not target a plain register.
        let (_, diagnostics) = pass_one(&["jmp r1"]);
        assert!(has_errors(&diagnostics));
        // cmp takes immediates on both sides.
        let (_, diagnostics) = pass_one(&["cmp #1, #2"]);
        assert!(!has_errors(&diagnostics));
    }

    #[test]
    fn test_comma_discipline_reported() {
        for line in ["mov r1,, r2", "mov , r1", "mov r1 r2", "mov r1, r2,"] {
            let (_, diagnostics) = pass_one(&[line]);
            assert!(has_errors(&diagnostics), "line {line:?} should be rejected");
        }
    }

    #[test]
    fn test_unknown_operation() {
        let (_, diagnostics) = pass_one(&["mvo r1, r2"]);
        assert!(has_errors(&diagnostics));
        assert!(diagnostics[0].message.contains("unknown operation"));
        let (_, diagnostics) = pass_one(&[".word 5"]);
        assert!(diagnostics[0].message.contains("unknown directive"));
    }

    #[test]
    fn test_extern_declaration() {
        let (result, diagnostics) = pass_one(&[".extern X"]);
        assert!(!has_errors(&diagnostics));
        let x = result.symbols.lookup("X").unwrap();
        assert_eq!((x.value, x.kind), (0, SymbolKind::External));
    }

    #[test]
    fn test_extern_errors() {
        let (_, diagnostics) = pass_one(&[".extern"]);
        assert!(has_errors(&diagnostics));
        let (_, diagnostics) = pass_one(&[".extern X Y"]);
        assert!(has_errors(&diagnostics));
        let (_, diagnostics) = pass_one(&[".extern mov"]);
        assert!(has_errors(&diagnostics));
        let (_, diagnostics) = pass_one(&["X: stop", ".extern X"]);
        assert!(has_errors(&diagnostics));
    }

    #[test]
    fn test_label_before_extern_is_a_notice() {
        let (result, diagnostics) = pass_one(&["L: .extern X"]);
        assert!(!has_errors(&diagnostics));
        assert_eq!(diagnostics.len(), 1);
        assert!(result.symbols.lookup("L").is_none());
        assert!(result.symbols.lookup("X").is_some());
    }

    #[test]
    fn test_entry_and_extern_on_one_line() {
        let (_, diagnostics) = pass_one(&[".entry .extern X"]);
        assert!(has_errors(&diagnostics));
        let (_, diagnostics) = pass_one(&[".extern .entry X"]);
        assert!(has_errors(&diagnostics));
    }

    #[test]
    fn test_label_only_line_rejected() {
        let (_, diagnostics) = pass_one(&["LOOP:"]);
        assert!(has_errors(&diagnostics));
    }

    #[test]
    fn test_memory_overflow_stops_the_scan() {
        // 140 lines of 30 data words overrun the 3996 usable words.
        let line = format!(".data {}", vec!["1"; 30].join(","));
        let lines: Vec<String> = std::iter::repeat(line).take(140).collect();
        let macros = MacroEngine::new();
        let catalog = InsnCatalog::new();
        let mut diagnostics = Vec::new();
        run(&lines, &macros, &catalog, &mut diagnostics);
        assert!(has_errors(&diagnostics));
        assert!(diagnostics
            .iter()
            .any(|d| d.message.contains("memory limit")));
    }

    #[test]
    fn test_error_recovery_continues() {
        let (result, diagnostics) = pass_one(&["bogus r1", "stop"]);
        assert!(has_errors(&diagnostics));
        assert_eq!(diagnostics.len(), 1);
        // The good line was still encoded.
        assert_eq!(result.code.len(), 1);
    }
}
