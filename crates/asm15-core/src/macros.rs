//! Macro table and pre-processor.
//!
//! Macro grammar (no parameters, no nesting):
//!
//! ```text
//! macr <name>
//!   <body-line>*
//! endmacr
//! ```
//!
//! A later line whose only token is a defined macro name is replaced by the
//! stored body, verbatim. Everything else passes through unchanged, except
//! comment and blank lines, which are dropped from the expanded stream.

use std::collections::HashMap;

use crate::diagnostic::Diagnostic;
use crate::lexer::{self, LexError, MAX_LABEL_LEN, MAX_LINE_LEN};

/// Pre-processor state while scanning a macro definition.
enum Definition {
    /// Capturing body lines for the named macro; the table entry is made
    /// at `endmacr`.
    Capture { name: String, body: Vec<String> },
    /// Swallowing body lines of a rejected definition.
    Discard,
}

/// The macro table and pre-processor.
///
/// The table outlives expansion because label validation in pass one must
/// reject names that shadow a macro.
#[derive(Debug, Default)]
pub struct MacroEngine {
    macros: HashMap<String, Vec<String>>,
}

impl MacroEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the name is a defined macro.
    pub fn is_macro(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// The stored body of a macro, if defined.
    pub fn body(&self, name: &str) -> Option<&[String]> {
        self.macros.get(name).map(Vec::as_slice)
    }

    /// Number of defined macros.
    pub fn len(&self) -> usize {
        self.macros.len()
    }

    /// Whether no macros are defined.
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Expand macro definitions and calls in `source`, producing the
    /// intermediate stream consumed by pass one.
    ///
    /// Line errors are appended to `diagnostics` with raw source line
    /// numbers; the offending line is skipped and scanning continues.
    pub fn expand(&mut self, source: &str, diagnostics: &mut Vec<Diagnostic>) -> Vec<String> {
        let mut expanded = Vec::new();
        let mut definition: Option<Definition> = None;
        let mut definition_line = 0;

        for (index, raw) in source.lines().enumerate() {
            let line = index + 1;

            if raw.len() > MAX_LINE_LEN {
                diagnostics.push(Diagnostic::error(line, LexError::LineTooLong.to_string()));
                continue;
            }

            let trimmed = raw.trim_start();
            if trimmed.is_empty() || trimmed.starts_with(';') {
                continue;
            }

            let mut tokens = raw.split_whitespace();
            let first = match tokens.next() {
                Some(t) => t,
                None => continue,
            };

            // Inside a definition: capture until a lone `endmacr`.
            if definition.is_some() {
                if first == "endmacr" {
                    if tokens.next().is_some() {
                        diagnostics.push(Diagnostic::error(
                            line,
                            "unexpected text after 'endmacr'",
                        ));
                    }
                    if let Some(Definition::Capture { name, body }) = definition.take() {
                        self.macros.insert(name, body);
                    }
                } else if let Some(Definition::Capture { body, .. }) = definition.as_mut() {
                    body.push(raw.to_string());
                }
                continue;
            }

            if first == "macr" {
                definition = Some(self.begin_definition(line, tokens, diagnostics));
                definition_line = line;
                continue;
            }

            if first == "endmacr" {
                diagnostics.push(Diagnostic::error(line, "'endmacr' without a matching 'macr'"));
                continue;
            }

            // Macro call: the name must be the only token on the line.
            if self.is_macro(first) {
                if tokens.next().is_some() {
                    diagnostics.push(Diagnostic::error(
                        line,
                        format!("unexpected text after calling macro '{first}'"),
                    ));
                    continue;
                }
                expanded.extend(self.macros[first].iter().cloned());
                continue;
            }

            // Pass-through line: macro vocabulary may not appear past the
            // first token.
            if let Some(stray) = tokens.find(|t| *t == "macr" || *t == "endmacr" || self.is_macro(t)) {
                diagnostics.push(Diagnostic::error(
                    line,
                    format!("'{stray}' may not appear inside a statement"),
                ));
                continue;
            }

            expanded.push(raw.to_string());
        }

        if let Some(Definition::Capture { name, .. }) = definition {
            diagnostics.push(Diagnostic::error(
                definition_line,
                format!("macro '{name}' is not terminated by 'endmacr'"),
            ));
        }

        tracing::debug!(
            "pre-processor finished: {} macro(s), {} line(s) in the expanded stream",
            self.macros.len(),
            expanded.len()
        );
        expanded
    }

    /// Validate a new macro name from a `macr` line and open its capture.
    fn begin_definition<'a>(
        &self,
        line: usize,
        mut tokens: impl Iterator<Item = &'a str>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Definition {
        let name = match tokens.next() {
            Some(name) => name,
            None => {
                diagnostics.push(Diagnostic::error(line, "missing macro name after 'macr'"));
                return Definition::Discard;
            }
        };
        if tokens.next().is_some() {
            diagnostics.push(Diagnostic::error(
                line,
                "unexpected text after a macro definition",
            ));
            return Definition::Discard;
        }
        if name.len() > MAX_LABEL_LEN {
            diagnostics.push(Diagnostic::error(
                line,
                format!("macro name '{name}' exceeds the limit of {MAX_LABEL_LEN} characters"),
            ));
            return Definition::Discard;
        }
        if !lexer::is_identifier(name)
            || lexer::is_reserved(name)
            || name == "macr"
            || name == "endmacr"
        {
            diagnostics.push(Diagnostic::error(
                line,
                format!("'{name}' is not a valid macro name"),
            ));
            return Definition::Discard;
        }
        if self.is_macro(name) {
            diagnostics.push(Diagnostic::error(
                line,
                format!("macro '{name}' is defined more than once"),
            ));
            return Definition::Discard;
        }

        Definition::Capture {
            name: name.to_string(),
            body: Vec::new(),
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

    fn expand(source: &str) -> (Vec<String>, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let mut engine = MacroEngine::new();
        let lines = engine.expand(source, &mut diagnostics);
        (lines, diagnostics)
    }

    #[test]
    fn test_expand_simple_macro() {
        let source = "macr AB\n\tinc r1\n\tdec r2\nendmacr\nAB\nstop\n";
        let (lines, diagnostics) = expand(source);
        assert!(!has_errors(&diagnostics));
        assert_eq!(lines, vec!["\tinc r1", "\tdec r2", "stop"]);
    }

    #[test]
    fn test_expand_macro_called_twice() {
        let source = "macr AB\ninc r1\nendmacr\nAB\nAB\n";
        let (lines, diagnostics) = expand(source);
        assert!(!has_errors(&diagnostics));
        assert_eq!(lines, vec!["inc r1", "inc r1"]);
    }

    #[test]
    fn test_comments_and_blanks_dropped() {
        let source = "; header\n\nstop\n   ; indented\n";
        let (lines, diagnostics) = expand(source);
        assert!(!has_errors(&diagnostics));
        assert_eq!(lines, vec!["stop"]);
    }

    #[test]
    fn test_body_captured_verbatim() {
        let source = "macr AB\n  mov  r1,  r2\nendmacr\nAB\n";
        let (lines, _) = expand(source);
        assert_eq!(lines, vec!["  mov  r1,  r2"]);
    }

    #[test]
    fn test_macro_redefinition_rejected() {
        let source = "macr AB\ninc r1\nendmacr\nmacr AB\ndec r1\nendmacr\n";
        let (_, diagnostics) = expand(source);
        assert!(has_errors(&diagnostics));
        assert!(diagnostics[0].message.contains("defined more than once"));
    }

    #[test]
    fn test_redefinition_body_discarded() {
        let source = "macr AB\ninc r1\nendmacr\nmacr AB\ndec r5\nendmacr\nAB\n";
        let (lines, diagnostics) = expand(source);
        assert!(has_errors(&diagnostics));
        // The rejected body must not leak into the stream or the table.
        assert_eq!(lines, vec!["inc r1"]);
    }

    #[test]
    fn test_reserved_macro_name_rejected() {
        for name in ["mov", ".data", "r3", "macr", "endmacr", "1ab"] {
            let source = format!("macr {name}\ninc r1\nendmacr\n");
            let (_, diagnostics) = expand(&source);
            assert!(has_errors(&diagnostics), "name {name} should be rejected");
        }
    }

    #[test]
    fn test_call_with_trailing_tokens_rejected() {
        let source = "macr AB\ninc r1\nendmacr\nAB extra\n";
        let (lines, diagnostics) = expand(source);
        assert!(has_errors(&diagnostics));
        assert!(lines.is_empty());
    }

    #[test]
    fn test_macr_inside_statement_rejected() {
        let (_, diagnostics) = expand("mov r1, macr\n");
        assert!(has_errors(&diagnostics));
    }

    #[test]
    fn test_macro_name_inside_statement_rejected() {
        let source = "macr AB\ninc r1\nendmacr\njmp AB\n";
        let (_, diagnostics) = expand(source);
        assert!(has_errors(&diagnostics));
    }

    #[test]
    fn test_endmacr_with_trailing_tokens() {
        let source = "macr AB\ninc r1\nendmacr junk\nAB\n";
        let (lines, diagnostics) = expand(source);
        assert!(has_errors(&diagnostics));
        // The definition still ends there; the call expands the body.
        assert_eq!(lines, vec!["inc r1"]);
    }

    #[test]
    fn test_unterminated_macro() {
        let source = "macr AB\ninc r1\n";
        let (_, diagnostics) = expand(source);
        assert!(has_errors(&diagnostics));
        assert!(diagnostics[0].message.contains("not terminated"));
    }

    #[test]
    fn test_line_too_long_reported() {
        let long = "a".repeat(MAX_LINE_LEN + 1);
        let (_, diagnostics) = expand(&long);
        assert!(has_errors(&diagnostics));
        assert_eq!(diagnostics[0].line, 1);

        let exact = format!("{}\n", "b".repeat(MAX_LINE_LEN));
        let (lines, diagnostics) = expand(&exact);
        assert!(!has_errors(&diagnostics));
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_table_survives_expansion() {
        let mut diagnostics = Vec::new();
        let mut engine = MacroEngine::new();
        engine.expand("macr AB\ninc r1\nendmacr\n", &mut diagnostics);
        assert!(engine.is_macro("AB"));
        assert!(!engine.is_macro("CD"));
        assert_eq!(engine.body("AB").unwrap(), ["inc r1".to_string()]);
        assert_eq!(engine.len(), 1);
    }
}
