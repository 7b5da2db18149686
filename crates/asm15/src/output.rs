//! Structured output types for machine-readable CLI responses.
//!
//! When `--format json` is specified, commands emit these types as JSON
//! instead of human-readable text.

use serde::Serialize;

use asm15_core::{Diagnostic, Severity};

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }

    pub fn is_json(self) -> bool {
        self == OutputFormat::Json
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
}

/// A single diagnostic message.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticEntry {
    pub severity: DiagnosticSeverity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl DiagnosticEntry {
    /// Build an entry from a library diagnostic.
    pub fn from_diagnostic(diagnostic: &Diagnostic, file: &str) -> Self {
        let severity = match diagnostic.severity {
            Severity::Error => DiagnosticSeverity::Error,
            Severity::Warning => DiagnosticSeverity::Warning,
            Severity::Info => DiagnosticSeverity::Info,
        };
        Self {
            severity,
            message: diagnostic.message.clone(),
            file: Some(file.to_string()),
            line: Some(diagnostic.line),
        }
    }
}

/// Summary of diagnostic counts.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticSummary {
    pub errors: usize,
    pub warnings: usize,
}

impl DiagnosticSummary {
    pub fn of(diagnostics: &[Diagnostic]) -> Self {
        Self {
            errors: diagnostics
                .iter()
                .filter(|d| d.severity == Severity::Error)
                .count(),
            warnings: diagnostics
                .iter()
                .filter(|d| d.severity == Severity::Warning)
                .count(),
        }
    }
}

/// Per-file result of an assemble run.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutput {
    pub status: String,
    pub stem: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
    pub diagnostics: Vec<DiagnosticEntry>,
    pub summary: DiagnosticSummary,
}

/// Output from the assemble command.
#[derive(Debug, Clone, Serialize)]
pub struct AssembleOutput {
    pub status: String,
    pub files: Vec<FileOutput>,
}

/// Output from the check command.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutput {
    pub status: String,
    pub files: Vec<FileOutput>,
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("error: failed to serialize output: {err}"),
    }
}
