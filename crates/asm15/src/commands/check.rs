//! Check command implementation — run the full pipeline and report
//! diagnostics without writing any artifact files.

use std::path::PathBuf;

use miette::{IntoDiagnostic, Result, WrapErr};

use asm15_core::Assembler;

use crate::output::{
    CheckOutput, DiagnosticEntry, DiagnosticSummary, FileOutput, OutputFormat, print_json,
};

/// Run the check command.
pub fn run(files: Vec<String>, format: OutputFormat) -> Result<()> {
    let assembler = Assembler::new();
    let mut outputs = Vec::new();
    let mut total_errors = 0usize;

    for file in &files {
        let path = complete_source_path(file);
        let source = std::fs::read_to_string(&path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read source file: {}", path.display()))?;

        tracing::info!("Checking {}", path.display());
        let (artifacts, diagnostics) = assembler.assemble(&source);
        let summary = DiagnosticSummary::of(&diagnostics);
        total_errors += summary.errors;

        let source_name = path.display().to_string();
        if !format.is_json() {
            if artifacts.is_some() {
                println!("✓ {source_name}: assembles cleanly");
            } else {
                println!("✗ {source_name}: does not assemble");
            }
            for diagnostic in &diagnostics {
                println!("  {diagnostic}");
            }
            println!(
                "  {} error(s), {} warning(s)",
                summary.errors, summary.warnings
            );
        }

        outputs.push(FileOutput {
            status: if artifacts.is_some() {
                "success".to_string()
            } else {
                "error".to_string()
            },
            stem: file.clone(),
            artifacts: Vec::new(),
            diagnostics: diagnostics
                .iter()
                .map(|d| DiagnosticEntry::from_diagnostic(d, &source_name))
                .collect(),
            summary,
        });
    }

    if format.is_json() {
        let status = if total_errors == 0 { "success" } else { "error" };
        print_json(&CheckOutput {
            status: status.to_string(),
            files: outputs,
        });
    }

    if total_errors > 0 {
        return Err(miette::miette!("check failed with {total_errors} error(s)"));
    }
    Ok(())
}

/// Complete a bare stem to its `.as` source path.
fn complete_source_path(file: &str) -> PathBuf {
    let path = PathBuf::from(file);
    if path.extension().is_some() {
        path
    } else {
        PathBuf::from(format!("{file}.as"))
    }
}
