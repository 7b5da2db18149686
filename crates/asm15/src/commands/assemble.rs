//! Assemble command implementation.
//!
//! Each argument is a file stem: `<stem>.as` is read and, on success,
//! `<stem>.ob` plus conditionally `<stem>.ent` / `<stem>.ext` are written.
//! A file with line errors is reported and skipped; the run only fails
//! (non-zero exit) when every input file was unreadable or an output file
//! could not be created.

use std::path::{Path, PathBuf};

use miette::{IntoDiagnostic, Result, WrapErr};

use asm15_core::{has_errors, Artifacts, Assembler};

use crate::output::{
    AssembleOutput, DiagnosticEntry, DiagnosticSummary, FileOutput, OutputFormat, print_json,
};

/// Run the assemble command.
pub fn run(
    stems: Vec<String>,
    out_dir: Option<PathBuf>,
    keep_expanded: bool,
    format: OutputFormat,
) -> Result<()> {
    if let Some(dir) = &out_dir {
        std::fs::create_dir_all(dir)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to create output directory: {}", dir.display()))?;
    }

    let assembler = Assembler::new();
    let mut opened = 0usize;
    let mut files = Vec::new();

    for stem in &stems {
        let stem = stem.strip_suffix(".as").unwrap_or(stem);
        let source_path = PathBuf::from(format!("{stem}.as"));

        let source = match std::fs::read_to_string(&source_path) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("error: unable to open {}: {err}", source_path.display());
                files.push(FileOutput {
                    status: "unreadable".to_string(),
                    stem: stem.to_string(),
                    artifacts: Vec::new(),
                    diagnostics: Vec::new(),
                    summary: DiagnosticSummary {
                        errors: 0,
                        warnings: 0,
                    },
                });
                continue;
            }
        };
        opened += 1;

        tracing::info!("Assembling {}", source_path.display());
        let (artifacts, diagnostics) = assembler.assemble(&source);

        let source_name = source_path.display().to_string();
        if !format.is_json() {
            for diagnostic in &diagnostics {
                println!("{source_name}: {diagnostic}");
            }
        }

        let mut written = Vec::new();
        if let Some(artifacts) = &artifacts {
            written = write_artifacts(stem, out_dir.as_deref(), keep_expanded, artifacts)?;
            if !format.is_json() {
                println!("✓ {source_name}: wrote {}", written.join(", "));
            }
        } else if !format.is_json() {
            let summary = DiagnosticSummary::of(&diagnostics);
            println!("✗ {source_name}: {} error(s), no output written", summary.errors);
        }

        files.push(FileOutput {
            status: if artifacts.is_some() {
                "success".to_string()
            } else {
                "error".to_string()
            },
            stem: stem.to_string(),
            artifacts: written,
            diagnostics: diagnostics
                .iter()
                .map(|d| DiagnosticEntry::from_diagnostic(d, &source_name))
                .collect(),
            summary: DiagnosticSummary::of(&diagnostics),
        });
        debug_assert!(artifacts.is_none() || !has_errors(&diagnostics));
    }

    if format.is_json() {
        let status = if stems.is_empty() || opened > 0 {
            "success"
        } else {
            "error"
        };
        print_json(&AssembleOutput {
            status: status.to_string(),
            files,
        });
    }

    if !stems.is_empty() && opened == 0 {
        return Err(miette::miette!("unable to open any of the input files"));
    }
    Ok(())
}

/// Write the rendered artifacts next to the source (or into `out_dir`).
/// Returns the paths written. A create/write failure is fatal.
fn write_artifacts(
    stem: &str,
    out_dir: Option<&Path>,
    keep_expanded: bool,
    artifacts: &Artifacts,
) -> Result<Vec<String>> {
    let base = match out_dir {
        Some(dir) => {
            let name = Path::new(stem)
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(stem));
            dir.join(name)
        }
        None => PathBuf::from(stem),
    };

    let mut written = Vec::new();
    let mut write = |extension: &str, contents: &str| -> Result<()> {
        let path = base.with_extension(extension);
        std::fs::write(&path, contents)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to create output file: {}", path.display()))?;
        written.push(path.display().to_string());
        Ok(())
    };

    write("ob", &artifacts.object)?;
    if let Some(entries) = &artifacts.entries {
        write("ent", entries)?;
    }
    if let Some(externals) = &artifacts.externals {
        write("ext", externals)?;
    }
    if keep_expanded {
        write("am", &artifacts.expanded)?;
    }
    Ok(written)
}
