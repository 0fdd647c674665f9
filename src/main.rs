mod analyzer;
mod ast;
mod config;
mod decl_scan;
mod discovery;
mod lexer;
mod object_model;
mod parser;
mod preprocessor;
mod symbol_table;
mod token;
mod types;

use std::path::PathBuf;
use std::process;

use clap::Parser;
use colored::Colorize;
use rayon::prelude::*;
use serde_json::json;

use ast::{ModuleKind, Scope, VariableDecl};
use types::Diagnostic;

#[derive(Parser)]
#[command(
    name = "vba-reaper",
    about = "Static dead-reference and unreachable-code analyzer for VBA-dialect sources",
    version,
    long_about = "Scans a directory of .bas/.cls/.frm sources for undefined \
                  identifiers, unresolved members, dot-references outside a \
                  With block, unreachable code, and argument-count mismatches."
)]
struct Cli {
    /// Directory to scan recursively for .bas/.cls/.frm files.
    input_dir: PathBuf,

    /// Comma-separated conditional-compilation defines, e.g. --define DEBUG=True,VER=2.
    #[arg(long)]
    define: Option<String>,

    /// Path to an object-model JSON file to merge on top of the bundled standard model.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Path to write the JSON report to.
    #[arg(long, default_value = "vba_report.json")]
    output: PathBuf,
}

/// A source file after decoding, before lexing — `raw` owns the bytes every
/// borrowed token and AST node in its module ultimately points into.
struct SourceFile {
    filename: String,
    kind: ModuleKind,
    raw: String,
}

fn main() {
    let cli = Cli::parse();

    if !cli.input_dir.is_dir() {
        eprintln!("{}: input directory {} not found", "error".red().bold(), cli.input_dir.display());
        process::exit(1);
    }

    let model = match config::build_object_model(cli.model.as_deref()) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{}: {e:#}", "error".red().bold());
            process::exit(1);
        }
    };

    let defines = config::build_defines(cli.define.as_deref());

    let paths = match discovery::discover_source_files(&cli.input_dir) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}: {e:#}", "error".red().bold());
            process::exit(1);
        }
    };

    // ── read & decode (sequential: harvested form controls must borrow the
    // same owned buffer the module's tokens borrow, so every source's text
    // is collected up front into a Vec that outlives the analysis) ─────────
    let mut sources = Vec::with_capacity(paths.len());
    let mut skipped = 0usize;
    for path in &paths {
        let kind = match path.extension().and_then(|e| e.to_str()).and_then(discovery::module_kind_for_extension) {
            Some(k) => k,
            None => continue,
        };
        match discovery::read_source_latin1(path) {
            Ok(raw) => sources.push(SourceFile { filename: path.display().to_string(), kind, raw }),
            Err(e) => {
                eprintln!("{}: {}: {e}", "warning".yellow(), path.display());
                skipped += 1;
            }
        }
    }

    // ── lex → preprocess → parse (parallel) ─────────────────────────────────
    let parsed: Vec<_> = sources
        .par_iter()
        .map(|source| {
            let (body, controls) = if source.kind == ModuleKind::Form {
                (discovery::strip_frm_header(&source.raw), discovery::harvest_form_controls(&source.raw))
            } else {
                (source.raw.as_str(), Vec::new())
            };

            let tokens = lexer::lex(body);
            let filtered = preprocessor::preprocess(&tokens, &defines);
            let (mut module, diags) = parser::parse_module(&source.filename, source.kind, &filtered);

            for (control_type, control_name) in controls {
                let type_name = control_type.rsplit('.').next().unwrap_or(control_type);
                module.variables.push(VariableDecl::new(control_name, type_name, Scope::Public, 0));
            }

            (module, diags)
        })
        .collect();

    let mut modules = Vec::with_capacity(parsed.len());
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    for (module, diags) in parsed {
        modules.push(module);
        diagnostics.extend(diags);
    }

    // ── analyze (sequential: pass 1 must see every module before pass 2
    // walks any procedure body) ─────────────────────────────────────────────
    // No sort here: spec's ordering requirement is emission order, stable
    // relative to file-discovery order and in-file token order — `parsed`
    // above already preserves discovery order (rayon's collect() keeps
    // input order regardless of which thread finished first), and each
    // module's own diagnostics are appended in parse/analysis order.
    diagnostics.extend(analyzer::analyze(&modules, &model));

    // ── console output ───────────────────────────────────────────────────────
    for d in &diagnostics {
        println!("{}", d.to_string().red());
    }
    if diagnostics.is_empty() {
        println!("{}", "No issues found".green());
    } else {
        println!("{}", format!("Found {} issue(s)", diagnostics.len()).yellow().bold());
    }
    if skipped > 0 {
        eprintln!("{}", format!("skipped {skipped} file(s) due to read errors").yellow());
    }

    // ── JSON report ───────────────────────────────────────────────────────────
    let report = json!({
        "summary": {
            "files_scanned": sources.len(),
            "issues_found": diagnostics.len(),
        },
        "issues": diagnostics.iter().map(|d| json!({
            "file": d.file,
            "line": d.line,
            "message": d.message,
        })).collect::<Vec<_>>(),
    });
    if let Err(e) = std::fs::write(&cli.output, serde_json::to_string_pretty(&report).unwrap()) {
        eprintln!("{}: failed to write {}: {e}", "warning".yellow(), cli.output.display());
    }

    process::exit(0);
}
