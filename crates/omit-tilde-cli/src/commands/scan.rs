//! `omit-tilde scan`: resolve every import in a source tree through the
//! plugin and report requests that should use `~`.

use miette::{IntoDiagnostic, Result};
use omit_tilde_core::resolve::is_success;
use omit_tilde_core::rewrite::check;
use omit_tilde_core::{
    scan_imports, Candidate, FsHost, OmitTildePlugin, Options, ResolvePipeline,
};
use omit_tilde_util::fs::{collect_source_files, read_to_string_lossy};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{codes, fail, SCHEMA_VERSION};

/// Parameters of a scan.
#[derive(Debug)]
pub struct ScanAction {
    pub cwd: PathBuf,
    pub paths: Vec<PathBuf>,
    pub options: Options,
}

/// A request the plugin rewrites.
#[derive(Debug, Serialize)]
pub struct CandidateJson {
    pub file: String,
    pub line: u32,
    pub kind: &'static str,
    pub request: String,
    pub module_request: String,
    pub name: String,
    /// Final resolution through the pipeline, if any.
    pub resolved: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub schema_version: u32,
    pub ok: bool,
    pub cwd: String,
    pub active: bool,
    pub policy: &'static str,
    pub deprecate: bool,
    pub names: Vec<String>,
    pub files_scanned: usize,
    pub imports_scanned: usize,
    pub unresolved: usize,
    pub candidates: Vec<CandidateJson>,
    pub warnings: Vec<String>,
}

pub fn run(action: ScanAction, json: bool) -> Result<()> {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => return fail(json, codes::SCAN_FAILED, &e),
    };

    let report = match runtime.block_on(scan(&action)) {
        Ok(report) => report,
        Err(e) => return fail(json, codes::SCAN_FAILED, &e),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
    } else {
        print_text(&report);
    }

    Ok(())
}

/// Run one build cycle over the files under `action.paths`.
pub async fn scan(action: &ScanAction) -> std::io::Result<ScanReport> {
    let cwd = dunce_canonical(&action.cwd);
    let plugin = Arc::new(OmitTildePlugin::new(action.options.clone(), &cwd));

    let mut pipeline = ResolvePipeline::new(Arc::new(FsHost::new().with_root(&cwd)));
    pipeline.apply(plugin.clone());

    let files = source_files(&cwd, &action.paths)?;
    debug!(files = files.len(), active = plugin.is_active(), "scan starting");

    pipeline.build_start();

    let config = plugin.rewriter().config();
    let guard = plugin.rewriter().guard();
    let mut imports_scanned = 0usize;
    let mut unresolved = 0usize;
    let mut candidates = Vec::new();

    for file in &files {
        let source = match read_to_string_lossy(file) {
            Ok(source) => source,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };
        let parent = file.parent().unwrap_or(&cwd);

        for import in scan_imports(&source) {
            imports_scanned += 1;
            let candidate = Candidate::from_specifier(parent, &import.raw);
            let outcome = pipeline.resolve(&candidate).await;
            if !is_success(&outcome) {
                unresolved += 1;
            }

            if let Ok(rewrite) = check(&candidate, config) {
                let (resolved, error) = match &outcome {
                    Ok(Some(r)) => (Some(display_relative(&r.path, &cwd)), None),
                    Ok(None) => (None, None),
                    Err(e) => (None, Some(e.message.clone())),
                };
                candidates.push(CandidateJson {
                    file: display_relative(file, &cwd),
                    line: import.line,
                    kind: import.kind,
                    request: import.raw.clone(),
                    module_request: format!("~{}", rewrite.module_request),
                    name: rewrite.name,
                    resolved,
                    error,
                });
            }

            // Lets pending guard releases run before the next request.
            while !guard.is_empty() {
                tokio::task::yield_now().await;
            }
        }
    }

    let warnings = pipeline.after_compile();

    Ok(ScanReport {
        schema_version: SCHEMA_VERSION,
        ok: true,
        cwd: cwd.display().to_string(),
        active: plugin.is_active(),
        policy: config.policy.as_str(),
        deprecate: config.deprecate,
        names: plugin.watched_names().iter().cloned().collect(),
        files_scanned: files.len(),
        imports_scanned,
        unresolved,
        candidates,
        warnings,
    })
}

fn source_files(cwd: &Path, paths: &[PathBuf]) -> std::io::Result<Vec<PathBuf>> {
    if paths.is_empty() {
        return collect_source_files(cwd);
    }

    let mut files = Vec::new();
    for path in paths {
        files.extend(collect_source_files(&cwd.join(path))?);
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn dunce_canonical(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn display_relative(path: &Path, cwd: &Path) -> String {
    path.strip_prefix(cwd)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn print_text(report: &ScanReport) {
    if !report.active {
        println!("no watched packages; nothing to rewrite");
    }
    for c in &report.candidates {
        let target = c
            .resolved
            .as_deref()
            .or(c.error.as_deref())
            .unwrap_or("unresolved");
        println!(
            "{}:{}: \"{}\" -> \"{}\" ({target})",
            c.file, c.line, c.request, c.module_request
        );
    }
    println!(
        "{} file(s), {} import(s), {} candidate(s), {} unresolved",
        report.files_scanned,
        report.imports_scanned,
        report.candidates.len(),
        report.unresolved
    );
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }
}
