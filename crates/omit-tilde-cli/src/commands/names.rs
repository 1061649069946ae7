use miette::{IntoDiagnostic, Result};
use omit_tilde_core::{OmitTildePlugin, Options};
use serde::Serialize;
use std::path::Path;

use super::SCHEMA_VERSION;

#[derive(Serialize)]
struct NamesReport<'a> {
    schema_version: u32,
    ok: bool,
    active: bool,
    names: Vec<&'a str>,
    warnings: &'a [String],
}

pub fn run(cwd: &Path, options: Options, json: bool) -> Result<()> {
    let plugin = OmitTildePlugin::new(options, cwd);

    if json {
        let report = NamesReport {
            schema_version: SCHEMA_VERSION,
            ok: true,
            active: plugin.is_active(),
            names: plugin.watched_names().iter().map(String::as_str).collect(),
            warnings: plugin.startup_advisories(),
        };
        println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
    } else {
        for name in plugin.watched_names() {
            println!("{name}");
        }
        for warning in plugin.startup_advisories() {
            eprintln!("warning: {warning}");
        }
    }

    Ok(())
}
