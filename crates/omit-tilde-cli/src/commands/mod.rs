pub mod names;
pub mod scan;
pub mod version;

use miette::Result;
use serde::Serialize;

/// Schema version of the JSON reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Error codes reported in JSON output.
pub mod codes {
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";
    pub const SCAN_FAILED: &str = "SCAN_FAILED";
}

#[derive(Serialize)]
struct ErrorJson<'a> {
    code: &'a str,
    message: String,
}

#[derive(Serialize)]
struct ErrorResult<'a> {
    schema_version: u32,
    ok: bool,
    error: ErrorJson<'a>,
}

/// Report a command failure and exit with status 1.
pub fn fail(json: bool, code: &str, error: &dyn std::fmt::Display) -> Result<()> {
    if json {
        let result = ErrorResult {
            schema_version: SCHEMA_VERSION,
            ok: false,
            error: ErrorJson {
                code,
                message: error.to_string(),
            },
        };
        match serde_json::to_string(&result) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("error: {e}"),
        }
    } else {
        eprintln!("error: {error}");
    }
    std::process::exit(1);
}
