//! Import specifier scanner.
//!
//! Finds the string literal of `import ... from`, bare `import "x"`,
//! `export ... from`, `import("x")` and `require("x")` without parsing.
//! Comments are skipped; template literals and computed specifiers are not
//! reported.

use std::collections::HashSet;

/// Import kinds reported by the scanner.
pub mod kinds {
    pub const ESM_IMPORT: &str = "esm_import";
    pub const ESM_EXPORT: &str = "esm_export";
    pub const DYNAMIC_IMPORT: &str = "dynamic_import";
    pub const CJS_REQUIRE: &str = "cjs_require";
}

/// Import specifier found in source code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Specifier exactly as found.
    pub raw: String,
    /// One of the [`kinds`] constants.
    pub kind: &'static str,
    /// Line of the string literal (1-indexed).
    pub line: u32,
}

/// Scan source code for import/require specifiers.
///
/// Returns discovered imports in first-appearance order, deduplicated by `raw`.
#[must_use]
pub fn scan_imports(source: &str) -> Vec<ImportSpec> {
    let mut scanner = Scanner {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
    };
    let mut results = Vec::new();
    let mut seen = HashSet::new();

    while scanner.pos < scanner.chars.len() {
        if scanner.skip_trivia() {
            continue;
        }

        let c = scanner.chars[scanner.pos];
        if c == '"' || c == '\'' || c == '`' {
            // Skip unrelated string literals so their contents are not scanned.
            scanner.read_string();
            continue;
        }

        let found = if scanner.keyword("import") {
            scanner.after_import()
        } else if scanner.keyword("export") {
            scanner.after_export()
        } else if scanner.keyword("require") {
            scanner
                .call_argument()
                .map(|spec| (spec, kinds::CJS_REQUIRE))
        } else {
            scanner.pos += 1;
            continue;
        };

        if let Some(((raw, line), kind)) = found {
            if !raw.is_empty() && seen.insert(raw.clone()) {
                results.push(ImportSpec { raw, kind, line });
            }
        }
    }

    results
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: u32,
}

impl Scanner {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// Skip whitespace and comments. Returns true if anything was skipped.
    fn skip_trivia(&mut self) -> bool {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '\n' {
                self.line += 1;
                self.pos += 1;
            } else if c.is_whitespace() {
                self.pos += 1;
            } else if c == '/' && self.chars.get(self.pos + 1) == Some(&'/') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.pos += 1;
                }
            } else if c == '/' && self.chars.get(self.pos + 1) == Some(&'*') {
                self.pos += 2;
                while self.pos < self.chars.len()
                    && !(self.chars[self.pos] == '*' && self.chars.get(self.pos + 1) == Some(&'/'))
                {
                    if self.chars[self.pos] == '\n' {
                        self.line += 1;
                    }
                    self.pos += 1;
                }
                self.pos = (self.pos + 2).min(self.chars.len());
            } else {
                break;
            }
        }
        self.pos != start
    }

    /// Consume `word` if it starts here on identifier boundaries.
    fn keyword(&mut self, word: &str) -> bool {
        let is_ident = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
        if self.pos > 0 && is_ident(self.chars[self.pos - 1]) {
            return false;
        }
        // `.import(` / `.require(` are member calls, not the keyword.
        if self.pos > 0 && self.chars[self.pos - 1] == '.' {
            return false;
        }
        let len = word.chars().count();
        let matches = self.pos + len <= self.chars.len()
            && word.chars().zip(&self.chars[self.pos..]).all(|(a, b)| a == *b)
            && !self.chars.get(self.pos + len).copied().is_some_and(is_ident);
        if matches {
            self.pos += len;
        }
        matches
    }

    /// Read a quoted string at the cursor, returning its contents and starting line.
    fn read_string(&mut self) -> Option<(String, u32)> {
        let quote = self.peek()?;
        let line = self.line;
        self.pos += 1;
        let mut value = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '\\' => {
                    if let Some(next) = self.peek() {
                        value.push(next);
                        self.pos += 1;
                    }
                }
                '\n' => {
                    self.line += 1;
                    if quote != '`' {
                        return None;
                    }
                    value.push(c);
                }
                c if c == quote => {
                    return (quote != '`').then_some((value, line));
                }
                c => value.push(c),
            }
        }
        None
    }

    /// Read `("spec")` after `require` / `import`.
    fn call_argument(&mut self) -> Option<(String, u32)> {
        self.skip_trivia();
        if self.peek() != Some('(') {
            return None;
        }
        self.pos += 1;
        self.skip_trivia();
        match self.peek() {
            Some('"' | '\'') => self.read_string(),
            _ => None,
        }
    }

    fn after_import(&mut self) -> Option<((String, u32), &'static str)> {
        self.skip_trivia();
        match self.peek() {
            Some('(') => self.call_argument().map(|s| (s, kinds::DYNAMIC_IMPORT)),
            Some('"' | '\'') => self.read_string().map(|s| (s, kinds::ESM_IMPORT)),
            // `import.meta`
            Some('.') => None,
            _ => self.from_clause().map(|s| (s, kinds::ESM_IMPORT)),
        }
    }

    fn after_export(&mut self) -> Option<((String, u32), &'static str)> {
        self.skip_trivia();
        // Only `export * ...` and `export { ... }` can carry a `from` clause.
        match self.peek() {
            Some('*' | '{') => self.from_clause().map(|s| (s, kinds::ESM_EXPORT)),
            Some('t') if self.keyword("type") => {
                self.skip_trivia();
                self.from_clause().map(|s| (s, kinds::ESM_EXPORT))
            }
            _ => None,
        }
    }

    /// Scan forward to `from "spec"`, giving up at a statement boundary.
    ///
    /// A `from` not followed by a string is a binding name
    /// (`import { from } from "x"`), so scanning continues past it.
    fn from_clause(&mut self) -> Option<(String, u32)> {
        while let Some(c) = self.peek() {
            if self.skip_trivia() {
                continue;
            }
            match c {
                ';' => return None,
                '"' | '\'' | '`' => return None,
                _ if self.keyword("from") => {
                    self.skip_trivia();
                    if let Some('"' | '\'') = self.peek() {
                        return self.read_string();
                    }
                }
                _ => self.pos += 1,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raws(source: &str) -> Vec<String> {
        scan_imports(source).into_iter().map(|s| s.raw).collect()
    }

    #[test]
    fn test_esm_forms() {
        let source = r#"
import React from "react";
import { map } from './lodash/map';
import * as ns from "./ns";
import "./side-effect.css";
import type { T } from './types';
import { from } from './lodash/get';
import { a as from } from "./lodash/set";
import from from './from';
"#;
        assert_eq!(
            raws(source),
            vec![
                "react",
                "./lodash/map",
                "./ns",
                "./side-effect.css",
                "./types",
                "./lodash/get",
                "./lodash/set",
                "./from",
            ]
        );
    }

    #[test]
    fn test_export_from_and_dynamic_and_require() {
        let source = r#"
export * from './a';
export { b } from "./b";
export const notAnImport = 1;
const c = require('./c');
const d = await import("./d");
"#;
        let specs = scan_imports(source);
        let pairs: Vec<_> = specs.iter().map(|s| (s.raw.as_str(), s.kind)).collect();
        assert_eq!(
            pairs,
            vec![
                ("./a", kinds::ESM_EXPORT),
                ("./b", kinds::ESM_EXPORT),
                ("./c", kinds::CJS_REQUIRE),
                ("./d", kinds::DYNAMIC_IMPORT),
            ]
        );
    }

    #[test]
    fn test_multiline_import_and_line_numbers() {
        let source = "// header\nimport {\n  a,\n  b,\n} from './lodash';\nrequire('./x');\n";
        let specs = scan_imports(source);
        assert_eq!(specs[0].raw, "./lodash");
        assert_eq!(specs[0].line, 5);
        assert_eq!(specs[1].raw, "./x");
        assert_eq!(specs[1].line, 6);
    }

    #[test]
    fn test_comments_and_strings_are_ignored() {
        let source = r#"
// import a from './commented';
/* require('./block') */
const s = "import x from './in-string'";
const t = `require('./in-template')`;
obj.require('./member');
import.meta.url;
"#;
        assert!(raws(source).is_empty());
    }

    #[test]
    fn test_loader_chain_and_query_kept_verbatim() {
        let source = "import css from 'style!css!./lodash/theme.css?inline';";
        assert_eq!(raws(source), vec!["style!css!./lodash/theme.css?inline"]);
    }

    #[test]
    fn test_deduplicates_by_raw() {
        let source = "import a from './a';\nconst b = require('./a');";
        assert_eq!(raws(source), vec!["./a"]);
    }
}
