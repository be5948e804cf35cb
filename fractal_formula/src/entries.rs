//! Formula library reader
//!
//! A formula library file holds entries of the form
//! `NAME[(paren)] [[bracket]] {` followed by the body, terminated by a
//! closing `}`. Entries with no name or named `comment` are skipped;
//! an unterminated trailing entry is dropped.

use std::io::{self, BufRead};

/// One entry extracted from a formula library file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormulaEntry {
    pub name: String,
    pub paren_value: String,
    pub bracket_value: String,
    pub body: String,
}

/// Extract all named entries from a formula library.
pub fn load_formula_entries<R: BufRead>(input: R) -> io::Result<Vec<FormulaEntry>> {
    let mut entries = Vec::new();
    let mut lines = input.lines();

    while let Some(line) = lines.next() {
        let mut line = line?;
        let Some(open_brace) = line.find('{') else {
            continue;
        };

        let mut name = line.clone();
        if let Some(end) = name.find([' ', '\t', '{']) {
            name.truncate(end);
        }

        let mut bracket_value = String::new();
        if let Some(close) = name.rfind(']') {
            if let Some(open) = name[..close].rfind('[') {
                bracket_value = name[open + 1..close].to_string();
                name.replace_range(open..=close, "");
            }
        }

        let mut paren_value = String::new();
        if let Some(close) = name.rfind(')') {
            if let Some(open) = name[..close].rfind('(') {
                paren_value = name[open + 1..close].to_string();
                name.replace_range(open..=close, "");
            }
        }

        if name.is_empty() || name == "comment" {
            if !line[open_brace..].contains('}') {
                for line in lines.by_ref() {
                    if line?.contains('}') {
                        break;
                    }
                }
            }
            continue;
        }

        let mut body = String::new();
        line.replace_range(..=open_brace, "");
        let mut found_brace = false;
        if let Some(close) = line.find('}') {
            line.truncate(close);
            found_brace = true;
        }
        body.push_str(&line);
        body.push('\n');

        if !found_brace {
            for line in lines.by_ref() {
                let mut line = line?;
                if let Some(close) = line.find('}') {
                    line.truncate(close);
                    body.push_str(&line);
                    body.push('\n');
                    found_brace = true;
                    break;
                }
                body.push_str(&line);
                body.push('\n');
            }
        }

        if found_brace {
            entries.push(FormulaEntry {
                name,
                paren_value,
                bracket_value,
                body,
            });
        }
    }

    Ok(entries)
}
