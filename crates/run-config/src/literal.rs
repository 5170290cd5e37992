// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Parsers for the literal cell values found in the user config.
//!
//! List columns (`metrics`, `metrics_aggregators`) are written the way a
//! spreadsheet user types a Python or JSON list:
//! ```text
//! ['WER', 'CER', 'BLEU']
//! ["by_id", "overall"]
//! []
//! ```

/// Cell values that mean "no value".
const NULL_LITERALS: [&str; 4] = ["none", "null", "nan", "n/a"];

/// Returns `true` if the cell is empty or spells a null value.
pub(crate) fn is_null(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || NULL_LITERALS.contains(&trimmed.to_lowercase().as_str())
}

/// Parses a bracketed list of strings.
///
/// Returns `Ok(None)` for a null cell and `Ok(Some(vec![]))` for `[]`.
/// Items may be single-quoted, double-quoted or bare.
pub(crate) fn parse_str_list(raw: &str) -> Result<Option<Vec<String>>, String> {
    if is_null(raw) {
        return Ok(None);
    }

    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| format!("expected a bracketed list, got '{trimmed}'"))?;

    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        let Some(&first) = chars.peek() else {
            break;
        };

        let item = match first {
            '\'' | '"' => {
                chars.next();
                let mut item = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                item.push(escaped);
                            }
                        }
                        c if c == first => {
                            closed = true;
                            break;
                        }
                        c => item.push(c),
                    }
                }
                if !closed {
                    return Err(format!("unterminated string in '{trimmed}'"));
                }
                item
            }
            ',' => return Err(format!("empty list item in '{trimmed}'")),
            _ => {
                let mut item = String::new();
                while let Some(&c) = chars.peek() {
                    if c == ',' {
                        break;
                    }
                    item.push(c);
                    chars.next();
                }
                item.trim_end().to_string()
            }
        };
        items.push(item);

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(c) => {
                return Err(format!("unexpected '{c}' after list item in '{trimmed}'"));
            }
        }
    }

    Ok(Some(items))
}

/// Parses a boolean flag cell. A null cell is `false`.
pub(crate) fn parse_flag(raw: &str) -> Result<bool, String> {
    if is_null(raw) {
        return Ok(false);
    }
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        other => Err(format!("expected a boolean, got '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_list() {
        let v = parse_str_list("['WER', 'CER', 'BLEU']").unwrap().unwrap();
        assert_eq!(v, vec!["WER", "CER", "BLEU"]);
    }

    #[test]
    fn test_json_list() {
        let v = parse_str_list(r#"["by_id","overall"]"#).unwrap().unwrap();
        assert_eq!(v, vec!["by_id", "overall"]);
    }

    #[test]
    fn test_bare_items_and_trailing_comma() {
        let v = parse_str_list("[WER, CER,]").unwrap().unwrap();
        assert_eq!(v, vec!["WER", "CER"]);
    }

    #[test]
    fn test_empty_list_is_some() {
        assert_eq!(parse_str_list("[]").unwrap(), Some(vec![]));
        assert_eq!(parse_str_list("[   ]").unwrap(), Some(vec![]));
    }

    #[test]
    fn test_null_cells() {
        assert_eq!(parse_str_list("").unwrap(), None);
        assert_eq!(parse_str_list("None").unwrap(), None);
        assert_eq!(parse_str_list(" nan ").unwrap(), None);
    }

    #[test]
    fn test_quoted_comma_and_escape() {
        let v = parse_str_list(r"['a,b', 'it\'s']").unwrap().unwrap();
        assert_eq!(v, vec!["a,b", "it's"]);
    }

    #[test]
    fn test_malformed_lists() {
        assert!(parse_str_list("WER, CER").is_err());
        assert!(parse_str_list("['WER'").is_err());
        assert!(parse_str_list("['WER").is_err());
        assert!(parse_str_list("['WER' 'CER']").is_err());
        assert!(parse_str_list("[, 'WER']").is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("True").unwrap());
        assert!(parse_flag("yes").unwrap());
        assert!(parse_flag("1").unwrap());
        assert!(!parse_flag("False").unwrap());
        assert!(!parse_flag("").unwrap());
        assert!(!parse_flag("None").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
