//! Function-call recognition and argument splitting
//!
//! Both scanners are quote-aware (`""` inside a string literal is an escaped
//! quote) and track parenthesis depth, so `IF(A1>0, "a,b", SUM(B1, B2))`
//! splits into exactly three arguments.

use crate::error::{FormulaError, FormulaResult};
use lazy_regex::{regex, regex_captures};

/// Recognize `NAME( ... )` where the parenthesis opened after the name closes
/// at the very last character
///
/// Returns the name (case preserved) and the raw text between the outer
/// parentheses. `SUM(A1)+1` and unbalanced text are not function calls.
pub fn split_function_call(expr: &str) -> Option<(&str, &str)> {
    let expr = expr.trim();
    let (head, name) = regex_captures!(r"^([A-Za-z]+)\(", expr)?;
    let open = head.len() - 1;
    let close = matching_paren(expr, open)?;
    if close != expr.len() - 1 {
        return None;
    }
    Some((name, &expr[open + 1..close]))
}

/// Number of function calls (`NAME(`) outside string literals
pub fn count_calls(text: &str) -> usize {
    unquoted_segments(text)
        .map(|(_, segment)| regex!(r"[A-Za-z]+\(").find_iter(segment).count())
        .sum()
}

/// Byte index of the parenthesis closing the one at `open`
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    for (i, c) in text.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '"' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split an argument list at top-level commas
///
/// Each token is trimmed. An empty list yields no tokens; a stray closing
/// parenthesis or an unterminated string is a parse error.
pub fn split_arguments(args: &str) -> FormulaResult<Vec<&str>> {
    if args.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut start = 0;

    for (i, c) in args.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    FormulaError::Parse(format!("unbalanced ')' in '{}'", args))
                })?;
            }
            ',' if !in_string && depth == 0 => {
                tokens.push(args[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    if in_string {
        return Err(FormulaError::Parse(format!(
            "unterminated string in '{}'",
            args
        )));
    }
    if depth != 0 {
        return Err(FormulaError::Parse(format!("unbalanced '(' in '{}'", args)));
    }

    tokens.push(args[start..].trim());
    Ok(tokens)
}

/// Check whether `text` is a complete `"..."` literal
pub fn is_quoted(text: &str) -> bool {
    let text = text.trim();
    if text.len() < 2 || !text.starts_with('"') || !text.ends_with('"') {
        return false;
    }
    // The opening quote must not close before the end
    let inner = &text[1..text.len() - 1];
    inner.replace("\"\"", "").find('"').is_none()
}

/// Strip the quotes of a `"..."` literal and unescape `""`
pub fn unquote(text: &str) -> String {
    let text = text.trim();
    text[1..text.len() - 1].replace("\"\"", "\"")
}

/// Check for `c` outside of string literals
pub fn contains_unquoted(text: &str, needle: char) -> bool {
    unquoted_segments(text).any(|(_, segment)| segment.contains(needle))
}

/// Iterate over the parts of `text` that are outside string literals,
/// paired with their byte offset
pub fn unquoted_segments(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut segments = Vec::new();
    let mut in_string = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if c != '"' {
            continue;
        }
        if !in_string {
            segments.push((start, &text[start..i]));
        }
        in_string = !in_string;
        start = i + 1;
    }
    if !in_string {
        segments.push((start, &text[start..]));
    }
    segments.into_iter().filter(|(_, s)| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_function_call_shape() {
        assert_eq!(split_function_call("SUM(A1:A3)"), Some(("SUM", "A1:A3")));
        assert_eq!(split_function_call("  sum( 1, 2 ) "), Some(("sum", " 1, 2 ")));
        assert_eq!(split_function_call("NOW()"), Some(("NOW", "")));
        assert_eq!(
            split_function_call("IF(A1>0,SUM(B1:B2),0)"),
            Some(("IF", "A1>0,SUM(B1:B2),0"))
        );
    }

    #[test]
    fn test_not_function_call() {
        assert_eq!(split_function_call("SUM(A1)+SUM(A2)"), None);
        assert_eq!(split_function_call("SUM(A1)+1"), None);
        assert_eq!(split_function_call("A1+2"), None);
        assert_eq!(split_function_call("SUM(A1"), None);
        assert_eq!(split_function_call("(1+2)"), None);
        assert_eq!(split_function_call("LOG10(5)"), None);
    }

    #[test]
    fn test_paren_inside_string() {
        assert_eq!(
            split_function_call(r#"CONCAT("(", A1)"#),
            Some(("CONCAT", r#""(", A1"#))
        );
    }

    #[test]
    fn test_split_arguments() {
        assert_eq!(
            split_arguments(r#"A1>0, "a,b", SUM(B1, B2)"#).unwrap(),
            vec!["A1>0", r#""a,b""#, "SUM(B1, B2)"]
        );
        assert_eq!(split_arguments("").unwrap(), Vec::<&str>::new());
        assert_eq!(split_arguments("  ").unwrap(), Vec::<&str>::new());
        assert_eq!(split_arguments("1,,2").unwrap(), vec!["1", "", "2"]);
    }

    #[test]
    fn test_split_arguments_escaped_quote() {
        assert_eq!(
            split_arguments(r#""say ""hi"", ok", 2"#).unwrap(),
            vec![r#""say ""hi"", ok""#, "2"]
        );
    }

    #[test]
    fn test_split_arguments_unbalanced() {
        assert!(split_arguments("1, (2").is_err());
        assert!(split_arguments("1), 2").is_err());
        assert!(split_arguments(r#""open, 2"#).is_err());
    }

    #[test]
    fn test_quoting() {
        assert!(is_quoted(r#""abc""#));
        assert!(is_quoted(r#""""#));
        assert!(is_quoted(r#""a""b""#));
        assert!(!is_quoted(r#""a" & "b""#));
        assert!(!is_quoted("\""));
        assert!(!is_quoted("abc"));
        assert_eq!(unquote(r#""a""b""#), "a\"b");
        assert_eq!(unquote(r#""""#), "");
    }

    #[test]
    fn test_unquoted_segments() {
        let segments: Vec<_> = unquoted_segments(r#"A1="x:y" + B2"#).collect();
        assert_eq!(segments, vec![(0, "A1="), (8, " + B2")]);
        assert!(!contains_unquoted(r#""10:30""#, ':'));
        assert!(contains_unquoted("A1:B2", ':'));
    }

    #[test]
    fn test_count_calls() {
        assert_eq!(count_calls("ROUND(ROUND(A1, 0), 0)"), 2);
        assert_eq!(count_calls("A1*2+(B1-1)"), 0);
        assert_eq!(count_calls(r#"CONCAT("SUM(", A1)"#), 1);
    }
}
