//! Cell value types

use lazy_regex::regex_is_match;
use std::fmt;

/// A single cell: raw text as entered plus the last computed display value
///
/// `value` is authoritative. `display_value` is derived on every
/// recalculation pass and never read back as an input to evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Cell {
    /// Literal or formula text (formulas start with `=`)
    pub value: String,
    /// Cached human-readable result
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub display_value: Option<String>,
}

impl Cell {
    /// Create a cell holding `value` with no cached display value
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self {
            value: value.into(),
            display_value: None,
        }
    }

    /// Check if the cell holds a formula
    pub fn is_formula(&self) -> bool {
        self.value.starts_with('=')
    }

    /// Check if the cell has no content
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// The cached display value, falling back to the raw value
    pub fn display(&self) -> &str {
        self.display_value.as_deref().unwrap_or(&self.value)
    }
}

/// A cell's content or a literal token coerced to a typed value
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    /// Text that parses fully as a decimal number
    Number(f64),
    /// Anything else that is not empty
    Text(String),
    /// Empty string or missing cell
    Empty,
}

impl ResolvedValue {
    /// Coerce raw text: full decimal match is a number, `""` is empty, the rest is text
    ///
    /// `"42abc"` stays text; there is no leading-prefix parse.
    pub fn coerce(text: &str) -> Self {
        if text.is_empty() {
            return ResolvedValue::Empty;
        }
        match parse_number(text) {
            Some(n) => ResolvedValue::Number(n),
            None => ResolvedValue::Text(text.to_string()),
        }
    }

    /// Get the value as a number, if it is one
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ResolvedValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String form used for display, concatenation and string comparison
    pub fn as_text(&self) -> String {
        match self {
            ResolvedValue::Number(n) => format_number(*n),
            ResolvedValue::Text(s) => s.clone(),
            ResolvedValue::Empty => String::new(),
        }
    }

    /// Check if this is the empty value
    pub fn is_empty(&self) -> bool {
        matches!(self, ResolvedValue::Empty)
    }

    /// Check if this is a number
    pub fn is_number(&self) -> bool {
        matches!(self, ResolvedValue::Number(_))
    }
}

impl fmt::Display for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

/// Parse text as a finite decimal number, requiring the whole (trimmed) string to match
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if !regex_is_match!(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$", text) {
        return None;
    }
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Format a number the way cells display it: shortest round-trip decimal
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        // Avoid "-0"
        return "0".to_string();
    }
    n.to_string()
}

/// Error values displayed in a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorCode {
    /// #DIV/0! - Division by zero
    DivZero,
    /// #NAME? - Unknown function or stray identifier
    Name,
    /// #VALUE! - Argument of the wrong type
    Value,
    /// #REF! - Reference outside the table
    Ref,
    /// #N/A - Lookup found nothing
    NotAvailable,
    /// #ERROR! - Any other evaluation failure
    Error,
    /// #CIRC! - Formula depends on itself
    Circular,
}

impl ErrorCode {
    /// Get the display string for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DivZero => "#DIV/0!",
            ErrorCode::Name => "#NAME?",
            ErrorCode::Value => "#VALUE!",
            ErrorCode::Ref => "#REF!",
            ErrorCode::NotAvailable => "#N/A",
            ErrorCode::Error => "#ERROR!",
            ErrorCode::Circular => "#CIRC!",
        }
    }

    /// Parse an error display string
    pub fn from_display(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "#DIV/0!" => Some(ErrorCode::DivZero),
            "#NAME?" => Some(ErrorCode::Name),
            "#VALUE!" => Some(ErrorCode::Value),
            "#REF!" => Some(ErrorCode::Ref),
            "#N/A" => Some(ErrorCode::NotAvailable),
            "#ERROR!" => Some(ErrorCode::Error),
            "#CIRC!" => Some(ErrorCode::Circular),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
