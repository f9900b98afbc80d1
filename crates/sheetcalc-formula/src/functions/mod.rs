//! Built-in functions
//!
//! Every function receives its raw argument tokens and the evaluation
//! context, and decides per position whether an argument is a range or a
//! single value.

pub mod criteria;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod statistical;
pub mod text;

use crate::argument::{range_token, resolve_argument, Argument};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};
use crate::range::values_in_range;
use once_cell::sync::Lazy;
use sheetcalc_core::{CellRange, ResolvedValue};
use std::collections::HashMap;

/// Function implementation signature
pub type FunctionImpl = fn(&[&str], &mut EvaluationContext<'_>) -> FormulaResult<FormulaValue>;

/// Function definition
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// One-line summary shown in catalogs
    pub description: &'static str,
    /// Implementation
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    /// Reject argument lists outside `min_args..=max_args`
    pub fn check_arg_count(&self, count: usize) -> FormulaResult<()> {
        let too_few = count < self.min_args;
        let too_many = self.max_args.map_or(false, |max| count > max);
        if too_few || too_many {
            let expected = match self.max_args {
                Some(max) if max == self.min_args => max.to_string(),
                Some(max) => format!("{}..={}", self.min_args, max),
                None => format!("at least {}", self.min_args),
            };
            return Err(FormulaError::ArgumentCount {
                function: self.name.to_string(),
                expected,
                actual: count,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish()
    }
}

/// Function registry
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionDef>,
}

static REGISTRY: Lazy<FunctionRegistry> = Lazy::new(FunctionRegistry::new);

/// Look up a built-in function by name, case-insensitively
pub fn get_function(name: &str) -> Option<&'static FunctionDef> {
    REGISTRY.get(name)
}

/// Sorted names of all built-in functions
pub fn function_names() -> Vec<&'static str> {
    REGISTRY.names()
}

/// The global registry of built-in functions
pub fn registry() -> &'static FunctionRegistry {
    &REGISTRY
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };

        registry.register_math_functions();
        registry.register_statistical_functions();
        registry.register_text_functions();
        registry.register_logical_functions();
        registry.register_lookup_functions();

        registry
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_uppercase(), def);
    }

    /// Sorted function names
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.values().map(|f| f.name).collect();
        names.sort_unstable();
        names
    }

    /// Definitions sorted by name
    pub fn definitions(&self) -> Vec<&FunctionDef> {
        let mut defs: Vec<_> = self.functions.values().collect();
        defs.sort_by_key(|f| f.name);
        defs
    }

    fn register_math_functions(&mut self) {
        self.register(FunctionDef {
            name: "SUM",
            min_args: 1,
            max_args: None,
            description: "Sum of the numeric values",
            implementation: math::fn_sum,
        });

        self.register(FunctionDef {
            name: "AVERAGE",
            min_args: 1,
            max_args: None,
            description: "Mean of the numeric values",
            implementation: math::fn_average,
        });

        self.register(FunctionDef {
            name: "MAX",
            min_args: 1,
            max_args: None,
            description: "Largest numeric value, 0 if there are none",
            implementation: math::fn_max,
        });

        self.register(FunctionDef {
            name: "MIN",
            min_args: 1,
            max_args: None,
            description: "Smallest numeric value, 0 if there are none",
            implementation: math::fn_min,
        });

        self.register(FunctionDef {
            name: "ROUND",
            min_args: 1,
            max_args: Some(2),
            description: "Round half away from zero to a number of decimal places",
            implementation: math::fn_round,
        });

        self.register(FunctionDef {
            name: "SUMIF",
            min_args: 2,
            max_args: Some(3),
            description: "Sum the values whose paired cells match a criterion",
            implementation: math::fn_sumif,
        });
    }

    fn register_statistical_functions(&mut self) {
        self.register(FunctionDef {
            name: "COUNT",
            min_args: 1,
            max_args: None,
            description: "Number of numeric values",
            implementation: statistical::fn_count,
        });

        self.register(FunctionDef {
            name: "COUNTA",
            min_args: 1,
            max_args: None,
            description: "Number of non-empty values",
            implementation: statistical::fn_counta,
        });

        self.register(FunctionDef {
            name: "COUNTIF",
            min_args: 2,
            max_args: Some(2),
            description: "Number of cells matching a criterion",
            implementation: statistical::fn_countif,
        });
    }

    fn register_text_functions(&mut self) {
        self.register(FunctionDef {
            name: "CONCAT",
            min_args: 0,
            max_args: None,
            description: "Join values and ranges into one string",
            implementation: text::fn_concat,
        });

        self.register(FunctionDef {
            name: "CONCATENATE",
            min_args: 0,
            max_args: None,
            description: "Join values and ranges into one string",
            implementation: text::fn_concat,
        });

        self.register(FunctionDef {
            name: "LEN",
            min_args: 1,
            max_args: Some(1),
            description: "Number of characters",
            implementation: text::fn_len,
        });

        self.register(FunctionDef {
            name: "TRIM",
            min_args: 1,
            max_args: Some(1),
            description: "Remove leading and trailing whitespace",
            implementation: text::fn_trim,
        });

        self.register(FunctionDef {
            name: "LOWER",
            min_args: 1,
            max_args: Some(1),
            description: "Convert to lowercase",
            implementation: text::fn_lower,
        });

        self.register(FunctionDef {
            name: "UPPER",
            min_args: 1,
            max_args: Some(1),
            description: "Convert to uppercase",
            implementation: text::fn_upper,
        });

        self.register(FunctionDef {
            name: "PROPER",
            min_args: 1,
            max_args: Some(1),
            description: "Capitalize the first letter of each word",
            implementation: text::fn_proper,
        });
    }

    fn register_logical_functions(&mut self) {
        self.register(FunctionDef {
            name: "IF",
            min_args: 2,
            max_args: Some(3),
            description: "Choose a value by condition",
            implementation: logical::fn_if,
        });
    }

    fn register_lookup_functions(&mut self) {
        self.register(FunctionDef {
            name: "VLOOKUP",
            min_args: 3,
            max_args: Some(4),
            description: "Exact-match lookup in the first column of a table",
            implementation: lookup::fn_vlookup,
        });
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Values of every argument, flattened in order
///
/// Ranges and single cell labels are materialized; other tokens are
/// resolved as scalars. With `numeric_only`, only numbers are kept.
pub(crate) fn collect_values(
    args: &[&str],
    ctx: &mut EvaluationContext<'_>,
    numeric_only: bool,
) -> FormulaResult<Vec<ResolvedValue>> {
    let mut values = Vec::new();
    for token in args {
        if let Some(range) = range_token(token)? {
            values.extend(values_in_range(ctx, &range, numeric_only)?);
            continue;
        }
        match resolve_argument(token, ctx)? {
            Argument::Scalar(value) if !numeric_only || value.is_number() => values.push(value),
            Argument::Scalar(_) => {}
            Argument::Range(range) => values.extend(range),
        }
    }
    Ok(values)
}

/// The range an argument must refer to
pub(crate) fn range_argument(token: &str) -> FormulaResult<CellRange> {
    range_token(token)?.ok_or_else(|| {
        FormulaError::InvalidArgument(format!("'{}' is not a range", token.trim()))
    })
}

/// Numbers among the argument values
pub(crate) fn collect_numbers(args: &[&str], ctx: &mut EvaluationContext<'_>) -> FormulaResult<Vec<f64>> {
    Ok(collect_values(args, ctx, true)?
        .iter()
        .filter_map(ResolvedValue::as_number)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_catalog() {
        assert_eq!(
            function_names(),
            vec![
                "AVERAGE",
                "CONCAT",
                "CONCATENATE",
                "COUNT",
                "COUNTA",
                "COUNTIF",
                "IF",
                "LEN",
                "LOWER",
                "MAX",
                "MIN",
                "PROPER",
                "ROUND",
                "SUM",
                "SUMIF",
                "TRIM",
                "UPPER",
                "VLOOKUP",
            ]
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(get_function("vlookup").map(|f| f.name), Some("VLOOKUP"));
        assert!(get_function("NOPE").is_none());
    }

    #[test]
    fn test_arg_count() {
        let round = get_function("ROUND").unwrap();
        assert!(round.check_arg_count(1).is_ok());
        assert!(round.check_arg_count(2).is_ok());
        assert_eq!(
            round.check_arg_count(3),
            Err(FormulaError::ArgumentCount {
                function: "ROUND".into(),
                expected: "1..=2".into(),
                actual: 3,
            })
        );
        assert!(get_function("SUM").unwrap().check_arg_count(0).is_err());
        assert!(get_function("CONCAT").unwrap().check_arg_count(0).is_ok());
    }

    #[test]
    fn test_every_function_has_a_description() {
        for def in registry().definitions() {
            assert!(!def.description.is_empty(), "{} lacks a description", def.name);
        }
    }
}
