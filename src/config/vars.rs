//! Environment variable interpolation for config files.
//!
//! Supports the following syntax:
//! - `${VAR}` - substitute with the env var value, error if missing
//! - `${VAR:-default}` - use the default if VAR is unset or empty
//! - `$$` - escape sequence for a literal `$`

use regex::Regex;
use std::env;
use std::sync::LazyLock;

/// Matches `$$`, `${VAR}` and `${VAR:-default}`.
static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\$|\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
        .expect("Invalid interpolation pattern")
});

/// Result of environment variable interpolation.
#[derive(Debug)]
pub struct InterpolationResult {
    /// The interpolated text.
    pub text: String,
    /// Any errors encountered during interpolation.
    pub errors: Vec<String>,
}

impl InterpolationResult {
    /// Returns true if there were no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Interpolate environment variables in the given text.
///
/// Errors are accumulated rather than short-circuited so the user sees
/// every missing variable at once.
pub fn interpolate(input: &str) -> InterpolationResult {
    let mut errors = Vec::new();

    let text = ENV_VAR_PATTERN
        .replace_all(input, |caps: &regex::Captures| {
            let full_match = caps.get(0).unwrap().as_str();
            if full_match == "$$" {
                return "$".to_string();
            }

            let var_name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let default_value = caps.get(2).map(|m| m.as_str());

            match env::var(var_name) {
                Ok(value) if !value.is_empty() => value,
                _ => match default_value {
                    Some(default) => default.to_string(),
                    None => {
                        errors.push(format!("environment variable '{var_name}' is not set"));
                        full_match.to_string()
                    }
                },
            }
        })
        .to_string();

    InterpolationResult { text, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn with_env_vars<F, R>(vars: &[(&str, Option<&str>)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let originals: Vec<_> = vars.iter().map(|(k, _)| (*k, env::var(k).ok())).collect();

        // SAFETY: These tests run serially against uniquely-named variables
        // and restore the original values afterwards
        for (key, value) in vars {
            match value {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }

        let result = f();

        // SAFETY: Restoring original environment state
        for (key, original) in originals {
            match original {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }

        result
    }

    #[test]
    fn test_braced_substitution() {
        with_env_vars(&[("FLURRY_TEST_BRACED", Some("hello"))], || {
            let result = interpolate("endpoint: ${FLURRY_TEST_BRACED}");
            assert!(result.is_ok());
            assert_eq!(result.text, "endpoint: hello");
        });
    }

    #[test]
    fn test_missing_variable_error() {
        with_env_vars(&[("FLURRY_TEST_MISSING", None)], || {
            let result = interpolate("key: ${FLURRY_TEST_MISSING}");
            assert!(!result.is_ok());
            assert_eq!(result.errors.len(), 1);
            assert!(result.errors[0].contains("FLURRY_TEST_MISSING"));
            assert!(result.errors[0].contains("not set"));
        });
    }

    #[test]
    fn test_default_value_when_unset() {
        with_env_vars(&[("FLURRY_TEST_UNSET", None)], || {
            let result = interpolate("version: ${FLURRY_TEST_UNSET:-2025-05-01-preview}");
            assert!(result.is_ok());
            assert_eq!(result.text, "version: 2025-05-01-preview");
        });
    }

    #[test]
    fn test_default_value_when_empty() {
        with_env_vars(&[("FLURRY_TEST_EMPTY", Some(""))], || {
            let result = interpolate("value: ${FLURRY_TEST_EMPTY:-fallback}");
            assert!(result.is_ok());
            assert_eq!(result.text, "value: fallback");
        });
    }

    #[test]
    fn test_escape_sequence() {
        let result = interpolate("price: $$100");
        assert!(result.is_ok());
        assert_eq!(result.text, "price: $100");
    }

    #[test]
    fn test_multiple_errors_accumulate() {
        with_env_vars(
            &[("FLURRY_TEST_A", None), ("FLURRY_TEST_B", None)],
            || {
                let result = interpolate("a: ${FLURRY_TEST_A}\nb: ${FLURRY_TEST_B}");
                assert_eq!(result.errors.len(), 2);
            },
        );
    }
}
