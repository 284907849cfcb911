//! Reusable building blocks for validation rules.
//!
//! Rules themselves are registered on a `RecordType` builder; this module
//! provides the predicates rules are commonly made of, including regex
//! matching backed by a process-wide compiled-pattern cache.

use std::sync::OnceLock;

use regex::Regex;

use crate::value::Value;

/// Thread-safe regex cache for compiled patterns.
///
/// Patterns are compiled lazily on first use and cached for the lifetime
/// of the program, so rule predicates can be called on every `set` without
/// recompiling.
struct RegexCache {
    cache: std::sync::RwLock<std::collections::HashMap<String, Regex>>,
}

impl RegexCache {
    fn new() -> Self {
        Self {
            cache: std::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }

    fn get_or_compile(&self, pattern: &str) -> Result<Regex, regex::Error> {
        // Fast path: check if already cached
        {
            let cache = self.cache.read().unwrap();
            if let Some(regex) = cache.get(pattern) {
                return Ok(regex.clone());
            }
        }

        // Slow path: compile and cache
        let regex = Regex::new(pattern)?;
        {
            let mut cache = self.cache.write().unwrap();
            cache.insert(pattern.to_string(), regex.clone());
        }
        Ok(regex)
    }
}

/// Global regex cache singleton.
fn regex_cache() -> &'static RegexCache {
    static CACHE: OnceLock<RegexCache> = OnceLock::new();
    CACHE.get_or_init(RegexCache::new)
}

/// Check if a string matches a regex pattern.
///
/// Returns `false` if the pattern is invalid (logs a warning) so that a
/// bad pattern degrades to a failing rule rather than a panic mid-save.
pub fn matches_pattern(value: &str, pattern: &str) -> bool {
    match regex_cache().get_or_compile(pattern) {
        Ok(regex) => regex.is_match(value),
        Err(e) => {
            tracing::warn!(
                pattern = pattern,
                error = %e,
                "Invalid regex pattern in validation, treating as non-match"
            );
            false
        }
    }
}

/// Validate a regex pattern eagerly (e.g. at record-type build time).
///
/// Returns an error message if the pattern is invalid, None if valid.
pub fn validate_pattern(pattern: &str) -> Option<String> {
    match Regex::new(pattern) {
        Ok(_) => None,
        Err(e) => Some(format!("invalid regex pattern: {e}")),
    }
}

/// Predicate: the value is not null.
pub fn present() -> impl Fn(&Value) -> bool + Send + Sync {
    |value| !value.is_null()
}

/// Predicate: the value is text of at least `min` characters.
///
/// Null and non-text values fail; pair with a separate `present` rule if
/// null should produce its own message.
pub fn min_length(min: usize) -> impl Fn(&Value) -> bool + Send + Sync {
    move |value| value.as_str().is_some_and(|s| s.chars().count() >= min)
}

/// Predicate: the value is text matching `pattern`.
pub fn pattern(pattern: &'static str) -> impl Fn(&Value) -> bool + Send + Sync {
    move |value| value.as_str().is_some_and(|s| matches_pattern(s, pattern))
}
