use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use regex::Regex;

/// Compiled parameter patterns keyed by pattern text. Filled when a rule
/// snapshot is validated and reused by every extraction afterwards.
static PATTERNS: Lazy<RwLock<HashMap<String, Regex>>> = Lazy::new(RwLock::default);

/// Compile `pattern` once per process. Invalid patterns are not cached.
pub fn compiled_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    if let Some(re) = PATTERNS
        .read()
        .ok()
        .and_then(|cache| cache.get(pattern).cloned())
    {
        return Ok(re);
    }

    let re = Regex::new(pattern)?;
    if let Ok(mut cache) = PATTERNS.write() {
        cache.insert(pattern.to_string(), re.clone());
    }
    Ok(re)
}
