//! Configuration access port trait.

/// Typed lookups by `[section] key`; missing or unparsable values fall back
/// to the given default.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
}
