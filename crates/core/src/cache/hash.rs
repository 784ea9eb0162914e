//! Cache key generation.

use std::fmt;

use sha2::{Digest, Sha256};

/// Identity of a cached response: the endpoint plus its query parameters.
///
/// Parameters are sorted before hashing so their order never matters.
/// Callers must leave credentials out of `params`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    hash: String,
    endpoint: String,
}

impl CacheKey {
    pub fn new<I, K, V>(endpoint: &str, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut pairs: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();
        pairs.sort();

        let mut hasher = Sha256::new();
        hasher.update(endpoint.as_bytes());
        for (key, value) in &pairs {
            hasher.update(b"\n");
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
        }

        Self { hash: hex::encode(hasher.finalize()), endpoint: endpoint.to_string() }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let a = CacheKey::new("weather", [("q", "London"), ("units", "metric")]);
        let b = CacheKey::new("weather", [("q", "London"), ("units", "metric")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_param_order_ignored() {
        let a = CacheKey::new("weather", [("q", "London"), ("units", "metric")]);
        let b = CacheKey::new("weather", [("units", "metric"), ("q", "London")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_units_change_key() {
        let metric = CacheKey::new("weather", [("q", "London"), ("units", "metric")]);
        let imperial = CacheKey::new("weather", [("q", "London"), ("units", "imperial")]);
        assert_ne!(metric, imperial);
    }

    #[test]
    fn test_endpoint_changes_key() {
        let current = CacheKey::new("weather", [("q", "London")]);
        let forecast = CacheKey::new("forecast", [("q", "London")]);
        assert_ne!(current, forecast);
    }

    #[test]
    fn test_hash_format() {
        let key = CacheKey::new("weather", [("q", "London")]);
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key.endpoint(), "weather");
    }
}
