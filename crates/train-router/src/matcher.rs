//! Path matching utilities

use regex::Regex;
use std::collections::HashMap;
use train_core::{Error, Result};

/// Path pattern matcher
#[derive(Debug, Clone)]
pub struct PathMatcher {
    /// Original pattern
    pattern: String,

    /// Compiled regex (if dynamic)
    regex: Option<Regex>,

    /// Parameter names in order
    param_names: Vec<String>,

    /// Has wildcard (*)?
    has_wildcard: bool,
}

impl PathMatcher {
    /// Create a new path matcher from a pattern
    ///
    /// Patterns:
    /// - `/users` - static path
    /// - `/users/:id` - dynamic path with parameter
    /// - `/users/:id/posts/:post_id` - multiple parameters
    /// - `/static/*filepath` - wildcard (must be last)
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        if !pattern.starts_with('/') {
            return Err(Error::Config(format!(
                "Route pattern must start with '/': {pattern}"
            )));
        }

        let mut param_names = Vec::new();
        let mut has_wildcard = false;

        let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
        for (i, segment) in segments.iter().enumerate() {
            if let Some(name) = segment.strip_prefix(':') {
                param_names.push(name.to_string());
            } else if let Some(name) = segment.strip_prefix('*') {
                if i + 1 != segments.len() {
                    return Err(Error::Config(format!(
                        "Wildcard must be the last segment: {pattern}"
                    )));
                }
                has_wildcard = true;
                param_names.push(name.to_string());
            }
        }

        let regex = if param_names.is_empty() {
            None
        } else {
            Some(Self::pattern_to_regex(&segments)?)
        };

        Ok(Self {
            pattern,
            regex,
            param_names,
            has_wildcard,
        })
    }

    fn pattern_to_regex(segments: &[&str]) -> Result<Regex> {
        let mut regex_str = String::from("^");

        for segment in segments {
            if segment.starts_with(':') {
                regex_str.push_str("/([^/]+)");
            } else if segment.starts_with('*') {
                // Wildcard also matches an empty tail
                regex_str.push_str("(?:/(.*))?");
            } else {
                regex_str.push('/');
                regex_str.push_str(&regex::escape(segment));
            }
        }

        regex_str.push_str("/?$");

        Regex::new(&regex_str).map_err(|e| Error::Config(format!("Invalid route pattern: {e}")))
    }

    /// Match a path against this pattern, returning extracted params
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        match &self.regex {
            None => (path == self.pattern
                || path.strip_suffix('/') == Some(self.pattern.as_str()))
            .then(HashMap::new),
            Some(re) => re.captures(path).map(|captures| {
                self.param_names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        let value = captures.get(i + 1).map(|m| m.as_str()).unwrap_or_default();
                        (name.clone(), value.to_string())
                    })
                    .collect()
            }),
        }
    }

    /// Get the pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Is this a static path?
    pub fn is_static(&self) -> bool {
        self.regex.is_none()
    }

    /// Has wildcard?
    pub fn has_wildcard(&self) -> bool {
        self.has_wildcard
    }

    /// Get parameter names
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_path() {
        let matcher = PathMatcher::new("/users").unwrap();
        assert!(matcher.is_static());

        assert!(matcher.matches("/users").is_some());
        assert!(matcher.matches("/users/").is_some());
        assert!(matcher.matches("/users/123").is_none());
    }

    #[test]
    fn test_params() {
        let matcher = PathMatcher::new("/users/:user_id/posts/:post_id").unwrap();
        assert_eq!(matcher.param_names(), &["user_id", "post_id"]);

        let params = matcher.matches("/users/42/posts/100").unwrap();
        assert_eq!(params.get("user_id"), Some(&"42".to_string()));
        assert_eq!(params.get("post_id"), Some(&"100".to_string()));

        assert!(matcher.matches("/users/42/posts").is_none());
        assert!(matcher.matches("/users/42/posts/100/extra").is_none());
    }

    #[test]
    fn test_wildcard() {
        let matcher = PathMatcher::new("/static/*filepath").unwrap();
        assert!(matcher.has_wildcard());

        let params = matcher.matches("/static/css/main.css").unwrap();
        assert_eq!(params.get("filepath"), Some(&"css/main.css".to_string()));

        let params = matcher.matches("/static").unwrap();
        assert_eq!(params.get("filepath"), Some(&String::new()));
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(PathMatcher::new("users").is_err());
        assert!(PathMatcher::new("/static/*rest/more").is_err());
    }

    #[test]
    fn test_escaped_static_segments() {
        let matcher = PathMatcher::new("/files/:name/v1.0").unwrap();
        assert!(matcher.matches("/files/a/v1.0").is_some());
        assert!(matcher.matches("/files/a/v1x0").is_none());
    }
}
