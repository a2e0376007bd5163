//! Configuration validation

use crate::AppOptions;
use std::time::Duration;
use train_core::cookies::is_valid_cookie_name;
use train_core::{Error, Result};

/// Longest cookie lifetime browsers honor (400 days)
pub const MAX_COOKIE_AGE: Duration = Duration::from_secs(400 * 24 * 60 * 60);

/// Validate application options
pub fn validate_options(options: &AppOptions) -> Result<()> {
    if options.hostname.trim().is_empty() {
        return Err(Error::Config("hostname cannot be empty".to_string()));
    }

    options.listen_addr()?;

    if !is_valid_cookie_name(&options.cookie_key) {
        return Err(Error::Config(format!(
            "cookie_key '{}' is not a valid cookie name",
            options.cookie_key
        )));
    }

    if options.cookie_options.max_age.is_zero() {
        return Err(Error::Config("cookie_options.max_age must be > 0".to_string()));
    }

    if options.cookie_options.max_age > MAX_COOKIE_AGE {
        return Err(Error::Config(format!(
            "cookie_options.max_age must be at most {} days",
            MAX_COOKIE_AGE.as_secs() / 86_400
        )));
    }

    if !options.cookie_options.path.starts_with('/') {
        return Err(Error::Config("cookie_options.path must start with '/'".to_string()));
    }

    if options.max_body_size == 0 {
        return Err(Error::Config("max_body_size must be > 0".to_string()));
    }

    if options.session_purge_interval.is_zero() {
        return Err(Error::Config("session_purge_interval must be > 0".to_string()));
    }

    if options.cookie_options.same_site == train_core::SameSite::None
        && !options.cookie_options.secure
    {
        tracing::warn!("SameSite=None cookies are rejected by browsers unless secure is set");
    }

    if let Some(root) = &options.app_root {
        if !root.exists() {
            tracing::warn!(app_root = %root.display(), "app_root does not exist");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        assert!(validate_options(&AppOptions::default()).is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(validate_options(&AppOptions::new("")).is_err());
        assert!(validate_options(&AppOptions::new("not-an-ip")).is_err());
        assert!(validate_options(&AppOptions::default().with_cookie_key("a b")).is_err());
        assert!(validate_options(&AppOptions::default().with_max_body_size(0)).is_err());

        let mut options = AppOptions::default();
        options.cookie_options.max_age = Duration::ZERO;
        assert!(validate_options(&options).is_err());

        let mut options = AppOptions::default();
        options.cookie_options.path = "relative".to_string();
        assert!(validate_options(&options).is_err());
    }

    #[test]
    fn test_cookie_max_age_upper_bound() {
        let mut options = AppOptions::default();
        options.cookie_options.max_age = MAX_COOKIE_AGE;
        assert!(validate_options(&options).is_ok());

        options.cookie_options.max_age = Duration::from_secs(u64::MAX / 2);
        let err = validate_options(&options).unwrap_err();
        assert!(err.to_string().contains("400 days"));
    }

    #[test]
    fn test_zero_session_purge_interval() {
        let options = AppOptions::default().with_session_purge_interval(Duration::ZERO);
        assert!(validate_options(&options).is_err());
    }
}
