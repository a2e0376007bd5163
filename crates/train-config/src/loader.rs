//! Configuration loading

use crate::{AppOptions, ConfigFormat};
use regex::Regex;
use std::env;
use std::fs;
use std::path::Path;
use train_core::{Error, Result};

/// Load options from a file
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<AppOptions> {
    let path = path.as_ref();

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    let format = ConfigFormat::from_path(path)?;

    load_from_str(&content, format)
}

/// Expand environment variables in configuration string
/// Supports syntax: ${VAR} and ${VAR:-default}
fn expand_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(:-([^}]*))?\}")
        .map_err(|e| Error::Config(format!("Invalid regex: {e}")))?;

    let mut result = String::with_capacity(content.len());
    let mut last_match = 0;

    for cap in re.captures_iter(content) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let var_name = var_name.as_str();

        let value = match (env::var(var_name), cap.get(3)) {
            (Ok(val), _) => val,
            (Err(_), Some(default)) => default.as_str().to_string(),
            (Err(_), None) => {
                return Err(Error::Config(format!(
                    "Environment variable '{var_name}' not set and no default provided"
                )));
            }
        };

        result.push_str(&content[last_match..full_match.start()]);
        result.push_str(&value);
        last_match = full_match.end();
    }

    result.push_str(&content[last_match..]);

    Ok(result)
}

/// Load options from a string
pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<AppOptions> {
    let expanded_content = expand_env_vars(content)?;

    let options = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse YAML: {e}")))?,
        ConfigFormat::Toml => toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {e}")))?,
        ConfigFormat::Json => serde_json::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse JSON: {e}")))?,
    };

    Ok(options)
}

/// Apply `TRAIN_HOSTNAME` and `TRAIN_PORT` overrides
pub fn apply_env_overrides(options: &mut AppOptions) -> Result<()> {
    if let Ok(hostname) = env::var("TRAIN_HOSTNAME") {
        tracing::debug!(hostname = %hostname, "Hostname overridden from environment");
        options.hostname = hostname;
    }

    if let Ok(port) = env::var("TRAIN_PORT") {
        options.port = port
            .parse()
            .map_err(|e| Error::Config(format!("Invalid TRAIN_PORT '{port}': {e}")))?;
        tracing::debug!(port = options.port, "Port overridden from environment");
    }

    Ok(())
}

/// Load, optionally override from the environment, and validate
pub fn load_config<P: AsRef<Path>>(path: P, env_overrides: bool) -> Result<AppOptions> {
    let mut options = load_from_file(path)?;

    if env_overrides {
        apply_env_overrides(&mut options)?;
    }

    crate::validator::validate_options(&options)?;

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use train_core::SameSite;

    const YAML_CONFIG: &str = r#"
hostname: "127.0.0.1"
port: 8080
cookie_key: "sid"
cookie_options:
  max_age: "2h"
  secure: true
  same_site: Strict
max_body_size: 1024
"#;

    #[test]
    fn test_load_yaml() {
        let options = load_from_str(YAML_CONFIG, ConfigFormat::Yaml).unwrap();

        assert_eq!(options.port, 8080);
        assert_eq!(options.cookie_key, "sid");
        assert_eq!(options.cookie_options.max_age, Duration::from_secs(7200));
        assert!(options.cookie_options.secure);
        assert!(options.cookie_options.http_only);
        assert_eq!(options.cookie_options.same_site, SameSite::Strict);
        assert_eq!(options.max_body_size, 1024);
    }

    #[test]
    fn test_load_toml_and_json_defaults() {
        let options = load_from_str("hostname = \"0.0.0.0\"\n", ConfigFormat::Toml).unwrap();
        assert_eq!(options, AppOptions::new("0.0.0.0"));

        let options = load_from_str(r#"{"hostname": "::1", "port": 4000}"#, ConfigFormat::Json).unwrap();
        assert_eq!(options.port, 4000);
        assert_eq!(options.cookie_key, "train.ticket");
    }

    #[test]
    fn test_missing_hostname() {
        assert!(load_from_str("port: 80", ConfigFormat::Yaml).is_err());
    }

    #[test]
    fn test_invalid_yaml() {
        let result = load_from_str("invalid: [yaml", ConfigFormat::Yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_env_var_substitution() {
        env::set_var("TRAIN_LOADER_TEST_PORT", "9090");
        env::remove_var("TRAIN_LOADER_TEST_MISSING");

        let content = r#"
hostname: "${TRAIN_LOADER_TEST_MISSING:-127.0.0.1}"
port: ${TRAIN_LOADER_TEST_PORT}
"#;
        let options = load_from_str(content, ConfigFormat::Yaml).unwrap();
        assert_eq!(options.hostname, "127.0.0.1");
        assert_eq!(options.port, 9090);

        let result = load_from_str("hostname: ${TRAIN_LOADER_TEST_MISSING}", ConfigFormat::Yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(YAML_CONFIG.as_bytes()).unwrap();

        let options = load_config(file.path(), false).unwrap();
        assert_eq!(options.hostname, "127.0.0.1");
    }

    #[test]
    fn test_load_config_rejects_invalid() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{"hostname": "127.0.0.1", "cookie_key": "bad key"}"#)
            .unwrap();

        assert!(load_config(file.path(), false).is_err());
    }
}
