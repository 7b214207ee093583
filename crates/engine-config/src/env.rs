use crate::error::ConfigError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

pub const DEFAULT_ENV_FILE: &str = ".env";

/// Environment variables from the process, optionally topped up from a
/// `.env` file. Variables already set in the process win over the file.
#[derive(Debug, Clone)]
pub struct EnvManager {
    vars: HashMap<String, String>,
}

impl EnvManager {
    pub fn new() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// A manager holding exactly `pairs`, ignoring the process environment.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Load variables from a .env file
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::EnvFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        self.parse_env_content(&content)?;
        debug!("Loaded environment from {}", path.display());
        Ok(())
    }

    /// Loads `./.env` when it exists; a missing file is not an error.
    pub fn load_default_file(&mut self) -> Result<(), ConfigError> {
        let path = Path::new(DEFAULT_ENV_FILE);
        if path.is_file() {
            self.load_from_file(path)?;
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    /// Parses `key` when set, `default` otherwise.
    pub fn get_parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                var: key.to_string(),
                value: raw.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Only the literal `true` switches a flag on.
    pub fn get_flag(&self, key: &str) -> bool {
        self.get(key) == Some("true")
    }

    fn parse_env_content(&mut self, content: &str) -> Result<(), ConfigError> {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let line = line.strip_prefix("export ").unwrap_or(line);
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Malformed(format!(
                    "malformed line {} (expected KEY=VALUE)",
                    line_num + 1
                )));
            };

            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::Malformed(format!(
                    "empty key at line {}",
                    line_num + 1
                )));
            }

            self.vars
                .entry(key.to_string())
                .or_insert_with(|| Self::unquote_value(value));
        }

        Ok(())
    }

    fn unquote_value(value: &str) -> String {
        let value = value.trim();

        for quote in ['"', '\''] {
            if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
                return value[1..value.len() - 1].to_string();
            }
        }

        value.to_string()
    }
}

impl Default for EnvManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn empty() -> EnvManager {
        EnvManager::from_pairs(Vec::<(String, String)>::new())
    }

    #[test]
    fn test_parse_basic_env() {
        let mut env = empty();
        let content = r#"
# Comment
KEY1=value1
export KEY2 = value2
        "#;

        env.parse_env_content(content).unwrap();
        assert_eq!(env.get("KEY1"), Some("value1"));
        assert_eq!(env.get("KEY2"), Some("value2"));
    }

    #[test]
    fn test_parse_quoted_values() {
        let mut env = empty();
        let content = r#"
QUOTED="value with spaces"
SINGLE='single quoted'
UNQUOTED=no_spaces
URL=postgres://u:p@h/db?sslmode=require
        "#;

        env.parse_env_content(content).unwrap();
        assert_eq!(env.get("QUOTED"), Some("value with spaces"));
        assert_eq!(env.get("SINGLE"), Some("single quoted"));
        assert_eq!(env.get("UNQUOTED"), Some("no_spaces"));
        assert_eq!(env.get("URL"), Some("postgres://u:p@h/db?sslmode=require"));
    }

    #[test]
    fn test_invalid_env_format() {
        let mut env = empty();
        assert!(env.parse_env_content("INVALID LINE WITHOUT EQUALS").is_err());
        assert!(env.parse_env_content("=value").is_err());
    }

    #[test]
    fn test_process_values_win_over_file() {
        let mut env = EnvManager::from_pairs([("DEST_DB_HOST", "from-process")]);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DEST_DB_HOST=from-file\nDEST_DB_PORT=6000").unwrap();

        env.load_from_file(file.path()).unwrap();
        assert_eq!(env.get("DEST_DB_HOST"), Some("from-process"));
        assert_eq!(env.get("DEST_DB_PORT"), Some("6000"));
    }

    #[test]
    fn test_missing_file_is_reported() {
        let mut env = empty();
        let err = env.load_from_file("/definitely/not/here/.env").unwrap_err();
        assert!(matches!(err, ConfigError::EnvFile { .. }));
    }

    #[test]
    fn test_typed_getters() {
        let env = EnvManager::from_pairs([
            ("SYNC_BATCH_SIZE", "250"),
            ("DEBUG", "TRUE"),
            ("BAD_PORT", "abc"),
            ("EMPTY", ""),
        ]);

        assert_eq!(env.get_parsed("SYNC_BATCH_SIZE", 1000_usize).unwrap(), 250);
        assert_eq!(env.get_parsed("UNSET", 1000_usize).unwrap(), 1000);
        assert!(matches!(
            env.get_parsed("BAD_PORT", 5432_u16),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(!env.get_flag("DEBUG"));
        assert_eq!(env.get("EMPTY"), None);
        assert!(matches!(env.require("EMPTY"), Err(ConfigError::Missing(_))));
    }
}
