//! Disallowed token lists and their loaders.

use std::path::Path;

use tracing::{info, warn};

use crate::config::FilterConfig;
use crate::error::{GuardError, Result};

/// Built-in English list used when no other list is configured.
const BUILTIN_TOKENS: &[&str] = &[
    "fuck",
    "shit",
    "bitch",
    "cunt",
    "asshole",
    "bastard",
    "dickhead",
    "wanker",
    "twat",
    "whore",
    "slut",
    "retard",
];

/// An ordered list of lowercase tokens, fixed once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisallowedTokenSet {
    tokens: Vec<String>,
}

impl DisallowedTokenSet {
    /// Build a set from raw tokens.
    ///
    /// Tokens are trimmed and lower-cased. Empty tokens are dropped since
    /// they would match every message.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized = Vec::new();
        for token in tokens {
            let token = token.as_ref().trim().to_lowercase();
            if token.is_empty() {
                warn!("Ignoring empty disallowed token");
                continue;
            }
            normalized.push(token);
        }
        Self { tokens: normalized }
    }

    /// The built-in English list.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_TOKENS)
    }

    /// Load a list from a file.
    ///
    /// `.json` files hold an array of strings, `.yaml`/`.yml` files a
    /// sequence. Anything else is read as one token per line, with `#`
    /// starting a comment line.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let tokens: Vec<String> = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents).map_err(|e| {
                GuardError::WordList(format!("{}: {}", path.display(), e))
            })?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&contents).map_err(|e| {
                GuardError::WordList(format!("{}: {}", path.display(), e))
            })?,
            _ => parse_plain(&contents),
        };

        let set = Self::new(tokens);
        info!(path = %path.display(), tokens = set.len(), "Loaded disallowed word list");
        Ok(set)
    }

    /// Assemble the list a [`FilterConfig`] describes: the built-in list if
    /// enabled, then inline words, then the word file.
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        let mut tokens: Vec<String> = Vec::new();
        if config.use_builtin {
            tokens.extend(BUILTIN_TOKENS.iter().map(|t| t.to_string()));
        }
        tokens.extend(config.words.iter().cloned());
        if let Some(path) = &config.words_path {
            tokens.extend(Self::from_file(path)?.tokens);
        }
        Ok(Self::new(tokens))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

fn parse_plain(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_tokens_are_normalized() {
        let set = DisallowedTokenSet::new(["  BadWord ", "", "   ", "other"]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["badword", "other"]);
    }

    #[test]
    fn test_order_is_preserved() {
        let set = DisallowedTokenSet::new(["zeta", "alpha", "mid"]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_builtin_is_lowercase() {
        let set = DisallowedTokenSet::builtin();
        assert!(!set.is_empty());
        assert!(set.iter().all(|t| t == t.to_lowercase()));
    }

    #[test]
    fn test_from_json_file() {
        let file = write_temp(".json", r#"["Alpha", "beta"]"#);
        let set = DisallowedTokenSet::from_file(file.path()).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_from_yaml_file() {
        let file = write_temp(".yaml", "- alpha\n- beta\n");
        let set = DisallowedTokenSet::from_file(file.path()).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_from_plain_file() {
        let file = write_temp(".txt", "# comment\nalpha\n\n  beta  \n");
        let set = DisallowedTokenSet::from_file(file.path()).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let file = write_temp(".json", "{ not a list");
        let err = DisallowedTokenSet::from_file(file.path()).unwrap_err();
        assert!(matches!(err, GuardError::WordList(_)));
    }

    #[test]
    fn test_from_config_merges_sources() {
        let file = write_temp(".txt", "fromfile\n");
        let config = FilterConfig {
            use_builtin: false,
            words: vec!["inline".to_string()],
            words_path: Some(file.path().to_string_lossy().into_owned()),
            ..FilterConfig::default()
        };

        let set = DisallowedTokenSet::from_config(&config).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["inline", "fromfile"]);
    }

    #[test]
    fn test_from_config_with_builtin() {
        let config = FilterConfig::default();
        let set = DisallowedTokenSet::from_config(&config).unwrap();
        assert_eq!(set, DisallowedTokenSet::builtin());
    }
}
