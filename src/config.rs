use anyhow::{bail, Context, Result};
use std::time::Duration;

use crate::chat::AttachmentPolicy;

pub const DEFAULT_PERSONA: &str = "You are Brenin AI, a helpful digital human assistant. Provide accurate, helpful, and engaging responses. Be conversational and friendly.";

pub const DEFAULT_DEEPSEEK_URL: &str = "https://api.deepseek.com/v1/chat/completions";
pub const DEFAULT_DEEPSEEK_MODEL: &str = "deepseek-chat";

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub completion_url: String,
    pub info_url: String,
    pub system_context: Option<String>,
    pub deepseek_api_key: Option<String>,
    pub deepseek_url: String,
    pub deepseek_model: String,
    pub completion_timeout: Duration,
    pub info_timeout: Duration,
    pub reply_timeout: Duration,
    pub typing_delay: Duration,
    pub new_flag_ttl: Duration,
    pub max_attachments: usize,
    pub max_attachment_bytes: u64,
    pub terminal: bool,
}

impl Config {
    /// Reads the configuration from the process environment.
    /// `.env` is expected to be loaded by the caller beforehand.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port: u16 = parse_or(&var, "BRENIN_PORT", 3000)?;

        let completion_url = var("BRENIN_COMPLETION_URL")
            .unwrap_or_else(|| format!("http://127.0.0.1:{}/api/deepseek", port));
        let info_url = var("BRENIN_INFO_URL")
            .unwrap_or_else(|| format!("http://127.0.0.1:{}", port))
            .trim_end_matches('/')
            .to_string();

        let config = Self {
            port,
            completion_url,
            info_url,
            system_context: var("BRENIN_SYSTEM_CONTEXT"),
            deepseek_api_key: var("DEEPSEEK_API_KEY"),
            deepseek_url: var("DEEPSEEK_API_URL").unwrap_or_else(|| DEFAULT_DEEPSEEK_URL.into()),
            deepseek_model: var("DEEPSEEK_MODEL").unwrap_or_else(|| DEFAULT_DEEPSEEK_MODEL.into()),
            completion_timeout: Duration::from_secs(parse_or(
                &var,
                "BRENIN_COMPLETION_TIMEOUT_SECS",
                10,
            )?),
            info_timeout: Duration::from_secs(parse_or(&var, "BRENIN_INFO_TIMEOUT_SECS", 5)?),
            reply_timeout: Duration::from_secs(parse_or(&var, "BRENIN_REPLY_TIMEOUT_SECS", 20)?),
            typing_delay: Duration::from_millis(parse_or(&var, "BRENIN_TYPING_DELAY_MS", 1000)?),
            new_flag_ttl: Duration::from_millis(parse_or(&var, "BRENIN_NEW_FLAG_TTL_MS", 3000)?),
            max_attachments: parse_or(&var, "BRENIN_MAX_ATTACHMENTS", 3)?,
            max_attachment_bytes: parse_or(
                &var,
                "BRENIN_MAX_ATTACHMENT_BYTES",
                AttachmentPolicy::GENERAL_MAX_BYTES,
            )?,
            terminal: parse_or(&var, "BRENIN_TERMINAL", true)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attachments == 0 {
            bail!("BRENIN_MAX_ATTACHMENTS must be at least 1");
        }
        if self.completion_timeout.is_zero() || self.info_timeout.is_zero() {
            bail!("request timeouts must be greater than zero");
        }
        // The cycle must outlast a hung completion call plus the info lookup.
        if self.reply_timeout <= self.completion_timeout + self.info_timeout {
            bail!(
                "BRENIN_REPLY_TIMEOUT_SECS ({:?}) must exceed the completion and info timeouts combined ({:?})",
                self.reply_timeout,
                self.completion_timeout + self.info_timeout
            );
        }
        Ok(())
    }

    pub fn attachment_policy(&self) -> AttachmentPolicy {
        AttachmentPolicy::new(self.max_attachments, self.max_attachment_bytes)
    }

    /// System context sent with every completion call.
    pub fn persona(&self) -> &str {
        self.system_context.as_deref().unwrap_or(DEFAULT_PERSONA)
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.completion_url, "http://127.0.0.1:3000/api/deepseek");
        assert_eq!(config.info_url, "http://127.0.0.1:3000");
        assert_eq!(config.max_attachments, 3);
        assert_eq!(config.max_attachment_bytes, 10 * 1024 * 1024);
        assert_eq!(config.typing_delay, Duration::from_millis(1000));
        assert_eq!(config.reply_timeout, Duration::from_secs(20));
        assert!(config.deepseek_api_key.is_none());
        assert!(config.terminal);
        assert_eq!(config.persona(), DEFAULT_PERSONA);
    }

    #[test]
    fn test_port_feeds_default_urls() {
        let config = Config::from_lookup(lookup(&[("BRENIN_PORT", "5000")])).unwrap();
        assert_eq!(config.completion_url, "http://127.0.0.1:5000/api/deepseek");
        assert_eq!(config.info_url, "http://127.0.0.1:5000");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("BRENIN_INFO_URL", "http://info.local/"),
            ("BRENIN_SYSTEM_CONTEXT", "You are terse."),
            ("DEEPSEEK_API_KEY", "sk-test"),
            ("BRENIN_TERMINAL", "false"),
            ("BRENIN_MAX_ATTACHMENTS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.info_url, "http://info.local");
        assert_eq!(config.persona(), "You are terse.");
        assert_eq!(config.deepseek_api_key.as_deref(), Some("sk-test"));
        assert!(!config.terminal);
        assert_eq!(config.attachment_policy().max_files, 5);
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup(&[("DEEPSEEK_API_KEY", "  ")])).unwrap();
        assert!(config.deepseek_api_key.is_none());
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = Config::from_lookup(lookup(&[("BRENIN_PORT", "not-a-port")])).unwrap_err();
        assert!(err.to_string().contains("BRENIN_PORT"));
    }

    #[test]
    fn test_validation() {
        assert!(Config::from_lookup(lookup(&[("BRENIN_MAX_ATTACHMENTS", "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[
            ("BRENIN_COMPLETION_TIMEOUT_SECS", "30"),
            ("BRENIN_REPLY_TIMEOUT_SECS", "10"),
        ]))
        .is_err());
    }

    #[test]
    fn test_reply_timeout_must_outlast_backend_timeouts() {
        let equal = Config::from_lookup(lookup(&[
            ("BRENIN_COMPLETION_TIMEOUT_SECS", "1"),
            ("BRENIN_REPLY_TIMEOUT_SECS", "1"),
        ]))
        .unwrap_err();
        assert!(equal.to_string().contains("BRENIN_REPLY_TIMEOUT_SECS"));

        // 10 s completion plus 5 s info leaves no room at 15 s
        assert!(Config::from_lookup(lookup(&[("BRENIN_REPLY_TIMEOUT_SECS", "15")])).is_err());

        let config = Config::from_lookup(lookup(&[
            ("BRENIN_COMPLETION_TIMEOUT_SECS", "1"),
            ("BRENIN_INFO_TIMEOUT_SECS", "1"),
            ("BRENIN_REPLY_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.reply_timeout, Duration::from_secs(3));
    }
}
