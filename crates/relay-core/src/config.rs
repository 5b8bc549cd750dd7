use std::{env, fs, path::Path, time::Duration};

use crate::{
    domain::ChatId, errors::Error, messaging::throttled::ThrottleConfig,
    registry::DEFAULT_CAPACITY, Result,
};

/// Typed configuration, read once at startup and immutable afterwards.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub bot_token: String,
    pub admin_group_id: ChatId,

    // Correlation registry
    pub registry_capacity: usize,
    pub registry_ttl: Option<Duration>,

    // Presentation
    pub reply_header: String,

    // Outbound flood control
    pub throttle: ThrottleConfig,
}

impl Config {
    /// Load from the process environment, after merging a local `.env` if present.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Required env vars
        let bot_token = get("BOT_TOKEN").unwrap_or_default().trim().to_string();
        if bot_token.is_empty() {
            return Err(Error::Config(
                "BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let raw_admin = get("ADMIN_GROUP_ID").unwrap_or_default();
        if raw_admin.trim().is_empty() {
            return Err(Error::Config(
                "ADMIN_GROUP_ID environment variable is required".to_string(),
            ));
        }
        let admin_group_id = match raw_admin.trim().parse::<i64>() {
            Ok(0) | Err(_) => {
                return Err(Error::Config(format!(
                    "ADMIN_GROUP_ID must be a non-zero chat id, got {raw_admin:?}"
                )))
            }
            Ok(id) => ChatId(id),
        };

        let registry_capacity = parse_usize(get("RELAY_REGISTRY_CAPACITY"))
            .unwrap_or(DEFAULT_CAPACITY)
            .max(1);
        let registry_ttl = parse_u64(get("RELAY_REGISTRY_TTL_SECS"))
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs);

        let reply_header = get("RELAY_REPLY_HEADER")
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        let defaults = ThrottleConfig::default();
        let throttle = ThrottleConfig {
            global_min_interval: parse_u64(get("RELAY_THROTTLE_GLOBAL_MS"))
                .map(Duration::from_millis)
                .unwrap_or(defaults.global_min_interval),
            per_chat_min_interval: parse_u64(get("RELAY_THROTTLE_PER_CHAT_MS"))
                .map(Duration::from_millis)
                .unwrap_or(defaults.per_chat_min_interval),
        };

        Ok(Self {
            bot_token,
            admin_group_id,
            registry_capacity,
            registry_ttl,
            reply_header,
            throttle,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_u64(v: Option<String>) -> Option<u64> {
    v.and_then(|s| s.trim().parse::<u64>().ok())
}

fn parse_usize(v: Option<String>) -> Option<usize> {
    v.and_then(|s| s.trim().parse::<usize>().ok())
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
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn loads_required_and_defaults() {
        let cfg =
            Config::from_lookup(lookup(&[("BOT_TOKEN", "123:abc"), ("ADMIN_GROUP_ID", "-1001")]))
                .unwrap();
        assert_eq!(cfg.bot_token, "123:abc");
        assert_eq!(cfg.admin_group_id, ChatId(-1001));
        assert_eq!(cfg.registry_capacity, DEFAULT_CAPACITY);
        assert_eq!(cfg.registry_ttl, None);
        assert_eq!(cfg.reply_header, "");
        assert_eq!(cfg.throttle, ThrottleConfig::default());
    }

    #[test]
    fn missing_token_is_config_error() {
        let err = Config::from_lookup(lookup(&[("ADMIN_GROUP_ID", "-1")])).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("BOT_TOKEN")));

        let err =
            Config::from_lookup(lookup(&[("BOT_TOKEN", "  "), ("ADMIN_GROUP_ID", "-1")]))
                .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn missing_or_invalid_admin_group_is_config_error() {
        let err = Config::from_lookup(lookup(&[("BOT_TOKEN", "t")])).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("ADMIN_GROUP_ID")));

        for bad in ["abc", "0", "1.5"] {
            let err = Config::from_lookup(lookup(&[("BOT_TOKEN", "t"), ("ADMIN_GROUP_ID", bad)]))
                .unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{bad} should be rejected");
        }
    }

    #[test]
    fn optional_settings_are_parsed() {
        let cfg = Config::from_lookup(lookup(&[
            ("BOT_TOKEN", "t"),
            ("ADMIN_GROUP_ID", "-5"),
            ("RELAY_REGISTRY_CAPACITY", "0"),
            ("RELAY_REGISTRY_TTL_SECS", "3600"),
            ("RELAY_REPLY_HEADER", " 💬 Admin reply: "),
            ("RELAY_THROTTLE_GLOBAL_MS", "0"),
            ("RELAY_THROTTLE_PER_CHAT_MS", "500"),
        ]))
        .unwrap();
        assert_eq!(cfg.registry_capacity, 1);
        assert_eq!(cfg.registry_ttl, Some(Duration::from_secs(3600)));
        assert_eq!(cfg.reply_header, "💬 Admin reply:");
        assert_eq!(cfg.throttle.global_min_interval, Duration::ZERO);
        assert_eq!(cfg.throttle.per_chat_min_interval, Duration::from_millis(500));
    }

    #[test]
    fn zero_ttl_disables_expiry() {
        let cfg = Config::from_lookup(lookup(&[
            ("BOT_TOKEN", "t"),
            ("ADMIN_GROUP_ID", "-5"),
            ("RELAY_REGISTRY_TTL_SECS", "0"),
        ]))
        .unwrap();
        assert_eq!(cfg.registry_ttl, None);
    }

    #[test]
    fn dotenv_parsing_skips_comments_and_strips_quotes() {
        let parsed = parse_dotenv(
            "# comment\n\nBOT_TOKEN=\"abc\"\nADMIN_GROUP_ID = '-42'\nnot a pair\n=novalue\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("BOT_TOKEN".to_string(), "abc".to_string()),
                ("ADMIN_GROUP_ID".to_string(), "-42".to_string()),
            ]
        );
    }
}
