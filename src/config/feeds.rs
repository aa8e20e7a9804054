// src/config/feeds.rs
//! Feed-source list for the RSS loop. Supports TOML or JSON files with an
//! env-var path override; a built-in curated list is the last fallback.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "INTEL_FEEDS_PATH";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedSource {
    pub url: String,
    pub label: String,
}

/// Curated defaults used when no feeds file is present.
pub fn builtin_feeds() -> Vec<FeedSource> {
    let mk = |url: &str, label: &str| FeedSource {
        url: url.to_string(),
        label: label.to_string(),
    };
    vec![
        mk("https://gcaptain.com/feed/", "gCaptain"),
        mk("https://oilprice.com/rss/main", "OilPrice"),
        mk("https://www.defenseone.com/rss/all/", "DefenseOne"),
    ]
}

/// Load feed sources from an explicit path. Supports TOML or JSON formats.
pub fn load_feeds_from(path: &Path) -> Result<Vec<FeedSource>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading feeds from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_feeds(&content, ext.as_str())
}

/// Load feed sources using env var + fallbacks:
/// 1) $INTEL_FEEDS_PATH
/// 2) config/feeds.toml
/// 3) config/feeds.json
/// 4) the built-in curated list
pub fn load_feeds_default() -> Result<Vec<FeedSource>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_feeds_from(&pb);
        }
        return Err(anyhow!("INTEL_FEEDS_PATH points to non-existent path"));
    }
    let toml_p = PathBuf::from("config/feeds.toml");
    if toml_p.exists() {
        return load_feeds_from(&toml_p);
    }
    let json_p = PathBuf::from("config/feeds.json");
    if json_p.exists() {
        return load_feeds_from(&json_p);
    }
    Ok(builtin_feeds())
}

fn parse_feeds(s: &str, hint_ext: &str) -> Result<Vec<FeedSource>> {
    let try_toml = hint_ext == "toml" || s.contains("[[feeds]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported feeds format"))
}

fn parse_toml(s: &str) -> Result<Vec<FeedSource>> {
    #[derive(Deserialize)]
    struct TomlFeeds {
        feeds: Vec<FeedSource>,
    }
    let v: TomlFeeds = toml::from_str(s)?;
    Ok(clean_list(v.feeds))
}

fn parse_json(s: &str) -> Result<Vec<FeedSource>> {
    let v: Vec<FeedSource> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

fn clean_list(items: Vec<FeedSource>) -> Vec<FeedSource> {
    let mut out: Vec<FeedSource> = Vec::new();
    for mut it in items {
        it.url = it.url.trim().to_string();
        it.label = it.label.trim().to_string();
        if it.url.is_empty() || it.label.is_empty() {
            continue;
        }
        if !out.iter().any(|f| f.url == it.url) {
            out.push(it);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn toml_and_json_formats_parse_with_dedup_and_trim() {
        let toml = r#"
[[feeds]]
url = " https://gcaptain.com/feed/ "
label = "gCaptain"

[[feeds]]
url = "https://gcaptain.com/feed/"
label = "Duplicate"

[[feeds]]
url = ""
label = "Empty"
"#;
        let out = parse_toml(toml).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "gCaptain");

        let json = r#"[{"url": "https://oilprice.com/rss/main", "label": " OilPrice "}]"#;
        let out = parse_json(json).unwrap();
        assert_eq!(out[0].label, "OilPrice");
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_PATH);

        // No files in the temp CWD -> built-in list.
        let v = load_feeds_default().unwrap();
        assert_eq!(v, builtin_feeds());

        // Env path wins.
        let p_json = tmp.path().join("feeds.json");
        std::fs::write(&p_json, r#"[{"url": "https://x.example/rss", "label": "X"}]"#).unwrap();
        env::set_var(ENV_PATH, p_json.display().to_string());
        let v2 = load_feeds_default().unwrap();
        assert_eq!(v2.len(), 1);
        assert_eq!(v2[0].label, "X");
        env::remove_var(ENV_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
