// src/compiler/project.rs

use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde::Deserialize;

/// The project file as read from TOML.
///
/// ```toml
/// base_locale = "en"
/// locales = ["en", "de", "de-DE"]
/// message_path = "messages/{locale}.json"
/// ```
///
/// `message_path` is resolved relative to the project file's directory, with
/// `{locale}` substituted per locale.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectFile {
    pub base_locale: String,

    pub locales: Vec<String>,

    #[serde(default = "default_message_path")]
    pub message_path: String,
}

fn default_message_path() -> String {
    "messages/{locale}.json".to_string()
}

fn locale_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // language, optional script, optional region: en, de-DE, zh-Hans-CN
        Regex::new(r"^[a-z]{2,3}(-[A-Z][a-z]{3})?(-([A-Z]{2}|[0-9]{3}))?$")
            .expect("locale tag regex is valid")
    })
}

/// Parse and validate a project file.
pub fn parse_project(text: &str) -> Result<ProjectFile> {
    let project: ProjectFile = toml::from_str(text).context("parsing project file TOML")?;
    validate_project(&project)?;
    Ok(project)
}

fn validate_project(project: &ProjectFile) -> Result<()> {
    if project.locales.is_empty() {
        return Err(anyhow!("project must declare at least one locale"));
    }
    for locale in &project.locales {
        if !locale_tag_re().is_match(locale) {
            return Err(anyhow!("invalid locale tag: '{locale}'"));
        }
    }
    if !project.locales.contains(&project.base_locale) {
        return Err(anyhow!(
            "base_locale '{}' is not in the locales list",
            project.base_locale
        ));
    }
    if !project.message_path.contains("{locale}") {
        return Err(anyhow!(
            "message_path must contain the '{{locale}}' placeholder (got '{}')",
            project.message_path
        ));
    }
    Ok(())
}
