//! Input validation and normalization for PRDs, agents and uploads.
//!
//! Validators take `&mut` so they can trim and clean values in place while
//! checking them.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::agent::{AgentRegistration, AgentUpdate};
use crate::prd::PrdFields;
use crate::CoreError;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 10_000;
pub const MAX_REQUIREMENT_CHARS: usize = 500;
pub const MAX_REQUIREMENTS: usize = 50;
pub const MAX_CAPABILITY_CHARS: usize = 200;
pub const MAX_CAPABILITIES: usize = 20;
pub const MAX_AGENT_NAME_CHARS: usize = 100;
pub const MAX_UPLOAD_BYTES: usize = 1024 * 1024;

const TITLE_FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

fn semver_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?$")
            .expect("Invalid semver pattern")
    })
}

/// Trim, strip forbidden characters and bound the length of a title.
pub fn clean_title(title: &str) -> Result<String, CoreError> {
    let cleaned: String = title
        .trim()
        .chars()
        .filter(|c| !TITLE_FORBIDDEN.contains(c))
        .collect();
    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() {
        return Err(CoreError::invalid("Title cannot be empty"));
    }
    if cleaned.chars().count() > MAX_TITLE_CHARS {
        return Err(CoreError::invalid(format!(
            "Title too long (max {MAX_TITLE_CHARS} characters)"
        )));
    }
    Ok(cleaned)
}

pub fn clean_description(description: &str) -> Result<String, CoreError> {
    let cleaned = description.trim();
    if cleaned.is_empty() {
        return Err(CoreError::invalid("Description cannot be empty"));
    }
    if cleaned.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(CoreError::invalid(format!(
            "Description too long (max {MAX_DESCRIPTION_CHARS} characters)"
        )));
    }
    Ok(cleaned.to_string())
}

/// Trim every item, drop empties, and enforce per-item and count limits.
fn clean_items(
    items: &[String],
    what: &str,
    max_chars: usize,
    max_items: usize,
) -> Result<Vec<String>, CoreError> {
    let cleaned: Vec<String> = items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect();
    if let Some(long) = cleaned.iter().find(|item| item.chars().count() > max_chars) {
        let preview: String = long.chars().take(50).collect();
        return Err(CoreError::invalid(format!(
            "{what} too long (max {max_chars} characters): {preview}..."
        )));
    }
    if cleaned.len() > max_items {
        return Err(CoreError::invalid(format!(
            "Too many {} (max {max_items})",
            what.to_lowercase()
        )));
    }
    Ok(cleaned)
}

pub fn clean_requirements(requirements: &[String]) -> Result<Vec<String>, CoreError> {
    clean_items(requirements, "Requirement", MAX_REQUIREMENT_CHARS, MAX_REQUIREMENTS)
}

pub fn clean_capabilities(capabilities: &[String]) -> Result<Vec<String>, CoreError> {
    clean_items(capabilities, "Capability", MAX_CAPABILITY_CHARS, MAX_CAPABILITIES)
}

fn check_score(name: &str, value: Option<u8>) -> Result<(), CoreError> {
    match value {
        Some(v) if !(1..=10).contains(&v) => Err(CoreError::invalid(format!(
            "{name} must be between 1 and 10"
        ))),
        _ => Ok(()),
    }
}

/// Normalize and check the author-supplied fields of a PRD.
pub fn validate_prd_fields(fields: &mut PrdFields) -> Result<(), CoreError> {
    fields.title = clean_title(&fields.title)?;
    fields.description = clean_description(&fields.description)?;
    fields.requirements = clean_requirements(&fields.requirements)?;
    check_score("business_value", fields.business_value)?;
    check_score("technical_complexity", fields.technical_complexity)?;
    if let Some(category) = &fields.category {
        let category = category.trim();
        fields.category = (!category.is_empty()).then(|| category.to_string());
    }
    if let Some(name) = &fields.original_filename {
        fields.original_filename = Some(sanitize_filename(name));
    }
    Ok(())
}

/// Require an `http`/`https` URL with a host.
pub fn validate_url(raw: &str) -> Result<String, CoreError> {
    let trimmed = raw.trim();
    let parsed =
        Url::parse(trimmed).map_err(|e| CoreError::invalid(format!("Invalid URL '{trimmed}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CoreError::invalid(format!(
            "Invalid URL '{trimmed}': scheme must be http or https"
        )));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(CoreError::invalid(format!("Invalid URL '{trimmed}': missing host")));
    }
    Ok(trimmed.to_string())
}

fn validate_opt_url(url: &mut Option<String>) -> Result<(), CoreError> {
    if let Some(raw) = url.as_deref() {
        *url = Some(validate_url(raw)?);
    }
    Ok(())
}

pub fn validate_version(version: &str) -> Result<String, CoreError> {
    let trimmed = version.trim();
    if !semver_regex().is_match(trimmed) {
        return Err(CoreError::invalid(format!(
            "Invalid version '{trimmed}': expected semantic version like 1.2.3"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn clean_agent_name(name: &str) -> Result<String, CoreError> {
    let cleaned = name.trim();
    if cleaned.is_empty() {
        return Err(CoreError::invalid("Agent name cannot be empty"));
    }
    if cleaned.chars().count() > MAX_AGENT_NAME_CHARS {
        return Err(CoreError::invalid(format!(
            "Agent name too long (max {MAX_AGENT_NAME_CHARS} characters)"
        )));
    }
    Ok(cleaned.to_string())
}

pub fn validate_agent_registration(reg: &mut AgentRegistration) -> Result<(), CoreError> {
    reg.name = clean_agent_name(&reg.name)?;
    reg.description = reg.description.trim().to_string();
    reg.purpose = reg.purpose.trim().to_string();
    reg.version = validate_version(&reg.version)?;
    reg.capabilities = clean_capabilities(&reg.capabilities)?;
    validate_opt_url(&mut reg.repository_url)?;
    validate_opt_url(&mut reg.deployment_url)?;
    validate_opt_url(&mut reg.health_check_url)?;
    Ok(())
}

pub fn validate_agent_update(update: &mut AgentUpdate) -> Result<(), CoreError> {
    if let Some(name) = update.name.as_deref() {
        update.name = Some(clean_agent_name(name)?);
    }
    if let Some(version) = update.version.as_deref() {
        update.version = Some(validate_version(version)?);
    }
    if let Some(capabilities) = update.capabilities.as_deref() {
        update.capabilities = Some(clean_capabilities(capabilities)?);
    }
    validate_opt_url(&mut update.repository_url)?;
    validate_opt_url(&mut update.deployment_url)?;
    validate_opt_url(&mut update.health_check_url)?;
    Ok(())
}

/// Keep only the final path component of a client-supplied filename.
pub fn sanitize_filename(name: &str) -> String {
    name.rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// A checked markdown upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub filename: String,
    pub content: String,
}

/// Check an uploaded PRD file and decode it as UTF-8.
pub fn validate_upload(filename: &str, bytes: &[u8]) -> Result<Upload, CoreError> {
    let filename = sanitize_filename(filename);
    let lower = filename.to_lowercase();
    if !(lower.ends_with(".md") || lower.ends_with(".txt")) {
        return Err(CoreError::invalid("Only .md and .txt files are supported"));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(CoreError::PayloadTooLarge(format!(
            "File too large (max {MAX_UPLOAD_BYTES} bytes)"
        )));
    }
    let content = std::str::from_utf8(bytes)
        .map_err(|_| CoreError::invalid("File must be valid UTF-8 text"))?;
    if content.trim().is_empty() {
        return Err(CoreError::invalid("File is empty"));
    }
    Ok(Upload {
        filename,
        content: content.to_string(),
    })
}
