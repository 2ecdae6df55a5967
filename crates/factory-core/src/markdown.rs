//! Markdown PRD importer.
//!
//! A single pass over the document: every heading opens a section, the
//! heading text is resolved through [`HEADING_SYNONYMS`], and the lines up to
//! the next heading become that section's content. Unknown headings discard
//! their content.

use std::collections::BTreeMap;

use crate::completion::REQUIRED_SECTIONS;
use crate::prd::{PrdFields, PrdSection};
use crate::PrdType;

/// Normalized heading text accepted for each section.
pub const HEADING_SYNONYMS: &[(PrdSection, &[&str])] = &[
    (PrdSection::Title, &["title", "project title", "prd title"]),
    (
        PrdSection::Description,
        &["description", "project overview", "overview"],
    ),
    (
        PrdSection::ProblemStatement,
        &["problem statement", "problem", "problem definition"],
    ),
    (
        PrdSection::TargetUsers,
        &["target users", "users", "audience", "user base"],
    ),
    (
        PrdSection::UserStories,
        &["user stories", "stories", "user story"],
    ),
    (
        PrdSection::Requirements,
        &[
            "requirements",
            "functional requirements",
            "feature requirements",
            "specifications",
        ],
    ),
    (
        PrdSection::AcceptanceCriteria,
        &["acceptance criteria", "criteria", "acceptance"],
    ),
    (
        PrdSection::TechnicalRequirements,
        &[
            "technical requirements",
            "technical specs",
            "technical specifications",
            "technical details",
        ],
    ),
    (
        PrdSection::SuccessMetrics,
        &["success metrics", "metrics", "kpis", "key performance indicators"],
    ),
    (
        PrdSection::Timeline,
        &["timeline", "schedule", "deadline", "delivery"],
    ),
    (
        PrdSection::PerformanceRequirements,
        &["performance requirements", "performance"],
    ),
    (
        PrdSection::SecurityRequirements,
        &["security requirements", "security"],
    ),
    (
        PrdSection::IntegrationRequirements,
        &["integration requirements", "integration"],
    ),
    (
        PrdSection::DeploymentRequirements,
        &["deployment requirements", "deployment"],
    ),
    (PrdSection::Dependencies, &["dependencies", "deps"]),
    (PrdSection::Risks, &["risks", "risk"]),
    (PrdSection::Assumptions, &["assumptions", "assumption"]),
];

const PLATFORM_INDICATORS: &[&str] = &[
    "platform",
    "infrastructure",
    "architecture",
    "system",
    "deployment",
    "scalability",
    "monitoring",
    "operational",
];

const AGENT_INDICATORS: &[&str] = &[
    "ai agent",
    "agent",
    "artificial intelligence",
    "machine learning",
    "automation",
    "chatbot",
    "assistant",
    "intelligent",
];

const MAX_FALLBACK_TITLE_CHARS: usize = 100;
const MAX_FALLBACK_DESCRIPTION_LINES: usize = 3;

/// Heading text with `#` markers and emphasis removed, original case kept.
fn heading_text(line: &str) -> String {
    line.trim_start_matches('#')
        .replace('*', "")
        .trim()
        .trim_end_matches(':')
        .trim()
        .to_string()
}

fn is_heading(line: &str) -> bool {
    line.starts_with('#')
}

fn is_rule(line: &str) -> bool {
    line.starts_with("---")
}

/// Map a heading to its section, if the heading is a known synonym.
pub fn resolve_heading(heading: &str) -> Option<PrdSection> {
    let key = heading_text(heading).to_lowercase();
    HEADING_SYNONYMS
        .iter()
        .find(|(_, synonyms)| synonyms.contains(&key.as_str()))
        .map(|(section, _)| *section)
}

/// Strip one leading bullet, number or checkbox marker, plus bold markers.
pub fn strip_list_marker(line: &str) -> String {
    let mut rest = line.trim();

    for bullet in ['-', '*', '•', '+'] {
        if let Some(after) = rest.strip_prefix(bullet) {
            if after.is_empty() || after.starts_with(char::is_whitespace) {
                rest = after.trim_start();
                break;
            }
        }
    }

    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let after = &rest[digits..];
        if let Some(after) = after.strip_prefix('.').or_else(|| after.strip_prefix(')')) {
            rest = after.trim_start();
        }
    }

    for checkbox in ["[ ]", "[x]", "[X]"] {
        if let Some(after) = rest.strip_prefix(checkbox) {
            rest = after.trim_start();
            break;
        }
    }

    rest.replace("**", "").trim().to_string()
}

/// Parse list lines into items, dropping empties and horizontal rules.
pub fn list_items(lines: &[&str]) -> Vec<String> {
    lines
        .iter()
        .filter(|line| !is_rule(line.trim()))
        .map(|line| strip_list_marker(line))
        .filter(|item| !item.is_empty())
        .collect()
}

/// Parse `key: value` lines. Lines without a colon are kept under `notes`.
pub fn key_values(lines: &[&str]) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    let mut notes = Vec::new();

    for line in lines.iter().filter(|line| !is_rule(line.trim())) {
        let item = strip_list_marker(line);
        if item.is_empty() {
            continue;
        }
        match line.split_once(':') {
            Some((key, value)) => {
                let key = strip_list_marker(key)
                    .replace('*', "")
                    .trim()
                    .to_lowercase()
                    .replace(' ', "_");
                if key.is_empty() {
                    notes.push(item);
                } else {
                    map.insert(key, value.trim().replace("**", "").trim().to_string());
                }
            }
            None => notes.push(item),
        }
    }

    if !notes.is_empty() {
        map.insert("notes".to_string(), notes.join("; "));
    }
    map
}

/// Guess whether a document describes a platform change or an agent.
///
/// The filename decides when it names either kind. Otherwise indicator words
/// are counted and platform wins only with a strictly higher score.
pub fn detect_prd_type(content: &str, filename: Option<&str>) -> PrdType {
    if let Some(name) = filename {
        let name = name.to_lowercase();
        if name.contains("platform") {
            return PrdType::Platform;
        }
        if name.contains("agent") {
            return PrdType::Agent;
        }
    }

    let lower = content.to_lowercase();
    let score = |indicators: &[&str]| indicators.iter().filter(|i| lower.contains(*i)).count();
    if score(PLATFORM_INDICATORS) > score(AGENT_INDICATORS) {
        PrdType::Platform
    } else {
        PrdType::Agent
    }
}

/// Parse a markdown document into PRD fields. No placeholders are added.
pub fn parse_markdown(content: &str, filename: Option<&str>) -> PrdFields {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut fields = PrdFields {
        prd_type: detect_prd_type(content, filename),
        original_filename: filename.map(String::from),
        file_content: Some(content.to_string()),
        ..Default::default()
    };

    let mut current: Option<PrdSection> = None;
    let mut buffer: Vec<&str> = Vec::new();
    for &line in &lines {
        if is_heading(line) {
            if let Some(section) = current {
                if !buffer.is_empty() {
                    fields.set_section_lines(section, &buffer);
                }
            }
            current = resolve_heading(line);
            buffer.clear();
        } else if current.is_some() && !is_rule(line) {
            buffer.push(line);
        }
    }
    if let (Some(section), false) = (current, buffer.is_empty()) {
        fields.set_section_lines(section, &buffer);
    }

    if fields.title.is_empty() {
        fields.title = fallback_title(&lines).unwrap_or_default();
    }
    if fields.description.is_empty() {
        fields.description = fallback_description(&lines);
    }
    fields
}

/// First H1 that is not a section heading, else the first body line.
fn fallback_title(lines: &[&str]) -> Option<String> {
    let h1 = lines
        .iter()
        .filter(|line| line.starts_with("# "))
        .filter(|line| resolve_heading(line).is_none())
        .map(|line| heading_text(line))
        .find(|text| text.chars().count() > 3);
    if h1.is_some() {
        return h1;
    }

    lines
        .iter()
        .find(|line| !is_heading(line) && !is_rule(line))
        .map(|line| line.chars().take(MAX_FALLBACK_TITLE_CHARS).collect())
}

/// Up to three body lines appearing before the second heading.
fn fallback_description(lines: &[&str]) -> String {
    let mut seen_heading = false;
    let mut collected = Vec::new();
    for line in lines {
        if is_heading(line) {
            if seen_heading {
                break;
            }
            seen_heading = true;
            continue;
        }
        if is_rule(line) {
            continue;
        }
        collected.push(*line);
        if collected.len() >= MAX_FALLBACK_DESCRIPTION_LINES {
            break;
        }
    }
    collected.join(" ")
}

/// Placeholder value for a required section.
pub fn placeholder_for(section: PrdSection) -> &'static str {
    match section {
        PrdSection::Title => "Untitled PRD",
        PrdSection::Description => "Description to be completed",
        PrdSection::ProblemStatement => "Problem statement to be completed",
        PrdSection::TargetUsers => "Target users to be defined",
        PrdSection::UserStories => "User stories to be completed",
        PrdSection::Requirements => "Requirements to be completed",
        PrdSection::AcceptanceCriteria => "Acceptance criteria to be completed",
        PrdSection::TechnicalRequirements => "Technical requirements to be completed",
        PrdSection::SuccessMetrics => "Success metrics to be completed",
        PrdSection::Timeline => "Timeline to be completed",
        _ => "To be completed",
    }
}

/// Fill every empty required section with its placeholder.
///
/// Returns the sections that were filled, in canonical order.
pub fn fill_placeholders(fields: &mut PrdFields) -> Vec<PrdSection> {
    let mut filled = Vec::new();
    for &section in REQUIRED_SECTIONS {
        if fields.section(section).is_empty() {
            fields.set_section_lines(section, &[placeholder_for(section)]);
            filled.push(section);
        }
    }
    filled
}

/// Parse a document and fill placeholders in one step.
pub fn import_markdown(content: &str, filename: Option<&str>) -> (PrdFields, Vec<PrdSection>) {
    let mut fields = parse_markdown(content, filename);
    let filled = fill_placeholders(&mut fields);
    (fields, filled)
}
