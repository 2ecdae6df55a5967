//! Markdown export and name helpers.

use std::fmt::Write;

use crate::prd::{Prd, PrdSection, SectionRef};

/// Sections exported after the description and requirements, in order.
const EXPORTED_SECTIONS: &[PrdSection] = &[
    PrdSection::ProblemStatement,
    PrdSection::TargetUsers,
    PrdSection::UserStories,
    PrdSection::AcceptanceCriteria,
    PrdSection::TechnicalRequirements,
    PrdSection::PerformanceRequirements,
    PrdSection::SecurityRequirements,
    PrdSection::IntegrationRequirements,
    PrdSection::DeploymentRequirements,
    PrdSection::SuccessMetrics,
    PrdSection::Timeline,
    PrdSection::Dependencies,
    PrdSection::Risks,
    PrdSection::Assumptions,
];

const FOOTER: &str = "*Generated by AI Agent Factory*";

/// Lowercase, dash-separated form of a name for repositories and paths.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_whitespace() || c == '-' {
            pending_dash = true;
        } else if c.is_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        }
    }
    slug
}

/// `ready_for_devin` -> `Ready For Devin`.
fn title_case(value: &str) -> String {
    value
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Download filename for an exported PRD.
pub fn export_filename(prd: &Prd) -> String {
    format!(
        "PRD_{}_{}.md",
        prd.fields.title.replace(' ', "_"),
        prd.id.short(8)
    )
}

/// Render a PRD as a standardized markdown document.
pub fn export_markdown(prd: &Prd) -> String {
    let f = &prd.fields;
    let mut out = String::new();

    // Writing into a String cannot fail.
    writeln!(out, "# Product Requirements Document (PRD)").ok();
    writeln!(out, "## {}", f.title).ok();
    writeln!(out).ok();
    writeln!(out, "---").ok();
    writeln!(out).ok();
    writeln!(out, "### Document Information").ok();
    writeln!(out, "- **PRD ID**: `{}`", prd.id).ok();
    writeln!(out, "- **Status**: {}", title_case(prd.status.as_str())).ok();
    writeln!(out, "- **Type**: {}", title_case(f.prd_type.as_str())).ok();
    writeln!(
        out,
        "- **Created**: {}",
        prd.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
    .ok();
    writeln!(
        out,
        "- **Last Updated**: {}",
        prd.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
    .ok();
    if let Some(url) = &prd.github_repo_url {
        writeln!(out, "- **Repository**: {url}").ok();
    }
    writeln!(out).ok();
    writeln!(out, "---").ok();
    writeln!(out).ok();

    writeln!(out, "## Description").ok();
    writeln!(out, "{}", f.description).ok();
    writeln!(out).ok();

    writeln!(out, "## Requirements").ok();
    for (i, requirement) in f.requirements.iter().enumerate() {
        writeln!(out, "{}. {}", i + 1, requirement).ok();
    }
    writeln!(out).ok();

    for &section in EXPORTED_SECTIONS {
        let content = f.section(section);
        if content.is_empty() {
            continue;
        }
        writeln!(out, "## {}", section.label()).ok();
        match content {
            SectionRef::Text(text) => {
                writeln!(out, "{text}").ok();
            }
            SectionRef::List(items) => {
                for item in items {
                    writeln!(out, "- {item}").ok();
                }
            }
            SectionRef::Map(map) => {
                for (key, value) in map {
                    writeln!(out, "- **{}**: {}", title_case(key), value).ok();
                }
            }
            SectionRef::Empty => {}
        }
        writeln!(out).ok();
    }

    writeln!(out, "---").ok();
    writeln!(out).ok();
    out.push_str(FOOTER);
    out
}
