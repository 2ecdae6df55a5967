//! PRD (Product Requirements Document) types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::markdown::{key_values, list_items};
use crate::validation::validate_prd_fields;
use crate::{CoreError, PrdEffort, PrdId, PrdPriority, PrdStatus, PrdType};

/// How the content of a section is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Text,
    List,
    Map,
}

/// A named content section of a PRD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrdSection {
    Title,
    Description,
    ProblemStatement,
    TargetUsers,
    UserStories,
    Requirements,
    AcceptanceCriteria,
    TechnicalRequirements,
    PerformanceRequirements,
    SecurityRequirements,
    IntegrationRequirements,
    DeploymentRequirements,
    SuccessMetrics,
    Timeline,
    Dependencies,
    Risks,
    Assumptions,
}

impl PrdSection {
    pub const ALL: &'static [PrdSection] = &[
        PrdSection::Title,
        PrdSection::Description,
        PrdSection::ProblemStatement,
        PrdSection::TargetUsers,
        PrdSection::UserStories,
        PrdSection::Requirements,
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

    /// Field name on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::ProblemStatement => "problem_statement",
            Self::TargetUsers => "target_users",
            Self::UserStories => "user_stories",
            Self::Requirements => "requirements",
            Self::AcceptanceCriteria => "acceptance_criteria",
            Self::TechnicalRequirements => "technical_requirements",
            Self::PerformanceRequirements => "performance_requirements",
            Self::SecurityRequirements => "security_requirements",
            Self::IntegrationRequirements => "integration_requirements",
            Self::DeploymentRequirements => "deployment_requirements",
            Self::SuccessMetrics => "success_metrics",
            Self::Timeline => "timeline",
            Self::Dependencies => "dependencies",
            Self::Risks => "risks",
            Self::Assumptions => "assumptions",
        }
    }

    /// Human readable heading.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Description => "Description",
            Self::ProblemStatement => "Problem Statement",
            Self::TargetUsers => "Target Users",
            Self::UserStories => "User Stories",
            Self::Requirements => "Requirements",
            Self::AcceptanceCriteria => "Acceptance Criteria",
            Self::TechnicalRequirements => "Technical Requirements",
            Self::PerformanceRequirements => "Performance Requirements",
            Self::SecurityRequirements => "Security Requirements",
            Self::IntegrationRequirements => "Integration Requirements",
            Self::DeploymentRequirements => "Deployment Requirements",
            Self::SuccessMetrics => "Success Metrics",
            Self::Timeline => "Timeline",
            Self::Dependencies => "Dependencies",
            Self::Risks => "Risks",
            Self::Assumptions => "Assumptions",
        }
    }

    pub fn kind(&self) -> SectionKind {
        match self {
            Self::Title | Self::Description | Self::ProblemStatement | Self::Timeline => {
                SectionKind::Text
            }
            Self::PerformanceRequirements => SectionKind::Map,
            _ => SectionKind::List,
        }
    }
}

impl fmt::Display for PrdSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrdSection {
    type Err = CoreError;

    /// Accepts both `problem_statement` and `Problem Statement` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        Self::ALL
            .iter()
            .copied()
            .find(|section| section.as_str() == normalized)
            .ok_or_else(|| CoreError::UnknownVariant {
                kind: "PRD section",
                value: s.trim().to_string(),
            })
    }
}

/// Borrowed view of one section's content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SectionRef<'a> {
    Text(&'a str),
    List(&'a [String]),
    Map(&'a BTreeMap<String, String>),
    Empty,
}

impl SectionRef<'_> {
    pub fn is_empty(&self) -> bool {
        match self {
            SectionRef::Text(s) => s.trim().is_empty(),
            SectionRef::List(items) => items.is_empty(),
            SectionRef::Map(map) => map.is_empty(),
            SectionRef::Empty => true,
        }
    }
}

/// Author-supplied PRD content. Used as the create payload and embedded in [`Prd`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrdFields {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub requirements: Vec<String>,

    #[serde(default)]
    pub prd_type: PrdType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_statement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_users: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_stories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_requirements: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_requirements: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_requirements: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_requirements: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_requirements: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_metrics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risks: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assumptions: Option<Vec<String>>,

    // Roadmap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<PrdPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effort_estimate: Option<PrdEffort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_value: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_complexity: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies_list: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_sprint: Option<String>,

    // Upload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_content: Option<String>,
}

fn opt_list(list: &Option<Vec<String>>) -> SectionRef<'_> {
    match list {
        Some(items) => SectionRef::List(items),
        None => SectionRef::Empty,
    }
}

fn non_empty(items: Vec<String>) -> Option<Vec<String>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

impl PrdFields {
    /// Minimal fields for a new PRD.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    /// Builder method to set requirements.
    pub fn with_requirements<I, S>(mut self, requirements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirements = requirements.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to set the PRD type.
    pub fn with_type(mut self, prd_type: PrdType) -> Self {
        self.prd_type = prd_type;
        self
    }

    /// View a section's current content.
    pub fn section(&self, section: PrdSection) -> SectionRef<'_> {
        match section {
            PrdSection::Title => SectionRef::Text(&self.title),
            PrdSection::Description => SectionRef::Text(&self.description),
            PrdSection::Requirements => SectionRef::List(&self.requirements),
            PrdSection::ProblemStatement => self
                .problem_statement
                .as_deref()
                .map_or(SectionRef::Empty, SectionRef::Text),
            PrdSection::Timeline => self
                .timeline
                .as_deref()
                .map_or(SectionRef::Empty, SectionRef::Text),
            PrdSection::PerformanceRequirements => self
                .performance_requirements
                .as_ref()
                .map_or(SectionRef::Empty, SectionRef::Map),
            PrdSection::TargetUsers => opt_list(&self.target_users),
            PrdSection::UserStories => opt_list(&self.user_stories),
            PrdSection::AcceptanceCriteria => opt_list(&self.acceptance_criteria),
            PrdSection::TechnicalRequirements => opt_list(&self.technical_requirements),
            PrdSection::SecurityRequirements => opt_list(&self.security_requirements),
            PrdSection::IntegrationRequirements => opt_list(&self.integration_requirements),
            PrdSection::DeploymentRequirements => opt_list(&self.deployment_requirements),
            PrdSection::SuccessMetrics => opt_list(&self.success_metrics),
            PrdSection::Dependencies => opt_list(&self.dependencies),
            PrdSection::Risks => opt_list(&self.risks),
            PrdSection::Assumptions => opt_list(&self.assumptions),
        }
    }

    /// Replace a section with content parsed from trimmed, non-empty lines.
    ///
    /// Text sections join lines with newlines (the title with spaces), list
    /// sections strip bullet markers, and the performance section is read as
    /// `key: value` pairs.
    pub fn set_section_lines(&mut self, section: PrdSection, lines: &[&str]) {
        let joined = |sep: &str| lines.join(sep).trim().to_string();
        let list_slot = match section {
            PrdSection::Title => {
                self.title = joined(" ");
                return;
            }
            PrdSection::Description => {
                self.description = joined("\n");
                return;
            }
            PrdSection::Requirements => {
                self.requirements = list_items(lines);
                return;
            }
            PrdSection::ProblemStatement => {
                self.problem_statement = Some(joined("\n")).filter(|s| !s.is_empty());
                return;
            }
            PrdSection::Timeline => {
                self.timeline = Some(joined("\n")).filter(|s| !s.is_empty());
                return;
            }
            PrdSection::PerformanceRequirements => {
                let map = key_values(lines);
                self.performance_requirements = if map.is_empty() { None } else { Some(map) };
                return;
            }
            PrdSection::TargetUsers => &mut self.target_users,
            PrdSection::UserStories => &mut self.user_stories,
            PrdSection::AcceptanceCriteria => &mut self.acceptance_criteria,
            PrdSection::TechnicalRequirements => &mut self.technical_requirements,
            PrdSection::SecurityRequirements => &mut self.security_requirements,
            PrdSection::IntegrationRequirements => &mut self.integration_requirements,
            PrdSection::DeploymentRequirements => &mut self.deployment_requirements,
            PrdSection::SuccessMetrics => &mut self.success_metrics,
            PrdSection::Dependencies => &mut self.dependencies,
            PrdSection::Risks => &mut self.risks,
            PrdSection::Assumptions => &mut self.assumptions,
        };
        *list_slot = non_empty(list_items(lines));
    }

    /// Replace a section from free text, one item or paragraph per line.
    pub fn set_section_text(&mut self, section: PrdSection, content: &str) {
        let lines: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        self.set_section_lines(section, &lines);
    }
}

/// A stored PRD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prd {
    pub id: PrdId,

    #[serde(flatten)]
    pub fields: PrdFields,

    pub status: PrdStatus,

    #[serde(default)]
    pub github_repo_url: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Prd {
    /// Validate the fields and create a new PRD in the `queue` status.
    pub fn new(mut fields: PrdFields) -> Result<Self, CoreError> {
        validate_prd_fields(&mut fields)?;
        let now = Utc::now();
        Ok(Self {
            id: PrdId::generate(),
            fields,
            status: PrdStatus::Queue,
            github_repo_url: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Builder method to set a specific ID (useful for testing).
    pub fn with_id(mut self, id: PrdId) -> Self {
        self.id = id;
        self
    }

    /// Move to `next` if the pipeline allows it.
    pub fn transition(&mut self, next: PrdStatus) -> Result<(), CoreError> {
        self.status = self.status.transition_to(next)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Apply a partial update. Nothing changes if validation or the status
    /// transition fails.
    pub fn apply_update(&mut self, update: PrdUpdate) -> Result<(), CoreError> {
        let next_status = match update.status {
            Some(status) => self.status.transition_to(status)?,
            None => self.status,
        };

        let mut fields = self.fields.clone();
        update.apply_to(&mut fields);
        validate_prd_fields(&mut fields)?;

        self.fields = fields;
        self.status = next_status;
        if let Some(url) = update.github_repo_url {
            self.github_repo_url = Some(url);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Replace one section and re-validate.
    pub fn answer_section(&mut self, section: PrdSection, content: &str) -> Result<(), CoreError> {
        let mut fields = self.fields.clone();
        fields.set_section_text(section, content);
        validate_prd_fields(&mut fields)?;
        self.fields = fields;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Partial update payload for a PRD.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrdUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prd_type: Option<PrdType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PrdStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_repo_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_statement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_users: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_stories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_requirements: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_requirements: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_requirements: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_requirements: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_requirements: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_metrics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risks: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assumptions: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<PrdPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effort_estimate: Option<PrdEffort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_value: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_complexity: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies_list: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_sprint: Option<String>,
}

impl PrdUpdate {
    /// Update that only changes the status.
    pub fn status(status: PrdStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    fn apply_to(&self, fields: &mut PrdFields) {
        macro_rules! set {
            ($($field:ident),+ $(,)?) => {
                $(if let Some(value) = &self.$field {
                    fields.$field = value.clone();
                })+
            };
        }
        macro_rules! set_opt {
            ($($field:ident),+ $(,)?) => {
                $(if let Some(value) = &self.$field {
                    fields.$field = Some(value.clone());
                })+
            };
        }

        set!(title, description, requirements, prd_type);
        set_opt!(
            problem_statement,
            target_users,
            user_stories,
            acceptance_criteria,
            technical_requirements,
            performance_requirements,
            security_requirements,
            integration_requirements,
            deployment_requirements,
            success_metrics,
            timeline,
            dependencies,
            risks,
            assumptions,
            category,
            priority,
            effort_estimate,
            business_value,
            technical_complexity,
            dependencies_list,
            assignee,
            target_sprint,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Prd {
        Prd::new(
            PrdFields::new("Support Agent", "Answers customer tickets")
                .with_requirements(["Reply within 5 minutes", "Escalate refunds"]),
        )
        .unwrap()
    }

    #[test]
    fn test_new_prd_starts_in_queue() {
        let prd = sample();
        assert_eq!(prd.status, PrdStatus::Queue);
        assert_eq!(prd.created_at, prd.updated_at);
        assert_eq!(prd.fields.requirements.len(), 2);
    }

    #[test]
    fn test_new_prd_rejects_empty_title() {
        let err = Prd::new(PrdFields::new("   ", "desc")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn test_prd_serializes_flat() {
        let prd = sample();
        let value = serde_json::to_value(&prd).unwrap();
        assert_eq!(value["title"], "Support Agent");
        assert_eq!(value["status"], "queue");
        assert_eq!(value["prd_type"], "agent");
        assert!(value.get("fields").is_none());

        let back: Prd = serde_json::from_value(value).unwrap();
        assert_eq!(back, prd);
    }

    #[test]
    fn test_update_applies_fields_and_status() {
        let mut prd = sample();
        prd.apply_update(PrdUpdate {
            title: Some("Support Agent v2".into()),
            timeline: Some("Q3".into()),
            status: Some(PrdStatus::ReadyForDevin),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(prd.fields.title, "Support Agent v2");
        assert_eq!(prd.fields.timeline.as_deref(), Some("Q3"));
        assert_eq!(prd.status, PrdStatus::ReadyForDevin);
    }

    #[test]
    fn test_rejected_update_leaves_prd_untouched() {
        let mut prd = sample();
        let before = prd.clone();
        let err = prd
            .apply_update(PrdUpdate {
                title: Some("New".into()),
                status: Some(PrdStatus::Completed),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidStateTransition { .. }));
        assert_eq!(prd, before);

        let err = prd
            .apply_update(PrdUpdate {
                business_value: Some(42),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
        assert_eq!(prd, before);
    }

    #[test]
    fn test_section_parsing_from_text() {
        let mut fields = PrdFields::new("t", "d");
        fields.set_section_text(PrdSection::TargetUsers, "- Support leads\n* Agents\n\n");
        assert_eq!(
            fields.target_users,
            Some(vec!["Support leads".to_string(), "Agents".to_string()])
        );

        fields.set_section_text(PrdSection::PerformanceRequirements, "**Latency**: < 200ms");
        let perf = fields.performance_requirements.as_ref().unwrap();
        assert_eq!(perf.get("latency").map(String::as_str), Some("< 200ms"));

        fields.set_section_text(PrdSection::Risks, "   ");
        assert_eq!(fields.risks, None);
    }

    #[test]
    fn test_optional_text_sections() {
        let mut fields = PrdFields::new("t", "d");
        assert_eq!(fields.section(PrdSection::Timeline), SectionRef::Empty);
        fields.timeline = Some("Q3".to_string());
        fields.problem_statement = Some("Tickets pile up".to_string());
        assert_eq!(fields.section(PrdSection::Timeline), SectionRef::Text("Q3"));
        assert_eq!(
            fields.section(PrdSection::ProblemStatement),
            SectionRef::Text("Tickets pile up")
        );
    }

    #[test]
    fn test_section_from_str_accepts_labels() {
        assert_eq!(
            "Problem Statement".parse::<PrdSection>().unwrap(),
            PrdSection::ProblemStatement
        );
        assert_eq!(
            "success_metrics".parse::<PrdSection>().unwrap(),
            PrdSection::SuccessMetrics
        );
        assert!("budget".parse::<PrdSection>().is_err());
    }
}
