//! Roadmap scoring, filtering and bucketing.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::completion::completion;
use crate::prd::Prd;
use crate::{CoreError, PrdEffort, PrdId, PrdPriority, PrdStatus, PrdType};

pub const CATEGORIES: &[&str] = &["infrastructure", "features", "improvements", "bugfixes"];
pub const ROADMAP_STATUSES: &[&str] = &["backlog", "planned", "in_progress", "review", "completed"];
pub const PRIORITIES: &[&str] = &["low", "medium", "high", "critical"];

pub const UNCATEGORIZED: &str = "uncategorized";
const DEFAULT_SCORE_INPUT: u8 = 5;
const HIGH_THRESHOLD: u8 = 6;

/// Display color for a roadmap category.
pub fn category_color(category: &str) -> &'static str {
    match category {
        "infrastructure" => "#3b82f6",
        "features" => "#10b981",
        "improvements" => "#f59e0b",
        "bugfixes" => "#ef4444",
        _ => "#6b7280",
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn priority_bonus(priority: Option<PrdPriority>) -> f64 {
    match priority {
        Some(PrdPriority::Low) => 0.0,
        Some(PrdPriority::Medium) | None => 0.5,
        Some(PrdPriority::High) => 1.5,
        Some(PrdPriority::Critical) => 2.0,
    }
}

/// Score in `[0, 10]`, one decimal. Missing inputs count as 5.
pub fn priority_score(
    business_value: Option<u8>,
    technical_complexity: Option<u8>,
    priority: Option<PrdPriority>,
) -> f64 {
    let value = f64::from(business_value.unwrap_or(DEFAULT_SCORE_INPUT));
    let complexity = f64::from(technical_complexity.unwrap_or(DEFAULT_SCORE_INPUT));
    let raw = 0.6 * value + 0.2 * (10.0 - complexity) + priority_bonus(priority);
    round1(raw.clamp(0.0, 10.0))
}

/// One PRD as shown on the roadmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapEntry {
    pub id: PrdId,
    pub title: String,
    pub description: String,
    pub prd_type: PrdType,
    pub status: PrdStatus,
    pub category: String,
    #[serde(default)]
    pub priority: Option<PrdPriority>,
    pub priority_score: f64,
    pub effort_estimate: PrdEffort,
    pub business_value: u8,
    pub technical_complexity: u8,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub target_sprint: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completion_percentage: u8,
}

impl RoadmapEntry {
    pub fn from_prd(prd: &Prd) -> Self {
        let f = &prd.fields;
        Self {
            id: prd.id.clone(),
            title: f.title.clone(),
            description: f.description.clone(),
            prd_type: f.prd_type,
            status: prd.status,
            category: f
                .category
                .clone()
                .unwrap_or_else(|| UNCATEGORIZED.to_string()),
            priority: f.priority,
            priority_score: priority_score(f.business_value, f.technical_complexity, f.priority),
            effort_estimate: f.effort_estimate.unwrap_or(PrdEffort::Medium),
            business_value: f.business_value.unwrap_or(DEFAULT_SCORE_INPUT),
            technical_complexity: f.technical_complexity.unwrap_or(DEFAULT_SCORE_INPUT),
            assignee: f.assignee.clone(),
            target_sprint: f.target_sprint.clone(),
            created_at: prd.created_at,
            completion_percentage: completion(f).completion_percentage,
        }
    }
}

/// Field the roadmap list is sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    PriorityScore,
    BusinessValue,
    TechnicalComplexity,
    CreatedAt,
    Title,
}

impl FromStr for SortField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "priority_score" => Ok(Self::PriorityScore),
            "business_value" => Ok(Self::BusinessValue),
            "technical_complexity" => Ok(Self::TechnicalComplexity),
            "created_at" => Ok(Self::CreatedAt),
            "title" => Ok(Self::Title),
            other => Err(CoreError::UnknownVariant {
                kind: "sort field",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(CoreError::UnknownVariant {
                kind: "sort order",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

/// Raw roadmap query parameters. Empty strings mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prd_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
}

impl RoadmapQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn status(mut self, status: PrdStatus) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn effort(mut self, effort: PrdEffort) -> Self {
        self.effort = Some(effort.to_string());
        self
    }

    pub fn prd_type(mut self, prd_type: PrdType) -> Self {
        self.prd_type = Some(prd_type.to_string());
        self
    }

    pub fn sort(mut self, field: &str, order: SortOrder) -> Self {
        self.sort_by = Some(field.to_string());
        self.sort_order = Some(order.to_string());
        self
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Parsed, typed roadmap filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoadmapFilter {
    pub category: Option<String>,
    pub status: Option<PrdStatus>,
    pub effort: Option<PrdEffort>,
    pub prd_type: Option<PrdType>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl TryFrom<&RoadmapQuery> for RoadmapFilter {
    type Error = CoreError;

    fn try_from(query: &RoadmapQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            category: non_blank(&query.category).map(str::to_lowercase),
            status: non_blank(&query.status).map(str::parse).transpose()?,
            effort: non_blank(&query.effort).map(str::parse).transpose()?,
            prd_type: non_blank(&query.prd_type).map(str::parse).transpose()?,
            sort_by: non_blank(&query.sort_by)
                .map(str::parse)
                .transpose()?
                .unwrap_or_default(),
            sort_order: non_blank(&query.sort_order)
                .map(str::parse)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

impl RoadmapFilter {
    pub fn matches(&self, entry: &RoadmapEntry) -> bool {
        self.category
            .as_deref()
            .map_or(true, |c| entry.category.eq_ignore_ascii_case(c))
            && self.status.map_or(true, |s| entry.status == s)
            && self.effort.map_or(true, |e| entry.effort_estimate == e)
            && self.prd_type.map_or(true, |t| entry.prd_type == t)
    }

    fn compare(&self, a: &RoadmapEntry, b: &RoadmapEntry) -> Ordering {
        match self.sort_by {
            SortField::PriorityScore => a.priority_score.total_cmp(&b.priority_score),
            SortField::BusinessValue => a.business_value.cmp(&b.business_value),
            SortField::TechnicalComplexity => a.technical_complexity.cmp(&b.technical_complexity),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        }
    }

    /// Filter and sort entries.
    pub fn apply(&self, entries: Vec<RoadmapEntry>) -> Vec<RoadmapEntry> {
        let mut filtered: Vec<RoadmapEntry> =
            entries.into_iter().filter(|e| self.matches(e)).collect();
        filtered.sort_by(|a, b| match self.sort_order {
            SortOrder::Asc => self.compare(a, b),
            SortOrder::Desc => self.compare(b, a),
        });
        filtered
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub count: usize,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub count: usize,
}

/// Aggregate counts for the roadmap dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapOverview {
    pub total_prds: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub by_effort: BTreeMap<String, usize>,
    pub average_priority_score: f64,
    pub categories: BTreeMap<String, CategorySummary>,
    pub statuses: BTreeMap<String, StatusSummary>,
}

pub fn overview(entries: &[RoadmapEntry]) -> RoadmapOverview {
    let mut by_status = BTreeMap::new();
    let mut by_category = BTreeMap::new();
    let mut by_effort = BTreeMap::new();
    for entry in entries {
        *by_status.entry(entry.status.to_string()).or_insert(0) += 1;
        *by_category.entry(entry.category.clone()).or_insert(0) += 1;
        *by_effort.entry(entry.effort_estimate.to_string()).or_insert(0) += 1;
    }

    let average_priority_score = if entries.is_empty() {
        0.0
    } else {
        round1(entries.iter().map(|e| e.priority_score).sum::<f64>() / entries.len() as f64)
    };

    let mut categories: BTreeMap<String, CategorySummary> = CATEGORIES
        .iter()
        .map(|c| {
            (
                c.to_string(),
                CategorySummary {
                    count: 0,
                    color: category_color(c).to_string(),
                },
            )
        })
        .collect();
    for (name, count) in &by_category {
        categories
            .entry(name.clone())
            .or_insert_with(|| CategorySummary {
                count: 0,
                color: category_color(name).to_string(),
            })
            .count = *count;
    }

    let statuses = PrdStatus::ALL
        .iter()
        .map(|s| {
            let name = s.to_string();
            let count = by_status.get(&name).copied().unwrap_or(0);
            (name, StatusSummary { count })
        })
        .collect();

    RoadmapOverview {
        total_prds: entries.len(),
        by_status,
        by_category,
        by_effort,
        average_priority_score,
        categories,
        statuses,
    }
}

/// Value/complexity quadrants, each sorted by priority score descending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrioritizationMatrix {
    pub high_value_low_complexity: Vec<RoadmapEntry>,
    pub high_value_high_complexity: Vec<RoadmapEntry>,
    pub low_value_low_complexity: Vec<RoadmapEntry>,
    pub low_value_high_complexity: Vec<RoadmapEntry>,
}

pub fn prioritization_matrix(entries: Vec<RoadmapEntry>) -> PrioritizationMatrix {
    let mut matrix = PrioritizationMatrix::default();
    for entry in entries {
        let high_value = entry.business_value >= HIGH_THRESHOLD;
        let high_complexity = entry.technical_complexity >= HIGH_THRESHOLD;
        let bucket = match (high_value, high_complexity) {
            (true, false) => &mut matrix.high_value_low_complexity,
            (true, true) => &mut matrix.high_value_high_complexity,
            (false, false) => &mut matrix.low_value_low_complexity,
            (false, true) => &mut matrix.low_value_high_complexity,
        };
        bucket.push(entry);
    }
    for bucket in [
        &mut matrix.high_value_low_complexity,
        &mut matrix.high_value_high_complexity,
        &mut matrix.low_value_low_complexity,
        &mut matrix.low_value_high_complexity,
    ] {
        bucket.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));
    }
    matrix
}

/// Static roadmap vocabularies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapCatalogs {
    pub categories: Vec<String>,
    pub statuses: Vec<String>,
    pub priorities: Vec<String>,
}

pub fn catalogs() -> RoadmapCatalogs {
    let owned = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
    RoadmapCatalogs {
        categories: owned(CATEGORIES),
        statuses: owned(ROADMAP_STATUSES),
        priorities: owned(PRIORITIES),
    }
}
