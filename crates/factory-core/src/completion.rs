//! PRD completeness scoring, guided questions and the section assistant.

use serde::{Deserialize, Serialize};

use crate::prd::{PrdFields, PrdSection, SectionRef};
use crate::CoreError;

/// Sections a PRD needs before it is considered complete, in canonical order.
pub const REQUIRED_SECTIONS: &[PrdSection] = &[
    PrdSection::Title,
    PrdSection::Description,
    PrdSection::ProblemStatement,
    PrdSection::TargetUsers,
    PrdSection::UserStories,
    PrdSection::Requirements,
    PrdSection::AcceptanceCriteria,
    PrdSection::TechnicalRequirements,
    PrdSection::SuccessMetrics,
    PrdSection::Timeline,
];

/// True for values written by the importer in place of real content.
pub fn is_placeholder(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    lower.ends_with("to be completed") || lower.ends_with("to be defined")
}

/// True if the section has content that is not a placeholder.
pub fn is_filled(fields: &PrdFields, section: PrdSection) -> bool {
    match fields.section(section) {
        SectionRef::Text(text) => !text.trim().is_empty() && !is_placeholder(text),
        SectionRef::List(items) => items.iter().any(|item| !is_placeholder(item)),
        SectionRef::Map(map) => !map.is_empty(),
        SectionRef::Empty => false,
    }
}

/// Completeness summary for one PRD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub completion_percentage: u8,
    pub missing_sections: Vec<PrdSection>,
    pub is_complete: bool,
}

pub fn completion(fields: &PrdFields) -> CompletionReport {
    let missing_sections: Vec<PrdSection> = REQUIRED_SECTIONS
        .iter()
        .copied()
        .filter(|section| !is_filled(fields, *section))
        .collect();
    let filled = REQUIRED_SECTIONS.len() - missing_sections.len();
    let percentage = (filled as f64 / REQUIRED_SECTIONS.len() as f64 * 100.0).round() as u8;
    CompletionReport {
        completion_percentage: percentage,
        is_complete: missing_sections.is_empty(),
        missing_sections,
    }
}

/// A guided question for one missing section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub section: PrdSection,
    pub is_optional: bool,
    pub question: String,
    pub sub_questions: Vec<String>,
    pub example: String,
}

struct CatalogEntry {
    section: PrdSection,
    question: &'static str,
    sub_questions: &'static [&'static str],
    example: &'static str,
}

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        section: PrdSection::Title,
        question: "What is the name of this project?",
        sub_questions: &["What will people call the agent or feature?"],
        example: "Customer Support Triage Agent",
    },
    CatalogEntry {
        section: PrdSection::Description,
        question: "What does this project do, in a few sentences?",
        sub_questions: &[
            "What is the main capability?",
            "Where does it fit in the existing workflow?",
        ],
        example: "An agent that reads incoming support tickets, classifies them and drafts a first reply.",
    },
    CatalogEntry {
        section: PrdSection::ProblemStatement,
        question: "What problem are you trying to solve?",
        sub_questions: &[
            "Who experiences this problem?",
            "How is it handled today?",
            "What does it cost when it goes unsolved?",
        ],
        example: "Support tickets wait an average of 18 hours before anyone reads them.",
    },
    CatalogEntry {
        section: PrdSection::TargetUsers,
        question: "Who will use this?",
        sub_questions: &[
            "Which roles or teams?",
            "How technical are they?",
            "How often will they use it?",
        ],
        example: "- Support leads\n- Tier 1 support agents",
    },
    CatalogEntry {
        section: PrdSection::UserStories,
        question: "What do users need to accomplish?",
        sub_questions: &["Write stories as: As a <role>, I want <goal> so that <benefit>."],
        example: "- As a support lead, I want tickets pre-classified so that I can route them faster",
    },
    CatalogEntry {
        section: PrdSection::Requirements,
        question: "What must the system do?",
        sub_questions: &[
            "What are the core features?",
            "What inputs and outputs are involved?",
            "Which integrations are required?",
        ],
        example: "- Classify tickets by topic\n- Draft a reply for common questions",
    },
    CatalogEntry {
        section: PrdSection::AcceptanceCriteria,
        question: "How will you know the work is done?",
        sub_questions: &["What observable behavior must be true for each requirement?"],
        example: "- 90% of tickets receive a category within 1 minute",
    },
    CatalogEntry {
        section: PrdSection::TechnicalRequirements,
        question: "What technical constraints apply?",
        sub_questions: &[
            "Which languages, frameworks or services must be used?",
            "What data stores are involved?",
            "Are there hosting constraints?",
        ],
        example: "- Expose a REST API\n- Store history in Postgres",
    },
    CatalogEntry {
        section: PrdSection::SuccessMetrics,
        question: "How will success be measured?",
        sub_questions: &[
            "Which numbers should move?",
            "What are the target values?",
        ],
        example: "- First response time under 1 hour\n- 30% fewer escalations",
    },
    CatalogEntry {
        section: PrdSection::Timeline,
        question: "What is the timeline?",
        sub_questions: &[
            "When should work start?",
            "What are the key milestones?",
            "Is there a hard deadline?",
        ],
        example: "Prototype in 2 weeks, production rollout by end of quarter",
    },
];

/// The guided question for `section`.
pub fn question_for(section: PrdSection) -> Question {
    let required = REQUIRED_SECTIONS.contains(&section);
    match CATALOG.iter().find(|entry| entry.section == section) {
        Some(entry) => Question {
            section,
            is_optional: !required,
            question: entry.question.to_string(),
            sub_questions: entry.sub_questions.iter().map(|s| s.to_string()).collect(),
            example: entry.example.to_string(),
        },
        None => Question {
            section,
            is_optional: !required,
            question: format!("What should the {} section say?", section.label()),
            sub_questions: Vec::new(),
            example: String::new(),
        },
    }
}

/// One question per missing required section.
pub fn guided_questions(fields: &PrdFields) -> Vec<Question> {
    completion(fields)
        .missing_sections
        .into_iter()
        .map(question_for)
        .collect()
}

/// Optional context sent along with a chat message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatContext {
    #[serde(default)]
    pub current_section: Option<String>,
}

/// A chat message from the PRD assistant panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub context: Option<ChatContext>,
}

/// Reply from the section assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub updated_section: Option<PrdSection>,
    #[serde(default)]
    pub next_section: Option<PrdSection>,
    pub completion_percentage: u8,
}

/// Work out which section a chat message answers.
///
/// A `<section>: ...` prefix wins, then the context's current section.
/// Returns `None` when the message answers nothing.
pub fn chat_target(
    message: &str,
    current_section: Option<&str>,
) -> Result<Option<(PrdSection, String)>, CoreError> {
    let message = message.trim();
    if message.is_empty() {
        return Ok(None);
    }

    if let Some((head, rest)) = message.split_once(':') {
        if let Ok(section) = head.parse::<PrdSection>() {
            let content = rest.trim();
            if content.is_empty() {
                return Err(CoreError::invalid(format!(
                    "No content given for section '{section}'"
                )));
            }
            return Ok(Some((section, content.to_string())));
        }
    }

    match current_section.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => Ok(Some((name.parse::<PrdSection>()?, message.to_string()))),
        None => Ok(None),
    }
}

/// Build the assistant's reply after an optional update.
pub fn chat_reply(fields: &PrdFields, updated: Option<PrdSection>) -> ChatReply {
    let report = completion(fields);
    let mut response = String::new();
    if let Some(section) = updated {
        response.push_str(&format!("Updated {}. ", section.label()));
    }

    let next_section = report.missing_sections.first().copied();
    let suggestions = match next_section {
        Some(next) => {
            let question = question_for(next);
            if updated.is_none() {
                response.push_str(
                    "I can help complete this PRD. Answer a section by starting your \
                     message with its name, for example \"timeline: launch in Q3\". ",
                );
            }
            response.push_str(&format!(
                "Next, let's work on {}: {} ({}% complete)",
                next.label(),
                question.question,
                report.completion_percentage
            ));
            question.sub_questions
        }
        None => {
            response.push_str(
                "All required sections are filled. The PRD is complete and can be marked ready for Devin.",
            );
            Vec::new()
        }
    };

    ChatReply {
        response,
        suggestions,
        updated_section: updated,
        next_section,
        completion_percentage: report.completion_percentage,
    }
}
