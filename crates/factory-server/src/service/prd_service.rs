//! PRD lifecycle, import, completeness and roadmap operations.

use std::sync::Arc;

use tracing::{debug, info};

use factory_core::api::{CompletionResponse, GuidedQuestionsResponse, MarkdownResponse};
use factory_core::completion::{self, ChatReply, ChatRequest};
use factory_core::markdown::import_markdown;
use factory_core::render::{export_filename, export_markdown};
use factory_core::roadmap::{
    self, PrioritizationMatrix, RoadmapEntry, RoadmapFilter, RoadmapOverview, RoadmapQuery,
};
use factory_core::validation::validate_upload;
use factory_core::{
    CoreError, Page, Prd, PrdFields, PrdId, PrdSection, PrdStatus, PrdType, PrdUpdate,
};

use crate::service::{ListParams, ServiceResult};
use crate::state::AppState;

/// PRD operations.
pub struct PrdService {
    state: Arc<AppState>,
}

fn newest_first(prds: &mut [Prd]) {
    prds.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

impl PrdService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn list(&self, params: &ListParams) -> ServiceResult<Page<Prd>> {
        let pagination = params.pagination()?;
        let prd_type: Option<PrdType> = ListParams::parse(&params.prd_type)?;
        let status: Option<PrdStatus> = ListParams::parse(&params.status)?;

        let mut prds: Vec<Prd> = self
            .state
            .prds
            .read()
            .await
            .values()
            .filter(|p| prd_type.map_or(true, |t| p.fields.prd_type == t))
            .filter(|p| status.map_or(true, |s| p.status == s))
            .cloned()
            .collect();
        newest_first(&mut prds);
        Ok(pagination.apply(prds))
    }

    pub async fn create(&self, fields: PrdFields) -> ServiceResult<Prd> {
        let prd = Prd::new(fields)?;
        self.state
            .prds
            .write()
            .await
            .insert(prd.id.clone(), prd.clone());
        self.state.persist().await;

        info!(prd_id = %prd.id, title = %prd.fields.title, prd_type = %prd.fields.prd_type, "PRD created");
        Ok(prd)
    }

    pub async fn get(&self, id: &PrdId) -> ServiceResult<Prd> {
        self.state
            .prds
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::PrdNotFound(id.to_string()).into())
    }

    pub async fn update(&self, id: &PrdId, update: PrdUpdate) -> ServiceResult<Prd> {
        let prd = {
            let mut prds = self.state.prds.write().await;
            let prd = prds
                .get_mut(id)
                .ok_or_else(|| CoreError::PrdNotFound(id.to_string()))?;
            prd.apply_update(update)?;
            prd.clone()
        };
        self.refresh_cache(&prd).await;
        self.state.persist().await;

        info!(prd_id = %id, status = %prd.status, "PRD updated");
        Ok(prd)
    }

    pub async fn delete(&self, id: &PrdId) -> ServiceResult<()> {
        {
            let mut prds = self.state.prds.write().await;
            if prds.remove(id).is_none() {
                return Err(CoreError::PrdNotFound(id.to_string()).into());
            }
            self.state.mcp_cache.write().await.remove(id);
        }
        self.state.persist().await;

        info!(prd_id = %id, "PRD deleted");
        Ok(())
    }

    /// Import an uploaded markdown file as a new PRD.
    pub async fn upload(&self, filename: &str, bytes: &[u8]) -> ServiceResult<Prd> {
        let upload = validate_upload(filename, bytes)?;
        let (mut fields, filled) = import_markdown(&upload.content, Some(&upload.filename));
        debug!(
            filename = %upload.filename,
            placeholders = filled.len(),
            "Markdown PRD parsed"
        );
        fields.original_filename = Some(upload.filename);
        fields.file_content = Some(upload.content);
        self.create(fields).await
    }

    pub async fn markdown(&self, id: &PrdId) -> ServiceResult<MarkdownResponse> {
        let prd = self.get(id).await?;
        Ok(MarkdownResponse {
            prd_id: prd.id.clone(),
            markdown: export_markdown(&prd),
            filename: export_filename(&prd),
        })
    }

    /// PRDs waiting for a Devin task, newest first.
    pub async fn ready_for_devin(&self) -> Vec<Prd> {
        let mut prds: Vec<Prd> = self
            .state
            .prds
            .read()
            .await
            .values()
            .filter(|p| p.status == PrdStatus::ReadyForDevin)
            .cloned()
            .collect();
        newest_first(&mut prds);
        prds
    }

    pub async fn mark_ready(&self, id: &PrdId) -> ServiceResult<Prd> {
        self.update(id, PrdUpdate::status(PrdStatus::ReadyForDevin))
            .await
    }

    pub async fn completion(&self, id: &PrdId) -> ServiceResult<CompletionResponse> {
        let prd = self.get(id).await?;
        let report = completion::completion(&prd.fields);
        Ok(CompletionResponse {
            prd_id: prd.id,
            completion_percentage: report.completion_percentage,
            missing_sections: report.missing_sections,
            is_complete: report.is_complete,
        })
    }

    pub async fn guided_questions(&self, id: &PrdId) -> ServiceResult<GuidedQuestionsResponse> {
        let prd = self.get(id).await?;
        Ok(GuidedQuestionsResponse {
            completion_percentage: completion::completion(&prd.fields).completion_percentage,
            questions: completion::guided_questions(&prd.fields),
            prd_id: prd.id,
        })
    }

    /// Write an answer into one section. Returns the PRD and its new score.
    pub async fn answer(&self, id: &PrdId, section: &str, content: &str) -> ServiceResult<(Prd, u8)> {
        let section: PrdSection = section.parse()?;
        if content.trim().is_empty() {
            return Err(CoreError::invalid(format!("No content given for section '{section}'")).into());
        }
        let prd = self.write_section(id, section, content).await?;
        let percentage = completion::completion(&prd.fields).completion_percentage;
        Ok((prd, percentage))
    }

    /// Deterministic section assistant.
    pub async fn chat(&self, id: &PrdId, request: &ChatRequest) -> ServiceResult<ChatReply> {
        let current = request
            .context
            .as_ref()
            .and_then(|c| c.current_section.as_deref());

        let (fields, updated) = match completion::chat_target(&request.message, current)? {
            Some((section, content)) => {
                let prd = self.write_section(id, section, &content).await?;
                (prd.fields, Some(section))
            }
            None => (self.get(id).await?.fields, None),
        };
        Ok(completion::chat_reply(&fields, updated))
    }

    async fn write_section(&self, id: &PrdId, section: PrdSection, content: &str) -> ServiceResult<Prd> {
        let prd = {
            let mut prds = self.state.prds.write().await;
            let prd = prds
                .get_mut(id)
                .ok_or_else(|| CoreError::PrdNotFound(id.to_string()))?;
            prd.answer_section(section, content)?;
            prd.clone()
        };
        self.refresh_cache(&prd).await;
        self.state.persist().await;

        info!(prd_id = %id, section = %section, "PRD section answered");
        Ok(prd)
    }

    /// Keep a cached copy for MCP clients in sync with the store.
    async fn refresh_cache(&self, prd: &Prd) {
        let mut cache = self.state.mcp_cache.write().await;
        if let Some(cached) = cache.get_mut(&prd.id) {
            *cached = prd.clone();
        }
    }

    // ------------------------------------------------------------------
    // Roadmap
    // ------------------------------------------------------------------

    pub async fn all(&self) -> Vec<Prd> {
        let mut prds: Vec<Prd> = self.state.prds.read().await.values().cloned().collect();
        newest_first(&mut prds);
        prds
    }

    async fn roadmap_entries(&self) -> Vec<RoadmapEntry> {
        self.all().await.iter().map(RoadmapEntry::from_prd).collect()
    }

    pub async fn roadmap_overview(&self) -> RoadmapOverview {
        roadmap::overview(&self.roadmap_entries().await)
    }

    pub async fn roadmap_prds(&self, query: &RoadmapQuery) -> ServiceResult<Vec<RoadmapEntry>> {
        let filter = RoadmapFilter::try_from(query)?;
        Ok(filter.apply(self.roadmap_entries().await))
    }

    pub async fn prioritization_matrix(&self) -> PrioritizationMatrix {
        roadmap::prioritization_matrix(self.roadmap_entries().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceError;
    use factory_core::completion::ChatContext;

    fn service() -> PrdService {
        PrdService::new(AppState::new())
    }

    fn fields(title: &str) -> PrdFields {
        PrdFields::new(title, "A useful agent").with_requirements(["Do the thing"])
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let svc = service();
        let prd = svc.create(fields("Ticket Bot")).await.unwrap();
        assert_eq!(prd.status, PrdStatus::Queue);
        assert_eq!(svc.get(&prd.id).await.unwrap(), prd);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let err = service().get(&PrdId::new("nope")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::PrdNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() {
        let svc = service();
        svc.create(fields("One")).await.unwrap();
        svc.create(fields("Two").with_type(PrdType::Platform))
            .await
            .unwrap();
        svc.create(fields("Three")).await.unwrap();

        let page = svc
            .list(&ListParams {
                prd_type: Some("agent".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(page
            .items
            .iter()
            .all(|p| p.fields.prd_type == PrdType::Agent));

        let page = svc
            .list(&ListParams {
                skip: Some(1),
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.page, 2);
        assert!(page.has_next);
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_transition() {
        let svc = service();
        let prd = svc.create(fields("Ticket Bot")).await.unwrap();
        let err = svc
            .update(&prd.id, PrdUpdate::status(PrdStatus::Completed))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(CoreError::InvalidStateTransition { .. })
        ));
        assert_eq!(svc.get(&prd.id).await.unwrap().status, PrdStatus::Queue);
    }

    #[tokio::test]
    async fn test_mark_ready_lists_prd() {
        let svc = service();
        let prd = svc.create(fields("Ticket Bot")).await.unwrap();
        svc.mark_ready(&prd.id).await.unwrap();
        let ready = svc.ready_for_devin().await;
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, prd.id);
    }

    #[tokio::test]
    async fn test_upload_imports_markdown() {
        let svc = service();
        let content = "# Title\nSupport Triage Agent\n\n## Problem Statement\nTickets pile up\n\n## Requirements\n- Classify tickets\n- Draft replies\n";
        let prd = svc.upload("triage.md", content.as_bytes()).await.unwrap();
        assert_eq!(prd.fields.title, "Support Triage Agent");
        assert_eq!(prd.fields.requirements, vec!["Classify tickets", "Draft replies"]);
        assert_eq!(prd.fields.original_filename.as_deref(), Some("triage.md"));
        assert_eq!(prd.fields.file_content.as_deref(), Some(content));
        // Missing required sections are filled with placeholders.
        assert_eq!(
            prd.fields.timeline.as_deref(),
            Some("Timeline to be completed")
        );
    }

    #[tokio::test]
    async fn test_upload_rejects_wrong_extension() {
        let err = service().upload("notes.pdf", b"# Hi").await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_answer_and_chat() {
        let svc = service();
        let prd = svc.create(fields("Ticket Bot")).await.unwrap();

        let (updated, percentage) = svc
            .answer(&prd.id, "Problem Statement", "Tickets pile up")
            .await
            .unwrap();
        assert_eq!(
            updated.fields.problem_statement.as_deref(),
            Some("Tickets pile up")
        );
        assert!(percentage > 0);

        let reply = svc
            .chat(
                &prd.id,
                &ChatRequest {
                    message: "- Support agents".into(),
                    context: Some(ChatContext {
                        current_section: Some("target_users".into()),
                    }),
                },
            )
            .await
            .unwrap();
        assert_eq!(reply.updated_section, Some(PrdSection::TargetUsers));
        assert_eq!(
            svc.get(&prd.id).await.unwrap().fields.target_users,
            Some(vec!["Support agents".to_string()])
        );
    }

    #[tokio::test]
    async fn test_answer_unknown_section() {
        let svc = service();
        let prd = svc.create(fields("Ticket Bot")).await.unwrap();
        let err = svc.answer(&prd.id, "vibes", "good").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(CoreError::UnknownVariant { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_evicts_cache() {
        let state = AppState::new();
        let svc = PrdService::new(state.clone());
        let prd = svc.create(fields("Ticket Bot")).await.unwrap();
        state
            .mcp_cache
            .write()
            .await
            .insert(prd.id.clone(), prd.clone());

        svc.delete(&prd.id).await.unwrap();
        assert!(state.mcp_cache.read().await.is_empty());
        assert!(svc.delete(&prd.id).await.is_err());
    }

    #[tokio::test]
    async fn test_roadmap_prds_filter() {
        let svc = service();
        let mut infra = fields("Infra");
        infra.category = Some("infrastructure".into());
        infra.business_value = Some(9);
        svc.create(infra).await.unwrap();
        svc.create(fields("Other")).await.unwrap();

        let entries = svc
            .roadmap_prds(&RoadmapQuery::new().category("infrastructure"))
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Infra");

        let overview = svc.roadmap_overview().await;
        assert_eq!(overview.total_prds, 2);

        let matrix = svc.prioritization_matrix().await;
        assert_eq!(matrix.high_value_low_complexity.len(), 1);
    }
}
