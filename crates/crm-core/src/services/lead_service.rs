// ============================================================================
// CRM Core - Lead Service
// File: crates/crm-core/src/services/lead_service.rs
// ============================================================================
//! Leads with their catalog pivots, stage moves and conversion to contacts.

use std::sync::Arc;

use crm_shared::{PaginatedResult, Pagination};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::domain::{
    CatalogKind, Contact, CustomFieldValue, Deal, Lead, LeadChanges, LeadFilter, NewDeal, NewLead, TierLimits,
};
use crate::error::DomainError;
use crate::repositories::{CatalogRepository, LeadRepository, PipelineRepository};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConvertLead {
    /// Open a deal on the default pipeline's entry stage as well.
    #[serde(default)]
    pub create_deal: bool,
    pub deal_title: Option<String>,
    pub amount_cents: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    pub lead: Lead,
    pub contact: Contact,
    pub deal: Option<Deal>,
}

pub struct LeadService<L, C, P>
where
    L: LeadRepository,
    C: CatalogRepository,
    P: PipelineRepository,
{
    lead_repo: Arc<L>,
    catalog_repo: Arc<C>,
    pipeline_repo: Arc<P>,
    limits: TierLimits,
}

impl<L, C, P> LeadService<L, C, P>
where
    L: LeadRepository,
    C: CatalogRepository,
    P: PipelineRepository,
{
    pub fn new(lead_repo: Arc<L>, catalog_repo: Arc<C>, pipeline_repo: Arc<P>, limits: TierLimits) -> Self {
        Self {
            lead_repo,
            catalog_repo,
            pipeline_repo,
            limits,
        }
    }

    pub async fn create(&self, input: NewLead) -> Result<Lead, DomainError> {
        let current = self.lead_repo.count().await?;
        self.limits.ensure_capacity("leads", current)?;

        let mut lead = Lead::new(input)?;
        self.check_references(&lead).await?;
        lead.custom_fields = self.resolve_custom_fields(std::mem::take(&mut lead.custom_fields)).await?;

        let lead = self.lead_repo.create(&lead).await?;
        info!("Lead created: {}", lead.id);
        Ok(lead)
    }

    pub async fn list(&self, filter: &LeadFilter, pagination: Pagination) -> Result<PaginatedResult<Lead>, DomainError> {
        self.lead_repo.list(filter, pagination.normalized()).await
    }

    pub async fn get(&self, id: &Uuid) -> Result<Lead, DomainError> {
        self.lead_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("lead", id))
    }

    pub async fn update(&self, id: &Uuid, changes: LeadChanges) -> Result<Lead, DomainError> {
        let mut lead = self.get(id).await?;
        let replaces_fields = changes.custom_fields.is_some();
        lead.apply(changes)?;
        self.check_references(&lead).await?;
        if replaces_fields {
            lead.custom_fields = self.resolve_custom_fields(std::mem::take(&mut lead.custom_fields)).await?;
        }
        self.lead_repo.update(&lead).await
    }

    /// Pivot rows go with the lead; the adapter removes both in one transaction.
    pub async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        let lead = self.get(id).await?;
        self.lead_repo.delete(&lead.id).await?;
        info!("Lead deleted: {}", lead.id);
        Ok(())
    }

    pub async fn move_stage(&self, id: &Uuid, stage_id: &Uuid) -> Result<Lead, DomainError> {
        let mut lead = self.get(id).await?;
        let stage = self
            .pipeline_repo
            .find_stage(stage_id)
            .await?
            .ok_or_else(|| DomainError::not_found("stage", stage_id))?;
        lead.apply(LeadChanges {
            stage_id: Some(stage.id),
            ..Default::default()
        })?;
        self.lead_repo.update(&lead).await
    }

    pub async fn convert(&self, id: &Uuid, request: ConvertLead) -> Result<Conversion, DomainError> {
        let mut lead = self.get(id).await?;
        let contact = Contact::from_lead(&lead);
        lead.mark_converted(contact.id)?;

        let deal = if request.create_deal {
            let pipeline = self
                .pipeline_repo
                .find_default()
                .await?
                .ok_or_else(|| DomainError::ValidationError("no default pipeline configured".to_string()))?;
            let stage = pipeline
                .entry_stage()
                .ok_or_else(|| DomainError::ValidationError("default pipeline has no open stage".to_string()))?;
            let input = NewDeal {
                title: request.deal_title.unwrap_or_else(|| lead.name.clone()),
                contact_id: Some(contact.id),
                lead_id: Some(lead.id),
                stage_id: Some(stage.id),
                amount_cents: request.amount_cents.unwrap_or(0),
                currency: None,
                expected_close_date: None,
                owner_id: lead.owner_id,
            };
            Some(Deal::new(input, stage)?)
        } else {
            None
        };

        self.lead_repo.convert(&lead, &contact, deal.clone()).await?;
        info!("Lead {} converted to contact {}", lead.id, contact.id);
        Ok(Conversion { lead, contact, deal })
    }

    async fn check_references(&self, lead: &Lead) -> Result<(), DomainError> {
        self.ensure_items(CatalogKind::Industry, &lead.industry_ids).await?;
        self.ensure_items(CatalogKind::Service, &lead.service_ids).await?;
        if let Some(stage_id) = &lead.stage_id {
            if self.pipeline_repo.find_stage(stage_id).await?.is_none() {
                return Err(DomainError::not_found("stage", stage_id));
            }
        }
        Ok(())
    }

    async fn ensure_items(&self, kind: CatalogKind, ids: &[Uuid]) -> Result<(), DomainError> {
        if ids.is_empty() {
            return Ok(());
        }
        let found = self.catalog_repo.existing_item_ids(kind, ids.to_vec()).await?;
        match ids.iter().find(|id| !found.contains(id)) {
            Some(missing) => Err(DomainError::not_found(kind.label(), missing)),
            None => Ok(()),
        }
    }

    /// Type-checks values against their field definitions and requires every
    /// mandatory field to be filled.
    async fn resolve_custom_fields(&self, values: Vec<CustomFieldValue>) -> Result<Vec<CustomFieldValue>, DomainError> {
        let fields = self.catalog_repo.list_fields().await?;
        let mut out: Vec<CustomFieldValue> = Vec::with_capacity(values.len());
        for value in values {
            let field = fields
                .iter()
                .find(|f| f.id == value.custom_field_id)
                .ok_or_else(|| DomainError::not_found("custom field", value.custom_field_id))?;
            if out.iter().any(|v| v.custom_field_id == field.id) {
                return Err(DomainError::ValidationError(format!("field '{}' given twice", field.name)));
            }
            out.push(CustomFieldValue {
                custom_field_id: field.id,
                value: field.coerce(&value.value)?,
            });
        }
        if let Some(missing) = fields
            .iter()
            .filter(|f| f.is_required)
            .find(|f| !out.iter().any(|v| v.custom_field_id == f.id && !v.value.is_empty()))
        {
            return Err(DomainError::ValidationError(format!("field '{}' is required", missing.name)));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lead::sample_lead;
    use crate::domain::{CustomField, CustomFieldType, LeadStatus, Pipeline};
    use crate::repositories::{MockCatalogRepository, MockLeadRepository, MockPipelineRepository};

    fn limits(max_leads: Option<i32>) -> TierLimits {
        TierLimits {
            max_users: 5,
            max_leads,
            modules: vec!["leads".to_string()],
        }
    }

    fn new_lead() -> NewLead {
        NewLead {
            name: "Omar Said".to_string(),
            email: None,
            phone: None,
            company: None,
            source: None,
            status: None,
            stage_id: None,
            owner_id: None,
            location_id: None,
            notes: None,
            industry_ids: vec![],
            service_ids: vec![],
            custom_fields: vec![],
        }
    }

    fn service(
        leads: MockLeadRepository,
        catalog: MockCatalogRepository,
        pipelines: MockPipelineRepository,
        max_leads: Option<i32>,
    ) -> LeadService<MockLeadRepository, MockCatalogRepository, MockPipelineRepository> {
        LeadService::new(Arc::new(leads), Arc::new(catalog), Arc::new(pipelines), limits(max_leads))
    }

    #[tokio::test]
    async fn test_create_respects_max_leads() {
        let mut leads = MockLeadRepository::new();
        leads.expect_count().returning(|| Ok(10));
        leads.expect_create().never();

        let result = service(leads, MockCatalogRepository::new(), MockPipelineRepository::new(), Some(10))
            .create(new_lead())
            .await;
        assert!(matches!(result, Err(DomainError::TierLimitReached(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_industry() {
        let known = Uuid::new_v4();
        let unknown = Uuid::new_v4();
        let mut leads = MockLeadRepository::new();
        leads.expect_count().returning(|| Ok(0));
        leads.expect_create().never();
        let mut catalog = MockCatalogRepository::new();
        catalog
            .expect_existing_item_ids()
            .withf(|kind, _| *kind == CatalogKind::Industry)
            .returning(move |_, _| Ok(vec![known]));

        let mut input = new_lead();
        input.industry_ids = vec![known, unknown];
        let result = service(leads, catalog, MockPipelineRepository::new(), None).create(input).await;
        assert!(matches!(result, Err(DomainError::NotFound { entity: "industry", .. })));
    }

    #[tokio::test]
    async fn test_create_coerces_custom_fields() {
        let budget = CustomField::new("Budget", CustomFieldType::Number, vec![], true).unwrap();
        let budget_id = budget.id;
        let mut leads = MockLeadRepository::new();
        leads.expect_count().returning(|| Ok(0));
        leads
            .expect_create()
            .withf(move |l| l.custom_fields == vec![CustomFieldValue { custom_field_id: budget_id, value: "1500".into() }])
            .times(1)
            .returning(|l| Ok(l.clone()));
        let mut catalog = MockCatalogRepository::new();
        catalog.expect_list_fields().returning(move || Ok(vec![budget.clone()]));

        let mut input = new_lead();
        input.custom_fields = vec![CustomFieldValue {
            custom_field_id: budget_id,
            value: " 1500 ".into(),
        }];
        service(leads, catalog, MockPipelineRepository::new(), None).create(input).await.unwrap();
    }

    #[tokio::test]
    async fn test_required_custom_field_enforced() {
        let budget = CustomField::new("Budget", CustomFieldType::Number, vec![], true).unwrap();
        let mut leads = MockLeadRepository::new();
        leads.expect_count().returning(|| Ok(0));
        leads.expect_create().never();
        let mut catalog = MockCatalogRepository::new();
        catalog.expect_list_fields().returning(move || Ok(vec![budget.clone()]));

        let result = service(leads, catalog, MockPipelineRepository::new(), None).create(new_lead()).await;
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_convert_creates_contact_and_deal() {
        let lead = sample_lead();
        let lead_id = lead.id;
        let pipeline = Pipeline::default_sales();
        let entry_stage = pipeline.entry_stage().map(|s| s.id);

        let mut leads = MockLeadRepository::new();
        leads.expect_find_by_id().returning(move |_| Ok(Some(lead.clone())));
        leads
            .expect_convert()
            .withf(move |l, c, d| {
                l.status == LeadStatus::Converted
                    && l.converted_contact_id == Some(c.id)
                    && c.first_name == "Jane"
                    && c.last_name.as_deref() == Some("Buyer")
                    && d.as_ref().is_some_and(|d| Some(d.stage_id) == entry_stage && d.contact_id == Some(c.id))
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let mut pipelines = MockPipelineRepository::new();
        pipelines.expect_find_default().returning(move || Ok(Some(pipeline.clone())));

        let request = ConvertLead {
            create_deal: true,
            deal_title: None,
            amount_cents: Some(120_000),
        };
        let conversion = service(leads, MockCatalogRepository::new(), pipelines, None)
            .convert(&lead_id, request)
            .await
            .unwrap();
        assert_eq!(conversion.deal.map(|d| d.title), Some("Jane Buyer".to_string()));
    }

    #[tokio::test]
    async fn test_convert_twice_is_conflict() {
        let mut lead = sample_lead();
        lead.mark_converted(Uuid::new_v4()).unwrap();
        let lead_id = lead.id;

        let mut leads = MockLeadRepository::new();
        leads.expect_find_by_id().returning(move |_| Ok(Some(lead.clone())));
        leads.expect_convert().never();

        let result = service(leads, MockCatalogRepository::new(), MockPipelineRepository::new(), None)
            .convert(&lead_id, ConvertLead::default())
            .await;
        assert!(matches!(result, Err(DomainError::LeadAlreadyConverted)));
    }

    #[tokio::test]
    async fn test_delete_delegates_to_repository() {
        let lead = sample_lead();
        let lead_id = lead.id;
        let mut leads = MockLeadRepository::new();
        leads.expect_find_by_id().returning(move |_| Ok(Some(lead.clone())));
        leads
            .expect_delete()
            .withf(move |id| *id == lead_id)
            .times(1)
            .returning(|_| Ok(()));

        service(leads, MockCatalogRepository::new(), MockPipelineRepository::new(), None)
            .delete(&lead_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_move_stage_requires_existing_stage() {
        let lead = sample_lead();
        let lead_id = lead.id;
        let mut leads = MockLeadRepository::new();
        leads.expect_find_by_id().returning(move |_| Ok(Some(lead.clone())));
        leads.expect_update().never();
        let mut pipelines = MockPipelineRepository::new();
        pipelines.expect_find_stage().returning(|_| Ok(None));

        let result = service(leads, MockCatalogRepository::new(), pipelines, None)
            .move_stage(&lead_id, &Uuid::new_v4())
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { entity: "stage", .. })));
    }
}
