// ============================================================================
// CRM Infrastructure - PostgreSQL Lead Repository
// File: crates/crm-infrastructure/src/database/postgres/lead_repo_impl.rs
// Description: Leads with their industry, service and custom field pivots
// ============================================================================

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_shared::{PaginatedResult, Pagination};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crm_core::domain::{Contact, CustomFieldValue, Deal, Lead, LeadFilter, LeadStatus};
use crm_core::error::DomainError;
use crm_core::repositories::LeadRepository;

use super::contact_repo_impl::insert_contact;
use super::deal_repo_impl::insert_deal;
use super::{db_error, search_pattern};

pub struct PgLeadRepository {
    pool: PgPool,
}

impl PgLeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn custom_values(&self, lead_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<CustomFieldValue>>, DomainError> {
        let rows: Vec<(Uuid, Uuid, String)> = sqlx::query_as(
            "SELECT lead_id, custom_field_id, value FROM lead_custom_values WHERE lead_id = ANY($1)",
        )
        .bind(lead_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("loading custom values", e))?;

        let mut grouped: HashMap<Uuid, Vec<CustomFieldValue>> = HashMap::new();
        for (lead_id, custom_field_id, value) in rows {
            grouped
                .entry(lead_id)
                .or_default()
                .push(CustomFieldValue { custom_field_id, value });
        }
        Ok(grouped)
    }

    async fn hydrate(&self, rows: Vec<LeadRow>) -> Result<Vec<Lead>, DomainError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut values = self.custom_values(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let custom = values.remove(&row.id).unwrap_or_default();
                row.into_lead(custom)
            })
            .collect())
    }
}

#[derive(Debug, FromRow)]
struct LeadRow {
    id: Uuid,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    company: Option<String>,
    source: Option<String>,
    status: String,
    stage_id: Option<Uuid>,
    owner_id: Option<Uuid>,
    location_id: Option<Uuid>,
    notes: Option<String>,
    converted_contact_id: Option<Uuid>,
    industry_ids: Vec<Uuid>,
    service_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LeadRow {
    fn into_lead(self, custom_fields: Vec<CustomFieldValue>) -> Lead {
        Lead {
            id: self.id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            company: self.company,
            source: self.source,
            status: LeadStatus::from_str(&self.status).unwrap_or_default(),
            stage_id: self.stage_id,
            owner_id: self.owner_id,
            location_id: self.location_id,
            notes: self.notes,
            converted_contact_id: self.converted_contact_id,
            industry_ids: self.industry_ids,
            service_ids: self.service_ids,
            custom_fields,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const SELECT_LEADS: &str = r#"
    SELECT l.id, l.name, l.email, l.phone, l.company, l.source, l.status, l.stage_id, l.owner_id,
           l.location_id, l.notes, l.converted_contact_id,
           ARRAY(SELECT li.item_id FROM lead_industries li WHERE li.lead_id = l.id) AS industry_ids,
           ARRAY(SELECT ls.item_id FROM lead_services ls WHERE ls.lead_id = l.id) AS service_ids,
           l.created_at, l.updated_at
    FROM leads l
"#;

const FILTER: &str = r#"
    WHERE ($1::text IS NULL OR l.status = $1)
      AND ($2::uuid IS NULL OR l.stage_id = $2)
      AND ($3::uuid IS NULL OR l.owner_id = $3)
      AND ($4::uuid IS NULL OR EXISTS (
            SELECT 1 FROM lead_industries f WHERE f.lead_id = l.id AND f.item_id = $4))
      AND ($5::text IS NULL OR l.name ILIKE $5 OR l.email ILIKE $5 OR l.phone ILIKE $5 OR l.company ILIKE $5)
"#;

/// Replaces the three pivot sets of a lead.
async fn write_pivots(conn: &mut PgConnection, lead: &Lead) -> Result<(), sqlx::Error> {
    for table in ["lead_industries", "lead_services", "lead_custom_values"] {
        sqlx::query(&format!("DELETE FROM {table} WHERE lead_id = $1"))
            .bind(lead.id)
            .execute(&mut *conn)
            .await?;
    }

    sqlx::query("INSERT INTO lead_industries (lead_id, item_id) SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING")
        .bind(lead.id)
        .bind(&lead.industry_ids)
        .execute(&mut *conn)
        .await?;
    sqlx::query("INSERT INTO lead_services (lead_id, item_id) SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING")
        .bind(lead.id)
        .bind(&lead.service_ids)
        .execute(&mut *conn)
        .await?;

    let (field_ids, values): (Vec<Uuid>, Vec<String>) = lead
        .custom_fields
        .iter()
        .map(|v| (v.custom_field_id, v.value.clone()))
        .unzip();
    sqlx::query(
        r#"
        INSERT INTO lead_custom_values (lead_id, custom_field_id, value)
        SELECT $1, f.id, f.value FROM UNNEST($2::uuid[], $3::text[]) AS f(id, value)
        "#,
    )
    .bind(lead.id)
    .bind(&field_ids)
    .bind(&values)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn update_row(conn: &mut PgConnection, lead: &Lead) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE leads
        SET name = $2, email = $3, phone = $4, company = $5, source = $6, status = $7, stage_id = $8,
            owner_id = $9, location_id = $10, notes = $11, converted_contact_id = $12, updated_at = $13
        WHERE id = $1
        "#,
    )
    .bind(lead.id)
    .bind(&lead.name)
    .bind(&lead.email)
    .bind(&lead.phone)
    .bind(&lead.company)
    .bind(&lead.source)
    .bind(lead.status.as_str())
    .bind(lead.stage_id)
    .bind(lead.owner_id)
    .bind(lead.location_id)
    .bind(&lead.notes)
    .bind(lead.converted_contact_id)
    .bind(lead.updated_at)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

#[async_trait]
impl LeadRepository for PgLeadRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Lead>, DomainError> {
        let row: Option<LeadRow> = sqlx::query_as(&format!("{SELECT_LEADS} WHERE l.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("finding lead", e))?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &LeadFilter, pagination: Pagination) -> Result<PaginatedResult<Lead>, DomainError> {
        let pattern = search_pattern(&filter.search);
        let status = filter.status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM leads l {FILTER}"))
            .bind(status)
            .bind(filter.stage_id)
            .bind(filter.owner_id)
            .bind(filter.industry_id)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting leads", e))?;

        let rows: Vec<LeadRow> = sqlx::query_as(&format!(
            "{SELECT_LEADS} {FILTER} ORDER BY l.created_at DESC LIMIT $6 OFFSET $7"
        ))
        .bind(status)
        .bind(filter.stage_id)
        .bind(filter.owner_id)
        .bind(filter.industry_id)
        .bind(&pattern)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing leads", e))?;

        let leads = self.hydrate(rows).await?;
        Ok(PaginatedResult::new(leads, total, pagination))
    }

    async fn count(&self) -> Result<i64, DomainError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM leads")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting leads", e))
    }

    async fn count_by_status(&self) -> Result<Vec<(LeadStatus, i64)>, DomainError> {
        let rows: Vec<(String, i64)> = sqlx::query_as("SELECT status, COUNT(*) FROM leads GROUP BY status")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("counting leads by status", e))?;

        Ok(rows
            .into_iter()
            .filter_map(|(status, count)| LeadStatus::from_str(&status).map(|s| (s, count)))
            .collect())
    }

    async fn create(&self, lead: &Lead) -> Result<Lead, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO leads (id, name, email, phone, company, source, status, stage_id, owner_id, location_id,
                               notes, converted_contact_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(lead.id)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.company)
        .bind(&lead.source)
        .bind(lead.status.as_str())
        .bind(lead.stage_id)
        .bind(lead.owner_id)
        .bind(lead.location_id)
        .bind(&lead.notes)
        .bind(lead.converted_contact_id)
        .bind(lead.created_at)
        .bind(lead.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("creating lead", e))?;

        write_pivots(&mut tx, lead)
            .await
            .map_err(|e| db_error("writing lead pivots", e))?;
        tx.commit().await.map_err(|e| db_error("committing lead", e))?;

        info!("Lead created: {}", lead.id);
        Ok(lead.clone())
    }

    async fn update(&self, lead: &Lead) -> Result<Lead, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        let touched = update_row(&mut tx, lead)
            .await
            .map_err(|e| db_error("updating lead", e))?;
        if touched == 0 {
            return Err(DomainError::not_found("lead", lead.id));
        }
        write_pivots(&mut tx, lead)
            .await
            .map_err(|e| db_error("writing lead pivots", e))?;
        tx.commit().await.map_err(|e| db_error("committing lead", e))?;

        Ok(lead.clone())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        for table in ["lead_industries", "lead_services", "lead_custom_values"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE lead_id = $1"))
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error("detaching lead pivots", e))?;
        }
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("deleting lead", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("lead", id));
        }

        tx.commit().await.map_err(|e| db_error("committing lead delete", e))?;
        info!("Lead deleted: {}", id);
        Ok(())
    }

    async fn convert(&self, lead: &Lead, contact: &Contact, deal: Option<Deal>) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        // Guard against a concurrent conversion of the same lead.
        let claimed = sqlx::query(
            "UPDATE leads SET status = $2, converted_contact_id = $3, updated_at = $4 WHERE id = $1 AND status <> 'converted'",
        )
        .bind(lead.id)
        .bind(lead.status.as_str())
        .bind(lead.converted_contact_id)
        .bind(lead.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("converting lead", e))?
        .rows_affected();

        if claimed == 0 {
            warn!("Lead {} was converted concurrently", lead.id);
            return Err(DomainError::LeadAlreadyConverted);
        }

        insert_contact(&mut tx, contact)
            .await
            .map_err(|e| db_error("creating contact from lead", e))?;
        if let Some(deal) = &deal {
            insert_deal(&mut tx, deal)
                .await
                .map_err(|e| db_error("creating deal from lead", e))?;
        }

        tx.commit().await.map_err(|e| db_error("committing lead conversion", e))?;
        info!("Lead {} converted to contact {}", lead.id, contact.id);
        Ok(())
    }
}

// Database-backed; run with `DATABASE_URL=... cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::apply_tenant_schema;
    use crm_core::domain::NewLead;

    async fn pivot_rows(pool: &PgPool, lead_id: &Uuid) -> i64 {
        sqlx::query_scalar(
            r#"
            SELECT (SELECT COUNT(*) FROM lead_industries WHERE lead_id = $1)
                 + (SELECT COUNT(*) FROM lead_services WHERE lead_id = $1)
                 + (SELECT COUNT(*) FROM lead_custom_values WHERE lead_id = $1)
            "#,
        )
        .bind(lead_id)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_delete_detaches_pivots(pool: PgPool) {
        apply_tenant_schema(&pool).await.unwrap();
        let now = Utc::now();
        let (industry, service, field) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        sqlx::query(
            "INSERT INTO catalog_items (id, kind, name, created_at)
             VALUES ($1, 'industry', 'Retail', $3), ($2, 'service', 'Consulting', $3)",
        )
        .bind(industry)
        .bind(service)
        .bind(now)
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO custom_fields (id, name, field_type, created_at) VALUES ($1, 'Budget', 'number', $2)")
            .bind(field)
            .bind(now)
            .execute(&pool)
            .await
            .unwrap();

        let lead = Lead::new(NewLead {
            name: "Globex".into(),
            email: None,
            phone: None,
            company: None,
            source: None,
            status: None,
            stage_id: None,
            owner_id: None,
            location_id: None,
            notes: None,
            industry_ids: vec![industry],
            service_ids: vec![service],
            custom_fields: vec![CustomFieldValue { custom_field_id: field, value: "1500".into() }],
        })
        .unwrap();

        let repo = PgLeadRepository::new(pool.clone());
        repo.create(&lead).await.unwrap();
        assert_eq!(pivot_rows(&pool, &lead.id).await, 3);

        repo.delete(&lead.id).await.unwrap();
        assert_eq!(pivot_rows(&pool, &lead.id).await, 0);
        assert!(repo.find_by_id(&lead.id).await.unwrap().is_none());
        assert!(matches!(repo.delete(&lead.id).await, Err(DomainError::NotFound { .. })));
    }
}
