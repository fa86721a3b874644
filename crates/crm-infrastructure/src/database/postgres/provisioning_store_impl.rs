// ============================================================================
// CRM Infrastructure - PostgreSQL Provisioning Store
// File: crates/crm-infrastructure/src/database/postgres/provisioning_store_impl.rs
// Description: Multi-row central writes, one transaction each
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crm_core::domain::{PaymentSettlement, ProvisioningRecord, RenewalRecord, Subscription, Tenant};
use crm_core::error::DomainError;
use crm_core::repositories::ProvisioningStore;

use super::billing_repo_impl::{insert_invoice, insert_subscription, update_subscription};
use super::tenant_repo_impl::{insert_domain, insert_tenant, update_tenant};
use super::{conflict_or, db_error};

pub struct PgProvisioningStore {
    pool: PgPool,
}

impl PgProvisioningStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Marks an activation code used. The status guard makes concurrent
/// redemptions of the same code race on the row lock; the loser sees 0 rows.
async fn redeem_activation_code(
    conn: &mut PgConnection,
    code_id: &Uuid,
    client_id: &Uuid,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    let result = sqlx::query(
        r#"
        UPDATE activation_codes
        SET status = 'used', used_by_client_id = $2, used_at = $3
        WHERE id = $1 AND status = 'unused'
        "#,
    )
    .bind(code_id)
    .bind(client_id)
    .bind(now)
    .execute(conn)
    .await
    .map_err(|e| db_error("redeeming activation code", e))?;

    if result.rows_affected() == 0 {
        warn!("Activation code {} was redeemed concurrently", code_id);
        return Err(DomainError::ActivationCodeAlreadyUsed);
    }
    Ok(())
}

async fn redeem_discount_code(conn: &mut PgConnection, code_id: &Uuid) -> Result<(), DomainError> {
    let result = sqlx::query(
        r#"
        UPDATE discount_codes
        SET used_count = used_count + 1
        WHERE id = $1 AND is_active AND (max_uses IS NULL OR used_count < max_uses)
        "#,
    )
    .bind(code_id)
    .execute(conn)
    .await
    .map_err(|e| db_error("redeeming discount code", e))?;

    if result.rows_affected() == 0 {
        return Err(DomainError::DiscountNotApplicable("usage limit reached".to_string()));
    }
    Ok(())
}

async fn save_tenant(conn: &mut PgConnection, tenant: &Tenant) -> Result<(), DomainError> {
    let touched = update_tenant(conn, tenant)
        .await
        .map_err(|e| db_error("updating tenant", e))?;
    if touched == 0 {
        return Err(DomainError::not_found("tenant", tenant.id));
    }
    Ok(())
}

async fn save_subscription(conn: &mut PgConnection, subscription: &Subscription) -> Result<(), DomainError> {
    let touched = update_subscription(conn, subscription)
        .await
        .map_err(|e| db_error("updating subscription", e))?;
    if touched == 0 {
        return Err(DomainError::not_found("subscription", subscription.id));
    }
    Ok(())
}

#[async_trait]
impl ProvisioningStore for PgProvisioningStore {
    async fn commit_provisioning(&self, record: &ProvisioningRecord) -> Result<(), DomainError> {
        let client_id = record.subscription.client_id;
        let now = record.subscription.created_at;
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        if let Some(code_id) = &record.activation_code_id {
            redeem_activation_code(&mut tx, code_id, &client_id, now).await?;
        }
        if let Some(code_id) = &record.discount_code_id {
            redeem_discount_code(&mut tx, code_id).await?;
        }

        insert_subscription(&mut tx, &record.subscription)
            .await
            .map_err(|e| db_error("inserting subscription", e))?;
        insert_invoice(&mut tx, &record.invoice)
            .await
            .map_err(|e| db_error("inserting invoice", e))?;
        insert_tenant(&mut tx, &record.tenant)
            .await
            .map_err(|e| conflict_or("inserting tenant", e, |_| DomainError::TenantAlreadyExists(client_id)))?;
        insert_domain(&mut tx, &record.domain)
            .await
            .map_err(|e| conflict_or("inserting domain", e, |_| DomainError::DomainAlreadyExists(record.domain.domain.clone())))?;

        sqlx::query("UPDATE clients SET status = 'active', updated_at = $2 WHERE id = $1")
            .bind(client_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("activating client", e))?;

        tx.commit().await.map_err(|e| db_error("committing provisioning", e))?;
        info!("Provisioning committed for client {} (tenant {})", client_id, record.tenant.id);
        Ok(())
    }

    async fn commit_renewal(&self, record: &RenewalRecord) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        if let Some(code_id) = &record.activation_code_id {
            redeem_activation_code(&mut tx, code_id, &record.subscription.client_id, record.subscription.created_at)
                .await?;
        }
        insert_subscription(&mut tx, &record.subscription)
            .await
            .map_err(|e| db_error("inserting renewal subscription", e))?;
        insert_invoice(&mut tx, &record.invoice)
            .await
            .map_err(|e| db_error("inserting renewal invoice", e))?;
        if let Some(tenant) = &record.tenant {
            save_tenant(&mut tx, tenant).await?;
        }

        tx.commit().await.map_err(|e| db_error("committing renewal", e))?;
        info!("Renewal committed: subscription {}", record.subscription.id);
        Ok(())
    }

    async fn commit_settlement(&self, settlement: &PaymentSettlement) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        // Only an invoice that is still payable may be settled; a concurrent
        // callback for the same invoice finds it paid and touches nothing.
        let touched = sqlx::query(
            r#"
            UPDATE invoices
            SET status = $2, paid_at = $3, payment_reference = $4, updated_at = $5
            WHERE id = $1 AND status IN ('unpaid', 'overdue')
            "#,
        )
        .bind(settlement.invoice.id)
        .bind(settlement.invoice.status.as_str())
        .bind(settlement.invoice.paid_at)
        .bind(&settlement.invoice.payment_reference)
        .bind(settlement.invoice.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("settling invoice", e))?
        .rows_affected();

        if touched == 0 {
            warn!("Invoice {} was settled concurrently", settlement.invoice.number);
            return Err(DomainError::transition("invoice", "paid", settlement.invoice.status));
        }

        save_subscription(&mut tx, &settlement.subscription).await?;
        if let Some(tenant) = &settlement.tenant {
            save_tenant(&mut tx, tenant).await?;
        }

        tx.commit().await.map_err(|e| db_error("committing settlement", e))?;
        info!("Invoice {} settled", settlement.invoice.number);
        Ok(())
    }

    async fn commit_subscription_change(
        &self,
        subscription: &Subscription,
        tenant: Option<Tenant>,
    ) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        save_subscription(&mut tx, subscription).await?;
        if let Some(tenant) = &tenant {
            save_tenant(&mut tx, tenant).await?;
        }

        tx.commit().await.map_err(|e| db_error("committing subscription change", e))?;
        Ok(())
    }
}

// Database-backed; run with `DATABASE_URL=... cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::run_central_migrations;

    async fn seed_code(pool: &PgPool) -> (Uuid, Uuid) {
        let now = Utc::now();
        let tier_id = Uuid::new_v4();
        let client_id = Uuid::new_v4();
        let code_id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO tiers (id, name, price_cents, currency, duration_days, modules, max_users, created_at, updated_at)
             VALUES ($1, 'Starter', 0, 'USD', 30, '{leads}', 5, $2, $2)",
        )
        .bind(tier_id)
        .bind(now)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO clients (id, name, email, subdomain, created_at, updated_at)
             VALUES ($1, 'Acme', 'owner@acme.test', 'acme', $2, $2)",
        )
        .bind(client_id)
        .bind(now)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO activation_codes (id, code, tier_id, created_at) VALUES ($1, 'ABCD-EFGH-JKLM-NPQR', $2, $3)")
            .bind(code_id)
            .bind(tier_id)
            .bind(now)
            .execute(pool)
            .await
            .unwrap();

        (code_id, client_id)
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_activation_code_redeems_once(pool: PgPool) {
        run_central_migrations(&pool).await.unwrap();
        let (code_id, client_id) = seed_code(&pool).await;
        let mut conn = pool.acquire().await.unwrap();

        redeem_activation_code(&mut conn, &code_id, &client_id, Utc::now()).await.unwrap();
        let second = redeem_activation_code(&mut conn, &code_id, &client_id, Utc::now()).await;
        assert!(matches!(second, Err(DomainError::ActivationCodeAlreadyUsed)));

        let (status, used_by): (String, Option<Uuid>) =
            sqlx::query_as("SELECT status, used_by_client_id FROM activation_codes WHERE id = $1")
                .bind(code_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(status, "used");
        assert_eq!(used_by, Some(client_id));
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_discount_usage_limit_guard(pool: PgPool) {
        run_central_migrations(&pool).await.unwrap();
        let code_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO discount_codes (id, code, kind, value, max_uses, created_at)
             VALUES ($1, 'LAUNCH', 'percent', 20, 1, $2)",
        )
        .bind(code_id)
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap();
        let mut conn = pool.acquire().await.unwrap();

        redeem_discount_code(&mut conn, &code_id).await.unwrap();
        let second = redeem_discount_code(&mut conn, &code_id).await;
        assert!(matches!(second, Err(DomainError::DiscountNotApplicable(_))));

        let used: i32 = sqlx::query_scalar("SELECT used_count FROM discount_codes WHERE id = $1")
            .bind(code_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(used, 1);
    }
}
