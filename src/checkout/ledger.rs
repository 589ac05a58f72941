//! Postgres record of payment attempts and their callback outcomes.

use sqlx::PgPool;
use uuid::Uuid;

use crate::checkout::{PaymentOutcome, PaymentRedirect};
use crate::domain::Money;
use crate::Result;

/// Without a pool every call is a logged no-op.
#[derive(Clone, Debug, Default)]
pub struct PaymentLedger {
    pool: Option<PgPool>,
}

impl PaymentLedger {
    pub fn new(pool: PgPool) -> Self { Self { pool: Some(pool) } }
    pub fn disabled() -> Self { Self::default() }
    pub fn is_enabled(&self) -> bool { self.pool.is_some() }

    pub async fn record_initiated(&self, session: &str, description: &str, redirect: &PaymentRedirect) -> Result<()> {
        let Some(pool) = &self.pool else {
            tracing::debug!(session, track_id = ?redirect.track_id, "ledger disabled; payment attempt not recorded");
            return Ok(());
        };
        sqlx::query("INSERT INTO payment_attempts (id, session_id, track_id, amount, description, payment_url, status, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, 'initiated', NOW(), NOW())")
            .bind(Uuid::now_v7()).bind(session).bind(&redirect.track_id).bind(redirect.amount.amount())
            .bind(description).bind(&redirect.payment_url)
            .execute(pool).await?;
        Ok(())
    }

    pub async fn record_failed(&self, session: &str, description: &str, amount: Money, reason: &str) -> Result<()> {
        let Some(pool) = &self.pool else {
            tracing::debug!(session, reason, "ledger disabled; failed attempt not recorded");
            return Ok(());
        };
        sqlx::query("INSERT INTO payment_attempts (id, session_id, amount, description, status, failure_reason, created_at, updated_at) VALUES ($1, $2, $3, $4, 'failed', $5, NOW(), NOW())")
            .bind(Uuid::now_v7()).bind(session).bind(amount.amount()).bind(description).bind(reason)
            .execute(pool).await?;
        Ok(())
    }

    /// Returns the number of attempts the callback matched.
    pub async fn record_outcome(&self, outcome: &PaymentOutcome) -> Result<u64> {
        let (Some(pool), Some(track_id)) = (&self.pool, &outcome.track_id) else {
            tracing::debug!(track_id = ?outcome.track_id, "payment outcome not recorded");
            return Ok(0);
        };
        let status = if outcome.success { "paid" } else { "failed" };
        let result = sqlx::query("UPDATE payment_attempts SET status = $2, provider_status = $3, updated_at = NOW() WHERE track_id = $1")
            .bind(track_id).bind(status).bind(&outcome.status)
            .execute(pool).await?;
        Ok(result.rows_affected())
    }
}
