// src/credits/service.rs
//! Credit account ledger.
//!
//! The one invariant that matters: a balance can never go negative. The
//! debit is a single conditional UPDATE whose affected-row count decides
//! the outcome, so two concurrent generations cannot both spend the last
//! credit even though the orchestrator's pre-flight balance read is
//! advisory only.

use sqlx::SqlitePool;
use tracing::{info, warn};

use super::models::{SubscriptionTier, UserCredits};

/// Outcome of an attempted debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    Debited,
    InsufficientCredits,
}

#[derive(Debug, Clone)]
pub struct CreditLedger {
    db: SqlitePool,
}

impl CreditLedger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Current balance; users without a credit row read as zero.
    pub async fn balance(&self, user_id: &str) -> Result<i64, sqlx::Error> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT balance FROM user_credits WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;
        Ok(row.map(|(b,)| b).unwrap_or(0))
    }

    /// Full account row, if one exists.
    pub async fn account(&self, user_id: &str) -> Result<Option<UserCredits>, sqlx::Error> {
        sqlx::query_as::<_, UserCredits>(
            "SELECT user_id, balance, subscription_tier, updated_at FROM user_credits WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
    }

    /// Take one credit. Atomic: the WHERE clause refuses the debit when the
    /// balance is already zero, and zero affected rows reports
    /// `InsufficientCredits` (covering the missing-account case too).
    pub async fn debit_one(&self, user_id: &str) -> Result<DebitOutcome, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE user_credits
            SET balance = balance - 1, updated_at = datetime('now')
            WHERE user_id = ? AND balance >= 1
            "#,
        )
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 1 {
            Ok(DebitOutcome::Debited)
        } else {
            Ok(DebitOutcome::InsufficientCredits)
        }
    }

    /// Give one credit back after a failed provider call.
    pub async fn refund_one(&self, user_id: &str) -> Result<(), sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE user_credits
            SET balance = balance + 1, updated_at = datetime('now')
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            // A refund without a prior debit should be impossible.
            warn!(user_id = %user_id, "Refund targeted a missing credit account");
        } else {
            info!(user_id = %user_id, "Credit refunded");
        }

        Ok(())
    }

    /// Add purchased credits and move the account to the tier. Creates the
    /// account when missing.
    pub async fn grant(
        &self,
        user_id: &str,
        credits: i64,
        tier: SubscriptionTier,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO user_credits (user_id, balance, subscription_tier, updated_at)
            VALUES (?, ?, ?, datetime('now'))
            ON CONFLICT(user_id) DO UPDATE SET
                balance = balance + excluded.balance,
                subscription_tier = excluded.subscription_tier,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(credits)
        .bind(tier.as_str())
        .execute(&self.db)
        .await?;

        info!(user_id = %user_id, credits = credits, tier = tier.as_str(), "Credits granted");

        Ok(())
    }

    /// Provision the starter account for a free-plan selection. A no-op if
    /// the user already has an account (re-selecting free must not top up).
    pub async fn ensure_account(
        &self,
        user_id: &str,
        tier: SubscriptionTier,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO user_credits (user_id, balance, subscription_tier, updated_at)
            VALUES (?, ?, ?, datetime('now'))
            "#,
        )
        .bind(user_id)
        .bind(tier.granted_credits())
        .bind(tier.as_str())
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::migrations::run_migrations;

    async fn ledger_with_user(balance: i64) -> CreditLedger {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        sqlx::query("INSERT INTO users (id, email) VALUES ('u1', 'u1@example.com')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO user_credits (user_id, balance, subscription_tier) VALUES ('u1', ?, 'free')",
        )
        .bind(balance)
        .execute(&pool)
        .await
        .unwrap();
        CreditLedger::new(pool)
    }

    #[tokio::test]
    async fn debit_reduces_balance() {
        let ledger = ledger_with_user(3).await;
        assert_eq!(ledger.debit_one("u1").await.unwrap(), DebitOutcome::Debited);
        assert_eq!(ledger.balance("u1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn debit_at_zero_reports_insufficient_and_stays_zero() {
        let ledger = ledger_with_user(0).await;
        assert_eq!(
            ledger.debit_one("u1").await.unwrap(),
            DebitOutcome::InsufficientCredits
        );
        assert_eq!(ledger.balance("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn debit_for_missing_account_is_insufficient() {
        let ledger = ledger_with_user(1).await;
        assert_eq!(
            ledger.debit_one("nobody").await.unwrap(),
            DebitOutcome::InsufficientCredits
        );
    }

    #[tokio::test]
    async fn refund_restores_balance() {
        let ledger = ledger_with_user(3).await;
        ledger.debit_one("u1").await.unwrap();
        ledger.refund_one("u1").await.unwrap();
        assert_eq!(ledger.balance("u1").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn exhausting_credits_debits_exactly_balance_times() {
        let ledger = ledger_with_user(3).await;
        let mut debits = 0;
        for _ in 0..5 {
            if ledger.debit_one("u1").await.unwrap() == DebitOutcome::Debited {
                debits += 1;
            }
        }
        assert_eq!(debits, 3);
        assert_eq!(ledger.balance("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn grant_tops_up_and_switches_tier() {
        let ledger = ledger_with_user(1).await;
        ledger.grant("u1", 100, SubscriptionTier::Pro).await.unwrap();
        assert_eq!(ledger.balance("u1").await.unwrap(), 101);
        let account = ledger.account("u1").await.unwrap().unwrap();
        assert_eq!(account.subscription_tier, "pro");
    }

    #[tokio::test]
    async fn ensure_account_does_not_top_up_existing() {
        let ledger = ledger_with_user(1).await;
        ledger
            .ensure_account("u1", SubscriptionTier::Free)
            .await
            .unwrap();
        assert_eq!(ledger.balance("u1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_account_reads_as_zero_balance() {
        let ledger = ledger_with_user(1).await;
        assert_eq!(ledger.balance("ghost").await.unwrap(), 0);
    }
}
