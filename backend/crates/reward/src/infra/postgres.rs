//! PostgreSQL Repository Implementations
//!
//! One [`PgLedgerUnit`] is one database transaction. The balance row is taken
//! with `FOR NO KEY UPDATE`, which serializes units on the same user without
//! conflicting with the key-share locks that commission foreign keys take.

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::entities::{NewCommission, NewRewardRecord, RewardRecord};
use crate::domain::repository::{AccountDirectory, LedgerStore, LedgerUnit};
use crate::domain::value_objects::{CommissionId, RewardAmount, RewardKind, RewardRecordId};
use crate::error::{RewardError, RewardResult};

/// PostgreSQL-backed repository
#[derive(Clone)]
pub struct PgRewardRepository {
    pool: PgPool,
}

impl PgRewardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn user_exists(&self, user_id: &UserId) -> RewardResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE user_id = $1)",
        )
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

impl LedgerStore for PgRewardRepository {
    type Unit = PgLedgerUnit;

    async fn begin(&self) -> RewardResult<PgLedgerUnit> {
        let tx = self.pool.begin().await?;
        Ok(PgLedgerUnit { tx })
    }

    async fn balance(&self, user_id: &UserId) -> RewardResult<RewardAmount> {
        let amount = sqlx::query_scalar::<_, i64>(
            "SELECT reward_amount FROM users WHERE user_id = $1",
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RewardError::UserNotFound)?;

        RewardAmount::from_db(amount)
    }

    async fn list_records(&self, user_id: &UserId) -> RewardResult<Vec<RewardRecord>> {
        let rows = sqlx::query_as::<_, RewardRecordRow>(
            r#"
            SELECT
                reward_record_id,
                user_id,
                amount,
                reward_kind,
                origin,
                created_at
            FROM reward_records
            WHERE user_id = $1
            ORDER BY created_at, reward_record_id
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() && !self.user_exists(user_id).await? {
            return Err(RewardError::UserNotFound);
        }

        rows.into_iter().map(RewardRecordRow::into_record).collect()
    }
}

impl AccountDirectory for PgRewardRepository {
    async fn resolve_referral_code(&self, referral_code: &str) -> RewardResult<Option<UserId>> {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM users WHERE referral_code = $1",
        )
        .bind(referral_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user_id.map(UserId::from_uuid))
    }
}

/// One open transaction; dropped without `commit` it rolls back
pub struct PgLedgerUnit {
    tx: Transaction<'static, Postgres>,
}

impl LedgerUnit for PgLedgerUnit {
    async fn lock_balance(&mut self, user_id: &UserId) -> RewardResult<RewardAmount> {
        let amount = sqlx::query_scalar::<_, i64>(
            "SELECT reward_amount FROM users WHERE user_id = $1 FOR NO KEY UPDATE",
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(RewardError::UserNotFound)?;

        RewardAmount::from_db(amount)
    }

    async fn set_balance(&mut self, user_id: &UserId, amount: RewardAmount) -> RewardResult<()> {
        let updated = sqlx::query(
            "UPDATE users SET reward_amount = $2, updated_at = now() WHERE user_id = $1",
        )
        .bind(user_id.as_uuid())
        .bind(amount.value())
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(RewardError::UserNotFound);
        }
        Ok(())
    }

    async fn append_record(&mut self, record: NewRewardRecord) -> RewardResult<RewardRecord> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO reward_records (
                user_id,
                amount,
                reward_kind,
                origin,
                created_at
            ) VALUES ($1, $2, $3, $4, $5)
            RETURNING reward_record_id
            "#,
        )
        .bind(record.user_id.as_uuid())
        .bind(record.amount.value())
        .bind(record.kind.id())
        .bind(&record.origin)
        .bind(record.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(record.into_record(RewardRecordId::new(id)))
    }

    async fn commission_exists(
        &mut self,
        payer_user_id: &UserId,
        invited_user_id: &UserId,
    ) -> RewardResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM commissions
                WHERE payer_user_id = $1 AND invited_user_id = $2
            )
            "#,
        )
        .bind(payer_user_id.as_uuid())
        .bind(invited_user_id.as_uuid())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(exists)
    }

    async fn insert_commission(
        &mut self,
        commission: &NewCommission,
    ) -> RewardResult<Option<CommissionId>> {
        // A concurrent insert of the same pair blocks here until the other
        // transaction ends, then yields no row.
        let result = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO commissions (
                payer_user_id,
                invited_user_id,
                amount,
                commission_status,
                created_at
            ) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (payer_user_id, invited_user_id) DO NOTHING
            RETURNING commission_id
            "#,
        )
        .bind(commission.payer_user_id.as_uuid())
        .bind(commission.invited_user_id.as_uuid())
        .bind(commission.amount.value())
        .bind(commission.status.id())
        .bind(commission.created_at)
        .fetch_optional(&mut *self.tx)
        .await;

        match result {
            Ok(id) => Ok(id.map(CommissionId::new)),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                tracing::warn!(
                    payer_user_id = %commission.payer_user_id,
                    invited_user_id = %commission.invited_user_id,
                    "Commission unique constraint hit, treated as duplicate"
                );
                Ok(None)
            }
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Err(RewardError::UserNotFound)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn commit(self) -> RewardResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

// Internal row types for sqlx mapping
#[derive(sqlx::FromRow)]
struct RewardRecordRow {
    reward_record_id: i64,
    user_id: Uuid,
    amount: i64,
    reward_kind: i16,
    origin: String,
    created_at: DateTime<Utc>,
}

impl RewardRecordRow {
    fn into_record(self) -> RewardResult<RewardRecord> {
        Ok(RewardRecord {
            id: RewardRecordId::new(self.reward_record_id),
            user_id: UserId::from_uuid(self.user_id),
            amount: RewardAmount::from_db(self.amount)?,
            kind: RewardKind::from_id(self.reward_kind)?,
            origin: self.origin,
            created_at: self.created_at,
        })
    }
}
