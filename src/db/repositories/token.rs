use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait, sea_query::Expr,
};

use crate::db::{parse_timestamp, timestamp};
use crate::entities::prelude::*;
use crate::entities::{password_reset_tokens, users};

use super::parental::ResetToken;

impl From<password_reset_tokens::Model> for ResetToken {
    fn from(model: password_reset_tokens::Model) -> Self {
        Self {
            expires_at: parse_timestamp(&model.expires_at),
            used: model.used_at.is_some(),
            token: model.token,
            user_id: model.user_id,
        }
    }
}

pub struct PasswordResetRepository {
    conn: DatabaseConnection,
}

impl PasswordResetRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Stores a new token, replacing any the user already had.
    pub async fn issue(&self, user_id: &str, token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let txn = self.conn.begin().await?;

        PasswordResetTokens::delete_many()
            .filter(password_reset_tokens::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        password_reset_tokens::ActiveModel {
            token: Set(token.to_string()),
            user_id: Set(user_id.to_string()),
            expires_at: Set(timestamp(expires_at)),
            used_at: Set(None),
            created_at: Set(timestamp(Utc::now())),
        }
        .insert(&txn)
        .await
        .context("Failed to insert password reset token")?;

        txn.commit().await?;
        Ok(())
    }

    pub async fn find(&self, token: &str) -> Result<Option<ResetToken>> {
        let row = PasswordResetTokens::find_by_id(token)
            .one(&self.conn)
            .await
            .context("Failed to query password reset token")?;

        Ok(row.map(ResetToken::from))
    }

    /// Marks the token used and stores the new password hash. Returns false
    /// if another request consumed the token first.
    pub async fn redeem(
        &self,
        token: &str,
        user_id: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let txn = self.conn.begin().await?;
        let now_str = timestamp(now);

        let marked = PasswordResetTokens::update_many()
            .col_expr(
                password_reset_tokens::Column::UsedAt,
                Expr::value(now_str.clone()),
            )
            .filter(password_reset_tokens::Column::Token.eq(token))
            .filter(password_reset_tokens::Column::UsedAt.is_null())
            .exec(&txn)
            .await?;

        if marked.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        Users::update_many()
            .col_expr(users::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(users::Column::UpdatedAt, Expr::value(now_str))
            .filter(users::Column::Id.eq(user_id))
            .exec(&txn)
            .await
            .context("Failed to update password")?;

        txn.commit().await?;
        Ok(true)
    }

    pub async fn purge(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = PasswordResetTokens::delete_many()
            .filter(
                Condition::any()
                    .add(password_reset_tokens::Column::ExpiresAt.lte(timestamp(now)))
                    .add(password_reset_tokens::Column::UsedAt.is_not_null()),
            )
            .exec(&self.conn)
            .await
            .context("Failed to purge password reset tokens")?;

        Ok(result.rows_affected)
    }
}
