use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QuerySelect, Set, TransactionTrait,
};

use crate::db::timestamp;
use crate::domain::AgeCategory;
use crate::entities::prelude::*;
use crate::entities::{
    blocked_users, event_participants, events, follows, parental_controls, password_reset_tokens,
    pin_attempts, pin_reset_tokens, reports, users,
};

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub date_of_birth: Option<String>,
    pub age_category: AgeCategory,
    pub guardian_email: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            username: model.username,
            email: model.email,
            date_of_birth: model.date_of_birth,
            // Rows are only ever written through `AgeCategory::as_str`
            age_category: model.age_category.parse().unwrap_or(AgeCategory::Adult),
            guardian_email: model.guardian_email,
            profile_picture: model.profile_picture,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub date_of_birth: Option<String>,
    pub age_category: AgeCategory,
    pub guardian_email: Option<String>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, user: NewUser) -> Result<User> {
        let now = timestamp(Utc::now());

        let model = users::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            name: Set(user.name),
            username: Set(user.username),
            email: Set(user.email),
            password_hash: Set(user.password_hash),
            date_of_birth: Set(user.date_of_birth),
            age_category: Set(user.age_category.as_str().to_string()),
            guardian_email: Set(user.guardian_email),
            profile_picture: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert user")?;

        Ok(User::from(model))
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = Users::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = Users::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    /// First minor account registered under this guardian address.
    pub async fn get_by_guardian_email(&self, guardian_email: &str) -> Result<Option<User>> {
        let user = Users::find()
            .filter(users::Column::GuardianEmail.eq(guardian_email))
            .filter(users::Column::AgeCategory.eq(AgeCategory::Minor.as_str()))
            .one(&self.conn)
            .await
            .context("Failed to query user by guardian email")?;

        Ok(user.map(User::from))
    }

    /// User plus password hash, for credential checks
    pub async fn get_by_email_with_password(&self, email: &str) -> Result<Option<(User, String)>> {
        let user = Users::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        Ok(user.map(|u| {
            let password_hash = u.password_hash.clone();
            (User::from(u), password_hash)
        }))
    }

    pub async fn username_taken(&self, username: &str) -> Result<bool> {
        let count = Users::find()
            .filter(users::Column::Username.eq(username))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    pub async fn email_taken(&self, email: &str) -> Result<bool> {
        let count = Users::find()
            .filter(users::Column::Email.eq(email))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    pub async fn set_age_category(&self, id: &str, category: AgeCategory) -> Result<()> {
        Users::update_many()
            .col_expr(
                users::Column::AgeCategory,
                sea_orm::sea_query::Expr::value(category.as_str()),
            )
            .col_expr(
                users::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(timestamp(Utc::now())),
            )
            .filter(users::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to update age category")?;
        Ok(())
    }

    /// Returns `(followers, following)`.
    pub async fn follow_counts(&self, id: &str) -> Result<(u64, u64)> {
        let followers = Follows::find()
            .filter(follows::Column::FollowingId.eq(id))
            .count(&self.conn)
            .await?;
        let following = Follows::find()
            .filter(follows::Column::FollowerId.eq(id))
            .count(&self.conn)
            .await?;
        Ok((followers, following))
    }

    pub async fn get_many(&self, ids: &[String]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let users = Users::find()
            .filter(users::Column::Id.is_in(ids.iter().cloned()))
            .all(&self.conn)
            .await
            .context("Failed to query users by IDs")?;

        Ok(users.into_iter().map(User::from).collect())
    }

    /// Deletes the account and everything that references it.
    ///
    /// Runs in a single transaction: participations, owned events (with their
    /// participants and reports), follows, blocks, reports, tokens, parental
    /// rows, then the user row. Returns false if the user did not exist.
    pub async fn delete_cascade(&self, id: &str) -> Result<bool> {
        let txn = self.conn.begin().await?;

        EventParticipants::delete_many()
            .filter(event_participants::Column::UserId.eq(id))
            .exec(&txn)
            .await?;

        let owned_events: Vec<String> = Events::find()
            .select_only()
            .column(events::Column::Id)
            .filter(events::Column::CreatedBy.eq(id))
            .into_tuple()
            .all(&txn)
            .await?;

        if !owned_events.is_empty() {
            EventParticipants::delete_many()
                .filter(event_participants::Column::EventId.is_in(owned_events.clone()))
                .exec(&txn)
                .await?;
            Reports::delete_many()
                .filter(reports::Column::ReportedEventId.is_in(owned_events.clone()))
                .exec(&txn)
                .await?;
            Events::delete_many()
                .filter(events::Column::Id.is_in(owned_events))
                .exec(&txn)
                .await?;
        }

        Follows::delete_many()
            .filter(
                Condition::any()
                    .add(follows::Column::FollowerId.eq(id))
                    .add(follows::Column::FollowingId.eq(id)),
            )
            .exec(&txn)
            .await?;

        BlockedUsers::delete_many()
            .filter(
                Condition::any()
                    .add(blocked_users::Column::BlockerId.eq(id))
                    .add(blocked_users::Column::BlockedId.eq(id)),
            )
            .exec(&txn)
            .await?;

        Reports::delete_many()
            .filter(
                Condition::any()
                    .add(reports::Column::ReporterId.eq(id))
                    .add(reports::Column::ReportedUserId.eq(id)),
            )
            .exec(&txn)
            .await?;

        PasswordResetTokens::delete_many()
            .filter(password_reset_tokens::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        PinResetTokens::delete_many()
            .filter(pin_reset_tokens::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        PinAttempts::delete_many()
            .filter(pin_attempts::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        ParentalControls::delete_many()
            .filter(parental_controls::Column::UserId.eq(id))
            .exec(&txn)
            .await?;

        let deleted = Users::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(deleted.rows_affected > 0)
    }
}
