use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::db::timestamp;
use crate::entities::prelude::*;
use crate::entities::{blocked_users, follows};

/// Follow edges and blocks between users.
pub struct SocialRepository {
    conn: DatabaseConnection,
}

impl SocialRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn follow(&self, follower_id: &str, following_id: &str) -> Result<()> {
        let model = follows::ActiveModel {
            follower_id: Set(follower_id.to_string()),
            following_id: Set(following_id.to_string()),
            created_at: Set(timestamp(Utc::now())),
        };

        Follows::insert(model)
            .exec_without_returning(&self.conn)
            .await
            .context("Failed to insert follow")?;
        Ok(())
    }

    /// Returns false if there was no such edge.
    pub async fn unfollow(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        let result = Follows::delete_many()
            .filter(follows::Column::FollowerId.eq(follower_id))
            .filter(follows::Column::FollowingId.eq(following_id))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn is_following(&self, follower_id: &str, following_id: &str) -> Result<bool> {
        let count = Follows::find()
            .filter(follows::Column::FollowerId.eq(follower_id))
            .filter(follows::Column::FollowingId.eq(following_id))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    /// Ids of users following `user_id`, newest first.
    pub async fn follower_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let ids = Follows::find()
            .select_only()
            .column(follows::Column::FollowerId)
            .filter(follows::Column::FollowingId.eq(user_id))
            .order_by_desc(follows::Column::CreatedAt)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to list followers")?;
        Ok(ids)
    }

    /// Ids of users `user_id` follows, newest first.
    pub async fn following_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let ids = Follows::find()
            .select_only()
            .column(follows::Column::FollowingId)
            .filter(follows::Column::FollowerId.eq(user_id))
            .order_by_desc(follows::Column::CreatedAt)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to list following")?;
        Ok(ids)
    }

    /// Records the block and drops follow edges in both directions.
    pub async fn block(&self, blocker_id: &str, blocked_id: &str) -> Result<()> {
        let txn = self.conn.begin().await?;

        BlockedUsers::insert(blocked_users::ActiveModel {
            blocker_id: Set(blocker_id.to_string()),
            blocked_id: Set(blocked_id.to_string()),
            created_at: Set(timestamp(Utc::now())),
        })
        .exec_without_returning(&txn)
        .await
        .context("Failed to insert block")?;

        Follows::delete_many()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(follows::Column::FollowerId.eq(blocker_id))
                            .add(follows::Column::FollowingId.eq(blocked_id)),
                    )
                    .add(
                        Condition::all()
                            .add(follows::Column::FollowerId.eq(blocked_id))
                            .add(follows::Column::FollowingId.eq(blocker_id)),
                    ),
            )
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    pub async fn unblock(&self, blocker_id: &str, blocked_id: &str) -> Result<bool> {
        let result = BlockedUsers::delete_many()
            .filter(blocked_users::Column::BlockerId.eq(blocker_id))
            .filter(blocked_users::Column::BlockedId.eq(blocked_id))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn has_blocked(&self, blocker_id: &str, blocked_id: &str) -> Result<bool> {
        let count = BlockedUsers::find()
            .filter(blocked_users::Column::BlockerId.eq(blocker_id))
            .filter(blocked_users::Column::BlockedId.eq(blocked_id))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    /// True if either user blocked the other.
    pub async fn is_blocked_either_way(&self, a: &str, b: &str) -> Result<bool> {
        Ok(self.has_blocked(a, b).await? || self.has_blocked(b, a).await?)
    }

    pub async fn blocked_ids(&self, blocker_id: &str) -> Result<Vec<String>> {
        let ids = BlockedUsers::find()
            .select_only()
            .column(blocked_users::Column::BlockedId)
            .filter(blocked_users::Column::BlockerId.eq(blocker_id))
            .order_by_desc(blocked_users::Column::CreatedAt)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to list blocked users")?;
        Ok(ids)
    }
}
