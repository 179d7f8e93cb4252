use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub reporter_id: String,

    /// Exactly one of `reported_user_id` / `reported_event_id` is set
    pub reported_user_id: Option<String>,

    pub reported_event_id: Option<String>,

    pub reason: String,

    pub description: Option<String>,

    pub status: String,

    pub created_at: String,

    pub reviewed_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
