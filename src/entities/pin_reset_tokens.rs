use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "pin_reset_tokens")]
pub struct Model {
    /// 64-char hex string
    #[sea_orm(primary_key, auto_increment = false)]
    pub token: String,

    pub user_id: String,

    pub expires_at: String,

    pub used_at: Option<String>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
