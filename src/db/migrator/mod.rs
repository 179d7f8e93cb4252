use sea_orm_migration::prelude::*;

mod m20250601_initial;
mod m20250710_add_moderation;
mod m20250902_add_parental_controls;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_initial::Migration),
            Box::new(m20250710_add_moderation::Migration),
            Box::new(m20250902_add_parental_controls::Migration),
        ]
    }
}
