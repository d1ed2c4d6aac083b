pub use sea_orm_migration::prelude::*;

mod m20240201_000001_create_chains_table;
mod m20240201_000002_create_evm_networks_table;
mod m20240201_000003_create_tokens_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240201_000001_create_chains_table::Migration),
            Box::new(m20240201_000002_create_evm_networks_table::Migration),
            Box::new(m20240201_000003_create_tokens_table::Migration)
        ]
    }
}
