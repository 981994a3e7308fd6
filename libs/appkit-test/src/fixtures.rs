//! Database fixtures.

use async_trait::async_trait;
use sea_orm::DatabaseConnection;

/// One unit of seed data, loaded after schema provisioning.
#[async_trait]
pub trait Fixture: Send + Sync {
    async fn load(&self, conn: &DatabaseConnection) -> anyhow::Result<()>;
}
