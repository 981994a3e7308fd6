//! Schema provisioning through `sea-orm-migration` migrators.
//!
//! The functional test harness brackets a test run with
//! [`SchemaProvisioner::provision`] and [`SchemaProvisioner::drop_all`];
//! deployments use [`SchemaProvisioner::update`] to apply pending
//! migrations in place.

use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::debug;

use crate::Result;

pub struct SchemaProvisioner;

impl SchemaProvisioner {
    /// Create the schema: apply every migration not yet recorded.
    ///
    /// # Errors
    /// Surfaces the first failing migration.
    pub async fn provision<M: MigratorTrait>(conn: &DatabaseConnection) -> Result<()> {
        M::up(conn, None).await?;
        debug!("schema provisioned");
        Ok(())
    }

    /// Force-update the schema to the latest migration. Identical to
    /// [`provision`](Self::provision) today; kept separate because callers
    /// mean different things by it.
    ///
    /// # Errors
    /// Surfaces the first failing migration.
    pub async fn update<M: MigratorTrait>(conn: &DatabaseConnection) -> Result<()> {
        M::up(conn, None).await?;
        Ok(())
    }

    /// Revert every applied migration, dropping the schema objects.
    ///
    /// # Errors
    /// Surfaces the first failing rollback.
    pub async fn drop_all<M: MigratorTrait>(conn: &DatabaseConnection) -> Result<()> {
        M::reset(conn).await?;
        debug!("schema dropped");
        Ok(())
    }

    /// Number of migrations not yet applied.
    ///
    /// # Errors
    /// Surfaces migration-table query errors.
    pub async fn pending<M: MigratorTrait>(conn: &DatabaseConnection) -> Result<usize> {
        Ok(M::get_pending_migrations(conn).await?.len())
    }
}
