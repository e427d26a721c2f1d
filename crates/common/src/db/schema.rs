//! Table creation from the entity definitions

use sea_orm::{ConnectionTrait, EntityTrait, Schema};
use tracing::{debug, info};

use crate::db::models::*;
use crate::errors::Result;

/// Create every table that does not exist yet.
///
/// Tables are created parents first so that foreign keys always point at an
/// existing table.
pub async fn create_schema<C: ConnectionTrait>(conn: &C) -> Result<()> {
    create_table(conn, PublisherEntity).await?;
    create_table(conn, InstitutionEntity).await?;
    create_table(conn, PricingPolicyEntity).await?;
    create_table(conn, JournalEntity).await?;
    create_table(conn, AuthorEntity).await?;
    create_table(conn, ArticleEntity).await?;
    create_table(conn, TransactionEntity).await?;
    create_table(conn, AgreementEntity).await?;
    create_table(conn, AgreementJournalEntity).await?;

    info!("Schema ready");
    Ok(())
}

async fn create_table<C, E>(conn: &C, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);

    debug!(table = entity.table_name(), "Creating table");

    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();

    conn.execute(backend.build(&stmt)).await?;
    Ok(())
}
