use anyhow::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};

use crate::entity::{
    Customers, Guardians, PhysicalProducts, Products, Sales, ServiceProducts, Subscriptions, Users,
};

pub type OrmConn = DatabaseConnection;

/// Create a SeaORM connection.
pub async fn create_orm_conn(database_url: &str) -> Result<OrmConn> {
    let conn = Database::connect(database_url).await?;
    Ok(conn)
}

/// Creates any missing table from its entity definition.
///
/// Tables are created in foreign key order; existing tables are left as they are.
pub async fn sync_schema(conn: &OrmConn) -> Result<()> {
    create_table(conn, Customers).await?;
    create_table(conn, Guardians).await?;
    create_table(conn, Users).await?;
    create_table(conn, Products).await?;
    create_table(conn, PhysicalProducts).await?;
    create_table(conn, ServiceProducts).await?;
    create_table(conn, Sales).await?;
    create_table(conn, Subscriptions).await?;
    Ok(())
}

async fn create_table<E: EntityTrait>(conn: &OrmConn, entity: E) -> Result<()> {
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);
    let table = entity.table_name().to_string();
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    conn.execute(backend.build(&stmt)).await?;
    tracing::debug!(%table, "table ensured");
    Ok(())
}
