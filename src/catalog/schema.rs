use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::filter::schema_filter_clause;
use crate::catalog::Oid;
use crate::connection::{CatalogConnection, CatalogQuery, CatalogRow};
use crate::error::CatalogResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub oid: Oid,
    pub name: String,
    /// Role name, not the role's identifier.
    pub owner: String,
}

pub const SCHEMAS_LABEL: &str = "schemas";

fn schemas_query() -> CatalogQuery {
    CatalogQuery::new(SCHEMAS_LABEL, format!(
        "SELECT n.oid::text AS oid, n.nspname::text AS name, pg_catalog.pg_get_userbyid(n.nspowner)::text AS owner
         FROM pg_catalog.pg_namespace n
         WHERE {}",
        schema_filter_clause("n")
    ))
}

fn decode(row: &CatalogRow) -> CatalogResult<Schema> {
    Ok(Schema { oid: row.oid("oid")?, name: row.text("name")?, owner: row.text("owner")? })
}

/// Every non-system schema, ordered by name.
pub async fn get_all_user_schemas<C: CatalogConnection + ?Sized>(conn: &C) -> CatalogResult<Vec<Schema>> {
    let rows = conn.fetch(&schemas_query()).await?;
    let mut schemas = rows.iter().map(decode).collect::<CatalogResult<Vec<_>>>()?;
    schemas.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(target: "predata::catalog", "found {} user schemas", schemas.len());
    Ok(schemas)
}
