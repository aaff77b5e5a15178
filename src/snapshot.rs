//! One extraction pass: every extractor run in turn against the same
//! connection, narrowed by an optional schema filter.
//!
//! Consistency across extractors is whatever the connection's isolation
//! level gives; pass a REPEATABLE READ transaction for a coherent snapshot.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::filter::SchemaFilter;
use crate::catalog::{
    get_all_user_schemas, get_operator_classes, get_operator_families, get_operators, get_procedural_languages,
    Operator, OperatorClass, OperatorFamily, ProceduralLanguage, Schema,
};
use crate::connection::{CatalogConnection, ServerVersion};
use crate::error::CatalogResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredataSnapshot {
    pub server_version: ServerVersion,
    pub schemas: Vec<Schema>,
    /// Languages are database-wide and never narrowed by the schema filter.
    pub languages: Vec<ProceduralLanguage>,
    pub operators: Vec<Operator>,
    pub operator_families: Vec<OperatorFamily>,
    pub operator_classes: Vec<OperatorClass>,
}

impl PredataSnapshot {
    pub fn object_count(&self) -> usize {
        self.schemas.len() + self.languages.len() + self.operators.len() + self.operator_families.len() + self.operator_classes.len()
    }
}

/// Run every extractor sequentially. Any failure aborts the whole pass.
pub async fn extract_all<C: CatalogConnection + ?Sized>(conn: &C, filter: &SchemaFilter) -> CatalogResult<PredataSnapshot> {
    let server_version = conn.server_version().await?;
    server_version.ensure_supported()?;

    let mut schemas = get_all_user_schemas(conn).await?;
    for wanted in &filter.include {
        if !schemas.iter().any(|s| &s.name == wanted) {
            warn!(target: "predata::snapshot", "included schema '{}' does not exist", wanted);
        }
    }
    schemas.retain(|s| filter.matches(&s.name));

    let languages = get_procedural_languages(conn).await?;
    let mut operators = get_operators(conn).await?;
    operators.retain(|o| filter.matches(&o.schema));
    let mut operator_families = get_operator_families(conn).await?;
    operator_families.retain(|f| filter.matches(&f.schema));
    let mut operator_classes = get_operator_classes(conn).await?;
    operator_classes.retain(|c| filter.matches(&c.schema));

    let snapshot = PredataSnapshot { server_version, schemas, languages, operators, operator_families, operator_classes };
    info!(
        target: "predata::snapshot",
        "extracted {} objects: schemas={}, languages={}, operators={}, families={}, classes={}",
        snapshot.object_count(), snapshot.schemas.len(), snapshot.languages.len(),
        snapshot.operators.len(), snapshot.operator_families.len(), snapshot.operator_classes.len()
    );
    Ok(snapshot)
}
