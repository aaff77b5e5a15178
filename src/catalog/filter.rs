//! SQL fragments shared by every extractor: which schemas count as system
//! schemas, which objects belong to extensions, and how a reference to
//! another catalog object is rendered (qualified or not).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::connection::ServerVersion;
use crate::ident::quote_literal;

pub const SYSTEM_SCHEMA_PREFIXES: &[&str] = &["pg_temp_", "pg_toast"];
pub const SYSTEM_SCHEMAS: &[&str] = &["gp_toolkit", "information_schema", "pg_aoseg", "pg_bitmapindex", "pg_catalog"];

pub fn is_system_schema(name: &str) -> bool {
    SYSTEM_SCHEMA_PREFIXES.iter().any(|p| name.starts_with(p)) || SYSTEM_SCHEMAS.contains(&name)
}

/// WHERE fragment keeping only user schemas; `nsp` is the pg_namespace alias.
/// Uses substr rather than LIKE so '_' is matched literally on every server version.
pub fn schema_filter_clause(nsp: &str) -> String {
    let mut parts: Vec<String> = SYSTEM_SCHEMA_PREFIXES.iter()
        .map(|p| format!("pg_catalog.substr({nsp}.nspname, 1, {}) <> {}", p.len(), quote_literal(p)))
        .collect();
    let names: Vec<String> = SYSTEM_SCHEMAS.iter().map(|s| quote_literal(s)).collect();
    parts.push(format!("{nsp}.nspname NOT IN ({})", names.join(", ")));
    parts.join(" AND ")
}

/// WHERE fragment dropping objects that are members of an extension. The
/// extension script recreates them, so they are not backed up individually.
/// Servers without extensions get a constant-true fragment.
pub fn extension_filter_clause(version: ServerVersion, catalog_table: &str, oid_expr: &str) -> String {
    if !version.at_least(ServerVersion::EXTENSIONS) { return "true".to_string(); }
    format!(
        "NOT EXISTS (SELECT 1 FROM pg_catalog.pg_depend ext WHERE ext.classid = 'pg_catalog.{catalog_table}'::pg_catalog.regclass AND ext.objid = {oid_expr} AND ext.deptype = 'e')"
    )
}

/// Text expression rendering a reference to another object: bare when
/// `bare_when` holds, `schema.name` otherwise. `target_nsp` is the alias of
/// the referenced object's pg_namespace row.
pub fn qualified_ref_expr(name_expr: &str, target_nsp: &str, bare_when: &str) -> String {
    format!(
        "CASE WHEN {bare_when} THEN {name_expr} ELSE pg_catalog.quote_ident({target_nsp}.nspname) || '.' || {name_expr} END"
    )
}

/// Include/exclude narrowing applied after extraction. An empty include set
/// means "every schema".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaFilter {
    pub include: BTreeSet<String>,
    pub exclude: BTreeSet<String>,
}

impl SchemaFilter {
    pub fn new<I, E, S>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: include.into_iter().map(Into::into).collect(),
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool { self.include.is_empty() && self.exclude.is_empty() }

    pub fn matches(&self, schema: &str) -> bool {
        if self.exclude.contains(schema) { return false; }
        self.include.is_empty() || self.include.contains(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_schema_set() {
        for s in ["pg_catalog", "information_schema", "pg_toast", "pg_toast_temp_1", "pg_temp_3", "gp_toolkit", "pg_aoseg", "pg_bitmapindex"] {
            assert!(is_system_schema(s), "{s} should be a system schema");
        }
        for s in ["public", "bar", "testschema", "pg_tempish", "pgtemp_1"] {
            assert!(!is_system_schema(s), "{s} should be a user schema");
        }
    }

    #[test]
    fn schema_clause_lists_every_exclusion() {
        let clause = schema_filter_clause("n");
        assert!(clause.contains("pg_catalog.substr(n.nspname, 1, 8) <> 'pg_temp_'"));
        assert!(clause.contains("pg_catalog.substr(n.nspname, 1, 8) <> 'pg_toast'"));
        assert!(clause.contains("n.nspname NOT IN ('gp_toolkit', 'information_schema', 'pg_aoseg', 'pg_bitmapindex', 'pg_catalog')"));
    }

    #[test]
    fn extension_clause_is_version_gated() {
        assert_eq!(extension_filter_clause(ServerVersion(90000), "pg_operator", "o.oid"), "true");
        let c = extension_filter_clause(ServerVersion(90100), "pg_operator", "o.oid");
        assert!(c.contains("'pg_catalog.pg_operator'::pg_catalog.regclass"));
        assert!(c.contains("ext.objid = o.oid"));
    }

    #[test]
    fn reference_rendering() {
        let e = qualified_ref_expr("com.oprname", "comn", "comn.oid = o.oprnamespace");
        assert_eq!(e, "CASE WHEN comn.oid = o.oprnamespace THEN com.oprname ELSE pg_catalog.quote_ident(comn.nspname) || '.' || com.oprname END");
    }

    #[test]
    fn include_and_exclude() {
        let all = SchemaFilter::default();
        assert!(all.is_empty());
        assert!(all.matches("anything"));

        let f = SchemaFilter::new(vec!["public", "bar"], vec!["bar"]);
        assert!(f.matches("public"));
        assert!(!f.matches("bar"));
        assert!(!f.matches("testschema"));

        let ex = SchemaFilter::new(Vec::<String>::new(), vec!["scratch".to_string()]);
        assert!(ex.matches("public"));
        assert!(!ex.matches("scratch"));
    }
}
