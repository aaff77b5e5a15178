use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::filter::{extension_filter_clause, qualified_ref_expr, schema_filter_clause};
use crate::catalog::{Oid, NONE_SENTINEL};
use crate::connection::{CatalogConnection, CatalogQuery, CatalogRow, ServerVersion};
use crate::error::CatalogResult;

/// A user-defined operator. Text fields that can be "not applicable" hold
/// [`NONE_SENTINEL`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub oid: Oid,
    pub schema: String,
    pub name: String,
    /// Implementing function; schema-qualified unless visible on the search path.
    pub procedure: String,
    /// `-` for a prefix operator.
    pub left_arg_type: String,
    /// `-` for a postfix operator.
    pub right_arg_type: String,
    pub commutator: String,
    pub negator: String,
    pub restrict_function: String,
    pub join_function: String,
    pub can_hash: bool,
    pub can_merge: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorFamily {
    pub oid: Oid,
    pub schema: String,
    pub name: String,
    pub index_method: String,
}

pub const OPERATORS_LABEL: &str = "operators";
pub const OPERATOR_FAMILIES_LABEL: &str = "operator_families";

// References to other operators and selectivity functions stay bare when they
// share the operator's schema or are visible; the backing function follows
// search-path visibility alone.
fn operators_query(version: ServerVersion) -> CatalogQuery {
    let procedure = qualified_ref_expr("pg_catalog.quote_ident(p.proname)", "pn", "pg_catalog.pg_function_is_visible(p.oid)");
    let commutator = qualified_ref_expr("com.oprname::text", "comn", "comn.oid = o.oprnamespace OR pg_catalog.pg_operator_is_visible(com.oid)");
    let negator = qualified_ref_expr("neg.oprname::text", "negn", "negn.oid = o.oprnamespace OR pg_catalog.pg_operator_is_visible(neg.oid)");
    let restrict = qualified_ref_expr("pg_catalog.quote_ident(rp.proname)", "rpn", "rpn.oid = o.oprnamespace OR pg_catalog.pg_function_is_visible(rp.oid)");
    let join = qualified_ref_expr("pg_catalog.quote_ident(jp.proname)", "jpn", "jpn.oid = o.oprnamespace OR pg_catalog.pg_function_is_visible(jp.oid)");
    CatalogQuery::new(OPERATORS_LABEL, format!(
        "SELECT o.oid::text AS oid, n.nspname::text AS schema, o.oprname::text AS name,
                {procedure} AS procedure,
                pg_catalog.format_type(o.oprleft, NULL) AS lefttype,
                pg_catalog.format_type(o.oprright, NULL) AS righttype,
                CASE WHEN com.oid IS NULL THEN '-' ELSE {commutator} END AS commutator,
                CASE WHEN neg.oid IS NULL THEN '-' ELSE {negator} END AS negator,
                CASE WHEN rp.oid IS NULL THEN '-' ELSE {restrict} END AS restrictfunction,
                CASE WHEN jp.oid IS NULL THEN '-' ELSE {join} END AS joinfunction,
                o.oprcanhash::text AS canhash, o.oprcanmerge::text AS canmerge
         FROM pg_catalog.pg_operator o
         JOIN pg_catalog.pg_namespace n ON n.oid = o.oprnamespace
         JOIN pg_catalog.pg_proc p ON p.oid = o.oprcode
         JOIN pg_catalog.pg_namespace pn ON pn.oid = p.pronamespace
         LEFT JOIN pg_catalog.pg_operator com ON com.oid = o.oprcom
         LEFT JOIN pg_catalog.pg_namespace comn ON comn.oid = com.oprnamespace
         LEFT JOIN pg_catalog.pg_operator neg ON neg.oid = o.oprnegate
         LEFT JOIN pg_catalog.pg_namespace negn ON negn.oid = neg.oprnamespace
         LEFT JOIN pg_catalog.pg_proc rp ON rp.oid = o.oprrest
         LEFT JOIN pg_catalog.pg_namespace rpn ON rpn.oid = rp.pronamespace
         LEFT JOIN pg_catalog.pg_proc jp ON jp.oid = o.oprjoin
         LEFT JOIN pg_catalog.pg_namespace jpn ON jpn.oid = jp.pronamespace
         WHERE {} AND {}",
        schema_filter_clause("n"),
        extension_filter_clause(version, "pg_operator", "o.oid"),
    ))
}

fn operator_families_query(version: ServerVersion) -> CatalogQuery {
    CatalogQuery::new(OPERATOR_FAMILIES_LABEL, format!(
        "SELECT f.oid::text AS oid, n.nspname::text AS schema, f.opfname::text AS name, a.amname::text AS indexmethod
         FROM pg_catalog.pg_opfamily f
         JOIN pg_catalog.pg_namespace n ON n.oid = f.opfnamespace
         JOIN pg_catalog.pg_am a ON a.oid = f.opfmethod
         WHERE {} AND {}",
        schema_filter_clause("n"),
        extension_filter_clause(version, "pg_opfamily", "f.oid"),
    ))
}

/// Nullable "not applicable" columns collapse to the sentinel; an empty
/// string never reaches a record.
fn sentinel(row: &CatalogRow, column: &str) -> CatalogResult<String> {
    Ok(row.opt_text(column)?.filter(|s| !s.is_empty()).unwrap_or_else(|| NONE_SENTINEL.to_string()))
}

fn decode_operator(row: &CatalogRow) -> CatalogResult<Operator> {
    Ok(Operator {
        oid: row.oid("oid")?,
        schema: row.text("schema")?,
        name: row.text("name")?,
        procedure: row.text("procedure")?,
        left_arg_type: sentinel(row, "lefttype")?,
        right_arg_type: sentinel(row, "righttype")?,
        commutator: sentinel(row, "commutator")?,
        negator: sentinel(row, "negator")?,
        restrict_function: sentinel(row, "restrictfunction")?,
        join_function: sentinel(row, "joinfunction")?,
        can_hash: row.boolean("canhash")?,
        can_merge: row.boolean("canmerge")?,
    })
}

fn decode_family(row: &CatalogRow) -> CatalogResult<OperatorFamily> {
    Ok(OperatorFamily {
        oid: row.oid("oid")?,
        schema: row.text("schema")?,
        name: row.text("name")?,
        index_method: row.text("indexmethod")?,
    })
}

/// Every user-defined operator with a backing function, ordered by schema,
/// name and then operand types (operators overload on their operands).
pub async fn get_operators<C: CatalogConnection + ?Sized>(conn: &C) -> CatalogResult<Vec<Operator>> {
    let version = conn.server_version().await?;
    version.ensure_supported()?;
    let rows = conn.fetch(&operators_query(version)).await?;
    let mut ops = rows.iter().map(decode_operator).collect::<CatalogResult<Vec<_>>>()?;
    ops.sort_by(|a, b| {
        (&a.schema, &a.name, &a.left_arg_type, &a.right_arg_type).cmp(&(&b.schema, &b.name, &b.left_arg_type, &b.right_arg_type))
    });
    debug!(target: "predata::catalog", "found {} operators", ops.len());
    Ok(ops)
}

/// Every user-visible operator family, ordered by schema, name and access method.
pub async fn get_operator_families<C: CatalogConnection + ?Sized>(conn: &C) -> CatalogResult<Vec<OperatorFamily>> {
    let version = conn.server_version().await?;
    version.ensure_supported()?;
    let rows = conn.fetch(&operator_families_query(version)).await?;
    let mut families = rows.iter().map(decode_family).collect::<CatalogResult<Vec<_>>>()?;
    families.sort_by(|a, b| (&a.schema, &a.name, &a.index_method).cmp(&(&b.schema, &b.name, &b.index_method)));
    debug!(target: "predata::catalog", "found {} operator families", families.len());
    Ok(families)
}
