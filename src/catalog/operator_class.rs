//! Operator classes and their members.
//!
//! A class row comes from `pg_opclass`; its explicit members live in
//! `pg_amop` / `pg_amproc` and are tied back to the class through `pg_depend`,
//! either directly or through the class's family when the member's operand
//! types are the class's input type. Cross-type family members belong to no
//! class and are not listed.
//! Members are fetched in one query per member kind, keyed by the owning
//! class identifier, and attached to their class in a single grouping pass.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::filter::{extension_filter_clause, schema_filter_clause};
use crate::catalog::{Oid, NONE_SENTINEL};
use crate::connection::{CatalogConnection, CatalogQuery, CatalogRow, ServerVersion};
use crate::error::CatalogResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorClassOperator {
    pub class_oid: Oid,
    pub strategy_number: i32,
    /// Operator with its operand types, e.g. `=(uuid,uuid)`.
    pub operator: String,
    /// Only ever true on servers that still record RECHECK (before 8.4).
    pub recheck: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorClassFunction {
    pub class_oid: Oid,
    pub support_number: i32,
    /// Function with its argument types, e.g. `abs(integer)`.
    pub function: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorClass {
    pub oid: Oid,
    pub schema: String,
    pub name: String,
    pub family_schema: String,
    pub family_name: String,
    pub index_method: String,
    pub type_name: String,
    pub is_default: bool,
    /// [`NONE_SENTINEL`] unless the class stores a type other than the indexed one.
    pub storage_type: String,
    /// Ordered by strategy number; empty when the class declares none.
    pub operators: Vec<OperatorClassOperator>,
    /// Ordered by support number; empty when the class declares none.
    pub functions: Vec<OperatorClassFunction>,
}

pub const OPERATOR_CLASSES_LABEL: &str = "operator_classes";
pub const OPERATOR_CLASS_OPERATORS_LABEL: &str = "operator_class_operators";
pub const OPERATOR_CLASS_FUNCTIONS_LABEL: &str = "operator_class_functions";

fn operator_classes_query(version: ServerVersion) -> CatalogQuery {
    // A dangling opcfamily must surface as a mapping error, not drop the class.
    CatalogQuery::new(OPERATOR_CLASSES_LABEL, format!(
        "SELECT c.oid::text AS oid, cn.nspname::text AS schema, c.opcname::text AS name,
                fn.nspname::text AS familyschema, f.opfname::text AS familyname,
                a.amname::text AS indexmethod,
                pg_catalog.format_type(c.opcintype, NULL) AS type,
                c.opcdefault::text AS isdefault,
                CASE WHEN c.opckeytype = 0 OR c.opckeytype = c.opcintype THEN '-'
                     ELSE pg_catalog.format_type(c.opckeytype, NULL) END AS storagetype
         FROM pg_catalog.pg_opclass c
         JOIN pg_catalog.pg_namespace cn ON cn.oid = c.opcnamespace
         JOIN pg_catalog.pg_am a ON a.oid = c.opcmethod
         LEFT JOIN pg_catalog.pg_opfamily f ON f.oid = c.opcfamily
         LEFT JOIN pg_catalog.pg_namespace fn ON fn.oid = f.opfnamespace
         WHERE {} AND {}",
        schema_filter_clause("cn"),
        extension_filter_clause(version, "pg_opclass", "c.oid"),
    ))
}

// Pairs each member with a class in one of two ways. Members tied to the
// class itself depend on it directly. Members the access method ties to the
// family (GiST/GIN/SP-GiST operators, optional support functions) belong to
// the class whose input type they take on both sides.
fn member_join(catalog_table: &str, left_col: &str, right_col: &str) -> String {
    format!(
        "JOIN pg_catalog.pg_depend d ON d.classid = 'pg_catalog.{catalog_table}'::pg_catalog.regclass AND d.objid = m.oid
         JOIN pg_catalog.pg_opclass c ON
              (d.refclassid = 'pg_catalog.pg_opclass'::pg_catalog.regclass AND d.refobjid = c.oid)
           OR (d.refclassid = 'pg_catalog.pg_opfamily'::pg_catalog.regclass AND d.refobjid = c.opcfamily
               AND m.{left_col} = c.opcintype AND m.{right_col} = c.opcintype)
         JOIN pg_catalog.pg_namespace cn ON cn.oid = c.opcnamespace"
    )
}

fn class_operators_query(version: ServerVersion) -> CatalogQuery {
    let recheck = if version.at_least(ServerVersion::NO_AMOP_RECHECK) { "false" } else { "m.amopreqcheck" };
    CatalogQuery::new(OPERATOR_CLASS_OPERATORS_LABEL, format!(
        "SELECT c.oid::text AS classoid, m.amopstrategy::text AS strategynumber,
                m.amopopr::pg_catalog.regoperator::text AS operator, {recheck}::text AS recheck
         FROM pg_catalog.pg_amop m
         {}
         WHERE {}",
        member_join("pg_amop", "amoplefttype", "amoprighttype"),
        schema_filter_clause("cn"),
    ))
}

fn class_functions_query() -> CatalogQuery {
    CatalogQuery::new(OPERATOR_CLASS_FUNCTIONS_LABEL, format!(
        "SELECT c.oid::text AS classoid, m.amprocnum::text AS supportnumber,
                m.amproc::pg_catalog.regprocedure::text AS function
         FROM pg_catalog.pg_amproc m
         {}
         WHERE {}",
        member_join("pg_amproc", "amproclefttype", "amprocrighttype"),
        schema_filter_clause("cn"),
    ))
}

fn decode_class(row: &CatalogRow) -> CatalogResult<OperatorClass> {
    let storage = row.opt_text("storagetype")?.filter(|s| !s.is_empty()).unwrap_or_else(|| NONE_SENTINEL.to_string());
    Ok(OperatorClass {
        oid: row.oid("oid")?,
        schema: row.text("schema")?,
        name: row.text("name")?,
        family_schema: row.text("familyschema")?,
        family_name: row.text("familyname")?,
        index_method: row.text("indexmethod")?,
        type_name: row.text("type")?,
        is_default: row.boolean("isdefault")?,
        storage_type: storage,
        operators: Vec::new(),
        functions: Vec::new(),
    })
}

fn decode_operator(row: &CatalogRow) -> CatalogResult<OperatorClassOperator> {
    Ok(OperatorClassOperator {
        class_oid: row.oid("classoid")?,
        strategy_number: row.int("strategynumber")?,
        operator: row.text("operator")?,
        recheck: row.boolean("recheck")?,
    })
}

fn decode_function(row: &CatalogRow) -> CatalogResult<OperatorClassFunction> {
    Ok(OperatorClassFunction {
        class_oid: row.oid("classoid")?,
        support_number: row.int("supportnumber")?,
        function: row.text("function")?,
    })
}

/// Bucket decoded children by their owning class identifier.
fn group_by_class<T, F>(rows: &[CatalogRow], decode: F, owner: fn(&T) -> Oid) -> CatalogResult<HashMap<Oid, Vec<T>>>
where
    F: Fn(&CatalogRow) -> CatalogResult<T>,
{
    let mut grouped: HashMap<Oid, Vec<T>> = HashMap::new();
    for r in rows {
        let child = decode(r)?;
        grouped.entry(owner(&child)).or_default().push(child);
    }
    Ok(grouped)
}

/// Every user-visible operator class with its explicit member operators and
/// support functions, ordered by schema, name and access method.
pub async fn get_operator_classes<C: CatalogConnection + ?Sized>(conn: &C) -> CatalogResult<Vec<OperatorClass>> {
    let version = conn.server_version().await?;
    version.ensure_supported()?;

    let class_rows = conn.fetch(&operator_classes_query(version)).await?;
    let mut classes = class_rows.iter().map(decode_class).collect::<CatalogResult<Vec<_>>>()?;

    let op_rows = conn.fetch(&class_operators_query(version)).await?;
    let mut operators = group_by_class(&op_rows, decode_operator, |o: &OperatorClassOperator| o.class_oid)?;
    let fn_rows = conn.fetch(&class_functions_query()).await?;
    let mut functions = group_by_class(&fn_rows, decode_function, |f: &OperatorClassFunction| f.class_oid)?;

    for class in classes.iter_mut() {
        let mut ops = operators.remove(&class.oid).unwrap_or_default();
        ops.sort_by(|a, b| (a.strategy_number, &a.operator).cmp(&(b.strategy_number, &b.operator)));
        class.operators = ops;
        let mut funcs = functions.remove(&class.oid).unwrap_or_default();
        funcs.sort_by(|a, b| (a.support_number, &a.function).cmp(&(b.support_number, &b.function)));
        class.functions = funcs;
    }
    // Leftovers belong to classes dropped by the extension filter.
    let orphaned = operators.values().map(Vec::len).sum::<usize>() + functions.values().map(Vec::len).sum::<usize>();
    if orphaned > 0 {
        debug!(target: "predata::catalog", "skipped {} operator class members without a listed class", orphaned);
    }

    classes.sort_by(|a, b| (&a.schema, &a.name, &a.index_method).cmp(&(&b.schema, &b.name, &b.index_method)));
    debug!(target: "predata::catalog", "found {} operator classes", classes.len());
    Ok(classes)
}
