use std::fmt::{Display, Formatter};

use tracing::debug;

use crate::catalog::{Oid, NONE_SENTINEL};
use crate::connection::{CatalogConnection, CatalogQuery, ServerVersion};
use crate::error::{CatalogError, CatalogResult};
use crate::ident::{normalize_identifier, quote_literal, signature_args};

/// Catalog object kinds the resolver can look up by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Function,
    Operator,
    Type,
    Relation,
    OperatorFamily,
    OperatorClass,
    Collation,
}

impl ObjectKind {
    // (catalog table, name column, namespace column)
    fn columns(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            ObjectKind::Function => ("pg_proc", "proname", "pronamespace"),
            ObjectKind::Operator => ("pg_operator", "oprname", "oprnamespace"),
            ObjectKind::Type => ("pg_type", "typname", "typnamespace"),
            ObjectKind::Relation => ("pg_class", "relname", "relnamespace"),
            ObjectKind::OperatorFamily => ("pg_opfamily", "opfname", "opfnamespace"),
            ObjectKind::OperatorClass => ("pg_opclass", "opcname", "opcnamespace"),
            ObjectKind::Collation => ("pg_collation", "collname", "collnamespace"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Function => "function",
            ObjectKind::Operator => "operator",
            ObjectKind::Type => "type",
            ObjectKind::Relation => "relation",
            ObjectKind::OperatorFamily => "operator family",
            ObjectKind::OperatorClass => "operator class",
            ObjectKind::Collation => "collation",
        }
    }
}

/// A schema-qualified name, optionally with an argument signature such as
/// `integer, text` (functions) or `NONE, bigint` (operators).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectName {
    pub schema: String,
    pub name: String,
    pub signature: Option<String>,
}

impl ObjectName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self { schema: schema.into(), name: name.into(), signature: None }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }
}

impl Display for ObjectName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)?;
        if let Some(sig) = &self.signature { write!(f, "({})", sig)?; }
        Ok(())
    }
}

pub const RESOLVE_LABEL: &str = "resolve_oid";

/// Type identifier for a user-written type name. The server does the parsing,
/// so aliases (`int4`, `int`) and typmods resolve the same way they would in
/// DDL; an unknown name yields NULL and therefore no match.
fn type_oid_expr(version: ServerVersion, type_name: &str) -> String {
    if version.at_least(ServerVersion::TO_REGTYPE) {
        format!("pg_catalog.to_regtype({})::pg_catalog.oid", quote_literal(type_name))
    } else {
        format!("{}::pg_catalog.regtype::pg_catalog.oid", quote_literal(type_name))
    }
}

fn operand_expr(version: ServerVersion, operand: &str) -> String {
    if operand == NONE_SENTINEL || operand.eq_ignore_ascii_case("none") {
        "0".to_string()
    } else {
        type_oid_expr(version, operand)
    }
}

/// Split and check a signature for `kind` without touching the server.
fn checked_signature(kind: ObjectKind, sig: &str) -> CatalogResult<Vec<String>> {
    let args = signature_args(sig);
    match kind {
        ObjectKind::Function => Ok(args),
        ObjectKind::Operator if args.len() == 2 => Ok(args),
        ObjectKind::Operator => Err(CatalogError::invalid_lookup(format!(
            "operator signature must name two operands (use NONE for a missing one), got '{}'",
            sig
        ))),
        _ => Err(CatalogError::invalid_lookup(format!("{} lookups do not take an argument signature", kind.as_str()))),
    }
}

fn signature_clause(kind: ObjectKind, version: ServerVersion, args: &[String]) -> String {
    match (kind, args) {
        (ObjectKind::Operator, [left, right]) => format!(
            "o.oprleft = {} AND o.oprright = {}",
            operand_expr(version, left),
            operand_expr(version, right)
        ),
        _ => {
            let types: Vec<String> = args.iter().map(|a| type_oid_expr(version, a)).collect();
            format!("o.proargtypes::pg_catalog.oid[] = ARRAY[{}]::pg_catalog.oid[]", types.join(", "))
        }
    }
}

fn resolve_query(kind: ObjectKind, target: &ObjectName, signature: Option<&str>) -> CatalogQuery {
    let (table, name_col, nsp_col) = kind.columns();
    let mut sql = format!(
        "SELECT o.oid::text AS oid FROM pg_catalog.{table} o JOIN pg_catalog.pg_namespace n ON n.oid = o.{nsp_col} WHERE n.nspname = $1 AND o.{name_col} = $2"
    );
    if let Some(clause) = signature {
        sql.push_str(" AND ");
        sql.push_str(clause);
    }
    CatalogQuery::new(RESOLVE_LABEL, sql)
        .bind(normalize_identifier(&target.schema))
        .bind(normalize_identifier(&target.name))
}

/// Resolve a schema-qualified object name to its catalog identifier.
///
/// Zero matches is `NotFound`; more than one is `Ambiguous` and is never
/// narrowed down to the first row. Overloaded functions and operators need a
/// signature to resolve uniquely; its argument types are resolved by the
/// server, so any spelling the server accepts for a type matches.
pub async fn resolve_oid<C: CatalogConnection + ?Sized>(conn: &C, kind: ObjectKind, target: &ObjectName) -> CatalogResult<Oid> {
    let signature = match target.signature.as_deref() {
        Some(sig) => {
            let args = checked_signature(kind, sig)?;
            Some(signature_clause(kind, conn.server_version().await?, &args))
        }
        None => None,
    };
    let query = resolve_query(kind, target, signature.as_deref());
    let rows = conn.fetch(&query).await?;
    match rows.as_slice() {
        [] => Err(CatalogError::not_found(kind.as_str().to_string(), target.to_string())),
        [only] => {
            let oid = only.oid("oid")?;
            debug!(target: "predata::catalog", "resolved {} {} to oid {}", kind.as_str(), target, oid);
            Ok(oid)
        }
        many => Err(CatalogError::ambiguous(kind.as_str().to_string(), target.to_string(), many.len())),
    }
}

/// Identifier of a function with no arguments-based disambiguation, e.g. a
/// language's call handler.
pub async fn function_oid<C: CatalogConnection + ?Sized>(conn: &C, schema: &str, name: &str) -> CatalogResult<Oid> {
    resolve_oid(conn, ObjectKind::Function, &ObjectName::new(schema, name)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::fixture::{row, FixtureConnection};

    #[tokio::test]
    async fn single_match_resolves() {
        let conn = FixtureConnection::new(90624).with_rows(RESOLVE_LABEL, vec![row(&[("oid", Some("11001"))])]);
        let oid = function_oid(&conn, "pg_catalog", "plpgsql_call_handler").await.unwrap();
        assert_eq!(oid.as_u32(), 11001);
        let q = conn.seen().remove(0);
        assert_eq!(q.params, vec!["pg_catalog".to_string(), "plpgsql_call_handler".to_string()]);
        assert!(q.sql.contains("FROM pg_catalog.pg_proc o"));
        assert!(!q.sql.contains("$3"));
    }

    #[tokio::test]
    async fn zero_matches_is_not_found() {
        let conn = FixtureConnection::new(90624);
        let err = resolve_oid(&conn, ObjectKind::Type, &ObjectName::new("public", "missing")).await.unwrap_err();
        assert_eq!(err, CatalogError::not_found("type", "public.missing"));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn several_matches_is_ambiguous() {
        let conn = FixtureConnection::new(90624).with_rows(RESOLVE_LABEL, vec![row(&[("oid", Some("1"))]), row(&[("oid", Some("2"))])]);
        let err = resolve_oid(&conn, ObjectKind::OperatorFamily, &ObjectName::new("public", "testfam")).await.unwrap_err();
        assert_eq!(err, CatalogError::ambiguous("operator family", "public.testfam", 2));
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn function_signature_types_are_resolved_by_the_server() {
        let conn = FixtureConnection::new(90624).with_rows(RESOLVE_LABEL, vec![row(&[("oid", Some("16500"))])]);
        let target = ObjectName::new("TestSchema", "\"testFunc\"").with_signature("(path, int4)");
        resolve_oid(&conn, ObjectKind::Function, &target).await.unwrap();
        let q = conn.seen().remove(0);
        assert_eq!(q.params, vec!["testschema".to_string(), "testFunc".to_string()]);
        assert!(q.sql.contains(
            "o.proargtypes::pg_catalog.oid[] = ARRAY[pg_catalog.to_regtype('path')::pg_catalog.oid, pg_catalog.to_regtype('int4')::pg_catalog.oid]::pg_catalog.oid[]"
        ));
    }

    #[tokio::test]
    async fn empty_function_signature_matches_no_arguments() {
        let conn = FixtureConnection::new(150000).with_rows(RESOLVE_LABEL, vec![row(&[("oid", Some("2283"))])]);
        resolve_oid(&conn, ObjectKind::Function, &ObjectName::new("pg_catalog", "now").with_signature("()")).await.unwrap();
        assert!(conn.sql_for(RESOLVE_LABEL).contains("o.proargtypes::pg_catalog.oid[] = ARRAY[]::pg_catalog.oid[]"));
    }

    #[tokio::test]
    async fn old_servers_cast_type_names_directly() {
        let conn = FixtureConnection::new(90300).with_rows(RESOLVE_LABEL, vec![row(&[("oid", Some("1397"))])]);
        resolve_oid(&conn, ObjectKind::Function, &ObjectName::new("pg_catalog", "abs").with_signature("int")).await.unwrap();
        let sql = conn.sql_for(RESOLVE_LABEL);
        assert!(sql.contains("ARRAY['int'::pg_catalog.regtype::pg_catalog.oid]"));
        assert!(!sql.contains("to_regtype"));
    }

    #[tokio::test]
    async fn operator_signature_maps_none_to_zero_operand() {
        let conn = FixtureConnection::new(90624).with_rows(RESOLVE_LABEL, vec![row(&[("oid", Some("16400"))])]);
        let target = ObjectName::new("public", "##").with_signature("bigint, NONE");
        resolve_oid(&conn, ObjectKind::Operator, &target).await.unwrap();
        let sql = conn.sql_for(RESOLVE_LABEL);
        assert!(sql.contains("o.oprleft = pg_catalog.to_regtype('bigint')::pg_catalog.oid AND o.oprright = 0"));

        let dash = ObjectName::new("public", "##").with_signature("-, int8");
        resolve_oid(&conn, ObjectKind::Operator, &dash).await.unwrap();
        assert!(conn.seen()[1].sql.contains("o.oprleft = 0 AND o.oprright = pg_catalog.to_regtype('int8')::pg_catalog.oid"));
    }

    #[tokio::test]
    async fn operator_signature_needs_two_operands() {
        let conn = FixtureConnection::new(90624);
        let err = resolve_oid(&conn, ObjectKind::Operator, &ObjectName::new("public", "+").with_signature("integer")).await.unwrap_err();
        assert_eq!(err.code_str(), "invalid_lookup");
        assert!(conn.seen().is_empty());
    }

    #[tokio::test]
    async fn quotes_in_type_names_stay_inside_the_literal() {
        let conn = FixtureConnection::new(90624);
        let target = ObjectName::new("public", "f").with_signature("a'); DROP TABLE t; --");
        assert_eq!(resolve_oid(&conn, ObjectKind::Function, &target).await.unwrap_err().code_str(), "not_found");
        assert!(conn.sql_for(RESOLVE_LABEL).contains("pg_catalog.to_regtype('a''); DROP TABLE t; --')"));
    }

    #[tokio::test]
    async fn signature_on_unsigned_kind_is_rejected_without_querying() {
        let conn = FixtureConnection::new(90624);
        let target = ObjectName::new("public", "t").with_signature("integer");
        let err = resolve_oid(&conn, ObjectKind::Type, &target).await.unwrap_err();
        assert_eq!(err.code_str(), "invalid_lookup");
        assert!(conn.seen().is_empty());
    }

    #[test]
    fn display_includes_signature() {
        assert_eq!(ObjectName::new("public", "f").with_signature("integer").to_string(), "public.f(integer)");
    }
}
