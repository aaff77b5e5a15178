//! Catalog connection seam.
//!
//! Extractors never touch a driver directly: they build a [`CatalogQuery`],
//! hand it to a [`CatalogConnection`] and decode the returned [`CatalogRow`]s.
//! Every catalog query selects its columns as text, so a row is a list of
//! nullable strings keyed by column name and decoding happens in one place.
//!
//! The connection is owned by the caller. Extraction is snapshot-consistent
//! only as far as the caller's isolation level goes: run a whole pass inside a
//! REPEATABLE READ transaction (see the `Transaction` impl) when several
//! extractors must agree with each other.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_postgres::types::ToSql;
use tracing::debug;

use crate::catalog::Oid;
use crate::error::{CatalogError, CatalogResult};

/// A labelled, parameterized catalog read. The label names the query in logs
/// and lets test connections serve canned rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub label: &'static str,
    pub sql: String,
    pub params: Vec<String>,
}

impl CatalogQuery {
    pub fn new(label: &'static str, sql: impl Into<String>) -> Self {
        Self { label, sql: sql.into(), params: Vec::new() }
    }

    pub fn bind(mut self, value: impl Into<String>) -> Self {
        self.params.push(value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRow {
    columns: Arc<[String]>,
    values: Vec<Option<String>>,
}

impl CatalogRow {
    pub fn new(columns: Arc<[String]>, values: Vec<Option<String>>) -> Self {
        Self { columns, values }
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs(pairs: &[(&str, Option<&str>)]) -> Self {
        let columns: Arc<[String]> = pairs.iter().map(|(c, _)| c.to_string()).collect();
        let values = pairs.iter().map(|(_, v)| v.map(|s| s.to_string())).collect();
        Self { columns, values }
    }

    fn raw(&self, column: &str) -> CatalogResult<Option<&str>> {
        let idx = self.columns.iter().position(|c| c == column)
            .ok_or_else(|| CatalogError::mapping(column, "column missing from result set"))?;
        Ok(self.values.get(idx).and_then(|v| v.as_deref()))
    }

    pub fn opt_text(&self, column: &str) -> CatalogResult<Option<String>> {
        Ok(self.raw(column)?.map(|s| s.to_string()))
    }

    pub fn text(&self, column: &str) -> CatalogResult<String> {
        self.opt_text(column)?.ok_or_else(|| CatalogError::mapping(column, "unexpected null"))
    }

    pub fn boolean(&self, column: &str) -> CatalogResult<bool> {
        match self.raw(column)? {
            Some("t") | Some("true") => Ok(true),
            Some("f") | Some("false") => Ok(false),
            Some(other) => Err(CatalogError::mapping(column.to_string(), format!("not a boolean: {other}"))),
            None => Err(CatalogError::mapping(column, "unexpected null")),
        }
    }

    pub fn int(&self, column: &str) -> CatalogResult<i32> {
        let s = self.raw(column)?.ok_or_else(|| CatalogError::mapping(column, "unexpected null"))?;
        s.trim().parse::<i32>().map_err(|e| CatalogError::mapping(column.to_string(), format!("not an integer: {s} ({e})")))
    }

    /// A required identifier: null and zero are both decoding failures.
    pub fn oid(&self, column: &str) -> CatalogResult<Oid> {
        self.opt_oid(column)?.ok_or_else(|| CatalogError::mapping(column, "missing object identifier"))
    }

    /// An optional identifier: the catalog stores zero for "no such object".
    pub fn opt_oid(&self, column: &str) -> CatalogResult<Option<Oid>> {
        match self.raw(column)? {
            None => Ok(None),
            Some(s) => {
                let n = s.trim().parse::<u32>()
                    .map_err(|e| CatalogError::mapping(column.to_string(), format!("not an oid: {s} ({e})")))?;
                Ok(Oid::from_raw(n))
            }
        }
    }

    fn from_pg_row(row: &tokio_postgres::Row) -> CatalogResult<Self> {
        let columns: Arc<[String]> = row.columns().iter().map(|c| c.name().to_string()).collect();
        let mut values = Vec::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            let v: Option<String> = row.try_get(i)
                .map_err(|e| CatalogError::mapping(name.clone(), e.to_string()))?;
            values.push(v);
        }
        Ok(Self { columns, values })
    }
}

/// `server_version_num`, e.g. 90624 or 160002.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct ServerVersion(pub i32);

impl ServerVersion {
    /// `pg_opfamily` first appears in 8.3.
    pub const MIN_SUPPORTED: ServerVersion = ServerVersion(80300);
    /// `pg_amop.amopreqcheck` was dropped in 8.4.
    pub const NO_AMOP_RECHECK: ServerVersion = ServerVersion(80400);
    /// `pg_language.laninline` arrives in 9.0.
    pub const INLINE_HANDLERS: ServerVersion = ServerVersion(90000);
    /// Extensions (and `deptype = 'e'`) arrive in 9.1.
    pub const EXTENSIONS: ServerVersion = ServerVersion(90100);
    /// `to_regtype` (NULL instead of an error for unknown names) arrives in 9.4.
    pub const TO_REGTYPE: ServerVersion = ServerVersion(90400);

    pub fn at_least(&self, other: ServerVersion) -> bool { *self >= other }

    pub fn ensure_supported(&self) -> CatalogResult<()> {
        if self.at_least(Self::MIN_SUPPORTED) { Ok(()) } else { Err(CatalogError::UnsupportedVersion { version: self.0 }) }
    }
}

pub const SERVER_VERSION_QUERY: &str = "SELECT pg_catalog.current_setting('server_version_num') AS version_num";

/// A live, already-authenticated session able to run read-only SQL.
#[async_trait]
pub trait CatalogConnection: Send + Sync {
    async fn fetch(&self, query: &CatalogQuery) -> CatalogResult<Vec<CatalogRow>>;

    async fn server_version(&self) -> CatalogResult<ServerVersion> {
        let rows = self.fetch(&CatalogQuery::new("server_version", SERVER_VERSION_QUERY)).await?;
        let row = rows.first().ok_or_else(|| CatalogError::mapping("version_num", "no rows"))?;
        Ok(ServerVersion(row.int("version_num")?))
    }
}

async fn fetch_with<C>(client: &C, query: &CatalogQuery) -> CatalogResult<Vec<CatalogRow>>
where
    C: tokio_postgres::GenericClient + Sync,
{
    let params: Vec<&(dyn ToSql + Sync)> = query.params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
    let rows = client.query(query.sql.as_str(), &params).await?;
    debug!(target: "predata::connection", "catalog query '{}' returned {} rows", query.label, rows.len());
    rows.iter().map(CatalogRow::from_pg_row).collect()
}

#[async_trait]
impl CatalogConnection for tokio_postgres::Client {
    async fn fetch(&self, query: &CatalogQuery) -> CatalogResult<Vec<CatalogRow>> {
        fetch_with(self, query).await
    }
}

#[async_trait]
impl<'a> CatalogConnection for tokio_postgres::Transaction<'a> {
    async fn fetch(&self, query: &CatalogQuery) -> CatalogResult<Vec<CatalogRow>> {
        fetch_with(self, query).await
    }
}

/// In-memory connection serving canned rows by query label.
#[cfg(test)]
pub(crate) mod fixture {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    pub(crate) fn row(pairs: &[(&str, Option<&str>)]) -> CatalogRow { CatalogRow::from_pairs(pairs) }

    pub(crate) struct FixtureConnection {
        version: i32,
        rows: HashMap<&'static str, Vec<CatalogRow>>,
        failing: Option<&'static str>,
        seen: Mutex<Vec<CatalogQuery>>,
    }

    impl FixtureConnection {
        pub(crate) fn new(version: i32) -> Self {
            Self { version, rows: HashMap::new(), failing: None, seen: Mutex::new(Vec::new()) }
        }

        pub(crate) fn with_rows(mut self, label: &'static str, rows: Vec<CatalogRow>) -> Self {
            self.rows.insert(label, rows);
            self
        }

        pub(crate) fn failing_on(mut self, label: &'static str) -> Self {
            self.failing = Some(label);
            self
        }

        pub(crate) fn seen(&self) -> Vec<CatalogQuery> {
            self.seen.lock().unwrap().clone()
        }

        pub(crate) fn sql_for(&self, label: &str) -> String {
            self.seen().into_iter().find(|q| q.label == label).map(|q| q.sql).unwrap_or_default()
        }
    }

    #[async_trait]
    impl CatalogConnection for FixtureConnection {
        async fn fetch(&self, query: &CatalogQuery) -> CatalogResult<Vec<CatalogRow>> {
            self.seen.lock().unwrap().push(query.clone());
            if self.failing == Some(query.label) {
                return Err(CatalogError::connection(format!("fixture failure in {}", query.label)));
            }
            Ok(self.rows.get(query.label).cloned().unwrap_or_default())
        }

        async fn server_version(&self) -> CatalogResult<ServerVersion> { Ok(ServerVersion(self.version)) }
    }
}

#[cfg(test)]
mod tests {
    use super::fixture::*;
    use super::*;

    #[test]
    fn row_decoding() {
        let r = row(&[("oid", Some("16384")), ("inline", Some("0")), ("validator", None), ("ispl", Some("t")), ("n", Some("2"))]);
        assert_eq!(r.oid("oid").unwrap().as_u32(), 16384);
        assert_eq!(r.opt_oid("inline").unwrap(), None);
        assert_eq!(r.opt_oid("validator").unwrap(), None);
        assert!(r.boolean("ispl").unwrap());
        assert_eq!(r.int("n").unwrap(), 2);
    }

    #[test]
    fn row_decoding_failures_are_mapping_errors() {
        let r = row(&[("oid", Some("0")), ("name", None), ("flag", Some("yes")), ("n", Some("x"))]);
        assert_eq!(r.oid("oid").unwrap_err().code_str(), "mapping_error");
        assert_eq!(r.text("name").unwrap_err().code_str(), "mapping_error");
        assert_eq!(r.boolean("flag").unwrap_err().code_str(), "mapping_error");
        assert_eq!(r.int("n").unwrap_err().code_str(), "mapping_error");
        match r.text("absent").unwrap_err() {
            CatalogError::Mapping { column, .. } => assert_eq!(column, "absent"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn version_gates() {
        assert!(ServerVersion(80200).ensure_supported().is_err());
        assert!(ServerVersion(80300).ensure_supported().is_ok());
        assert!(!ServerVersion(80300).at_least(ServerVersion::NO_AMOP_RECHECK));
        assert!(ServerVersion(160002).at_least(ServerVersion::EXTENSIONS));
    }

    struct VersionOnly;

    #[async_trait]
    impl CatalogConnection for VersionOnly {
        async fn fetch(&self, query: &CatalogQuery) -> CatalogResult<Vec<CatalogRow>> {
            assert_eq!(query.sql, SERVER_VERSION_QUERY);
            Ok(vec![row(&[("version_num", Some("90624"))])])
        }
    }

    #[tokio::test]
    async fn default_version_lookup_reads_server_version_num() {
        assert_eq!(VersionOnly.server_version().await.unwrap(), ServerVersion(90624));
    }
}
