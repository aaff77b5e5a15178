use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::Oid;
use crate::connection::{CatalogConnection, CatalogQuery, CatalogRow, ServerVersion};
use crate::error::CatalogResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProceduralLanguage {
    pub oid: Oid,
    pub name: String,
    pub owner: String,
    /// `lanispl`: a procedural language (as opposed to internal/c/sql).
    pub is_pl: bool,
    /// `lanpltrusted`: unprivileged users may create functions in it.
    pub pl_trusted: bool,
    pub handler: Oid,
    /// `None` when the language has no inline (DO block) handler.
    pub inline: Option<Oid>,
    /// `None` when the language has no validator.
    pub validator: Option<Oid>,
}

pub const LANGUAGES_LABEL: &str = "procedural_languages";

fn languages_query(version: ServerVersion) -> CatalogQuery {
    // laninline only exists from 9.0 on; older languages simply have none
    let inline = if version.at_least(ServerVersion::INLINE_HANDLERS) { "l.laninline::text" } else { "'0'" };
    CatalogQuery::new(LANGUAGES_LABEL, format!(
        "SELECT l.oid::text AS oid, l.lanname::text AS name, pg_catalog.pg_get_userbyid(l.lanowner)::text AS owner,
                l.lanispl::text AS ispl, l.lanpltrusted::text AS pltrusted,
                l.lanplcallfoid::text AS handler, {inline} AS inline, l.lanvalidator::text AS validator
         FROM pg_catalog.pg_language l
         WHERE l.lanispl"
    ))
}

fn decode(row: &CatalogRow) -> CatalogResult<ProceduralLanguage> {
    Ok(ProceduralLanguage {
        oid: row.oid("oid")?,
        name: row.text("name")?,
        owner: row.text("owner")?,
        is_pl: row.boolean("ispl")?,
        pl_trusted: row.boolean("pltrusted")?,
        handler: row.oid("handler")?,
        inline: row.opt_oid("inline")?,
        validator: row.opt_oid("validator")?,
    })
}

/// Every installed procedural language, ordered by name.
pub async fn get_procedural_languages<C: CatalogConnection + ?Sized>(conn: &C) -> CatalogResult<Vec<ProceduralLanguage>> {
    let version = conn.server_version().await?;
    version.ensure_supported()?;
    let rows = conn.fetch(&languages_query(version)).await?;
    let mut langs = rows.iter().map(decode).collect::<CatalogResult<Vec<_>>>()?;
    langs.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(target: "predata::catalog", "found {} procedural languages", langs.len());
    Ok(langs)
}
