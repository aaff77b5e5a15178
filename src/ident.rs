//! Identifier and signature normalization
//! --------------------------------------
//! Turns user-supplied names and argument lists into the form the catalog
//! stores or prints, plus literal escaping for generated SQL.

/// Normalize an identifier according to SQL rules:
/// - If enclosed in double-quotes, strip quotes (unescaping `""`) and preserve case
/// - Otherwise, convert to lowercase for case-insensitive matching
pub fn normalize_identifier(ident: &str) -> String {
    let trimmed = ident.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len()-1].replace("\"\"", "\"")
    } else {
        trimmed.to_ascii_lowercase()
    }
}

/// Split a parameter-type list into its argument types: outer parentheses
/// dropped, each type trimmed. Commas nested inside parentheses (typmods)
/// stay with their type. An empty list yields no arguments.
pub fn signature_args(sig: &str) -> Vec<String> {
    let mut s = sig.trim();
    if s.starts_with('(') && s.ends_with(')') { s = &s[1..s.len()-1]; }
    let mut parts: Vec<String> = Vec::new();
    let mut depth = 0i32;
    let mut cur = String::new();
    for c in s.chars() {
        match c {
            '(' => { depth += 1; cur.push(c); }
            ')' => { depth -= 1; cur.push(c); }
            ',' if depth == 0 => { parts.push(cur.trim().to_string()); cur.clear(); }
            _ => cur.push(c),
        }
    }
    if !cur.trim().is_empty() || !parts.is_empty() { parts.push(cur.trim().to_string()); }
    parts
}

/// Quote a value as a SQL string literal the way the server's
/// `quote_literal` does: quotes doubled, and backslashes doubled under an
/// `E''` prefix so the result reads the same whatever
/// `standard_conforming_strings` is set to.
pub fn quote_literal(value: &str) -> String {
    let quoted = value.replace('\'', "''");
    if value.contains('\\') {
        format!("E'{}'", quoted.replace('\\', "\\\\"))
    } else {
        format!("'{}'", quoted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_rules() {
        assert_eq!(normalize_identifier("TestSchema"), "testschema");
        assert_eq!(normalize_identifier("\"testFunc\""), "testFunc");
        assert_eq!(normalize_identifier("  \"a\"\"b\" "), "a\"b");
    }

    #[test]
    fn signatures_split_into_arguments() {
        assert_eq!(signature_args("(integer,text)"), vec!["integer", "text"]);
        assert_eq!(signature_args(" path ,  path "), vec!["path", "path"]);
        assert_eq!(signature_args("numeric(10, 2), int"), vec!["numeric(10, 2)", "int"]);
        assert_eq!(signature_args("NONE, bigint"), vec!["NONE", "bigint"]);
        assert!(signature_args("()").is_empty());
        assert!(signature_args("").is_empty());
    }

    #[test]
    fn literals_escape_quotes_and_backslashes() {
        assert_eq!(quote_literal("o'brien"), "'o''brien'");
        assert_eq!(quote_literal("int4"), "'int4'");
        assert_eq!(quote_literal("a\\b'c"), "E'a\\\\b''c'");
    }
}
