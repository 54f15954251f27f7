//! Substitution of file references by escaped table names.

use crate::scanner::table_spans;
use std::collections::HashSet;

/// Rewrites file references in one query.
///
/// Each distinct raw reference is rewritten at most once per session. An
/// escaped name no longer equals the raw reference, so rewriting twice gives
/// the same text as rewriting once.
#[derive(Debug, Default)]
pub struct QueryRewriter {
    done: HashSet<String>,
}

impl QueryRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every table-position occurrence of `raw` in `sql` with `escaped`.
    pub fn rewrite(&mut self, sql: &str, raw: &str, escaped: &str) -> String {
        if raw.is_empty() || raw == escaped || !self.done.insert(raw.to_string()) {
            return sql.to_string();
        }
        replace_reference(sql, raw, escaped)
    }
}

/// Replace `raw` with `escaped` wherever it stands in table position.
///
/// Only whole fields following `FROM`, `JOIN` or a comma of a table list are
/// touched; string literals and longer references containing `raw` stay as
/// they are.
pub fn replace_reference(sql: &str, raw: &str, escaped: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut cursor = 0;
    for table in table_spans(sql) {
        if table.name != raw {
            continue;
        }
        out.push_str(&sql[cursor..table.span.start]);
        out.push_str(escaped);
        cursor = table.span.end;
    }
    out.push_str(&sql[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_reference() {
        let mut rw = QueryRewriter::new();
        assert_eq!(
            rw.rewrite("SELECT * FROM test.csv", "test.csv", "`test.csv`"),
            "SELECT * FROM `test.csv`"
        );
    }

    #[test]
    fn test_rewrite_idempotent() {
        let sql = "SELECT t.c1 FROM test.csv AS t";
        let once = replace_reference(sql, "test.csv", "`test.csv`");
        let twice = replace_reference(&once, "test.csv", "`test.csv`");
        assert_eq!(once, "SELECT t.c1 FROM `test.csv` AS t");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rewrite_once_per_reference() {
        let mut rw = QueryRewriter::new();
        let sql = rw.rewrite("SELECT * FROM a", "a", "\"a\"");
        assert_eq!(sql, "SELECT * FROM \"a\"");
        assert_eq!(rw.rewrite(&sql, "a", "\"a\""), sql);
    }

    #[test]
    fn test_rewrite_word_boundary() {
        assert_eq!(
            replace_reference("SELECT x FROM t, t2", "t", "`t`"),
            "SELECT x FROM `t`, t2"
        );
    }

    #[test]
    fn test_rewrite_all_occurrences() {
        assert_eq!(
            replace_reference("SELECT * FROM a.csv UNION SELECT * FROM a.csv", "a.csv", "\"a.csv\""),
            "SELECT * FROM \"a.csv\" UNION SELECT * FROM \"a.csv\""
        );
    }

    #[test]
    fn test_rewrite_overlapping_references() {
        let mut rw = QueryRewriter::new();
        let sql = "SELECT a.c1, b.c1 FROM x.csv AS a, sub/x.csv AS b";
        let sql = rw.rewrite(sql, "x.csv", "`x.csv`");
        let sql = rw.rewrite(&sql, "sub/x.csv", "`sub/x.csv`");
        assert_eq!(sql, "SELECT a.c1, b.c1 FROM `x.csv` AS a, `sub/x.csv` AS b");
    }

    #[test]
    fn test_rewrite_skips_longer_reference() {
        assert_eq!(
            replace_reference("SELECT * FROM data.csv.gz", "data.csv", "`data.csv`"),
            "SELECT * FROM data.csv.gz"
        );
        assert_eq!(
            replace_reference(
                "SELECT * FROM doc.json, doc.json::items",
                "doc.json",
                "`doc.json`"
            ),
            "SELECT * FROM `doc.json`, doc.json::items"
        );
    }

    #[test]
    fn test_rewrite_skips_string_literal() {
        assert_eq!(
            replace_reference(
                "SELECT 'x.csv' AS src FROM x.csv WHERE c1 <> 'x.csv'",
                "x.csv",
                "`x.csv`"
            ),
            "SELECT 'x.csv' AS src FROM `x.csv` WHERE c1 <> 'x.csv'"
        );
    }

    #[test]
    fn test_rewrite_quoted_noop() {
        let mut rw = QueryRewriter::new();
        let sql = "SELECT * FROM `my file.csv`";
        assert_eq!(rw.rewrite(sql, "`my file.csv`", "`my file.csv`"), sql);
    }

    #[test]
    fn test_rewrite_no_reference() {
        let sql = "SELECT 1+1";
        assert_eq!(replace_reference(sql, "x.csv", "`x.csv`"), sql);
    }
}
