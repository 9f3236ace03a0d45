pub const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

pub const SCHEMA_VERSION: &str = "1.0.0";

/// Splits a script on `;` outside quoted text.
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;

    for ch in sql.chars() {
        match ch {
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
            }
            ';' if !in_single_quote && !in_double_quote => {
                let stmt = strip_comment_lines(&current);
                if !stmt.is_empty() {
                    statements.push(stmt);
                }
                current.clear();
                continue;
            }
            _ => {}
        }

        current.push(ch);
    }

    let tail = strip_comment_lines(&current);
    if !tail.is_empty() {
        statements.push(tail);
    }

    statements
}

fn strip_comment_lines(stmt: &str) -> String {
    stmt.lines()
        .filter(|line| !line.trim().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_respects_quotes() {
        let sql = "CREATE TABLE a (x TEXT DEFAULT 'a;b');\n-- note\nCREATE INDEX i ON a(x);";
        let stmts = split_sql_statements(sql);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].contains("'a;b'"));
        assert_eq!(stmts[1], "CREATE INDEX i ON a(x)");
    }

    #[test]
    fn test_schema_has_all_tables() {
        let stmts = split_sql_statements(SCHEMA_SQL);
        for table in ["_db_metadata", "students", "exercise_sessions", "adventure_maps"] {
            assert!(
                stmts.iter().any(|s| s.starts_with("CREATE TABLE") && s.contains(&format!("\"{table}\""))),
                "missing table {table}"
            );
        }
        assert!(stmts.iter().all(|s| !s.starts_with("--")));
    }
}
