//! PostgreSQL → SQLite statement translation.
//!
//! The translator is a linear pipeline over a flat token stream: tokenize,
//! then run ordered rewrite passes, then reassemble the raw text. It never
//! fails — unrecognised constructs pass through untouched and the engine
//! downstream is the arbiter of what is actually executable.

pub mod lexer;
mod rewrite;

mod ddl;
mod expr;
mod func;
mod order;

pub use lexer::{reassemble, tokenize, Token, TokenKind};

use crate::error::PgError;
use rewrite::*;

/// Translates a PostgreSQL-flavored statement into SQLite-compatible SQL.
///
/// The error channel exists for forward compatibility; none of the current
/// rewrites use it.
pub fn translate(sql: &str) -> Result<String, PgError> {
    let tokens = tokenize(sql);
    let tokens = ddl::translate(tokens);
    let tokens = expr::translate(tokens);
    let tokens = func::translate(tokens);
    let tokens = order::translate(tokens);
    let tokens = translate_params(tokens);
    let tokens = translate_explain(tokens);
    Ok(reassemble(&tokens))
}

/// `$1, $2, …` → `?`. Positional order is preserved; the driver binds
/// arguments in the same order.
fn translate_params(mut tokens: Vec<Token>) -> Vec<Token> {
    for t in &mut tokens {
        if t.kind == TokenKind::Parameter {
            *t = op("?");
        }
    }
    tokens
}

/// Leading `EXPLAIN [ANALYZE] [VERBOSE]` → `EXPLAIN QUERY PLAN`. An input
/// already starting `EXPLAIN QUERY …` is left alone.
fn translate_explain(tokens: Vec<Token>) -> Vec<Token> {
    let mut first = 0;
    while first < tokens.len()
        && matches!(tokens[first].kind, TokenKind::Whitespace | TokenKind::Comment)
    {
        first += 1;
    }
    if first >= tokens.len() || !is_keyword(&tokens[first], "EXPLAIN") {
        return tokens;
    }
    if peek_keyword(&tokens, first + 1, "QUERY").is_some() {
        return tokens;
    }

    let mut cursor = first + 1;
    if let Some(a) = peek_keyword(&tokens, cursor, "ANALYZE") {
        cursor = a + 1;
    }
    if let Some(v) = peek_keyword(&tokens, cursor, "VERBOSE") {
        cursor = v + 1;
    }

    let mut out: Vec<Token> = tokens[..first].to_vec();
    out.extend([kw("EXPLAIN"), space(), kw("QUERY"), space(), kw("PLAN")]);
    out.extend(tokens[cursor..].iter().cloned());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tr(sql: &str) -> String {
        translate(sql).unwrap()
    }

    #[test]
    fn passthrough_statements_are_unchanged() {
        let cases = [
            "SELECT 1",
            "SELECT * FROM t WHERE id = 1",
            "INSERT INTO t (a) VALUES (1)",
            "UPDATE t SET a = 1 WHERE id = 2",
            "DELETE FROM t WHERE id = 1",
            "CREATE INDEX idx_t_a ON t (a)",
            "SELECT a, b -- trailing comment\nFROM t",
            "SELECT /* inline */ 1;",
        ];
        for input in cases {
            assert_eq!(tr(input), input, "input: {input}");
        }
    }

    #[test]
    fn params_become_positional_placeholders() {
        assert_eq!(tr("SELECT * FROM t WHERE id = $1"), "SELECT * FROM t WHERE id = ?");
        assert_eq!(
            tr("INSERT INTO t (a, b) VALUES ($1, $2)"),
            "INSERT INTO t (a, b) VALUES (?, ?)"
        );
        // $N inside a string literal is not a parameter
        assert_eq!(tr("SELECT 'cost is $1'"), "SELECT 'cost is $1'");
    }

    #[test]
    fn explain_forms() {
        let cases = [
            ("EXPLAIN SELECT * FROM t", "EXPLAIN QUERY PLAN SELECT * FROM t"),
            (
                "EXPLAIN ANALYZE SELECT * FROM t WHERE id = 1",
                "EXPLAIN QUERY PLAN SELECT * FROM t WHERE id = 1",
            ),
            ("EXPLAIN VERBOSE SELECT * FROM t", "EXPLAIN QUERY PLAN SELECT * FROM t"),
            (
                "EXPLAIN ANALYZE VERBOSE SELECT * FROM t",
                "EXPLAIN QUERY PLAN SELECT * FROM t",
            ),
            // Already SQLite syntax: untouched
            (
                "EXPLAIN QUERY PLAN SELECT * FROM t",
                "EXPLAIN QUERY PLAN SELECT * FROM t",
            ),
        ];
        for (input, want) in cases {
            assert_eq!(tr(input), want, "input: {input}");
        }
    }

    #[test]
    fn dollar_quoted_strings() {
        let cases = [
            ("SELECT $$hello world$$", "SELECT 'hello world'"),
            ("SELECT $fn$body text$fn$", "SELECT 'body text'"),
            ("SELECT $$it's a test$$", "SELECT 'it''s a test'"),
            ("SELECT $$$$", "SELECT ''"),
            ("INSERT INTO t (val) VALUES ($$hello$$)", "INSERT INTO t (val) VALUES ('hello')"),
            ("SELECT $1, $$literal$$", "SELECT ?, 'literal'"),
        ];
        for (input, want) in cases {
            assert_eq!(tr(input), want, "input: {input}");
        }
    }

    #[test]
    fn seed_scenarios() {
        let cases = [
            (
                "CREATE TABLE users (id SERIAL PRIMARY KEY, name VARCHAR(100) NOT NULL, active BOOLEAN DEFAULT TRUE, created_at TIMESTAMP DEFAULT NOW())",
                "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, active INTEGER DEFAULT 1, created_at TEXT DEFAULT (datetime('now')))",
            ),
            (
                "SELECT '42'::INTEGER, name ILIKE '%x%' FROM t WHERE active IS NOT FALSE AND id = $1",
                "SELECT CAST('42' AS INTEGER), name LIKE '%x%' FROM t WHERE active != 0 AND id = ?",
            ),
            (
                "SELECT EXTRACT(year FROM created_at), date_trunc('month', created_at) FROM t ORDER BY name ASC NULLS FIRST",
                "SELECT CAST(strftime('%Y', created_at) AS INTEGER), strftime('%Y-%m-01', created_at) FROM t ORDER BY (CASE WHEN name IS NULL THEN 0 ELSE 1 END), name ASC",
            ),
            (
                "SELECT * FROM generate_series(1, 5) AS s",
                "WITH RECURSIVE _gs(value) AS (SELECT 1 UNION ALL SELECT value + 1 FROM _gs WHERE value + 1 <= 5) SELECT * FROM _gs AS s",
            ),
            (
                "SELECT $$it's a test$$, E'a\\nb'",
                "SELECT 'it''s a test', 'a\nb'",
            ),
            (
                "SELECT ts + INTERVAL '2 hours' FROM t WHERE name ~* '^a'",
                "SELECT datetime(ts, '+2 hours') FROM t WHERE pg_regex_match(name, '^a', 1)",
            ),
        ];
        for (input, want) in cases {
            assert_eq!(tr(input), want, "input: {input}");
        }
    }

    #[test]
    fn translation_is_idempotent() {
        let inputs = [
            "CREATE TABLE users (id SERIAL PRIMARY KEY, name VARCHAR(100) NOT NULL, active BOOLEAN DEFAULT TRUE, created_at TIMESTAMP DEFAULT NOW())",
            "SELECT '42'::INTEGER, name ILIKE '%x%' FROM t WHERE active IS NOT FALSE AND id = $1",
            "SELECT EXTRACT(year FROM created_at), date_trunc('month', created_at) FROM t ORDER BY name ASC NULLS FIRST",
            "SELECT * FROM generate_series(1, 5) AS s",
            "SELECT ts + INTERVAL '2 hours' FROM t WHERE name ~* '^a'",
            "EXPLAIN ANALYZE SELECT * FROM t",
            "CREATE SEQUENCE my_seq START WITH 100",
            "SELECT to_char(ts, 'Mon DD, YYYY') FROM t",
            "SELECT NOW() + INTERVAL '1 day'",
        ];
        for input in inputs {
            let once = tr(input);
            assert_eq!(tr(&once), once, "not a fixed point: {input}");
        }
    }

    #[test]
    fn parameter_count_is_preserved() {
        let input = "SELECT * FROM t WHERE a = $1 AND b = $2 AND c LIKE '%?%' AND d = $11";
        let output = tr(input);
        // three params plus the literal ? inside the string
        assert_eq!(output.matches('?').count(), 4);
    }

    #[test]
    fn paren_balance_is_preserved() {
        let inputs = [
            "SELECT EXTRACT(year FROM lower(x)) FROM t WHERE (a = 1 AND (b = 2))",
            "SELECT concat(a, b, c), date_trunc('month', ts) FROM t ORDER BY f(x) NULLS LAST",
            "CREATE TABLE t (id SERIAL PRIMARY KEY, price NUMERIC(10,2) CHECK (price > 0))",
            "SELECT * FROM generate_series(1, 10, 2) AS g",
        ];
        for input in inputs {
            let output = tr(input);
            assert_eq!(
                output.matches('(').count(),
                output.matches(')').count(),
                "unbalanced: {output}"
            );
        }
    }
}
