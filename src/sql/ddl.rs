//! DDL-level translations: PG type names, SERIAL columns, DEFAULT clauses,
//! idempotent ALTER TABLE adds, and sequence DDL.

use super::lexer::{tokenize, Token, TokenKind};
use super::rewrite::*;

pub(crate) fn translate(tokens: Vec<Token>) -> Vec<Token> {
    let tokens = translate_sequence_ddl(tokens);
    let tokens = translate_types(tokens);
    let tokens = translate_serial(tokens);
    let tokens = translate_add_if_not_exists(tokens);
    translate_default_clauses(tokens)
}

/// Maps a single PG type keyword to its SQLite storage class.
fn map_type_keyword(value: &str) -> Option<&'static str> {
    Some(match value {
        "BOOLEAN" | "BOOL" | "SMALLINT" | "INT2" | "INT4" | "INT8" | "BIGINT" => "INTEGER",
        "VARCHAR" | "CHARACTER" | "CHAR" | "TIMESTAMP" | "TIMESTAMPTZ" | "DATE" | "TIME"
        | "TIMETZ" | "UUID" | "JSON" | "JSONB" => "TEXT",
        "FLOAT4" | "FLOAT8" => "REAL",
        "BYTEA" => "BLOB",
        _ => return None,
    })
}

/// Rewrites PG type names to SQLite equivalents, consuming multi-word types
/// ("DOUBLE PRECISION", "CHARACTER VARYING", "TIMESTAMP WITH TIME ZONE") as
/// a unit and discarding `(n)` / `(p,s)` suffixes.
fn translate_types(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let t = &tokens[i];
        if t.kind != TokenKind::Keyword {
            out.push(t.clone());
            i += 1;
            continue;
        }

        match t.value.as_str() {
            "DOUBLE" => {
                if let Some(j) = peek_keyword(&tokens, i + 1, "PRECISION") {
                    out.push(kw("REAL"));
                    i = j + 1;
                    continue;
                }
                out.push(t.clone());
                i += 1;
            }
            "CHARACTER" => {
                let j = skip_ws(&tokens, i + 1);
                out.push(kw("TEXT"));
                if j < tokens.len() && is_keyword(&tokens[j], "VARYING") {
                    i = skip_paren_group(&tokens, j + 1).wrapping_add(1);
                } else {
                    i = skip_paren_group(&tokens, i + 1).wrapping_add(1);
                }
            }
            "VARCHAR" | "CHAR" => {
                out.push(kw("TEXT"));
                i = skip_paren_group(&tokens, i + 1).wrapping_add(1);
            }
            "NUMERIC" | "DECIMAL" => {
                out.push(kw("REAL"));
                i = skip_paren_group(&tokens, i + 1).wrapping_add(1);
            }
            "TIMESTAMP" | "DATE" | "TIME" => {
                // A name glued to an open paren is a call (date('now'),
                // time('now')), not a column type. Translated output must
                // survive re-translation.
                if i + 1 < tokens.len() && is_open_paren(&tokens[i + 1]) {
                    out.push(t.clone());
                    i += 1;
                    continue;
                }
                out.push(kw("TEXT"));
                i = skip_time_zone_suffix(&tokens, i + 1);
            }
            "INTERVAL" => {
                // INTERVAL followed by a string literal is arithmetic
                // (handled by the function pass); only the column type maps.
                let j = skip_ws(&tokens, i + 1);
                if j < tokens.len() && tokens[j].kind == TokenKind::String {
                    out.push(t.clone());
                } else {
                    out.push(kw("TEXT"));
                }
                i += 1;
            }
            _ => {
                if let Some(mapped) = map_type_keyword(&t.value) {
                    out.push(kw(mapped));
                } else {
                    out.push(t.clone());
                }
                i += 1;
            }
        }
    }
    out
}

/// Consumes an optional `(WITH|WITHOUT) TIME ZONE` suffix starting at
/// `start`; returns the index translation should resume from.
fn skip_time_zone_suffix(tokens: &[Token], start: usize) -> usize {
    let j = skip_ws(tokens, start);
    if j < tokens.len() && (is_keyword(&tokens[j], "WITH") || is_keyword(&tokens[j], "WITHOUT")) {
        if let Some(k) = peek_keyword(tokens, j + 1, "TIME") {
            if let Some(l) = peek_keyword(tokens, k + 1, "ZONE") {
                return l + 1;
            }
        }
    }
    start
}

/// Replaces SERIAL/BIGSERIAL/SMALLSERIAL with
/// `INTEGER PRIMARY KEY AUTOINCREMENT`, strips any later
/// `[CONSTRAINT ident] PRIMARY KEY` in the same column definition, and keeps
/// the remaining column constraints after AUTOINCREMENT.
fn translate_serial(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let t = &tokens[i];
        if t.kind == TokenKind::Keyword
            && matches!(t.value.as_str(), "SERIAL" | "BIGSERIAL" | "SMALLSERIAL")
        {
            out.push(kw("INTEGER"));
            out.push(space());
            out.push(kw("PRIMARY"));
            out.push(space());
            out.push(kw("KEY"));
            out.push(space());
            out.push(kw("AUTOINCREMENT"));

            let (rest, next) = column_tail_without_primary_key(&tokens, i + 1);
            let rest = trim_ws(rest);
            if !rest.is_empty() {
                out.push(space());
                out.extend(rest);
            }
            i = next;
            continue;
        }
        out.push(t.clone());
        i += 1;
    }
    out
}

/// Collects the rest of a column definition (up to the next top-level comma,
/// semicolon, or closing paren) with every `[CONSTRAINT ident] PRIMARY KEY`
/// removed. Returns the surviving tokens and the terminator index.
fn column_tail_without_primary_key(tokens: &[Token], start: usize) -> (Vec<Token>, usize) {
    let mut rest: Vec<Token> = Vec::new();
    let mut depth = 0usize;
    let mut j = start;
    while j < tokens.len() {
        let t = &tokens[j];
        if is_open_paren(t) {
            depth += 1;
        } else if is_close_paren(t) {
            if depth == 0 {
                break;
            }
            depth -= 1;
        } else if depth == 0
            && matches!(t.kind, TokenKind::Comma | TokenKind::Semicolon)
        {
            break;
        }

        if depth == 0 {
            if let Some(end) = match_primary_key_clause(tokens, j) {
                while rest.last().map(|t| t.kind) == Some(TokenKind::Whitespace) {
                    rest.pop();
                }
                j = end + 1;
                continue;
            }
        }
        rest.push(t.clone());
        j += 1;
    }
    (rest, j)
}

/// Matches `PRIMARY KEY` or `CONSTRAINT name PRIMARY KEY` starting exactly
/// at `j`; returns the index of the KEY token.
fn match_primary_key_clause(tokens: &[Token], j: usize) -> Option<usize> {
    if is_keyword(&tokens[j], "CONSTRAINT") {
        let name = skip_ws(tokens, j + 1);
        if name < tokens.len()
            && matches!(tokens[name].kind, TokenKind::Identifier | TokenKind::Keyword)
        {
            let primary = peek_keyword(tokens, name + 1, "PRIMARY")?;
            return peek_keyword(tokens, primary + 1, "KEY");
        }
        return None;
    }
    if is_keyword(&tokens[j], "PRIMARY") {
        return peek_keyword(tokens, j + 1, "KEY");
    }
    None
}

/// Wraps `DEFAULT NOW()` and `DEFAULT CURRENT_*` in parentheses; SQLite
/// rejects a bare function call as a column default.
fn translate_default_clauses(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let t = &tokens[i];
        if !is_keyword(t, "DEFAULT") {
            out.push(t.clone());
            i += 1;
            continue;
        }
        out.push(t.clone());

        let j = skip_ws(&tokens, i + 1);
        if j >= tokens.len() || tokens[j].kind != TokenKind::Keyword {
            i += 1;
            continue;
        }
        match tokens[j].value.as_str() {
            "NOW" => {
                let k = skip_ws(&tokens, j + 1);
                if k < tokens.len() && is_open_paren(&tokens[k]) {
                    let l = skip_ws(&tokens, k + 1);
                    if l < tokens.len() && is_close_paren(&tokens[l]) {
                        out.push(space());
                        out.extend(wrapped_datetime_call("datetime"));
                        i = l + 1;
                        continue;
                    }
                }
                i += 1;
            }
            "CURRENT_TIMESTAMP" => {
                out.push(space());
                out.extend(wrapped_datetime_call("datetime"));
                i = j + 1;
            }
            "CURRENT_DATE" => {
                out.push(space());
                out.extend(wrapped_datetime_call("date"));
                i = j + 1;
            }
            "CURRENT_TIME" => {
                out.push(space());
                out.extend(wrapped_datetime_call("time"));
                i = j + 1;
            }
            _ => {
                i += 1;
            }
        }
    }
    out
}

/// Builds `(fn('now'))`.
fn wrapped_datetime_call(func: &str) -> Vec<Token> {
    vec![
        lparen(),
        ident(func),
        lparen(),
        string("'now'"),
        rparen(),
        rparen(),
    ]
}

/// Strips `IF NOT EXISTS` immediately following `ADD` or `ADD COLUMN`; the
/// driver swallows the duplicate-column error instead.
fn translate_add_if_not_exists(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let t = &tokens[i];
        if is_keyword(t, "ADD") {
            let mut anchor = i;
            if let Some(col) = peek_keyword(&tokens, i + 1, "COLUMN") {
                anchor = col;
            }
            if let Some(if_idx) = peek_keyword(&tokens, anchor + 1, "IF") {
                if let Some(not_idx) = peek_keyword(&tokens, if_idx + 1, "NOT") {
                    if let Some(exists_idx) = peek_keyword(&tokens, not_idx + 1, "EXISTS") {
                        out.extend(tokens[i..=anchor].iter().cloned());
                        i = exists_idx + 1;
                        continue;
                    }
                }
            }
        }
        out.push(t.clone());
        i += 1;
    }
    out
}

/// Rewrites top-level sequence DDL against the `_sequences` side table:
/// `CREATE SEQUENCE` seeds a row, `DROP SEQUENCE` deletes it. Unsupported
/// options (MINVALUE, MAXVALUE, CYCLE, OWNED, …) are accepted and ignored.
fn translate_sequence_ddl(tokens: Vec<Token>) -> Vec<Token> {
    for i in 0..tokens.len() {
        if tokens[i].kind != TokenKind::Keyword {
            continue;
        }
        match tokens[i].value.as_str() {
            "CREATE" => {
                if let Some(result) = translate_create_sequence(&tokens, i) {
                    return result;
                }
            }
            "DROP" => {
                if let Some(result) = translate_drop_sequence(&tokens, i) {
                    return result;
                }
            }
            _ => {}
        }
    }
    tokens
}

fn translate_create_sequence(tokens: &[Token], start: usize) -> Option<Vec<Token>> {
    let seq = peek_keyword(tokens, start + 1, "SEQUENCE")?;
    let name_idx = skip_ws(tokens, seq + 1);
    if name_idx >= tokens.len()
        || !matches!(tokens[name_idx].kind, TokenKind::Identifier | TokenKind::Keyword)
    {
        return None;
    }
    let name = tokens[name_idx].value.clone();

    let mut increment: i64 = 1;
    let mut start_with: Option<i64> = None;
    let mut m = name_idx + 1;
    while m < tokens.len() {
        let t = &tokens[m];
        if matches!(t.kind, TokenKind::Whitespace | TokenKind::Semicolon) {
            m += 1;
            continue;
        }
        if t.kind == TokenKind::Keyword {
            match t.value.as_str() {
                "INCREMENT" => {
                    let mut v = skip_ws(tokens, m + 1);
                    if v < tokens.len() && is_keyword(&tokens[v], "BY") {
                        v = skip_ws(tokens, v + 1);
                    }
                    if v < tokens.len() && tokens[v].kind == TokenKind::Number {
                        if let Ok(n) = tokens[v].value.parse() {
                            increment = n;
                        }
                        m = v + 1;
                        continue;
                    }
                    m = v;
                }
                "START" => {
                    let mut v = skip_ws(tokens, m + 1);
                    if v < tokens.len()
                        && (is_keyword(&tokens[v], "WITH") || is_keyword(&tokens[v], "AS"))
                    {
                        v = skip_ws(tokens, v + 1);
                    }
                    if v < tokens.len() && tokens[v].kind == TokenKind::Number {
                        if let Ok(n) = tokens[v].value.parse() {
                            start_with = Some(n);
                        }
                        m = v + 1;
                        continue;
                    }
                    m = v;
                }
                _ => m += 1,
            }
        } else {
            m += 1;
        }
    }

    // Seed so the first nextval returns the declared start (or 1 by default).
    let seed = start_with.map(|s| s - increment).unwrap_or(0);
    let sql = format!(
        "INSERT OR IGNORE INTO _sequences (name, current_value, increment) VALUES ('{}', {}, {})",
        name, seed, increment
    );
    Some(tokenize(&sql))
}

fn translate_drop_sequence(tokens: &[Token], start: usize) -> Option<Vec<Token>> {
    let seq = peek_keyword(tokens, start + 1, "SEQUENCE")?;
    let mut k = skip_ws(tokens, seq + 1);

    if k < tokens.len() && is_keyword(&tokens[k], "IF") {
        if let Some(exists_idx) = peek_keyword(tokens, k + 1, "EXISTS") {
            k = skip_ws(tokens, exists_idx + 1);
        }
    }

    if k >= tokens.len() || !matches!(tokens[k].kind, TokenKind::Identifier | TokenKind::Keyword) {
        return None;
    }
    let sql = format!(
        "DELETE FROM _sequences WHERE name = '{}'",
        tokens[k].value
    );
    Some(tokenize(&sql))
}

#[cfg(test)]
mod tests {
    use crate::sql::translate;

    fn tr(sql: &str) -> String {
        translate(sql).unwrap()
    }

    #[test]
    fn serial_variants() {
        let cases = [
            (
                "CREATE TABLE users (id SERIAL PRIMARY KEY, name TEXT)",
                "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT)",
            ),
            (
                "CREATE TABLE users (id SERIAL, name TEXT)",
                "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT)",
            ),
            (
                "CREATE TABLE t (id BIGSERIAL PRIMARY KEY)",
                "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT)",
            ),
            (
                "CREATE TABLE t (id SERIAL NOT NULL PRIMARY KEY, name TEXT)",
                "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, name TEXT)",
            ),
            (
                "CREATE TABLE t (id SERIAL UNIQUE PRIMARY KEY, name TEXT)",
                "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT UNIQUE, name TEXT)",
            ),
            (
                "CREATE TABLE t (id SERIAL CONSTRAINT pk PRIMARY KEY)",
                "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT)",
            ),
            (
                "CREATE TABLE t (id SMALLSERIAL NOT NULL PRIMARY KEY)",
                "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL)",
            ),
        ];
        for (input, want) in cases {
            assert_eq!(tr(input), want, "input: {input}");
        }
    }

    #[test]
    fn type_mapping() {
        let cases = [
            ("CREATE TABLE t (name VARCHAR(100))", "CREATE TABLE t (name TEXT)"),
            (
                "CREATE TABLE t (name CHARACTER VARYING(255))",
                "CREATE TABLE t (name TEXT)",
            ),
            ("CREATE TABLE t (active BOOLEAN)", "CREATE TABLE t (active INTEGER)"),
            (
                "CREATE TABLE t (created_at TIMESTAMP WITH TIME ZONE)",
                "CREATE TABLE t (created_at TEXT)",
            ),
            ("CREATE TABLE t (ts TIMESTAMPTZ)", "CREATE TABLE t (ts TEXT)"),
            ("CREATE TABLE t (id UUID)", "CREATE TABLE t (id TEXT)"),
            ("CREATE TABLE t (data BYTEA)", "CREATE TABLE t (data BLOB)"),
            ("CREATE TABLE t (meta JSONB)", "CREATE TABLE t (meta TEXT)"),
            ("CREATE TABLE t (val DOUBLE PRECISION)", "CREATE TABLE t (val REAL)"),
            ("CREATE TABLE t (price NUMERIC(10,2))", "CREATE TABLE t (price REAL)"),
            ("CREATE TABLE t (n SMALLINT)", "CREATE TABLE t (n INTEGER)"),
            ("CREATE TABLE t (n BIGINT)", "CREATE TABLE t (n INTEGER)"),
            ("CREATE TABLE t (d INTERVAL)", "CREATE TABLE t (d TEXT)"),
            ("CREATE TABLE t (tm TIME WITHOUT TIME ZONE)", "CREATE TABLE t (tm TEXT)"),
        ];
        for (input, want) in cases {
            assert_eq!(tr(input), want, "input: {input}");
        }
    }

    #[test]
    fn default_clauses() {
        assert_eq!(
            tr("CREATE TABLE t (created_at TIMESTAMP DEFAULT NOW())"),
            "CREATE TABLE t (created_at TEXT DEFAULT (datetime('now')))"
        );
        assert_eq!(
            tr("CREATE TABLE t (created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP)"),
            "CREATE TABLE t (created_at TEXT DEFAULT (datetime('now')))"
        );
        assert_eq!(
            tr("CREATE TABLE t (d DATE DEFAULT CURRENT_DATE)"),
            "CREATE TABLE t (d TEXT DEFAULT (date('now')))"
        );
        assert_eq!(
            tr("CREATE TABLE t (tm TIME DEFAULT CURRENT_TIME)"),
            "CREATE TABLE t (tm TEXT DEFAULT (time('now')))"
        );
    }

    #[test]
    fn complex_table() {
        assert_eq!(
            tr("CREATE TABLE users (id SERIAL PRIMARY KEY, name VARCHAR(100) NOT NULL, email VARCHAR(255) UNIQUE, active BOOLEAN DEFAULT TRUE, created_at TIMESTAMP DEFAULT NOW())"),
            "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, email TEXT UNIQUE, active INTEGER DEFAULT 1, created_at TEXT DEFAULT (datetime('now')))"
        );
    }

    #[test]
    fn alter_add_if_not_exists_is_stripped() {
        assert_eq!(
            tr("ALTER TABLE t ADD COLUMN IF NOT EXISTS c INTEGER"),
            "ALTER TABLE t ADD COLUMN c INTEGER"
        );
        assert_eq!(
            tr("ALTER TABLE t ADD IF NOT EXISTS c INTEGER"),
            "ALTER TABLE t ADD c INTEGER"
        );
        // Plain adds pass through untouched
        assert_eq!(
            tr("ALTER TABLE t ADD COLUMN c INTEGER"),
            "ALTER TABLE t ADD COLUMN c INTEGER"
        );
    }

    #[test]
    fn create_sequence() {
        let cases = [
            (
                "CREATE SEQUENCE my_seq",
                "INSERT OR IGNORE INTO _sequences (name, current_value, increment) VALUES ('my_seq', 0, 1)",
            ),
            (
                "CREATE SEQUENCE my_seq INCREMENT BY 5",
                "INSERT OR IGNORE INTO _sequences (name, current_value, increment) VALUES ('my_seq', 0, 5)",
            ),
            (
                "CREATE SEQUENCE my_seq START WITH 100",
                "INSERT OR IGNORE INTO _sequences (name, current_value, increment) VALUES ('my_seq', 99, 1)",
            ),
            (
                "CREATE SEQUENCE my_seq INCREMENT BY 2 START WITH 10 MINVALUE 1 MAXVALUE 500 CYCLE",
                "INSERT OR IGNORE INTO _sequences (name, current_value, increment) VALUES ('my_seq', 8, 2)",
            ),
        ];
        for (input, want) in cases {
            assert_eq!(tr(input), want, "input: {input}");
        }
    }

    #[test]
    fn drop_sequence() {
        assert_eq!(
            tr("DROP SEQUENCE my_seq"),
            "DELETE FROM _sequences WHERE name = 'my_seq'"
        );
        assert_eq!(
            tr("DROP SEQUENCE IF EXISTS my_seq"),
            "DELETE FROM _sequences WHERE name = 'my_seq'"
        );
        // DROP TABLE is not sequence DDL
        assert_eq!(tr("DROP TABLE users"), "DROP TABLE users");
    }
}
