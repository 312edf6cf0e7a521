//! Expression-level translations: `::` casts, ILIKE, escape strings,
//! boolean predicates and literals, regex operators, SIMILAR TO.

use super::lexer::{Token, TokenKind};
use super::rewrite::*;

pub(crate) fn translate(tokens: Vec<Token>) -> Vec<Token> {
    let tokens = translate_cast(tokens);
    let tokens = translate_ilike(tokens);
    let tokens = translate_escape_strings(tokens);
    let tokens = translate_is_true_false(tokens);
    let tokens = translate_booleans(tokens);
    let tokens = translate_regex_ops(tokens);
    translate_similar_to(tokens)
}

/// Converts `expr::type` to `CAST(expr AS mapped_type)`.
fn translate_cast(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].kind == TokenKind::Operator && tokens[i].value == "::" {
            let start = left_expr_start(&out);
            let expr: Vec<Token> = out.split_off(start);

            let (type_tokens, end) = extract_type_name(&tokens, i + 1);
            let type_name = assemble_type_name(&type_tokens);
            let mapped = map_cast_type(&type_name);

            out.push(kw("CAST"));
            out.push(lparen());
            out.extend(expr);
            out.push(space());
            out.push(kw("AS"));
            out.push(space());
            out.push(ident(&mapped));
            out.push(rparen());
            i = end + 1;
            continue;
        }
        out.push(tokens[i].clone());
        i += 1;
    }
    out
}

/// Reads a type name starting at `start`: the leading keyword/identifier,
/// any multi-word continuation (PRECISION, VARYING, WITH TIME ZONE), and an
/// optional discarded `(n)` / `(n,m)` suffix. Returns the name tokens and
/// the last index consumed.
fn extract_type_name(tokens: &[Token], start: usize) -> (Vec<Token>, usize) {
    let mut result = Vec::new();
    let mut i = skip_ws(tokens, start);
    if i >= tokens.len() {
        return (result, start);
    }

    if matches!(tokens[i].kind, TokenKind::Keyword | TokenKind::Identifier) {
        result.push(tokens[i].clone());
        i += 1;

        loop {
            let j = skip_ws(tokens, i);
            if j < tokens.len()
                && tokens[j].kind == TokenKind::Keyword
                && matches!(
                    tokens[j].value.as_str(),
                    "PRECISION" | "VARYING" | "ZONE" | "WITH" | "WITHOUT" | "TIME"
                )
            {
                result.push(tokens[j].clone());
                i = j + 1;
                continue;
            }
            break;
        }

        let j = skip_ws(tokens, i);
        if j < tokens.len() && is_open_paren(&tokens[j]) {
            let mut depth = 1;
            let mut j = j + 1;
            while j < tokens.len() && depth > 0 {
                if is_open_paren(&tokens[j]) {
                    depth += 1;
                } else if is_close_paren(&tokens[j]) {
                    depth -= 1;
                }
                j += 1;
            }
            i = j;
        }
    }

    (result, i - 1)
}

fn assemble_type_name(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.value.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Maps a PG type name (possibly multi-word) to its SQLite CAST target.
fn map_cast_type(pg_type: &str) -> String {
    let upper = pg_type.to_uppercase();
    match upper.as_str() {
        "INTEGER" | "INT" | "INT4" | "SMALLINT" | "INT2" | "BIGINT" | "INT8" => {
            "INTEGER".to_string()
        }
        "REAL" | "FLOAT4" | "FLOAT8" | "DOUBLE PRECISION" | "NUMERIC" | "DECIMAL" => {
            "REAL".to_string()
        }
        "TEXT" | "VARCHAR" | "CHARACTER VARYING" | "CHAR" | "CHARACTER" | "UUID" | "JSON"
        | "JSONB" | "TIMESTAMP" | "TIMESTAMP WITH TIME ZONE" | "TIMESTAMP WITHOUT TIME ZONE"
        | "TIMESTAMPTZ" | "DATE" | "TIME" | "TIME WITH TIME ZONE" | "TIMETZ" | "INTERVAL" => {
            "TEXT".to_string()
        }
        "BOOLEAN" | "BOOL" => "INTEGER".to_string(),
        "BYTEA" => "BLOB".to_string(),
        _ => upper,
    }
}

/// ILIKE → LIKE. SQLite's LIKE is already case-insensitive for ASCII.
fn translate_ilike(mut tokens: Vec<Token>) -> Vec<Token> {
    for t in &mut tokens {
        if is_keyword(t, "ILIKE") {
            *t = kw("LIKE");
        }
    }
    tokens
}

/// TRUE → 1, FALSE → 0.
fn translate_booleans(mut tokens: Vec<Token>) -> Vec<Token> {
    for t in &mut tokens {
        if t.kind == TokenKind::Keyword {
            match t.value.as_str() {
                "TRUE" => *t = num("1"),
                "FALSE" => *t = num("0"),
                _ => {}
            }
        }
    }
    tokens
}

/// Resolves `E'…'` escape strings into plain single-quoted strings.
fn translate_escape_strings(mut tokens: Vec<Token>) -> Vec<Token> {
    for t in &mut tokens {
        if t.kind == TokenKind::String
            && (t.raw.starts_with("E'") || t.raw.starts_with("e'"))
        {
            let inner = &t.raw[2..];
            let inner = inner.strip_suffix('\'').unwrap_or(inner);
            let resolved = resolve_escapes(inner);
            let quoted = format!("'{}'", resolved.replace('\'', "''"));
            *t = Token::new(TokenKind::String, quoted);
        }
    }
    tokens
}

/// Processes backslash escape sequences. Only `\n \t \r \\ \'` resolve;
/// anything else keeps its backslash.
fn resolve_escapes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// `IS TRUE` → `= 1`, `IS FALSE` → `= 0`, `IS NOT TRUE` → `!= 1`,
/// `IS NOT FALSE` → `!= 0`. `IS [NOT] NULL` passes through.
fn translate_is_true_false(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if !is_keyword(&tokens[i], "IS") {
            out.push(tokens[i].clone());
            i += 1;
            continue;
        }

        let j = skip_ws(&tokens, i + 1);

        if j < tokens.len() && is_keyword(&tokens[j], "NOT") {
            let k = skip_ws(&tokens, j + 1);
            if k < tokens.len() && tokens[k].kind == TokenKind::Keyword {
                match tokens[k].value.as_str() {
                    "TRUE" => {
                        out.extend([op("!="), space(), num("1")]);
                        i = k + 1;
                        continue;
                    }
                    "FALSE" => {
                        out.extend([op("!="), space(), num("0")]);
                        i = k + 1;
                        continue;
                    }
                    _ => {}
                }
            }
        }

        if j < tokens.len() && tokens[j].kind == TokenKind::Keyword {
            match tokens[j].value.as_str() {
                "TRUE" => {
                    out.extend([op("="), space(), num("1")]);
                    i = j + 1;
                    continue;
                }
                "FALSE" => {
                    out.extend([op("="), space(), num("0")]);
                    i = j + 1;
                    continue;
                }
                _ => {}
            }
        }

        out.push(tokens[i].clone());
        i += 1;
    }
    out
}

/// Rewrites `lhs ~ rhs`, `~*`, `!~`, `!~*` to
/// `[NOT ]pg_regex_match(lhs, rhs, ci)` where ci is 1 for the
/// case-insensitive forms. The match itself runs in the registered helper.
fn translate_regex_ops(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let t = &tokens[i];
        if t.kind == TokenKind::Operator
            && matches!(t.value.as_str(), "~" | "~*" | "!~" | "!~*")
        {
            let negated = t.value.starts_with('!');
            let ci = t.value.ends_with('*');

            if let Some((lhs, start)) = take_lhs(&mut out) {
                if let Some((rhs, rhs_end)) = right_expr(&tokens, i + 1) {
                    if negated {
                        out.push(kw("NOT"));
                        out.push(space());
                    }
                    out.push(ident("pg_regex_match"));
                    out.push(lparen());
                    out.extend(lhs);
                    out.push(comma());
                    out.push(space());
                    out.extend(rhs);
                    out.push(comma());
                    out.push(space());
                    out.push(num(if ci { "1" } else { "0" }));
                    out.push(rparen());
                    i = rhs_end + 1;
                    continue;
                }
                // No right operand: restore what was taken
                out.truncate(start);
                out.extend(lhs);
            }
        }
        out.push(tokens[i].clone());
        i += 1;
    }
    out
}

/// `lhs [NOT] SIMILAR TO pattern` → `[NOT ]pg_similar_match(lhs, pattern)`.
fn translate_similar_to(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if is_keyword(&tokens[i], "SIMILAR") {
            if let Some(to_idx) = peek_keyword(&tokens, i + 1, "TO") {
                if let Some((pattern, pat_end)) = right_expr(&tokens, to_idx + 1) {
                    let mut end = out.len();
                    while end > 0 && out[end - 1].kind == TokenKind::Whitespace {
                        end -= 1;
                    }
                    let mut negated = false;
                    if end > 0 && is_keyword(&out[end - 1], "NOT") {
                        negated = true;
                        end -= 1;
                        while end > 0 && out[end - 1].kind == TokenKind::Whitespace {
                            end -= 1;
                        }
                    }
                    if end > 0 {
                        let start = left_expr_start(&out[..end]);
                        let lhs = out[start..end].to_vec();
                        out.truncate(start);
                        if negated {
                            out.push(kw("NOT"));
                            out.push(space());
                        }
                        out.push(ident("pg_similar_match"));
                        out.push(lparen());
                        out.extend(lhs);
                        out.push(comma());
                        out.push(space());
                        out.extend(pattern);
                        out.push(rparen());
                        i = pat_end + 1;
                        continue;
                    }
                }
            }
        }
        out.push(tokens[i].clone());
        i += 1;
    }
    out
}

/// Removes the expression (and any whitespace after it) from the end of the
/// emitted tokens. Returns the expression and the truncation point, or None
/// if nothing usable precedes the operator.
fn take_lhs(out: &mut Vec<Token>) -> Option<(Vec<Token>, usize)> {
    let mut end = out.len();
    while end > 0 && out[end - 1].kind == TokenKind::Whitespace {
        end -= 1;
    }
    if end == 0 {
        return None;
    }
    let start = left_expr_start(&out[..end]);
    let lhs = out[start..end].to_vec();
    out.truncate(start);
    Some((lhs, start))
}
