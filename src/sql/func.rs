//! Function-level translations: datetime functions, string helpers,
//! aggregates, INTERVAL arithmetic, and the generate_series CTE rewrite.

use super::lexer::{reassemble, tokenize, Token, TokenKind};
use super::rewrite::*;

pub(crate) fn translate(tokens: Vec<Token>) -> Vec<Token> {
    // INTERVAL arithmetic first: it must see NOW() with its keyword form
    // intact to capture it as the left-hand side.
    let tokens = translate_interval(tokens);
    let tokens = translate_now(tokens);
    let tokens = translate_current_datetime(tokens);
    let tokens = translate_date_trunc(tokens);
    let tokens = translate_extract(tokens);
    let tokens = translate_left_right(tokens);
    let tokens = translate_concat(tokens);
    let tokens = translate_agg_funcs(tokens);
    translate_generate_series(tokens)
}

/// `expr + INTERVAL 'N unit'` (or `INTERVAL 'N' UNIT`) →
/// `datetime(expr, '+N unit')`.
fn translate_interval(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let t = &tokens[i];
        if t.kind == TokenKind::Operator && (t.value == "+" || t.value == "-") {
            if let Some((modifier, end_idx)) = match_interval(&tokens, i) {
                let mut lhs_end = out.len();
                while lhs_end > 0 && out[lhs_end - 1].kind == TokenKind::Whitespace {
                    lhs_end -= 1;
                }
                if lhs_end == 0 {
                    out.push(t.clone());
                    i += 1;
                    continue;
                }
                let start = left_expr_start(&out[..lhs_end]);
                let lhs = out[start..lhs_end].to_vec();
                out.truncate(start);

                out.push(ident("datetime"));
                out.push(lparen());
                out.extend(lhs);
                out.push(comma());
                out.push(space());
                out.push(string(&format!("'{}{}'", t.value, modifier)));
                out.push(rparen());
                i = end_idx + 1;
                continue;
            }
        }
        out.push(t.clone());
        i += 1;
    }
    out
}

/// Matches `INTERVAL 'N unit'` or `INTERVAL 'N' UNIT` after the sign at
/// `op_idx`. Returns the modifier text (without sign) and the last index
/// consumed.
fn match_interval(tokens: &[Token], op_idx: usize) -> Option<(String, usize)> {
    let j = peek_keyword(tokens, op_idx + 1, "INTERVAL")?;
    let k = skip_ws(tokens, j + 1);
    if k >= tokens.len() || tokens[k].kind != TokenKind::String {
        return None;
    }
    let mut interval = tokens[k].value.trim_matches('\'').to_string();
    let mut end_idx = k;

    // INTERVAL '1' DAY form: the unit follows as its own word
    let m = skip_ws(tokens, k + 1);
    if m < tokens.len() && matches!(tokens[m].kind, TokenKind::Keyword | TokenKind::Identifier) {
        let unit = tokens[m].value.to_lowercase();
        if is_interval_unit(&unit) {
            interval = format!("{} {}", interval, unit);
            end_idx = m;
        }
    }
    Some((interval, end_idx))
}

fn is_interval_unit(s: &str) -> bool {
    matches!(
        s,
        "year" | "years" | "month" | "months" | "day" | "days" | "hour" | "hours" | "minute"
            | "minutes" | "second" | "seconds"
    )
}

/// `NOW()` → `datetime('now')` (DEFAULT contexts were already wrapped by
/// the DDL pass).
fn translate_now(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if is_keyword(&tokens[i], "NOW") {
            let j = skip_ws(&tokens, i + 1);
            if j < tokens.len() && is_open_paren(&tokens[j]) {
                let k = skip_ws(&tokens, j + 1);
                if k < tokens.len() && is_close_paren(&tokens[k]) {
                    out.extend([ident("datetime"), lparen(), string("'now'"), rparen()]);
                    i = k + 1;
                    continue;
                }
            }
        }
        out.push(tokens[i].clone());
        i += 1;
    }
    out
}

/// `CURRENT_DATE` → `date('now')`, `CURRENT_TIME` → `time('now')`,
/// `CURRENT_TIMESTAMP` → `datetime('now')`.
fn translate_current_datetime(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    for t in tokens {
        if t.kind == TokenKind::Keyword {
            let func = match t.value.as_str() {
                "CURRENT_DATE" => Some("date"),
                "CURRENT_TIME" => Some("time"),
                "CURRENT_TIMESTAMP" => Some("datetime"),
                _ => None,
            };
            if let Some(func) = func {
                out.extend([ident(func), lparen(), string("'now'"), rparen()]);
                continue;
            }
        }
        out.push(t);
    }
    out
}

/// `date_trunc('field', expr)` → the matching date()/strftime() call.
fn translate_date_trunc(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].kind == TokenKind::Identifier && tokens[i].value.to_lowercase() == "date_trunc" {
            let j = skip_ws(&tokens, i + 1);
            if j < tokens.len() && is_open_paren(&tokens[j]) {
                let (args, end_idx) = parse_func_args(&tokens, j);
                if args.len() == 2 {
                    let field = extract_string_literal(&args[0]);
                    if let Some(replacement) = date_trunc_replacement(&field, &args[1]) {
                        out.extend(replacement);
                        i = end_idx + 1;
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

fn date_trunc_replacement(field: &str, expr: &[Token]) -> Option<Vec<Token>> {
    let field = field.trim_matches('\'').to_lowercase();
    let result = match field.as_str() {
        "day" => {
            let mut r = vec![ident("date"), lparen()];
            r.extend(expr.iter().cloned());
            r.push(rparen());
            r
        }
        "hour" => strftime_call("'%Y-%m-%d %H:00:00'", expr),
        "minute" => strftime_call("'%Y-%m-%d %H:%M:00'", expr),
        "second" => strftime_call("'%Y-%m-%d %H:%M:%S'", expr),
        "month" => strftime_call("'%Y-%m-01'", expr),
        "year" => strftime_call("'%Y-01-01'", expr),
        _ => return None,
    };
    Some(result)
}

/// Builds `strftime(format, expr)`.
fn strftime_call(format: &str, expr: &[Token]) -> Vec<Token> {
    let mut result = vec![ident("strftime"), lparen(), string(format), comma(), space()];
    result.extend(expr.iter().cloned());
    result.push(rparen());
    result
}

/// Builds `CAST(strftime(format, expr) AS INTEGER)`.
fn cast_strftime_integer(format: &str, expr: &[Token]) -> Vec<Token> {
    let mut result = vec![kw("CAST"), lparen()];
    result.extend(strftime_call(format, expr));
    result.extend([space(), kw("AS"), space(), kw("INTEGER"), rparen()]);
    result
}

/// `EXTRACT(field FROM expr)` → `CAST(strftime(fmt, expr) AS INTEGER)`.
fn translate_extract(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if is_keyword(&tokens[i], "EXTRACT") {
            let j = skip_ws(&tokens, i + 1);
            if j < tokens.len() && is_open_paren(&tokens[j]) {
                let k = skip_ws(&tokens, j + 1);
                if k < tokens.len()
                    && matches!(tokens[k].kind, TokenKind::Keyword | TokenKind::Identifier)
                {
                    let field = tokens[k].value.to_lowercase();
                    if let Some(l) = peek_keyword(&tokens, k + 1, "FROM") {
                        let expr_start = skip_ws(&tokens, l + 1);
                        let mut m = expr_start;
                        let mut depth = 1;
                        while m < tokens.len() {
                            if is_open_paren(&tokens[m]) {
                                depth += 1;
                            } else if is_close_paren(&tokens[m]) {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                            m += 1;
                        }
                        let expr = trim_ws(tokens[expr_start..m.min(tokens.len())].to_vec());

                        if let Some(fmt) = extract_field_format(&field) {
                            out.extend(cast_strftime_integer(fmt, &expr));
                            i = m + 1;
                            continue;
                        }
                    }
                }
            }
        }
        out.push(tokens[i].clone());
        i += 1;
    }
    out
}

/// strftime format for an EXTRACT/date_part field.
fn extract_field_format(field: &str) -> Option<&'static str> {
    Some(match field {
        "year" => "'%Y'",
        "month" => "'%m'",
        "day" => "'%d'",
        "hour" => "'%H'",
        "minute" => "'%M'",
        "second" => "'%S'",
        "dow" | "dayofweek" => "'%w'",
        "doy" | "dayofyear" => "'%j'",
        _ => return None,
    })
}

/// `left(s, n)` → `substr(s, 1, n)`; `right(s, n)` → `substr(s, -n)`.
fn translate_left_right(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if matches!(tokens[i].kind, TokenKind::Identifier | TokenKind::Keyword) {
            let lower = tokens[i].value.to_lowercase();
            if lower == "left" || lower == "right" {
                let j = skip_ws(&tokens, i + 1);
                if j < tokens.len() && is_open_paren(&tokens[j]) {
                    let (args, end_idx) = parse_func_args(&tokens, j);
                    if args.len() == 2 {
                        out.push(ident("substr"));
                        out.push(lparen());
                        out.extend(args[0].iter().cloned());
                        out.push(comma());
                        out.push(space());
                        if lower == "left" {
                            out.push(num("1"));
                            out.push(comma());
                            out.push(space());
                            out.extend(args[1].iter().cloned());
                        } else {
                            out.push(op("-"));
                            out.extend(args[1].iter().cloned());
                        }
                        out.push(rparen());
                        i = end_idx + 1;
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

/// `concat(a, b, …)` → `(COALESCE(a,'') || COALESCE(b,'') || …)`; PG concat
/// treats NULL as empty where `||` would poison the whole result.
fn translate_concat(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].kind == TokenKind::Identifier && tokens[i].value.to_lowercase() == "concat" {
            let j = skip_ws(&tokens, i + 1);
            if j < tokens.len() && is_open_paren(&tokens[j]) {
                let (args, end_idx) = parse_func_args(&tokens, j);
                if !args.is_empty() {
                    out.push(lparen());
                    for (ai, arg) in args.iter().enumerate() {
                        if ai > 0 {
                            out.extend([space(), op("||"), space()]);
                        }
                        out.push(kw("COALESCE"));
                        out.push(lparen());
                        out.extend(arg.iter().cloned());
                        out.push(comma());
                        out.push(string("''"));
                        out.push(rparen());
                    }
                    out.push(rparen());
                    i = end_idx + 1;
                    continue;
                }
            }
        }
        out.push(tokens[i].clone());
        i += 1;
    }
    out
}

/// Aggregate and formatting functions: `string_agg` → `group_concat`,
/// `array_agg` → `json_group_array`, `date_part` → strftime cast,
/// `to_char` → strftime fast path or `pg_to_char` runtime fallback.
fn translate_agg_funcs(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].kind == TokenKind::Identifier {
            match tokens[i].value.to_lowercase().as_str() {
                "string_agg" => {
                    out.push(ident("group_concat"));
                    i += 1;
                    continue;
                }
                "array_agg" => {
                    out.push(ident("json_group_array"));
                    i += 1;
                    continue;
                }
                "date_part" => {
                    let j = skip_ws(&tokens, i + 1);
                    if j < tokens.len() && is_open_paren(&tokens[j]) {
                        let (args, end_idx) = parse_func_args(&tokens, j);
                        if args.len() == 2 {
                            let field = extract_string_literal(&args[0])
                                .trim_matches('\'')
                                .to_lowercase();
                            if let Some(fmt) = extract_field_format(&field) {
                                out.extend(cast_strftime_integer(fmt, &args[1]));
                                i = end_idx + 1;
                                continue;
                            }
                        }
                    }
                }
                "to_char" => {
                    let j = skip_ws(&tokens, i + 1);
                    if j < tokens.len() && is_open_paren(&tokens[j]) {
                        let (args, end_idx) = parse_func_args(&tokens, j);
                        if args.len() == 2 {
                            let pg_fmt = extract_string_literal(&args[1]);
                            match map_pg_date_format(&pg_fmt) {
                                Some(fmt) if !fmt.is_empty() => {
                                    out.extend(strftime_call(
                                        &format!("'{}'", fmt),
                                        &args[0],
                                    ));
                                }
                                _ => {
                                    out.push(ident("pg_to_char"));
                                    out.push(lparen());
                                    out.extend(args[0].iter().cloned());
                                    out.push(comma());
                                    out.push(space());
                                    out.extend(args[1].iter().cloned());
                                    out.push(rparen());
                                }
                            }
                            i = end_idx + 1;
                            continue;
                        }
                    }
                }
                _ => {}
            }
        }
        out.push(tokens[i].clone());
        i += 1;
    }
    out
}

/// Value of the first string literal among the tokens.
fn extract_string_literal(tokens: &[Token]) -> String {
    tokens
        .iter()
        .find(|t| t.kind == TokenKind::String)
        .map(|t| t.value.clone())
        .unwrap_or_default()
}

/// Maps a PG date format to strftime, or None when the format needs the
/// runtime helper (month/day names, meridiem, timezone, quarter).
fn map_pg_date_format(pg_fmt: &str) -> Option<String> {
    let pg_fmt = pg_fmt.trim_matches('\'');

    const RUNTIME_PATTERNS: &[&str] = &[
        "Mon", "Month", "mon", "month", "MON", "MONTH", "Day", "Dy", "day", "dy", "DAY", "DY",
        "AM", "PM", "am", "pm", "A.M.", "P.M.", "TZ", "tz", "OF", "Q", "TM",
    ];
    for p in RUNTIME_PATTERNS {
        if pg_fmt.contains(p) {
            return None;
        }
    }

    // Longer patterns listed first so they win the scan
    const STRFTIME_PAIRS: &[(&str, &str)] = &[
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("HH24", "%H"),
        ("HH12", "%I"),
        ("HH", "%H"),
        ("MM", "%m"),
        ("DD", "%d"),
        ("MI", "%M"),
        ("SS", "%S"),
    ];
    let mut out = String::with_capacity(pg_fmt.len());
    let mut rest = pg_fmt;
    'outer: while !rest.is_empty() {
        for (pat, rep) in STRFTIME_PAIRS {
            if rest.starts_with(pat) {
                out.push_str(rep);
                rest = &rest[pat.len()..];
                continue 'outer;
            }
        }
        let ch = rest.chars().next().unwrap();
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    Some(out)
}

/// Rewrites `FROM generate_series(start, stop[, step]) [AS alias]` into a
/// prepended `WITH RECURSIVE _gs(value)` CTE and a `FROM _gs [AS alias]`
/// reference.
fn translate_generate_series(tokens: Vec<Token>) -> Vec<Token> {
    for i in 0..tokens.len() {
        if !is_keyword(&tokens[i], "FROM") {
            continue;
        }

        let j = skip_ws(&tokens, i + 1);
        if j >= tokens.len()
            || tokens[j].kind != TokenKind::Identifier
            || tokens[j].value.to_lowercase() != "generate_series"
        {
            continue;
        }

        let k = skip_ws(&tokens, j + 1);
        if k >= tokens.len() || !is_open_paren(&tokens[k]) {
            continue;
        }

        let (args, end_paren) = parse_func_args(&tokens, k);
        if args.len() < 2 || args.len() > 3 {
            continue;
        }

        let start = reassemble(&args[0]);
        let stop = reassemble(&args[1]);
        let step = args.get(2).map(|a| reassemble(a)).unwrap_or_else(|| "1".to_string());

        let alias = collect_alias(&tokens, end_paren + 1);
        let alias_end = end_paren + alias.len();

        let cte = format!(
            "WITH RECURSIVE _gs(value) AS (SELECT {start} UNION ALL SELECT value + {step} FROM _gs WHERE value + {step} <= {stop}) "
        );

        let mut out = tokenize(&cte);
        out.extend(tokens[..i].iter().cloned());
        out.extend([kw("FROM"), space(), ident("_gs")]);
        out.extend(alias);
        if alias_end + 1 < tokens.len() {
            out.extend(tokens[alias_end + 1..].iter().cloned());
        }
        return out;
    }
    tokens
}

/// Collects an optional `[AS] alias` (with its leading whitespace) starting
/// at `pos`; empty if none is present.
fn collect_alias(tokens: &[Token], pos: usize) -> Vec<Token> {
    let mut collected = Vec::new();
    let mut i = pos;
    while i < tokens.len() && tokens[i].kind == TokenKind::Whitespace {
        collected.push(tokens[i].clone());
        i += 1;
    }
    if i >= tokens.len() {
        return Vec::new();
    }

    if is_keyword(&tokens[i], "AS") {
        collected.push(tokens[i].clone());
        i += 1;
        while i < tokens.len() && tokens[i].kind == TokenKind::Whitespace {
            collected.push(tokens[i].clone());
            i += 1;
        }
        if i < tokens.len() && matches!(tokens[i].kind, TokenKind::Identifier | TokenKind::Keyword) {
            collected.push(tokens[i].clone());
            return collected;
        }
        return Vec::new();
    }

    if tokens[i].kind == TokenKind::Identifier {
        collected.push(tokens[i].clone());
        return collected;
    }

    Vec::new()
}
