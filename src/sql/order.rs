//! NULLS FIRST / NULLS LAST rewrite. SQLite has no null-ordering clause, so
//! the ordering is expressed through a leading CASE key.

use super::lexer::{Token, TokenKind};
use super::rewrite::*;

/// `ORDER BY col [ASC|DESC] NULLS FIRST` →
/// `ORDER BY (CASE WHEN col IS NULL THEN 0 ELSE 1 END), col [ASC|DESC]`
/// (NULLS LAST swaps the CASE arms). The column expression may be a simple
/// identifier, `table.column`, or a call with balanced parens.
pub(crate) fn translate(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if !is_keyword(&tokens[i], "NULLS") {
            out.push(tokens[i].clone());
            i += 1;
            continue;
        }

        let j = skip_ws(&tokens, i + 1);
        if j >= tokens.len()
            || !(is_keyword(&tokens[j], "FIRST") || is_keyword(&tokens[j], "LAST"))
        {
            out.push(tokens[i].clone());
            i += 1;
            continue;
        }
        let nulls_first = tokens[j].value == "FIRST";

        // Walk backwards over what was already emitted: optional ASC/DESC,
        // then the column expression.
        let mut pos = out.len();
        while pos > 0 && out[pos - 1].kind == TokenKind::Whitespace {
            pos -= 1;
        }

        let mut direction: Option<Token> = None;
        if pos > 0 && (is_keyword(&out[pos - 1], "ASC") || is_keyword(&out[pos - 1], "DESC")) {
            direction = Some(out[pos - 1].clone());
            pos -= 1;
            while pos > 0 && out[pos - 1].kind == TokenKind::Whitespace {
                pos -= 1;
            }
        }

        let col_start = column_expr_start(&out, pos);
        if col_start == pos {
            out.push(tokens[i].clone());
            i += 1;
            continue;
        }
        let col: Vec<Token> = out[col_start..pos].to_vec();
        out.truncate(col_start);

        let (then_val, else_val) = if nulls_first { ("0", "1") } else { ("1", "0") };

        out.extend([lparen(), kw("CASE"), space(), kw("WHEN"), space()]);
        out.extend(col.iter().cloned());
        out.extend([
            space(),
            kw("IS"),
            space(),
            kw("NULL"),
            space(),
            kw("THEN"),
            space(),
            num(then_val),
            space(),
            kw("ELSE"),
            space(),
            num(else_val),
            space(),
            kw("END"),
            rparen(),
            comma(),
            space(),
        ]);
        out.extend(col);

        if let Some(dir) = direction {
            out.push(space());
            out.push(dir);
        }

        i = j + 1;
    }
    out
}

/// Start of the column expression that ends at `pos`: a call with balanced
/// parens (function name included), `table.column`, or a single word.
fn column_expr_start(tokens: &[Token], pos: usize) -> usize {
    if pos == 0 {
        return pos;
    }
    let end = pos - 1;

    if is_close_paren(&tokens[end]) {
        let mut depth = 1;
        let mut p = end;
        while p > 0 && depth > 0 {
            p -= 1;
            if is_close_paren(&tokens[p]) {
                depth += 1;
            } else if is_open_paren(&tokens[p]) {
                depth -= 1;
            }
        }
        if p > 0 && matches!(tokens[p - 1].kind, TokenKind::Identifier | TokenKind::Keyword) {
            return p - 1;
        }
        return p;
    }

    if matches!(tokens[end].kind, TokenKind::Identifier | TokenKind::Keyword) {
        let mut start = end;
        if start >= 2
            && tokens[start - 1].kind == TokenKind::Dot
            && matches!(tokens[start - 2].kind, TokenKind::Identifier | TokenKind::Keyword)
        {
            start -= 2;
        }
        return start;
    }

    pos
}
