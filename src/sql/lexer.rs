use std::collections::HashSet;
use std::sync::LazyLock;

/// Lexical category of a SQL token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// SQL keyword (value is uppercased for comparison)
    Keyword,
    /// Identifier (table/column name, including quoted identifiers)
    Identifier,
    /// String literal 'foo'
    String,
    /// Numeric literal
    Number,
    /// Operator (::, =, <, >, ~, etc.)
    Operator,
    /// $1, $2 placeholder
    Parameter,
    /// ( or )
    Paren,
    Comma,
    Semicolon,
    /// Spaces, tabs, newlines
    Whitespace,
    /// -- or /* */
    Comment,
    Dot,
}

/// A single token from SQL input.
///
/// `value` is the normalized text (keywords uppercased); `raw` is the
/// original surface text. The reassembler emits `raw`, so whitespace and
/// comments survive translation untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub raw: String,
}

impl Token {
    /// A synthesized token whose raw text equals its value.
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Token {
        let text = text.into();
        Token {
            kind,
            raw: text.clone(),
            value: text,
        }
    }

    fn with_raw(kind: TokenKind, value: impl Into<String>, raw: impl Into<String>) -> Token {
        Token {
            kind,
            value: value.into(),
            raw: raw.into(),
        }
    }
}

static SQL_KEYWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "SELECT", "FROM", "WHERE", "INSERT", "INTO", "UPDATE", "DELETE", "CREATE", "TABLE",
        "DROP", "ALTER", "ADD", "COLUMN", "INDEX", "IF", "NOT", "EXISTS", "NULL", "DEFAULT",
        "PRIMARY", "KEY", "UNIQUE", "CHECK", "FOREIGN", "REFERENCES", "ON", "SET", "VALUES",
        "AND", "OR", "IN", "IS", "AS", "JOIN", "LEFT", "RIGHT", "INNER", "OUTER", "CROSS",
        "FULL", "ORDER", "BY", "ASC", "DESC", "GROUP", "HAVING", "LIMIT", "OFFSET", "UNION",
        "ALL", "DISTINCT", "CASE", "WHEN", "THEN", "ELSE", "END", "BETWEEN", "LIKE", "ILIKE",
        "SIMILAR", "TO", "CAST", "TRUE", "FALSE", "BEGIN", "COMMIT", "ROLLBACK", "RETURNING",
        "WITH", "RECURSIVE", "EXCEPT", "INTERSECT", "CONSTRAINT", "CASCADE", "RESTRICT",
        "AUTOINCREMENT",
        // Type keywords
        "SERIAL", "BIGSERIAL", "SMALLSERIAL", "BOOLEAN", "BOOL", "VARCHAR", "CHARACTER",
        "VARYING", "CHAR", "TEXT", "INTEGER", "INT", "INT2", "INT4", "INT8", "SMALLINT",
        "BIGINT", "REAL", "FLOAT4", "FLOAT8", "DOUBLE", "PRECISION", "NUMERIC", "DECIMAL",
        "TIMESTAMP", "TIMESTAMPTZ", "DATE", "TIME", "TIMETZ", "UUID", "BYTEA", "JSON",
        "JSONB", "BLOB", "ZONE",
        // Function-like keywords
        "NOW", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "EXTRACT", "COALESCE",
        "NULLIF",
        // Conflict handling, window frames, misc
        "REPLACE", "CONFLICT", "DO", "NOTHING", "OVER", "PARTITION", "WINDOW", "ROW", "ROWS",
        "RANGE", "PRECEDING", "FOLLOWING", "UNBOUNDED", "CURRENT", "EXCLUDE", "TIES",
        "OTHERS", "NO", "ACTION", "DEFERRABLE", "INITIALLY", "DEFERRED", "IMMEDIATE", "ONLY",
        "TEMPORARY", "TEMP", "UNLOGGED", "MATERIALIZED", "VIEW", "USING", "NATURAL",
        "LATERAL", "FETCH", "FIRST", "LAST", "NEXT", "PRIOR", "ABSOLUTE", "RELATIVE",
        "FORWARD", "BACKWARD", "SOME", "ANY", "EVERY", "ARRAY", "INTERVAL", "WITHOUT",
        // Null ordering, sequences, EXPLAIN
        "NULLS", "SEQUENCE", "INCREMENT", "START", "MINVALUE", "MAXVALUE", "CYCLE", "OWNED",
        "EXPLAIN", "ANALYZE", "VERBOSE", "PLAN", "QUERY",
    ]
    .into_iter()
    .collect()
});

/// Splits a SQL string into tokens.
///
/// The tokenizer never fails: unterminated strings run to end of input and
/// unknown characters come out as single-character operators. Dollar-quoted
/// strings are normalized to single-quoted form here, so no later pass has
/// to know the `$tag$` syntax exists.
pub fn tokenize(sql: &str) -> Vec<Token> {
    let chars: Vec<char> = sql.chars().collect();
    let n = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < n {
        let ch = chars[i];

        // Whitespace
        if ch.is_whitespace() {
            let start = i;
            while i < n && chars[i].is_whitespace() {
                i += 1;
            }
            tokens.push(Token::new(TokenKind::Whitespace, text(&chars, start, i)));
            continue;
        }

        // Line comment --
        if ch == '-' && i + 1 < n && chars[i + 1] == '-' {
            let start = i;
            while i < n && chars[i] != '\n' {
                i += 1;
            }
            tokens.push(Token::new(TokenKind::Comment, text(&chars, start, i)));
            continue;
        }

        // Block comment /* */ (non-nesting)
        if ch == '/' && i + 1 < n && chars[i + 1] == '*' {
            let start = i;
            i += 2;
            while i + 1 < n && !(chars[i] == '*' && chars[i + 1] == '/') {
                i += 1;
            }
            if i + 1 < n {
                i += 2;
            }
            tokens.push(Token::new(TokenKind::Comment, text(&chars, start, i)));
            continue;
        }

        // E'escape string' — escape resolution is deferred to the expression pass
        if (ch == 'E' || ch == 'e') && i + 1 < n && chars[i + 1] == '\'' {
            let start = i;
            i += 2;
            while i < n {
                if chars[i] == '\\' && i + 1 < n {
                    i += 2;
                } else if chars[i] == '\'' {
                    i += 1;
                    break;
                } else {
                    i += 1;
                }
            }
            tokens.push(Token::new(TokenKind::String, text(&chars, start, i)));
            continue;
        }

        // String literal 'foo' with '' as embedded quote
        if ch == '\'' {
            let start = i;
            i += 1;
            while i < n {
                if chars[i] == '\'' && i + 1 < n && chars[i + 1] == '\'' {
                    i += 2;
                } else if chars[i] == '\'' {
                    i += 1;
                    break;
                } else {
                    i += 1;
                }
            }
            tokens.push(Token::new(TokenKind::String, text(&chars, start, i)));
            continue;
        }

        // Quoted identifier "foo" — always Ident regardless of content
        if ch == '"' {
            let start = i;
            i += 1;
            while i < n && chars[i] != '"' {
                i += 1;
            }
            if i < n {
                i += 1;
            }
            tokens.push(Token::new(TokenKind::Identifier, text(&chars, start, i)));
            continue;
        }

        // Dollar-quoted string, parameter, or lone $
        if ch == '$' {
            if let Some((tag_len, end)) = try_dollar_quote(&chars, i) {
                let content = text(&chars, i + tag_len, end - tag_len);
                let quoted = format!("'{}'", content.replace('\'', "''"));
                tokens.push(Token::new(TokenKind::String, quoted));
                i = end;
                continue;
            }
            if i + 1 < n && chars[i + 1].is_ascii_digit() {
                let start = i;
                i += 1;
                while i < n && chars[i].is_ascii_digit() {
                    i += 1;
                }
                tokens.push(Token::new(TokenKind::Parameter, text(&chars, start, i)));
                continue;
            }
            tokens.push(Token::new(TokenKind::Operator, "$"));
            i += 1;
            continue;
        }

        // Number, including .5 and scientific notation
        if ch.is_ascii_digit() || (ch == '.' && i + 1 < n && chars[i + 1].is_ascii_digit()) {
            let start = i;
            while i < n && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < n && (chars[i] == 'e' || chars[i] == 'E') {
                i += 1;
                if i < n && (chars[i] == '+' || chars[i] == '-') {
                    i += 1;
                }
                while i < n && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            tokens.push(Token::new(TokenKind::Number, text(&chars, start, i)));
            continue;
        }

        // ::
        if ch == ':' && i + 1 < n && chars[i + 1] == ':' {
            tokens.push(Token::new(TokenKind::Operator, "::"));
            i += 2;
            continue;
        }

        // Regex operators !~* !~ ~*
        if ch == '!' && i + 1 < n && chars[i + 1] == '~' {
            if i + 2 < n && chars[i + 2] == '*' {
                tokens.push(Token::new(TokenKind::Operator, "!~*"));
                i += 3;
            } else {
                tokens.push(Token::new(TokenKind::Operator, "!~"));
                i += 2;
            }
            continue;
        }
        if ch == '~' && i + 1 < n && chars[i + 1] == '*' {
            tokens.push(Token::new(TokenKind::Operator, "~*"));
            i += 2;
            continue;
        }

        // Comparison operators, possibly two chars
        if ch == '<' || ch == '>' || ch == '!' || ch == '=' {
            let start = i;
            i += 1;
            if i < n && (chars[i] == '=' || chars[i] == '>') {
                i += 1;
            }
            tokens.push(Token::new(TokenKind::Operator, text(&chars, start, i)));
            continue;
        }

        // JSON operators -> ->>
        if ch == '-' && i + 1 < n && chars[i + 1] == '>' {
            if i + 2 < n && chars[i + 2] == '>' {
                tokens.push(Token::new(TokenKind::Operator, "->>"));
                i += 3;
            } else {
                tokens.push(Token::new(TokenKind::Operator, "->"));
                i += 2;
            }
            continue;
        }

        // || concatenation
        if ch == '|' && i + 1 < n && chars[i + 1] == '|' {
            tokens.push(Token::new(TokenKind::Operator, "||"));
            i += 2;
            continue;
        }

        // Single-char operators
        if matches!(ch, '+' | '-' | '*' | '/' | '%' | '|' | '&' | '~' | ':') {
            tokens.push(Token::new(TokenKind::Operator, ch.to_string()));
            i += 1;
            continue;
        }

        if ch == '(' || ch == ')' {
            tokens.push(Token::new(TokenKind::Paren, ch.to_string()));
            i += 1;
            continue;
        }
        if ch == ',' {
            tokens.push(Token::new(TokenKind::Comma, ","));
            i += 1;
            continue;
        }
        if ch == ';' {
            tokens.push(Token::new(TokenKind::Semicolon, ";"));
            i += 1;
            continue;
        }
        if ch == '.' {
            tokens.push(Token::new(TokenKind::Dot, "."));
            i += 1;
            continue;
        }

        // Keyword or identifier
        if ch == '_' || ch.is_alphabetic() {
            let start = i;
            while i < n && (chars[i] == '_' || chars[i].is_alphanumeric()) {
                i += 1;
            }
            let raw = text(&chars, start, i);
            let upper = raw.to_uppercase();
            if SQL_KEYWORDS.contains(upper.as_str()) {
                tokens.push(Token::with_raw(TokenKind::Keyword, upper, raw));
            } else {
                tokens.push(Token::new(TokenKind::Identifier, raw));
            }
            continue;
        }

        // Unknown character — emit as operator
        tokens.push(Token::new(TokenKind::Operator, ch.to_string()));
        i += 1;
    }

    tokens
}

/// Converts tokens back into a SQL string.
pub fn reassemble(tokens: &[Token]) -> String {
    let mut out = String::new();
    for t in tokens {
        out.push_str(&t.raw);
    }
    out
}

fn text(chars: &[char], start: usize, end: usize) -> String {
    chars[start..end].iter().collect()
}

/// Checks whether `chars[i..]` starts a dollar-quoted string (`$$…$$` or
/// `$tag$…$tag$`). Returns the opening tag length (delimiters included) and
/// the end position one past the closing tag.
fn try_dollar_quote(chars: &[char], i: usize) -> Option<(usize, usize)> {
    let n = chars.len();
    if i >= n || chars[i] != '$' {
        return None;
    }

    let j = i + 1;
    if j >= n {
        return None;
    }

    let tag_end;
    if chars[j] == '$' {
        tag_end = j + 1;
    } else if chars[j] == '_' || chars[j].is_alphabetic() {
        let mut k = j;
        while k < n && (chars[k] == '_' || chars[k].is_alphanumeric()) {
            k += 1;
        }
        if k >= n || chars[k] != '$' {
            return None;
        }
        tag_end = k + 1;
    } else {
        return None;
    }

    let tag_len = tag_end - i;
    let tag = &chars[i..tag_end];
    let mut p = tag_end;
    while p + tag_len <= n {
        if &chars[p..p + tag_len] == tag {
            return Some((tag_len, p + tag_len));
        }
        p += 1;
    }
    None
}
