//! Tokenizer for template expressions.
//!
//! String literals come out as single tokens, so nothing inside quotes is ever
//! mistaken for an identifier. Whitespace only separates tokens.

/// Lexical token with its byte offset in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
}

/// Longest match first.
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "(", ")", "[", "]", ".", ",", "?", ":",
    "+", "-", "*", "/", "%", "!", "<", ">",
];

pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

pub fn is_ident_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Split `src` into tokens. Errors carry a human-readable message.
pub fn tokenize(src: &str) -> Result<Vec<(Token, usize)>, String> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < src.len() {
        let rest = &src[pos..];
        let Some(c) = rest.chars().next() else { break };

        if c.is_whitespace() {
            pos += c.len_utf8();
            continue;
        }

        if c == '\'' || c == '"' {
            let (literal, len) = read_string(rest, c)
                .ok_or_else(|| format!("unterminated string starting at {pos}"))?;
            tokens.push((Token::Str(literal), pos));
            pos += len;
            continue;
        }

        let starts_number = c.is_ascii_digit()
            || (c == '.' && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit));
        if starts_number {
            let len = number_len(rest);
            let text = &rest[..len];
            let n: f64 = text
                .parse()
                .map_err(|_| format!("invalid number `{text}` at {pos}"))?;
            tokens.push((Token::Number(n), pos));
            pos += len;
            continue;
        }

        if is_ident_start(c) {
            let len = rest
                .char_indices()
                .find(|&(_, ch)| !is_ident_part(ch))
                .map_or(rest.len(), |(i, _)| i);
            tokens.push((Token::Ident(rest[..len].to_string()), pos));
            pos += len;
            continue;
        }

        match PUNCTUATORS.iter().copied().find(|p| rest.starts_with(*p)) {
            Some(p) => {
                tokens.push((Token::Punct(p), pos));
                pos += p.len();
            }
            None => return Err(format!("unexpected character `{c}` at {pos}")),
        }
    }

    Ok(tokens)
}

fn number_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    i
}

/// Read a quoted literal starting at `s[0] == quote`. Returns the unescaped
/// contents and the byte length consumed, quotes included.
fn read_string(s: &str, quote: char) -> Option<(String, usize)> {
    let mut out = String::new();
    let mut chars = s.char_indices().skip(1);

    while let Some((i, c)) = chars.next() {
        match c {
            c if c == quote => return Some((out, i + c.len_utf8())),
            '\\' => {
                let (_, escaped) = chars.next()?;
                match escaped {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    '0' => out.push('\0'),
                    'u' => {
                        let mut code = 0u32;
                        for _ in 0..4 {
                            let (_, h) = chars.next()?;
                            code = code * 16 + h.to_digit(16)?;
                        }
                        out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                    }
                    other => out.push(other),
                }
            }
            c => out.push(c),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        tokenize(src).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_tokenize_mixed() {
        assert_eq!(
            kinds("a.b+'x y'>=1.5"),
            vec![
                Token::Ident("a".into()),
                Token::Punct("."),
                Token::Ident("b".into()),
                Token::Punct("+"),
                Token::Str("x y".into()),
                Token::Punct(">="),
                Token::Number(1.5),
            ]
        );
    }

    #[test]
    fn test_string_contents_are_opaque() {
        assert_eq!(kinds(r#""a + b" "it\"s""#), vec![
            Token::Str("a + b".into()),
            Token::Str("it\"s".into()),
        ]);
    }

    #[test]
    fn test_longest_punctuator_wins() {
        assert_eq!(
            kinds("a!==b"),
            vec![Token::Ident("a".into()), Token::Punct("!=="), Token::Ident("b".into())]
        );
    }

    #[test]
    fn test_errors() {
        assert!(tokenize("'open").is_err());
        assert!(tokenize("a # b").is_err());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds(".5 1e3 2E-2"), vec![
            Token::Number(0.5),
            Token::Number(1000.0),
            Token::Number(0.02),
        ]);
    }
}
