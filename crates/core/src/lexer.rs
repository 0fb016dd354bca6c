use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier or path segment. May start with a digit after a `.`
    /// or when digits run straight into letters (`1st`).
    Word(String),
    /// Single-quoted string literal (content without quotes, escapes resolved)
    Str(String),
    /// Integer literal, kept as written so it can double as a path key
    Int(String),
    /// Decimal literal, kept as written
    Float(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Star,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    /// Character offset of the first character of the token.
    pub offset: usize,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub fn lex(src: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens: Vec<Spanned> = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut pos = 0usize;

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;

        // String literal
        if c == '\'' {
            pos += 1;
            let mut s = String::new();
            loop {
                if pos >= chars.len() {
                    return Err(ParseError::new(start, "unterminated string literal"));
                }
                let sc = chars[pos];
                if sc == '\'' {
                    pos += 1;
                    break;
                }
                if sc == '\\' && pos + 1 < chars.len() {
                    match chars[pos + 1] {
                        '\'' => {
                            s.push('\'');
                            pos += 2;
                            continue;
                        }
                        '\\' => {
                            s.push('\\');
                            pos += 2;
                            continue;
                        }
                        // Anything else passes through verbatim.
                        _ => {}
                    }
                }
                s.push(sc);
                pos += 1;
            }
            tokens.push(Spanned {
                token: Token::Str(s),
                offset: start,
            });
            continue;
        }

        let after_dot = matches!(
            tokens.last(),
            Some(Spanned {
                token: Token::Dot,
                ..
            })
        );

        // Number (never directly after a '.', where digits are a key)
        if !after_dot
            && (c.is_ascii_digit()
                || (c == '-' && pos + 1 < chars.len() && chars[pos + 1].is_ascii_digit()))
        {
            if c == '-' {
                pos += 1;
            }
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
            if pos < chars.len()
                && chars[pos] == '.'
                && pos + 1 < chars.len()
                && chars[pos + 1].is_ascii_digit()
            {
                pos += 1; // consume '.'
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
                let s: String = chars[start..pos].iter().collect();
                tokens.push(Spanned {
                    token: Token::Float(s),
                    offset: start,
                });
                continue;
            }
            if c != '-' && pos < chars.len() && is_word_char(chars[pos]) {
                // Digits running into letters: an identifier such as `2fa`.
                while pos < chars.len() && is_word_char(chars[pos]) {
                    pos += 1;
                }
                let s: String = chars[start..pos].iter().collect();
                tokens.push(Spanned {
                    token: Token::Word(s),
                    offset: start,
                });
                continue;
            }
            let s: String = chars[start..pos].iter().collect();
            tokens.push(Spanned {
                token: Token::Int(s),
                offset: start,
            });
            continue;
        }

        let punct = match c {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            ',' => Some(Token::Comma),
            '.' => Some(Token::Dot),
            '*' => Some(Token::Star),
            _ => None,
        };
        if let Some(token) = punct {
            tokens.push(Spanned {
                token,
                offset: start,
            });
            pos += 1;
            continue;
        }

        // Identifier / keyword / path segment
        if is_word_char(c) {
            while pos < chars.len() && is_word_char(chars[pos]) {
                pos += 1;
            }
            let word: String = chars[start..pos].iter().collect();
            tokens.push(Spanned {
                token: Token::Word(word),
                offset: start,
            });
            continue;
        }

        return Err(ParseError::new(
            start,
            format!("unexpected character '{}'", c),
        ));
    }

    tokens.push(Spanned {
        token: Token::Eof,
        offset: chars.len(),
    });
    Ok(tokens)
}
