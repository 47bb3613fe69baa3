//! `html_tok` – single-pass, forgiving tag tokenizer.
//
//  Every token remembers the byte offset it started at so the parser can
//  report `Location`s for the things it had to recover from.  Malformed
//  tags never abort tokenizing: a tag with broken attribute syntax is read
//  loosely (name + class), and a tag cut off by the end of input becomes a
//  `Broken` token the parser drops.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_till1, take_until, take_while, take_while1},
    character::complete::{char, multispace0, multispace1, satisfy},
    combinator::{map, opt, recognize},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};
use once_cell::sync::Lazy;
use regex::Regex;

static LOOSE_CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)class\s*=\s*["']?([^"'>]*)"#).unwrap());

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Open {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    Close {
        name: String,
    },
    Text(String),
    /// Comments, doctypes and unreadable `<…>` runs.
    Ignored,
    /// A tag that never reached its `>`.
    Broken(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

fn tag_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic()),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
    ))(input)
}

fn attr_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace() && !matches!(c, '=' | '>' | '/' | '"' | '\'' | '<'))(
        input,
    )
}

fn attr_value(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_till(|c| c == '"'), char('"')),
        delimited(char('\''), take_till(|c| c == '\''), char('\'')),
        take_till1(|c: char| c.is_whitespace() || matches!(c, '>' | '<' | '"' | '\'')),
    ))(input)
}

fn attribute(input: &str) -> IResult<&str, (String, String)> {
    let (input, _) = multispace1(input)?;
    let (input, name) = attr_name(input)?;
    let (input, value) = opt(preceded(
        delimited(multispace0, char('='), multispace0),
        attr_value,
    ))(input)?;
    Ok((
        input,
        (name.to_ascii_lowercase(), value.unwrap_or("").to_string()),
    ))
}

fn open_tag(input: &str) -> IResult<&str, Token> {
    let (input, _) = char('<')(input)?;
    let (input, name) = tag_name(input)?;
    let (input, attrs) = many0(attribute)(input)?;
    let (input, _) = multispace0(input)?;
    let (input, slash) = opt(char('/'))(input)?;
    let (input, _) = char('>')(input)?;
    Ok((
        input,
        Token::Open {
            name: name.to_ascii_lowercase(),
            attrs,
            self_closing: slash.is_some(),
        },
    ))
}

fn close_tag(input: &str) -> IResult<&str, Token> {
    map(
        delimited(tag("</"), tag_name, pair(multispace0, char('>'))),
        |name: &str| Token::Close {
            name: name.to_ascii_lowercase(),
        },
    )(input)
}

fn comment(input: &str) -> IResult<&str, Token> {
    map(
        delimited(tag("<!--"), take_until("-->"), tag("-->")),
        |_| Token::Ignored,
    )(input)
}

fn declaration(input: &str) -> IResult<&str, Token> {
    map(
        terminated(preceded(alt((tag("<!"), tag("<?"))), take_till(|c| c == '>')), char('>')),
        |_| Token::Ignored,
    )(input)
}

fn markup(input: &str) -> IResult<&str, Token> {
    alt((comment, declaration, close_tag, open_tag))(input)
}

/// Best-effort reading of `<…>` whose body did not parse: keep the name and class.
fn loose_tag(body: &str) -> Token {
    if let Some(rest) = body.strip_prefix('/') {
        return match tag_name(rest.trim_start()) {
            Ok((_, name)) => Token::Close {
                name: name.to_ascii_lowercase(),
            },
            Err(_) => Token::Ignored,
        };
    }
    match tag_name(body) {
        Ok((rest, name)) => {
            let attrs = LOOSE_CLASS_RE
                .captures(rest)
                .map(|caps| vec![("class".to_string(), caps[1].trim().to_string())])
                .unwrap_or_default();
            Token::Open {
                name: name.to_ascii_lowercase(),
                attrs,
                self_closing: rest.trim_end().ends_with('/'),
            }
        }
        Err(_) => Token::Ignored,
    }
}

fn starts_markup(after_lt: &str) -> bool {
    match after_lt.chars().next() {
        Some(c) => c.is_ascii_alphabetic() || c == '/' || c == '!' || c == '?',
        None => false,
    }
}

/// Split `input` into tag and text tokens. Never fails.
pub fn tokenize(input: &str) -> Vec<Spanned> {
    let mut tokens = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        let offset = input.len() - rest.len();

        if !rest.starts_with('<') {
            let end = rest.find('<').unwrap_or(rest.len());
            tokens.push(Spanned {
                token: Token::Text(rest[..end].to_string()),
                offset,
            });
            rest = &rest[end..];
            continue;
        }

        if let Ok((remaining, token)) = markup(rest) {
            tokens.push(Spanned { token, offset });
            rest = remaining;
            continue;
        }

        let after_lt = &rest[1..];
        if !starts_markup(after_lt) {
            // a literal '<' in prose ("a < b")
            tokens.push(Spanned {
                token: Token::Text("<".to_string()),
                offset,
            });
            rest = after_lt;
            continue;
        }

        match after_lt.find('>') {
            Some(gt) => {
                let body = &after_lt[..gt];
                let token = match body.find('<') {
                    // "<div class=x <span>" – the first tag never closed, restart at the inner '<'
                    Some(inner) => {
                        let broken = &rest[..inner + 1];
                        rest = &after_lt[inner..];
                        tokens.push(Spanned {
                            token: loose_tag(&broken[1..]),
                            offset,
                        });
                        continue;
                    }
                    None => loose_tag(body),
                };
                tokens.push(Spanned { token, offset });
                rest = &after_lt[gt + 1..];
            }
            None => {
                tokens.push(Spanned {
                    token: Token::Broken(rest.to_string()),
                    offset,
                });
                rest = "";
            }
        }
    }

    tokens
}
