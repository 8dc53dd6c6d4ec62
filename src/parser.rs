//! Placeholder scanner using nom.
//!
//! Finds placeholder tokens in template text. Everything that is not a
//! token is literal SQL and is never interpreted.
//!
//! # Token Grammar
//!
//! ```text
//! %I:table_name     %L          %2$s        %F:header      %%
//! ┬┬─┬─────────     ┬┬          ┬┬┬┬        ┬┬─┬────       ┬┬
//! ││ │              ││          ││││        ││ │           │└── escaped percent
//! ││ └── name      │└── marker  │││└── marker ││ └── include name
//! │└── marker      └── percent  ││└── `$`    │└── include marker
//! └── percent                   │└── position (1-based)
//!                               └── percent
//! ```

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1},
    combinator::{map, map_res, opt, value},
    sequence::{pair, preceded, terminated},
    IResult,
};

use crate::token::{Marker, Token};

/// Marker, name and position of a token, before its span is known.
type Parts<'a> = (Marker, Option<&'a str>, Option<usize>);

/// Scan a template for every token, including `%%` escapes, in source order.
pub fn scan(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut offset = 0;

    while let Some(found) = input[offset..].find('%') {
        let start = offset + found;
        let rest = &input[start..];

        match parse_placeholder(rest) {
            Ok((remaining, (marker, name, position))) => {
                let end = start + (rest.len() - remaining.len());
                tokens.push(Token {
                    marker,
                    name,
                    position,
                    span: start..end,
                });
                offset = end;
            }
            // Not a placeholder; the percent sign is plain text
            Err(_) => offset = start + 1,
        }
    }

    tokens
}

/// Extract the placeholder tokens of a template, in order, duplicates included.
///
/// `%%` escapes are not placeholders and are left out.
///
/// # Example
///
/// ```
/// use pgtemplate::parser::extract_tokens;
/// use pgtemplate::token::Marker;
///
/// let tokens = extract_tokens("SELECT %I:col FROM t WHERE ts::DATE = %L:day");
/// assert_eq!(tokens.len(), 2);
/// assert_eq!(tokens[0].marker, Marker::Identifier);
/// assert_eq!(tokens[1].name, Some("day"));
/// ```
pub fn extract_tokens(input: &str) -> Vec<Token<'_>> {
    scan(input)
        .into_iter()
        .filter(|t| t.marker != Marker::Percent)
        .collect()
}

/// Parse one token starting at a `%`.
fn parse_placeholder(input: &str) -> IResult<&str, Parts<'_>> {
    preceded(
        char('%'),
        alt((parse_escape, parse_include, parse_positioned, parse_named)),
    )(input)
}

/// Parse the second half of `%%`.
fn parse_escape(input: &str) -> IResult<&str, Parts<'_>> {
    value((Marker::Percent, None, None), char('%'))(input)
}

/// Parse an include directive `F:<name>`. A bare `%F` is not a token.
fn parse_include(input: &str) -> IResult<&str, Parts<'_>> {
    map(preceded(tag("F:"), parse_name), |name| {
        (Marker::File, Some(name), None)
    })(input)
}

/// Parse a positioned marker `<n>$<marker>`.
fn parse_positioned(input: &str) -> IResult<&str, Parts<'_>> {
    map(
        pair(
            terminated(map_res(digit1, |n: &str| n.parse::<usize>()), char('$')),
            parse_value_marker,
        ),
        |(position, marker)| (marker, None, Some(position)),
    )(input)
}

/// Parse a value marker with an optional `:<name>` suffix.
fn parse_named(input: &str) -> IResult<&str, Parts<'_>> {
    map(
        pair(parse_value_marker, opt(preceded(char(':'), parse_name))),
        |(marker, name)| (marker, name, None),
    )(input)
}

/// Parse a value marker (I, L, s).
fn parse_value_marker(input: &str) -> IResult<&str, Marker> {
    alt((
        value(Marker::Identifier, char('I')),
        value(Marker::Literal, char('L')),
        value(Marker::String, char('s')),
    ))(input)
}

/// Parse a parameter name.
fn parse_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}
