//! Tokenization of `{{identifier}}` placeholders using `nom`.
//!
//! A string value is split into literal runs and placeholder tokens. Single
//! braces, `${...}` substitution syntax and lone `}}` are ordinary text.

use nom::{
    IResult, Parser,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::multispace0,
    combinator::recognize,
    sequence::delimited,
};
use stackweave_common::constants::{PLACEHOLDER_CLOSE, PLACEHOLDER_OPEN};

/// A piece of a tokenized string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text copied verbatim.
    Literal(&'a str),
    /// Identifier of a `{{identifier}}` token.
    Placeholder(&'a str),
}

/// An opening delimiter that does not start a well-formed token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed placeholder near \"{text}\"")]
pub struct LexError {
    /// Text from the offending delimiter, truncated for display.
    pub text: String,
}

const fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

const fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-'
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize((take_while1(is_ident_start), take_while(is_ident_continue))).parse(input)
}

/// Parses one `{{ identifier }}` token, spaces inside the braces allowed.
fn placeholder(input: &str) -> IResult<&str, &str> {
    delimited(
        (tag(PLACEHOLDER_OPEN), multispace0),
        identifier,
        (multispace0, tag(PLACEHOLDER_CLOSE)),
    )
    .parse(input)
}

fn literal(input: &str) -> IResult<&str, &str> {
    take_until(PLACEHOLDER_OPEN).parse(input)
}

/// Splits `input` into literal and placeholder segments.
///
/// # Errors
///
/// Returns a [`LexError`] at the first `{{` that is not followed by an
/// identifier and a closing `}}`.
pub fn segments(input: &str) -> Result<Vec<Segment<'_>>, LexError> {
    let mut out = Vec::new();
    let mut remaining = input;

    while !remaining.is_empty() {
        let Ok((rest, text)) = literal(remaining) else {
            out.push(Segment::Literal(remaining));
            break;
        };
        if !text.is_empty() {
            out.push(Segment::Literal(text));
        }
        match placeholder(rest) {
            Ok((after, name)) => {
                out.push(Segment::Placeholder(name));
                remaining = after;
            }
            Err(_) => {
                return Err(LexError {
                    text: rest.chars().take(40).collect(),
                });
            }
        }
    }

    Ok(out)
}

/// Returns `true` if `input` contains any placeholder opening delimiter.
#[must_use]
pub fn has_token_syntax(input: &str) -> bool {
    input.contains(PLACEHOLDER_OPEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_one_literal() {
        assert_eq!(segments("hello").expect("lex"), vec![Segment::Literal("hello")]);
    }

    #[test]
    fn empty_string_has_no_segments() {
        assert!(segments("").expect("lex").is_empty());
    }

    #[test]
    fn placeholder_between_literals() {
        assert_eq!(
            segments("{{app}}-{{env}}-fn").expect("lex"),
            vec![
                Segment::Placeholder("app"),
                Segment::Literal("-"),
                Segment::Placeholder("env"),
                Segment::Literal("-fn"),
            ]
        );
    }

    #[test]
    fn spaces_inside_braces_are_allowed() {
        assert_eq!(
            segments("{{ name }}").expect("lex"),
            vec![Segment::Placeholder("name")]
        );
    }

    #[test]
    fn dotted_and_dashed_identifiers() {
        assert_eq!(
            segments("{{vpc.subnet-a}}").expect("lex"),
            vec![Segment::Placeholder("vpc.subnet-a")]
        );
    }

    #[test]
    fn cloudformation_sub_syntax_is_literal() {
        let text = "arn:aws:apigateway:${AWS::Region}:lambda:path/${Fn.Arn}/invocations";
        assert_eq!(segments(text).expect("lex"), vec![Segment::Literal(text)]);
    }

    #[test]
    fn unterminated_token_fails() {
        let err = segments("prefix-{{name").unwrap_err();
        assert_eq!(err.text, "{{name");
    }

    #[test]
    fn empty_token_fails() {
        assert!(segments("{{}}").is_err());
    }

    #[test]
    fn identifier_cannot_start_with_digit() {
        assert!(segments("{{1st}}").is_err());
    }

    #[test]
    fn token_syntax_detection() {
        assert!(has_token_syntax("a{{b"));
        assert!(!has_token_syntax("${AWS::Region}"));
    }
}
