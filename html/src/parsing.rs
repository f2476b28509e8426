use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, tag_no_case, take_till, take_till1, take_until, take_while},
    character::complete::{char, multispace0, multispace1, satisfy},
    combinator::{map, opt, recognize},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use tracing::trace;

use crate::dom::{Attributes, Document, Element, NodeData, NodeId};
use crate::entities::decode_entities;

/// Elements which never have contents or a closing tag
static VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose contents are not markup. Only the latter two have character references.
static RAW_TEXT: &[&str] = &["script", "style", "textarea", "title"];
static ESCAPABLE_RAW_TEXT: &[&str] = &["textarea", "title"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    Doctype,
    Comment(&'a str),
    StartTag {
        name: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
    },
    EndTag(String),
    Text(&'a str),
}

/// Attempt to parse a string as a valid tag name, such as `div` or `mjx-container`
fn parse_tag_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic()),
        take_while(|c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | ':' | '_' | '.')),
    ))(input)
}

fn parse_doctype(input: &str) -> IResult<&str, Token<'_>> {
    map(
        tuple((tag_no_case("<!doctype"), take_until(">"), char('>'))),
        |_| Token::Doctype,
    )(input)
}

fn parse_comment(input: &str) -> IResult<&str, Token<'_>> {
    map(delimited(tag("<!--"), take_until("-->"), tag("-->")), Token::Comment)(input)
}

/// `<![CDATA[...]>`, `<?xml ...?>` and friends are kept as comments
fn parse_bogus_comment(input: &str) -> IResult<&str, Token<'_>> {
    map(
        delimited(alt((tag("<!"), tag("<?"))), take_until(">"), char('>')),
        Token::Comment,
    )(input)
}

/// Parse a tag in the form `</name>`
fn parse_close_tag(input: &str) -> IResult<&str, Token<'_>> {
    let (remaining, (_, name, _, _)) =
        tuple((tag("</"), parse_tag_name, take_until(">"), char('>')))(input)?;
    Ok((remaining, Token::EndTag(name.to_ascii_lowercase())))
}

/// Parse a tag in the form `<name attr=value ...>` or `<name ... />`
fn parse_open_tag(input: &str) -> IResult<&str, Token<'_>> {
    let (remaining, (_, name, attrs, _, slash, _)) = tuple((
        char('<'),
        parse_tag_name,
        parse_attributes,
        multispace0,
        opt(char('/')),
        char('>'),
    ))(input)?;
    Ok((
        remaining,
        Token::StartTag {
            name: name.to_ascii_lowercase(),
            attributes: attrs
                .into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), decode_entities(v).into_owned()))
                .collect(),
            self_closing: slash.is_some(),
        },
    ))
}

/// Parse the content between tags
fn parse_text(input: &str) -> IResult<&str, Token<'_>> {
    map(take_till1(|c| c == '<'), Token::Text)(input)
}

/// A `<` that does not start anything we recognise is plain text
fn parse_stray_angle(input: &str) -> IResult<&str, Token<'_>> {
    map(recognize(char('<')), Token::Text)(input)
}

pub(crate) fn next_token(input: &str) -> IResult<&str, Token<'_>> {
    alt((
        parse_text,
        parse_comment,
        parse_doctype,
        parse_bogus_comment,
        parse_close_tag,
        parse_open_tag,
        parse_stray_angle,
    ))(input)
}

/// Split off the contents of a raw text element, up to (not including) its closing tag
fn take_raw_text<'a>(input: &'a str, name: &str) -> (&'a str, &'a str) {
    let needle = format!("</{}", name);
    // ASCII lowercasing keeps byte offsets intact
    match input.to_ascii_lowercase().find(&needle) {
        Some(end) => (&input[end..], &input[..end]),
        None => ("", input),
    }
}

// Attribute parsing below

fn parse_single_quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('\''), take_till(|c| c == '\''), char('\''))(input)
}

fn parse_double_quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_till(|c| c == '"'), char('"'))(input)
}

fn parse_unquoted(input: &str) -> IResult<&str, &str> {
    is_not(" \t\r\n\"'=<>`")(input)
}

/// A value and whether it was quoted
fn value_parser(input: &str) -> IResult<&str, (&str, bool)> {
    alt((
        map(parse_single_quoted, |v| (v, true)),
        map(parse_double_quoted, |v| (v, true)),
        map(parse_unquoted, |v| (v, false)),
    ))(input)
}

fn name_parser(input: &str) -> IResult<&str, &str> {
    is_not(" \t\r\n\"'>/=")(input)
}

fn single_attr_parser(input: &str) -> IResult<&str, (&str, &str, bool)> {
    let (remaining, name) = name_parser(input)?;
    let (remaining, value) = opt(preceded(
        tuple((multispace0, char('='), multispace0)),
        value_parser,
    ))(remaining)?;
    let (value, quoted) = value.unwrap_or(("", false));
    Ok((remaining, (name, value, quoted)))
}

/// Attributes are separated by whitespace, except that a closing quote is already a boundary:
/// `a="1"b="2"` is two attributes
fn parse_attributes(input: &str) -> IResult<&str, Vec<(&str, &str)>> {
    let mut attrs = Vec::new();
    let mut input = input;
    let mut after_quote = false;
    loop {
        let separator: IResult<&str, &str> = if after_quote {
            multispace0(input)
        } else {
            multispace1(input)
        };
        let Ok((rest, _)) = separator else {
            break;
        };
        match single_attr_parser(rest) {
            Ok((rest, (name, value, quoted))) => {
                attrs.push((name, value));
                after_quote = quoted;
                input = rest;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok((input, attrs))
}

/// Tokenize `input` and build the resulting nodes under `parent`.
///
/// Returns the nodes created directly under `parent`.
pub(crate) fn build(doc: &mut Document, parent: NodeId, input: &str) -> Vec<NodeId> {
    let mut stack = vec![parent];
    let mut created = Vec::new();
    let mut input = input;
    while !input.is_empty() {
        let (remaining, token) = match next_token(input) {
            Ok(res) => res,
            Err(_) => break,
        };
        input = remaining;
        let top = stack[stack.len() - 1];
        let id = match token {
            Token::Doctype => continue,
            Token::Comment(c) => doc.append(top, NodeData::Comment(c.to_string())),
            Token::Text(t) => doc.append_text(top, decode_entities(t)),
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let is_void = VOID.contains(&name.as_str());
                let is_raw = RAW_TEXT.contains(&name.as_str());
                let element = Element::new(&name, Some(Attributes::from_iter(attributes)));
                let id = doc.append_element(top, element);
                if is_raw && !self_closing {
                    let (remaining, text) = take_raw_text(input, &name);
                    if !text.is_empty() {
                        if ESCAPABLE_RAW_TEXT.contains(&name.as_str()) {
                            doc.append_text(id, decode_entities(text));
                        } else {
                            doc.append_text(id, text);
                        }
                    }
                    input = remaining;
                    stack.push(id);
                } else if !is_void && !self_closing {
                    stack.push(id);
                }
                id
            }
            Token::EndTag(name) => {
                let open = stack[1..]
                    .iter()
                    .rposition(|&id| doc.element(id).map(|e| e.tag_name == name).unwrap_or(false));
                match open {
                    Some(pos) => stack.truncate(pos + 1),
                    None => trace!(%name, "Ignoring unmatched end tag"),
                }
                continue;
            }
        };
        if top == parent && created.last() != Some(&id) {
            created.push(id);
        }
    }
    created
}

#[cfg(test)]
#[test]
fn test_tag_parse() {
    let data = r#"<div>"#;
    let target = Token::StartTag {
        name: "div".to_string(),
        attributes: vec![],
        self_closing: false,
    };
    assert_eq!(parse_open_tag(data).unwrap(), ("", target));

    let data = r#"<div attr1 attr2=two attr3='three' attr4="number four">"#;
    let target = Token::StartTag {
        name: "div".to_string(),
        attributes: vec![
            ("attr1".to_string(), "".to_string()),
            ("attr2".to_string(), "two".to_string()),
            ("attr3".to_string(), "three".to_string()),
            ("attr4".to_string(), "number four".to_string()),
        ],
        self_closing: false,
    };
    assert_eq!(parse_open_tag(data).unwrap(), ("", target));

    let data = r#"<mjx-container class="MathJax" jax="CHTML"/>"#;
    let target = Token::StartTag {
        name: "mjx-container".to_string(),
        attributes: vec![
            ("class".to_string(), "MathJax".to_string()),
            ("jax".to_string(), "CHTML".to_string()),
        ],
        self_closing: true,
    };
    assert_eq!(parse_open_tag(data).unwrap(), ("", target));
}

#[cfg(test)]
#[test]
fn test_close_tag_parse() {
    assert_eq!(
        parse_close_tag("</SCRIPT >rest").unwrap(),
        ("rest", Token::EndTag("script".to_string()))
    );
    assert!(parse_close_tag("</>").is_err());
}

#[cfg(test)]
#[test]
fn test_next_token() {
    assert_eq!(next_token("<!DOCTYPE html>x").unwrap(), ("x", Token::Doctype));
    assert_eq!(
        next_token("<!-- note -->x").unwrap(),
        ("x", Token::Comment(" note "))
    );
    assert_eq!(next_token("a < b").unwrap(), ("< b", Token::Text("a ")));
    assert_eq!(next_token("< b").unwrap(), (" b", Token::Text("<")));
}

#[cfg(test)]
#[test]
fn test_raw_text() {
    let (rest, text) = take_raw_text("a<b && c</Script>", "script");
    assert_eq!(text, "a<b && c");
    assert_eq!(rest, "</Script>");
    assert_eq!(take_raw_text("unterminated", "style"), ("", "unterminated"));
}

#[cfg(test)]
#[test]
fn test_attributes_after_quote() {
    let data = r#"<span class="katex" data-latex="x^2"aria-hidden='true'role=img>"#;
    let target = Token::StartTag {
        name: "span".to_string(),
        attributes: vec![
            ("class".to_string(), "katex".to_string()),
            ("data-latex".to_string(), "x^2".to_string()),
            ("aria-hidden".to_string(), "true".to_string()),
            ("role".to_string(), "img".to_string()),
        ],
        self_closing: false,
    };
    assert_eq!(parse_open_tag(data).unwrap(), ("", target));
    // Bare names still need whitespace between them
    assert!(parse_open_tag("<span a=b\"c\">").is_err());
}
