use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::{tag, take_till, take_while};
use nom::character::complete::{char, multispace0, satisfy};
use nom::combinator::{all_consuming, map, opt, recognize};
use nom::error::{Error, ErrorKind};
use nom::multi::{many0, separated_list1};
use nom::sequence::{delimited, pair, preceded, tuple};
use nom::IResult;
use tracing::{debug, trace};

use super::{AttributeSelector, Selector, SelectorError, SelectorList, SimpleSelector};

/// Parse a comma-separated selector list such as `.katex, mjx-container`
pub fn selector_list(input: &str) -> Result<SelectorList, SelectorError> {
    let parser = delimited(
        multispace0,
        separated_list1(tuple((multispace0, char(','), multispace0)), parse_selector),
        multispace0,
    );
    let offset = match all_consuming(parser)(input) {
        Ok((_, selectors)) => {
            trace!(selector = input, count = selectors.len(), "Parsed selector list");
            return Ok(SelectorList(selectors));
        }
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => input.len() - e.input.len(),
        Err(nom::Err::Incomplete(_)) => input.len(),
    };
    debug!(selector = input, offset, "Rejected selector");
    Err(SelectorError::Invalid {
        selector: input.to_string(),
        offset,
    })
}

impl FromStr for SelectorList {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        selector_list(s)
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let SelectorList(mut selectors) = selector_list(s)?;
        if selectors.len() != 1 {
            return Err(SelectorError::NotSingle {
                selector: s.to_string(),
                count: selectors.len(),
            });
        }
        Ok(selectors.remove(0))
    }
}

/// A type or universal selector followed by any number of class, id and attribute selectors
fn parse_selector(input: &str) -> IResult<&str, Selector> {
    let (res, (head, mut tail)) = pair(
        opt(parse_type_selector),
        many0(alt((
            parse_class_selector,
            parse_id_selector,
            parse_attribute_selector,
        ))),
    )(input)?;
    if let Some(head) = head {
        tail.insert(0, head);
    }
    match tail.len() {
        0 => Err(nom::Err::Error(Error::new(input, ErrorKind::Verify))),
        1 => Ok((res, Selector::Simple(tail.remove(0)))),
        _ => Ok((res, Selector::Compound(tail))),
    }
}

fn parse_type_selector(input: &str) -> IResult<&str, SimpleSelector> {
    alt((
        map(char('*'), |_| SimpleSelector::Universal),
        map(parse_identifier, |name| {
            SimpleSelector::Type(name.to_ascii_lowercase())
        }),
    ))(input)
}

fn parse_class_selector(input: &str) -> IResult<&str, SimpleSelector> {
    map(preceded(char('.'), parse_identifier), |name| {
        SimpleSelector::Class(name.to_string())
    })(input)
}

fn parse_id_selector(input: &str) -> IResult<&str, SimpleSelector> {
    map(preceded(char('#'), parse_identifier), |name| {
        SimpleSelector::ID(name.to_string())
    })(input)
}

/// Parse `[name]` or `[name op value]`
fn parse_attribute_selector(input: &str) -> IResult<&str, SimpleSelector> {
    let (res, (_, name, _, rest, _)) = delimited(
        char('['),
        tuple((
            multispace0,
            parse_identifier,
            multispace0,
            opt(tuple((parse_operator, multispace0, parse_value))),
            multispace0,
        )),
        char(']'),
    )(input)?;
    let name = name.to_ascii_lowercase();
    let selector = match rest {
        None => AttributeSelector::Has(name),
        Some((op, _, value)) => {
            let value = value.to_string();
            match op {
                "=" => AttributeSelector::Equals(name, value),
                "~=" => AttributeSelector::Includes(name, value),
                "|=" => AttributeSelector::Begins(name, value),
                "^=" => AttributeSelector::Prefix(name, value),
                "$=" => AttributeSelector::Suffix(name, value),
                _ => AttributeSelector::Contains(name, value),
            }
        }
    };
    Ok((res, SimpleSelector::Attribute(selector)))
}

fn parse_operator(input: &str) -> IResult<&str, &str> {
    alt((
        tag("="),
        tag("~="),
        tag("|="),
        tag("^="),
        tag("$="),
        tag("*="),
    ))(input)
}

fn parse_value(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_till(|c| c == '"'), char('"')),
        delimited(char('\''), take_till(|c| c == '\''), char('\'')),
        parse_identifier,
    ))(input)
}

fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_alphabetic() || c == '_' || c == '-'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '-'),
    ))(input)
}

#[cfg(test)]
#[test]
fn test_parse_ident() {
    assert!(parse_identifier("test").is_ok());
    assert!(parse_identifier("_test").is_ok());
    assert_eq!(parse_identifier("mjx-container>").unwrap(), (">", "mjx-container"));
    assert!(parse_identifier("9lives").is_err());
}

#[cfg(test)]
#[test]
fn test_parse_attribute() {
    assert_eq!(
        parse_attribute_selector(r#"[type*="math/tex"]"#).unwrap(),
        (
            "",
            SimpleSelector::Attribute(AttributeSelector::Contains(
                "type".to_string(),
                "math/tex".to_string()
            ))
        )
    );
    assert_eq!(
        parse_attribute_selector("[ Data-Latex ]").unwrap(),
        (
            "",
            SimpleSelector::Attribute(AttributeSelector::Has("data-latex".to_string()))
        )
    );
    assert_eq!(
        parse_attribute_selector("[lang|=en]").unwrap(),
        (
            "",
            SimpleSelector::Attribute(AttributeSelector::Begins(
                "lang".to_string(),
                "en".to_string()
            ))
        )
    );
    assert!(parse_attribute_selector("[type*=\"math/tex\"").is_err());
}
