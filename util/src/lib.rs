use std::{fmt, num::ParseIntError, str::FromStr};

use miette::GraphicalReportHandler;
use nom::{
    character::complete::{digit1, one_of},
    combinator::{map_res, opt, recognize},
    error::{FromExternalError, ParseError},
    sequence::pair,
    IResult,
};
use nom_locate::LocatedSpan;
use nom_supreme::{
    error::{ErrorTree, GenericErrorTree},
    final_parser::final_parser,
};

// Thanks to FasterThanLime! https://fasterthanli.me/series/advent-of-code-2022/part-11

pub type Span<'a> = LocatedSpan<&'a str>;

/// A parse failure inside a single line, with the byte offset it points at.
#[derive(thiserror::Error, Debug, miette::Diagnostic)]
#[error("bad input")]
pub struct BadInput<'a> {
    #[source_code]
    src: &'a str,

    #[label("{kind}")]
    bad_bit: miette::SourceSpan,

    kind: String,
}

impl<'a> BadInput<'a> {
    pub fn new(src: &'a str, offset: usize, kind: impl Into<String>) -> Self {
        Self {
            src,
            bad_bit: miette::SourceSpan::new(offset.into(), 0.into()),
            kind: kind.into(),
        }
    }

    pub fn offset(&self) -> usize {
        self.bad_bit.offset()
    }

    /// Renders the line with a caret under the offending position.
    pub fn render(&self) -> Result<String, fmt::Error> {
        let mut s = String::new();
        GraphicalReportHandler::new().render_report(&mut s, self)?;
        Ok(s)
    }
}

/// Signed integer, an optional `+` or `-` followed by digits.
pub fn parse_number<'a, T, E>(i: Span<'a>) -> IResult<Span<'a>, T, E>
where
    T: FromStr<Err = ParseIntError>,
    E: ParseError<Span<'a>> + FromExternalError<Span<'a>, ParseIntError>,
{
    map_res(recognize(pair(opt(one_of("+-")), digit1)), |i: Span<'a>| {
        FromStr::from_str(i.fragment())
    })(i)
}

pub fn parse_unsigned<'a, T, E>(i: Span<'a>) -> IResult<Span<'a>, T, E>
where
    T: FromStr<Err = ParseIntError>,
    E: ParseError<Span<'a>> + FromExternalError<Span<'a>, ParseIntError>,
{
    map_res(digit1, |i: Span<'a>| FromStr::from_str(i.fragment()))(i)
}

fn innermost(e: ErrorTree<Span<'_>>) -> (usize, String) {
    match e {
        GenericErrorTree::Base { location, kind } => {
            (location.location_offset(), kind.to_string())
        }
        GenericErrorTree::Stack { base, .. } => innermost(*base),
        GenericErrorTree::Alt(alts) => alts
            .into_iter()
            .next()
            .map(innermost)
            .unwrap_or_else(|| (0, "no alternative matched".to_string())),
    }
}

/// Runs `parse_fun` over the whole of `l`; leftover input is an error.
pub fn parse_exact<'a, T, F>(l: &'a str, parse_fun: F) -> Result<T, BadInput<'a>>
where
    F: FnMut(Span<'a>) -> IResult<Span<'a>, T, ErrorTree<Span<'a>>>,
{
    let line_span = Span::new(l);
    let line: Result<_, ErrorTree<Span>> = final_parser(parse_fun)(line_span);
    line.map_err(|e| {
        let (offset, kind) = innermost(e);
        BadInput::new(l, offset, kind)
    })
}
