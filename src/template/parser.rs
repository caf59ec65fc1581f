//! Marker parser.
//!
//! Markers are delimited by `{{` and `}}`. The text between them is a single
//! call, `head('arg', ...)`, parsed with chumsky:
//!
//! ```text
//! {{ table('orders') }}              -> Reference::Table
//! {{ ref('orders') }}                -> Reference::Table
//! {{ column('orders', 'amount') }}   -> Reference::Column
//! {{ ref('orders', 'amount') }}      -> Reference::Column
//! {{ metric('total_revenue') }}      -> Reference::Metric
//! {{ custom_instructions('tone') }}  -> Reference::Instruction
//! ```
//!
//! Heads are case-insensitive and arguments may use either quote style.

use chumsky::prelude::*;

use super::ast::{Marker, Reference, Segment, Span, Template};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// A marker that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceSyntaxError {
    #[error("unterminated reference marker at {span}")]
    Unterminated { span: Span },

    #[error("malformed reference marker at {span}: {message}")]
    Malformed { span: Span, message: String },

    #[error("unknown reference kind '{head}' at {span}")]
    UnknownKind { head: String, span: Span },

    #[error("'{head}' expects {expected} argument(s) but got {found} at {span}")]
    Arity {
        head: String,
        expected: &'static str,
        found: usize,
        span: Span,
    },

    #[error("empty argument in reference marker at {span}")]
    EmptyArgument { span: Span },

    #[error("expected a table reference at {span}, found '{found}'")]
    ExpectedTable { found: String, span: Span },
}

impl ReferenceSyntaxError {
    pub fn span(&self) -> Span {
        match self {
            ReferenceSyntaxError::Unterminated { span }
            | ReferenceSyntaxError::Malformed { span, .. }
            | ReferenceSyntaxError::UnknownKind { span, .. }
            | ReferenceSyntaxError::Arity { span, .. }
            | ReferenceSyntaxError::EmptyArgument { span }
            | ReferenceSyntaxError::ExpectedTable { span, .. } => *span,
        }
    }
}

/// Parser for the inside of a marker: `head ( 'arg' , "arg" )`.
fn call<'src>(
) -> impl Parser<'src, &'src str, (&'src str, Vec<&'src str>), extra::Err<Rich<'src, char>>> {
    let single = just('\'')
        .ignore_then(none_of('\'').repeated().to_slice())
        .then_ignore(just('\''));
    let double = just('"')
        .ignore_then(none_of('"').repeated().to_slice())
        .then_ignore(just('"'));

    let arguments = single
        .or(double)
        .padded()
        .separated_by(just(','))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just('('), just(')'));

    text::ident()
        .then(arguments.padded())
        .padded()
        .then_ignore(end())
}

/// Parse the body of one marker into a reference.
fn parse_marker(body: &str, span: Span) -> Result<Reference, ReferenceSyntaxError> {
    let (output, errors) = call().parse(body).into_output_errors();

    let (head, args) = match output {
        Some(call) if errors.is_empty() => call,
        _ => {
            let message = errors
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "expected head('argument', ...)".to_string());
            return Err(ReferenceSyntaxError::Malformed { span, message });
        }
    };

    let args: Vec<String> = args.iter().map(|a| a.trim().to_string()).collect();
    if args.iter().any(|a| a.is_empty()) {
        return Err(ReferenceSyntaxError::EmptyArgument { span });
    }

    let head = head.to_lowercase();
    let arity = |expected: &'static str| ReferenceSyntaxError::Arity {
        head: head.clone(),
        expected,
        found: args.len(),
        span,
    };

    match (head.as_str(), args.as_slice()) {
        ("table", [table]) | ("ref", [table]) => Ok(Reference::Table {
            table: table.clone(),
        }),
        ("column", [table, column]) | ("ref", [table, column]) => Ok(Reference::Column {
            table: table.clone(),
            column: column.clone(),
        }),
        ("metric", [name]) => Ok(Reference::Metric { name: name.clone() }),
        ("custom_instructions" | "custom_instruction", [name]) => {
            Ok(Reference::Instruction { name: name.clone() })
        }
        ("table" | "metric" | "custom_instructions" | "custom_instruction", _) => Err(arity("1")),
        ("column", _) => Err(arity("2")),
        ("ref", _) => Err(arity("1 or 2")),
        _ => Err(ReferenceSyntaxError::UnknownKind {
            head: head.clone(),
            span,
        }),
    }
}

/// Split `text` into literal runs and markers.
///
/// Every malformed marker is reported; parsing continues past each one.
pub fn parse_template(text: &str) -> Result<Template, Vec<ReferenceSyntaxError>> {
    let mut segments = Vec::new();
    let mut errors = Vec::new();
    let mut cursor = 0;

    while let Some(found) = text[cursor..].find(OPEN) {
        let open = cursor + found;
        let body_start = open + OPEN.len();

        let close = match text[body_start..].find(CLOSE) {
            Some(rel) => body_start + rel,
            None => {
                errors.push(ReferenceSyntaxError::Unterminated {
                    span: Span::new(open, text.len()),
                });
                break;
            }
        };

        let body = &text[body_start..close];
        let end = close + CLOSE.len();

        // `{{ a {{ b }}`: the first marker never closed.
        if let Some(nested) = body.find(OPEN) {
            errors.push(ReferenceSyntaxError::Unterminated {
                span: Span::new(open, body_start + nested),
            });
            cursor = body_start + nested;
            continue;
        }

        if open > cursor {
            segments.push(Segment::Text(text[cursor..open].to_string()));
        }

        let span = Span::new(open, end);
        match parse_marker(body, span) {
            Ok(reference) => segments.push(Segment::Marker(Marker { reference, span })),
            Err(e) => errors.push(e),
        }
        cursor = end;
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    if cursor < text.len() {
        segments.push(Segment::Text(text[cursor..].to_string()));
    }
    Ok(Template { segments })
}

/// Parse one entry of a `tables:` list: a table marker or a bare name.
pub fn parse_table_entry(raw: &str) -> Result<String, Vec<ReferenceSyntaxError>> {
    if !raw.contains(OPEN) {
        let name = raw.trim();
        if name.is_empty() {
            return Err(vec![ReferenceSyntaxError::ExpectedTable {
                found: raw.to_string(),
                span: Span::new(0, raw.len()),
            }]);
        }
        return Ok(name.to_string());
    }

    let template = parse_template(raw)?;
    let markers: Vec<&Marker> = template.markers().collect();
    match markers.as_slice() {
        [Marker {
            reference: Reference::Table { table },
            ..
        }] if template.is_markers_only() => Ok(table.clone()),
        _ => Err(vec![ReferenceSyntaxError::ExpectedTable {
            found: raw.trim().to_string(),
            span: Span::new(0, raw.len()),
        }]),
    }
}
