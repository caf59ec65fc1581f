//! Typed form of text with embedded reference markers.

use std::fmt;

use serde::Serialize;

/// Byte range into the text a marker was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn offset(self, by: usize) -> Self {
        Self::new(self.start + by, self.end + by)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// What a marker points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Reference {
    Table { table: String },
    Column { table: String, column: String },
    Metric { name: String },
    Instruction { name: String },
}

impl Reference {
    /// Human label of the reference kind.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Reference::Table { .. } => "table",
            Reference::Column { .. } => "column",
            Reference::Metric { .. } => "metric",
            Reference::Instruction { .. } => "custom instruction",
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Table { table } => write!(f, "table('{}')", table),
            Reference::Column { table, column } => write!(f, "column('{}', '{}')", table, column),
            Reference::Metric { name } => write!(f, "metric('{}')", name),
            Reference::Instruction { name } => write!(f, "custom_instructions('{}')", name),
        }
    }
}

/// A reference marker and where it sits in its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Marker {
    pub reference: Reference,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Segment {
    Text(String),
    Marker(Marker),
}

/// Text split into literal runs and markers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Template {
    pub segments: Vec<Segment>,
}

impl Template {
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Marker(m) => Some(m),
            Segment::Text(_) => None,
        })
    }

    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.markers().map(|m| &m.reference)
    }

    /// True when every literal run is whitespace.
    pub fn is_markers_only(&self) -> bool {
        self.segments.iter().all(|s| match s {
            Segment::Text(t) => t.trim().is_empty(),
            Segment::Marker(_) => true,
        })
    }

    /// Rebuild the text, replacing each marker with `render(marker)`.
    pub fn render<E>(
        &self,
        mut render: impl FnMut(&Marker) -> Result<String, E>,
    ) -> Result<String, E> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Marker(marker) => out.push_str(&render(marker)?),
            }
        }
        Ok(out)
    }
}
