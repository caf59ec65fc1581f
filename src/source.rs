//! Text handed to the compiler by whoever read it from disk.

/// A named blob of source text (a manifest, a metadata file, a definition file).
///
/// The compiler never touches the filesystem itself; `path` is only used to
/// label findings and load errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub path: String,
    pub contents: String,
}

impl SourceText {
    pub fn new(path: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}
