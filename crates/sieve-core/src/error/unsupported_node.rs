use super::Error;

/// The query converter reached an AST node kind it does not lower.
#[derive(Debug)]
pub(super) struct UnsupportedNode {
    pub(super) kind: &'static str,
    pub(super) field: Box<str>,
}

impl std::error::Error for UnsupportedNode {}

impl core::fmt::Display for UnsupportedNode {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "unsupported node: `{}` node \"{}\" cannot be lowered",
            self.kind, self.field
        )
    }
}

impl Error {
    /// Creates an unsupported node error for the node of `kind` at `field`.
    pub fn unsupported_node(kind: &'static str, field: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::UnsupportedNode(UnsupportedNode {
            kind,
            field: field.into().into(),
        }))
    }

    /// Returns `true` if this error is an unsupported node error.
    pub fn is_unsupported_node(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::UnsupportedNode(_))
    }
}
