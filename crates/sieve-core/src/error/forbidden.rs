use super::Error;

/// Access to a collection or to some of its fields is not granted.
///
/// The message names what was queried and where, never which rule failed
/// to match, so it is safe to hand back to the caller. A collection or field
/// that does not exist produces the exact same message as one that exists
/// but is not granted.
#[derive(Debug)]
pub(super) enum ForbiddenError {
    Collection {
        collection: Box<str>,
        path: Box<str>,
    },
    Fields {
        collection: Box<str>,
        fields: Vec<Box<str>>,
        path: Box<str>,
    },
}

impl ForbiddenError {
    fn path(&self) -> &str {
        match self {
            ForbiddenError::Collection { path, .. } => path,
            ForbiddenError::Fields { path, .. } => path,
        }
    }
}

impl std::error::Error for ForbiddenError {}

impl core::fmt::Display for ForbiddenError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            ForbiddenError::Collection { collection, .. } => write!(
                f,
                "You don't have permission to access collection \"{collection}\" or it does not exist."
            )?,
            ForbiddenError::Fields {
                collection,
                fields,
                ..
            } => {
                let (noun, verb) = if fields.len() == 1 {
                    ("field", "it does")
                } else {
                    ("fields", "they do")
                };

                write!(f, "You don't have permission to access {noun} ")?;

                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "\"{field}\"")?;
                }

                write!(f, " in collection \"{collection}\" or {verb} not exist.")?;
            }
        }

        match self.path() {
            "" => f.write_str(" Queried in root."),
            path => write!(f, " Queried in \"{path}\"."),
        }
    }
}

impl Error {
    /// No permission row exists for `collection` at `path`.
    pub fn forbidden_collection(collection: impl Into<String>, path: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::Forbidden(ForbiddenError::Collection {
            collection: collection.into().into(),
            path: path.into().into(),
        }))
    }

    /// Some of the requested `fields` are outside the allowed set.
    pub fn forbidden_fields<I, S>(
        collection: impl Into<String>,
        fields: I,
        path: impl Into<String>,
    ) -> Error
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Error::from(super::ErrorKind::Forbidden(ForbiddenError::Fields {
            collection: collection.into().into(),
            fields: fields.into_iter().map(|f| f.into().into()).collect(),
            path: path.into().into(),
        }))
    }

    /// Returns `true` if this error is a forbidden-access error.
    pub fn is_forbidden(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Forbidden(_))
    }
}
