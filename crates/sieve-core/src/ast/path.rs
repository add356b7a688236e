/// Position of a collection scope in the AST, used as the field map key.
///
/// Each segment is the field key that was followed, plus the target
/// collection for any-to-one branches. The root scope has no segments.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathSegment {
    pub field: String,
    pub collection: Option<String>,
}

impl FieldPath {
    pub fn root() -> FieldPath {
        FieldPath::default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Extends the path through a relational field.
    pub fn child(&self, field: impl Into<String>) -> FieldPath {
        self.push(PathSegment {
            field: field.into(),
            collection: None,
        })
    }

    /// Extends the path through one branch of an any-to-one field.
    pub fn scoped(&self, field: impl Into<String>, collection: impl Into<String>) -> FieldPath {
        self.push(PathSegment {
            field: field.into(),
            collection: Some(collection.into()),
        })
    }

    fn push(&self, segment: PathSegment) -> FieldPath {
        let mut segments = self.segments.clone();
        segments.push(segment);
        FieldPath { segments }
    }
}

impl core::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            core::fmt::Display::fmt(segment, f)?;
        }
        Ok(())
    }
}

impl core::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str(&self.field)?;
        if let Some(collection) = &self.collection {
            write!(f, ":{collection}")?;
        }
        Ok(())
    }
}
