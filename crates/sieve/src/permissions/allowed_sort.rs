use crate::{ast, schema::Relation, Accountability, Action, Result, SchemaOverview, Sieve};

/// The scope a default sort is resolved for.
#[derive(Debug, Clone, Copy)]
pub struct AllowedSort<'a> {
    pub collection: &'a str,

    /// Relation the collection is read through, for one-to-many scopes
    pub relation: Option<&'a Relation>,

    pub query: Option<&'a ast::Query>,
}

impl<'a> AllowedSort<'a> {
    pub fn new(collection: &'a str) -> AllowedSort<'a> {
        AllowedSort {
            collection,
            relation: None,
            query: None,
        }
    }
}

impl Sieve {
    /// Default sort of a scope, restricted to the fields the caller may
    /// read.
    pub async fn get_allowed_sort(
        &self,
        options: AllowedSort<'_>,
        accountability: Option<&Accountability>,
    ) -> Result<Option<Vec<String>>> {
        let schema = self.schema();

        let allowed = match accountability {
            Some(accountability) if !accountability.admin => Some(
                self.get_allowed_fields(options.collection, Action::Read, accountability)
                    .await?,
            ),
            _ => None,
        };

        Ok(resolve_allowed_sort(&schema, &options, allowed.as_deref()))
    }
}

/// Picks the sort field of a scope.
///
/// The first group field wins. Otherwise the collection's manual sort
/// field, then the relation's sort field, then the primary key. With
/// `allowed_fields` set, a candidate the caller may not read falls back to
/// the first allowed field, or to no sort at all.
pub fn resolve_allowed_sort(
    schema: &SchemaOverview,
    options: &AllowedSort<'_>,
    allowed_fields: Option<&[String]>,
) -> Option<Vec<String>> {
    let collection = schema.collection(options.collection)?;

    let group = options
        .query
        .and_then(|query| query.group.as_ref())
        .and_then(|group| group.first());

    let candidate = group
        .map(String::as_str)
        .or(collection.sort_field.as_deref())
        .or(options.relation.and_then(Relation::meta_sort_field))
        .unwrap_or(collection.primary.as_str());

    let Some(allowed) = allowed_fields else {
        return Some(vec![candidate.to_string()]);
    };

    if allowed.iter().any(|field| field == "*" || field == candidate) {
        return Some(vec![candidate.to_string()]);
    }

    allowed
        .iter()
        .find(|field| *field != "*")
        .map(|field| vec![field.clone()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Collection, Field, FieldType};
    use pretty_assertions::assert_eq;

    fn schema() -> SchemaOverview {
        SchemaOverview::builder()
            .collection(
                Collection::new("articles", "id")
                    .field(Field::new("id", FieldType::Integer))
                    .field(Field::new("title", FieldType::String))
                    .field(Field::new("status", FieldType::String)),
            )
            .collection(
                Collection::new("pages", "id")
                    .sort_field("position")
                    .field(Field::new("id", FieldType::Integer))
                    .field(Field::new("position", FieldType::Integer)),
            )
            .collection(
                Collection::new("comments", "id")
                    .field(Field::new("id", FieldType::Integer))
                    .field(Field::new("article", FieldType::Integer))
                    .field(Field::new("rank", FieldType::Integer)),
            )
            .relation(
                Relation::m2o("comments", "article", "articles")
                    .one_field("comments")
                    .sort_field("rank"),
            )
            .build()
            .unwrap()
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn primary_key_by_default() {
        let schema = schema();
        let sort = resolve_allowed_sort(&schema, &AllowedSort::new("articles"), None);
        assert_eq!(sort, Some(names(&["id"])));
    }

    #[test]
    fn manual_sort_field() {
        let schema = schema();
        let sort = resolve_allowed_sort(&schema, &AllowedSort::new("pages"), None);
        assert_eq!(sort, Some(names(&["position"])));
    }

    #[test]
    fn relation_sort_field() {
        let schema = schema();
        let relation = schema.relations[0].clone();
        let options = AllowedSort {
            relation: Some(&relation),
            ..AllowedSort::new("comments")
        };
        let sort = resolve_allowed_sort(&schema, &options, None);
        assert_eq!(sort, Some(names(&["rank"])));
    }

    #[test]
    fn group_overrides_everything() {
        let schema = schema();
        let query = ast::Query::default().group(["status"]);
        let options = AllowedSort {
            query: Some(&query),
            ..AllowedSort::new("articles")
        };
        let sort = resolve_allowed_sort(&schema, &options, None);
        assert_eq!(sort, Some(names(&["status"])));
    }

    #[test]
    fn falls_back_to_first_allowed_field() {
        let schema = schema();
        let allowed = names(&["title", "status"]);
        let sort = resolve_allowed_sort(&schema, &AllowedSort::new("articles"), Some(&allowed[..]));
        assert_eq!(sort, Some(names(&["title"])));
    }

    #[test]
    fn nothing_allowed_means_no_sort() {
        let schema = schema();
        let sort = resolve_allowed_sort(&schema, &AllowedSort::new("articles"), Some(&[][..]));
        assert_eq!(sort, None);
    }

    #[test]
    fn wildcard_keeps_candidate() {
        let schema = schema();
        let allowed = names(&["*"]);
        let sort = resolve_allowed_sort(&schema, &AllowedSort::new("articles"), Some(&allowed[..]));
        assert_eq!(sort, Some(names(&["id"])));
    }

    #[test]
    fn unknown_collection() {
        let schema = schema();
        assert_eq!(
            resolve_allowed_sort(&schema, &AllowedSort::new("ghosts"), None),
            None
        );
    }
}
