use crate::{
    ast::{visit_mut, Case, Cases, VisitMut},
    Ast, Filter, Permission,
};

use indexmap::IndexMap;
use tracing::trace;

/// Annotates every collection scope of `ast` with the cases derived from
/// the rules `permissions` hold for that collection.
pub(crate) fn inject_cases(ast: &mut Ast, permissions: &[Permission]) {
    ast.visit_mut(&mut Injector { permissions });
}

struct Injector<'a> {
    permissions: &'a [Permission],
}

impl VisitMut for Injector<'_> {
    fn visit_scope_mut(&mut self, scope: visit_mut::ScopeMut<'_>) {
        let rules: Vec<&Permission> = self
            .permissions
            .iter()
            .filter(|permission| permission.collection == scope.collection)
            .collect();

        let requested: Vec<String> = scope
            .children
            .iter()
            .map(|child| child.field_key().to_string())
            .collect();

        let cases = build_cases(&rules, &requested);
        trace!(
            collection = scope.collection,
            path = %scope.path,
            cases = cases.cases.len(),
            allowed = cases.allowed_fields.len(),
            "cases injected"
        );
        *scope.cases = Some(cases);

        visit_mut::visit_scope_mut(self, scope);
    }
}

/// Cases of every collection in `collections`, built from all of its rules.
/// Filter and `count()` subqueries read these collections without
/// selecting any field, so no rule is pruned.
pub(crate) fn related_cases(
    collections: &[String],
    permissions: &[Permission],
) -> IndexMap<String, Cases> {
    collections
        .iter()
        .map(|collection| {
            let rules: Vec<&Permission> = permissions
                .iter()
                .filter(|permission| &permission.collection == collection)
                .collect();
            (collection.clone(), build_cases(&rules, &[]))
        })
        .collect()
}

/// Turns the rules of one collection into cases.
///
/// Identical rules collapse into one. Rules that do not cover any of the
/// `requested` fields are dropped. Unconditional rules contribute to the
/// allowed fields and never produce a case. The remaining rules become
/// cases numbered in their original order.
pub(crate) fn build_cases(rules: &[&Permission], requested: &[String]) -> Cases {
    let mut cases = Cases::default();

    for (rule, fields) in dedupe(rules) {
        let relevant = requested.is_empty()
            || fields.iter().any(|field| field == "*" || requested.contains(field));
        if !relevant {
            continue;
        }

        let Some(filter) = rule else {
            cases.allowed_fields.extend(fields);
            continue;
        };

        let index = cases.cases.len();
        cases.cases.push(Case {
            index,
            rule: filter.clone(),
        });

        for field in fields {
            cases.case_map.entry(field).or_default().push(index);
        }
    }

    cases
}

/// Distinct `(row filter, field list)` pairs in first-seen order. An
/// unconditional filter is normalized to `None`.
fn dedupe<'a>(rules: &[&'a Permission]) -> Vec<(Option<&'a Filter>, Vec<String>)> {
    let mut out: Vec<(Option<&'a Filter>, Vec<String>)> = vec![];

    for rule in rules {
        let filter = rule
            .permissions
            .as_ref()
            .filter(|filter| !filter.is_unconditional());

        let fields = rule.field_list();
        let mut sorted = fields.clone();
        sorted.sort();

        let seen = out.iter().any(|(other, other_fields)| {
            let mut other_sorted = other_fields.clone();
            other_sorted.sort();
            *other == filter && other_sorted == sorted
        });

        if !seen {
            out.push((filter, fields));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Action;
    use indexmap::IndexSet;
    use pretty_assertions::assert_eq;

    fn rule(fields: &[&str], filter: Option<Filter>) -> Permission {
        let permission =
            Permission::new("p", "articles", Action::Read).fields(fields.iter().copied());
        match filter {
            Some(filter) => permission.filter(filter),
            None => permission,
        }
    }

    fn requested(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn single_conditional_rule() {
        let published = rule(&["id", "title"], Some(Filter::eq("status", "published")));
        let cases = build_cases(&[&published], &requested(&["id", "title"]));

        assert_eq!(
            cases.cases,
            vec![Case {
                index: 0,
                rule: Filter::eq("status", "published")
            }]
        );
        assert_eq!(cases.case_map["id"], vec![0]);
        assert_eq!(cases.case_map["title"], vec![0]);
        assert!(cases.allowed_fields.is_empty());
    }

    #[test]
    fn indices_follow_rule_order() {
        let a = rule(&["id", "title"], Some(Filter::eq("status", "published")));
        let b = rule(&["id", "body"], Some(Filter::eq("owner", "u1")));
        let cases = build_cases(&[&a, &b], &requested(&["id", "title", "body"]));

        assert_eq!(cases.cases[0].rule, Filter::eq("status", "published"));
        assert_eq!(cases.cases[1].rule, Filter::eq("owner", "u1"));
        assert_eq!(cases.case_map["id"], vec![0, 1]);
        assert_eq!(cases.case_map["title"], vec![0]);
        assert_eq!(cases.case_map["body"], vec![1]);
    }

    #[test]
    fn unconditional_rules_never_become_cases() {
        let open = rule(&["id"], None);
        let empty = rule(&["title"], Some(Filter::all()));
        let cases = build_cases(&[&open, &empty], &requested(&["id", "title"]));

        assert!(cases.cases.is_empty());
        assert!(cases.case_map.is_empty());
        assert_eq!(
            cases.allowed_fields,
            IndexSet::from(["id".to_string(), "title".to_string()])
        );
    }

    #[test]
    fn identical_rules_collapse() {
        let a = rule(&["id", "title"], Some(Filter::eq("status", "published")));
        let b = rule(&["title", "id"], Some(Filter::eq("status", "published")));
        let cases = build_cases(&[&a, &b], &requested(&["id"]));

        assert_eq!(cases.cases.len(), 1);
        assert_eq!(cases.case_map["id"], vec![0]);
    }

    #[test]
    fn irrelevant_rules_are_pruned_in_order() {
        let a = rule(&["secret"], Some(Filter::eq("level", 9)));
        let b = rule(&["title"], Some(Filter::eq("status", "published")));
        let c = rule(&["*"], Some(Filter::eq("owner", "u1")));
        let cases = build_cases(&[&a, &b, &c], &requested(&["title"]));

        assert_eq!(cases.cases.len(), 2);
        assert_eq!(cases.cases[0].rule, Filter::eq("status", "published"));
        assert_eq!(cases.case_map["title"], vec![0]);
        assert_eq!(cases.case_map["*"], vec![1]);
        assert_eq!(cases.cases_for("title"), vec![0, 1]);
    }

    #[test]
    fn nothing_requested_keeps_everything() {
        let a = rule(&["secret"], Some(Filter::eq("level", 9)));
        let cases = build_cases(&[&a], &[]);
        assert_eq!(cases.cases.len(), 1);
    }

    #[test]
    fn injects_every_scope() {
        let mut ast = Ast::new("articles").child("id").child("title");
        let rules = [rule(&["id"], Some(Filter::eq("status", "published")))];

        inject_cases(&mut ast, &rules);

        let cases = ast.cases.unwrap();
        assert_eq!(cases.cases.len(), 1);
        assert_eq!(cases.case_map["id"], vec![0]);
    }
}
