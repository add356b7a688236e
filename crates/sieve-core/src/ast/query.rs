use crate::{filter::Filter, Error, Result};

/// Modifiers applied to one collection scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Option<Filter>,
    pub sort: Option<Vec<Sort>>,

    /// `-1` removes the limit
    pub limit: Option<i64>,
    pub offset: Option<i64>,

    /// 1-based page, turned into an offset of `limit * (page - 1)`
    pub page: Option<i64>,

    pub group: Option<Vec<String>>,
    pub aggregate: Option<Aggregate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Aggregate functions and the fields each is applied to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregate {
    pub functions: Vec<(AggregateFn, Vec<String>)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFn {
    Count,
    CountDistinct,
    CountAll,
    Sum,
    SumDistinct,
    Avg,
    AvgDistinct,
    Min,
    Max,
}

impl Query {
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the sort from `field` / `-field` entries.
    pub fn sort<I, S>(mut self, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.sort = Some(
            entries
                .into_iter()
                .map(|entry| Sort::parse(entry.as_ref()))
                .collect::<Result<_>>()?,
        );
        Ok(self)
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn page(mut self, page: i64) -> Self {
        self.page = Some(page);
        self
    }

    pub fn group<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn aggregate(mut self, function: AggregateFn, fields: &[&str]) -> Self {
        self.aggregate
            .get_or_insert_with(Aggregate::default)
            .functions
            .push((function, fields.iter().map(|f| f.to_string()).collect()));
        self
    }
}

impl Sort {
    pub fn parse(entry: &str) -> Result<Sort> {
        let (field, direction) = match entry.strip_prefix('-') {
            Some(field) => (field, Direction::Desc),
            None => (entry, Direction::Asc),
        };

        if field.is_empty() {
            return Err(Error::invalid_query(format!(
                "sort entry `{entry}` does not name a field"
            )));
        }

        Ok(Sort {
            field: field.to_string(),
            direction,
        })
    }

    pub fn asc(field: impl Into<String>) -> Sort {
        Sort {
            field: field.into(),
            direction: Direction::Asc,
        }
    }
}

impl AggregateFn {
    pub fn parse(name: &str) -> Option<AggregateFn> {
        Some(match name {
            "count" => AggregateFn::Count,
            "countDistinct" => AggregateFn::CountDistinct,
            "countAll" => AggregateFn::CountAll,
            "sum" => AggregateFn::Sum,
            "sumDistinct" => AggregateFn::SumDistinct,
            "avg" => AggregateFn::Avg,
            "avgDistinct" => AggregateFn::AvgDistinct,
            "min" => AggregateFn::Min,
            "max" => AggregateFn::Max,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AggregateFn::Count => "count",
            AggregateFn::CountDistinct => "countDistinct",
            AggregateFn::CountAll => "countAll",
            AggregateFn::Sum => "sum",
            AggregateFn::SumDistinct => "sumDistinct",
            AggregateFn::Avg => "avg",
            AggregateFn::AvgDistinct => "avgDistinct",
            AggregateFn::Min => "min",
            AggregateFn::Max => "max",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_prefix() {
        assert_eq!(
            Sort::parse("-date_created").unwrap(),
            Sort {
                field: "date_created".into(),
                direction: Direction::Desc
            }
        );
        assert_eq!(Sort::parse("title").unwrap().direction, Direction::Asc);
        assert!(Sort::parse("-").unwrap_err().is_invalid_query());
    }
}
