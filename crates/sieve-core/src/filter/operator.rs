/// Comparison operators available in filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Neq,
    Ieq,
    Nieq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Nin,
    Null,
    Nnull,
    Contains,
    Ncontains,
    Icontains,
    Nicontains,
    StartsWith,
    NstartsWith,
    IstartsWith,
    NistartsWith,
    EndsWith,
    NendsWith,
    IendsWith,
    NiendsWith,
    Between,
    Nbetween,
    Empty,
    Nempty,
    Intersects,
    Nintersects,
    IntersectsBbox,
    NintersectsBbox,
}

const OPERATORS: &[(&str, Operator)] = &[
    ("_eq", Operator::Eq),
    ("_neq", Operator::Neq),
    ("_ieq", Operator::Ieq),
    ("_nieq", Operator::Nieq),
    ("_lt", Operator::Lt),
    ("_lte", Operator::Lte),
    ("_gt", Operator::Gt),
    ("_gte", Operator::Gte),
    ("_in", Operator::In),
    ("_nin", Operator::Nin),
    ("_null", Operator::Null),
    ("_nnull", Operator::Nnull),
    ("_contains", Operator::Contains),
    ("_ncontains", Operator::Ncontains),
    ("_icontains", Operator::Icontains),
    ("_nicontains", Operator::Nicontains),
    ("_starts_with", Operator::StartsWith),
    ("_nstarts_with", Operator::NstartsWith),
    ("_istarts_with", Operator::IstartsWith),
    ("_nistarts_with", Operator::NistartsWith),
    ("_ends_with", Operator::EndsWith),
    ("_nends_with", Operator::NendsWith),
    ("_iends_with", Operator::IendsWith),
    ("_niends_with", Operator::NiendsWith),
    ("_between", Operator::Between),
    ("_nbetween", Operator::Nbetween),
    ("_empty", Operator::Empty),
    ("_nempty", Operator::Nempty),
    ("_intersects", Operator::Intersects),
    ("_nintersects", Operator::Nintersects),
    ("_intersects_bbox", Operator::IntersectsBbox),
    ("_nintersects_bbox", Operator::NintersectsBbox),
];

impl Operator {
    pub fn parse(name: &str) -> Option<Operator> {
        OPERATORS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, op)| *op)
    }

    pub fn as_str(self) -> &'static str {
        OPERATORS
            .iter()
            .find(|(_, op)| *op == self)
            .map(|(n, _)| *n)
            .unwrap_or("_eq")
    }

    /// Returns `true` for operators whose operand is a list.
    pub fn takes_list(self) -> bool {
        matches!(
            self,
            Operator::In | Operator::Nin | Operator::Between | Operator::Nbetween
        )
    }
}

impl core::fmt::Display for Operator {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
