//! The dialect-neutral query plan produced by the converter and consumed by
//! the [`Serializer`](crate::Serializer).

mod condition;
pub use condition::{CompareOp, Condition};

mod expr;
pub use expr::{AggregateFunction, ColumnRef, DatePart, Expr};

mod join;
pub use join::Join;

mod order_by;
pub use order_by::{Direction, OrderBy};

mod parameters;
pub use parameters::{ParameterIndex, Parameters};

mod query;
pub use query::{Query, ResultShape, ShapeKind};

mod select;
pub use select::{Select, SelectItem, Source, TableRef};
