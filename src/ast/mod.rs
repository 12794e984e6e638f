pub mod field;
pub mod operators;
pub mod predicate;
pub mod relation;
pub mod select;
pub mod template;

pub use self::field::Field;
pub use self::operators::{JoinKind, LogicalOp, NullsOrder, Operator, SortOrder};
pub use self::predicate::{and, or, Operand, Predicate};
pub use self::relation::{AliasCell, Cte, Relation, Table};
pub use self::select::{select, Clauses, Distinct, DistinctOn, JoinClause, SelectQuery};
pub use self::template::{Part, RawQuery, Segment, Template};
