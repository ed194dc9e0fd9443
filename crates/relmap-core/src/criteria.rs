//! Filter criteria expressed in terms of entity property paths.

mod expression;
pub use expression::CriteriaExpression;

mod normalize;
pub use normalize::{normalize, Criteria};

mod operator;
pub use operator::Operator;

mod order_by;
pub use order_by::{normalize_order_by, Direction, OrderBy};

mod qb;
pub use qb::Qb;
