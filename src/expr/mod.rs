pub mod expr_id;
pub use expr_id::*;

pub mod attribute;
pub use attribute::*;

pub mod literal;
pub use literal::*;

pub mod expression;
pub use expression::*;

pub mod predicate_helper;
pub use predicate_helper::*;

mod canonical;
mod rewrite;
