pub mod traits;
pub use traits::*;

pub mod logical_plan;
pub use logical_plan::*;

pub mod constraint_set;
pub use constraint_set::*;

pub mod constraints;
pub use constraints::*;

pub mod nodes;
pub use nodes::*;

pub mod canonicalize;

pub mod plan_builder;
pub use plan_builder::*;
