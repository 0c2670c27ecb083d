pub mod leaf;
pub use leaf::*;

pub mod project;
pub use project::*;

pub mod filter;
pub use filter::*;

pub mod sort;
pub use sort::*;

pub mod join;
pub use join::*;

pub mod set_operation;
pub use set_operation::*;

pub mod union;
pub use union::*;

pub mod aggregate;
pub use aggregate::*;

pub mod grouping;
pub use grouping::*;

pub mod limit;
pub use limit::*;

pub mod alias;
pub use alias::*;

pub mod view;
pub use view::*;

pub mod sample;
pub use sample::*;

pub mod repartition;
pub use repartition::*;

pub mod misc;
pub use misc::*;
