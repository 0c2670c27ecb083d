use thiserror::Error;

pub type PlanResult<T> = Result<T, PlanError>;

/// Construction-time precondition violations.
///
/// A node whose inputs fail one of these checks is never built. Incomplete
/// resolution is not an error: it is reported through `LogicalPlan::resolved`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("Range step must not be zero (start = {start}, end = {end})")]
    ZeroRangeStep { start: i64, end: i64 },

    #[error("Number of partitions ({0}) must be positive.")]
    NonPositivePartitions(i64),

    #[error("Sampling fraction ({fraction}) must be nonnegative with replacement")]
    NegativeSampleFraction { fraction: f64 },

    #[error("Sampling fraction ({fraction}) must be on interval [0, 1] without replacement")]
    SampleFractionOutOfRange { fraction: f64 },

    #[error(
        "RepartitionByExpression expects that either all its partition expressions are sort \
         orders (range partitioning) or none of them are (hash partitioning); got sort orders \
         [{sort_orders}] and non sort orders [{others}]"
    )]
    MixedPartitionExpressions { sort_orders: String, others: String },

    #[error("Grouping by {count} attributes exceeds the {width} bits of the grouping id")]
    TooManyGroupingAttributes { count: usize, width: usize },

    #[error("Grouping set attribute `{0}` is not one of the group by attributes")]
    UnknownGroupingAttribute(String),

    #[error("{node} expects {expected} children, got {got}")]
    ChildCountMismatch { node: &'static str, expected: usize, got: usize },

    #[error("Invalid value `{value}` for configuration `{key}`")]
    InvalidConfig { key: String, value: String },

    #[error("Invalid configuration document: {0}")]
    ConfigFormat(String),
}
