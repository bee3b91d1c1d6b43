//! Poll-and-buffer pipeline.
//!
//! - `query`: builds one status query per poll from the cursor
//! - `diversity`: per-bucket collapse/expand policy
//! - `poll`: executes the query and flattens expansions
//! - `materialize`: in-flight dedup and item construction
//! - `poller`: the buffered `FrontierPoller` driven by the scheduler

pub mod diversity;
pub mod materialize;
pub mod poll;
pub mod poller;
pub mod query;
pub mod stats;

pub use diversity::{BucketRequest, DiversityPolicy};
pub use materialize::{Materialized, Materializer};
pub use poll::{Candidates, PollExecutor};
pub use poller::FrontierPoller;
pub use query::QueryBuilder;
pub use stats::{PollReport, QueryTimes};
