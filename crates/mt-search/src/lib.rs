//! # mt-search
//!
//! Grid-search moment-tensor inversion.
//!
//! Provides the misfit collaborator contract, a driver that evaluates a
//! weighted misfit over every (origin, source) pair of a grid, and a
//! coordinator that splits the source grid across workers and merges the
//! partial misfit surfaces back into grid order.

mod comm;
mod config;
mod coordinator;
mod driver;
mod misfit;
mod status;
mod surface;

#[cfg(test)]
mod testing;

pub use comm::{ChannelCommunicator, Communicator, SerialCommunicator, ROOT};
pub use config::{ExecutionMode, SearchConfig, WORKERS_ENV};
pub use coordinator::{grid_search, grid_search_with_mode, DistributedCoordinator};
pub use driver::GridSearchDriver;
pub use misfit::{MisfitCategory, MisfitEvaluator, TimeShiftWindow, TraceAttributes};
pub use status::{SearchId, SearchState, SearchStatus};
pub use surface::{BestFit, MisfitSurface};
