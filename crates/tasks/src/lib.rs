//! Background task primitives of the sync committee: periodic workers, their supervision and
//! synchronous pausing.

pub use error::WorkerError;
mod error;

pub use pause::{IterationGuard, PauseController};
mod pause;

pub use supervisor::{Supervisor, SupervisorHandle};
mod supervisor;

pub use worker::{PeriodicTask, PeriodicWorker, Worker};
mod worker;
