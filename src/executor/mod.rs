//! An executor runs the tests of a plan and reports what happened to them.

pub mod results;
mod runner;
mod scheduler;

pub use results::{ConsoleListener, RecordingListener, Summary};
pub use runner::SelectiveRunner;
pub use scheduler::{
    ChildWork, ParallelScheduler, RunnerScheduler, SynchronousScheduler,
};
