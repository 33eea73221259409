//! Connection acceptance, worker dispatch and shutdown.

pub mod dispatcher;
pub mod listener;
pub mod shutdown;

pub use dispatcher::{DrainReport, WorkerDispatcher};
pub use listener::Server;
pub use shutdown::Shutdown;
