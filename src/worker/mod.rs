pub mod orchestrator;
pub mod queue;

pub use orchestrator::Orchestrator;
pub use queue::TaskQueue;
