pub mod recorder;
pub mod scheduler;
pub mod types;

pub use recorder::Recorder;
pub use scheduler::Scheduler;
pub use types::CycleReport;
