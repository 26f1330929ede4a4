pub mod command;
pub mod log;
pub mod supervisor;
pub mod types;

pub use command::{MinerCommand, ResolvedCommand};
pub use supervisor::MinerSupervisor;
pub use types::{OutputLine, OutputStream, ProcessError, SupervisorEvent, SupervisorState};
