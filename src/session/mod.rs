pub mod controller;
pub mod runtime;
pub mod state;

pub use controller::{Completion, SessionController};
pub use runtime::SessionRuntime;
pub use state::{LoadTicket, SessionPhase, SessionSettings, SessionSnapshot, SessionState};
