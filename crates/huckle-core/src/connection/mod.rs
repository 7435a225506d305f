mod backoff;
mod clock;
mod machine;
mod state;
mod supervisor;

pub use backoff::BackoffPolicy;
pub use clock::{Clock, ClockSample, SleepGap, SystemClock};
pub use machine::{ConnectionMachine, Trigger};
pub use state::{ConnectionState, ConnectionStatus, Transition, TransitionCause};
pub use supervisor::{ConnectionSupervisor, SupervisorSettings};
