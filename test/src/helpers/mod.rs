pub mod messages;
pub mod session;

pub use messages::{app_broadcast, control_incoming, to_incoming};
pub use session::{TestPeer, TestSession};
