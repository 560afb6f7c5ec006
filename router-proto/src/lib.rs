//! Wire types and the pure distance-vector/route-table state machine
//! shared by every router instance.
//!
//! Nothing in this crate touches a socket, a clock, or a background task:
//! the `router` crate drives [`RoutingState`] from its own I/O loops.

mod error;
mod packet;
mod state;
mod table;

pub use error::{Error, Result};
pub use packet::{ControlPayload, Destination, Packet};
pub use state::{Classification, DropReason, RoutingState};
pub use table::MAX_HOP;
