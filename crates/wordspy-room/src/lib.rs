//! Room orchestration for Wordspy.
//!
//! One actor task per room owns a [`RoomSession`] exclusively; the
//! [`RoomRegistry`] allocates codes and routes to handles. The session
//! itself is pure state whose mutations return [`Effects`], so every
//! phase transition is unit-testable without a runtime.

mod config;
mod error;
mod registry;
mod room;
mod session;

pub use config::{PhaseSchedule, RoomOptions};
pub use error::ActionError;
pub use registry::{RegistryConfig, RoomRegistry};
pub use room::{spawn_room, PlayerSender, RoomCommand, RoomHandle, RoomInfo};
pub use session::{Effects, RoomSession, TimerOp};
