//! Wire types for Wordspy.
//!
//! Everything that travels between clients, server processes, and the
//! shared snapshot store is defined here: identity newtypes, the phase
//! and role enums, player actions, server notifications, and the
//! versioned [`StateSnapshot`] with its per-recipient redaction.
//!
//! # Key types
//!
//! - [`PlayerId`] / [`RoomCode`] - identity newtypes
//! - [`Phase`] - the per-room phase machine states
//! - [`Role`] - tagged role variant; word visibility is a function of it
//! - [`ClientAction`] - what players send
//! - [`ServerNotification`] - what the server sends back
//! - [`StateSnapshot`] - full authoritative room state, version-stamped
//! - [`ClientSnapshot`] - what one recipient is allowed to see

mod action;
mod notify;
mod snapshot;
mod types;

pub use action::{ActionEnvelope, ClientAction, StartOptions};
pub use notify::{ErrorCode, ServerNotification};
pub use snapshot::{
    ClientSnapshot, MemberState, RoleAssignment, RoomUpdate, RoundOutcome, StateSnapshot,
    YourRole,
};
pub use types::{Phase, PlayerId, Recipient, Role, RoomCode, Verdict, Winner};
