//! The top-level error type.

use wordspy_protocol::{ErrorCode, ServerNotification};
use wordspy_room::ActionError;
use wordspy_sync::SyncError;

use crate::AuthError;

/// Any error the orchestrator surfaces to a caller.
#[derive(Debug, thiserror::Error)]
pub enum WordspyError {
    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl WordspyError {
    /// The wire code for the acting client.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Action(error) => error.code(),
            Self::Sync(_) | Self::Auth(_) => ErrorCode::Internal,
        }
    }

    /// The error as a notification for the acting client.
    pub fn to_notification(&self) -> ServerNotification {
        ServerNotification::Error { code: self.code(), message: self.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wordspy_protocol::{PlayerId, RoomCode};

    #[test]
    fn test_from_action_error_preserves_code() {
        let error: WordspyError = ActionError::RoomNotFound(RoomCode::new("AB12")).into();
        assert_eq!(error.code(), ErrorCode::RoomNotFound);
        assert!(error.to_string().contains("AB12"));
    }

    #[test]
    fn test_auth_error_maps_to_internal() {
        let error: WordspyError = AuthError::InvalidToken.into();
        assert_eq!(error.code(), ErrorCode::Internal);
    }

    #[test]
    fn test_notification_carries_message() {
        let error: WordspyError = ActionError::NotHost(PlayerId(2)).into();
        match error.to_notification() {
            ServerNotification::Error { code, message } => {
                assert_eq!(code, ErrorCode::NotHost);
                assert!(message.contains("P-2"));
            }
            other => panic!("unexpected notification: {other:?}"),
        }
    }
}
