use thiserror::Error;

/// Failures of the session lifecycle.
///
/// `NoCredential`, `Unauthenticated` and `MalformedIdentity` come out of
/// `rehydrate` after the session has already been reset to logged out;
/// callers may ignore them. `LoginRejected` carries text for the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No stored credential")]
    NoCredential,

    #[error("Credential was rejected or has expired")]
    Unauthenticated,

    #[error("Server returned an incomplete user identity")]
    MalformedIdentity,

    #[error("{0}")]
    LoginRejected(String),

    #[error("Network failure: {0}")]
    NetworkFailure(String),
}

impl SessionError {
    /// Message to show in the sign-in view
    pub fn user_message(&self) -> String {
        match self {
            SessionError::LoginRejected(message) => message.clone(),
            SessionError::NetworkFailure(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            _ => "Please sign in".to_string(),
        }
    }
}
