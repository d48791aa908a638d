//! Where the control-endpoint password comes from.

use async_trait::async_trait;

/// Source of the control-endpoint password.
///
/// Read on every connect attempt and never cached by the caller, so a
/// password saved through the settings endpoint is used by the next
/// reconnect.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Current password, or `None` when authentication is disabled.
    async fn password(&self) -> Option<String>;
}

/// A fixed password, mostly useful in tests and one-off tools.
#[derive(Clone, Debug, Default)]
pub struct StaticCredentials(pub Option<String>);

#[async_trait]
impl CredentialSource for StaticCredentials {
    async fn password(&self) -> Option<String> {
        self.0.clone().filter(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_password_means_none() {
        assert_eq!(StaticCredentials(Some(String::new())).password().await, None);
        assert_eq!(StaticCredentials(None).password().await, None);
    }

    #[tokio::test]
    async fn password_is_returned() {
        let creds = StaticCredentials(Some("secret".into()));
        assert_eq!(creds.password().await.as_deref(), Some("secret"));
    }
}
