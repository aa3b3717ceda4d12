use tracing::{debug, warn};

use crate::backend::{to_row, Backend, BackendResult};
use crate::error::ApiResult;
use crate::gateway::Gateway;
use crate::models::{AuthUser, Role, SignUpData, UserMetadata};

/// Signed-in user, or `None` when there is no session or the lookup fails.
pub async fn current_user(gateway: &Gateway) -> Option<AuthUser> {
    match gateway
        .request_optional(gateway.backend().current_user())
        .await
    {
        Ok(user) => user,
        Err(err) => {
            warn!(kind = ?err.kind, "could not resolve current user");
            None
        }
    }
}

pub async fn sign_in(gateway: &Gateway, email: &str, password: &str) -> ApiResult<AuthUser> {
    debug!(email, "signing in");
    gateway
        .request(gateway.backend().sign_in(email, password))
        .await
}

pub async fn sign_out(gateway: &Gateway) -> ApiResult<()> {
    gateway.execute(gateway.backend().sign_out()).await
}

pub async fn sign_up(
    gateway: &Gateway,
    email: &str,
    password: &str,
    data: &SignUpData,
) -> ApiResult<AuthUser> {
    gateway
        .request(register(gateway.backend(), email, password, data))
        .await
}

async fn register(
    backend: &dyn Backend,
    email: &str,
    password: &str,
    data: &SignUpData,
) -> BackendResult {
    backend.sign_up(email, password, to_row(data)?).await
}

/// Merges the set fields of `metadata` into the signed-in user's metadata.
pub async fn update_user_data(gateway: &Gateway, metadata: &UserMetadata) -> ApiResult<AuthUser> {
    gateway
        .request(merge_metadata(gateway.backend(), metadata))
        .await
}

async fn merge_metadata(backend: &dyn Backend, metadata: &UserMetadata) -> BackendResult {
    backend.update_user(to_row(metadata)?).await
}

pub async fn reset_password(gateway: &Gateway, email: &str) -> ApiResult<()> {
    gateway.execute(gateway.backend().reset_password(email)).await
}

pub async fn has_role(gateway: &Gateway, role: Role) -> bool {
    current_user(gateway)
        .await
        .is_some_and(|user| user.role() == Some(role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::error::{BackendError, ErrorKind};
    use crate::testing::memory_gateway;

    fn trainer() -> SignUpData {
        SignUpData {
            role: Role::Trainer,
            first_name: "Dana".to_string(),
            last_name: "Reyes".to_string(),
        }
    }

    #[tokio::test]
    async fn sign_up_stores_role_metadata_and_signs_in() {
        let (gateway, _backend, notifier) = memory_gateway(MemoryBackend::new());

        let user = sign_up(&gateway, "dana@example.com", "hunter22", &trainer())
            .await
            .unwrap();
        assert_eq!(user.role(), Some(Role::Trainer));
        assert_eq!(user.display_name(), "Dana Reyes");

        assert_eq!(current_user(&gateway).await.map(|u| u.id), Some(user.id));
        assert!(has_role(&gateway, Role::Trainer).await);
        assert!(!has_role(&gateway, Role::Client).await);
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn sign_out_then_sign_in_again() {
        let (gateway, _backend, _notifier) = memory_gateway(MemoryBackend::new());
        sign_up(&gateway, "dana@example.com", "hunter22", &trainer())
            .await
            .unwrap();

        sign_out(&gateway).await.unwrap();
        assert!(current_user(&gateway).await.is_none());

        let user = sign_in(&gateway, "dana@example.com", "hunter22").await.unwrap();
        assert_eq!(user.email.as_deref(), Some("dana@example.com"));
    }

    #[tokio::test]
    async fn wrong_password_is_notified_once() {
        let (gateway, _backend, notifier) = memory_gateway(MemoryBackend::new());
        let err = sign_in(&gateway, "nobody@example.com", "nope").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert_eq!(notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn update_merges_metadata() {
        let (gateway, _backend, _notifier) = memory_gateway(MemoryBackend::new());
        sign_up(&gateway, "dana@example.com", "hunter22", &trainer())
            .await
            .unwrap();

        let patch = UserMetadata {
            last_name: Some("Cole".to_string()),
            ..UserMetadata::default()
        };
        let user = update_user_data(&gateway, &patch).await.unwrap();
        assert_eq!(user.display_name(), "Dana Cole");
        assert_eq!(user.role(), Some(Role::Trainer));
    }

    #[tokio::test]
    async fn failed_lookup_reads_as_signed_out() {
        let (gateway, backend, _notifier) = memory_gateway(MemoryBackend::new());
        backend.sign_in_as("c@example.com", serde_json::json!({"role": "client"}));
        backend.fail_auth(BackendError::new("500", "auth down"));

        assert!(current_user(&gateway).await.is_none());
        assert!(current_user(&gateway).await.is_some());
    }

    #[tokio::test]
    async fn reset_password_succeeds_without_data() {
        let (gateway, _backend, notifier) = memory_gateway(MemoryBackend::new());
        reset_password(&gateway, "dana@example.com").await.unwrap();
        assert!(notifier.messages().is_empty());
    }
}
