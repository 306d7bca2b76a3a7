use std::sync::Arc;

use crate::auth::registry::PermissionRegistry;
use crate::errors::VerifyError;
use crate::middleware::metrics;
use crate::store::executor::{Pagination, QueryExecutor};
use crate::store::params::Params;

const TOKEN_LOOKUP_SQL: &str = "SELECT * FROM tokens WHERE token = :token";

/// Checks a token's permission flags against the store.
///
/// Nothing is cached: every call re-reads the token row, so a revoked flag
/// takes effect as soon as the revoking transaction commits.
#[derive(Clone)]
pub struct TokenVerifier {
    executor: QueryExecutor,
    registry: Arc<PermissionRegistry>,
}

impl TokenVerifier {
    pub fn new(executor: QueryExecutor, registry: Arc<PermissionRegistry>) -> Self {
        Self { executor, registry }
    }

    pub fn registry(&self) -> &PermissionRegistry {
        &self.registry
    }

    /// `Ok(true)` when `token` exists and its flag for `permission` is granted.
    ///
    /// A missing token, an unknown permission name and an unset flag all fail
    /// with the same [`VerifyError::PermissionDenied`]. Store failures are
    /// returned as [`VerifyError::Store`].
    pub async fn verify(&self, token: &str, permission: &str) -> Result<bool, VerifyError> {
        let accessor = self.registry.resolve(permission);
        let rows = self
            .executor
            .execute_paged(
                TOKEN_LOOKUP_SQL,
                Params::new().with("token", token),
                Pagination::new(1, 1),
            )
            .await?;

        let granted = match rows {
            Some(rows) if !rows.is_empty() => rows
                .records()?
                .first()
                .map_or(false, |record| accessor.is_granted(record)),
            _ => false,
        };

        metrics::record_permission_check(accessor.permission(), granted);

        if granted {
            tracing::debug!(permission, "permission granted");
            Ok(true)
        } else {
            tracing::debug!(permission, "permission denied");
            Err(VerifyError::PermissionDenied {
                permission: permission.to_string(),
            })
        }
    }
}
