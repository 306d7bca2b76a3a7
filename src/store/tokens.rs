use crate::errors::StoreError;
use crate::models::token::{NewToken, TokenRecord};
use crate::store::executor::{Pagination, QueryExecutor};
use crate::store::params::Params;

/// Administrative access to the `tokens` table. Permission checks go through
/// [`crate::auth::TokenVerifier`], not this repository.
#[derive(Clone)]
pub struct TokenRepository {
    executor: QueryExecutor,
}

impl TokenRepository {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    pub async fn find(&self, token: &str) -> Result<Option<TokenRecord>, StoreError> {
        let rows = self
            .executor
            .execute_paged(
                "SELECT token, request_highscores, verify_ban, create_token, verify_players \
                 FROM tokens WHERE token = :token",
                Params::new().with("token", token),
                Pagination::new(1, 1),
            )
            .await?;

        match rows {
            Some(rows) => Ok(rows.deserialize::<TokenRecord>()?.into_iter().next()),
            None => Ok(None),
        }
    }

    pub async fn insert(&self, new_token: &NewToken) -> Result<(), StoreError> {
        let grant = &new_token.grant;
        self.executor
            .execute(
                "INSERT INTO tokens (token, request_highscores, verify_ban, create_token, verify_players) \
                 VALUES (:token, :request_highscores, :verify_ban, :create_token, :verify_players)",
                Params::new()
                    .with("token", new_token.token.as_str())
                    .with("request_highscores", i64::from(grant.request_highscores))
                    .with("verify_ban", i64::from(grant.verify_ban))
                    .with("create_token", i64::from(grant.create_token))
                    .with("verify_players", i64::from(grant.verify_players)),
            )
            .await?;
        tracing::info!("token issued");
        Ok(())
    }
}
