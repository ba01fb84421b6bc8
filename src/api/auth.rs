// src/api/auth.rs

use validator::Validate;

use super::{Access, ApiClient};
use crate::{
    error::ClientError,
    models::user::{CreateUserRequest, LoginRequest, TokenResponse, User},
    routes,
};

impl ApiClient {
    /// Authenticates and installs the returned token as the active credential.
    pub async fn login(&self, payload: &LoginRequest) -> Result<TokenResponse, ClientError> {
        payload
            .validate()
            .map_err(|e| ClientError::Validation(e.to_string()))?;

        let token: TokenResponse = self
            .post_json(routes::LOGIN, payload, Access::Public)
            .await?;

        if !token.token_type.eq_ignore_ascii_case("bearer") {
            return Err(ClientError::Auth(format!(
                "Unsupported token type '{}'",
                token.token_type
            )));
        }

        self.auth().set_token(token.access_token.clone())?;
        tracing::info!("Logged in as {}", payload.username);
        Ok(token)
    }

    /// Registers a new account. Does not log in.
    pub async fn register(&self, payload: &CreateUserRequest) -> Result<User, ClientError> {
        payload
            .validate()
            .map_err(|e| ClientError::Validation(e.to_string()))?;

        self.post_json(routes::REGISTER, payload, Access::Public)
            .await
    }

    pub async fn me(&self) -> Result<User, ClientError> {
        self.get_json(routes::ME, Access::Authenticated).await
    }

    pub fn logout(&self) {
        self.auth().invalidate();
    }
}
