use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::OrmConn,
    security::{FieldCipher, PasswordHasher, TokenService},
};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub tokens: Arc<TokenService>,
    pub cipher: FieldCipher,
    pub passwords: PasswordHasher,
}

impl AppState {
    /// Builds the shared state. Token or hasher setup problems are fatal here.
    pub fn new(orm: OrmConn, config: &AppConfig) -> anyhow::Result<Self> {
        let cipher = FieldCipher::new(config.encryption_key);
        let tokens = TokenService::new(&config.jwt, &cipher)?;
        let passwords = PasswordHasher::new(&config.password_hash)?;
        Ok(Self {
            orm,
            tokens: Arc::new(tokens),
            cipher,
            passwords,
        })
    }
}
