#[mockall::automock]
#[async_trait::async_trait]
pub trait SessionPort: Send + Sync {
    /// Identifier of the signed-in user
    async fn current_user_id(&self) -> Result<String, Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Nobody is signed in
    #[error("no authenticated user")]
    NotAuthenticated,

    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
