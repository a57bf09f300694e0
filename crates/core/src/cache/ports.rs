//! Port interface for remote reads

use std::future::Future;

use async_trait::async_trait;

/// Idempotent remote read supplied by the application.
#[async_trait]
pub trait Fetcher<T>: Send + Sync {
    async fn fetch(&self) -> anyhow::Result<T>;
}

#[async_trait]
impl<T, F, Fut> Fetcher<T> for F
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<T>> + Send,
{
    async fn fetch(&self) -> anyhow::Result<T> {
        (self)().await
    }
}
