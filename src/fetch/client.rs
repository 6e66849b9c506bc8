use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes dataset requests; wrap it to add auth, retries or test doubles.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
