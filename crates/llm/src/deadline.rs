//! Hard deadlines for external calls

use std::future::Future;
use std::time::Duration;

use crate::LlmError;

/// Await `fut` for at most `budget`; elapsed budgets become [`LlmError::Timeout`]
pub async fn with_deadline<T, F>(budget: Duration, fut: F) -> Result<T, LlmError>
where
    F: Future<Output = Result<T, LlmError>>,
{
    match tokio::time::timeout(budget, fut).await {
        Ok(result) => result,
        Err(_) => Err(LlmError::Timeout),
    }
}
