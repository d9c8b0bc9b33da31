//! Disposable infrastructure for integration tests.

pub mod mysql;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TestInfraError {
    #[error("container failed: {0}")]
    Container(#[from] testcontainers::TestcontainersError),
}

pub type Result<T> = std::result::Result<T, TestInfraError>;
