//! Seam to the external proxy process

use std::future::Future;

use log::warn;
use thiserror::Error;

use crate::models::TrojanStatus;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("proxy process unavailable: {0}")]
    Unavailable(String),

    #[error("proxy process command failed: {0}")]
    CommandFailed(String),
}

/// Control over the proxy engine running outside this crate
pub trait ProcessControl {
    fn status(&self) -> impl Future<Output = Result<TrojanStatus, ProcessError>>;
    fn stop(&self) -> impl Future<Output = Result<(), ProcessError>>;
    fn run(&self, name: &str, config_path: &str) -> impl Future<Output = Result<(), ProcessError>>;
}

/// Ask for the process status, reading any failure as "nothing running"
pub async fn query_status<P: ProcessControl>(process: &P) -> TrojanStatus {
    match process.status().await {
        Ok(status) => status,
        Err(e) => {
            warn!("Failed to query proxy status: {}", e);
            TrojanStatus::default()
        }
    }
}

/// Process control for platforms without a local proxy process
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProcess;

impl ProcessControl for NoProcess {
    async fn status(&self) -> Result<TrojanStatus, ProcessError> {
        Ok(TrojanStatus::default())
    }

    async fn stop(&self) -> Result<(), ProcessError> {
        Ok(())
    }

    async fn run(&self, name: &str, _config_path: &str) -> Result<(), ProcessError> {
        Err(ProcessError::Unavailable(format!(
            "cannot start {} without a local proxy process",
            name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl ProcessControl for Broken {
        async fn status(&self) -> Result<TrojanStatus, ProcessError> {
            Err(ProcessError::Unavailable("ipc closed".into()))
        }

        async fn stop(&self) -> Result<(), ProcessError> {
            Ok(())
        }

        async fn run(&self, _name: &str, _config_path: &str) -> Result<(), ProcessError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_status_reads_as_idle() {
        let status = query_status(&Broken).await;
        assert!(!status.is_running);
        assert_eq!(status.name, None);
        assert!(!status.proxy_status);
    }

    #[tokio::test]
    async fn test_no_process() {
        assert_eq!(query_status(&NoProcess).await, TrojanStatus::default());
        assert!(NoProcess.stop().await.is_ok());
        assert!(NoProcess.run("a", "/tmp/a.json").await.is_err());
    }
}
