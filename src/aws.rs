//! Explicit AWS context shared by the EC2 source and the DynamoDB store.
//!
//! The SDK is async; this crate runs each invocation on one thread, so the
//! context owns a current-thread runtime and blocks on every call. Build it
//! once at startup and hand it (as `Arc<AwsContext>`) to whatever needs AWS.

use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use std::future::Future;

pub struct AwsContext {
    runtime: tokio::runtime::Runtime,
}

impl AwsContext {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("build tokio runtime for AWS calls")?;
        Ok(Self { runtime })
    }

    /// Run one SDK future to completion.
    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Load the default credential chain pinned to `region`.
    /// Honors AWS_ENDPOINT_URL and friends for local emulators.
    pub fn sdk_config(&self, region: &str) -> SdkConfig {
        let region = Region::new(region.to_string());
        self.block_on(
            aws_config::defaults(BehaviorVersion::latest())
                .region(region)
                .load(),
        )
    }
}
