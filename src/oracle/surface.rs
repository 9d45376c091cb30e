//! Interactive conversion surface and the adapter that drives it.
//!
//! The converter is only reachable the way a person would use it: put text
//! in the input box, press convert, wait, copy the output box. A
//! [`ConversionSurface`] exposes exactly those steps; [`SurfaceOracle`]
//! strings them together into one batch exchange.

use super::TransliterationOracle;
use crate::error::OracleError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// The user-facing controls of a text converter.
#[async_trait]
pub trait ConversionSurface: Send {
    /// Bring up the converter (open the page, create the session).
    async fn load(&mut self) -> Result<(), OracleError>;

    /// Replace the input box contents with `text`.
    async fn set_input(&mut self, text: &str) -> Result<(), OracleError>;

    /// Press the convert control.
    async fn trigger(&mut self) -> Result<(), OracleError>;

    /// Read the output box contents.
    async fn read_output(&mut self) -> Result<String, OracleError>;

    /// Tear the surface down.
    async fn shutdown(&mut self) {}
}

/// Drives a [`ConversionSurface`] as a [`TransliterationOracle`].
pub struct SurfaceOracle<S> {
    surface: S,
    settle_delay: Duration,
    warmup_delay: Duration,
}

impl<S: ConversionSurface> SurfaceOracle<S> {
    pub fn new(surface: S, settle_delay: Duration, warmup_delay: Duration) -> Self {
        Self {
            surface,
            settle_delay,
            warmup_delay,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }
}

#[async_trait]
impl<S: ConversionSurface> TransliterationOracle for SurfaceOracle<S> {
    async fn open(&mut self) -> Result<(), OracleError> {
        self.surface.load().await?;
        if !self.warmup_delay.is_zero() {
            sleep(self.warmup_delay).await;
        }
        Ok(())
    }

    async fn decode(&mut self, batch: &[String]) -> Result<Vec<String>, OracleError> {
        let block = batch.join("\n");
        debug!("Exchanging {} values ({} bytes)", batch.len(), block.len());

        self.surface.set_input(&block).await?;
        self.surface.trigger().await?;
        if !self.settle_delay.is_zero() {
            sleep(self.settle_delay).await;
        }
        let output = self.surface.read_output().await?;

        let lines = split_output_block(&output);
        if lines.len() != batch.len() {
            warn!(
                "Converter returned {} lines for {} values",
                lines.len(),
                batch.len()
            );
        }
        Ok(lines)
    }

    async fn close(&mut self) {
        self.surface.shutdown().await;
    }
}

/// Split a newline-joined output block into lines, dropping a trailing `\r`
/// from each.
pub fn split_output_block(output: &str) -> Vec<String> {
    output
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}
