//! HTTP form adapter for the converter page.
//!
//! The page carries two `<textarea>` boxes: input first, output second.
//! Loading the page is a GET; pressing convert is a form POST of the input
//! text; reading the result scrapes the output box out of the response.
//! When the response has a single textarea (the converter rewrote its own
//! input box in place) that one is read instead.

use super::surface::ConversionSurface;
use crate::config::PipelineConfig;
use crate::error::{OracleError, VoterListError};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info};

/// A converter reached through plain HTTP form submission.
pub struct HttpFormSurface {
    client: reqwest::Client,
    url: String,
    input_field: String,
    timeout_secs: u64,
    pending_input: Option<String>,
    last_page: Option<String>,
}

impl HttpFormSurface {
    /// Create a surface for the converter at `url`.
    ///
    /// No request is made until [`ConversionSurface::load`].
    pub fn new(
        url: impl Into<String>,
        input_field: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, VoterListError> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| VoterListError::OracleSetupFailed {
                url: url.clone(),
                detail: e.to_string(),
            })?;

        Ok(Self {
            client,
            url,
            input_field: input_field.into(),
            timeout_secs,
            pending_input: None,
            last_page: None,
        })
    }

    /// Create a surface from the converter settings in `config`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, VoterListError> {
        Self::new(
            config.converter_url.clone(),
            config.input_field.clone(),
            config.request_timeout_secs,
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn map_send_error(&self, e: reqwest::Error) -> OracleError {
        if e.is_timeout() {
            OracleError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            OracleError::Unreachable {
                detail: e.to_string(),
            }
        }
    }

    async fn read_page(&self, response: reqwest::Response) -> Result<String, OracleError> {
        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::HttpStatus {
                status: status.as_u16(),
            });
        }
        response
            .text()
            .await
            .map_err(|e| OracleError::MalformedResponse {
                detail: e.to_string(),
            })
    }
}

#[async_trait]
impl ConversionSurface for HttpFormSurface {
    async fn load(&mut self) -> Result<(), OracleError> {
        info!("Opening converter: {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let page = self.read_page(response).await?;

        if textareas(&page)?.is_empty() {
            return Err(OracleError::SurfaceMissing {
                element: "input textarea".into(),
            });
        }
        debug!("Converter page loaded ({} bytes)", page.len());
        Ok(())
    }

    async fn set_input(&mut self, text: &str) -> Result<(), OracleError> {
        self.pending_input = Some(text.to_string());
        self.last_page = None;
        Ok(())
    }

    async fn trigger(&mut self) -> Result<(), OracleError> {
        let text = self
            .pending_input
            .take()
            .ok_or_else(|| OracleError::SurfaceMissing {
                element: "input text".into(),
            })?;

        let response = self
            .client
            .post(&self.url)
            .form(&[(self.input_field.as_str(), text.as_str())])
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        self.last_page = Some(self.read_page(response).await?);
        Ok(())
    }

    async fn read_output(&mut self) -> Result<String, OracleError> {
        let page = self
            .last_page
            .take()
            .ok_or_else(|| OracleError::SurfaceMissing {
                element: "converted page".into(),
            })?;

        let boxes = textareas(&page)?;
        match boxes.len() {
            0 => Err(OracleError::MalformedResponse {
                detail: "no textarea in converter response".into(),
            }),
            1 => Ok(boxes[0].clone()),
            _ => Ok(boxes[1].clone()),
        }
    }

    async fn shutdown(&mut self) {
        self.pending_input = None;
        self.last_page = None;
        debug!("Converter session closed");
    }
}

/// Contents of every `<textarea>` in `html`, in document order.
///
/// Entities are decoded and the newline right after the opening tag is
/// dropped by the parser, as in browsers. Commented-out markup is not
/// an element and never counts as a box.
fn textareas(html: &str) -> Result<Vec<String>, OracleError> {
    let selector =
        Selector::parse("textarea").map_err(|e| OracleError::MalformedResponse {
            detail: format!("textarea selector: {e:?}"),
        })?;
    let document = Html::parse_document(html);
    Ok(document
        .select(&selector)
        .map(|el| el.text().collect::<String>())
        .collect())
}
