// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outbound templated email via the notification service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Notification request failed: {0}")]
    Request(String),

    #[error("Notification attachment could not be read: {0}")]
    Attachment(String),
}

/// A base64 encoded file attached to an email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailAttachment {
    pub name: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub subject: String,
    pub receiver: String,
    pub sender: String,
    pub template: String,
    pub template_kwargs: Map<String, Value>,
    pub attachments: Vec<EmailAttachment>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifierError>;
}

/// Wire payload of `POST /v1/email`.
#[derive(Debug, Serialize)]
struct EmailPayload<'a> {
    subject: &'a str,
    sender: &'a str,
    receiver: [&'a str; 1],
    msg_type: &'static str,
    template: &'a str,
    template_kwargs: &'a Map<String, Value>,
    attachments: &'a [EmailAttachment],
}

impl<'a> From<&'a EmailMessage> for EmailPayload<'a> {
    fn from(message: &'a EmailMessage) -> Self {
        Self {
            subject: &message.subject,
            sender: &message.sender,
            receiver: [&message.receiver],
            msg_type: "html",
            template: &message.template,
            template_kwargs: &message.template_kwargs,
            attachments: &message.attachments,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationClient {
    endpoint: Url,
    http: Client,
}

impl NotificationClient {
    pub fn new(service_url: &Url, timeout: Duration) -> Result<Self, NotifierError> {
        let mut endpoint = service_url.clone();
        endpoint
            .path_segments_mut()
            .map_err(|_| NotifierError::Request("service URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["v1", "email"]);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifierError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { endpoint, http })
    }
}

#[async_trait]
impl Notifier for NotificationClient {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifierError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&EmailPayload::from(message))
            .send()
            .await
            .map_err(|e| NotifierError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifierError::Request(format!(
                "notification service returned {status}: {body}"
            )));
        }

        info!(
            receiver = %message.receiver,
            template = %message.template,
            "Email dispatched"
        );
        Ok(())
    }
}
