//! Notification and e-mail operations, delegated to the notifier.

use super::{parse_options, EngineServices, OperationHandler};
use crate::error::EngineError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use trellis_core::{ExecutionContext, OperationType};

#[derive(Debug, Deserialize)]
struct NotificationOptions {
    channel: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    message: String,
}

/// `notification`: deliver a message to a channel
pub struct NotificationHandler;

#[async_trait]
impl OperationHandler for NotificationHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::Notification
    }

    async fn execute(
        &self,
        options: &Value,
        _ctx: &ExecutionContext,
        services: &EngineServices,
    ) -> Result<Value, EngineError> {
        let opts: NotificationOptions = parse_options(options)?;
        services
            .notifier
            .notify(&opts.channel, &opts.title, &opts.message)
            .await
    }
}

#[derive(Debug, Deserialize)]
struct SendEmailOptions {
    to: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    body: String,
}

/// `send_email`: deliver an e-mail
pub struct SendEmailHandler;

#[async_trait]
impl OperationHandler for SendEmailHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::SendEmail
    }

    async fn execute(
        &self,
        options: &Value,
        _ctx: &ExecutionContext,
        services: &EngineServices,
    ) -> Result<Value, EngineError> {
        let opts: SendEmailOptions = parse_options(options)?;
        services
            .notifier
            .send_email(&opts.to, &opts.subject, &opts.body)
            .await
    }
}
