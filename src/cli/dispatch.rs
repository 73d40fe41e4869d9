//! Runs one CLI command against the driver for the requested resource kind.

use super::{Commands, ResourceKindArg, StepArgs};
use anyhow::{Context, Result};
use globalaccelerator_reconciler::{
    AcceleratorHandler, AttachmentHandler, ContinuationToken, Driver, EndpointGroupHandler,
    GlobalAcceleratorApi, HandlerRequest, ListenerHandler, OperationKind, ProgressEvent,
    ReconcileError, ResourceHandler, RetryBudget,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Exit code for a `FAILED` progress event
const FAILED_EXIT_CODE: u8 = 2;

/// Consecutive transient faults tolerated by `--wait` before giving up
const MAX_TRANSIENT_RETRIES: u32 = 3;

/// Run `command`, printing its result as JSON on stdout
pub async fn run(
    command: Commands,
    api: Arc<dyn GlobalAcceleratorApi>,
    budget: RetryBudget,
) -> Result<ExitCode> {
    match command {
        Commands::Create(args) => step(OperationKind::Create, &args, api, budget).await,
        Commands::Update(args) => step(OperationKind::Update, &args, api, budget).await,
        Commands::Delete(args) => step(OperationKind::Delete, &args, api, budget).await,
        Commands::Read { kind, model } => match kind {
            ResourceKindArg::Accelerator => {
                read(&Driver::new(AcceleratorHandler::new(api), budget), &model).await
            }
            ResourceKindArg::Listener => {
                read(&Driver::new(ListenerHandler::new(api), budget), &model).await
            }
            ResourceKindArg::EndpointGroup => {
                read(&Driver::new(EndpointGroupHandler::new(api), budget), &model).await
            }
            ResourceKindArg::Attachment => {
                read(&Driver::new(AttachmentHandler::new(api), budget), &model).await
            }
        },
        Commands::List {
            kind,
            model,
            next_token,
        } => {
            let model = model.as_deref();
            let next = next_token.as_deref();
            match kind {
                ResourceKindArg::Accelerator => {
                    list(&Driver::new(AcceleratorHandler::new(api), budget), model, next).await
                }
                ResourceKindArg::Listener => {
                    list(&Driver::new(ListenerHandler::new(api), budget), model, next).await
                }
                ResourceKindArg::EndpointGroup => {
                    list(&Driver::new(EndpointGroupHandler::new(api), budget), model, next).await
                }
                ResourceKindArg::Attachment => {
                    list(&Driver::new(AttachmentHandler::new(api), budget), model, next).await
                }
            }
        }
    }
}

async fn step(
    operation: OperationKind,
    args: &StepArgs,
    api: Arc<dyn GlobalAcceleratorApi>,
    budget: RetryBudget,
) -> Result<ExitCode> {
    match args.kind {
        ResourceKindArg::Accelerator => {
            run_step(&Driver::new(AcceleratorHandler::new(api), budget), operation, args).await
        }
        ResourceKindArg::Listener => {
            run_step(&Driver::new(ListenerHandler::new(api), budget), operation, args).await
        }
        ResourceKindArg::EndpointGroup => {
            run_step(&Driver::new(EndpointGroupHandler::new(api), budget), operation, args).await
        }
        ResourceKindArg::Attachment => {
            run_step(&Driver::new(AttachmentHandler::new(api), budget), operation, args).await
        }
    }
}

/// Parse JSON given inline, in a file, or on stdin (`-`)
fn load_json<T: DeserializeOwned>(source: &str, what: &str) -> Result<T> {
    let text = if source == "-" {
        io::read_to_string(io::stdin()).context("Failed to read stdin")?
    } else if source.trim_start().starts_with('{') {
        source.to_string()
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read {what} file '{source}'"))?
    };
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {what} JSON"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

fn exit_code<M>(event: &ProgressEvent<M>) -> ExitCode {
    match event {
        ProgressEvent::Failed { .. } => ExitCode::from(FAILED_EXIT_CODE),
        ProgressEvent::InProgress { .. } | ProgressEvent::Success { .. } => ExitCode::SUCCESS,
    }
}

async fn run_step<H: ResourceHandler>(
    driver: &Driver<H>,
    operation: OperationKind,
    args: &StepArgs,
) -> Result<ExitCode> {
    let mut request = HandlerRequest::new(load_json::<H::Model>(&args.model, "model")?);
    if let Some(previous) = &args.previous {
        request = request.with_previous(load_json(previous, "previous model")?);
    }
    if let Some(token) = &args.client_request_token {
        request = request.with_client_request_token(token.clone());
    }
    if let Some(id) = &args.logical_id {
        request = request.with_logical_resource_identifier(id.clone());
    }
    let mut token: Option<ContinuationToken> = args
        .token
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .context("Failed to parse continuation token JSON")?;

    let mut transient_faults = 0;
    loop {
        let event = match driver.reconcile(operation, &request, token).await {
            Ok(event) => {
                transient_faults = 0;
                event
            }
            Err(e) if should_retry(&e, args.wait, transient_faults) => {
                transient_faults += 1;
                let delay = driver.budget().poll_delay_secs().max(1) * u64::from(transient_faults);
                warn!(
                    attempt = transient_faults,
                    delay_seconds = delay,
                    "Transient fault, re-invoking the same step: {}", e
                );
                tokio::time::sleep(Duration::from_secs(delay)).await;
                continue;
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("{} {operation} failed", driver.handler().kind())));
            }
        };

        match event {
            ProgressEvent::InProgress {
                resource_model,
                continuation_token,
                delay_seconds,
            } if args.wait => {
                if args.verbose {
                    eprintln!(
                        "{}",
                        serde_json::to_string(&ProgressEvent::in_progress(
                            &resource_model,
                            continuation_token,
                            delay_seconds
                        ))
                        .context("Failed to serialize progress event")?
                    );
                }
                info!(
                    retries_remaining = continuation_token.retries_remaining,
                    delay_seconds, "Waiting before next step"
                );
                tokio::time::sleep(Duration::from_secs(delay_seconds)).await;
                request = request.with_desired(resource_model);
                token = Some(continuation_token);
            }
            event => {
                print_json(&event)?;
                return Ok(exit_code(&event));
            }
        }
    }
}

/// Whether `--wait` should re-invoke the same step after `err`
///
/// Re-invoking with an unchanged token is safe; the driver repeats the step.
fn should_retry(err: &ReconcileError, wait: bool, transient_faults: u32) -> bool {
    wait && transient_faults < MAX_TRANSIENT_RETRIES && err.is_retryable()
}

async fn read<H: ResourceHandler>(driver: &Driver<H>, model: &str) -> Result<ExitCode> {
    let request = HandlerRequest::new(load_json::<H::Model>(model, "model")?);
    let event = driver
        .read(&request)
        .await
        .with_context(|| format!("Failed to read {}", driver.handler().kind()))?;
    print_json(&event)?;
    Ok(exit_code(&event))
}

async fn list<H>(
    driver: &Driver<H>,
    model: Option<&str>,
    next_token: Option<&str>,
) -> Result<ExitCode>
where
    H: ResourceHandler,
    H::Model: Default,
{
    let model = match model {
        Some(source) => load_json::<H::Model>(source, "model")?,
        None => H::Model::default(),
    };
    let page = driver
        .list(&HandlerRequest::new(model), next_token)
        .await
        .with_context(|| format!("Failed to list {}", driver.handler().kind()))?;
    print_json(&page)?;
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use globalaccelerator_reconciler::provider::{ApiError, ResourceKind};

    fn throttled() -> ReconcileError {
        ReconcileError::from(ApiError::Throttled {
            message: "Rate exceeded".to_string(),
        })
    }

    #[test]
    fn test_transient_faults_retried_only_when_waiting() {
        assert!(should_retry(&throttled(), true, 0));
        assert!(!should_retry(&throttled(), false, 0));
    }

    #[test]
    fn test_transient_retries_are_bounded() {
        assert!(should_retry(&throttled(), true, MAX_TRANSIENT_RETRIES - 1));
        assert!(!should_retry(&throttled(), true, MAX_TRANSIENT_RETRIES));
    }

    #[test]
    fn test_timeout_and_not_found_are_not_retried() {
        assert!(!should_retry(
            &ReconcileError::timeout(ResourceKind::Accelerator),
            true,
            0
        ));
        assert!(!should_retry(
            &ReconcileError::from(ApiError::not_found(ResourceKind::Listener, "arn:x")),
            true,
            0
        ));
    }

    #[test]
    fn test_inline_json_is_parsed_without_touching_the_filesystem() {
        let token: ContinuationToken =
            load_json(r#"{"retriesRemaining":3,"pendingMutation":true}"#, "token")
                .expect("inline JSON");
        assert_eq!(token, ContinuationToken::new(3, true));
    }
}
