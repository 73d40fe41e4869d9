//! # Constants
//!
//! Shared constants used throughout the reconciler.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default control-plane region
/// Global Accelerator is a global service whose API is only served from us-west-2
pub const DEFAULT_REGION: &str = "us-west-2";

/// Default delay between stabilization polls (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

/// Default maximum time an operation may spend stabilizing (seconds)
/// Four hours, matching the slowest observed accelerator deployments
pub const DEFAULT_MAX_STABILIZATION_SECS: u64 = 4 * 60 * 60;

/// Default traffic dial applied to endpoint groups when none is requested
pub const DEFAULT_TRAFFIC_DIAL_PERCENTAGE: f32 = 100.0;

/// Tag keys with this prefix are reserved by AWS
pub const RESERVED_TAG_PREFIX: &str = "aws:";

/// Allowed characters for tag keys and values
pub const TAG_PATTERN: &str = r"^([\p{L}\p{Z}\p{N}_.:/=+\-@]*)$";

/// Service segment of every Global Accelerator ARN
pub const SERVICE_NAME: &str = "globalaccelerator";

/// Default tracing filter when neither `RUST_LOG` nor `LOG_LEVEL` is set
pub const DEFAULT_LOG_FILTER: &str = "globalaccelerator_reconciler=info";

/// Namespace for name-based idempotency tokens
pub const IDEMPOTENCY_NAMESPACE: uuid::Uuid =
    uuid::Uuid::from_u128(0x6f1c_2a4e_8b3d_5e7f_9a0b_1c2d_3e4f_5a6b);
