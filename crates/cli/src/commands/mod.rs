pub mod config;
pub mod migrate;
pub mod report;
pub mod seed;

use std::future::Future;

use pipecast_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

/// Machine-readable failure taxonomy shared by every command. The class
/// string and exit code are part of the CLI contract; scripts dispatch on
/// them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    ConfigValidation,
    InvalidArguments,
    RuntimeInit,
    DbConnectivity,
    Migration,
    SeedExecution,
    ReportQuery,
    Serialization,
}

impl FailureKind {
    pub fn class(self) -> &'static str {
        match self {
            Self::ConfigValidation => "config_validation",
            Self::InvalidArguments => "invalid_arguments",
            Self::RuntimeInit => "runtime_init",
            Self::DbConnectivity => "db_connectivity",
            Self::Migration => "migration",
            Self::SeedExecution => "seed_execution",
            Self::ReportQuery => "report_query",
            Self::Serialization => "serialization",
        }
    }

    pub fn exit_code(self) -> u8 {
        match self {
            Self::ConfigValidation | Self::InvalidArguments => 2,
            Self::RuntimeInit => 3,
            Self::DbConnectivity => 4,
            Self::Migration | Self::SeedExecution | Self::ReportQuery | Self::Serialization => 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: &'static str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

impl CommandResult {
    pub fn success(command: &'static str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command,
            status: "ok",
            error_class: None,
            message: Some(message.into()),
            report: None,
            data: None,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    /// Success envelope for the report command: the rows ride along as JSON
    /// under `data` instead of a prose message.
    pub fn report(command: &'static str, report: &'static str, data: serde_json::Value) -> Self {
        let payload = CommandOutcome {
            command,
            status: "ok",
            error_class: None,
            message: None,
            report: Some(report),
            data: Some(data),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(command: &'static str, kind: FailureKind, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command,
            status: "error",
            error_class: Some(kind.class()),
            message: Some(message.into()),
            report: None,
            data: None,
        };
        Self { exit_code: kind.exit_code(), output: serialize_payload(payload) }
    }
}

/// Loads the layered app config, mapping a failure to the command's
/// config_validation outcome.
pub(crate) fn load_config(command: &'static str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            FailureKind::ConfigValidation,
            format!("configuration issue: {error}"),
        )
    })
}

/// Drives one command body on a throwaway current-thread runtime. The future
/// is lazy, so building it before the runtime exists is fine.
pub(crate) fn block_on<T>(
    command: &'static str,
    future: impl Future<Output = Result<T, (FailureKind, String)>>,
) -> Result<T, CommandResult> {
    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandResult::failure(
                command,
                FailureKind::RuntimeInit,
                format!("failed to initialize async runtime: {error}"),
            )
        })?;

    runtime
        .block_on(future)
        .map_err(|(kind, message)| CommandResult::failure(command, kind, message))
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
