//! CLI command implementations
//!
//! `serve` follows a fixed boot sequence: load config, prepare the data
//! directory, open the engine, serve until a shutdown signal, then close the
//! engine and remove the data directory if it was temporary.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use crate::engine::{log_path, Engine, EngineOptions, DEFAULT_COMPACT_MIN_BYTES};
use crate::observability::{log_event, log_event_with_fields, Event, Logger};
use crate::rpc::{Classes, RpcServer, RpcServerConfig};
use crate::store::ClassStore;

use super::args::{Command, ServeArgs};
use super::errors::{CliError, CliResult};
use super::io::{write_error_to, write_to};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory (optional, a temporary directory is used when unset)
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Commit log size that triggers the first compaction (default: 4 MiB)
    #[serde(default = "default_log_compact_min_bytes")]
    pub log_compact_min_bytes: u64,

    /// Bind addresses, CORS and error policy
    #[serde(flatten)]
    pub server: RpcServerConfig,
}

fn default_log_compact_min_bytes() -> u64 {
    DEFAULT_COMPACT_MIN_BYTES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            log_compact_min_bytes: default_log_compact_min_bytes(),
            server: RpcServerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::Config(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load the file named by `--config` (if any) and apply flag overrides.
    pub fn resolve(args: &ServeArgs) -> CliResult<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Some(dir) = &args.data_dir {
            config.data_dir = Some(dir.to_string_lossy().into_owned());
        }
        if let Some(host) = &args.host {
            config.server.host = host.clone();
        }
        if let Some(port) = args.port {
            config.server.port = port;
        }
        if let Some(port) = args.http_port {
            config.server.http_port = Some(port);
        }
        if let Some(policy) = args.error_policy {
            config.server.error_policy = policy;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if let Some(dir) = &self.data_dir {
            if dir.trim().is_empty() {
                return Err(CliError::Config("data_dir must not be empty".to_string()));
            }
        }

        if self.server.host.trim().is_empty() {
            return Err(CliError::Config("host must not be empty".to_string()));
        }

        if self.server.http_port == Some(self.server.port) {
            return Err(CliError::Config(format!(
                "http_port must differ from the gRPC port {}",
                self.server.port
            )));
        }

        if self.log_compact_min_bytes == 0 {
            return Err(CliError::Config(
                "log_compact_min_bytes must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Get data directory as a Path
    pub fn data_path(&self) -> Option<&Path> {
        self.data_dir.as_deref().map(Path::new)
    }

    fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            compact_min_bytes: self.log_compact_min_bytes,
        }
    }
}

/// Where the engine lives for the duration of one `serve`.
enum DataDir {
    Persistent(PathBuf),
    Temporary(TempDir),
}

impl DataDir {
    fn prepare(configured: Option<&Path>) -> CliResult<Self> {
        match configured {
            Some(path) => Ok(DataDir::Persistent(path.to_path_buf())),
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("classkv-")
                    .tempdir()
                    .map_err(|e| CliError::Boot(format!("Failed to create temp data dir: {}", e)))?;
                let shown = dir.path().display().to_string();
                log_event_with_fields(Event::TempDataDirCreated, &[("path", shown.as_str())]);
                Ok(DataDir::Temporary(dir))
            }
        }
    }

    fn path(&self) -> &Path {
        match self {
            DataDir::Persistent(path) => path,
            DataDir::Temporary(dir) => dir.path(),
        }
    }

    /// Remove the directory if it was created for this run.
    fn cleanup(self) {
        if let DataDir::Temporary(dir) = self {
            let shown = dir.path().display().to_string();
            match dir.close() {
                Ok(()) => {
                    log_event_with_fields(Event::TempDataDirRemoved, &[("path", shown.as_str())])
                }
                Err(e) => log_event_with_fields(
                    Event::TempDataDirRemoveFailed,
                    &[("path", shown.as_str()), ("error", e.to_string().as_str())],
                ),
            }
        }
    }
}

/// Run the CLI with given command
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve(args) => serve(&args),
        Command::List { data_dir } => list(&data_dir),
    }
}

/// Boot the engine and serve the record service until interrupted
pub fn serve(args: &ServeArgs) -> CliResult<()> {
    log_event(Event::BootStart);

    let config = Config::resolve(args)?;
    let port = config.server.port.to_string();
    let http_port = config
        .server
        .http_port
        .map(|p| p.to_string())
        .unwrap_or_else(|| "<off>".to_string());
    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("host", config.server.host.as_str()),
            ("port", port.as_str()),
            ("http_port", http_port.as_str()),
            ("error_policy", config.server.error_policy.as_str()),
            ("data_dir", config.data_dir.as_deref().unwrap_or("<temp>")),
        ],
    );

    let data_dir = DataDir::prepare(config.data_path())?;

    let engine = match open_engine(data_dir.path(), config.engine_options()) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            data_dir.cleanup();
            return Err(e);
        }
    };

    let store = ClassStore::new(Arc::clone(&engine));
    let server = RpcServer::new(store, config.server.clone());

    let served = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Boot(format!("Failed to create tokio runtime: {}", e)))
        .and_then(|rt| {
            rt.block_on(server.start(shutdown_signal()))
                .map_err(|e| CliError::Boot(format!("RPC server failed: {}", e)))
        });

    log_event(Event::ShutdownStart);

    match engine.close() {
        Ok(()) => log_event(Event::EngineClosed),
        Err(e) => log_event_with_fields(
            Event::EngineCloseFailed,
            &[("code", e.code().code()), ("error", e.to_string().as_str())],
        ),
    }
    data_dir.cleanup();

    log_event(Event::ShutdownComplete);

    served
}

/// Print all stored records to stdout as a single `Classes` envelope.
///
/// If the scan stops at a bad key or value, the records read before it are
/// still printed, in an envelope with `"status": "error"`, and the command
/// fails.
pub fn list(data_dir: &Path) -> CliResult<()> {
    list_to(data_dir, &mut std::io::stdout())
}

fn list_to<W: Write>(data_dir: &Path, out: &mut W) -> CliResult<()> {
    if !log_path(data_dir).exists() {
        return Err(CliError::NotInitialized(data_dir.to_path_buf()));
    }

    let engine = Arc::new(open_engine(data_dir, EngineOptions::default())?);
    let store = ClassStore::new(Arc::clone(&engine));

    let (records, error) = store.list().into_parts();
    let closed = engine.close();
    let classes = Classes::from(records);

    if let Some(e) = error {
        let err = CliError::Store(format!("Failed to list records: {}", e));
        write_error_to(out, &classes, &err)?;
        return Err(err);
    }
    closed.map_err(|e| CliError::Store(format!("Failed to close engine: {}", e)))?;

    write_to(out, &classes)
}

fn open_engine(data_dir: &Path, options: EngineOptions) -> CliResult<Engine> {
    let shown = data_dir.display().to_string();

    match Engine::open_with(data_dir, options) {
        Ok(engine) => {
            let keys = engine.len().map(|n| n.to_string()).unwrap_or_default();
            let sequence = engine
                .last_sequence()
                .map(|n| n.to_string())
                .unwrap_or_default();
            let log_bytes = engine.log_size().map(|n| n.to_string()).unwrap_or_default();
            log_event_with_fields(
                Event::EngineOpened,
                &[
                    ("data_dir", shown.as_str()),
                    ("keys", keys.as_str()),
                    ("last_sequence", sequence.as_str()),
                    ("log_bytes", log_bytes.as_str()),
                ],
            );
            Ok(engine)
        }
        Err(e) => {
            log_event_with_fields(
                Event::EngineOpenFailed,
                &[
                    ("data_dir", shown.as_str()),
                    ("code", e.code().code()),
                    ("error", e.to_string().as_str()),
                ],
            );
            Err(CliError::Boot(format!(
                "Failed to open engine in {}: {}",
                shown, e
            )))
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            Logger::warn(
                "SIGNAL_HANDLER_FAILED",
                &[("signal", "ctrl_c"), ("error", e.to_string().as_str())],
            );
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                Logger::warn(
                    "SIGNAL_HANDLER_FAILED",
                    &[("signal", "terminate"), ("error", e.to_string().as_str())],
                );
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::ErrorPolicy;
    use crate::store::ClassRecord;

    #[test]
    fn test_config_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.data_dir.is_none());
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 50051);
        assert_eq!(config.server.error_policy, ErrorPolicy::Suppress);
        assert_eq!(config.log_compact_min_bytes, DEFAULT_COMPACT_MIN_BYTES);
    }

    #[test]
    fn test_config_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("classkv.json");
        fs::write(
            &path,
            r#"{"data_dir": "/var/lib/classkv", "port": 6000, "error_policy": "surface"}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.data_path(), Some(Path::new("/var/lib/classkv")));
        assert_eq!(config.server.port, 6000);
        assert_eq!(config.server.error_policy, ErrorPolicy::Surface);
    }

    #[test]
    fn test_config_rejects_bad_policy() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("classkv.json");
        fs::write(&path, r#"{"error_policy": "loud"}"#).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert_eq!(err.code(), "CLASSKV_CLI_CONFIG_ERROR");
    }

    #[test]
    fn test_config_rejects_shared_ports() {
        let args = ServeArgs {
            port: Some(7000),
            http_port: Some(7000),
            ..ServeArgs::default()
        };
        let err = Config::resolve(&args).unwrap_err();
        assert_eq!(err.code(), "CLASSKV_CLI_CONFIG_ERROR");
    }

    #[test]
    fn test_config_rejects_zero_compaction_threshold() {
        let config: Config = serde_json::from_str(r#"{"log_compact_min_bytes": 0}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_empty_data_dir() {
        let config = Config {
            data_dir: Some("  ".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("classkv.json");
        fs::write(&path, r#"{"port": 6000, "host": "127.0.0.1"}"#).unwrap();

        let args = ServeArgs {
            config: Some(path),
            port: Some(7000),
            http_port: Some(7080),
            error_policy: Some(ErrorPolicy::Surface),
            ..ServeArgs::default()
        };
        let config = Config::resolve(&args).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.http_port, Some(7080));
        assert_eq!(config.server.error_policy, ErrorPolicy::Surface);
    }

    #[test]
    fn test_temp_data_dir_removed_on_cleanup() {
        let data_dir = DataDir::prepare(None).unwrap();
        let path = data_dir.path().to_path_buf();
        assert!(path.exists());

        data_dir.cleanup();
        assert!(!path.exists());
    }

    #[test]
    fn test_persistent_data_dir_kept_on_cleanup() {
        let temp = TempDir::new().unwrap();
        let data_dir = DataDir::prepare(Some(temp.path())).unwrap();
        data_dir.cleanup();
        assert!(temp.path().exists());
    }

    #[test]
    fn test_list_uninitialized_dir() {
        let temp = TempDir::new().unwrap();
        let err = list(temp.path()).unwrap_err();
        assert_eq!(err.code(), "CLASSKV_CLI_NOT_INITIALIZED");
    }

    #[test]
    fn test_list_reads_persisted_records() {
        let temp = TempDir::new().unwrap();
        {
            let engine = Arc::new(Engine::open(temp.path()).unwrap());
            let store = ClassStore::new(Arc::clone(&engine));
            assert!(store
                .create(ClassRecord::new("cs101", "Intro to CS", "Fall2023"))
                .is_ok());
            engine.close().unwrap();
        }

        let mut out = Vec::new();
        list_to(temp.path(), &mut out).unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["data"]["classes"][0]["id"], "cs101");
        assert_eq!(parsed["data"]["classes"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_list_prints_partial_records_before_error() {
        let temp = TempDir::new().unwrap();
        {
            let engine = Arc::new(Engine::open(temp.path()).unwrap());
            let store = ClassStore::new(Arc::clone(&engine));
            assert!(store
                .create(ClassRecord::new("a", "Algebra", "Spring2024"))
                .is_ok());
            engine
                .update(|txn| -> crate::engine::EngineResult<()> { txn.set(b"b", b"stray") })
                .unwrap();
            engine.close().unwrap();
        }

        let mut out = Vec::new();
        let err = list_to(temp.path(), &mut out).unwrap_err();
        assert_eq!(err.code(), "CLASSKV_CLI_STORE_ERROR");

        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["status"], "error");
        assert_eq!(parsed["data"]["classes"][0]["name"], "Algebra");
        assert_eq!(parsed["error"]["code"], "CLASSKV_CLI_STORE_ERROR");
    }
}
