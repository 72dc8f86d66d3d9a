//! Sandboxed execution of user-authored code steps.
//!
//! Scripts run on a blocking thread inside a fresh, resource-limited
//! rhai engine with only three data bindings (`last`, `input`,
//! `trigger`) and an audited set of built-in utilities. External
//! packages resolve against an explicit allow-list; declaring an unknown
//! package fails before the script runs. A deadline-checking progress
//! callback terminates overrunning scripts, and an outer timer acts as a
//! backstop, so a timeout aborts only the offending node.

use crate::error::EngineError;
use rhai::{Dynamic, Engine, EvalAltResult, Scope};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;
use trellis_core::ExecutionContext;

/// Default time box for a code step
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

// Slack granted to the blocking thread after the engine deadline before
// the outer timer fires
const TIMEOUT_GRACE: Duration = Duration::from_millis(500);

type PackageBuilder = Arc<dyn Fn(&mut Engine) + Send + Sync>;

/// Explicit allow-list of loadable script packages. Each entry installs
/// its functions into the engine on first use; anything not listed here
/// cannot be declared by a script.
pub struct PackageRegistry {
    builders: HashMap<String, PackageBuilder>,
}

impl PackageRegistry {
    /// Registry with the standard packages (`text`, `money`)
    pub fn standard() -> Self {
        let mut registry = Self {
            builders: HashMap::new(),
        };
        registry.register("text", |engine| {
            engine.register_fn("slugify", |s: &str| {
                s.to_ascii_lowercase()
                    .split(|c: char| !c.is_ascii_alphanumeric())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join("-")
            });
            engine.register_fn("truncate_chars", |s: &str, n: i64| {
                s.chars().take(n.max(0) as usize).collect::<String>()
            });
        });
        registry.register("money", |engine| {
            engine.register_fn("format_amount", |cents: i64, currency: &str| {
                format!("{}.{:02} {}", cents / 100, (cents % 100).abs(), currency)
            });
        });
        registry
    }

    /// Empty registry; nothing may be declared
    pub fn empty() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Allow a package by name
    pub fn register(
        &mut self,
        name: &str,
        builder: impl Fn(&mut Engine) + Send + Sync + 'static,
    ) {
        self.builders.insert(name.to_string(), Arc::new(builder));
    }

    /// Error unless every declared package is allowed
    pub fn check(&self, packages: &[String]) -> Result<(), EngineError> {
        for package in packages {
            if !self.builders.contains_key(package) {
                return Err(EngineError::PackageNotAllowed(package.clone()));
            }
        }
        Ok(())
    }

    fn install(&self, engine: &mut Engine, packages: &[String]) {
        for package in packages {
            if let Some(builder) = self.builders.get(package) {
                builder(engine);
            }
        }
    }
}

/// Result of a sandboxed code step
#[derive(Debug, Clone, PartialEq)]
pub struct CodeOutcome {
    /// The script's return value
    pub value: Value,
    /// Captured `log(...)` output, in call order
    pub logs: Vec<String>,
}

/// Executes code steps with a hard time box
pub struct CodeRunner {
    registry: Arc<PackageRegistry>,
    default_timeout: Duration,
}

impl CodeRunner {
    /// Runner over the standard package registry
    pub fn new() -> Self {
        Self {
            registry: Arc::new(PackageRegistry::standard()),
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Runner with an explicit registry and default timeout
    pub fn with_registry(registry: Arc<PackageRegistry>, default_timeout: Duration) -> Self {
        Self {
            registry,
            default_timeout,
        }
    }

    /// Execute a script with the context's `last`/`input`/`trigger`
    /// bound, returning its value and captured logs.
    ///
    /// `EngineError::StepTimeout` means the time box was exceeded;
    /// `EngineError::ScriptError` means the script itself raised.
    pub async fn execute(
        &self,
        code: &str,
        packages: &[String],
        ctx: &ExecutionContext,
        timeout: Option<Duration>,
    ) -> Result<CodeOutcome, EngineError> {
        self.registry.check(packages)?;

        let timeout = timeout.unwrap_or(self.default_timeout);
        let timeout_ms = timeout.as_millis() as u64;
        let code = code.to_string();
        let packages = packages.to_vec();
        let registry = Arc::clone(&self.registry);
        let last = ctx.last.clone();
        let input = ctx.input.clone();
        let trigger = ctx.trigger.clone();

        let handle = tokio::task::spawn_blocking(move || {
            run_script(
                &code, &packages, &registry, last, input, trigger, timeout, timeout_ms,
            )
        });

        match tokio::time::timeout(timeout + TIMEOUT_GRACE, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(EngineError::ScriptError(join_err.to_string())),
            Err(_) => Err(EngineError::StepTimeout { timeout_ms }),
        }
    }
}

impl Default for CodeRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::too_many_arguments)]
fn run_script(
    code: &str,
    packages: &[String],
    registry: &PackageRegistry,
    last: Value,
    input: Value,
    trigger: Value,
    timeout: Duration,
    timeout_ms: u64,
) -> Result<CodeOutcome, EngineError> {
    // The engine is not Sync; build a fresh one per evaluation
    let mut engine = Engine::new();
    engine.set_max_operations(100_000_000);
    engine.set_max_call_levels(16);
    engine.set_max_expr_depths(64, 32);
    engine.set_max_string_size(65_536);
    engine.set_max_array_size(4_096);
    engine.set_max_map_size(1_024);

    let deadline = Instant::now() + timeout;
    engine.on_progress(move |ops| {
        // Check the clock every few hundred operations, not on each one
        if ops % 256 == 0 && Instant::now() >= deadline {
            Some(Dynamic::UNIT)
        } else {
            None
        }
    });

    let logs: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    register_builtins(&mut engine, Arc::clone(&logs));
    registry.install(&mut engine, packages);

    let mut scope = Scope::new();
    scope.push_dynamic("last", to_dynamic_or_unit(&last));
    scope.push_dynamic("input", to_dynamic_or_unit(&input));
    scope.push_dynamic("trigger", to_dynamic_or_unit(&trigger));

    match engine.eval_with_scope::<Dynamic>(&mut scope, code) {
        Ok(result) => {
            let value = rhai::serde::from_dynamic(&result)
                .unwrap_or_else(|_| Value::String(result.to_string()));
            let logs = logs.lock().map(|l| l.clone()).unwrap_or_default();
            debug!(log_lines = logs.len(), "Code step completed");
            Ok(CodeOutcome { value, logs })
        }
        Err(err) => {
            if matches!(*err, EvalAltResult::ErrorTerminated(..)) {
                Err(EngineError::StepTimeout { timeout_ms })
            } else {
                Err(EngineError::ScriptError(err.to_string()))
            }
        }
    }
}

fn to_dynamic_or_unit(value: &Value) -> Dynamic {
    rhai::serde::to_dynamic(value).unwrap_or(Dynamic::UNIT)
}

/// The fixed built-in surface every script sees: logging, ids, time,
/// hashing, validation, and a fetch-like HTTP client. No filesystem or
/// process access exists beyond these.
fn register_builtins(engine: &mut Engine, logs: Arc<Mutex<Vec<String>>>) {
    {
        let logs = Arc::clone(&logs);
        engine.register_fn("log", move |message: &str| {
            if let Ok(mut logs) = logs.lock() {
                logs.push(message.to_string());
            }
        });
    }
    engine.register_fn("log", move |value: Dynamic| {
        if let Ok(mut logs) = logs.lock() {
            logs.push(value.to_string());
        }
    });

    engine.register_fn("uuid", || uuid::Uuid::new_v4().to_string());

    engine.register_fn("now_iso", || chrono::Utc::now().to_rfc3339());
    engine.register_fn("timestamp", || chrono::Utc::now().timestamp());

    engine.register_fn("sha256_hex", |input: &str| {
        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        format!("{:x}", hasher.finalize())
    });

    engine.register_fn("is_email", |input: &str| {
        let mut parts = input.splitn(2, '@');
        let local = parts.next().unwrap_or("");
        let domain = parts.next().unwrap_or("");
        !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
    });

    engine.register_fn(
        "fetch",
        |url: &str| -> Result<String, Box<EvalAltResult>> {
            blocking_fetch(url).map_err(|e| e.to_string().into())
        },
    );
    engine.register_fn(
        "fetch_json",
        |url: &str| -> Result<Dynamic, Box<EvalAltResult>> {
            let body = blocking_fetch(url)
                .map_err(|e| Box::<EvalAltResult>::from(e.to_string()))?;
            let value: Value = serde_json::from_str(&body)
                .map_err(|e| Box::<EvalAltResult>::from(e.to_string()))?;
            rhai::serde::to_dynamic(&value).map_err(|e| e.to_string().into())
        },
    );
}

// Runs on the sandbox's blocking thread, never on the async runtime
fn blocking_fetch(url: &str) -> Result<String, reqwest::Error> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    client.get(url).send()?.text()
}
