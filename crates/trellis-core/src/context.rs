use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Ephemeral state for a single flow run.
///
/// Holds the trigger payload, the run input, the output of every
/// completed node keyed by its operation key, and the output of the most
/// recently completed node. Mutated append-only as nodes execute and
/// discarded at run end; never shared across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Payload that started the flow
    pub trigger: Value,

    /// Input supplied alongside the trigger
    pub input: Value,

    /// Outputs of completed nodes, keyed by operation key
    pub outputs: HashMap<String, Value>,

    /// Output of the most recently completed node
    pub last: Value,
}

impl ExecutionContext {
    /// Create a context with the given trigger payload
    pub fn new(trigger: Value) -> Self {
        Self {
            trigger,
            input: Value::Null,
            outputs: HashMap::new(),
            last: Value::Null,
        }
    }

    /// Create a context with a trigger payload and run input
    pub fn with_input(trigger: Value, input: Value) -> Self {
        Self {
            trigger,
            input,
            outputs: HashMap::new(),
            last: Value::Null,
        }
    }

    /// Record a completed node's output under its operation key and as
    /// the new `last` value
    pub fn record_output(&mut self, operation_key: &str, output: Value) {
        self.outputs
            .insert(operation_key.to_string(), output.clone());
        self.last = output;
    }

    /// Resolve one of the context roots: `$last`, `$input`, `$trigger`,
    /// or a named operation key
    pub fn root(&self, name: &str) -> Option<&Value> {
        match name {
            "$last" => Some(&self.last),
            "$input" => Some(&self.input),
            "$trigger" => Some(&self.trigger),
            key => self.outputs.get(key),
        }
    }
}
