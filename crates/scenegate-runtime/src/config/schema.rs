use std::collections::HashMap;

use serde::Deserialize;

use scenegate_core::error::{Result, SceneGateError};
use scenegate_core::message::{MessageIdResolver, MessageIdRule};
use scenegate_core::protocol::FrameCodec;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub runtime: RuntimeSection,

    #[serde(default)]
    pub protocol: ProtocolSection,

    /// Seeds the name-table id strategy.
    #[serde(default)]
    pub message_ids: Vec<MessageIdEntry>,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(SceneGateError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        self.runtime.validate()?;
        self.protocol.validate()?;

        let mut seen = HashMap::new();
        for entry in &self.message_ids {
            if entry.name.is_empty() {
                return Err(SceneGateError::Config("message_ids entry with empty name".into()));
            }
            if entry.id == 0 {
                return Err(SceneGateError::Config(format!(
                    "message id 0 is reserved (message {})",
                    entry.name
                )));
            }
            if let Some(prev) = seen.insert(entry.id, &entry.name) {
                return Err(SceneGateError::Config(format!(
                    "message id {} mapped to both {prev} and {}",
                    entry.id, entry.name
                )));
            }
        }
        Ok(())
    }

    /// Build the id resolver for the configured rule.
    pub fn resolver(&self) -> MessageIdResolver {
        let table = self
            .message_ids
            .iter()
            .map(|e| (e.name.clone(), e.id))
            .collect();
        MessageIdResolver::new(self.runtime.message_id_rule.into(), table)
    }

    /// Build the frame codec for the configured limits.
    pub fn codec(&self) -> FrameCodec {
        FrameCodec::new(
            self.protocol.max_payload_bytes,
            self.protocol.split_threshold_bytes,
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeSection {
    /// Fixed size of the scene-loop pool, set once at startup.
    #[serde(default = "default_scene_loops")]
    pub scene_loops: usize,

    /// Advisory wall-time budget for one handler invocation.
    #[serde(default = "default_slow_handler_budget_ms")]
    pub slow_handler_budget_ms: u64,

    #[serde(default = "default_message_id_rule")]
    pub message_id_rule: IdRule,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            scene_loops: default_scene_loops(),
            slow_handler_budget_ms: default_slow_handler_budget_ms(),
            message_id_rule: default_message_id_rule(),
        }
    }
}

impl RuntimeSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=256).contains(&self.scene_loops) {
            return Err(SceneGateError::Config(
                "runtime.scene_loops must be between 1 and 256".into(),
            ));
        }
        if !(1..=10_000).contains(&self.slow_handler_budget_ms) {
            return Err(SceneGateError::Config(
                "runtime.slow_handler_budget_ms must be between 1 and 10000".into(),
            ));
        }
        Ok(())
    }
}

/// Serialized form of the message-id mapping rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdRule {
    FirstField,
    NameTable,
}

impl From<IdRule> for MessageIdRule {
    fn from(rule: IdRule) -> Self {
        match rule {
            IdRule::FirstField => MessageIdRule::FirstField,
            IdRule::NameTable => MessageIdRule::NameTable,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolSection {
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    #[serde(default = "default_split_threshold_bytes")]
    pub split_threshold_bytes: usize,
}

impl Default for ProtocolSection {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
            split_threshold_bytes: default_split_threshold_bytes(),
        }
    }
}

impl ProtocolSection {
    pub fn validate(&self) -> Result<()> {
        if !(16..=10_000_000).contains(&self.max_payload_bytes) {
            return Err(SceneGateError::Config(
                "protocol.max_payload_bytes must be between 16 and 10000000".into(),
            ));
        }
        if self.split_threshold_bytes >= self.max_payload_bytes {
            return Err(SceneGateError::Config(
                "protocol.split_threshold_bytes must be smaller than max_payload_bytes".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageIdEntry {
    pub name: String,
    pub id: i32,
}

fn default_scene_loops() -> usize {
    4
}
fn default_slow_handler_budget_ms() -> u64 {
    20
}
fn default_message_id_rule() -> IdRule {
    IdRule::NameTable
}
fn default_max_payload_bytes() -> usize {
    scenegate_core::protocol::frame::DEFAULT_MAX_PAYLOAD
}
fn default_split_threshold_bytes() -> usize {
    scenegate_core::protocol::frame::DEFAULT_SPLIT_THRESHOLD
}
