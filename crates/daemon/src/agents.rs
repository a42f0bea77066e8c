// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent personas: the system-prompt preamble each `@agent` possesses.
//!
//! Built-in defaults can be extended or overridden by an `agents.toml`
//! file in the state directory:
//!
//! ```toml
//! [agents."@ai-pirate"]
//! prompt = "You are a pirate. Speak accordingly."
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

pub const DEFAULT_AGENT: &str = "@ai-engineer";

#[derive(Debug, Clone, Deserialize)]
pub struct AgentPersona {
    pub prompt: String,
}

#[derive(Debug, Default, Deserialize)]
struct AgentFile {
    #[serde(default)]
    agents: HashMap<String, AgentPersona>,
}

/// Registry of known agents, defaults merged with the optional file.
pub struct AgentRegistry {
    agents: HashMap<String, AgentPersona>,
}

impl AgentRegistry {
    /// Built-in personas only.
    pub fn builtin() -> Self {
        let mut agents = HashMap::new();
        agents.insert(
            "@ai-engineer".to_string(),
            AgentPersona {
                prompt: "You are @ai-engineer, a precise systems engineer living in Port 42. \
                         You help the user build tools. When a conversation converges on a \
                         concrete command, crystallize it."
                    .to_string(),
            },
        );
        agents.insert(
            "@ai-muse".to_string(),
            AgentPersona {
                prompt: "You are @ai-muse, a playful creative spirit living in Port 42. \
                         You explore ideas with the user and crystallize artifacts when \
                         something worth keeping emerges."
                    .to_string(),
            },
        );
        agents.insert(
            "@ai-analyst".to_string(),
            AgentPersona {
                prompt: "You are @ai-analyst, a careful analyst living in Port 42. You dig \
                         into data and logs with the user and crystallize analysis tools."
                    .to_string(),
            },
        );
        Self { agents }
    }

    /// Builtins merged with `<state_dir>/agents.toml`, if present.
    pub fn load(state_dir: &Path) -> Self {
        let mut registry = Self::builtin();
        let path = state_dir.join("agents.toml");
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return registry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read agents.toml");
                return registry;
            }
        };
        match toml::from_str::<AgentFile>(&raw) {
            Ok(file) => {
                info!(count = file.agents.len(), "loaded agent personas from agents.toml");
                registry.agents.extend(file.agents);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "invalid agents.toml"),
        }
        registry
    }

    /// The system prompt for an agent; unknown agents fall back to the
    /// default persona with their name substituted in.
    pub fn system_prompt(&self, agent: &str) -> String {
        if let Some(persona) = self.agents.get(agent) {
            return persona.prompt.clone();
        }
        match self.agents.get(DEFAULT_AGENT) {
            Some(default) => format!("{} (possessed as {agent})", default.prompt),
            None => format!("You are {agent}, an AI living in Port 42."),
        }
    }

    pub fn known(&self, agent: &str) -> bool {
        self.agents.contains_key(agent)
    }
}

#[cfg(test)]
#[path = "agents_tests.rs"]
mod tests;
