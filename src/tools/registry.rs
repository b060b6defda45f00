// ABOUTME: Tool registry — the closed table of callable tools and their dispatch flags.
// ABOUTME: Immutable once built; the dispatcher only ever resolves names against this table.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::call::CallArgs;
use crate::config::ToolsConfig;

/// A callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// Human-readable signature shown to the model, e.g. `read_file(path, start=0)`.
    fn signature(&self) -> String {
        format!("{}(...)", self.name())
    }

    fn description(&self) -> &str {
        ""
    }

    async fn call(&self, args: CallArgs) -> anyhow::Result<String>;
}

/// Dispatch flags for a registered tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolFlags {
    /// May be combined with other bundleable calls in one reply.
    pub bundleable: bool,
    /// Identical back-to-back calls are suppressed.
    pub no_repeat: bool,
}

impl ToolFlags {
    pub fn bundleable() -> Self {
        Self {
            bundleable: true,
            no_repeat: false,
        }
    }

    pub fn no_repeat() -> Self {
        Self {
            bundleable: false,
            no_repeat: true,
        }
    }
}

/// A tool plus its flags.
#[derive(Clone)]
pub struct ToolRegistration {
    pub tool: Arc<dyn Tool>,
    pub flags: ToolFlags,
}

impl ToolRegistration {
    pub fn name(&self) -> &str {
        self.tool.name()
    }
}

/// Name → registration table, remembering registration order for display.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolRegistration>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A later registration with the same name replaces the
    /// earlier one but keeps its display position.
    pub fn register(mut self, tool: impl Tool + 'static, flags: ToolFlags) -> Self {
        self.insert(Arc::new(tool), flags);
        self
    }

    pub fn insert(&mut self, tool: Arc<dyn Tool>, flags: ToolFlags) {
        let name = tool.name().to_string();
        if !self.tools.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.tools.insert(name, ToolRegistration { tool, flags });
    }

    /// Force flags on by name from configuration. Unknown names are ignored.
    pub fn apply_config(mut self, config: &ToolsConfig) -> Self {
        for name in &config.bundleable {
            if let Some(reg) = self.tools.get_mut(name) {
                reg.flags.bundleable = true;
            }
        }
        for name in &config.no_repeat {
            if let Some(reg) = self.tools.get_mut(name) {
                reg.flags.no_repeat = true;
            }
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&ToolRegistration> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn is_bundleable(&self, name: &str) -> bool {
        self.get(name).is_some_and(|reg| reg.flags.bundleable)
    }

    pub fn is_no_repeat(&self, name: &str) -> bool {
        self.get(name).is_some_and(|reg| reg.flags.no_repeat)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Registrations in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolRegistration> {
        self.order.iter().filter_map(|name| self.tools.get(name))
    }

    /// One line per tool: signature, then the description if it has one.
    pub fn signatures(&self) -> String {
        self.iter()
            .map(|reg| {
                let description = reg.tool.description();
                if description.is_empty() {
                    reg.tool.signature()
                } else {
                    format!("{}: {}", reg.tool.signature(), description)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(&'static str);

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            self.0
        }

        fn signature(&self) -> String {
            format!("{}(text)", self.0)
        }

        async fn call(&self, args: CallArgs) -> anyhow::Result<String> {
            Ok(args.require_str(0, "text")?.to_string())
        }
    }

    struct Described;

    #[async_trait]
    impl Tool for Described {
        fn name(&self) -> &str {
            "described"
        }

        fn description(&self) -> &str {
            "does a thing"
        }

        async fn call(&self, _args: CallArgs) -> anyhow::Result<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn flags_are_looked_up_by_name() {
        let registry = ToolRegistry::new()
            .register(Echo("a"), ToolFlags::bundleable())
            .register(Echo("b"), ToolFlags::no_repeat());
        assert!(registry.is_bundleable("a"));
        assert!(!registry.is_no_repeat("a"));
        assert!(registry.is_no_repeat("b"));
        assert!(!registry.is_bundleable("missing"));
        assert!(!registry.contains("missing"));
    }

    #[test]
    fn signatures_follow_registration_order() {
        let registry = ToolRegistry::new()
            .register(Echo("zeta"), ToolFlags::default())
            .register(Described, ToolFlags::default())
            .register(Echo("alpha"), ToolFlags::default());
        assert_eq!(
            registry.signatures(),
            "zeta(text)\ndescribed(...): does a thing\nalpha(text)"
        );
    }

    #[test]
    fn reregistering_replaces_without_reordering() {
        let registry = ToolRegistry::new()
            .register(Echo("a"), ToolFlags::default())
            .register(Echo("b"), ToolFlags::default())
            .register(Echo("a"), ToolFlags::bundleable());
        assert_eq!(registry.len(), 2);
        assert!(registry.is_bundleable("a"));
        let names: Vec<&str> = registry.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn config_forces_flags_on() {
        let config = ToolsConfig {
            bundleable: vec!["a".to_string(), "unknown".to_string()],
            no_repeat: vec!["a".to_string()],
        };
        let registry = ToolRegistry::new()
            .register(Echo("a"), ToolFlags::default())
            .apply_config(&config);
        assert!(registry.is_bundleable("a"));
        assert!(registry.is_no_repeat("a"));
        assert!(!registry.contains("unknown"));
    }
}
