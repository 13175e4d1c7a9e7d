//! Handler registry — declared identities and the matching algorithm
//!
//! The registry is populated at application startup, before any transport
//! is activated, and is read-only afterwards. Share it as `Arc<Registry>`;
//! lookups need no lock because nothing mutates mid-dispatch.

use crate::error::{InteractionError, Result};
use crate::handler::InteractionHandler;
use crate::types::{InteractionKind, MenuTarget, TargetIdentity};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Command wire code for a chat-input command declaration
const DECLARE_CHAT_INPUT: u8 = 1;
/// Command wire code for a user context menu declaration
const DECLARE_USER_MENU: u8 = 2;
/// Command wire code for a message context menu declaration
const DECLARE_MESSAGE_MENU: u8 = 3;
/// Option wire code for a subcommand declaration
const DECLARE_SUB_COMMAND: u8 = 1;
/// Option wire code for a subcommand group declaration
const DECLARE_SUB_COMMAND_GROUP: u8 = 2;

/// Declaration metadata carried alongside a command handler
///
/// Opaque to dispatch — only [`Registry::export_commands`] reads it, to
/// assemble the declaration payload the application uploads to the
/// platform.
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    /// Human-readable command description
    pub description: String,

    /// Option schemas for the leaf command, as platform JSON
    pub options: Vec<serde_json::Value>,

    /// Whether the command is enabled by default
    pub default_permission: bool,
}

impl CommandMetadata {
    /// Metadata with just a description
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            options: Vec::new(),
            default_permission: true,
        }
    }

    /// Attach an option schema
    pub fn with_option(mut self, option: serde_json::Value) -> Self {
        self.options.push(option);
        self
    }
}

impl Default for CommandMetadata {
    fn default() -> Self {
        Self::new("")
    }
}

/// One registered handler with its identity pattern
pub struct HandlerEntry {
    kind: InteractionKind,
    pattern: String,
    handler: Arc<dyn InteractionHandler>,
}

impl HandlerEntry {
    fn new(kind: InteractionKind, pattern: impl Into<String>, handler: Arc<dyn InteractionHandler>) -> Self {
        Self {
            kind,
            pattern: pattern.into(),
            handler,
        }
    }

    /// The registered identity pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Which kind of interaction this entry handles
    pub fn kind(&self) -> InteractionKind {
        self.kind
    }

    /// The handler capability
    pub fn handler(&self) -> Arc<dyn InteractionHandler> {
        self.handler.clone()
    }
}

struct RegisteredCommand {
    metadata: CommandMetadata,
    entry: HandlerEntry,
}

/// Maps declared command, menu, and component identities to handlers
#[derive(Default)]
pub struct Registry {
    /// Full name path → command (exact match only)
    commands: HashMap<String, RegisteredCommand>,

    /// Menu target → name → handler
    menus: HashMap<MenuTarget, HashMap<String, HandlerEntry>>,

    /// Exact component custom identifiers
    components: HashMap<String, HandlerEntry>,

    /// Prefix component patterns, in registration order
    component_prefixes: Vec<HandlerEntry>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command handler for an exact name path
    ///
    /// `path` is one to three space-separated names: a bare command
    /// (`"ping"`), a subcommand (`"perm add"`), or a grouped subcommand
    /// (`"perm user add"`). A handler registered for `"perm"` never
    /// matches an invocation of `"perm add"`.
    pub fn register_command(
        &mut self,
        path: impl Into<String>,
        metadata: CommandMetadata,
        handler: Arc<dyn InteractionHandler>,
    ) -> Result<()> {
        let path = normalize_path(&path.into())?;

        if self.commands.contains_key(&path) {
            return Err(InteractionError::DuplicateHandler {
                kind: InteractionKind::Command.label(),
                pattern: path,
            });
        }

        tracing::debug!(path = %path, "Command handler registered");
        self.commands.insert(
            path.clone(),
            RegisteredCommand {
                metadata,
                entry: HandlerEntry::new(InteractionKind::Command, path, handler),
            },
        );
        Ok(())
    }

    /// Register a context menu handler
    ///
    /// A user menu and a message menu may share a name; two menus with the
    /// same target and name may not.
    pub fn register_context_menu(
        &mut self,
        name: impl Into<String>,
        target: MenuTarget,
        handler: Arc<dyn InteractionHandler>,
    ) -> Result<()> {
        let name = name.into();
        let menus = self.menus.entry(target).or_default();

        if menus.contains_key(&name) {
            return Err(InteractionError::DuplicateHandler {
                kind: InteractionKind::ContextMenu.label(),
                pattern: format!("{} ({})", name, target),
            });
        }

        tracing::debug!(name = %name, target = %target, "Context menu handler registered");
        menus.insert(
            name.clone(),
            HandlerEntry::new(InteractionKind::ContextMenu, name, handler),
        );
        Ok(())
    }

    /// Register a component callback for an exact custom identifier
    pub fn register_component(
        &mut self,
        custom_id: impl Into<String>,
        handler: Arc<dyn InteractionHandler>,
    ) -> Result<()> {
        let custom_id = custom_id.into();

        if self.components.contains_key(&custom_id) {
            return Err(InteractionError::DuplicateHandler {
                kind: InteractionKind::Component.label(),
                pattern: custom_id,
            });
        }

        tracing::debug!(custom_id = %custom_id, "Component handler registered");
        self.components.insert(
            custom_id.clone(),
            HandlerEntry::new(InteractionKind::Component, custom_id, handler),
        );
        Ok(())
    }

    /// Register a component callback matching any custom identifier that
    /// starts with `prefix`
    ///
    /// Prefix patterns are tried in registration order, after exact
    /// patterns. Overlapping prefixes are allowed; an exact registration
    /// sharing a prefix always wins.
    pub fn register_component_prefix(
        &mut self,
        prefix: impl Into<String>,
        handler: Arc<dyn InteractionHandler>,
    ) -> Result<()> {
        let prefix = prefix.into();

        if self.component_prefixes.iter().any(|e| e.pattern == prefix) {
            return Err(InteractionError::DuplicateHandler {
                kind: InteractionKind::Component.label(),
                pattern: prefix,
            });
        }

        tracing::debug!(prefix = %prefix, "Component prefix handler registered");
        self.component_prefixes
            .push(HandlerEntry::new(InteractionKind::Component, prefix, handler));
        Ok(())
    }

    /// Resolve an inbound identity to at most one handler
    ///
    /// Pure and deterministic. Commands and menus match exactly;
    /// components try an exact match first, then prefix patterns in
    /// registration order.
    pub fn lookup(&self, identity: &TargetIdentity) -> Option<&HandlerEntry> {
        match identity {
            TargetIdentity::Ping => None,
            TargetIdentity::Command { path } => self.commands.get(path).map(|c| &c.entry),
            TargetIdentity::ContextMenu { target, name } => {
                self.menus.get(target).and_then(|m| m.get(name))
            }
            TargetIdentity::Component { custom_id } => {
                self.components.get(custom_id).or_else(|| {
                    self.component_prefixes
                        .iter()
                        .find(|e| custom_id.starts_with(&e.pattern))
                })
            }
        }
    }

    /// Number of registered handlers across all kinds
    pub fn len(&self) -> usize {
        self.commands.len()
            + self.menus.values().map(|m| m.len()).sum::<usize>()
            + self.components.len()
            + self.component_prefixes.len()
    }

    /// Whether the registry holds no handlers
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Assemble the declaration payload for bulk upload to the platform
    ///
    /// Subcommand paths fold back into the platform's structural encoding:
    /// `"perm add"` becomes a SUB_COMMAND option of `perm`, `"perm user
    /// add"` a SUB_COMMAND inside a SUB_COMMAND_GROUP. The upload itself is
    /// the application's job — the engine only declares.
    pub fn export_commands(&self) -> Vec<serde_json::Value> {
        #[derive(Default)]
        struct Root {
            description: String,
            default_permission: bool,
            options: Vec<serde_json::Value>,
            subs: BTreeMap<String, serde_json::Value>,
            groups: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
        }

        let mut roots: BTreeMap<String, Root> = BTreeMap::new();

        for (path, cmd) in &self.commands {
            let parts: Vec<&str> = path.split(' ').collect();
            let root = roots.entry(parts[0].to_string()).or_insert_with(|| Root {
                default_permission: true,
                ..Root::default()
            });
            let meta = &cmd.metadata;

            match parts[..] {
                [_] => {
                    root.description = meta.description.clone();
                    root.default_permission = meta.default_permission;
                    root.options = meta.options.clone();
                }
                [_, sub] => {
                    root.subs.insert(sub.to_string(), leaf_declaration(sub, meta));
                }
                [_, group, sub] => {
                    root.groups
                        .entry(group.to_string())
                        .or_default()
                        .insert(sub.to_string(), leaf_declaration(sub, meta));
                }
                _ => unreachable!("paths are validated at registration"),
            }
        }

        let mut declarations = Vec::new();

        for (name, root) in roots {
            let options = if root.subs.is_empty() && root.groups.is_empty() {
                root.options
            } else {
                // A command with subcommands is not itself invocable; its
                // options are exactly the group and subcommand declarations.
                let mut options: Vec<serde_json::Value> = root
                    .groups
                    .into_iter()
                    .map(|(group, subs)| {
                        serde_json::json!({
                            "type": DECLARE_SUB_COMMAND_GROUP,
                            "name": group,
                            "description": "",
                            "options": subs.into_values().collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                options.extend(root.subs.into_values());
                options
            };

            declarations.push(serde_json::json!({
                "name": name,
                "type": DECLARE_CHAT_INPUT,
                "description": root.description,
                "options": options,
                "default_permission": root.default_permission,
            }));
        }

        let mut menu_names: Vec<(&MenuTarget, &String)> = self
            .menus
            .iter()
            .flat_map(|(target, m)| m.keys().map(move |name| (target, name)))
            .collect();
        menu_names.sort();

        for (target, name) in menu_names {
            let menu_type = match target {
                MenuTarget::User => DECLARE_USER_MENU,
                MenuTarget::Message => DECLARE_MESSAGE_MENU,
            };
            declarations.push(serde_json::json!({
                "name": name,
                "type": menu_type,
            }));
        }

        declarations
    }
}

fn leaf_declaration(name: &str, meta: &CommandMetadata) -> serde_json::Value {
    serde_json::json!({
        "type": DECLARE_SUB_COMMAND,
        "name": name,
        "description": meta.description,
        "options": meta.options,
    })
}

fn normalize_path(path: &str) -> Result<String> {
    let parts: Vec<&str> = path.split_whitespace().collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(InteractionError::Payload(format!(
            "command path '{}' must be one to three names",
            path
        )));
    }
    Ok(parts.join(" "))
}
