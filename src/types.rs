//! Core interaction types for the interaction engine
//!
//! Inbound payloads arrive as platform JSON (numeric `type` tags,
//! snake_case fields) and are normalized into one canonical [`Interaction`]
//! value regardless of which transport delivered them.

use crate::error::{InteractionError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// Platform wire code for a ping interaction
const WIRE_PING: u8 = 1;
/// Platform wire code for an application command interaction
const WIRE_COMMAND: u8 = 2;
/// Platform wire code for a component callback interaction
const WIRE_COMPONENT: u8 = 3;

/// Command wire code for a user context menu
const COMMAND_USER_MENU: u8 = 2;
/// Command wire code for a message context menu
const COMMAND_MESSAGE_MENU: u8 = 3;

/// Option wire code for a subcommand
const OPTION_SUB_COMMAND: u8 = 1;
/// Option wire code for a subcommand group
const OPTION_SUB_COMMAND_GROUP: u8 = 2;

/// Which transport delivered an interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Long-lived, already-authenticated gateway connection
    Push,
    /// Discrete signed HTTP webhook request
    Pull,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Push => write!(f, "push"),
            Transport::Pull => write!(f, "pull"),
        }
    }
}

/// The broad category of an inbound interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    /// Platform liveness check — answered directly by the transport
    Ping,
    /// Slash command invocation
    Command,
    /// Context menu invocation (user or message target)
    ContextMenu,
    /// Interactive component callback (button, select, ...)
    Component,
}

impl InteractionKind {
    /// Stable label used in logs and error messages
    pub fn label(&self) -> &'static str {
        match self {
            InteractionKind::Ping => "ping",
            InteractionKind::Command => "command",
            InteractionKind::ContextMenu => "context menu",
            InteractionKind::Component => "component",
        }
    }
}

/// Target kind of a context menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MenuTarget {
    /// Menu shown on a user
    User,
    /// Menu shown on a message
    Message,
}

impl fmt::Display for MenuTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuTarget::User => write!(f, "user"),
            MenuTarget::Message => write!(f, "message"),
        }
    }
}

/// The identity an interaction resolves against the registry
///
/// Kind and identity are jointly sufficient to select at most one handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetIdentity {
    /// Liveness check — never dispatched
    Ping,
    /// Command name path, space-joined (e.g. `"perm"`, `"perm user add"`)
    Command { path: String },
    /// Context menu name, qualified by its target kind — a user menu and a
    /// message menu may legally share a name
    ContextMenu { target: MenuTarget, name: String },
    /// Opaque custom identifier carried by the component
    Component { custom_id: String },
}

impl TargetIdentity {
    /// The kind this identity belongs to
    pub fn kind(&self) -> InteractionKind {
        match self {
            TargetIdentity::Ping => InteractionKind::Ping,
            TargetIdentity::Command { .. } => InteractionKind::Command,
            TargetIdentity::ContextMenu { .. } => InteractionKind::ContextMenu,
            TargetIdentity::Component { .. } => InteractionKind::Component,
        }
    }
}

impl fmt::Display for TargetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetIdentity::Ping => write!(f, "ping"),
            TargetIdentity::Command { path } => write!(f, "{}", path),
            TargetIdentity::ContextMenu { target, name } => write!(f, "{} ({})", name, target),
            TargetIdentity::Component { custom_id } => write!(f, "{}", custom_id),
        }
    }
}

/// One inbound interaction, normalized from either transport
///
/// Immutable once constructed. Platform references (guild, channel, user)
/// are carried as opaque JSON — the engine never interprets them.
#[derive(Debug, Clone)]
pub struct Interaction {
    /// Platform-assigned unique id
    pub id: String,

    /// Owning application id, if present on the wire
    pub application_id: Option<String>,

    /// Response credential used for acknowledgements and followups
    pub token: String,

    /// Broad category of this interaction
    pub kind: InteractionKind,

    /// Identity used for handler resolution
    pub identity: TargetIdentity,

    /// Leaf option values keyed by option name
    ///
    /// For subcommand invocations these are the innermost options, the
    /// subcommand path itself lives in `identity`.
    pub options: HashMap<String, serde_json::Value>,

    /// Raw `data` object from the wire, passed through untouched
    pub data: serde_json::Value,

    /// Originating guild reference (opaque)
    pub guild_id: Option<String>,

    /// Originating channel reference (opaque)
    pub channel_id: Option<String>,

    /// Invoking member or user object (opaque)
    pub user: Option<serde_json::Value>,

    /// Which transport delivered this interaction
    pub transport: Transport,
}

impl Interaction {
    /// Parse a raw wire payload into a canonical interaction
    pub fn from_wire(value: serde_json::Value, transport: Transport) -> Result<Self> {
        let wire: WireInteraction = serde_json::from_value(value)?;

        let identity = match wire.kind {
            WIRE_PING => TargetIdentity::Ping,
            WIRE_COMMAND => command_identity(wire.data.as_ref())?,
            WIRE_COMPONENT => component_identity(wire.data.as_ref())?,
            other => {
                return Err(InteractionError::Payload(format!(
                    "unsupported interaction type {}",
                    other
                )))
            }
        };

        let options = match &identity {
            TargetIdentity::Command { .. } => wire
                .data
                .as_ref()
                .map(|d| leaf_options(&d.options))
                .unwrap_or_default(),
            _ => HashMap::new(),
        };

        let data = wire
            .data
            .map(|d| d.raw)
            .unwrap_or(serde_json::Value::Null);

        Ok(Self {
            id: wire.id,
            application_id: wire.application_id,
            token: wire.token.unwrap_or_default(),
            kind: identity.kind(),
            identity,
            options,
            data,
            guild_id: wire.guild_id,
            channel_id: wire.channel_id,
            user: wire.member.or(wire.user),
            transport,
        })
    }

    /// Whether this interaction is a platform liveness check
    pub fn is_ping(&self) -> bool {
        self.kind == InteractionKind::Ping
    }

    /// Get a leaf option value by name
    pub fn option(&self, name: &str) -> Option<&serde_json::Value> {
        self.options.get(name)
    }

    /// Resolve an option value against the payload's resolved entity tables
    ///
    /// Entity-typed options (user, role, channel, ...) carry a snowflake id
    /// whose full object lives under `data.resolved`. Returns the resolved
    /// object from whichever table contains the id.
    pub fn resolve_option(&self, name: &str) -> Option<&serde_json::Value> {
        let id = self.options.get(name)?.as_str()?;
        let resolved = self.data.get("resolved")?;
        for table in ["users", "members", "roles", "channels", "messages", "attachments"] {
            if let Some(entity) = resolved.get(table).and_then(|t| t.get(id)) {
                return Some(entity);
            }
        }
        None
    }
}

// ─── Wire schema ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WireInteraction {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    application_id: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    data: Option<WireData>,
    #[serde(default)]
    guild_id: Option<String>,
    #[serde(default)]
    channel_id: Option<String>,
    #[serde(default)]
    member: Option<serde_json::Value>,
    #[serde(default)]
    user: Option<serde_json::Value>,
}

#[derive(Debug)]
struct WireData {
    name: Option<String>,
    command_type: Option<u8>,
    custom_id: Option<String>,
    options: Vec<WireOption>,
    raw: serde_json::Value,
}

// Manual deserialization keeps the full `data` object around for opaque
// pass-through while still pulling out the routed fields.
impl<'de> Deserialize<'de> for WireData {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Fields {
            #[serde(default)]
            name: Option<String>,
            #[serde(rename = "type", default)]
            command_type: Option<u8>,
            #[serde(default)]
            custom_id: Option<String>,
            #[serde(default)]
            options: Vec<WireOption>,
        }

        let raw = serde_json::Value::deserialize(deserializer)?;
        let fields: Fields =
            serde_json::from_value(raw.clone()).map_err(serde::de::Error::custom)?;

        Ok(WireData {
            name: fields.name,
            command_type: fields.command_type,
            custom_id: fields.custom_id,
            options: fields.options,
            raw,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct WireOption {
    name: String,
    #[serde(rename = "type")]
    option_type: u8,
    #[serde(default)]
    value: Option<serde_json::Value>,
    #[serde(default)]
    options: Vec<WireOption>,
}

/// Derive a command or context menu identity from the wire `data` object
fn command_identity(data: Option<&WireData>) -> Result<TargetIdentity> {
    let data = data
        .ok_or_else(|| InteractionError::Payload("command interaction without data".into()))?;
    let name = data
        .name
        .clone()
        .ok_or_else(|| InteractionError::Payload("command interaction without name".into()))?;

    match data.command_type {
        Some(COMMAND_USER_MENU) => Ok(TargetIdentity::ContextMenu {
            target: MenuTarget::User,
            name,
        }),
        Some(COMMAND_MESSAGE_MENU) => Ok(TargetIdentity::ContextMenu {
            target: MenuTarget::Message,
            name,
        }),
        _ => Ok(TargetIdentity::Command {
            path: command_path(&name, &data.options),
        }),
    }
}

/// Derive a component identity from the wire `data` object
fn component_identity(data: Option<&WireData>) -> Result<TargetIdentity> {
    let custom_id = data
        .and_then(|d| d.custom_id.clone())
        .ok_or_else(|| InteractionError::Payload("component interaction without custom_id".into()))?;
    Ok(TargetIdentity::Component { custom_id })
}

/// Build the space-joined command path from the nested option tree
///
/// The platform encodes subcommands structurally: a lone option of the
/// subcommand-group type wraps a lone subcommand option, which wraps the
/// actual arguments. `"perm user add"` arrives as
/// `name=perm → options=[group user → options=[sub add → options=[...]]]`.
fn command_path(name: &str, options: &[WireOption]) -> String {
    let mut path = name.to_string();
    let mut current = options;

    if let Some(first) = current.first() {
        if first.option_type == OPTION_SUB_COMMAND_GROUP {
            path.push(' ');
            path.push_str(&first.name);
            current = &first.options;
        }
    }
    if let Some(first) = current.first() {
        if first.option_type == OPTION_SUB_COMMAND {
            path.push(' ');
            path.push_str(&first.name);
        }
    }

    path
}

/// Flatten the innermost option values into a name → value map
fn leaf_options(options: &[WireOption]) -> HashMap<String, serde_json::Value> {
    let mut current = options;

    if let Some(first) = current.first() {
        if first.option_type == OPTION_SUB_COMMAND_GROUP {
            current = &first.options;
        }
    }
    if let Some(first) = current.first() {
        if first.option_type == OPTION_SUB_COMMAND {
            current = &first.options;
        }
    }

    current
        .iter()
        .filter_map(|opt| opt.value.clone().map(|v| (opt.name.clone(), v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ping() {
        let interaction = Interaction::from_wire(
            serde_json::json!({"id": "100", "type": 1, "token": "tok"}),
            Transport::Pull,
        )
        .unwrap();

        assert!(interaction.is_ping());
        assert_eq!(interaction.identity, TargetIdentity::Ping);
        assert_eq!(interaction.transport, Transport::Pull);
    }

    #[test]
    fn test_parse_simple_command() {
        let interaction = Interaction::from_wire(
            serde_json::json!({
                "id": "101",
                "application_id": "app-1",
                "type": 2,
                "token": "tok",
                "channel_id": "chan-1",
                "data": {
                    "id": "900",
                    "name": "echo",
                    "type": 1,
                    "options": [{"name": "text", "type": 3, "value": "hello"}]
                }
            }),
            Transport::Push,
        )
        .unwrap();

        assert_eq!(interaction.kind, InteractionKind::Command);
        assert_eq!(
            interaction.identity,
            TargetIdentity::Command { path: "echo".into() }
        );
        assert_eq!(interaction.option("text").unwrap(), "hello");
        assert_eq!(interaction.channel_id.as_deref(), Some("chan-1"));
    }

    #[test]
    fn test_parse_subcommand_path() {
        let interaction = Interaction::from_wire(
            serde_json::json!({
                "id": "102",
                "type": 2,
                "token": "tok",
                "data": {
                    "name": "perm",
                    "type": 1,
                    "options": [{
                        "name": "add",
                        "type": 1,
                        "options": [{"name": "target", "type": 3, "value": "r-55"}]
                    }]
                }
            }),
            Transport::Push,
        )
        .unwrap();

        assert_eq!(
            interaction.identity,
            TargetIdentity::Command { path: "perm add".into() }
        );
        assert_eq!(interaction.option("target").unwrap(), "r-55");
    }

    #[test]
    fn test_parse_subcommand_group_path() {
        let interaction = Interaction::from_wire(
            serde_json::json!({
                "id": "103",
                "type": 2,
                "token": "tok",
                "data": {
                    "name": "perm",
                    "type": 1,
                    "options": [{
                        "name": "user",
                        "type": 2,
                        "options": [{
                            "name": "add",
                            "type": 1,
                            "options": [{"name": "who", "type": 6, "value": "u-7"}]
                        }]
                    }]
                }
            }),
            Transport::Push,
        )
        .unwrap();

        assert_eq!(
            interaction.identity,
            TargetIdentity::Command { path: "perm user add".into() }
        );
        assert_eq!(interaction.option("who").unwrap(), "u-7");
    }

    #[test]
    fn test_parse_context_menus() {
        let user_menu = Interaction::from_wire(
            serde_json::json!({
                "id": "104",
                "type": 2,
                "token": "tok",
                "data": {"name": "Report", "type": 2, "target_id": "u-9"}
            }),
            Transport::Push,
        )
        .unwrap();
        assert_eq!(
            user_menu.identity,
            TargetIdentity::ContextMenu { target: MenuTarget::User, name: "Report".into() }
        );

        let message_menu = Interaction::from_wire(
            serde_json::json!({
                "id": "105",
                "type": 2,
                "token": "tok",
                "data": {"name": "Report", "type": 3, "target_id": "m-3"}
            }),
            Transport::Push,
        )
        .unwrap();
        assert_eq!(
            message_menu.identity,
            TargetIdentity::ContextMenu { target: MenuTarget::Message, name: "Report".into() }
        );

        // target_id survives in the opaque data object
        assert_eq!(user_menu.data["target_id"], "u-9");
    }

    #[test]
    fn test_parse_component() {
        let interaction = Interaction::from_wire(
            serde_json::json!({
                "id": "106",
                "type": 3,
                "token": "tok",
                "data": {"custom_id": "confirm:42", "component_type": 2}
            }),
            Transport::Pull,
        )
        .unwrap();

        assert_eq!(interaction.kind, InteractionKind::Component);
        assert_eq!(
            interaction.identity,
            TargetIdentity::Component { custom_id: "confirm:42".into() }
        );
    }

    #[test]
    fn test_unsupported_type_rejected() {
        let result = Interaction::from_wire(
            serde_json::json!({"id": "107", "type": 4, "token": "tok", "data": {"name": "x"}}),
            Transport::Pull,
        );
        assert!(matches!(result, Err(InteractionError::Payload(_))));
    }

    #[test]
    fn test_component_without_custom_id_rejected() {
        let result = Interaction::from_wire(
            serde_json::json!({"id": "108", "type": 3, "token": "tok", "data": {}}),
            Transport::Pull,
        );
        assert!(matches!(result, Err(InteractionError::Payload(_))));
    }

    #[test]
    fn test_member_preferred_over_user() {
        let interaction = Interaction::from_wire(
            serde_json::json!({
                "id": "109",
                "type": 2,
                "token": "tok",
                "member": {"nick": "guild-nick"},
                "user": {"username": "global"},
                "data": {"name": "echo", "type": 1}
            }),
            Transport::Push,
        )
        .unwrap();

        assert_eq!(interaction.user.unwrap()["nick"], "guild-nick");
    }

    #[test]
    fn test_resolve_option() {
        let interaction = Interaction::from_wire(
            serde_json::json!({
                "id": "110",
                "type": 2,
                "token": "tok",
                "data": {
                    "name": "ban",
                    "type": 1,
                    "options": [{"name": "who", "type": 6, "value": "u-7"}],
                    "resolved": {
                        "users": {"u-7": {"username": "target-user"}}
                    }
                }
            }),
            Transport::Push,
        )
        .unwrap();

        let entity = interaction.resolve_option("who").unwrap();
        assert_eq!(entity["username"], "target-user");
        assert!(interaction.resolve_option("missing").is_none());
    }
}
