//! Wire model for inbound interactions and the replies sent back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Replies marked with this flag are only shown to the invoking user.
pub const EPHEMERAL_FLAG: u64 = 64;
/// Platform ceiling on message content length, in characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

const RESPONSE_PONG: u8 = 1;
const RESPONSE_CHANNEL_MESSAGE: u8 = 4;
const RESPONSE_AUTOCOMPLETE_RESULT: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Ping,
    ApplicationCommand,
    MessageComponent,
    Autocomplete,
    ModalSubmit,
    Unknown(u8),
}

impl InteractionKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Ping,
            2 => Self::ApplicationCommand,
            3 => Self::MessageComponent,
            4 => Self::Autocomplete,
            5 => Self::ModalSubmit,
            other => Self::Unknown(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::ApplicationCommand => "application_command",
            Self::MessageComponent => "message_component",
            Self::Autocomplete => "autocomplete",
            Self::ModalSubmit => "modal_submit",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Just the interaction type, read before the full body so a handshake is
/// answered whatever else the body carries.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    type_code: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub type_code: u8,
    #[serde(default)]
    pub data: Option<CommandData>,
    #[serde(default)]
    pub member: Option<Member>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub guild_locale: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_code: u8,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub focused: bool,
    /// Present on subcommands and subcommand groups.
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

impl CommandOption {
    /// The option value as text; numbers and booleans use their JSON form.
    pub fn value_text(&self) -> Option<String> {
        match self.value.as_ref()? {
            Value::String(text) => Some(text.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
}

/// Read only the `type` field of a raw interaction body.
pub fn peek_kind(body: &[u8]) -> Result<InteractionKind, serde_json::Error> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    Ok(InteractionKind::from_code(envelope.type_code))
}

impl Interaction {
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn kind(&self) -> InteractionKind {
        InteractionKind::from_code(self.type_code)
    }

    /// The invoking user: the member's user inside a guild, the top-level
    /// user in direct messages.
    pub fn invoker_id(&self) -> Option<&str> {
        self.member
            .as_ref()
            .and_then(|member| member.user.as_ref())
            .or(self.user.as_ref())
            .map(|user| user.id.as_str())
    }

    pub fn command_name(&self) -> Option<&str> {
        self.data.as_ref().map(|data| data.name.as_str())
    }

    /// Value-carrying options, with subcommand nesting flattened.
    pub fn options(&self) -> Vec<&CommandOption> {
        let mut leaves = Vec::new();
        if let Some(data) = self.data.as_ref() {
            collect_leaves(&data.options, &mut leaves);
        }
        leaves
    }

    pub fn focused_option(&self) -> Option<&CommandOption> {
        self.options().into_iter().find(|option| option.focused)
    }
}

fn collect_leaves<'a>(options: &'a [CommandOption], out: &mut Vec<&'a CommandOption>) {
    for option in options {
        if option.options.is_empty() {
            out.push(option);
        } else {
            collect_leaves(&option.options, out);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub name: String,
    pub value: String,
}

impl Choice {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub type_code: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
    Choices {
        choices: Vec<Choice>,
    },
    Message {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        flags: Option<u64>,
    },
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            type_code: RESPONSE_PONG,
            data: None,
        }
    }

    pub fn choices(choices: Vec<Choice>) -> Self {
        Self {
            type_code: RESPONSE_AUTOCOMPLETE_RESULT,
            data: Some(ResponseData::Choices { choices }),
        }
    }

    /// A private reply, visible only to the invoker.
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self::message(content, Some(EPHEMERAL_FLAG))
    }

    pub fn message(content: impl Into<String>, flags: Option<u64>) -> Self {
        let content: String = content.into();
        let content = if content.chars().count() > MAX_CONTENT_CHARS {
            content.chars().take(MAX_CONTENT_CHARS).collect()
        } else {
            content
        };
        Self {
            type_code: RESPONSE_CHANNEL_MESSAGE,
            data: Some(ResponseData::Message { content, flags }),
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self.data.as_ref()? {
            ResponseData::Message { content, .. } => Some(content),
            ResponseData::Choices { .. } => None,
        }
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(
            self.data,
            Some(ResponseData::Message { flags: Some(flags), .. }) if flags & EPHEMERAL_FLAG != 0
        )
    }
}
