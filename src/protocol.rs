use crate::commands::Command;
use crate::types::*;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

/// Frames sent by clients, one per command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    Create { nickname: String },
    Join { nickname: String },
    Start,
    Identity,
    Kill { target: String },
    Check { target: String },
    Vote { target: String },
    Abstain,
    End,
    Info,
}

impl From<ClientMessage> for Command {
    fn from(msg: ClientMessage) -> Self {
        match msg {
            ClientMessage::Create { nickname } => Command::Create { nickname },
            ClientMessage::Join { nickname } => Command::Join { nickname },
            ClientMessage::Start => Command::Start,
            ClientMessage::Identity => Command::Identity,
            ClientMessage::Kill { target } => Command::Kill { target },
            ClientMessage::Check { target } => Command::Check { target },
            ClientMessage::Vote { target } => Command::Vote { target },
            ClientMessage::Abstain => Command::Abstain,
            ClientMessage::End => Command::End,
            ClientMessage::Info => Command::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        user: UserId,
        /// `None` for a private connection
        group: Option<GroupId>,
        server_now: String,
    },
    /// Direct answer to the client's last command
    Reply {
        text: String,
    },
    /// Something the game said on this channel
    Say {
        text: String,
    },
    Error {
        code: String,
        msg: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_parsing() {
        let msg: ClientMessage = serde_json::from_str(r#"{"t":"vote","target":"2"}"#).unwrap();
        assert_eq!(
            Command::from(msg),
            Command::Vote {
                target: "2".to_string()
            }
        );

        let msg: ClientMessage = serde_json::from_str(r#"{"t":"abstain"}"#).unwrap();
        assert_eq!(Command::from(msg), Command::Abstain);

        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"create","nickname":"Alice"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Create {
                nickname: "Alice".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_or_incomplete_messages_fail() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"t":"fly"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"t":"kill"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"target":"2"}"#).is_err());
    }

    #[test]
    fn test_server_message_shape() {
        let json = serde_json::to_value(ServerMessage::Say {
            text: "Game over.".to_string(),
        })
        .unwrap();
        assert_eq!(json["t"], "say");
        assert_eq!(json["text"], "Game over.");

        let json = serde_json::to_value(ServerMessage::Welcome {
            protocol: PROTOCOL_VERSION.to_string(),
            user: "alice".to_string(),
            group: None,
            server_now: "2024-01-01T00:00:00Z".to_string(),
        })
        .unwrap();
        assert_eq!(json["t"], "welcome");
        assert!(json["group"].is_null());
    }
}
