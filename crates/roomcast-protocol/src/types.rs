//! Core protocol types: what travels inside a frame.
//!
//! Every frame payload is a list of text fields joined by `|`:
//!
//! ```text
//! LOGIN|alice|pw1          (request)
//! SUCCESS|general          (response)
//! ERROR|BadCredential      (response)
//! [2024-05-01 12:00:00] alice: hi   (broadcast chat line)
//! ```

use std::fmt;

use crate::ProtocolError;

/// The reserved field separator.
pub const FIELD_DELIMITER: char = '|';

/// Separates member names within one VIEW_ROOMS line.
pub const MEMBER_DELIMITER: char = ',';

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// The reason carried by an `ERROR|<reason>` response.
///
/// The wire form is exactly the variant name (`ERROR|NotInRoom`), so
/// clients can match on it without a lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Registration of a username that is already taken.
    AlreadyExists,
    /// Login with a username nobody registered.
    UnknownUser,
    /// Login with the wrong credential.
    BadCredential,
    /// A room operation named a username nobody registered.
    NotRegistered,
    /// LOGIN/REGISTER on a connection that is already authenticated.
    AlreadyLoggedIn,
    /// A command that needs an authenticated connection (or names a
    /// different user than the one logged in on it).
    NotLoggedIn,
    /// CREATE_ROOM with a name that is taken.
    RoomExists,
    /// JOIN_ROOM for a room that doesn't exist.
    RoomNotFound,
    /// CREATE_ROOM while already a member of a room.
    AlreadyInRoom,
    /// LEAVE_ROOM or MESSAGE without a room.
    NotInRoom,
    /// The frame could not be decoded. Connection-fatal.
    MalformedFrame,
    /// The connection failed mid-operation. Connection-fatal.
    ConnectionLost,
    /// The server failed internally (e.g. the hashing backend).
    Internal,
}

impl ErrorCode {
    /// The wire name of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyExists => "AlreadyExists",
            Self::UnknownUser => "UnknownUser",
            Self::BadCredential => "BadCredential",
            Self::NotRegistered => "NotRegistered",
            Self::AlreadyLoggedIn => "AlreadyLoggedIn",
            Self::NotLoggedIn => "NotLoggedIn",
            Self::RoomExists => "RoomExists",
            Self::RoomNotFound => "RoomNotFound",
            Self::AlreadyInRoom => "AlreadyInRoom",
            Self::NotInRoom => "NotInRoom",
            Self::MalformedFrame => "MalformedFrame",
            Self::ConnectionLost => "ConnectionLost",
            Self::Internal => "Internal",
        }
    }

    /// Returns `true` for codes that end the connection.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MalformedFrame | Self::ConnectionLost)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Command — client → server
// ---------------------------------------------------------------------------

/// A request sent by a client.
///
/// Field order on the wire follows the variant's field order, e.g.
/// `JoinRoom { username, room }` ↔ `JOIN_ROOM|alice|general`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register { username: String, credential: String },
    Login { username: String, credential: String },
    Logout { username: String },
    CreateRoom { username: String, room: String },
    JoinRoom { username: String, room: String },
    LeaveRoom { username: String },
    ViewRooms,
    CurrentInfo { username: String },
    Message { username: String, text: String },
}

impl Command {
    /// The canonical verb for this command.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Register { .. } => "REGISTER",
            Self::Login { .. } => "LOGIN",
            Self::Logout { .. } => "LOGOUT",
            Self::CreateRoom { .. } => "CREATE_ROOM",
            Self::JoinRoom { .. } => "JOIN_ROOM",
            Self::LeaveRoom { .. } => "LEAVE_ROOM",
            Self::ViewRooms => "VIEW_ROOMS",
            Self::CurrentInfo { .. } => "CURRENT_INFO",
            Self::Message { .. } => "MESSAGE",
        }
    }

    /// The username field, for every command that carries one.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Register { username, .. }
            | Self::Login { username, .. }
            | Self::Logout { username }
            | Self::CreateRoom { username, .. }
            | Self::JoinRoom { username, .. }
            | Self::LeaveRoom { username }
            | Self::CurrentInfo { username }
            | Self::Message { username, .. } => Some(username.as_str()),
            Self::ViewRooms => None,
        }
    }

    /// Joins the fields into a frame payload.
    pub fn encode(&self) -> String {
        let fields: Vec<&str> = match self {
            Self::Register { username, credential }
            | Self::Login { username, credential } => {
                vec![username.as_str(), credential.as_str()]
            }
            Self::CreateRoom { username, room }
            | Self::JoinRoom { username, room } => {
                vec![username.as_str(), room.as_str()]
            }
            Self::Message { username, text } => {
                vec![username.as_str(), text.as_str()]
            }
            Self::Logout { username }
            | Self::LeaveRoom { username }
            | Self::CurrentInfo { username } => vec![username.as_str()],
            Self::ViewRooms => vec![],
        };

        let mut payload = String::from(self.verb());
        for field in fields {
            payload.push(FIELD_DELIMITER);
            payload.push_str(field);
        }
        payload
    }

    /// Parses a frame payload.
    ///
    /// The credential of REGISTER/LOGIN and the text of MESSAGE take the
    /// rest of the payload, so they may contain `|`. Other commands
    /// ignore surplus trailing fields. The legacy `*_CHATROOM` verbs are
    /// accepted as aliases.
    ///
    /// # Errors
    /// - [`ProtocolError::EmptyFrame`] for an empty payload
    /// - [`ProtocolError::UnknownCommand`] for an unrecognized verb
    /// - [`ProtocolError::MissingField`] for an absent or empty field
    /// - [`ProtocolError::InvalidField`] for a username or room name
    ///   containing `,` or a line break
    pub fn decode(payload: &str) -> Result<Self, ProtocolError> {
        if payload.is_empty() {
            return Err(ProtocolError::EmptyFrame);
        }

        let (verb, rest) = match payload.split_once(FIELD_DELIMITER) {
            Some((verb, rest)) => (verb, Some(rest)),
            None => (payload, None),
        };

        match verb {
            "REGISTER" => {
                let mut f = Fields::new("REGISTER", rest);
                Ok(Self::Register {
                    username: f.next("username")?,
                    credential: f.remainder("credential")?,
                })
            }
            "LOGIN" => {
                let mut f = Fields::new("LOGIN", rest);
                Ok(Self::Login {
                    username: f.next("username")?,
                    credential: f.remainder("credential")?,
                })
            }
            "LOGOUT" => {
                let mut f = Fields::new("LOGOUT", rest);
                Ok(Self::Logout {
                    username: f.next("username")?,
                })
            }
            "CREATE_ROOM" | "CREATE_CHATROOM" => {
                let mut f = Fields::new("CREATE_ROOM", rest);
                Ok(Self::CreateRoom {
                    username: f.next("username")?,
                    room: f.next("room_name")?,
                })
            }
            "JOIN_ROOM" | "JOIN_CHATROOM" => {
                let mut f = Fields::new("JOIN_ROOM", rest);
                Ok(Self::JoinRoom {
                    username: f.next("username")?,
                    room: f.next("room_name")?,
                })
            }
            "LEAVE_ROOM" | "LEAVE_CHATROOM" => {
                let mut f = Fields::new("LEAVE_ROOM", rest);
                Ok(Self::LeaveRoom {
                    username: f.next("username")?,
                })
            }
            "VIEW_ROOMS" | "VIEW_CHATROOMS" => Ok(Self::ViewRooms),
            "CURRENT_INFO" => {
                let mut f = Fields::new("CURRENT_INFO", rest);
                Ok(Self::CurrentInfo {
                    username: f.next("username")?,
                })
            }
            "MESSAGE" => {
                let mut f = Fields::new("MESSAGE", rest);
                Ok(Self::Message {
                    username: f.next("username")?,
                    text: f.text()?,
                })
            }
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

/// Cursor over the fields after the verb.
struct Fields<'a> {
    command: &'static str,
    rest: Option<&'a str>,
}

impl<'a> Fields<'a> {
    fn new(command: &'static str, rest: Option<&'a str>) -> Self {
        Self { command, rest }
    }

    /// Takes the next `|`-delimited field, a username or room name. It
    /// must be non-empty and must not break up a room listing line.
    fn next(&mut self, field: &'static str) -> Result<String, ProtocolError> {
        let rest = self.rest.take().unwrap_or_default();
        let value = match rest.split_once(FIELD_DELIMITER) {
            Some((value, tail)) => {
                self.rest = Some(tail);
                value
            }
            None => rest,
        };
        if value.contains([MEMBER_DELIMITER, '\n', '\r']) {
            return Err(ProtocolError::InvalidField {
                command: self.command,
                field,
            });
        }
        self.required(field, value)
    }

    /// Takes everything that is left as one non-empty field.
    fn remainder(
        &mut self,
        field: &'static str,
    ) -> Result<String, ProtocolError> {
        let rest = self.rest.take().unwrap_or_default();
        self.required(field, rest)
    }

    /// Takes everything that is left; may be empty, but the delimiter
    /// introducing it must be there.
    fn text(&mut self) -> Result<String, ProtocolError> {
        self.rest.take().map(str::to_string).ok_or(
            ProtocolError::MissingField {
                command: self.command,
                field: "text",
            },
        )
    }

    fn required(
        &self,
        field: &'static str,
        value: &str,
    ) -> Result<String, ProtocolError> {
        if value.is_empty() {
            return Err(ProtocolError::MissingField {
                command: self.command,
                field,
            });
        }
        Ok(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// Response — server → client
// ---------------------------------------------------------------------------

/// One room as reported by VIEW_ROOMS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    pub name: String,
    pub members: Vec<String>,
}

impl fmt::Display for RoomSummary {
    /// `general|alice,bob` — or `general|` for an empty room.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.name, FIELD_DELIMITER, self.members.join(","))
    }
}

/// A chat message as fanned out to room members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    /// Pre-formatted `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
    pub sender: String,
    pub text: String,
}

impl fmt::Display for ChatLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.timestamp, self.sender, self.text)
    }
}

/// Anything the server writes to a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `SUCCESS`
    Success,
    /// `SUCCESS|<payload>`
    SuccessWith(String),
    /// `ERROR|<reason>`
    Error(ErrorCode),
    /// VIEW_ROOMS result: one newline-terminated line per room. No rooms
    /// means an empty payload.
    RoomList(Vec<RoomSummary>),
    /// An out-of-band broadcast.
    Chat(ChatLine),
}

impl Response {
    /// Renders the frame payload.
    pub fn encode(&self) -> String {
        match self {
            Self::Success => "SUCCESS".to_string(),
            Self::SuccessWith(payload) => {
                format!("SUCCESS{FIELD_DELIMITER}{payload}")
            }
            Self::Error(code) => format!("ERROR{FIELD_DELIMITER}{code}"),
            Self::RoomList(rooms) => {
                rooms.iter().map(|room| format!("{room}\n")).collect()
            }
            Self::Chat(line) => line.to_string(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // Command::decode()
    // =====================================================================

    #[test]
    fn test_decode_login_returns_fields() {
        let cmd = Command::decode("LOGIN|alice|pw1").unwrap();
        assert_eq!(
            cmd,
            Command::Login {
                username: "alice".into(),
                credential: "pw1".into(),
            }
        );
    }

    #[test]
    fn test_decode_credential_keeps_delimiters() {
        let cmd = Command::decode("REGISTER|alice|p|w").unwrap();
        assert_eq!(
            cmd,
            Command::Register {
                username: "alice".into(),
                credential: "p|w".into(),
            }
        );
    }

    #[test]
    fn test_decode_message_text_keeps_delimiters() {
        let cmd = Command::decode("MESSAGE|alice|a|b|c").unwrap();
        assert_eq!(
            cmd,
            Command::Message {
                username: "alice".into(),
                text: "a|b|c".into(),
            }
        );
    }

    #[test]
    fn test_decode_message_empty_text_is_allowed() {
        let cmd = Command::decode("MESSAGE|alice|").unwrap();
        assert!(matches!(cmd, Command::Message { ref text, .. } if text.is_empty()));
    }

    #[test]
    fn test_decode_message_without_text_field_is_missing() {
        let result = Command::decode("MESSAGE|alice");
        assert!(matches!(
            result,
            Err(ProtocolError::MissingField { field: "text", .. })
        ));
    }

    #[test]
    fn test_decode_legacy_verbs_map_to_room_commands() {
        assert!(matches!(
            Command::decode("CREATE_CHATROOM|alice|general").unwrap(),
            Command::CreateRoom { .. }
        ));
        assert!(matches!(
            Command::decode("JOIN_CHATROOM|alice|general").unwrap(),
            Command::JoinRoom { .. }
        ));
        assert_eq!(
            Command::decode("VIEW_CHATROOMS").unwrap(),
            Command::ViewRooms
        );
    }

    #[test]
    fn test_decode_leave_ignores_surplus_fields() {
        // Older clients send the room name along with LEAVE.
        let cmd = Command::decode("LEAVE_CHATROOM|alice|general").unwrap();
        assert_eq!(
            cmd,
            Command::LeaveRoom {
                username: "alice".into()
            }
        );
    }

    #[test]
    fn test_decode_view_rooms_without_fields() {
        assert_eq!(Command::decode("VIEW_ROOMS").unwrap(), Command::ViewRooms);
    }

    #[test]
    fn test_decode_empty_payload_returns_error() {
        assert!(matches!(
            Command::decode(""),
            Err(ProtocolError::EmptyFrame)
        ));
    }

    #[test]
    fn test_decode_unknown_verb_returns_error() {
        assert!(matches!(
            Command::decode("PING|x"),
            Err(ProtocolError::UnknownCommand(v)) if v == "PING"
        ));
    }

    #[test]
    fn test_decode_verb_is_case_sensitive() {
        assert!(matches!(
            Command::decode("login|alice|pw"),
            Err(ProtocolError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_decode_missing_room_returns_error() {
        let result = Command::decode("JOIN_ROOM|alice");
        assert!(matches!(
            result,
            Err(ProtocolError::MissingField {
                command: "JOIN_ROOM",
                field: "room_name"
            })
        ));
    }

    #[test]
    fn test_decode_empty_username_returns_error() {
        let result = Command::decode("LOGOUT|");
        assert!(matches!(
            result,
            Err(ProtocolError::MissingField {
                field: "username",
                ..
            })
        ));
    }

    #[test]
    fn test_decode_username_with_comma_returns_invalid_field() {
        let result = Command::decode("REGISTER|al,ice|pw");
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidField {
                command: "REGISTER",
                field: "username"
            })
        ));
    }

    #[test]
    fn test_decode_room_with_line_break_returns_invalid_field() {
        let result = Command::decode("CREATE_ROOM|alice|gen\neral");
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidField {
                field: "room_name",
                ..
            })
        ));
    }

    #[test]
    fn test_decode_credential_and_text_may_contain_commas() {
        assert_eq!(
            Command::decode("LOGIN|alice|a,b").unwrap(),
            Command::Login {
                username: "alice".into(),
                credential: "a,b".into(),
            }
        );
        assert_eq!(
            Command::decode("MESSAGE|alice|one, two").unwrap(),
            Command::Message {
                username: "alice".into(),
                text: "one, two".into(),
            }
        );
    }

    // =====================================================================
    // Command::encode()
    // =====================================================================

    #[test]
    fn test_encode_joins_fields_with_delimiter() {
        let cmd = Command::JoinRoom {
            username: "bob".into(),
            room: "general".into(),
        };
        assert_eq!(cmd.encode(), "JOIN_ROOM|bob|general");
        assert_eq!(Command::ViewRooms.encode(), "VIEW_ROOMS");
    }

    #[test]
    fn test_encode_message_decodes_to_same_command() {
        let cmd = Command::Message {
            username: "bob".into(),
            text: "pipes | inside".into(),
        };
        assert_eq!(Command::decode(&cmd.encode()).unwrap(), cmd);
    }

    #[test]
    fn test_username_absent_only_for_view_rooms() {
        assert_eq!(Command::ViewRooms.username(), None);
        let cmd = Command::CurrentInfo {
            username: "carol".into(),
        };
        assert_eq!(cmd.username(), Some("carol"));
    }

    // =====================================================================
    // Response::encode()
    // =====================================================================

    #[test]
    fn test_response_success_variants() {
        assert_eq!(Response::Success.encode(), "SUCCESS");
        assert_eq!(
            Response::SuccessWith("general".into()).encode(),
            "SUCCESS|general"
        );
    }

    #[test]
    fn test_response_error_uses_code_name() {
        assert_eq!(
            Response::Error(ErrorCode::BadCredential).encode(),
            "ERROR|BadCredential"
        );
    }

    #[test]
    fn test_response_room_list_one_line_per_room() {
        let rooms = vec![
            RoomSummary {
                name: "general".into(),
                members: vec!["alice".into(), "bob".into()],
            },
            RoomSummary {
                name: "quiet".into(),
                members: vec![],
            },
        ];
        assert_eq!(
            Response::RoomList(rooms).encode(),
            "general|alice,bob\nquiet|\n"
        );
    }

    #[test]
    fn test_response_empty_room_list_is_empty_payload() {
        assert_eq!(Response::RoomList(Vec::new()).encode(), "");
    }

    #[test]
    fn test_response_chat_line_format() {
        let line = ChatLine {
            timestamp: "2024-05-01 12:00:00".into(),
            sender: "alice".into(),
            text: "hi".into(),
        };
        assert_eq!(
            Response::Chat(line).encode(),
            "[2024-05-01 12:00:00] alice: hi"
        );
    }

    #[test]
    fn test_error_code_fatality() {
        assert!(ErrorCode::MalformedFrame.is_fatal());
        assert!(ErrorCode::ConnectionLost.is_fatal());
        assert!(!ErrorCode::NotInRoom.is_fatal());
    }
}
