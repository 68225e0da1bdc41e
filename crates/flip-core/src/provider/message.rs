//! Stream protocol message types
//!
//! JSON messages exchanged with the flag stream service over WebSocket.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::flag::{Context, FlagValue};

/// Messages sent to the stream service
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Announce the client key and evaluation context
    ///
    /// The service answers with a `put` carrying the full flag set for
    /// that context. Sent again whenever the context changes.
    #[serde(rename = "identify")]
    Identify {
        #[serde(rename = "clientKey")]
        client_key: String,
        context: Context,
    },
}

/// Messages received from the stream service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Full flag set; replaces everything known so far
    #[serde(rename = "put")]
    Put { flags: HashMap<String, FlagValue> },

    /// Incremental update to a single flag
    #[serde(rename = "patch")]
    Patch { key: String, value: FlagValue },
}

impl ClientMessage {
    /// Create an identify message
    pub fn identify(client_key: &str, context: Context) -> Self {
        ClientMessage::Identify {
            client_key: client_key.to_string(),
            context,
        }
    }

    /// Encode message to a JSON text frame
    pub fn encode(&self) -> String {
        serde_json::to_string(self).expect("JSON encoding failed")
    }
}

impl ServerMessage {
    /// Decode message from a JSON text frame
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
