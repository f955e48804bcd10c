//! # Wire Messages
//!
//! Closed set of avalanche peering messages. Each frame is a one-byte
//! [`MessageKind`] tag followed by the bincode body.
//!
//! | Tag  | Command    | Body                          |
//! |------|------------|-------------------------------|
//! | 0x01 | `avahello` | delegation + signature        |
//! | 0x02 | `inv`      | proof id                      |
//! | 0x03 | `getdata`  | proof id                      |
//! | 0x04 | `avaproof` | serialized proof              |

pub mod codec;

use crate::domain::{AvalancheError, Hello, Proof, ProofId};

/// Message tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    Hello = 0x01,
    Inv = 0x02,
    GetData = 0x03,
    Proof = 0x04,
}

impl MessageKind {
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(Self::Hello),
            0x02 => Some(Self::Inv),
            0x03 => Some(Self::GetData),
            0x04 => Some(Self::Proof),
            _ => None,
        }
    }

    /// P2P command name.
    pub fn command(&self) -> &'static str {
        match self {
            Self::Hello => "avahello",
            Self::Inv => "inv",
            Self::GetData => "getdata",
            Self::Proof => "avaproof",
        }
    }
}

/// Avalanche peering message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvalancheMessage {
    Hello(Hello),
    Inv { proof_id: ProofId },
    GetData { proof_id: ProofId },
    ProofPayload { proof: Proof },
}

impl AvalancheMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Hello(_) => MessageKind::Hello,
            Self::Inv { .. } => MessageKind::Inv,
            Self::GetData { .. } => MessageKind::GetData,
            Self::ProofPayload { .. } => MessageKind::Proof,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, AvalancheError> {
        let body = match self {
            Self::Hello(hello) => codec::encode(hello),
            Self::Inv { proof_id } | Self::GetData { proof_id } => codec::encode(proof_id),
            Self::ProofPayload { proof } => codec::encode(proof),
        }
        .map_err(|e| AvalancheError::Codec(e.to_string()))?;

        let mut frame = Vec::with_capacity(body.len() + 1);
        frame.push(self.kind() as u8);
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    pub fn decode(frame: &[u8]) -> Result<Self, AvalancheError> {
        let (&tag, body) = frame
            .split_first()
            .ok_or_else(|| AvalancheError::Codec("empty frame".into()))?;
        let kind = MessageKind::from_u8(tag)
            .ok_or_else(|| AvalancheError::Codec(format!("unknown message tag {:#04x}", tag)))?;
        let codec_err = |e: bincode::Error| AvalancheError::Codec(e.to_string());

        Ok(match kind {
            MessageKind::Hello => Self::Hello(codec::decode(body).map_err(codec_err)?),
            MessageKind::Inv => Self::Inv {
                proof_id: codec::decode(body).map_err(codec_err)?,
            },
            MessageKind::GetData => Self::GetData {
                proof_id: codec::decode(body).map_err(codec_err)?,
            },
            MessageKind::Proof => Self::ProofPayload {
                proof: codec::decode(body).map_err(codec_err)?,
            },
        })
    }
}
