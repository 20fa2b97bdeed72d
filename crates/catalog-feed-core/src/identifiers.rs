use std::fmt;
use std::str::FromStr;

use crate::error::{ExportError, Result};

/// Leading digit of every channel-scoped identifier. Keeps the encoded value the same
/// length when the downstream service reads it back as an integer.
pub const CHANNEL_MARKER: char = '1';

/// Number of zero-padded digits reserved for the channel id.
pub const CHANNEL_WIDTH: usize = 4;

/// Largest channel id that fits in [`CHANNEL_WIDTH`] digits.
pub const MAX_CHANNEL_ID: u32 = 9_999;

/// Entity id as presented to the downstream merchandising service.
///
/// Channel `0` means "no channel scoping": the external form is the bare entity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExternalId {
    channel_id: u32,
    entity_id: u64,
}

impl ExternalId {
    pub fn new(channel_id: u32, entity_id: u64) -> Result<Self> {
        ensure_channel_in_range(channel_id)?;
        Ok(Self {
            channel_id,
            entity_id,
        })
    }

    pub fn unscoped(entity_id: u64) -> Self {
        Self {
            channel_id: 0,
            entity_id,
        }
    }

    pub fn channel_id(&self) -> u32 {
        self.channel_id
    }

    pub fn entity_id(&self) -> u64 {
        self.entity_id
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.channel_id == 0 {
            return write!(f, "{}", self.entity_id);
        }
        write!(
            f,
            "{CHANNEL_MARKER}{:0width$}{}",
            self.channel_id,
            self.entity_id,
            width = CHANNEL_WIDTH
        )
    }
}

impl FromStr for ExternalId {
    type Err = ExportError;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ExportError::MalformedIdentifier(value.to_string()));
        }

        let parse_entity = |digits: &str| {
            digits
                .parse::<u64>()
                .map_err(|_| ExportError::MalformedIdentifier(value.to_string()))
        };

        let scoped_len = CHANNEL_MARKER.len_utf8() + CHANNEL_WIDTH;
        if trimmed.len() > scoped_len && trimmed.starts_with(CHANNEL_MARKER) {
            let channel_digits = &trimmed[CHANNEL_MARKER.len_utf8()..scoped_len];
            let channel_id = channel_digits
                .parse::<u32>()
                .map_err(|_| ExportError::MalformedIdentifier(value.to_string()))?;
            // A zero channel field is never produced by encoding, so the value is a bare id.
            if channel_id != 0 {
                return Ok(Self {
                    channel_id,
                    entity_id: parse_entity(&trimmed[scoped_len..])?,
                });
            }
        }

        Ok(Self::unscoped(parse_entity(trimmed)?))
    }
}

/// Channel-scoped external identifier for an internal entity id.
pub fn encode(channel_id: u32, entity_id: u64) -> Result<String> {
    Ok(ExternalId::new(channel_id, entity_id)?.to_string())
}

/// Recovers the channel id an external identifier was encoded with.
pub fn decode_channel(external: &str) -> Result<u32> {
    Ok(external.parse::<ExternalId>()?.channel_id())
}

/// Recovers the internal entity id an external identifier was encoded with.
pub fn decode_entity(external: &str) -> Result<u64> {
    Ok(external.parse::<ExternalId>()?.entity_id())
}

pub fn ensure_channel_in_range(channel_id: u32) -> Result<()> {
    if channel_id > MAX_CHANNEL_ID {
        return Err(ExportError::IdentifierRange {
            channel_id,
            max: MAX_CHANNEL_ID,
        });
    }
    Ok(())
}
