// Data structures for the .dat format

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::core::constants::{ANALOG_RUN_SIZE, DIGITAL_RUN_SIZE};
use crate::core::error::{IbaError, Result};

/// One sample of a channel. JSON booleans map to digital samples, numbers to
/// analog samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sample {
    Digital(bool),
    Analog(f32),
}

impl Sample {
    pub fn kind(&self) -> ChannelKind {
        match self {
            Sample::Digital(_) => ChannelKind::Digital,
            Sample::Analog(_) => ChannelKind::Analog,
        }
    }
}

impl From<bool> for Sample {
    fn from(value: bool) -> Self {
        Sample::Digital(value)
    }
}

impl From<f32> for Sample {
    fn from(value: f32) -> Self {
        Sample::Analog(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Analog,
    Digital,
}

impl ChannelKind {
    pub fn is_digital(self) -> bool {
        self == ChannelKind::Digital
    }

    /// On-disk size of one run record.
    pub fn run_size(self) -> usize {
        match self {
            ChannelKind::Digital => DIGITAL_RUN_SIZE,
            ChannelKind::Analog => ANALOG_RUN_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub name: String,
    pub samples: Vec<Sample>,
}

impl Channel {
    pub fn new(name: impl Into<String>, samples: Vec<Sample>) -> Self {
        Self {
            name: name.into(),
            samples,
        }
    }

    pub fn digital(name: impl Into<String>, values: impl IntoIterator<Item = bool>) -> Self {
        Self::new(name, values.into_iter().map(Sample::Digital).collect())
    }

    pub fn analog(name: impl Into<String>, values: impl IntoIterator<Item = f32>) -> Self {
        Self::new(name, values.into_iter().map(Sample::Analog).collect())
    }

    /// Kind of the channel, taken from its first sample. Fails on empty or
    /// mixed channels.
    pub fn kind(&self) -> Result<ChannelKind> {
        let first = self
            .samples
            .first()
            .ok_or_else(|| IbaError::EmptyChannel(self.name.clone()))?;
        let kind = first.kind();

        if let Some(index) = self.samples.iter().position(|s| s.kind() != kind) {
            return Err(IbaError::MixedSampleTypes {
                channel: self.name.clone(),
                index,
            });
        }

        Ok(kind)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub begin: NaiveDateTime,
    /// Sampling interval in seconds.
    pub interval: f64,
    pub channels: Vec<Channel>,
}

impl Recording {
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Run<T> {
    pub count: u8,
    pub value: T,
}

impl<T> Run<T> {
    pub fn new(count: u8, value: T) -> Self {
        Self { count, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub entry_count: u16,
    /// Offset of the next chunk of the same channel, 0 for the last one.
    pub next_offset: u32,
}

/// Directory entry of a channel as stored in the trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    pub record_index: u32,
    pub name: String,
    /// Obfuscated pointer to the first chunk.
    pub entry_pointer: u64,
    pub is_digital: bool,
}

/// Analyzer channel numbering: the position in the caller's channel order
/// with bit 5 reserved for the digital flag.
pub fn record_index(position: u32, is_digital: bool) -> u32 {
    let digital_bit = if is_digital { 0x20 } else { 0 };
    (position + (position & 0xFFE0)) | digital_bit
}

/// Inverse of [`record_index`].
pub fn record_position(record_index: u32, is_digital: bool) -> u32 {
    let index = if is_digital {
        record_index & !0x20
    } else {
        record_index
    };
    (index & 0x1F) | ((index >> 1) & !0x1F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_index_small_positions() {
        assert_eq!(record_index(0, false), 0);
        assert_eq!(record_index(3, false), 3);
        assert_eq!(record_index(0, true), 0x20);
        assert_eq!(record_index(5, true), 0x25);
    }

    #[test]
    fn test_record_index_skips_digital_block() {
        // positions past 31 are shifted so they never collide with bit 5
        assert_eq!(record_index(31, false), 31);
        assert_eq!(record_index(32, false), 64);
        assert_eq!(record_index(33, true), 0x61);
        assert_eq!(record_index(64, false), 128);
    }

    #[test]
    fn test_record_position_inverts_index() {
        for position in 0..300 {
            for digital in [false, true] {
                assert_eq!(record_position(record_index(position, digital), digital), position);
            }
        }
    }

    #[test]
    fn test_channel_kind() {
        assert_eq!(
            Channel::digital("d", [true, false]).kind().unwrap(),
            ChannelKind::Digital
        );
        assert_eq!(
            Channel::analog("a", [1.0, 2.0]).kind().unwrap(),
            ChannelKind::Analog
        );
    }

    #[test]
    fn test_channel_kind_rejects_mixed() {
        let channel = Channel::new("m", vec![Sample::Analog(1.0), Sample::Digital(true)]);
        match channel.kind() {
            Err(IbaError::MixedSampleTypes { channel, index }) => {
                assert_eq!(channel, "m");
                assert_eq!(index, 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_channel_kind_rejects_empty() {
        let channel = Channel::new("e", Vec::new());
        assert!(matches!(channel.kind(), Err(IbaError::EmptyChannel(name)) if name == "e"));
    }

    #[test]
    fn test_sample_json() {
        let samples: Vec<Sample> = serde_json::from_str("[true, 1, 2.5, false]").unwrap();
        assert_eq!(
            samples,
            vec![
                Sample::Digital(true),
                Sample::Analog(1.0),
                Sample::Analog(2.5),
                Sample::Digital(false),
            ]
        );
    }
}
