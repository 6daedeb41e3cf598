// Format constants for ibaAnalyzer .dat files

pub const MAGIC: &[u8; 8] = b"PDA2\x3E\xC2\x8F\x9D";

// File header: MAGIC(8) trailer_offset(u32) reserved(20)
pub const RESERVED_SIZE: usize = 20;
pub const HEADER_SIZE: usize = 8 + 4 + RESERVED_SIZE; // 32 bytes

// Chunk header: entry_count(u16) next_offset(u32)
pub const CHUNK_HEADER_SIZE: usize = 2 + 4; // 6 bytes

// Run record: count(u8) followed by a 1-byte marker or an f32
pub const DIGITAL_RUN_SIZE: usize = 1 + 1;
pub const ANALOG_RUN_SIZE: usize = 1 + 4;

pub const DIGITAL_TRUE: u8 = 0xC0;
pub const DIGITAL_FALSE: u8 = 0x40;

pub const DEFAULT_MAX_RUN: u8 = u8::MAX;
pub const DEFAULT_MAX_CHUNK: u16 = 5000;

// Trailer
pub const LINE_END: &str = "\r\n";
pub const IBA_FILES_VERSION: &str = "3.2";
pub const TYP_DIGITAL: &str = "int16";
pub const TYP_ANALOG: &str = "real";
pub const STARTTIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S";
pub const STARTTIME_SUFFIX: &str = ".0000";
pub const POINTER_PREFIX: char = 'O';

pub const KEY_BEGIN_HEADER: &str = "beginheader";
pub const KEY_END_HEADER: &str = "endheader";
pub const KEY_STARTTIME: &str = "starttime";
pub const KEY_CLK: &str = "clk";
pub const KEY_IBA_FILES: &str = "ibaFiles";
pub const KEY_TYP: &str = "typ";
pub const KEY_FRAMES: &str = "frames";
pub const KEY_BEGIN_CHANNEL: &str = "beginchannel";
pub const KEY_NAME: &str = "name";
pub const KEY_CHANNEL_OFFSET: &str = "channel_offset";
pub const KEY_DIG_CHANNEL: &str = "digchannel";
pub const KEY_END_CHANNEL: &str = "endchannel";
