// ibaAnalyzer .dat codec
// Main library entry point

pub mod core;

// Re-export main types
pub use crate::core::address::AddressMagic;
pub use crate::core::error::{IbaError, Result};
pub use crate::core::format::{Channel, ChannelKind, ChannelRecord, Recording, Run, Sample};
pub use crate::core::options::CodecOptions;
pub use crate::core::reader::{read, read_file, IbaReader};
pub use crate::core::trailer::TrailerHeader;
pub use crate::core::writer::{parse_begin, write, write_file, IbaWriter};
