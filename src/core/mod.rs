pub mod address;
pub mod compression;
pub mod constants;
pub mod error;
pub mod format;
pub mod options;
pub mod reader;
pub mod trailer;
pub mod writer;
