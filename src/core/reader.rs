// .dat reader: trailer directory first, then chunk chains on demand

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, info};

use crate::core::address;
use crate::core::compression::expand_into;
use crate::core::constants::*;
use crate::core::error::{IbaError, Result};
use crate::core::format::*;
use crate::core::trailer::{Trailer, TrailerHeader};

pub struct IbaReader<R: Read + Seek> {
    source: R,
    trailer_offset: u64,
    trailer: Trailer,
}

impl IbaReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> IbaReader<R> {
    pub fn new(mut source: R) -> Result<Self> {
        let trailer_offset = Self::read_header(&mut source)? as u64;
        let trailer = Self::read_trailer(&mut source, trailer_offset)?;

        info!(
            "Opened recording with {} channels, trailer at {:#x}",
            trailer.channels.len(),
            trailer_offset
        );

        Ok(Self {
            source,
            trailer_offset,
            trailer,
        })
    }

    fn read_header(source: &mut R) -> Result<u32> {
        let mut prefix = [0u8; 12];
        source.seek(SeekFrom::Start(0))?;
        source.read_exact(&mut prefix)?;

        let magic = &prefix[0..8];
        if magic != MAGIC {
            return Err(IbaError::InvalidMagic {
                expected: MAGIC.to_vec(),
                got: magic.to_vec(),
            });
        }

        Ok(u32::from_le_bytes([prefix[8], prefix[9], prefix[10], prefix[11]]))
    }

    fn read_trailer(source: &mut R, trailer_offset: u64) -> Result<Trailer> {
        let end = source.seek(SeekFrom::End(0))?;
        if trailer_offset < HEADER_SIZE as u64 || trailer_offset > end {
            return Err(IbaError::CorruptedData(format!(
                "trailer offset {:#x} outside file of {} bytes",
                trailer_offset, end
            )));
        }

        source.seek(SeekFrom::Start(trailer_offset))?;
        let mut raw = Vec::new();
        source.read_to_end(&mut raw)?;

        // vendor trailers may carry Windows-1252 text in fields we skip
        let text = String::from_utf8_lossy(&raw);
        Trailer::parse(&text)
    }

    pub fn header(&self) -> &TrailerHeader {
        &self.trailer.header
    }

    /// Channel directory in file order (analog channels first).
    pub fn list_channels(&self) -> &[ChannelRecord] {
        &self.trailer.channels
    }

    pub fn channel_record(&self, name: &str) -> Option<&ChannelRecord> {
        self.trailer.channels.iter().find(|record| record.name == name)
    }

    fn find_record(&self, name: &str) -> Result<ChannelRecord> {
        self.channel_record(name)
            .cloned()
            .ok_or_else(|| IbaError::ChannelNotFound(name.to_string()))
    }

    /// Runs of every chunk in the channel's chain, one entry per chunk.
    pub fn read_channel_chunks(&mut self, name: &str) -> Result<Vec<Vec<Run<Sample>>>> {
        let record = self.find_record(name)?;
        let mut chunks = Vec::new();
        self.walk_chain(&record, |runs| chunks.push(runs))?;
        Ok(chunks)
    }

    pub fn read_channel(&mut self, name: &str) -> Result<Channel> {
        let record = self.find_record(name)?;
        self.read_record(&record)
    }

    /// Reads every channel and restores the channel order the file was
    /// written with.
    pub fn read_all(&mut self) -> Result<Recording> {
        let mut records = self.trailer.channels.clone();
        records.sort_by_key(|record| record_position(record.record_index, record.is_digital));

        let mut channels = Vec::with_capacity(records.len());
        for record in &records {
            channels.push(self.read_record(record)?);
        }

        Ok(Recording {
            begin: self.trailer.header.begin,
            interval: self.trailer.header.interval,
            channels,
        })
    }

    fn read_record(&mut self, record: &ChannelRecord) -> Result<Channel> {
        let mut samples = Vec::new();
        self.walk_chain(record, |runs| expand_into(&runs, &mut samples))?;
        Ok(Channel::new(record.name.clone(), samples))
    }

    fn walk_chain<F>(&mut self, record: &ChannelRecord, mut visit: F) -> Result<()>
    where
        F: FnMut(Vec<Run<Sample>>),
    {
        let kind = if record.is_digital {
            ChannelKind::Digital
        } else {
            ChannelKind::Analog
        };

        let mut offset = address::decode(record.entry_pointer) as u64;
        let mut visited = HashSet::new();
        let mut chunk_count = 0usize;

        while offset != 0 {
            if !visited.insert(offset) {
                return Err(IbaError::CorruptedData(format!(
                    "chunk chain of {:?} loops back to {:#x}",
                    record.name, offset
                )));
            }

            let (runs, next_offset) = self.read_chunk_at(offset, kind)?;
            visit(runs);
            chunk_count += 1;
            offset = next_offset as u64;
        }

        debug!("Channel {:?}: {} chunks", record.name, chunk_count);
        Ok(())
    }

    fn check_span(&self, offset: u64, len: u64) -> Result<()> {
        if offset < HEADER_SIZE as u64 || offset + len > self.trailer_offset {
            return Err(IbaError::CorruptedData(format!(
                "{} bytes at {:#x} lie outside the data area",
                len, offset
            )));
        }
        Ok(())
    }

    fn read_chunk_at(&mut self, offset: u64, kind: ChannelKind) -> Result<(Vec<Run<Sample>>, u32)> {
        self.check_span(offset, CHUNK_HEADER_SIZE as u64)?;
        self.source.seek(SeekFrom::Start(offset))?;

        let mut header_buf = [0u8; CHUNK_HEADER_SIZE];
        self.source.read_exact(&mut header_buf)?;
        let header = ChunkHeader {
            entry_count: u16::from_le_bytes([header_buf[0], header_buf[1]]),
            next_offset: u32::from_le_bytes([
                header_buf[2],
                header_buf[3],
                header_buf[4],
                header_buf[5],
            ]),
        };

        let run_size = kind.run_size();
        let body_len = header.entry_count as usize * run_size;
        self.check_span(offset + CHUNK_HEADER_SIZE as u64, body_len as u64)?;

        let mut body = vec![0u8; body_len];
        self.source.read_exact(&mut body)?;

        let runs = body
            .chunks_exact(run_size)
            .map(|record| {
                let value = match kind {
                    ChannelKind::Digital => Sample::Digital(record[1] == DIGITAL_TRUE),
                    ChannelKind::Analog => Sample::Analog(f32::from_le_bytes([
                        record[1], record[2], record[3], record[4],
                    ])),
                };
                Run::new(record[0], value)
            })
            .collect();

        Ok((runs, header.next_offset))
    }
}

/// Reads a complete recording from `source`.
pub fn read<R: Read + Seek>(source: R) -> Result<Recording> {
    IbaReader::new(source)?.read_all()
}

pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Recording> {
    IbaReader::open(path)?.read_all()
}
