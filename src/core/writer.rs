// .dat writer: chunk chains followed by the text trailer

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::core::address::{self, MAX_OFFSET};
use crate::core::compression::{compress, RunChunks};
use crate::core::constants::*;
use crate::core::error::{IbaError, Result};
use crate::core::format::*;
use crate::core::options::CodecOptions;
use crate::core::trailer::{Trailer, TrailerHeader};

/// Parses an ISO-8601 start time. Offsets are dropped; the local wall-clock
/// time is what ends up in the file.
pub fn parse_begin(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| IbaError::ParseError(format!("begin {text:?} is not an ISO-8601 timestamp")))
}

/// Layout of one channel, computed before anything is written.
struct ChannelPlan<'a> {
    channel: &'a Channel,
    kind: ChannelKind,
    record_index: u32,
    /// Run count of every chunk in the chain.
    chunk_runs: Vec<usize>,
    frames: u64,
    entry_offset: u32,
}

impl ChannelPlan<'_> {
    fn chunk_size(&self, runs: usize) -> u64 {
        (CHUNK_HEADER_SIZE + runs * self.kind.run_size()) as u64
    }

    fn chain_size(&self) -> u64 {
        self.chunk_runs.iter().map(|&runs| self.chunk_size(runs)).sum()
    }
}

pub struct IbaWriter<W: Write> {
    writer: W,
    options: CodecOptions,
}

impl IbaWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> IbaWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            options: CodecOptions::default(),
        }
    }

    pub fn with_options(writer: W, options: CodecOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { writer, options })
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn write_recording(&mut self, recording: &Recording) -> Result<()> {
        self.write(Some(recording.begin), recording.interval, &recording.channels)
    }

    /// Writes a complete file. `begin` defaults to the current local time.
    ///
    /// Nothing is written when the channels fail validation or the layout
    /// does not fit the addressing scheme.
    pub fn write(
        &mut self,
        begin: Option<NaiveDateTime>,
        interval: f64,
        channels: &[Channel],
    ) -> Result<()> {
        let mut plans = self.plan(channels)?;

        // the analyzer expects every analog channel before the digital ones
        plans.sort_by_key(|plan| plan.kind.is_digital());

        let trailer_offset = Self::assign_offsets(&mut plans)?;

        self.writer.write_all(MAGIC)?;
        self.writer.write_all(&trailer_offset.to_le_bytes())?;
        self.writer.write_all(&[0u8; RESERVED_SIZE])?;

        for plan in &plans {
            self.write_chain(plan)?;
        }

        let begin = begin.unwrap_or_else(|| Local::now().naive_local());
        let trailer = self.build_trailer(begin, interval, &plans);
        self.writer.write_all(trailer.render().as_bytes())?;
        self.writer.flush()?;

        info!(
            "Wrote {} channels, trailer at {:#x}",
            plans.len(),
            trailer_offset
        );
        Ok(())
    }

    fn plan<'a>(&self, channels: &'a [Channel]) -> Result<Vec<ChannelPlan<'a>>> {
        if channels.is_empty() {
            return Err(IbaError::EmptyRecording);
        }

        let mut names = HashSet::with_capacity(channels.len());
        let mut plans = Vec::with_capacity(channels.len());
        for (position, channel) in channels.iter().enumerate() {
            if channel.name.contains(['\r', '\n']) {
                return Err(IbaError::InvalidChannelName(channel.name.clone()));
            }
            // readers look channels up by name
            if !names.insert(channel.name.as_str()) {
                return Err(IbaError::DuplicateChannel(channel.name.clone()));
            }
            let kind = channel.kind()?;

            let mut chunk_runs = Vec::new();
            let mut frames = 0u64;
            for runs in self.compress(channel) {
                frames += runs.iter().map(|run| run.count as u64).sum::<u64>();
                chunk_runs.push(runs.len());
            }

            plans.push(ChannelPlan {
                channel,
                kind,
                record_index: record_index(position as u32, kind.is_digital()),
                chunk_runs,
                frames,
                entry_offset: 0,
            });
        }

        Ok(plans)
    }

    /// Places every chain after the file header and returns the trailer
    /// offset.
    fn assign_offsets(plans: &mut [ChannelPlan<'_>]) -> Result<u32> {
        let mut offset = HEADER_SIZE as u64;

        for plan in plans.iter_mut() {
            if offset >= MAX_OFFSET as u64 {
                return Err(IbaError::OffsetOutOfRange(offset));
            }
            plan.entry_offset = offset as u32;
            offset += plan.chain_size();
        }

        u32::try_from(offset).map_err(|_| IbaError::OffsetOutOfRange(offset))
    }

    fn compress<'a>(&self, channel: &'a Channel) -> RunChunks<'a, Sample> {
        compress(
            &channel.samples,
            self.options.max_run,
            self.options.max_chunk as usize,
        )
    }

    fn write_chain(&mut self, plan: &ChannelPlan<'_>) -> Result<()> {
        let chunk_count = plan.chunk_runs.len();
        let mut offset = plan.entry_offset as u64;
        let mut buf = Vec::new();

        debug!(
            "Channel {:?}: {:?}, {} chunks at {:#x}",
            plan.channel.name, plan.kind, chunk_count, plan.entry_offset
        );

        for (i, runs) in self.compress(plan.channel).enumerate() {
            offset += plan.chunk_size(runs.len());
            let header = ChunkHeader {
                entry_count: runs.len() as u16,
                next_offset: if i + 1 < chunk_count { offset as u32 } else { 0 },
            };

            buf.clear();
            buf.extend_from_slice(&header.entry_count.to_le_bytes());
            buf.extend_from_slice(&header.next_offset.to_le_bytes());
            for run in &runs {
                buf.push(run.count);
                match run.value {
                    Sample::Digital(true) => buf.push(DIGITAL_TRUE),
                    Sample::Digital(false) => buf.push(DIGITAL_FALSE),
                    Sample::Analog(value) => buf.extend_from_slice(&value.to_le_bytes()),
                }
            }
            self.writer.write_all(&buf)?;
        }

        Ok(())
    }

    fn build_trailer(&self, begin: NaiveDateTime, interval: f64, plans: &[ChannelPlan<'_>]) -> Trailer {
        let all_digital = plans.iter().all(|plan| plan.kind.is_digital());
        let typ = if all_digital { TYP_DIGITAL } else { TYP_ANALOG };

        let channels = plans
            .iter()
            .map(|plan| ChannelRecord {
                record_index: plan.record_index,
                name: plan.channel.name.clone(),
                entry_pointer: address::encode(plan.entry_offset, self.options.address_magic),
                is_digital: plan.kind.is_digital(),
            })
            .collect();

        Trailer {
            header: TrailerHeader {
                begin,
                interval,
                version: Some(IBA_FILES_VERSION.to_string()),
                typ: Some(typ.to_string()),
                frames: plans.first().map(|plan| plan.frames),
            },
            channels,
        }
    }
}

/// Writes `channels` to `writer` with the default options.
pub fn write<W: Write>(
    writer: W,
    begin: Option<NaiveDateTime>,
    interval: f64,
    channels: &[Channel],
) -> Result<()> {
    IbaWriter::new(writer).write(begin, interval, channels)
}

pub fn write_file<P: AsRef<Path>>(
    path: P,
    begin: Option<NaiveDateTime>,
    interval: f64,
    channels: &[Channel],
) -> Result<()> {
    IbaWriter::create(path)?.write(begin, interval, channels)
}
