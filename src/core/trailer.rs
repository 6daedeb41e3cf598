// Text trailer: recording metadata and the channel directory

use chrono::NaiveDateTime;
use std::fmt::Write as _;

use crate::core::constants::*;
use crate::core::error::{IbaError, Result};
use crate::core::format::ChannelRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct TrailerHeader {
    pub begin: NaiveDateTime,
    /// Sampling interval in seconds.
    pub interval: f64,
    pub version: Option<String>,
    pub typ: Option<String>,
    pub frames: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trailer {
    pub header: TrailerHeader,
    pub channels: Vec<ChannelRecord>,
}

/// Shortest plain decimal that reads back to the same value, always with a
/// decimal point. The analyzer does not read exponent notation.
pub fn format_interval(interval: f64) -> String {
    let mut text = interval.to_string();
    if interval.is_finite() && !text.contains('.') {
        text.push_str(".0");
    }
    text
}

fn push_line(out: &mut String, key: &str, value: impl std::fmt::Display) {
    // writing to a String cannot fail
    let _ = write!(out, "{}:{}{}", key, value, LINE_END);
}

impl Trailer {
    pub fn render(&self) -> String {
        let header = &self.header;
        let mut out = String::new();

        push_line(&mut out, KEY_BEGIN_HEADER, "");
        push_line(
            &mut out,
            KEY_STARTTIME,
            format_args!("{}{}", header.begin.format(STARTTIME_FORMAT), STARTTIME_SUFFIX),
        );
        push_line(&mut out, KEY_CLK, format_interval(header.interval));
        if let Some(version) = &header.version {
            push_line(&mut out, KEY_IBA_FILES, version);
        }
        if let Some(typ) = &header.typ {
            push_line(&mut out, KEY_TYP, typ);
        }
        if let Some(frames) = header.frames {
            push_line(&mut out, KEY_FRAMES, frames);
        }
        push_line(&mut out, KEY_END_HEADER, "");

        for channel in &self.channels {
            push_line(&mut out, KEY_BEGIN_CHANNEL, channel.record_index);
            push_line(&mut out, KEY_NAME, &channel.name);
            push_line(
                &mut out,
                KEY_CHANNEL_OFFSET,
                format_args!("{}{:x}", POINTER_PREFIX, channel.entry_pointer),
            );
            if channel.is_digital {
                push_line(&mut out, KEY_DIG_CHANNEL, "");
            }
            push_line(&mut out, KEY_END_CHANNEL, "");
        }

        out
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut parser = TrailerParser::default();
        for line in text.lines() {
            parser.line(line.trim_end_matches('\0'))?;
        }
        parser.finish()
    }
}

#[derive(Default)]
struct PendingHeader {
    begin: Option<NaiveDateTime>,
    interval: Option<f64>,
    version: Option<String>,
    typ: Option<String>,
    frames: Option<u64>,
}

#[derive(Default)]
struct PendingChannel {
    record_index: u32,
    name: Option<String>,
    pointer: Option<u64>,
    is_digital: bool,
}

#[derive(Default, PartialEq)]
enum Section {
    #[default]
    Start,
    Header,
    Directory,
}

#[derive(Default)]
struct TrailerParser {
    section: Section,
    header: PendingHeader,
    current: Option<PendingChannel>,
    channels: Vec<ChannelRecord>,
}

impl TrailerParser {
    fn line(&mut self, line: &str) -> Result<()> {
        let Some((key, value)) = line.split_once(':') else {
            return Ok(());
        };

        match self.section {
            Section::Start => {
                if key == KEY_BEGIN_HEADER {
                    self.section = Section::Header;
                }
            }
            Section::Header => self.header_line(key, value)?,
            Section::Directory => self.directory_line(key, value)?,
        }
        Ok(())
    }

    fn header_line(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            KEY_STARTTIME => self.header.begin = Some(parse_starttime(value)?),
            KEY_CLK => self.header.interval = Some(parse_interval(value)?),
            KEY_IBA_FILES => self.header.version = Some(value.trim().to_string()),
            KEY_TYP => self.header.typ = Some(value.trim().to_string()),
            KEY_FRAMES => {
                let frames = value
                    .trim()
                    .parse()
                    .map_err(|e| IbaError::ParseError(format!("frames {value:?}: {e}")))?;
                self.header.frames = Some(frames);
            }
            KEY_END_HEADER => self.section = Section::Directory,
            _ => {}
        }
        Ok(())
    }

    fn directory_line(&mut self, key: &str, value: &str) -> Result<()> {
        if key == KEY_BEGIN_CHANNEL {
            if self.current.is_some() {
                return Err(IbaError::MissingField(KEY_END_CHANNEL));
            }
            let record_index = value
                .trim()
                .parse()
                .map_err(|e| IbaError::ParseError(format!("beginchannel {value:?}: {e}")))?;
            self.current = Some(PendingChannel {
                record_index,
                ..Default::default()
            });
            return Ok(());
        }

        if key == KEY_END_CHANNEL {
            if let Some(channel) = self.current.take() {
                self.channels.push(ChannelRecord {
                    record_index: channel.record_index,
                    name: channel.name.ok_or(IbaError::MissingField(KEY_NAME))?,
                    entry_pointer: channel
                        .pointer
                        .ok_or(IbaError::MissingField(KEY_CHANNEL_OFFSET))?,
                    is_digital: channel.is_digital,
                });
            }
            return Ok(());
        }

        let Some(channel) = self.current.as_mut() else {
            return Ok(());
        };

        match key {
            KEY_NAME => channel.name = Some(value.to_string()),
            KEY_CHANNEL_OFFSET => channel.pointer = Some(parse_pointer(value)?),
            KEY_DIG_CHANNEL => channel.is_digital = true,
            _ => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<Trailer> {
        match self.section {
            Section::Start => return Err(IbaError::MissingField(KEY_BEGIN_HEADER)),
            Section::Header => return Err(IbaError::MissingField(KEY_END_HEADER)),
            Section::Directory => {}
        }
        if self.current.is_some() {
            return Err(IbaError::MissingField(KEY_END_CHANNEL));
        }

        let header = TrailerHeader {
            begin: self.header.begin.ok_or(IbaError::MissingField(KEY_STARTTIME))?,
            interval: self.header.interval.ok_or(IbaError::MissingField(KEY_CLK))?,
            version: self.header.version,
            typ: self.header.typ,
            frames: self.header.frames,
        };

        Ok(Trailer {
            header,
            channels: self.channels,
        })
    }
}

fn parse_starttime(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, &format!("{}%.f", STARTTIME_FORMAT))
        .map_err(|e| IbaError::ParseError(format!("starttime {value:?}: {e}")))
}

fn parse_interval(value: &str) -> Result<f64> {
    let token = value.split_whitespace().next().unwrap_or_default();
    token
        .parse()
        .map_err(|e| IbaError::ParseError(format!("clk {value:?}: {e}")))
}

fn parse_pointer(value: &str) -> Result<u64> {
    let value = value.trim();
    let hex = value
        .strip_prefix(POINTER_PREFIX)
        .ok_or_else(|| IbaError::ParseError(format!("channel_offset {value:?}")))?;
    u64::from_str_radix(hex, 16)
        .map_err(|e| IbaError::ParseError(format!("channel_offset {value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn begin() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap()
    }

    fn sample_trailer() -> Trailer {
        Trailer {
            header: TrailerHeader {
                begin: begin(),
                interval: 0.01,
                version: Some(IBA_FILES_VERSION.to_string()),
                typ: Some(TYP_ANALOG.to_string()),
                frames: Some(3),
            },
            channels: vec![
                ChannelRecord {
                    record_index: 1,
                    name: "speed".to_string(),
                    entry_pointer: 0x0003_4861_2929_0023,
                    is_digital: false,
                },
                ChannelRecord {
                    record_index: 0x20,
                    name: "motor on".to_string(),
                    entry_pointer: 0x0003_4861_2929_0030,
                    is_digital: true,
                },
            ],
        }
    }

    #[test]
    fn test_render() {
        let text = sample_trailer().render();
        let expected = "beginheader:\r\n\
                        starttime:02.01.2024 03:04:05.0000\r\n\
                        clk:0.01\r\n\
                        ibaFiles:3.2\r\n\
                        typ:real\r\n\
                        frames:3\r\n\
                        endheader:\r\n\
                        beginchannel:1\r\n\
                        name:speed\r\n\
                        channel_offset:O3486129290023\r\n\
                        endchannel:\r\n\
                        beginchannel:32\r\n\
                        name:motor on\r\n\
                        channel_offset:O3486129290030\r\n\
                        digchannel:\r\n\
                        endchannel:\r\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_parse_rendered() {
        let trailer = sample_trailer();
        assert_eq!(Trailer::parse(&trailer.render()).unwrap(), trailer);
    }

    #[test]
    fn test_parse_lf_only_and_unknown_keys() {
        let text = "beginheader:\nstarttime:02.01.2024 03:04:05.1230\nclk:1\nunit:ms\nendheader:\n\
                    beginchannel:4\nname:a\ncomment:x\nchannel_offset:Oabc\nendchannel:\n";
        let trailer = Trailer::parse(text).unwrap();
        assert_eq!(trailer.header.interval, 1.0);
        assert_eq!(trailer.header.frames, None);
        let expected = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_milli_opt(3, 4, 5, 123)
            .unwrap();
        assert_eq!(trailer.header.begin, expected);
        assert_eq!(trailer.channels.len(), 1);
        assert_eq!(trailer.channels[0].record_index, 4);
        assert_eq!(trailer.channels[0].entry_pointer, 0xabc);
        assert!(!trailer.channels[0].is_digital);
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            Trailer::parse("garbage\r\n"),
            Err(IbaError::MissingField(KEY_BEGIN_HEADER))
        ));
        assert!(matches!(
            Trailer::parse("beginheader:\r\nclk:1\r\n"),
            Err(IbaError::MissingField(KEY_END_HEADER))
        ));
        assert!(matches!(
            Trailer::parse("beginheader:\r\nclk:1\r\nendheader:\r\n"),
            Err(IbaError::MissingField(KEY_STARTTIME))
        ));
    }

    #[test]
    fn test_missing_channel_fields() {
        let text = "beginheader:\r\nstarttime:02.01.2024 03:04:05.0000\r\nclk:1\r\nendheader:\r\n\
                    beginchannel:0\r\nname:a\r\nendchannel:\r\n";
        assert!(matches!(
            Trailer::parse(text),
            Err(IbaError::MissingField(KEY_CHANNEL_OFFSET))
        ));

        let unterminated = "beginheader:\r\nstarttime:02.01.2024 03:04:05.0000\r\nclk:1\r\nendheader:\r\n\
                            beginchannel:0\r\nname:a\r\nchannel_offset:O1\r\n";
        assert!(matches!(
            Trailer::parse(unterminated),
            Err(IbaError::MissingField(KEY_END_CHANNEL))
        ));
    }

    #[test]
    fn test_bad_values() {
        let text = "beginheader:\r\nstarttime:2024-01-02\r\nclk:1\r\nendheader:\r\n";
        assert!(matches!(Trailer::parse(text), Err(IbaError::ParseError(_))));

        let text = "beginheader:\r\nstarttime:02.01.2024 03:04:05.0000\r\nclk:fast\r\nendheader:\r\n";
        assert!(matches!(Trailer::parse(text), Err(IbaError::ParseError(_))));
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(0.01), "0.01");
        assert_eq!(format_interval(1.0), "1.0");
        assert_eq!(format_interval(0.001), "0.001");
        assert_eq!(format_interval(1e-5), "0.00001");
        assert_eq!(format_interval(2e7), "20000000.0");
        assert_eq!(parse_interval(&format_interval(1e-5)).unwrap(), 1e-5);
    }
}
