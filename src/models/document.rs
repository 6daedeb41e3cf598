use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use iba_dat::{parse_begin, Channel, Recording, Sample};

const BEGIN_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

// JSON has no literal for non-finite numbers
const NAN: &str = "NaN";
const INFINITY: &str = "Infinity";
const NEG_INFINITY: &str = "-Infinity";

fn sample_to_value(sample: Sample) -> Value {
    match sample {
        Sample::Digital(value) => Value::Bool(value),
        Sample::Analog(value) if value.is_nan() => Value::from(NAN),
        Sample::Analog(value) if value.is_infinite() => {
            Value::from(if value > 0.0 { INFINITY } else { NEG_INFINITY })
        }
        // go through the shortest f32 text so 0.1 stays 0.1 instead of
        // 0.10000000149011612
        Sample::Analog(value) => value
            .to_string()
            .parse::<f64>()
            .map_or(Value::Null, Value::from),
    }
}

fn sample_from_value(value: &Value) -> Option<Sample> {
    let sample = match value {
        Value::Bool(value) => Sample::Digital(*value),
        Value::Number(number) => Sample::Analog(number.as_f64()? as f32),
        Value::String(text) => match text.as_str() {
            NAN => Sample::Analog(f32::NAN),
            INFINITY => Sample::Analog(f32::INFINITY),
            NEG_INFINITY => Sample::Analog(f32::NEG_INFINITY),
            _ => return None,
        },
        Value::Null => Sample::Analog(f32::NAN),
        _ => return None,
    };
    Some(sample)
}

/// JSON form of a recording: `[begin, interval, {name: [samples...]}]`.
///
/// `begin` is an ISO-8601 string or null (meaning "now"). Channel order is
/// the order of the object's keys. Non-finite analog samples are written as
/// `"NaN"`, `"Infinity"` and `"-Infinity"`; `null` also reads back as NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingDocument(pub Option<String>, pub f64, pub Map<String, Value>);

impl RecordingDocument {
    pub fn begin(&self) -> Result<Option<NaiveDateTime>> {
        self.0
            .as_deref()
            .map(parse_begin)
            .transpose()
            .context("Invalid begin timestamp")
    }

    pub fn interval(&self) -> f64 {
        self.1
    }

    pub fn channels(&self) -> Result<Vec<Channel>> {
        self.2
            .iter()
            .map(|(name, values)| {
                let Some(values) = values.as_array() else {
                    bail!("Channel {name:?} must be a list of samples");
                };
                let samples = values
                    .iter()
                    .enumerate()
                    .map(|(index, value)| {
                        sample_from_value(value).with_context(|| {
                            format!("Channel {name:?}: sample {index} is not a boolean or number")
                        })
                    })
                    .collect::<Result<Vec<Sample>>>()?;
                Ok(Channel::new(name.clone(), samples))
            })
            .collect()
    }

    pub fn from_recording(recording: &Recording) -> Result<Self> {
        let mut channels = Map::new();
        for channel in &recording.channels {
            let samples = channel.samples.iter().copied().map(sample_to_value).collect();
            channels.insert(channel.name.clone(), Value::Array(samples));
        }

        Ok(Self(
            Some(recording.begin.format(BEGIN_FORMAT).to_string()),
            recording.interval,
            channels,
        ))
    }
}
