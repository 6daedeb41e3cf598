// Run-length coding of sample streams

use crate::core::format::{Run, Sample};

/// Equality used to decide whether a sample extends the current run.
///
/// Floats compare by bit pattern so that NaN runs are kept together.
pub trait RunValue: Copy {
    fn same_value(&self, other: &Self) -> bool;
}

impl RunValue for bool {
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl RunValue for f32 {
    fn same_value(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl RunValue for Sample {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Sample::Digital(a), Sample::Digital(b)) => a.same_value(b),
            (Sample::Analog(a), Sample::Analog(b)) => a.same_value(b),
            _ => false,
        }
    }
}

/// Lazily splits `samples` into runs of at most `max_run` repetitions,
/// grouped into chunk contents of at most `max_chunk` runs.
///
/// The iterator borrows the input, so calling `compress` again on the same
/// slice starts over from the beginning. Limits of zero are treated as one.
pub fn compress<T: RunValue>(samples: &[T], max_run: u8, max_chunk: usize) -> RunChunks<'_, T> {
    RunChunks {
        samples,
        pos: 0,
        max_run: max_run.max(1),
        max_chunk: max_chunk.max(1),
    }
}

#[derive(Debug, Clone)]
pub struct RunChunks<'a, T> {
    samples: &'a [T],
    pos: usize,
    max_run: u8,
    max_chunk: usize,
}

impl<'a, T: RunValue> RunChunks<'a, T> {
    fn next_run(&mut self) -> Option<Run<T>> {
        let value = *self.samples.get(self.pos)?;
        let count = self.samples[self.pos..]
            .iter()
            .take(self.max_run as usize)
            .take_while(|s| s.same_value(&value))
            .count();
        self.pos += count;
        // count is in 1..=max_run
        Some(Run::new(count as u8, value))
    }
}

impl<'a, T: RunValue> Iterator for RunChunks<'a, T> {
    type Item = Vec<Run<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.samples.len() {
            return None;
        }

        let mut runs = Vec::new();
        while runs.len() < self.max_chunk {
            match self.next_run() {
                Some(run) => runs.push(run),
                None => break,
            }
        }

        Some(runs)
    }
}

/// Appends `count` copies of every run value to `out`.
pub fn expand_into<T: Copy>(runs: &[Run<T>], out: &mut Vec<T>) {
    for run in runs {
        out.extend(std::iter::repeat(run.value).take(run.count as usize));
    }
}

/// Inverse of [`compress`]: concatenates the expansion of every chunk.
pub fn decompress<T, I, C>(chunks: I) -> Vec<T>
where
    T: Copy,
    I: IntoIterator<Item = C>,
    C: AsRef<[Run<T>]>,
{
    let mut out = Vec::new();
    for chunk in chunks {
        expand_into(chunk.as_ref(), &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::{DEFAULT_MAX_CHUNK, DEFAULT_MAX_RUN};

    fn chunks<T: RunValue>(samples: &[T]) -> Vec<Vec<Run<T>>> {
        compress(samples, DEFAULT_MAX_RUN, DEFAULT_MAX_CHUNK as usize).collect()
    }

    #[test]
    fn test_compress_empty() {
        let samples: [bool; 0] = [];
        assert!(chunks(&samples).is_empty());
    }

    #[test]
    fn test_compress_digital_example() {
        let result = chunks(&[true, true, false]);
        assert_eq!(result, vec![vec![Run::new(2, true), Run::new(1, false)]]);
    }

    #[test]
    fn test_long_constant_splits_at_max_run() {
        let samples = vec![7.5f32; 600];
        let result = chunks(&samples);
        assert_eq!(
            result,
            vec![vec![Run::new(255, 7.5), Run::new(255, 7.5), Run::new(90, 7.5)]]
        );
        assert_eq!(decompress::<f32, _, _>(&result), samples);
    }

    #[test]
    fn test_chunk_capping() {
        // alternating values give one run per sample
        let samples: Vec<bool> = (0..12_001).map(|i| i % 2 == 0).collect();
        let result = chunks(&samples);
        let sizes: Vec<usize> = result.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![5000, 5000, 2001]);
        assert_eq!(decompress::<bool, _, _>(&result), samples);
    }

    #[test]
    fn test_small_limits() {
        let samples = [1.0f32, 1.0, 1.0, 2.0, 3.0, 3.0];
        let result: Vec<_> = compress(&samples, 2, 2).collect();
        assert_eq!(
            result,
            vec![
                vec![Run::new(2, 1.0), Run::new(1, 1.0)],
                vec![Run::new(1, 2.0), Run::new(2, 3.0)],
            ]
        );
    }

    #[test]
    fn test_compress_is_restartable() {
        let samples = [true, false, false, true];
        let first: Vec<_> = compress(&samples, 255, 1).collect();
        let second: Vec<_> = compress(&samples, 255, 1).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_nan_runs_merge() {
        let samples = [f32::NAN, f32::NAN, 1.0];
        let result = chunks(&samples);
        assert_eq!(result[0].len(), 2);
        assert_eq!(result[0][0].count, 2);
        assert!(result[0][0].value.is_nan());
    }

    #[test]
    fn test_sample_runs_roundtrip() {
        let samples = vec![
            Sample::Analog(0.0),
            Sample::Analog(0.0),
            Sample::Analog(-1.25),
            Sample::Analog(0.0),
        ];
        let result = chunks(&samples);
        assert_eq!(result[0].len(), 3);
        assert_eq!(decompress::<Sample, _, _>(&result), samples);
    }
}
