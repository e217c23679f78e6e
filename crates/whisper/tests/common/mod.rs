//! Fixture builder for Whisper files used by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// Builds the bytes of a Whisper file archive by archive.
pub struct FixtureBuilder {
    aggregation: u32,
    x_files_factor: f32,
    max_retention: Option<u32>,
    archives: Vec<(u32, u32)>,
    slots: Vec<Vec<(u32, f64)>>,
}

impl FixtureBuilder {
    pub fn new() -> Self {
        Self {
            aggregation: 1,
            x_files_factor: 0.5,
            max_retention: None,
            archives: Vec::new(),
            slots: Vec::new(),
        }
    }

    pub fn aggregation(mut self, value: u32) -> Self {
        self.aggregation = value;
        self
    }

    /// Overrides the max retention, which defaults to the last archive's.
    pub fn max_retention(mut self, seconds: u32) -> Self {
        self.max_retention = Some(seconds);
        self
    }

    pub fn archive(mut self, seconds_per_point: u32, num_points: u32) -> Self {
        self.archives.push((seconds_per_point, num_points));
        self.slots.push(vec![(0, 0.0); num_points as usize]);
        self
    }

    /// Sets one slot of an archive.
    pub fn slot(mut self, archive: usize, index: usize, timestamp: u32, value: f64) -> Self {
        self.slots[archive][index] = (timestamp, value);
        self
    }

    /// Writes every slot of an archive as if points had arrived every
    /// `seconds_per_point` seconds, the oldest at `oldest`, until `latest`.
    pub fn fill(
        mut self,
        archive: usize,
        oldest: u32,
        latest: u32,
        value: impl Fn(u32) -> f64,
    ) -> Self {
        let (spp, num_points) = self.archives[archive];
        let base = self.slots[archive][0].0;
        let base = if base == 0 { oldest } else { base };
        let mut ts = oldest;
        while ts <= latest {
            let distance = (i64::from(ts) - i64::from(base)).div_euclid(i64::from(spp));
            let index = distance.rem_euclid(i64::from(num_points)) as usize;
            self.slots[archive][index] = (ts, value(ts));
            ts += spp;
        }
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let count = self.archives.len() as u32;
        let max_retention = self
            .max_retention
            .unwrap_or_else(|| self.archives.last().map_or(0, |(s, n)| s * n));

        let mut buf = Vec::new();
        buf.extend_from_slice(&self.aggregation.to_be_bytes());
        buf.extend_from_slice(&max_retention.to_be_bytes());
        buf.extend_from_slice(&self.x_files_factor.to_be_bytes());
        buf.extend_from_slice(&count.to_be_bytes());

        let mut offset = 16 + 12 * count;
        for &(spp, num_points) in &self.archives {
            buf.extend_from_slice(&offset.to_be_bytes());
            buf.extend_from_slice(&spp.to_be_bytes());
            buf.extend_from_slice(&num_points.to_be_bytes());
            offset += num_points * 12;
        }

        for slots in &self.slots {
            for (ts, value) in slots {
                buf.extend_from_slice(&ts.to_be_bytes());
                buf.extend_from_slice(&value.to_be_bytes());
            }
        }
        buf
    }

    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        write_bytes(dir, name, &self.build())
    }
}

pub fn write_bytes(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}
