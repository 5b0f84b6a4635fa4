//! Stochastic content generators for test variations
//!
//! Uses seeded RNG for reproducibility. Print seed on failure for replay.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// What a generated cue block should parse to.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedCue {
    pub id: String,
    pub start: u64,
    pub end: u64,
    pub text: String,
}

/// Seeded generator for reproducible stochastic tests
pub struct Gen {
    pub rng: StdRng,
    pub seed: u64,
}

impl Gen {
    /// Create with specific seed (for reproduction)
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), seed }
    }

    /// Create from environment or random seed
    pub fn from_env_or_random() -> Self {
        let seed = std::env::var("WEBVTT_TEST_SEED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(rand::random);
        Self::new(seed)
    }

    /// Geometric distribution: count until rand > alpha
    pub fn geometric(&mut self, alpha: f64) -> usize {
        let mut n = 0;
        while self.rng.gen::<f64>() < alpha {
            n += 1;
        }
        n
    }

    /// Random boolean with probability p
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen::<f64>() < p
    }

    /// Chunk size, mostly small
    pub fn chunk_size(&mut self) -> usize {
        1 + self.geometric(0.85)
    }

    pub fn line_ending(&mut self) -> &'static [u8] {
        match self.rng.gen_range(0..3) {
            0 => b"\n",
            1 => b"\r\n",
            _ => b"\r",
        }
    }

    /// Timestamp text for `ms`, with or without the hours group
    pub fn timestamp_text(&mut self, ms: u64) -> String {
        let (h, m, s, f) = (ms / 3_600_000, ms / 60_000 % 60, ms / 1_000 % 60, ms % 1_000);
        if h == 0 && self.chance(0.5) {
            format!("{:02}:{:02}.{:03}", m, s, f)
        } else {
            format!("{:02}:{:02}:{:02}.{:03}", h, m, s, f)
        }
    }

    /// Random plain payload word (no markup, no separator)
    pub fn word(&mut self) -> String {
        let len = 1 + self.geometric(0.7);
        let chars = b"abcdefghijklmnopqrstuvwxyz0123456789,.!?'";
        (0..len)
            .map(|_| chars[self.rng.gen_range(0..chars.len())] as char)
            .collect()
    }

    pub fn payload_line(&mut self) -> String {
        let words = 1 + self.geometric(0.6);
        (0..words).map(|_| self.word()).collect::<Vec<_>>().join(" ")
    }

    /// One cue block starting at or after `from` ms, without its trailing
    /// blank line.
    pub fn cue_block(&mut self, from: u64) -> (String, GeneratedCue) {
        let start = from + self.rng.gen_range(0..5_000);
        let end = start + 1 + self.rng.gen_range(0..10_000);
        let id = if self.chance(0.4) { format!("cue-{}", self.word()) } else { String::new() };

        let mut block = String::new();
        if !id.is_empty() {
            block.push_str(&id);
            block.push('\n');
        }
        block.push_str(&self.timestamp_text(start));
        block.push_str(" --> ");
        block.push_str(&self.timestamp_text(end));
        if self.chance(0.3) {
            block.push_str(" align:start line:0");
        }

        let lines: Vec<String> = (0..1 + self.geometric(0.4)).map(|_| self.payload_line()).collect();
        for line in &lines {
            block.push('\n');
            block.push_str(line);
        }
        let cue = GeneratedCue { id, start, end, text: lines.join("\n") };
        (block, cue)
    }

    /// A valid document and the cues it holds
    pub fn document(&mut self) -> (Vec<u8>, Vec<GeneratedCue>) {
        let mut out = String::from("WEBVTT");
        if self.chance(0.3) {
            out.push_str(" - generated");
        }
        let mut cues = Vec::new();
        let mut at = 0;
        for _ in 0..self.geometric(0.85) {
            out.push_str("\n\n");
            let (block, cue) = self.cue_block(at);
            at = cue.start;
            out.push_str(&block);
            cues.push(cue);
        }
        out.push('\n');
        (out.into_bytes(), cues)
    }
}
