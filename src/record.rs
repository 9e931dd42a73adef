//! The single-line result record a trial prints on stdout.
//!
//! Format: `elapsed_seconds l1_miss l2_miss [l3_miss]`, whitespace separated,
//! with `N/A` standing in for a counter that could not be read. Readers
//! take the last line with the expected number of tokens, so diagnostic
//! output printed before the record is tolerated.

use crate::runner::BenchmarkResult;

/// Token written for a counter that could not be read.
pub const UNAVAILABLE: &str = "N/A";

/// Number of tokens in a record: 3, or 4 when the L3 counter is included.
pub fn expected_tokens(with_l3: bool) -> usize {
    if with_l3 { 4 } else { 3 }
}

impl BenchmarkResult {
    pub fn record_line(&self) -> String {
        let mut line = format!(
            "{:.6} {} {}",
            self.elapsed_seconds, self.l1_miss, self.l2_miss
        );
        if let Some(l3) = self.l3_miss {
            line.push(' ');
            line.push_str(&l3.to_string());
        }
        line
    }

    pub fn token_count(&self) -> usize {
        expected_tokens(self.l3_miss.is_some())
    }
}

/// Finds the last line of `output` with exactly `expected` tokens whose
/// first token (the time) parses as a number.
pub fn parse_last_record(output: &str, expected: usize) -> Option<Vec<String>> {
    output.lines().rev().find_map(|line| {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != expected || tokens[0].parse::<f64>().is_err() {
            return None;
        }
        Some(tokens.into_iter().map(str::to_owned).collect())
    })
}
