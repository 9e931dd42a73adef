//! Interactive menu: pick a strategy and size, see time and misses, repeat.
//!
//! All trials share one process and one counter reader, so later trials
//! can start with caches warmed by earlier ones. Use `sweep` for numbers
//! meant to be compared.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use tracing::warn;

use crate::counters::{CacheCounters, CounterSet};
use crate::error::Result;
use crate::runner::{TrialConfig, run_trial};
use crate::strategy::Strategy;

/// Whitespace-separated tokens from a line-oriented reader.
struct Tokens<R> {
    input: R,
    pending: VecDeque<String>,
}

impl<R: BufRead> Tokens<R> {
    fn new(input: R) -> Self {
        Self {
            input,
            pending: VecDeque::new(),
        }
    }

    /// Next token, or `None` at end of input.
    fn next_token(&mut self) -> Result<Option<String>> {
        while self.pending.is_empty() {
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.pending
                .extend(line.split_whitespace().map(str::to_owned));
        }
        Ok(self.pending.pop_front())
    }

    /// Next token parsed as a number; `None` at end of input or on garbage.
    fn next_number(&mut self) -> Result<Option<usize>> {
        Ok(self.next_token()?.and_then(|t| t.parse().ok()))
    }
}

/// Runs the menu until the user enters 0 or input ends.
pub fn run_menu<R, W>(
    input: R,
    output: &mut W,
    mut counters: Option<&mut (dyn CacheCounters + '_)>,
    set: CounterSet,
) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    let mut tokens = Tokens::new(input);

    loop {
        writeln!(output)?;
        writeln!(output, "1. Multiplication")?;
        writeln!(output, "2. Line Multiplication")?;
        writeln!(output, "3. Block Multiplication")?;
        write!(output, "Selection?: ")?;
        output.flush()?;

        let Some(op) = tokens.next_number()? else {
            break;
        };
        if op == 0 {
            break;
        }
        let Some(strategy) = u32::try_from(op).ok().and_then(Strategy::from_menu_code) else {
            writeln!(output, "Unknown selection {op}")?;
            continue;
        };

        write!(output, "Dimensions: lins=cols ? ")?;
        output.flush()?;
        let Some(n) = tokens.next_number()? else {
            break;
        };

        let block_size = if strategy == Strategy::Block {
            write!(output, "Block Size? ")?;
            output.flush()?;
            match tokens.next_number()? {
                Some(bs) => Some(bs),
                None => break,
            }
        } else {
            None
        };

        let outcome = strategy.select(block_size).and_then(|selector| {
            let config = TrialConfig {
                selector,
                n,
                counters: set,
            };
            run_trial(config, counters.as_deref_mut())
        });

        match outcome {
            Ok(result) => {
                writeln!(output, "Time: {:.3} seconds", result.elapsed_seconds)?;
                writeln!(output, "Result matrix: ")?;
                let preview: Vec<String> = result.preview.iter().map(|v| v.to_string()).collect();
                writeln!(output, "{}", preview.join(" "))?;
                writeln!(output, "L1 DCM: {}", result.l1_miss)?;
                writeln!(output, "L2 DCM: {}", result.l2_miss)?;
                if let Some(l3) = result.l3_miss {
                    writeln!(output, "L3 TCM: {l3}")?;
                }
            }
            Err(e) => {
                warn!(error = %e, "trial failed");
                writeln!(output, "Error: {e}")?;
            }
        }
    }
    Ok(())
}
