//! Volume configuration, read the same way `storage/lived` reads
//! `/scheme/sys/env`: plain `name=value` lines, no config-parsing crate.
//!
//! Expected keys:
//!   nums_bits=<u32>
//!   brick<N>.path=<path>
//!   brick<N>.capacity=<u64>
//! Bricks are collected by ascending `N` starting at 0; a gap in the
//! numbering is rejected rather than silently skipped.

use std::collections::BTreeMap;

use anyhow::{bail, Context};

#[derive(Debug)]
pub struct BrickConfig {
    pub path: String,
    pub capacity: u64,
}

#[derive(Debug)]
pub struct Config {
    pub nums_bits: u32,
    pub bricks: Vec<BrickConfig>,
}

impl Config {
    pub fn read(path: &str) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read volume config {path}"))?;
        Self::parse(&text)
    }

    fn parse(text: &str) -> anyhow::Result<Self> {
        let mut nums_bits = None;
        let mut paths: BTreeMap<u32, String> = BTreeMap::new();
        let mut caps: BTreeMap<u32, u64> = BTreeMap::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.splitn(2, '=');
            let name = parts.next().unwrap_or("");
            let value = parts.next().unwrap_or("").trim();

            if name == "nums_bits" {
                nums_bits = Some(
                    value
                        .parse::<u32>()
                        .with_context(|| format!("invalid nums_bits {value:?}"))?,
                );
            } else if let Some(rest) = name.strip_prefix("brick") {
                let (idx, field) = rest
                    .split_once('.')
                    .with_context(|| format!("malformed brick key {name:?}"))?;
                let idx: u32 = idx.parse().with_context(|| format!("bad brick index in {name:?}"))?;
                match field {
                    "path" => {
                        paths.insert(idx, value.to_string());
                    }
                    "capacity" => {
                        let cap = value
                            .parse::<u64>()
                            .with_context(|| format!("invalid capacity {value:?}"))?;
                        caps.insert(idx, cap);
                    }
                    other => bail!("unknown brick field {other:?} in {name:?}"),
                }
            }
        }

        let nums_bits = nums_bits.context("missing nums_bits")?;
        if paths.is_empty() {
            bail!("config names no bricks");
        }

        let mut bricks = Vec::with_capacity(paths.len());
        for i in 0..paths.len() as u32 {
            let path = paths
                .remove(&i)
                .with_context(|| format!("brick index {i} missing, indices must be contiguous from 0"))?;
            let capacity = caps
                .remove(&i)
                .with_context(|| format!("brick{i}.capacity missing"))?;
            bricks.push(BrickConfig { path, capacity });
        }

        Ok(Config { nums_bits, bricks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_config() {
        let cfg = Config::parse(
            "nums_bits=10\n\
             brick0.path=/bricks/a\n\
             brick0.capacity=100\n\
             brick1.path=/bricks/b\n\
             brick1.capacity=200\n",
        )
        .unwrap();
        assert_eq!(cfg.nums_bits, 10);
        assert_eq!(cfg.bricks.len(), 2);
        assert_eq!(cfg.bricks[1].capacity, 200);
    }

    #[test]
    fn rejects_a_gap_in_brick_numbering() {
        let err = Config::parse(
            "nums_bits=10\nbrick0.path=/a\nbrick0.capacity=1\nbrick2.path=/b\nbrick2.capacity=1\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("brick index 1"));
    }

    #[test]
    fn rejects_missing_nums_bits() {
        let err = Config::parse("brick0.path=/a\nbrick0.capacity=1\n").unwrap_err();
        assert!(err.to_string().contains("nums_bits"));
    }
}
