//! CPU sets in the kernel's range-list notation.
//!
//! The kernel prints CPU lists as comma-separated ids and inclusive ranges,
//! e.g. `0-3,8,10-11`. [`CpuSet`] parses that form, keeps members ordered, and
//! formats back to the most compact range list.

use crate::config::TopologyConfig;
use crate::error::{PmdError, Result};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Kernel-assigned logical CPU number.
pub type CpuId = usize;

/// Set of logical CPUs, enumerated in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuSet {
    cpus: BTreeSet<CpuId>,
}

impl CpuSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a range list such as `0-3,8,10-11`.
    ///
    /// Surrounding whitespace (including the trailing newline sysfs files end
    /// with) is ignored. An empty string is the empty set.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let mut set = CpuSet::new();
        if trimmed.is_empty() {
            return Ok(set);
        }

        for part in trimmed.split(',') {
            let part = part.trim();
            match part.split_once('-') {
                Some((start, end)) => {
                    let start = parse_cpu(input, start)?;
                    let end = parse_cpu(input, end)?;
                    if start > end {
                        return Err(PmdError::InvalidCpuList {
                            input: input.to_string(),
                            message: format!("range {}-{} is reversed", start, end),
                        });
                    }
                    set.cpus.extend(start..=end);
                }
                None => {
                    set.cpus.insert(parse_cpu(input, part)?);
                }
            }
        }

        Ok(set)
    }

    pub fn insert(&mut self, cpu: CpuId) -> bool {
        self.cpus.insert(cpu)
    }

    pub fn contains(&self, cpu: CpuId) -> bool {
        self.cpus.contains(&cpu)
    }

    pub fn len(&self) -> usize {
        self.cpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpus.is_empty()
    }

    /// Lowest member, if any.
    pub fn first(&self) -> Option<CpuId> {
        self.cpus.first().copied()
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = CpuId> + '_ {
        self.cpus.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<CpuId> {
        self.iter().collect()
    }
}

fn parse_cpu(input: &str, token: &str) -> Result<CpuId> {
    let cpu = token
        .trim()
        .parse::<CpuId>()
        .map_err(|e| PmdError::InvalidCpuList {
            input: input.to_string(),
            message: format!("'{}' is not a CPU id: {}", token.trim(), e),
        })?;

    if cpu >= TopologyConfig::MAX_CPUS {
        return Err(PmdError::InvalidCpuList {
            input: input.to_string(),
            message: format!("CPU {} is not below {}", cpu, TopologyConfig::MAX_CPUS),
        });
    }
    Ok(cpu)
}

impl FromStr for CpuSet {
    type Err = PmdError;

    fn from_str(s: &str) -> Result<Self> {
        CpuSet::parse(s)
    }
}

impl FromIterator<CpuId> for CpuSet {
    fn from_iter<I: IntoIterator<Item = CpuId>>(iter: I) -> Self {
        Self {
            cpus: iter.into_iter().collect(),
        }
    }
}

impl Extend<CpuId> for CpuSet {
    fn extend<I: IntoIterator<Item = CpuId>>(&mut self, iter: I) {
        self.cpus.extend(iter);
    }
}

impl fmt::Display for CpuSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.cpus.iter().copied().peekable();
        let mut first = true;

        while let Some(start) = iter.next() {
            let mut end = start;
            while iter.peek() == Some(&(end + 1)) {
                end += 1;
                iter.next();
            }

            if !first {
                f.write_str(",")?;
            }
            first = false;

            if start == end {
                write!(f, "{}", start)?;
            } else {
                write!(f, "{}-{}", start, end)?;
            }
        }

        Ok(())
    }
}
