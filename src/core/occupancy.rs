//! Per-host core occupancy derived from `exec_host`.
//!
//! ```text
//! exec_host  = host_cores *("+" host_cores)
//! host_cores = host "/" cores
//! cores      = core_range *("," core_range)
//! core_range = core | core "-" core
//! ```

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::models::{ATTR_EXEC_HOST, Job};

/// Cores a job holds on each host.
pub fn occupancy(job: &Job) -> HashMap<String, u32> {
    let mut occ = HashMap::new();

    let Some(exec_host) = job.attr(ATTR_EXEC_HOST) else {
        return occ;
    };

    for host_cores in exec_host.split('+').filter(|s| !s.is_empty()) {
        let (host, cores) = match host_cores.split_once('/') {
            Some((host, cores)) => (host, Some(cores)),
            None => (host_cores, None),
        };

        let count: u32 = match cores {
            Some(cores) => cores
                .split(',')
                .map(|range| range_size(job, range))
                .fold(0, u32::saturating_add),
            None => 1,
        };
        let total = occ.entry(host.to_string()).or_insert(0);
        *total = total.saturating_add(count);
    }

    occ
}

fn range_size(job: &Job, range: &str) -> u32 {
    let Some((first, last)) = range.split_once('-') else {
        return 1;
    };

    match (first.trim().parse::<u32>(), last.trim().parse::<u32>()) {
        (Ok(first), Ok(last)) if last >= first => match (last - first).checked_add(1) {
            Some(size) => size,
            None => {
                debug!(job = %job.id, range, "Oversized core range counted as one core");
                1
            }
        },
        _ => {
            debug!(job = %job.id, range, "Unparseable core range counted as one core");
            1
        }
    }
}

/// Cores per host, broken down by job base name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Usage {
    hosts: BTreeMap<String, BTreeMap<String, u32>>,
}

impl Usage {
    pub fn from_jobs<'a>(jobs: impl IntoIterator<Item = &'a Job>) -> Self {
        let mut usage = Self::default();
        for job in jobs {
            for (host, cores) in occupancy(job) {
                let total = usage
                    .hosts
                    .entry(host)
                    .or_default()
                    .entry(job.base_name().to_string())
                    .or_insert(0);
                *total = total.saturating_add(cores);
            }
        }
        usage
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Hosts in name order with their total load.
    pub fn loads(&self) -> impl Iterator<Item = (&str, u32)> {
        self.hosts
            .iter()
            .map(|(host, jobs)| {
                (host.as_str(), jobs.values().fold(0u32, |acc, &n| acc.saturating_add(n)))
            })
    }

    pub fn jobs_on(&self, host: &str) -> Option<&BTreeMap<String, u32>> {
        self.hosts.get(host)
    }
}
