//! Retired-vertex redirects
//!
//! Every collapse retires two vertices in favour of a freshly appended one.
//! [`RedirectMap`] remembers where each retired vertex went. Chains form when
//! a survivor is itself retired later, so lookups follow links until they
//! reach a vertex that has not been retired.

use edgefold_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectMap {
    targets: BTreeMap<usize, usize>,
}

impl RedirectMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of retired vertices
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn is_retired(&self, vertex: usize) -> bool {
        self.targets.contains_key(&vertex)
    }

    /// Retire `retired` in favour of `survivor`.
    ///
    /// Both must currently be live, which keeps every chain acyclic.
    pub fn record(&mut self, retired: usize, survivor: usize) -> Result<()> {
        if retired == survivor {
            return Err(Error::InvariantViolation(format!(
                "vertex {} cannot be redirected to itself",
                retired
            )));
        }
        if self.is_retired(survivor) {
            return Err(Error::InvariantViolation(format!(
                "survivor {} is already retired",
                survivor
            )));
        }
        if let Some(previous) = self.targets.insert(retired, survivor) {
            return Err(Error::InvariantViolation(format!(
                "vertex {} was already retired to {}",
                retired, previous
            )));
        }
        Ok(())
    }

    /// The live vertex that `vertex` now stands for
    pub fn resolve(&self, vertex: usize) -> usize {
        self.resolve_with_hops(vertex).0
    }

    /// Like [`RedirectMap::resolve`], also reporting how many links were followed
    pub fn resolve_with_hops(&self, vertex: usize) -> (usize, usize) {
        let mut current = vertex;
        let mut hops = 0;
        while let Some(&next) = self.targets.get(&current) {
            current = next;
            hops += 1;
        }
        (current, hops)
    }

    /// Point every retired vertex straight at its live survivor
    pub fn compress(&mut self) {
        let resolved: Vec<(usize, usize)> =
            self.targets.keys().map(|&v| (v, self.resolve(v))).collect();
        self.targets.extend(resolved);
    }

    /// Retired vertex to survivor pairs, ordered by retired index
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.targets.iter().map(|(&k, &v)| (k, v))
    }

    /// Flatten and hand over the underlying map
    pub fn into_map(mut self) -> BTreeMap<usize, usize> {
        self.compress();
        self.targets
    }
}
