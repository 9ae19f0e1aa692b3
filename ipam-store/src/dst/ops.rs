//! Simulated operation streams
//!
//! `OpGenerator` draws contract operations over a small key space so that
//! duplicates, misses and stale versions happen often. `apply` runs one
//! operation against any backend and reduces the result to an `OpOutcome`
//! that can be compared across backends.

use serde_json::json;

use crate::storage::{ErrorKind, Prefix, RequestContext, StorageBackend};

use super::rng::DeterministicRng;

/// One storage contract call.
#[derive(Debug, Clone, PartialEq)]
pub enum PrefixOp {
    /// `create_prefix`
    Create(Prefix),
    /// `read_prefix`
    Read {
        /// Cidr to read
        cidr: String,
        /// Namespace to read from
        namespace: String,
    },
    /// `read_prefixes`
    ReadNamespace(String),
    /// `read_all_prefixes`
    ReadAll,
    /// `read_all_prefix_cidrs`
    ReadCidrs(String),
    /// `update_prefix`
    Update(Prefix),
    /// `delete_prefix`
    Delete(Prefix),
    /// `delete_all_prefixes`
    DeleteAll,
}

/// Backend-independent result of one operation.
///
/// Collections are sorted, since backends return them in no particular order.
#[derive(Debug, Clone, PartialEq)]
pub enum OpOutcome {
    /// A single record
    Prefix(Prefix),
    /// Several records, sorted by `(namespace, cidr)`
    Prefixes(Vec<Prefix>),
    /// Cidrs, sorted
    Cidrs(Vec<String>),
    /// Success with no value
    Done,
    /// Failure, by kind
    Failed(ErrorKind),
}

/// Generates random operations from a seeded RNG.
#[derive(Debug, Clone)]
pub struct OpGenerator {
    rng: DeterministicRng,
    cidrs: Vec<String>,
    namespaces: Vec<String>,
    versions_max: u64,
}

impl OpGenerator {
    /// Generator over a default key space of four cidrs in three namespaces.
    #[must_use]
    pub fn new(rng: DeterministicRng) -> Self {
        Self {
            rng,
            cidrs: ["10.0.0.0/8", "10.1.0.0/16", "192.168.0.0/24", "2001:db8::/32"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            namespaces: ["root", "tenant-a", "tenant-b"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            versions_max: 4,
        }
    }

    /// Seed of the underlying RNG.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    fn pick_prefix(&mut self) -> Prefix {
        let cidr = self.rng.choose(&self.cidrs).clone();
        let namespace = self.rng.choose(&self.namespaces).clone();
        let version = self.rng.below(self.versions_max);
        let marker = self.rng.below(1000);

        Prefix::new(cidr)
            .with_namespace(namespace)
            .with_version(version)
            .with_payload(json!({ "marker": marker }))
    }

    /// Draw the next operation.
    pub fn next_op(&mut self) -> PrefixOp {
        // Weights favor writes so the key space stays busy.
        match self.rng.below(100) {
            0..=24 => PrefixOp::Create(self.pick_prefix()),
            25..=49 => PrefixOp::Update(self.pick_prefix()),
            50..=61 => {
                let prefix = self.pick_prefix();
                PrefixOp::Read {
                    cidr: prefix.cidr,
                    namespace: prefix.namespace,
                }
            }
            62..=69 => PrefixOp::ReadNamespace(self.rng.choose(&self.namespaces).clone()),
            70..=75 => PrefixOp::ReadCidrs(self.rng.choose(&self.namespaces).clone()),
            76..=81 => PrefixOp::ReadAll,
            82..=97 => PrefixOp::Delete(self.pick_prefix()),
            _ => PrefixOp::DeleteAll,
        }
    }

    /// Draw `count` operations.
    pub fn take(&mut self, count: usize) -> Vec<PrefixOp> {
        (0..count).map(|_| self.next_op()).collect()
    }
}

fn sorted_prefixes(mut prefixes: Vec<Prefix>) -> Vec<Prefix> {
    prefixes.sort_by(|a, b| (&a.namespace, &a.cidr).cmp(&(&b.namespace, &b.cidr)));
    prefixes
}

/// Run one operation and reduce its result.
pub async fn apply<B>(backend: &B, cx: &RequestContext, op: PrefixOp) -> OpOutcome
where
    B: StorageBackend + ?Sized,
{
    let result = match op {
        PrefixOp::Create(prefix) => backend.create_prefix(cx, prefix).await.map(OpOutcome::Prefix),
        PrefixOp::Read { cidr, namespace } => backend
            .read_prefix(cx, &cidr, &namespace)
            .await
            .map(OpOutcome::Prefix),
        PrefixOp::ReadNamespace(namespace) => backend
            .read_prefixes(cx, &namespace)
            .await
            .map(|ps| OpOutcome::Prefixes(sorted_prefixes(ps))),
        PrefixOp::ReadAll => backend
            .read_all_prefixes(cx)
            .await
            .map(|ps| OpOutcome::Prefixes(sorted_prefixes(ps))),
        PrefixOp::ReadCidrs(namespace) => backend
            .read_all_prefix_cidrs(cx, &namespace)
            .await
            .map(|mut cidrs| {
                cidrs.sort();
                OpOutcome::Cidrs(cidrs)
            }),
        PrefixOp::Update(prefix) => backend.update_prefix(cx, prefix).await.map(OpOutcome::Prefix),
        PrefixOp::Delete(prefix) => backend.delete_prefix(cx, prefix).await.map(OpOutcome::Prefix),
        PrefixOp::DeleteAll => backend.delete_all_prefixes(cx).await.map(|()| OpOutcome::Done),
    };

    result.unwrap_or_else(|e| OpOutcome::Failed(e.kind()))
}
