use tracing::{debug, warn};

use crate::cluster::registry::ServerRecord;
use crate::cluster::ss_link;
use crate::frontend::context::NamingContext;
use crate::shared::config::CONFIG;
use crate::shared::path::REDUNDANCY_PREFIXES;
use crate::shared::wire::types::{Operation, Status};

/// A top-level namespace entry eligible for replication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopLevelEntry {
    pub name: String,
    pub is_file: bool,
    pub owner_id: u32,
    pub owner_uuid: String,
}

/// One delete-then-copy refresh of a replica in a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaJob {
    pub entry: String,
    pub is_file: bool,
    pub source: ServerRecord,
    pub bucket: ServerRecord,
    pub replica_path: String,
}

/// The replica buckets are the first `factor` distinct working-directory
/// identities in registration order.
pub fn designate_buckets(records: &[ServerRecord], factor: usize) -> Vec<ServerRecord> {
    let mut buckets: Vec<ServerRecord> = Vec::new();
    for record in records {
        if buckets.len() == factor {
            break;
        }
        if buckets.iter().all(|bucket| bucket.uuid != record.uuid) {
            buckets.push(record.clone());
        }
    }
    buckets
}

/// Plans one sweep's worth of replica refreshes: every top-level entry
/// outside the reserved prefixes gets a copy in each bucket it does not
/// already belong to. Yields nothing until enough distinct buckets exist.
pub fn plan(
    records: &[ServerRecord],
    entries: &[TopLevelEntry],
    factor: usize,
) -> Vec<ReplicaJob> {
    let buckets = designate_buckets(records, factor);
    if buckets.len() < factor {
        return Vec::new();
    }

    let mut jobs = Vec::new();
    for entry in entries {
        if entry.name.starts_with(".rd") {
            continue;
        }
        let Some(source) = records.iter().find(|record| record.id == entry.owner_id) else {
            continue;
        };
        let others = buckets
            .iter()
            .filter(|bucket| bucket.uuid != entry.owner_uuid)
            .take(REDUNDANCY_PREFIXES.len());
        for (prefix, bucket) in REDUNDANCY_PREFIXES.iter().zip(others) {
            jobs.push(ReplicaJob {
                entry: entry.name.clone(),
                is_file: entry.is_file,
                source: source.clone(),
                bucket: bucket.clone(),
                replica_path: format!("{prefix}/{}", entry.name),
            });
        }
    }
    jobs
}

/// Runs the planned refreshes against the cluster. Each replica is deleted
/// and re-copied through the ordinary copy protocol; a failed job is logged
/// and left for the next sweep.
pub async fn sync_replicas(ctx: &NamingContext) {
    let factor = CONFIG.redundancy.replication_factor;
    let records = ctx.registry.all();
    if records.len() < factor {
        return;
    }

    let entries = ctx.top_level_entries();
    let jobs = plan(&records, &entries, factor);
    debug!(target: "routefs::redundancy", jobs = jobs.len(), "replica sweep planned");

    for job in jobs {
        let delete_op = if job.is_file {
            Operation::DeleteFile
        } else {
            Operation::DeleteFolder
        };
        match ss_link::send_command(job.bucket.nm_port, delete_op, &job.replica_path).await {
            Ok(Status::Success) | Ok(Status::NotFound) => {}
            Ok(status) => {
                warn!(
                    target: "routefs::redundancy",
                    replica = %job.replica_path, bucket = job.bucket.id, %status,
                    "replica delete refused, leaving it for the next sweep"
                );
                continue;
            }
            Err(err) => {
                warn!(
                    target: "routefs::redundancy",
                    replica = %job.replica_path, bucket = job.bucket.id, %err,
                    "replica delete failed, leaving it for the next sweep"
                );
                continue;
            }
        }

        {
            let mut tree = ctx.tree.lock();
            tree.delete_path(&job.replica_path);
        }

        let copy_op = if job.is_file {
            Operation::CopyFile
        } else {
            Operation::CopyFolder
        };
        match ss_link::send_copy(
            job.source.nm_port,
            copy_op,
            &job.entry,
            &job.replica_path,
            job.bucket.nm_port,
        )
        .await
        {
            Ok(Status::Success) => {
                let mut tree = ctx.tree.lock();
                tree.clone_subtree(&job.entry, &job.replica_path, job.bucket.id, &job.bucket.uuid);
                debug!(
                    target: "routefs::redundancy",
                    entry = %job.entry, replica = %job.replica_path, bucket = job.bucket.id,
                    "replica refreshed"
                );
            }
            Ok(status) => {
                warn!(
                    target: "routefs::redundancy",
                    entry = %job.entry, bucket = job.bucket.id, %status,
                    "replica copy refused"
                );
            }
            Err(err) => {
                warn!(
                    target: "routefs::redundancy",
                    entry = %job.entry, bucket = job.bucket.id, %err,
                    "replica copy failed"
                );
            }
        }
    }
}
