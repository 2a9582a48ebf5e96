use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::cluster::registry::ServerRecord;
use crate::cluster::ss_link;
use crate::frontend::context::NamingContext;
use crate::namespace::codec;
use crate::namespace::locks::LockMode;
use crate::namespace::locks::SubtreeGuard;
use crate::namespace::tree::PathKind;
use crate::shared::path::{is_same_or_nested, normalize, parent};
use crate::shared::wire::frames;
use crate::shared::wire::types::{Operation, Status};

/// Placement a copy request resolved to once every structural check passed.
#[derive(Debug, PartialEq, Eq)]
pub struct CopyPlan {
    pub source: ServerRecord,
    pub dest: ServerRecord,
}

/// Validates a copy request against the tree before any remote command is
/// issued. The recursion check comes first: copying a directory into its
/// own subtree must fail as such even when the destination also exists.
pub fn copy_precheck(
    ctx: &NamingContext,
    op: Operation,
    src: &str,
    dst: &str,
) -> Result<CopyPlan, Status> {
    if src.is_empty() || dst.is_empty() {
        return Err(Status::InvalidPath);
    }

    let (src_kind, dst_kind, recursive) = {
        let tree = ctx.tree.lock();
        (tree.kind(src), tree.kind(dst), tree.is_ancestor(src, dst))
    };

    match src_kind {
        PathKind::NotFound => return Err(Status::NotFound),
        PathKind::Directory if op.targets_file() => return Err(Status::InvalidType),
        PathKind::File if !op.targets_file() => return Err(Status::InvalidType),
        _ => {}
    }
    if recursive || is_same_or_nested(src, dst) {
        return Err(Status::RecursiveCopy);
    }
    if dst_kind != PathKind::NotFound {
        return Err(Status::AlreadyExists);
    }

    let owner = ctx.resolve_owner(src).ok_or(Status::NotFound)?;
    let source = ctx.registry.get(owner).ok_or(Status::Unavailable)?;
    let dest = placement_for(ctx, dst)?;
    Ok(CopyPlan { source, dest })
}

/// Where a new path lands: under its parent's owner, or on the least
/// loaded server for fresh top-level entries.
pub fn placement_for(ctx: &NamingContext, path: &str) -> Result<ServerRecord, Status> {
    match parent(path) {
        Some(parent_path) => {
            if ctx.tree.lock().kind(&parent_path) == PathKind::File {
                return Err(Status::InvalidType);
            }
            let owner = ctx.resolve_owner(&parent_path).ok_or(Status::NotFound)?;
            ctx.registry.get(owner).ok_or(Status::Unavailable)
        }
        None => ctx.registry.least_loaded().ok_or(Status::Unavailable),
    }
}

/// One connected client. Routing locks are parked in `held` until the
/// client acknowledges it is done with the storage-server connection; a
/// dropped session releases them with it.
pub struct ClientSession<S> {
    ctx: Arc<NamingContext>,
    stream: S,
    held: Vec<SubtreeGuard>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> ClientSession<S> {
    pub fn new(ctx: Arc<NamingContext>, stream: S) -> Self {
        Self {
            ctx,
            stream,
            held: Vec::new(),
        }
    }

    /// Drives the connection until the client disconnects or the transport
    /// fails. Transport failures are fatal to the session only.
    pub async fn run(mut self) -> io::Result<()> {
        loop {
            let byte = match self.stream.read_u8().await {
                Ok(byte) => byte,
                Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(err) => return Err(err),
            };
            let Some(op) = Operation::from_u8(byte) else {
                warn!(target: "routefs::session", byte, "unknown operation byte");
                frames::write_status(&mut self.stream, Status::InvalidOperation).await?;
                continue;
            };
            debug!(target: "routefs::session", ?op, "handling operation");

            match op {
                Operation::Read | Operation::Write => self.handle_route(op).await?,
                Operation::Metadata => self.handle_metadata().await?,
                Operation::CreateFile
                | Operation::CreateFolder
                | Operation::DeleteFile
                | Operation::DeleteFolder => self.handle_mutation(op).await?,
                Operation::CopyFile | Operation::CopyFolder => self.handle_copy(op).await?,
                Operation::PrintTree => self.handle_print_tree().await?,
                Operation::Ack => {
                    let released = self.held.drain(..).count();
                    debug!(
                        target: "routefs::session",
                        released,
                        "client acknowledged, routing locks released"
                    );
                }
                Operation::Disconnect => break,
            }
        }
        Ok(())
    }

    /// Reads a path frame, answering INVALID_PATH (and staying alive) when
    /// the frame itself is malformed. The frame is fixed-size, so the
    /// stream stays aligned either way.
    async fn read_path_or_report(&mut self) -> io::Result<Option<String>> {
        match frames::read_path(&mut self.stream).await {
            Ok(path) => Ok(Some(path)),
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                warn!(target: "routefs::session", %err, "malformed path frame");
                frames::write_status(&mut self.stream, Status::InvalidPath).await?;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// READ and WRITE hand the client off to the owning server's client
    /// port. The subtree guard taken here stays held until the client's
    /// ACK, not until this reply is written.
    async fn handle_route(&mut self, op: Operation) -> io::Result<()> {
        let Some(path) = self.read_path_or_report().await? else {
            return Ok(());
        };

        let resolved = match op {
            Operation::Read => self.ctx.resolve_for_read(&path),
            _ => self
                .ctx
                .resolve_owner(&path)
                .map(|owner| (normalize(&path), owner)),
        };
        let Some((target_path, owner)) = resolved else {
            return frames::write_status(&mut self.stream, Status::NotFound).await;
        };
        let Some(record) = self.ctx.registry.get(owner) else {
            return frames::write_status(&mut self.stream, Status::Unavailable).await;
        };

        let mode = if op == Operation::Write {
            LockMode::Exclusive
        } else {
            LockMode::Shared
        };
        let guard = self.ctx.lock_subtree(&target_path, mode).await;
        self.held.push(guard);

        debug!(
            target: "routefs::session",
            ?op,
            path = %target_path,
            owner,
            port = record.client_port,
            "routing client to storage server"
        );
        frames::write_status(&mut self.stream, Status::Success).await?;
        self.stream.write_u32_le(record.client_port as u32).await?;
        self.stream.flush().await
    }

    /// METADATA is proxied: the stat record travels back through the
    /// naming server, under a reader lock held for the round trip only.
    async fn handle_metadata(&mut self) -> io::Result<()> {
        let Some(path) = self.read_path_or_report().await? else {
            return Ok(());
        };

        let Some(owner) = self.ctx.resolve_owner(&path) else {
            return frames::write_status(&mut self.stream, Status::NotFound).await;
        };
        let Some(record) = self.ctx.registry.get(owner) else {
            return frames::write_status(&mut self.stream, Status::Unavailable).await;
        };

        let _guard = self
            .ctx
            .lock_subtree(&normalize(&path), LockMode::Shared)
            .await;

        match ss_link::fetch_metadata(record.nm_port, &path).await {
            Ok((Status::Success, Some(metadata))) => {
                frames::write_status(&mut self.stream, Status::Success).await?;
                metadata.write_to(&mut self.stream).await?;
                self.stream.flush().await
            }
            Ok((status, _)) => frames::write_status(&mut self.stream, status).await,
            Err(err) => {
                warn!(target: "routefs::session", %err, path, "metadata fetch failed");
                frames::write_status(&mut self.stream, Status::Unavailable).await
            }
        }
    }

    async fn handle_mutation(&mut self, op: Operation) -> io::Result<()> {
        let Some(path) = self.read_path_or_report().await? else {
            return Ok(());
        };
        let path = normalize(&path);
        if path.is_empty() {
            return frames::write_status(&mut self.stream, Status::InvalidPath).await;
        }

        if matches!(op, Operation::CreateFile | Operation::CreateFolder) {
            self.handle_create(op, &path).await
        } else {
            self.handle_delete(op, &path).await
        }
    }

    async fn handle_create(&mut self, op: Operation, path: &str) -> io::Result<()> {
        if self.ctx.tree.lock().kind(path) != PathKind::NotFound {
            return frames::write_status(&mut self.stream, Status::AlreadyExists).await;
        }
        let record = match placement_for(&self.ctx, path) {
            Ok(record) => record,
            Err(status) => return frames::write_status(&mut self.stream, status).await,
        };

        // New entries nest under their parent's writer lock. A fresh
        // top-level entry has no subtree to lock yet; the tree mutex alone
        // covers its insertion.
        let _guard = match parent(path) {
            Some(parent_path) => Some(
                self.ctx
                    .lock_subtree(&parent_path, LockMode::Exclusive)
                    .await,
            ),
            None => None,
        };

        let status = match ss_link::send_command(record.nm_port, op, path).await {
            Ok(status) => status,
            Err(err) => {
                warn!(target: "routefs::session", %err, path, "create command never reached the storage server");
                return frames::write_status(&mut self.stream, Status::Unavailable).await;
            }
        };
        if status == Status::Success {
            let mut tree = self.ctx.tree.lock();
            tree.add_path(path, op.targets_file(), record.id, &record.uuid);
        }
        frames::write_status(&mut self.stream, status).await
    }

    async fn handle_delete(&mut self, op: Operation, path: &str) -> io::Result<()> {
        let kind = self.ctx.tree.lock().kind(path);
        let early = match (op, kind) {
            (_, PathKind::NotFound) => Some(Status::NotFound),
            (Operation::DeleteFile, PathKind::Directory) => Some(Status::InvalidType),
            (Operation::DeleteFolder, PathKind::File) => Some(Status::InvalidType),
            _ => None,
        };
        if let Some(status) = early {
            return frames::write_status(&mut self.stream, status).await;
        }

        let Some(owner) = self.ctx.resolve_owner(path) else {
            return frames::write_status(&mut self.stream, Status::NotFound).await;
        };
        let Some(record) = self.ctx.registry.get(owner) else {
            return frames::write_status(&mut self.stream, Status::Unavailable).await;
        };

        let _guard = self.ctx.lock_subtree(path, LockMode::Exclusive).await;

        let status = match ss_link::send_command(record.nm_port, op, path).await {
            Ok(status) => status,
            Err(err) => {
                warn!(target: "routefs::session", %err, path, "delete command never reached the storage server");
                return frames::write_status(&mut self.stream, Status::Unavailable).await;
            }
        };
        if status == Status::Success {
            let mut tree = self.ctx.tree.lock();
            tree.delete_path(path);
            self.ctx.cache.remove_prefix(path);
        }
        frames::write_status(&mut self.stream, status).await
    }

    async fn handle_copy(&mut self, op: Operation) -> io::Result<()> {
        let Some(src) = self.read_path_or_report().await? else {
            return Ok(());
        };
        let Some(dst) = self.read_path_or_report().await? else {
            return Ok(());
        };
        let src = normalize(&src);
        let dst = normalize(&dst);

        let plan = match copy_precheck(&self.ctx, op, &src, &dst) {
            Ok(plan) => plan,
            Err(status) => return frames::write_status(&mut self.stream, status).await,
        };

        // The source subtree stays readable but unchanged for the whole
        // recursive copy.
        let _guard = self.ctx.lock_subtree(&src, LockMode::Shared).await;

        let status = match ss_link::send_copy(
            plan.source.nm_port,
            op,
            &src,
            &dst,
            plan.dest.nm_port,
        )
        .await
        {
            Ok(status) => status,
            Err(err) => {
                warn!(target: "routefs::session", %err, src, dst, "copy command never reached the storage server");
                return frames::write_status(&mut self.stream, Status::Unavailable).await;
            }
        };
        if status == Status::Success {
            let mut tree = self.ctx.tree.lock();
            tree.clone_subtree(&src, &dst, plan.dest.id, &plan.dest.uuid);
        }
        frames::write_status(&mut self.stream, status).await
    }

    /// PRINT_TREE ships the whole index in its wire encoding; the client
    /// renders it.
    async fn handle_print_tree(&mut self) -> io::Result<()> {
        let encoded = {
            let tree = self.ctx.tree.lock();
            codec::encode(&tree)
        };
        match encoded {
            Ok(bytes) => {
                frames::write_status(&mut self.stream, Status::Success).await?;
                self.stream.write_u32_le(bytes.len() as u32).await?;
                self.stream.write_all(&bytes).await?;
                self.stream.flush().await
            }
            Err(err) => {
                warn!(target: "routefs::session", %err, "tree serialization failed");
                frames::write_status(&mut self.stream, Status::Unavailable).await
            }
        }
    }
}
