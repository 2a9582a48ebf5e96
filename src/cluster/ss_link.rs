use std::io;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;

use crate::shared::config::CONFIG;
use crate::shared::wire::frames;
use crate::shared::wire::types::{Operation, Status};
use crate::shared::wire::FileMetadata;

async fn dial(port: u16) -> io::Result<TcpStream> {
    TcpStream::connect((CONFIG.server.storage_host.as_str(), port)).await
}

/// One command round trip against a storage server's control port.
pub async fn send_command(port: u16, op: Operation, path: &str) -> io::Result<Status> {
    let mut stream = dial(port).await?;
    frames::write_op(&mut stream, op).await?;
    frames::write_path(&mut stream, path).await?;
    stream.flush().await?;

    let status = frames::read_status(&mut stream).await?;
    debug!(target: "routefs::ss_link", port, ?op, path, %status, "storage server replied");
    Ok(status)
}

/// Asks the server holding `src` to copy it to `dst` on the server behind
/// `dest_nm_port`. The inter-server transfer itself is the storage layer's
/// business; only the outcome travels back.
pub async fn send_copy(
    port: u16,
    op: Operation,
    src: &str,
    dst: &str,
    dest_nm_port: u16,
) -> io::Result<Status> {
    let mut stream = dial(port).await?;
    frames::write_op(&mut stream, op).await?;
    frames::write_path(&mut stream, src).await?;
    frames::write_path(&mut stream, dst).await?;
    stream.write_u32_le(dest_nm_port as u32).await?;
    stream.flush().await?;

    let status = frames::read_status(&mut stream).await?;
    debug!(target: "routefs::ss_link", port, ?op, src, dst, %status, "copy command answered");
    Ok(status)
}

/// Fetches the stat record for a path from its owning server.
pub async fn fetch_metadata(port: u16, path: &str) -> io::Result<(Status, Option<FileMetadata>)> {
    let mut stream = dial(port).await?;
    frames::write_op(&mut stream, Operation::Metadata).await?;
    frames::write_path(&mut stream, path).await?;
    stream.flush().await?;

    let status = frames::read_status(&mut stream).await?;
    if status != Status::Success {
        return Ok((status, None));
    }
    let metadata = FileMetadata::read_from(&mut stream).await?;
    Ok((status, Some(metadata)))
}
