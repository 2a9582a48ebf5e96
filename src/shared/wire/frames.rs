use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::shared::wire::types::{Operation, Status};

/// Hard ceiling on a path travelling in a fixed frame, NUL terminator included.
pub const MAX_PATH_LEN: usize = 1024;
/// Fixed capacity of the server identity field in a join record.
pub const UUID_LEN: usize = 36;

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

/// Decodes a NUL-padded fixed-capacity string field. The field must contain
/// at least one NUL when the payload is shorter than the capacity.
fn parse_fixed_str(buf: &[u8], allow_full: bool) -> io::Result<String> {
    let end = match buf.iter().position(|&b| b == 0) {
        Some(end) => end,
        None if allow_full => buf.len(),
        None => return Err(invalid("fixed string field is missing its terminator")),
    };
    String::from_utf8(buf[..end].to_vec()).map_err(|_| invalid("fixed string field is not UTF-8"))
}

fn fill_fixed_str(buf: &mut [u8], value: &str) {
    buf[..value.len()].copy_from_slice(value.as_bytes());
}

pub async fn write_op<W: AsyncWrite + Unpin>(writer: &mut W, op: Operation) -> io::Result<()> {
    writer.write_u8(op.as_u8()).await
}

pub async fn write_status<W: AsyncWrite + Unpin>(writer: &mut W, status: Status) -> io::Result<()> {
    writer.write_u8(status.as_u8()).await?;
    writer.flush().await
}

pub async fn read_status<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Status> {
    let byte = reader.read_u8().await?;
    Status::from_u8(byte).ok_or_else(|| invalid(format!("unknown status byte {byte}")))
}

/// Writes a path as a fixed `MAX_PATH_LEN` frame, NUL padded.
pub async fn write_path<W: AsyncWrite + Unpin>(writer: &mut W, path: &str) -> io::Result<()> {
    if path.is_empty() {
        return Err(invalid("refusing to send an empty path"));
    }
    if path.len() >= MAX_PATH_LEN {
        return Err(invalid(format!(
            "path length {} exceeds the {} byte frame",
            path.len(),
            MAX_PATH_LEN
        )));
    }
    let mut frame = [0u8; MAX_PATH_LEN];
    fill_fixed_str(&mut frame, path);
    writer.write_all(&frame).await
}

/// Reads a fixed path frame. The frame must hold a NUL-terminated, non-empty
/// UTF-8 string; anything else is rejected as `InvalidData`.
pub async fn read_path<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<String> {
    let mut frame = [0u8; MAX_PATH_LEN];
    reader.read_exact(&mut frame).await?;
    let path = parse_fixed_str(&frame, false)?;
    if path.is_empty() {
        return Err(invalid("path frame is empty"));
    }
    Ok(path)
}

/// Identity and subtree a storage server announces when it joins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRecord {
    pub client_port: u32,
    pub nm_port: u32,
    pub alive_port: u32,
    pub uuid: String,
    pub tree: Vec<u8>,
}

impl JoinRecord {
    pub async fn write_to<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> io::Result<()> {
        if self.uuid.len() > UUID_LEN {
            return Err(invalid(format!(
                "uuid length {} exceeds the {} byte field",
                self.uuid.len(),
                UUID_LEN
            )));
        }
        writer.write_u32_le(self.client_port).await?;
        writer.write_u32_le(self.nm_port).await?;
        writer.write_u32_le(self.alive_port).await?;
        let mut uuid_field = [0u8; UUID_LEN];
        fill_fixed_str(&mut uuid_field, &self.uuid);
        writer.write_all(&uuid_field).await?;
        writer.write_u32_le(self.tree.len() as u32).await?;
        writer.write_all(&self.tree).await?;
        writer.flush().await
    }

    /// Reads a join record, refusing subtree payloads larger than
    /// `max_tree_bytes` before allocating anything for them.
    pub async fn read_from<R: AsyncRead + Unpin>(
        reader: &mut R,
        max_tree_bytes: usize,
    ) -> io::Result<Self> {
        let client_port = reader.read_u32_le().await?;
        let nm_port = reader.read_u32_le().await?;
        let alive_port = reader.read_u32_le().await?;

        let mut uuid_field = [0u8; UUID_LEN];
        reader.read_exact(&mut uuid_field).await?;
        let uuid = parse_fixed_str(&uuid_field, true)?;

        let tree_len = reader.read_u32_le().await? as usize;
        if tree_len > max_tree_bytes {
            return Err(invalid(format!(
                "serialized subtree of {tree_len} bytes exceeds the {max_tree_bytes} byte limit"
            )));
        }
        let mut tree = vec![0u8; tree_len];
        reader.read_exact(&mut tree).await?;

        Ok(Self {
            client_port,
            nm_port,
            alive_port,
            uuid,
            tree,
        })
    }
}

/// Stat-style record a storage server returns for a METADATA request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    pub modified: i64,
    pub accessed: i64,
    pub status_changed: i64,
    pub size: u64,
    pub mode: u32,
}

impl FileMetadata {
    pub async fn write_to<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_i64_le(self.modified).await?;
        writer.write_i64_le(self.accessed).await?;
        writer.write_i64_le(self.status_changed).await?;
        writer.write_u64_le(self.size).await?;
        writer.write_u32_le(self.mode).await
    }

    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            modified: reader.read_i64_le().await?,
            accessed: reader.read_i64_le().await?,
            status_changed: reader.read_i64_le().await?,
            size: reader.read_u64_le().await?,
            mode: reader.read_u32_le().await?,
        })
    }
}
