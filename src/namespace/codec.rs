use thiserror::Error;

use crate::namespace::tree::{NodeId, PathTree};

/// Marker opening a node record; children follow until the end marker.
pub const NODE_MARKER: u8 = b'D';
pub const END_MARKER: u8 = b'.';

/// Ceiling on nesting depth accepted while decoding. A hostile buffer of
/// repeated node markers must exhaust this, not the stack or the arena.
pub const MAX_DEPTH: usize = 64;

const NAME_FIELD: usize = 128;
const UUID_FIELD: usize = 36;
const FLAG_IS_FILE: u8 = 0b01;
const FLAG_ACCESSIBLE: u8 = 0b10;
/// name + flags + owner id + owner uuid.
const RECORD_LEN: usize = NAME_FIELD + 1 + 4 + UUID_FIELD;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of buffer at offset {at}")]
    Truncated { at: usize },
    #[error("expected a marker at offset {at}, found {found:#04x}")]
    BadMarker { at: usize, found: u8 },
    #[error("node name is not valid UTF-8")]
    BadName,
    #[error("node name of {len} bytes exceeds the {max} byte field")]
    NameTooLong { len: usize, max: usize },
    #[error("uuid of {len} bytes exceeds the {max} byte field")]
    UuidTooLong { len: usize, max: usize },
    #[error("uuid field is not valid UTF-8")]
    BadUuid,
    #[error("nesting depth exceeds {max}")]
    TooDeep { max: usize },
    #[error("{0} trailing bytes after the tree end")]
    TrailingBytes(usize),
}

/// Serializes the whole tree, root included.
pub fn encode(tree: &PathTree) -> Result<Vec<u8>, CodecError> {
    encode_subtree(tree, tree.root())
}

/// Pre-order, self-delimiting encoding: node marker, fixed metadata record,
/// each child in turn, end marker. Subtree boundaries need no lengths.
pub fn encode_subtree(tree: &PathTree, root: NodeId) -> Result<Vec<u8>, CodecError> {
    enum Step {
        Enter(NodeId),
        Exit,
    }

    let mut out = Vec::new();
    let mut stack = vec![Step::Enter(root)];
    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(id) => {
                out.push(NODE_MARKER);
                write_record(&mut out, tree, id)?;
                stack.push(Step::Exit);
                let mut children: Vec<NodeId> = tree.children(id).collect();
                children.reverse();
                for child in children {
                    stack.push(Step::Enter(child));
                }
            }
            Step::Exit => out.push(END_MARKER),
        }
    }
    Ok(out)
}

fn write_record(out: &mut Vec<u8>, tree: &PathTree, id: NodeId) -> Result<(), CodecError> {
    let node = tree.node(id);

    if node.name.len() >= NAME_FIELD {
        return Err(CodecError::NameTooLong {
            len: node.name.len(),
            max: NAME_FIELD,
        });
    }
    if node.owner_uuid.len() > UUID_FIELD {
        return Err(CodecError::UuidTooLong {
            len: node.owner_uuid.len(),
            max: UUID_FIELD,
        });
    }

    let mut name_field = [0u8; NAME_FIELD];
    name_field[..node.name.len()].copy_from_slice(node.name.as_bytes());
    out.extend_from_slice(&name_field);

    let mut flags = 0u8;
    if node.is_file {
        flags |= FLAG_IS_FILE;
    }
    if node.accessible {
        flags |= FLAG_ACCESSIBLE;
    }
    out.push(flags);

    out.extend_from_slice(&node.owner_id.to_le_bytes());

    let mut uuid_field = [0u8; UUID_FIELD];
    uuid_field[..node.owner_uuid.len()].copy_from_slice(node.owner_uuid.as_bytes());
    out.extend_from_slice(&uuid_field);

    Ok(())
}

struct DecodedRecord {
    name: String,
    is_file: bool,
    accessible: bool,
    owner_id: u32,
    owner_uuid: String,
}

fn read_record(buf: &[u8], at: usize) -> Result<DecodedRecord, CodecError> {
    if at + RECORD_LEN > buf.len() {
        return Err(CodecError::Truncated { at });
    }
    let record = &buf[at..at + RECORD_LEN];

    let name_raw = &record[..NAME_FIELD];
    let name_end = name_raw.iter().position(|&b| b == 0).unwrap_or(NAME_FIELD);
    let name =
        std::str::from_utf8(&name_raw[..name_end]).map_err(|_| CodecError::BadName)?.to_string();

    let flags = record[NAME_FIELD];
    let owner_id = u32::from_le_bytes(
        record[NAME_FIELD + 1..NAME_FIELD + 5]
            .try_into()
            .expect("record slice has fixed width"),
    );

    let uuid_raw = &record[NAME_FIELD + 5..];
    let uuid_end = uuid_raw.iter().position(|&b| b == 0).unwrap_or(UUID_FIELD);
    let owner_uuid =
        std::str::from_utf8(&uuid_raw[..uuid_end]).map_err(|_| CodecError::BadUuid)?.to_string();

    Ok(DecodedRecord {
        name,
        is_file: flags & FLAG_IS_FILE != 0,
        accessible: flags & FLAG_ACCESSIBLE != 0,
        owner_id,
        owner_uuid,
    })
}

/// Rebuilds a tree from its encoding. Every read is bounds-checked against
/// the buffer, depth is capped, and leftover bytes after the closing marker
/// are an error; a malformed peer can fail the decode but never push a read
/// out of bounds.
pub fn decode(buf: &[u8]) -> Result<PathTree, CodecError> {
    let mut tree = PathTree::new();
    let mut pos = 0usize;

    match buf.first() {
        Some(&NODE_MARKER) => pos += 1,
        Some(&other) => return Err(CodecError::BadMarker { at: 0, found: other }),
        None => return Err(CodecError::Truncated { at: 0 }),
    }

    let root_record = read_record(buf, pos)?;
    pos += RECORD_LEN;
    tree.set_meta(
        tree.root(),
        &root_record.name,
        root_record.is_file,
        root_record.accessible,
        root_record.owner_id,
        &root_record.owner_uuid,
    );

    let mut parents: Vec<NodeId> = vec![tree.root()];
    loop {
        let Some(&marker) = buf.get(pos) else {
            return Err(CodecError::Truncated { at: pos });
        };
        match marker {
            NODE_MARKER => {
                if parents.len() >= MAX_DEPTH {
                    return Err(CodecError::TooDeep { max: MAX_DEPTH });
                }
                pos += 1;
                let record = read_record(buf, pos)?;
                pos += RECORD_LEN;

                let parent = *parents.last().expect("decode stack holds the current parent");
                let id = tree.attach_child_with(
                    parent,
                    &record.name,
                    record.is_file,
                    record.accessible,
                    record.owner_id,
                    &record.owner_uuid,
                );
                parents.push(id);
            }
            END_MARKER => {
                pos += 1;
                parents.pop();
                if parents.is_empty() {
                    if pos != buf.len() {
                        return Err(CodecError::TrailingBytes(buf.len() - pos));
                    }
                    return Ok(tree);
                }
            }
            other => return Err(CodecError::BadMarker { at: pos, found: other }),
        }
    }
}
