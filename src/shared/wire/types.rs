use std::fmt;

/// Single-byte operation codes exchanged on every control connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Operation {
    Read = 0,
    Write = 1,
    Metadata = 2,
    CreateFile = 3,
    DeleteFile = 4,
    CreateFolder = 5,
    DeleteFolder = 6,
    CopyFile = 7,
    CopyFolder = 8,
    PrintTree = 9,
    Ack = 10,
    Disconnect = 11,
}

impl Operation {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Operation::Read),
            1 => Some(Operation::Write),
            2 => Some(Operation::Metadata),
            3 => Some(Operation::CreateFile),
            4 => Some(Operation::DeleteFile),
            5 => Some(Operation::CreateFolder),
            6 => Some(Operation::DeleteFolder),
            7 => Some(Operation::CopyFile),
            8 => Some(Operation::CopyFolder),
            9 => Some(Operation::PrintTree),
            10 => Some(Operation::Ack),
            11 => Some(Operation::Disconnect),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Operations that create or delete a path and therefore mutate the tree.
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            Operation::CreateFile
                | Operation::DeleteFile
                | Operation::CreateFolder
                | Operation::DeleteFolder
        )
    }

    pub fn is_copy(self) -> bool {
        matches!(self, Operation::CopyFile | Operation::CopyFolder)
    }

    /// Whether the operation targets a file (as opposed to a folder).
    pub fn targets_file(self) -> bool {
        matches!(
            self,
            Operation::CreateFile | Operation::DeleteFile | Operation::CopyFile
        )
    }
}

/// Single-byte status codes returned for every client-facing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Success = 0,
    InvalidPath = 1,
    InvalidOperation = 2,
    NotFound = 3,
    Unavailable = 4,
    ReadPermissionDenied = 5,
    WritePermissionDenied = 6,
    CreatePermissionDenied = 7,
    DeletePermissionDenied = 8,
    UnknownPermissionDenied = 9,
    InvalidType = 10,
    RecursiveCopy = 11,
    AlreadyExists = 12,
    NonEmptyDirectory = 13,
}

impl Status {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Status::Success),
            1 => Some(Status::InvalidPath),
            2 => Some(Status::InvalidOperation),
            3 => Some(Status::NotFound),
            4 => Some(Status::Unavailable),
            5 => Some(Status::ReadPermissionDenied),
            6 => Some(Status::WritePermissionDenied),
            7 => Some(Status::CreatePermissionDenied),
            8 => Some(Status::DeletePermissionDenied),
            9 => Some(Status::UnknownPermissionDenied),
            10 => Some(Status::InvalidType),
            11 => Some(Status::RecursiveCopy),
            12 => Some(Status::AlreadyExists),
            13 => Some(Status::NonEmptyDirectory),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn message(&self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::InvalidPath => "invalid path",
            Status::InvalidOperation => "invalid operation",
            Status::NotFound => "not found",
            Status::Unavailable => "storage server unavailable",
            Status::ReadPermissionDenied => "read permission denied",
            Status::WritePermissionDenied => "write permission denied",
            Status::CreatePermissionDenied => "create permission denied",
            Status::DeletePermissionDenied => "delete permission denied",
            Status::UnknownPermissionDenied => "permission denied",
            Status::InvalidType => "operation does not match path type",
            Status::RecursiveCopy => "destination lies inside the source",
            Status::AlreadyExists => "destination already exists",
            Status::NonEmptyDirectory => "directory is not empty",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}
