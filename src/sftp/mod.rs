//! # Remote File Transfer
//!
//! Partner SFTP access and the pipeline that stages remote files into blob
//! storage.

pub mod errors;
mod memory;
mod ssh;
mod traits;
mod transfer;

pub use errors::{FileTransferError, RemoteError, RemoteResult, TransferError, TransferResult};
pub use memory::{InMemoryRemoteConnector, InMemoryRemoteFileServer};
pub use ssh::{parse_authorized_key, SftpConnector, Ssh2RemoteFileServer, SshCredentials};
pub use traits::{RemoteConnector, RemoteFileEntry, RemoteFileServer};
pub use transfer::{CopiedFile, FileTransferOutcome, TransferPipeline, TransferReport};
