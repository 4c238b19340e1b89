//! In-memory remote file server and connector (for testing).

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::errors::{RemoteError, RemoteResult, TransferError, TransferResult};
use super::traits::{RemoteConnector, RemoteFileEntry, RemoteFileServer};

#[derive(Debug, Default)]
pub struct InMemoryRemoteFileServer {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    directories: Mutex<BTreeSet<String>>,
    failing_reads: Mutex<HashSet<String>>,
    failing_removes: Mutex<HashSet<String>>,
    fail_listing: AtomicBool,
    closed: AtomicBool,
    read_calls: AtomicUsize,
    remove_calls: AtomicUsize,
}

impl InMemoryRemoteFileServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file at a full path such as `outbox/a.hl7`
    pub fn add_file(&self, path: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.files.lock().insert(path.into(), contents.into());
    }

    pub fn add_directory(&self, path: impl Into<String>) {
        self.directories.lock().insert(path.into());
    }

    pub fn fail_read_of(&self, path: impl Into<String>) {
        self.failing_reads.lock().insert(path.into());
    }

    pub fn fail_remove_of(&self, path: impl Into<String>) {
        self.failing_removes.lock().insert(path.into());
    }

    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub fn file_paths(&self) -> Vec<String> {
        self.files.lock().keys().cloned().collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn remove_calls(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> RemoteResult<()> {
        if self.is_closed() {
            Err(RemoteError::Closed)
        } else {
            Ok(())
        }
    }
}

fn child_name<'a>(directory: &str, path: &'a str) -> Option<&'a str> {
    let prefix = format!("{}/", directory.trim_end_matches('/'));
    let rest = path.strip_prefix(&prefix)?;
    (!rest.is_empty() && !rest.contains('/')).then_some(rest)
}

#[async_trait]
impl RemoteFileServer for InMemoryRemoteFileServer {
    async fn read_dir(&self, path: &str) -> RemoteResult<Vec<RemoteFileEntry>> {
        self.ensure_open()?;
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(RemoteError::operation("readdir", path, "injected failure"));
        }

        let mut entries: Vec<RemoteFileEntry> = self
            .directories
            .lock()
            .iter()
            .filter_map(|dir| child_name(path, dir))
            .map(RemoteFileEntry::directory)
            .collect();

        entries.extend(self.files.lock().iter().filter_map(|(file, contents)| {
            child_name(path, file).map(|name| RemoteFileEntry::file(name, contents.len() as u64))
        }));

        Ok(entries)
    }

    async fn read_file(&self, path: &str) -> RemoteResult<Vec<u8>> {
        self.ensure_open()?;
        self.read_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_reads.lock().contains(path) {
            return Err(RemoteError::operation("read", path, "injected failure"));
        }

        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteError::operation("open", path, "no such file"))
    }

    async fn remove(&self, path: &str) -> RemoteResult<()> {
        self.ensure_open()?;
        self.remove_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_removes.lock().contains(path) {
            return Err(RemoteError::operation("remove", path, "injected failure"));
        }

        self.files
            .lock()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| RemoteError::operation("remove", path, "no such file"))
    }

    async fn close(&self) -> RemoteResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out one shared in-memory server for every partner
#[derive(Debug, Default)]
pub struct InMemoryRemoteConnector {
    server: Arc<InMemoryRemoteFileServer>,
    fail_connect: AtomicBool,
    connect_calls: AtomicUsize,
}

impl InMemoryRemoteConnector {
    pub fn new(server: Arc<InMemoryRemoteFileServer>) -> Self {
        Self {
            server,
            fail_connect: AtomicBool::new(false),
            connect_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteConnector for InMemoryRemoteConnector {
    async fn connect(&self, partner_id: &str) -> TransferResult<Arc<dyn RemoteFileServer>> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(TransferError::Remote(RemoteError::connection(
                partner_id,
                "injected failure",
            )));
        }
        Ok(self.server.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_dir_lists_direct_children() {
        let server = InMemoryRemoteFileServer::new();
        server.add_file("outbox/a.hl7", b"MSH|a".to_vec());
        server.add_file("outbox/nested/b.hl7", b"MSH|b".to_vec());
        server.add_directory("outbox/nested");
        server.add_file("elsewhere/c.hl7", b"MSH|c".to_vec());

        let entries = server.read_dir("outbox").await.unwrap();

        assert_eq!(
            entries,
            vec![
                RemoteFileEntry::directory("nested"),
                RemoteFileEntry::file("a.hl7", 5),
            ]
        );
    }

    #[tokio::test]
    async fn test_closed_server_rejects_calls() {
        let server = InMemoryRemoteFileServer::new();
        server.add_file("outbox/a.hl7", b"MSH|a".to_vec());
        server.close().await.unwrap();

        assert_eq!(
            server.read_file("outbox/a.hl7").await,
            Err(RemoteError::Closed)
        );
    }
}
