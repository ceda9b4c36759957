//! Mock implementations for testing.

use async_trait::async_trait;
use micro_rpc::{Node, Registry, RegistryKind, RpcError, RpcResult};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing_subscriber::fmt::MakeWriter;

/// Registry returning a fixed node list, with a switch to simulate an
/// unreachable backend.
#[derive(Debug, Default)]
pub struct MockRegistry {
    nodes: Vec<Node>,
    down: AtomicBool,
    resolves: AtomicUsize,
}

impl MockRegistry {
    /// Create a registry answering every service with `nodes`.
    #[must_use]
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            ..Self::default()
        }
    }

    /// Create a registry whose backend is down.
    #[must_use]
    pub fn unreachable() -> Self {
        let registry = Self::default();
        registry.set_down(true);
        registry
    }

    /// Make resolution fail (or succeed again).
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// Number of resolve calls so far.
    #[must_use]
    pub fn resolve_count(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Registry for MockRegistry {
    fn kind(&self) -> RegistryKind {
        RegistryKind::Static
    }

    async fn resolve(&self, service: &str) -> RpcResult<Vec<Node>> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(RpcError::discovery(service, "mock registry down"));
        }
        Ok(self.nodes.clone())
    }
}

/// In-memory log sink for asserting on formatted lines.
///
/// Plug it into [`micro_log::line_layer`] to get exactly the lines the file
/// sink would receive.
#[derive(Debug, Clone, Default)]
pub struct CaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CaptureWriter {
    /// Create an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer)
            .lines()
            .map(ToString::to_string)
            .collect()
    }

    /// Captured lines tagged with `level` (`"INFO"`, `"ERROR"`, ...).
    #[must_use]
    pub fn lines_at(&self, level: &str) -> Vec<String> {
        let tag = format!("\t{level}\t");
        self.lines().into_iter().filter(|l| l.contains(&tag)).collect()
    }

    /// Captured lines containing `needle`.
    #[must_use]
    pub fn lines_containing(&self, needle: &str) -> Vec<String> {
        self.lines().into_iter().filter(|l| l.contains(needle)).collect()
    }

    /// Drop everything captured so far.
    pub fn clear(&self) {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CaptureWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
