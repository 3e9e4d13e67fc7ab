use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Planned { chunks: usize, total_bytes: u64 },
    ChunkDownloaded { index: usize, bytes: u64 },
    ChunkComplete { index: usize, bytes: u64, skipped: bool },
}

#[derive(Clone)]
pub struct CopyProgress {
    sender: UnboundedSender<ProgressEvent>,
}

impl CopyProgress {
    pub fn new(sender: UnboundedSender<ProgressEvent>) -> Self {
        Self { sender }
    }

    pub fn report_planned(&self, chunks: usize, total_bytes: u64) {
        let _ = self.sender.send(ProgressEvent::Planned {
            chunks,
            total_bytes,
        });
    }

    pub fn report_downloaded(&self, index: usize, bytes: u64) {
        let _ = self
            .sender
            .send(ProgressEvent::ChunkDownloaded { index, bytes });
    }

    pub fn report_complete(&self, index: usize, bytes: u64, skipped: bool) {
        let _ = self.sender.send(ProgressEvent::ChunkComplete {
            index,
            bytes,
            skipped,
        });
    }
}
