use std::any::Any;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info};

use crate::dynamodb::{Page, TableService};
use crate::error::{CopyError, Result};

/// Item totals of a finished copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopySummary {
    pub scanned: u64,
    pub written: u64,
}

/// Copies every item of the source table into the target table.
///
/// `readers` tasks each scan one segment of the source and push pages into a
/// channel holding at most `writers` pages; `writers` tasks drain it with
/// batch writes to the target. On the first fault reported by any task, the
/// writers stop after the batch they are writing, which closes the page channel
/// and stops the readers. The fault is returned once every task has finished.
#[derive(Debug, Clone)]
pub struct Copier {
    source: TableService,
    target: TableService,
    readers: u32,
    writers: u32,
}

impl Copier {
    pub fn new(source: TableService, target: TableService, readers: u32, writers: u32) -> Self {
        Self {
            source,
            target,
            readers,
            writers,
        }
    }

    pub async fn copy(&self) -> Result<CopySummary> {
        if self.readers == 0 || self.writers == 0 {
            return Err(CopyError::Validation(format!(
                "copy needs at least one reader and one writer (readers: {}, writers: {})",
                self.readers, self.writers
            )));
        }

        info!(
            "copying {} to {} with {} readers and {} writers",
            self.source.table_name(),
            self.target.table_name(),
            self.readers,
            self.writers
        );

        let (pages_tx, pages_rx) = page_channel(self.writers);
        // Every task reports at most one fault, the coordinator one per panicked task.
        let (faults_tx, mut faults_rx) =
            mpsc::channel::<CopyError>(self.readers as usize + self.writers as usize);

        let readers: Vec<_> = (0..self.readers)
            .map(|segment| self.spawn_reader(segment, pages_tx.clone(), faults_tx.clone()))
            .collect();
        // The page channel closes once the last reader drops its sender.
        drop(pages_tx);

        let (stop_tx, stop_rx) = watch::channel(false);
        let pages_rx = Arc::new(Mutex::new(pages_rx));
        let writers: Vec<_> = (0..self.writers)
            .map(|id| self.spawn_writer(id, pages_rx.clone(), stop_rx.clone(), faults_tx.clone()))
            .collect();
        drop(pages_rx);
        drop(stop_rx);

        let coordinator = tokio::spawn(coordinate(readers, writers, faults_tx));

        let fault = faults_rx.recv().await;
        if fault.is_some() {
            info!("stopping copy tasks after the first fault");
            stop_tx.send_replace(true);
        }
        // Later faults fail to send and are dropped.
        drop(faults_rx);

        let summary = coordinator
            .await
            .map_err(|e| CopyError::Pipeline(format!("copy coordinator failed: {e}")))?;
        match fault {
            Some(fault) => Err(fault),
            None => Ok(summary),
        }
    }

    fn spawn_reader(
        &self,
        segment: u32,
        pages: mpsc::Sender<Page>,
        faults: mpsc::Sender<CopyError>,
    ) -> JoinHandle<u64> {
        let source = self.source.clone();
        let total_segments = self.readers;

        tokio::spawn(async move {
            match source.scan(total_segments, segment, &pages).await {
                Ok(scanned) => scanned,
                Err(err) => {
                    error!("reader {segment} failed: {err}");
                    let _ = faults.send(err).await;
                    0
                }
            }
        })
    }

    fn spawn_writer(
        &self,
        id: u32,
        pages: Arc<Mutex<mpsc::Receiver<Page>>>,
        mut stop: watch::Receiver<bool>,
        faults: mpsc::Sender<CopyError>,
    ) -> JoinHandle<u64> {
        let target = self.target.clone();

        tokio::spawn(async move {
            let mut written: u64 = 0;
            loop {
                let page = tokio::select! {
                    biased;
                    _ = stop.changed() => {
                        info!("writer {id} stopped");
                        break;
                    }
                    page = async { pages.lock().await.recv().await } => page,
                };
                let Some(page) = page else {
                    break;
                };

                let count = page.len() as u64;
                if let Err(err) = target.batch_write(page).await {
                    error!("writer {id} failed: {err}");
                    let _ = faults.send(err).await;
                    break;
                }
                written += count;
            }

            info!(
                "writer {id} wrote a total of {written} items to {}",
                target.table_name()
            );
            written
        })
    }
}

/// Bounded page channel: at most `writers` pages wait unread.
pub(crate) fn page_channel(writers: u32) -> (mpsc::Sender<Page>, mpsc::Receiver<Page>) {
    mpsc::channel(writers.max(1) as usize)
}

async fn coordinate(
    readers: Vec<JoinHandle<u64>>,
    writers: Vec<JoinHandle<u64>>,
    faults: mpsc::Sender<CopyError>,
) -> CopySummary {
    let mut summary = CopySummary::default();

    for (segment, reader) in readers.into_iter().enumerate() {
        match reader.await {
            Ok(scanned) => summary.scanned += scanned,
            Err(err) => {
                let _ = faults.send(task_fault("reader", segment, err)).await;
            }
        }
    }

    for (id, writer) in writers.into_iter().enumerate() {
        match writer.await {
            Ok(written) => summary.written += written,
            Err(err) => {
                let _ = faults.send(task_fault("writer", id, err)).await;
            }
        }
    }

    info!(
        "copy finished: {} items scanned, {} items written",
        summary.scanned, summary.written
    );
    summary
}

fn task_fault(kind: &str, id: usize, err: JoinError) -> CopyError {
    let reason = if err.is_panic() {
        format!("panicked: {}", panic_message(err.into_panic()))
    } else {
        "was cancelled".to_string()
    };
    error!("{kind} {id} {reason}");
    CopyError::Pipeline(format!("{kind} {id} {reason}"))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
