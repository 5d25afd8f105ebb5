//! Chunked log transfer.
//!
//! Streams the data lines of the log to the peer as numbered batches:
//!
//! ```text
//! {"batch":{"index":1,"total":3},"data":["...","..."]}
//! {"batch":{"index":2,"total":3},"data":["...","..."]}
//! {"batch":{"index":3,"total":3},"data":["..."]}
//! ```
//!
//! Liveness is checked before every batch and a fixed pause separates
//! consecutive batches.  The log is reset to its header only after the
//! last batch went out; an aborted transfer leaves it untouched, so the
//! next `update` resends everything from batch 1.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use super::message::{BatchHeader, BatchMessage, Response};
use crate::app::ports::RecordFile;
use crate::error::{RadioError, TransferError};
use crate::log_store::LogStore;

/// Message sent instead of batches when the log holds no data lines.
pub const NO_DATA_MESSAGE: &str = "No data available";

/// Where batches go.
pub trait TransferLink {
    /// Whether the requesting peer is still connected.
    fn is_live(&mut self) -> bool;

    /// Send one complete message.
    fn send(&mut self, payload: &[u8]) -> Result<(), RadioError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferReport {
    pub batches: usize,
    pub lines: usize,
}

/// `ceil(lines / batch_size)`; a zero batch size is treated as one.
pub fn batch_count(lines: usize, batch_size: usize) -> usize {
    lines.div_ceil(batch_size.max(1))
}

/// Split `lines` into numbered batches.
pub fn plan_batches(lines: &[String], batch_size: usize) -> Vec<BatchMessage<'_>> {
    let size = batch_size.max(1);
    let total = batch_count(lines.len(), size);
    lines
        .chunks(size)
        .enumerate()
        .map(|(i, data)| BatchMessage {
            batch: BatchHeader { index: i + 1, total },
            data,
        })
        .collect()
}

pub struct ChunkedTransfer {
    batch_size: usize,
    pacing_ms: u32,
}

impl ChunkedTransfer {
    pub fn new(batch_size: u16, pacing_ms: u32) -> Self {
        Self {
            batch_size: usize::from(batch_size.max(1)),
            pacing_ms,
        }
    }

    /// Send the whole log and reset it on success.
    ///
    /// An empty log produces a single "No data available" notice and
    /// counts as success with zero batches.  A failed notice is reported
    /// as `SendFailed { batch: 0 }`.
    pub fn run<F, L, D>(
        &self,
        store: &mut LogStore<F>,
        link: &mut L,
        delay: &mut D,
    ) -> Result<TransferReport, TransferError>
    where
        F: RecordFile,
        L: TransferLink,
        D: DelayNs,
    {
        let lines = store.read_data_lines().map_err(|e| {
            warn!("transfer: log read failed: {}", e);
            TransferError::Read
        })?;

        if lines.is_empty() {
            link.send(&Response::success(NO_DATA_MESSAGE).to_bytes())
                .map_err(|_| TransferError::SendFailed { batch: 0 })?;
            info!("transfer: no data");
            return Ok(TransferReport::default());
        }

        let batches = plan_batches(&lines, self.batch_size);
        let total = batches.len();
        info!("transfer: {} lines in {} batches", lines.len(), total);

        for msg in &batches {
            let index = msg.batch.index;
            if !link.is_live() {
                warn!("transfer: peer gone before batch {}/{}", index, total);
                return Err(TransferError::Disconnected {
                    before_batch: index,
                });
            }
            link.send(&msg.to_bytes()).map_err(|e| {
                warn!("transfer: batch {}/{} failed: {}", index, total, e);
                TransferError::SendFailed { batch: index }
            })?;
            info!("transfer: sent batch {}/{}", index, total);

            if index < total {
                delay.delay_ms(self.pacing_ms);
            }
        }

        store
            .truncate_to_header()
            .map_err(|_| TransferError::Truncate)?;

        Ok(TransferReport {
            batches: total,
            lines: lines.len(),
        })
    }
}
