
use std::{
    fmt::Display,
    num::NonZeroUsize,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
};

use anyhow::{Context, Result, anyhow, ensure};
use crossbeam::channel::{Receiver, Sender, bounded, unbounded};

use crate::{
    filter::{
        BILINEAR_FILTERS,
        FilterScratch,
        SIXTAP_FILTERS,
        bilinear_first_pass,
        bilinear_second_pass,
        first_pass_rows,
        sixtap_first_pass,
        sixtap_second_pass,
    },
    params::{FilterKind, Plane},
    util::BlockView,
};

/// One block's interpolation, with its own copy of the reference pixels it reads.
///
/// Jobs own their input so they can outlive the frame buffer borrow that created them.
#[derive(Debug, Clone)]
pub struct FilterJob {
    kind: FilterKind,
    width: usize,
    height: usize,
    x_phase: usize,
    y_phase: usize,
    pixels: Vec<u8>,
    stride: NonZeroUsize,
}

impl FilterJob {
    /// Copies the filter context around `reference`'s origin for a `width` x `height`
    /// block at eighth-pixel phase (`x_phase`, `y_phase`).
    pub fn new(
        kind: FilterKind,
        width: usize,
        height: usize,
        reference: BlockView<'_>,
        x_phase: usize,
        y_phase: usize,
    ) -> Result<Self> {
        ensure!(
            x_phase < 8 && y_phase < 8,
            "filter phase ({x_phase}, {y_phase}) must be below 8"
        );
        ensure!(
            (1..=16).contains(&width) && (1..=16).contains(&height),
            "block of {width}x{height} is larger than the filter scratch"
        );

        let rows = first_pass_rows(kind, height, y_phase);
        let region = match kind {
            FilterKind::SixTap => reference.region(-2, -2, width + 5, rows),
            FilterKind::Bilinear if BILINEAR_FILTERS[x_phase][1] == 0 => {
                reference.region(0, 0, width, rows)
            }
            FilterKind::Bilinear => reference.region(0, 0, width + 1, rows),
        }
        .context("filter context does not fit inside the reference plane")?;

        Ok(FilterJob {
            kind,
            width,
            height,
            x_phase,
            y_phase,
            pixels: region.to_vec(),
            stride: reference.stride(),
        })
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    fn first_pass(&self, scratch: &mut FilterScratch) {
        let rows = first_pass_rows(self.kind, self.height, self.y_phase);
        match self.kind {
            FilterKind::SixTap => sixtap_first_pass(
                &self.pixels,
                self.stride,
                &mut scratch.sixtap[..rows * self.width],
                self.width,
                rows,
                &SIXTAP_FILTERS[self.x_phase],
            ),
            FilterKind::Bilinear => bilinear_first_pass(
                &self.pixels,
                self.stride,
                &mut scratch.bilinear[..rows * self.width],
                self.width,
                rows,
                &BILINEAR_FILTERS[self.x_phase],
            ),
        }
    }

    fn second_pass(&self, scratch: &FilterScratch) -> Vec<u8> {
        let mut out = vec![0u8; self.width * self.height];
        // SAFETY: checked to be at least 1 when the job was built
        let out_stride = unsafe { NonZeroUsize::new_unchecked(self.width) };
        match self.kind {
            FilterKind::SixTap => sixtap_second_pass(
                &scratch.sixtap,
                &mut out,
                out_stride,
                self.width,
                self.height,
                &SIXTAP_FILTERS[self.y_phase],
            ),
            FilterKind::Bilinear => bilinear_second_pass(
                &scratch.bilinear,
                &mut out,
                out_stride,
                self.width,
                self.height,
                &BILINEAR_FILTERS[self.y_phase],
            ),
        }
        out
    }
}

enum WorkItem {
    FirstPass(Arc<FilterJob>),
    SecondPass {
        job: Arc<FilterJob>,
        reply: Sender<Vec<u8>>,
    },
    Barrier(Sender<()>),
    #[cfg(test)]
    Halt,
}

/// A block submitted to a plane queue whose pixels may not be ready yet.
#[derive(Debug)]
pub struct PendingBlock {
    receiver: Receiver<Vec<u8>>,
    failed: Arc<AtomicBool>,
    plane: Plane,
}

impl PendingBlock {
    /// The filtered block, if the queue has produced it. Always ready after a
    /// successful [`Accelerator::finish`] on the block's plane.
    #[must_use]
    pub fn try_take(&self) -> Option<Vec<u8>> {
        self.receiver.try_recv().ok()
    }

    /// Blocks until the filtered block is ready. Returns `None` and disables the
    /// accelerator if the queue died first.
    #[must_use]
    pub fn wait(self) -> Option<Vec<u8>> {
        match self.receiver.recv() {
            Ok(pixels) => Some(pixels),
            Err(_) => {
                mark_failed(
                    &self.failed,
                    format_args!(
                        "the {:?} plane worker stopped before finishing a block",
                        self.plane
                    ),
                );
                None
            }
        }
    }
}

struct PlaneQueue {
    /// Held across both passes of a block so no other block's pass can land between
    /// them and overwrite the worker's intermediate buffer.
    sender: Option<Mutex<Sender<WorkItem>>>,
    worker: Option<JoinHandle<()>>,
    plane: Plane,
}

impl Drop for PlaneQueue {
    fn drop(&mut self) {
        // Closing the channel ends the worker's receive loop.
        drop(self.sender.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("{:?} plane accelerator worker panicked", self.plane);
            }
        }
    }
}

/// Asynchronous interpolation queues, one per plane, each served by its own worker.
///
/// Each block is submitted as two FIFO work items, the horizontal and the vertical
/// pass, and the worker keeps the intermediate buffer between them. The two items of a
/// block are always adjacent in the queue, even when several threads submit to the same
/// plane. Order is only guaranteed within one plane's queue.
///
/// The first failure of any kind disables every queue for the rest of the session.
/// Callers check [`Accelerator::is_available`] or handle a `None` result and take the
/// CPU path instead; the accelerator is never retried.
pub struct Accelerator {
    queues: Vec<PlaneQueue>,
    failed: Arc<AtomicBool>,
}

impl std::fmt::Debug for Accelerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accelerator")
            .field("queues", &self.queues.len())
            .field("available", &self.is_available())
            .finish()
    }
}

impl Accelerator {
    /// Starts one worker per plane.
    pub fn new() -> Result<Self> {
        let mut queues = Vec::with_capacity(Plane::ALL.len());
        for plane in Plane::ALL {
            let (sender, receiver) = unbounded();
            let worker = thread::Builder::new()
                .name(format!("vp8-accel-{plane:?}"))
                .spawn(move || run_worker(receiver))
                .with_context(|| format!("failed to start the {plane:?} plane accelerator worker"))?;
            queues.push(PlaneQueue {
                sender: Some(Mutex::new(sender)),
                worker: Some(worker),
                plane,
            });
        }
        log::debug!("started accelerator with {} plane queues", queues.len());

        Ok(Accelerator {
            queues,
            failed: Arc::new(AtomicBool::new(false)),
        })
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        !self.failed.load(Ordering::Acquire)
    }

    /// Permanently routes all work to the CPU path.
    pub fn disable(&self, reason: &anyhow::Error) {
        mark_failed(&self.failed, format_args!("{reason:#}"));
    }

    /// Queues both passes of `job` on `plane`'s worker.
    ///
    /// Returns `None` without queuing anything once the accelerator is disabled.
    pub fn submit(&self, plane: Plane, job: FilterJob) -> Option<PendingBlock> {
        if !self.is_available() {
            return None;
        }

        let job = Arc::new(job);
        let (reply, receiver) = bounded(1);
        let passes = [
            WorkItem::FirstPass(Arc::clone(&job)),
            WorkItem::SecondPass { job, reply },
        ];
        self.send(plane, passes).then(|| PendingBlock {
            receiver,
            failed: Arc::clone(&self.failed),
            plane,
        })
    }

    /// Waits until every item queued on `plane` so far has run.
    ///
    /// Returns `false` if the accelerator is disabled, in which case earlier pending
    /// blocks may never arrive.
    pub fn finish(&self, plane: Plane) -> bool {
        if !self.is_available() {
            return false;
        }

        let (done, receiver) = bounded(1);
        if !self.send(plane, [WorkItem::Barrier(done)]) {
            return false;
        }
        if receiver.recv().is_err() {
            self.disable(&anyhow!("the {plane:?} plane worker stopped before its barrier"));
            return false;
        }
        true
    }

    /// Queues `items` back to back on `plane`.
    fn send<const N: usize>(&self, plane: Plane, items: [WorkItem; N]) -> bool {
        let sent = self.queues[plane as usize]
            .sender
            .as_ref()
            .and_then(|sender| sender.lock().ok())
            .is_some_and(|sender| items.into_iter().all(|item| sender.send(item).is_ok()));
        if !sent {
            self.disable(&anyhow!("the {plane:?} plane queue is closed"));
        }
        sent
    }

    /// Stops `plane`'s worker as if it had crashed.
    #[cfg(test)]
    pub(crate) fn inject_fault(&self, plane: Plane) {
        let queue = &self.queues[plane as usize];
        if let Some(sender) = queue.sender.as_ref().and_then(|s| s.lock().ok()) {
            let _ = sender.send(WorkItem::Halt);
        }
    }
}

impl Drop for Accelerator {
    fn drop(&mut self) {
        self.queues.clear();
        log::debug!("stopped accelerator");
    }
}

fn mark_failed(failed: &AtomicBool, reason: impl Display) {
    if !failed.swap(true, Ordering::AcqRel) {
        log::warn!("accelerator disabled, falling back to CPU filtering: {reason}");
    }
}

fn run_worker(receiver: Receiver<WorkItem>) {
    let mut scratch = FilterScratch::new();
    for item in receiver {
        match item {
            WorkItem::FirstPass(job) => job.first_pass(&mut scratch),
            WorkItem::SecondPass { job, reply } => {
                // The submitter may have given up on the block.
                let _ = reply.send(job.second_pass(&scratch));
            }
            WorkItem::Barrier(done) => {
                let _ = done.send(());
            }
            #[cfg(test)]
            WorkItem::Halt => break,
        }
    }
}
