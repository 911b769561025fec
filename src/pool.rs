use crate::classify;
use crate::config::RunConfig;
use crate::grid::Grid;
use crate::types::{Aggregate, Batch};
use anyhow::{anyhow, Context, Result};
use crossbeam::channel;
use std::io::BufRead;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info};

/// Run the whole pipeline over one record stream: dispatch batches to a
/// fixed pool of workers, then reduce their local aggregates into the
/// global result. `processes == 1` skips the pool and classifies the
/// stream directly on the calling thread.
pub fn run(reader: impl BufRead, grid: &Arc<Grid>, config: &RunConfig) -> Result<Aggregate> {
    config.validate()?;
    if config.processes == 1 {
        return run_single(reader, grid);
    }

    let worker_count = config.processes - 1;
    let mut senders = Vec::with_capacity(worker_count);
    let mut handles = Vec::with_capacity(worker_count);

    // Workers 1..N-1, each with its own batch channel. The coordinator
    // (the calling thread) is id 0 and never receives batches.
    for worker_id in 1..=worker_count {
        let (tx, rx) = channel::unbounded::<Batch>();
        let grid = Arc::clone(grid);
        let handle = thread::Builder::new()
            .name(format!("worker-{}", worker_id))
            .spawn(move || worker_loop(worker_id, rx, &grid))
            .with_context(|| format!("Failed to spawn worker {}", worker_id))?;
        senders.push(tx);
        handles.push(handle);
    }

    dispatch(reader, &senders, config.batch_size_per_message)?;
    drop(senders);

    // Gather-then-fold reduction. Both merge operators are commutative and
    // associative, so join order does not affect the result.
    let mut global = Aggregate::default();
    for handle in handles {
        let local = handle
            .join()
            .map_err(|_| anyhow!("A worker thread panicked"))??;
        global = global.merge(local);
    }
    Ok(global)
}

/// Single-process path: the one process classifies the entire stream and
/// its local aggregate is the global one.
fn run_single(reader: impl BufRead, grid: &Grid) -> Result<Aggregate> {
    let mut aggregate = Aggregate::default();
    let mut lines = 0u64;
    for line in reader.lines() {
        let line = line.context("Failed to read record stream")?;
        classify::classify(&line, grid, &mut aggregate);
        lines += 1;
    }
    info!(lines, "classified record stream without a pool");
    Ok(aggregate)
}

/// Read the stream lazily, grouping lines into fixed-size batches routed
/// round-robin over the workers, then send every worker the empty sentinel.
fn dispatch(reader: impl BufRead, senders: &[channel::Sender<Batch>], batch_size: usize) -> Result<()> {
    // Round-robin pointer, local to this loop. Wraps over the worker set
    // only; the coordinator is never a destination.
    let mut next = 0usize;
    let mut batch = Batch::new();
    let mut lines = 0u64;
    let mut batches = 0u64;

    for line in reader.lines() {
        batch.push(line.context("Failed to read record stream")?);
        lines += 1;
        if batch.len() == batch_size {
            send_batch(&senders[next], std::mem::take(&mut batch), next + 1)?;
            batches += 1;
            next = (next + 1) % senders.len();
        }
    }
    if !batch.is_empty() {
        send_batch(&senders[next], batch, next + 1)?;
        batches += 1;
    }

    // Stop signal: one empty batch per worker, after all real batches.
    for (i, tx) in senders.iter().enumerate() {
        send_batch(tx, Batch::new(), i + 1)?;
    }

    info!(lines, batches, workers = senders.len(), "dispatch finished");
    Ok(())
}

fn send_batch(tx: &channel::Sender<Batch>, batch: Batch, worker_id: usize) -> Result<()> {
    debug!(worker_id, len = batch.len(), "sending batch");
    tx.send(batch)
        .with_context(|| format!("Worker {} hung up before end of stream", worker_id))
}

/// Block on the batch channel, classifying every received batch into this
/// worker's own aggregate, until the empty sentinel arrives. The channel
/// closing before the sentinel is a transport failure and fails the run.
fn worker_loop(worker_id: usize, rx: channel::Receiver<Batch>, grid: &Grid) -> Result<Aggregate> {
    let mut aggregate = Aggregate::default();
    loop {
        let batch = rx
            .recv()
            .with_context(|| format!("Worker {} lost its batch channel before the stop signal", worker_id))?;
        if batch.is_empty() {
            break;
        }
        classify::classify_batch(&batch, grid, &mut aggregate);
    }
    debug!(
        worker_id,
        classified = aggregate.classified(),
        dropped = aggregate.dropped,
        "worker finished"
    );
    Ok(aggregate)
}
