//! Readers/writer scheduling of path searches and graph mutations.
//!
//! One driver thread owns the [`PathScheduler`] and calls
//! [`tick`](PathScheduler::tick) once per game tick. Searches run on a
//! worker pool under shared access to the graph; asynchronous mutation
//! batches take exclusive access, which waits for every running search.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard};

use log::{debug, trace};
use tilenav_core::TileRef;

use crate::astar::{PathRequest, Route, find_path, find_path_traced};
use crate::error::{NavError, PathError};
use crate::events::{EventFeed, GraphEvent};
use crate::graph::NavGraph;
use crate::profile::Agent;
use crate::reach::RegionCache;
use crate::trace::SearchTrace;

/// Cooperative cancellation for queued path requests.
///
/// Cloning shares the flag. A search that already started is not
/// interrupted; only requests still waiting for a worker are dropped.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Flag every holder of this token as cancelled.
    #[inline]
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

/// The pending answer to a [`PathScheduler::request_path`] call.
#[derive(Debug)]
pub struct PathHandle {
    rx: Receiver<Result<Route, PathError>>,
    token: CancelToken,
}

impl PathHandle {
    /// Block until the search finished.
    pub fn wait(self) -> Result<Route, PathError> {
        self.rx.recv().unwrap_or(Err(PathError::SchedulerClosed))
    }

    /// The result, if it is ready. Yields it only once.
    pub fn try_result(&self) -> Option<Result<Route, PathError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(PathError::SchedulerClosed)),
        }
    }

    /// Drop the search if it has not started yet.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The token this request was queued with.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

/// What one [`PathScheduler::tick`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    /// Obstruction add/remove events applied under shared access.
    pub sync_applied: usize,
    /// Asynchronous events applied in an exclusive batch.
    pub async_applied: usize,
    /// Asynchronous events still waiting for running searches.
    pub async_deferred: usize,
    pub chunks_built: usize,
    pub dispatched: usize,
    /// Cancelled requests dropped before they started.
    pub dropped: usize,
}

struct Pending {
    request: PathRequest,
    token: CancelToken,
    reply: Sender<Result<Route, PathError>>,
}

pub struct PathScheduler {
    graph: Arc<RwLock<NavGraph>>,
    regions: Mutex<RegionCache>,
    pool: rayon::ThreadPool,
    events_tx: Sender<GraphEvent>,
    events_rx: Receiver<GraphEvent>,
    pending_events: Vec<GraphEvent>,
    queue: VecDeque<Pending>,
    in_flight: Arc<AtomicUsize>,
    deferred_ticks: u32,
    diagnostics: Option<Sender<SearchTrace>>,
}

impl std::fmt::Debug for PathScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathScheduler")
            .field("queued", &self.queued())
            .field("in_flight", &self.in_flight())
            .field("pending_mutations", &self.pending_mutations())
            .field("workers", &self.pool.current_num_threads())
            .finish_non_exhaustive()
    }
}

impl PathScheduler {
    /// Take ownership of `graph` and start the search workers.
    pub fn new(graph: NavGraph) -> Result<Self, NavError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(graph.config().worker_threads)
            .thread_name(|i| format!("tilenav-search-{i}"))
            .build()?;
        let (events_tx, events_rx) = mpsc::channel();
        Ok(Self {
            graph: Arc::new(RwLock::new(graph)),
            regions: Mutex::new(RegionCache::new()),
            pool,
            events_tx,
            events_rx,
            pending_events: Vec::new(),
            queue: VecDeque::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            deferred_ticks: 0,
            diagnostics: None,
        })
    }

    /// A new producer handle for graph events.
    pub fn feed(&self) -> EventFeed {
        EventFeed::new(self.events_tx.clone())
    }

    /// Shared access to the graph. Holding the guard delays the next
    /// mutation batch.
    pub fn graph(&self) -> RwLockReadGuard<'_, NavGraph> {
        self.graph.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stream a [`SearchTrace`] for every search completed from now on.
    /// Replaces any previous receiver.
    pub fn diagnostics(&mut self) -> Receiver<SearchTrace> {
        let (tx, rx) = mpsc::channel();
        self.diagnostics = Some(tx);
        rx
    }

    /// Queue a search. It starts on the next [`tick`](Self::tick).
    pub fn request_path(&mut self, request: PathRequest, token: CancelToken) -> PathHandle {
        let (reply, rx) = mpsc::channel();
        self.queue.push_back(Pending {
            request,
            token: token.clone(),
            reply,
        });
        PathHandle { rx, token }
    }

    /// Reachability query against the current graph.
    pub fn can_access(&self, agent: &Agent, target: TileRef, range: u32) -> bool {
        let graph = self.graph();
        let mut regions = self.regions.lock().unwrap_or_else(PoisonError::into_inner);
        regions.can_access(&graph, agent, target, range)
    }

    /// Searches waiting to be dispatched.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Searches currently running on the pool.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Asynchronous events waiting for the next batch.
    pub fn pending_mutations(&self) -> usize {
        self.pending_events.len()
    }

    /// Advance one tick: drain events, apply synchronous ones, apply the
    /// asynchronous batch if no search holds it back (or it was held back
    /// for too long), then dispatch queued searches.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        let needs_chunks = {
            let graph = self.graph.read().unwrap_or_else(PoisonError::into_inner);
            report.tick = graph.advance_tick();
            while let Ok(event) = self.events_rx.try_recv() {
                if !event.is_sync() {
                    self.pending_events.push(event);
                } else if graph.apply_sync(&event) {
                    report.sync_applied += 1;
                }
            }
            self.queue
                .iter()
                .flat_map(|p| [p.request.start, p.request.end])
                .any(|t| graph.chunk(graph.chunk_key(t)).is_none())
        };

        if !self.pending_events.is_empty() || needs_chunks {
            let busy = self.in_flight() > 0;
            let max = self.graph().config().max_mutation_interval;
            if busy && self.deferred_ticks < max {
                self.deferred_ticks += 1;
                trace!(
                    "deferring {} mutations behind {} searches",
                    self.pending_events.len(),
                    self.in_flight()
                );
            } else {
                let (applied, built) = self.apply_batch();
                report.async_applied = applied;
                report.chunks_built = built;
                self.deferred_ticks = 0;
            }
        }
        report.async_deferred = self.pending_events.len();

        let (dispatched, dropped) = self.dispatch();
        report.dispatched = dispatched;
        report.dropped = dropped;
        report
    }

    /// Apply the pending batch under exclusive access and build the chunks
    /// queued requests refer to. Blocks until running searches finish.
    fn apply_batch(&mut self) -> (usize, usize) {
        let mut graph = self.graph.write().unwrap_or_else(PoisonError::into_inner);
        let events = std::mem::take(&mut self.pending_events);
        let applied = events.len();
        for event in events {
            graph.apply(event);
        }
        let before = graph.stats().chunks;
        for p in &self.queue {
            graph.ensure_chunk(p.request.start);
            graph.ensure_chunk(p.request.end);
        }
        let built = graph.stats().chunks.saturating_sub(before);
        debug!("applied {applied} mutations, built {built} chunks");
        (applied, built)
    }

    fn dispatch(&mut self) -> (usize, usize) {
        let (mut dispatched, mut dropped) = (0, 0);
        let mut waiting = VecDeque::new();
        let ready: Vec<Pending> = {
            let graph = self.graph.read().unwrap_or_else(PoisonError::into_inner);
            let mut ready = Vec::new();
            for p in self.queue.drain(..) {
                if p.token.is_cancelled() {
                    debug!("dropping cancelled search {} -> {}", p.request.start, p.request.end);
                    let _ = p.reply.send(Err(PathError::Cancelled));
                    dropped += 1;
                    continue;
                }
                let built = [p.request.start, p.request.end]
                    .iter()
                    .all(|t| graph.chunk(graph.chunk_key(*t)).is_some());
                if built {
                    ready.push(p);
                } else {
                    waiting.push_back(p);
                }
            }
            ready
        };
        self.queue = waiting;

        for p in ready {
            self.in_flight.fetch_add(1, Ordering::AcqRel);
            dispatched += 1;
            let graph = Arc::clone(&self.graph);
            let in_flight = Arc::clone(&self.in_flight);
            let diagnostics = self.diagnostics.clone();
            trace!("dispatching search {} -> {}", p.request.start, p.request.end);
            self.pool.spawn(move || {
                if p.token.is_cancelled() {
                    in_flight.fetch_sub(1, Ordering::AcqRel);
                    let _ = p.reply.send(Err(PathError::Cancelled));
                    return;
                }
                let (result, trace) = {
                    let graph = graph.read().unwrap_or_else(PoisonError::into_inner);
                    if diagnostics.is_some() {
                        let (result, trace) = find_path_traced(&graph, &p.request);
                        (result, Some(trace))
                    } else {
                        (find_path(&graph, &p.request), None)
                    }
                };
                in_flight.fetch_sub(1, Ordering::AcqRel);
                if let (Some(tx), Some(trace)) = (diagnostics, trace) {
                    let _ = tx.send(trace);
                }
                let _ = p.reply.send(result);
            });
        }
        (dispatched, dropped)
    }
}
