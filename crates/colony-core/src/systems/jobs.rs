//! FIFO job queue.
//!
//! The queue owns every live job, queued or held by a worker. Queue order is
//! an intrusive doubly-linked list threaded through the slot map, so removal
//! from the middle is O(1) and never invalidates other handles.

use hecs::Entity;
use slotmap::{SecondaryMap, SlotMap};

use crate::components::{Job, JobId, TileCoord};
use crate::events::{EventBus, SimEvent};
use crate::grid::Grid;

/// Whether enqueueing announces a new job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Announce {
    /// Fresh job: fires `JobCreated`.
    New,
    /// Returned by a worker: no event.
    Silent,
}

#[derive(Debug, Clone, Copy, Default)]
struct Link {
    prev: Option<JobId>,
    next: Option<JobId>,
}

#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: SlotMap<JobId, Job>,
    links: SecondaryMap<JobId, Link>,
    head: Option<JobId>,
    tail: Option<JobId>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of a job without queueing it.
    pub fn add(&mut self, job: Job) -> JobId {
        self.jobs.insert(job)
    }

    /// Appends a stored job to the back of the queue. Returns false if the
    /// job is unknown or already queued.
    pub fn enqueue(&mut self, id: JobId, announce: Announce, events: &mut EventBus) -> bool {
        if self.links.contains_key(id) {
            return false;
        }
        let Some(job) = self.jobs.get_mut(id) else {
            return false;
        };
        job.worker = None;
        let created = SimEvent::JobCreated {
            job: id,
            tile: job.tile,
            kind: job.kind.clone(),
        };

        self.links.insert(
            id,
            Link {
                prev: self.tail,
                next: None,
            },
        );
        match self.tail {
            Some(tail) => {
                if let Some(link) = self.links.get_mut(tail) {
                    link.next = Some(id);
                }
            }
            None => self.head = Some(id),
        }
        self.tail = Some(id);

        if announce == Announce::New {
            events.emit(created);
        }
        true
    }

    /// Pops the front job. `None` on an empty queue.
    pub fn dequeue(&mut self) -> Option<JobId> {
        let id = self.head?;
        self.unlink(id);
        Some(id)
    }

    /// Pops the first queued job accepted by `accept` and hands it to
    /// `worker`. Skipped jobs keep their place.
    pub fn dequeue_where(
        &mut self,
        worker: Entity,
        mut accept: impl FnMut(JobId, &Job) -> bool,
    ) -> Option<JobId> {
        let mut cursor = self.head;
        while let Some(id) = cursor {
            cursor = self.links.get(id).and_then(|l| l.next);
            let Some(job) = self.jobs.get(id) else {
                continue;
            };
            if accept(id, job) {
                self.unlink(id);
                if let Some(job) = self.jobs.get_mut(id) {
                    job.worker = Some(worker);
                }
                return Some(id);
            }
        }
        None
    }

    /// Takes the job out of the queue order. No-op when it is not queued
    /// (for instance held by a worker).
    pub fn remove(&mut self, id: JobId) -> bool {
        self.unlink(id)
    }

    /// Drops the job entirely, queued or held. Fires `JobStopped`.
    pub fn cancel(&mut self, id: JobId, events: &mut EventBus) -> Option<Job> {
        let job = self.take(id)?;
        events.emit(SimEvent::JobStopped(id));
        Some(job)
    }

    /// Drops the job without any event.
    pub fn take(&mut self, id: JobId) -> Option<Job> {
        self.unlink(id);
        self.jobs.remove(id)
    }

    /// Clears the worker so the job can be requeued.
    pub fn release(&mut self, id: JobId) {
        if let Some(job) = self.jobs.get_mut(id) {
            job.worker = None;
        }
    }

    fn unlink(&mut self, id: JobId) -> bool {
        let Some(link) = self.links.remove(id) else {
            return false;
        };
        match link.prev {
            Some(prev) => {
                if let Some(l) = self.links.get_mut(prev) {
                    l.next = link.next;
                }
            }
            None => self.head = link.next,
        }
        match link.next {
            Some(next) => {
                if let Some(l) = self.links.get_mut(next) {
                    l.prev = link.prev;
                }
            }
            None => self.tail = link.prev,
        }
        true
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    pub fn get_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.get_mut(id)
    }

    pub fn is_queued(&self, id: JobId) -> bool {
        self.links.contains_key(id)
    }

    /// Queued jobs only.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Queued and held jobs.
    pub fn live_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Queued job ids, front first.
    pub fn queued(&self) -> Vec<JobId> {
        let mut ids = Vec::with_capacity(self.links.len());
        let mut cursor = self.head;
        while let Some(id) = cursor {
            ids.push(id);
            cursor = self.links.get(id).and_then(|l| l.next);
        }
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = (JobId, &Job)> {
        self.jobs.iter()
    }
}

/// First tile under `job`'s footprint already claimed by another job.
pub(crate) fn claim_conflict(grid: &Grid, job: &Job) -> Option<TileCoord> {
    job.claimed_tiles().find(|c| {
        grid.tile(*c)
            .map(|t| t.pending_furniture_job.is_some())
            .unwrap_or(false)
    })
}

/// Points every tile under the job's footprint at `id`.
pub(crate) fn claim_tiles(grid: &mut Grid, id: JobId, job: &Job) {
    for coord in job.claimed_tiles() {
        if let Some(tile) = grid.tile_mut(coord) {
            tile.pending_furniture_job = Some(id);
        }
    }
}

/// Clears the markers `claim_tiles` set for `id`.
pub(crate) fn release_tiles(grid: &mut Grid, id: JobId, job: &Job) {
    for coord in job.claimed_tiles() {
        if let Some(tile) = grid.tile_mut(coord) {
            if tile.pending_furniture_job == Some(id) {
                tile.pending_furniture_job = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::JobPurpose;
    use crate::events::EventKind;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn job(x: i32) -> Job {
        Job::new(TileCoord::new(x, 0), JobPurpose::Generic, 1.0)
    }

    fn worker() -> Entity {
        hecs::World::new().spawn(())
    }

    #[test]
    fn test_enqueue_dequeue_once() {
        let mut events = EventBus::new();
        let mut queue = JobQueue::new();
        assert_eq!(queue.dequeue(), None);

        let id = queue.add(job(1));
        assert!(queue.enqueue(id, Announce::New, &mut events));
        assert_eq!(queue.dequeue(), Some(id));
        assert_eq!(queue.dequeue(), None);
        assert!(queue.get(id).is_some());
    }

    #[test]
    fn test_fifo_order() {
        let mut events = EventBus::new();
        let mut queue = JobQueue::new();
        let ids: Vec<_> = (0..4).map(|x| queue.add(job(x))).collect();
        for id in &ids {
            queue.enqueue(*id, Announce::New, &mut events);
        }
        assert_eq!(queue.queued(), ids);
        assert_eq!(queue.dequeue(), Some(ids[0]));
        assert_eq!(queue.dequeue(), Some(ids[1]));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_remove_middle_and_idempotent() {
        let mut events = EventBus::new();
        let mut queue = JobQueue::new();
        let ids: Vec<_> = (0..3).map(|x| queue.add(job(x))).collect();
        for id in &ids {
            queue.enqueue(*id, Announce::New, &mut events);
        }

        assert!(queue.remove(ids[1]));
        assert!(!queue.remove(ids[1]));
        assert_eq!(queue.queued(), vec![ids[0], ids[2]]);

        let held = queue.dequeue().unwrap();
        assert!(!queue.remove(held));
        assert_eq!(queue.queued(), vec![ids[2]]);
    }

    #[test]
    fn test_double_enqueue_rejected() {
        let mut events = EventBus::new();
        let mut queue = JobQueue::new();
        let id = queue.add(job(0));
        assert!(queue.enqueue(id, Announce::New, &mut events));
        assert!(!queue.enqueue(id, Announce::Silent, &mut events));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_silent_requeue_fires_nothing() {
        let mut events = EventBus::new();
        let created = Rc::new(RefCell::new(0));
        let c = created.clone();
        events.subscribe(EventKind::JobCreated, move |_| *c.borrow_mut() += 1);

        let mut queue = JobQueue::new();
        let id = queue.add(job(0));
        queue.enqueue(id, Announce::New, &mut events);
        queue.dequeue();
        queue.enqueue(id, Announce::Silent, &mut events);

        assert_eq!(*created.borrow(), 1);
        assert!(queue.is_queued(id));
    }

    #[test]
    fn test_dequeue_where_skips_and_assigns() {
        let mut events = EventBus::new();
        let mut queue = JobQueue::new();
        let a = queue.add(job(0));
        let b = queue.add(job(1));
        queue.enqueue(a, Announce::New, &mut events);
        queue.enqueue(b, Announce::New, &mut events);

        let who = worker();
        let got = queue.dequeue_where(who, |id, _| id != a);
        assert_eq!(got, Some(b));
        assert_eq!(queue.get(b).unwrap().worker, Some(who));
        assert_eq!(queue.queued(), vec![a]);
        assert_eq!(queue.dequeue_where(who, |_, _| false), None);
    }

    #[test]
    fn test_cancel_fires_stopped() {
        let mut events = EventBus::new();
        let stopped = Rc::new(RefCell::new(Vec::new()));
        let s = stopped.clone();
        events.subscribe(EventKind::JobStopped, move |e| s.borrow_mut().push(e.clone()));

        let mut queue = JobQueue::new();
        let id = queue.add(job(0));
        queue.enqueue(id, Announce::New, &mut events);

        assert!(queue.cancel(id, &mut events).is_some());
        assert!(queue.cancel(id, &mut events).is_none());
        assert!(queue.is_empty());
        assert_eq!(queue.live_jobs(), 0);
        assert_eq!(*stopped.borrow(), vec![SimEvent::JobStopped(id)]);
    }

    #[test]
    fn test_claim_covers_footprint() {
        let mut grid = Grid::new(4, 4);
        let mut queue = JobQueue::new();
        let big = Job::new(TileCoord::new(1, 1), JobPurpose::Generic, 1.0).covering(2, 2);
        let id = queue.add(big.clone());
        assert_eq!(claim_conflict(&grid, &big), None);
        claim_tiles(&mut grid, id, &big);

        let overlapping = job(2).covering(1, 3);
        assert_eq!(claim_conflict(&grid, &overlapping), Some(TileCoord::new(2, 1)));
        assert_eq!(claim_conflict(&grid, &job(0)), None);

        release_tiles(&mut grid, id, &big);
        assert!(grid.tiles().all(|t| t.pending_furniture_job.is_none()));
    }
}
