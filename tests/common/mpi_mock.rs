use distributed_image_convolution::comm::{
    check_layout, ProcessGroup, TAG_BROADCAST, TAG_GATHER, TAG_SCATTER,
};
use distributed_image_convolution::{ConvolveError, Result};
use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// One point-to-point operation, in the order a rank performed it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Send { from: usize, to: usize, tag: i32 },
    Receive { from: usize, to: usize, tag: i32 },
}

#[derive(Default)]
struct Inner {
    messages: HashMap<(usize, usize, i32), VecDeque<Vec<u8>>>,
    events: Vec<Event>,
}

/// Message queue for simulating a process group in a single thread
#[derive(Clone, Default)]
pub struct TestMessageQueue {
    inner: Arc<Mutex<Inner>>,
}

impl TestMessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message without logging it, for scripting a peer
    pub fn push(&self, from: usize, to: usize, tag: i32, data: &[u8]) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .messages
            .entry((from, to, tag))
            .or_default()
            .push_back(data.to_vec());
    }

    /// Take the oldest message sent from `from` to `to` with `tag`
    pub fn pop(&self, from: usize, to: usize, tag: i32) -> Option<Vec<u8>> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .messages
            .get_mut(&(from, to, tag))
            .and_then(VecDeque::pop_front)
    }

    /// Number of messages nobody has received yet
    pub fn pending(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.messages.values().map(VecDeque::len).sum()
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.lock().unwrap().events.clone()
    }

    fn log(&self, event: Event) {
        self.inner.lock().unwrap().events.push(event);
    }
}

/// Process group whose sends land in a shared queue and whose receives
/// never block: a missing message is an error.
pub struct MockGroup {
    rank: usize,
    size: usize,
    queue: TestMessageQueue,
    barriers: Cell<usize>,
}

impl MockGroup {
    pub fn new(rank: usize, size: usize, queue: &TestMessageQueue) -> Self {
        MockGroup {
            rank,
            size,
            queue: queue.clone(),
            barriers: Cell::new(0),
        }
    }

    pub fn barrier_count(&self) -> usize {
        self.barriers.get()
    }
}

impl ProcessGroup for MockGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn broadcast(&self, root: usize, buf: &mut [u8]) -> Result<()> {
        if self.rank == root {
            for dest in (0..self.size).filter(|&r| r != root) {
                self.send(dest, TAG_BROADCAST, buf)?;
            }
            Ok(())
        } else {
            self.receive_into(root, TAG_BROADCAST, buf)
        }
    }

    fn scatter_varcount(
        &self,
        root: usize,
        send: &[u8],
        counts: &[usize],
        displs: &[usize],
        recv: &mut [u8],
    ) -> Result<()> {
        if self.rank != root {
            return self.receive_into(root, TAG_SCATTER, recv);
        }
        check_layout(self.size, counts, displs, send.len())?;
        for dest in 0..self.size {
            let chunk = &send[displs[dest]..displs[dest] + counts[dest]];
            if dest == root {
                recv.copy_from_slice(chunk);
            } else {
                self.send(dest, TAG_SCATTER, chunk)?;
            }
        }
        Ok(())
    }

    fn send(&self, dest: usize, tag: i32, data: &[u8]) -> Result<()> {
        self.queue.log(Event::Send {
            from: self.rank,
            to: dest,
            tag,
        });
        self.queue.push(self.rank, dest, tag, data);
        Ok(())
    }

    fn receive_into(&self, source: usize, tag: i32, buf: &mut [u8]) -> Result<()> {
        self.queue.log(Event::Receive {
            from: source,
            to: self.rank,
            tag,
        });
        let message = self.queue.pop(source, self.rank, tag).ok_or_else(|| {
            ConvolveError::Comm(format!(
                "No message from rank {} to rank {} with tag {}",
                source, self.rank, tag
            ))
        })?;
        if message.len() != buf.len() {
            return Err(ConvolveError::Comm(format!(
                "Expected {} bytes, got {}",
                buf.len(),
                message.len()
            )));
        }
        buf.copy_from_slice(&message);
        Ok(())
    }

    fn gather_varcount(
        &self,
        root: usize,
        send: &[u8],
        recv: &mut [u8],
        counts: &[usize],
        displs: &[usize],
    ) -> Result<()> {
        if self.rank != root {
            return self.send(root, TAG_GATHER, send);
        }
        check_layout(self.size, counts, displs, recv.len())?;
        for source in 0..self.size {
            let chunk = &mut recv[displs[source]..displs[source] + counts[source]];
            if source == root {
                chunk.copy_from_slice(send);
            } else {
                self.receive_into(source, TAG_GATHER, chunk)?;
            }
        }
        Ok(())
    }

    fn barrier(&self) -> Result<()> {
        self.barriers.set(self.barriers.get() + 1);
        Ok(())
    }
}
