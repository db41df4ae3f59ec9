use super::types::Car;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

/// Bounded FIFO of refueled cars waiting for a register.
///
/// Any number of producers and consumers may share it through clones.
/// `push` waits while the queue is full, which is what pushes back on the
/// refuel stage when checkout falls behind. After [`CheckoutQueue::close`]
/// every pending and future `push` hands its car back and every `pop`
/// returns `None`.
#[derive(Debug, Clone)]
pub struct CheckoutQueue {
    tx: mpsc::Sender<Car>,
    rx: Arc<Mutex<mpsc::Receiver<Car>>>,
    closed: Arc<watch::Sender<bool>>,
    capacity: usize,
}

/// Resolves once the close flag is set
async fn wait_closed(mut closed: watch::Receiver<bool>) {
    loop {
        let is_closed = *closed.borrow_and_update();
        // the queue owns the sender, so an error only happens mid-teardown
        if is_closed || closed.changed().await.is_err() {
            return;
        }
    }
}

impl CheckoutQueue {
    /// Create a queue holding at most `capacity` cars; `capacity` must be non-zero
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let (closed, _) = watch::channel(false);
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            closed: Arc::new(closed),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cars currently queued
    pub fn len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Stop the queue. Cars still inside stay there and are never served.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    /// Enqueue a car, waiting for space if the queue is full.
    ///
    /// # Returns
    /// `Err(car)` with the car handed back if the queue is closed before
    /// space becomes available
    pub async fn push(&self, car: Car) -> Result<(), Car> {
        if self.is_closed() {
            return Err(car);
        }
        let permit = tokio::select! {
            permit = self.tx.reserve() => permit,
            _ = wait_closed(self.closed.subscribe()) => return Err(car),
        };
        match permit {
            Ok(permit) => {
                permit.send(car);
                Ok(())
            }
            Err(_) => Err(car),
        }
    }

    /// Dequeue the next car, waiting if the queue is empty.
    ///
    /// Returns `None` once the queue is closed.
    pub async fn pop(&self) -> Option<Car> {
        if self.is_closed() {
            return None;
        }
        tokio::select! {
            car = async {
                let mut rx = self.rx.lock().await;
                rx.recv().await
            } => car,
            _ = wait_closed(self.closed.subscribe()) => None,
        }
    }
}
