//! # Cola FIFO de Jobs
//! src/jobs/queue.rs
//!
//! Cola thread-safe que entrega jobs pendientes a los workers en orden
//! de llegada. `push` nunca bloquea; `pop` bloquea hasta que haya un job
//! o hasta que la cola se cierre. La política de cierre (inmediato o
//! drenando) la elige el coordinador de shutdown, no la cola.

use crate::jobs::error::JobError;
use crate::jobs::types::Job;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

/// Modo de cierre de la cola
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseMode {
    /// `pop` deja de entregar jobs ya mismo; lo encolado se abandona
    Immediate,

    /// `pop` sigue entregando hasta vaciar la cola y recién ahí cierra
    Graceful,
}

struct QueueInner {
    buf: VecDeque<Job>,
    closed: Option<CloseMode>,
}

/// Cola FIFO thread-safe
pub struct JobQueue {
    inner: Arc<Mutex<QueueInner>>,

    /// Notifica a workers esperando en `pop`
    condvar: Arc<Condvar>,

    /// Capacidad máxima (None = sin límite)
    capacity: Option<usize>,
}

impl JobQueue {
    /// Crea una cola, acotada si `capacity` es `Some`
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(QueueInner {
                buf: VecDeque::new(),
                closed: None,
            })),
            condvar: Arc::new(Condvar::new()),
            capacity,
        }
    }

    /// Encola un job. Nunca bloquea: con capacidad acotada y cola llena
    /// falla con `QueueFull`; con la cola cerrada falla con
    /// `ShuttingDown`.
    pub fn push(&self, job: Job) -> Result<(), JobError> {
        let mut inner = self.inner.lock().unwrap();

        if inner.closed.is_some() {
            return Err(JobError::ShuttingDown);
        }

        if let Some(capacity) = self.capacity {
            if inner.buf.len() >= capacity {
                return Err(JobError::QueueFull { capacity });
            }
        }

        inner.buf.push_back(job);
        self.condvar.notify_one();
        Ok(())
    }

    /// Desencola el próximo job en orden FIFO.
    ///
    /// Bloquea hasta que haya un job disponible o se observe el cierre.
    /// `None` significa "cola cerrada": con cierre inmediato se devuelve
    /// aunque queden jobs encolados; con cierre graceful, recién cuando
    /// la cola quedó vacía.
    pub fn pop(&self) -> Option<Job> {
        let mut inner = self.inner.lock().unwrap();

        loop {
            match inner.closed {
                Some(CloseMode::Immediate) => return None,
                Some(CloseMode::Graceful) => {
                    return inner.buf.pop_front();
                }
                None => {
                    if let Some(job) = inner.buf.pop_front() {
                        return Some(job);
                    }
                    inner = self.condvar.wait(inner).unwrap();
                }
            }
        }
    }

    /// Cierra la cola con la política indicada y despierta a todos los
    /// workers. Inmediato escala sobre graceful; graceful nunca degrada
    /// un cierre inmediato ya aplicado. Idempotente.
    pub fn close(&self, mode: CloseMode) {
        let mut inner = self.inner.lock().unwrap();

        inner.closed = match (inner.closed, mode) {
            (Some(CloseMode::Immediate), _) => Some(CloseMode::Immediate),
            (_, mode) => Some(mode),
        };

        self.condvar.notify_all();
    }

    /// Número de jobs encolados sin desencolar
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.buf.len()
    }

    /// Verifica si la cola está vacía
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Verifica si la cola ya fue cerrada
    pub fn is_closed(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.closed.is_some()
    }
}

impl Clone for JobQueue {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            condvar: Arc::clone(&self.condvar),
            capacity: self.capacity,
        }
    }
}
