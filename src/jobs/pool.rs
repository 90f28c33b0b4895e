//! # Pool de Workers y Coordinador de Shutdown
//! src/jobs/pool.rs
//!
//! Pool fijo de threads que desencolan jobs, invocan el servicio de
//! agregación y persisten resultados. Los workers se crean una sola vez
//! en `start()` y se reutilizan para todos los jobs; nunca se crea un
//! thread por tarea.
//!
//! El shutdown tiene dos políticas con nombre:
//! - `immediate()`: no se desencola nada más; lo que está en vuelo
//!   termina, lo encolado queda Pending para siempre.
//! - `graceful()`: no se aceptan más submits; los workers drenan la cola
//!   y la llamada retorna recién cuando todo job enviado es terminal.

use crate::aggregate;
use crate::config::Config;
use crate::ingest::Dataset;
use crate::jobs::error::JobError;
use crate::jobs::queue::{CloseMode, JobQueue};
use crate::jobs::registry::JobRegistry;
use crate::jobs::store::ResultStore;
use crate::jobs::types::{Job, JobStatus};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Configuración del pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Número de workers, fijo durante la vida del proceso
    pub workers: usize,

    /// Directorio de resultados (un JSON por job)
    pub results_dir: String,

    /// Capacidad de la cola (None = sin límite)
    pub queue_capacity: Option<usize>,
}

impl PoolConfig {
    /// Deriva la configuración del pool desde el Config principal
    pub fn from_config(config: &Config) -> Self {
        Self {
            workers: config.worker_count(),
            results_dir: config.results_dir.clone(),
            queue_capacity: config.queue_bound(),
        }
    }
}

/// Pool de workers sobre una cola FIFO compartida
pub struct WorkerPool {
    config: PoolConfig,
    registry: Arc<JobRegistry>,
    queue: JobQueue,
    store: ResultStore,
    dataset: Arc<Dataset>,

    /// Mientras sea true se aceptan submits; ambos shutdowns lo apagan
    accepting: AtomicBool,

    /// Garantiza que `start()` no lance workers dos veces
    started: AtomicBool,

    /// Handles de los workers; se drenan (join) durante el shutdown
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Crea el pool sin lanzar los workers todavía
    pub fn new(config: PoolConfig, dataset: Arc<Dataset>) -> std::io::Result<Self> {
        let store = ResultStore::new(&config.results_dir)?;

        Ok(Self {
            queue: JobQueue::new(config.queue_capacity),
            config,
            registry: Arc::new(JobRegistry::new()),
            store,
            dataset,
            accepting: AtomicBool::new(true),
            started: AtomicBool::new(false),
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Lanza los workers. Idempotente: la segunda llamada no hace nada.
    pub fn start(&self) {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let mut handles = self.handles.lock().unwrap();
        for i in 0..self.config.workers {
            let name = format!("worker-{}", i);
            let queue = self.queue.clone();
            let registry = Arc::clone(&self.registry);
            let store = self.store.clone();
            let dataset = Arc::clone(&self.dataset);

            handles.push(thread::spawn(move || {
                Self::worker_loop(name, queue, registry, store, dataset)
            }));
        }
    }

    /// Encola un nuevo job y retorna su id. Nunca espera a la ejecución.
    ///
    /// Un `kind` no soportado se acepta igual: el job fallará al
    /// ejecutarse, no acá.
    pub fn submit(&self, kind: &str, params: Value) -> Result<u64, JobError> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(JobError::ShuttingDown);
        }

        let job = self.registry.create(kind, params);
        let job_id = job.id;

        if let Err(e) = self.queue.push(job) {
            // No dejar un Pending huérfano si la cola rechazó el push
            self.registry.discard(job_id);
            return Err(e);
        }

        Ok(job_id)
    }

    /// Estado actual de un job. Lectura pura sobre el registro.
    pub fn status(&self, job_id: u64) -> Result<JobStatus, JobError> {
        self.registry.status(job_id)
    }

    /// Copia del job completo (estado + motivo de fallo si lo hay)
    pub fn job(&self, job_id: u64) -> Result<Job, JobError> {
        self.registry.get(job_id)
    }

    /// Resultado persistido de un job Done
    pub fn result(&self, job_id: u64) -> Result<Value, JobError> {
        // Validar contra el registro primero: un id nunca emitido es
        // NotFound aunque exista un archivo con ese nombre
        let status = self.registry.status(job_id)?;
        if status != JobStatus::Done {
            return Err(JobError::NotFound(job_id));
        }
        self.store.read(job_id)
    }

    /// Snapshot (id, estado) de todos los jobs
    pub fn snapshot(&self) -> Vec<(u64, JobStatus)> {
        self.registry.snapshot()
    }

    /// Jobs que todavía no llegaron a un estado terminal
    pub fn num_active(&self) -> usize {
        self.registry.num_active()
    }

    /// Shutdown graceful: rechaza submits nuevos, drena la cola y
    /// retorna cuando todos los jobs enviados son terminales.
    pub fn graceful(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        self.queue.close(CloseMode::Graceful);
        self.join_workers();
    }

    /// Shutdown inmediato: rechaza submits, no se desencola nada más.
    /// Los jobs en vuelo terminan; los encolados quedan Pending para
    /// siempre. Llamado después de `graceful()`, escala el cierre.
    pub fn immediate(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        self.queue.close(CloseMode::Immediate);
        self.join_workers();
    }

    /// Espera a que todos los workers terminen.
    ///
    /// El join se hace sosteniendo el lock de `handles`: si dos threads
    /// piden el shutdown a la vez, el segundo queda bloqueado en el lock
    /// hasta que el primero terminó de joinear, y recién entonces ve el
    /// vector vacío. Ningún caller retorna antes del drenado.
    fn join_workers(&self) {
        let mut handles = self.handles.lock().unwrap();

        for handle in handles.drain(..) {
            if handle.join().is_err() {
                eprintln!("⚠️  Worker panicked during shutdown");
            }
        }
    }

    /// Loop principal de cada worker.
    ///
    /// Ningún error de un job sale de este loop: un fallo se registra
    /// en el job y el worker sigue con el próximo.
    fn worker_loop(
        name: String,
        queue: JobQueue,
        registry: Arc<JobRegistry>,
        store: ResultStore,
        dataset: Arc<Dataset>,
    ) {
        println!("🔧 Worker {} started", name);

        while let Some(job) = queue.pop() {
            if let Err(e) = registry.mark_running(job.id) {
                eprintln!("⚠️  Worker {} skipped job {}: {}", name, job.id, e);
                continue;
            }

            match aggregate::compute(&job.kind, &job.params, &dataset) {
                Ok(result) => match Self::persist(&store, job.id, &result) {
                    Ok(()) => {
                        Self::finish(&registry, job.id, &name, None);
                        println!("✅ Worker {} completed job {}", name, job.id);
                    }
                    Err(e) => {
                        let reason = JobError::Persistence(e).to_string();
                        Self::finish(&registry, job.id, &name, Some(reason));
                        eprintln!("❌ Worker {} failed to persist job {}", name, job.id);
                    }
                },
                Err(e) => {
                    Self::finish(&registry, job.id, &name, Some(e.to_string()));
                    println!("❌ Worker {} failed job {}: {}", name, job.id, e);
                }
            }
        }

        println!("🔚 Worker {} exiting", name);
    }

    /// Escribe el resultado con un reintento ante error de persistencia
    fn persist(store: &ResultStore, job_id: u64, result: &Value) -> std::io::Result<()> {
        match store.write(job_id, result) {
            Ok(()) => Ok(()),
            Err(first) => {
                eprintln!("⚠️  Retrying result write for job {}: {}", job_id, first);
                store.write(job_id, result)
            }
        }
    }

    /// Transición terminal. Un error acá es un bug del propio pool; se
    /// reporta sin tumbar el worker.
    fn finish(registry: &JobRegistry, job_id: u64, worker: &str, reason: Option<String>) {
        let outcome = match reason {
            None => registry.mark_done(job_id),
            Some(reason) => registry.mark_failed(job_id, reason),
        };

        if let Err(e) = outcome {
            eprintln!("⚠️  Worker {} could not finish job {}: {}", worker, job_id, e);
        }
    }
}
