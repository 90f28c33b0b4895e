//! # Registro de Jobs
//! src/jobs/registry.rs
//!
//! Dueño exclusivo de la identidad y el estado de los jobs. Todo acceso
//! al mapa id → job pasa por este módulo; ningún caller toma el lock
//! directamente. Las transiciones de estado son de un solo uso: repetir
//! una transición es un error de programación y falla con
//! `JobError::InvalidTransition` en vez de sobrescribir en silencio.

use crate::jobs::error::JobError;
use crate::jobs::types::{epoch_secs, Job, JobStatus};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Registro central de jobs
pub struct JobRegistry {
    /// Próximo id a asignar. `fetch_add` garantiza unicidad y monotonía
    /// incluso con submits concurrentes.
    next_id: AtomicU64,

    /// Mapa id → job
    jobs: Arc<Mutex<HashMap<u64, Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Asigna el próximo id y registra un job Pending.
    ///
    /// No bloquea en la ejecución: solo reserva identidad y estado.
    /// El encolado lo hace el pool (ver `pool.rs`).
    pub fn create(&self, kind: &str, params: Value) -> Job {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let job = Job::new(id, kind.to_string(), params);

        let mut jobs = self.jobs.lock().unwrap();
        jobs.insert(id, job.clone());
        job
    }

    /// Obtiene el estado de un job. Lectura pura, nunca espera a workers.
    pub fn status(&self, job_id: u64) -> Result<JobStatus, JobError> {
        let jobs = self.jobs.lock().unwrap();
        jobs.get(&job_id)
            .map(|job| job.status)
            .ok_or(JobError::NotFound(job_id))
    }

    /// Obtiene una copia del job completo
    pub fn get(&self, job_id: u64) -> Result<Job, JobError> {
        let jobs = self.jobs.lock().unwrap();
        jobs.get(&job_id)
            .cloned()
            .ok_or(JobError::NotFound(job_id))
    }

    /// Pending → Running. Solo la llama el worker que desencoló el job.
    pub fn mark_running(&self, job_id: u64) -> Result<(), JobError> {
        self.transition(job_id, JobStatus::Running, |job| {
            job.started_at = Some(epoch_secs());
        })
    }

    /// Running → Done. El resultado ya debe estar persistido en el store.
    pub fn mark_done(&self, job_id: u64) -> Result<(), JobError> {
        self.transition(job_id, JobStatus::Done, |job| {
            job.finished_at = Some(epoch_secs());
        })
    }

    /// Running → Failed, registrando el motivo
    pub fn mark_failed(&self, job_id: u64, reason: String) -> Result<(), JobError> {
        self.transition(job_id, JobStatus::Failed, move |job| {
            job.error = Some(reason);
            job.finished_at = Some(epoch_secs());
        })
    }

    fn transition(
        &self,
        job_id: u64,
        to: JobStatus,
        apply: impl FnOnce(&mut Job),
    ) -> Result<(), JobError> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs.get_mut(&job_id).ok_or(JobError::NotFound(job_id))?;

        let allowed = matches!(
            (job.status, to),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Done)
                | (JobStatus::Running, JobStatus::Failed)
        );

        if !allowed {
            return Err(JobError::InvalidTransition {
                job_id,
                from: job.status,
                to,
            });
        }

        job.status = to;
        apply(job);
        Ok(())
    }

    /// Descarta un job recién creado cuyo encolado falló.
    ///
    /// Solo lo usa el pool para no dejar un Pending huérfano cuando la
    /// cola acotada rechaza el push.
    pub(crate) fn discard(&self, job_id: u64) {
        let mut jobs = self.jobs.lock().unwrap();
        jobs.remove(&job_id);
    }

    /// Snapshot de (id, estado) de todos los jobs, ordenado por id
    pub fn snapshot(&self) -> Vec<(u64, JobStatus)> {
        let jobs = self.jobs.lock().unwrap();
        let mut all: Vec<(u64, JobStatus)> =
            jobs.values().map(|job| (job.id, job.status)).collect();
        all.sort_by_key(|(id, _)| *id);
        all
    }

    /// Número de jobs que aún no llegaron a un estado terminal
    pub fn num_active(&self) -> usize {
        let jobs = self.jobs.lock().unwrap();
        jobs.values().filter(|job| !job.is_terminal()).count()
    }

    /// Número total de jobs registrados
    pub fn count(&self) -> usize {
        let jobs = self.jobs.lock().unwrap();
        jobs.len()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
