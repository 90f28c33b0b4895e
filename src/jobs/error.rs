//! # Errores del Sistema de Jobs
//! src/jobs/error.rs

use crate::jobs::types::JobStatus;

/// Errores del registro, la cola y el store de resultados
#[derive(Debug)]
pub enum JobError {
    /// El job id nunca fue emitido (o no tiene resultado persistido)
    NotFound(u64),

    /// Transición de estado inválida: cada arista del ciclo de vida
    /// Pending → Running → {Done, Failed} se toma una sola vez
    InvalidTransition {
        job_id: u64,
        from: JobStatus,
        to: JobStatus,
    },

    /// El sistema está en shutdown y no acepta nuevos jobs
    ShuttingDown,

    /// La cola está llena (solo con capacidad acotada configurada)
    QueueFull { capacity: usize },

    /// Error de persistencia al escribir o leer un resultado
    Persistence(std::io::Error),
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobError::NotFound(id) => write!(f, "Job not found: {}", id),
            JobError::InvalidTransition { job_id, from, to } => write!(
                f,
                "Invalid status transition for job {}: {} -> {}",
                job_id,
                from.as_str(),
                to.as_str()
            ),
            JobError::ShuttingDown => write!(f, "Server is shutting down, not accepting jobs"),
            JobError::QueueFull { capacity } => {
                write!(f, "Job queue is full (capacity: {})", capacity)
            }
            JobError::Persistence(e) => write!(f, "Result persistence error: {}", e),
        }
    }
}

impl std::error::Error for JobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JobError::Persistence(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for JobError {
    fn from(e: std::io::Error) -> Self {
        JobError::Persistence(e)
    }
}
