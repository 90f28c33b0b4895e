//! # Tipos del Sistema de Jobs
//! src/jobs/types.rs
//!
//! Define el job y su ciclo de vida. El estado solo lo muta el registro
//! (`registry.rs`); aquí viven los datos y los predicados.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Estado de un job
///
/// Ciclo de vida: Pending → Running → {Done, Failed}. Nunca retrocede y
/// cada arista se toma una sola vez. Un job abandonado por un shutdown
/// inmediato se queda en Pending para siempre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Encolado, esperando que un worker lo tome
    Pending,

    /// Un worker lo está ejecutando
    Running,

    /// Completado: su resultado está en el store
    Done,

    /// Falló: el motivo queda registrado en el job
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    /// Verifica si es un estado terminal (no hay más transiciones)
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

/// Un trabajo de agregación solicitado por un cliente
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    /// ID único, entero monotónicamente creciente, asignado al encolar
    pub id: u64,

    /// Tipo de agregación solicitada. Se guarda como string: un kind no
    /// soportado se acepta al encolar y falla recién al ejecutarse.
    pub kind: String,

    /// Parámetros opacos que consume el servicio de agregación
    pub params: Value,

    /// Estado actual
    pub status: JobStatus,

    /// Motivo del fallo (presente si y solo si status = Failed)
    pub error: Option<String>,

    /// Timestamp de creación (epoch seconds)
    pub created_at: u64,

    /// Timestamp de inicio de ejecución
    pub started_at: Option<u64>,

    /// Timestamp de finalización
    pub finished_at: Option<u64>,
}

impl Job {
    /// Crea un job recién encolado
    pub fn new(id: u64, kind: String, params: Value) -> Self {
        Self {
            id,
            kind,
            params,
            status: JobStatus::Pending,
            error: None,
            created_at: epoch_secs(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Verifica si el job está en estado terminal
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

pub(crate) fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_serialization() {
        let status = JobStatus::Running;
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, "\"running\"");
    }

    #[test]
    fn test_job_status_terminal() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_new_job_is_pending() {
        let job = Job::new(1, "global_mean".to_string(), serde_json::json!({"question": "Q1"}));

        assert_eq!(job.id, 1);
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.error.is_none());
        assert!(job.started_at.is_none());
        assert!(!job.is_terminal());
    }

    #[test]
    fn test_unsupported_kind_is_representable() {
        // Un kind desconocido se acepta al crear el job; la validación
        // ocurre en el worker
        let job = Job::new(2, "states_median".to_string(), serde_json::json!({}));
        assert_eq!(job.kind, "states_median");
    }
}
