//! # API de Jobs
//! src/api/mod.rs
//!
//! Endpoints HTTP del sistema de agregaciones:
//!
//! - `POST /api/<kind>` - Encolar un job (body JSON con parámetros)
//! - `GET /api/get_results/<id>` - Consultar estado/resultado
//! - `GET /api/jobs` - Estado de todos los jobs
//! - `GET /api/num_jobs` - Jobs todavía no terminales
//! - `GET /api/graceful_shutdown` - Drenar y cerrar
//!
//! El submit acepta cualquier kind no reservado: uno no soportado se
//! encola igual y falla al ejecutarse, nunca en forma síncrona acá.

use crate::http::{Method, Request, Response, StatusCode};
use crate::jobs::{JobError, JobStatus, WorkerPool};
use serde_json::{json, Value};
use std::sync::Arc;

/// Segmentos bajo `/api/` que son rutas propias, no kinds de agregación
const RESERVED: &[&str] = &["get_results", "jobs", "num_jobs", "graceful_shutdown"];

/// Estado compartido de la API: el pool es el único punto de entrada
/// al subsistema de jobs
pub struct ApiState {
    pool: Arc<WorkerPool>,
}

impl ApiState {
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }
}

/// Enruta un request parseado al handler que corresponde
pub fn dispatch(request: &Request, state: &ApiState) -> Response {
    let path = request.path();

    match (request.method(), path) {
        (Method::GET, "/api/jobs") => handle_jobs(state),
        (Method::GET, "/api/num_jobs") => handle_num_jobs(state),
        (Method::GET, "/api/graceful_shutdown") => handle_graceful_shutdown(state),
        (Method::GET, p) if p.starts_with("/api/get_results/") => {
            handle_get_results(&p["/api/get_results/".len()..], state)
        }
        (method, p) => {
            if let Some(kind) = submit_kind(p) {
                if method == Method::POST {
                    handle_submit(kind, request, state)
                } else {
                    Response::error(
                        StatusCode::MethodNotAllowed,
                        &format!("Use POST for /api/{}", kind),
                    )
                }
            } else if path_is_reserved_api(p) {
                // Ruta válida con el método equivocado
                Response::error(StatusCode::MethodNotAllowed, "Method not allowed")
            } else {
                Response::error(StatusCode::NotFound, &format!("Unknown route: {}", p))
            }
        }
    }
}

/// Extrae el kind de un path de submit: `/api/<kind>` con un único
/// segmento no reservado
fn submit_kind(path: &str) -> Option<&str> {
    let rest = path.strip_prefix("/api/")?;
    if rest.is_empty() || rest.contains('/') || RESERVED.contains(&rest) {
        return None;
    }
    Some(rest)
}

fn path_is_reserved_api(path: &str) -> bool {
    match path.strip_prefix("/api/") {
        Some(rest) => {
            let first = rest.split('/').next().unwrap_or("");
            RESERVED.contains(&first)
        }
        None => false,
    }
}

/// POST /api/<kind> - encola el job y retorna su id sin esperar
fn handle_submit(kind: &str, request: &Request, state: &ApiState) -> Response {
    let params: Value = if request.body().is_empty() {
        json!({})
    } else {
        match serde_json::from_slice(request.body()) {
            Ok(value) => value,
            Err(e) => {
                return Response::error(
                    StatusCode::BadRequest,
                    &format!("Invalid JSON body: {}", e),
                );
            }
        }
    };

    match state.pool.submit(kind, params) {
        Ok(job_id) => Response::json(&json!({ "job_id": job_id })),
        Err(e @ JobError::ShuttingDown) => {
            Response::error(StatusCode::ServiceUnavailable, &e.to_string())
        }
        Err(e @ JobError::QueueFull { .. }) => {
            Response::error(StatusCode::ServiceUnavailable, &e.to_string())
                .with_header("Retry-After", "1")
        }
        Err(e) => Response::error(StatusCode::InternalServerError, &e.to_string()),
    }
}

/// GET /api/get_results/<id>
///
/// Cada estado tiene su respuesta propia; un id nunca emitido es 404,
/// no se confunde con "running".
fn handle_get_results(raw_id: &str, state: &ApiState) -> Response {
    let job_id: u64 = match raw_id.parse() {
        Ok(id) => id,
        Err(_) => {
            return Response::error(
                StatusCode::NotFound,
                &format!("Invalid job_id: {}", raw_id),
            );
        }
    };

    let job = match state.pool.job(job_id) {
        Ok(job) => job,
        Err(e) => return Response::error(StatusCode::NotFound, &e.to_string()),
    };

    match job.status {
        JobStatus::Pending => Response::json(&json!({"status": "pending"})),
        JobStatus::Running => Response::json(&json!({"status": "running"})),
        JobStatus::Done => match state.pool.result(job_id) {
            Ok(data) => Response::json(&json!({"status": "done", "data": data})),
            Err(e) => Response::error(StatusCode::InternalServerError, &e.to_string()),
        },
        JobStatus::Failed => {
            let reason = job.error.unwrap_or_else(|| "unknown".to_string());
            Response::json(&json!({"status": "failed", "reason": reason}))
        }
    }
}

/// GET /api/jobs - estado de todos los jobs, ordenado por id
fn handle_jobs(state: &ApiState) -> Response {
    let data: Vec<Value> = state
        .pool
        .snapshot()
        .into_iter()
        .map(|(id, status)| json!({ id.to_string(): status.as_str() }))
        .collect();

    Response::json(&json!({"status": "done", "data": data}))
}

/// GET /api/num_jobs - jobs que aún no llegaron a estado terminal
fn handle_num_jobs(state: &ApiState) -> Response {
    Response::json(&json!({"num_jobs": state.pool.num_active()}))
}

/// GET /api/graceful_shutdown
///
/// Dispara el drenado y responde recién cuando todos los jobs enviados
/// son terminales. El proceso sigue sirviendo lecturas después.
fn handle_graceful_shutdown(state: &ApiState) -> Response {
    println!("🛑 Graceful shutdown requested, draining queue...");
    state.pool.graceful();
    println!("✅ All jobs terminal, no longer accepting submissions");

    Response::json(&json!({"status": "done"}))
}
