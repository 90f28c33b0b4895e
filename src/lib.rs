//! # Stats Server
//! src/lib.rs
//!
//! Servidor HTTP/1.0 de estadísticas sobre el dataset de nutrición,
//! actividad física y obesidad. Las consultas de agregación se ejecutan
//! como jobs asíncronos sobre un pool fijo de threads.
//!
//! ## Arquitectura
//!
//! - `http`: Parsing y construcción de mensajes HTTP/1.0
//! - `config`: Configuración por CLI y variables de entorno
//! - `ingest`: Carga del dataset CSV en memoria (inmutable tras la carga)
//! - `aggregate`: Funciones puras de agregación (kind, params, dataset) → JSON
//! - `jobs`: Registro de jobs, cola FIFO, pool de workers, resultados y shutdown
//! - `api`: Endpoints `/api/*` que conectan HTTP con el sistema de jobs
//! - `server`: Servidor TCP concurrente (un thread por conexión)

pub mod http;
pub mod config;
pub mod ingest;
pub mod aggregate;
pub mod jobs;
pub mod api;
pub mod server;
