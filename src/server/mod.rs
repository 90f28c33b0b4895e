//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Implementa el servidor TCP que:
//! 1. Escucha en un puerto
//! 2. Acepta conexiones entrantes (un thread por conexión)
//! 3. Lee y parsea requests HTTP
//! 4. Despacha a la API de jobs y envía la response

pub mod tcp;

pub use tcp::Server;
