//! # Módulo HTTP
//!
//! Implementa el protocolo HTTP/1.0 desde cero, sin librerías de alto
//! nivel. Cubre exactamente lo que la API de jobs necesita:
//!
//! - Parsing de requests GET/POST con body JSON
//! - Construcción de responses JSON
//! - Manejo de status codes
//!
//! ## Formato de Request
//!
//! ```text
//! POST /api/states_mean HTTP/1.0\r\n
//! Content-Length: 25\r\n
//! \r\n
//! {"question": "..."}
//! ```
//!
//! ## Formato de Response
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 12\r\n
//! \r\n
//! {"job_id":1}
//! ```

pub mod request; // Parsing de HTTP requests
pub mod response; // Construcción de HTTP responses
pub mod status; // Códigos de estado HTTP

pub use request::{Method, ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
