//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Servidor HTTP/1.0 que maneja múltiples conexiones simultáneas usando
//! threads: cada conexión se procesa en su propio thread. Los threads de
//! conexión solo parsean y despachan; el trabajo pesado lo hace el pool
//! de workers del sistema de jobs.

use crate::api::{self, ApiState};
use crate::config::Config;
use crate::http::{Request, Response, StatusCode};
use crate::ingest::Dataset;
use crate::jobs::{PoolConfig, WorkerPool};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Servidor HTTP/1.0 concurrente sobre el sistema de jobs
pub struct Server {
    config: Config,
    state: Arc<ApiState>,
}

impl Server {
    /// Construye el servidor: crea el pool de workers sobre el dataset
    /// ya cargado. Los workers no arrancan hasta `run()`.
    pub fn new(config: Config, dataset: Arc<Dataset>) -> std::io::Result<Self> {
        let pool_config = PoolConfig::from_config(&config);
        let pool = Arc::new(WorkerPool::new(pool_config, dataset)?);

        Ok(Self {
            config,
            state: Arc::new(ApiState::new(pool)),
        })
    }

    /// Acceso al estado compartido (lo usan los tests de integración)
    pub fn state(&self) -> &Arc<ApiState> {
        &self.state
    }

    /// Arranca los workers y atiende conexiones hasta que el proceso muera
    pub fn run(&mut self) -> std::io::Result<()> {
        let address = self.config.address();
        println!("[*] Iniciando servidor en {}", address);

        let listener = TcpListener::bind(&address)?;
        println!("[+] Servidor escuchando en {}", address);
        println!("[*] Modo concurrente: un thread por conexion\n");

        self.state.pool().start();
        self.serve(listener)
    }

    /// Loop de accept sobre un listener ya vinculado
    pub fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let state = Arc::clone(&self.state);

                    let peer_addr = stream
                        .peer_addr()
                        .map(|addr| addr.to_string())
                        .unwrap_or_else(|_| "unknown".to_string());

                    println!(" ✅ Nueva conexión desde: {} (spawning thread)", peer_addr);

                    thread::spawn(move || {
                        if let Err(e) = Self::handle_connection(stream, state) {
                            eprintln!("   ❌ Error en thread: {}", e);
                        }
                    });
                }
                Err(e) => {
                    eprintln!("   ❌ Error al aceptar conexión: {}", e);
                }
            }
        }

        Ok(())
    }

    fn handle_connection(mut stream: TcpStream, state: Arc<ApiState>) -> std::io::Result<()> {
        let start = Instant::now();

        let buffer = Self::read_request(&mut stream)?;
        if buffer.is_empty() {
            println!("   ✅ Conexión cerrada");
            return Ok(());
        }

        let response = match Request::parse(&buffer) {
            Ok(request) => {
                println!("   ✅ {} {}", request.method().as_str(), request.path());
                api::dispatch(&request, &state)
            }
            Err(e) => {
                println!("   ❌ Parse error: {}", e);
                Response::error(StatusCode::BadRequest, &format!("Invalid: {}", e))
            }
        };

        stream.write_all(&response.to_bytes())?;
        stream.flush()?;

        let latency = start.elapsed();
        println!("   ✅ {} ({:.2}ms)\n", response.status(), latency.as_secs_f64() * 1000.0);

        Ok(())
    }

    /// Lee un request completo: headers hasta la línea vacía y después
    /// el body según `Content-Length`.
    ///
    /// Un solo `read` no alcanza: el body JSON de un POST puede llegar
    /// en un segmento TCP posterior a los headers.
    fn read_request(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];

        // 1. Leer hasta encontrar \r\n\r\n
        let head_end = loop {
            if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos;
            }

            let bytes_read = stream.read(&mut chunk)?;
            if bytes_read == 0 {
                // Peer cerró antes de completar los headers
                return Ok(buffer);
            }
            buffer.extend_from_slice(&chunk[..bytes_read]);

            // Límite defensivo contra headers interminables
            if buffer.len() > 64 * 1024 {
                return Ok(buffer);
            }
        };

        // 2. Leer el body hasta completar Content-Length
        let expected_body = Self::content_length(&buffer[..head_end]).unwrap_or(0);
        let body_start = head_end + 4;

        while buffer.len() - body_start < expected_body {
            let bytes_read = stream.read(&mut chunk)?;
            if bytes_read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..bytes_read]);
        }

        Ok(buffer)
    }

    /// Extrae Content-Length de los headers crudos (case-insensitive)
    fn content_length(head: &[u8]) -> Option<usize> {
        let head_str = std::str::from_utf8(head).ok()?;
        for line in head_str.split("\r\n").skip(1) {
            if let Some(colon) = line.find(':') {
                if line[..colon].trim().eq_ignore_ascii_case("content-length") {
                    return line[colon + 1..].trim().parse().ok();
                }
            }
        }
        None
    }
}
