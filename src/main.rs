//! # Stats Server - Entry Point
//! src/main.rs
//!
//! Punto de entrada del servidor de estadísticas: parsea la
//! configuración, carga el dataset y arranca el servidor HTTP con el
//! pool de workers.

use stats_server::config::Config;
use stats_server::ingest::Dataset;
use stats_server::server::Server;
use std::sync::Arc;

fn main() {
    println!("=================================");
    println!("  Stats Server HTTP/1.0");
    println!("  Jobs asíncronos de agregación");
    println!("=================================\n");

    // Configuración desde CLI args y variables de entorno
    let config = Config::new();

    if let Err(e) = config.validate() {
        eprintln!("💥 Configuración inválida: {}", e);
        std::process::exit(1);
    }

    config.print_summary();

    // Cargar el dataset una sola vez; se comparte read-only entre workers
    let dataset = match Dataset::load(&config.dataset_path) {
        Ok(dataset) => {
            println!("📄 Dataset cargado: {} filas\n", dataset.len());
            Arc::new(dataset)
        }
        Err(e) => {
            eprintln!("💥 Error cargando dataset {}: {}", config.dataset_path, e);
            std::process::exit(1);
        }
    };

    let mut server = match Server::new(config, dataset) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("💥 Error inicializando servidor: {}", e);
            std::process::exit(1);
        }
    };

    // Iniciar el servidor (esto bloqueará el thread)
    if let Err(e) = server.run() {
        eprintln!("💥 Error fatal: {}", e);
        std::process::exit(1);
    }
}
