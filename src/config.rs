//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor de estadísticas con soporte para argumentos
//! CLI y variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./stats_server --port 8080 \
//!   --dataset ./nutrition_activity_obesity_usa_subset.csv \
//!   --results-dir ./results \
//!   --workers 4
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 TP_NUM_OF_THREADS=8 ./stats_server
//! ```

use clap::Parser;

/// Configuración del servidor de estadísticas
#[derive(Debug, Clone, Parser)]
#[command(name = "stats_server")]
#[command(about = "Servidor HTTP/1.0 de estadísticas con jobs asíncronos")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    /// Ruta del dataset CSV a cargar al inicio
    #[arg(
        long,
        default_value = "./nutrition_activity_obesity_usa_subset.csv",
        env = "DATASET_PATH"
    )]
    pub dataset_path: String,

    /// Directorio donde se persisten los resultados (un JSON por job)
    #[arg(long = "results-dir", default_value = "./results", env = "RESULTS_DIR")]
    pub results_dir: String,

    // === Workers ===

    /// Número de workers del pool. Si no se indica, se usa el paralelismo
    /// que detecte el hardware.
    #[arg(long, env = "TP_NUM_OF_THREADS")]
    pub workers: Option<usize>,

    // === Cola ===

    /// Capacidad máxima de la cola de jobs (0 = sin límite)
    #[arg(long = "queue-capacity", default_value = "0", env = "QUEUE_CAPACITY")]
    pub queue_capacity: usize,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Número efectivo de workers: override explícito o paralelismo detectado
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Capacidad de la cola como opción (None = sin límite)
    pub fn queue_bound(&self) -> Option<usize> {
        if self.queue_capacity == 0 {
            None
        } else {
            Some(self.queue_capacity)
        }
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), String> {
        if let Some(workers) = self.workers {
            if workers == 0 {
                return Err("Workers must be >= 1".to_string());
            }
        }

        if self.dataset_path.trim().is_empty() {
            return Err("Dataset path must not be empty".to_string());
        }

        if self.results_dir.trim().is_empty() {
            return Err("Results dir must not be empty".to_string());
        }

        Ok(())
    }

    /// Imprime un resumen de la configuración
    pub fn print_summary(&self) {
        println!("╔══════════════════════════════════════════════╗");
        println!("║        Stats Server Configuration            ║");
        println!("╚══════════════════════════════════════════════╝");
        println!();
        println!("🌐 Network:");
        println!("   Address:      {}", self.address());
        println!();
        println!("📄 Data:");
        println!("   Dataset:      {}", self.dataset_path);
        println!("   Results dir:  {}", self.results_dir);
        println!();
        println!("👷 Worker Pool:");
        println!("   Workers:      {}", self.worker_count());

        match self.queue_bound() {
            Some(cap) => println!("   Queue cap:    {}", cap),
            None => println!("   Queue cap:    unbounded"),
        }

        println!();
        println!("════════════════════════════════════════════════");
        println!();
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            dataset_path: "./nutrition_activity_obesity_usa_subset.csv".to_string(),
            results_dir: "./results".to_string(),
            workers: None,
            queue_capacity: 0,
        }
    }
}
