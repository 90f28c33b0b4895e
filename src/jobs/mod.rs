//! # Sistema de Jobs
//!
//! Implementa la ejecución asíncrona de agregaciones: los clientes
//! encolan trabajos y consultan después, sin bloquear las conexiones
//! HTTP mientras el cálculo corre.
//!
//! ## Componentes
//!
//! - `registry` - Identidad y ciclo de vida (Pending → Running → {Done, Failed})
//! - `queue`    - Cola FIFO thread-safe con dos modos de cierre
//! - `pool`     - Pool fijo de workers + coordinador de shutdown
//! - `store`    - Persistencia de resultados (un JSON por job)

pub mod error;
pub mod pool;
pub mod queue;
pub mod registry;
pub mod store;
pub mod types;

pub use error::JobError;
pub use pool::{PoolConfig, WorkerPool};
pub use queue::{CloseMode, JobQueue};
pub use registry::JobRegistry;
pub use store::ResultStore;
pub use types::{Job, JobStatus};
