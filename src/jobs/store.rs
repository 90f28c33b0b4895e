//! # Store de Resultados
//! src/jobs/store.rs
//!
//! Persistencia durable de resultados: un archivo JSON por job id.
//! Cada resultado lo escribe exactamente un worker, una sola vez, y es
//! inmutable después. La escritura va a un archivo temporal y se
//! renombra: un lector concurrente ve el resultado completo o nada,
//! nunca una escritura parcial.

use crate::jobs::error::JobError;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Store de resultados con un archivo por job
#[derive(Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    /// Crea el store, asegurando que el directorio exista
    pub fn new(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, job_id: u64) -> PathBuf {
        self.dir.join(format!("{}.json", job_id))
    }

    /// Persiste el resultado de un job.
    ///
    /// Escribe a `<id>.json.tmp` y renombra (atómico en Unix) para que
    /// ningún lector observe un archivo a medio escribir.
    pub fn write(&self, job_id: u64, result: &Value) -> std::io::Result<()> {
        let final_path = self.path_for(job_id);
        let temp_path = self.dir.join(format!("{}.json.tmp", job_id));

        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, result)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        writer.flush()?;

        fs::rename(&temp_path, &final_path)?;
        Ok(())
    }

    /// Lee el resultado de un job. `NotFound` si nunca se escribió.
    pub fn read(&self, job_id: u64) -> Result<Value, JobError> {
        let path = self.path_for(job_id);

        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(JobError::NotFound(job_id));
            }
            Err(e) => return Err(JobError::Persistence(e)),
        };

        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| {
            JobError::Persistence(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    /// Verifica si existe un resultado persistido para el job
    pub fn exists(&self, job_id: u64) -> bool {
        self.path_for(job_id).exists()
    }
}
