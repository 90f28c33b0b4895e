//! # Ingesta del Dataset
//! src/ingest/mod.rs
//!
//! Carga el CSV de nutrición/actividad/obesidad en una tabla en memoria.
//! El dataset se carga una sola vez al inicio y nunca se muta después:
//! los workers lo comparten en un `Arc` sin locks.
//!
//! Solo se conservan las columnas que usan las agregaciones:
//! `LocationDesc`, `Question`, `StratificationCategory1`, `Stratification1`
//! y `Data_Value`. Las filas sin valor numérico se descartan.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Preguntas donde el mejor valor es el MÍNIMO (menos obesidad es mejor)
pub const QUESTIONS_BEST_IS_MIN: &[&str] = &[
    "Percent of adults aged 18 years and older who have an overweight classification",
    "Percent of adults aged 18 years and older who have obesity",
    "Percent of adults who engage in no leisure-time physical activity",
    "Percent of adults who report consuming fruit less than one time daily",
    "Percent of adults who report consuming vegetables less than one time daily",
];

/// Preguntas donde el mejor valor es el MÁXIMO (más actividad es mejor)
pub const QUESTIONS_BEST_IS_MAX: &[&str] = &[
    "Percent of adults who achieve at least 150 minutes a week of moderate-intensity aerobic physical activity or 75 minutes a week of vigorous-intensity aerobic activity (or an equivalent combination)",
    "Percent of adults who achieve at least 150 minutes a week of moderate-intensity aerobic physical activity or 75 minutes a week of vigorous-intensity aerobic physical activity and engage in muscle-strengthening activities on 2 or more days a week",
    "Percent of adults who achieve at least 300 minutes a week of moderate-intensity aerobic physical activity or 150 minutes a week of vigorous-intensity aerobic activity (or an equivalent combination)",
    "Percent of adults who engage in muscle-strengthening activities on 2 or more days a week",
];

/// Una fila del dataset con las columnas que consumen las agregaciones
#[derive(Debug, Clone)]
pub struct Row {
    /// Estado (columna `LocationDesc`)
    pub location: String,

    /// Pregunta de la encuesta (columna `Question`)
    pub question: String,

    /// Categoría de estratificación (columna `StratificationCategory1`)
    pub strat_category: String,

    /// Segmento dentro de la categoría (columna `Stratification1`)
    pub stratification: String,

    /// Valor numérico (columna `Data_Value`)
    pub value: f64,
}

/// Errores de carga del dataset
#[derive(Debug)]
pub enum IngestError {
    /// Error de E/S al leer el archivo
    Io(std::io::Error),

    /// El CSV no tiene header
    MissingHeader,

    /// Falta una columna requerida en el header
    MissingColumn(&'static str),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::Io(e) => write!(f, "I/O error reading dataset: {}", e),
            IngestError::MissingHeader => write!(f, "Dataset CSV has no header row"),
            IngestError::MissingColumn(c) => write!(f, "Dataset CSV is missing column: {}", c),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<std::io::Error> for IngestError {
    fn from(e: std::io::Error) -> Self {
        IngestError::Io(e)
    }
}

/// Dataset inmutable en memoria
#[derive(Debug)]
pub struct Dataset {
    rows: Vec<Row>,
}

impl Dataset {
    /// Carga el dataset desde un archivo CSV
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Carga el dataset desde cualquier reader con contenido CSV
    pub fn from_reader(reader: impl Read) -> Result<Self, IngestError> {
        let mut lines = BufReader::new(reader).lines();

        let header_line = match lines.next() {
            Some(line) => line?,
            None => return Err(IngestError::MissingHeader),
        };

        let header = parse_csv_line(&header_line);
        let col_location = column_index(&header, "LocationDesc")?;
        let col_question = column_index(&header, "Question")?;
        let col_strat_category = column_index(&header, "StratificationCategory1")?;
        let col_stratification = column_index(&header, "Stratification1")?;
        let col_value = column_index(&header, "Data_Value")?;

        let mut rows = Vec::new();

        for line in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let fields = parse_csv_line(&line);

            // Filas sin Data_Value numérico no aportan a ninguna media
            let value = match fields.get(col_value).and_then(|v| v.parse::<f64>().ok()) {
                Some(v) => v,
                None => continue,
            };

            rows.push(Row {
                location: field(&fields, col_location),
                question: field(&fields, col_question),
                strat_category: field(&fields, col_strat_category),
                stratification: field(&fields, col_stratification),
                value,
            });
        }

        Ok(Self { rows })
    }

    /// Filas del dataset
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Número de filas cargadas
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Verifica si el dataset está vacío
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Indica si para esta pregunta el mejor valor es el mínimo.
    /// Preguntas desconocidas se tratan como best-is-max.
    pub fn best_is_min(question: &str) -> bool {
        QUESTIONS_BEST_IS_MIN.contains(&question)
    }
}

fn field(fields: &[String], idx: usize) -> String {
    fields.get(idx).cloned().unwrap_or_default()
}

fn column_index(header: &[String], name: &'static str) -> Result<usize, IngestError> {
    header
        .iter()
        .position(|h| h == name)
        .ok_or(IngestError::MissingColumn(name))
}

/// Parsea una línea CSV con soporte para campos entre comillas.
///
/// El dataset real contiene comas dentro de campos entre comillas
/// (las preguntas de la encuesta), así que un `split(',')` no alcanza.
/// Comillas dobles escapadas (`""`) dentro de un campo se conservan
/// como una comilla simple.
fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }

    fields.push(current);
    fields
}
