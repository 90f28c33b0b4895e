//! # Servicio de Agregación
//! src/aggregate/mod.rs
//!
//! Funciones puras de estadística: `(kind, params, dataset) → JSON`.
//! No hay concurrencia aquí; los workers del pool invocan `compute` con
//! el dataset compartido de solo lectura.

use crate::ingest::Dataset;
use serde_json::{json, Map, Value};

/// Tipos de agregación soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    StatesMean,
    StateMean,
    Best5,
    Worst5,
    GlobalMean,
    DiffFromMean,
    StateDiffFromMean,
    MeanByCategory,
    StateMeanByCategory,
}

impl TaskKind {
    /// Parsea un kind desde su nombre de endpoint
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "states_mean" => Some(TaskKind::StatesMean),
            "state_mean" => Some(TaskKind::StateMean),
            "best5" => Some(TaskKind::Best5),
            "worst5" => Some(TaskKind::Worst5),
            "global_mean" => Some(TaskKind::GlobalMean),
            "diff_from_mean" => Some(TaskKind::DiffFromMean),
            "state_diff_from_mean" => Some(TaskKind::StateDiffFromMean),
            "mean_by_category" => Some(TaskKind::MeanByCategory),
            "state_mean_by_category" => Some(TaskKind::StateMeanByCategory),
            _ => None,
        }
    }

    /// Nombre del kind tal como aparece en la API
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::StatesMean => "states_mean",
            TaskKind::StateMean => "state_mean",
            TaskKind::Best5 => "best5",
            TaskKind::Worst5 => "worst5",
            TaskKind::GlobalMean => "global_mean",
            TaskKind::DiffFromMean => "diff_from_mean",
            TaskKind::StateDiffFromMean => "state_diff_from_mean",
            TaskKind::MeanByCategory => "mean_by_category",
            TaskKind::StateMeanByCategory => "state_mean_by_category",
        }
    }
}

/// Errores del servicio de agregación
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    /// Kind no soportado (se acepta al encolar, falla al ejecutar)
    UnknownKind(String),

    /// Falta un parámetro requerido en el request
    MissingParam(&'static str),

    /// No hay filas que cumplan los parámetros pedidos
    NoData(String),
}

impl std::fmt::Display for AggregateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateError::UnknownKind(k) => write!(f, "Unsupported task kind: {}", k),
            AggregateError::MissingParam(p) => write!(f, "Missing required parameter: {}", p),
            AggregateError::NoData(q) => write!(f, "No data matching the request: {}", q),
        }
    }
}

impl std::error::Error for AggregateError {}

/// Ejecuta la agregación `kind` con `params` sobre el dataset.
///
/// Es una función pura: mismo input, mismo output, sin efectos.
pub fn compute(kind: &str, params: &Value, dataset: &Dataset) -> Result<Value, AggregateError> {
    let kind = TaskKind::from_name(kind)
        .ok_or_else(|| AggregateError::UnknownKind(kind.to_string()))?;

    match kind {
        TaskKind::StatesMean => states_mean(params, dataset),
        TaskKind::StateMean => state_mean(params, dataset),
        TaskKind::Best5 => top5(params, dataset, Top::Best),
        TaskKind::Worst5 => top5(params, dataset, Top::Worst),
        TaskKind::GlobalMean => global_mean(params, dataset),
        TaskKind::DiffFromMean => diff_from_mean(params, dataset),
        TaskKind::StateDiffFromMean => state_diff_from_mean(params, dataset),
        TaskKind::MeanByCategory => mean_by_category(params, dataset),
        TaskKind::StateMeanByCategory => state_mean_by_category(params, dataset),
    }
}

fn param<'a>(params: &'a Value, name: &'static str) -> Result<&'a str, AggregateError> {
    params
        .get(name)
        .and_then(Value::as_str)
        .ok_or(AggregateError::MissingParam(name))
}

/// Media de `Data_Value` por estado para una pregunta, ordenada ascendente
fn states_mean_pairs(question: &str, dataset: &Dataset) -> Vec<(String, f64)> {
    let mut sums: Vec<(String, f64, usize)> = Vec::new();

    for row in dataset.rows() {
        if row.question != question {
            continue;
        }
        match sums.iter_mut().find(|(state, _, _)| *state == row.location) {
            Some((_, sum, count)) => {
                *sum += row.value;
                *count += 1;
            }
            None => sums.push((row.location.clone(), row.value, 1)),
        }
    }

    let mut means: Vec<(String, f64)> = sums
        .into_iter()
        .map(|(state, sum, count)| (state, sum / count as f64))
        .collect();

    means.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    means
}

fn pairs_to_object(pairs: &[(String, f64)]) -> Value {
    let mut map = Map::new();
    for (state, mean) in pairs {
        map.insert(state.clone(), json!(mean));
    }
    Value::Object(map)
}

fn states_mean(params: &Value, dataset: &Dataset) -> Result<Value, AggregateError> {
    let question = param(params, "question")?;
    let pairs = states_mean_pairs(question, dataset);

    if pairs.is_empty() {
        return Err(AggregateError::NoData(question.to_string()));
    }

    Ok(pairs_to_object(&pairs))
}

fn state_mean(params: &Value, dataset: &Dataset) -> Result<Value, AggregateError> {
    let question = param(params, "question")?;
    let state = param(params, "state")?;

    let values: Vec<f64> = dataset
        .rows()
        .iter()
        .filter(|r| r.question == question && r.location == state)
        .map(|r| r.value)
        .collect();

    if values.is_empty() {
        return Err(AggregateError::NoData(format!("{} / {}", question, state)));
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Ok(json!({ state: mean }))
}

enum Top {
    Best,
    Worst,
}

fn top5(params: &Value, dataset: &Dataset, which: Top) -> Result<Value, AggregateError> {
    let question = param(params, "question")?;
    let pairs = states_mean_pairs(question, dataset);

    if pairs.is_empty() {
        return Err(AggregateError::NoData(question.to_string()));
    }

    // `pairs` está ordenado ascendente. Según la pregunta, "best" puede ser
    // el extremo bajo (obesidad) o el alto (actividad física).
    let ascending_is_best = Dataset::best_is_min(question);
    let take_low_end = match which {
        Top::Best => ascending_is_best,
        Top::Worst => !ascending_is_best,
    };

    let selected: Vec<(String, f64)> = if take_low_end {
        pairs.iter().take(5).cloned().collect()
    } else {
        pairs.iter().rev().take(5).cloned().collect()
    };

    Ok(pairs_to_object(&selected))
}

fn global_mean_value(question: &str, dataset: &Dataset) -> Result<f64, AggregateError> {
    let values: Vec<f64> = dataset
        .rows()
        .iter()
        .filter(|r| r.question == question)
        .map(|r| r.value)
        .collect();

    if values.is_empty() {
        return Err(AggregateError::NoData(question.to_string()));
    }

    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

fn global_mean(params: &Value, dataset: &Dataset) -> Result<Value, AggregateError> {
    let question = param(params, "question")?;
    let mean = global_mean_value(question, dataset)?;
    Ok(json!({ "global_mean": mean }))
}

fn diff_from_mean(params: &Value, dataset: &Dataset) -> Result<Value, AggregateError> {
    let question = param(params, "question")?;
    let global = global_mean_value(question, dataset)?;
    let pairs = states_mean_pairs(question, dataset);

    let mut map = Map::new();
    for (state, mean) in pairs {
        map.insert(state, json!(global - mean));
    }
    Ok(Value::Object(map))
}

fn state_diff_from_mean(params: &Value, dataset: &Dataset) -> Result<Value, AggregateError> {
    let question = param(params, "question")?;
    let state = param(params, "state")?;
    let global = global_mean_value(question, dataset)?;

    let state_mean_json = state_mean(params, dataset)?;
    let mean = state_mean_json
        .get(state)
        .and_then(Value::as_f64)
        .ok_or_else(|| AggregateError::NoData(format!("{} / {}", question, state)))?;

    Ok(json!({ state: global - mean }))
}

fn mean_by_category(params: &Value, dataset: &Dataset) -> Result<Value, AggregateError> {
    let question = param(params, "question")?;

    let mut groups: Vec<(String, f64, usize)> = Vec::new();
    for row in dataset.rows() {
        if row.question != question
            || row.strat_category.is_empty()
            || row.stratification.is_empty()
        {
            continue;
        }

        let key = format!(
            "('{}', '{}', '{}')",
            row.location, row.strat_category, row.stratification
        );

        match groups.iter_mut().find(|(k, _, _)| *k == key) {
            Some((_, sum, count)) => {
                *sum += row.value;
                *count += 1;
            }
            None => groups.push((key, row.value, 1)),
        }
    }

    if groups.is_empty() {
        return Err(AggregateError::NoData(question.to_string()));
    }

    groups.sort_by(|a, b| a.0.cmp(&b.0));

    let mut map = Map::new();
    for (key, sum, count) in groups {
        map.insert(key, json!(sum / count as f64));
    }
    Ok(Value::Object(map))
}

fn state_mean_by_category(params: &Value, dataset: &Dataset) -> Result<Value, AggregateError> {
    let question = param(params, "question")?;
    let state = param(params, "state")?;

    let mut groups: Vec<(String, f64, usize)> = Vec::new();
    for row in dataset.rows() {
        if row.question != question
            || row.location != state
            || row.strat_category.is_empty()
            || row.stratification.is_empty()
        {
            continue;
        }

        let key = format!("('{}', '{}')", row.strat_category, row.stratification);

        match groups.iter_mut().find(|(k, _, _)| *k == key) {
            Some((_, sum, count)) => {
                *sum += row.value;
                *count += 1;
            }
            None => groups.push((key, row.value, 1)),
        }
    }

    if groups.is_empty() {
        return Err(AggregateError::NoData(format!("{} / {}", question, state)));
    }

    groups.sort_by(|a, b| a.0.cmp(&b.0));

    let mut inner = Map::new();
    for (key, sum, count) in groups {
        inner.insert(key, json!(sum / count as f64));
    }

    Ok(json!({ state: Value::Object(inner) }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::Dataset;

    const SAMPLE: &str = "\
LocationDesc,Question,Data_Value,StratificationCategory1,Stratification1
Ohio,Q1,10.0,Total,Total
Ohio,Q1,20.0,Gender,Male
Utah,Q1,30.0,Total,Total
Texas,Q1,40.0,Total,Total
Iowa,Q1,50.0,Total,Total
Maine,Q1,60.0,Total,Total
Idaho,Q1,70.0,Total,Total
Utah,Q2,5.0,Total,Total
";

    fn dataset() -> Dataset {
        Dataset::from_reader(SAMPLE.as_bytes()).unwrap()
    }

    // ==================== TaskKind ====================

    #[test]
    fn test_task_kind_roundtrip() {
        for name in [
            "states_mean",
            "state_mean",
            "best5",
            "worst5",
            "global_mean",
            "diff_from_mean",
            "state_diff_from_mean",
            "mean_by_category",
            "state_mean_by_category",
        ] {
            let kind = TaskKind::from_name(name).unwrap();
            assert_eq!(kind.as_str(), name);
        }
    }

    #[test]
    fn test_task_kind_unknown() {
        assert!(TaskKind::from_name("states_median").is_none());
    }

    // ==================== global_mean ====================

    #[test]
    fn test_global_mean() {
        let result = compute(
            "global_mean",
            &serde_json::json!({"question": "Q2"}),
            &dataset(),
        )
        .unwrap();

        assert_eq!(result, serde_json::json!({"global_mean": 5.0}));
    }

    #[test]
    fn test_global_mean_missing_question() {
        let err = compute("global_mean", &serde_json::json!({}), &dataset()).unwrap_err();
        assert_eq!(err, AggregateError::MissingParam("question"));
    }

    #[test]
    fn test_global_mean_no_data() {
        let err = compute(
            "global_mean",
            &serde_json::json!({"question": "Q99"}),
            &dataset(),
        )
        .unwrap_err();
        assert!(matches!(err, AggregateError::NoData(_)));
    }

    // ==================== states_mean / state_mean ====================

    #[test]
    fn test_states_mean_sorted_ascending() {
        let result = compute(
            "states_mean",
            &serde_json::json!({"question": "Q1"}),
            &dataset(),
        )
        .unwrap();

        let obj = result.as_object().unwrap();
        // Ohio promedia (10+20)/2 = 15 y queda primero
        let keys: Vec<&String> = obj.keys().collect();
        assert_eq!(keys[0], "Ohio");
        assert_eq!(obj["Ohio"], serde_json::json!(15.0));

        let values: Vec<f64> = obj.values().map(|v| v.as_f64().unwrap()).collect();
        let mut sorted = values.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(values, sorted);
    }

    #[test]
    fn test_state_mean() {
        let result = compute(
            "state_mean",
            &serde_json::json!({"question": "Q1", "state": "Ohio"}),
            &dataset(),
        )
        .unwrap();

        assert_eq!(result, serde_json::json!({"Ohio": 15.0}));
    }

    #[test]
    fn test_state_mean_missing_state() {
        let err = compute(
            "state_mean",
            &serde_json::json!({"question": "Q1"}),
            &dataset(),
        )
        .unwrap_err();
        assert_eq!(err, AggregateError::MissingParam("state"));
    }

    // ==================== best5 / worst5 ====================

    #[test]
    fn test_best5_unknown_question_takes_high_end() {
        // Q1 no está en la lista best-is-min, así que best = valores altos
        let result = compute("best5", &serde_json::json!({"question": "Q1"}), &dataset()).unwrap();

        let obj = result.as_object().unwrap();
        assert_eq!(obj.len(), 5);
        assert!(obj.contains_key("Idaho"));
        assert!(!obj.contains_key("Ohio"));
    }

    #[test]
    fn test_worst5_unknown_question_takes_low_end() {
        let result =
            compute("worst5", &serde_json::json!({"question": "Q1"}), &dataset()).unwrap();

        let obj = result.as_object().unwrap();
        assert_eq!(obj.len(), 5);
        assert!(obj.contains_key("Ohio"));
        assert!(!obj.contains_key("Idaho"));
    }

    #[test]
    fn test_best5_with_fewer_than_five_states() {
        let result = compute("best5", &serde_json::json!({"question": "Q2"}), &dataset()).unwrap();
        assert_eq!(result.as_object().unwrap().len(), 1);
    }

    // ==================== diff_from_mean ====================

    #[test]
    fn test_diff_from_mean() {
        let result = compute(
            "diff_from_mean",
            &serde_json::json!({"question": "Q2"}),
            &dataset(),
        )
        .unwrap();

        // Única fila: la diferencia con la media global es 0
        assert_eq!(result, serde_json::json!({"Utah": 0.0}));
    }

    #[test]
    fn test_state_diff_from_mean() {
        let result = compute(
            "state_diff_from_mean",
            &serde_json::json!({"question": "Q1", "state": "Ohio"}),
            &dataset(),
        )
        .unwrap();

        // global = 40, Ohio = 15 → diff = 25
        assert_eq!(result, serde_json::json!({"Ohio": 25.0}));
    }

    // ==================== mean_by_category ====================

    #[test]
    fn test_mean_by_category_tuple_keys() {
        let result = compute(
            "mean_by_category",
            &serde_json::json!({"question": "Q1"}),
            &dataset(),
        )
        .unwrap();

        let obj = result.as_object().unwrap();
        assert_eq!(obj["('Ohio', 'Gender', 'Male')"], serde_json::json!(20.0));
        assert_eq!(obj["('Ohio', 'Total', 'Total')"], serde_json::json!(10.0));
    }

    #[test]
    fn test_state_mean_by_category() {
        let result = compute(
            "state_mean_by_category",
            &serde_json::json!({"question": "Q1", "state": "Ohio"}),
            &dataset(),
        )
        .unwrap();

        assert_eq!(
            result,
            serde_json::json!({
                "Ohio": {
                    "('Gender', 'Male')": 20.0,
                    "('Total', 'Total')": 10.0,
                }
            })
        );
    }

    // ==================== Unknown kind ====================

    #[test]
    fn test_compute_unknown_kind() {
        let err = compute("not_a_kind", &serde_json::json!({}), &dataset()).unwrap_err();
        assert_eq!(err, AggregateError::UnknownKind("not_a_kind".to_string()));
        assert!(!err.to_string().is_empty());
    }
}
