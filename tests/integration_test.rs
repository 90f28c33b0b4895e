//! Tests de integración del sistema de jobs
//! tests/integration_test.rs
//!
//! Ejercitan el pool completo (registro + cola + workers + store) contra
//! un dataset en memoria, y el servidor HTTP sobre un listener efímero.
//! No requieren ningún proceso externo corriendo.

use serde_json::{json, Value};
use stats_server::config::Config;
use stats_server::ingest::Dataset;
use stats_server::jobs::{JobError, JobStatus, PoolConfig, WorkerPool};
use stats_server::server::Server;
use std::fs;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const SAMPLE: &str = "\
LocationDesc,Question,Data_Value,StratificationCategory1,Stratification1
Ohio,Q1,10.0,Total,Total
Utah,Q1,20.0,Total,Total
Iowa,Q1,30.0,Total,Total
Ohio,Q2,5.0,Total,Total
Utah,Q2,7.0,Total,Total
";

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("stats_server_it_{}", name));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn make_pool(name: &str, workers: usize) -> (WorkerPool, PathBuf) {
    let dir = temp_dir(name);
    let dataset = Arc::new(Dataset::from_reader(SAMPLE.as_bytes()).unwrap());
    let config = PoolConfig {
        workers,
        results_dir: dir.to_string_lossy().to_string(),
        queue_capacity: None,
    };
    (WorkerPool::new(config, dataset).unwrap(), dir)
}

fn wait_terminal(pool: &WorkerPool, job_id: u64) -> JobStatus {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let status = pool.status(job_id).unwrap();
        if status.is_terminal() {
            return status;
        }
        assert!(
            Instant::now() < deadline,
            "job {} never reached a terminal state",
            job_id
        );
        thread::sleep(Duration::from_millis(10));
    }
}

// ==================== Ciclo de vida ====================

#[test]
fn test_every_submitted_job_becomes_terminal() {
    let (pool, dir) = make_pool("terminality", 3);
    pool.start();

    let ids: Vec<u64> = (0..30)
        .map(|i| {
            let kind = if i % 2 == 0 { "states_mean" } else { "global_mean" };
            pool.submit(kind, json!({"question": "Q1"})).unwrap()
        })
        .collect();

    for id in ids {
        assert_eq!(wait_terminal(&pool, id), JobStatus::Done);
    }

    pool.graceful();
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_global_mean_with_two_workers() {
    // Valores [10, 20, 30] para Q1: la media global es exactamente 20.0
    let (pool, dir) = make_pool("global_mean", 2);
    pool.start();

    let id = pool.submit("global_mean", json!({"question": "Q1"})).unwrap();
    assert_eq!(wait_terminal(&pool, id), JobStatus::Done);
    assert_eq!(pool.result(id).unwrap(), json!({"global_mean": 20.0}));

    pool.graceful();
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_unknown_kind_fails_and_pool_keeps_working() {
    let (pool, dir) = make_pool("unknown_kind", 1);
    pool.start();

    let bad = pool.submit("states_median", json!({"question": "Q1"})).unwrap();
    assert_eq!(wait_terminal(&pool, bad), JobStatus::Failed);

    let job = pool.job(bad).unwrap();
    let reason = job.error.unwrap();
    assert!(reason.contains("states_median"), "reason was: {}", reason);

    // El único worker sobrevivió al fallo y sigue procesando
    let good = pool.submit("global_mean", json!({"question": "Q1"})).unwrap();
    assert_eq!(wait_terminal(&pool, good), JobStatus::Done);

    pool.graceful();
    let _ = fs::remove_dir_all(&dir);
}

// ==================== Identidad ====================

#[test]
fn test_concurrent_submissions_get_unique_monotonic_ids() {
    let (pool, dir) = make_pool("unique_ids", 4);
    let pool = Arc::new(pool);
    pool.start();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let pool = Arc::clone(&pool);
        handles.push(thread::spawn(move || {
            let mut ids = Vec::new();
            for _ in 0..10 {
                ids.push(pool.submit("global_mean", json!({"question": "Q1"})).unwrap());
            }
            ids
        }));
    }

    let mut all: Vec<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    all.sort_unstable();
    all.dedup();

    // 100 submits concurrentes → 100 ids distintos, sin huecos
    assert_eq!(all.len(), 100);
    assert_eq!(all.last().unwrap() - all.first().unwrap(), 99);

    pool.graceful();
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_unknown_id_is_not_found() {
    let (pool, dir) = make_pool("not_found", 1);

    assert!(matches!(pool.status(424242), Err(JobError::NotFound(424242))));
    assert!(matches!(pool.result(424242), Err(JobError::NotFound(_))));

    pool.immediate();
    let _ = fs::remove_dir_all(&dir);
}

// ==================== Resultados ====================

#[test]
fn test_result_reads_are_idempotent() {
    let (pool, dir) = make_pool("idempotent_reads", 2);
    pool.start();

    let id = pool.submit("states_mean", json!({"question": "Q1"})).unwrap();
    wait_terminal(&pool, id);

    let first = pool.result(id).unwrap();
    let second = pool.result(id).unwrap();
    let third = pool.result(id).unwrap();

    assert_eq!(first, second);
    assert_eq!(second, third);

    pool.graceful();
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_duplicate_submissions_produce_independent_results() {
    let (pool, dir) = make_pool("duplicates", 2);
    pool.start();

    // Dos jobs idénticos: cada uno obtiene su propio id y su propio
    // resultado persistido
    let a = pool.submit("global_mean", json!({"question": "Q1"})).unwrap();
    let b = pool.submit("global_mean", json!({"question": "Q1"})).unwrap();
    assert_ne!(a, b);

    wait_terminal(&pool, a);
    wait_terminal(&pool, b);

    assert_eq!(pool.result(a).unwrap(), pool.result(b).unwrap());
    assert!(dir.join(format!("{}.json", a)).exists());
    assert!(dir.join(format!("{}.json", b)).exists());

    pool.graceful();
    let _ = fs::remove_dir_all(&dir);
}

// ==================== Shutdown ====================

#[test]
fn test_graceful_shutdown_drains_and_blocks_new_submissions() {
    let (pool, dir) = make_pool("graceful", 2);
    pool.start();

    let ids: Vec<u64> = (0..25)
        .map(|_| pool.submit("state_mean", json!({"question": "Q1", "state": "Ohio"})).unwrap())
        .collect();

    pool.graceful();

    // Al retornar, todo job enviado es terminal
    for id in ids {
        assert!(pool.status(id).unwrap().is_terminal());
    }

    // Y no entran más submits
    assert!(matches!(
        pool.submit("global_mean", json!({})),
        Err(JobError::ShuttingDown)
    ));

    // Las lecturas siguen disponibles después del shutdown
    assert_eq!(pool.num_active(), 0);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_immediate_shutdown_leaves_queued_jobs_pending() {
    // Sin arrancar los workers: todo lo enviado queda encolado
    let (pool, dir) = make_pool("immediate", 2);

    let ids: Vec<u64> = (0..5)
        .map(|_| pool.submit("global_mean", json!({"question": "Q1"})).unwrap())
        .collect();

    pool.immediate();

    // Los jobs abandonados quedan Pending y nunca transicionan
    for id in &ids {
        assert_eq!(pool.status(*id).unwrap(), JobStatus::Pending);
    }
    thread::sleep(Duration::from_millis(100));
    for id in &ids {
        assert_eq!(pool.status(*id).unwrap(), JobStatus::Pending);
    }

    let _ = fs::remove_dir_all(&dir);
}

// ==================== HTTP end-to-end ====================

fn http_roundtrip(addr: std::net::SocketAddr, raw: &str) -> (String, Value) {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream.write_all(raw.as_bytes()).unwrap();
    stream.shutdown(std::net::Shutdown::Write).unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();

    let body = response.split("\r\n\r\n").nth(1).unwrap_or("");
    let json = serde_json::from_str(body).unwrap_or(Value::Null);
    (response, json)
}

#[test]
fn test_submit_poll_result_over_http() {
    let dir = temp_dir("http_e2e");

    let mut config = Config::default();
    config.results_dir = dir.to_string_lossy().to_string();
    config.workers = Some(2);

    let dataset = Arc::new(Dataset::from_reader(SAMPLE.as_bytes()).unwrap());
    let server = Server::new(config, dataset).unwrap();
    server.state().pool().start();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let state = Arc::clone(server.state());
    thread::spawn(move || {
        let _ = server.serve(listener);
    });

    // 1. Submit
    let body = r#"{"question": "Q1"}"#;
    let raw = format!(
        "POST /api/global_mean HTTP/1.0\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let (head, json) = http_roundtrip(addr, &raw);
    assert!(head.contains("200 OK"), "submit failed: {}", head);
    let job_id = json["job_id"].as_u64().unwrap();

    // 2. Poll hasta done
    let deadline = Instant::now() + Duration::from_secs(10);
    let data = loop {
        let raw = format!("GET /api/get_results/{} HTTP/1.0\r\n\r\n", job_id);
        let (_, json) = http_roundtrip(addr, &raw);

        match json["status"].as_str() {
            Some("done") => break json["data"].clone(),
            Some("failed") => panic!("job failed: {}", json["reason"]),
            _ => {
                assert!(Instant::now() < deadline, "job never finished");
                thread::sleep(Duration::from_millis(20));
            }
        }
    };

    // 3. Resultado correcto
    assert_eq!(data, json!({"global_mean": 20.0}));

    // 4. Id nunca emitido → 404
    let (head, _) = http_roundtrip(addr, "GET /api/get_results/999999 HTTP/1.0\r\n\r\n");
    assert!(head.contains("404 Not Found"));

    state.pool().immediate();
    let _ = fs::remove_dir_all(&dir);
}
