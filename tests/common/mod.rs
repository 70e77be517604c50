#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub struct MockState {
    pub lookup: serde_json::Value,
    pub roster: serde_json::Value,
    pub roster_queries: Mutex<Vec<HashMap<String, String>>>,
    pub submissions: Mutex<Vec<serde_json::Value>>,
    pub fail_saves: AtomicBool,
    pub save_delay_ms: AtomicU64,
}

/// In-process stand-in for the records API.
pub struct MockApi {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockApi {
    pub fn start(lookup: serde_json::Value, roster: serde_json::Value) -> Self {
        let state = Arc::new(MockState {
            lookup,
            roster,
            roster_queries: Mutex::new(Vec::new()),
            submissions: Mutex::new(Vec::new()),
            fail_saves: AtomicBool::new(false),
            save_delay_ms: AtomicU64::new(0),
        });

        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind mock api");
        listener.set_nonblocking(true).expect("nonblocking");
        let addr = listener.local_addr().expect("mock addr");

        let app = Router::new()
            .route("/buscar-dados", get(serve_lookup))
            .route("/turmas", get(serve_roster))
            .route("/lancar", put(accept_submission))
            .with_state(Arc::clone(&state));

        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("mock runtime");
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
                axum::serve(listener, app).await.expect("serve mock api");
            });
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn submissions(&self) -> Vec<serde_json::Value> {
        self.state.submissions.lock().expect("lock").clone()
    }

    pub fn roster_queries(&self) -> Vec<HashMap<String, String>> {
        self.state.roster_queries.lock().expect("lock").clone()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.state.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn delay_saves(&self, ms: u64) {
        self.state.save_delay_ms.store(ms, Ordering::SeqCst);
    }
}

async fn serve_lookup(State(s): State<Arc<MockState>>) -> Json<serde_json::Value> {
    Json(s.lookup.clone())
}

async fn serve_roster(
    State(s): State<Arc<MockState>>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    s.roster_queries.lock().expect("lock").push(q);
    Json(s.roster.clone())
}

async fn accept_submission(
    State(s): State<Arc<MockState>>,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    let delay = s.save_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if s.fail_saves.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    s.submissions.lock().expect("lock").push(body);
    StatusCode::OK
}

pub fn sample_lookup() -> serde_json::Value {
    json!({
        "turmas": [
            { "curso_id": 1, "disciplina_id": 3, "designacao": "Matemática", "turma_id": 11, "descricao": "7A", "id_curso_disciplina": 40 },
            { "curso_id": 1, "disciplina_id": 4, "designacao": "Física", "turma_id": 11, "descricao": "7A", "id_curso_disciplina": 41 },
            { "curso_id": 8, "disciplina_id": 5, "designacao": "Química", "turma_id": 21, "descricao": "10B", "id_curso_disciplina": 52 }
        ],
        "cursos": [
            { "id": 1, "nome": "Ensino Primário" },
            { "id": 8, "nome": "Ensino Médio" }
        ]
    })
}

pub fn sample_roster() -> serde_json::Value {
    json!({
        "turmas": [
            { "curso_id": 1, "disciplina_id": 3, "designacao": "Matemática", "turma_id": 11, "descricao": "7A", "id_curso_disciplina": 40 }
        ],
        "matriculas": [
            {
                "id": 101, "id_curso": 1, "id_disciplina": 3, "id_turma": 11,
                "nome_aluno": "Ana Silva", "numero_aluno": 1, "situacao": "Aprovado",
                "id_curso_disciplina": 40,
                "mac1": 8, "npp1": null, "npt1": 6,
                "mac2": 7, "npp2": 7, "npt2": 7,
                "mac3": null, "npp3": null, "npt3": null,
                "mt1": 0, "mt2": 0, "mt3": 0,
                "mfa": null, "mfd": null, "mf": 0, "ano_curricular": 7
            },
            {
                "id": 102, "id_curso": 1, "id_disciplina": 3, "id_turma": 11,
                "nome_aluno": "Bruno Costa", "numero_aluno": 2, "situacao": "Recuperação",
                "id_curso_disciplina": 40,
                "mac1": 4, "npp1": 5, "npt1": 6,
                "mt1": 0, "mt2": 0, "mt3": 0, "mf": 0
            },
            {
                "id": 103, "id_curso": 1, "id_disciplina": 3, "id_turma": 11,
                "nome_aluno": "Carla Mendes", "numero_aluno": 3, "situacao": null,
                "id_curso_disciplina": null,
                "mt1": null, "mt2": null, "mt3": null, "mf": null
            }
        ]
    })
}

pub struct Sidecar {
    pub child: Child,
    pub stdin: ChildStdin,
    pub reader: BufReader<ChildStdout>,
}

impl Sidecar {
    pub fn spawn(api_base_url: &str) -> Self {
        let exe = env!("CARGO_BIN_EXE_gradesheetd");
        let mut child = Command::new(exe)
            .env("GRADESHEETD_API_URL", api_base_url)
            .env_remove("GRADESHEETD_CONFIG")
            .env_remove("GRADESHEETD_WORKSPACE")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn gradesheetd");
        let stdin = child.stdin.take().expect("child stdin");
        let stdout = child.stdout.take().expect("child stdout");
        Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
        }
    }

    pub fn send(&mut self, id: &str, method: &str, params: serde_json::Value) {
        let payload = json!({
            "id": id,
            "method": method,
            "params": params,
        });
        writeln!(self.stdin, "{}", payload).expect("write request");
        self.stdin.flush().expect("flush request");
    }

    pub fn send_raw(&mut self, line: &str) {
        writeln!(self.stdin, "{}", line).expect("write raw line");
        self.stdin.flush().expect("flush raw line");
    }

    pub fn read(&mut self) -> serde_json::Value {
        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read response line");
        assert!(!line.trim().is_empty(), "empty response");
        serde_json::from_str(line.trim()).expect("parse response json")
    }

    /// Sends a request and returns the full response envelope.
    pub fn request(&mut self, id: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
        self.send(id, method, params);
        let value = self.read();
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
        value
    }

    pub fn request_ok(&mut self, id: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(id, method, params);
        assert!(
            value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or_else(|| json!({}))
    }

    /// Sends a request that must fail and returns its error code.
    pub fn request_err(&mut self, id: &str, method: &str, params: serde_json::Value) -> String {
        let value = self.request(id, method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string()
    }

    pub fn shutdown(mut self) {
        drop(self.stdin);
        let _ = self.child.wait();
    }
}

/// Spawns a sidecar with a fresh workspace, lookup data loaded and the
/// roster for course 1 / subject 3 fetched.
pub fn loaded_sidecar(api: &MockApi, prefix: &str) -> (Sidecar, PathBuf) {
    let workspace = temp_dir(prefix);
    let mut sc = Sidecar::spawn(&api.base_url);
    sc.request_ok(
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    sc.request_ok("lookup", "lookup.load", json!({}));
    sc.request_ok(
        "sel",
        "selection.set",
        json!({ "courseId": 1, "subjectId": 3 }),
    );
    sc.request_ok("fetch", "roster.fetch", json!({}));
    (sc, workspace)
}

pub fn find_record<'a>(roster_get: &'a serde_json::Value, id: i64) -> &'a serde_json::Value {
    roster_get["roster"]["matriculas"]
        .as_array()
        .expect("matriculas")
        .iter()
        .find(|r| r["id"].as_i64() == Some(id))
        .expect("record present")
}
