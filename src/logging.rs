//! Structured JSON logging.
//!
//! One JSON object per line with a run id, a monotonic sequence number and a
//! domain tag. Records go to `<LOG_DIR>/<run_id>/events.jsonl` when `LOG_DIR`
//! is set, otherwise to stderr.
//!
//! Filtering:
//! - `LOG_LEVEL`: trace | debug | info | warn | error (default info)
//! - `LOG_DOMAINS`: comma-separated domains, or `all`

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

// =============================================================================
// Log Domains
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Plan,    // Plan computation, validation
    Trade,   // Win/loss resolution, stops
    Session, // State machine transitions
    Lockout, // Cool-down arming and expiry
    Store,   // Load/save against the user store
    System,  // Startup, configuration, shutdown
    Audit,   // State digests per reducer step
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Plan => "plan",
            Domain::Trade => "trade",
            Domain::Session => "session",
            Domain::Lockout => "lockout",
            Domain::Store => "store",
            Domain::System => "system",
            Domain::Audit => "audit",
        }
    }

    pub fn is_enabled(&self) -> bool {
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    events: Option<Mutex<BufWriter<File>>>,
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let events = std::env::var("LOG_DIR").ok().and_then(|base| {
            let mut run_dir = PathBuf::from(base);
            run_dir.push(&run_id);
            if let Err(err) = create_dir_all(&run_dir) {
                eprintln!("[log] failed to create run dir: {}", err);
                return None;
            }
            match File::create(run_dir.join("events.jsonl")) {
                Ok(f) => Some(Mutex::new(BufWriter::new(f))),
                Err(err) => {
                    eprintln!("[log] failed to create events log: {}", err);
                    None
                }
            }
        });
        RunContext { run_id, events }
    })
}

fn sanitize_fields(mut fields: Map<String, Value>) -> Map<String, Value> {
    let redacted = Value::String("[REDACTED]".to_string());
    for key in ["authorization", "apikey", "api_key", "email"] {
        if fields.contains_key(key) {
            fields.insert(key.to_string(), redacted.clone());
        }
    }
    fields
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["user_id", "screen", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }
    let line = render(level, domain, event, fields);
    let ctx = ensure_run_context();
    match &ctx.events {
        Some(writer) => {
            if let Ok(mut w) = writer.lock() {
                let _ = writeln!(w, "{}", line);
                let _ = w.flush();
            }
        }
        None => eprintln!("{}", line),
    }
}

fn render(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) -> String {
    let ctx = ensure_run_context();
    let (mut top, data) = split_fields(sanitize_fields(fields));

    let msg = top.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(ctx.run_id.clone()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));
    Value::Object(entry).to_string()
}

// =============================================================================
// Domain helpers
// =============================================================================

pub fn log_transition(from: &str, to: &str, event: &str) {
    log(
        Level::Info,
        Domain::Session,
        "transition",
        obj(&[
            ("from", v_str(from)),
            ("screen", v_str(to)),
            ("trigger", v_str(event)),
        ]),
    );
}

pub fn log_ignored(screen: &str, event: &str) {
    log(
        Level::Debug,
        Domain::Session,
        "ignored",
        obj(&[("screen", v_str(screen)), ("trigger", v_str(event))]),
    );
}

pub fn log_lockout(event: &str, until: i64, now: i64) {
    log(
        Level::Info,
        Domain::Lockout,
        event,
        obj(&[("until", json!(until)), ("now", json!(now))]),
    );
}

pub fn log_persist(op: &str, user_id: &str, ok: bool, error: Option<&str>) {
    log(
        if ok { Level::Info } else { Level::Error },
        Domain::Store,
        op,
        obj(&[
            ("user_id", v_str(user_id)),
            ("ok", Value::Bool(ok)),
            ("error", error.map(v_str).unwrap_or(Value::Null)),
        ]),
    );
}

/// Digest of the state after a reducer step, for replay comparison.
pub fn log_audit(seq: u64, state_digest: &str) {
    log(
        Level::Debug,
        Domain::Audit,
        "step",
        obj(&[("step", json!(seq)), ("state_digest", v_str(state_digest))]),
    );
}

// =============================================================================
// Utility functions
// =============================================================================

/// Hex SHA-256 of `input`.
pub fn digest(input: &[u8]) -> String {
    hex::encode(Sha256::digest(input))
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}
