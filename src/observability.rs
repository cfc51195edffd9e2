//! Logging and query history
//!
//! `init_tracing` wires up the fmt subscriber for the binaries. `QueryLogger`
//! keeps a bounded in-memory history of processed questions and optionally
//! appends each entry to a JSON-lines file.

use crate::config::Settings;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_HISTORY: usize = 1000;

/// Install the global subscriber on stderr.
pub fn init_tracing(settings: &Settings) {
    // A second init (tests, repeated CLI setup) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_filter(settings))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// `RUST_LOG` wins over `LOG_LEVEL`; with logging disabled only errors get
/// through.
pub fn tracing_filter(settings: &Settings) -> EnvFilter {
    if !settings.enable_logging {
        return EnvFilter::new("error");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level))
}

/// One processed question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLogEntry {
    pub timestamp: DateTime<Utc>,
    pub query_id: String,
    pub question: String,
    pub sql_generated: Option<String>,
    pub intent_type: Option<String>,
    pub rows_returned: Option<usize>,
    pub confidence: Option<f64>,
    pub validation_passed: bool,
    pub error_message: Option<String>,
    pub execution_time_ms: u64,
}

impl QueryLogEntry {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            query_id: uuid::Uuid::new_v4().to_string(),
            question: question.into(),
            sql_generated: None,
            intent_type: None,
            rows_returned: None,
            confidence: None,
            validation_passed: false,
            error_message: None,
            execution_time_ms: 0,
        }
    }

    pub fn success(&self) -> bool {
        self.validation_passed && self.error_message.is_none()
    }
}

pub struct QueryLogger {
    log_file: Option<PathBuf>,
    entries: Mutex<VecDeque<QueryLogEntry>>,
    max_in_memory: usize,
}

impl QueryLogger {
    pub fn new(log_file: Option<PathBuf>, max_in_memory: usize) -> Self {
        Self {
            log_file,
            entries: Mutex::new(VecDeque::new()),
            max_in_memory: max_in_memory.max(1),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.query_log_path.clone(), DEFAULT_HISTORY)
    }

    pub fn log_query(&self, entry: QueryLogEntry) -> Result<()> {
        {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.push_back(entry.clone());
            while entries.len() > self.max_in_memory {
                entries.pop_front();
            }
        }

        if let Some(ref log_file) = self.log_file {
            let mut file = OpenOptions::new().create(true).append(true).open(log_file)?;
            let json = serde_json::to_string(&entry)?;
            writeln!(file, "{}", json)?;
        }

        Ok(())
    }

    /// Most recent entries first.
    pub fn recent(&self, limit: usize) -> Vec<QueryLogEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Share of logged questions that passed validation without error.
    pub fn success_rate(&self) -> f64 {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.is_empty() {
            return 0.0;
        }
        entries.iter().filter(|e| e.success()).count() as f64 / entries.len() as f64
    }
}
