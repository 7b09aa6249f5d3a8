//! Fetch and labeling progress reporting.
//!
//! Reports observable progress during `subtopic fetch` and `subtopic analyze`
//! so users see how far along a run is. Progress is emitted on **stderr** so
//! stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A pipeline stage started (e.g. `"preprocessing"`, `"clustering"`).
    Stage { name: String },
    /// Fetch phase: n eligible items accumulated out of the target.
    Fetching { source: String, n: u64, target: u64 },
    /// Labeling phase: n topics labeled out of total.
    Labeling { n: u64, total: u64 },
}

/// Reports progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "fetch r/rust  1,234 / 5,000 items".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Stage { name } => format!("{}...\n", name),
            ProgressEvent::Fetching { source, n, target } => format!(
                "fetch r/{}  {} / {} items\n",
                source,
                format_number(*n),
                format_number(*target)
            ),
            ProgressEvent::Labeling { n, total } => format!(
                "label  {} / {} topics\n",
                format_number(*n),
                format_number(*total)
            ),
        };
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Stage { name } => serde_json::json!({
                "event": "progress",
                "phase": name,
            }),
            ProgressEvent::Fetching { source, n, target } => serde_json::json!({
                "event": "progress",
                "phase": "fetching",
                "source": source,
                "n": n,
                "total": target
            }),
            ProgressEvent::Labeling { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "labeling",
                "n": n,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut err = std::io::stderr().lock();
            let _ = writeln!(err, "{}", line);
            let _ = err.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
