use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

pub const GENERAL_LOG: &str = "general.log";
pub const RAW_RESPONSES_LOG: &str = "model_raw_responses.log";
pub const JSON_ERRORS_LOG: &str = "json_errors.log";

struct LogStream {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl LogStream {
    fn open(path: PathBuf) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// A log line that cannot be written is reported on the console and
    /// otherwise ignored; the run keeps going.
    fn write_entry(&mut self, entry: &str) {
        let written = writeln!(self.writer, "{entry}").and_then(|_| self.writer.flush());
        if let Err(error) = written {
            warn!(path = %self.path.display(), error = %error, "could not write run log entry");
        }
    }
}

/// The three append-only logs of a run: outcomes, raw model replies and JSON errors.
pub struct RunLog {
    run_id: Uuid,
    general: LogStream,
    raw: LogStream,
    json_errors: LogStream,
}

impl RunLog {
    pub fn open(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            run_id: Uuid::new_v4(),
            general: LogStream::open(dir.join(GENERAL_LOG))?,
            raw: LogStream::open(dir.join(RAW_RESPONSES_LOG))?,
            json_errors: LogStream::open(dir.join(JSON_ERRORS_LOG))?,
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Writes the same section header to all three logs.
    pub fn header(&mut self, title: &str) {
        let block = format!(
            "\n=== {title} | {} | run={} ===",
            Utc::now().to_rfc3339(),
            self.run_id
        );
        self.general.write_entry(&block);
        self.raw.write_entry(&block);
        self.json_errors.write_entry(&block);
    }

    pub fn general(&mut self, line: &str) {
        self.general.write_entry(line);
    }

    pub fn raw_response(&mut self, file_name: &str, raw: &str) {
        self.raw
            .write_entry(&format!("\n[RAW - {file_name}]\n{}", raw.trim_end()));
    }

    pub fn json_error(&mut self, file_name: &str, reason: &str, raw: &str) {
        self.json_errors.write_entry(&format!(
            "\n[JSON ERROR] {file_name}\nParse error: {reason}\nReturned:\n{}\n",
            raw.trim_end()
        ));
    }

    pub fn incomplete(&mut self, file_name: &str, entry: &str) {
        self.json_errors
            .write_entry(&format!("[INCOMPLETE] {file_name} -> {entry}"));
    }
}
