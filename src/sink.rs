//! Persistence of extracted content.
//!
//! The library decides *what* is stored (one [`TextRecord`] per completed
//! document, one [`RowRecord`] per table body row); a [`PersistenceSink`]
//! decides *where*.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
pub use crate::render::RowRecord;

/// Detected text of one completed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRecord {
    #[serde(rename = "Document")]
    pub document: String,
    #[serde(rename = "ExtractedText")]
    pub extracted_text: String,
    #[serde(rename = "TextractJobId", alias = "JobId")]
    pub job_id: String,
}

/// Receives extracted records.
pub trait PersistenceSink {
    /// Store the text of a completed document.
    fn store_text(&mut self, record: &TextRecord) -> Result<()>;

    /// Store one table body row.
    fn store_row(&mut self, record: &RowRecord) -> Result<()>;
}

impl<K: PersistenceSink + ?Sized> PersistenceSink for &mut K {
    fn store_text(&mut self, record: &TextRecord) -> Result<()> {
        (**self).store_text(record)
    }

    fn store_row(&mut self, record: &RowRecord) -> Result<()> {
        (**self).store_row(record)
    }
}

/// Keeps records in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub texts: Vec<TextRecord>,
    pub rows: Vec<RowRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceSink for MemorySink {
    fn store_text(&mut self, record: &TextRecord) -> Result<()> {
        self.texts.push(record.clone());
        Ok(())
    }

    fn store_row(&mut self, record: &RowRecord) -> Result<()> {
        self.rows.push(record.clone());
        Ok(())
    }
}

/// Writes `<document>.json` per text record and appends rows to
/// `<document>.rows.jsonl`.
///
/// Storing a document's text starts its rows file over, so reprocessing a
/// job replaces its rows instead of duplicating them.
#[derive(Debug, Clone)]
pub struct JsonDirSink {
    dir: PathBuf,
}

impl JsonDirSink {
    /// Create a sink writing into `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the text file for a document.
    pub fn text_path(&self, document: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(document)))
    }

    /// Path of the rows file for a document.
    pub fn rows_path(&self, document: &str) -> PathBuf {
        self.dir.join(format!("{}.rows.jsonl", file_stem(document)))
    }
}

/// Last path segment of a document name, or `unnamed`.
fn file_stem(document: &str) -> &str {
    let name = document.rsplit(['/', '\\']).next().unwrap_or(document).trim();
    if name.is_empty() {
        "unnamed"
    } else {
        name
    }
}

impl PersistenceSink for JsonDirSink {
    fn store_text(&mut self, record: &TextRecord) -> Result<()> {
        let path = self.text_path(&record.document);
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, record)?;
        writer.flush()?;
        log::debug!("Wrote {}", path.display());

        let rows = self.rows_path(&record.document);
        match fs::remove_file(&rows) {
            Ok(()) => log::debug!("Cleared {}", rows.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }

    fn store_row(&mut self, record: &RowRecord) -> Result<()> {
        let document = record.document.as_deref().unwrap_or_default();
        let path = self.rows_path(document);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        file.write_all(&line)?;
        Ok(())
    }
}

/// A sink shared between workers.
#[derive(Debug, Default)]
pub struct SharedSink<K> {
    inner: Arc<Mutex<K>>,
}

impl<K> SharedSink<K> {
    pub fn new(sink: K) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sink)),
        }
    }

    /// Run `f` with the wrapped sink locked.
    pub fn with<T>(&self, f: impl FnOnce(&mut K) -> T) -> Result<T> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| Error::Sink("sink lock poisoned".to_string()))?;
        Ok(f(&mut guard))
    }

    /// Take the wrapped sink back if this is the last handle.
    pub fn into_inner(self) -> Option<K> {
        Arc::try_unwrap(self.inner)
            .ok()
            .and_then(|mutex| mutex.into_inner().ok())
    }
}

impl<K> Clone for SharedSink<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: PersistenceSink> PersistenceSink for SharedSink<K> {
    fn store_text(&mut self, record: &TextRecord) -> Result<()> {
        self.with(|sink| sink.store_text(record))?
    }

    fn store_row(&mut self, record: &RowRecord) -> Result<()> {
        self.with(|sink| sink.store_row(record))?
    }
}
