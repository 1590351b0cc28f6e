use std::fs::{self, File, OpenOptions};
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::Rng;
use room404_proto::DocumentRecord;
use tracing::info;

use crate::error::{SaveFailed, StoreError};
use crate::sink::SaveSink;

/// Document persisted as a single MessagePack file.
///
/// Clones share the in-memory record, so a host can hand one clone to an
/// [`AutosaveController`](crate::AutosaveController) and keep another to
/// read metadata.
#[derive(Clone)]
pub struct DocumentStore {
    path: PathBuf,
    record: Arc<Mutex<DocumentRecord>>,
}

impl DocumentStore {
    /// Open the document at `path`, starting an empty one when the file does
    /// not exist yet. The document is named after the file stem.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let record = match Self::load(&path)? {
            Some(record) => record,
            None => {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                DocumentRecord::new(name)
            }
        };
        Ok(Self {
            path,
            record: Arc::new(Mutex::new(record)),
        })
    }

    /// Read a stored record. Returns `None` if nothing was saved at `path`.
    pub fn load(path: &Path) -> Result<Option<DocumentRecord>, StoreError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(room404_proto::decode(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the last persisted record.
    pub fn record(&self) -> DocumentRecord {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, DocumentRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write `content` as the next revision of the document.
    pub async fn write(&self, content: String) -> Result<(), StoreError> {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let next = self.record().revise(content, now);
        let bytes = room404_proto::encode(&next)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || replace_file(&path, &bytes))
            .await
            .map_err(io::Error::other)??;
        info!(
            path = %self.path.display(),
            version = next.metadata.version,
            words = next.metadata.word_count,
            "document saved"
        );
        *self.lock() = next;
        Ok(())
    }
}

impl SaveSink for DocumentStore {
    fn save(&self, content: String) -> impl Future<Output = Result<(), SaveFailed>> + Send {
        async move { self.write(content).await.map_err(SaveFailed::from) }
    }
}

/// Replace `path` with `bytes` via a synced temp file and rename, then sync
/// the directory so the rename survives a crash.
fn replace_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::other("document path has no file name"))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let nonce: u64 = rand::thread_rng().r#gen();
    let tmp = dir.join(format!(".{}.{:016x}.tmp", name.to_string_lossy(), nonce));

    let written = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&tmp)
        .and_then(|mut f| {
            f.write_all(bytes)?;
            f.sync_all()
        })
        .and_then(|()| fs::rename(&tmp, path));
    if let Err(err) = written {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    File::open(dir)?.sync_all()
}
