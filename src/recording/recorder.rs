// SessionRecorder - append-only CSV file for one tracking session
//
// One file per session, named `<start unix seconds>.csv` inside the log
// directory. The directory itself belongs to the host and must exist before a
// session is opened. Every append is synced to disk before returning; a power
// loss can therefore corrupt at most the row being written, which readers skip.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::record::SessionRecord;
use crate::error::{AnalysisError, StorageError};

/// Session file extension
pub const SESSION_EXTENSION: &str = "csv";

/// Session identifier: the session start time in unix seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Session start (unix seconds)
    pub fn start(self) -> u64 {
        self.0
    }

    pub fn file_name(self) -> String {
        format!("{}.{}", self.0, SESSION_EXTENSION)
    }

    pub fn path_in(self, log_dir: &Path) -> PathBuf {
        log_dir.join(self.file_name())
    }

    /// Recover the id from a session file path
    pub fn from_path(path: &Path) -> Result<Self, StorageError> {
        let invalid = || StorageError::InvalidPath {
            path: path.display().to_string(),
        };

        if path.extension().and_then(|e| e.to_str()) != Some(SESSION_EXTENSION) {
            return Err(invalid());
        }
        path.file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<u64>().ok())
            .map(SessionId)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rows read back from a session file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionRead {
    pub records: Vec<SessionRecord>,
    /// Lines that could not be decoded (typically a torn last row)
    pub skipped: usize,
}

/// Writer side of a session file
pub struct SessionRecorder {
    id: SessionId,
    path: PathBuf,
    file: File,
    last_elapsed: Option<u32>,
    rows_written: usize,
}

impl SessionRecorder {
    /// Create the (empty) file for a new session
    ///
    /// # Errors
    /// * `DirectoryMissing` - `log_dir` does not exist
    /// * `SessionExists` - a file for this id is already present
    /// * `Io` - any other failure creating the file
    pub fn open(log_dir: &Path, id: SessionId) -> Result<Self, StorageError> {
        if !log_dir.is_dir() {
            return Err(StorageError::DirectoryMissing {
                path: log_dir.display().to_string(),
            });
        }

        let path = id.path_in(log_dir);
        let file = OpenOptions::new()
            .append(true)
            .create_new(true)
            .open(&path)
            .map_err(|err| match err.kind() {
                ErrorKind::AlreadyExists => StorageError::SessionExists {
                    path: path.display().to_string(),
                },
                _ => StorageError::io(&path, err),
            })?;

        log::info!("[Recorder] Opened session {} at {:?}", id, path);

        Ok(Self {
            id,
            path,
            file,
            last_elapsed: None,
            rows_written: 0,
        })
    }

    /// Append one row and sync it to disk
    ///
    /// Rows must arrive in strictly increasing elapsed-time order.
    pub fn append(&mut self, record: &SessionRecord) -> Result<(), StorageError> {
        if let Some(previous) = self.last_elapsed {
            if record.elapsed_s() <= previous {
                return Err(StorageError::OutOfOrder {
                    previous,
                    attempted: record.elapsed_s(),
                });
            }
        }

        self.file
            .write_all(record.encode().as_bytes())
            .and_then(|_| self.file.sync_data())
            .map_err(|err| StorageError::io(&self.path, err))?;

        self.last_elapsed = Some(record.elapsed_s());
        self.rows_written += 1;
        Ok(())
    }

    pub fn session_id(&self) -> SessionId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Read a session file, skipping rows that do not decode
    ///
    /// Rows whose elapsed time does not increase are treated as corrupt and
    /// skipped as well, so the returned series is always strictly ordered.
    pub fn read_records(path: &Path) -> Result<SessionRead, StorageError> {
        let bytes = fs::read(path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => StorageError::SessionNotFound {
                path: path.display().to_string(),
            },
            _ => StorageError::io(path, err),
        })?;
        let text = String::from_utf8_lossy(&bytes);

        let mut read = SessionRead::default();
        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match SessionRecord::decode(line) {
                Ok(record) => {
                    let in_order = read
                        .records
                        .last()
                        .map_or(true, |last| record.elapsed_s() > last.elapsed_s());
                    if in_order {
                        read.records.push(record);
                    } else {
                        log::warn!(
                            "[Recorder] {:?} line {}: elapsed {}s out of order, skipped",
                            path,
                            line_no + 1,
                            record.elapsed_s()
                        );
                        read.skipped += 1;
                    }
                }
                Err(err) => {
                    log::warn!("[Recorder] {:?} line {}: {}, skipped", path, line_no + 1, err);
                    read.skipped += 1;
                }
            }
        }

        Ok(read)
    }

    /// Read a session by id
    pub fn read_session(log_dir: &Path, id: SessionId) -> Result<SessionRead, StorageError> {
        Self::read_records(&id.path_in(log_dir))
    }

    /// Read a session for analysis
    ///
    /// Fails with `InsufficientData` when fewer than `min_rows` rows decode,
    /// so callers never run the processor on a near-empty night.
    pub fn read_all(
        log_dir: &Path,
        id: SessionId,
        min_rows: usize,
    ) -> Result<Vec<SessionRecord>, AnalysisError> {
        Self::read_all_from(&id.path_in(log_dir), min_rows)
    }

    /// [`read_all`](Self::read_all) for an explicit file path
    pub fn read_all_from(path: &Path, min_rows: usize) -> Result<Vec<SessionRecord>, AnalysisError> {
        let read = Self::read_records(path)?;
        if read.records.len() < min_rows {
            return Err(AnalysisError::InsufficientData {
                required: min_rows,
                found: read.records.len(),
            });
        }
        Ok(read.records)
    }
}

/// Session ids found in a log directory, oldest first
///
/// Files that are not named `<unix seconds>.csv` are ignored.
pub fn list_sessions(log_dir: &Path) -> Result<Vec<SessionId>, StorageError> {
    if !log_dir.is_dir() {
        return Err(StorageError::DirectoryMissing {
            path: log_dir.display().to_string(),
        });
    }

    let entries = fs::read_dir(log_dir).map_err(|err| StorageError::io(log_dir, err))?;
    let mut ids: Vec<SessionId> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter_map(|path| SessionId::from_path(&path).ok())
        .collect();
    ids.sort();
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::record::{HeartRate, MetaFlag};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn temp_log_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sleep_tracker_recorder_{}_{}_{}",
            tag,
            std::process::id(),
            DIR_COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_open_requires_directory() {
        let missing = std::env::temp_dir().join("sleep_tracker_recorder_missing_dir/nested");
        match SessionRecorder::open(&missing, SessionId(1)) {
            Err(StorageError::DirectoryMissing { .. }) => {}
            other => panic!("expected DirectoryMissing, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_open_twice_is_rejected() {
        let dir = temp_log_dir("twice");
        let _first = SessionRecorder::open(&dir, SessionId(1_700_000_000)).unwrap();
        match SessionRecorder::open(&dir, SessionId(1_700_000_000)) {
            Err(StorageError::SessionExists { .. }) => {}
            other => panic!("expected SessionExists, got {:?}", other.err()),
        }
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = temp_log_dir("roundtrip");
        let id = SessionId(1_700_000_000);
        let mut recorder = SessionRecorder::open(&dir, id).unwrap();

        let records = vec![
            SessionRecord::new(300, 12.5),
            SessionRecord::new(600, -3.25).with_heart_rate(HeartRate::Bpm(58)),
            SessionRecord::new(900, 0.0).with_meta(MetaFlag::UserTouch),
            SessionRecord::new(1200, 45.123456)
                .with_heart_rate(HeartRate::Unknown),
            SessionRecord::new(1500, 7.0)
                .with_heart_rate(HeartRate::Unknown)
                .with_meta(MetaFlag::None),
            SessionRecord::new(1800, 8.0)
                .with_heart_rate(HeartRate::Unknown)
                .with_meta(MetaFlag::Both),
        ];
        for record in &records {
            recorder.append(record).unwrap();
        }
        assert_eq!(recorder.rows_written(), 6);

        let read = SessionRecorder::read_session(&dir, id).unwrap();
        assert_eq!(read.records, records);
        assert_eq!(read.skipped, 0);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_append_rejects_out_of_order() {
        let dir = temp_log_dir("order");
        let mut recorder = SessionRecorder::open(&dir, SessionId(5)).unwrap();
        recorder.append(&SessionRecord::new(600, 1.0)).unwrap();

        let err = recorder.append(&SessionRecord::new(600, 2.0)).unwrap_err();
        assert_eq!(
            err,
            StorageError::OutOfOrder {
                previous: 600,
                attempted: 600
            }
        );
        assert_eq!(recorder.rows_written(), 1);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_torn_last_row_is_skipped() {
        let dir = temp_log_dir("torn");
        let path = SessionId(9).path_in(&dir);
        fs::write(&path, b"300,1.0000\n600,2.0000\n900,3.0000\n1200,\xff\xfe").unwrap();

        let read = SessionRecorder::read_records(&path).unwrap();
        assert_eq!(read.records.len(), 3);
        assert_eq!(read.skipped, 1);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_read_all_requires_min_rows() {
        let dir = temp_log_dir("minrows");
        let id = SessionId(11);
        let mut recorder = SessionRecorder::open(&dir, id).unwrap();
        for i in 1..=5u32 {
            recorder.append(&SessionRecord::new(i * 300, i as f64)).unwrap();
        }

        match SessionRecorder::read_all(&dir, id, 6) {
            Err(AnalysisError::InsufficientData { required, found }) => {
                assert_eq!(required, 6);
                assert_eq!(found, 5);
            }
            other => panic!("expected InsufficientData, got {:?}", other),
        }

        recorder.append(&SessionRecord::new(1800, 6.0)).unwrap();
        assert_eq!(SessionRecorder::read_all(&dir, id, 6).unwrap().len(), 6);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_read_missing_session() {
        let dir = temp_log_dir("missing");
        match SessionRecorder::read_session(&dir, SessionId(404)) {
            Err(StorageError::SessionNotFound { path }) => assert!(path.ends_with("404.csv")),
            other => panic!("expected SessionNotFound, got {:?}", other),
        }
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_list_sessions_sorted() {
        let dir = temp_log_dir("list");
        for id in [300u64, 100, 200] {
            SessionRecorder::open(&dir, SessionId(id)).unwrap();
        }
        fs::write(dir.join("notes.txt"), "x").unwrap();
        fs::write(dir.join("abc.csv"), "x").unwrap();

        let ids = list_sessions(&dir).unwrap();
        assert_eq!(ids, vec![SessionId(100), SessionId(200), SessionId(300)]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_session_id_from_path() {
        assert_eq!(
            SessionId::from_path(Path::new("logs/sleep/1700000000.csv")).unwrap(),
            SessionId(1_700_000_000)
        );
        assert!(SessionId::from_path(Path::new("logs/sleep/1700000000.txt")).is_err());
        assert!(SessionId::from_path(Path::new("logs/sleep/night.csv")).is_err());
    }
}
