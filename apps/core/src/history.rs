use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum HistoryError {
    Io(std::io::Error),
}

impl std::fmt::Display for HistoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(error) => write!(f, "history io error: {error}"),
        }
    }
}

impl std::error::Error for HistoryError {}

impl From<std::io::Error> for HistoryError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Outcome of stepping forward through the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recall {
    Entry(String),
    /// Stepped past the newest entry; the input box should be emptied.
    ClearInput,
}

/// Confirmed commands, oldest first, mirrored to a newline-delimited file.
#[derive(Debug)]
pub struct CommandHistory {
    entries: Vec<String>,
    limit: usize,
    cursor: Option<usize>,
    path: Option<PathBuf>,
}

impl CommandHistory {
    pub fn in_memory(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit: limit.max(1),
            cursor: None,
            path: None,
        }
    }

    /// Reads the whole durable log once. A missing file is an empty history.
    pub fn open(path: &Path, limit: usize) -> Result<Self, HistoryError> {
        let entries = match fs::read_to_string(path) {
            Ok(raw) => raw
                .lines()
                .map(str::trim_end)
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect(),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(error) => return Err(error.into()),
        };

        let mut history = Self {
            entries,
            limit: limit.max(1),
            cursor: None,
            path: Some(path.to_path_buf()),
        };
        if history.evict_overflow() {
            history.rewrite()?;
        }
        Ok(history)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Records a confirmed command and resets the recall cursor.
    ///
    /// The in-memory log is always updated; the error only reports that the
    /// durable copy could not be written.
    pub fn append(&mut self, command: &str) -> Result<(), HistoryError> {
        let line = command.replace(['\r', '\n'], " ").trim().to_string();
        self.cursor = None;
        if line.is_empty() {
            return Ok(());
        }

        self.entries.push(line.clone());
        if self.evict_overflow() {
            self.rewrite()
        } else {
            self.append_line(&line)
        }
    }

    /// Applies a new limit, evicting oldest entries if needed.
    pub fn set_limit(&mut self, limit: usize) -> Result<(), HistoryError> {
        self.limit = limit.max(1);
        if self.evict_overflow() {
            self.cursor = None;
            return self.rewrite();
        }
        Ok(())
    }

    pub fn recall_previous(&mut self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }

        let index = match self.cursor {
            None => self.entries.len() - 1,
            Some(index) => index.saturating_sub(1),
        };
        self.cursor = Some(index);
        Some(self.entries[index].clone())
    }

    pub fn recall_next(&mut self) -> Option<Recall> {
        let current = self.cursor?;
        if current + 1 < self.entries.len() {
            self.cursor = Some(current + 1);
            return Some(Recall::Entry(self.entries[current + 1].clone()));
        }

        self.cursor = None;
        Some(Recall::ClearInput)
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = None;
    }

    fn evict_overflow(&mut self) -> bool {
        if self.entries.len() <= self.limit {
            return false;
        }
        let overflow = self.entries.len() - self.limit;
        self.entries.drain(..overflow);
        true
    }

    fn append_line(&self, line: &str) -> Result<(), HistoryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(format!("{line}\n").as_bytes())?;
        file.sync_data()?;
        Ok(())
    }

    fn rewrite(&self) -> Result<(), HistoryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = path.with_extension("tmp");
        let mut body = self.entries.join("\n");
        if !body.is_empty() {
            body.push('\n');
        }
        {
            let mut file = fs::File::create(&staging)?;
            file.write_all(body.as_bytes())?;
            file.sync_data()?;
        }
        fs::rename(&staging, path)?;
        Ok(())
    }
}
