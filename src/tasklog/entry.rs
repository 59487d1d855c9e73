// src/tasklog/entry.rs

use std::fmt;

/// Whether a process group started or finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Started,
    Finished,
}

impl Marker {
    pub fn as_str(self) -> &'static str {
        match self {
            Marker::Started => "+",
            Marker::Finished => "-",
        }
    }
}

/// One line of the task log: `pid \t {+|-} \t [cleanup-command]`.
///
/// `pid` stays a string: for the `rm` annotation it is a file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLogEntry {
    pub pid: String,
    pub marker: Marker,
    pub cleanup: Option<String>,
}

impl TaskLogEntry {
    pub fn started(pid: impl Into<String>, cleanup: Option<&str>) -> Self {
        Self {
            pid: pid.into(),
            marker: Marker::Started,
            cleanup: cleanup.filter(|c| !c.is_empty()).map(str::to_string),
        }
    }

    pub fn finished(pid: impl Into<String>) -> Self {
        Self {
            pid: pid.into(),
            marker: Marker::Finished,
            cleanup: None,
        }
    }

    /// Parse one line. Partial or malformed lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let mut fields = line.split('\t');

        let pid = fields.next()?.trim();
        if pid.is_empty() {
            return None;
        }

        let marker = match fields.next()?.trim() {
            "+" => Marker::Started,
            "-" => Marker::Finished,
            _ => return None,
        };

        let cleanup = fields
            .next()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Some(Self {
            pid: pid.to_string(),
            marker,
            cleanup,
        })
    }
}

impl fmt::Display for TaskLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.pid, self.marker.as_str())?;
        if let Some(cleanup) = &self.cleanup {
            write!(f, "\t{cleanup}")?;
        }
        Ok(())
    }
}
