use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use flowguard::exec::readiness::checksum_trailer;

/// Builder for shell scripts as a workflow generator would write them.
///
/// ```ignore
/// let path = ScriptBuilder::new("echo hi").with_checksum().write_to(dir.path(), "job.sh");
/// ```
#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    body: String,
    trailer: Trailer,
}

#[derive(Debug, Clone)]
enum Trailer {
    None,
    Valid,
    Corrupt,
}

impl ScriptBuilder {
    pub fn new(commands: &str) -> Self {
        Self {
            body: format!("#!/bin/sh\n{commands}"),
            trailer: Trailer::None,
        }
    }

    /// Append a trailer matching the body.
    pub fn with_checksum(mut self) -> Self {
        self.trailer = Trailer::Valid;
        self
    }

    /// Append a trailer that never matches.
    pub fn with_bad_checksum(mut self) -> Self {
        self.trailer = Trailer::Corrupt;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = self.body.clone().into_bytes();
        match self.trailer {
            Trailer::None => out.push(b'\n'),
            Trailer::Valid => out.extend_from_slice(checksum_trailer(self.body.as_bytes()).as_bytes()),
            Trailer::Corrupt => {
                let good = checksum_trailer(self.body.as_bytes());
                // Flip the last hex digit.
                let mut bad = good.trim_end().to_string();
                let last = bad.pop().unwrap();
                bad.push(if last == '0' { '1' } else { '0' });
                bad.push('\n');
                out.extend_from_slice(bad.as_bytes());
            }
        }
        out
    }

    /// Write the script as an executable file.
    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, self.build()).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}
