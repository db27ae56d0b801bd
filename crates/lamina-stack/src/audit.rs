//! Audit trail of level transitions.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use lamina_core::Level;

use crate::TransformKind;

/// One push or pop of a level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Pushed { level: Level, kind: TransformKind },
    Popped { level: Level, kind: TransformKind },
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::Pushed { level, kind } => write!(f, "push {} level {}", kind.name(), level),
            Transition::Popped { level, kind } => write!(f, "pop {} level {}", kind.name(), level),
        }
    }
}

/// Shared, append-only record of level transitions.
#[derive(Clone, Default)]
pub struct AuditLog {
    entries: Arc<Mutex<Vec<Transition>>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transition.
    pub fn record(&self, entry: Transition) {
        self.entries.lock().push(entry);
    }

    /// Snapshot of the log.
    pub fn entries(&self) -> Vec<Transition> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Write the log to a file, one transition per line.
    pub fn persist(&self, path: &Path) -> std::io::Result<()> {
        let mut f = File::create(path)?;
        for entry in self.entries() {
            writeln!(f, "{}", entry)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries().iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_renders() {
        let log = AuditLog::new();
        log.record(Transition::Pushed { level: Level(1), kind: TransformKind::Grad });
        log.record(Transition::Popped { level: Level(1), kind: TransformKind::Grad });
        let shared = log.clone();
        assert_eq!(shared.len(), 2);
        assert_eq!(shared.entries()[0].to_string(), "push grad level 1");
        assert_eq!(shared.entries()[1].to_string(), "pop grad level 1");
    }

    #[test]
    fn persists_one_line_per_entry() {
        let log = AuditLog::new();
        log.record(Transition::Pushed { level: Level(1), kind: TransformKind::Vmap });
        let path = std::env::temp_dir().join(format!("lamina-audit-{}.log", std::process::id()));
        log.persist(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(text, "push vmap level 1\n");
    }
}
