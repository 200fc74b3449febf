use std::sync::{Arc, Mutex};

use crate::error::ParleyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A logged-but-non-fatal fault. Parsing, evaluation and traversal report these
/// and carry on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub error: ParleyError,
    pub context: Option<String>,
}

impl Diagnostic {
    pub fn error(error: ParleyError) -> Self {
        Self {
            severity: Severity::Error,
            error,
            context: None,
        }
    }

    pub fn warning(error: ParleyError) -> Self {
        Self {
            severity: Severity::Warning,
            error,
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn code(&self) -> &str {
        &self.error.code
    }
}

pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        let context = diagnostic.context.as_deref().unwrap_or("");
        match diagnostic.severity {
            Severity::Warning => tracing::warn!(
                code = %diagnostic.error.code,
                context,
                "{}",
                diagnostic.error.message
            ),
            Severity::Error => tracing::error!(
                code = %diagnostic.error.code,
                context,
                "{}",
                diagnostic.error.message
            ),
        }
    }
}

/// Keeps every reported diagnostic in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn codes(&self) -> Vec<String> {
        self.diagnostics()
            .into_iter()
            .map(|diagnostic| diagnostic.error.code)
            .collect()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.diagnostics()
            .iter()
            .any(|diagnostic| diagnostic.code() == code)
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(diagnostic);
        }
    }
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for Arc<T> {
    fn report(&self, diagnostic: Diagnostic) {
        (**self).report(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_sink_records_in_order() {
        let sink = CollectingSink::new();
        sink.report(Diagnostic::warning(ParleyError::new("A", "first")));
        sink.report(Diagnostic::error(ParleyError::new("B", "second")).with_context("ctx"));
        assert_eq!(sink.codes(), vec!["A".to_string(), "B".to_string()]);
        assert!(sink.contains("B"));
        let second = &sink.diagnostics()[1];
        assert_eq!(second.severity, Severity::Error);
        assert_eq!(second.context.as_deref(), Some("ctx"));
        sink.clear();
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn shared_sink_reports_through_arc() {
        let sink = CollectingSink::shared();
        let dyn_sink: Arc<dyn DiagnosticSink> = sink.clone();
        dyn_sink.report(Diagnostic::error(ParleyError::new("C", "third")));
        assert!(sink.contains("C"));
    }
}
