//! Diagnostics collected while decoding an image.
//!
//! Custom attribute decoding and instruction decoding never raise to their callers. When
//! either gives up on an input, it reports here instead: a per-subsystem fault counter is
//! incremented, the fault's description is tallied in a message-keyed table, and a
//! structured [`Diagnostic`] entry is appended.
//!
//! One [`Diagnostics`] sink is created per opened file and shared through an `Arc`. Callers
//! that want to observe faults across several files can inject their own sink through
//! [`crate::CilFile::open`].
//!
//! The container uses `boxcar::Vec` for lock-free appends, atomic counters for the fault
//! counts and a `DashMap` for the tally, so any number of threads may report concurrently.
//! Nothing recorded here feeds back into decoding.
//!
//! # Examples
//!
//! ```rust
//! use cilgraph::metadata::diagnostics::{Diagnostics, DiagnosticCategory};
//!
//! let diagnostics = Diagnostics::new();
//! diagnostics.record_attribute_fault(None, "Unexpected end of blob");
//! diagnostics.record_attribute_fault(None, "Unexpected end of blob");
//!
//! assert_eq!(diagnostics.attribute_faults(), 2);
//! assert_eq!(diagnostics.fault_counts().get("Unexpected end of blob"), Some(&2));
//! assert_eq!(diagnostics.by_category(DiagnosticCategory::CustomAttribute).len(), 2);
//! ```

use std::{
    collections::HashMap,
    fmt::{self, Write},
    sync::atomic::{AtomicUsize, Ordering},
};

use dashmap::DashMap;

use crate::metadata::token::Token;

/// Severity level of a diagnostic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticSeverity {
    /// Informational message, not indicating a problem.
    Info,

    /// Warning about metadata that decodes, but not the way a well-formed image would.
    Warning,

    /// A value was abandoned; the affected entity reports an empty or truncated result.
    Error,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Info => write!(f, "INFO"),
            DiagnosticSeverity::Warning => write!(f, "WARN"),
            DiagnosticSeverity::Error => write!(f, "ERROR"),
        }
    }
}

/// The subsystem that produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCategory {
    /// Metadata heaps
    Heap,
    /// Table rows and indices
    Table,
    /// Custom attribute value decoding
    CustomAttribute,
    /// Type and method signature decoding
    Signature,
    /// Instruction stream decoding
    Instruction,
    /// Everything else
    General,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticCategory::Heap => write!(f, "Heap"),
            DiagnosticCategory::Table => write!(f, "Table"),
            DiagnosticCategory::CustomAttribute => write!(f, "CustomAttribute"),
            DiagnosticCategory::Signature => write!(f, "Signature"),
            DiagnosticCategory::Instruction => write!(f, "Instruction"),
            DiagnosticCategory::General => write!(f, "General"),
        }
    }
}

/// A single diagnostic entry
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level of this diagnostic.
    pub severity: DiagnosticSeverity,

    /// Category indicating the source of this diagnostic.
    pub category: DiagnosticCategory,

    /// Human-readable description of the issue.
    pub message: String,

    /// Metadata token of the affected entity, if there is one.
    pub token: Option<Token>,

    /// Offset inside the decoded blob or instruction stream.
    pub offset: Option<usize>,
}

impl Diagnostic {
    /// Creates a new diagnostic entry without location information.
    pub fn new(
        severity: DiagnosticSeverity,
        category: DiagnosticCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            token: None,
            offset: None,
        }
    }

    /// Adds the token of the affected entity.
    #[must_use]
    pub fn with_token(mut self, token: Token) -> Self {
        self.token = Some(token);
        self
    }

    /// Adds an offset inside the decoded data.
    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.category, self.message)?;

        if let Some(token) = self.token {
            write!(f, " (token: {})", token)?;
        }

        if let Some(offset) = self.offset {
            write!(f, " (offset: 0x{:x})", offset)?;
        }

        Ok(())
    }
}

/// Thread-safe sink for fault counters and diagnostic entries.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: boxcar::Vec<Diagnostic>,
    attribute_faults: AtomicUsize,
    il_faults: AtomicUsize,
    enum_width_retries: AtomicUsize,
    tally: DashMap<String, usize>,
}

impl Diagnostics {
    /// Creates a new empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a custom attribute whose arguments could not be decoded.
    pub fn record_attribute_fault(&self, token: Option<Token>, message: impl Into<String>) {
        self.attribute_faults.fetch_add(1, Ordering::Relaxed);
        self.fault(DiagnosticCategory::CustomAttribute, token, None, message.into());
    }

    /// Record an instruction stream that was cut short at `offset`.
    pub fn record_il_fault(&self, token: Option<Token>, offset: usize, message: impl Into<String>) {
        self.il_faults.fetch_add(1, Ordering::Relaxed);
        self.fault(DiagnosticCategory::Instruction, token, Some(offset), message.into());
    }

    /// Record one additional full decode attempt under a new enum width guess.
    pub fn record_enum_width_retry(&self) {
        self.enum_width_retries.fetch_add(1, Ordering::Relaxed);
    }

    fn fault(
        &self,
        category: DiagnosticCategory,
        token: Option<Token>,
        offset: Option<usize>,
        message: String,
    ) {
        *self.tally.entry(message.clone()).or_insert(0) += 1;

        let mut diagnostic = Diagnostic::new(DiagnosticSeverity::Error, category, message);
        diagnostic.token = token;
        diagnostic.offset = offset;
        self.push(diagnostic);
    }

    /// Adds an informational diagnostic.
    pub fn info(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(Diagnostic::new(DiagnosticSeverity::Info, category, message));
    }

    /// Adds a warning diagnostic.
    pub fn warning(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(Diagnostic::new(
            DiagnosticSeverity::Warning,
            category,
            message,
        ));
    }

    /// Adds a diagnostic entry directly.
    pub fn push(&self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    /// Number of custom attributes that decoded to empty argument lists
    pub fn attribute_faults(&self) -> usize {
        self.attribute_faults.load(Ordering::Relaxed)
    }

    /// Number of instruction streams that were truncated
    pub fn il_faults(&self) -> usize {
        self.il_faults.load(Ordering::Relaxed)
    }

    /// Number of decode attempts made beyond the first, across all attributes
    pub fn enum_width_retries(&self) -> usize {
        self.enum_width_retries.load(Ordering::Relaxed)
    }

    /// Snapshot of the fault tally, keyed by fault description
    pub fn fault_counts(&self) -> HashMap<String, usize> {
        self.tally
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    /// Returns the total number of entries.
    pub fn count(&self) -> usize {
        self.entries.count()
    }

    /// Returns true if any error-level entries have been collected.
    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, d)| d.severity == DiagnosticSeverity::Error)
    }

    /// Returns an iterator over all entries.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().map(|(_, d)| d)
    }

    /// Returns a copy of all entries in insertion order.
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.iter().cloned().collect()
    }

    /// Returns entries filtered by category.
    pub fn by_category(&self, category: DiagnosticCategory) -> Vec<&Diagnostic> {
        self.iter().filter(|d| d.category == category).collect()
    }

    /// Formats a summary of counters and entries for display.
    pub fn summary(&self) -> String {
        let mut output = String::new();

        let _ = writeln!(
            output,
            "Diagnostics: {} attribute fault(s), {} IL fault(s), {} enum width retries",
            self.attribute_faults(),
            self.il_faults(),
            self.enum_width_retries()
        );

        for diag in self.iter() {
            let _ = writeln!(output, "  {diag}");
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_diagnostic_with_context() {
        let diag = Diagnostic::new(
            DiagnosticSeverity::Error,
            DiagnosticCategory::Instruction,
            "Invalid opcode",
        )
        .with_offset(0x10)
        .with_token(Token::new(0x0600_0001));

        assert_eq!(diag.offset, Some(0x10));
        assert_eq!(diag.token, Some(Token::new(0x0600_0001)));

        let display = format!("{}", diag);
        assert!(display.contains("ERROR"));
        assert!(display.contains("Instruction"));
        assert!(display.contains("0x06000001"));
        assert!(display.contains("0x10"));
    }

    #[test]
    fn test_fault_counters() {
        let diagnostics = Diagnostics::new();

        diagnostics.record_attribute_fault(Some(Token::new(0x0C00_0001)), "blob overrun");
        diagnostics.record_il_fault(None, 4, "unknown opcode 0xfe 0x30");
        diagnostics.record_il_fault(None, 9, "unknown opcode 0xfe 0x30");
        diagnostics.record_enum_width_retry();
        diagnostics.warning(DiagnosticCategory::General, "note");

        assert_eq!(diagnostics.attribute_faults(), 1);
        assert_eq!(diagnostics.il_faults(), 2);
        assert_eq!(diagnostics.enum_width_retries(), 1);
        assert_eq!(diagnostics.count(), 4);
        assert!(diagnostics.has_errors());

        let counts = diagnostics.fault_counts();
        assert_eq!(counts.get("blob overrun"), Some(&1));
        assert_eq!(counts.get("unknown opcode 0xfe 0x30"), Some(&2));
        assert_eq!(diagnostics.by_category(DiagnosticCategory::Instruction).len(), 2);
        assert!(diagnostics.summary().contains("2 IL fault(s)"));
    }

    #[test]
    fn test_diagnostics_thread_safety() {
        let diagnostics = Arc::new(Diagnostics::new());
        let mut handles = vec![];

        for i in 0..10 {
            let diag_clone = Arc::clone(&diagnostics);
            handles.push(thread::spawn(move || {
                diag_clone.record_attribute_fault(None, format!("fault {}", i % 2));
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(diagnostics.attribute_faults(), 10);
        assert_eq!(diagnostics.fault_counts().values().sum::<usize>(), 10);
    }
}
