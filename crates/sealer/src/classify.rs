//! Input classification: path + leading bytes → [`ContentKind`].
//!
//! Classification is a chain of [`Classifier`]s tried in order; the first one
//! that recognises the sample wins. The default chain looks at content
//! signatures before falling back to the file extension.

use std::{
    fmt,
    fs::File,
    io::{self, Read},
    path::Path,
};

use tracing::debug;

/// How many leading bytes of an input are offered to classifiers.
pub const SAMPLE_LEN: usize = 512;

/// The kinds of input the CLI knows how to route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Opaque binary document, encrypted as-is.
    Pdf,
    /// Comma-separated values with a header row.
    Csv,
    /// XML document.
    Xml,
    /// Plain `key: value` lines.
    KeyValueText,
    /// A JSON envelope produced by `sealer encrypt`.
    Envelope,
}

impl ContentKind {
    /// Stable lowercase name used in logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Pdf => "pdf",
            ContentKind::Csv => "csv",
            ContentKind::Xml => "xml",
            ContentKind::KeyValueText => "text",
            ContentKind::Envelope => "envelope",
        }
    }

    /// Whether this kind is normalised to JSON before encryption.
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            ContentKind::Csv | ContentKind::Xml | ContentKind::KeyValueText
        )
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a classifier gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct Sample<'a> {
    /// Path of the input, for classifiers that care about naming.
    pub path: &'a Path,
    /// Up to [`SAMPLE_LEN`] leading bytes of the input.
    pub head: &'a [u8],
}

/// A single classification capability.
pub trait Classifier {
    /// Return the kind of `sample`, or `None` if this classifier cannot tell.
    fn classify(&self, sample: &Sample<'_>) -> Option<ContentKind>;
}

/// Recognises inputs by their leading bytes.
#[derive(Debug, Default)]
pub struct SignatureClassifier;

impl Classifier for SignatureClassifier {
    fn classify(&self, sample: &Sample<'_>) -> Option<ContentKind> {
        let head = sample.head;
        if head.starts_with(b"%PDF-") {
            return Some(ContentKind::Pdf);
        }
        let trimmed = trim_leading(head);
        if trimmed.starts_with(b"<?xml") {
            return Some(ContentKind::Xml);
        }
        if trimmed.starts_with(b"{") && contains(trimmed, b"\"ciphertext\"") {
            return Some(ContentKind::Envelope);
        }
        None
    }
}

/// Recognises inputs by file extension (case-insensitive).
#[derive(Debug, Default)]
pub struct ExtensionClassifier;

impl Classifier for ExtensionClassifier {
    fn classify(&self, sample: &Sample<'_>) -> Option<ContentKind> {
        let ext = sample.path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(ContentKind::Pdf),
            "csv" => Some(ContentKind::Csv),
            "xml" => Some(ContentKind::Xml),
            "txt" => Some(ContentKind::KeyValueText),
            "json" => Some(ContentKind::Envelope),
            _ => None,
        }
    }
}

/// Ordered list of classifiers; first match wins.
pub struct ClassifierChain {
    classifiers: Vec<Box<dyn Classifier>>,
}

impl ClassifierChain {
    /// An empty chain that recognises nothing.
    pub fn empty() -> Self {
        Self {
            classifiers: Vec::new(),
        }
    }

    /// Append a classifier to the end of the chain.
    pub fn with(mut self, classifier: impl Classifier + 'static) -> Self {
        self.classifiers.push(Box::new(classifier));
        self
    }

    /// Classify an in-memory sample.
    pub fn classify(&self, sample: &Sample<'_>) -> Option<ContentKind> {
        self.classifiers.iter().find_map(|c| c.classify(sample))
    }

    /// Read the head of `path` and classify it.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be opened or read.
    pub fn classify_file(&self, path: &Path) -> io::Result<Option<ContentKind>> {
        let mut head = Vec::with_capacity(SAMPLE_LEN);
        File::open(path)?
            .take(SAMPLE_LEN as u64)
            .read_to_end(&mut head)?;
        let kind = self.classify(&Sample { path, head: &head });
        debug!(path = %path.display(), kind = ?kind, "classified input");
        Ok(kind)
    }
}

impl Default for ClassifierChain {
    /// Signatures first, then extensions.
    fn default() -> Self {
        Self::empty()
            .with(SignatureClassifier)
            .with(ExtensionClassifier)
    }
}

fn trim_leading(bytes: &[u8]) -> &[u8] {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
