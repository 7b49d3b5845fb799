use crate::debug::{DebugSink, NullSink};
use crate::encoding::{read_file_bytes, TextEncoding};
use crate::error::{IngestError, Result};
use crate::frame::Frame;
use crate::schema::{ClassificationLayout, ClassificationTable};
use log::{debug, error, info, warn};
use std::path::Path;

/// Loads the account-code to classification lookup table.
///
/// Each candidate encoding decodes the whole file leniently; the next
/// candidate is tried only when the required columns are not all present.
/// A file written in cp932 therefore decodes under UTF-8 with garbled
/// headers, fails the column check, and is re-read as cp932.
pub struct ClassificationLoader {
    layout: ClassificationLayout,
    sink: Box<dyn DebugSink>,
}

impl Default for ClassificationLoader {
    fn default() -> Self {
        Self::new(ClassificationLayout::default())
    }
}

impl ClassificationLoader {
    pub fn new(layout: ClassificationLayout) -> Self {
        Self {
            layout,
            sink: Box::new(NullSink),
        }
    }

    pub fn with_debug_sink(mut self, sink: impl DebugSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn layout(&self) -> &ClassificationLayout {
        &self.layout
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<ClassificationTable> {
        let path = path.as_ref();
        self.load_inner(path).map_err(|e| {
            error!("Failed to load classification table {}: {}", path.display(), e);
            e
        })
    }

    fn load_inner(&self, path: &Path) -> Result<ClassificationTable> {
        self.layout.validate()?;
        let required = self.layout.required_columns();
        let bytes = read_file_bytes(path)?;

        let (frame, encoding) =
            read_lookup_table(path, &bytes, &self.layout.encodings, &required)?;
        info!(
            "Loaded {} classification rows from {} ({})",
            frame.len(),
            path.display(),
            encoding
        );
        self.sink.dump(&frame, "classification_result");
        Ok(ClassificationTable { frame, encoding })
    }
}

/// Decodes a flat lookup table under each candidate in turn and returns it
/// projected to `required`.
///
/// Decoding is lossy, so the next candidate is tried only when a required
/// column is absent. If every candidate fails the check, the error carries
/// the names missing under the last one.
pub(crate) fn read_lookup_table(
    path: &Path,
    bytes: &[u8],
    encodings: &[TextEncoding],
    required: &[&str],
) -> Result<(Frame, TextEncoding)> {
    let mut missing = Vec::new();
    for (attempt, encoding) in encodings.iter().enumerate() {
        if attempt > 0 {
            warn!(
                "Columns {:?} not found in {}; retrying as {}",
                missing,
                path.display(),
                encoding
            );
        }

        let frame = Frame::from_csv_str(&encoding.decode_lossy(bytes))?;
        missing = frame.missing_columns(required);
        if missing.is_empty() {
            return Ok((frame.select(required), *encoding));
        }
        debug!("{} headers under {}: {:?}", path.display(), encoding, frame.columns());
    }

    Err(IngestError::MissingColumns {
        path: path.to_path_buf(),
        missing,
    })
}

pub fn load_classification(path: impl AsRef<Path>) -> Result<ClassificationTable> {
    ClassificationLoader::default().load(path)
}
