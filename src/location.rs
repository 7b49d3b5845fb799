use crate::classification::read_lookup_table;
use crate::debug::{DebugSink, NullSink};
use crate::encoding::read_file_bytes;
use crate::error::Result;
use crate::schema::{LocationLayout, LocationTable};
use log::{error, info};
use std::path::Path;

/// Loads the department-code to location lookup table.
///
/// Encoding fallback works as for the classification table: a candidate is
/// abandoned only when the required columns are not all present.
pub struct LocationLoader {
    layout: LocationLayout,
    sink: Box<dyn DebugSink>,
}

impl Default for LocationLoader {
    fn default() -> Self {
        Self::new(LocationLayout::default())
    }
}

impl LocationLoader {
    pub fn new(layout: LocationLayout) -> Self {
        Self {
            layout,
            sink: Box::new(NullSink),
        }
    }

    pub fn with_debug_sink(mut self, sink: impl DebugSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn layout(&self) -> &LocationLayout {
        &self.layout
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<LocationTable> {
        let path = path.as_ref();
        self.load_inner(path).map_err(|e| {
            error!("Failed to load location table {}: {}", path.display(), e);
            e
        })
    }

    fn load_inner(&self, path: &Path) -> Result<LocationTable> {
        self.layout.validate()?;
        let required = self.layout.required_columns();
        let bytes = read_file_bytes(path)?;

        let (frame, encoding) =
            read_lookup_table(path, &bytes, &self.layout.encodings, &required)?;
        info!(
            "Loaded {} location rows from {} ({})",
            frame.len(),
            path.display(),
            encoding
        );
        self.sink.dump(&frame, "location_result");
        Ok(LocationTable { frame, encoding })
    }
}

pub fn load_location(path: impl AsRef<Path>) -> Result<LocationTable> {
    LocationLoader::default().load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::TextEncoding;
    use crate::error::IngestError;
    use crate::frame::Frame;
    use encoding_rs::SHIFT_JIS;
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;

    fn write_file(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn test_utf8_keeps_leading_zeros() {
        let csv = "\u{FEFF}部門コード,部門名,場所\n0101,東京支店,東京\n0020,本社,千代田\n";
        let file = write_file(csv.as_bytes());

        let table = load_location(file.path()).unwrap();
        assert_eq!(table.encoding, TextEncoding::Utf8Sig);
        assert_eq!(table.frame.columns(), &["部門コード", "場所"]);
        assert_eq!(table.frame.rows()[1], vec!["0020", "千代田"]);
        assert_eq!(table.by_department_code()["0101"].location, "東京");
    }

    #[test]
    fn test_retries_as_cp932() {
        let (bytes, _, had_errors) = SHIFT_JIS.encode("場所,部門コード\n大阪,0201\n");
        assert!(!had_errors);
        let file = write_file(&bytes);

        let table = load_location(file.path()).unwrap();
        assert_eq!(table.encoding, TextEncoding::Cp932);
        assert_eq!(table.records()[0].department_code, "0201");
        assert_eq!(table.records()[0].location, "大阪");
    }

    #[test]
    fn test_missing_location_column() {
        let file = write_file("部門コード,部門名\n0101,東京支店\n".as_bytes());

        match load_location(file.path()) {
            Err(IngestError::MissingColumns { missing, .. }) => {
                assert_eq!(missing, vec!["場所".to_string()]);
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_dumps_result() {
        let file = write_file("部門コード,場所\n0101,東京\n".as_bytes());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let recorder = Rc::clone(&seen);

        LocationLoader::default()
            .with_debug_sink(move |frame: &Frame, name: &str| {
                recorder.borrow_mut().push((name.to_string(), frame.len()));
            })
            .load(file.path())
            .unwrap();
        assert_eq!(*seen.borrow(), vec![("location_result".to_string(), 1)]);
    }
}
