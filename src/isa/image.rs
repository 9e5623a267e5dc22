//! Program image file format.
//!
//! An image is a single JSON document holding the resolved code and the
//! initial contents of data memory:
//!
//! ```text
//! {
//!   "code": [ { "opcode": "mov", "args": [0, 1], "addr": 0 }, ... ],
//!   "data": [ 72, 101, ... ]
//! }
//! ```

use crate::isa::Program;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// A translated program together with its initial data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramImage {
    pub code: Program,
    #[serde(default)]
    pub data: Vec<i64>,
}

impl ProgramImage {
    pub fn new(code: Program, data: Vec<i64>) -> Self {
        Self { code, data }
    }
}

/// Load a program image from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<ProgramImage, ImageError> {
    let file = File::open(path.as_ref())?;
    let image = serde_json::from_reader(BufReader::new(file))?;
    Ok(image)
}

/// Save a program image to disk.
pub fn save_image<P: AsRef<Path>>(path: P, image: &ProgramImage) -> Result<(), ImageError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(&mut writer, image)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Errors that can occur while reading or writing an image.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed image: {0}")]
    Format(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::Opcode;

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prog.json");
        let image = ProgramImage::new(
            Program::from_ops([(Opcode::Out, vec![0]), (Opcode::Hlt, vec![])]),
            vec![42],
        );

        save_image(&path, &image).unwrap();
        assert_eq!(load_image(&path).unwrap(), image);
    }

    #[test]
    fn test_missing_data_defaults_to_empty() {
        let image: ProgramImage =
            serde_json::from_str(r#"{ "code": [ { "opcode": "hlt", "args": [] } ] }"#).unwrap();
        assert_eq!(image.code.len(), 1);
        assert!(image.data.is_empty());
    }

    #[test]
    fn test_unknown_opcode_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "code": [ { "opcode": "nop", "args": [] } ], "data": [] }"#)
            .unwrap();

        assert!(matches!(load_image(&path), Err(ImageError::Format(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_image("/nonexistent/prog.json"),
            Err(ImageError::Io(_))
        ));
    }
}
