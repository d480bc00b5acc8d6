//! In-memory gzip and zip encoders backing the `compress_file` tool.

use std::{
    fmt,
    io::{Cursor, Write},
    str::FromStr,
};

use flate2::{Compression, GzBuilder};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    Gzip,
    Zip,
}

impl CompressionFormat {
    pub const ALL: [CompressionFormat; 2] = [Self::Gzip, Self::Zip];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Zip => "zip",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Zip => "zip",
        }
    }
}

impl fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressionFormat {
    type Err = CompressError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gzip" => Ok(Self::Gzip),
            "zip" => Ok(Self::Zip),
            _ => Err(CompressError::UnsupportedFormat(value.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum CompressError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("filename must not contain NUL bytes")]
    InvalidFilename,
    #[error("gzip encoding failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip encoding failed: {0}")]
    Zip(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedFile {
    pub format: CompressionFormat,
    pub output_filename: String,
    pub original_size: usize,
    pub data: Vec<u8>,
}

impl CompressedFile {
    pub fn compressed_size(&self) -> usize {
        self.data.len()
    }

    /// Space saved as a percentage of the input; negative when the output grew.
    pub fn ratio_percent(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        (1.0 - self.compressed_size() as f64 / self.original_size as f64) * 100.0
    }
}

pub fn compress(
    format: CompressionFormat,
    filename: &str,
    input: &[u8],
) -> Result<CompressedFile, CompressError> {
    if filename.contains('\0') {
        return Err(CompressError::InvalidFilename);
    }

    let data = match format {
        CompressionFormat::Gzip => gzip(filename, input)?,
        CompressionFormat::Zip => zip(filename, input)?,
    };

    Ok(CompressedFile {
        format,
        output_filename: format!("{filename}.{}", format.extension()),
        original_size: input.len(),
        data,
    })
}

fn gzip(filename: &str, input: &[u8]) -> Result<Vec<u8>, CompressError> {
    let mut encoder = GzBuilder::new()
        .filename(filename.as_bytes())
        .write(Vec::new(), Compression::default());
    encoder.write_all(input)?;
    Ok(encoder.finish()?)
}

fn zip(filename: &str, input: &[u8]) -> Result<Vec<u8>, CompressError> {
    let mut writer = zip_next::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip_next::write::SimpleFileOptions::default()
        .compression_method(zip_next::CompressionMethod::Deflated);

    writer
        .start_file(filename, options)
        .map_err(|err| CompressError::Zip(err.to_string()))?;
    writer
        .write_all(input)
        .map_err(|err| CompressError::Zip(err.to_string()))?;
    let cursor = writer
        .finish()
        .map_err(|err| CompressError::Zip(err.to_string()))?;

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use flate2::read::GzDecoder;

    use super::{compress, CompressError, CompressionFormat};

    fn sample() -> Vec<u8> {
        "Hello, this is a test file content that will be compressed. "
            .repeat(100)
            .into_bytes()
    }

    #[test]
    fn gzip_round_trips_and_records_filename() {
        let input = sample();
        let compressed =
            compress(CompressionFormat::Gzip, "test_file.txt", &input).expect("gzip succeeds");

        assert_eq!(compressed.output_filename, "test_file.txt.gz");
        assert!(compressed.compressed_size() < input.len());

        let mut decoder = GzDecoder::new(&compressed.data[..]);
        let mut restored = Vec::new();
        decoder.read_to_end(&mut restored).expect("gzip decodes");
        assert_eq!(restored, input);
        assert_eq!(
            decoder.header().and_then(|header| header.filename()),
            Some(&b"test_file.txt"[..])
        );
    }

    #[test]
    fn zip_round_trips_single_entry() {
        let input = sample();
        let compressed =
            compress(CompressionFormat::Zip, "test_file.txt", &input).expect("zip succeeds");

        assert_eq!(compressed.output_filename, "test_file.txt.zip");

        let mut archive =
            zip_next::ZipArchive::new(Cursor::new(compressed.data)).expect("zip opens");
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_name("test_file.txt").expect("entry present");
        let mut restored = Vec::new();
        entry.read_to_end(&mut restored).expect("entry decodes");
        assert_eq!(restored, input);
    }

    #[test]
    fn empty_input_has_zero_ratio() {
        let compressed = compress(CompressionFormat::Gzip, "empty.bin", &[]).expect("gzip");
        assert_eq!(compressed.original_size, 0);
        assert_eq!(compressed.ratio_percent(), 0.0);
    }

    #[test]
    fn repetitive_input_has_positive_ratio() {
        let compressed =
            compress(CompressionFormat::Gzip, "a.txt", &sample()).expect("gzip succeeds");
        assert!(compressed.ratio_percent() > 50.0);
    }

    #[test]
    fn parses_formats_case_insensitively() {
        assert_eq!(
            "GZIP".parse::<CompressionFormat>().expect("gzip"),
            CompressionFormat::Gzip
        );
        assert_eq!(
            " zip ".parse::<CompressionFormat>().expect("zip"),
            CompressionFormat::Zip
        );
        let err = "bzip2"
            .parse::<CompressionFormat>()
            .expect_err("bzip2 unsupported");
        assert_eq!(err.to_string(), "Unsupported format: bzip2");
    }

    #[test]
    fn rejects_filename_with_nul() {
        let err = compress(CompressionFormat::Gzip, "bad\0name", b"x").expect_err("nul rejected");
        assert!(matches!(err, CompressError::InvalidFilename));
    }
}
