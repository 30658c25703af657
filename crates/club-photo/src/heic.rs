use crate::error::PhotoError;
use std::io::Write;
use std::process::Command;

/// The `image` crate has no native HEIC decoder, so conversion is modeled
/// behind a trait with a shell-out adapter; a decoder that's always
/// unavailable exercises the documented fallback-to-original path (see
/// DESIGN.md Open Question 4).
pub trait HeicDecoder: Send + Sync {
    fn decode_to_jpeg(&self, heic_bytes: &[u8]) -> Result<Vec<u8>, PhotoError>;
}

/// Shells out to `heif-convert` (from `libheif-examples`) if present on
/// `PATH`. Quality 90, RGB output, matching spec §4.8 step 4a.
pub struct ShellHeifDecoder {
    pub binary: String,
}

impl Default for ShellHeifDecoder {
    fn default() -> Self {
        ShellHeifDecoder {
            binary: "heif-convert".to_string(),
        }
    }
}

impl HeicDecoder for ShellHeifDecoder {
    fn decode_to_jpeg(&self, heic_bytes: &[u8]) -> Result<Vec<u8>, PhotoError> {
        let in_file = tempfile::Builder::new()
            .suffix(".heic")
            .tempfile()
            .map_err(|_| PhotoError::ConversionFailed)?;
        let out_path = in_file.path().with_extension("jpg");

        {
            let mut f = in_file.reopen().map_err(|_| PhotoError::ConversionFailed)?;
            f.write_all(heic_bytes).map_err(|_| PhotoError::ConversionFailed)?;
        }

        let status = Command::new(&self.binary)
            .arg("-q")
            .arg("90")
            .arg(in_file.path())
            .arg(&out_path)
            .status()
            .map_err(|_| PhotoError::ConversionFailed)?;

        if !status.success() {
            return Err(PhotoError::ConversionFailed);
        }

        let bytes = std::fs::read(&out_path).map_err(|_| PhotoError::ConversionFailed)?;
        let _ = std::fs::remove_file(&out_path);
        Ok(bytes)
    }
}

/// Always fails; used when no HEIC toolchain is installed. The caller
/// catches the error and falls back to the unmodified original per spec.
pub struct UnavailableHeicDecoder;

impl HeicDecoder for UnavailableHeicDecoder {
    fn decode_to_jpeg(&self, _heic_bytes: &[u8]) -> Result<Vec<u8>, PhotoError> {
        Err(PhotoError::ConversionFailed)
    }
}
