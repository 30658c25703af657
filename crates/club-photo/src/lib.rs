pub mod dimensions;
pub mod error;
pub mod heic;
pub mod key;
pub mod optimize;
pub mod pool;
pub mod status;
pub mod validate;

pub use error::PhotoError;
pub use heic::{HeicDecoder, ShellHeifDecoder, UnavailableHeicDecoder};
pub use optimize::{process_image, ProcessedPhoto};
pub use pool::{PhotoWorkerGuard, PhotoWorkerPool};
pub use status::{UploadStatus, UploadStatusStore};
pub use validate::{is_heic, validate_upload, MAX_UPLOAD_BYTES};
