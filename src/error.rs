use thiserror::Error;

/// All failure modes the codec and its ambient services can produce.
#[derive(Error, Debug)]
pub enum StegoError {
	#[error("invalid image: {0}")]
	InvalidImage(String),

	#[error("carrier image has insufficient capacity: need {needed} bytes, have {available}")]
	CapacityInsufficient { needed: usize, available: usize },

	#[error("corrupt stego header: {0}")]
	CorruptHeader(String),

	#[error("CRC32 mismatch on extracted payload")]
	CrcMismatch,

	#[error("a password is required to extract this payload")]
	PasswordRequired,

	#[error("decryption failed: wrong password or corrupted ciphertext")]
	CryptoAuth,

	#[error("Reed-Solomon decode failed: {0}")]
	EccDecode(String),

	#[error("malformed ECC frame header")]
	EccHeader,

	#[error("unsupported ECC parameters: k={k} nsym={nsym}")]
	EccUnsupportedParams { k: usize, nsym: usize },

	#[error("ECC length field inconsistent with decoded payload")]
	EccLength,

	#[error("no carrier image in the directory has enough capacity")]
	NoSuitableCarrier,

	#[error("task not found: {0}")]
	TaskNotFound(String),

	#[error("operation cancelled")]
	Cancelled,

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("image codec error: {0}")]
	Image(#[from] image::ImageError),

	#[error("metadata (de)serialization error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("archive error: {0}")]
	Archive(String),

	#[error("sqlite error: {0}")]
	Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StegoError>;
