use async_trait::async_trait;
use log::debug;
use qrcode::render::unicode;
use qrcode::QrCode;
use thiserror::Error;

/// Errors that can occur while encoding an address
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("Failed to encode address: {0}")]
    Encode(#[from] qrcode::types::QrError),
}

/// Errors that can occur during a scan session
#[derive(Debug, Error)]
pub enum ScanError {
    /// The capture device failed or went away; the session ends and the
    /// user may retry manually
    #[error("Camera unavailable: {0}")]
    Camera(String),

    /// The session already delivered its decode or was cancelled
    #[error("Scan session already ended")]
    SessionEnded,
}

/// Renders the account's own address as a scannable code
///
/// The address is public, read-only data; the rendering is purely for
/// display next to the receive surface.
pub fn address_qr(address: &str) -> Result<String, ExchangeError> {
    let code = QrCode::new(address.as_bytes())?;
    Ok(code.render::<unicode::Dense1x2>().build())
}

/// A stream of QR decode attempts, typically backed by a camera pipeline
///
/// `next_decode` resolves with `Some(payload)` when a frame contained a
/// readable code and `None` for frames without one. `release` frees the
/// underlying device and is called exactly once per session.
#[async_trait]
pub trait ScanSource: Send {
    async fn next_decode(&mut self) -> Result<Option<String>, ScanError>;

    fn release(&mut self);
}

/// A single address-scan session
///
/// Active only while its surface is open. The first successful decode ends
/// the session (no further frames are consumed) and the source is
/// released on every exit path: success, device failure, explicit cancel,
/// or drop.
pub struct ScanSession {
    source: Option<Box<dyn ScanSource>>,
}

impl ScanSession {
    /// Opens a session over a capture source
    pub fn open(source: Box<dyn ScanSource>) -> Self {
        ScanSession {
            source: Some(source),
        }
    }

    /// Checks if the session can still deliver a decode
    pub fn is_active(&self) -> bool {
        self.source.is_some()
    }

    /// Waits for the first successful decode and ends the session
    ///
    /// # Returns
    ///
    /// The decoded payload, destined for the transfer recipient field, or
    /// the device failure that ended the session
    pub async fn capture(&mut self) -> Result<String, ScanError> {
        loop {
            let step = match self.source.as_mut() {
                Some(source) => source.next_decode().await,
                None => return Err(ScanError::SessionEnded),
            };

            match step {
                Ok(Some(payload)) => {
                    debug!("scan session decoded a payload, releasing source");
                    self.end();
                    return Ok(payload);
                }
                Ok(None) => continue,
                Err(err) => {
                    self.end();
                    return Err(err);
                }
            }
        }
    }

    /// Ends the session without a decode, e.g. when the surface closes
    pub fn cancel(&mut self) {
        self.end();
    }

    fn end(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.release();
        }
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.end();
    }
}

impl std::fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSession")
            .field("active", &self.is_active())
            .finish()
    }
}
