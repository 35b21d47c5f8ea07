use log::info;
use thiserror::Error;

use crate::api::{ApiError, Ledger, TransferRequest};

/// Errors that can occur while preparing or submitting a transfer
#[derive(Debug, Error)]
pub enum TransferError {
    /// Recipient or amount is missing; rejected before any network call
    #[error("Please fill in all fields")]
    MissingFields,

    /// The amount is not a positive number; rejected before any network call
    #[error("Amount must be a positive number")]
    InvalidAmount,

    /// The ledger refused or could not be reached
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// The transfer inputs as typed by the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferForm {
    /// Recipient address field, possibly filled from a QR scan
    pub recipient: String,

    /// Amount field, kept as typed until validation
    pub amount: String,
}

impl TransferForm {
    /// Validates the form and builds the request the ledger expects
    ///
    /// Fails fast locally when either field is missing or the amount is not
    /// a positive number; the amount is submitted as a number, never as the
    /// raw string.
    ///
    /// # Arguments
    ///
    /// * `own_address` - The sending session's ledger address
    ///
    /// # Returns
    ///
    /// A ready-to-submit TransferRequest
    pub fn validate(&self, own_address: &str) -> Result<TransferRequest, TransferError> {
        let recipient = self.recipient.trim();
        let amount = self.amount.trim();

        if recipient.is_empty() || amount.is_empty() {
            return Err(TransferError::MissingFields);
        }

        let amount: f64 = amount.parse().map_err(|_| TransferError::InvalidAmount)?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(TransferError::InvalidAmount);
        }

        Ok(TransferRequest {
            from_address: own_address.to_string(),
            to_address: recipient.to_string(),
            amount,
        })
    }

    /// Empties both fields
    pub fn clear(&mut self) {
        self.recipient.clear();
        self.amount.clear();
    }
}

/// The transfer surface: form state, submission, and the ledger's answer
///
/// Submission never mutates the balance locally; the next poll observes the
/// ledger's truth instead, so the displayed balance can never double-count.
#[derive(Debug, Default)]
pub struct TransferPanel {
    form: TransferForm,
    open: bool,
    error: Option<String>,
}

impl TransferPanel {
    /// Creates a closed panel with an empty form
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the transfer surface
    pub fn open(&mut self) {
        self.open = true;
    }

    /// Closes the surface, discarding the form and any error
    pub fn close(&mut self) {
        self.open = false;
        self.error = None;
        self.form.clear();
    }

    /// Checks if the surface is showing
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The form as currently typed
    pub fn form(&self) -> &TransferForm {
        &self.form
    }

    /// Mutable access for the input fields
    pub fn form_mut(&mut self) -> &mut TransferForm {
        &mut self.form
    }

    /// Fills the recipient field, e.g. from a successful QR scan
    pub fn set_recipient(&mut self, address: impl Into<String>) {
        self.form.recipient = address.into();
    }

    /// The last failure message shown to the user, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Validates the form and submits the transfer
    ///
    /// Validation failures never reach the network. On success the form is
    /// cleared and the surface closes; reconciliation is left to the next
    /// poll. On a ledger rejection the server's message is kept verbatim
    /// and the form stays populated for correction.
    pub async fn submit(
        &mut self,
        ledger: &dyn Ledger,
        own_address: &str,
    ) -> Result<(), TransferError> {
        let request = match self.form.validate(own_address) {
            Ok(request) => request,
            Err(err) => {
                self.error = Some(err.to_string());
                return Err(err);
            }
        };

        match ledger.transfer(&request).await {
            Ok(()) => {
                info!(
                    "transferred {} CXAC to {}",
                    request.amount, request.to_address
                );
                self.form.clear();
                self.error = None;
                self.open = false;
                Ok(())
            }
            Err(err) => {
                self.error = Some(err.to_string());
                Err(TransferError::Api(err))
            }
        }
    }
}
