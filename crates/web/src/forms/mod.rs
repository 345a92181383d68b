//! Form-state controllers.
//!
//! Every form follows the same lifecycle, implemented once by [`FormCell`]:
//!
//! 1. Submitting clears the previous status and validates: required fields
//!    first, then formats. The first failure becomes `Failed` and nothing
//!    is written.
//! 2. A valid form goes to `Submitting` and issues exactly one write.
//! 3. Success resets the form's fields, shows `Succeeded` and clears it
//!    back to `Idle` after [`SUCCESS_DISPLAY`]. Failure shows a generic
//!    message; the raw error only goes to the logs.
//! 4. While `Submitting`, edits and submits are refused with [`Busy`].
//!    Any other edit dismisses a shown failure.

pub mod delete;
pub mod link;
pub mod login;
pub mod social;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use linkbio_core::SuccessMessage;

pub use delete::{Confirmation, DeleteLink};
pub use link::{LinkFields, LinkForm};
pub use login::{LoginFields, LoginForm};
pub use social::{SocialFields, SocialForm};

/// How long a success message stays up.
pub const SUCCESS_DISPLAY: Duration = Duration::from_secs(3);

/// Submission status of a form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FormStatus {
    #[default]
    Idle,
    Submitting,
    Succeeded(SuccessMessage),
    Failed(String),
}

impl FormStatus {
    /// Text to show the user, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Idle | Self::Submitting => None,
            Self::Succeeded(message) => Some(message.as_str()),
            Self::Failed(message) => Some(message),
        }
    }

    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting)
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Field values plus status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState<F> {
    pub fields: F,
    pub status: FormStatus,
}

/// How a submit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The write succeeded.
    Done,
    /// Validation failed; nothing was written.
    Invalid,
    /// The write failed.
    Failed,
    /// A submission was already in flight.
    Busy,
    /// The user declined to go ahead; nothing was written.
    Cancelled,
}

/// A form is submitting and cannot be changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("form is submitting")]
pub struct Busy;

/// Observable form state with the shared submit lifecycle.
pub struct FormCell<F> {
    state: Arc<watch::Sender<FormState<F>>>,
    /// Bumped on every submit; a pending auto-clear only fires if it still
    /// matches.
    generation: Arc<AtomicU64>,
}

impl<F> FormCell<F>
where
    F: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(fields: F) -> Self {
        let (state, _) = watch::channel(FormState {
            fields,
            status: FormStatus::Idle,
        });
        Self {
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> FormState<F> {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn fields(&self) -> F {
        self.state.borrow().fields.clone()
    }

    #[must_use]
    pub fn status(&self) -> FormStatus {
        self.state.borrow().status.clone()
    }

    /// Observe every state change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<FormState<F>> {
        self.state.subscribe()
    }

    /// Change field values. A shown failure is dismissed.
    ///
    /// # Errors
    ///
    /// Returns [`Busy`] while a submission is in flight.
    pub fn edit(&self, change: impl FnOnce(&mut F)) -> Result<(), Busy> {
        let mut result = Ok(());
        self.state.send_if_modified(|state| {
            if state.status.is_submitting() {
                result = Err(Busy);
                false
            } else {
                change(&mut state.fields);
                if state.status.is_error() {
                    state.status = FormStatus::Idle;
                }
                true
            }
        });
        result
    }

    /// Start a submission: clear the previous status and return the
    /// fields to validate.
    ///
    /// # Errors
    ///
    /// Returns [`Busy`] while another submission is in flight.
    pub fn begin(&self) -> Result<F, Busy> {
        let mut result = Err(Busy);
        self.state.send_if_modified(|state| {
            if state.status.is_submitting() {
                return false;
            }
            self.generation.fetch_add(1, Ordering::SeqCst);
            result = Ok(state.fields.clone());
            state.status = FormStatus::Idle;
            true
        });
        result
    }

    /// Show a failure.
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        self.state.send_modify(|state| state.status = FormStatus::Failed(message));
    }

    /// Mark the write as in flight.
    pub fn start_write(&self) {
        self.state
            .send_modify(|state| state.status = FormStatus::Submitting);
    }

    /// Show a success, reset fields and schedule the auto-clear.
    pub fn succeed(&self, message: SuccessMessage, reset: impl FnOnce(&mut F)) {
        self.state.send_modify(|state| {
            reset(&mut state.fields);
            state.status = FormStatus::Succeeded(message);
        });

        let generation = self.generation.load(Ordering::SeqCst);
        let counter = Arc::clone(&self.generation);
        let weak = Arc::downgrade(&self.state);
        tokio::spawn(async move {
            tokio::time::sleep(SUCCESS_DISPLAY).await;
            if counter.load(Ordering::SeqCst) != generation {
                return;
            }
            if let Some(state) = weak.upgrade() {
                state.send_if_modified(|state| {
                    if state.status.is_success() {
                        state.status = FormStatus::Idle;
                        true
                    } else {
                        false
                    }
                });
            }
        });
    }
}
