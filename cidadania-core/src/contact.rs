//! Listener contact form.

use crate::error::{CoreError, Result};
use crate::model::{ContactSubject, NewContact};
use crate::notify::{Notification, Notifier};
use crate::store::{Collection, ContentStore};
use std::sync::Arc;
use tracing::{info, warn};

pub const CONTACT_SENT: &str = "Mensagem enviada com sucesso!";
pub const CONTACT_FAILED: &str = "Erro ao enviar mensagem. Tente novamente.";

/// Raw form input as typed by the listener
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub subject: String,
    pub message: String,
}

fn required(field: &'static str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::InvalidContactField {
            field,
            reason: "must not be empty".into(),
        });
    }
    Ok(value.to_string())
}

impl ContactForm {
    /// Check the form and build the insert payload.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidContactField`] for a missing or malformed
    /// field, or [`CoreError::UnknownSubject`] for a subject outside the list.
    pub fn validate(&self) -> Result<NewContact> {
        let name = required("name", &self.name)?;
        let email = required("email", &self.email)?;
        if !email.contains('@') {
            return Err(CoreError::InvalidContactField {
                field: "email",
                reason: "must be an e-mail address".into(),
            });
        }
        let subject: ContactSubject = self.subject.parse()?;
        let message = required("message", &self.message)?;

        let phone = self.phone.trim();
        let phone = (!phone.is_empty()).then(|| phone.to_string());

        Ok(NewContact {
            name,
            email,
            phone,
            subject,
            message,
            read: false,
        })
    }
}

/// Sends contact messages to the station's inbox
pub struct ContactDesk {
    store: Arc<dyn ContentStore>,
    notifier: Arc<dyn Notifier>,
}

impl ContactDesk {
    pub fn new(store: Arc<dyn ContentStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Validate and submit `form`.
    ///
    /// # Errors
    ///
    /// Returns the validation or store error; the caller keeps the form so
    /// the listener can correct it. Nothing is retried.
    pub async fn submit(&self, form: &ContactForm) -> Result<()> {
        let contact = form.validate()?;
        let row = serde_json::to_value(&contact)?;

        match self.store.insert(Collection::Contacts, row).await {
            Ok(()) => {
                info!("Contact message submitted ({})", contact.subject);
                self.notifier.notify(Notification::success(CONTACT_SENT));
                Ok(())
            }
            Err(e) => {
                warn!("Error submitting contact message: {}", e);
                self.notifier.notify(Notification::error(CONTACT_FAILED));
                Err(e)
            }
        }
    }
}
