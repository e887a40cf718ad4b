use std::sync::Arc;

use async_trait::async_trait;

use super::{ContactNotifier, EmergencyContext, NotifyError, compose_message};
use crate::contacts::ContactStore;
use crate::tracing::prelude::*;

/// Records dispatches in the log without contacting anyone.
///
/// Used when no messaging gateway is configured. It still fails when the
/// user has no contacts, so the user learns that nobody would have been
/// reached.
pub struct LogNotifier {
    contacts: Arc<dyn ContactStore>,
}

impl LogNotifier {
    pub fn new(contacts: Arc<dyn ContactStore>) -> Self {
        Self { contacts }
    }
}

#[async_trait]
impl ContactNotifier for LogNotifier {
    async fn notify_contacts(&self, context: &EmergencyContext) -> Result<usize, NotifyError> {
        let contacts = self.contacts.list(context.user.id).await?;
        if contacts.is_empty() {
            return Err(NotifyError::NoContacts);
        }

        let message = compose_message(context);
        for contact in &contacts {
            warn!(
                contact = %contact.name,
                phone = %contact.phone,
                %message,
                "No messaging gateway configured; emergency message not sent"
            );
        }

        Ok(contacts.len())
    }
}
