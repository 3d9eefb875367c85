//! Shared state handed to every handler through an `Extension` layer.

use std::sync::Arc;

use crate::admin::AdminService;
use crate::mail::Mailer;
use crate::submission::SubmissionLifecycle;

pub struct AppState {
    admins: AdminService,
    lifecycle: Arc<SubmissionLifecycle>,
    mailer: Arc<dyn Mailer>,
    frontend_base_url: String,
}

impl AppState {
    #[must_use]
    pub fn new(
        admins: AdminService,
        lifecycle: Arc<SubmissionLifecycle>,
        mailer: Arc<dyn Mailer>,
        frontend_base_url: String,
    ) -> Self {
        Self {
            admins,
            lifecycle,
            mailer,
            frontend_base_url,
        }
    }

    #[must_use]
    pub fn admins(&self) -> &AdminService {
        &self.admins
    }

    #[must_use]
    pub fn lifecycle(&self) -> &SubmissionLifecycle {
        &self.lifecycle
    }

    #[must_use]
    pub fn mailer(&self) -> Arc<dyn Mailer> {
        self.mailer.clone()
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }
}
