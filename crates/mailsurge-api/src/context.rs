/// API Context - shared state for all API handlers
use crate::config::ServerConfig;
use mailsurge_core::{EventBroadcaster, JobQueue, MailerRegistry, SessionStore};
use std::sync::Arc;

/// Shared engine components, dependency-injected at process start
pub struct ApiContext {
    pub queue: Arc<JobQueue>,
    pub store: Arc<SessionStore>,
    pub events: Arc<EventBroadcaster>,
    pub mailers: Arc<MailerRegistry>,
    pub config: ServerConfig,
}

impl ApiContext {
    pub fn new(
        queue: Arc<JobQueue>,
        store: Arc<SessionStore>,
        events: Arc<EventBroadcaster>,
        mailers: Arc<MailerRegistry>,
        config: ServerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue,
            store,
            events,
            mailers,
            config,
        })
    }
}
