/// Engine services: job queue, session store, event fan-out, SMTP delivery
pub mod broadcast;
pub mod mailer;
pub mod queue;
pub mod store;
