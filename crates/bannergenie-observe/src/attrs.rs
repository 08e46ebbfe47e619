//! Span attribute names shared by the front-ends.
//!
//! Declare a field under one of these names with `tracing::field::Empty`
//! and fill it later through `Span::record`.

/// Bannerbear template uid.
pub const TEMPLATE_UID: &str = "bannergenie.template.uid";

/// Number of staged modifications sent with a render.
pub const MODIFICATION_COUNT: &str = "bannergenie.render.modification_count";

/// Local render job id (UUID v7).
pub const JOB_ID: &str = "bannergenie.render.job_id";

/// Terminal state of a render job.
pub const JOB_STATE: &str = "bannergenie.render.state";

/// Status queries spent on a job.
pub const POLL_ATTEMPTS: &str = "bannergenie.render.poll_attempts";

/// Chat command kind (e.g. "select", "generate", "free_text").
pub const CHAT_COMMAND: &str = "bannergenie.chat.command";
