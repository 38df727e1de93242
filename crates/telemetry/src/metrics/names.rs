//! Standard metric names following OpenTelemetry semantic conventions
//! See: https://opentelemetry.io/docs/specs/semconv/http/http-metrics/

/// HTTP server request duration in milliseconds
/// Note: Histograms automatically provide count and sum, so a separate counter is not needed
pub const HTTP_SERVER_REQUEST_DURATION: &str = "http.server.request.duration";

/// Requests rejected by the per-client rate limiter
pub const RATE_LIMIT_REJECTED: &str = "reel.rate_limit.rejected";

/// Background tasks that returned an error or panicked
pub const BACKGROUND_TASKS_FAILED: &str = "reel.background.tasks.failed";


/// Time spent handing a message to the mailer, in milliseconds
pub const MAIL_SEND_DURATION: &str = "reel.mail.send.duration";
