//! Progress rate-limiting and speed measurement.

mod speed;
mod throttle;

pub use speed::SpeedWindow;
pub use throttle::ProgressThrottle;
