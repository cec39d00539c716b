pub mod clock_sink;
pub mod end_detector;
pub mod position;
pub mod queue;
pub mod sink;
