pub mod frame_clock;
pub mod infrastructure;
pub mod live_detection_loop;
pub mod live_session;
pub mod loop_logger;
