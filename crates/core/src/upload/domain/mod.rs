pub mod frame_encoder;
pub mod image_sink;
pub mod upload_executor;
pub mod upload_gate;
