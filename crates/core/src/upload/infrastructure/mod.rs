pub mod http_image_sink;
pub mod logging_image_sink;
pub mod png_frame_encoder;
pub mod threaded_upload_executor;
