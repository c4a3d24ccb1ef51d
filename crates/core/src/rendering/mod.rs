pub mod annotated_frame;
pub mod overlay;
pub mod overlay_surface;
pub mod preview_file_surface;
