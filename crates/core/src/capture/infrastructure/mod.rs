pub mod ffmpeg_webcam;
