use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::capture::domain::video_source::{CaptureError, MediaCapture, VideoSource};
use crate::shared::frame::Frame;

/// Opens camera devices through libavdevice (v4l2, avfoundation, dshow).
pub struct FfmpegMediaCapture {
    device: String,
    input_format: String,
    framerate: u32,
}

impl FfmpegMediaCapture {
    pub fn new(device: impl Into<String>, input_format: impl Into<String>, framerate: u32) -> Self {
        Self {
            device: device.into(),
            input_format: input_format.into(),
            framerate,
        }
    }

    fn find_input_format(&self) -> Option<ffmpeg_next::format::format::Input> {
        ffmpeg_next::device::input::video().find(|f| f.name() == self.input_format)
    }

    fn open_error(&self, reason: impl ToString) -> CaptureError {
        CaptureError::Open {
            device: self.device.clone(),
            reason: reason.to_string(),
        }
    }
}

impl MediaCapture for FfmpegMediaCapture {
    fn is_supported(&self) -> bool {
        if self.input_format.is_empty() || ffmpeg_next::init().is_err() {
            return false;
        }
        self.find_input_format().is_some()
    }

    fn open_video_stream(&mut self) -> Result<Box<dyn VideoSource>, CaptureError> {
        ffmpeg_next::init().map_err(|e| CaptureError::Unsupported(e.to_string()))?;

        let format = self.find_input_format().ok_or_else(|| {
            CaptureError::Unsupported(format!("input device '{}' unavailable", self.input_format))
        })?;

        let mut options = ffmpeg_next::Dictionary::new();
        options.set("framerate", &self.framerate.to_string());

        let ctx = ffmpeg_next::format::open_with(
            &self.device,
            &ffmpeg_next::format::format::Format::Input(format),
            options,
        )
        .map_err(|e| self.open_error(e))?;

        let ictx = match ctx {
            ffmpeg_next::format::context::Context::Input(ictx) => ictx,
            ffmpeg_next::format::context::Context::Output(_) => {
                return Err(self.open_error("device opened as output"))
            }
        };

        let source = FfmpegWebcamSource::spawn(ictx, self.framerate).map_err(|e| self.open_error(e))?;
        log::info!(
            "Opened {} via {} at {}x{}",
            self.device,
            self.input_format,
            source.native_size.0,
            source.native_size.1
        );
        Ok(Box::new(source))
    }
}

/// Live camera stream decoded on a background thread.
///
/// Only the newest frame is retained; older frames are overwritten
/// whether or not anyone looked at them.
pub struct FfmpegWebcamSource {
    latest: Arc<Mutex<Option<Frame>>>,
    first_frame_rx: Receiver<()>,
    stopped: Arc<AtomicBool>,
    ended: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    native_size: (u32, u32),
}

struct DecodeState {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    time_base: f64,
    framerate: u32,
}

// Safety: the decode state is moved into the decode thread once and
// never touched from any other thread afterwards.
unsafe impl Send for DecodeState {}

impl FfmpegWebcamSource {
    fn spawn(
        ictx: ffmpeg_next::format::context::Input,
        framerate: u32,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let stream_index = stream.index();
        let time_base = f64::from(stream.time_base());
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        let state = DecodeState {
            ictx,
            decoder,
            scaler,
            stream_index,
            time_base,
            framerate,
        };

        let latest = Arc::new(Mutex::new(None));
        let stopped = Arc::new(AtomicBool::new(false));
        let ended = Arc::new(AtomicBool::new(false));
        let (first_tx, first_frame_rx) = crossbeam_channel::bounded(1);

        let handle = {
            let latest = latest.clone();
            let stopped = stopped.clone();
            let ended = ended.clone();
            std::thread::Builder::new()
                .name("webcam-decode".into())
                .spawn(move || {
                    decode_loop(state, &latest, &stopped, first_tx);
                    ended.store(true, Ordering::Relaxed);
                })?
        };

        Ok(Self {
            latest,
            first_frame_rx,
            stopped,
            ended,
            handle: Some(handle),
            native_size: (width, height),
        })
    }
}

impl VideoSource for FfmpegWebcamSource {
    fn wait_first_frame(&mut self, timeout: Duration) -> Result<(), CaptureError> {
        match self.first_frame_rx.recv_timeout(timeout) {
            Ok(()) => Ok(()),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                Err(CaptureError::FirstFrameTimeout(timeout))
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Err(CaptureError::Ended),
        }
    }

    fn current_frame(&self) -> Result<Frame, CaptureError> {
        let frame = self.latest.lock().ok().and_then(|slot| slot.clone());
        match frame {
            Some(frame) => Ok(frame),
            None if self.ended.load(Ordering::Relaxed) => Err(CaptureError::Ended),
            None => Err(CaptureError::NoFrame),
        }
    }

    fn native_size(&self) -> (u32, u32) {
        self.native_size
    }

    fn close(&mut self) {
        self.stopped.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Webcam decode thread panicked");
            }
        }
    }
}

impl Drop for FfmpegWebcamSource {
    fn drop(&mut self) {
        self.close();
    }
}

fn decode_loop(
    state: DecodeState,
    latest: &Mutex<Option<Frame>>,
    stopped: &AtomicBool,
    first_tx: Sender<()>,
) {
    let DecodeState {
        mut ictx,
        mut decoder,
        mut scaler,
        stream_index,
        time_base,
        framerate,
    } = state;

    let mut first_tx = Some(first_tx);
    let mut first_pts: Option<i64> = None;
    let mut decoded_count: u64 = 0;

    for (stream, packet) in ictx.packets() {
        if stopped.load(Ordering::Relaxed) {
            break;
        }
        if stream.index() != stream_index || decoder.send_packet(&packet).is_err() {
            continue;
        }

        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        while decoder.receive_frame(&mut decoded).is_ok() {
            let timestamp = match decoded.pts() {
                Some(pts) => {
                    let origin = *first_pts.get_or_insert(pts);
                    (pts - origin) as f64 * time_base
                }
                None => decoded_count as f64 / framerate.max(1) as f64,
            };
            decoded_count += 1;

            let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
            if let Err(e) = scaler.run(&decoded, &mut rgb) {
                log::warn!("Dropping frame that failed RGB conversion: {e}");
                continue;
            }
            let frame = Frame::new(
                extract_rgb_pixels(&rgb, rgb.width(), rgb.height()),
                rgb.width(),
                rgb.height(),
                3,
                timestamp,
            );

            if let Ok(mut slot) = latest.lock() {
                *slot = Some(frame);
            }
            if let Some(tx) = first_tx.take() {
                let _ = tx.send(());
            }
        }
    }

    log::info!("Webcam stream stopped after {decoded_count} frames");
}

fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_len = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + row_len]);
    }
    pixels
}
