mod baseline;
mod job;
mod jpeg;
mod pixels;
mod scale;
mod worker;

pub use baseline::JpegError;
pub use job::{JobHandle, JobState};
pub use jpeg::{DecodeError, decode_file};
pub use pixels::{DecodedImage, PixelFormat};
pub use scale::{scale_factor, scaled_dimensions};
pub use worker::{DecodeCompletion, DecodeConfig, DecodeWorker, SubmitError};

#[cfg(test)]
pub(crate) use jpeg::write_test_jpeg;
