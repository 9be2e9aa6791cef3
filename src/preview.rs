use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreviewError {
    #[error("audio preview is not available in this build")]
    Unsupported,
    #[error("no audio output device available")]
    Device,
    #[error("failed to open audio file")]
    Read,
    #[error("failed to decode audio file")]
    Decode,
}

pub type PreviewResult<T> = error_stack::Result<T, PreviewError>;

/// Plays a song while the user decides where it goes.
pub trait AudioPreview {
    /// Starts playback and returns immediately.
    fn play(&mut self, audio_path: &Path) -> PreviewResult<()>;
    fn stop(&mut self);
}

/// Opens the default output device.
#[cfg(feature = "audio")]
pub fn system_preview() -> PreviewResult<Box<dyn AudioPreview>> {
    Ok(Box::new(rodio_preview::RodioPreview::new()?))
}

#[cfg(not(feature = "audio"))]
pub fn system_preview() -> PreviewResult<Box<dyn AudioPreview>> {
    Err(error_stack::Report::new(PreviewError::Unsupported)
        .attach_printable("rebuild with `--features audio` to play songs while sorting"))
}

#[cfg(feature = "audio")]
mod rodio_preview {
    use std::fs::File;
    use std::io::BufReader;
    use std::path::Path;

    use error_stack::{IntoReport, Report, ResultExt};
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

    use super::{AudioPreview, PreviewError, PreviewResult};

    pub struct RodioPreview {
        // Dropping the stream silences every sink created from its handle.
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sink: Option<Sink>,
    }

    impl RodioPreview {
        pub fn new() -> PreviewResult<Self> {
            let (stream, handle) = OutputStream::try_default().map_err(|err| {
                Report::new(PreviewError::Device).attach_printable(err.to_string())
            })?;
            Ok(Self {
                _stream: stream,
                handle,
                sink: None,
            })
        }
    }

    impl AudioPreview for RodioPreview {
        fn play(&mut self, audio_path: &Path) -> PreviewResult<()> {
            self.stop();
            let file = File::open(audio_path)
                .into_report()
                .change_context(PreviewError::Read)
                .attach_printable(format!("Audio file {}", audio_path.display()))?;
            let source = Decoder::new(BufReader::new(file)).map_err(|err| {
                Report::new(PreviewError::Decode).attach_printable(format!(
                    "Audio file {}: {}",
                    audio_path.display(),
                    err
                ))
            })?;
            let sink = Sink::try_new(&self.handle).map_err(|err| {
                Report::new(PreviewError::Device).attach_printable(err.to_string())
            })?;
            sink.append(source);
            self.sink = Some(sink);
            Ok(())
        }

        fn stop(&mut self) {
            if let Some(sink) = self.sink.take() {
                sink.stop();
            }
        }
    }

    impl Drop for RodioPreview {
        fn drop(&mut self) {
            self.stop();
        }
    }
}

#[cfg(all(test, not(feature = "audio")))]
mod tests {
    use super::*;

    #[test]
    fn test_preview_unsupported_without_audio_feature() {
        let report = system_preview().err().unwrap();
        assert_eq!(report.current_context(), &PreviewError::Unsupported);
    }
}
