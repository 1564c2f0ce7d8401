//! Decides whether a turn produced a plot by the size of the serialized canvas.
//!
//! A blank canvas still encodes to a small non-zero PNG, so anything at or
//! under the threshold counts as "nothing was drawn". Small real plots and
//! unusually large blank encodings are misclassified; that is accepted.

use bytes::Bytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Plot,
    Text,
}

/// `threshold` is exclusive: exactly `threshold` bytes is still text.
pub fn classify(image_bytes: &[u8], threshold: usize) -> OutputKind {
    if image_bytes.len() > threshold {
        OutputKind::Plot
    } else {
        OutputKind::Text
    }
}

/// What the assistant turn ends up holding after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum CapturedOutput {
    Plot(Bytes),
    Text(String),
}

/// Keeps the image when it counts as a plot, otherwise the agent's text.
pub fn capture(image_bytes: Vec<u8>, answer: String, threshold: usize) -> CapturedOutput {
    match classify(&image_bytes, threshold) {
        OutputKind::Plot => CapturedOutput::Plot(Bytes::from(image_bytes)),
        OutputKind::Text => CapturedOutput::Text(answer),
    }
}
