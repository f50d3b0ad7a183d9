use std::fmt;

use serde::Deserialize;

/// Behaviour bound to a file extension.
///
/// - `TranscodeImage`: flatten a layered image into `<stem>.png`.
/// - `Compile`: run the build tool and supersede the running binary.
/// - `TranscodeDescriptor`: pack a text descriptor into `<stem>.file`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    TranscodeImage,
    Compile,
    TranscodeDescriptor,
}

impl HandlerKind {
    pub fn label(self) -> &'static str {
        match self {
            HandlerKind::TranscodeImage => "transcode_image",
            HandlerKind::Compile => "compile",
            HandlerKind::TranscodeDescriptor => "transcode_descriptor",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
