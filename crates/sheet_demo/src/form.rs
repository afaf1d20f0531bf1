//! The upload form: chosen file, frame size, and the gate that lets the
//! renderer mount.

use sheet_core::dimension::{parse_dimension, FrameDimensions};

use crate::object_url::{ObjectUrlRegistry, PreviewUrl, SelectedFile};

pub const VALIDATION_MESSAGE: &str = "Please provide an image and valid frame dimensions!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Started(PreviewUrl),
    Rejected,
}

#[derive(Debug)]
pub struct UploadForm {
    file: Option<SelectedFile>,
    image_url: Option<PreviewUrl>,
    dimensions: FrameDimensions,
    is_ready: bool,
    alert: Option<String>,
}

impl UploadForm {
    pub fn new(dimensions: FrameDimensions) -> Self {
        Self {
            file: None,
            image_url: None,
            dimensions,
            is_ready: false,
            alert: None,
        }
    }

    /// Store a newly chosen file. The previous preview URL is released and the
    /// renderer is un-gated. An empty selection changes nothing.
    pub fn on_file_selected(&mut self, file: Option<SelectedFile>, urls: &mut ObjectUrlRegistry) {
        let Some(file) = file else {
            return;
        };
        log::info!("Selected '{}' ({} bytes)", file.name, file.bytes.len());
        self.file = Some(file);
        self.is_ready = false;
        if let Some(url) = self.image_url.take() {
            urls.revoke(&url);
        }
    }

    pub fn on_width_changed(&mut self, raw: &str) {
        self.dimensions.width = parse_dimension(raw);
    }

    pub fn on_height_changed(&mut self, raw: &str) {
        self.dimensions.height = parse_dimension(raw);
    }

    /// Allocate a preview URL for the chosen file and open the gate. Without a
    /// file or with a non-positive dimension the request is refused with an
    /// alert and no state changes.
    pub fn on_run_requested(&mut self, urls: &mut ObjectUrlRegistry) -> RunOutcome {
        let file = match &self.file {
            Some(file) if self.dimensions.is_valid() => file,
            _ => {
                log::warn!(
                    "Run refused: file={} width={} height={}",
                    self.file.is_some(),
                    self.dimensions.width,
                    self.dimensions.height
                );
                self.alert = Some(VALIDATION_MESSAGE.to_string());
                return RunOutcome::Rejected;
            }
        };

        if let Some(previous) = self.image_url.take() {
            urls.revoke(&previous);
        }
        let url = urls.create(file);
        self.image_url = Some(url.clone());
        self.is_ready = true;
        RunOutcome::Started(url)
    }

    pub fn can_run(&self) -> bool {
        self.file.is_some() && self.dimensions.is_valid()
    }

    /// Raise a blocking notice unrelated to validation, e.g. an unreadable file.
    pub fn notify(&mut self, message: &str) {
        self.alert = Some(message.to_string());
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn image_url(&self) -> Option<&PreviewUrl> {
        self.image_url.as_ref()
    }

    pub fn dimensions(&self) -> FrameDimensions {
        self.dimensions
    }

    pub fn is_ready(&self) -> bool {
        self.is_ready
    }
}
