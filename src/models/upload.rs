use serde::{Deserialize, Serialize};

/// An incoming file to upload. `size` is the declared size the admission
/// check runs against, kept separate from `data` to mirror how upload forms
/// report it.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub size: u64,
    pub data: Vec<u8>,
}

impl UploadFile {
    pub fn new<S: Into<String>>(name: S, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: data.len() as u64,
            data,
        }
    }
}

/// Transfer progress for an in-flight upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadProgress {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
}

impl UploadProgress {
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        self.bytes_transferred as f64 / self.total_bytes as f64 * 100.0
    }
}

/// Events observed on an upload handle. `Completed` and `Failed` are
/// terminal; at most one of them is ever delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    Progress(UploadProgress),
    Completed { download_url: String },
    Failed { error: String },
}

impl UploadEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_ratio_of_transferred_bytes() {
        let progress = UploadProgress {
            bytes_transferred: 512,
            total_bytes: 2048,
        };
        assert_eq!(progress.percent(), 25.0);
    }

    #[test]
    fn empty_upload_counts_as_complete() {
        let progress = UploadProgress {
            bytes_transferred: 0,
            total_bytes: 0,
        };
        assert_eq!(progress.percent(), 100.0);
    }

    #[test]
    fn new_derives_size_from_data() {
        let file = UploadFile::new("profile.png", vec![0u8; 42]);
        assert_eq!(file.size, 42);
    }
}
