use crate::model::Id;
use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use thiserror::Error;
use time::UtcDateTime;

pub const FILE_ID_LEN: usize = 12;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct FileMarker;

pub type FileId = Id<FileMarker>;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct StoredFile {
    pub id: FileId,
    pub filename: String,
    pub extension: String,
    pub created_at: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The file name {0:?} has no usable extension")]
pub struct InvalidFileNameError(pub String);

impl FileId {
    /// Random, url- and filesystem-safe id for a new upload.
    #[must_use]
    pub fn generate() -> Self {
        let bytes: [u8; FILE_ID_LEN] = rand::random();
        Self::new(BASE64_URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Ids are only ever produced by [`FileId::generate`]; anything else can't name a stored file.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        BASE64_URL_SAFE_NO_PAD
            .decode(self.get())
            .is_ok_and(|bytes| bytes.len() == FILE_ID_LEN)
    }
}

impl StoredFile {
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        content_type_for(&self.extension)
    }
}

/// Lower-cased extension after the last `.` of a file name.
pub fn extension_of(filename: &str) -> Result<String, InvalidFileNameError> {
    filename
        .rsplit_once('.')
        .map(|(_, extension)| extension)
        .filter(|extension| {
            !extension.is_empty() && extension.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| InvalidFileNameError(filename.to_owned()))
}

#[must_use]
pub fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use crate::model::file::{FileId, content_type_for, extension_of};

    #[test]
    fn generated_ids_are_unique_and_well_formed() {
        let first = FileId::generate();
        let second = FileId::generate();

        assert_ne!(first, second);
        assert_eq!(first.get().len(), 16);
        assert!(first.is_well_formed());
        assert!(!FileId::new("../main.db").is_well_formed());
    }

    #[test]
    fn extensions() {
        assert_eq!(extension_of("cat.PNG").unwrap(), "png");
        assert_eq!(extension_of("archive.tar.gz").unwrap(), "gz");
        assert!(extension_of("README").is_err());
        assert!(extension_of("trailing.").is_err());
        assert!(extension_of("weird.p/ng").is_err());
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for("jpeg"), "image/jpeg");
        assert_eq!(content_type_for("exe"), "application/octet-stream");
    }
}
