use std::io;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::spool::{Backing, SpooledFile};

/// A file part of a `multipart/form-data` body.
///
/// The content is held by a [`SpooledFile`]: small uploads stay in memory, larger ones live
/// in a temporary file that is removed when the `UploadedFile` is dropped, unless it was
/// [kept](UploadedFile::keep). Use [`persist`](UploadedFile::persist) to copy the content to
/// its final location.
#[derive(Debug)]
pub struct UploadedFile {
    name: String,
    filename: String,
    content_type: String,
    file: SpooledFile,
}

impl UploadedFile {
    pub fn new<N, F, C>(name: N, filename: F, content_type: C, file: SpooledFile) -> Self
    where
        N: Into<String>,
        F: Into<String>,
        C: Into<String>,
    {
        Self { name: name.into(), filename: filename.into(), content_type: content_type.into(), file }
    }

    /// The form field name the file was uploaded under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The file name sent by the client, exactly as declared.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.file.size()
    }

    pub fn backing(&self) -> Backing<'_> {
        self.file.backing()
    }

    pub fn file(&self) -> &SpooledFile {
        &self.file
    }

    pub fn file_mut(&mut self) -> &mut SpooledFile {
        &mut self.file
    }

    pub fn into_file(self) -> SpooledFile {
        self.file
    }

    /// Copies the content to `dest`, creating missing parent directories.
    pub async fn persist<P: AsRef<Path>>(&self, dest: P) -> io::Result<()> {
        self.file.persist(dest).await
    }

    /// Persists the file into `dir` under the last path component of the client file name.
    ///
    /// Returns the path written to. Fails with [`io::ErrorKind::InvalidInput`] when the client
    /// file name has no usable component, e.g. `""` or `".."`.
    pub async fn save_to_dir<P: AsRef<Path>>(&self, dir: P) -> io::Result<PathBuf> {
        let file_name = self.safe_file_name().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("uploaded file name {:?} can't be used as a path", self.filename))
        })?;

        let dest = dir.as_ref().join(file_name);
        self.persist(&dest).await?;
        Ok(dest)
    }

    /// Detaches the content from automatic cleanup, see [`SpooledFile::keep`].
    pub fn keep(self) -> io::Result<PathBuf> {
        self.file.keep()
    }

    // browsers on windows may send the full client path
    fn safe_file_name(&self) -> Option<&str> {
        self.filename.rsplit(['/', '\\']).next().map(str::trim).filter(|name| !name.is_empty() && *name != "." && *name != "..")
    }
}

impl Read for UploadedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uploaded(filename: &str, content: &[u8]) -> UploadedFile {
        let mut file = SpooledFile::new(1024);
        file.write(content).unwrap();
        UploadedFile::new("upload", filename, "text/plain", file)
    }

    #[test]
    fn test_accessors() {
        let mut file = uploaded("a.txt", b"hi");
        assert_eq!(file.name(), "upload");
        assert_eq!(file.filename(), "a.txt");
        assert_eq!(file.content_type(), "text/plain");
        assert_eq!(file.size(), 2);
        assert!(matches!(file.backing(), Backing::Memory(b"hi")));

        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        assert_eq!(content, "hi");
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(uploaded("a.txt", b"").safe_file_name(), Some("a.txt"));
        assert_eq!(uploaded("../../etc/passwd", b"").safe_file_name(), Some("passwd"));
        assert_eq!(uploaded(r"C:\Users\me\report.pdf", b"").safe_file_name(), Some("report.pdf"));
        assert_eq!(uploaded("..", b"").safe_file_name(), None);
        assert_eq!(uploaded("", b"").safe_file_name(), None);
        assert_eq!(uploaded("dir/", b"").safe_file_name(), None);
    }

    #[tokio::test]
    async fn test_save_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = uploaded("../escape.txt", b"hi");

        let dest = file.save_to_dir(dir.path().join("uploads")).await.unwrap();
        assert_eq!(dest, dir.path().join("uploads").join("escape.txt"));
        assert_eq!(std::fs::read(dest).unwrap(), b"hi");
    }

    #[tokio::test]
    async fn test_save_to_dir_rejects_unusable_name() {
        let dir = tempfile::tempdir().unwrap();
        let err = uploaded("..", b"hi").save_to_dir(dir.path()).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
