//! Append-only byte sink that starts in memory and moves to a temporary file once it grows
//! past a threshold.
//!
//! The move happens inside [`SpooledFile::write`] and is invisible to the writer: every byte
//! buffered in memory is copied to the new file before the next write lands there.
//! [`SpooledFile::backing`] tells where the content currently lives.
//!
//! Writing to disk blocks the calling thread. Decoders that feed a `SpooledFile` are expected
//! to run off the async executor, see [`FormDecoder::decode_async`](crate::FormDecoder::decode_async).

use std::fs::File;
use std::io;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::BytesMut;
use tempfile::NamedTempFile;
use tracing::{debug, trace};

use crate::FormConfig;

/// Where the content of a [`SpooledFile`] currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backing<'a> {
    Memory(&'a [u8]),
    Disk(&'a Path),
}

#[derive(Debug)]
enum Storage {
    Memory { buf: BytesMut, read_pos: usize },
    /// `reader` is a second handle on the temp file so reads never move the write cursor
    Disk { file: NamedTempFile, reader: Option<File> },
}

#[derive(Debug)]
pub struct SpooledFile {
    storage: Storage,
    size: u64,
    threshold: usize,
    temp_dir: Option<PathBuf>,
}

impl SpooledFile {
    /// Creates an in-memory sink that rolls over to disk once more than `threshold` bytes are written.
    pub fn new(threshold: usize) -> Self {
        Self { storage: Storage::Memory { buf: BytesMut::new(), read_pos: 0 }, size: 0, threshold, temp_dir: None }
    }

    pub fn with_config(config: &FormConfig) -> Self {
        let mut file = Self::new(config.get_spool_threshold());
        file.temp_dir = config.get_temp_dir().map(Path::to_path_buf);
        file
    }

    /// Total number of bytes written so far.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    #[inline]
    pub fn is_in_memory(&self) -> bool {
        matches!(self.storage, Storage::Memory { .. })
    }

    pub fn backing(&self) -> Backing<'_> {
        match &self.storage {
            Storage::Memory { buf, .. } => Backing::Memory(buf),
            Storage::Disk { file, .. } => Backing::Disk(file.path()),
        }
    }

    /// Appends `data`, moving the content to disk if the size now exceeds the threshold.
    pub fn write(&mut self, data: &[u8]) -> io::Result<()> {
        match &mut self.storage {
            Storage::Memory { buf, .. } => buf.extend_from_slice(data),
            Storage::Disk { file, .. } => file.write_all(data)?,
        }
        self.size += data.len() as u64;

        if self.is_in_memory() && self.size > self.threshold as u64 {
            self.rollover()?;
        }
        Ok(())
    }

    /// Moves the buffered content into a new temporary file. Does nothing if already on disk.
    pub fn rollover(&mut self) -> io::Result<()> {
        let (buf, read_pos) = match &self.storage {
            Storage::Memory { buf, read_pos } => (buf, *read_pos),
            Storage::Disk { .. } => return Ok(()),
        };

        let mut file = match &self.temp_dir {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };
        file.write_all(buf)?;
        file.flush()?;

        let reader = if read_pos > 0 {
            let mut reader = file.reopen()?;
            reader.seek(SeekFrom::Start(read_pos as u64))?;
            Some(reader)
        } else {
            None
        };

        debug!(size = self.size, path = %file.path().display(), "spooled file rolled over to disk");
        self.storage = Storage::Disk { file, reader };
        Ok(())
    }

    /// Moves the read cursor back to the first byte.
    pub fn rewind(&mut self) -> io::Result<()> {
        match &mut self.storage {
            Storage::Memory { read_pos, .. } => *read_pos = 0,
            Storage::Disk { file, reader } => *reader = Some(file.reopen()?),
        }
        Ok(())
    }

    /// Copies everything written so far to `dest`, creating missing parent directories.
    ///
    /// The file system work runs on tokio's blocking pool.
    pub async fn persist<P: AsRef<Path>>(&self, dest: P) -> io::Result<()> {
        let dest = dest.as_ref();
        if let Some(parent) = dest.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        match &self.storage {
            Storage::Memory { buf, .. } => tokio::fs::write(dest, &buf[..]).await?,
            Storage::Disk { file, .. } => {
                tokio::fs::copy(file.path(), dest).await?;
            }
        }

        trace!(size = self.size, dest = %dest.display(), "persisted spooled file");
        Ok(())
    }

    /// Detaches the content from automatic cleanup and returns the path it was kept at.
    ///
    /// In-memory content is rolled over to a temporary file first.
    pub fn keep(mut self) -> io::Result<PathBuf> {
        self.rollover()?;
        match self.storage {
            Storage::Disk { file, .. } => file.keep().map(|(_, path)| path).map_err(|e| e.error),
            Storage::Memory { .. } => Err(io::Error::other("spooled file was not rolled over to disk")),
        }
    }
}

impl Read for SpooledFile {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        match &mut self.storage {
            Storage::Memory { buf, read_pos } => {
                let remaining = &buf[(*read_pos).min(buf.len())..];
                let len = remaining.len().min(out.len());
                out[..len].copy_from_slice(&remaining[..len]);
                *read_pos += len;
                Ok(len)
            }
            Storage::Disk { file, reader } => {
                if reader.is_none() {
                    *reader = Some(file.reopen()?);
                }
                match reader {
                    Some(reader) => reader.read(out),
                    None => Ok(0),
                }
            }
        }
    }
}
