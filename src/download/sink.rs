//! 章节输出目标：散装图片目录或单个 cbz 压缩包。

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::FileOptions;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("zip error at {path}: {source}")]
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },
}

pub trait OutputSink {
    /// 该文件是否已经写过（用于逐图续传）。
    fn contains(&self, name: &str) -> bool;
    fn write(&mut self, name: &str, data: &[u8]) -> Result<(), SinkError>;
    /// 写完最后一张后调用，确保落盘。
    fn finish(self: Box<Self>) -> Result<(), SinkError>;
    /// 章节失败时调用，丢弃不完整的输出。
    fn discard(self: Box<Self>) -> Result<(), SinkError>;
}

/// 每张图片一个文件。
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn open(dir: &Path) -> Result<Self, SinkError> {
        fs::create_dir_all(dir).map_err(|source| SinkError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }
}

impl OutputSink for DirectorySink {
    fn contains(&self, name: &str) -> bool {
        self.dir.join(name).is_file()
    }

    fn write(&mut self, name: &str, data: &[u8]) -> Result<(), SinkError> {
        let path = self.dir.join(name);
        fs::write(&path, data).map_err(|source| SinkError::Io { path, source })
    }

    fn finish(self: Box<Self>) -> Result<(), SinkError> {
        Ok(())
    }

    // 已写入的图片保留，下次运行逐图续传
    fn discard(self: Box<Self>) -> Result<(), SinkError> {
        Ok(())
    }
}

/// 整章写入一个 deflate 压缩的 cbz。
///
/// 压缩包内不做逐图续传：只要 `.cbz` 文件存在，整章即视为已完成。
/// 因此失败的章节必须通过 [`OutputSink::discard`] 删除半成品。
pub struct ArchiveSink {
    path: PathBuf,
    zip: ZipWriter<File>,
}

impl ArchiveSink {
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        let file = File::create(path).map_err(|source| SinkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("创建压缩包: {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            zip: ZipWriter::new(file),
        })
    }

    fn zip_err(&self, source: zip::result::ZipError) -> SinkError {
        SinkError::Zip {
            path: self.path.clone(),
            source,
        }
    }
}

impl OutputSink for ArchiveSink {
    fn contains(&self, _name: &str) -> bool {
        false
    }

    fn write(&mut self, name: &str, data: &[u8]) -> Result<(), SinkError> {
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        self.zip
            .start_file(name, options)
            .map_err(|e| self.zip_err(e))?;
        self.zip.write_all(data).map_err(|source| SinkError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn finish(mut self: Box<Self>) -> Result<(), SinkError> {
        let result = match self.zip.finish() {
            Ok(file) => file.sync_all().map_err(|source| SinkError::Io {
                path: self.path.clone(),
                source,
            }),
            Err(e) => Err(self.zip_err(e)),
        };
        if result.is_err() {
            let _ = fs::remove_file(&self.path);
        }
        result
    }

    fn discard(self: Box<Self>) -> Result<(), SinkError> {
        let Self { path, zip } = *self;
        // 先关闭写入器，再删除文件
        drop(zip);
        debug!("删除未完成的压缩包: {}", path.display());
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SinkError::Io { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn directory_sink_writes_one_file_per_asset() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("Chapter 1");
        let mut sink = DirectorySink::open(&target).unwrap();

        assert!(!sink.contains("01.jpg"));
        sink.write("01.jpg", b"one").unwrap();
        assert!(sink.contains("01.jpg"));
        Box::new(sink).finish().unwrap();

        assert_eq!(fs::read(target.join("01.jpg")).unwrap(), b"one");
    }

    #[test]
    fn archive_sink_keeps_member_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Chapter 1.cbz");
        let mut sink = ArchiveSink::create(&path).unwrap();
        sink.write("01.jpg", b"first").unwrap();
        sink.write("02.jpg", b"second").unwrap();
        assert!(!sink.contains("01.jpg"));
        Box::new(sink).finish().unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        let mut member = archive.by_index(1).unwrap();
        assert_eq!(member.name(), "02.jpg");
        assert_eq!(member.compression(), CompressionMethod::Deflated);
        let mut data = Vec::new();
        member.read_to_end(&mut data).unwrap();
        assert_eq!(data, b"second");
    }

    #[test]
    fn discarded_archive_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Chapter 1.cbz");
        let mut sink = ArchiveSink::create(&path).unwrap();
        sink.write("01.jpg", b"first").unwrap();
        Box::new(sink).discard().unwrap();

        assert!(!path.exists());
    }

    #[test]
    fn discarded_directory_keeps_written_assets() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("Chapter 1");
        let mut sink = DirectorySink::open(&target).unwrap();
        sink.write("01.jpg", b"one").unwrap();
        Box::new(sink).discard().unwrap();

        assert!(target.join("01.jpg").is_file());
    }
}
