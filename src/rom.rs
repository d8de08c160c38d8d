//! ROM image loading.
//!
//! A boot needs two images: the SYN600 monitor and OSI BASIC. Each is a byte
//! range cut out of a named source and copied to a fixed address. Both
//! fetches finish before anything is installed, so a failure on either side
//! leaves memory untouched.

use std::{fs, io, path::PathBuf, thread};

use log::debug;
use thiserror::Error;

use crate::bus::{IoDevice, Memory};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomImage {
    /// Source identifier, e.g. a file name.
    pub name: String,
    /// First byte of the image within the source.
    pub offset: usize,
    pub length: usize,
    /// Where the image is installed.
    pub address: u16,
}

impl RomImage {
    /// SYN600 monitor: the last 0x300 bytes of the 1 KiB chip at `$FD00`.
    pub fn monitor(name: impl Into<String>) -> Self {
        RomImage {
            name: name.into(),
            offset: 0x0100,
            length: 0x0300,
            address: 0xFD00,
        }
    }

    /// OSI Microsoft BASIC, 8 KiB at `$A000`.
    pub fn basic(name: impl Into<String>) -> Self {
        RomImage {
            name: name.into(),
            offset: 0x0000,
            length: 0x2000,
            address: 0xA000,
        }
    }

    /// Cut this image out of the raw source bytes.
    pub fn extract(&self, raw: &[u8]) -> Result<Vec<u8>, RomError> {
        let end = (self.address as usize).checked_add(self.length);
        if end.is_none_or(|end| end > 0x10000) {
            return Err(RomError::OutOfRange {
                name: self.name.clone(),
                address: self.address,
                length: self.length,
            });
        }

        self.offset
            .checked_add(self.length)
            .and_then(|end| raw.get(self.offset..end))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| RomError::Truncated {
                name: self.name.clone(),
                offset: self.offset,
                length: self.length,
                actual: raw.len(),
            })
    }
}

#[derive(Error, Debug)]
pub enum RomError {
    #[error("failed to read ROM {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("ROM {name} is {actual} bytes; need {length} bytes from offset {offset:#X}")]
    Truncated {
        name: String,
        offset: usize,
        length: usize,
        actual: usize,
    },

    #[error("ROM {name} ({length:#X} bytes) does not fit at ${address:04X}")]
    OutOfRange {
        name: String,
        address: u16,
        length: usize,
    },

    #[error("ROM fetch for {name} panicked")]
    Fetch { name: String },
}

/// Where ROM bytes come from.
pub trait RomSource: Sync {
    /// Raw bytes of the named source.
    fn fetch(&self, name: &str) -> Result<Vec<u8>, RomError>;
}

/// Reads ROM sources as files in a directory.
pub struct FileRomSource {
    pub dir: PathBuf,
}

impl FileRomSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl RomSource for FileRomSource {
    fn fetch(&self, name: &str) -> Result<Vec<u8>, RomError> {
        fs::read(self.dir.join(name)).map_err(|source| RomError::Io {
            name: name.to_string(),
            source,
        })
    }
}

/// Fetch and cut every image concurrently; fail if any one fails.
pub fn fetch_all(source: &dyn RomSource, images: &[RomImage]) -> Result<Vec<Vec<u8>>, RomError> {
    thread::scope(|scope| {
        let handles: Vec<_> = images
            .iter()
            .map(|image| {
                let handle = scope.spawn(move || image.extract(&source.fetch(&image.name)?));
                (image, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(image, handle)| {
                handle.join().unwrap_or_else(|_| {
                    Err(RomError::Fetch {
                        name: image.name.clone(),
                    })
                })
            })
            .collect()
    })
}

/// Fetch every image, then install them all. Nothing is installed on error.
pub fn load_into<D: IoDevice>(
    memory: &mut Memory<D>,
    source: &dyn RomSource,
    images: &[RomImage],
) -> Result<(), RomError> {
    let data = fetch_all(source, images)?;

    for (image, bytes) in images.iter().zip(&data) {
        debug!(
            "installing {} ({:#X} bytes) at ${:04X}",
            image.name,
            bytes.len(),
            image.address
        );
        memory.initialize_region(bytes, image.address);
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use super::*;

    /// ROM sources held in memory.
    #[derive(Default)]
    pub(crate) struct MapSource(pub HashMap<String, Vec<u8>>);

    impl MapSource {
        pub(crate) fn with(mut self, name: &str, bytes: Vec<u8>) -> Self {
            self.0.insert(name.to_string(), bytes);
            self
        }
    }

    impl RomSource for MapSource {
        fn fetch(&self, name: &str) -> Result<Vec<u8>, RomError> {
            self.0.get(name).cloned().ok_or_else(|| RomError::Io {
                name: name.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such ROM"),
            })
        }
    }

    #[test]
    fn monitor_image_fills_top_of_memory() {
        let image = RomImage::monitor("SYN600.ROM");
        assert_eq!(image.address as usize + image.length, 0x10000);
    }

    #[test]
    fn extract_cuts_the_configured_range() {
        let raw: Vec<u8> = (0..=255u8).cycle().take(0x400).collect();
        let bytes = RomImage::monitor("m").extract(&raw).unwrap();

        assert_eq!(bytes.len(), 0x300);
        assert_eq!(bytes[0], raw[0x100]);
        assert_eq!(bytes[0x2FF], raw[0x3FF]);
    }

    #[test]
    fn extract_rejects_short_source() {
        let err = RomImage::basic("b").extract(&[0; 0x1000]).unwrap_err();
        assert!(matches!(err, RomError::Truncated { actual: 0x1000, .. }));
    }

    #[test]
    fn extract_rejects_offset_at_end_of_usize() {
        let image = RomImage {
            name: "x".into(),
            offset: usize::MAX,
            length: 2,
            address: 0x0000,
        };
        let err = image.extract(&[0; 16]).unwrap_err();
        assert!(matches!(err, RomError::Truncated { actual: 16, .. }));
    }

    #[test]
    fn extract_rejects_image_past_end_of_memory() {
        let image = RomImage {
            name: "x".into(),
            offset: 0,
            length: 0x200,
            address: 0xFF00,
        };
        let err = image.extract(&[0; 0x200]).unwrap_err();
        assert!(matches!(err, RomError::OutOfRange { .. }));
    }

    #[test]
    fn load_installs_both_images() {
        let source = MapSource::default()
            .with("SYN600.ROM", vec![0x11; 0x400])
            .with("OSIBASIC.ROM", vec![0x22; 0x2000]);
        let images = [RomImage::monitor("SYN600.ROM"), RomImage::basic("OSIBASIC.ROM")];
        let mut memory = Memory::new();

        load_into(&mut memory, &source, &images).unwrap();

        assert_eq!(memory.read_byte(0xFD00), 0x11);
        assert_eq!(memory.read_byte(0xFFFF), 0x11);
        assert_eq!(memory.read_byte(0xA000), 0x22);
        assert_eq!(memory.read_byte(0xBFFF), 0x22);
        assert_eq!(memory.read_byte(0xC000), 0x00);
    }

    #[test]
    fn one_missing_image_installs_nothing() {
        let source = MapSource::default().with("SYN600.ROM", vec![0x11; 0x400]);
        let images = [RomImage::monitor("SYN600.ROM"), RomImage::basic("OSIBASIC.ROM")];
        let mut memory = Memory::new();

        let err = load_into(&mut memory, &source, &images).unwrap_err();

        assert!(matches!(err, RomError::Io { ref name, .. } if name == "OSIBASIC.ROM"));
        assert_eq!(memory.read_byte(0xFD00), 0x00);
    }

    #[test]
    fn file_source_reports_missing_file() {
        let source = FileRomSource::new("/nonexistent/rom/dir");
        let err = source.fetch("SYN600.ROM").unwrap_err();
        assert!(matches!(err, RomError::Io { .. }));
    }
}
