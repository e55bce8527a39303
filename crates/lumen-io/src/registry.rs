//! Format registry: name lookup, detection and file access.
//!
//! A registry is an ordinary value built once at startup (usually with
//! [`FormatRegistry::builtin`]) and shared by reference afterwards. There is
//! no process-wide instance.
//!
//! # Example
//!
//! ```rust
//! use lumen_io::FormatRegistry;
//!
//! let registry = FormatRegistry::builtin();
//! assert!(registry.get("png").is_some());
//! assert_eq!(registry.best_depth("jpg", 16).unwrap(), 8);
//!
//! let header = b"\x89PNG\r\n\x1a\n....";
//! assert_eq!(registry.detect(header).map(|c| c.name()), Some("png"));
//! ```

use std::fs;
use std::io::Write;
use std::path::Path;

use lumen_core::RawImage;
use tracing::{debug, warn};

use crate::traits::{Codec, Decoded, WriteParams};
use crate::{IccCodec, IoError, IoResult, JpegCodec, PngCodec};

/// Immutable table of codecs, consulted in registration order.
pub struct FormatRegistry {
    codecs: Vec<Box<dyn Codec>>,
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.format_names())
            .finish()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FormatRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self { codecs: Vec::new() }
    }

    /// Registry with every codec compiled into this build.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(PngCodec);
        registry.register(JpegCodec);
        #[cfg(feature = "jp2")]
        registry.register(crate::Jp2Codec);
        registry.register(IccCodec);
        registry
    }

    /// Adds a codec. A codec with the same name replaces the earlier one.
    pub fn register(&mut self, codec: impl Codec + 'static) {
        self.codecs.retain(|c| c.name() != codec.name());
        self.codecs.push(Box::new(codec));
    }

    /// Registered format names in order.
    pub fn format_names(&self) -> Vec<&'static str> {
        self.codecs.iter().map(|c| c.name()).collect()
    }

    /// Codec by name (case-insensitive), also accepting any of its extensions.
    pub fn get(&self, name: &str) -> Option<&dyn Codec> {
        let name = name.to_ascii_lowercase();
        self.codecs
            .iter()
            .find(|c| c.name() == name)
            .or_else(|| self.codecs.iter().find(|c| c.extensions().contains(&name.as_str())))
            .map(|c| c.as_ref())
    }

    /// Codec claiming the extension of `path`.
    pub fn by_extension(&self, path: &Path) -> Option<&dyn Codec> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.codecs
            .iter()
            .find(|c| c.extensions().contains(&ext.as_str()))
            .map(|c| c.as_ref())
    }

    /// Codec whose signature matches `header`.
    pub fn detect(&self, header: &[u8]) -> Option<&dyn Codec> {
        self.codecs.iter().find(|c| c.matches(header)).map(|c| c.as_ref())
    }

    fn require(&self, name: &str) -> IoResult<&dyn Codec> {
        self.get(name).ok_or_else(|| IoError::UnsupportedFormat(name.to_string()))
    }

    /// Deepest depth `format` can store.
    pub fn max_depth(&self, format: &str) -> IoResult<u32> {
        Ok(self.require(format)?.depth().max())
    }

    /// Depth `format` would actually write when `requested` is asked for.
    pub fn best_depth(&self, format: &str, requested: u32) -> IoResult<u32> {
        Ok(self.require(format)?.depth().best(requested))
    }

    /// Reads and decodes `path`.
    ///
    /// The format is detected from the file signature first and from the
    /// extension as a fallback. Returns the decoded image and the name of
    /// the codec that read it.
    pub fn read(&self, path: &Path) -> IoResult<(Decoded, &'static str)> {
        let data = fs::read(path)?;
        let codec = self
            .detect(&data)
            .or_else(|| {
                let codec = self.by_extension(path)?;
                warn!(path = %path.display(), format = codec.name(), "unrecognized signature, using extension");
                Some(codec)
            })
            .ok_or_else(|| IoError::UnsupportedFormat(format!("cannot detect format of {}", path.display())))?;

        debug!(path = %path.display(), format = codec.name(), bytes = data.len(), "decoding");
        let decoded = codec.decode(&data)?;
        Ok((decoded, codec.name()))
    }

    /// Encodes into memory without touching the filesystem.
    pub fn encode(&self, format: &str, image: &RawImage, icc: Option<&[u8]>, params: &WriteParams) -> IoResult<Vec<u8>> {
        let codec = self.require(format)?;
        if !codec.can_write() {
            return Err(IoError::UnsupportedOperation(format!("{} cannot be written", codec.name())));
        }
        codec.encode(image, icc, params)
    }

    /// Encodes and writes `path`.
    ///
    /// Bytes go to a temporary file next to `path` that is renamed over it
    /// only once everything has been written, so a failure never leaves a
    /// truncated output behind.
    pub fn write(
        &self,
        path: &Path,
        format: &str,
        image: &RawImage,
        icc: Option<&[u8]>,
        params: &WriteParams,
    ) -> IoResult<()> {
        let bytes = self.encode(format, image, icc, params)?;
        debug!(path = %path.display(), format, bytes = bytes.len(), "writing");
        write_atomic(path, &bytes)
    }
}

/// Writes `bytes` to `path` through a temporary sibling file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> IoResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| IoError::Io(e.error))?;
    Ok(())
}
