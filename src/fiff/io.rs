use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use super::constants::*;
use super::{FiffError, Node, Tag};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Reads a whole file into its block tree.
///
/// Gzip compression is detected from the content, so a compressed file with a
/// plain `.fif` name still opens.
pub fn open(path: &Path) -> Result<Node, FiffError> {
    let mut reader = BufReader::with_capacity(65536, File::open(path)?);
    let is_gzip = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
    if is_gzip {
        read_tree(&mut BufReader::new(MultiGzDecoder::new(reader)))
    } else {
        read_tree(&mut reader)
    }
}

fn read_tree<R: Read>(reader: &mut R) -> Result<Node, FiffError> {
    let first = Tag::read(reader)?.ok_or(FiffError::Empty)?;
    if first.kind != FIFF_FILE_ID {
        return Err(FiffError::NotFiff);
    }
    let mut tags = vec![first];
    while let Some(tag) = Tag::read(reader)? {
        tags.push(tag);
    }
    Node::from_tags(tags)
}

enum Sink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Plain(w) => w.write(buf),
            Sink::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Plain(w) => w.flush(),
            Sink::Gzip(w) => w.flush(),
        }
    }
}

/// Sequential tag writer that keeps count of the uncompressed bytes written.
pub struct FiffWriter {
    sink: Sink,
    position: u64,
}

impl FiffWriter {
    /// Creates `path` and writes the file id and directory pointer tags.
    ///
    /// Without `overwrite` the file is created exclusively, so a destination
    /// that appeared after any earlier check still fails with `FileExists`.
    pub fn create(path: &Path, overwrite: bool, file_num: i32) -> Result<Self, FiffError> {
        let mut options = OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let file = options.open(path).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => FiffError::FileExists(path.to_path_buf()),
            _ => FiffError::Io(e),
        })?;

        let buffered = BufWriter::with_capacity(65536, file);
        let gz = path
            .file_name()
            .map(|n| n.to_string_lossy().ends_with(".gz"))
            .unwrap_or(false);
        let sink = if gz {
            Sink::Gzip(GzEncoder::new(buffered, Compression::default()))
        } else {
            Sink::Plain(buffered)
        };

        let mut writer = FiffWriter { sink, position: 0 };
        writer.write_tag(&file_id_tag(file_num))?;
        writer.write_tag(&Tag::int(FIFF_DIR_POINTER, -1))?;
        Ok(writer)
    }

    pub fn write_tag(&mut self, tag: &Tag) -> Result<(), FiffError> {
        tag.write(&mut self.sink)?;
        self.position += tag.encoded_len();
        Ok(())
    }

    pub fn write_tags<'a>(&mut self, tags: impl IntoIterator<Item = &'a Tag>) -> Result<(), FiffError> {
        for tag in tags {
            self.write_tag(tag)?;
        }
        Ok(())
    }

    pub fn start_block(&mut self, block: i32) -> Result<(), FiffError> {
        self.write_tag(&Tag::block_start(block))
    }

    pub fn end_block(&mut self, block: i32) -> Result<(), FiffError> {
        self.write_tag(&Tag::block_end(block))
    }

    /// Uncompressed bytes written so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn finish(self) -> Result<(), FiffError> {
        match self.sink {
            Sink::Plain(mut w) => w.flush()?,
            Sink::Gzip(w) => w.finish()?.flush()?,
        }
        Ok(())
    }
}

/// Bytes taken by the file id and directory pointer tags.
pub fn file_header_len() -> u64 {
    file_id_tag(0).encoded_len() + Tag::int(FIFF_DIR_POINTER, -1).encoded_len()
}

fn file_id_tag(file_num: i32) -> Tag {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let mut tag = Tag::ints(
        FIFF_FILE_ID,
        &[
            FIFFC_VERSION,
            file_num,
            0,
            now.as_secs() as i32,
            now.subsec_micros() as i32,
        ],
    );
    tag.ty = FIFFT_ID_STRUCT;
    tag
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_sample(path: &Path) {
        let mut w = FiffWriter::create(path, false, 0).unwrap();
        w.start_block(FIFFB_MEAS).unwrap();
        w.write_tag(&Tag::int(FIFF_NCHAN, 4)).unwrap();
        w.end_block(FIFFB_MEAS).unwrap();
        w.finish().unwrap();
    }

    #[test]
    fn plain_and_gzip_files_read_back() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a_raw.fif", "a_raw.fif.gz"] {
            let path = dir.path().join(name);
            write_sample(&path);
            let root = open(&path).unwrap();
            let meas = root.require(FIFFB_MEAS).unwrap();
            assert_eq!(meas.require_tag(FIFF_NCHAN).unwrap().as_i32().unwrap(), 4);
        }
        let plain = std::fs::metadata(dir.path().join("a_raw.fif")).unwrap().len();
        assert_eq!(plain, file_header_len() + 3 * 20);
    }

    #[test]
    fn exclusive_create_reports_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a_raw.fif");
        std::fs::write(&path, b"").unwrap();

        let err = FiffWriter::create(&path, false, 0).err().unwrap();
        assert!(matches!(err, FiffError::FileExists(_)), "{err}");
        assert!(FiffWriter::create(&path, true, 0).is_ok());
    }

    #[test]
    fn empty_and_foreign_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty_raw.fif");
        std::fs::write(&empty, b"").unwrap();
        assert!(matches!(open(&empty), Err(FiffError::Empty)));

        let text = dir.path().join("text_raw.fif");
        let mut bytes = Vec::new();
        Tag::string(FIFF_COMMENT, "hello").write(&mut bytes).unwrap();
        std::fs::write(&text, bytes).unwrap();
        assert!(matches!(open(&text), Err(FiffError::NotFiff)));
    }
}
