//! # Search Task Serialization Format
//!
//! Recorded [`SearchTask`]s are streamed to disk (or any [`Write`] + [`Seek`]) while the traced program runs, and
//! replayed later.
//!
//! * Every task is one record: its postcard encoding, prefixed by the encoded length as a little endian `u32`.
//! * The stream starts with the length of all complete records as a little endian `u64`. The writer rewrites it
//!   whenever the stream is consistent, see [`TaskFileWriter::update_trace_header`]. A reader that honours it never
//!   sees the partial tail of a producer that crashed mid-write.
//! * Record lengths are untrusted. Anything above [`MAX_RECORD_SIZE`] is rejected before allocating.

use core::fmt::{self, Debug, Formatter};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use postcard::{from_bytes, to_allocvec};

use crate::{task::SearchTask, Error};

/// The largest record a [`TaskFileReader`] accepts, in bytes
pub const MAX_RECORD_SIZE: usize = 16 * 1024 * 1024;

/// The size of the trace length header
const HEADER_SIZE: u64 = 8;

/// Reads a stream of [`SearchTask`]s from any [`Read`].
pub struct TaskFileReader<R: Read> {
    reader: R,
    tasks_read: usize,
}

impl<R: Read> Debug for TaskFileReader<R> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "TaskFileReader {{ tasks_read: {} }}", self.tasks_read)
    }
}

impl<R: Read> TaskFileReader<R> {
    /// Construct from the given reader, positioned after the trace header (if any).
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            tasks_read: 0,
        }
    }

    /// The number of tasks read so far
    #[must_use]
    pub fn tasks_read(&self) -> usize {
        self.tasks_read
    }

    /// Parse the next task out of the stream.
    /// [`Option::None`] is returned once the stream is depleted, or when only a partial record is left.
    pub fn next_task(&mut self) -> Option<Result<SearchTask, Error>> {
        let mut len_buf = [0_u8; 4];
        match self.reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return None,
            Err(e) => return Some(Err(e.into())),
        }
        let len = match usize::try_from(u32::from_le_bytes(len_buf)) {
            Ok(len) if len <= MAX_RECORD_SIZE => len,
            _ => {
                return Some(Err(Error::illegal_argument(format!(
                    "record {} claims {} bytes, the limit is {MAX_RECORD_SIZE}",
                    self.tasks_read,
                    u32::from_le_bytes(len_buf)
                ))))
            }
        };

        let mut record = vec![0_u8; len];
        match self.reader.read_exact(&mut record) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                log::debug!("partial record after {} tasks", self.tasks_read);
                return None;
            }
            Err(e) => return Some(Err(e.into())),
        }
        self.tasks_read += 1;
        Some(from_bytes::<SearchTask>(&record).map_err(Error::from))
    }
}

impl<R: Read> Iterator for TaskFileReader<R> {
    type Item = Result<SearchTask, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_task()
    }
}

impl<'buffer> TaskFileReader<Cursor<&'buffer [u8]>> {
    /// Creates a new `TaskFileReader` from the given buffer, which must hold exactly the records.
    /// See also [`TaskFileReader::from_length_prefixed_buffer`].
    #[must_use]
    pub fn from_buffer(buffer: &'buffer [u8]) -> Self {
        Self::from_reader(Cursor::new(buffer))
    }

    /// Creates a new `TaskFileReader` from the given buffer, expecting the records to be prefixed by the
    /// trace length (as generated by the [`TaskFileWriter`]).
    ///
    /// A header claiming more than the buffer holds is clamped to the buffer.
    pub fn from_length_prefixed_buffer(mut buffer: &'buffer [u8]) -> Result<Self, Error> {
        let mut len_buf = 0_u64.to_le_bytes();
        buffer.read_exact(&mut len_buf)?;
        let trace_len = usize::try_from(u64::from_le_bytes(len_buf)).unwrap_or(usize::MAX);
        if trace_len > buffer.len() {
            log::warn!(
                "trace header claims {trace_len} bytes, only {} present",
                buffer.len()
            );
        }
        let (buffer, _) = buffer.split_at(trace_len.min(buffer.len()));
        Ok(Self::from_buffer(buffer))
    }
}

/// Writes a stream of [`SearchTask`]s to any [`Write`] + [`Seek`].
pub struct TaskFileWriter<W> {
    writer: W,
    writer_start_position: u64,
    tasks_written: usize,
}

impl<W> Debug for TaskFileWriter<W>
where
    W: Write,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFileWriter")
            .field("writer_start_position", &self.writer_start_position)
            .field("tasks_written", &self.tasks_written)
            .finish_non_exhaustive()
    }
}

impl<W: Write + Seek> TaskFileWriter<W> {
    /// Create a `TaskFileWriter` from the given [`Write`], starting with an empty trace header.
    pub fn from_writer(mut writer: W) -> io::Result<Self> {
        let writer_start_position = writer.stream_position()?;
        // preliminary trace length
        writer.write_all(&0_u64.to_le_bytes())?;
        Ok(Self {
            writer,
            writer_start_position,
            tasks_written: 0,
        })
    }

    /// The number of tasks written so far
    #[must_use]
    pub fn tasks_written(&self) -> usize {
        self.tasks_written
    }

    /// Appends one record. It only becomes visible to readers after the next [`Self::update_trace_header`].
    pub fn write_task(&mut self, task: &SearchTask) -> Result<(), Error> {
        let serialized = to_allocvec(task)?;
        if serialized.len() > MAX_RECORD_SIZE {
            return Err(Error::illegal_argument(format!(
                "task of {} bytes exceeds the record limit of {MAX_RECORD_SIZE}",
                serialized.len()
            )));
        }
        let len = u32::try_from(serialized.len())?;
        self.writer.write_all(&len.to_le_bytes())?;
        self.writer.write_all(&serialized)?;
        self.tasks_written += 1;
        Ok(())
    }

    /// Makes all records written so far visible to readers.
    /// For performance reasons, this should not be called after every task.
    pub fn update_trace_header(&mut self) -> io::Result<()> {
        let current_pos = self.writer.stream_position()?;
        self.writer.seek(SeekFrom::Start(self.writer_start_position))?;
        let trace_size = current_pos - self.writer_start_position - HEADER_SIZE;
        self.writer.write_all(&trace_size.to_le_bytes())?;
        self.writer.seek(SeekFrom::Start(current_pos))?;
        Ok(())
    }

    /// Updates the header and returns the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.update_trace_header()?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}
