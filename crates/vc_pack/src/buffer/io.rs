//! Transport adapter: `std::io` traits over a [`SerializerBuffer`].
//!
//! The in-memory buffer itself never blocks. `fill_from` and `drain_into`
//! move bytes from or to an external reader/writer and inherit its
//! blocking behavior; transport errors come back as
//! [`PackError::Transport`] unchanged.

use std::io::{self, Read, Seek, SeekFrom, Write};

use super::SerializerBuffer;
use crate::{PackError, PackResult};

const CHUNK: usize = 8 * 1024;

impl SerializerBuffer {
    /// Appends up to `n` bytes read from `reader` after the logical end.
    ///
    /// The cursor does not move, so decoding can resume where it stopped.
    /// Returns the number of bytes appended, fewer than `n` only when the
    /// reader reached its end.
    ///
    /// # Examples
    ///
    /// ```
    /// use vc_pack::buffer::SerializerBuffer;
    ///
    /// let mut buf = SerializerBuffer::new();
    /// let mut source: &[u8] = &[1, 2, 3];
    /// assert_eq!(buf.fill_from(&mut source, 8).unwrap(), 3);
    /// assert_eq!(buf.as_slice(), &[1, 2, 3]);
    /// assert_eq!(buf.position(), 0);
    /// ```
    pub fn fill_from<R: Read + ?Sized>(&mut self, reader: &mut R, n: usize) -> PackResult<usize> {
        let position = self.position;
        let start = self.length;
        self.position = start;

        let mut total = 0;
        let result = loop {
            if total == n {
                break Ok(total);
            }
            let step = (n - total).min(CHUNK);
            if let Err(err) = self.ensure_writable(step) {
                break Err(err);
            }

            let at = self.position;
            let read = match reader.read(&mut self.storage.bytes_mut()[at..at + step]) {
                Ok(0) => break Ok(total),
                Ok(read) => read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => break Err(PackError::Transport(err)),
            };

            self.position += read;
            self.length = self.position;
            total += read;
        };

        self.position = position;
        result
    }

    /// Writes the whole logical content to `writer`, then empties the buffer.
    ///
    /// On failure the buffer is left untouched.
    pub fn drain_into<W: Write + ?Sized>(&mut self, writer: &mut W) -> PackResult<usize> {
        writer.write_all(self.as_slice())?;
        writer.flush()?;
        let written = self.length;
        self.reset();
        Ok(written)
    }
}

// -----------------------------------------------------------------------------
// std::io traits

impl Read for SerializerBuffer {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let n = out.len().min(self.remaining());
        out[..n].copy_from_slice(&self.unread()[..n]);
        self.position += n;
        Ok(n)
    }
}

impl Write for SerializerBuffer {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.write_bytes(bytes).map_err(io::Error::other)?;
        Ok(bytes.len())
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for SerializerBuffer {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::End(offset) => self.length as i128 + i128::from(offset),
            SeekFrom::Current(offset) => self.position as i128 + i128::from(offset),
        };

        let position = usize::try_from(target)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "seek before start"))?;
        self.set_position(position)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
        Ok(position as u64)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;
    use std::io::{self, Read, Seek, SeekFrom, Write};

    use crate::PackError;
    use crate::buffer::SerializerBuffer;

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn io_traits_follow_cursor() {
        let mut buf = SerializerBuffer::new();
        buf.write_all(b"hello world").unwrap();

        buf.seek(SeekFrom::Start(6)).unwrap();
        let mut out = Vec::new();
        buf.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"world");

        assert_eq!(buf.seek(SeekFrom::End(-5)).unwrap(), 6);
        assert_eq!(buf.seek(SeekFrom::Current(-6)).unwrap(), 0);
        assert!(buf.seek(SeekFrom::Current(-1)).is_err());
        assert!(buf.seek(SeekFrom::End(1)).is_err());
    }

    #[test]
    fn fill_appends_after_length() {
        let mut buf = SerializerBuffer::from_vec(vec![1, 2]);
        buf.set_position(1).unwrap();

        let data = vec![7u8; 20_000];
        let appended = buf.fill_from(&mut data.as_slice(), 30_000).unwrap();
        assert_eq!(appended, 20_000);
        assert_eq!(buf.length(), 20_002);
        assert_eq!(buf.position(), 1);
    }

    #[test]
    fn drain_writes_and_resets() {
        let mut buf = SerializerBuffer::from_vec(vec![1, 2, 3]);
        let mut sink = Vec::new();
        assert_eq!(buf.drain_into(&mut sink).unwrap(), 3);
        assert_eq!(sink, vec![1, 2, 3]);
        assert_eq!(buf.length(), 0);
    }

    #[test]
    fn transport_errors_surface_unchanged() {
        let mut buf = SerializerBuffer::from_vec(vec![1]);
        match buf.drain_into(&mut Broken) {
            Err(PackError::Transport(err)) => assert_eq!(err.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(buf.length(), 1);
    }
}
