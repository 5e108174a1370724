//! Ownership handles for streams that filters read from.

use std::cell::RefCell;
use std::io::SeekFrom;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use super::{Attributes, Stream};
use crate::Result;

/// The stream a filter reads from, either owned or borrowed.
///
/// An owned source is closed when the filter is closed and dropped with it.
/// A borrowed source stays with the caller: closing the filter never closes
/// it, and the borrow ends when the filter is dropped.
pub enum Source<'a> {
    /// The filter owns the stream.
    Owned(Box<dyn Stream + 'a>),
    /// The caller keeps ownership; the filter borrows for its lifetime.
    Borrowed(&'a mut (dyn Stream + 'a)),
}

impl<'a> Source<'a> {
    /// Wraps a stream the filter should own.
    pub fn owned(stream: impl Stream + 'a) -> Self {
        Source::Owned(Box::new(stream))
    }

    /// Returns true if closing the filter should close this stream.
    pub fn is_owned(&self) -> bool {
        matches!(self, Source::Owned(_))
    }

    /// Closes the stream if it is owned; borrowed streams are left open.
    pub fn close(&mut self) -> Result<()> {
        match self {
            Source::Owned(stream) => stream.close(),
            Source::Borrowed(_) => Ok(()),
        }
    }
}

impl<'a> Deref for Source<'a> {
    type Target = dyn Stream + 'a;

    fn deref(&self) -> &Self::Target {
        match self {
            Source::Owned(stream) => &**stream,
            Source::Borrowed(stream) => &**stream,
        }
    }
}

impl<'a> DerefMut for Source<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            Source::Owned(stream) => &mut **stream,
            Source::Borrowed(stream) => &mut **stream,
        }
    }
}

impl<'a> From<&'a mut (dyn Stream + 'a)> for Source<'a> {
    fn from(stream: &'a mut (dyn Stream + 'a)) -> Self {
        Source::Borrowed(stream)
    }
}

/// A stream handle shared between an archive reader and its entry streams.
///
/// Every operation borrows the underlying stream only for its own duration.
/// The handle is `!Send`, so all users live on one thread; they must still
/// reposition the cursor (seek-then-read) before each access, since any
/// other holder may have moved it.
#[derive(Clone)]
pub struct SharedStream {
    inner: Rc<RefCell<Box<dyn Stream>>>,
}

impl SharedStream {
    /// Wraps a stream for sharing.
    pub fn new(stream: Box<dyn Stream>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(stream)),
        }
    }

    /// Number of live handles to the underlying stream.
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }
}

impl Stream for SharedStream {
    fn read(&mut self, buf: &mut [u8], error_on_eos: bool) -> Result<usize> {
        self.inner.borrow_mut().read(buf, error_on_eos)
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.borrow_mut().write(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.inner.borrow_mut().seek(pos)
    }

    fn tell(&mut self) -> Result<u64> {
        self.inner.borrow_mut().tell()
    }

    fn size(&mut self) -> Result<u64> {
        self.inner.borrow_mut().size()
    }

    fn attributes(&self) -> Attributes {
        self.inner.borrow().attributes()
    }

    fn truncate(&mut self, len: u64) -> Result<()> {
        self.inner.borrow_mut().truncate(len)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.borrow_mut().flush()
    }

    /// Closes the underlying stream once the last handle is closed.
    fn close(&mut self) -> Result<()> {
        if self.handle_count() == 1 {
            self.inner.borrow_mut().close()
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::IoStream;

    #[test]
    fn test_borrowed_source_is_not_owned() {
        let mut stream = IoStream::from_bytes(b"abc".to_vec());
        let mut source = Source::Borrowed(&mut stream);
        assert!(!source.is_owned());
        let mut buf = [0u8; 3];
        source.read(&mut buf, true).unwrap();
        source.close().unwrap();
        drop(source);
        // Still usable after the borrow ends
        assert_eq!(stream.tell().unwrap(), 3);
    }

    #[test]
    fn test_owned_source() {
        let source = Source::owned(IoStream::from_bytes(vec![1, 2, 3]));
        assert!(source.is_owned());
        assert!(source.attributes().contains(Attributes::SEEKABLE));
    }

    #[test]
    fn test_shared_stream_cursor_is_shared() {
        let mut a = SharedStream::new(Box::new(IoStream::from_bytes(b"0123456789".to_vec())));
        let mut b = a.clone();
        assert_eq!(a.handle_count(), 2);

        a.seek(SeekFrom::Start(4)).unwrap();
        assert_eq!(b.tell().unwrap(), 4);

        let mut buf = [0u8; 2];
        b.read(&mut buf, true).unwrap();
        assert_eq!(&buf, b"45");
        assert_eq!(a.tell().unwrap(), 6);

        b.close().unwrap();
        drop(b);
        assert_eq!(a.handle_count(), 1);
    }
}
