//! Process streams as seen by command-style routines.
//!
//! [`stdin`] and [`stdout`] resolve to the buffers installed by an active
//! [`crate::ToolContext`], and to the real process streams otherwise. The
//! slot is process-wide: while a capture is active every thread sees it.

use std::io::{self, Cursor, Read, Write};

use parking_lot::{const_mutex, Mutex};

static CURRENT: Mutex<Option<Streams>> = const_mutex(None);

/// Redirected stream pair.
pub(crate) struct Streams {
    input: Cursor<Vec<u8>>,
    output: Vec<u8>,
}

impl Streams {
    pub(crate) fn captured(input: String) -> Self {
        Self {
            input: Cursor::new(input.into_bytes()),
            output: Vec::new(),
        }
    }

    pub(crate) fn into_output(self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Swap the installed streams, returning the previous ones.
pub(crate) fn replace(streams: Option<Streams>) -> Option<Streams> {
    std::mem::replace(&mut *CURRENT.lock(), streams)
}

/// Whether a capture is installed right now.
pub fn is_captured() -> bool {
    CURRENT.lock().is_some()
}

/// Handle to the routine's standard input.
#[derive(Debug, Clone, Copy)]
pub struct Stdin(());

/// Handle to the routine's standard output.
#[derive(Debug, Clone, Copy)]
pub struct Stdout(());

pub fn stdin() -> Stdin {
    Stdin(())
}

pub fn stdout() -> Stdout {
    Stdout(())
}

impl Stdin {
    /// Read everything left on the stream.
    pub fn read_all(&mut self) -> io::Result<String> {
        let mut buf = String::new();
        self.read_to_string(&mut buf)?;
        Ok(buf)
    }
}

impl Read for Stdin {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut current = CURRENT.lock();
        if let Some(streams) = current.as_mut() {
            return streams.input.read(buf);
        }
        drop(current);
        io::stdin().read(buf)
    }
}

impl Write for Stdout {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut current = CURRENT.lock();
        if let Some(streams) = current.as_mut() {
            streams.output.extend_from_slice(buf);
            return Ok(buf.len());
        }
        drop(current);
        io::stdout().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        if is_captured() {
            return Ok(());
        }
        io::stdout().flush()
    }
}
