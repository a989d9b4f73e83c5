use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::cell::RefCell;
use std::io::{self, BufRead, Result as IoResult, Write};
use std::rc::Rc;

/// Result of asking a [`LineSource`] for the next line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// One line of input, without its line terminator.
    Line(String),
    /// The read was interrupted (Ctrl-C); nothing was entered.
    Interrupted,
    /// The input is exhausted.
    Eof,
}

/// Line-oriented input feeding the read loop.
pub trait LineSource {
    /// Show `prompt` and read the next line.
    fn read_line(&mut self, prompt: &str) -> IoResult<LineEvent>;
}

/// Interactive terminal input with line editing.
pub struct RustylineSource {
    editor: DefaultEditor,
}

impl RustylineSource {
    pub fn new() -> rustyline::Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineSource for RustylineSource {
    fn read_line(&mut self, prompt: &str) -> IoResult<LineEvent> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(LineEvent::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(LineEvent::Interrupted),
            Err(ReadlineError::Eof) => Ok(LineEvent::Eof),
            Err(ReadlineError::Io(e)) => Err(e),
            Err(e) => Err(io::Error::other(e)),
        }
    }
}

/// Input read from any buffered reader, e.g. redirected standard input.
///
/// The prompt is written to `prompt_out` before every read.
pub struct BufReadSource<R, W> {
    reader: R,
    prompt_out: W,
}

impl<R: BufRead, W: Write> BufReadSource<R, W> {
    pub fn new(reader: R, prompt_out: W) -> Self {
        Self { reader, prompt_out }
    }
}

impl<R: BufRead, W: Write> LineSource for BufReadSource<R, W> {
    fn read_line(&mut self, prompt: &str) -> IoResult<LineEvent> {
        self.prompt_out.write_all(prompt.as_bytes())?;
        self.prompt_out.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(LineEvent::Eof);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(LineEvent::Line(line))
    }
}

/// Memory-backed writer for capturing what the shell prints.
pub struct MemWriter {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl MemWriter {
    pub fn new() -> Self {
        Self {
            buf: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Convenience: create writer and return (writer, rc_handle).
    pub fn with_handle() -> (Self, Rc<RefCell<Vec<u8>>>) {
        let mw = MemWriter::new();
        let rc = mw.buf.clone();
        (mw, rc)
    }
}

impl Default for MemWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn buf_read_source_strips_terminators_and_reports_eof() {
        let (prompt, seen) = MemWriter::with_handle();
        let mut source = BufReadSource::new(Cursor::new("ls -la\r\n\nlast"), prompt);

        assert_eq!(source.read_line("> ").unwrap(), LineEvent::Line("ls -la".into()));
        assert_eq!(source.read_line("> ").unwrap(), LineEvent::Line(String::new()));
        assert_eq!(source.read_line("> ").unwrap(), LineEvent::Line("last".into()));
        assert_eq!(source.read_line("> ").unwrap(), LineEvent::Eof);
        assert_eq!(source.read_line("> ").unwrap(), LineEvent::Eof);

        assert_eq!(seen.borrow().as_slice(), "> > > > > ".as_bytes());
    }

    #[test]
    fn mem_writer_shares_buffer_with_handle() {
        let (mut writer, handle) = MemWriter::with_handle();
        write!(writer, "hello {}", 42).unwrap();
        assert_eq!(handle.borrow().as_slice(), b"hello 42");
    }
}
