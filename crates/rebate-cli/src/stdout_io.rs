use std::io::{self, Write};

/// Writes help text as-is. Help constants carry their own trailing newline.
pub fn write_stdout_text(text: &str) -> io::Result<()> {
    write_stdout(text, false)
}

/// Writes a rendered command body followed by a newline.
pub fn write_stdout_line(text: &str) -> io::Result<()> {
    write_stdout(text, true)
}

fn write_stdout(text: &str, trailing_newline: bool) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    write_tolerating_closed_pipe(&mut stdout, text, trailing_newline)
}

/// A reader that closes the pipe early (`rebate claim list | head`) is not an error.
fn write_tolerating_closed_pipe(
    writer: &mut dyn Write,
    text: &str,
    trailing_newline: bool,
) -> io::Result<()> {
    let result = write_all_then_flush(writer, text, trailing_newline);
    match result {
        Err(error) if error.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

fn write_all_then_flush(
    writer: &mut dyn Write,
    text: &str,
    trailing_newline: bool,
) -> io::Result<()> {
    writer.write_all(text.as_bytes())?;
    if trailing_newline {
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};

    use super::write_tolerating_closed_pipe;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn line_writes_append_newline() {
        let mut buffer = Vec::new();
        let written = write_tolerating_closed_pipe(&mut buffer, "Rebate claims (0):", true);
        assert!(written.is_ok());
        assert_eq!(buffer, b"Rebate claims (0):\n");
    }

    #[test]
    fn closed_pipe_is_not_an_error() {
        assert!(write_tolerating_closed_pipe(&mut ClosedPipe, "data", true).is_ok());
    }

    #[test]
    fn other_write_failures_propagate() {
        assert!(write_tolerating_closed_pipe(&mut FullDisk, "data", false).is_err());
    }
}
