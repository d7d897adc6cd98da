use kernel_monitor::Console;
use log::warn;
use std::fmt;
use std::io::{self, BufRead};

/// A console over any line source and byte sink.
///
/// With `echo` set, every line read is written back after the prompt, so a
/// scripted session reads like an interactive one.
pub struct LineConsole<R, W> {
    input: R,
    output: W,
    echo: bool,
}

impl<R: BufRead, W: io::Write> LineConsole<R, W> {
    pub const fn new(input: R, output: W, echo: bool) -> Self {
        Self {
            input,
            output,
            echo,
        }
    }
}

impl<R, W: io::Write> fmt::Write for LineConsole<R, W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.output.write_all(s.as_bytes()).map_err(|_| fmt::Error)
    }
}

impl<R: BufRead, W: io::Write> Console for LineConsole<R, W> {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        let _ = write!(self.output, "{prompt}");
        let _ = self.output.flush();

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => {
                if self.echo {
                    let _ = writeln!(self.output, "{}", line.trim_end_matches(['\r', '\n']));
                }
                Some(line)
            }
            Err(err) => {
                warn!("console input failed: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_script_lines_after_the_prompt() {
        let mut out = Vec::new();
        let mut console = LineConsole::new(&b"help\nexit"[..], &mut out, true);
        assert_eq!(console.read_line("K> ").as_deref(), Some("help\n"));
        assert_eq!(console.read_line("K> ").as_deref(), Some("exit"));
        assert_eq!(console.read_line("K> "), None);
        drop(console);
        assert_eq!(String::from_utf8(out).unwrap(), "K> help\nK> exit\nK> ");
    }
}
