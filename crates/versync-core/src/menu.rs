//! Action selection for the interactive front ends.

use std::io::{self, BufRead, Write};

/// The user's choice from a menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Zero-based index into the offered labels.
    Action(usize),
    /// The quit sentinel (`0`) or end of input.
    Quit,
}

/// Something that can ask a user to pick one of several actions.
pub trait ActionSelector {
    fn offer(&mut self, title: &str, labels: &[&str]) -> io::Result<Selection>;
}

/// Numbered text menu over any reader/writer pair.
#[derive(Debug)]
pub struct ConsoleMenu<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsoleMenu<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }
}

impl ConsoleMenu<io::StdinLock<'static>, io::Stdout> {
    /// Menu on the process's stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ActionSelector for ConsoleMenu<R, W> {
    fn offer(&mut self, title: &str, labels: &[&str]) -> io::Result<Selection> {
        let mut line = String::new();
        loop {
            writeln!(self.output, "\n\n{title}")?;
            for (i, label) in labels.iter().enumerate() {
                writeln!(self.output, "   {}. {}", i + 1, label)?;
            }
            write!(self.output, "\nEnter your choice (0 to disconnect and quit): ")?;
            self.output.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(Selection::Quit);
            }

            match line.trim().parse::<usize>() {
                Ok(0) => return Ok(Selection::Quit),
                Ok(n) if n <= labels.len() => return Ok(Selection::Action(n - 1)),
                _ => writeln!(self.output, "\nERROR: Invalid option!\n")?,
            }
        }
    }
}
