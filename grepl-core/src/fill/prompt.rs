//! # Prompting
//!
//! The interactive filler never touches a terminal directly, it talks to a [`Prompter`].
use std::io::{self, BufRead, Write};

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("End of input")]
    EndOfInput,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A source of user answers.
pub trait Prompter {
    /// Reads one free-form value. An empty answer is returned as an empty string.
    fn input(&mut self, prompt: &str) -> Result<String, PromptError>;

    /// Asks a yes/no question.
    fn confirm(&mut self, question: &str) -> Result<bool, PromptError>;

    /// Asks to pick one of `options`, returning its index.
    fn select(&mut self, message: &str, options: &[&str]) -> Result<usize, PromptError>;
}

impl<P: Prompter + ?Sized> Prompter for &mut P {
    fn input(&mut self, prompt: &str) -> Result<String, PromptError> {
        (**self).input(prompt)
    }

    fn confirm(&mut self, question: &str) -> Result<bool, PromptError> {
        (**self).confirm(question)
    }

    fn select(&mut self, message: &str, options: &[&str]) -> Result<usize, PromptError> {
        (**self).select(message, options)
    }
}

/// A line based prompter: writes prompts to `output` and reads one answer per line from `input`.
///
/// End of file on `input` is reported as [`PromptError::EndOfInput`].
#[derive(Debug)]
pub struct LinePrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Reads the next line without its line terminator.
    pub fn read_line(&mut self) -> Result<String, PromptError> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(PromptError::EndOfInput);
        }

        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(line)
    }

    /// The writer prompts go to, for callers that print between prompts.
    pub fn output_mut(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    fn ask(&mut self, prompt: &str) -> Result<String, PromptError> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        self.read_line()
    }
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn input(&mut self, prompt: &str) -> Result<String, PromptError> {
        self.ask(prompt)
    }

    fn confirm(&mut self, question: &str) -> Result<bool, PromptError> {
        loop {
            let answer = self.ask(&format!("{question} (y/n) "))?;
            match answer.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" | "" => return Ok(false),
                _ => writeln!(self.output, "please answer 'y' or 'n'")?,
            }
        }
    }

    fn select(&mut self, message: &str, options: &[&str]) -> Result<usize, PromptError> {
        writeln!(self.output, "{message}")?;
        for (i, option) in options.iter().enumerate() {
            writeln!(self.output, "  {}) {option}", i + 1)?;
        }

        loop {
            let answer = self.ask("> ")?;
            let answer = answer.trim();

            if let Some(index) = options.iter().position(|o| *o == answer) {
                return Ok(index);
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Ok(n - 1),
                _ => writeln!(self.output, "invalid choice '{answer}'")?,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn prompter(input: &str) -> LinePrompter<&[u8], Vec<u8>> {
        LinePrompter::new(input.as_bytes(), Vec::new())
    }

    #[test]
    fn input_strips_line_terminators_only() {
        let mut p = prompter("  spaced  \r\nnext\n");

        assert_eq!(p.input("a: ").unwrap(), "  spaced  ");
        assert_eq!(p.input("b: ").unwrap(), "next");
        assert!(matches!(p.input("c: "), Err(PromptError::EndOfInput)));
    }

    #[test]
    fn confirm_retries_until_a_valid_answer() {
        let mut p = prompter("maybe\nY\n\n");

        assert!(p.confirm("dig?").unwrap());
        assert!(!p.confirm("dig?").unwrap());
    }

    #[test]
    fn select_accepts_names_and_one_based_indexes() {
        let mut p = prompter("0\nsecond\n1\n");
        let options = ["first", "second"];

        assert_eq!(p.select("pick", &options).unwrap(), 1);
        assert_eq!(p.select("pick", &options).unwrap(), 0);

        let (_, output) = p.into_inner();
        assert!(String::from_utf8(output).unwrap().contains("invalid choice '0'"));
    }
}
