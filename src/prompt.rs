//! Console yes/no prompt.

use std::io::{self, BufRead, Write};

/// Ask `question` until the answer is `y` or `n` (any case).
/// EOF on `input` is an `UnexpectedEof` error.
pub fn prompt_yes_no<R, W>(question: &str, mut input: R, mut output: W) -> io::Result<bool>
where
    R: BufRead,
    W: Write,
{
    let mut answer = String::new();
    loop {
        write!(output, "{question}")?;
        output.flush()?;

        answer.clear();
        if input.read_line(&mut answer)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no answer given"));
        }
        match answer.trim().to_lowercase().as_str() {
            "y" => return Ok(true),
            "n" => return Ok(false),
            _ => writeln!(output, "Invalid character.")?,
        }
    }
}
