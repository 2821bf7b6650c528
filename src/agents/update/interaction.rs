use crate::error::{FleetError, Result};
use colored::Colorize;
use std::io::{self, BufRead, Write};

/// Asks once before live updates are applied across the fleet.
///
/// Disabled by `-y/--yes` and in dry-run mode.
pub struct RunConfirmation {
    enabled: bool,
}

impl RunConfirmation {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn confirm(&self, target_count: usize) -> Result<bool> {
        let stdin = io::stdin();
        self.confirm_with(target_count, &mut stdin.lock(), &mut io::stdout())
    }

    /// Returns `Ok(false)` on "no" and `UserCancelled` on "quit".
    pub fn confirm_with(
        &self,
        target_count: usize,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<bool> {
        if !self.enabled {
            return Ok(true);
        }

        loop {
            write!(
                output,
                "{}",
                format!("Proceed with updates on {target_count} target(s)? [Y/n/q]: ").bold()
            )?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Err(FleetError::UserCancelled);
            }

            match line.trim().to_lowercase().as_str() {
                "" | "y" | "yes" => return Ok(true),
                "n" | "no" => {
                    writeln!(output, "{}", "No changes applied.".dimmed())?;
                    return Ok(false);
                }
                "q" | "quit" => return Err(FleetError::UserCancelled),
                _ => {
                    writeln!(output, "{}", "Please answer with y(es), n(o), or q(uit).".red())?;
                }
            }
        }
    }
}
