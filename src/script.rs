//! Button scripts for replaying input without a pad attached
//!
//! One step per line, `#` starts a comment:
//!
//! ```text
//! press 0         # button 0 down
//! wait 20         # milliseconds
//! release 0
//! tap 1           # press, hold 20ms, release
//! tap 1 600       # press, hold 600ms, release
//! mask 0x0005     # whole-pad snapshot: buttons 0 and 2 held
//! ```

use camelpad_gesture::{ButtonId, ButtonMask};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Hold time for `tap` without an explicit duration
const DEFAULT_TAP_MS: u64 = 20;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScriptError {
    #[error("line {line}: unknown step \"{word}\"")]
    UnknownStep { line: usize, word: String },

    #[error("line {line}: missing argument for \"{step}\"")]
    MissingArgument { line: usize, step: &'static str },

    #[error("line {line}: invalid number \"{value}\"")]
    InvalidNumber { line: usize, value: String },

    #[error("line {line}: unexpected trailing input \"{rest}\"")]
    TrailingInput { line: usize, rest: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Press(ButtonId),
    Release(ButtonId),
    Wait(Duration),
    Mask(ButtonMask),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    pub steps: Vec<Step>,
}

impl Script {
    /// Sum of all waits.
    pub fn duration(&self) -> Duration {
        self.steps
            .iter()
            .map(|s| match s {
                Step::Wait(d) => *d,
                _ => Duration::ZERO,
            })
            .sum()
    }
}

/// Decimal, `0x` hex or `0b` binary.
fn parse_number<T>(value: &str, line: usize) -> Result<T, ScriptError>
where
    T: TryFrom<u64>,
{
    let invalid = || ScriptError::InvalidNumber {
        line,
        value: value.to_string(),
    };
    let parsed = if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else if let Some(bin) = value.strip_prefix("0b") {
        u64::from_str_radix(bin, 2)
    } else {
        value.parse::<u64>()
    };
    parsed
        .ok()
        .and_then(|n| T::try_from(n).ok())
        .ok_or_else(invalid)
}

fn parse_line(text: &str, line: usize, steps: &mut Vec<Step>) -> Result<(), ScriptError> {
    let text = text.split('#').next().unwrap_or("").trim();
    let mut words = text.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(());
    };

    let mut arg = |step: &'static str| {
        words
            .next()
            .ok_or(ScriptError::MissingArgument { line, step })
    };

    match word.to_ascii_lowercase().as_str() {
        "press" | "down" => steps.push(Step::Press(parse_number(arg("press")?, line)?)),
        "release" | "up" => steps.push(Step::Release(parse_number(arg("release")?, line)?)),
        "wait" | "sleep" => steps.push(Step::Wait(Duration::from_millis(parse_number(
            arg("wait")?,
            line,
        )?))),
        "mask" => steps.push(Step::Mask(ButtonMask(parse_number(arg("mask")?, line)?))),
        "tap" => {
            let button = parse_number(arg("tap")?, line)?;
            let hold = match words.next() {
                Some(ms) => parse_number(ms, line)?,
                None => DEFAULT_TAP_MS,
            };
            steps.extend([
                Step::Press(button),
                Step::Wait(Duration::from_millis(hold)),
                Step::Release(button),
            ]);
        }
        _ => {
            return Err(ScriptError::UnknownStep {
                line,
                word: word.to_string(),
            })
        }
    }

    let rest: Vec<&str> = words.collect();
    if !rest.is_empty() {
        return Err(ScriptError::TrailingInput {
            line,
            rest: rest.join(" "),
        });
    }
    Ok(())
}

impl FromStr for Script {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut steps = Vec::new();
        for (i, text) in s.lines().enumerate() {
            parse_line(text, i + 1, &mut steps)?;
        }
        Ok(Script { steps })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_steps() {
        let script: Script = "press 0\nwait 10\nrelease 0\n".parse().unwrap();
        assert_eq!(
            script.steps,
            vec![
                Step::Press(0),
                Step::Wait(Duration::from_millis(10)),
                Step::Release(0)
            ]
        );
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let script: Script = "# header\n\n  tap 3   # quick\n".parse().unwrap();
        assert_eq!(
            script.steps,
            vec![
                Step::Press(3),
                Step::Wait(Duration::from_millis(DEFAULT_TAP_MS)),
                Step::Release(3)
            ]
        );
    }

    #[test]
    fn test_tap_with_hold_and_mask() {
        let script: Script = "tap 1 600\nmask 0x0005\nmask 0b11\n".parse().unwrap();
        assert_eq!(script.steps[1], Step::Wait(Duration::from_millis(600)));
        assert_eq!(script.steps[3], Step::Mask(ButtonMask(5)));
        assert_eq!(script.steps[4], Step::Mask(ButtonMask(3)));
        assert_eq!(script.duration(), Duration::from_millis(600));
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        assert_eq!(
            "press 0\nhold 1\n".parse::<Script>(),
            Err(ScriptError::UnknownStep {
                line: 2,
                word: "hold".into()
            })
        );
        assert_eq!(
            "press".parse::<Script>(),
            Err(ScriptError::MissingArgument {
                line: 1,
                step: "press"
            })
        );
        // button ids are u8
        assert_eq!(
            "press 300".parse::<Script>(),
            Err(ScriptError::InvalidNumber {
                line: 1,
                value: "300".into()
            })
        );
        assert_eq!(
            "release 1 2".parse::<Script>(),
            Err(ScriptError::TrailingInput {
                line: 1,
                rest: "2".into()
            })
        );
    }
}
