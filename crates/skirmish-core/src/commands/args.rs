//! Argument parsing shared by the built-in commands.

use std::str::FromStr;

use crate::error::{Result, SkirmishError};
use crate::state::{Facing, Step};

/// Parse a base-10 number, naming the argument on failure.
pub fn parse_num<T: FromStr>(raw: &str, what: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| {
            SkirmishError::validation(format!("{what} must be a whole number, got `{raw}`"))
        })
}

/// Signed change such as `+5` or `-3`.
pub fn parse_delta(raw: &str) -> Result<i32> {
    let trimmed = raw.trim();
    parse_num(trimmed.strip_prefix('+').unwrap_or(trimmed), "hp change")
}

/// A coordinate pair from two tokens.
pub fn parse_coords(x: &str, y: &str) -> Result<(i32, i32)> {
    Ok((parse_num(x, "x")?, parse_num(y, "y")?))
}

/// Initiative value, or `None` for `clear` / `none` / `-`.
pub fn parse_initiative(raw: &str) -> Result<Option<i32>> {
    match raw.trim().to_lowercase().as_str() {
        "clear" | "none" | "-" => Ok(None),
        _ => parse_num(raw, "initiative").map(Some),
    }
}

pub fn parse_facing(raw: &str) -> Result<Facing> {
    Facing::from_name(raw).ok_or_else(|| {
        SkirmishError::validation(format!("`{raw}` is not a direction; use up, down, left or right"))
    })
}

/// Parse a walk such as `r2 u1`, `right 2 up` or `down3`.
///
/// Each token is a direction with an optional count glued on; a bare number
/// sets the count of the direction before it.
pub fn parse_steps<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<Step>> {
    let mut steps: Vec<Step> = Vec::new();
    let mut counted = false;

    for token in tokens {
        let token = token.as_ref().trim();
        if token.is_empty() {
            continue;
        }
        if token.chars().all(|c| c.is_ascii_digit()) {
            let count: u32 = parse_num(token, "step count")?;
            match steps.last_mut() {
                Some(last) if !counted => {
                    last.1 = count;
                    counted = true;
                }
                _ => {
                    return Err(SkirmishError::validation(format!(
                        "step count `{token}` must follow a direction"
                    )))
                }
            }
            continue;
        }

        let split = token
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(token.len());
        let (name, digits) = token.split_at(split);
        let facing = parse_facing(name)?;
        if digits.is_empty() {
            steps.push((facing, 1));
            counted = false;
        } else {
            steps.push((facing, parse_num(digits, "step count")?));
            counted = true;
        }
    }

    if steps.is_empty() {
        return Err(SkirmishError::validation("no steps given"));
    }
    Ok(steps)
}
