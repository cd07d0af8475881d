//! Tokenizer and grammar for controller command text
//!
//! ```text
//! directive  := CALLSIGN command+
//! command    := "C" target | "H" fix | "S" knots | "L" runway | "A" | target
//! target     := HDG(3 digits) | ALT(1-2 digits, thousands) | FIX
//! modifiers  := (";" MOD)* | following MOD tokens, MOD in {L, R, X}
//! ```
//!
//! A bare target is an implicit `C`. A standalone `L` token is a turn
//! modifier only when nothing follows it or a keyword follows it; otherwise
//! it begins a land command.

use crate::navdata::TurnDirection;

use super::CommandError;

/// Syntactic command, before names are resolved against navigation data
#[derive(Debug, Clone, PartialEq)]
pub enum RawCommand {
    Heading {
        heading: f64,
        turn: Option<TurnDirection>,
    },
    /// Thousands of feet as written
    Altitude { thousands: u32, expedite: bool },
    Waypoint {
        name: String,
        turn: Option<TurnDirection>,
    },
    Hold {
        fix: String,
        turn: Option<TurnDirection>,
    },
    Speed { knots: u32, expedite: bool },
    Land { runway: String },
    Abort,
}

const KEYWORDS: [&str; 5] = ["C", "H", "S", "L", "A"];

fn is_keyword(token: &str) -> bool {
    KEYWORDS.contains(&token)
}

fn syntax(msg: impl Into<String>) -> CommandError {
    CommandError::InvalidSyntax(msg.into())
}

/// Split off the leading callsign. The callsign is uppercased.
pub fn split_callsign(text: &str) -> Result<(String, Vec<String>), CommandError> {
    let mut tokens = text.split_whitespace().map(|t| t.to_ascii_uppercase());
    let callsign = tokens.next().ok_or_else(|| syntax("empty command"))?;
    Ok((callsign, tokens.collect()))
}

/// Parse the instruction tokens following the callsign
pub fn parse_commands(tokens: &[String]) -> Result<Vec<RawCommand>, CommandError> {
    if tokens.is_empty() {
        return Err(syntax("no instruction given"));
    }

    let mut parser = Parser { tokens, pos: 0 };
    let mut commands = Vec::new();
    while let Some(command) = parser.next_command()? {
        commands.push(command);
    }

    check_ordering(&commands)?;
    Ok(commands)
}

/// Abort may only lead, land may only trail, and neither may repeat
fn check_ordering(commands: &[RawCommand]) -> Result<(), CommandError> {
    let aborts = commands
        .iter()
        .filter(|c| matches!(c, RawCommand::Abort))
        .count();
    let lands = commands
        .iter()
        .filter(|c| matches!(c, RawCommand::Land { .. }))
        .count();

    if aborts > 1 {
        return Err(CommandError::BadOrdering("abort given more than once".into()));
    }
    if lands > 1 {
        return Err(CommandError::BadOrdering("land given more than once".into()));
    }
    if aborts == 1 && !matches!(commands.first(), Some(RawCommand::Abort)) {
        return Err(CommandError::BadOrdering("abort must come first".into()));
    }
    if lands == 1 && !matches!(commands.last(), Some(RawCommand::Land { .. })) {
        return Err(CommandError::BadOrdering("land must come last".into()));
    }
    Ok(())
}

#[derive(Debug, Default, Clone, Copy)]
struct Modifiers {
    turn: Option<TurnDirection>,
    expedite: bool,
}

impl Modifiers {
    fn add(&mut self, token: &str) -> Result<(), CommandError> {
        let turn = match token {
            "X" => {
                self.expedite = true;
                return Ok(());
            }
            "L" => TurnDirection::Left,
            "R" => TurnDirection::Right,
            other => return Err(syntax(format!("unknown modifier '{}'", other))),
        };
        match self.turn {
            Some(existing) if existing != turn => {
                Err(syntax("conflicting turn directions"))
            }
            _ => {
                self.turn = Some(turn);
                Ok(())
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.turn.is_none() && !self.expedite
    }

    /// Turn direction only; expedite is meaningless here
    fn turn_only(self, what: &str) -> Result<Option<TurnDirection>, CommandError> {
        if self.expedite {
            return Err(syntax(format!("expedite does not apply to {}", what)));
        }
        Ok(self.turn)
    }

    /// Expedite only; a turn direction is meaningless here
    fn expedite_only(self, what: &str) -> Result<bool, CommandError> {
        if self.turn.is_some() {
            return Err(syntax(format!("turn direction does not apply to {}", what)));
        }
        Ok(self.expedite)
    }
}

/// Split `270;L;X` into `270` and its attached modifiers
fn split_attached(token: &str) -> Result<(&str, Modifiers), CommandError> {
    let mut parts = token.split(';');
    let head = parts.next().unwrap_or_default();
    let mut mods = Modifiers::default();
    for part in parts {
        if part.is_empty() {
            return Err(syntax(format!("empty modifier in '{}'", token)));
        }
        mods.add(part)?;
    }
    Ok((head, mods))
}

struct Parser<'a> {
    tokens: &'a [String],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek_at(&self, offset: usize) -> Option<&'a str> {
        self.tokens.get(self.pos + offset).map(String::as_str)
    }

    fn advance(&mut self) -> Option<&'a str> {
        let token = self.peek_at(0)?;
        self.pos += 1;
        Some(token)
    }

    fn argument(&mut self, keyword: &str) -> Result<&'a str, CommandError> {
        self.advance()
            .ok_or_else(|| syntax(format!("'{}' needs an argument", keyword)))
    }

    fn next_command(&mut self) -> Result<Option<RawCommand>, CommandError> {
        let Some(token) = self.advance() else {
            return Ok(None);
        };
        let (word, keyword_mods) = split_attached(token)?;
        if word.is_empty() {
            return Err(syntax(format!("dangling modifier '{}'", token)));
        }

        let is_kw = is_keyword(word);
        if is_kw && !keyword_mods.is_empty() {
            return Err(syntax(format!(
                "modifiers go after the argument of '{}'",
                word
            )));
        }

        let (kind, arg, mut mods) = match word {
            "A" => ("A", "", Modifiers::default()),
            "C" | "H" | "S" | "L" => {
                let (arg, mods) = split_attached(self.argument(word)?)?;
                if arg.is_empty() || is_keyword(arg) {
                    return Err(syntax(format!("'{}' needs an argument", word)));
                }
                (word, arg, mods)
            }
            _ => ("C", word, keyword_mods),
        };

        self.absorb_trailing_modifiers(&mut mods)?;

        let command = match kind {
            "A" => {
                if !mods.is_empty() {
                    return Err(syntax("abort takes no modifiers"));
                }
                RawCommand::Abort
            }
            "L" => {
                if !mods.is_empty() {
                    return Err(syntax("land takes no modifiers"));
                }
                if !is_identifier(arg) {
                    return Err(syntax(format!("bad runway '{}'", arg)));
                }
                RawCommand::Land {
                    runway: arg.to_string(),
                }
            }
            "S" => {
                let knots = parse_digits(arg)
                    .ok_or_else(|| syntax(format!("bad speed '{}'", arg)))?;
                RawCommand::Speed {
                    knots,
                    expedite: mods.expedite_only("speed")?,
                }
            }
            "H" => {
                if !is_identifier(arg) || arg.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(syntax(format!("bad hold fix '{}'", arg)));
                }
                RawCommand::Hold {
                    fix: arg.to_string(),
                    turn: mods.turn_only("hold")?,
                }
            }
            _ => clearance(arg, mods)?,
        };
        Ok(Some(command))
    }

    /// Standalone `X`/`R` tokens, and `L` when it cannot start a land command
    fn absorb_trailing_modifiers(&mut self, mods: &mut Modifiers) -> Result<(), CommandError> {
        while let Some(next) = self.peek_at(0) {
            let is_modifier = match next {
                "X" | "R" => true,
                "L" => self.peek_at(1).map_or(true, is_keyword),
                _ => false,
            };
            if !is_modifier {
                break;
            }
            mods.add(next)?;
            self.pos += 1;
        }
        Ok(())
    }
}

/// Heading, altitude or waypoint, decided by the shape of the argument
fn clearance(arg: &str, mut mods: Modifiers) -> Result<RawCommand, CommandError> {
    // 090R / 270L shorthand
    let (digits, suffix) = match arg.as_bytes() {
        [a, b, c, s @ (b'L' | b'R')]
            if a.is_ascii_digit() && b.is_ascii_digit() && c.is_ascii_digit() =>
        {
            (&arg[..3], Some(if *s == b'L' { "L" } else { "R" }))
        }
        _ => (arg, None),
    };
    if let Some(suffix) = suffix {
        mods.add(suffix)?;
    }

    if digits.bytes().all(|b| b.is_ascii_digit()) {
        return match digits.len() {
            3 => {
                let value = parse_digits(digits)
                    .ok_or_else(|| syntax(format!("bad heading '{}'", digits)))?;
                if value > 360 {
                    return Err(syntax(format!("heading {} is not 000-360", digits)));
                }
                Ok(RawCommand::Heading {
                    heading: f64::from(value % 360),
                    turn: mods.turn_only("a heading")?,
                })
            }
            1 | 2 => {
                let thousands = parse_digits(digits)
                    .ok_or_else(|| syntax(format!("bad altitude '{}'", digits)))?;
                Ok(RawCommand::Altitude {
                    thousands,
                    expedite: mods.expedite_only("an altitude")?,
                })
            }
            _ => Err(syntax(format!(
                "'{}' is neither a heading nor an altitude",
                digits
            ))),
        };
    }

    if !is_identifier(arg) {
        return Err(syntax(format!("bad waypoint '{}'", arg)));
    }
    Ok(RawCommand::Waypoint {
        name: arg.to_string(),
        turn: mods.turn_only("a waypoint")?,
    })
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric())
}
