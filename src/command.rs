use std::str::FromStr;

use crate::errors::{BridgeError, Result};

/// One decoded control-channel command.
///
/// Verbs and argument shapes are the Tello SDK's. Distances are in
/// centimetres, angles in degrees, `rc` channel values nominally in
/// -100..100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// `command` - enter SDK mode and register the sender as controller.
    EnterSdkMode,
    /// `takeoff`
    TakeOff,
    /// `land`
    Land,
    /// `streamon`
    StreamOn,
    /// `streamoff`
    StreamOff,
    /// `up x` - climb x centimetres.
    Up { distance: f32 },
    /// `down x`
    Down { distance: f32 },
    /// `left x`
    Left { distance: f32 },
    /// `right x`
    Right { distance: f32 },
    /// `forward x`
    Forward { distance: f32 },
    /// `back x`
    Back { distance: f32 },
    /// `cw x` - turn clockwise x degrees.
    TurnClockwise { degrees: f32 },
    /// `ccw x`
    TurnCounterClockwise { degrees: f32 },
    /// `rc a b c d` - the four continuous control channels: roll, pitch,
    /// throttle, yaw.
    RemoteControl {
        left_right: f32,
        forwards_backwards: f32,
        up_down: f32,
        yaw: f32,
    },
}

impl Command {
    /// Parses one ASCII command line.
    ///
    /// Argument counts are strict and every argument must parse as a
    /// number; value ranges are not enforced.
    pub fn parse(line: &str) -> Result<Command> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or_else(|| parse_error("empty command"))?;
        let args: Vec<&str> = words.collect();

        let command = match verb {
            "command" => no_args(verb, Command::EnterSdkMode, &args)?,
            "takeoff" => no_args(verb, Command::TakeOff, &args)?,
            "land" => no_args(verb, Command::Land, &args)?,
            "streamon" => no_args(verb, Command::StreamOn, &args)?,
            "streamoff" => no_args(verb, Command::StreamOff, &args)?,
            "up" => Command::Up { distance: single(verb, &args)? },
            "down" => Command::Down { distance: single(verb, &args)? },
            "left" => Command::Left { distance: single(verb, &args)? },
            "right" => Command::Right { distance: single(verb, &args)? },
            "forward" => Command::Forward { distance: single(verb, &args)? },
            "back" => Command::Back { distance: single(verb, &args)? },
            "cw" => Command::TurnClockwise { degrees: single(verb, &args)? },
            "ccw" => Command::TurnCounterClockwise { degrees: single(verb, &args)? },
            "rc" => match args.as_slice() {
                &[a, b, c, d] => Command::RemoteControl {
                    left_right: value_as(a)?,
                    forwards_backwards: value_as(b)?,
                    up_down: value_as(c)?,
                    yaw: value_as(d)?,
                },
                _ => {
                    return Err(parse_error(&format!(
                        "rc wants 4 arguments, got {}",
                        args.len()
                    )))
                }
            },
            _ => return Err(parse_error(&format!("unknown command {verb:?}"))),
        };

        Ok(command)
    }
}

fn no_args(verb: &str, command: Command, args: &[&str]) -> Result<Command> {
    if args.is_empty() {
        Ok(command)
    } else {
        Err(parse_error(&format!(
            "{verb} takes no arguments, got {}",
            args.len()
        )))
    }
}

fn single(verb: &str, args: &[&str]) -> Result<f32> {
    match args {
        &[value] => value_as(value),
        _ => Err(parse_error(&format!(
            "{verb} wants 1 argument, got {}",
            args.len()
        ))),
    }
}

fn value_as<T: FromStr>(s: &str) -> Result<T> {
    s.parse::<T>()
        .map_err(|_| BridgeError::ParseError { msg: s.to_string() })
}

fn parse_error(msg: &str) -> BridgeError {
    BridgeError::ParseError { msg: msg.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case("command", Command::EnterSdkMode)]
    #[case("takeoff", Command::TakeOff)]
    #[case("land", Command::Land)]
    #[case("streamon", Command::StreamOn)]
    #[case("streamoff", Command::StreamOff)]
    #[case("up 100", Command::Up { distance: 100.0 })]
    #[case("down 20", Command::Down { distance: 20.0 })]
    #[case("left 50", Command::Left { distance: 50.0 })]
    #[case("right 50", Command::Right { distance: 50.0 })]
    #[case("forward 500", Command::Forward { distance: 500.0 })]
    #[case("back 30", Command::Back { distance: 30.0 })]
    #[case("cw 90", Command::TurnClockwise { degrees: 90.0 })]
    #[case("ccw 45", Command::TurnCounterClockwise { degrees: 45.0 })]
    #[case("rc -100 0 50 100", Command::RemoteControl {
        left_right: -100.0,
        forwards_backwards: 0.0,
        up_down: 50.0,
        yaw: 100.0,
    })]
    fn parses_valid_commands(#[case] line: &str, #[case] expected: Command) {
        assert_eq!(Command::parse(line).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("flip l")]
    #[case("battery?")]
    #[case("up")]
    #[case("up 10 20")]
    #[case("up ten")]
    #[case("takeoff now")]
    #[case("rc 1 2 3")]
    #[case("rc 1 2 3 4 5")]
    #[case("rc a b c d")]
    fn rejects_malformed_commands(#[case] line: &str) {
        assert!(Command::parse(line).is_err());
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        assert_eq!(Command::parse(" land \r\n").unwrap(), Command::Land);
        assert_eq!(
            Command::parse("up\t42").unwrap(),
            Command::Up { distance: 42.0 }
        );
    }

    #[test]
    fn distances_may_be_decimal() {
        assert_eq!(
            Command::parse("forward 42.5").unwrap(),
            Command::Forward { distance: 42.5 }
        );
    }
}
