//! Foreground console
//!
//! Line-oriented control surface. Each line is parsed into a [`Command`] and
//! run against the shared controller; jumps triggered here block the
//! console until the release, the automation loop runs on its own thread.

use std::io::{BufRead, Write};
use std::str::FromStr;
use std::sync::Arc;

use crate::calibration::{ModelKind, SampleSource};
use crate::controller::{Controller, CycleError};
use crate::game::{Mode, Point, Region};
use crate::{parse_number, InvalidInput};

pub const HELP: &str = "\
commands:
  mode <1-4|manual|capture|auto|hybrid>  switch mode
  jump <cm> | <cm>                       jump a typed distance
  start [x y]                            mark the start point (pointer if omitted)
  end [x y]                              mark the end point (pointer if omitted)
  params <slope> <intercept>             set the fixed model
  model <fixed|fitted>                   choose the model used for jumps
  record <cm> <seconds>                  add a measured calibration sample
  samples                                list samples and the fitted model
  clear                                  drop all samples
  region [left top right bottom]         set the game region (interactive if omitted)
  press <x y>                            set the press point
  go | stop                              arm or disarm automation
  status | help | quit";

/// One console command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Mode(Mode),
    Jump(String),
    Start(Option<Point>),
    End(Option<Point>),
    Params { slope: String, intercept: String },
    Model(ModelKind),
    Record { distance: String, duration: String },
    Samples,
    Clear,
    Region(Option<Region>),
    Press(Point),
    Go,
    Stop,
    Status,
    Help,
    Quit,
}

fn parse_coordinate(text: &str) -> Result<i32, InvalidInput> {
    text.trim()
        .parse()
        .map_err(|_| InvalidInput::NotANumber(text.trim().to_string()))
}

fn parse_point(args: &[&str]) -> Result<Option<Point>, InvalidInput> {
    match args {
        [] => Ok(None),
        [x, y] => Ok(Some(Point::new(parse_coordinate(x)?, parse_coordinate(y)?))),
        [_] => Err(InvalidInput::MissingArgument("y")),
        _ => Err(InvalidInput::OutOfRange {
            name: "point",
            expected: "two coordinates",
            value: args.join(" "),
        }),
    }
}

impl FromStr for Command {
    type Err = InvalidInput;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&name, args)) = words.split_first() else {
            return Err(InvalidInput::MissingArgument("command"));
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "mode" | "m" => {
                let mode = args.first().ok_or(InvalidInput::MissingArgument("mode"))?;
                Command::Mode(mode.parse()?)
            }
            "jump" | "j" => {
                let distance = args.first().ok_or(InvalidInput::MissingArgument("distance"))?;
                Command::Jump(distance.to_string())
            }
            "start" | "z" => Command::Start(parse_point(args)?),
            "end" | "x" => Command::End(parse_point(args)?),
            "params" => match args {
                [slope, intercept, ..] => Command::Params {
                    slope: slope.to_string(),
                    intercept: intercept.to_string(),
                },
                [_] => return Err(InvalidInput::MissingArgument("intercept")),
                [] => return Err(InvalidInput::MissingArgument("slope")),
            },
            "model" => match args.first().map(|s| s.to_ascii_lowercase()).as_deref() {
                Some("fixed") => Command::Model(ModelKind::Fixed),
                Some("fitted" | "fit") => Command::Model(ModelKind::Fitted),
                Some(other) => {
                    return Err(InvalidInput::OutOfRange {
                        name: "model",
                        expected: "fixed or fitted",
                        value: other.to_string(),
                    })
                }
                None => return Err(InvalidInput::MissingArgument("model")),
            },
            "record" => match args {
                [distance, duration, ..] => Command::Record {
                    distance: distance.to_string(),
                    duration: duration.to_string(),
                },
                [_] => return Err(InvalidInput::MissingArgument("duration")),
                [] => return Err(InvalidInput::MissingArgument("distance")),
            },
            "samples" => Command::Samples,
            "clear" => Command::Clear,
            "region" => match args {
                [] => Command::Region(None),
                [left, top, right, bottom] => Command::Region(Some(Region::new(
                    parse_coordinate(left)?,
                    parse_coordinate(top)?,
                    parse_coordinate(right)?,
                    parse_coordinate(bottom)?,
                )?)),
                _ => return Err(InvalidInput::MissingArgument("left top right bottom")),
            },
            "press" => match parse_point(args)? {
                Some(point) => Command::Press(point),
                None => return Err(InvalidInput::MissingArgument("x y")),
            },
            "go" | "auto" => Command::Go,
            "stop" => Command::Stop,
            "status" | "s" => Command::Status,
            "help" | "h" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            // A bare number is a manual jump
            other if parse_number(other).is_ok() => Command::Jump(other.to_string()),
            other => return Err(InvalidInput::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }
}

/// What the console should do after a command
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Quit,
}

/// Run one command against the controller
pub fn execute(controller: &Arc<Controller>, command: Command) -> Result<Reply, CycleError> {
    let text = match command {
        Command::Mode(mode) => {
            controller.set_mode(mode);
            controller.status()
        }
        Command::Jump(distance) => format!("jumped {}", controller.manual_jump(&distance)?),
        Command::Start(point) => {
            let point = match point {
                Some(point) => point,
                None => controller.pointer_position()?,
            };
            controller.mark_start(point);
            controller.status()
        }
        Command::End(point) => {
            let point = match point {
                Some(point) => point,
                None => controller.pointer_position()?,
            };
            match controller.mark_end(point)? {
                Some(report) => format!("jumped {}", report),
                None => controller.status(),
            }
        }
        Command::Params { slope, intercept } => {
            format!("fixed model: {}", controller.set_fixed_model(&slope, &intercept)?)
        }
        Command::Model(kind) => format!("using {}", controller.select_model(kind)?),
        Command::Record { distance, duration } => match controller.record_sample(&distance, &duration)? {
            Some(fit) => format!(
                "fitted {} (rms {:.4}s over {} samples)",
                fit.model, fit.rms_residual, fit.sample_count
            ),
            None => format!("{} sample(s), need 2 distinct distances to fit", controller.samples().len()),
        },
        Command::Samples => format_samples(controller),
        Command::Clear => {
            controller.clear_samples();
            controller.status()
        }
        Command::Region(Some(region)) => {
            controller.set_region(region);
            controller.status()
        }
        Command::Region(None) => format!("game region: {}", controller.calibrate_region()?),
        Command::Press(point) => {
            controller.set_press_point(point);
            controller.status()
        }
        Command::Go => {
            controller.start_automation()?;
            controller.status()
        }
        Command::Stop => {
            if controller.stop_automation() {
                controller.status()
            } else {
                "automation is not running".to_string()
            }
        }
        Command::Status => controller.snapshot().to_string(),
        Command::Help => HELP.to_string(),
        Command::Quit => return Ok(Reply::Quit),
    };
    Ok(Reply::Text(text))
}

fn format_samples(controller: &Controller) -> String {
    let samples = controller.samples();
    if samples.is_empty() {
        return "no samples".to_string();
    }
    let mut lines: Vec<String> = samples
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            let source = match sample.source {
                SampleSource::Measured => "measured",
                SampleSource::Detected => "detected",
            };
            format!(
                "#{:<3} {:>7.2} cm  {:>6.3} s  {}",
                i + 1,
                sample.distance_cm,
                sample.duration_secs,
                source
            )
        })
        .collect();
    match controller.fit_report() {
        Some(fit) => lines.push(format!("fitted: {} (rms {:.4}s)", fit.model, fit.rms_residual)),
        None => lines.push("fitted: none".to_string()),
    }
    lines.join("\n")
}

/// Read commands until `quit` or end of input
pub fn run_console(
    controller: &Arc<Controller>,
    input: impl BufRead,
    mut output: impl Write,
) -> std::io::Result<()> {
    writeln!(output, "{}", controller.status())?;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let reply = line
            .parse::<Command>()
            .map_err(CycleError::from)
            .and_then(|command| execute(controller, command));
        match reply {
            Ok(Reply::Text(text)) => writeln!(output, "{}", text)?,
            Ok(Reply::Quit) => break,
            Err(e) => writeln!(output, "error: {}", e)?,
        }
    }
    Ok(())
}
