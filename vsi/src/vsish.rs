/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::path::PathBuf;
use std::process::Command;

use nom::{
    branch::alt,
    bytes::complete::take_till1,
    character::complete::{
        char, line_ending, multispace0, not_line_ending, space0,
    },
    combinator::{eof, map, opt},
    multi::many0,
    sequence::{pair, terminated},
    Finish, IResult,
};

use crate::{Error, Record, Result, SysInfo, Value};

/// [`SysInfo`] backed by the `vsish` command line tool.
#[derive(Clone, Debug)]
pub struct Vsish {
    binary: PathBuf,
}

impl Vsish {
    pub fn with_binary<P: Into<PathBuf>>(binary: P) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, cmd: &str, path: &str, value: Option<&str>) -> Result<String> {
        let mut command = Command::new(&self.binary);
        command.arg("-e").arg(cmd).arg(path);
        if let Some(value) = value {
            command.arg(value);
        }
        log::debug!("{} -e {} {} {}", self.binary.display(), cmd, path, value.unwrap_or(""));

        let output = command.output()?;
        match output.status.code() {
            Some(0) => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
            code => {
                let message = format!(
                    "{}{}",
                    String::from_utf8_lossy(&output.stderr),
                    String::from_utf8_lossy(&output.stdout)
                );
                match is_not_found(&message) {
                    true => Err(Error::NotFound(path.to_string())),
                    false => Err(Error::NonZeroExitStatus(
                        code,
                        message.trim().to_string(),
                    )),
                }
            }
        }
    }
}

impl SysInfo for Vsish {
    fn list(&self, path: &str) -> Result<Vec<String>> {
        Ok(parse_ls_output(&self.run("ls", path, None)?))
    }

    fn get(&self, path: &str) -> Result<Value> {
        parse_get_output(path, &self.run("get", path, None)?)
    }

    fn set(&self, path: &str, value: &str) -> Result<()> {
        self.run("set", path, Some(value)).map(|_| ())
    }
}

fn is_not_found(message: &str) -> bool {
    let message = message.to_lowercase();
    ["not found", "no such", "extraneous", "does not exist"]
        .iter()
        .any(|pat| message.contains(pat))
}

fn parse_ls_output(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| line.trim().trim_end_matches('/'))
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
        .collect()
}

fn parse_get_output(path: &str, input: &str) -> Result<Value> {
    match Finish::finish(terminated(node_value, pair(multispace0, eof))(input))
    {
        Ok((_, value)) => Ok(value),
        Err(e) => Err(Error::Parse(
            path.to_string(),
            format!(
                "{} at \"{}{}\"",
                e.code.description(),
                e.input.chars().take(10).collect::<String>(),
                if e.input.len() > 10 { "..." } else { "" }
            ),
        )),
    }
}

fn node_value(input: &str) -> IResult<&str, Value> {
    /* Either a bare scalar ("1") or a record:
     *
     * Vmkernel Config Option {
     *    Default value:1
     *    Current value:1
     *    Description:Run the elevator
     * }
     */
    let (input, _) = multispace0(input)?;
    alt((map(record, Value::Record), scalar))(input)
}

fn scalar(input: &str) -> IResult<&str, Value> {
    map(terminated(not_line_ending, opt(line_ending)), Value::parse_scalar)(
        input,
    )
}

fn record(input: &str) -> IResult<&str, Record> {
    let (input, name) =
        terminated(take_till1(|c| c == '{' || c == '\n'), char('{'))(input)?;
    let (input, _) = pair(space0, line_ending)(input)?;
    let (input, fields) = many0(field)(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char('}')(input)?;
    let (input, _) = opt(line_ending)(input)?;
    Ok((
        input,
        Record {
            name: name.trim().to_string(),
            fields: fields.into_iter().collect(),
        },
    ))
}

fn field(input: &str) -> IResult<&str, (String, Value)> {
    /*    Write buffer usage:1048576
     *    stats:elevator stats {
     *       ...
     *    }
     */
    let (input, _) = multispace0(input)?;
    let (input, key) = terminated(
        take_till1(|c| c == ':' || c == '\n' || c == '}'),
        char(':'),
    )(input)?;
    let (input, value) = alt((map(record, Value::Record), scalar))(input)?;
    Ok((input, (key.trim().to_string(), value)))
}
