use crate::error::SubclipError;

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while_m_n};
use nom::character::complete::digit1;
use nom::combinator::{all_consuming, map_opt, map_res, opt, verify};
use nom::error::{convert_error, VerboseError};
use nom::multi::separated_list1;
use nom::sequence::preceded;
use nom::{Err, IResult};

/// Parse a clock offset such as `1:02:03,500`, `2:30` or `45.2` into milliseconds.
pub fn parse_offset(input: &str) -> Result<i64, SubclipError> {
    match all_consuming(offset)(input.trim()) {
        Ok((_, millis)) => Ok(millis),
        Err(Err::Error(err)) | Err(Err::Failure(err)) => {
            let conv = convert_error(input.trim(), err);
            Err(SubclipError::ParseError(format!(
                "Invalid time offset '{}', expected [[H:]M:]S[,mmm]:\n{}",
                input, conv
            )))
        }
        Err(Err::Incomplete(_)) => {
            unreachable!("Incomplete data received by non-streaming parser.")
        }
    }
}

fn offset(input: &str) -> IResult<&str, i64, VerboseError<&str>> {
    let (input, secs) = clock(input)?;
    let (input, millis) = opt(preceded(alt((tag(","), tag("."))), fraction))(input)?;
    let total = secs
        .checked_mul(1000)
        .and_then(|ms| ms.checked_add(millis.unwrap_or(0)))
        .and_then(|ms| i64::try_from(ms).ok());
    match total {
        Some(total) => Ok((input, total)),
        None => Err(Err::Failure(VerboseError {
            errors: vec![(
                input,
                nom::error::VerboseErrorKind::Context("offset out of range"),
            )],
        })),
    }
}

/// `H:M:S`, `M:S` or `S`, as whole seconds. Only the leading field may exceed 59.
fn clock(input: &str) -> IResult<&str, u64, VerboseError<&str>> {
    let fields = verify(separated_list1(tag(":"), clock_field), |f: &Vec<u64>| {
        f.len() <= 3 && f.iter().skip(1).all(|v| *v < 60)
    });
    map_opt(fields, |f: Vec<u64>| {
        f.iter()
            .try_fold(0u64, |acc, v| acc.checked_mul(60)?.checked_add(*v))
    })(input)
}

fn clock_field(input: &str) -> IResult<&str, u64, VerboseError<&str>> {
    map_res(digit1, |s: &str| s.parse())(input)
}

fn fraction(input: &str) -> IResult<&str, u64, VerboseError<&str>> {
    const MILLIS_MIN: usize = 0;
    const MILLIS_MAX: usize = 3;
    map_res(
        take_while_m_n(MILLIS_MIN, MILLIS_MAX, |c: char| c.is_ascii_digit()),
        |s: &str| {
            // `,5` reads as half a second, so short fields are right-padded to 3 digits.
            format!("{:0<3}", s).parse::<u64>()
        },
    )(input)
}
