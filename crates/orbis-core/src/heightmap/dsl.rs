//! Parser for the line-oriented terrain-shaping DSL.
//!
//! One operation per line, whitespace-separated tokens, `#` starts a
//! comment, opcodes are case-insensitive. Numeric arguments are literals
//! or `min-max` ranges (resolved uniformly at execution time); meter
//! tokens may carry a trailing `m`, percent tokens a trailing `%`.

use crate::error::DslError;

/// Unit suffix carried by a numeric token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suffix {
    /// Bare number: shape units for heights, percent for coordinates.
    None,
    Meters,
    Percent,
}

/// A literal or uniform range, with its suffix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub lo: f64,
    pub hi: f64,
    pub suffix: Suffix,
}

impl Quantity {
    pub fn literal(value: f64) -> Self {
        Self { lo: value, hi: value, suffix: Suffix::None }
    }
}

/// Band selector for `Add` / `Multiply`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BandSelector {
    Land,
    Water,
    All,
    /// Explicit signed-meter interval.
    Range { min_m: f64, max_m: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// One parsed shaping operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeOp {
    Hill { count: Quantity, height: Quantity, x: Quantity, y: Quantity },
    Pit { count: Quantity, depth: Quantity, x: Quantity, y: Quantity },
    Range { count: Quantity, height: Quantity, x: Quantity, y: Quantity },
    Trough { count: Quantity, depth: Quantity, x: Quantity, y: Quantity },
    Mask { factor: f64 },
    Strait { width: Quantity, orientation: Orientation },
    Add { delta: Quantity, band: BandSelector },
    Multiply { factor: Quantity, band: BandSelector },
    Smooth { strength: f64 },
    Invert { probability: f64, axis: Axis },
}

/// Parse a whole script. Fails on the first malformed line.
pub fn parse(script: &str) -> Result<Vec<ShapeOp>, DslError> {
    let mut ops = Vec::new();
    for (idx, raw) in script.lines().enumerate() {
        let line_no = idx + 1;
        let line = match raw.find('#') {
            Some(pos) => &raw[..pos],
            None => raw,
        };
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        ops.push(parse_line(line_no, &tokens)?);
    }
    Ok(ops)
}

fn parse_line(line: usize, tokens: &[&str]) -> Result<ShapeOp, DslError> {
    let opcode = tokens[0].to_ascii_lowercase();
    let args = &tokens[1..];
    match opcode.as_str() {
        "hill" => {
            let [count, height, x, y] = quad(line, "Hill", args)?;
            Ok(ShapeOp::Hill { count, height, x, y })
        }
        "pit" => {
            let [count, depth, x, y] = quad(line, "Pit", args)?;
            Ok(ShapeOp::Pit { count, depth, x, y })
        }
        "range" => {
            let [count, height, x, y] = quad(line, "Range", args)?;
            Ok(ShapeOp::Range { count, height, x, y })
        }
        "trough" => {
            let [count, depth, x, y] = quad(line, "Trough", args)?;
            Ok(ShapeOp::Trough { count, depth, x, y })
        }
        "mask" => {
            need(line, "Mask", 1, args.len())?;
            let q = parse_quantity(line, args[0])?;
            Ok(ShapeOp::Mask { factor: q.lo })
        }
        "strait" => {
            need(line, "Strait", 2, args.len())?;
            let width = parse_quantity(line, args[0])?;
            let orientation = match args[1].to_ascii_lowercase().as_str() {
                "horizontal" => Orientation::Horizontal,
                "vertical" => Orientation::Vertical,
                _ => {
                    return Err(DslError::BadOrientation { line, token: args[1].to_string() });
                }
            };
            Ok(ShapeOp::Strait { width, orientation })
        }
        "add" => {
            need(line, "Add", 1, args.len())?;
            let delta = parse_quantity(line, args[0])?;
            let band = parse_band(line, args.get(1).copied())?;
            Ok(ShapeOp::Add { delta, band })
        }
        "multiply" => {
            need(line, "Multiply", 1, args.len())?;
            let factor = parse_quantity(line, args[0])?;
            let band = parse_band(line, args.get(1).copied())?;
            Ok(ShapeOp::Multiply { factor, band })
        }
        "smooth" => {
            let strength = match args.first() {
                Some(tok) => parse_quantity(line, tok)?.lo,
                None => 2.0,
            };
            Ok(ShapeOp::Smooth { strength })
        }
        "invert" => {
            need(line, "Invert", 2, args.len())?;
            let probability = parse_quantity(line, args[0])?.lo;
            let axis = match args[1].to_ascii_lowercase().as_str() {
                "x" => Axis::X,
                "y" => Axis::Y,
                "both" => Axis::Both,
                _ => return Err(DslError::BadAxis { line, token: args[1].to_string() }),
            };
            Ok(ShapeOp::Invert { probability, axis })
        }
        _ => Err(DslError::UnknownOpcode { line, opcode: tokens[0].to_string() }),
    }
}

fn need(line: usize, opcode: &'static str, expected: usize, got: usize) -> Result<(), DslError> {
    if got < expected {
        Err(DslError::TooFewArguments { line, opcode, expected, got })
    } else {
        Ok(())
    }
}

fn quad(line: usize, opcode: &'static str, args: &[&str]) -> Result<[Quantity; 4], DslError> {
    need(line, opcode, 4, args.len())?;
    Ok([
        parse_quantity(line, args[0])?,
        parse_quantity(line, args[1])?,
        parse_quantity(line, args[2])?,
        parse_quantity(line, args[3])?,
    ])
}

/// Split a range token on the `-` whose left side ends in a digit, dot,
/// closing paren, `m` or `%`, and whose right side starts with a digit,
/// dot or sign. Leading minus signs therefore stay attached to negative
/// literals.
fn split_range(token: &str) -> Option<(&str, &str)> {
    let bytes = token.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'-' || i == 0 || i + 1 >= bytes.len() {
            continue;
        }
        let prev = bytes[i - 1];
        let next = bytes[i + 1];
        let left_ok = prev.is_ascii_digit() || prev == b'.' || prev == b')' || prev == b'm' || prev == b'%';
        let right_ok = next.is_ascii_digit() || next == b'.' || next == b'+' || next == b'-';
        if left_ok && right_ok {
            return Some((&token[..i], &token[i + 1..]));
        }
    }
    None
}

fn parse_number(line: usize, token: &str) -> Result<(f64, Suffix), DslError> {
    let (body, suffix) = if let Some(stripped) = token.strip_suffix('m') {
        (stripped, Suffix::Meters)
    } else if let Some(stripped) = token.strip_suffix('%') {
        (stripped, Suffix::Percent)
    } else {
        (token, Suffix::None)
    };
    let value: f64 = body
        .parse()
        .map_err(|_| DslError::BadNumber { line, token: token.to_string() })?;
    if !value.is_finite() {
        return Err(DslError::BadNumber { line, token: token.to_string() });
    }
    Ok((value, suffix))
}

fn parse_quantity(line: usize, token: &str) -> Result<Quantity, DslError> {
    if let Some((left, right)) = split_range(token) {
        let (lo, lo_suffix) = parse_number(line, left)?;
        let (hi, hi_suffix) = parse_number(line, right)?;
        let suffix = match (lo_suffix, hi_suffix) {
            (s, Suffix::None) => s,
            (Suffix::None, s) => s,
            (a, b) if a == b => a,
            _ => return Err(DslError::BadRange { line, token: token.to_string() }),
        };
        if lo > hi {
            return Err(DslError::BadRange { line, token: token.to_string() });
        }
        Ok(Quantity { lo, hi, suffix })
    } else {
        let (value, suffix) = parse_number(line, token)?;
        Ok(Quantity { lo: value, hi: value, suffix })
    }
}

fn parse_band(line: usize, token: Option<&str>) -> Result<BandSelector, DslError> {
    let Some(token) = token else {
        return Ok(BandSelector::All);
    };
    match token.to_ascii_lowercase().as_str() {
        "land" => Ok(BandSelector::Land),
        "water" => Ok(BandSelector::Water),
        "all" => Ok(BandSelector::All),
        _ => {
            let q = parse_quantity(line, token)?;
            if q.lo == q.hi {
                // A single literal is not a band.
                return Err(DslError::BadBandSelector { line, token: token.to_string() });
            }
            if q.suffix == Suffix::Percent {
                return Err(DslError::BadBandSelector { line, token: token.to_string() });
            }
            Ok(BandSelector::Range { min_m: q.lo, max_m: q.hi })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hill_with_ranges_and_suffixes() {
        let ops = parse("Hill 1 90-100% 44%-56% 40-60").expect("parse");
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            ShapeOp::Hill { count, height, x, y } => {
                assert_eq!((count.lo, count.hi), (1.0, 1.0));
                assert_eq!((height.lo, height.hi), (90.0, 100.0));
                assert_eq!(height.suffix, Suffix::Percent);
                assert_eq!(x.suffix, Suffix::Percent);
                assert_eq!((y.lo, y.hi), (40.0, 60.0));
                assert_eq!(y.suffix, Suffix::None);
            }
            other => panic!("expected Hill, got {other:?}"),
        }
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let ops = parse("# a comment\n\nSmooth 3 # trailing comment\n").expect("parse");
        assert_eq!(ops, vec![ShapeOp::Smooth { strength: 3.0 }]);
    }

    #[test]
    fn opcode_is_case_insensitive() {
        let ops = parse("mULTIPLY 0.8 land").expect("parse");
        assert_eq!(
            ops,
            vec![ShapeOp::Multiply { factor: Quantity::literal(0.8), band: BandSelector::Land }]
        );
    }

    #[test]
    fn negative_meter_range_splits_on_inner_dash() {
        let ops = parse("Add 100m -500m--100m").expect("parse");
        match &ops[0] {
            ShapeOp::Add { delta, band } => {
                assert_eq!((delta.lo, delta.suffix), (100.0, Suffix::Meters));
                assert_eq!(*band, BandSelector::Range { min_m: -500.0, max_m: -100.0 });
            }
            other => panic!("expected Add, got {other:?}"),
        }
    }

    #[test]
    fn unknown_opcode_is_fatal() {
        let err = parse("Hill 1 50 50 50\nErode 3").unwrap_err();
        assert_eq!(err, DslError::UnknownOpcode { line: 2, opcode: "Erode".into() });
    }

    #[test]
    fn too_few_arguments_reports_line_and_counts() {
        let err = parse("Hill 1 50").unwrap_err();
        assert_eq!(
            err,
            DslError::TooFewArguments { line: 1, opcode: "Hill", expected: 4, got: 2 }
        );
    }

    #[test]
    fn malformed_number_is_rejected() {
        assert!(matches!(parse("Smooth abc"), Err(DslError::BadNumber { .. })));
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(matches!(parse("Hill 1 60-40 10 10"), Err(DslError::BadRange { .. })));
    }

    #[test]
    fn unknown_band_selector_is_rejected() {
        assert!(matches!(
            parse("Add 100m everywhere"),
            Err(DslError::BadBandSelector { .. })
        ));
    }

    #[test]
    fn strait_orientation_words() {
        let ops = parse("Strait 2-4 vertical").expect("parse");
        assert_eq!(
            ops,
            vec![ShapeOp::Strait {
                width: Quantity { lo: 2.0, hi: 4.0, suffix: Suffix::None },
                orientation: Orientation::Vertical,
            }]
        );
        assert!(matches!(
            parse("Strait 2 diagonal"),
            Err(DslError::BadOrientation { .. })
        ));
    }

    #[test]
    fn invert_axis_words() {
        let ops = parse("Invert 0.4 both").expect("parse");
        assert_eq!(ops, vec![ShapeOp::Invert { probability: 0.4, axis: Axis::Both }]);
    }
}
