//! Path grammar codec: anchor lists to and from the standard path command
//! language (`M L H V Q C S T Z` and their relative lowercase forms).
//!
//! Decoding is lenient. Unknown commands and malformed numbers are skipped
//! with a `debug!` event and parsing continues, so a damaged path keeps every
//! command that could be understood.

use std::fmt::Write;

use thiserror::Error;
use tracing::debug;

use crate::geometry::Point;
use crate::path::{Anchor, Segment};

/// Tolerance used to decide that a closing curve ends on the subpath start.
const CLOSE_EPSILON: f64 = 1e-9;

/// One closed or open run of anchors, as delimited by `M` in a path string.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Subpath {
    pub anchors: Vec<Anchor>,
    pub closed: bool,
}

/// Serialize anchors as a path string.
///
/// Each segment becomes `L`, `Q` or `C` depending on which control points its
/// two anchors carry. A closed path with at least two anchors ends in `Z`,
/// preceded by an explicit closing curve when the last/first anchors carry
/// control points for that segment. A last anchor lying on the first gets an
/// explicit zero-length `L` so that [`decode`] keeps it.
pub fn encode(anchors: &[Anchor], closed: bool) -> String {
    let Some(first) = anchors.first() else {
        return String::new();
    };
    let mut out = String::new();
    let _ = write!(out, "M {} {}", num(first.x), num(first.y));
    for pair in anchors.windows(2) {
        push_segment(&mut out, Segment::between(&pair[0], &pair[1]));
    }
    if closed && anchors.len() >= 2 {
        let last = &anchors[anchors.len() - 1];
        let closing = Segment::between(last, first);
        if !matches!(closing, Segment::Line(..))
            || last.point().approx_eq(first.point(), CLOSE_EPSILON)
        {
            push_segment(&mut out, closing);
        }
        out.push_str(" Z");
    }
    out
}

/// Serialize several subpaths into one path string.
pub fn encode_subpaths(subpaths: &[Subpath]) -> String {
    subpaths
        .iter()
        .filter(|s| !s.anchors.is_empty())
        .map(|s| encode(&s.anchors, s.closed))
        .collect::<Vec<_>>()
        .join(" ")
}

fn push_segment(out: &mut String, seg: Segment) {
    let _ = match seg {
        Segment::Line(_, p) => write!(out, " L {} {}", num(p.x), num(p.y)),
        Segment::Quad(_, c, p) => write!(
            out,
            " Q {} {} {} {}",
            num(c.x),
            num(c.y),
            num(p.x),
            num(p.y)
        ),
        Segment::Cubic(_, c1, c2, p) => write!(
            out,
            " C {} {} {} {} {} {}",
            num(c1.x),
            num(c1.y),
            num(c2.x),
            num(c2.y),
            num(p.x),
            num(p.y)
        ),
    };
}

/// Shortest decimal form, rounded to 1e-6 so float noise does not leak into
/// documents. Negative zero prints as `0`.
fn num(v: f64) -> String {
    let r = (v * 1e6).round() / 1e6;
    if r == 0.0 { "0".to_string() } else { format!("{r}") }
}

/// Parse a path string into a single anchor list.
///
/// Later `M` commands continue the same list (as a line to the new point),
/// so callers that need separate subpaths use [`decode_subpaths`]. `closed`
/// reports whether the final subpath ended with `Z`.
pub fn decode(d: &str) -> (Vec<Anchor>, bool) {
    let subpaths = decode_subpaths(d);
    let closed = subpaths.last().is_some_and(|s| s.closed);
    let anchors = subpaths.into_iter().flat_map(|s| s.anchors).collect();
    (anchors, closed)
}

/// Parse a path string into its subpaths.
pub fn decode_subpaths(d: &str) -> Vec<Subpath> {
    let mut builder = Builder::default();
    for (cmd, args) in group_commands(&tokenize(d)) {
        builder.apply(cmd, &args);
    }
    builder.finish()
}

#[derive(Debug, Error, PartialEq)]
pub enum PathError {
    #[error("path `{0}` has no subpath with at least two anchors")]
    NothingDrawable(String),
    #[error("path contains a non-finite coordinate")]
    NonFinite,
}

/// Strict front end over [`decode_subpaths`] for callers that need a usable
/// path or an error, such as command-line input. Skipped commands are still
/// tolerated; only an outcome with nothing to draw is rejected.
pub fn parse(d: &str) -> Result<Vec<Subpath>, PathError> {
    let subpaths = decode_subpaths(d);
    if subpaths
        .iter()
        .any(|s| s.anchors.iter().any(|a| !a.is_finite()))
    {
        return Err(PathError::NonFinite);
    }
    if !subpaths.iter().any(|s| s.anchors.len() >= 2) {
        let shown: String = d.chars().take(40).collect();
        return Err(PathError::NothingDrawable(shown));
    }
    Ok(subpaths)
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Token {
    Cmd(char),
    Num(f64),
}

fn tokenize(d: &str) -> Vec<Token> {
    let bytes = d.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_whitespace() || c == ',' {
            i += 1;
        } else if c.is_ascii_digit() || c == '.' || c == '-' || c == '+' {
            match scan_number(bytes, i) {
                Some((value, next)) => {
                    tokens.push(Token::Num(value));
                    i = next;
                }
                None => {
                    debug!(offset = i, "skipping malformed number in path data");
                    i += 1;
                }
            }
        } else if c.is_ascii_alphabetic() {
            tokens.push(Token::Cmd(c));
            i += 1;
        } else {
            // Multi-byte or punctuation noise: skip the whole UTF-8 char.
            let width = d[i..].chars().next().map_or(1, char::len_utf8);
            debug!(offset = i, "skipping unexpected character in path data");
            i += width;
        }
    }
    tokens
}

/// Scan one number starting at `start`. Handles sign, fraction, exponent and
/// the compact `.5.5` form (the second dot starts a new number).
fn scan_number(bytes: &[u8], start: usize) -> Option<(f64, usize)> {
    let mut i = start;
    if matches!(bytes.get(i), Some(b'+' | b'-')) {
        i += 1;
    }
    let int_start = i;
    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    let mut digits = i - int_start;
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        let frac_start = i;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        digits += i - frac_start;
    }
    if digits == 0 {
        return None;
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_start = j;
        while bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    let text = std::str::from_utf8(&bytes[start..i]).ok()?;
    text.parse::<f64>().ok().map(|v| (v, i))
}

fn group_commands(tokens: &[Token]) -> Vec<(char, Vec<f64>)> {
    let mut groups: Vec<(char, Vec<f64>)> = Vec::new();
    for token in tokens {
        match *token {
            Token::Cmd(c) => groups.push((c, Vec::new())),
            Token::Num(v) => match groups.last_mut() {
                Some((_, args)) => args.push(v),
                None => debug!(value = v, "skipping number before first command"),
            },
        }
    }
    groups
}

fn arity(cmd: char) -> Option<usize> {
    match cmd.to_ascii_uppercase() {
        'M' | 'L' | 'T' => Some(2),
        'H' | 'V' => Some(1),
        'Q' | 'S' => Some(4),
        'C' => Some(6),
        'Z' => Some(0),
        _ => None,
    }
}

#[derive(Default)]
struct Builder {
    done: Vec<Subpath>,
    current: Option<Subpath>,
    cursor: Point,
    start: Point,
    /// Control point of the previous Q/T, for reflection by T.
    last_quad: Option<Point>,
    last_was_curve: bool,
}

impl Builder {
    fn apply(&mut self, cmd: char, args: &[f64]) {
        let Some(n) = arity(cmd) else {
            debug!(command = %cmd, args = args.len(), "skipping unknown path command");
            return;
        };
        let relative = cmd.is_ascii_lowercase();
        let upper = cmd.to_ascii_uppercase();
        if n == 0 {
            self.close();
            return;
        }
        if args.len() % n != 0 {
            debug!(command = %cmd, args = args.len(), "ignoring trailing incomplete arguments");
        }
        for (i, chunk) in args.chunks_exact(n).enumerate() {
            // Extra coordinate pairs after a moveto are implicit linetos.
            let op = if upper == 'M' && i > 0 { 'L' } else { upper };
            self.step(op, relative, chunk);
        }
    }

    fn abs(&self, relative: bool, x: f64, y: f64) -> Point {
        if relative {
            Point::new(self.cursor.x + x, self.cursor.y + y)
        } else {
            Point::new(x, y)
        }
    }

    fn step(&mut self, op: char, relative: bool, a: &[f64]) {
        match op {
            'M' => {
                let p = self.abs(relative, a[0], a[1]);
                self.move_to(p);
            }
            'L' => {
                let p = self.abs(relative, a[0], a[1]);
                self.line_to(p);
            }
            'H' => {
                let x = if relative { self.cursor.x + a[0] } else { a[0] };
                self.line_to(Point::new(x, self.cursor.y));
            }
            'V' => {
                let y = if relative { self.cursor.y + a[0] } else { a[0] };
                self.line_to(Point::new(self.cursor.x, y));
            }
            'Q' => {
                let c = self.abs(relative, a[0], a[1]);
                let p = self.abs(relative, a[2], a[3]);
                self.quad_to(c, p);
            }
            'T' => {
                // Without a previous quadratic control the reflection is the
                // current point itself.
                let c = self
                    .last_quad
                    .map_or(self.cursor, |q| q.reflect_about(self.cursor));
                let p = self.abs(relative, a[0], a[1]);
                self.quad_to(c, p);
            }
            'C' => {
                let c1 = self.abs(relative, a[0], a[1]);
                let c2 = self.abs(relative, a[2], a[3]);
                let p = self.abs(relative, a[4], a[5]);
                self.cubic_to(c1, c2, p);
            }
            'S' => {
                // Reflect the previous anchor's incoming control; fall back
                // to the current point when it has none.
                let c1 = self
                    .last_anchor()
                    .and_then(|prev| prev.cp1)
                    .map_or(self.cursor, |c| c.reflect_about(self.cursor));
                let c2 = self.abs(relative, a[0], a[1]);
                let p = self.abs(relative, a[2], a[3]);
                self.cubic_to(c1, c2, p);
            }
            _ => {}
        }
    }

    fn last_anchor(&self) -> Option<&Anchor> {
        self.current.as_ref().and_then(|s| s.anchors.last())
    }

    fn flush(&mut self) {
        if let Some(sub) = self.current.take() {
            if !sub.anchors.is_empty() {
                self.done.push(sub);
            }
        }
    }

    fn move_to(&mut self, p: Point) {
        self.flush();
        self.current = Some(Subpath {
            anchors: vec![Anchor::new(p.x, p.y)],
            closed: false,
        });
        self.cursor = p;
        self.start = p;
        self.last_quad = None;
        self.last_was_curve = false;
    }

    /// Drawing without a preceding moveto (or right after `Z`) starts a new
    /// subpath at the current point.
    fn ensure_current(&mut self) -> &mut Subpath {
        if self.current.is_none() {
            let p = self.cursor;
            self.start = p;
            self.current = Some(Subpath {
                anchors: vec![Anchor::new(p.x, p.y)],
                closed: false,
            });
        }
        self.current.get_or_insert_with(Subpath::default)
    }

    fn line_to(&mut self, p: Point) {
        self.ensure_current().anchors.push(Anchor::new(p.x, p.y));
        self.cursor = p;
        self.last_quad = None;
        self.last_was_curve = false;
    }

    fn quad_to(&mut self, c: Point, p: Point) {
        let sub = self.ensure_current();
        if let Some(prev) = sub.anchors.last_mut() {
            prev.cp2 = Some(c);
        }
        sub.anchors.push(Anchor::new(p.x, p.y));
        self.cursor = p;
        self.last_quad = Some(c);
        self.last_was_curve = true;
    }

    fn cubic_to(&mut self, c1: Point, c2: Point, p: Point) {
        let sub = self.ensure_current();
        if let Some(prev) = sub.anchors.last_mut() {
            prev.cp2 = Some(c1);
        }
        sub.anchors.push(Anchor::with_controls(p.x, p.y, Some(c2), None));
        self.cursor = p;
        self.last_quad = None;
        self.last_was_curve = true;
    }

    fn close(&mut self) {
        let start = self.start;
        let last_was_curve = self.last_was_curve;
        if let Some(sub) = self.current.as_mut() {
            let on_start = |a: &Anchor| a.point().approx_eq(start, CLOSE_EPSILON);
            let n = sub.anchors.len();
            if n > 2 && on_start(&sub.anchors[n - 1]) {
                if last_was_curve {
                    // A closing curve that lands on the start point is folded
                    // back into the first anchor.
                    if let Some(dup) = sub.anchors.pop() {
                        if let (Some(first), Some(cp1)) = (sub.anchors.first_mut(), dup.cp1) {
                            first.cp1 = Some(cp1);
                        }
                    }
                } else if on_start(&sub.anchors[n - 2]) {
                    // Zero-length closing line after a vertex already on the
                    // start point.
                    sub.anchors.pop();
                }
            }
            sub.closed = true;
        }
        self.flush();
        self.cursor = start;
        self.last_quad = None;
        self.last_was_curve = false;
    }

    fn finish(mut self) -> Vec<Subpath> {
        self.flush();
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::normalize;

    fn pts(anchors: &[Anchor]) -> Vec<(f64, f64)> {
        anchors.iter().map(|a| (a.x, a.y)).collect()
    }

    fn assert_anchors_close(a: &[Anchor], b: &[Anchor]) {
        assert_eq!(a.len(), b.len(), "{a:?} vs {b:?}");
        let close = |p: Option<Point>, q: Option<Point>| match (p, q) {
            (Some(p), Some(q)) => p.approx_eq(q, 1e-6),
            (None, None) => true,
            _ => false,
        };
        for (x, y) in a.iter().zip(b) {
            assert!(x.point().approx_eq(y.point(), 1e-6), "{x:?} vs {y:?}");
            assert!(close(x.cp1, y.cp1), "cp1 {x:?} vs {y:?}");
            assert!(close(x.cp2, y.cp2), "cp2 {x:?} vs {y:?}");
        }
    }

    #[test]
    fn encodes_plain_rectangle_exactly() {
        let rect = [
            Anchor::new(0.0, 0.0),
            Anchor::new(10.0, 0.0),
            Anchor::new(10.0, 5.5),
            Anchor::new(0.0, 5.5),
        ];
        assert_eq!(encode(&rect, true), "M 0 0 L 10 0 L 10 5.5 L 0 5.5 Z");
        assert_eq!(encode(&rect, false), "M 0 0 L 10 0 L 10 5.5 L 0 5.5");
    }

    #[test]
    fn decodes_closed_square() {
        let (anchors, closed) = decode("M0 0 L10 0 L10 10 L0 10 Z");
        assert!(closed);
        assert_eq!(pts(&anchors), vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        assert!(anchors.iter().all(|a| a.cp1.is_none() && a.cp2.is_none()));
    }

    #[test]
    fn encode_picks_command_per_segment() {
        let anchors = [
            Anchor::with_controls(0.0, 0.0, None, Some(Point::new(1.0, 2.0))),
            Anchor::with_controls(4.0, 0.0, Some(Point::new(3.0, 2.0)), None),
            Anchor::with_controls(8.0, 0.0, Some(Point::new(6.0, -2.0)), None),
            Anchor::new(9.0, 1.0),
        ];
        assert_eq!(
            encode(&anchors, false),
            "M 0 0 C 1 2 3 2 4 0 Q 6 -2 8 0 L 9 1"
        );
    }

    #[test]
    fn closing_curve_is_emitted_before_z() {
        let anchors = [
            Anchor::with_controls(0.0, 0.0, Some(Point::new(-2.0, 3.0)), None),
            Anchor::new(10.0, 0.0),
            Anchor::with_controls(5.0, 8.0, None, Some(Point::new(1.0, 8.0))),
        ];
        let d = encode(&anchors, true);
        assert_eq!(d, "M 0 0 L 10 0 L 5 8 C 1 8 -2 3 0 0 Z");
        let (back, closed) = decode(&d);
        assert!(closed);
        assert_anchors_close(&back, &anchors);
    }

    #[test]
    fn round_trip_mixed_segments() {
        let anchors = vec![
            Anchor::new(1.5, 2.25),
            Anchor::with_controls(10.0, 0.0, Some(Point::new(4.0, -3.0)), Some(Point::new(12.0, 3.0))),
            Anchor::with_controls(10.0, 10.0, Some(Point::new(13.0, 8.0)), None),
            Anchor::with_controls(0.0, 10.0, Some(Point::new(5.0, 14.0)), Some(Point::new(-1.0, 8.0))),
        ];
        for closed in [false, true] {
            let (back, back_closed) = decode(&encode(&anchors, closed));
            assert_eq!(back_closed, closed);
            assert_anchors_close(&back, &normalize(&anchors, closed));
        }
    }

    #[test]
    fn round_trip_two_point_open_line() {
        let anchors = vec![Anchor::new(-3.0, 4.0), Anchor::new(7.125, -1.0)];
        let (back, closed) = decode(&encode(&anchors, false));
        assert!(!closed);
        assert_anchors_close(&back, &anchors);
    }

    #[test]
    fn round_trip_two_point_closed_line() {
        let anchors = vec![Anchor::new(0.0, 0.0), Anchor::new(5.0, 5.0)];
        let d = encode(&anchors, true);
        assert_eq!(d, "M 0 0 L 5 5 Z");
        let (back, closed) = decode(&d);
        assert!(closed);
        assert_anchors_close(&back, &anchors);
    }

    #[test]
    fn curve_ending_on_start_keeps_its_anchor() {
        let anchors = vec![
            Anchor::new(0.0, 0.0),
            Anchor::with_controls(10.0, 0.0, None, Some(Point::new(12.0, 6.0))),
            Anchor::with_controls(0.0, 0.0, Some(Point::new(4.0, 9.0)), None),
        ];
        let d = encode(&anchors, true);
        assert_eq!(d, "M 0 0 L 10 0 C 12 6 4 9 0 0 L 0 0 Z");
        let (back, closed) = decode(&d);
        assert!(closed);
        assert_anchors_close(&back, &anchors);
    }

    #[test]
    fn explicit_line_back_to_start_is_a_vertex() {
        let (anchors, closed) = decode("M0 0 L10 0 L10 10 L0 0 Z");
        assert!(closed);
        assert_eq!(pts(&anchors), vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 0.0)]);
    }

    #[test]
    fn relative_and_axis_commands() {
        let (anchors, closed) = decode("m10 10 h5 v5 H0 V0 l2 2 z");
        assert!(closed);
        assert_eq!(
            pts(&anchors),
            vec![(10.0, 10.0), (15.0, 10.0), (15.0, 15.0), (0.0, 15.0), (0.0, 0.0), (2.0, 2.0)]
        );
    }

    #[test]
    fn implicit_lineto_after_moveto() {
        let (anchors, _) = decode("M 0,0 10,0 10,10");
        assert_eq!(pts(&anchors), vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        let (anchors, _) = decode("m1 1 2 2");
        assert_eq!(pts(&anchors), vec![(1.0, 1.0), (3.0, 3.0)]);
    }

    #[test]
    fn compact_number_forms() {
        let (anchors, _) = decode("M.5.5L-1e1-2.5e-1");
        assert_eq!(pts(&anchors), vec![(0.5, 0.5), (-10.0, -0.25)]);
    }

    #[test]
    fn smooth_cubic_reflects_previous_control() {
        let (anchors, _) = decode("M0 0 C0 10 10 10 10 0 S20 -10 20 0");
        assert_eq!(anchors.len(), 3);
        // Reflection of (10,10) through (10,0).
        assert_eq!(anchors[1].cp2, Some(Point::new(10.0, -10.0)));
        assert_eq!(anchors[2].cp1, Some(Point::new(20.0, -10.0)));
    }

    #[test]
    fn smooth_cubic_without_previous_control_uses_current_point() {
        let (anchors, _) = decode("M0 0 L10 0 S20 10 30 0");
        assert_eq!(anchors[1].cp2, Some(Point::new(10.0, 0.0)));
        assert_eq!(anchors[2].cp1, Some(Point::new(20.0, 10.0)));
    }

    #[test]
    fn smooth_quadratic_chains_reflections() {
        let (anchors, _) = decode("M0 0 Q5 10 10 0 T20 0 t10 0");
        assert_eq!(anchors[0].cp2, Some(Point::new(5.0, 10.0)));
        assert_eq!(anchors[1].cp2, Some(Point::new(15.0, -10.0)));
        assert_eq!(anchors[2].cp2, Some(Point::new(25.0, 10.0)));
        assert_eq!(anchors[3].point(), Point::new(30.0, 0.0));
    }

    #[test]
    fn smooth_quadratic_without_previous_control_uses_current_point() {
        let (anchors, _) = decode("M0 0 L10 0 T20 0");
        assert_eq!(anchors[1].cp2, Some(Point::new(10.0, 0.0)));
    }

    #[test]
    fn unknown_commands_are_skipped() {
        let (anchors, closed) = decode("M0 0 L10 0 A5 5 0 0 1 20 0 X L10 10 Z");
        assert!(closed);
        assert_eq!(pts(&anchors), vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
    }

    #[test]
    fn garbage_input_yields_nothing() {
        let (anchors, closed) = decode("%% ### ,,");
        assert!(anchors.is_empty());
        assert!(!closed);
        assert_eq!(encode(&[], true), "");
    }

    #[test]
    fn subpaths_are_split_on_moveto() {
        let subs = decode_subpaths("M0 0 L1 0 L1 1 Z M5 5 L6 5");
        assert_eq!(subs.len(), 2);
        assert!(subs[0].closed);
        assert!(!subs[1].closed);
        assert_eq!(subs[1].anchors[0].point(), Point::new(5.0, 5.0));
        assert_eq!(
            encode_subpaths(&subs),
            "M 0 0 L 1 0 L 1 1 Z M 5 5 L 6 5"
        );
    }

    #[test]
    fn drawing_after_close_starts_at_subpath_start() {
        let subs = decode_subpaths("M2 2 L4 2 L4 4 Z l1 0");
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[1].anchors[0].point(), Point::new(2.0, 2.0));
        assert_eq!(subs[1].anchors[1].point(), Point::new(3.0, 2.0));
    }

    #[test]
    fn strict_parse_rejects_empty_results() {
        assert!(matches!(parse("M 3 3 Z"), Err(PathError::NothingDrawable(_))));
        assert!(matches!(parse("nonsense"), Err(PathError::NothingDrawable(_))));
        let subs = parse("M0 0 X 9 L5 5").unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].anchors.len(), 2);
    }
}
