//! A small recursive-descent JSON reader.
//!
//! Written for the haversine pipeline, where parsing is one of the profiled stages. It accepts
//! standard JSON plus trailing commas in arrays and objects.

use cycle_harness::{FRAME_CAPACITY, Profiler, RegionId};

use crate::JsonError;

/// Maximum number of arrays and objects that may be open at the same time.
pub const MAX_NESTING_DEPTH: usize = 128;

/// A parsed JSON value.
///
/// Object members keep their input order. Duplicate keys are kept; lookups find the first.
#[derive(Clone, Debug, PartialEq)]
pub enum Json {
    /// `null`
    Null,

    /// `true` or `false`
    Bool(bool),

    /// Any JSON number.
    Number(f64),

    /// A string with escape sequences resolved.
    String(String),

    /// An array of values.
    Array(Vec<Json>),

    /// An object as an ordered list of members.
    Object(Vec<(String, Json)>),
}

impl Json {
    /// Parses a complete JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a single well-formed JSON value, optionally
    /// surrounded by whitespace, or if it nests deeper than [`MAX_NESTING_DEPTH`].
    pub fn parse(input: &[u8]) -> Result<Self, JsonError> {
        Parser::new(input, MAX_NESTING_DEPTH, None).parse_document()
    }

    /// Parses a complete JSON document, attributing the time spent on every value to the
    /// `parse_value` region of `profiler`.
    ///
    /// The region is entered recursively for nested values, so the nesting limit is lowered
    /// to what fits into the frames the profiler has left.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a single well-formed JSON value, optionally
    /// surrounded by whitespace, or if it nests deeper than the profiler can track.
    ///
    /// # Panics
    ///
    /// Panics if every profiler frame is already in use.
    pub fn parse_profiled(input: &[u8], profiler: &Profiler) -> Result<Self, JsonError> {
        let region = profiler.region("parse_value");

        // The innermost value of `n` nested containers occupies frame `n + 1`.
        let max_depth = FRAME_CAPACITY
            .saturating_sub(profiler.depth())
            .saturating_sub(1)
            .min(MAX_NESTING_DEPTH);

        Parser::new(input, max_depth, Some((profiler, region))).parse_document()
    }

    /// Looks up a member of an object by key.
    ///
    /// Returns `None` if the key is missing or the value is not an object.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Object(members) => members
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// The value as a number, if it is one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(*number),
            _ => None,
        }
    }

    /// The value as a string, if it is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(string) => Some(string),
            _ => None,
        }
    }

    /// The elements of the value, if it is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(elements) => Some(elements),
            _ => None,
        }
    }
}

/// Structural tokens only live inside the parser; callers only ever see values.
#[derive(Debug)]
enum Token {
    Value(Json),
    Comma,
    Colon,
    ObjectEnd,
    ArrayEnd,
}

struct Parser<'a> {
    input: &'a [u8],
    position: usize,

    // Number of arrays and objects currently open.
    depth: usize,
    max_depth: usize,

    profiler: Option<(&'a Profiler, RegionId)>,
}

impl<'a> Parser<'a> {
    fn new(
        input: &'a [u8],
        max_depth: usize,
        profiler: Option<(&'a Profiler, RegionId)>,
    ) -> Self {
        Self {
            input,
            position: 0,
            depth: 0,
            max_depth,
            profiler,
        }
    }

    fn parse_document(mut self) -> Result<Json, JsonError> {
        let (token, position) = self.parse_value()?;

        let Token::Value(value) = token else {
            return Err(JsonError::Expected {
                expected: "a value",
                position,
            });
        };

        self.skip_whitespace();

        if self.position < self.input.len() {
            return Err(JsonError::TrailingInput {
                position: self.position,
            });
        }

        Ok(value)
    }

    /// Reads the token in a value position. This is the profiled unit of work.
    fn parse_value(&mut self) -> Result<(Token, usize), JsonError> {
        let _region = self.profiler.map(|(profiler, region)| profiler.enter(region));

        self.next_token()
    }

    fn next_token(&mut self) -> Result<(Token, usize), JsonError> {
        self.skip_whitespace();

        let start = self.position;
        let byte = self.peek().ok_or(JsonError::UnexpectedEnd)?;

        let token = match byte {
            b'{' => Token::Value(self.parse_nested(start, Self::parse_object)?),
            b'[' => Token::Value(self.parse_nested(start, Self::parse_array)?),
            b'"' => Token::Value(Json::String(self.parse_string()?)),
            b'-' | b'0'..=b'9' => Token::Value(Json::Number(self.parse_number()?)),
            b't' => Token::Value(self.parse_literal("true", Json::Bool(true))?),
            b'f' => Token::Value(self.parse_literal("false", Json::Bool(false))?),
            b'n' => Token::Value(self.parse_literal("null", Json::Null)?),
            b',' => {
                self.advance(1);
                Token::Comma
            }
            b':' => {
                self.advance(1);
                Token::Colon
            }
            b'}' => {
                self.advance(1);
                Token::ObjectEnd
            }
            b']' => {
                self.advance(1);
                Token::ArrayEnd
            }
            other => {
                return Err(JsonError::UnexpectedCharacter {
                    character: char::from(other),
                    position: start,
                });
            }
        };

        Ok((token, start))
    }

    /// Opens an array or object starting at `start` and parses its contents with `parse`.
    fn parse_nested(
        &mut self,
        start: usize,
        parse: fn(&mut Self) -> Result<Json, JsonError>,
    ) -> Result<Json, JsonError> {
        if self.depth >= self.max_depth {
            return Err(JsonError::TooDeep {
                limit: self.max_depth,
                position: start,
            });
        }

        self.depth = self.depth.checked_add(1).expect("bounded by max_depth");
        self.advance(1);

        let value = parse(self)?;

        self.depth = self
            .depth
            .checked_sub(1)
            .expect("every closed container was opened");

        Ok(value)
    }

    fn parse_object(&mut self) -> Result<Json, JsonError> {
        let mut members = Vec::new();

        loop {
            let key = match self.next_token()? {
                (Token::ObjectEnd, _) => break,
                (Token::Value(Json::String(key)), _) => key,
                (_, position) => {
                    return Err(JsonError::Expected {
                        expected: "a string key or '}'",
                        position,
                    });
                }
            };

            match self.next_token()? {
                (Token::Colon, _) => {}
                (_, position) => {
                    return Err(JsonError::Expected {
                        expected: "':'",
                        position,
                    });
                }
            }

            match self.parse_value()? {
                (Token::Value(value), _) => members.push((key, value)),
                (_, position) => {
                    return Err(JsonError::Expected {
                        expected: "a value",
                        position,
                    });
                }
            }

            match self.next_token()? {
                (Token::Comma, _) => {}
                (Token::ObjectEnd, _) => break,
                (_, position) => {
                    return Err(JsonError::Expected {
                        expected: "',' or '}'",
                        position,
                    });
                }
            }
        }

        Ok(Json::Object(members))
    }

    fn parse_array(&mut self) -> Result<Json, JsonError> {
        let mut elements = Vec::new();

        loop {
            match self.parse_value()? {
                (Token::ArrayEnd, _) => break,
                (Token::Value(value), _) => elements.push(value),
                (_, position) => {
                    return Err(JsonError::Expected {
                        expected: "a value or ']'",
                        position,
                    });
                }
            }

            match self.next_token()? {
                (Token::Comma, _) => {}
                (Token::ArrayEnd, _) => break,
                (_, position) => {
                    return Err(JsonError::Expected {
                        expected: "',' or ']'",
                        position,
                    });
                }
            }
        }

        Ok(Json::Array(elements))
    }

    fn parse_string(&mut self) -> Result<String, JsonError> {
        let start = self.position;

        // Opening quote.
        self.advance(1);

        let mut bytes = Vec::new();

        loop {
            let byte = self.peek().ok_or(JsonError::UnexpectedEnd)?;
            let byte_position = self.position;
            self.advance(1);

            match byte {
                b'"' => break,
                b'\\' => {
                    let escape = self.peek().ok_or(JsonError::UnexpectedEnd)?;
                    self.advance(1);

                    let resolved = match escape {
                        b'"' => '"',
                        b'\\' => '\\',
                        b'/' => '/',
                        b'b' => '\u{8}',
                        b'f' => '\u{c}',
                        b'n' => '\n',
                        b'r' => '\r',
                        b't' => '\t',
                        b'u' => self.parse_unicode_escape(byte_position)?,
                        _ => {
                            return Err(JsonError::InvalidEscape {
                                position: byte_position,
                            });
                        }
                    };

                    let mut buffer = [0_u8; 4];
                    bytes.extend_from_slice(resolved.encode_utf8(&mut buffer).as_bytes());
                }
                _ => bytes.push(byte),
            }
        }

        String::from_utf8(bytes).map_err(|_| JsonError::InvalidUtf8 { position: start })
    }

    /// Surrogate pairs are not supported, only code points in the basic multilingual plane.
    fn parse_unicode_escape(&mut self, escape_position: usize) -> Result<char, JsonError> {
        let end = self
            .position
            .checked_add(4)
            .expect("position is bounded by input length");

        let digits = self
            .input
            .get(self.position..end)
            .ok_or(JsonError::UnexpectedEnd)?;

        let code_point = std::str::from_utf8(digits)
            .ok()
            .and_then(|digits| u32::from_str_radix(digits, 16).ok())
            .and_then(char::from_u32)
            .ok_or(JsonError::InvalidEscape {
                position: escape_position,
            })?;

        self.advance(4);

        Ok(code_point)
    }

    fn parse_number(&mut self) -> Result<f64, JsonError> {
        let start = self.position;

        while let Some(byte) = self.peek() {
            if !matches!(byte, b'-' | b'+' | b'.' | b'e' | b'E' | b'0'..=b'9') {
                break;
            }

            self.advance(1);
        }

        let text = self
            .input
            .get(start..self.position)
            .expect("scanned range is within input");

        // Only ASCII bytes were scanned.
        let text = std::str::from_utf8(text).expect("number text is ASCII");

        text.parse::<f64>().map_err(|_| JsonError::InvalidNumber {
            text: text.to_owned(),
            position: start,
        })
    }

    fn parse_literal(&mut self, literal: &'static str, value: Json) -> Result<Json, JsonError> {
        let end = self
            .position
            .checked_add(literal.len())
            .expect("position is bounded by input length");

        match self.input.get(self.position..end) {
            Some(bytes) if bytes == literal.as_bytes() => {
                self.advance(literal.len());
                Ok(value)
            }
            Some(_) => Err(JsonError::Expected {
                expected: literal,
                position: self.position,
            }),
            None => Err(JsonError::UnexpectedEnd),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\n' | b'\r' | b'\t') = self.peek() {
            self.advance(1);
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.position).copied()
    }

    fn advance(&mut self, count: usize) {
        self.position = self
            .position
            .checked_add(count)
            .expect("position is bounded by input length");
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn parses_point_file_layout_with_trailing_commas() {
        // One pair per line, with a trailing comma after the last pair.
        let input = br#"{ "pairs": [
  {"x0":-12.5,"y0":45.25,"x1":100,"y1":-7.125},
  {"x0":0.0,"y0":1e2,"x1":-180,"y1":90},
]}
"#;

        let json = Json::parse(input).unwrap();

        let pairs = json.get("pairs").and_then(Json::as_array).unwrap();
        assert_eq!(pairs.len(), 2);

        let first = pairs.first().unwrap();
        assert_eq!(first.get("x0").and_then(Json::as_f64), Some(-12.5));
        assert_eq!(first.get("y1").and_then(Json::as_f64), Some(-7.125));

        let second = pairs.get(1).unwrap();
        assert_eq!(second.get("y0").and_then(Json::as_f64), Some(100.0));
    }

    #[test]
    fn parses_all_value_kinds() {
        let json = Json::parse(br#"[null, true, false, -3.5, "text", [], {}]"#).unwrap();

        assert_eq!(
            json,
            Json::Array(vec![
                Json::Null,
                Json::Bool(true),
                Json::Bool(false),
                Json::Number(-3.5),
                Json::String("text".to_owned()),
                Json::Array(Vec::new()),
                Json::Object(Vec::new()),
            ])
        );
    }

    #[test]
    fn resolves_string_escapes() {
        let json = Json::parse(r#""a\"b\\c\/d\n\té""#.as_bytes()).unwrap();

        assert_eq!(json.as_str(), Some("a\"b\\c/d\n\té"));
    }

    #[test]
    fn keeps_utf8_strings() {
        let json = Json::parse("\"Pärnu õhtu\"".as_bytes()).unwrap();

        assert_eq!(json.as_str(), Some("Pärnu õhtu"));
    }

    #[test]
    fn lookup_returns_first_duplicate_and_ignores_non_objects() {
        let json = Json::parse(br#"{"k": 1, "k": 2}"#).unwrap();

        assert_eq!(json.get("k").and_then(Json::as_f64), Some(1.0));
        assert!(json.get("missing").is_none());
        assert!(Json::Number(1.0).get("k").is_none());
    }

    #[test]
    fn reports_unexpected_end() {
        assert!(matches!(
            Json::parse(br#"{"a": [1, 2"#),
            Err(JsonError::UnexpectedEnd)
        ));
        assert!(matches!(Json::parse(b"   "), Err(JsonError::UnexpectedEnd)));
        assert!(matches!(
            Json::parse(br#""unterminated"#),
            Err(JsonError::UnexpectedEnd)
        ));
    }

    #[test]
    fn reports_unexpected_character() {
        assert!(matches!(
            Json::parse(b"[1, @]"),
            Err(JsonError::UnexpectedCharacter {
                character: '@',
                position: 4
            })
        ));
    }

    #[test]
    fn reports_invalid_number() {
        let result = Json::parse(b"[1.2.3]");

        assert!(matches!(
            result,
            Err(JsonError::InvalidNumber { ref text, position: 1 }) if text == "1.2.3"
        ));
    }

    #[test]
    fn reports_structural_mistakes() {
        assert!(matches!(
            Json::parse(br#"{"a" 1}"#),
            Err(JsonError::Expected {
                expected: "':'",
                ..
            })
        ));
        assert!(matches!(
            Json::parse(br#"{1: 2}"#),
            Err(JsonError::Expected {
                expected: "a string key or '}'",
                position: 1
            })
        ));
        assert!(matches!(
            Json::parse(b"[1 2]"),
            Err(JsonError::Expected {
                expected: "',' or ']'",
                position: 3
            })
        ));
        assert!(matches!(
            Json::parse(b"]"),
            Err(JsonError::Expected {
                expected: "a value",
                position: 0
            })
        ));
    }

    #[test]
    fn reports_trailing_input() {
        assert!(matches!(
            Json::parse(b"{} x"),
            Err(JsonError::TrailingInput { position: 3 })
        ));
    }

    #[test]
    fn reports_invalid_escape() {
        assert!(matches!(
            Json::parse(br#""\q""#),
            Err(JsonError::InvalidEscape { position: 1 })
        ));
        assert!(matches!(
            Json::parse(br#""\ud800""#),
            Err(JsonError::InvalidEscape { position: 1 })
        ));
    }

    #[test]
    fn reports_misspelled_literal() {
        assert!(matches!(
            Json::parse(b"[tru]"),
            Err(JsonError::Expected {
                expected: "true",
                position: 1
            })
        ));
    }

    fn nested_arrays(depth: usize) -> Vec<u8> {
        let mut input = vec![b'['; depth];
        input.extend(std::iter::repeat_n(b']', depth));
        input
    }

    #[test]
    fn accepts_nesting_up_to_the_limit() {
        let json = Json::parse(&nested_arrays(MAX_NESTING_DEPTH)).unwrap();

        let mut depth = 0;
        let mut value = &json;
        while let Some(elements) = value.as_array() {
            depth += 1;
            match elements.first() {
                Some(inner) => value = inner,
                None => break,
            }
        }

        assert_eq!(depth, MAX_NESTING_DEPTH);
    }

    #[test]
    fn rejects_nesting_beyond_the_limit() {
        assert!(matches!(
            Json::parse(&nested_arrays(MAX_NESTING_DEPTH + 1)),
            Err(JsonError::TooDeep {
                limit: MAX_NESTING_DEPTH,
                position
            }) if position == MAX_NESTING_DEPTH
        ));

        // Far deeper than any stack could recurse.
        assert!(matches!(
            Json::parse(&nested_arrays(200_000)),
            Err(JsonError::TooDeep { .. })
        ));

        let nested_objects = r#"{"a": "#.repeat(1_000);
        assert!(matches!(
            Json::parse(nested_objects.as_bytes()),
            Err(JsonError::TooDeep { .. })
        ));
    }

    #[test]
    fn profiled_parse_limits_nesting_to_free_frames() {
        let profiler = Profiler::new();

        // Every profiler frame can be used when nothing else is active.
        let deepest = FRAME_CAPACITY - 1;
        Json::parse_profiled(&nested_arrays(deepest), &profiler).unwrap();

        assert!(matches!(
            Json::parse_profiled(&nested_arrays(deepest + 1), &profiler),
            Err(JsonError::TooDeep { limit, .. }) if limit == deepest
        ));
        assert_eq!(profiler.depth(), 0);

        // An enclosing region takes one frame away.
        {
            let _parse = profiler.enter_named("parse");

            assert!(matches!(
                Json::parse_profiled(&nested_arrays(deepest), &profiler),
                Err(JsonError::TooDeep { limit, .. }) if limit == deepest - 1
            ));
            assert_eq!(profiler.depth(), 1);
        }

        let report = profiler.report();
        assert!(report.region("parse_value").unwrap().entrance_count() > 0);
    }

    #[test]
    fn profiled_parse_enters_region_per_value_position() {
        let profiler = Profiler::new();

        let json = Json::parse_profiled(br#"{"a": [1, 2]}"#, &profiler).unwrap();

        assert_eq!(json.get("a").and_then(Json::as_array).map(<[Json]>::len), Some(2));

        let report = profiler.report();
        let parse = report.region("parse_value").unwrap();

        // The document, the array and its two elements.
        assert_eq!(parse.entrance_count(), 4);
        assert!(parse.inclusive_cycles() >= parse.exclusive_cycles());
    }
}
