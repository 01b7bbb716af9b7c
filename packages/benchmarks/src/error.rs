use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when parsing JSON text.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JsonError {
    /// The input ended in the middle of a value.
    #[error("unexpected end of JSON input")]
    UnexpectedEnd,

    /// A character that cannot start or continue the current construct.
    #[error("unexpected character {character:?} at byte {position}")]
    UnexpectedCharacter {
        /// The offending character.
        character: char,

        /// Byte offset of the character in the input.
        position: usize,
    },

    /// Text that looked like a number but could not be parsed as one.
    #[error("invalid number '{text}' at byte {position}")]
    InvalidNumber {
        /// The text of the number.
        text: String,

        /// Byte offset of the start of the number in the input.
        position: usize,
    },

    /// A backslash escape sequence that is not valid in a JSON string.
    #[error("invalid escape sequence in string at byte {position}")]
    InvalidEscape {
        /// Byte offset of the backslash in the input.
        position: usize,
    },

    /// A string whose contents are not valid UTF-8.
    #[error("string starting at byte {position} is not valid UTF-8")]
    InvalidUtf8 {
        /// Byte offset of the opening quote in the input.
        position: usize,
    },

    /// A structural token appeared where a different one was required.
    #[error("expected {expected} at byte {position}")]
    Expected {
        /// Description of what was required.
        expected: &'static str,

        /// Byte offset where the requirement was not met.
        position: usize,
    },

    /// Arrays and objects were nested deeper than the parser allows.
    #[error("values nested more than {limit} levels deep at byte {position}")]
    TooDeep {
        /// The deepest nesting the parser accepted.
        limit: usize,

        /// Byte offset of the array or object that went over the limit.
        position: usize,
    },

    /// Non-whitespace input followed the top-level value.
    #[error("unexpected trailing input at byte {position}")]
    TrailingInput {
        /// Byte offset of the first trailing character.
        position: usize,
    },
}

/// Errors that can occur in the haversine generation and summing pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HaversineError {
    /// Reading or writing one of the data files failed.
    #[error("cannot access '{}': {source}", path.display())]
    Io {
        /// The file that could not be accessed.
        path: PathBuf,

        /// The underlying I/O error.
        source: io::Error,
    },

    /// The point file is not valid JSON.
    #[error("invalid point file: {0}")]
    Json(#[from] JsonError),

    /// The point file is valid JSON but does not have the expected shape.
    #[error("invalid point file: {problem}")]
    UnexpectedShape {
        /// A human-readable description of the problem.
        problem: String,
    },

    /// The answer file length is not a whole number of 64-bit floats.
    #[error("answer file length {length} is not a multiple of 8 bytes")]
    AnswerFileLength {
        /// Length of the answer file in bytes.
        length: usize,
    },

    /// The answer file holds a different number of distances than there are pairs.
    #[error("point file has {pairs} pairs but answer file has {answers} distances")]
    AnswerCountMismatch {
        /// Number of pairs in the point file.
        pairs: usize,

        /// Number of distances in the answer file.
        answers: usize,
    },
}

/// A specialized `Result` type for the haversine pipeline, returning [`HaversineError`] as the
/// error value.
pub(crate) type Result<T> = std::result::Result<T, HaversineError>;

impl HaversineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn shape(problem: impl Into<String>) -> Self {
        Self::UnexpectedShape {
            problem: problem.into(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(JsonError: Send, Sync, Debug);
    assert_impl_all!(HaversineError: Send, Sync, Debug);

    #[test]
    fn messages_include_positions() {
        let error = JsonError::UnexpectedCharacter {
            character: 'x',
            position: 12,
        };

        assert_eq!(error.to_string(), "unexpected character 'x' at byte 12");
    }

    #[test]
    fn json_errors_convert_into_haversine_errors() {
        let error: HaversineError = JsonError::UnexpectedEnd.into();

        assert!(matches!(error, HaversineError::Json(JsonError::UnexpectedEnd)));
        assert_eq!(
            error.to_string(),
            "invalid point file: unexpected end of JSON input"
        );
    }
}
