/*!
Error types raised by the study components.
All public functions return `Result<T, Box<dyn std::error::Error>>`, so a caller that needs to branch on the failure kind can downcast, e.g.
```
use ccstudy::register::same_register;
use ccstudy::study_error::StudyError;

let err = same_register("abc", "abcd", "ACDE").unwrap_err();
assert!(matches!(err.downcast_ref::<StudyError>(), Some(StudyError::LengthMismatch { .. })));
```
*/

use std::fmt;

/// The failure categories for study inputs and scoring.
#[derive(Clone, Debug, PartialEq)]
pub enum StudyError {
    /// A required field (e.g. the template sequence or the target template) is absent
    MissingData {
        template_id: String,
        field: String
    },
    /// A register string does not cover every residue of the reference sequence
    LengthMismatch {
        register_len: usize,
        required_len: usize
    },
    /// A template exposes no offsets in a track that scoring requires
    EmptyTrack {
        template_id: String,
        track: String
    },
    /// A malformed line in one of the flat input files
    DataFormat {
        line_number: usize,
        message: String
    },
    /// A register symbol outside of the heptad alphabet
    InvalidLabel(char)
}

impl fmt::Display for StudyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudyError::MissingData { template_id, field } => {
                write!(f, "Template \"{template_id}\" is missing required field \"{field}\"")
            },
            StudyError::LengthMismatch { register_len, required_len } => {
                write!(f, "Register of length {register_len} does not cover the reference, requires length {required_len}")
            },
            StudyError::EmptyTrack { template_id, track } => {
                write!(f, "Template \"{template_id}\" has no offsets in track \"{track}\"")
            },
            StudyError::DataFormat { line_number, message } => {
                write!(f, "Malformed input at line {line_number}: {message}")
            },
            StudyError::InvalidLabel(label) => {
                write!(f, "Invalid heptad label '{label}', expected one of a-g")
            }
        }
    }
}

impl std::error::Error for StudyError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = StudyError::MissingData { template_id: "1ABC".to_string(), field: "seq".to_string() };
        assert_eq!(err.to_string(), "Template \"1ABC\" is missing required field \"seq\"");

        let err = StudyError::DataFormat { line_number: 3, message: "token \"foo\" has no ':'".to_string() };
        assert_eq!(err.to_string(), "Malformed input at line 3: token \"foo\" has no ':'");
    }

    #[test]
    fn test_boxed_downcast() {
        let boxed: Box<dyn std::error::Error> = Box::new(StudyError::InvalidLabel('z'));
        assert_eq!(boxed.downcast_ref::<StudyError>(), Some(&StudyError::InvalidLabel('z')));
    }
}
