use std::{path::PathBuf, str::FromStr};

use crate::scan::{Direction, MeasurementRequest, ScanRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormKind {
    #[default]
    Move,
    MoveAndMeasure,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Please fill in the {0} field")]
    MissingField(&'static str),

    #[error("'{value}' is not a valid {field}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("The number of steps must be a positive integer")]
    NonPositiveSteps,

    #[error("Please choose a file to save the measurements to")]
    MissingSavePath,
}

/// Raw operator input as typed into the form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormInput {
    pub target_mm: String,
    pub steps: String,
    pub direction: Direction,
    pub wavelength_nm: String,
    pub save_path: Option<PathBuf>,
}

impl Default for FormInput {
    fn default() -> Self {
        Self {
            target_mm: String::new(),
            steps: String::new(),
            direction: Direction::Forward,
            wavelength_nm: "1064".to_string(),
            save_path: None,
        }
    }
}

fn parse_field<T: FromStr>(field: &'static str, raw: &str) -> Result<T, InputError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(InputError::MissingField(field));
    }
    value.parse().map_err(|_| InputError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

impl FormInput {
    /// Checks the fields `kind` needs and builds the scan they describe.
    /// `samples` is the number of power readings taken per step.
    pub fn validate(&self, kind: FormKind, samples: usize) -> Result<ScanRequest, InputError> {
        let target_mm: f64 = parse_field("target position", &self.target_mm)?;
        if !target_mm.is_finite() {
            return Err(InputError::InvalidNumber {
                field: "target position",
                value: self.target_mm.trim().to_string(),
            });
        }

        let steps: i64 = parse_field("number of steps", &self.steps)?;
        let steps = u32::try_from(steps)
            .ok()
            .filter(|&n| n > 0)
            .ok_or(InputError::NonPositiveSteps)?;

        let measurement = match kind {
            FormKind::Move => None,
            FormKind::MoveAndMeasure => {
                let wavelength_nm: f64 = parse_field("wavelength", &self.wavelength_nm)?;
                if !(wavelength_nm > 0.0) || !wavelength_nm.is_finite() {
                    return Err(InputError::InvalidNumber {
                        field: "wavelength",
                        value: self.wavelength_nm.trim().to_string(),
                    });
                }

                let output = self
                    .save_path
                    .clone()
                    .filter(|p| !p.as_os_str().is_empty())
                    .ok_or(InputError::MissingSavePath)?;

                Some(MeasurementRequest {
                    wavelength_nm,
                    samples,
                    output,
                })
            }
        };

        Ok(ScanRequest {
            target_mm,
            steps,
            direction: Some(self.direction),
            measurement,
        })
    }
}
