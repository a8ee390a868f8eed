//! Metadata carried by recording file names.
//!
//! Grammar, applied to the file stem (name without directory and final extension):
//!
//! ```text
//! stem     := exercise [ SEP rest ]
//! rest     := ... "-" date-seg
//! date-seg := YYYYMMDD [ anything ]
//! ```
//!
//! `SEP` is the configured exercise separator. The date token is only required when output is
//! routed by date.

use std::path::Path;

use chrono::NaiveDate;

use crate::error::PipelineError;

const DATE_TOKEN_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingName {
    pub file_name: String,
    pub stem: String,
    pub exercise: Option<String>,
}

impl RecordingName {
    pub fn from_path(path: &Path, separator: char) -> Result<Self, PipelineError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| PipelineError::MalformedName {
                file_name: path.display().to_string(),
                reason: "path has no UTF-8 file name".to_string(),
            })?
            .to_string();
        let stem = Path::new(&file_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
            .to_string();

        let exercise = stem
            .split(separator)
            .next()
            .filter(|head| !head.is_empty())
            .map(str::to_string);

        Ok(Self {
            file_name,
            stem,
            exercise,
        })
    }

    /// Eight-digit `YYYYMMDD` token from the last `-` segment of the stem.
    pub fn date_token(&self) -> Result<&str, PipelineError> {
        let segment = self.stem.rsplit('-').next().unwrap_or_default();
        let token = segment
            .get(..DATE_TOKEN_LEN)
            .ok_or_else(|| self.malformed(format!("date segment '{segment}' is shorter than 8 characters")))?;

        if !token.bytes().all(|b| b.is_ascii_digit()) {
            return Err(self.malformed(format!("date token '{token}' is not numeric")));
        }
        NaiveDate::parse_from_str(token, "%Y%m%d")
            .map_err(|err| self.malformed(format!("date token '{token}' is not a calendar date: {err}")))?;

        Ok(token)
    }

    fn malformed(&self, reason: String) -> PipelineError {
        PipelineError::MalformedName {
            file_name: self.file_name.clone(),
            reason,
        }
    }
}
