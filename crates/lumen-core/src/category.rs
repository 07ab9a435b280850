//! Result categories and record states.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// What kind of generated content a cached result holds.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ResultCategory {
  AssessmentQuestions,
  AssessmentAnalysis,
  ModuleContent,
  Transcript,
  LearningPath,
  CareerAnalysis,
}

impl ResultCategory {
  pub const ALL: [Self; 6] = [
    Self::AssessmentQuestions,
    Self::AssessmentAnalysis,
    Self::ModuleContent,
    Self::Transcript,
    Self::LearningPath,
    Self::CareerAnalysis,
  ];

  /// The string stored in the `result_category` column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::AssessmentQuestions => "assessment_questions",
      Self::AssessmentAnalysis => "assessment_analysis",
      Self::ModuleContent => "module_content",
      Self::Transcript => "transcript",
      Self::LearningPath => "learning_path",
      Self::CareerAnalysis => "career_analysis",
    }
  }
}

impl fmt::Display for ResultCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ResultCategory {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|c| c.as_str() == s)
      .ok_or_else(|| Error::UnknownCategory(s.to_owned()))
  }
}

/// Lifecycle state of a cached result.
///
/// Records are written directly in a terminal state; `Pending` exists so the
/// stored vocabulary can describe an in-flight attempt, but the cache never
/// persists one.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ResultState {
  Pending,
  Completed,
  Failed,
}

impl ResultState {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Completed => "completed",
      Self::Failed => "failed",
    }
  }
}

impl fmt::Display for ResultState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ResultState {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "pending" => Ok(Self::Pending),
      "completed" => Ok(Self::Completed),
      "failed" => Ok(Self::Failed),
      other => Err(Error::UnknownState(other.to_owned())),
    }
  }
}
