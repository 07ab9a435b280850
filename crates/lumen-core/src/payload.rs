//! Concrete payload shapes for each [`ResultCategory`].
//!
//! The store keeps payloads as JSON; these types give each category a
//! checkable shape at the boundary. [`CategoryPayload`] ties a type to the
//! category it is cached under, so [`crate::ResultCache::fetch_typed`] needs
//! no category argument.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::category::ResultCategory;

/// A Rust type that is cached under exactly one category.
pub trait CategoryPayload: Serialize + DeserializeOwned {
  const CATEGORY: ResultCategory;
}

// ─── Assessment ──────────────────────────────────────────────────────────────

/// A single diagnostic assessment question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentQuestion {
  pub question:       String,
  #[serde(default)]
  pub options:        Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub correct_answer: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subject:        Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub difficulty:     Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssessmentQuestions(pub Vec<AssessmentQuestion>);

impl CategoryPayload for AssessmentQuestions {
  const CATEGORY: ResultCategory = ResultCategory::AssessmentQuestions;
}

/// Generated feedback on a completed assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentAnalysis {
  pub summary:         String,
  #[serde(default)]
  pub strengths:       Vec<String>,
  #[serde(default)]
  pub weaknesses:      Vec<String>,
  #[serde(default)]
  pub recommendations: Vec<String>,
}

impl CategoryPayload for AssessmentAnalysis {
  const CATEGORY: ResultCategory = ResultCategory::AssessmentAnalysis;
}

// ─── Module content ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McqQuestion {
  pub question:       String,
  pub options:        Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub correct_answer: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub explanation:    Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
  pub front: String,
  pub back:  String,
}

/// Study material generated for a learning module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleContent {
  #[serde(default)]
  pub mcqs:       Vec<McqQuestion>,
  #[serde(default)]
  pub flashcards: Vec<Flashcard>,
}

impl CategoryPayload for ModuleContent {
  const CATEGORY: ResultCategory = ResultCategory::ModuleContent;
}

/// A module video transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
  pub text:     String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub language: Option<String>,
}

impl CategoryPayload for Transcript {
  const CATEGORY: ResultCategory = ResultCategory::Transcript;
}

// ─── Guidance ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningStep {
  pub title:       String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub module_ids:  Vec<String>,
}

/// An ordered sequence of modules recommended for a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPath {
  pub title: String,
  pub steps: Vec<LearningStep>,
}

impl CategoryPayload for LearningPath {
  const CATEGORY: ResultCategory = ResultCategory::LearningPath;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareerAnalysis {
  pub summary:           String,
  #[serde(default)]
  pub suggested_careers: Vec<String>,
}

impl CategoryPayload for CareerAnalysis {
  const CATEGORY: ResultCategory = ResultCategory::CareerAnalysis;
}
