//! PDF extraction pipeline.
//!
//! Converts PDF documents into normalized plain text:
//! - `chunker`: splits large documents into bounded page ranges
//! - `document`: page content access via Poppler and Tesseract tools
//! - `page`: per-page native-text vs OCR decision
//! - `normalizer`: ligature, unicode, and whitespace cleanup
//! - `filter`: cross-page repetition and copyright removal
//! - `processor`: batch and streaming orchestration
//!
//! Each request gets an independent pipeline instance; the only shared
//! state is the read-only [`crate::config::Settings`].

mod chunker;
mod document;
mod filter;
mod normalizer;
mod page;
mod processor;

pub use chunker::{ChunkPlanner, PageRange};
pub use document::{check_tools, ExtractionError, PageSource, PopplerDocument};
pub use filter::{FilterOptions, FilterStats, TextFilter};
pub use normalizer::normalize;
pub use page::{NativeCheck, PageResult};
pub use processor::{
    ExtractOptions, ExtractionResult, PdfProcessor, ProcessError, ProcessorInfo, ProgressRecord,
};

use serde::{Deserialize, Serialize};

/// OCR languages accepted by the API, as ISO-like three-letter codes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English
    #[default]
    Eng,
    /// Italian
    Ita,
    /// French
    Fra,
    /// German
    Deu,
    /// Spanish
    Spa,
}

impl Language {
    /// Parse an API language code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "eng" => Some(Language::Eng),
            "ita" => Some(Language::Ita),
            "fra" => Some(Language::Fra),
            "deu" => Some(Language::Deu),
            "spa" => Some(Language::Spa),
            _ => None,
        }
    }

    /// Language code as passed to Tesseract's `-l` flag.
    pub fn code(&self) -> &'static str {
        match self {
            Language::Eng => "eng",
            Language::Ita => "ita",
            Language::Fra => "fra",
            Language::Deu => "deu",
            Language::Spa => "spa",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
