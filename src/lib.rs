//! pdf2text - PDF to plain-text conversion service.
//!
//! Extracts normalized text from PDF documents, using the native text
//! layer when a page has one and Tesseract OCR when it does not. Large
//! documents are processed in bounded chunks, and results are delivered
//! either as one combined response or as a per-page progress stream.

pub mod cli;
pub mod config;
pub mod pdf;
pub mod server;
