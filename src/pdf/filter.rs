//! Cross-page repetition and copyright filtering.
//!
//! Removes the lines that repeat across a document (running headers,
//! footers, page numbers) and copyright notices. Classification needs
//! whole-document line frequencies, so the filter only runs in batch
//! mode once every page has been extracted and normalized.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::config::FilterSettings;

/// Which removal classes are active for a request.
#[derive(Debug, Clone, Copy)]
pub struct FilterOptions {
    pub remove_repetitive: bool,
    pub remove_copyright: bool,
}

impl FilterOptions {
    pub fn any(&self) -> bool {
        self.remove_repetitive || self.remove_copyright
    }
}

/// Per-line page-occurrence counts for one document.
///
/// Built in a first pass over all pages, consulted during removal, and
/// dropped with the request.
#[derive(Debug, Default)]
pub struct FilterStats {
    line_pages: HashMap<String, usize>,
    total_pages: usize,
}

impl FilterStats {
    /// Fraction of pages containing `line` (trimmed).
    fn page_fraction(&self, line: &str) -> f64 {
        if self.total_pages == 0 {
            return 0.0;
        }
        let count = self.line_pages.get(line).copied().unwrap_or(0);
        count as f64 / self.total_pages as f64
    }
}

fn copyright_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)©.*\d{4}",
            r"(?i)copyright.*\d{4}",
            r"(?i)all rights reserved",
            r"(?i)tutti i diritti riservati",
            r"(?i)tous droits réservés",
            r"(?i)alle rechte vorbehalten",
            r"(?i)todos los derechos reservados",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

fn page_number_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)^page\s+\d+$",
            r"(?i)^pagina\s+\d+$",
            r"^\d+\s*/\s*\d+$",
            r"^-\s*\d+\s*-$",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

/// Check if a line is a copyright notice in any supported language.
pub fn is_copyright_line(line: &str) -> bool {
    let trimmed = line.trim();
    copyright_patterns().iter().any(|re| re.is_match(trimmed))
}

/// Check if a line is just a page number marker.
pub fn is_page_number(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.chars().all(|c| c.is_ascii_digit()) && !trimmed.is_empty() {
        return true;
    }
    page_number_patterns().iter().any(|re| re.is_match(trimmed))
}

/// Statistical line filter over a complete page set.
pub struct TextFilter {
    settings: FilterSettings,
}

impl TextFilter {
    pub fn new(settings: &FilterSettings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    /// Pass 1: count, for each distinct trimmed line, the number of
    /// distinct pages it occurs on. Lines too long to ever be classified
    /// as boilerplate are not tracked.
    pub fn collect_stats(&self, pages: &[String]) -> FilterStats {
        let mut line_pages: HashMap<String, usize> = HashMap::new();

        for page in pages {
            let unique: HashSet<&str> = page
                .lines()
                .map(str::trim)
                .filter(|line| {
                    !line.is_empty() && line.chars().count() < self.settings.boilerplate_max_len
                })
                .collect();
            for line in unique {
                *line_pages.entry(line.to_string()).or_default() += 1;
            }
        }

        FilterStats {
            line_pages,
            total_pages: pages.len(),
        }
    }

    /// Pass 2: remove classified lines from every page, preserving the
    /// relative order of survivors.
    pub fn filter_pages(&self, pages: Vec<String>, options: FilterOptions) -> Vec<String> {
        if !options.any() {
            return pages;
        }

        let stats = self.collect_stats(&pages);
        let filtered: Vec<String> = pages
            .iter()
            .map(|page| self.filter_page(page, &stats, options))
            .collect();

        let removed: usize = pages
            .iter()
            .zip(&filtered)
            .map(|(before, after)| {
                before.lines().count().saturating_sub(after.lines().count())
            })
            .sum();
        tracing::debug!(
            pages = pages.len(),
            lines_removed = removed,
            "repetition/copyright filter applied"
        );

        filtered
    }

    /// Filter one page against the document-wide statistics.
    ///
    /// Removal is capped at `max_removal_fraction` of the page's non-blank
    /// lines; once the cap is reached, remaining candidates survive. This
    /// keeps short pages of repetitive-looking content from being emptied.
    fn filter_page(&self, page: &str, stats: &FilterStats, options: FilterOptions) -> String {
        let non_blank = page.lines().filter(|l| !l.trim().is_empty()).count();
        let max_removals =
            (non_blank as f64 * self.settings.max_removal_fraction).floor() as usize;

        let mut removed = 0;
        let mut kept: Vec<&str> = Vec::new();

        for line in page.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                kept.push(line);
                continue;
            }

            let removable = removed < max_removals;
            if removable && options.remove_repetitive && self.is_boilerplate(trimmed, stats) {
                removed += 1;
                continue;
            }
            if removable && options.remove_copyright && is_copyright_line(trimmed) {
                removed += 1;
                continue;
            }

            kept.push(line);
        }

        collapse_blank_runs(&kept)
    }

    /// A line is boilerplate when it is short enough to be a header or
    /// footer and either repeats across enough pages or is a bare page
    /// number.
    fn is_boilerplate(&self, trimmed: &str, stats: &FilterStats) -> bool {
        if trimmed.chars().count() >= self.settings.boilerplate_max_len {
            return false;
        }
        if is_page_number(trimmed) {
            return true;
        }
        stats.page_fraction(trimmed) >= self.settings.repetition_threshold
    }
}

/// Join kept lines, collapsing runs of blank lines left behind by
/// removals into single paragraph breaks.
fn collapse_blank_runs(lines: &[&str]) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    let mut blank_run = 0;
    for line in lines {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push(line);
    }

    let joined = out.join("\n");
    joined.trim().to_string()
}
