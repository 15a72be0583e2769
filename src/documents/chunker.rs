//! Document chunking strategies.
//!
//! Provides the `Chunker` trait and the section-aware sentence packer used to
//! split extracted policy text into retrievable chunks.

use std::sync::LazyLock;

use regex::Regex;

use super::config::ChunkingConfig;
use super::types::Chunk;

/// Headers such as `SECTION A)` or numbered-list markers such as `1.` / `2)`.
static DEFAULT_SECTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:section\s+[a-z0-9]{1,3}\s*[).:\-]|\d{1,2}(?:\.\d{1,2})*[.)]\s+\S)")
        .expect("default section pattern is valid")
});

/// Maximum length of a section header attached to chunks.
const MAX_HEADER_CHARS: usize = 80;

/// Trait for document chunking strategies.
pub trait Chunker: Send + Sync {
    /// Split document text into chunks tagged with `source_id`.
    fn chunk(&self, text: &str, source_id: &str) -> Vec<Chunk>;
}

/// Section-aware chunker: sentence packing within header-delimited sections.
///
/// Algorithm:
/// 1. Normalise whitespace, keeping blank lines as paragraph markers
/// 2. Split into sections at header lines, dropping short sections as noise
/// 3. Split each paragraph into sentences
/// 4. Greedily pack sentences into `chunk_size` character budgets; a buffer
///    under `min_section_length` keeps growing past the budget
/// 5. Cap the total number of chunks per document
#[derive(Debug, Clone)]
pub struct SectionChunker {
    config: ChunkingConfig,
    section_pattern: Regex,
}

impl Default for SectionChunker {
    fn default() -> Self {
        Self::new(ChunkingConfig::default())
    }
}

/// A header-delimited run of paragraphs.
#[derive(Debug)]
struct Section {
    header: Option<String>,
    paragraphs: Vec<String>,
}

impl Section {
    fn untitled() -> Self {
        Self {
            header: None,
            paragraphs: Vec::new(),
        }
    }

    fn char_count(&self) -> usize {
        self.paragraphs.iter().map(|p| p.chars().count()).sum()
    }
}

impl SectionChunker {
    /// Create a chunker with the default section header pattern.
    pub fn new(config: ChunkingConfig) -> Self {
        Self {
            config,
            section_pattern: DEFAULT_SECTION_PATTERN.clone(),
        }
    }

    /// Create a chunker honouring `config.section_pattern` when set.
    pub fn from_config(config: ChunkingConfig) -> Result<Self, regex::Error> {
        let pattern = match &config.section_pattern {
            Some(pattern) => Regex::new(pattern)?,
            None => DEFAULT_SECTION_PATTERN.clone(),
        };
        Ok(Self::new(config).with_section_pattern(pattern))
    }

    /// Replace the section header pattern. The pattern is matched per line.
    pub fn with_section_pattern(mut self, pattern: Regex) -> Self {
        self.section_pattern = pattern;
        self
    }

    /// The active chunking configuration.
    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    fn split_sections(&self, text: &str) -> Vec<Section> {
        let mut sections = vec![Section::untitled()];
        let mut paragraph = String::new();

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                flush_paragraph(&mut sections, &mut paragraph);
                continue;
            }

            if self.section_pattern.is_match(line) {
                flush_paragraph(&mut sections, &mut paragraph);
                sections.push(Section {
                    header: Some(truncate_chars(&collapse_whitespace(trimmed), MAX_HEADER_CHARS)),
                    paragraphs: Vec::new(),
                });
            }

            if !paragraph.is_empty() {
                paragraph.push(' ');
            }
            paragraph.push_str(&collapse_whitespace(trimmed));
        }
        flush_paragraph(&mut sections, &mut paragraph);

        let min_len = self.config.min_section_length;
        sections
            .into_iter()
            .filter(|section| {
                let keep = section.char_count() >= min_len;
                if !keep && !section.paragraphs.is_empty() {
                    tracing::debug!(
                        target: "chunker",
                        "dropping short section {:?} ({} chars)",
                        section.header,
                        section.char_count()
                    );
                }
                keep
            })
            .collect()
    }

    /// Pack sentences into chunk texts within the character budget.
    fn pack(&self, sentences: Vec<String>) -> Vec<String> {
        let budget = self.config.chunk_size;
        let mut chunks: Vec<String> = Vec::new();
        let mut buffer: Vec<String> = Vec::new();
        let mut buffer_len = 0usize;
        // Sentences in the buffer that were not carried over as overlap.
        let mut fresh = 0usize;

        for sentence in sentences {
            let sentence_len = sentence.chars().count();
            let added = if buffer.is_empty() {
                sentence_len
            } else {
                sentence_len + 1
            };

            // A buffer shorter than the minimum absorbs the next sentence even past the budget
            if fresh > 0
                && buffer_len + added > budget
                && buffer_len >= self.config.min_section_length
            {
                chunks.push(buffer.join(" "));
                buffer = self.overlap_tail(&buffer, sentence_len);
                buffer_len = joined_len(&buffer);
                fresh = 0;
            }

            buffer_len += if buffer.is_empty() {
                sentence_len
            } else {
                sentence_len + 1
            };
            buffer.push(sentence);
            fresh += 1;
        }

        if fresh > 0 {
            let tail = buffer[buffer.len() - fresh..].join(" ");
            match chunks.last_mut() {
                Some(previous) if tail.chars().count() < self.config.min_section_length => {
                    previous.push(' ');
                    previous.push_str(&tail);
                }
                _ => chunks.push(buffer.join(" ")),
            }
        }

        chunks
    }

    /// Trailing sentences to repeat in the next chunk, if they fit with the next sentence.
    fn overlap_tail(&self, buffer: &[String], next_len: usize) -> Vec<String> {
        let keep = self.config.overlap_sentences.min(buffer.len());
        if keep == 0 {
            return Vec::new();
        }

        let tail = buffer[buffer.len() - keep..].to_vec();
        if joined_len(&tail) + 1 + next_len <= self.config.chunk_size {
            tail
        } else {
            Vec::new()
        }
    }
}

impl Chunker for SectionChunker {
    fn chunk(&self, text: &str, source_id: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();

        for section in self.split_sections(text) {
            let sentences: Vec<String> = section
                .paragraphs
                .iter()
                .flat_map(|paragraph| split_sentences(paragraph))
                .collect();

            for body in self.pack(sentences) {
                if body.trim().is_empty() {
                    continue;
                }
                let sequence_index = chunks.len();
                chunks.push(Chunk::new(
                    body,
                    section.header.clone(),
                    source_id,
                    sequence_index,
                ));
            }
        }

        if chunks.len() > self.config.max_chunks {
            tracing::warn!(
                target: "chunker",
                "{source_id}: {} chunks exceed the cap of {}, keeping the first {}",
                chunks.len(),
                self.config.max_chunks,
                self.config.max_chunks
            );
            chunks.truncate(self.config.max_chunks);
        }

        tracing::debug!(target: "chunker", "{source_id}: produced {} chunks", chunks.len());
        chunks
    }
}

/// Split text into sentence-like units.
///
/// A unit ends at `.`, `!` or `?` followed by whitespace or the end of text.
/// A period after a one or two letter token (`Rs.`, `Dr.`, `e.g.`) or after a
/// leading list number (`3.`) does not end a sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let collapsed = collapse_whitespace(text);
    let chars: Vec<(usize, char)> = collapsed.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0usize;

    for (i, &(pos, ch)) in chars.iter().enumerate() {
        if !matches!(ch, '.' | '!' | '?') {
            continue;
        }
        if !matches!(chars.get(i + 1), None | Some((_, ' '))) {
            continue;
        }
        if ch == '.' && is_abbreviation(&collapsed[start..pos]) {
            continue;
        }

        let end = pos + ch.len_utf8();
        let sentence = collapsed[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        start = end;
    }

    let rest = collapsed[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }

    sentences
}

/// Whether the period closing `before` belongs to an abbreviation or list marker.
fn is_abbreviation(before: &str) -> bool {
    let token = before.rsplit(' ').next().unwrap_or_default();
    let letters: Vec<char> = token.chars().filter(|c| *c != '.').collect();
    if !letters.is_empty() && letters.len() <= 2 && letters.iter().all(|c| c.is_alphabetic()) {
        return true;
    }

    before.trim() == token
        && !token.is_empty()
        && token.len() <= 2
        && token.chars().all(|c| c.is_ascii_digit())
}

/// Collapse whitespace runs to single spaces and trim.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn flush_paragraph(sections: &mut [Section], paragraph: &mut String) {
    if paragraph.is_empty() {
        return;
    }
    if let Some(section) = sections.last_mut() {
        section.paragraphs.push(std::mem::take(paragraph));
    }
}

fn joined_len(parts: &[String]) -> usize {
    let chars: usize = parts.iter().map(|p| p.chars().count()).sum();
    chars + parts.len().saturating_sub(1)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_size: usize, min_section_length: usize) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size,
            min_section_length,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_content() {
        let chunker = SectionChunker::default();
        assert!(chunker.chunk("", "policy.txt").is_empty());
        assert!(chunker.chunk("  \n\n\t  ", "policy.txt").is_empty());
    }

    #[test]
    fn test_single_sentence() {
        let chunker = SectionChunker::default();
        let chunks = chunker.chunk("Knee surgeries are covered up to Rs. 1,00,000.", "p.txt");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Knee surgeries are covered up to Rs. 1,00,000.");
        assert_eq!(chunks[0].source_id, "p.txt");
        assert_eq!(chunks[0].sequence_index, 0);
        assert!(chunks[0].section_header.is_none());
    }

    #[test]
    fn test_whitespace_normalised() {
        let chunker = SectionChunker::default();
        let chunks = chunker.chunk("Cataract   surgery\n is\tcovered   in full.", "p.txt");
        assert_eq!(chunks[0].text, "Cataract surgery is covered in full.");
    }

    #[test]
    fn test_abbreviation_is_not_sentence_end() {
        let sentences = split_sentences("Cover is Rs. 50,000 per year. Dr. visits are extra!");
        assert_eq!(
            sentences,
            vec!["Cover is Rs. 50,000 per year.", "Dr. visits are extra!"]
        );
    }

    #[test]
    fn test_list_number_is_not_sentence_end() {
        let sentences = split_sentences("3. Dental work is excluded. Claims are paid monthly.");
        assert_eq!(
            sentences,
            vec!["3. Dental work is excluded.", "Claims are paid monthly."]
        );
    }

    #[test]
    fn test_packs_sentences_within_budget() {
        let chunker = SectionChunker::new(config(60, 5));
        let text = "The insured must notify the insurer. Claims need a discharge summary. \
                    Payment happens within thirty days. Disputes go to the ombudsman.";
        let chunks = chunker.chunk(text, "p.txt");

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.char_count() <= 60, "chunk too long: {}", chunk.text);
        }
        assert!(chunks[0].text.starts_with("The insured"));
    }

    #[test]
    fn test_section_without_boundaries_is_one_chunk() {
        let chunker = SectionChunker::new(config(50, 5));
        let text = "word ".repeat(40);
        let chunks = chunker.chunk(&text, "p.txt");

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].char_count() > 50);
    }

    #[test]
    fn test_section_headers_tag_chunks() {
        let chunker = SectionChunker::new(config(200, 10));
        let text = "SECTION A) Eligibility\nAge limit is 18 to 65 years for all members.\n\n\
                    SECTION B) Coverage\nKnee surgeries are covered up to Rs. 1,00,000.";
        let chunks = chunker.chunk(text, "p.txt");

        assert_eq!(chunks.len(), 2);
        assert_eq!(
            chunks[0].section_header.as_deref(),
            Some("SECTION A) Eligibility")
        );
        assert_eq!(chunks[1].section_header.as_deref(), Some("SECTION B) Coverage"));
        assert!(chunks[1].text.contains("Knee surgeries"));
        assert_eq!(chunks[1].sequence_index, 1);
    }

    #[test]
    fn test_short_sections_dropped_as_noise() {
        let chunker = SectionChunker::new(config(200, 30));
        let text = "SECTION A) Misc\nNone.\n\nSECTION B) Coverage\nCardiac surgery is covered up to Rs. 3,00,000.";
        let chunks = chunker.chunk(text, "p.txt");

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("Cardiac"));
    }

    #[test]
    fn test_custom_section_pattern() {
        let chunker = SectionChunker::new(config(200, 5))
            .with_section_pattern(Regex::new(r"^ARTICLE \d+").unwrap());
        let text = "ARTICLE 1 Scope\nThis policy covers hospitalisation.\nARTICLE 2 Limits\nRoom rent is capped.";
        let chunks = chunker.chunk(text, "p.txt");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].section_header.as_deref(), Some("ARTICLE 2 Limits"));
    }

    #[test]
    fn test_from_config_rejects_bad_pattern() {
        let config = ChunkingConfig {
            section_pattern: Some("([".to_string()),
            ..Default::default()
        };
        assert!(SectionChunker::from_config(config).is_err());
    }

    #[test]
    fn test_chunk_cap_keeps_earliest() {
        let chunker = SectionChunker::new(ChunkingConfig {
            chunk_size: 30,
            min_section_length: 5,
            max_chunks: 3,
            ..Default::default()
        });
        let text = (0..10)
            .map(|i| format!("Clause number {i} applies here."))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunker.chunk(&text, "p.txt");

        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].text.contains("Clause number 0"));
        assert_eq!(chunks[2].sequence_index, 2);
    }

    #[test]
    fn test_trailing_fragment_merged() {
        let chunker = SectionChunker::new(config(40, 15));
        let text = "Hospital cash is paid daily here. Ends now.";
        let chunks = chunker.chunk(text, "p.txt");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hospital cash is paid daily here. Ends now.");
    }

    #[test]
    fn test_short_lead_sentence_joins_long_one() {
        let chunker = SectionChunker::default();
        let long = format!("The sum insured covers {}.", "room rent and nursing ".repeat(24));
        let text = format!("See below. {long}");
        let chunks = chunker.chunk(&text, "p.txt");

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.starts_with("See below. The sum insured"));
        assert!(chunks.iter().all(|c| c.char_count() >= 20));
    }

    #[test]
    fn test_overlap_repeats_trailing_sentence() {
        let chunker = SectionChunker::new(ChunkingConfig {
            chunk_size: 70,
            min_section_length: 5,
            overlap_sentences: 1,
            ..Default::default()
        });
        let text = "First clause is here. Second clause is here. Third clause is here. Fourth clause is here.";
        let chunks = chunker.chunk(text, "p.txt");

        assert!(chunks.len() >= 2);
        assert!(chunks[1].text.starts_with("Second clause") || chunks[1].text.starts_with("Third clause"));
        let last_of_first = split_sentences(&chunks[0].text).pop().unwrap();
        assert!(chunks[1].text.starts_with(&last_of_first));
    }

    #[test]
    fn test_sentences_reconstructed_without_loss() {
        let chunker = SectionChunker::new(config(80, 10));
        let text = "SECTION A) General\nThe policy runs for one year. It renews automatically.\n\n\
                    Members must be residents of India.\n\n\
                    SECTION B) Benefits\nKnee surgeries are covered up to Rs. 1,00,000. \
                    Cardiac surgery is covered up to Rs. 3,00,000. Eye surgery is covered up to Rs. 40,000!";
        let chunks = chunker.chunk(text, "p.txt");

        let from_chunks: Vec<String> = chunks
            .iter()
            .flat_map(|c| split_sentences(&c.text))
            .collect();

        let expected: Vec<String> = text
            .split("\n\n")
            .flat_map(|para| split_sentences(para))
            .collect();

        assert_eq!(from_chunks, expected);
    }
}
