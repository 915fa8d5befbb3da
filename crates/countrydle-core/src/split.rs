//! Recursive character splitter for country source text.
//!
//! Text is split on the coarsest separator present (paragraph, line, word,
//! character), pieces that are still too long are split again with the next
//! separator, and neighbouring pieces are merged back into chunks of at most
//! `chunk_size` characters that overlap by up to `overlap` characters.

use std::collections::VecDeque;

pub const CHUNK_SIZE: usize = 1000;
pub const CHUNK_OVERLAP: usize = 150;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Copy)]
pub struct Splitter {
  chunk_size: usize,
  overlap:    usize,
}

impl Default for Splitter {
  fn default() -> Self { Self::new(CHUNK_SIZE, CHUNK_OVERLAP) }
}

fn len(s: &str) -> usize { s.chars().count() }

/// Separator length owed when appending to `current`.
fn joiner(current: &VecDeque<&str>, sep_len: usize) -> usize {
  if current.is_empty() { 0 } else { sep_len }
}

impl Splitter {
  /// `overlap` is clamped below `chunk_size`.
  pub fn new(chunk_size: usize, overlap: usize) -> Self {
    let chunk_size = chunk_size.max(1);
    Self { chunk_size, overlap: overlap.min(chunk_size - 1) }
  }

  pub fn split(&self, text: &str) -> Vec<String> {
    self.split_with(text, &SEPARATORS)
  }

  fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
    let position = separators
      .iter()
      .position(|s| s.is_empty() || text.contains(s))
      .unwrap_or(separators.len().saturating_sub(1));
    let separator = separators.get(position).copied().unwrap_or("");
    let rest = separators.get(position + 1..).unwrap_or(&[]);

    let pieces: Vec<String> = if separator.is_empty() {
      text.chars().map(String::from).collect()
    } else {
      text
        .split(separator)
        .filter(|p| !p.trim().is_empty())
        .map(str::to_owned)
        .collect()
    };

    let mut chunks = Vec::new();
    let mut pending: Vec<String> = Vec::new();
    for piece in pieces {
      if len(&piece) < self.chunk_size {
        pending.push(piece);
        continue;
      }
      if !pending.is_empty() {
        chunks.extend(self.merge(&pending, separator));
        pending.clear();
      }
      if rest.is_empty() {
        chunks.push(piece);
      } else {
        chunks.extend(self.split_with(&piece, rest));
      }
    }
    if !pending.is_empty() {
      chunks.extend(self.merge(&pending, separator));
    }
    chunks
  }

  fn merge(&self, pieces: &[String], separator: &str) -> Vec<String> {
    let sep_len = len(separator);
    let mut docs = Vec::new();
    let mut current: VecDeque<&str> = VecDeque::new();
    let mut total = 0;

    for piece in pieces {
      let piece_len = len(piece);
      if !current.is_empty()
        && total + joiner(&current, sep_len) + piece_len > self.chunk_size
      {
        docs.push(Vec::from(current.clone()).join(separator));
        // Keep a tail of the emitted chunk as overlap for the next one.
        while let Some(first) = current.front() {
          if total <= self.overlap
            && total + joiner(&current, sep_len) + piece_len <= self.chunk_size
          {
            break;
          }
          let first_len = len(first);
          current.pop_front();
          total -= first_len + joiner(&current, sep_len);
        }
      }

      total += piece_len + joiner(&current, sep_len);
      current.push_back(piece.as_str());
    }

    if !current.is_empty() {
      docs.push(Vec::from(current).join(separator));
    }

    docs
      .into_iter()
      .map(|d| d.trim().to_owned())
      .filter(|d| !d.is_empty())
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn short_text_is_one_chunk() {
    let chunks = Splitter::default().split("Poland is in Central Europe.");
    assert_eq!(chunks, ["Poland is in Central Europe."]);
  }

  #[test]
  fn paragraphs_merge_until_full() {
    let text = "alpha\n\nbeta\n\ngamma";
    assert_eq!(Splitter::new(12, 0).split(text), ["alpha\n\nbeta", "gamma"]);
  }

  #[test]
  fn long_text_respects_chunk_size_and_overlaps() {
    let text: Vec<String> = (0..600).map(|i| format!("word{i:03}")).collect();
    let text = text.join(" ");

    let chunks = Splitter::default().split(&text);
    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.chars().count() <= CHUNK_SIZE));

    for pair in chunks.windows(2) {
      let last_word = pair[0].split(' ').next_back().unwrap();
      assert!(pair[1].contains(last_word), "no overlap between chunks");
    }
  }

  #[test]
  fn unbroken_text_falls_back_to_characters() {
    let text = "x".repeat(25);
    let chunks = Splitter::new(10, 2).split(&text);
    assert!(chunks.iter().all(|c| c.len() <= 10));
    assert!(chunks.len() >= 3);
  }
}
