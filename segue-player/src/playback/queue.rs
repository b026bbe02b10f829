//! Play queue
//!
//! Ordered sequence of track ids (duplicates allowed) plus the index of the
//! currently active entry. The queue only keeps its own position consistent;
//! re-anchoring playback after a mutation is the engine's job.
//!
//! # Persisted form
//!
//! Each id is written as lowercase hex nibbles, least significant nibble
//! first, terminated by `;`. Zero is written as `0;`. The format favours
//! cheap generation over readability, and decoding fails closed: a single
//! unexpected character discards the whole queue.

use rand::Rng;
use segue_common::events::TrackId;

/// Result of a range removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Removal {
    /// Number of entries removed
    pub removed: usize,
    /// The entry at the playback position was among them
    pub current_removed: bool,
}

impl Removal {
    fn merge(&mut self, other: Removal) {
        self.removed += other.removed;
        self.current_removed |= other.current_removed;
    }
}

/// Play queue with current position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Queue {
    entries: Vec<TrackId>,
    position: Option<usize>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current index, `None` when unset
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Current index as exposed to presenters and the settings store (`-1` when unset)
    pub fn position_i64(&self) -> i64 {
        self.position.map(|p| p as i64).unwrap_or(-1)
    }

    /// Set the current index. Out-of-range values unset the position.
    pub fn set_position(&mut self, position: Option<usize>) {
        self.position = position.filter(|&p| p < self.entries.len());
    }

    pub fn current_id(&self) -> Option<TrackId> {
        self.position.and_then(|p| self.entries.get(p).copied())
    }

    pub fn get(&self, index: usize) -> Option<TrackId> {
        self.entries.get(index).copied()
    }

    pub fn as_slice(&self) -> &[TrackId] {
        &self.entries
    }

    pub fn last_index(&self) -> Option<usize> {
        self.entries.len().checked_sub(1)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.position = None;
    }

    /// Insert `ids` at `at`, or replace the whole queue when `at` is negative.
    ///
    /// Replacing unsets the position; the caller decides where playback
    /// resumes. An insert at or before the current entry shifts the position
    /// so it keeps pointing at the same track. Empty input is a no-op.
    pub fn insert(&mut self, ids: &[TrackId], at: i64) {
        if ids.is_empty() {
            return;
        }

        if at < 0 {
            self.entries.clear();
            self.entries.extend_from_slice(ids);
            self.position = None;
            return;
        }

        let index = (at as usize).min(self.entries.len());
        self.entries.splice(index..index, ids.iter().copied());

        if let Some(p) = self.position {
            if index <= p {
                self.position = Some(p + ids.len());
            }
        }
    }

    /// Append `ids` to the end of the queue
    pub fn append(&mut self, ids: &[TrackId]) {
        self.entries.extend_from_slice(ids);
    }

    /// Remove the inclusive range `first..=last`, clamped to the queue.
    ///
    /// If the current entry is removed the position moves to `first` (or to
    /// 0 when the range ran to the tail, or unset when the queue emptied). A
    /// position after the range shifts left by the number removed.
    pub fn remove(&mut self, first: usize, last: usize) -> Removal {
        if last < first || first >= self.entries.len() {
            return Removal::default();
        }
        let last = last.min(self.entries.len() - 1);
        let count = last - first + 1;

        let mut current_removed = false;
        if let Some(p) = self.position {
            if first <= p && p <= last {
                current_removed = true;
                self.position = Some(first);
            } else if p > last {
                self.position = Some(p - count);
            }
        }

        self.entries.drain(first..=last);

        if current_removed {
            self.position = if self.entries.is_empty() {
                None
            } else if first >= self.entries.len() {
                Some(0)
            } else {
                Some(first)
            };
        }

        Removal {
            removed: count,
            current_removed,
        }
    }

    /// Remove every occurrence of `id`, scanning from the end
    pub fn remove_id(&mut self, id: TrackId) -> Removal {
        let mut total = Removal::default();
        for index in (0..self.entries.len()).rev() {
            if self.entries.get(index) == Some(&id) {
                total.merge(self.remove(index, index));
            }
        }
        total
    }

    /// Move one entry from `from` to `to`, shifting the span between them.
    ///
    /// Indices past the tail are clamped to the last entry.
    pub fn move_item(&mut self, from: usize, to: usize) {
        let Some(last) = self.last_index() else {
            return;
        };
        let from = from.min(last);
        let to = to.min(last);
        if from == to {
            return;
        }

        let id = self.entries.remove(from);
        self.entries.insert(to, id);

        if let Some(p) = self.position {
            self.position = Some(if p == from {
                to
            } else if from < to && (from..=to).contains(&p) {
                p - 1
            } else if to < from && (to..=from).contains(&p) {
                p + 1
            } else {
                p
            });
        }
    }

    /// Randomise the order, leaving the current entry where it is.
    ///
    /// Fisher-Yates over every index except the position; a swap partner
    /// equal to the position is re-drawn.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        let len = self.entries.len();
        if len <= 1 {
            return;
        }

        for i in (1..len).rev() {
            if Some(i) == self.position {
                continue;
            }
            let mut j = rng.gen_range(0..=i);
            while Some(j) == self.position {
                j = rng.gen_range(0..=i);
            }
            self.entries.swap(i, j);
        }
    }

    /// Drop every repeated id, keeping the first occurrence of each.
    ///
    /// No-op while playing.
    pub fn dedup(&mut self, is_playing: bool) -> Removal {
        let mut total = Removal::default();
        if is_playing {
            return total;
        }

        let mut index = self.entries.len();
        while index > 1 {
            index -= 1;
            let id = self.entries[index];
            if self.entries[..index].contains(&id) {
                total.merge(self.remove(index, index));
            }
        }
        total
    }

    /// Rebuild the queue by alternating `current_count` existing entries
    /// with `new_count` entries of `new_ids`.
    ///
    /// Once either source runs dry the rest of the other is appended. The
    /// current entry keeps its identity (its index follows it).
    pub fn interleave(&mut self, new_ids: &[TrackId], current_count: usize, new_count: usize) {
        let old = std::mem::take(&mut self.entries);
        let mut rebuilt = Vec::with_capacity(old.len() + new_ids.len());
        let mut new_position = None;
        let (mut oi, mut ni) = (0, 0);

        let mut take_old = |rebuilt: &mut Vec<TrackId>, oi: &mut usize| {
            if Some(*oi) == self.position {
                new_position = Some(rebuilt.len());
            }
            rebuilt.push(old[*oi]);
            *oi += 1;
        };

        while oi < old.len() && ni < new_ids.len() && (current_count > 0 || new_count > 0) {
            for _ in 0..current_count {
                if oi >= old.len() {
                    break;
                }
                take_old(&mut rebuilt, &mut oi);
            }
            for _ in 0..new_count {
                if ni >= new_ids.len() {
                    break;
                }
                rebuilt.push(new_ids[ni]);
                ni += 1;
            }
        }
        while oi < old.len() {
            take_old(&mut rebuilt, &mut oi);
        }
        rebuilt.extend_from_slice(&new_ids[ni..]);

        self.entries = rebuilt;
        self.position = new_position;
    }

    /// Encode the queue contents in the persisted form. Negative ids are skipped.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.entries.len() * 6);
        for id in &self.entries {
            let mut n = id.0;
            if n < 0 {
                continue;
            }
            if n == 0 {
                out.push_str("0;");
                continue;
            }
            while n != 0 {
                let digit = (n & 0xf) as u32;
                n >>= 4;
                out.push(char::from_digit(digit, 16).unwrap_or('0'));
            }
            out.push(';');
        }
        out
    }

    /// Decode the persisted form.
    ///
    /// Strings shorter than two characters yield an empty list, as does any
    /// character outside `[0-9a-f;]` or a value overflowing an `i64`.
    /// Trailing digits without a terminating `;` are dropped.
    pub fn decode(encoded: &str) -> Vec<TrackId> {
        let mut ids = Vec::new();
        if encoded.len() < 2 {
            return ids;
        }

        let mut value: u64 = 0;
        let mut shift: u32 = 0;
        for c in encoded.chars() {
            if c == ';' {
                if value > i64::MAX as u64 {
                    return Vec::new();
                }
                ids.push(TrackId(value as i64));
                value = 0;
                shift = 0;
                continue;
            }

            let digit = match c {
                '0'..='9' | 'a'..='f' => c.to_digit(16),
                _ => None,
            };
            let Some(digit) = digit else {
                return Vec::new();
            };
            if shift >= u64::BITS {
                return Vec::new();
            }
            value |= (digit as u64) << shift;
            shift += 4;
        }
        ids
    }

    /// Replace the contents with decoded ids and an unset position
    pub fn restore(&mut self, ids: Vec<TrackId>) {
        self.entries = ids;
        self.position = None;
    }
}
