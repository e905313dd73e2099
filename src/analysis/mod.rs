//! Audio analysis boundary
//!
//! Tempo, beat and onset detection come from an external analyzer behind
//! [`AudioAnalyzer`]. Results are plain frame lists; detected onsets are kept
//! in an [`OnsetPool`] until the user drops them into a layer.

use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::engine::time::{FrameNumber, FrameRate};
use crate::error::{BeatstackError, Result};

/// Tempo estimate plus frame-aligned beat positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatGrid {
    pub tempo_bpm: f64,
    pub beats: Vec<FrameNumber>,
}

/// External beat/onset detector
pub trait AudioAnalyzer {
    fn beats(&self, samples: &[f32], sample_rate: u32, frame_rate: FrameRate) -> Result<BeatGrid>;

    /// Onset frames in ascending order
    fn onsets(
        &self,
        samples: &[f32],
        sample_rate: u32,
        frame_rate: FrameRate,
    ) -> Result<Vec<FrameNumber>>;
}

/// One stored onset detection result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnsetPoolItem {
    pub number: u32,
    pub name: String,
    pub frames: Vec<FrameNumber>,
    pub parent_song: String,
    /// Filter the onsets were detected on, if not the original audio
    pub parent_filter: Option<String>,
}

/// Numbered collection of onset detection results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnsetPool {
    items: BTreeMap<u32, OnsetPoolItem>,
}

impl OnsetPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `frames`, numbering the item `number` or the next free number
    ///
    /// Without a name the item is called `onset_<number>`.
    pub fn add(
        &mut self,
        frames: Vec<FrameNumber>,
        parent_song: &str,
        parent_filter: Option<&str>,
        name: Option<&str>,
        number: Option<u32>,
    ) -> Result<u32> {
        let number = match number {
            Some(n) if self.items.contains_key(&n) => {
                warn!("Onset pool number {} is taken", n);
                return Err(BeatstackError::PoolNumberTaken { number: n });
            }
            Some(n) => n,
            None => self.next_number()?,
        };

        let item = OnsetPoolItem {
            number,
            name: name
                .map(str::to_string)
                .unwrap_or_else(|| format!("onset_{}", number)),
            frames,
            parent_song: parent_song.to_string(),
            parent_filter: parent_filter.map(str::to_string),
        };
        info!(
            "Onset pool item {} '{}' holds {} onsets",
            number,
            item.name,
            item.frames.len()
        );
        self.items.insert(number, item);
        Ok(number)
    }

    pub fn get(&self, number: u32) -> Option<&OnsetPoolItem> {
        self.items.get(&number)
    }

    pub fn remove(&mut self, number: u32) -> Option<OnsetPoolItem> {
        self.items.remove(&number)
    }

    pub fn items(&self) -> impl Iterator<Item = &OnsetPoolItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn next_number(&self) -> Result<u32> {
        match self.items.keys().next_back() {
            None => Ok(1),
            Some(&max) => max
                .checked_add(1)
                .ok_or(BeatstackError::PoolNumberTaken { number: max }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_count_up_from_one() {
        let mut pool = OnsetPool::new();
        assert_eq!(pool.add(vec![1, 2], "song", None, None, None).unwrap(), 1);
        assert_eq!(pool.add(vec![3], "song", None, None, None).unwrap(), 2);
        assert_eq!(pool.get(2).unwrap().name, "onset_2");
    }

    #[test]
    fn test_next_number_follows_max() {
        let mut pool = OnsetPool::new();
        pool.add(vec![], "song", None, None, Some(7)).unwrap();
        assert_eq!(pool.add(vec![], "song", None, None, None).unwrap(), 8);
        pool.remove(8);
        pool.remove(7);
        assert_eq!(pool.add(vec![], "song", None, None, None).unwrap(), 1);
    }

    #[test]
    fn test_no_number_after_u32_max() {
        let mut pool = OnsetPool::new();
        pool.add(vec![], "song", None, None, Some(u32::MAX)).unwrap();
        assert!(matches!(
            pool.add(vec![], "song", None, None, None),
            Err(BeatstackError::PoolNumberTaken { number: u32::MAX })
        ));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_explicit_duplicate_rejected() {
        let mut pool = OnsetPool::new();
        pool.add(vec![5], "song", Some("lowpass"), Some("kicks"), Some(3))
            .unwrap();
        assert!(matches!(
            pool.add(vec![6], "song", None, None, Some(3)),
            Err(BeatstackError::PoolNumberTaken { number: 3 })
        ));
        let item = pool.get(3).unwrap();
        assert_eq!(item.name, "kicks");
        assert_eq!(item.parent_filter.as_deref(), Some("lowpass"));
    }
}
