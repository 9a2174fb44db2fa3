//! Sequence reconciliation for the record stream.
//!
//! Records are kept in a collection indexed by `sequence - 1`. Sequences that
//! were skipped by the bulk stream hold a `None` placeholder until a recovery
//! response fills them.

use seqfeed_core::Record;
use std::collections::BTreeSet;
use thiserror::Error;

/// Default limit on outstanding placeholders.
pub const DEFAULT_MAX_GAP: u32 = 1 << 20;

/// Protocol phase governing where records are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Receiving the full stream in order.
    Bulk,
    /// Receiving targeted resends of missing sequences.
    Recovering,
}

/// Outcome of observing one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Record carried the expected sequence.
    InOrder,
    /// Sequences `from..=to` were skipped before this record.
    Gap {
        /// First missing sequence.
        from: u32,
        /// Last missing sequence.
        to: u32,
    },
    /// Record filled a placeholder.
    Recovered,
    /// Record's slot was already filled; ignored.
    Duplicate,
    /// Recovery response for a sequence nobody asked for; ignored.
    Unsolicited,
}

/// Error type for rejected records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// Frame failed to decode.
    #[error("malformed frame: {0}")]
    Format(#[from] seqfeed_core::Error),

    /// Sequence numbers start at 1.
    #[error("record carries sequence 0")]
    ZeroSequence,

    /// Gap would push outstanding placeholders past the limit.
    #[error("gap from {expected} to {sequence} exceeds placeholder limit {max}")]
    GapTooLarge {
        /// Next expected sequence.
        expected: u32,
        /// Sequence that was received.
        sequence: u32,
        /// Configured placeholder limit.
        max: u32,
    },
}

/// Tracks expected sequence, missing sequences and the output collection.
#[derive(Debug, Clone)]
pub struct SequenceReconciler {
    expected: u32,
    missing: BTreeSet<u32>,
    records: Vec<Option<Record>>,
    phase: Phase,
    recovered: usize,
    max_gap: u32,
}

impl SequenceReconciler {
    /// Creates a reconciler expecting sequence 1 in the bulk phase.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_gap(DEFAULT_MAX_GAP)
    }

    /// Creates a reconciler allowing at most `max_gap` outstanding
    /// placeholders across all gaps.
    #[must_use]
    pub fn with_max_gap(max_gap: u32) -> Self {
        Self {
            expected: 1,
            missing: BTreeSet::new(),
            records: Vec::new(),
            phase: Phase::Bulk,
            recovered: 0,
            max_gap,
        }
    }

    /// Decodes a frame and observes the resulting record.
    ///
    /// # Errors
    /// Returns [`ReconcileError::Format`] for a malformed frame, leaving the
    /// reconciler untouched.
    pub fn observe_frame(&mut self, frame: &[u8]) -> Result<Observation, ReconcileError> {
        let record = Record::decode(frame)?;
        self.observe(record)
    }

    /// Observes one record.
    ///
    /// # Errors
    /// Returns an error for sequence 0 or an oversized gap; nothing is
    /// mutated in that case.
    pub fn observe(&mut self, record: Record) -> Result<Observation, ReconcileError> {
        let sequence = record.sequence;
        if sequence == 0 {
            return Err(ReconcileError::ZeroSequence);
        }
        let index = (sequence - 1) as usize;

        let observation = match self.phase {
            Phase::Bulk => self.observe_bulk(record, index)?,
            Phase::Recovering => self.observe_recovery(record, index),
        };

        tracing::trace!(sequence, ?observation, "observed record");
        Ok(observation)
    }

    fn observe_bulk(
        &mut self,
        record: Record,
        index: usize,
    ) -> Result<Observation, ReconcileError> {
        let sequence = record.sequence;

        if sequence < self.expected {
            return Ok(self.fill(record, index));
        }

        let observation = if sequence > self.expected {
            let gap = (sequence - self.expected) as usize;
            if self.missing.len() + gap > self.max_gap as usize {
                return Err(ReconcileError::GapTooLarge {
                    expected: self.expected,
                    sequence,
                    max: self.max_gap,
                });
            }
            let (from, to) = (self.expected, sequence - 1);
            self.missing.extend(from..=to);
            self.records.resize(index, None);
            tracing::debug!(from, to, "gap detected");
            Observation::Gap { from, to }
        } else {
            Observation::InOrder
        };

        self.records.push(Some(record));
        self.expected = sequence.saturating_add(1);
        Ok(observation)
    }

    fn observe_recovery(&mut self, record: Record, index: usize) -> Observation {
        if self.missing.contains(&record.sequence) {
            self.fill(record, index)
        } else {
            tracing::warn!(sequence = record.sequence, "unsolicited record ignored");
            Observation::Unsolicited
        }
    }

    // Sequences below `expected` always have a slot.
    fn fill(&mut self, record: Record, index: usize) -> Observation {
        match self.records.get_mut(index) {
            Some(slot) if slot.is_none() => {
                let sequence = record.sequence;
                *slot = Some(record);
                self.missing.remove(&sequence);
                self.recovered += 1;
                Observation::Recovered
            }
            _ => {
                tracing::warn!(sequence = record.sequence, "duplicate record ignored");
                Observation::Duplicate
            }
        }
    }

    /// Switches to the recovery phase.
    pub fn begin_recovery(&mut self) {
        self.phase = Phase::Recovering;
    }

    /// Returns the next sequence expected from the bulk stream.
    #[must_use]
    pub fn expected(&self) -> u32 {
        self.expected
    }

    /// Returns missing sequences in discovery order.
    ///
    /// Gaps are only detected ahead of `expected`, so discovery order is
    /// ascending.
    #[must_use]
    pub fn missing(&self) -> Vec<u32> {
        self.missing.iter().copied().collect()
    }

    /// Returns true if `sequence` still holds a placeholder.
    #[must_use]
    pub fn is_missing(&self, sequence: u32) -> bool {
        self.missing.contains(&sequence)
    }

    /// Returns the lowest missing sequence, if any.
    #[must_use]
    pub fn first_missing(&self) -> Option<u32> {
        self.missing.first().copied()
    }

    /// Returns the number of outstanding placeholders.
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the output collection.
    #[must_use]
    pub fn records(&self) -> &[Option<Record>] {
        &self.records
    }

    /// Returns the number of placeholders filled so far.
    #[must_use]
    pub fn recovered(&self) -> usize {
        self.recovered
    }

    /// Returns the highest sequence observed, 0 if none.
    #[must_use]
    pub fn max_sequence(&self) -> u32 {
        self.records.len() as u32
    }

    /// Returns true if no placeholders remain.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Consumes the reconciler, returning the output collection.
    #[must_use]
    pub fn into_records(self) -> Vec<Option<Record>> {
        self.records
    }
}

impl Default for SequenceReconciler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqfeed_core::{Side, Symbol};

    fn record(sequence: u32) -> Record {
        Record {
            symbol: Symbol::try_from("TSLA").unwrap(),
            side: if sequence % 2 == 0 { Side::Buy } else { Side::Sell },
            quantity: sequence * 10,
            price: 7_000 + sequence,
            sequence,
        }
    }

    fn feed(reconciler: &mut SequenceReconciler, sequences: &[u32]) {
        for &seq in sequences {
            reconciler.observe(record(seq)).unwrap();
        }
    }

    #[test]
    fn test_contiguous_stream() {
        let mut reconciler = SequenceReconciler::new();
        feed(&mut reconciler, &[1, 2, 3, 4, 5]);

        assert!(reconciler.missing().is_empty());
        assert!(reconciler.is_complete());
        assert_eq!(reconciler.records().len(), 5);
        for (index, slot) in reconciler.records().iter().enumerate() {
            assert_eq!(slot.as_ref().unwrap().sequence as usize, index + 1);
        }
        assert_eq!(reconciler.expected(), 6);
        assert_eq!(reconciler.max_sequence(), 5);
    }

    #[test]
    fn test_gap_detection() {
        let mut reconciler = SequenceReconciler::new();
        feed(&mut reconciler, &[1, 2]);

        assert_eq!(
            reconciler.observe(record(5)).unwrap(),
            Observation::Gap { from: 3, to: 4 }
        );
        feed(&mut reconciler, &[6]);

        assert_eq!(reconciler.missing(), &[3, 4]);
        let records = reconciler.records();
        assert_eq!(records.len(), 6);
        assert!(records[2].is_none());
        assert!(records[3].is_none());
        assert_eq!(records[4].as_ref().unwrap().sequence, 5);
        assert_eq!(records[5].as_ref().unwrap().sequence, 6);
    }

    #[test]
    fn test_missing_in_discovery_order() {
        let mut reconciler = SequenceReconciler::new();
        feed(&mut reconciler, &[2, 5, 7]);
        assert_eq!(reconciler.missing(), &[1, 3, 4, 6]);
    }

    #[test]
    fn test_recovery_placement_is_absolute() {
        let mut reconciler = SequenceReconciler::new();
        feed(&mut reconciler, &[1, 2, 4, 5, 6, 7, 8, 9, 11]);
        assert_eq!(reconciler.missing(), &[3, 10]);

        reconciler.begin_recovery();
        assert_eq!(reconciler.phase(), Phase::Recovering);

        // 10 arrives before 3.
        assert_eq!(
            reconciler.observe(record(10)).unwrap(),
            Observation::Recovered
        );
        assert_eq!(reconciler.observe(record(3)).unwrap(), Observation::Recovered);

        let records = reconciler.records();
        assert_eq!(records[2].as_ref().unwrap(), &record(3));
        assert_eq!(records[9].as_ref().unwrap(), &record(10));
        assert!(reconciler.is_complete());
        assert_eq!(reconciler.recovered(), 2);
        assert_eq!(records.len(), 11);
    }

    #[test]
    fn test_recovery_does_not_detect_gaps() {
        let mut reconciler = SequenceReconciler::new();
        feed(&mut reconciler, &[1, 3, 5]);
        reconciler.begin_recovery();

        assert_eq!(reconciler.observe(record(2)).unwrap(), Observation::Recovered);

        assert_eq!(reconciler.missing(), &[4]);
        assert_eq!(reconciler.records().len(), 5);
    }

    #[test]
    fn test_recovery_unsolicited() {
        let mut reconciler = SequenceReconciler::new();
        feed(&mut reconciler, &[1, 3]);
        reconciler.begin_recovery();

        assert_eq!(
            reconciler.observe(record(1)).unwrap(),
            Observation::Unsolicited
        );
        assert_eq!(
            reconciler.observe(record(9)).unwrap(),
            Observation::Unsolicited
        );
        assert_eq!(reconciler.records().len(), 3);
        assert_eq!(reconciler.missing(), &[2]);
    }

    #[test]
    fn test_bulk_duplicate_ignored() {
        let mut reconciler = SequenceReconciler::new();
        feed(&mut reconciler, &[1, 2]);

        assert_eq!(reconciler.observe(record(2)).unwrap(), Observation::Duplicate);
        assert_eq!(reconciler.records().len(), 2);
        assert_eq!(reconciler.expected(), 3);
    }

    #[test]
    fn test_bulk_late_arrival_fills_gap() {
        let mut reconciler = SequenceReconciler::new();
        feed(&mut reconciler, &[1, 4]);

        assert_eq!(reconciler.observe(record(2)).unwrap(), Observation::Recovered);
        assert_eq!(reconciler.missing(), &[3]);
        assert_eq!(reconciler.expected(), 5);
        assert_eq!(reconciler.records()[1].as_ref().unwrap().sequence, 2);
    }

    #[test]
    fn test_zero_sequence_rejected() {
        let mut reconciler = SequenceReconciler::new();
        assert_eq!(
            reconciler.observe(record(0)).unwrap_err(),
            ReconcileError::ZeroSequence
        );
        assert_eq!(reconciler.expected(), 1);
    }

    #[test]
    fn test_gap_too_large() {
        let mut reconciler = SequenceReconciler::with_max_gap(10);
        feed(&mut reconciler, &[1]);

        let err = reconciler.observe(record(100)).unwrap_err();
        assert!(matches!(err, ReconcileError::GapTooLarge { expected: 2, .. }));
        assert!(reconciler.missing().is_empty());
        assert_eq!(reconciler.records().len(), 1);
    }

    #[test]
    fn test_placeholder_limit_spans_gaps() {
        let mut reconciler = SequenceReconciler::with_max_gap(10);
        feed(&mut reconciler, &[1, 6, 12]);
        assert_eq!(reconciler.missing_count(), 9);

        let err = reconciler.observe(record(15)).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::GapTooLarge {
                expected: 13,
                sequence: 15,
                max: 10,
            }
        );
        assert_eq!(reconciler.missing_count(), 9);
        assert_eq!(reconciler.records().len(), 12);
        assert_eq!(reconciler.expected(), 13);

        // Filling placeholders frees room for later gaps.
        feed(&mut reconciler, &[2, 3]);
        assert_eq!(
            reconciler.observe(record(15)).unwrap(),
            Observation::Gap { from: 13, to: 14 }
        );
        assert_eq!(reconciler.missing_count(), 9);
    }

    #[test]
    fn test_late_arrivals_after_wide_gap() {
        let mut reconciler = SequenceReconciler::new();
        feed(&mut reconciler, &[1, 50_001]);
        assert_eq!(reconciler.missing_count(), 49_999);

        for seq in (2..=50_000).rev() {
            assert_eq!(reconciler.observe(record(seq)).unwrap(), Observation::Recovered);
        }
        assert!(reconciler.is_complete());
        assert!(!reconciler.is_missing(2));
        assert_eq!(reconciler.recovered(), 49_999);
        assert_eq!(reconciler.records().len(), 50_001);
    }

    #[test]
    fn test_malformed_frame_does_not_mutate() {
        let mut reconciler = SequenceReconciler::new();
        feed(&mut reconciler, &[1, 2]);

        let frame = record(5).encode();
        let err = reconciler.observe_frame(&frame[..12]).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Format(seqfeed_core::Error::FrameLength { actual: 12, .. })
        ));
        assert_eq!(reconciler.expected(), 3);
        assert_eq!(reconciler.records().len(), 2);
        assert!(reconciler.missing().is_empty());
    }

    #[test]
    fn test_observe_frame() {
        let mut reconciler = SequenceReconciler::new();
        let frame = record(1).encode();
        assert_eq!(reconciler.observe_frame(&frame).unwrap(), Observation::InOrder);
        assert_eq!(reconciler.into_records(), vec![Some(record(1))]);
    }
}
