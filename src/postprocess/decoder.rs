// ============================================================
// Layer 4 — Span Decoder
// ============================================================
// Turns the model's per-token start/end logits for one window
// into a ranked list of answer spans.
//
// Steps per window:
//   1. Mask: any position that is not an attended document
//      token gets -∞, so spans can never start or end inside
//      the query, a special token or padding.
//   2. Score every (start, end) pair with start ≤ end:
//        score = start_logit[start] + end_logit[end]
//   3. Keep the k best pairs. Only k pairs are fully sorted;
//      equal scores keep the order they were found in
//      (start-major).
//   4. Map token indices back to document characters:
//        start char = first char of the start token
//        end char   = last char (exclusive) of the end token
//   5. Calibrate: probability = sigmoid(calibration × score).
//      Start and end logits are not normalized on their own,
//      so the raw sum is scaled before squashing.
//
// Position NO_ANSWER_INDEX (the [CLS] token) is where SQuAD 2.0
// style models put their own "no answer" signal. Every window
// reports it as a separate probability.
//
// Reference: Devlin et al. (2019) BERT paper - span prediction
//            Rajpurkar et al. (2018) SQuAD 2.0

use std::cmp::Ordering;

use crate::data::preprocessor::{Segment, Window};
use crate::domain::error::ReaderError;
use crate::domain::traits::SpanLogits;

/// Token position holding the model's own no-answer signal
pub const NO_ANSWER_INDEX: usize = 0;

/// A scored (start token, end token) pair within one window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanCandidate {
    pub start_token: usize,
    pub end_token:   usize,
    pub score:       f32,
    pub probability: f64,
}

/// Decoder output for one window. `starts`, `ends` and
/// `probabilities` are parallel and hold at most k entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedWindow {
    /// Character offsets (inclusive) in the source document
    pub starts:        Vec<usize>,
    /// Character offsets (exclusive) in the source document
    pub ends:          Vec<usize>,
    pub probabilities: Vec<f64>,
    /// Calibrated score at NO_ANSWER_INDEX
    pub no_answer_probability: f64,
}

impl DecodedWindow {
    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }
}

/// Numerically stable logistic function
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Replace every logit outside the attended document segment with -∞
pub fn mask_logits(logits: &[f32], segments: &[Segment], attention_mask: &[u32]) -> Vec<f32> {
    logits
        .iter()
        .enumerate()
        .map(|(i, &logit)| {
            let valid = segments.get(i) == Some(&Segment::Document)
                && attention_mask.get(i) == Some(&1);
            if valid { logit } else { f32::NEG_INFINITY }
        })
        .collect()
}

/// Descending score; equal scores fall back to (start, end)
/// ascending, which is the order pairs are generated in
fn rank_order(a: &(usize, usize, f32), b: &(usize, usize, f32)) -> Ordering {
    b.2.total_cmp(&a.2).then_with(|| (a.0, a.1).cmp(&(b.0, b.1)))
}

pub struct SpanDecoder {
    calibration_factor: f64,
}

impl SpanDecoder {
    pub fn new(calibration_factor: f64) -> Self {
        Self { calibration_factor }
    }

    /// Map a raw span score to a probability
    pub fn calibrate(&self, score: f32) -> f64 {
        sigmoid(self.calibration_factor * f64::from(score))
    }

    /// The window's own no-answer probability, read at NO_ANSWER_INDEX
    pub fn no_answer_probability(&self, start: &[f32], end: &[f32]) -> f64 {
        match (start.get(NO_ANSWER_INDEX), end.get(NO_ANSWER_INDEX)) {
            (Some(&s), Some(&e)) if (s + e).is_finite() => self.calibrate(s + e),
            _ => 0.0,
        }
    }

    /// The k best valid (start, end) token pairs of one window
    pub fn candidates(
        &self,
        start:          &[f32],
        end:            &[f32],
        segments:       &[Segment],
        attention_mask: &[u32],
        k:              usize,
    ) -> Vec<SpanCandidate> {
        let start = mask_logits(start, segments, attention_mask);
        let end   = mask_logits(end, segments, attention_mask);

        // Only finite positions can take part in a span
        let valid_starts: Vec<usize> = (0..start.len()).filter(|&i| start[i].is_finite()).collect();
        let valid_ends:   Vec<usize> = (0..end.len()).filter(|&i| end[i].is_finite()).collect();

        let mut pairs = Vec::new();
        for &s in &valid_starts {
            // End can't be before start
            for &e in valid_ends.iter().filter(|&&e| e >= s) {
                pairs.push((s, e, start[s] + end[e]));
            }
        }

        if k == 0 {
            return Vec::new();
        }
        // Partition out the k best, then order just those
        if pairs.len() > k {
            pairs.select_nth_unstable_by(k - 1, rank_order);
            pairs.truncate(k);
        }
        pairs.sort_unstable_by(rank_order);

        pairs
            .into_iter()
            .map(|(start_token, end_token, score)| SpanCandidate {
                start_token,
                end_token,
                score,
                probability: self.calibrate(score),
            })
            .collect()
    }

    /// Decode one window into character offsets and probabilities
    pub fn decode_window(&self, window: &Window, start: &[f32], end: &[f32], k: usize) -> DecodedWindow {
        let mut decoded = DecodedWindow {
            no_answer_probability: self.no_answer_probability(start, end),
            ..DecodedWindow::default()
        };

        for candidate in self.candidates(start, end, &window.segments, &window.attention_mask, k) {
            // Tokens without a character span can't be mapped; skip the pair
            let (Some(start_span), Some(end_span)) = (
                window.token_to_chars(candidate.start_token),
                window.token_to_chars(candidate.end_token),
            ) else {
                continue;
            };
            decoded.starts.push(start_span.0);
            decoded.ends.push(end_span.1);
            decoded.probabilities.push(candidate.probability);
        }

        decoded
    }

    /// Decode every window. `logits` rows must line up with `windows`.
    pub fn decode(
        &self,
        windows: &[Window],
        logits:  &SpanLogits,
        k:       usize,
    ) -> Result<Vec<DecodedWindow>, ReaderError> {
        if logits.start.len() != windows.len() || logits.end.len() != windows.len() {
            return Err(ReaderError::Model(anyhow::anyhow!(
                "model returned {} start / {} end rows for {} windows",
                logits.start.len(),
                logits.end.len(),
                windows.len()
            )));
        }

        Ok(windows
            .iter()
            .zip(logits.start.iter().zip(&logits.end))
            .map(|(window, (start, end))| self.decode_window(window, start, end, k))
            .collect())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{approx_eq, sigmoid as plain_sigmoid};

    const CF: f64 = 0.1;

    /// A window where token i covers characters i..i+1
    fn identity_window(len: usize, attention_mask: Vec<u32>) -> Window {
        Window {
            input_ids:      vec![5; len],
            attention_mask,
            segments:       vec![Segment::Document; len],
            offsets:        (0..len).map(|i| Some((i, i + 1))).collect(),
            query_id:       0,
            document_id:    0,
        }
    }

    #[test]
    fn test_decode_ranks_spans_and_respects_mask() {
        let mut start0 = vec![0.0f32; 8];
        start0[3] = 4.0;
        start0[1] = 5.0; // masked by attention
        start0[4] = 3.0;
        let mut end0 = vec![0.0f32; 8];
        end0[1] = 5.0; // masked by attention
        end0[2] = 4.0; // can't be used: every good start is after it
        end0[3] = 3.0;
        end0[4] = 2.0;

        let mut start1 = vec![0.0f32; 8];
        start1[2] = 1.0;
        let mut end1 = vec![-10.0f32; 8];
        end1[4] = -1.0;

        let mut mask0 = vec![1u32; 8];
        mask0[0] = 0;
        mask0[1] = 0;
        let windows = vec![identity_window(8, mask0), identity_window(8, vec![1; 8])];
        let logits  = SpanLogits { start: vec![start0, start1], end: vec![end0, end1] };

        let decoded = SpanDecoder::new(CF).decode(&windows, &logits, 3).unwrap();
        assert_eq!(decoded.len(), 2);

        let w0 = &decoded[0];
        assert_eq!(w0.len(), 3);
        assert_eq!(w0.starts, vec![3, 3, 4]);
        assert_eq!(w0.ends, vec![4, 5, 5]);
        assert!(approx_eq(w0.probabilities[0], plain_sigmoid(7.0 * CF)));
        assert!(approx_eq(w0.probabilities[1], plain_sigmoid(6.0 * CF)));
        assert!(approx_eq(w0.probabilities[2], plain_sigmoid(5.0 * CF)));

        let w1 = &decoded[1];
        assert_eq!(w1.starts[0], 2);
        assert_eq!(w1.ends[0], 5);
        assert!(approx_eq(w1.probabilities[0], 0.5));
    }

    #[test]
    fn test_spans_stay_inside_document_segment() {
        let len = 10;
        let mut window = identity_window(len, vec![1; len]);
        // [CLS] q q [SEP] d d d d [SEP] [PAD]
        let layout = [
            Segment::Special, Segment::Query, Segment::Query, Segment::Special,
            Segment::Document, Segment::Document, Segment::Document, Segment::Document,
            Segment::Special, Segment::Special,
        ];
        window.segments = layout.to_vec();
        window.attention_mask[9] = 0;
        for (i, seg) in layout.iter().enumerate() {
            if *seg != Segment::Document {
                window.offsets[i] = None;
            }
        }

        // Highest logits sit on the query and padding
        let start = vec![9.0, 9.0, 9.0, 9.0, 0.5, 0.1, 0.2, 0.3, 9.0, 9.0];
        let end   = vec![9.0, 9.0, 9.0, 9.0, 0.1, 0.4, 0.2, 0.3, 9.0, 9.0];

        let decoder    = SpanDecoder::new(CF);
        let candidates = decoder.candidates(&start, &end, &window.segments, &window.attention_mask, 100);
        // 4 document tokens → 10 pairs with start ≤ end
        assert_eq!(candidates.len(), 10);
        for c in &candidates {
            assert!(c.start_token <= c.end_token);
            assert_eq!(window.segments[c.start_token], Segment::Document);
            assert_eq!(window.segments[c.end_token], Segment::Document);
        }

        let decoded = decoder.decode_window(&window, &start, &end, 100);
        for (s, e) in decoded.starts.iter().zip(&decoded.ends) {
            assert!(s < e);
            assert!(*s >= 4 && *e <= 8);
        }
    }

    #[test]
    fn test_equal_scores_keep_encounter_order() {
        let window     = identity_window(3, vec![1; 3]);
        let decoder    = SpanDecoder::new(CF);
        let candidates = decoder.candidates(&[0.0; 3], &[0.0; 3], &window.segments, &window.attention_mask, 6);
        let pairs: Vec<(usize, usize)> = candidates.iter().map(|c| (c.start_token, c.end_token)).collect();
        assert_eq!(pairs, vec![(0, 0), (0, 1), (0, 2), (1, 1), (1, 2), (2, 2)]);
    }

    #[test]
    fn test_top_k_matches_a_full_stable_sort() {
        let len    = 60;
        let window = identity_window(len, vec![1; len]);
        // Few distinct values, so plenty of ties cross the cut
        let start: Vec<f32> = (0..len).map(|i| ((i * 7) % 5) as f32).collect();
        let end:   Vec<f32> = (0..len).map(|i| ((i * 3) % 4) as f32).collect();

        let mut expected = Vec::new();
        for s in 0..len {
            for e in s..len {
                expected.push((s, e, start[s] + end[e]));
            }
        }
        expected.sort_by(|a, b| b.2.total_cmp(&a.2));

        let decoder = SpanDecoder::new(CF);
        for k in [1, 7, 25, 200] {
            let got: Vec<(usize, usize, f32)> = decoder
                .candidates(&start, &end, &window.segments, &window.attention_mask, k)
                .iter()
                .map(|c| (c.start_token, c.end_token, c.score))
                .collect();
            assert_eq!(got, expected[..k]);
        }
        assert!(decoder.candidates(&start, &end, &window.segments, &window.attention_mask, 0).is_empty());
    }

    #[test]
    fn test_calibration_is_monotonic() {
        let decoder = SpanDecoder::new(CF);
        let scores  = [-50.0f32, -3.0, -0.5, 0.0, 0.25, 2.0, 7.0, 50.0];
        for pair in scores.windows(2) {
            assert!(decoder.calibrate(pair[1]) >= decoder.calibrate(pair[0]));
        }
        assert!(approx_eq(decoder.calibrate(0.0), 0.5));
    }

    #[test]
    fn test_sigmoid_is_stable_for_large_magnitudes() {
        assert_eq!(sigmoid(-1000.0), 0.0);
        assert_eq!(sigmoid(1000.0), 1.0);
        assert!(sigmoid(-700.0) > 0.0);
    }

    #[test]
    fn test_no_answer_index_is_the_first_token() {
        assert_eq!(NO_ANSWER_INDEX, 0);
        let decoder = SpanDecoder::new(CF);
        let start   = [2.0f32, 9.0, 9.0];
        let end     = [3.0f32, 9.0, 9.0];
        assert!(approx_eq(decoder.no_answer_probability(&start, &end), plain_sigmoid(0.5)));
        assert_eq!(decoder.no_answer_probability(&[], &[]), 0.0);
    }

    #[test]
    fn test_fully_masked_window_only_reports_no_answer() {
        let mut window = identity_window(4, vec![1; 4]);
        window.segments = vec![Segment::Special; 4];
        window.offsets  = vec![None; 4];

        let decoded = SpanDecoder::new(CF).decode_window(&window, &[1.0; 4], &[1.0; 4], 5);
        assert!(decoded.is_empty());
        assert!(approx_eq(decoded.no_answer_probability, plain_sigmoid(0.2)));
    }

    #[test]
    fn test_unmappable_tokens_are_skipped() {
        let mut window = identity_window(3, vec![1; 3]);
        window.offsets[1] = None;

        let start   = [0.0f32, 5.0, 0.0];
        let end     = [0.0f32, 5.0, 0.0];
        let decoded = SpanDecoder::new(CF).decode_window(&window, &start, &end, 3);
        // The three best pairs all touch token 1
        assert!(decoded.is_empty());
        assert!(decoded.no_answer_probability > 0.0);
    }

    #[test]
    fn test_row_mismatch_is_a_model_error() {
        let windows = vec![identity_window(2, vec![1; 2])];
        let err = SpanDecoder::new(CF).decode(&windows, &SpanLogits::default(), 1).unwrap_err();
        assert!(matches!(err, ReaderError::Model(_)));
    }
}
