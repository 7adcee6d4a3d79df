use crate::records::IterRound;

/// The small binary array most scenario tests run on: 21 values whose best
/// mean-0.5 windows (window 4) group into three runs.
pub(super) fn sample_array() -> Vec<f64> {
    [1, 1, 0, 0, 0, 1, 1, 0, 0, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1]
        .into_iter()
        .map(f64::from)
        .collect()
}

/// `sample_array` with a short tail appended so a second iteration round
/// still finds a window.
pub(super) fn sample_array_with_tail() -> Vec<f64> {
    let mut values = sample_array();
    values.extend([0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
    values
}

pub(super) fn round_of(windows: Vec<(usize, usize)>) -> IterRound {
    IterRound {
        score: Some(0.5),
        windows,
    }
}
