use crate::error::{IdealError, Result};

/// Number of window values produced per processing chunk. Prefix sums and
/// value buffers never grow past this plus one window width.
pub(crate) const CHUNK_LEN: usize = 1_000_000;

/// How a window of values is collapsed into a single score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMethod {
    Sum,
    Mean,
}

impl WindowMethod {
    /// Stable name used in cache file names.
    pub fn label(self) -> &'static str {
        match self {
            WindowMethod::Sum => "sum",
            WindowMethod::Mean => "mean",
        }
    }
}

/// Score of every length-`window` window of `a`, in start order. The output
/// has exactly `a.len() - window + 1` entries. Long inputs are processed in
/// overlapping chunks of `CHUNK_LEN + window - 1` values advancing by
/// `CHUNK_LEN`, so the prefix-sum scratch stays bounded.
pub fn windowed(a: &[f64], window: usize, method: WindowMethod) -> Result<Vec<f64>> {
    if window == 0 {
        return Err(IdealError::InvalidInput(
            "window size must be at least 1".to_string(),
        ));
    }
    if window > a.len() {
        return Err(IdealError::WindowTooLarge {
            window,
            length: a.len(),
        });
    }
    let total = a.len() - window + 1;
    let mut out = Vec::with_capacity(total);
    let mut start = 0usize;
    while start < total {
        let end = (start + CHUNK_LEN).min(total);
        windowed_into(&a[start..end + window - 1], window, method, &mut out);
        start = end;
    }
    Ok(out)
}

/// Windowed values over the whole slice, appended to `out`. The slice must
/// be at least `window` long.
pub(crate) fn windowed_into(a: &[f64], window: usize, method: WindowMethod, out: &mut Vec<f64>) {
    let mut cum = Vec::with_capacity(a.len() + 1);
    cum.push(0.0f64);
    let mut acc = 0.0f64;
    for &value in a {
        acc += value;
        cum.push(acc);
    }
    let divisor = window as f64;
    for i in 0..=(a.len() - window) {
        let sum = cum[i + window] - cum[i];
        out.push(match method {
            WindowMethod::Sum => sum,
            WindowMethod::Mean => sum / divisor,
        });
    }
}
