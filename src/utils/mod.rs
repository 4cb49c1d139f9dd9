use std::time::Instant;
use tracing::info;

/// Logs when a phase starts and, on drop, how long it took.
pub struct Timer {
    phase: String,
    start: Instant,
}

impl Timer {
    pub fn start(phase: impl Into<String>) -> Self {
        let phase = phase.into();
        info!("⏱  {} started", phase);
        Self {
            phase,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!("⏱  {} finished in {:.2?}", self.phase, self.start.elapsed());
    }
}

/// Row count with thousands separators: 12345 → "12,345".
pub fn fmt_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_count() {
        assert_eq!(fmt_count(1_234_567), "1,234,567");
        assert_eq!(fmt_count(0), "0");
        assert_eq!(fmt_count(42_000), "42,000");
        assert_eq!(fmt_count(999), "999");
    }
}
