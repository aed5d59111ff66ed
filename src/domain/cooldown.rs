/// Milliseconds since the Unix epoch; the simulation's notion of "now".
pub type Millis = u64;

pub fn seconds_to_millis(seconds: f32) -> Millis {
    (seconds.max(0.0) * 1000.0).round() as Millis
}

/// True when `cooldown_seconds` have passed since `last`, or nothing happened yet.
pub fn cooldown_elapsed(last: Option<Millis>, cooldown_seconds: f32, now: Millis) -> bool {
    match last {
        None => true,
        Some(at) => now.saturating_sub(at) >= seconds_to_millis(cooldown_seconds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_never_used_then_cooldown_is_elapsed() {
        assert!(cooldown_elapsed(None, 10.0, 0));
    }

    #[test]
    fn when_inside_window_then_cooldown_is_not_elapsed() {
        assert!(!cooldown_elapsed(Some(1_000), 1.5, 2_499));
        assert!(cooldown_elapsed(Some(1_000), 1.5, 2_500));
    }

    #[test]
    fn when_clock_goes_backwards_then_cooldown_is_not_elapsed() {
        assert!(!cooldown_elapsed(Some(5_000), 1.0, 4_000));
    }
}
