use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;

/// `prefix_xxxxxxxx` with `len` lowercase alphanumeric characters.
pub fn make_short_random_id(prefix: &str, len: usize) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect();
    format!("{prefix}_{suffix}")
}

pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}
