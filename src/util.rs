use rand::{distributions::Alphanumeric, thread_rng, Rng};

const ID_LENGTH: usize = 10;

/// Comparison key for names that must be unique ignoring case.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Trimmed form value, or `None` when it is missing or only whitespace.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn new_poll_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}
