use std::sync::Mutex;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Run `f` with the given environment variables temporarily set (`Some`) or
/// removed (`None`), restoring the previous values afterwards, including on
/// panic. A process-wide lock keeps parallel tests from interleaving their
/// edits to the shared environment.
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let _restore = EnvSnapshot::apply(changes);
    f()
}

struct EnvSnapshot {
    previous: Vec<(String, Option<String>)>,
}

impl EnvSnapshot {
    fn apply(changes: &[(&str, Option<&str>)]) -> Self {
        let mut previous: Vec<(String, Option<String>)> = Vec::with_capacity(changes.len());
        for (key, value) in changes {
            // Snapshot each key once, before its first modification.
            if previous.iter().all(|(seen, _)| seen != key) {
                previous.push((key.to_string(), std::env::var(key).ok()));
            }
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
        Self { previous }
    }
}

impl Drop for EnvSnapshot {
    fn drop(&mut self) {
        for (key, value) in self.previous.drain(..) {
            match value {
                Some(v) => std::env::set_var(&key, v),
                None => std::env::remove_var(&key),
            }
        }
    }
}
