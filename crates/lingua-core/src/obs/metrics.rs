use serde::Serialize;
use std::cell::Cell;

///
/// EventReport
///
/// Point-in-time snapshot of the engine event counters.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct EventReport {
    /// Storage queries executed (table scans and point lookups).
    pub queries_executed: u64,
    /// Translations fetched from storage.
    pub translations_loaded: u64,
    /// Translated reads served from the attached-translation slot.
    pub translation_cache_hits: u64,
    /// Masters resolved through the fallback chain.
    pub fallbacks_resolved: u64,
    /// Orphaned translations yielded uncombined during cascade.
    pub orphans_yielded: u64,
}

thread_local! {
    static COUNTERS: Cell<EventReport> = Cell::new(EventReport::default());
}

fn bump(update: impl FnOnce(&mut EventReport)) {
    COUNTERS.with(|slot| {
        let mut report = slot.get();
        update(&mut report);
        slot.set(report);
    });
}

pub(crate) fn record_query() {
    bump(|r| r.queries_executed += 1);
}

pub(crate) fn record_translation_load() {
    bump(|r| r.translations_loaded += 1);
}

pub(crate) fn record_cache_hit() {
    bump(|r| r.translation_cache_hits += 1);
}

pub(crate) fn record_fallback() {
    bump(|r| r.fallbacks_resolved += 1);
}

pub(crate) fn record_orphan() {
    bump(|r| r.orphans_yielded += 1);
}

/// Current counter snapshot.
#[must_use]
pub fn report() -> EventReport {
    COUNTERS.with(Cell::get)
}

/// Zero every counter.
pub fn reset_all() {
    COUNTERS.with(|slot| slot.set(EventReport::default()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_and_reset() {
        reset_all();
        record_query();
        record_query();
        record_fallback();

        let snapshot = report();
        assert_eq!(snapshot.queries_executed, 2);
        assert_eq!(snapshot.fallbacks_resolved, 1);

        reset_all();
        assert_eq!(report(), EventReport::default());
    }
}
