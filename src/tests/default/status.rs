use alloc::format;

use crate::status::StatusWord;

#[cfg_attr(not(loom), test)]
pub fn test_status_packing_round_trip() {
    let word = StatusWord::new();
    for _ in 0..3 {
        word.add_pending();
    }
    word.add_ready();
    let s = word.load_relaxed();
    assert_eq!(s.pending(), 3);
    assert_eq!(s.ready(), 1);
    assert!(!s.is_cancelled());
    assert!(!s.has_waiter());
    // one ready task sits right above the 31-bit pending counter
    assert_eq!(u64::from(s), (1 << 31) | 3);

    let s = word.mark_waiting();
    assert!(s.has_waiter());
    assert_eq!(s.pending(), 3);

    let mut assumed = s;
    assert!(word.complete_ready_waiting(&mut assumed));
    let s = word.load_relaxed();
    assert_eq!(s.ready(), 0);
    assert_eq!(s.pending(), 2);
    assert!(!s.has_waiter());
}

#[cfg_attr(not(loom), test)]
pub fn test_status_counters_do_not_bleed() {
    let word = StatusWord::new();
    // drive the pending counter across the ready counter's boundary
    for _ in 0..0x100 {
        word.add_pending();
    }
    word.mark_cancelled();
    let s = word.load_relaxed();
    assert_eq!(s.pending(), 0x100);
    assert_eq!(s.ready(), 0);
    assert!(s.is_cancelled());
    assert!(!s.has_waiter());
}

#[cfg_attr(not(loom), test)]
pub fn test_status_add_pending_rolls_back_after_cancel() {
    let word = StatusWord::new();
    assert!(!word.mark_cancelled().is_cancelled());
    let s = word.add_pending();
    assert!(s.is_cancelled());
    assert_eq!(word.load_relaxed().pending(), 0);
}

#[cfg_attr(not(loom), test)]
pub fn test_status_cancelled_bit_is_sticky() {
    let word = StatusWord::new();
    word.mark_cancelled();
    assert!(word.mark_cancelled().is_cancelled());
    assert!(word.load_relaxed().is_cancelled());
}

#[cfg_attr(not(loom), test)]
pub fn test_status_formatting() {
    let word = StatusWord::new();
    word.add_pending();
    word.add_pending();
    word.add_ready();
    assert_eq!(format!("{:?}", word.load_relaxed()), "C:n W:n R:1 P:2");
}

#[cfg_attr(not(loom), test)]
pub fn test_status_clear_waiting() {
    let word = StatusWord::new();
    word.add_pending();
    word.mark_waiting();
    assert!(word.load_relaxed().has_waiter());
    word.clear_waiting();
    let s = word.load_relaxed();
    assert!(!s.has_waiter());
    assert_eq!(s.pending(), 1);
}
