//! Snapshots taken while another thread feeds input never observe a
//! partially applied sequence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use termlink_terminal::{Interpreter, ScreenBuffer};

const ROWS: usize = 12;
const COLUMNS: usize = 40;

#[test]
fn test_snapshot_sees_whole_sequences_only() {
    let screen = ScreenBuffer::new(ROWS, COLUMNS).unwrap();
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        scope.spawn(|| {
            let mut interpreter = Interpreter::new();
            // DECALN fills every cell, ED 2 blanks every cell; each is a
            // single sequence and so a single transaction
            for _ in 0..500 {
                interpreter.feed(&screen, "\x1b#8\x1b[2J").unwrap();
            }
            done.store(true, Ordering::Release);
        });

        let mut observed = 0;
        while !done.load(Ordering::Acquire) || observed == 0 {
            let snapshot = screen.snapshot().unwrap();
            let first = snapshot.cell(0, 0).map(|cell| cell.glyph).unwrap();
            assert!(first == 'E' || first == ' ');
            for line in &snapshot.lines {
                assert!(
                    line.cells().iter().all(|cell| cell.glyph == first),
                    "snapshot mixed the results of two sequences"
                );
            }
            observed += 1;
        }
    });
}

#[test]
fn test_scroll_is_atomic_for_readers() {
    let screen = ScreenBuffer::new(ROWS, COLUMNS).unwrap();
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        scope.spawn(|| {
            let mut interpreter = Interpreter::new();
            // Every row holds its own copy of the counter digit; a full-screen
            // scroll of ROWS lines replaces them all in one transaction
            for i in 0..200u32 {
                let digit = char::from_digit(i % 10, 10).unwrap();
                let mut page = String::from("\x1b[H");
                for row in 0..ROWS {
                    page.push_str(&format!("\x1b[{};1H{}", row + 1, digit));
                }
                interpreter.feed(&screen, &format!("\x1b[{ROWS}S")).unwrap();
                interpreter.feed(&screen, &page).unwrap();
            }
            done.store(true, Ordering::Release);
        });

        while !done.load(Ordering::Acquire) {
            let snapshot = screen.snapshot().unwrap();
            assert_eq!(snapshot.lines.len(), ROWS);
            assert!(snapshot.lines.iter().all(|line| line.len() == COLUMNS));
            assert!(snapshot.cursor_row < ROWS && snapshot.cursor_column < COLUMNS);
        }
    });
}

#[test]
fn test_buffer_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ScreenBuffer>();
}
